//! SPI interface implementation built on top of `embedded-hal` `SpiDevice`.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, InputPin};
use embedded_hal::spi::{Operation, SpiDevice};

use super::{BurstFrame, BurstRead, Mpu6000Interface, TransportError};
use crate::log;
use crate::params::BusSpeed;
use crate::registers::{
    Interrupts, UserControl, REG_INT_STATUS, REG_USER_CTRL, SENSOR_DATA_BYTES, SPI_READ_FLAG,
};

// Bad frames tolerated before dropping to the low bus clock.
const SPEED_FALLBACK_THRESHOLD: u16 = 4;
// Command byte, INT_STATUS, then the sensor output block.
const BURST_TRANSFER_BYTES: usize = 2 + SENSOR_DATA_BYTES;

/// Placeholder data-ready input for boards without the DRDY line wired.
///
/// Always reports high, so readiness is taken from `INT_STATUS` instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDataReady;

impl PinErrorType for NoDataReady {
    type Error = Infallible;
}

impl InputPin for NoDataReady {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// Hook invoked to reclock the SPI peripheral.
pub type SpeedHook<SPI> = fn(&mut SPI, BusSpeed);

/// SPI-based interface implementation for the MPU-6000 driver.
pub struct SpiInterface<SPI, DRDY = NoDataReady> {
    spi: SPI,
    drdy: DRDY,
    speed: BusSpeed,
    speed_hook: Option<SpeedHook<SPI>>,
    bad_frames: u16,
}

impl<SPI> SpiInterface<SPI, NoDataReady> {
    /// Creates a new interface without a data-ready line.
    pub const fn new(spi: SPI) -> Self {
        Self::with_data_ready(spi, NoDataReady)
    }
}

impl<SPI, DRDY> SpiInterface<SPI, DRDY> {
    /// Creates a new interface gated by the sensor's data-ready output.
    pub const fn with_data_ready(spi: SPI, drdy: DRDY) -> Self {
        Self {
            spi,
            drdy,
            speed: BusSpeed::Low,
            speed_hook: None,
            bad_frames: 0,
        }
    }

    /// Installs the function used to switch the SPI clock.
    ///
    /// `embedded-hal` has no clock API, so without a hook the requested speed is only recorded.
    pub fn with_speed_hook(mut self, hook: SpeedHook<SPI>) -> Self {
        self.speed_hook = Some(hook);
        self
    }

    /// Bus speed most recently selected.
    pub fn speed(&self) -> BusSpeed {
        self.speed
    }

    /// Number of implausible frames seen since `init`.
    pub fn bad_frames(&self) -> u16 {
        self.bad_frames
    }

    /// Provides mutable access to the wrapped SPI device.
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Consumes the interface and returns the owned SPI device and data-ready pin.
    pub fn release(self) -> (SPI, DRDY) {
        (self.spi, self.drdy)
    }

    fn select_speed(&mut self, speed: BusSpeed) {
        if let Some(hook) = self.speed_hook {
            hook(&mut self.spi, speed);
        }
        self.speed = speed;
    }

    fn record_bad_frame(&mut self) {
        self.bad_frames = self.bad_frames.saturating_add(1);
        if self.bad_frames > SPEED_FALLBACK_THRESHOLD && self.speed == BusSpeed::High {
            log::warn!("MPU6000: {} bad SPI frames, dropping to low bus speed", self.bad_frames);
            self.select_speed(BusSpeed::Low);
        }
    }
}

impl<SPI, DRDY> Mpu6000Interface for SpiInterface<SPI, DRDY>
where
    SPI: SpiDevice,
    DRDY: InputPin,
{
    type Error = TransportError<SPI::Error>;

    fn init(&mut self) -> core::result::Result<(), Self::Error> {
        self.bad_frames = 0;
        self.select_speed(BusSpeed::Low);
        Ok(())
    }

    fn after_reset(&mut self) -> core::result::Result<(), Self::Error> {
        let user_ctrl = UserControl::new().with_i2c_if_disable(true);
        self.write_register(REG_USER_CTRL, u8::from(user_ctrl))
    }

    fn read_register(&mut self, register: u8) -> core::result::Result<u8, Self::Error> {
        let command = [register | SPI_READ_FLAG];
        let mut value = [0u8; 1];
        let mut operations = [Operation::Write(&command), Operation::Read(&mut value)];
        self.spi.transaction(&mut operations)?;
        Ok(value[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> core::result::Result<(), Self::Error> {
        self.spi.write(&[register & !SPI_READ_FLAG, value])?;
        Ok(())
    }

    fn set_bus_speed(&mut self, speed: BusSpeed) -> core::result::Result<(), Self::Error> {
        self.select_speed(speed);
        Ok(())
    }

    fn read_burst(&mut self, frame: &mut BurstFrame) -> core::result::Result<BurstRead, Self::Error> {
        // A low DRDY line means the trigger was spurious.
        if !self.drdy.is_high().map_err(|_| TransportError::DataReadyPin)? {
            return Ok(BurstRead::EMPTY);
        }

        let mut buf = [0u8; BURST_TRANSFER_BYTES];
        buf[0] = REG_INT_STATUS | SPI_READ_FLAG;
        self.spi.transfer_in_place(&mut buf)?;

        frame.command = buf[0];
        frame.int_status = buf[1];
        frame.data[..SENSOR_DATA_BYTES].copy_from_slice(&buf[2..]);

        // All-zero data or stray status bits point at a bus clocked too fast.
        let status = Interrupts::from(frame.int_status);
        let all_zero = buf[2..].iter().all(|&b| b == 0);
        if all_zero || !status.is_plausible_status() {
            self.record_bad_frame();
            return Err(TransportError::CorruptFrame);
        }

        if !status.data_ready() {
            return Ok(BurstRead::EMPTY);
        }

        Ok(BurstRead::SINGLE)
    }
}
