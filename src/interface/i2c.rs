//! I2C interface implementation built on top of `embedded-hal` `I2c`.

use embedded_hal::i2c::I2c;

use super::{BurstFrame, BurstRead, Mpu6000Interface, TransportError};
use crate::params::BusSpeed;
use crate::registers::{Interrupts, REG_ACCEL_XOUT_H, REG_INT_STATUS, SENSOR_DATA_BYTES};

/// Address with `AD0` tied low.
pub const DEFAULT_ADDRESS: u8 = 0x68;
/// Address with `AD0` tied high.
pub const ALTERNATE_ADDRESS: u8 = 0x69;

/// I2C-based interface implementation for the MPU-6000 driver.
///
/// Readiness is polled from `INT_STATUS`; every burst yields at most one sample.
pub struct I2cInterface<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cInterface<I2C> {
    /// Creates a new interface talking to `address`.
    pub const fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Seven-bit device address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Consumes the interface and returns the owned bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Mpu6000Interface for I2cInterface<I2C>
where
    I2C: I2c,
{
    type Error = TransportError<I2C::Error>;

    fn init(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }

    fn read_register(&mut self, register: u8) -> core::result::Result<u8, Self::Error> {
        let mut value = [0u8; 1];
        self.i2c.write_read(self.address, &[register], &mut value)?;
        Ok(value[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> core::result::Result<(), Self::Error> {
        self.i2c.write(self.address, &[register, value])?;
        Ok(())
    }

    fn set_bus_speed(&mut self, _speed: BusSpeed) -> core::result::Result<(), Self::Error> {
        // The I2C clock belongs to the shared bus, not to this device.
        Ok(())
    }

    fn read_burst(&mut self, frame: &mut BurstFrame) -> core::result::Result<BurstRead, Self::Error> {
        let status = self.read_register(REG_INT_STATUS)?;
        frame.int_status = status;
        if !Interrupts::from(status).data_ready() {
            return Ok(BurstRead::EMPTY);
        }

        frame.command = REG_ACCEL_XOUT_H;
        self.i2c.write_read(
            self.address,
            &[REG_ACCEL_XOUT_H],
            &mut frame.data[..SENSOR_DATA_BYTES],
        )?;
        Ok(BurstRead::SINGLE)
    }
}

#[cfg(test)]
mod tests {
    use super::{I2cInterface, DEFAULT_ADDRESS};
    use crate::interface::{BurstFrame, BurstRead, Mpu6000Interface};
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn register_access_uses_device_address() {
        let expectations = [
            I2cTransaction::write_read(DEFAULT_ADDRESS, vec![0x75], vec![0x68]),
            I2cTransaction::write(DEFAULT_ADDRESS, vec![0x19, 0x04]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut interface = I2cInterface::new(i2c.clone(), DEFAULT_ADDRESS);

        assert_eq!(interface.read_register(0x75).unwrap(), 0x68);
        interface.write_register(0x19, 0x04).unwrap();
        i2c.done();
    }

    #[test]
    fn burst_waits_for_data_ready() {
        let expectations = [I2cTransaction::write_read(DEFAULT_ADDRESS, vec![0x3A], vec![0x00])];
        let mut i2c = I2cMock::new(&expectations);
        let mut interface = I2cInterface::new(i2c.clone(), DEFAULT_ADDRESS);

        let mut frame = BurstFrame::new();
        assert_eq!(interface.read_burst(&mut frame).unwrap(), BurstRead::EMPTY);
        i2c.done();
    }

    #[test]
    fn burst_reads_sensor_block_when_ready() {
        let block: Vec<u8> = (1..=14).collect();
        let expectations = [
            I2cTransaction::write_read(DEFAULT_ADDRESS, vec![0x3A], vec![0x01]),
            I2cTransaction::write_read(DEFAULT_ADDRESS, vec![0x3B], block.clone()),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut interface = I2cInterface::new(i2c.clone(), DEFAULT_ADDRESS);

        let mut frame = BurstFrame::new();
        let read = interface.read_burst(&mut frame).unwrap();
        assert_eq!(read, BurstRead::SINGLE);
        assert_eq!(frame.sample(read, 0).unwrap(), block.as_slice());
        i2c.done();
    }
}
