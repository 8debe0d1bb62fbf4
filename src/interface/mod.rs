//! Bus interface abstraction for the MPU-6000 driver.

pub mod i2c;
pub mod spi;

use crate::params::BusSpeed;
use crate::registers::SENSOR_DATA_BYTES;

/// Largest number of data bytes a single burst may deliver.
pub const MAX_BURST_BYTES: usize = 1024;

/// Buffer filled by one burst transaction; reused every tick.
#[derive(Debug, Clone)]
pub struct BurstFrame {
    /// Command byte clocked out at the start of the transfer.
    pub command: u8,
    /// `INT_STATUS` captured alongside the data.
    pub int_status: u8,
    /// Raw sensor bytes, `samples * sample_size` of which are valid.
    pub data: [u8; MAX_BURST_BYTES],
}

impl BurstFrame {
    /// Creates a zeroed frame.
    pub const fn new() -> Self {
        Self {
            command: 0,
            int_status: 0,
            data: [0; MAX_BURST_BYTES],
        }
    }

    /// Returns the bytes of the `index`-th sample described by `read`.
    pub fn sample(&self, read: BurstRead, index: usize) -> Option<&[u8]> {
        if index >= read.samples {
            return None;
        }
        let start = index.checked_mul(read.sample_size)?;
        let end = start.checked_add(read.sample_size)?;
        self.data.get(start..end)
    }
}

impl Default for BurstFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape of the data returned by a burst transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BurstRead {
    /// Number of complete samples in the frame.
    pub samples: usize,
    /// Size of each sample in bytes.
    pub sample_size: usize,
}

impl BurstRead {
    /// No new data; not an error.
    pub const EMPTY: Self = Self {
        samples: 0,
        sample_size: SENSOR_DATA_BYTES,
    };

    /// A single accel/temp/gyro block.
    pub const SINGLE: Self = Self {
        samples: 1,
        sample_size: SENSOR_DATA_BYTES,
    };

    /// Returns `true` when the transaction produced nothing to accumulate.
    pub const fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

/// Errors shared by the bundled transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError<E> {
    /// Error raised by the underlying bus peripheral.
    Bus(E),
    /// The data-ready input could not be read.
    DataReadyPin,
    /// The transfer completed but its contents are implausible.
    CorruptFrame,
}

impl<E> From<E> for TransportError<E> {
    fn from(err: E) -> Self {
        Self::Bus(err)
    }
}

/// Abstraction over the low-level bus access required by the driver.
pub trait Mpu6000Interface {
    /// Error type produced by the concrete bus implementation.
    type Error;

    /// One-time mode and clock setup, run before any register access.
    fn init(&mut self) -> core::result::Result<(), Self::Error>;

    /// Transport-specific housekeeping right after a device reset.
    fn after_reset(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }

    /// Reads a single register.
    fn read_register(&mut self, register: u8) -> core::result::Result<u8, Self::Error>;

    /// Writes a single register.
    fn write_register(&mut self, register: u8, value: u8) -> core::result::Result<(), Self::Error>;

    /// Switches between the configuration and sampling bus clocks.
    fn set_bus_speed(&mut self, speed: BusSpeed) -> core::result::Result<(), Self::Error>;

    /// Performs one sampling transaction into `frame`.
    ///
    /// Returning [`BurstRead::EMPTY`] means no new data was available.
    fn read_burst(&mut self, frame: &mut BurstFrame) -> core::result::Result<BurstRead, Self::Error>;
}
