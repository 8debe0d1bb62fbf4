//! Register map definitions for the MPU-6000.
#![allow(unused_parens)]

use modular_bitfield::prelude::*;

use crate::params::{AccelRange, ClockSource, DlpfConfig, GyroRange};

/// Register address of `PRODUCT_ID`.
pub const REG_PRODUCT_ID: u8 = 0x0C;
/// Register address of `SMPLRT_DIV`.
pub const REG_SMPLRT_DIV: u8 = 0x19;
/// Register address of `CONFIG`.
pub const REG_CONFIG: u8 = 0x1A;
/// Register address of `GYRO_CONFIG`.
pub const REG_GYRO_CONFIG: u8 = 0x1B;
/// Register address of `ACCEL_CONFIG`.
pub const REG_ACCEL_CONFIG: u8 = 0x1C;
/// Register address of `INT_PIN_CFG`.
pub const REG_INT_PIN_CFG: u8 = 0x37;
/// Register address of `INT_ENABLE`.
pub const REG_INT_ENABLE: u8 = 0x38;
/// Register address of `INT_STATUS`.
pub const REG_INT_STATUS: u8 = 0x3A;
/// Register address of `ACCEL_XOUT_H`.
pub const REG_ACCEL_XOUT_H: u8 = 0x3B;
/// Register address of `TEMP_OUT_H`.
pub const REG_TEMP_OUT_H: u8 = 0x41;
/// Register address of `GYRO_XOUT_H`.
pub const REG_GYRO_XOUT_H: u8 = 0x43;
/// Register address of `USER_CTRL`.
pub const REG_USER_CTRL: u8 = 0x6A;
/// Register address of `PWR_MGMT_1`.
pub const REG_PWR_MGMT_1: u8 = 0x6B;
/// Register address of `PWR_MGMT_2`.
pub const REG_PWR_MGMT_2: u8 = 0x6C;
/// Register address of `WHO_AM_I`.
pub const REG_WHO_AM_I: u8 = 0x75;

/// Value reported by `WHO_AM_I` on a genuine MPU-6000.
pub const EXPECTED_WHO_AM_I: u8 = 0x68;
/// Flag OR-ed into the register address for SPI reads.
pub const SPI_READ_FLAG: u8 = 0x80;
/// Number of bytes spanning accel, temperature and gyro output registers.
pub const SENSOR_DATA_BYTES: usize = 14;

/// Metadata exposed by every register value type.
pub trait Register {
    /// Raw storage backing the register payload.
    type Raw: Copy;
    /// Register address as documented in the datasheet.
    const ADDRESS: u8;
}

/// Bitfield representation of the `CONFIG` register (address `0x1A`).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    // Digital low-pass filter selection (bits 2:0).
    pub dlpf: DlpfConfig,
    // FSYNC sampling location (bits 5:3).
    pub ext_sync_set: B3,
    #[skip]
    __: B2,
}

/// Bitfield representation of the `GYRO_CONFIG` register (address `0x1B`).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GyroConfig {
    #[skip]
    __: B3,
    // Full-scale selection (bits 4:3).
    pub full_scale: GyroRange,
    // Self-test triggers for X, Y, Z (bits 7:5).
    pub self_test: B3,
}

/// Bitfield representation of the `ACCEL_CONFIG` register (address `0x1C`).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccelConfig {
    #[skip]
    __: B3,
    // Full-scale selection (bits 4:3).
    pub full_scale: AccelRange,
    // Self-test triggers for X, Y, Z (bits 7:5).
    pub self_test: B3,
}

/// Bitfield representation of the `INT_PIN_CFG` register (address `0x37`).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptPinConfig {
    #[skip]
    __: B1,
    // Auxiliary I2C bypass (bit 1).
    pub i2c_bypass: bool,
    // FSYNC interrupt enable and level (bits 3:2).
    pub fsync: B2,
    // Any read clears the interrupt status (bit 4).
    pub read_clear: bool,
    // Hold INT high until cleared (bit 5).
    pub latch: bool,
    // Open-drain output (bit 6).
    pub open_drain: bool,
    // Active-low output (bit 7).
    pub active_low: bool,
}

/// Bitfield representation of `INT_ENABLE` (`0x38`) and `INT_STATUS` (`0x3A`).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupts {
    // Raw data ready (bit 0).
    pub data_ready: bool,
    // Reserved bits reported on some parts (bits 2:1).
    pub reserved: B2,
    // Auxiliary I2C master interrupt (bit 3).
    pub i2c_master: bool,
    // FIFO overflow (bit 4).
    pub fifo_overflow: bool,
    #[skip]
    __: B3,
}

/// Bitfield representation of the `USER_CTRL` register (address `0x6A`).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserControl {
    // Reset signal paths and sensor registers (bit 0).
    pub signal_reset: bool,
    // Reset the auxiliary I2C master (bit 1).
    pub i2c_master_reset: bool,
    // Reset the FIFO (bit 2).
    pub fifo_reset: bool,
    #[skip]
    __: B1,
    // Disable the primary I2C interface, SPI only (bit 4).
    pub i2c_if_disable: bool,
    // Enable the auxiliary I2C master (bit 5).
    pub i2c_master_enable: bool,
    // Enable the FIFO (bit 6).
    pub fifo_enable: bool,
    #[skip]
    __: B1,
}

/// Bitfield representation of the `PWR_MGMT_1` register (address `0x6B`).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerManagement1 {
    // Clock source selection (bits 2:0).
    pub clock_source: ClockSource,
    // Temperature sensor disable (bit 3).
    pub temp_disable: bool,
    #[skip]
    __: B1,
    // Cycle between sleep and single samples (bit 5).
    pub cycle: bool,
    // Sleep mode (bit 6).
    pub sleep: bool,
    // Device reset, self-clearing (bit 7).
    pub device_reset: bool,
}

macro_rules! byte_register {
    ($ty:ty, $address:expr) => {
        impl From<u8> for $ty {
            fn from(value: u8) -> Self {
                Self::from_bytes([value])
            }
        }

        impl From<$ty> for u8 {
            fn from(value: $ty) -> Self {
                value.into_bytes()[0]
            }
        }

        impl Register for $ty {
            type Raw = u8;
            const ADDRESS: u8 = $address;
        }
    };
}

byte_register!(Configuration, REG_CONFIG);
byte_register!(GyroConfig, REG_GYRO_CONFIG);
byte_register!(AccelConfig, REG_ACCEL_CONFIG);
byte_register!(InterruptPinConfig, REG_INT_PIN_CFG);
byte_register!(Interrupts, REG_INT_ENABLE);
byte_register!(UserControl, REG_USER_CTRL);
byte_register!(PowerManagement1, REG_PWR_MGMT_1);

impl Interrupts {
    /// Returns `true` when the status byte carries nothing beyond data-ready and reserved bits.
    pub fn is_plausible_status(self) -> bool {
        !self.i2c_master() && !self.fifo_overflow() && u8::from(self) & 0xE0 == 0
    }
}
