//! Strongly typed parameter enumerations for the MPU-6000 driver.
//!
//! These enums map directly to datasheet field encodings and are used across
//! [`Config`](crate::config::Config) and the high-level driver APIs. Prefer these
//! types over raw integers to keep configuration values valid and explicit.
//!
//! # Examples
//!
//! ```rust
//! use mpu6000::params::{AccelRange, GyroRange, SamplingMode};
//!
//! let gyro = GyroRange::Dps2000;
//! let accel = AccelRange::G8;
//! let mode = SamplingMode::Fast;
//! assert_eq!(mode.native_rate_hz(), 1_000);
//! let _ = (gyro, accel);
//! ```

use modular_bitfield::prelude::Specifier;

/// Standard gravity used to convert accelerometer counts to m/s².
pub const GRAVITY_MSS: f32 = 9.806_65;

const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;

/// Gyroscope full-scale selections (`GYRO_CONFIG.FS_SEL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 2]
pub enum GyroRange {
    /// ±250 °/s.
    Dps250 = 0b00,
    /// ±500 °/s.
    Dps500 = 0b01,
    /// ±1000 °/s.
    Dps1000 = 0b10,
    /// ±2000 °/s.
    Dps2000 = 0b11,
}

impl GyroRange {
    /// Returns the sensitivity in LSB per degree per second.
    pub fn lsb_per_dps(self) -> f32 {
        match self {
            Self::Dps250 => 131.0,
            Self::Dps500 => 65.5,
            Self::Dps1000 => 32.8,
            Self::Dps2000 => 16.4,
        }
    }

    /// Returns the scale factor from raw counts to rad/s.
    pub fn rad_per_lsb(self) -> f32 {
        DEG_TO_RAD / self.lsb_per_dps()
    }
}

/// Accelerometer full-scale selections (`ACCEL_CONFIG.AFS_SEL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 2]
pub enum AccelRange {
    /// ±2 g.
    G2 = 0b00,
    /// ±4 g.
    G4 = 0b01,
    /// ±8 g.
    G8 = 0b10,
    /// ±16 g.
    G16 = 0b11,
}

impl AccelRange {
    /// Returns the nominal sensitivity in LSB per g.
    pub fn lsb_per_g(self) -> f32 {
        match self {
            Self::G2 => 16_384.0,
            Self::G4 => 8_192.0,
            Self::G8 => 4_096.0,
            Self::G16 => 2_048.0,
        }
    }

    const fn one_step_lower(self) -> Self {
        match self {
            Self::G2 | Self::G4 => Self::G2,
            Self::G8 => Self::G4,
            Self::G16 => Self::G8,
        }
    }

    /// Returns the `AFS_SEL` value to program and the sensitivity it actually yields.
    ///
    /// Revision C silicon reports half the datasheet sensitivity, so the next lower
    /// selection is programmed to land on the requested range.
    pub fn setting_for(self, product: ProductId) -> (AccelRange, f32) {
        if product.is_revision_c() {
            let setting = self.one_step_lower();
            (setting, setting.lsb_per_g() / 2.0)
        } else {
            (self, self.lsb_per_g())
        }
    }
}

/// Digital low-pass filter selections (`CONFIG.DLPF_CFG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 3]
pub enum DlpfConfig {
    /// 256 Hz gyro bandwidth, 8 kHz gyro output rate.
    Hz256 = 0,
    /// 188 Hz bandwidth.
    Hz188 = 1,
    /// 98 Hz bandwidth.
    Hz98 = 2,
    /// 42 Hz bandwidth.
    Hz42 = 3,
    /// 20 Hz bandwidth.
    Hz20 = 4,
    /// 10 Hz bandwidth.
    Hz10 = 5,
    /// 5 Hz bandwidth.
    Hz5 = 6,
    /// Reserved encoding.
    Reserved = 7,
}

impl DlpfConfig {
    /// Picks the hardware filter for a requested cutoff; `0` selects the widest setting.
    pub const fn for_cutoff(cutoff_hz: u16) -> Self {
        match cutoff_hz {
            0 => Self::Hz256,
            1..=5 => Self::Hz5,
            6..=10 => Self::Hz10,
            11..=20 => Self::Hz20,
            21..=42 => Self::Hz42,
            43..=98 => Self::Hz98,
            _ => Self::Hz256,
        }
    }

    /// Like [`DlpfConfig::for_cutoff`] but never opens the filter.
    ///
    /// With the DLPF disabled the gyro output rate rises from 1 kHz to 8 kHz, which
    /// would break the divided sampling rate; requests above 98 Hz get 98 Hz.
    pub const fn engaged_for_cutoff(cutoff_hz: u16) -> Self {
        match Self::for_cutoff(cutoff_hz) {
            Self::Hz256 | Self::Reserved => Self::Hz98,
            engaged => engaged,
        }
    }

    /// Returns `true` when the setting keeps the 1 kHz gyro output rate.
    pub const fn is_engaged(self) -> bool {
        !matches!(self, Self::Hz256 | Self::Reserved)
    }

    /// Returns the nominal bandwidth in hertz.
    pub const fn bandwidth_hz(self) -> u16 {
        match self {
            Self::Hz256 => 256,
            Self::Hz188 => 188,
            Self::Hz98 => 98,
            Self::Hz42 => 42,
            Self::Hz20 => 20,
            Self::Hz10 => 10,
            Self::Hz5 => 5,
            Self::Reserved => 0,
        }
    }
}

/// Clock source selections (`PWR_MGMT_1.CLKSEL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[bits = 3]
pub enum ClockSource {
    /// Internal 8 MHz oscillator.
    Internal = 0,
    /// PLL referenced to the X gyro.
    PllGyroX = 1,
    /// PLL referenced to the Y gyro.
    PllGyroY = 2,
    /// PLL referenced to the Z gyro.
    PllGyroZ = 3,
    /// PLL referenced to an external 32.768 kHz clock.
    PllExternal32k = 4,
    /// PLL referenced to an external 19.2 MHz clock.
    PllExternal19M = 5,
    /// Reserved encoding.
    Reserved = 6,
    /// Clock stopped, timing generator held in reset.
    Stopped = 7,
}

/// Bus clock selection used by the transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusSpeed {
    /// Slow clock used while programming registers.
    Low,
    /// Fast clock used for steady-state sampling.
    High,
}

/// Platform sampling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplingMode {
    /// Sample at 1 kHz with the hardware filter wide open and a software two-pole filter.
    Fast,
    /// Sample at 200 Hz behind the hardware DLPF, relying on averaging only.
    Divided,
}

impl SamplingMode {
    /// Rate at which the sampling tick must run.
    pub const fn native_rate_hz(self) -> u16 {
        match self {
            Self::Fast => 1_000,
            Self::Divided => 200,
        }
    }

    /// Tick period in microseconds.
    pub const fn tick_period_us(self) -> u32 {
        1_000_000 / self.native_rate_hz() as u32
    }

    /// `SMPLRT_DIV` value producing [`Self::native_rate_hz`].
    pub const fn sample_rate_divider(self) -> u8 {
        match self {
            // 8 kHz gyro output with the DLPF open.
            Self::Fast => 7,
            // 1 kHz gyro output with the DLPF engaged.
            Self::Divided => 4,
        }
    }
}

/// Contents of the `PRODUCT_ID` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProductId(pub u8);

impl ProductId {
    /// Engineering-sample and production revision C4/C5 identifiers.
    const REVISION_C: [u8; 4] = [0x14, 0x15, 0x54, 0x55];

    /// Returns `true` for revision C silicon with halved accel sensitivity.
    pub fn is_revision_c(self) -> bool {
        Self::REVISION_C.contains(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dlpf_selection_rounds_up_to_next_bandwidth() {
        assert_eq!(DlpfConfig::for_cutoff(0), DlpfConfig::Hz256);
        assert_eq!(DlpfConfig::for_cutoff(5), DlpfConfig::Hz5);
        assert_eq!(DlpfConfig::for_cutoff(15), DlpfConfig::Hz20);
        assert_eq!(DlpfConfig::for_cutoff(20), DlpfConfig::Hz20);
        assert_eq!(DlpfConfig::for_cutoff(42), DlpfConfig::Hz42);
        assert_eq!(DlpfConfig::for_cutoff(60), DlpfConfig::Hz98);
        assert_eq!(DlpfConfig::for_cutoff(200), DlpfConfig::Hz256);
    }

    #[test]
    fn engaged_selection_caps_at_98_hz() {
        assert_eq!(DlpfConfig::engaged_for_cutoff(20), DlpfConfig::Hz20);
        assert_eq!(DlpfConfig::engaged_for_cutoff(99), DlpfConfig::Hz98);
        assert_eq!(DlpfConfig::engaged_for_cutoff(u16::MAX), DlpfConfig::Hz98);
        assert!(DlpfConfig::engaged_for_cutoff(0).is_engaged());
        assert!(!DlpfConfig::Hz256.is_engaged());
    }

    #[test]
    fn revision_c_programs_one_step_lower() {
        let (setting, lsb) = AccelRange::G8.setting_for(ProductId(0x54));
        assert_eq!(setting, AccelRange::G4);
        assert_eq!(lsb, 4_096.0);

        let (setting, lsb) = AccelRange::G8.setting_for(ProductId(0x58));
        assert_eq!(setting, AccelRange::G8);
        assert_eq!(lsb, 4_096.0);
    }

    #[test]
    fn tick_periods_follow_native_rate() {
        assert_eq!(SamplingMode::Fast.tick_period_us(), 1_000);
        assert_eq!(SamplingMode::Divided.tick_period_us(), 5_000);
    }
}
