//! Configuration primitives for the MPU-6000 driver.

use crate::params::{AccelRange, GyroRange, SamplingMode};

/// User-facing configuration for the MPU-6000 sensor.
///
/// Chosen once by the platform layer and handed to the driver constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Native sampling strategy for this platform.
    pub sampling_mode: SamplingMode,
    /// Rate at which the consumer expects averaged samples.
    pub delivery_rate_hz: u16,
    /// Gyroscope full-scale range.
    pub gyro_range: GyroRange,
    /// Accelerometer full-scale range.
    pub accel_range: AccelRange,
    /// Low-pass cutoff applied at bring-up; `0` disables filtering.
    pub filter_hz: u16,
    /// Consecutive sampling failures tolerated before the instance is marked unhealthy.
    pub max_consecutive_errors: u16,
    /// Write/read-back attempts per configuration register.
    pub register_retries: u8,
    /// Delay after the device reset before touching any register.
    pub reset_settle_ms: u32,
    /// Identifier used when registering with a multi-sensor registry.
    pub instance: u8,
}

impl Config {
    /// Begins building a [`Config`] using the builder pattern.
    pub fn new() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Checks whether this configuration is consistent.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        let native = self.sampling_mode.native_rate_hz();

        if self.delivery_rate_hz == 0 {
            return Err(ConfigError::ZeroDeliveryRate);
        }

        if self.delivery_rate_hz > native {
            return Err(ConfigError::DeliveryRateTooHigh);
        }

        if self.sampling_mode == SamplingMode::Fast
            && u32::from(self.filter_hz) * 2 >= u32::from(native)
        {
            return Err(ConfigError::NyquistViolation);
        }

        if self.register_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }

        Ok(())
    }

    /// Number of native samples averaged into one delivered sample.
    pub fn downsample_ratio(&self) -> u32 {
        let native = u32::from(self.sampling_mode.native_rate_hz());
        let delivered = u32::from(self.delivery_rate_hz.max(1));
        (native / delivered).max(1)
    }
}

/// Builder for [`Config`] allowing piecemeal construction.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder seeded with [`Config::default()`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Overrides the sampling strategy.
    pub fn sampling_mode(mut self, mode: SamplingMode) -> Self {
        self.config.sampling_mode = mode;
        self
    }

    /// Overrides the consumer delivery rate.
    pub fn delivery_rate_hz(mut self, rate: u16) -> Self {
        self.config.delivery_rate_hz = rate;
        self
    }

    /// Overrides the gyroscope range.
    pub fn gyro_range(mut self, range: GyroRange) -> Self {
        self.config.gyro_range = range;
        self
    }

    /// Overrides the accelerometer range.
    pub fn accel_range(mut self, range: AccelRange) -> Self {
        self.config.accel_range = range;
        self
    }

    /// Sets the default low-pass cutoff.
    pub fn filter_hz(mut self, cutoff: u16) -> Self {
        self.config.filter_hz = cutoff;
        self
    }

    /// Sets the consecutive-failure threshold.
    pub fn max_consecutive_errors(mut self, threshold: u16) -> Self {
        self.config.max_consecutive_errors = threshold;
        self
    }

    /// Sets the per-register write attempts.
    pub fn register_retries(mut self, retries: u8) -> Self {
        self.config.register_retries = retries;
        self
    }

    /// Sets the post-reset settle delay.
    pub fn reset_settle_ms(mut self, millis: u32) -> Self {
        self.config.reset_settle_ms = millis;
        self
    }

    /// Sets the registry instance identifier.
    pub fn instance(mut self, instance: u8) -> Self {
        self.config.instance = instance;
        self
    }

    /// Finalizes the builder and returns the [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling_mode: SamplingMode::Fast,
            delivery_rate_hz: 200,
            gyro_range: GyroRange::Dps2000,
            accel_range: AccelRange::G8,
            filter_hz: 20,
            max_consecutive_errors: 10,
            register_retries: 5,
            reset_settle_ms: 100,
            instance: 0,
        }
    }
}

/// Validation errors generated while verifying a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Software filter cutoff is at or above half the native sampling rate.
    NyquistViolation,
    /// Consumer asked for more samples than the sensor produces.
    DeliveryRateTooHigh,
    /// Consumer delivery rate of zero.
    ZeroDeliveryRate,
    /// Register verification needs at least one attempt.
    ZeroRetries,
}
