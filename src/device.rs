//! High-level MPU-6000 device driver implementation.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;

use crate::accumulator::Accumulator;
use crate::config::Config;
use crate::configurator;
use crate::error::{Error, Result};
use crate::filter::FilterStage;
use crate::interface::i2c::I2cInterface;
use crate::interface::spi::SpiInterface;
use crate::interface::Mpu6000Interface;
use crate::lock::BusLock;
use crate::log;
use crate::params::{BusSpeed, ProductId};
use crate::sampler::{BusCore, Health, Sampler, Scaling, Shared};

/// Driver for one MPU-6000 on a shared bus.
///
/// Owns the transport for its whole life. [`Mpu6000::init`] runs bring-up with
/// exclusive access; [`Mpu6000::split`] then hands out the sampling and consumer
/// handles.
pub struct Mpu6000<IFACE> {
    shared: Shared<IFACE>,
    config: Config,
    product: Option<ProductId>,
    initialized: bool,
}

impl<IFACE> Mpu6000<IFACE> {
    // ==================================================================
    // == Driver Construction & Ownership ===============================
    // ==================================================================
    /// Creates a new driver instance from the provided bus interface.
    pub fn new(interface: IFACE, config: Config) -> Self {
        let filter = FilterStage::for_mode(config.sampling_mode, config.filter_hz);
        let scaling = Scaling::new(config.gyro_range, config.accel_range.lsb_per_g());
        Self {
            shared: Shared {
                bus: BusLock::new(BusCore::new(interface, filter, scaling)),
                accumulator: Accumulator::new(config.downsample_ratio()),
                health: Health::new(config.max_consecutive_errors),
            },
            config,
            product: None,
            initialized: false,
        }
    }

    /// Consumes the driver and returns the owned interface.
    pub fn release(self) -> IFACE {
        self.shared.bus.into_inner().interface
    }

    /// Configuration the driver was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registry identifier of this sensor.
    pub fn instance(&self) -> u8 {
        self.config.instance
    }

    /// `PRODUCT_ID` read during the last successful bring-up.
    pub fn product_id(&self) -> Option<ProductId> {
        self.product
    }

    /// Returns `true` once bring-up has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The lock guarding every bus transaction.
    pub fn lock_handle(&self) -> &BusLock<BusCore<IFACE>> {
        &self.shared.bus
    }
}

impl<SPI> Mpu6000<SpiInterface<SPI>>
where
    SPI: SpiDevice,
{
    /// Creates a driver on an SPI device without a data-ready line.
    pub fn new_spi(spi: SPI, config: Config) -> Self {
        Self::new(SpiInterface::new(spi), config)
    }
}

impl<SPI, DRDY> Mpu6000<SpiInterface<SPI, DRDY>>
where
    SPI: SpiDevice,
    DRDY: InputPin,
{
    /// Creates a driver on an SPI device gated by the data-ready output.
    pub fn new_spi_with_data_ready(spi: SPI, drdy: DRDY, config: Config) -> Self {
        Self::new(SpiInterface::with_data_ready(spi, drdy), config)
    }
}

impl<I2C> Mpu6000<I2cInterface<I2C>>
where
    I2C: I2c,
{
    /// Creates a driver on an I2C bus at `address`.
    pub fn new_i2c(i2c: I2C, address: u8, config: Config) -> Self {
        Self::new(I2cInterface::new(i2c, address), config)
    }
}

impl<IFACE> Mpu6000<IFACE>
where
    IFACE: Mpu6000Interface,
{
    // ==================================================================
    // == Bring-up ======================================================
    // ==================================================================
    /// Resets and programs the sensor, then arms sampling.
    ///
    /// Calling it again after the [`Sampler`] and [`Reader`] are dropped
    /// reinitializes the instance, clearing the accumulator, health and filters.
    pub fn init<D>(&mut self, delay: &mut D) -> Result<(), IFACE::Error>
    where
        D: DelayNs,
    {
        self.initialized = false;
        self.shared.health.mark_unhealthy();

        if let Err(reason) = self.config.validate() {
            log::error!("MPU6000: invalid configuration {}", reason);
            return Err(Error::InvalidConfig);
        }

        let core = self.shared.bus.get_mut();
        let report = configurator::bring_up(&mut core.interface, &self.config, delay)?;
        core.scaling = report.scaling;
        core.filter = FilterStage::for_mode(self.config.sampling_mode, self.config.filter_hz);

        self.shared.accumulator.reset();
        self.shared.health.mark_healthy();
        self.product = Some(report.product);
        self.initialized = true;

        log::info!(
            "MPU6000[{=u8}]: ready, {=u16} Hz native, {=u32} samples per delivery",
            self.config.instance,
            self.config.sampling_mode.native_rate_hz(),
            self.shared.accumulator.ratio()
        );
        Ok(())
    }

    /// Splits the driver into its sampling and consumer handles.
    pub fn split(&mut self) -> Result<(Sampler<'_, IFACE>, Reader<'_, IFACE>), IFACE::Error> {
        if !self.initialized {
            return Err(Error::NotReady);
        }

        let shared = &self.shared;
        let period_us = self.config.sampling_mode.tick_period_us();
        Ok((
            Sampler::new(shared, period_us),
            Reader::new(shared, &self.config),
        ))
    }
}

/// Consumer-side handle: publishes averaged samples and applies configuration changes.
pub struct Reader<'a, IFACE> {
    shared: &'a Shared<IFACE>,
    config: &'a Config,
    gyro: [f32; 3],
    accel: [f32; 3],
    last_samples: u32,
    pending_filter_hz: Option<u16>,
}

impl<'a, IFACE> Reader<'a, IFACE> {
    fn new(shared: &'a Shared<IFACE>, config: &'a Config) -> Self {
        Self {
            shared,
            config,
            gyro: [0.0; 3],
            accel: [0.0; 3],
            last_samples: 0,
            pending_filter_hz: None,
        }
    }

    /// Registry identifier of this sensor.
    pub fn instance(&self) -> u8 {
        self.config.instance
    }

    /// Returns `true` when a gyro sample can be delivered.
    pub fn gyro_sample_available(&self) -> bool {
        self.is_healthy() && self.shared.accumulator.sample_available()
    }

    /// Returns `true` when an accel sample can be delivered.
    pub fn accel_sample_available(&self) -> bool {
        self.is_healthy() && self.shared.accumulator.sample_available()
    }

    /// Last published angular rate in rad/s.
    pub fn gyro(&self) -> [f32; 3] {
        self.gyro
    }

    /// Last published acceleration in m/s².
    pub fn accel(&self) -> [f32; 3] {
        self.accel
    }

    /// Native samples averaged into the last published values.
    pub fn samples_in_last_update(&self) -> u32 {
        self.last_samples
    }

    /// Requests a new low-pass cutoff; applied by the next [`Reader::update`].
    pub fn set_filter_hz(&mut self, cutoff_hz: u16) {
        self.pending_filter_hz = Some(cutoff_hz);
    }

    /// Cutoff still waiting to be applied.
    pub fn pending_filter_hz(&self) -> Option<u16> {
        self.pending_filter_hz
    }

    /// Returns `true` while the instance may report samples.
    pub fn is_healthy(&self) -> bool {
        self.shared.health.is_healthy()
    }

    /// Current run of failed sampling transactions.
    pub fn consecutive_errors(&self) -> u16 {
        self.shared.health.consecutive_errors()
    }

    /// The lock guarding every bus transaction.
    pub fn lock_handle(&self) -> &'a BusLock<BusCore<IFACE>> {
        &self.shared.bus
    }

    fn wait_budget_us(&self) -> u32 {
        self.config.sampling_mode.tick_period_us()
    }
}

impl<IFACE> Reader<'_, IFACE>
where
    IFACE: Mpu6000Interface,
{
    /// Applies a pending filter change, then publishes a new averaged sample if one is ready.
    ///
    /// The filter change does not wait for samples; if the bus cannot be taken within
    /// one sampling period it is kept for the next call.
    pub fn update<D>(&mut self, delay: &mut D) -> bool
    where
        D: DelayNs,
    {
        if !self.is_healthy() {
            return false;
        }

        if let Some(cutoff_hz) = self.pending_filter_hz {
            if self.apply_filter(cutoff_hz, delay) {
                self.pending_filter_hz = None;
            }
        }

        if !self.shared.accumulator.sample_available() {
            return false;
        }
        let Some(averaged) = self.shared.accumulator.drain() else {
            return false;
        };

        self.gyro = averaged.gyro;
        self.accel = averaged.accel;
        self.last_samples = averaged.samples;
        true
    }

    /// Switches the bus clock, waiting at most one sampling period for the lock.
    pub fn set_bus_speed<D>(&mut self, speed: BusSpeed, delay: &mut D) -> Result<(), IFACE::Error>
    where
        D: DelayNs,
    {
        let Some(mut guard) = self.shared.bus.acquire_within(delay, self.wait_budget_us()) else {
            return Err(Error::Busy);
        };
        guard.interface.set_bus_speed(speed)?;
        Ok(())
    }

    fn apply_filter<D>(&self, cutoff_hz: u16, delay: &mut D) -> bool
    where
        D: DelayNs,
    {
        let Some(mut guard) = self.shared.bus.acquire_within(delay, self.wait_budget_us()) else {
            log::debug!("MPU6000: bus busy, filter change deferred");
            return false;
        };
        let core = &mut *guard;

        if core.interface.set_bus_speed(BusSpeed::Low).is_err() {
            return false;
        }
        let applied =
            configurator::apply_filter_cutoff(core, self.config, cutoff_hz).is_ok();
        let restored = core.interface.set_bus_speed(BusSpeed::High).is_ok();
        applied && restored
    }
}
