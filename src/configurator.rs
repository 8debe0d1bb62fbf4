//! Register bring-up and runtime filter reprogramming.

use embedded_hal::delay::DelayNs;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::interface::Mpu6000Interface;
use crate::log;
use crate::params::{AccelRange, BusSpeed, ClockSource, DlpfConfig, ProductId, SamplingMode};
use crate::registers::{
    AccelConfig, Configuration, GyroConfig, InterruptPinConfig, Interrupts, PowerManagement1,
    Register, EXPECTED_WHO_AM_I, REG_PRODUCT_ID, REG_PWR_MGMT_1, REG_PWR_MGMT_2, REG_SMPLRT_DIV,
    REG_WHO_AM_I,
};
use crate::sampler::{BusCore, Scaling};

// PLL lock time after leaving sleep (milliseconds).
const WAKE_SETTLE_MS: u32 = 5;
// Gap between register verification attempts (milliseconds).
const RETRY_GAP_MS: u32 = 1;
// DLPF bandwidth used on the divided path when no cutoff is configured.
const DIVIDED_FALLBACK_CUTOFF_HZ: u16 = 20;

/// Outcome of a successful bring-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BringUp {
    /// Contents of `PRODUCT_ID`.
    pub product: ProductId,
    /// Range actually programmed into `ACCEL_CONFIG`.
    pub accel_setting: AccelRange,
    /// Unit conversion matching the programmed ranges.
    pub scaling: Scaling,
}

/// Resets, identifies and programs the sensor.
///
/// Runs with exclusive access to the transport. The bus is left at
/// [`BusSpeed::High`] on success.
pub fn bring_up<IFACE, D>(
    iface: &mut IFACE,
    config: &Config,
    delay: &mut D,
) -> Result<BringUp, IFACE::Error>
where
    IFACE: Mpu6000Interface,
    D: DelayNs,
{
    iface.init()?;
    iface.set_bus_speed(BusSpeed::Low)?;

    iface.write_register(
        REG_PWR_MGMT_1,
        PowerManagement1::new().with_device_reset(true).into(),
    )?;
    delay.delay_ms(config.reset_settle_ms);
    iface.after_reset()?;

    let who_am_i = iface.read_register(REG_WHO_AM_I)?;
    if who_am_i != EXPECTED_WHO_AM_I {
        log::error!(
            "MPU6000: WHO_AM_I {=u8:#x}, expected {=u8:#x}",
            who_am_i,
            EXPECTED_WHO_AM_I
        );
        return Err(Error::DeviceIdMismatch(who_am_i));
    }

    let retries = config.register_retries;
    let wake = PowerManagement1::new().with_clock_source(ClockSource::PllGyroZ);
    write_register_value(iface, wake, retries, delay)?;
    delay.delay_ms(WAKE_SETTLE_MS);

    write_verified(iface, REG_PWR_MGMT_2, 0, retries, delay)?;
    write_verified(
        iface,
        REG_SMPLRT_DIV,
        config.sampling_mode.sample_rate_divider(),
        retries,
        delay,
    )?;

    let dlpf = hardware_filter(config.sampling_mode, config.filter_hz, config.filter_hz);
    write_register_value(iface, Configuration::new().with_dlpf(dlpf), retries, delay)?;
    write_register_value(
        iface,
        GyroConfig::new().with_full_scale(config.gyro_range),
        retries,
        delay,
    )?;

    let product = ProductId(iface.read_register(REG_PRODUCT_ID)?);
    let (accel_setting, accel_lsb_per_g) = config.accel_range.setting_for(product);
    if product.is_revision_c() {
        log::info!(
            "MPU6000: revision C part {=u8:#x}, accel programmed one range lower",
            product.0
        );
    }
    write_register_value(
        iface,
        AccelConfig::new().with_full_scale(accel_setting),
        retries,
        delay,
    )?;

    write_register_value(iface, Interrupts::new().with_data_ready(true), retries, delay)?;
    write_register_value(
        iface,
        InterruptPinConfig::new().with_read_clear(true).with_latch(true),
        retries,
        delay,
    )?;

    iface.set_bus_speed(BusSpeed::High)?;

    Ok(BringUp {
        product,
        accel_setting,
        scaling: Scaling::new(config.gyro_range, accel_lsb_per_g),
    })
}

/// Writes `value` and reads it back, retrying up to `retries` times.
pub fn write_verified<IFACE, D>(
    iface: &mut IFACE,
    register: u8,
    value: u8,
    retries: u8,
    delay: &mut D,
) -> Result<(), IFACE::Error>
where
    IFACE: Mpu6000Interface,
    D: DelayNs,
{
    let attempts = retries.max(1);
    for attempt in 1..=attempts {
        let matched = iface
            .write_register(register, value)
            .and_then(|()| iface.read_register(register))
            .is_ok_and(|read_back| read_back == value);
        if matched {
            return Ok(());
        }
        if attempt < attempts {
            delay.delay_ms(RETRY_GAP_MS);
        }
    }

    log::error!(
        "MPU6000: register {=u8:#x} failed verification after {=u8} attempts",
        register,
        attempts
    );
    Err(Error::RegisterVerify { register })
}

/// Verified write of a typed register value to its own address.
pub fn write_register_value<IFACE, R, D>(
    iface: &mut IFACE,
    value: R,
    retries: u8,
    delay: &mut D,
) -> Result<(), IFACE::Error>
where
    IFACE: Mpu6000Interface,
    R: Register<Raw = u8> + Into<u8>,
    D: DelayNs,
{
    write_verified(iface, R::ADDRESS, value.into(), retries, delay)
}

/// Hardware DLPF selection: wide open when the software filter is in use.
///
/// The divided path always keeps the DLPF engaged. A zero cutoff selects
/// `default_hz`, or 20 Hz if that is zero as well.
pub fn hardware_filter(mode: SamplingMode, cutoff_hz: u16, default_hz: u16) -> DlpfConfig {
    match mode {
        SamplingMode::Fast => DlpfConfig::Hz256,
        SamplingMode::Divided => {
            let cutoff = match (cutoff_hz, default_hz) {
                (0, 0) => DIVIDED_FALLBACK_CUTOFF_HZ,
                (0, default) => default,
                (requested, _) => requested,
            };
            DlpfConfig::engaged_for_cutoff(cutoff)
        }
    }
}

/// Applies a new cutoff to whichever filter the sampling mode uses.
///
/// The caller holds the bus lock and has already dropped to low speed.
pub fn apply_filter_cutoff<IFACE>(
    core: &mut BusCore<IFACE>,
    config: &Config,
    cutoff_hz: u16,
) -> Result<(), IFACE::Error>
where
    IFACE: Mpu6000Interface,
{
    if core.filter.is_software() {
        if core.filter.set_cutoff(cutoff_hz) {
            log::debug!("MPU6000: software filter cutoff {=u16} Hz", cutoff_hz);
        }
    } else {
        let dlpf = hardware_filter(config.sampling_mode, cutoff_hz, config.filter_hz);
        core.interface.write_register(
            Configuration::ADDRESS,
            Configuration::new().with_dlpf(dlpf).into(),
        )?;
        log::debug!("MPU6000: DLPF set to {=u16} Hz", dlpf.bandwidth_hz());
    }
    Ok(())
}
