//! Periodic sampling engine.
//!
//! [`Sampler::tick`] is invoked by the platform's fixed-rate scheduler. Each tick
//! performs at most one burst transaction, converts the raw counts to physical
//! units, runs them through the [`FilterStage`] and feeds the accumulator.

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::accumulator::Accumulator;
use crate::filter::FilterStage;
use crate::interface::{BurstFrame, Mpu6000Interface};
use crate::lock::BusLock;
use crate::log;
use crate::params::{GyroRange, GRAVITY_MSS};
use crate::registers::{
    REG_ACCEL_XOUT_H, REG_GYRO_XOUT_H, REG_TEMP_OUT_H, SENSOR_DATA_BYTES,
};

/// One decoded accel/temperature/gyro block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Accelerometer counts (X, Y, Z).
    pub accel: [i16; 3],
    /// Die temperature counts.
    pub temperature: i16,
    /// Gyroscope counts (X, Y, Z).
    pub gyro: [i16; 3],
    /// `INT_STATUS` captured with the sample.
    pub status: u8,
}

impl RawSample {
    /// Decodes the big-endian `ACCEL_XOUT_H..GYRO_ZOUT_L` block.
    pub fn parse(bytes: &[u8], status: u8) -> Option<Self> {
        if bytes.len() < SENSOR_DATA_BYTES {
            return None;
        }
        let word = |register: u8| {
            let at = usize::from(register - REG_ACCEL_XOUT_H);
            i16::from_be_bytes([bytes[at], bytes[at + 1]])
        };
        let triple = |first: u8| [word(first), word(first + 2), word(first + 4)];
        Some(Self {
            accel: triple(REG_ACCEL_XOUT_H),
            temperature: word(REG_TEMP_OUT_H),
            gyro: triple(REG_GYRO_XOUT_H),
            status,
        })
    }
}

/// Conversion factors from raw counts to physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    /// rad/s per gyro count.
    pub gyro_rad_per_lsb: f32,
    /// m/s² per accel count.
    pub accel_mss_per_lsb: f32,
}

impl Scaling {
    /// Builds scaling for the programmed gyro range and measured accel sensitivity.
    pub fn new(gyro_range: GyroRange, accel_lsb_per_g: f32) -> Self {
        Self {
            gyro_rad_per_lsb: gyro_range.rad_per_lsb(),
            accel_mss_per_lsb: GRAVITY_MSS / accel_lsb_per_g,
        }
    }

    /// Gyro counts to rad/s.
    pub fn gyro(&self, raw: [i16; 3]) -> [f32; 3] {
        raw.map(|v| f32::from(v) * self.gyro_rad_per_lsb)
    }

    /// Accel counts to m/s².
    pub fn accel(&self, raw: [i16; 3]) -> [f32; 3] {
        raw.map(|v| f32::from(v) * self.accel_mss_per_lsb)
    }
}

/// State reachable only while holding the bus lock.
pub struct BusCore<IFACE> {
    pub(crate) interface: IFACE,
    pub(crate) frame: BurstFrame,
    pub(crate) filter: FilterStage,
    pub(crate) scaling: Scaling,
}

impl<IFACE> BusCore<IFACE> {
    pub(crate) const fn new(interface: IFACE, filter: FilterStage, scaling: Scaling) -> Self {
        Self {
            interface,
            frame: BurstFrame::new(),
            filter,
            scaling,
        }
    }

    /// Provides mutable access to the transport.
    pub fn interface_mut(&mut self) -> &mut IFACE {
        &mut self.interface
    }

    /// Active filter stage.
    pub fn filter(&self) -> &FilterStage {
        &self.filter
    }

    /// Active unit conversion.
    pub fn scaling(&self) -> Scaling {
        self.scaling
    }
}

/// Health flag plus the consecutive sampling-failure streak.
///
/// Only the sampling context writes the counter, so plain loads and stores suffice.
pub struct Health {
    healthy: AtomicBool,
    consecutive_errors: AtomicU16,
    threshold: u16,
}

impl Health {
    /// Creates an unhealthy record; bring-up marks it healthy.
    pub const fn new(threshold: u16) -> Self {
        Self {
            healthy: AtomicBool::new(false),
            consecutive_errors: AtomicU16::new(0),
            threshold: if threshold == 0 { 1 } else { threshold },
        }
    }

    /// Returns `true` while the instance may report samples.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Length of the current failure streak.
    pub fn consecutive_errors(&self) -> u16 {
        self.consecutive_errors.load(Ordering::Relaxed)
    }

    pub(crate) fn record_success(&self) {
        self.consecutive_errors.store(0, Ordering::Relaxed);
    }

    /// Counts a failure; returns `true` if this one made the instance unhealthy.
    pub(crate) fn record_failure(&self) -> bool {
        let streak = self.consecutive_errors().saturating_add(1);
        self.consecutive_errors.store(streak, Ordering::Relaxed);
        if streak >= self.threshold && self.is_healthy() {
            self.healthy.store(false, Ordering::Release);
            return true;
        }
        false
    }

    pub(crate) fn mark_healthy(&self) {
        self.consecutive_errors.store(0, Ordering::Relaxed);
        self.healthy.store(true, Ordering::Release);
    }

    pub(crate) fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Release);
    }
}

/// Everything the sampling and consumer contexts share.
pub struct Shared<IFACE> {
    pub(crate) bus: BusLock<BusCore<IFACE>>,
    pub(crate) accumulator: Accumulator,
    pub(crate) health: Health,
}

/// Result of a single sampling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// This many samples were accumulated.
    Sampled(usize),
    /// The transaction succeeded but carried no new data.
    NoData,
    /// The configuration path held the bus; nothing was touched.
    Skipped,
    /// The transaction failed; counted towards the health threshold.
    BusError,
    /// The instance has been marked unhealthy and no longer samples.
    Unhealthy,
}

/// Sampling-context handle produced by [`Mpu6000::split`](crate::Mpu6000::split).
pub struct Sampler<'a, IFACE> {
    shared: &'a Shared<IFACE>,
    period_us: u32,
}

impl<'a, IFACE> Sampler<'a, IFACE> {
    pub(crate) fn new(shared: &'a Shared<IFACE>, period_us: u32) -> Self {
        Self { shared, period_us }
    }

    /// Period at which the scheduler must call [`Sampler::tick`].
    pub fn period_us(&self) -> u32 {
        self.period_us
    }
}

impl<IFACE> Sampler<'_, IFACE>
where
    IFACE: Mpu6000Interface,
{
    /// Runs one sampling cycle. Never blocks.
    pub fn tick(&mut self) -> TickOutcome {
        let shared = self.shared;
        if !shared.health.is_healthy() {
            return TickOutcome::Unhealthy;
        }

        let Some(mut guard) = shared.bus.try_acquire() else {
            log::trace!("MPU6000: bus busy, tick skipped");
            return TickOutcome::Skipped;
        };
        let core = &mut *guard;

        let read = match core.interface.read_burst(&mut core.frame) {
            Ok(read) => read,
            Err(_) => {
                if shared.health.record_failure() {
                    log::error!(
                        "MPU6000: {} consecutive bus failures, marking unhealthy",
                        shared.health.consecutive_errors()
                    );
                }
                return TickOutcome::BusError;
            }
        };
        shared.health.record_success();

        if read.is_empty() {
            return TickOutcome::NoData;
        }

        let mut accumulated = 0;
        for index in 0..read.samples {
            let Some(raw) = core
                .frame
                .sample(read, index)
                .and_then(|bytes| RawSample::parse(bytes, core.frame.int_status))
            else {
                break;
            };

            let gyro = core.scaling.gyro(raw.gyro);
            let accel = core.scaling.accel(raw.accel);
            let (gyro, accel) = core.filter.apply(gyro, accel);
            shared.accumulator.accumulate(gyro, accel);
            accumulated += 1;
        }

        TickOutcome::Sampled(accumulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_bytes, BurstScript, FakeBus};

    fn shared(bus: FakeBus, filter: FilterStage, threshold: u16) -> Shared<FakeBus> {
        let scaling = Scaling::new(GyroRange::Dps2000, 4_096.0);
        let shared = Shared {
            bus: BusLock::new(BusCore::new(bus, filter, scaling)),
            accumulator: Accumulator::new(1),
            health: Health::new(threshold),
        };
        shared.health.mark_healthy();
        shared
    }

    #[test]
    fn parses_big_endian_block() {
        let mut bytes = sample_bytes([1, -2, 4096], [-16, 0, 300]);
        bytes[6..8].copy_from_slice(&(-521i16).to_be_bytes());
        let raw = RawSample::parse(&bytes, 0x01).expect("full block");
        assert_eq!(raw.accel, [1, -2, 4096]);
        assert_eq!(raw.temperature, -521);
        assert_eq!(raw.gyro, [-16, 0, 300]);
        assert_eq!(raw.status, 0x01);
        assert!(RawSample::parse(&bytes[..10], 0).is_none());
    }

    #[test]
    fn scaling_matches_range_sensitivity() {
        let scaling = Scaling::new(GyroRange::Dps2000, 4_096.0);
        let accel = scaling.accel([4_096, 0, -4_096]);
        assert!((accel[0] - GRAVITY_MSS).abs() < 1e-5);
        assert!((accel[2] + GRAVITY_MSS).abs() < 1e-5);

        let gyro = scaling.gyro([164, 0, 0]);
        assert!((gyro[0] - 10.0f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn identical_ticks_sum_linearly() {
        let mut bus = FakeBus::new();
        bus.default_burst = BurstScript::Sample(sample_bytes([0, 0, 4_096], [164, 0, 0]));
        let shared = shared(bus, FilterStage::PassThrough, 10);
        let mut sampler = Sampler::new(&shared, 5_000);

        for _ in 0..25 {
            assert_eq!(sampler.tick(), TickOutcome::Sampled(1));
        }

        let state = shared.accumulator.snapshot();
        assert_eq!(state.count, 25);
        assert!((state.accel_sum[2] - 25.0 * GRAVITY_MSS).abs() < 1e-3);

        let avg = shared.accumulator.drain().expect("samples");
        assert!((avg.accel[2] - GRAVITY_MSS).abs() < 1e-4);
        assert!((avg.gyro[0] - 10.0f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn empty_burst_leaves_accumulator_untouched() {
        let mut bus = FakeBus::new();
        bus.default_burst = BurstScript::Empty;
        let shared = shared(bus, FilterStage::PassThrough, 10);
        let mut sampler = Sampler::new(&shared, 5_000);

        assert_eq!(sampler.tick(), TickOutcome::NoData);
        assert_eq!(shared.accumulator.count(), 0);
        assert!(!shared.accumulator.sample_available());
        assert_eq!(shared.health.consecutive_errors(), 0);
    }

    #[test]
    fn held_lock_skips_tick_then_resumes() {
        let mut bus = FakeBus::new();
        bus.default_burst = BurstScript::Sample(sample_bytes([1, 2, 3], [4, 5, 6]));
        let shared = shared(bus, FilterStage::PassThrough, 10);
        let mut sampler = Sampler::new(&shared, 5_000);

        let guard = shared.bus.try_acquire().expect("lock free");
        assert_eq!(sampler.tick(), TickOutcome::Skipped);
        assert_eq!(shared.accumulator.count(), 0);
        drop(guard);

        assert_eq!(sampler.tick(), TickOutcome::Sampled(1));
        assert_eq!(shared.accumulator.count(), 1);
        assert_eq!(shared.bus.try_acquire().expect("lock free").interface.burst_calls, 1);
    }

    #[test]
    fn failure_streak_marks_instance_unhealthy() {
        let mut bus = FakeBus::new();
        bus.default_burst = BurstScript::Fail;
        let shared = shared(bus, FilterStage::PassThrough, 10);
        let mut sampler = Sampler::new(&shared, 5_000);

        for _ in 0..9 {
            assert_eq!(sampler.tick(), TickOutcome::BusError);
        }
        assert!(shared.health.is_healthy());
        assert_eq!(sampler.tick(), TickOutcome::BusError);
        assert!(!shared.health.is_healthy());

        shared.bus.try_acquire().expect("lock free").interface.default_burst =
            BurstScript::Sample(sample_bytes([0; 3], [0; 3]));
        assert_eq!(sampler.tick(), TickOutcome::Unhealthy);
        assert_eq!(shared.accumulator.count(), 0);
    }

    #[test]
    fn success_clears_failure_streak() {
        let mut bus = FakeBus::new();
        bus.script.extend([BurstScript::Fail, BurstScript::Fail]);
        bus.default_burst = BurstScript::Sample(sample_bytes([0; 3], [0; 3]));
        let shared = shared(bus, FilterStage::PassThrough, 3);
        let mut sampler = Sampler::new(&shared, 5_000);

        assert_eq!(sampler.tick(), TickOutcome::BusError);
        assert_eq!(sampler.tick(), TickOutcome::BusError);
        assert_eq!(shared.health.consecutive_errors(), 2);
        assert_eq!(sampler.tick(), TickOutcome::Sampled(1));
        assert_eq!(shared.health.consecutive_errors(), 0);
        assert!(shared.health.is_healthy());
    }
}
