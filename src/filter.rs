//! Two-pole low-pass filtering for fast-sampling platforms.
//!
//! [`LowPassFilter2p`] is a second-order Butterworth section in direct form I.
//! A cutoff change carries the memory over by re-seating every axis at its last
//! output. The first output under the new coefficients then moves from the old
//! output by at most `b0` times the remaining distance to the input, which is one
//! tick of the new filter's step response.

use core::f32::consts::{FRAC_PI_4, PI};

use crate::params::SamplingMode;

/// Biquad coefficients normalised so that `a0 == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoefficients {
    /// Butterworth low-pass section, or `None` when the cutoff disables filtering.
    pub fn low_pass(sample_hz: f32, cutoff_hz: f32) -> Option<Self> {
        if cutoff_hz <= 0.0 || sample_hz <= 0.0 || cutoff_hz * 2.0 >= sample_hz {
            return None;
        }

        let ohm = libm::tanf(PI * cutoff_hz / sample_hz);
        let ohm2 = ohm * ohm;
        let q = 2.0 * libm::cosf(FRAC_PI_4) * ohm;
        let c = 1.0 + q + ohm2;

        let b0 = ohm2 / c;
        Some(Self {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (ohm2 - 1.0) / c,
            a2: (1.0 - q + ohm2) / c,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct AxisMemory {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl AxisMemory {
    fn settle_at(&mut self, value: f32) {
        *self = Self {
            x1: value,
            x2: value,
            y1: value,
            y2: value,
        };
    }

    fn carry_over(&mut self) {
        let last = self.y1;
        self.settle_at(last);
    }

    fn apply(&mut self, k: &BiquadCoefficients, x0: f32) -> f32 {
        let y0 = k.b0 * x0 + k.b1 * self.x1 + k.b2 * self.x2 - k.a1 * self.y1 - k.a2 * self.y2;
        if !y0.is_finite() {
            self.settle_at(x0);
            return x0;
        }
        self.x2 = self.x1;
        self.x1 = x0;
        self.y2 = self.y1;
        self.y1 = y0;
        y0
    }
}

/// Independent two-pole low-pass filter on each axis of a 3-vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LowPassFilter2p {
    sample_hz: f32,
    cutoff_hz: f32,
    coefficients: Option<BiquadCoefficients>,
    memory: [AxisMemory; 3],
    primed: bool,
}

impl LowPassFilter2p {
    /// Creates a filter for `sample_hz` with the given cutoff.
    pub fn new(sample_hz: f32, cutoff_hz: f32) -> Self {
        Self {
            sample_hz,
            cutoff_hz,
            coefficients: BiquadCoefficients::low_pass(sample_hz, cutoff_hz),
            memory: [AxisMemory::default(); 3],
            primed: false,
        }
    }

    /// Cutoff the current coefficients were derived from.
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Updates the cutoff, recomputing coefficients only if it changed.
    ///
    /// The memory is carried over at the last output, never cleared. Returns `true`
    /// when coefficients were recomputed.
    pub fn set_cutoff_frequency(&mut self, cutoff_hz: f32) -> bool {
        if cutoff_hz == self.cutoff_hz {
            return false;
        }
        self.cutoff_hz = cutoff_hz;
        self.coefficients = BiquadCoefficients::low_pass(self.sample_hz, cutoff_hz);
        if self.primed {
            self.memory.iter_mut().for_each(AxisMemory::carry_over);
        }
        true
    }

    /// Filters one sample.
    pub fn apply(&mut self, sample: [f32; 3]) -> [f32; 3] {
        // Start from the first reading instead of ringing up from zero.
        if !self.primed {
            for (memory, value) in self.memory.iter_mut().zip(sample) {
                memory.settle_at(value);
            }
            self.primed = true;
        }

        let Some(k) = self.coefficients else {
            for (memory, value) in self.memory.iter_mut().zip(sample) {
                memory.settle_at(value);
            }
            return sample;
        };

        let mut out = [0.0; 3];
        for axis in 0..3 {
            out[axis] = self.memory[axis].apply(&k, sample[axis]);
        }
        out
    }

    /// Clears the filter memory; the next sample primes it again.
    pub fn reset(&mut self) {
        self.memory = [AxisMemory::default(); 3];
        self.primed = false;
    }
}

/// Filtering strategy selected from the platform's [`SamplingMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterStage {
    /// Software two-pole filter on gyro and accel.
    TwoPole {
        /// Gyro filter.
        gyro: LowPassFilter2p,
        /// Accel filter.
        accel: LowPassFilter2p,
    },
    /// Samples are accumulated unfiltered.
    PassThrough,
}

impl FilterStage {
    /// Builds the stage matching `mode` with the given initial cutoff.
    pub fn for_mode(mode: SamplingMode, cutoff_hz: u16) -> Self {
        match mode {
            SamplingMode::Fast => {
                let rate = f32::from(mode.native_rate_hz());
                let cutoff = f32::from(cutoff_hz);
                Self::TwoPole {
                    gyro: LowPassFilter2p::new(rate, cutoff),
                    accel: LowPassFilter2p::new(rate, cutoff),
                }
            }
            SamplingMode::Divided => Self::PassThrough,
        }
    }

    /// Returns `true` when a software filter is in the signal path.
    pub fn is_software(&self) -> bool {
        matches!(self, Self::TwoPole { .. })
    }

    /// Runs one gyro/accel pair through the stage.
    pub fn apply(&mut self, gyro: [f32; 3], accel: [f32; 3]) -> ([f32; 3], [f32; 3]) {
        match self {
            Self::TwoPole {
                gyro: gyro_filter,
                accel: accel_filter,
            } => (gyro_filter.apply(gyro), accel_filter.apply(accel)),
            Self::PassThrough => (gyro, accel),
        }
    }

    /// Changes the software cutoff; returns `true` if coefficients were recomputed.
    pub fn set_cutoff(&mut self, cutoff_hz: u16) -> bool {
        match self {
            Self::TwoPole { gyro, accel } => {
                let cutoff = f32::from(cutoff_hz);
                let gyro_changed = gyro.set_cutoff_frequency(cutoff);
                let accel_changed = accel.set_cutoff_frequency(cutoff);
                gyro_changed || accel_changed
            }
            Self::PassThrough => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &mut LowPassFilter2p, value: [f32; 3], ticks: usize) -> [f32; 3] {
        let mut out = [0.0; 3];
        for _ in 0..ticks {
            out = filter.apply(value);
        }
        out
    }

    #[test]
    fn settles_on_constant_input() {
        let mut filter = LowPassFilter2p::new(1_000.0, 20.0);
        filter.apply([0.0; 3]);
        let out = run(&mut filter, [1.0, -2.0, 9.8], 500);
        assert!((out[0] - 1.0).abs() < 1e-3);
        assert!((out[1] + 2.0).abs() < 1e-3);
        assert!((out[2] - 9.8).abs() < 1e-3);
    }

    #[test]
    fn attenuates_content_above_cutoff() {
        let mut filter = LowPassFilter2p::new(1_000.0, 20.0);
        let mut peak = 0.0f32;
        for n in 0..2_000 {
            // 250 Hz tone, well above the cutoff.
            let x = libm::sinf(2.0 * PI * 250.0 * n as f32 / 1_000.0);
            let y = filter.apply([x, 0.0, 0.0])[0];
            if n > 1_000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.02, "peak {peak}");
    }

    #[test]
    fn repeating_cutoff_does_not_recompute() {
        let mut filter = LowPassFilter2p::new(1_000.0, 20.0);
        assert!(!filter.set_cutoff_frequency(20.0));
        assert!(filter.set_cutoff_frequency(40.0));
        assert!(!filter.set_cutoff_frequency(40.0));
        assert_eq!(filter.cutoff_hz(), 40.0);
    }

    fn jump_bound(cutoff_hz: f32, input: f32, last: f32) -> f32 {
        let k = BiquadCoefficients::low_pass(1_000.0, cutoff_hz).expect("valid cutoff");
        k.b0 * (input - last).abs() + 1e-5
    }

    #[test]
    fn cutoff_change_mid_step_moves_one_tick() {
        for (from, to) in [(20.0, 200.0), (200.0, 20.0), (20.0, 60.0), (60.0, 5.0)] {
            let mut filter = LowPassFilter2p::new(1_000.0, from);
            filter.apply([0.0; 3]);
            let last = run(&mut filter, [1.0; 3], 10);

            assert!(filter.set_cutoff_frequency(to));
            let next = filter.apply([1.0; 3]);

            for axis in 0..3 {
                let jump = (next[axis] - last[axis]).abs();
                let bound = jump_bound(to, 1.0, last[axis]);
                assert!(jump <= bound, "{from}->{to} Hz: jump {jump} > {bound}");
            }
        }
    }

    #[test]
    fn cutoff_change_mid_ramp_moves_one_tick() {
        let mut filter = LowPassFilter2p::new(1_000.0, 20.0);
        let mut last = [0.0; 3];
        for n in 0..30 {
            last = filter.apply([n as f32 * 0.1; 3]);
        }

        assert!(filter.set_cutoff_frequency(150.0));
        let input = 3.0;
        let next = filter.apply([input; 3]);
        let jump = (next[0] - last[0]).abs();
        assert!(jump <= jump_bound(150.0, input, last[0]), "jump {jump}");
        assert!(next[0] > last[0] && next[0] < input);
    }

    #[test]
    fn cutoff_change_at_steady_state_is_seamless() {
        let mut filter = LowPassFilter2p::new(1_000.0, 20.0);
        let before = run(&mut filter, [3.0; 3], 500);

        assert!(filter.set_cutoff_frequency(60.0));
        let after = filter.apply([3.0; 3]);

        for axis in 0..3 {
            assert!((after[axis] - before[axis]).abs() < 1e-3);
        }
    }

    #[test]
    fn zero_cutoff_passes_samples_through() {
        let mut filter = LowPassFilter2p::new(1_000.0, 0.0);
        assert_eq!(filter.apply([1.0, 2.0, 3.0]), [1.0, 2.0, 3.0]);
        assert_eq!(filter.apply([4.0, 5.0, 6.0]), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn non_finite_output_resets_memory() {
        let mut filter = LowPassFilter2p::new(1_000.0, 20.0);
        filter.apply([1.0; 3]);
        let out = filter.apply([f32::INFINITY, 1.0, 1.0]);
        assert_eq!(out[0], f32::INFINITY);
        let recovered = filter.apply([1.0; 3]);
        assert_eq!(recovered[0], 1.0);
        assert!(recovered[1].is_finite());
    }

    #[test]
    fn stage_follows_sampling_mode() {
        let mut fast = FilterStage::for_mode(SamplingMode::Fast, 20);
        assert!(fast.is_software());
        assert!(!fast.set_cutoff(20));
        assert!(fast.set_cutoff(30));

        let mut divided = FilterStage::for_mode(SamplingMode::Divided, 20);
        assert!(!divided.is_software());
        assert_eq!(divided.apply([1.0; 3], [2.0; 3]), ([1.0; 3], [2.0; 3]));
        assert!(!divided.set_cutoff(30));
    }
}
