//! Downsampling accumulator shared by the sampling tick and the consumer.

use core::cell::Cell;

use critical_section::Mutex;

/// Running sums of scaled samples since the last drain.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccumulatorState {
    /// Sum of gyro samples in rad/s.
    pub gyro_sum: [f32; 3],
    /// Sum of accel samples in m/s².
    pub accel_sum: [f32; 3],
    /// Number of samples summed.
    pub count: u32,
}

impl AccumulatorState {
    /// Adds one sample pair.
    pub fn add(&mut self, gyro: [f32; 3], accel: [f32; 3]) {
        for axis in 0..3 {
            self.gyro_sum[axis] += gyro[axis];
            self.accel_sum[axis] += accel[axis];
        }
        self.count = self.count.saturating_add(1);
    }

    /// Mean of the accumulated samples, if any.
    pub fn average(&self) -> Option<Averaged> {
        if self.count == 0 {
            return None;
        }

        let n = self.count as f32;
        Some(Averaged {
            gyro: self.gyro_sum.map(|v| v / n),
            accel: self.accel_sum.map(|v| v / n),
            samples: self.count,
        })
    }
}

/// Averages produced by a drain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Averaged {
    /// Mean angular rate in rad/s.
    pub gyro: [f32; 3],
    /// Mean acceleration in m/s².
    pub accel: [f32; 3],
    /// Number of native samples behind the mean.
    pub samples: u32,
}

/// Accumulator whose add and snapshot-and-reset are each one critical section.
pub struct Accumulator {
    state: Mutex<Cell<AccumulatorState>>,
    ratio: u32,
}

impl Accumulator {
    /// Creates an empty accumulator reporting availability every `ratio` samples.
    pub const fn new(ratio: u32) -> Self {
        Self {
            state: Mutex::new(Cell::new(AccumulatorState {
                gyro_sum: [0.0; 3],
                accel_sum: [0.0; 3],
                count: 0,
            })),
            ratio: if ratio == 0 { 1 } else { ratio },
        }
    }

    /// Native samples per delivered sample.
    pub fn ratio(&self) -> u32 {
        self.ratio
    }

    /// Adds one sample pair.
    pub fn accumulate(&self, gyro: [f32; 3], accel: [f32; 3]) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            state.add(gyro, accel);
            cell.set(state);
        });
    }

    /// Returns `true` once enough samples are buffered for one delivery.
    pub fn sample_available(&self) -> bool {
        self.count() >= self.ratio
    }

    /// Samples accumulated since the last drain.
    pub fn count(&self) -> u32 {
        self.snapshot().count
    }

    /// Copy of the current state without resetting it.
    pub fn snapshot(&self) -> AccumulatorState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    /// Takes the averages and zeroes the sums in one indivisible step.
    pub fn drain(&self) -> Option<Averaged> {
        let taken = critical_section::with(|cs| {
            self.state.borrow(cs).replace(AccumulatorState::default())
        });
        taken.average()
    }

    /// Discards everything accumulated so far.
    pub fn reset(&self) {
        critical_section::with(|cs| self.state.borrow(cs).set(AccumulatorState::default()));
    }
}
