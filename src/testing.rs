//! Scripted in-memory transport for engine and facade tests.

use std::collections::VecDeque;
use std::vec::Vec;

use crate::interface::{BurstFrame, BurstRead, Mpu6000Interface};
use crate::params::BusSpeed;
use crate::registers::{
    PowerManagement1, EXPECTED_WHO_AM_I, REG_PRODUCT_ID, REG_PWR_MGMT_1, REG_WHO_AM_I,
    SENSOR_DATA_BYTES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeError;

/// What the next `read_burst` call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstScript {
    Sample([u8; SENSOR_DATA_BYTES]),
    Empty,
    Fail,
}

pub struct FakeBus {
    pub registers: [u8; 128],
    pub writes: Vec<(u8, u8)>,
    pub script: VecDeque<BurstScript>,
    pub default_burst: BurstScript,
    pub burst_calls: usize,
    /// Register that ignores writes and always reads back this value.
    pub stuck: Option<(u8, u8)>,
    pub fail_speed_changes: bool,
    pub speed: BusSpeed,
    pub speed_changes: Vec<BusSpeed>,
    pub resets: usize,
}

impl FakeBus {
    pub fn new() -> Self {
        let mut registers = [0u8; 128];
        registers[usize::from(REG_WHO_AM_I)] = EXPECTED_WHO_AM_I;
        registers[usize::from(REG_PRODUCT_ID)] = 0x58;
        registers[usize::from(REG_PWR_MGMT_1)] = 0x40;
        Self {
            registers,
            writes: Vec::new(),
            script: VecDeque::new(),
            default_burst: BurstScript::Empty,
            burst_calls: 0,
            stuck: None,
            fail_speed_changes: false,
            speed: BusSpeed::Low,
            speed_changes: Vec::new(),
            resets: 0,
        }
    }

    pub fn with_who_am_i(mut self, value: u8) -> Self {
        self.registers[usize::from(REG_WHO_AM_I)] = value;
        self
    }

    pub fn with_product_id(mut self, value: u8) -> Self {
        self.registers[usize::from(REG_PRODUCT_ID)] = value;
        self
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[usize::from(register & 0x7F)]
    }

    pub fn writes_to(&self, register: u8) -> usize {
        self.writes.iter().filter(|(reg, _)| *reg == register).count()
    }
}

impl Mpu6000Interface for FakeBus {
    type Error = FakeError;

    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Self::Error> {
        match self.stuck {
            Some((reg, value)) if reg == register => Ok(value),
            _ => Ok(self.register(register)),
        }
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.writes.push((register, value));
        if register == REG_PWR_MGMT_1 && PowerManagement1::from(value).device_reset() {
            self.resets += 1;
            self.registers[usize::from(REG_PWR_MGMT_1)] = 0x40;
            return Ok(());
        }
        self.registers[usize::from(register & 0x7F)] = value;
        Ok(())
    }

    fn set_bus_speed(&mut self, speed: BusSpeed) -> Result<(), Self::Error> {
        if self.fail_speed_changes {
            return Err(FakeError);
        }
        self.speed = speed;
        self.speed_changes.push(speed);
        Ok(())
    }

    fn read_burst(&mut self, frame: &mut BurstFrame) -> Result<BurstRead, Self::Error> {
        self.burst_calls += 1;
        match self.script.pop_front().unwrap_or(self.default_burst) {
            BurstScript::Sample(bytes) => {
                frame.int_status = 0x01;
                frame.data[..SENSOR_DATA_BYTES].copy_from_slice(&bytes);
                Ok(BurstRead::SINGLE)
            }
            BurstScript::Empty => {
                frame.int_status = 0x00;
                Ok(BurstRead::EMPTY)
            }
            BurstScript::Fail => Err(FakeError),
        }
    }
}

/// Encodes one sensor block with a zero temperature word.
pub fn sample_bytes(accel: [i16; 3], gyro: [i16; 3]) -> [u8; SENSOR_DATA_BYTES] {
    let mut bytes = [0u8; SENSOR_DATA_BYTES];
    for (axis, value) in accel.iter().enumerate() {
        bytes[2 * axis..2 * axis + 2].copy_from_slice(&value.to_be_bytes());
    }
    for (axis, value) in gyro.iter().enumerate() {
        bytes[8 + 2 * axis..10 + 2 * axis].copy_from_slice(&value.to_be_bytes());
    }
    bytes
}
