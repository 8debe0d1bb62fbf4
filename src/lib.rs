#![cfg_attr(not(test), no_std)]

mod log;

mod error;

pub mod accumulator;
pub mod config;
pub mod configurator;
pub mod device;
pub mod filter;
pub mod interface;
pub mod lock;
pub mod params;
pub mod registers;
pub mod sampler;

#[cfg(test)]
mod testing;

pub use crate::config::{Config, ConfigBuilder, ConfigError};
pub use crate::device::{Mpu6000, Reader};
pub use crate::error::{Error, Result};
pub use crate::interface::i2c::I2cInterface;
pub use crate::interface::spi::SpiInterface;
pub use crate::interface::{Mpu6000Interface, TransportError};
pub use crate::sampler::{Sampler, TickOutcome};
