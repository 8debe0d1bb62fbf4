//! Error handling primitives for the MPU-6000 driver.

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error variants produced by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Any error reported by the underlying bus interface.
    Interface(E),
    /// The provided configuration parameters are invalid.
    InvalidConfig,
    /// The device has not completed bring-up yet.
    NotReady,
    /// The bus lock stayed held for a whole sampling period.
    Busy,
    /// `WHO_AM_I` returned something other than an MPU-6000; the sensor is treated as absent.
    DeviceIdMismatch(u8),
    /// A configuration register never read back the value written to it.
    RegisterVerify {
        /// Address of the register that failed verification.
        register: u8,
    },
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Interface(err)
    }
}
