//! Driver error types.
//!
//! Three fatal failure classes the binary must tell apart: the controller
//! was never found (usually unplugged or a permission problem), the
//! transport died mid-session (usually unplugged), and the factory stick
//! calibration could not be read during bring-up.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No HID device with the expected vendor/product id could be opened.
    #[error("controller {vendor_id:04X}:{product_id:04X} not found: {reason}")]
    DeviceNotFound {
        vendor_id: u16,
        product_id: u16,
        reason: String,
    },

    /// A transport read or write failed after the device was opened.
    #[error("controller I/O failed: {0}")]
    Io(String),

    /// The SPI flash read for stick calibration was never acknowledged.
    /// There is no fallback; the session cannot start without it.
    #[error("could not read stick calibration from controller flash")]
    CalibrationUnavailable,
}

impl From<hidapi::HidError> for Error {
    fn from(err: hidapi::HidError) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
