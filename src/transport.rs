//! Raw HID transport.
//!
//! The session only needs blocking fixed-size reads and variable-size
//! writes of byte buffers, so that is the whole trait. Tests script it;
//! production uses hidapi.

use hidapi::{HidApi, HidDevice};
use tracing::info;

use crate::error::{Error, Result};

/// Byte-level transport to the controller.
pub trait Transport {
    /// Blocking read of up to `buf.len()` bytes. Returns the byte count.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write a full outbound frame. Returns the byte count written.
    fn write(&mut self, data: &[u8]) -> Result<usize>;
}

/// hidapi-backed transport. Owns the device handle exclusively for the
/// session's lifetime; the handle is released on drop.
pub struct HidTransport {
    device: HidDevice,
}

impl HidTransport {
    /// Open the first HID device matching `vendor_id:product_id`.
    pub fn open(vendor_id: u16, product_id: u16) -> Result<Self> {
        let api = HidApi::new().map_err(|e| Error::Io(e.to_string()))?;
        let device = api
            .open(vendor_id, product_id)
            .map_err(|e| Error::DeviceNotFound {
                vendor_id,
                product_id,
                reason: e.to_string(),
            })?;
        device.set_blocking_mode(true)?;
        info!("[HID] Opened controller {:04X}:{:04X}", vendor_id, product_id);
        Ok(Self { device })
    }
}

impl Transport for HidTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.device.read(buf)?)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.device.write(data)?)
    }
}
