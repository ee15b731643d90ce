use std::time::Duration;

use crate::error::BootResult;

/// Blocking USB primitives the boot protocol is built on.
///
/// Control requests are always vendor requests addressed to the device.
/// Every call returns the number of bytes actually moved; deciding whether
/// a short count is an error is left to the caller.
pub trait UsbTransport {
    /// Vendor control request with a device-to-host data phase
    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> BootResult<usize>;

    /// Vendor control request with a host-to-device (possibly empty) data phase
    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> BootResult<usize>;

    /// Bulk read from the IN side of `endpoint`
    fn bulk_in(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> BootResult<usize>;

    /// Bulk write to the OUT side of `endpoint`
    fn bulk_out(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> BootResult<usize>;
}
