use std::time::Duration;

use rusb::{Context, DeviceHandle, Direction, Recipient, RequestType, UsbContext};
use tracing::{debug, info, trace, warn};

use super::UsbTransport;
use crate::constants::{
    CC1800_PRODUCT_ID, CC1800_VENDOR_ID, DEFAULT_CONFIGURATION, DEFAULT_INTERFACE,
};
use crate::error::{BootError, BootResult};

/// Which USB device to talk to and how to bring up its boot interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSelector {
    pub vendor_id: u16,
    pub product_id: u16,
    pub configuration: u8,
    pub interface: u8,
}

impl DeviceSelector {
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    /// Index of the first matching `(vendor_id, product_id)` pair. Devices
    /// whose descriptor could not be read are passed as `None`.
    pub fn find<I>(&self, ids: I) -> BootResult<usize>
    where
        I: IntoIterator<Item = Option<(u16, u16)>>,
    {
        ids.into_iter()
            .position(|id| id.is_some_and(|(vid, pid)| self.matches(vid, pid)))
            .ok_or(BootError::DeviceNotFound {
                vendor_id: self.vendor_id,
                product_id: self.product_id,
            })
    }
}

impl Default for DeviceSelector {
    fn default() -> Self {
        DeviceSelector {
            vendor_id: CC1800_VENDOR_ID,
            product_id: CC1800_PRODUCT_ID,
            configuration: DEFAULT_CONFIGURATION,
            interface: DEFAULT_INTERFACE,
        }
    }
}

/// An opened boot mode device with its interface claimed.
///
/// The interface is released and the handle closed when this is dropped.
pub struct UsbBootDevice {
    handle: DeviceHandle<Context>,
    interface: u8,
}

impl UsbBootDevice {
    /// Find the first device matching `selector`, open it, select the
    /// configuration and claim the interface
    pub fn open(selector: &DeviceSelector) -> BootResult<UsbBootDevice> {
        let context = Context::new().map_err(BootError::Transport)?;
        let devices = context.devices().map_err(BootError::Transport)?;

        let devices: Vec<_> = devices.iter().collect();

        let ids = devices.iter().map(|device| match device.device_descriptor() {
            Ok(desc) => Some((desc.vendor_id(), desc.product_id())),
            Err(e) => {
                trace!("Skipping device without descriptor: {}", e);
                None
            }
        });
        let device = &devices[selector.find(ids)?];

        info!(
            "Found device {:03} at bus {:03}",
            device.address(),
            device.bus_number()
        );

        let mut handle = device.open().map_err(BootError::DeviceOpenFailed)?;

        handle
            .set_active_configuration(selector.configuration)
            .map_err(|source| BootError::ConfigurationFailed {
                what: format!("cannot set configuration {}", selector.configuration),
                source,
            })?;
        handle
            .claim_interface(selector.interface)
            .map_err(|source| BootError::ConfigurationFailed {
                what: format!("cannot claim interface {}", selector.interface),
                source,
            })?;
        debug!("Claimed interface {}", selector.interface);

        Ok(UsbBootDevice {
            handle,
            interface: selector.interface,
        })
    }
}

impl Drop for UsbBootDevice {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            warn!("Failed to release interface {}: {}", self.interface, e);
        }
        debug!("Closed device");
    }
}

fn transfer_error(e: rusb::Error, timeout: Duration) -> BootError {
    match e {
        rusb::Error::Timeout => BootError::TransportTimeout(timeout),
        other => BootError::Transport(other),
    }
}

fn vendor_request_type(direction: Direction) -> u8 {
    rusb::request_type(direction, RequestType::Vendor, Recipient::Device)
}

impl UsbTransport for UsbBootDevice {
    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> BootResult<usize> {
        self.handle
            .read_control(
                vendor_request_type(Direction::In),
                request,
                value,
                index,
                buf,
                timeout,
            )
            .map_err(|e| transfer_error(e, timeout))
    }

    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> BootResult<usize> {
        self.handle
            .write_control(
                vendor_request_type(Direction::Out),
                request,
                value,
                index,
                data,
                timeout,
            )
            .map_err(|e| transfer_error(e, timeout))
    }

    fn bulk_in(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> BootResult<usize> {
        // IN endpoint addresses carry the direction bit
        self.handle
            .read_bulk(endpoint | 0x80, buf, timeout)
            .map_err(|e| transfer_error(e, timeout))
    }

    fn bulk_out(&mut self, endpoint: u8, data: &[u8], timeout: Duration) -> BootResult<usize> {
        self.handle
            .write_bulk(endpoint & 0x7F, data, timeout)
            .map_err(|e| transfer_error(e, timeout))
    }
}
