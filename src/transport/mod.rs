pub mod common;
pub mod usb;

pub use common::UsbTransport;
pub use usb::{DeviceSelector, UsbBootDevice};
