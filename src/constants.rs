use std::time::Duration;

/// CC1800 boot ROM USB vendor ID
pub const CC1800_VENDOR_ID: u16 = 0x2009;
/// CC1800 boot ROM USB product ID
pub const CC1800_PRODUCT_ID: u16 = 0x1218;

pub const DEFAULT_CONFIGURATION: u8 = 1;
pub const DEFAULT_INTERFACE: u8 = 0;

/// Single bulk endpoint number, used in both directions
pub(crate) const BULK_ENDPOINT: u8 = 1;

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);
/// libusb takes timeouts as an unsigned int of milliseconds
pub const MAX_TIMEOUT_MS: u64 = u32::MAX as u64;

/// Size of the GET_CPU_INFO reply
pub const CPU_INFO_SIZE: usize = 8;
/// Size of the GET_STATUS reply
pub(crate) const STATUS_SIZE: usize = 1;

/// Bit 31 of the length register selects host-to-device transfers
pub(crate) const LENGTH_WRITE_FLAG: u32 = 0x8000_0000;
pub(crate) const MAX_TRANSFER_LENGTH: u32 = LENGTH_WRITE_FLAG - 1;
