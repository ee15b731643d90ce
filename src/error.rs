use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootError {
    #[error("Cannot find device {vendor_id:04x}:{product_id:04x}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("Cannot open device: {0}")]
    DeviceOpenFailed(rusb::Error),

    #[error("Cannot configure device, {what}: {source}")]
    ConfigurationFailed {
        what: String,
        #[source]
        source: rusb::Error,
    },

    #[error("Cannot get CPU info, device stopped responding: {0}")]
    ProbeFailed(#[source] Box<BootError>),

    #[error("Short transfer: expected {expected} bytes, moved {actual}")]
    ShortTransfer { expected: usize, actual: usize },

    #[error("USB transfer timed out after {0:?}")]
    TransportTimeout(Duration),

    #[error("USB transfer failed: {0}")]
    Transport(rusb::Error),

    #[error("Data mismatch at 0x{address:08X} (first difference at offset {offset})")]
    VerificationMismatch { address: u32, offset: usize },

    #[error("File error on '{path}': {source}")]
    FileAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type BootResult<T> = std::result::Result<T, BootError>;

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn configuration_failure_keeps_usb_cause() {
        let err = BootError::ConfigurationFailed {
            what: "cannot claim interface 0".to_owned(),
            source: rusb::Error::Busy,
        };

        let cause = err
            .source()
            .and_then(|source| source.downcast_ref::<rusb::Error>());
        assert_eq!(cause, Some(&rusb::Error::Busy));
        assert!(
            err.to_string()
                .starts_with("Cannot configure device, cannot claim interface 0")
        );
    }
}
