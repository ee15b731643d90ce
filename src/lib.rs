//! Host-side client for the USB boot mode of the ChinaChip CC1800
//! system-on-chip.
//!
//! The boot ROM exposes five vendor control requests on its USB interface:
//! an address register, a length/direction register, a remote execute
//! trigger, a CPU identifier and an undocumented status request. Data moves
//! over bulk endpoint 1 once the address and length registers are set.
//!
//! [`Cc1800`] implements the requests and the upload/download composites,
//! [`Interpreter`] runs `write`/`read`/`exec` command sequences on top of it.

pub use command::{COMMAND_HELP, Command};
pub use error::{BootError, BootResult};
pub use interpreter::{CommandOutcome, FileStore, FsStore, Interpreter, MemoryStore, State};
pub use protocols::{Cc1800, CpuInfo, ProtocolConfig, RegisterContext, Request};
pub use transport::{DeviceSelector, UsbBootDevice, UsbTransport};

pub mod command;
pub mod constants;
pub mod error;
pub mod interpreter;
pub mod protocols;
pub mod transport;
pub(crate) mod util;

/// An opened device together with an interpreter that reads and writes
/// local files. Dropping the session closes the device.
pub struct Session {
    interpreter: Interpreter<UsbBootDevice, FsStore>,
}

impl Session {
    pub fn open(selector: &DeviceSelector, config: ProtocolConfig) -> BootResult<Self> {
        config.validate()?;
        let device = UsbBootDevice::open(selector)?;
        Ok(Session {
            interpreter: Interpreter::new(Cc1800::new(device, config)?, FsStore),
        })
    }

    pub fn progress_bar(&mut self, enable: bool) {
        self.interpreter.progress_bar(enable);
    }

    /// Run a `write`/`read`/`exec` argument sequence
    pub fn run_args<S: AsRef<str>>(&mut self, args: &[S]) -> BootResult<Vec<CommandOutcome>> {
        self.interpreter.run_args(args)
    }
}
