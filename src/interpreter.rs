use std::collections::HashMap;

use indicatif::ProgressBar;
use tracing::{debug, info, trace, warn};

use crate::command::Command;
use crate::error::{BootError, BootResult};
use crate::protocols::{Cc1800, CpuInfo};
use crate::transport::UsbTransport;
use crate::util::create_progress_bar;

/// Where `write` sources come from and `read` results go
pub trait FileStore {
    fn load(&self, path: &str) -> BootResult<Vec<u8>>;
    fn save(&mut self, path: &str, data: &[u8]) -> BootResult<()>;
}

/// Files on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl FileStore for FsStore {
    fn load(&self, path: &str) -> BootResult<Vec<u8>> {
        std::fs::read(path).map_err(|source| BootError::FileAccess {
            path: path.to_owned(),
            source,
        })
    }

    fn save(&mut self, path: &str, data: &[u8]) -> BootResult<()> {
        std::fs::write(path, data).map_err(|source| BootError::FileAccess {
            path: path.to_owned(),
            source,
        })
    }
}

/// Files kept in memory, keyed by name
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    files: HashMap<String, Vec<u8>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(path.to_owned(), data);
    }

    /// Make every `save` fail with `PermissionDenied`
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }
}

impl FileStore for MemoryStore {
    fn load(&self, path: &str) -> BootResult<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| BootError::FileAccess {
                path: path.to_owned(),
                source: std::io::ErrorKind::NotFound.into(),
            })
    }

    fn save(&mut self, path: &str, data: &[u8]) -> BootResult<()> {
        if self.read_only {
            return Err(BootError::FileAccess {
                path: path.to_owned(),
                source: std::io::ErrorKind::PermissionDenied.into(),
            });
        }
        self.insert(path, data.to_vec());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    AwaitingProbe,
    Dispatching,
    Terminated,
}

/// What a completed command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// `verified` is false when the readback did not match
    Written {
        address: u32,
        length: usize,
        verified: bool,
    },
    Read {
        address: u32,
        length: usize,
        destination: String,
    },
    /// `address` is the last address this session configured, if any
    Executed { address: Option<u32> },
}

/// Runs a command sequence against one device.
///
/// Every command is preceded by a CPU info probe; a failed probe or any
/// transfer error ends the sequence. A write whose readback differs is
/// only warned about.
pub struct Interpreter<T: UsbTransport, F: FileStore> {
    client: Cc1800<T>,
    files: F,
    state: State,
    cpu_info: Option<CpuInfo>,
    progress_bar_enable: bool,
}

impl<T: UsbTransport, F: FileStore> Interpreter<T, F> {
    pub fn new(client: Cc1800<T>, files: F) -> Self {
        Interpreter {
            client,
            files,
            state: State::Idle,
            cpu_info: None,
            progress_bar_enable: false,
        }
    }

    pub fn progress_bar(&mut self, enable: bool) {
        self.progress_bar_enable = enable;
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// CPU identifier from the first successful probe
    pub fn cpu_info(&self) -> Option<CpuInfo> {
        self.cpu_info
    }

    pub fn client(&self) -> &Cc1800<T> {
        &self.client
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    fn transition(&mut self, next: State) {
        trace!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Parse `args` and run the resulting commands
    pub fn run_args<S: AsRef<str>>(&mut self, args: &[S]) -> BootResult<Vec<CommandOutcome>> {
        let commands = match Command::parse_sequence(args, &self.files) {
            Ok(commands) => commands,
            Err(e) => {
                self.transition(State::Terminated);
                return Err(e);
            }
        };
        self.run(&commands)
    }

    /// Run `commands` in order. An interpreter runs a single sequence.
    pub fn run(&mut self, commands: &[Command]) -> BootResult<Vec<CommandOutcome>> {
        if self.state != State::Idle {
            return Err(BootError::InvalidArgument(format!(
                "command sequence already ran (state {:?})",
                self.state
            )));
        }

        let pb = self
            .progress_bar_enable
            .then(|| create_progress_bar(commands.len() as u64, "Running commands"));

        let result = self.run_commands(commands, pb.as_ref());
        self.transition(State::Terminated);

        if let Some(pb) = pb {
            match result {
                Ok(_) => pb.finish_with_message("Done"),
                Err(_) => pb.abandon(),
            }
        }

        result
    }

    fn run_commands(
        &mut self,
        commands: &[Command],
        pb: Option<&ProgressBar>,
    ) -> BootResult<Vec<CommandOutcome>> {
        let mut outcomes = Vec::with_capacity(commands.len());

        for command in commands {
            self.transition(State::AwaitingProbe);
            self.probe()?;

            self.transition(State::Dispatching);
            debug!("Running '{}'", command);
            if let Some(pb) = pb {
                pb.set_message(command.to_string());
            }

            outcomes.push(self.dispatch(command)?);

            if let Some(pb) = pb {
                pb.inc(1);
            }
        }

        Ok(outcomes)
    }

    fn probe(&mut self) -> BootResult<()> {
        let info = self
            .client
            .get_cpu_info()
            .map_err(|e| BootError::ProbeFailed(Box::new(e)))?;

        if self.cpu_info.is_none() {
            info!("CPU info: {}", info);
            self.cpu_info = Some(info);
        } else {
            trace!("Device alive ({})", info);
        }

        Ok(())
    }

    fn dispatch(&mut self, command: &Command) -> BootResult<CommandOutcome> {
        match command {
            Command::Write { address, data, .. } => {
                info!("Uploading data to address 0x{:08X}", address);
                self.client.upload(data, *address)?;

                info!("Downloading data for verification");
                let verified = match self.client.verify(data, *address) {
                    Ok(()) => true,
                    Err(e @ BootError::VerificationMismatch { .. }) => {
                        warn!("{}", e);
                        false
                    }
                    Err(e) => return Err(e),
                };

                Ok(CommandOutcome::Written {
                    address: *address,
                    length: data.len(),
                    verified,
                })
            }
            Command::Read {
                address,
                length,
                destination,
            } => {
                info!("Downloading data from address 0x{:08X}", address);
                let data = self.client.download(*length as usize, *address)?;
                self.files.save(destination, &data)?;
                info!("Saved {} bytes to '{}'", data.len(), destination);

                Ok(CommandOutcome::Read {
                    address: *address,
                    length: data.len(),
                    destination: destination.clone(),
                })
            }
            Command::Exec => {
                let address = self.client.registers().address();
                match address {
                    Some(address) => info!("Executing at last address (0x{:08X})", address),
                    None => warn!(
                        "No address set in this session, executing at device retained address"
                    ),
                }
                self.client.execute()?;

                Ok(CommandOutcome::Executed { address })
            }
        }
    }
}
