use std::fmt;

use tracing::info;

use crate::error::{BootError, BootResult};
use crate::interpreter::FileStore;

/// Usage text for the command vocabulary
pub const COMMAND_HELP: &str = "\
Use any number of consecutive commands as arguments:
    write <address> <file>
    read <address> <length> <file>
    exec";

/// One step of a boot session, parsed from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload `data` (loaded from `source`) to `address` and read it back
    Write {
        address: u32,
        source: String,
        data: Vec<u8>,
    },
    /// Download `length` bytes from `address` and save them as `destination`
    Read {
        address: u32,
        length: u32,
        destination: String,
    },
    /// Execute at whatever address the device last had configured
    Exec,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Write {
                address, source, ..
            } => write!(f, "write 0x{:08X} {}", address, source),
            Command::Read {
                address,
                length,
                destination,
            } => write!(f, "read 0x{:08X} {} {}", address, length, destination),
            Command::Exec => write!(f, "exec"),
        }
    }
}

/// Parse a 32 bit value, hexadecimal with a `0x` prefix, decimal otherwise
pub fn parse_u32(literal: &str) -> BootResult<u32> {
    let bad_value = |reason: String| {
        BootError::InvalidArgument(format!("bad value '{}': {}", literal, reason))
    };

    let (digits, radix) = match literal
        .strip_prefix("0x")
        .or_else(|| literal.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (literal, 10),
    };
    // from_str_radix accepts a leading sign
    if digits.starts_with(['+', '-']) {
        return Err(bad_value("unexpected sign".to_owned()));
    }

    u32::from_str_radix(digits, radix).map_err(|e| bad_value(e.to_string()))
}

fn take_args<'a>(
    name: &str,
    usage: &str,
    args: &mut impl Iterator<Item = &'a str>,
    count: usize,
) -> BootResult<Vec<&'a str>> {
    let taken: Vec<&str> = args.take(count).collect();
    if taken.len() < count {
        return Err(BootError::InvalidArgument(format!(
            "{} command requires {} arguments ({})",
            name, count, usage
        )));
    }
    Ok(taken)
}

impl Command {
    /// Parse a whole argument sequence. Write sources are loaded through
    /// `files` so that every file error surfaces before the device is touched.
    pub fn parse_sequence<S: AsRef<str>>(
        args: &[S],
        files: &impl FileStore,
    ) -> BootResult<Vec<Command>> {
        let mut args = args.iter().map(S::as_ref);
        let mut commands = Vec::new();

        while let Some(word) = args.next() {
            let command = match word {
                "write" => {
                    let taken = take_args("write", "address and file name", &mut args, 2)?;
                    let address = parse_u32(taken[0])?;
                    let data = files.load(taken[1])?;
                    info!("Loaded file '{}' ({} bytes)", taken[1], data.len());
                    Command::Write {
                        address,
                        source: taken[1].to_owned(),
                        data,
                    }
                }
                "read" => {
                    let taken =
                        take_args("read", "address, length and file name", &mut args, 3)?;
                    Command::Read {
                        address: parse_u32(taken[0])?,
                        length: parse_u32(taken[1])?,
                        destination: taken[2].to_owned(),
                    }
                }
                "exec" => Command::Exec,
                other => return Err(BootError::UnknownCommand(other.to_owned())),
            };
            commands.push(command);
        }

        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::MemoryStore;

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!(parse_u32("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_u32("0XfF").unwrap(), 0xFF);
        assert_eq!(parse_u32("64").unwrap(), 64);
        assert_eq!(parse_u32("0xFFFFFFFF").unwrap(), u32::MAX);
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in [
            "", "0x", "12ab", "0x1g", "-1", "+1", "0x+1", "0x-1", "0x100000000", "4294967296",
        ] {
            assert!(
                matches!(parse_u32(bad), Err(BootError::InvalidArgument(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn parses_chained_commands_in_order() {
        let mut files = MemoryStore::default();
        files.insert("a.bin", vec![1, 2, 3]);

        let args = [
            "write", "0x0", "a.bin", "read", "0x2000", "64", "out.bin", "exec",
        ];
        let commands = Command::parse_sequence(&args, &files).unwrap();

        assert_eq!(
            commands,
            vec![
                Command::Write {
                    address: 0,
                    source: "a.bin".into(),
                    data: vec![1, 2, 3],
                },
                Command::Read {
                    address: 0x2000,
                    length: 64,
                    destination: "out.bin".into(),
                },
                Command::Exec,
            ]
        );
    }

    #[test]
    fn unknown_command_is_reported_by_name() {
        let files = MemoryStore::default();
        let err = Command::parse_sequence(&["exec", "flash"], &files).unwrap_err();
        assert!(matches!(err, BootError::UnknownCommand(name) if name == "flash"));
    }

    #[test]
    fn missing_arguments_are_invalid() {
        let files = MemoryStore::default();
        assert!(matches!(
            Command::parse_sequence(&["write", "0x0"], &files),
            Err(BootError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::parse_sequence(&["read", "0x0", "16"], &files),
            Err(BootError::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_source_file_is_a_file_error() {
        let files = MemoryStore::default();
        assert!(matches!(
            Command::parse_sequence(&["write", "0x0", "nope.bin"], &files),
            Err(BootError::FileAccess { .. })
        ));
    }
}
