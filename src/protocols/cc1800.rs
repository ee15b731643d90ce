use std::fmt;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::constants::{
    BULK_ENDPOINT, CPU_INFO_SIZE, DEFAULT_TIMEOUT, LENGTH_WRITE_FLAG, MAX_TIMEOUT_MS,
    MAX_TRANSFER_LENGTH, STATUS_SIZE,
};
use crate::error::{BootError, BootResult};
use crate::transport::UsbTransport;

/// CC1800 boot ROM vendor requests
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    GetCpuInfo = 0x00,
    SetAddress = 0x01,
    SetLength = 0x02,
    GetStatus = 0x03,
    Execute = 0x04,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Applied to every control and bulk transfer
    pub timeout: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProtocolConfig {
    /// Check the timeout is a bounded libusb timeout. libusb takes whole
    /// milliseconds as an unsigned int and treats 0 as "wait forever".
    pub fn validate(&self) -> BootResult<()> {
        let millis = self.timeout.as_millis();
        if millis == 0 || millis > MAX_TIMEOUT_MS as u128 {
            return Err(BootError::InvalidArgument(format!(
                "timeout must be between 1 and {} ms, got {:?}",
                MAX_TIMEOUT_MS, self.timeout
            )));
        }
        Ok(())
    }
}

/// Split a 32 bit register value into the (value, index) halves of a setup packet
pub fn split_u32(value: u32) -> (u16, u16) {
    (((value >> 16) & 0xFFFF) as u16, (value & 0xFFFF) as u16)
}

pub fn join_u32(high: u16, low: u16) -> u32 {
    ((high as u32) << 16) | low as u32
}

/// Length register word: magnitude in bits 0..31, write direction in bit 31
pub fn length_word(len: u32, is_write: bool) -> u32 {
    if is_write {
        len | LENGTH_WRITE_FLAG
    } else {
        len & !LENGTH_WRITE_FLAG
    }
}

/// Inverse of [`length_word`], returns (magnitude, is_write)
pub fn decode_length_word(word: u32) -> (u32, bool) {
    (word & !LENGTH_WRITE_FLAG, word & LENGTH_WRITE_FLAG != 0)
}

/// Identifier returned by GET_CPU_INFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuInfo(pub [u8; CPU_INFO_SIZE]);

impl fmt::Display for CpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(CPU_INFO_SIZE);
        write!(f, "{}", String::from_utf8_lossy(&self.0[..end]))
    }
}

/// Host-side mirror of the boot ROM's address and length registers.
///
/// The device keeps these registers between requests and never reports
/// them back, so this only records what the client last wrote. A length
/// write "arms" the next bulk transfer; any other control request in
/// between disarms it and the device state is no longer what the
/// transfer expects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegisterContext {
    address: Option<u32>,
    length: Option<u32>,
    armed: bool,
}

impl RegisterContext {
    /// Last address written with SET_ADDRESS in this session
    pub fn address(&self) -> Option<u32> {
        self.address
    }

    /// Last raw length word (direction flag included) written with SET_LENGTH
    pub fn length_word(&self) -> Option<u32> {
        self.length
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn set_address(&mut self, address: u32) {
        self.address = Some(address);
    }

    fn set_length(&mut self, word: u32) {
        self.length = Some(word);
        self.armed = true;
    }

    fn disarm(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }
}

/// Client for the CC1800 USB boot mode protocol.
///
/// Requests are strictly serial; each composite operation issues its
/// primitives as one uninterrupted sequence starting from SET_ADDRESS.
pub struct Cc1800<T: UsbTransport> {
    transport: T,
    config: ProtocolConfig,
    registers: RegisterContext,
}

impl<T: UsbTransport> Cc1800<T> {
    pub fn new(transport: T, config: ProtocolConfig) -> BootResult<Self> {
        config.validate()?;
        Ok(Cc1800 {
            transport,
            config,
            registers: RegisterContext::default(),
        })
    }

    pub fn registers(&self) -> &RegisterContext {
        &self.registers
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn control_in(&mut self, request: Request, buf: &mut [u8]) -> BootResult<usize> {
        if self.registers.disarm() {
            warn!("{:?} issued between SET_LENGTH and its transfer", request);
        }
        trace!("Control IN {:?} ({} bytes)", request, buf.len());
        self.transport
            .control_in(request as u8, 0, 0, buf, self.config.timeout)
    }

    fn control_out(&mut self, request: Request, value: u32) -> BootResult<()> {
        if self.registers.disarm() {
            warn!("{:?} issued between SET_LENGTH and its transfer", request);
        }
        let (high, low) = split_u32(value);
        trace!("Control OUT {:?} (0x{:04X}, 0x{:04X})", request, high, low);
        self.transport
            .control_out(request as u8, high, low, &[], self.config.timeout)?;
        Ok(())
    }

    /// Read the CPU identifier. Used as a liveness probe.
    pub fn get_cpu_info(&mut self) -> BootResult<CpuInfo> {
        // Replies shorter than the full identifier are zero padded
        let mut info = [0u8; CPU_INFO_SIZE];
        let received = self.control_in(Request::GetCpuInfo, &mut info)?;
        if received < CPU_INFO_SIZE {
            debug!("CPU info reply was {} bytes", received);
        }
        Ok(CpuInfo(info))
    }

    pub fn set_address(&mut self, address: u32) -> BootResult<()> {
        self.control_out(Request::SetAddress, address)?;
        self.registers.set_address(address);
        Ok(())
    }

    /// Set transfer length and direction. Must be followed directly by the
    /// matching bulk transfer.
    pub fn set_length(&mut self, len: u32, is_write: bool) -> BootResult<()> {
        let word = length_word(len, is_write);
        self.control_out(Request::SetLength, word)?;
        self.registers.set_length(word);
        Ok(())
    }

    /// GET_STATUS. What the boot ROM does on this request is not known
    /// (it has been seen to start the NAND boot path); the raw status byte
    /// is returned without interpretation.
    pub fn get_status(&mut self) -> BootResult<u8> {
        let mut status = [0u8; STATUS_SIZE];
        let received = self.control_in(Request::GetStatus, &mut status)?;
        if received < STATUS_SIZE {
            return Err(BootError::ShortTransfer {
                expected: STATUS_SIZE,
                actual: received,
            });
        }
        Ok(status[0])
    }

    /// Start executing at the address the device last received via SET_ADDRESS
    pub fn execute(&mut self) -> BootResult<()> {
        match self.registers.address() {
            Some(address) => debug!("Execute at 0x{:08X}", address),
            None => debug!("Execute at device retained address"),
        }
        self.control_out(Request::Execute, 0)
    }

    fn checked_length(len: usize) -> BootResult<u32> {
        u32::try_from(len)
            .ok()
            .filter(|&len| len <= MAX_TRANSFER_LENGTH)
            .ok_or_else(|| {
                BootError::InvalidArgument(format!(
                    "transfer of {} bytes exceeds the {} byte limit",
                    len, MAX_TRANSFER_LENGTH
                ))
            })
    }

    /// Write `data` to device memory at `address`. Returns the number of
    /// bytes moved, which always equals `data.len()`.
    pub fn upload(&mut self, data: &[u8], address: u32) -> BootResult<usize> {
        let len = Self::checked_length(data.len())?;

        self.set_address(address)?;
        self.set_length(len, true)?;
        self.registers.disarm();

        let written = self
            .transport
            .bulk_out(BULK_ENDPOINT, data, self.config.timeout)?;
        trace!("Bulk OUT {} of {} bytes", written, data.len());
        if written < data.len() {
            return Err(BootError::ShortTransfer {
                expected: data.len(),
                actual: written,
            });
        }

        Ok(written)
    }

    /// Read `length` bytes of device memory starting at `address`
    pub fn download(&mut self, length: usize, address: u32) -> BootResult<Vec<u8>> {
        let len = Self::checked_length(length)?;

        self.set_address(address)?;
        self.set_length(len, false)?;
        self.registers.disarm();

        let mut buffer = vec![0u8; length];
        let read = self
            .transport
            .bulk_in(BULK_ENDPOINT, &mut buffer, self.config.timeout)?;
        trace!("Bulk IN {} of {} bytes", read, length);
        if read < length {
            return Err(BootError::ShortTransfer {
                expected: length,
                actual: read,
            });
        }

        Ok(buffer)
    }

    /// Read back `expected.len()` bytes from `address` and compare
    pub fn verify(&mut self, expected: &[u8], address: u32) -> BootResult<()> {
        let readback = self.download(expected.len(), address)?;
        match expected.iter().zip(&readback).position(|(a, b)| a != b) {
            Some(offset) => Err(BootError::VerificationMismatch { address, offset }),
            None => Ok(()),
        }
    }

    /// Upload, read back and compare, then execute. Nothing is executed
    /// unless the readback matches.
    pub fn upload_verify_execute(&mut self, data: &[u8], address: u32) -> BootResult<()> {
        info!("Uploading {} bytes to 0x{:08X} for execution", data.len(), address);
        self.upload(data, address)?;
        self.verify(data, address)?;
        // The readback re-set the address register to the same value
        self.execute()
    }
}
