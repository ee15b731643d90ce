#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use ccboot::{BootError, BootResult, Cc1800, ProtocolConfig, UsbTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CpuInfo,
    SetAddress { high: u16, low: u16 },
    SetLength { high: u16, low: u16 },
    Status,
    Execute { address: u32 },
    BulkOut { endpoint: u8, len: usize },
    BulkIn { endpoint: u8, len: usize },
}

/// State of the simulated boot ROM, shared with the test after the
/// transport has been moved into the client
#[derive(Debug, Default)]
pub struct DeviceState {
    pub address: u32,
    pub length_word: u32,
    pub memory: BTreeMap<u32, u8>,
    pub events: Vec<Event>,
    pub probes: usize,
    /// Probes beyond this count fail with NoDevice
    pub probe_limit: Option<usize>,
    /// XOR applied to the first byte of every bulk read
    pub corrupt_reads: Option<u8>,
    /// Bytes silently dropped from every bulk transfer
    pub short_by: usize,
    pub closed: usize,
}

impl DeviceState {
    pub fn read_memory(&self, address: u32, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| {
                let at = address.wrapping_add(i as u32);
                self.memory.get(&at).copied().unwrap_or(0)
            })
            .collect()
    }

    pub fn fill(&mut self, address: u32, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.memory.insert(address.wrapping_add(i as u32), *byte);
        }
    }

    /// Events other than liveness probes
    pub fn transfers(&self) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| **e != Event::CpuInfo)
            .cloned()
            .collect()
    }
}

pub struct SimDevice {
    pub state: Rc<RefCell<DeviceState>>,
}

impl SimDevice {
    pub fn new() -> (SimDevice, Rc<RefCell<DeviceState>>) {
        let state = Rc::new(RefCell::new(DeviceState::default()));
        (
            SimDevice {
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl Drop for SimDevice {
    fn drop(&mut self) {
        self.state.borrow_mut().closed += 1;
    }
}

impl UsbTransport for SimDevice {
    fn control_in(
        &mut self,
        request: u8,
        _value: u16,
        _index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> BootResult<usize> {
        let mut state = self.state.borrow_mut();
        match request {
            0x00 => {
                state.probes += 1;
                if state.probe_limit.is_some_and(|limit| state.probes > limit) {
                    return Err(BootError::Transport(rusb::Error::NoDevice));
                }
                state.events.push(Event::CpuInfo);
                let info = b"CC1800\0\0";
                buf.copy_from_slice(&info[..buf.len()]);
                Ok(buf.len())
            }
            0x03 => {
                state.events.push(Event::Status);
                buf[0] = 0;
                Ok(1)
            }
            _ => Err(BootError::Transport(rusb::Error::Pipe)),
        }
    }

    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        _data: &[u8],
        _timeout: Duration,
    ) -> BootResult<usize> {
        let mut state = self.state.borrow_mut();
        let word = ((value as u32) << 16) | index as u32;
        match request {
            0x01 => {
                state.address = word;
                state.events.push(Event::SetAddress {
                    high: value,
                    low: index,
                });
            }
            0x02 => {
                state.length_word = word;
                state.events.push(Event::SetLength {
                    high: value,
                    low: index,
                });
            }
            0x04 => {
                let address = state.address;
                state.events.push(Event::Execute { address });
            }
            _ => return Err(BootError::Transport(rusb::Error::Pipe)),
        }
        Ok(0)
    }

    fn bulk_in(&mut self, endpoint: u8, buf: &mut [u8], _timeout: Duration) -> BootResult<usize> {
        let mut state = self.state.borrow_mut();
        let armed = (state.length_word & 0x7FFF_FFFF) as usize;
        if state.length_word & 0x8000_0000 != 0 || armed != buf.len() {
            return Err(BootError::Transport(rusb::Error::Pipe));
        }
        state.events.push(Event::BulkIn {
            endpoint,
            len: buf.len(),
        });

        let data = state.read_memory(state.address, buf.len());
        buf.copy_from_slice(&data);
        if let (Some(mask), Some(first)) = (state.corrupt_reads, buf.first_mut()) {
            *first ^= mask;
        }
        Ok(buf.len().saturating_sub(state.short_by))
    }

    fn bulk_out(&mut self, endpoint: u8, data: &[u8], _timeout: Duration) -> BootResult<usize> {
        let mut state = self.state.borrow_mut();
        let armed = (state.length_word & 0x7FFF_FFFF) as usize;
        if state.length_word & 0x8000_0000 == 0 || armed != data.len() {
            return Err(BootError::Transport(rusb::Error::Pipe));
        }
        state.events.push(Event::BulkOut {
            endpoint,
            len: data.len(),
        });

        let accepted = data.len().saturating_sub(state.short_by);
        let address = state.address;
        state.fill(address, &data[..accepted]);
        Ok(accepted)
    }
}

pub fn client() -> (Cc1800<SimDevice>, Rc<RefCell<DeviceState>>) {
    let (device, state) = SimDevice::new();
    let client = Cc1800::new(device, ProtocolConfig::default()).unwrap();
    (client, state)
}
