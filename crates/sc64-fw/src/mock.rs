//! Test doubles for the collaborator traits

use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use crate::hal::{Config, DiskEmulation, Dma, DmaDir, DmaId, JoybusPort, Rtc, RtcTime, Sdram, UsbPort};

pub struct MockUsb {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    tx_space: usize,
    pub escape: Option<u8>,
    pub resets: usize,
}

impl MockUsb {
    pub fn new() -> Self {
        Self { rx: VecDeque::new(), tx: Vec::new(), tx_space: 1024, escape: None, resets: 0 }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }

    /// Bytes that may be written before the TX FIFO reports full.
    pub fn set_tx_space(&mut self, space: usize) {
        self.tx_space = space;
    }

    pub fn take_tx(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }
}

impl UsbPort for MockUsb {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_byte(&mut self, data: u8) -> bool {
        if self.tx_space == 0 {
            return false;
        }
        self.tx_space -= 1;
        self.tx.push(data);
        true
    }

    fn escape(&self) -> Option<u8> {
        self.escape
    }

    fn ack_escape(&mut self) {
        self.escape = None;
    }

    fn reset(&mut self) {
        self.rx.clear();
        self.resets += 1;
    }
}

/// DMA double. Transfers complete whenever the test clears `busy`.
pub struct MockDma {
    pub busy: bool,
    pub started: Vec<(u32, u32, DmaDir)>,
    pub stops: usize,
}

impl MockDma {
    pub fn new() -> Self {
        Self { busy: false, started: Vec::new(), stops: 0 }
    }
}

impl Dma for MockDma {
    fn start(&mut self, address: u32, length: u32, id: DmaId, dir: DmaDir) {
        assert_eq!(id, DmaId::Usb);
        assert!(!self.busy, "DMA started while busy");
        self.started.push((address, length, dir));
    }

    fn busy(&self) -> bool {
        self.busy
    }

    fn stop(&mut self) {
        self.stops += 1;
        self.busy = false;
    }
}

pub struct MockCfg {
    pub updates: Vec<[u32; 2]>,
    pub queries: usize,
    pub save_offset: u32,
}

impl MockCfg {
    pub const VERSION: u32 = 0x0002_0010;

    pub fn new() -> Self {
        Self { updates: Vec::new(), queries: 0, save_offset: 0x0100 }
    }

    pub fn query_result(id: u32) -> u32 {
        0xA500_0000 | id
    }
}

impl Config for MockCfg {
    fn version(&self) -> u32 {
        Self::VERSION
    }

    fn update(&mut self, args: &mut [u32; 2]) {
        self.updates.push(*args);
    }

    fn query(&mut self, args: &mut [u32; 2]) {
        self.queries += 1;
        args[1] = Self::query_result(args[0]);
    }

    fn save_offset(&self) -> u32 {
        self.save_offset
    }
}

#[derive(Default)]
pub struct MockDd {
    pub block_ready: bool,
}

impl DiskEmulation for MockDd {
    fn set_block_ready(&mut self, ready: bool) {
        self.block_ready = ready;
    }
}

/// Joybus register double. Requests are loaded into the tail of the window.
pub struct MockJoybus {
    window: [u8; 10],
    rx_length: usize,
    pub rx_ready: bool,
    pub rx_stop_bit: bool,
    pub data: [u32; 3],
    pub tx_bits: Option<u32>,
    pub rx_resets: usize,
}

impl MockJoybus {
    pub fn new() -> Self {
        Self {
            window: [0; 10],
            rx_length: 0,
            rx_ready: false,
            rx_stop_bit: false,
            data: [0; 3],
            tx_bits: None,
            rx_resets: 0,
        }
    }

    pub fn load(&mut self, request: &[u8]) {
        self.window = [0; 10];
        self.window[10 - request.len()..].copy_from_slice(request);
        self.rx_length = request.len();
        self.rx_ready = true;
        self.rx_stop_bit = true;
        self.tx_bits = None;
    }

    /// Response bytes, cut at the length given to `start_tx`.
    pub fn response(&self) -> Option<Vec<u8>> {
        let bits = self.tx_bits?;
        let length = ((bits - 1) / 8) as usize;
        let bytes: Vec<u8> = self.data.iter().flat_map(|w| w.to_le_bytes()).collect();
        Some(bytes[..length].to_vec())
    }
}

impl JoybusPort for MockJoybus {
    fn rx_ready(&self) -> bool {
        self.rx_ready
    }

    fn rx_stop_bit(&self) -> bool {
        self.rx_stop_bit
    }

    fn rx_length(&self) -> usize {
        self.rx_length
    }

    fn rx_window(&self, index: usize) -> u8 {
        self.window[index]
    }

    fn write_data(&mut self, index: usize, word: u32) {
        self.data[index] = word;
    }

    fn start_tx(&mut self, bit_length: u32) {
        self.tx_bits = Some(bit_length);
    }

    fn reset_rx(&mut self) {
        self.rx_ready = false;
        self.rx_stop_bit = false;
        self.rx_resets += 1;
    }

    fn reset(&mut self) {
        self.rx_ready = false;
        self.rx_stop_bit = false;
        self.tx_bits = None;
    }
}

/// Sparse SDRAM keyed by word address.
#[derive(Default)]
pub struct MockSdram {
    pub words: BTreeMap<u32, u32>,
}

impl Sdram for MockSdram {
    fn read_word(&self, address: u32) -> u32 {
        self.words.get(&address).copied().unwrap_or(0)
    }

    fn write_word(&mut self, address: u32, data: u32) {
        self.words.insert(address, data);
    }
}

#[derive(Default)]
pub struct MockRtc {
    pub time: RtcTime,
}

impl Rtc for MockRtc {
    fn time(&self) -> RtcTime {
        self.time
    }

    fn set_time(&mut self, time: &RtcTime) {
        self.time = *time;
    }
}
