//! USB bridge FIFO model
//!
//! Bytes written by the host queue up unbounded on the host side and move
//! into the device RX FIFO as space frees up. Device TX bytes drain to the
//! host side the same way. Both device FIFOs hold at most `depth` bytes, so
//! words regularly straddle polls.

use sc64_fw::hal::UsbPort;
use std::collections::VecDeque;

pub struct UsbFifo {
    depth: usize,
    host_tx: VecDeque<u8>,
    rx: VecDeque<u8>,
    tx: VecDeque<u8>,
    host_rx: VecDeque<u8>,
    escape: Option<u8>,
}

impl UsbFifo {
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            host_tx: VecDeque::new(),
            rx: VecDeque::new(),
            tx: VecDeque::new(),
            host_rx: VecDeque::new(),
            escape: None,
        }
    }

    // ========================================================================
    // Host side
    // ========================================================================

    pub fn host_write(&mut self, bytes: &[u8]) {
        self.host_tx.extend(bytes.iter().copied());
    }

    /// Take up to `length` bytes received by the host.
    pub fn host_read(&mut self, length: usize) -> Vec<u8> {
        let length = length.min(self.host_rx.len());
        self.host_rx.drain(..length).collect()
    }

    pub fn host_available(&self) -> usize {
        self.host_rx.len()
    }

    /// Bytes written by the host not yet consumed by the device.
    pub fn host_pending(&self) -> usize {
        self.host_tx.len() + self.rx.len()
    }

    pub fn send_escape(&mut self, code: u8) {
        self.escape = Some(code);
    }

    pub fn escape_pending(&self) -> bool {
        self.escape.is_some()
    }

    // ========================================================================
    // Device side
    // ========================================================================

    /// Move bytes across the bridge in both directions.
    pub fn exchange(&mut self) {
        while self.rx.len() < self.depth {
            match self.host_tx.pop_front() {
                Some(byte) => self.rx.push_back(byte),
                None => break,
            }
        }
        self.host_rx.extend(self.tx.drain(..));
    }

    /// DMA read side: pop one received byte.
    pub fn dma_pop(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    /// DMA write side: push one byte if the TX FIFO has room.
    pub fn dma_push(&mut self, byte: u8) -> bool {
        self.write_byte(byte)
    }
}

impl UsbPort for UsbFifo {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_byte(&mut self, data: u8) -> bool {
        if self.tx.len() >= self.depth {
            return false;
        }
        self.tx.push_back(data);
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
        self.tx.clear();
    }
}
