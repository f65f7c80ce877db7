//! Joybus register model
//!
//! The console side loads a request into the tail of the 10-byte receive
//! window and raises ready + stop bit. The firmware side writes the data
//! words and starts transmission with a bit count that includes the stop bit.

use sc64_fw::hal::JoybusPort;

const RX_WINDOW: usize = 10;

#[derive(Debug, Default)]
pub struct JoybusRegs {
    window: [u8; RX_WINDOW],
    rx_length: usize,
    rx_ready: bool,
    rx_stop_bit: bool,
    data: [u32; 3],
    tx_bits: Option<u32>,
}

impl JoybusRegs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console side: present a request of up to 10 bytes.
    pub fn request(&mut self, bytes: &[u8]) {
        let length = bytes.len().min(RX_WINDOW);
        self.window = [0; RX_WINDOW];
        self.window[RX_WINDOW - length..].copy_from_slice(&bytes[..length]);
        self.rx_length = length;
        self.rx_ready = true;
        self.rx_stop_bit = true;
        self.tx_bits = None;
    }

    /// The receiver has been re-armed since the last request.
    pub fn idle(&self) -> bool {
        !self.rx_ready
    }

    /// Console side: bytes of the last response, up to its stop bit.
    pub fn take_response(&mut self) -> Option<Vec<u8>> {
        let bits = self.tx_bits.take()?;
        let length = (bits.saturating_sub(1) / 8) as usize;
        let bytes: Vec<u8> = self.data.iter().flat_map(|word| word.to_le_bytes()).collect();
        Some(bytes[..length.min(bytes.len())].to_vec())
    }
}

impl JoybusPort for JoybusRegs {
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
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
