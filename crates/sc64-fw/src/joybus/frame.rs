//! Request/response buffers and their FIFO layout

use crate::hal::JoybusPort;

/// Receive window size in bytes
const RX_WINDOW: usize = 10;
/// Transmit data size in bytes
const TX_SIZE: usize = 12;
/// Stop bit appended after the last response byte
const TX_STOP_BIT: u8 = 0x80;

/// Received request bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Request {
    data: [u8; RX_WINDOW],
}

impl Request {
    /// Copy the received bytes out of the receive window.
    ///
    /// The hardware shifts a request of `n` bytes into the tail of the
    /// window, so byte 0 lives at offset `10 - n`.
    pub fn receive<P: JoybusPort>(port: &P) -> Self {
        let length = port.rx_length().min(RX_WINDOW);
        let offset = RX_WINDOW - length;
        let mut data = [0; RX_WINDOW];
        for (i, byte) in data.iter_mut().take(length).enumerate() {
            *byte = port.rx_window(offset + i);
        }
        Self { data }
    }

    pub fn command(&self) -> u8 {
        self.data[0]
    }

    pub fn byte(&self, index: usize) -> u8 {
        self.data[index]
    }

    /// Big-endian word starting at `index`.
    pub fn word(&self, index: usize) -> u32 {
        u32::from_be_bytes([
            self.data[index],
            self.data[index + 1],
            self.data[index + 2],
            self.data[index + 3],
        ])
    }

    #[cfg(test)]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = [0; RX_WINDOW];
        data[..bytes.len()].copy_from_slice(bytes);
        Self { data }
    }
}

/// Response bytes, zeroed at the start of every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Response {
    data: [u8; TX_SIZE],
}

impl Response {
    pub const fn new() -> Self {
        Self { data: [0; TX_SIZE] }
    }

    pub fn set(&mut self, index: usize, value: u8) {
        self.data[index] = value;
    }

    /// Store `word` most significant byte first at `index`.
    pub fn set_word(&mut self, index: usize, word: u32) {
        self.data[index..index + 4].copy_from_slice(&word.to_be_bytes());
    }

    pub fn as_bytes(&self) -> &[u8; TX_SIZE] {
        &self.data
    }

    /// Send the first `length` bytes.
    ///
    /// Data words are loaded in bus order (little-endian) with the stop bit
    /// placed in the byte right after the payload; the transmitter is told
    /// the payload length in bits plus the stop bit.
    pub fn transmit<P: JoybusPort>(&self, port: &mut P, length: usize) {
        let mut frame = [0u8; TX_SIZE];
        frame[..length].copy_from_slice(&self.data[..length]);
        if let Some(stop) = frame.get_mut(length) {
            *stop |= TX_STOP_BIT;
        }

        for (index, chunk) in frame.chunks_exact(4).enumerate().take(length / 4 + 1) {
            port.write_data(index, u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        port.start_tx((length as u32) * 8 + 1);
    }
}
