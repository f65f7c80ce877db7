//! Byte-to-word framing over the USB FIFO
//!
//! Each assembler keeps its byte count and accumulator across calls, so a
//! word may be completed over any number of polls. A single call moves as
//! many bytes as the FIFO allows, up to the end of the current word.

use crate::hal::UsbPort;

use super::CMD_TOKEN;

const WORD_BYTES: u8 = 4;

/// Assembles big-endian words from received bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordReceiver {
    count: u8,
    buffer: u32,
}

impl WordReceiver {
    pub const fn new() -> Self {
        Self { count: 0, buffer: 0 }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Bytes of the current word received so far.
    pub fn pending(&self) -> u8 {
        self.count
    }

    /// Returns the word once its fourth byte arrives.
    pub fn poll<P: UsbPort>(&mut self, port: &mut P) -> Option<u32> {
        while let Some(byte) = port.read_byte() {
            self.buffer = (self.buffer << 8) | u32::from(byte);
            self.count += 1;
            if self.count == WORD_BYTES {
                let word = self.buffer;
                self.reset();
                log::trace!("usb rx word {word:#010X}");
                return Some(word);
            }
        }
        None
    }
}

/// Emits big-endian words byte by byte.
///
/// Only the byte position is remembered between calls; the caller passes the
/// same word until `poll` reports completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordTransmitter {
    count: u8,
}

impl WordTransmitter {
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Bytes of the current word sent so far.
    pub fn pending(&self) -> u8 {
        self.count
    }

    /// Returns `true` once the last byte of `word` has been queued.
    pub fn poll<P: UsbPort>(&mut self, port: &mut P, word: u32) -> bool {
        let bytes = word.to_be_bytes();
        while port.write_byte(bytes[usize::from(self.count)]) {
            self.count += 1;
            if self.count == WORD_BYTES {
                self.count = 0;
                log::trace!("usb tx word {word:#010X}");
                return true;
            }
        }
        false
    }
}

/// Assembles a command token, dropping progress on any prefix mismatch.
///
/// The first three bytes must spell `"CMD"`; the fourth is the command code
/// and is accepted as is. A mismatching byte is consumed and the assembler
/// starts over from the next byte, which is how the channel recovers from
/// lost or stray bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenReceiver {
    count: u8,
    buffer: u32,
}

impl TokenReceiver {
    pub const fn new() -> Self {
        Self { count: 0, buffer: 0 }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Bytes of the current token matched so far.
    pub fn pending(&self) -> u8 {
        self.count
    }

    pub fn poll<P: UsbPort>(&mut self, port: &mut P) -> Option<u32> {
        while let Some(byte) = port.read_byte() {
            self.count += 1;
            if self.count != WORD_BYTES && byte != Self::expected(self.count) {
                log::trace!("usb token resync on {byte:#04X}");
                self.reset();
                return None;
            }
            self.buffer = (self.buffer << 8) | u32::from(byte);
            if self.count == WORD_BYTES {
                let token = self.buffer;
                self.reset();
                return Some(token);
            }
        }
        None
    }

    /// Prefix byte expected at 1-based `position`.
    fn expected(position: u8) -> u8 {
        CMD_TOKEN.to_be_bytes()[usize::from(position - 1)]
    }
}
