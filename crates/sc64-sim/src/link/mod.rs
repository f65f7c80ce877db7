//! Host side of the USB link
//!
//! [`Link`] plays the host: it writes encoded commands into the bridge FIFO,
//! ticks the board until the expected number of bytes has come back and
//! decodes them. Every wait is bounded by `max_ticks`.

mod codec;

pub use codec::{Command, DataPacket, Response, PACKET_HEADER_SIZE};

use crate::board::Board;
use sc64_fw::hal::Dma;
use sc64_fw::usb::{State, ESCAPE_RESET};
use thiserror::Error;

/// Default tick budget for a single wait
pub const DEFAULT_MAX_TICKS: u64 = 100_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("timed out after {ticks} ticks waiting for {expected} bytes ({received} received)")]
    Timeout {
        ticks: u64,
        expected: usize,
        received: usize,
    },

    #[error("unknown token {0:#010X}")]
    UnknownToken(u32),

    #[error("response for '{}' while waiting for '{}'", char::from(*.found), char::from(*.expected))]
    IdMismatch { expected: u8, found: u8 },

    #[error("expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("malformed debug packet: {0}")]
    BadPacket(String),

    #[error("device did not settle within {0} ticks")]
    Stalled(u64),
}

pub type LinkResult<T> = Result<T, LinkError>;

pub struct Link<'b> {
    board: &'b mut Board,
    max_ticks: u64,
}

impl<'b> Link<'b> {
    pub fn new(board: &'b mut Board) -> Self {
        Self::with_max_ticks(board, DEFAULT_MAX_TICKS)
    }

    pub fn with_max_ticks(board: &'b mut Board, max_ticks: u64) -> Self {
        Self { board, max_ticks }
    }

    pub fn board(&mut self) -> &mut Board {
        &mut *self.board
    }

    /// Send `command` and wait for `data_length` bytes plus the status token.
    pub fn execute(&mut self, command: &Command, data_length: usize) -> LinkResult<Response> {
        log::trace!("link -> '{}' {:08X?}", char::from(command.id), command.args);
        self.board.usb_port.host_write(&command.encode());
        let bytes = self.receive_raw(data_length + 4)?;
        let response = Response::decode(command.id, &bytes)?;
        log::trace!("link <- '{}' error: {}", char::from(response.id), response.error);
        Ok(response)
    }

    /// Send a command that has no reply and wait until the device has
    /// consumed it.
    pub fn execute_no_response(&mut self, command: &Command) -> LinkResult<()> {
        self.board.usb_port.host_write(&command.encode());
        self.settle()
    }

    /// Wait for exactly `length` device bytes.
    pub fn receive_raw(&mut self, length: usize) -> LinkResult<Vec<u8>> {
        let mut ticks = 0;
        while self.board.usb_port.host_available() < length {
            if ticks >= self.max_ticks {
                return Err(LinkError::Timeout {
                    ticks,
                    expected: length,
                    received: self.board.usb_port.host_available(),
                });
            }
            self.board.tick();
            ticks += 1;
        }
        Ok(self.board.usb_port.host_read(length))
    }

    /// Wait for one internal diagnostic packet.
    pub fn receive_packet(&mut self) -> LinkResult<DataPacket> {
        let mut bytes = self.receive_raw(PACKET_HEADER_SIZE)?;
        let body = DataPacket::body_length(&bytes)?;
        bytes.extend(self.receive_raw(body)?);
        DataPacket::decode(&bytes)
    }

    /// Issue the reset escape and wait for the device to take it.
    pub fn reset(&mut self) -> LinkResult<()> {
        log::debug!("link reset");
        self.board.usb_port.send_escape(ESCAPE_RESET);
        self.wait(|board| !board.usb_port.escape_pending())
    }

    /// Tick until every host byte is consumed and the engine is idle.
    pub fn settle(&mut self) -> LinkResult<()> {
        self.wait(|board| {
            board.usb_port.host_pending() == 0 && board.usb.state() == State::Idle && !board.dma.busy()
        })
    }

    fn wait(&mut self, done: impl Fn(&Board) -> bool) -> LinkResult<()> {
        for _ in 0..self.max_ticks {
            if done(&*self.board) {
                return Ok(());
            }
            self.board.tick();
        }
        if done(&*self.board) {
            Ok(())
        } else {
            Err(LinkError::Stalled(self.max_ticks))
        }
    }
}
