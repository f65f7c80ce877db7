//! Collaborator interfaces consumed by the protocol engines
//!
//! The engines never touch registers directly. Each hardware block they
//! depend on is reached through one of these traits, which keeps the
//! raw-memory boundary in the board support code:
//!
//! - [`UsbPort`] - byte FIFO towards the USB bridge, plus the escape latch
//! - [`JoybusPort`] - controller-port FIFO data window and control bits
//! - [`Dma`] - asynchronous block copy between SDRAM and a peripheral
//! - [`Sdram`] - 32-bit word access to save memory
//! - [`Rtc`] - real-time clock driver
//! - [`Config`] - configuration subsystem
//! - [`DiskEmulation`] - disk drive emulation block-ready signal

/// USB bridge byte FIFO.
pub trait UsbPort {
    /// Pop one received byte, or `None` when the RX FIFO is empty.
    fn read_byte(&mut self) -> Option<u8>;

    /// Push one byte for transmission. Returns `false` when the TX FIFO is full.
    fn write_byte(&mut self, data: u8) -> bool;

    /// Escape byte sent out-of-band by the host, if one is pending.
    fn escape(&self) -> Option<u8>;

    /// Acknowledge the pending escape.
    fn ack_escape(&mut self);

    /// Enable the port and flush both FIFOs.
    fn reset(&mut self);
}

/// Joybus controller-port FIFO.
///
/// The receive side exposes a 10-byte window; a request of `n` bytes sits at
/// the tail of that window. The transmit side is three 32-bit data words.
pub trait JoybusPort {
    /// A request has been received.
    fn rx_ready(&self) -> bool;

    /// The received request was terminated by a stop bit.
    fn rx_stop_bit(&self) -> bool;

    /// Number of request bytes received.
    fn rx_length(&self) -> usize;

    /// Byte `index` of the receive window.
    fn rx_window(&self, index: usize) -> u8;

    /// Load transmit data word `index`.
    fn write_data(&mut self, index: usize, word: u32);

    /// Start transmitting `bit_length` bits from the data words.
    fn start_tx(&mut self, bit_length: u32);

    /// Re-arm the receiver for the next request.
    fn reset_rx(&mut self);

    /// Reset both transmitter and receiver.
    fn reset(&mut self);
}

/// Peripheral issuing a DMA transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaId {
    /// USB bridge FIFO
    Usb,
}

/// DMA transfer direction relative to SDRAM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDir {
    /// Peripheral to SDRAM
    ToSdram,
    /// SDRAM to peripheral
    FromSdram,
}

/// DMA engine. A caller must observe it idle before starting a transfer.
pub trait Dma {
    fn start(&mut self, address: u32, length: u32, id: DmaId, dir: DmaDir);

    fn busy(&self) -> bool;

    /// Abort the current transfer. `busy` may stay set for a short while.
    fn stop(&mut self);
}

/// Save memory region in SDRAM.
///
/// Words are returned in CPU order; the joybus engine presents them to the
/// console most significant byte first.
pub trait Sdram {
    fn read_word(&self, address: u32) -> u32;

    fn write_word(&mut self, address: u32, data: u32);
}

/// Date and time as kept by the RTC driver.
///
/// Fields are BCD encoded. `weekday` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RtcTime {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub weekday: u8,
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

/// Real-time clock driver.
pub trait Rtc {
    fn time(&self) -> RtcTime;

    fn set_time(&mut self, time: &RtcTime);
}

/// Configuration subsystem.
pub trait Config {
    /// Protocol version word reported by the `'V'` command.
    fn version(&self) -> u32;

    /// Apply `args` (id, value) as a configuration update.
    fn update(&mut self, args: &mut [u32; 2]);

    /// Look up `args[0]`, writing the result into `args[1]`.
    fn query(&mut self, args: &mut [u32; 2]);

    /// Offset of save data inside SDRAM.
    fn save_offset(&self) -> u32;
}

/// Disk drive emulation signalling.
pub trait DiskEmulation {
    fn set_block_ready(&mut self, ready: bool);
}
