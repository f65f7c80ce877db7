//! USB command and debug channel
//!
//! The host talks to the device over a byte FIFO. Everything on the wire is
//! a big-endian 32-bit word:
//!
//! ```text
//! host -> device   "CMD" <cmd>  <arg0>  <arg1>  [data...]
//! device -> host   [data...]  "CMP" <cmd>      (success)
//!                              "ERR" <cmd>      (unknown command)
//! ```
//!
//! Stray bytes in front of a command are dropped by the token receiver until
//! a clean `"CMD"` prefix lines up again.
//!
//! The device also pushes debug data to the host on its own initiative. The
//! internal diagnostic channel frames its payload as:
//!
//! ```text
//! "DMA@"  (0xFE << 24 | dma_length + 4)  (id << 24 | align << 16 | length)
//! <payload>  "CMPH"
//! ```

mod debug;
mod engine;
mod framing;

pub use debug::{DescriptorBusy, InternalDebugId, Transfer};
pub use engine::{State, UsbEngine};
pub use framing::{TokenReceiver, WordReceiver, WordTransmitter};

/// Command token prefix, `"CMD"`
pub const CMD_TOKEN: u32 = 0x434D_4400;
/// Completion token prefix, `"CMP"`
pub const CMP_TOKEN: u32 = 0x434D_5000;
/// Debug data-out token prefix, `"DMA"`
pub const DMA_TOKEN: u32 = 0x444D_4100;
/// Error token prefix, `"ERR"`
pub const ERR_TOKEN: u32 = 0x4552_5200;

/// Debug stream id marking internal diagnostic packets
pub const DEBUG_ID_INTERNAL: u32 = 0xFE;

/// Escape code requesting a full engine reset
pub const ESCAPE_RESET: u8 = b'R';

/// Command codes
pub mod cmd {
    /// Read the protocol version
    pub const VERSION: u8 = b'V';
    /// Apply a configuration update
    pub const CONFIG_UPDATE: u8 = b'C';
    /// Query a configuration value
    pub const CONFIG_QUERY: u8 = b'Q';
    /// Read SDRAM to the host
    pub const MEMORY_READ: u8 = b'R';
    /// Write host data to SDRAM
    pub const MEMORY_WRITE: u8 = b'W';
    /// Write host data to SDRAM and signal a disk block, no response
    pub const STREAM_WRITE: u8 = b'S';
    /// Host pushes debug data to a firmware consumer
    pub const DEBUG_WRITE: u8 = b'D';
    /// Reported in the error response for a malformed token
    pub const INVALID: u8 = b'!';
    /// Trailer of an internal debug packet
    pub const DEBUG_END: u8 = b'H';
    /// Header marker of an internal debug packet
    pub const DEBUG_START: u8 = b'@';
}
