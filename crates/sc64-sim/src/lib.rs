//! SC64 simulator - host-side tooling for the firmware protocol engines
//!
//! Runs the `sc64-fw` USB and joybus engines against simulated hardware and
//! drives them from the host side of both wires.
//!
//! ## Architecture
//!
//! - **Board** (`board/`): Simulated FIFOs, SDRAM, DMA, RTC and config that
//!   implement the firmware `hal` traits, ticked as one polling loop
//! - **Link** (`link/`): Host side of the USB wire protocol (command
//!   encoding, response and debug packet decoding)
//! - **Script** (`script/`): Session scripts - lexer, parser, step runner
//! - **Driver** (`driver/`): Parse-and-run pipeline used by the CLI
//! - **Common** (`common/`): Shared infrastructure (errors, spans)

pub mod common;
pub mod board;
pub mod link;
pub mod script;
pub mod driver;

// Re-exports for convenience
pub use common::{DiagnosticReporter, SimError, SimResult, Span};
pub use board::{Board, BoardConfig};
pub use link::{Command, DataPacket, Link, LinkError, Response};
pub use driver::{Session, SessionConfig};
