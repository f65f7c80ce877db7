//! # SC64 firmware core
//!
//! Device-side protocol engines for the SC64 peripheral controller.
//!
//! ## Engines
//!
//! - **USB**: command/debug channel used by host tooling. Frames the byte
//!   FIFO into big-endian words, resynchronizes on the `"CMD"` token,
//!   dispatches memory/config commands and multiplexes three debug data
//!   channels over the same wire.
//! - **Joybus**: controller-port channel used by the console. Emulates paged
//!   EEPROM save storage and a real-time clock accessory.
//!
//! Both engines are polled from a single loop. Every `poll` call advances by
//! at most one step given current hardware readiness and returns; nothing in
//! this crate blocks, allocates or relies on interrupts.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sc64_fw::prelude::*;
//!
//! let mut usb = UsbEngine::new();
//! let mut joybus = JoybusEngine::new();
//! usb.init(&mut usb_port);
//! joybus.init(&mut joybus_port);
//!
//! loop {
//!     usb.poll(&mut usb_port, &mut dma, &mut cfg, &mut dd);
//!     joybus.poll(&mut joybus_port, &mut sdram, &cfg, &mut rtc);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`hal`] - Collaborator traits (FIFOs, DMA, SDRAM, RTC, config)
//! - [`usb`] - USB command state machine and debug channels
//! - [`joybus`] - Joybus EEPROM and RTC emulation

#![no_std]

#[cfg(test)]
extern crate std;

pub mod hal;
pub mod joybus;
pub mod usb;

#[cfg(test)]
mod mock;

/// Convenient re-exports for common usage
pub mod prelude {
    pub use crate::hal::{
        Config, DiskEmulation, Dma, DmaDir, DmaId, JoybusPort, Rtc, RtcTime, Sdram, UsbPort,
    };
    pub use crate::joybus::{EepromType, JoybusEngine};
    pub use crate::usb::{DescriptorBusy, InternalDebugId, State, UsbEngine};
}
