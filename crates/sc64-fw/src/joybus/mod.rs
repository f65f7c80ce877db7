//! Joybus accessory emulation
//!
//! The console addresses the cartridge over the controller-port protocol.
//! Two accessories are emulated behind it:
//!
//! - **EEPROM**: 4 Kbit or 16 Kbit save storage in 8-byte pages, backed by
//!   the save region of SDRAM
//! - **RTC**: real-time clock with a write-protect block (0) and a time
//!   block (2), backed by the RTC driver
//!
//! A request is at most 10 bytes and a response at most 12, both fitting the
//! hardware FIFO, so each request is answered within a single poll.

mod engine;
mod frame;
mod rtc;

pub use engine::{EepromType, JoybusEngine};
pub use frame::{Request, Response};

/// Command bytes
pub mod cmd {
    pub const EEPROM_STATUS: u8 = 0x00;
    pub const EEPROM_READ: u8 = 0x04;
    pub const EEPROM_WRITE: u8 = 0x05;
    pub const RTC_STATUS: u8 = 0x06;
    pub const RTC_READ: u8 = 0x07;
    pub const RTC_WRITE: u8 = 0x08;
}

/// Device identifier of a 4 Kbit EEPROM
pub const EEPROM_ID_4K: u8 = 0x80;
/// Device identifier of a 16 Kbit EEPROM
pub const EEPROM_ID_16K: u8 = 0xC0;
/// Device identifier of the RTC
pub const RTC_ID: u8 = 0x10;

/// EEPROM page size in bytes
pub const EEPROM_PAGE_SIZE: u32 = 8;

/// RTC status byte while stopped
pub const RTC_STATUS_STOPPED: u8 = 0x80;
/// RTC status byte while running
pub const RTC_STATUS_RUNNING: u8 = 0x00;

/// Write-protect bits of RTC block 0
pub const RTC_WP_MASK: u8 = 0x03;
/// Stop flag of RTC block 0
pub const RTC_ST_MASK: u8 = 0x04;
/// Century marker reported for 20xx
pub const RTC_CENTURY_20XX: u8 = 0x01;
