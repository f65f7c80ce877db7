//! RTC, configuration and disk emulation models

use sc64_fw::hal::{Config, DiskEmulation, Rtc, RtcTime};
use sc64_fw::joybus::EepromType;
use std::collections::BTreeMap;

/// Protocol version reported to the host
pub const PROTOCOL_VERSION: u32 = 0x0002_0000;

/// Configuration identifiers understood by [`SimConfig`]
pub mod id {
    /// Save type selector
    pub const SAVE_TYPE: u32 = 6;
}

/// Values written to [`id::SAVE_TYPE`]
pub mod save_type {
    pub const NONE: u32 = 0;
    pub const EEPROM_4K: u32 = 1;
    pub const EEPROM_16K: u32 = 2;
}

/// Battery-backed clock, starting at 2000-01-01 00:00:00 (Saturday)
#[derive(Debug)]
pub struct SimRtc {
    time: RtcTime,
}

impl SimRtc {
    pub fn new() -> Self {
        Self {
            time: RtcTime { second: 0, minute: 0, hour: 0, weekday: 7, day: 0x01, month: 0x01, year: 0x00 },
        }
    }
}

impl Default for SimRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl Rtc for SimRtc {
    fn time(&self) -> RtcTime {
        self.time
    }

    fn set_time(&mut self, time: &RtcTime) {
        log::debug!("rtc set to {time:?}");
        self.time = *time;
    }
}

/// Configuration store. A save type change is held until the board hands
/// it to the joybus engine.
#[derive(Debug)]
pub struct SimConfig {
    values: BTreeMap<u32, u32>,
    save_offset: u32,
    save_change: Option<EepromType>,
}

impl SimConfig {
    pub fn new(save_offset: u32) -> Self {
        Self {
            values: BTreeMap::new(),
            save_offset,
            save_change: None,
        }
    }

    pub fn value(&self, id: u32) -> u32 {
        self.values.get(&id).copied().unwrap_or(0)
    }

    pub fn take_save_change(&mut self) -> Option<EepromType> {
        self.save_change.take()
    }
}

impl Config for SimConfig {
    fn version(&self) -> u32 {
        PROTOCOL_VERSION
    }

    fn update(&mut self, args: &mut [u32; 2]) {
        let [id, value] = *args;
        log::debug!("config {id} = {value:#X}");
        self.values.insert(id, value);
        if id == id::SAVE_TYPE {
            self.save_change = Some(match value {
                save_type::EEPROM_4K => EepromType::Eeprom4k,
                save_type::EEPROM_16K => EepromType::Eeprom16k,
                _ => EepromType::None,
            });
        }
    }

    fn query(&mut self, args: &mut [u32; 2]) {
        args[1] = self.value(args[0]);
    }

    fn save_offset(&self) -> u32 {
        self.save_offset
    }
}

/// Disk emulation block-ready line
#[derive(Debug, Default)]
pub struct DiskFlag {
    pub block_ready: bool,
}

impl DiskEmulation for DiskFlag {
    fn set_block_ready(&mut self, ready: bool) {
        self.block_ready = ready;
    }
}
