//! Parsed session script

use crate::common::Span;

/// A complete script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

/// One line of a script
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub kind: StepKind,
    pub span: Span,
}

impl Step {
    pub fn new(kind: StepKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// An `expect` clause and where it was written
#[derive(Debug, Clone, PartialEq)]
pub struct Expected<T> {
    pub value: T,
    pub span: Span,
}

/// Save type selected with `save`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    None,
    Eeprom4k,
    Eeprom16k,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// `version [expect WORD]`
    Version { expect: Option<Expected<u32>> },
    /// `config ID VALUE`
    Config { id: u32, value: u32 },
    /// `query ID [expect WORD]`
    Query { id: u32, expect: Option<Expected<u32>> },
    /// `write ADDR DATA`
    Write { address: u32, data: Vec<u8> },
    /// `read ADDR LEN [expect DATA]`
    Read { address: u32, length: u32, expect: Option<Expected<Vec<u8>>> },
    /// `stream ADDR DATA`
    Stream { address: u32, data: Vec<u8> },
    /// `save none|eeprom4k|eeprom16k`
    Save(SaveKind),
    /// `eeprom-status [expect DATA]`
    EepromStatus { expect: Option<Expected<Vec<u8>>> },
    /// `eeprom-write PAGE DATA`
    EepromWrite { page: u8, data: Vec<u8> },
    /// `eeprom-read PAGE [expect DATA]`
    EepromRead { page: u8, expect: Option<Expected<Vec<u8>>> },
    /// `rtc-status [expect DATA]`
    RtcStatus { expect: Option<Expected<Vec<u8>>> },
    /// `rtc-write BLOCK DATA`
    RtcWrite { block: u8, data: Vec<u8> },
    /// `rtc-read BLOCK [expect DATA]`
    RtcRead { block: u8, expect: Option<Expected<Vec<u8>>> },
    /// `debug-write TYPE DATA`
    DebugWrite { datatype: u32, data: Vec<u8> },
    /// `debug-tx ADDR DATA`
    DebugTx { address: u32, data: Vec<u8> },
    /// `debug-internal ID ADDR DATA`
    DebugInternal { id: u8, address: u32, data: Vec<u8> },
    /// `reset`
    Reset,
    /// `tick N`
    Tick(u64),
}

impl StepKind {
    /// Keyword the step was written with
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Version { .. } => "version",
            StepKind::Config { .. } => "config",
            StepKind::Query { .. } => "query",
            StepKind::Write { .. } => "write",
            StepKind::Read { .. } => "read",
            StepKind::Stream { .. } => "stream",
            StepKind::Save(_) => "save",
            StepKind::EepromStatus { .. } => "eeprom-status",
            StepKind::EepromWrite { .. } => "eeprom-write",
            StepKind::EepromRead { .. } => "eeprom-read",
            StepKind::RtcStatus { .. } => "rtc-status",
            StepKind::RtcWrite { .. } => "rtc-write",
            StepKind::RtcRead { .. } => "rtc-read",
            StepKind::DebugWrite { .. } => "debug-write",
            StepKind::DebugTx { .. } => "debug-tx",
            StepKind::DebugInternal { .. } => "debug-internal",
            StepKind::Reset => "reset",
            StepKind::Tick(_) => "tick",
        }
    }
}
