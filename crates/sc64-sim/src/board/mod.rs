//! Simulated cartridge board
//!
//! Owns one instance of every hardware model plus both firmware engines and
//! runs them the way the firmware main loop does: one [`Board::tick`] is one
//! pass of the loop.
//!
//! ```text
//! tick:  bridge exchange -> DMA step -> USB poll -> save type sync
//!        -> debug consumer -> joybus poll
//! ```

mod joybus;
mod memory;
mod peripherals;
mod usb;

pub use joybus::JoybusRegs;
pub use memory::{DmaTransfer, SdramMemory, SimDma};
pub use peripherals::{id, save_type, DiskFlag, SimConfig, SimRtc, PROTOCOL_VERSION};
pub use usb::UsbFifo;

use sc64_fw::hal::DmaDir;
use std::fmt;
use sc64_fw::joybus::JoybusEngine;
use sc64_fw::usb::{DescriptorBusy, InternalDebugId, UsbEngine};

/// Save region size reserved at the top of SDRAM
const SAVE_REGION_SIZE: u32 = 0x8000;
/// Debug receive buffer size, placed below the save region
const DEBUG_BUFFER_SIZE: u32 = 0x1000;

/// Board dimensions and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// SDRAM size in bytes
    pub sdram_size: usize,
    /// Bytes the DMA engine moves per tick
    pub dma_rate: usize,
    /// Depth of each USB bridge FIFO in bytes
    pub fifo_depth: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            sdram_size: 8 * 1024 * 1024,
            dma_rate: 64,
            fifo_depth: 32,
        }
    }
}

/// Firmware-side consumer of host debug data (`'D'` command).
///
/// Offers one buffer at a time and collects every filled chunk.
#[derive(Debug, Default)]
pub struct DebugSink {
    address: u32,
    latched: Option<u32>,
    datatype: u32,
    received: Vec<u8>,
}

impl DebugSink {
    /// Datatype word of the most recent transfer
    pub fn datatype(&self) -> u32 {
        self.datatype
    }

    pub fn received(&self) -> &[u8] {
        &self.received
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.received)
    }
}

pub struct Board {
    config: BoardConfig,
    pub usb_port: UsbFifo,
    pub joybus_port: JoybusRegs,
    pub sdram: SdramMemory,
    pub dma: SimDma,
    pub rtc: SimRtc,
    pub cfg: SimConfig,
    pub dd: DiskFlag,
    pub usb: UsbEngine,
    pub joybus: JoybusEngine,
    pub debug_sink: DebugSink,
    ticks: u64,
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        let top = u32::try_from(config.sdram_size).unwrap_or(u32::MAX);
        let save_offset = top.saturating_sub(SAVE_REGION_SIZE);

        let mut board = Self {
            config,
            usb_port: UsbFifo::new(config.fifo_depth),
            joybus_port: JoybusRegs::new(),
            sdram: SdramMemory::new(config.sdram_size),
            dma: SimDma::new(),
            rtc: SimRtc::new(),
            cfg: SimConfig::new(save_offset),
            dd: DiskFlag::default(),
            usb: UsbEngine::new(),
            joybus: JoybusEngine::new(),
            debug_sink: DebugSink {
                address: save_offset.saturating_sub(DEBUG_BUFFER_SIZE),
                ..DebugSink::default()
            },
            ticks: 0,
        };
        board.usb.init(&mut board.usb_port);
        board.joybus.init(&mut board.joybus_port);
        log::debug!(
            "board up: {} bytes sdram, save at {:#X}, fifo depth {}",
            config.sdram_size,
            save_offset,
            config.fifo_depth
        );
        board
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one pass of the firmware main loop.
    pub fn tick(&mut self) {
        self.usb_port.exchange();
        self.step_dma();

        self.usb.poll(&mut self.usb_port, &mut self.dma, &mut self.cfg, &mut self.dd);
        if let Some(eeprom) = self.cfg.take_save_change() {
            log::debug!("save type -> {eeprom:?}");
            self.joybus.set_eeprom(eeprom);
        }
        self.service_debug_sink();

        self.joybus.poll(&mut self.joybus_port, &mut self.sdram, &self.cfg, &mut self.rtc);
        self.ticks += 1;
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Console side: issue a joybus request and collect the reply.
    pub fn joybus_request(&mut self, request: &[u8]) -> Option<Vec<u8>> {
        self.joybus_port.request(request);
        while !self.joybus_port.idle() {
            self.tick();
        }
        self.joybus_port.take_response()
    }

    /// Firmware side: copy `data` into SDRAM and queue it on the debug TX channel.
    pub fn debug_tx(&mut self, address: u32, data: &[u8]) -> Result<(), DescriptorBusy> {
        if !self.usb.debug_tx_ready() {
            return Err(DescriptorBusy);
        }
        self.sdram.write(address, data);
        self.usb.debug_tx_data(address, data.len() as u32)
    }

    /// Firmware side: copy `data` into SDRAM and queue it as an internal
    /// diagnostic packet.
    pub fn internal_debug_tx(
        &mut self,
        id: InternalDebugId,
        address: u32,
        data: &[u8],
    ) -> Result<(), DescriptorBusy> {
        if !self.usb.internal_debug_tx_ready() {
            return Err(DescriptorBusy);
        }
        self.sdram.write(address, data);
        self.usb.internal_debug_tx_data(id, address, data.len() as u32)
    }

    fn step_dma(&mut self) {
        let Some(transfer) = self.dma.active_mut() else {
            return;
        };

        let mut budget = self.config.dma_rate;
        while budget > 0 && transfer.remaining > 0 {
            match transfer.dir {
                DmaDir::ToSdram => {
                    let Some(byte) = self.usb_port.dma_pop() else {
                        break;
                    };
                    self.sdram.write_byte(transfer.address, byte);
                }
                DmaDir::FromSdram => {
                    if !self.usb_port.dma_push(self.sdram.read_byte(transfer.address)) {
                        break;
                    }
                }
            }
            transfer.address = transfer.address.wrapping_add(1);
            transfer.remaining -= 1;
            budget -= 1;
        }

        if transfer.remaining == 0 {
            self.dma.finish();
        }
    }

    fn service_debug_sink(&mut self) {
        let sink = &mut self.debug_sink;

        if let Some(length) = sink.latched {
            if self.usb.debug_rx_busy() {
                return;
            }
            sink.received.extend(self.sdram.read(sink.address, length as usize));
            sink.latched = None;
        }

        if let Some((datatype, remaining)) = self.usb.debug_rx_ready() {
            let length = remaining.min(DEBUG_BUFFER_SIZE);
            if length > 0 && self.usb.debug_rx_data(sink.address, length).is_ok() {
                sink.datatype = datatype;
                sink.latched = Some(length);
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BoardConfig::default())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("config", &self.config)
            .field("ticks", &self.ticks)
            .field("usb", &self.usb.state())
            .field("joybus", &self.joybus.eeprom())
            .field("dma", &self.dma)
            .field("dd", &self.dd)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sc64_fw::hal::Sdram;
    use sc64_fw::joybus::EepromType;
    use sc64_fw::usb::State;

    fn command(id: u8, args: [u32; 2]) -> Vec<u8> {
        let mut bytes = vec![b'C', b'M', b'D', id];
        bytes.extend(args[0].to_be_bytes());
        bytes.extend(args[1].to_be_bytes());
        bytes
    }

    fn settle(board: &mut Board) {
        for _ in 0..64 {
            board.tick();
        }
    }

    #[test]
    fn test_version_roundtrip() {
        let mut board = Board::default();
        board.usb_port.host_write(&command(b'V', [0, 0]));
        settle(&mut board);

        let mut expected = PROTOCOL_VERSION.to_be_bytes().to_vec();
        expected.extend(b"CMPV");
        assert_eq!(board.usb_port.host_read(64), expected);
    }

    #[test]
    fn test_write_then_read() {
        let mut board = Board::default();
        let payload: Vec<u8> = (0..100u8).collect();

        let mut bytes = command(b'W', [0x1000, payload.len() as u32]);
        bytes.extend(&payload);
        board.usb_port.host_write(&bytes);
        settle(&mut board);
        assert_eq!(board.usb_port.host_read(64), b"CMPW".to_vec());
        assert_eq!(board.sdram.read(0x1000, 100), payload);

        board.usb_port.host_write(&command(b'R', [0x1000, 100]));
        settle(&mut board);
        let output = board.usb_port.host_read(256);
        assert_eq!(&output[..100], &payload[..]);
        assert_eq!(u32::from_be_bytes([output[100], output[101], output[102], output[103]]), 0x434D_5052);
    }

    #[test]
    fn test_save_type_reaches_joybus() {
        let mut board = Board::default();
        board.usb_port.host_write(&command(b'C', [id::SAVE_TYPE, save_type::EEPROM_16K]));
        settle(&mut board);

        assert_eq!(board.joybus.eeprom(), EepromType::Eeprom16k);
        assert_eq!(board.joybus_request(&[0x00]), Some(vec![0x00, 0xC0, 0x00]));
    }

    #[test]
    fn test_debug_write_collected() {
        let mut board = Board::default();
        let mut bytes = command(b'D', [0x01, 5]);
        bytes.extend(b"hello");
        board.usb_port.host_write(&bytes);
        settle(&mut board);

        assert_eq!(board.usb.state(), State::Idle);
        assert_eq!(board.debug_sink.datatype(), 0x01);
        assert_eq!(board.debug_sink.received(), b"hello");
        assert_eq!(board.usb_port.host_available(), 0);
    }

    #[test]
    fn test_debug_tx_raw_bytes() {
        let mut board = Board::default();
        board.debug_tx(0x2000, b"ping").unwrap();
        assert!(board.debug_tx(0x2000, b"pong").is_err());
        settle(&mut board);

        assert_eq!(board.usb_port.host_read(64), b"ping".to_vec());
        assert!(board.usb.debug_tx_ready());
    }

    #[test]
    fn test_debug_format_skips_memory() {
        let mut board = Board::default();
        board.run(3);
        let text = format!("{:?}", board);
        assert!(text.starts_with("Board { config: BoardConfig"));
        assert!(text.contains("ticks: 3"));
        assert!(text.contains("usb: Idle"));
        assert!(!text.contains("sdram"));
    }

    #[test]
    fn test_stream_write_sets_block_ready() {
        let mut board = Board::default();
        let mut bytes = command(b'S', [0x3000, 4]);
        bytes.extend([1, 2, 3, 4]);
        board.usb_port.host_write(&bytes);
        settle(&mut board);

        assert!(board.dd.block_ready);
        assert_eq!(board.sdram.read_word(0x3000), 0x0102_0304);
        assert_eq!(board.usb_port.host_available(), 0);
    }
}
