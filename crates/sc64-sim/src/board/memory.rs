//! SDRAM and DMA engine model

use sc64_fw::hal::{Dma, DmaDir, DmaId, Sdram};

/// SDRAM contents. Words are big-endian, the byte order the console bus sees.
pub struct SdramMemory {
    data: Vec<u8>,
}

impl SdramMemory {
    pub fn new(size: usize) -> Self {
        Self { data: vec![0; size] }
    }

    /// Out-of-range reads return zero.
    pub fn read_byte(&self, address: u32) -> u8 {
        self.data.get(address as usize).copied().unwrap_or(0)
    }

    /// Out-of-range writes are dropped.
    pub fn write_byte(&mut self, address: u32, value: u8) {
        if let Some(byte) = self.data.get_mut(address as usize) {
            *byte = value;
        }
    }

    pub fn read(&self, address: u32, length: usize) -> Vec<u8> {
        (0..length as u32).map(|i| self.read_byte(address.wrapping_add(i))).collect()
    }

    pub fn write(&mut self, address: u32, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.write_byte(address.wrapping_add(i as u32), *byte);
        }
    }
}

impl Sdram for SdramMemory {
    fn read_word(&self, address: u32) -> u32 {
        let bytes = self.read(address, 4);
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn write_word(&mut self, address: u32, data: u32) {
        self.write(address, &data.to_be_bytes());
    }
}

/// Transfer latched by [`SimDma::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaTransfer {
    pub address: u32,
    pub remaining: u32,
    pub id: DmaId,
    pub dir: DmaDir,
}

/// DMA engine. The board moves the latched transfer forward every tick.
#[derive(Debug, Default)]
pub struct SimDma {
    active: Option<DmaTransfer>,
    transfers: u64,
}

impl SimDma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_mut(&mut self) -> Option<&mut DmaTransfer> {
        self.active.as_mut()
    }

    pub fn finish(&mut self) {
        self.active = None;
    }

    /// Number of transfers started so far
    pub fn transfers(&self) -> u64 {
        self.transfers
    }
}

impl Dma for SimDma {
    fn start(&mut self, address: u32, length: u32, id: DmaId, dir: DmaDir) {
        if self.active.is_some() {
            log::warn!("dma start while busy, dropping previous transfer");
        }
        log::trace!("dma start {dir:?} {address:#010X} +{length}");
        self.active = Some(DmaTransfer { address, remaining: length, id, dir });
        self.transfers += 1;
    }

    fn busy(&self) -> bool {
        self.active.is_some()
    }

    fn stop(&mut self) {
        if let Some(transfer) = self.active.take() {
            log::debug!("dma stopped with {} bytes left", transfer.remaining);
        }
    }
}
