//! Pending debug transfer descriptors

use core::fmt;

use super::{cmd, DEBUG_ID_INTERNAL, DMA_TOKEN};

/// A request was made while the descriptor still holds a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBusy;

impl fmt::Display for DescriptorBusy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("debug transfer already pending")
    }
}

/// SDRAM window of one DMA transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transfer {
    pub address: u32,
    pub length: u32,
}

/// One-shot transfer latch shared between the engine and a producer or
/// consumer. Only an idle descriptor accepts a new request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Descriptor {
    busy: bool,
    transfer: Transfer,
}

impl Descriptor {
    pub const fn new() -> Self {
        Self {
            busy: false,
            transfer: Transfer { address: 0, length: 0 },
        }
    }

    pub fn latch(&mut self, address: u32, length: u32) -> Result<(), DescriptorBusy> {
        if self.busy {
            return Err(DescriptorBusy);
        }
        self.busy = true;
        self.transfer = Transfer { address, length };
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn release(&mut self) {
        self.busy = false;
    }

    pub fn transfer(&self) -> Transfer {
        self.transfer
    }
}

/// Identifier of an internal diagnostic stream, sent in the packet info word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct InternalDebugId(pub u8);

/// Internal diagnostic descriptor with its precomputed packet header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct InternalDescriptor {
    descriptor: Descriptor,
    id_length: u32,
    info: u32,
}

impl InternalDescriptor {
    pub const fn new() -> Self {
        Self {
            descriptor: Descriptor::new(),
            id_length: 0,
            info: 0,
        }
    }

    /// Latch a diagnostic dump of `length` bytes at `address`.
    ///
    /// DMA moves whole words, so the window is widened to word boundaries
    /// and the header tells the host how many leading pad bytes to skip.
    pub fn latch(
        &mut self,
        id: InternalDebugId,
        address: u32,
        length: u32,
    ) -> Result<(), DescriptorBusy> {
        if self.descriptor.is_busy() {
            return Err(DescriptorBusy);
        }

        let start_address = address & !0x03;
        let end_address = address.wrapping_add(length).wrapping_add(3) & !0x03;
        let dma_length = end_address.wrapping_sub(start_address);
        let start_alignment = address & 0x03;

        self.descriptor.latch(start_address, dma_length)?;
        self.id_length = (DEBUG_ID_INTERNAL << 24) | dma_length.wrapping_add(4);
        self.info = (u32::from(id.0) << 24) | (start_alignment << 16) | (length & 0xFFFF);
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.descriptor.is_busy()
    }

    pub fn release(&mut self) {
        self.descriptor.release();
    }

    pub fn transfer(&self) -> Transfer {
        self.descriptor.transfer()
    }

    /// Header words sent ahead of the payload.
    pub fn header(&self) -> [u32; 3] {
        [
            DMA_TOKEN | u32::from(cmd::DEBUG_START),
            self.id_length,
            self.info,
        ]
    }
}
