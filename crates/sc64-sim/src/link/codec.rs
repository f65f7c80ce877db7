//! Wire encoding of host commands and device replies

use sc64_fw::usb::{cmd, CMD_TOKEN, CMP_TOKEN, DEBUG_ID_INTERNAL, DMA_TOKEN, ERR_TOKEN};

use super::LinkError;

/// Size of the internal debug packet header (`DMA@`, id/length, info)
pub const PACKET_HEADER_SIZE: usize = 12;

const TOKEN_MASK: u32 = 0xFFFF_FF00;

fn be_word(bytes: &[u8], offset: usize) -> Result<u32, LinkError> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(LinkError::Truncated {
            expected: offset + 4,
            found: bytes.len(),
        })
}

/// Host to device command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: u8,
    pub args: [u32; 2],
    pub data: Vec<u8>,
}

impl Command {
    pub fn new(id: u8, args: [u32; 2]) -> Self {
        Self { id, args, data: Vec::new() }
    }

    pub fn with_data(id: u8, args: [u32; 2], data: Vec<u8>) -> Self {
        Self { id, args, data }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(12 + self.data.len());
        bytes.extend((CMD_TOKEN | u32::from(self.id)).to_be_bytes());
        bytes.extend(self.args[0].to_be_bytes());
        bytes.extend(self.args[1].to_be_bytes());
        bytes.extend(&self.data);
        bytes
    }
}

/// Device reply to a command: data bytes followed by a status token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: u8,
    pub error: bool,
    pub data: Vec<u8>,
}

impl Response {
    /// Decode `bytes`, whose last word is the status token for command `id`.
    pub fn decode(id: u8, bytes: &[u8]) -> Result<Self, LinkError> {
        let Some(split) = bytes.len().checked_sub(4) else {
            return Err(LinkError::Truncated { expected: 4, found: bytes.len() });
        };
        let token = be_word(bytes, split)?;

        let error = match token & TOKEN_MASK {
            CMP_TOKEN => false,
            ERR_TOKEN => true,
            _ => return Err(LinkError::UnknownToken(token)),
        };
        let found = (token & 0xFF) as u8;
        if found != id {
            return Err(LinkError::IdMismatch { expected: id, found });
        }

        Ok(Self { id, error, data: bytes[..split].to_vec() })
    }

    /// Data interpreted as big-endian words
    pub fn words(&self) -> Vec<u32> {
        self.data
            .chunks_exact(4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }
}

/// Internal diagnostic packet pushed by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    pub id: u8,
    pub start_alignment: u8,
    pub length: u16,
    pub payload: Vec<u8>,
}

impl DataPacket {
    /// Number of bytes following the header, trailer included.
    pub fn body_length(header: &[u8]) -> Result<usize, LinkError> {
        let token = be_word(header, 0)?;
        if token != DMA_TOKEN | u32::from(cmd::DEBUG_START) {
            return Err(LinkError::UnknownToken(token));
        }
        let id_length = be_word(header, 4)?;
        if id_length >> 24 != DEBUG_ID_INTERNAL {
            return Err(LinkError::BadPacket(format!("stream id {:#04X}", id_length >> 24)));
        }
        Ok((id_length & 0x00FF_FFFF) as usize)
    }

    /// Decode a complete packet, header through trailer.
    pub fn decode(bytes: &[u8]) -> Result<Self, LinkError> {
        let body = Self::body_length(bytes)?;
        if body < 4 {
            return Err(LinkError::BadPacket(format!("body length {body}")));
        }
        let info = be_word(bytes, 8)?;
        let total = PACKET_HEADER_SIZE + body;
        if bytes.len() < total {
            return Err(LinkError::Truncated { expected: total, found: bytes.len() });
        }

        let trailer = be_word(bytes, total - 4)?;
        if trailer != CMP_TOKEN | u32::from(cmd::DEBUG_END) {
            return Err(LinkError::UnknownToken(trailer));
        }

        let id = (info >> 24) as u8;
        let start_alignment = ((info >> 16) & 0xFF) as u8;
        let length = (info & 0xFFFF) as u16;

        let start = PACKET_HEADER_SIZE + usize::from(start_alignment);
        let end = start + usize::from(length);
        if end > total - 4 {
            return Err(LinkError::BadPacket(format!(
                "payload of {length} bytes at +{start_alignment} exceeds {} byte window",
                body - 4
            )));
        }

        Ok(Self {
            id,
            start_alignment,
            length,
            payload: bytes[start..end].to_vec(),
        })
    }
}
