//! TCP header parsing - RFC 793

use crate::{Error, Result};

/// Minimum TCP header size (without options)
pub const MIN_HEADER_SIZE: usize = 20;

/// TCP protocol number
pub const PROTOCOL_NUMBER: u8 = 6;

/// Parsed TCP header (zero-copy reference)
#[derive(Debug)]
pub struct TcpHeader<'a> {
    buffer: &'a [u8],
    header_len: usize,
}

impl<'a> TcpHeader<'a> {
    /// Parse a TCP header from a buffer
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < MIN_HEADER_SIZE {
            return Err(Error::Parse("TCP header too short".into()));
        }

        let data_offset = (buffer[12] >> 4) as usize;
        let header_len = data_offset * 4;

        if header_len < MIN_HEADER_SIZE {
            return Err(Error::Parse("TCP data offset too small".into()));
        }

        if buffer.len() < header_len {
            return Err(Error::Parse("TCP header truncated".into()));
        }

        Ok(Self { buffer, header_len })
    }

    /// Source port (offset 0-1)
    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[0], self.buffer[1]])
    }

    /// Destination port (offset 2-3)
    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Data offset (header length in 32-bit words)
    pub fn data_offset(&self) -> u8 {
        self.buffer[12] >> 4
    }

    /// Header length in bytes
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Payload (TCP data after header)
    pub fn payload(&self) -> &[u8] {
        &self.buffer[self.header_len..]
    }
}
