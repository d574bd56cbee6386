//! Ethernet frame parsing

use super::MacAddr;
use crate::{Error, Result};

/// Fixed Ethernet header size (no VLAN tag, no FCS)
pub const HEADER_SIZE: usize = 14;

/// Parsed Ethernet frame (zero-copy reference)
///
/// Only untagged frames are handled; the pipeline addresses packet bytes
/// relative to a fixed 14-byte framing, so a VLAN tag shows up as an
/// unsupported EtherType during classification rather than being unwrapped.
#[derive(Debug)]
pub struct Frame<'a> {
    buffer: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Parse an Ethernet frame from a buffer
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("frame too short".into()));
        }
        Ok(Self { buffer })
    }

    pub fn dst_mac(&self) -> MacAddr {
        MacAddr(self.buffer[0..6].try_into().unwrap())
    }

    pub fn src_mac(&self) -> MacAddr {
        MacAddr(self.buffer[6..12].try_into().unwrap())
    }

    pub fn ethertype(&self) -> u16 {
        u16::from_be_bytes([self.buffer[12], self.buffer[13]])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[HEADER_SIZE..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer
    }
}
