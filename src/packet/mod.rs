//! Packet model and classification
//!
//! Wraps one captured frame, classifies it by walking the supported framing
//! (Ethernet, then IPv4, then TCP) and records the offsets the evaluator
//! needs for header-relative addressing. Anything outside that framing is
//! rejected before an evaluator is ever constructed.

use crate::protocol::{EtherType, ethernet, ipv4, tcp};
use crate::{Error, Result};
use std::time::SystemTime;

/// One captured frame, immutable for the lifetime of an evaluation.
#[derive(Debug, Clone)]
pub struct Packet {
    data: Vec<u8>,
    timestamp: SystemTime,
    physical_port: u32,
    ingress_port: u16,
    header_offset: usize,
    l4_offset: usize,
}

impl Packet {
    /// Classify a captured frame.
    ///
    /// Walks Ethernet (EtherType must be IPv4), then the IPv4 header (the
    /// protocol must be TCP), then the TCP header. The logical ingress port
    /// is the TCP source port of the frame.
    pub fn classify(data: Vec<u8>, timestamp: SystemTime, physical_port: u32) -> Result<Self> {
        let (ingress_port, header_offset, l4_offset) = {
            let frame = ethernet::Frame::parse(&data)?;
            if frame.ethertype() != EtherType::Ipv4 as u16 {
                return Err(Error::UnsupportedProtocol(format!(
                    "ethertype 0x{:04x}",
                    frame.ethertype()
                )));
            }

            let ip = ipv4::Ipv4Header::parse(frame.payload())?;
            if ip.protocol() != tcp::PROTOCOL_NUMBER {
                return Err(Error::UnsupportedProtocol(format!(
                    "IPv4 protocol {}",
                    ip.protocol()
                )));
            }

            let segment = tcp::TcpHeader::parse(ip.payload())?;
            (
                segment.src_port(),
                ethernet::HEADER_SIZE,
                ethernet::HEADER_SIZE + ip.header_len(),
            )
        };

        Ok(Self {
            data,
            timestamp,
            physical_port,
            ingress_port,
            header_offset,
            l4_offset,
        })
    }

    /// The immutable captured bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Arrival timestamp of the frame.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Physical port the frame arrived on.
    pub fn physical_port(&self) -> u32 {
        self.physical_port
    }

    /// Logical ingress port (the TCP source port).
    pub fn ingress_port(&self) -> u16 {
        self.ingress_port
    }

    /// Byte offset of the first decoded header, immediately after the fixed
    /// Ethernet framing. Header-relative addressing starts here.
    pub fn header_offset(&self) -> usize {
        self.header_offset
    }

    /// Byte offset of the TCP header.
    pub fn l4_offset(&self) -> usize {
        self.l4_offset
    }
}

/// Egress decision for one evaluated packet.
///
/// The output port is set at most once per evaluation by an `output` action;
/// a packet whose evaluation completes without one is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decision {
    output_port: Option<u16>,
}

impl Decision {
    pub fn set_output_port(&mut self, port: u16) {
        self.output_port = Some(port);
    }

    pub fn output_port(&self) -> Option<u16> {
        self.output_port
    }

    pub fn is_dropped(&self) -> bool {
        self.output_port.is_none()
    }
}
