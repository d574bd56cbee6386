//! End-to-end pipeline scenarios
//!
//! Run with: cargo test --test e2e

mod pipeline;

use pipevm::packet::Packet;
use std::time::SystemTime;

/// Build a minimal Ethernet/IPv4/TCP frame with the given TCP ports.
///
/// 54 bytes: 14 Ethernet + 20 IPv4 (no options) + 20 TCP (no options).
pub fn make_tcp_frame(src_port: u16, dst_port: u16) -> Vec<u8> {
    let mut frame = Vec::new();
    // Ethernet
    frame.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    frame.extend_from_slice(&[0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb]);
    frame.extend_from_slice(&[0x08, 0x00]);
    // IPv4, IHL 5, TCP
    frame.extend_from_slice(&[0x45, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00]);
    frame.extend_from_slice(&[0x40, 0x06, 0x00, 0x00]);
    frame.extend_from_slice(&[10, 0, 0, 1]);
    frame.extend_from_slice(&[10, 0, 0, 2]);
    // TCP
    frame.extend_from_slice(&src_port.to_be_bytes());
    frame.extend_from_slice(&dst_port.to_be_bytes());
    frame.extend_from_slice(&[0, 0, 0, 1]);
    frame.extend_from_slice(&[0, 0, 0, 0]);
    frame.extend_from_slice(&[0x50, 0x02, 0xFF, 0xFF]);
    frame.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    frame
}

pub fn make_packet(src_port: u16, dst_port: u16) -> Packet {
    Packet::classify(
        make_tcp_frame(src_port, dst_port),
        SystemTime::UNIX_EPOCH,
        1,
    )
    .expect("frame should classify")
}
