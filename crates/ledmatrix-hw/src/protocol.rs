//! Matrix protocol definitions and encoding.
//!
//! Protocol structure:
//! - Packet size: 640 bytes (1 report byte + 6 header bytes + 633 data bytes)
//! - Report ID: 0x5E, signature byte: 0xC0
//! - Command bytes: 0x02 (write), 0x03 (render), 0x04 (blank)
//! - Header: command, payload offset (LE u16), payload length (LE u16)

/// Total packet size including report byte.
pub const PACKET_SIZE: usize = 640;

/// Report byte size (HID report ID).
pub const REPORT_SIZE: usize = 1;

/// Header size (excluding report byte).
pub const HEADER_SIZE: usize = 6;

/// Data payload size per packet.
pub const DATA_SIZE: usize = PACKET_SIZE - REPORT_SIZE - HEADER_SIZE;

/// Largest frame the 16-bit offset field can address.
///
/// The last write packet of such a frame starts below `u16::MAX`.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize + 1;

/// HID report ID.
pub const REPORT_ID: u8 = 0x5E;

/// Protocol signature byte.
pub const MATRIX_SIGNATURE: u8 = 0xC0;

/// Matrix command types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Write a chunk of frame data into the device's back buffer.
    Write = 0x02,
    /// Present the back buffer.
    Render = 0x03,
    /// Turn every LED off.
    Blank = 0x04,
}

impl Command {
    /// Converts a byte value to a Command.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x02 => Some(Command::Write),
            0x03 => Some(Command::Render),
            0x04 => Some(Command::Blank),
            _ => None,
        }
    }
}

fn build_packet(command: Command, offset: usize, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; PACKET_SIZE];
    buffer[0] = REPORT_ID;
    buffer[1] = MATRIX_SIGNATURE;
    buffer[2] = command as u8;

    // Offset and length (little-endian)
    buffer[3] = (offset & 0xFF) as u8;
    buffer[4] = (offset >> 8) as u8;
    buffer[5] = (payload.len() & 0xFF) as u8;
    buffer[6] = (payload.len() >> 8) as u8;

    let data_start = REPORT_SIZE + HEADER_SIZE;
    buffer[data_start..data_start + payload.len()].copy_from_slice(payload);
    buffer
}

/// Number of write packets needed for a frame of `len` bytes.
pub fn chunk_count(len: usize) -> usize {
    len.div_ceil(DATA_SIZE)
}

/// Splits a frame into write packets.
///
/// `frame` must not exceed [`MAX_FRAME_SIZE`]; `Geometry` enforces this for
/// every staged frame.
pub fn build_write_packets(frame: &[u8]) -> Vec<Vec<u8>> {
    debug_assert!(frame.len() <= MAX_FRAME_SIZE);
    frame
        .chunks(DATA_SIZE)
        .enumerate()
        .map(|(i, chunk)| build_packet(Command::Write, i * DATA_SIZE, chunk))
        .collect()
}

/// Builds a render command packet.
pub fn build_render_packet() -> Vec<u8> {
    build_packet(Command::Render, 0, &[])
}

/// Builds a blank command packet.
pub fn build_blank_packet() -> Vec<u8> {
    build_packet(Command::Blank, 0, &[])
}

/// A decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub command: Command,
    pub offset: usize,
    pub len: usize,
}

/// Decodes the header of a packet produced by this module.
pub fn parse_header(packet: &[u8]) -> Option<PacketHeader> {
    if packet.len() < REPORT_SIZE + HEADER_SIZE
        || packet[0] != REPORT_ID
        || packet[1] != MATRIX_SIGNATURE
    {
        return None;
    }
    let command = Command::from_byte(packet[2])?;
    let offset = packet[3] as usize | (packet[4] as usize) << 8;
    let len = packet[5] as usize | (packet[6] as usize) << 8;
    Some(PacketHeader {
        command,
        offset,
        len,
    })
}

/// Returns the payload bytes of a packet.
pub fn payload(packet: &[u8]) -> Option<&[u8]> {
    let header = parse_header(packet)?;
    let start = REPORT_SIZE + HEADER_SIZE;
    packet.get(start..start + header.len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_packet() {
        let packet = build_render_packet();
        assert_eq!(packet.len(), PACKET_SIZE);
        assert_eq!(packet[0], REPORT_ID);
        assert_eq!(packet[1], MATRIX_SIGNATURE);
        assert_eq!(packet[2], Command::Render as u8);
        assert!(packet[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_blank_packet() {
        let packet = build_blank_packet();
        let header = parse_header(&packet).unwrap();
        assert_eq!(header.command, Command::Blank);
        assert_eq!(header.len, 0);
    }

    #[test]
    fn test_small_frame_fits_one_packet() {
        let frame: Vec<u8> = (0..64).collect();
        let packets = build_write_packets(&frame);
        assert_eq!(packets.len(), 1);

        let header = parse_header(&packets[0]).unwrap();
        assert_eq!(header.command, Command::Write);
        assert_eq!(header.offset, 0);
        assert_eq!(header.len, 64);
        assert_eq!(payload(&packets[0]).unwrap(), &frame[..]);
    }

    #[test]
    fn test_large_frame_is_chunked() {
        // 1000 bytes = one full chunk + 367 bytes
        let frame = vec![0xAB; 1000];
        let packets = build_write_packets(&frame);
        assert_eq!(packets.len(), chunk_count(frame.len()));
        assert_eq!(packets.len(), 2);

        let first = parse_header(&packets[0]).unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.len, DATA_SIZE);

        let second = parse_header(&packets[1]).unwrap();
        assert_eq!(second.offset, DATA_SIZE);
        assert_eq!(second.len, 1000 - DATA_SIZE);
        assert_eq!(packets[1][4], (DATA_SIZE >> 8) as u8);
    }

    #[test]
    fn test_largest_frame_offsets_fit() {
        let frame = vec![0x01; MAX_FRAME_SIZE];
        let packets = build_write_packets(&frame);
        assert_eq!(packets.len(), chunk_count(MAX_FRAME_SIZE));

        let mut expected_offset = 0;
        for packet in &packets {
            let header = parse_header(packet).unwrap();
            assert_eq!(header.offset, expected_offset);
            expected_offset += header.len;
        }
        assert_eq!(expected_offset, MAX_FRAME_SIZE);
    }

    #[test]
    fn test_parse_header_rejects_foreign_packets() {
        assert_eq!(parse_header(&[0x00; 8]), None);
        assert_eq!(parse_header(&[REPORT_ID, MATRIX_SIGNATURE]), None);
        assert_eq!(
            parse_header(&[REPORT_ID, MATRIX_SIGNATURE, 0x7F, 0, 0, 0, 0]),
            None
        );
    }
}
