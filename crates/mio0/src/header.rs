use byteorder::{BigEndian, ByteOrder};

use crate::error::Mio0Error;

/// Magic bytes at the start of every MIO0 block.
pub const MAGIC: [u8; 4] = *b"MIO0";

/// Size in bytes of the fixed MIO0 header.
pub const HEADER_LEN: usize = 16;

/// The 16-byte header preceding every MIO0 block.
///
/// Layout: 4-byte magic, then three big-endian `u32` fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mio0Header {
    /// Size in bytes of the fully decompressed payload.
    pub dest_size: u32,
    /// Offset (from the start of the block) of the back-reference token
    /// stream.
    pub comp_offset: u32,
    /// Offset (from the start of the block) of the literal byte stream.
    pub uncomp_offset: u32,
}

impl Mio0Header {
    pub fn read(buf: &[u8]) -> Result<Self, Mio0Error> {
        if buf.len() < HEADER_LEN {
            return Err(Mio0Error::HeaderTruncated);
        }
        if buf[0..4] != MAGIC {
            return Err(Mio0Error::BadMagic);
        }
        Ok(Mio0Header {
            dest_size: BigEndian::read_u32(&buf[4..8]),
            comp_offset: BigEndian::read_u32(&buf[8..12]),
            uncomp_offset: BigEndian::read_u32(&buf[12..16]),
        })
    }

    pub fn write(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= HEADER_LEN);
        out[0..4].copy_from_slice(&MAGIC);
        BigEndian::write_u32(&mut out[4..8], self.dest_size);
        BigEndian::write_u32(&mut out[8..12], self.comp_offset);
        BigEndian::write_u32(&mut out[12..16], self.uncomp_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let header = Mio0Header {
            dest_size: 100,
            comp_offset: 18,
            uncomp_offset: 20,
        };
        let mut buf = [0u8; HEADER_LEN];
        header.write(&mut buf);
        assert_eq!(Mio0Header::read(&buf).unwrap(), header);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = [0u8; HEADER_LEN];
        assert_eq!(Mio0Header::read(&buf), Err(Mio0Error::BadMagic));
    }

    #[test]
    fn rejects_truncated() {
        let buf = [b'M', b'I', b'O', b'0'];
        assert_eq!(Mio0Header::read(&buf), Err(Mio0Error::HeaderTruncated));
    }
}
