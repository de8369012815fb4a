//! The three scanner passes that populate a [`RefTable`] from a ROM image:
//! block discovery, bytecode reference scanning, and machine-code (`LUI`/
//! `ADDIU`) reference scanning.

use byteorder::{BigEndian, ByteOrder};

use crate::error::RelocError;
use crate::refs::{RefKind, RefTable};

/// Start of the code region scanned for `ASM_0xFF` references.
pub const CODE_REGION_END: usize = 0x10_0000;
/// Start of the asset region scanned for blocks and bytecode references.
pub const ASSET_REGION_START: usize = 0x10_0000;

const BLOCK_STRIDE: usize = 16;
const WORD_STRIDE: usize = 4;

/// Pass 1: walks the asset region on 16-byte strides looking for the MIO0
/// signature, inserting an [`RefKind::Unclassified`] entry per hit.
pub fn discover_blocks(buf: &[u8], table: &mut RefTable) -> Result<(), RelocError> {
    let end = buf.len().saturating_sub(4);
    let mut offset = ASSET_REGION_START;
    while offset <= end {
        if buf[offset..offset + 4] == mio0::MAGIC {
            table.insert(offset as u32)?;
        }
        offset += BLOCK_STRIDE;
    }
    Ok(())
}

fn bytecode_command(buf: &[u8], o: usize) -> Option<(u8, u32, u32)> {
    if buf[o + 1] != 0x0C {
        return None;
    }
    let start = BigEndian::read_u32(&buf[o + 4..o + 8]);
    let end = BigEndian::read_u32(&buf[o + 8..o + 12]);
    Some((buf[o], start, end))
}

/// Pass 2 (extend direction): walks the asset region on 4-byte strides for
/// the 12-byte `CC 0C 00 xx | start | end` bytecode pattern, annotating
/// already-discovered entries with their bytecode kind.
///
/// Only `0x18` and `0x1A` commands matter here: `0x17` never appears
/// referencing a still-compressed block in unextended input.
pub fn scan_bytecode_extend(buf: &[u8], table: &mut RefTable) {
    let end = buf.len().saturating_sub(12);
    let mut o = ASSET_REGION_START;
    while o <= end {
        if buf[o + 2] == 0x00 {
            if let Some((cc, start, _end)) = bytecode_command(buf, o) {
                if let Some(kind @ (RefKind::Header | RefKind::FakeHeader)) =
                    RefKind::from_command_byte(cc)
                {
                    if let Some(entry) = table.get_mut(start) {
                        entry.kind = kind;
                    }
                }
            }
        }
        o += WORD_STRIDE;
    }
}

/// Pass 2 (pack direction): the same 12-byte pattern, but restricted to
/// `byte[addr+2] < 0x02` and to pointers within `[0x800000, in_length)`.
/// Populates the table from scratch, since an already-extended image has no
/// signature markers to discover blocks by.
pub fn scan_bytecode_pack(
    buf: &[u8],
    extension_start: u32,
    in_length: u32,
    table: &mut RefTable,
) -> Result<(), RelocError> {
    let end = buf.len().saturating_sub(12);
    let mut o = 0;
    while o <= end {
        if buf[o + 2] < 0x02 {
            if let Some((cc, start, new_end)) = bytecode_command(buf, o) {
                if let Some(kind) = RefKind::from_command_byte(cc) {
                    if start >= extension_start && new_end < in_length && start < new_end {
                        let entry = table.insert(start)?;
                        entry.new_end = new_end;
                        entry.kind = kind;
                    }
                }
            }
        }
        o += WORD_STRIDE;
    }
    Ok(())
}

const LUI: u8 = 0x3C;
const ADDIU: u8 = 0x24;
/// Isolates the 6-bit opcode field from an instruction's most-significant
/// byte. `ADDIU`'s source-register field spills its top two bits into this
/// byte when the register number is 8 or higher, so a bare `== ADDIU`
/// comparison misses those encodings.
const OPCODE_MASK: u8 = 0xFC;

/// Pass 3: walks the code region on 4-byte strides looking for the
/// `LUI rA, hi1 / LUI rB, hi2 / ADDIU rB, rB, lo2 / ADDIU rA, rA, lo1`
/// four-instruction idiom and reconstructs the split-halfword pointer pair
/// it encodes.
pub fn scan_asm(buf: &[u8], table: &mut RefTable) {
    let end = CODE_REGION_END.min(buf.len()).saturating_sub(16);
    let mut addr = 0;
    while addr <= end {
        if buf[addr] & OPCODE_MASK == LUI
            && buf[addr + 4] & OPCODE_MASK == LUI
            && buf[addr + 8] & OPCODE_MASK == ADDIU
            && buf[addr + 12] & OPCODE_MASK == ADDIU
        {
            let start_hi = BigEndian::read_u16(&buf[addr + 2..addr + 4]);
            let end_hi = BigEndian::read_u16(&buf[addr + 6..addr + 8]);
            let end_lo = BigEndian::read_u16(&buf[addr + 10..addr + 12]);
            let start_lo = BigEndian::read_u16(&buf[addr + 14..addr + 16]);

            let start = common::ptr::reconstruct(start_hi, start_lo);
            let new_end = common::ptr::reconstruct(end_hi, end_lo);

            if let Some(entry) = table.get_mut(start) {
                entry.kind = RefKind::Asm;
                entry.addr = addr as u32;
                entry.new_end = new_end;
            }
        }
        addr += WORD_STRIDE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::RefTable;

    fn write_bytecode(buf: &mut [u8], o: usize, cc: u8, byte2: u8, start: u32, end: u32) {
        buf[o] = cc;
        buf[o + 1] = 0x0C;
        buf[o + 2] = byte2;
        buf[o + 3] = 0x00;
        BigEndian::write_u32(&mut buf[o + 4..o + 8], start);
        BigEndian::write_u32(&mut buf[o + 8..o + 12], end);
    }

    #[test]
    fn discover_finds_signature_at_stride() {
        let mut buf = vec![0u8; ASSET_REGION_START + 64];
        buf[ASSET_REGION_START + 16..ASSET_REGION_START + 20].copy_from_slice(&mio0::MAGIC);
        let mut table = RefTable::new();
        discover_blocks(&buf, &mut table).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get((ASSET_REGION_START + 16) as u32).is_some());
    }

    #[test]
    fn extend_bytecode_scan_tags_header_kind() {
        let mut buf = vec![0u8; ASSET_REGION_START + 64];
        write_bytecode(&mut buf, ASSET_REGION_START + 16, 0x18, 0x00, 0x20_0000, 0x20_1000);
        let mut table = RefTable::new();
        table.insert(0x20_0000).unwrap();
        scan_bytecode_extend(&buf, &mut table);
        assert_eq!(table.get(0x20_0000).unwrap().kind, RefKind::Header);
    }

    #[test]
    fn pack_bytecode_scan_populates_from_scratch() {
        let mut buf = vec![0u8; 64];
        write_bytecode(&mut buf, 16, 0x17, 0x01, 0x80_0010, 0x80_1000);
        let mut table = RefTable::new();
        scan_bytecode_pack(&buf, 0x80_0000, 0x90_0000, &mut table).unwrap();
        let entry = table.get(0x80_0010).unwrap();
        assert_eq!(entry.kind, RefKind::Raw);
        assert_eq!(entry.new_end, 0x80_1000);
    }

    #[test]
    fn asm_scan_reconstructs_split_pointer() {
        let mut buf = vec![0u8; CODE_REGION_END];
        let addr = 0x100;
        buf[addr] = LUI;
        BigEndian::write_u16(&mut buf[addr + 2..addr + 4], 0x0081);
        buf[addr + 4] = LUI;
        BigEndian::write_u16(&mut buf[addr + 6..addr + 8], 0x0082);
        buf[addr + 8] = ADDIU;
        BigEndian::write_u16(&mut buf[addr + 10..addr + 12], 0x8000);
        buf[addr + 12] = ADDIU;
        BigEndian::write_u16(&mut buf[addr + 14..addr + 16], 0x0000);

        let mut table = RefTable::new();
        table.insert(0x0081_0000).unwrap();
        scan_asm(&buf, &mut table);

        let entry = table.get(0x0081_0000).unwrap();
        assert_eq!(entry.kind, RefKind::Asm);
        assert_eq!(entry.addr, addr as u32);
        assert_eq!(entry.new_end, 0x0081_8000);
    }

    #[test]
    fn asm_scan_matches_addiu_with_high_source_register() {
        // ADDIU $t4, $t4, lo has rs = 12 (0b01100), whose top two bits (0b01)
        // land in the low bits of the opcode byte: 0x24 | 0b01 = 0x25.
        let mut buf = vec![0u8; CODE_REGION_END];
        let addr = 0x200;
        buf[addr] = LUI;
        BigEndian::write_u16(&mut buf[addr + 2..addr + 4], 0x0081);
        buf[addr + 4] = LUI;
        BigEndian::write_u16(&mut buf[addr + 6..addr + 8], 0x0082);
        buf[addr + 8] = 0x25;
        BigEndian::write_u16(&mut buf[addr + 10..addr + 12], 0x8000);
        buf[addr + 12] = 0x25;
        BigEndian::write_u16(&mut buf[addr + 14..addr + 16], 0x0000);

        let mut table = RefTable::new();
        table.insert(0x0081_0000).unwrap();
        scan_asm(&buf, &mut table);

        let entry = table.get(0x0081_0000).unwrap();
        assert_eq!(entry.kind, RefKind::Asm);
        assert_eq!(entry.new_end, 0x0081_8000);
    }
}
