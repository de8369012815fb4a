//! The relocation engine: drives block extraction/placement for `extend`,
//! the inverse compaction for `pack`, and the reference-patching passes
//! shared by both directions.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use log::{info, warn};

use crate::config::Config;
use crate::error::RelocError;
use crate::refs::{RefKind, RefTable};
use crate::scan;

/// Start of the extension region new blocks are relocated into.
pub const EXTENSION_START: u32 = 0x80_0000;

/// Offsets of the hardcoded audio sound-heap relocation patched in by
/// `pack`. Relocates the base from `0x803D0000` to `0x807B0000`, which
/// extension would otherwise collide with.
const AUDIO_FIXUP_OFFSET: usize = 0xD48B6;
const AUDIO_FIXUP_FROM: u8 = 0x3D;
const AUDIO_FIXUP_TO: u8 = 0x7B;

/// Non-fatal outcome of an [`crate::extend`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtendReport {
    /// Number of discovered blocks successfully relocated.
    pub placed: u32,
    /// Number of discovered blocks skipped (failed to decode).
    pub skipped: u32,
}

fn align_up(addr: u32, alignment: u32) -> u32 {
    debug_assert!(alignment.is_power_of_two());
    (addr + alignment - 1) & !(alignment - 1)
}

/// Relocates every compressed asset block in `in_buf` into the extension
/// region of `out_buf`, patching every bytecode and machine-code reference
/// along the way.
pub fn extend(
    config: &Config,
    in_buf: &[u8],
    out_buf: &mut [u8],
) -> Result<ExtendReport, RelocError> {
    if out_buf.len() < in_buf.len() {
        return Err(RelocError::OutputTooSmall);
    }
    out_buf[..in_buf.len()].copy_from_slice(in_buf);

    let mut table = RefTable::new();
    scan::discover_blocks(out_buf, &mut table)?;
    scan::scan_bytecode_extend(out_buf, &mut table);
    scan::scan_asm(out_buf, &mut table);

    info!("extend: discovered {} reference(s)", table.len());

    let mut report = ExtendReport::default();
    let mut out_addr = EXTENSION_START;

    let entries: Vec<u32> = table.iter().map(|e| e.old).collect();
    for old in entries {
        let entry = *table.get(old).expect("entry discovered above");

        let src = &out_buf[entry.old as usize..];
        let decoded = mio0::decode(src);
        let (raw, consumed) = match decoded {
            Ok(v) => v,
            Err(err) => {
                warn!("extend: block at {:#x} failed to decode: {}", entry.old, err);
                report.skipped += 1;
                continue;
            }
        };

        let (payload, new_kind): (Vec<u8>, RefKind) = match entry.kind {
            RefKind::FakeHeader | RefKind::Asm => (mio0::encode_literal(&raw), entry.kind),
            RefKind::Header => (raw, RefKind::Raw),
            RefKind::Raw | RefKind::Unclassified => (raw, RefKind::Raw),
        };

        out_addr = align_up(out_addr, config.alignment);
        let end = out_addr as usize + payload.len();
        if end > out_buf.len() {
            return Err(RelocError::OutputTooSmall);
        }
        out_buf[out_addr as usize..end].copy_from_slice(&payload);

        if config.fill {
            let fill_end = (entry.old as usize + consumed).min(out_buf.len());
            for b in &mut out_buf[entry.old as usize..fill_end] {
                *b = 0x01;
            }
        }

        let placed = table.get_mut(old).expect("entry discovered above");
        placed.kind = new_kind;
        placed.new = out_addr;
        placed.new_end = end as u32;
        report.placed += 1;

        out_addr = end as u32 + config.padding;
    }

    patch_bytecode(out_buf, &table);
    patch_asm(out_buf, &table);

    info!(
        "extend: placed {} block(s), skipped {}",
        report.placed, report.skipped
    );
    Ok(report)
}

/// Recompresses every extension-region block back toward its own recorded
/// address, re-basing each one in place (`align_up(entry.old, 16)`) rather
/// than compacting them together into a new region. The asset region's
/// level/bytecode tables above the blocks are left untouched, and the
/// image keeps its original length: `out_buf` gets `in_buf` copied over
/// verbatim first, and each block is written back starting at its own
/// (aligned) address.
pub fn pack(config: &Config, in_buf: &[u8], out_buf: &mut [u8]) -> Result<u32, RelocError> {
    if out_buf.len() < in_buf.len() {
        return Err(RelocError::OutputTooSmall);
    }
    out_buf[..in_buf.len()].copy_from_slice(in_buf);
    let in_length = in_buf.len() as u32;

    let mut table = RefTable::new();
    table.insert(EXTENSION_START)?;
    scan::scan_bytecode_pack(out_buf, EXTENSION_START, in_length, &mut table)?;
    scan::scan_asm(out_buf, &mut table);
    table.sort_by_old();

    info!("pack: {} reference(s) to compact", table.len());

    let olds: Vec<u32> = table.iter().map(|e| e.old).collect();
    let mut skipped = 0u32;

    for old in &olds {
        let entry = *table.get(*old).expect("seeded above");
        let start = entry.old as usize;
        let old_end = entry.new_end as usize;
        if start >= old_end || old_end > out_buf.len() {
            skipped += 1;
            continue;
        }
        let src = out_buf[start..old_end].to_vec();

        let (payload, new_kind) = match dispatch_pack(entry.kind, &src, config.compress) {
            Ok(v) => v,
            Err(err) => {
                warn!("pack: block at {:#x}: {}", entry.old, err);
                skipped += 1;
                continue;
            }
        };

        let out_addr = align_up(entry.old, 16);
        let end = out_addr as usize + payload.len();
        if end > out_buf.len() {
            return Err(RelocError::OutputTooSmall);
        }

        for b in &mut out_buf[start..old_end] {
            *b = 0x01;
        }
        out_buf[out_addr as usize..end].copy_from_slice(&payload);

        let placed = table.get_mut(*old).expect("seeded above");
        placed.kind = new_kind;
        placed.new = out_addr;
        placed.new_end = end as u32;
    }

    patch_bytecode(out_buf, &table);
    patch_asm(out_buf, &table);
    apply_audio_fixup(out_buf);

    info!(
        "pack: repacked {} block(s), skipped {} block(s)",
        olds.len() as u32 - skipped,
        skipped
    );
    Ok(in_length)
}

/// Why a single table entry could not be placed while packing.
enum PackError {
    Decode(mio0::Mio0Error),
    UnknownCommand,
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackError::Decode(err) => write!(f, "{}", err),
            PackError::UnknownCommand => write!(f, "entry has no recognized command byte"),
        }
    }
}

impl From<mio0::Mio0Error> for PackError {
    fn from(err: mio0::Mio0Error) -> Self {
        PackError::Decode(err)
    }
}

fn dispatch_pack(
    kind: RefKind,
    src: &[u8],
    compress: bool,
) -> Result<(Vec<u8>, RefKind), PackError> {
    match kind {
        RefKind::Raw => {
            if compress {
                Ok((mio0::encode(src), RefKind::Header))
            } else {
                Ok((src.to_vec(), RefKind::Raw))
            }
        }
        RefKind::Header => Ok((src.to_vec(), RefKind::Header)),
        RefKind::FakeHeader | RefKind::Asm => {
            if compress {
                let (raw, _consumed) = mio0::decode(src)?;
                Ok((mio0::encode(&raw), kind))
            } else {
                Ok((src.to_vec(), kind))
            }
        }
        RefKind::Unclassified => Err(PackError::UnknownCommand),
    }
}

fn apply_audio_fixup(buf: &mut [u8]) {
    if buf.len() > AUDIO_FIXUP_OFFSET + 1
        && buf[AUDIO_FIXUP_OFFSET] == 0x80
        && buf[AUDIO_FIXUP_OFFSET + 1] == AUDIO_FIXUP_FROM
    {
        buf[AUDIO_FIXUP_OFFSET + 1] = AUDIO_FIXUP_TO;
    }
}

/// Rewrites every bytecode reference's start/end pointers and command byte
/// to match its table entry's relocated address. Entries that were never
/// placed (`new == 0`, because decoding failed) are left untouched rather
/// than written out as corrupt null pointers.
///
/// Uses the same `byte[o+1] == 0x0C && byte[o+2] < 0x02` predicate as
/// [`scan::scan_bytecode_pack`], restricted to the three recognized
/// command bytes, so this pass never mistakes an unrelated 12-byte window
/// that happens to hold a matching `old` word for a real reference.
fn patch_bytecode(buf: &mut [u8], table: &RefTable) {
    let end = buf.len().saturating_sub(12);
    let mut o = scan::ASSET_REGION_START;
    while o <= end {
        if buf[o + 1] == 0x0C && buf[o + 2] < 0x02 && RefKind::from_command_byte(buf[o]).is_some() {
            let old = BigEndian::read_u32(&buf[o + 4..o + 8]);
            if let Some(entry) = table.get(old) {
                if entry.is_placed() {
                    BigEndian::write_u32(&mut buf[o + 4..o + 8], entry.new);
                    BigEndian::write_u32(&mut buf[o + 8..o + 12], entry.new_end);
                    if let Some(cmd) = entry.kind.command_byte() {
                        buf[o] = cmd;
                    }
                }
            }
        }
        o += 4;
    }
}

/// Rewrites every `ASM_0xFF` entry's `LUI`/`ADDIU` halfwords to encode its
/// relocated start/end addresses.
fn patch_asm(buf: &mut [u8], table: &RefTable) {
    for entry in table.iter() {
        if entry.kind != RefKind::Asm || !entry.is_placed() {
            continue;
        }
        let addr = entry.addr as usize;
        if addr + 16 > buf.len() {
            continue;
        }

        let (start_hi, start_lo) = common::ptr::split(entry.new);
        let (end_hi, end_lo) = common::ptr::split(entry.new_end);

        BigEndian::write_u16(&mut buf[addr + 2..addr + 4], start_hi);
        BigEndian::write_u16(&mut buf[addr + 6..addr + 8], end_hi);
        BigEndian::write_u16(&mut buf[addr + 10..addr + 12], end_lo);
        BigEndian::write_u16(&mut buf[addr + 14..addr + 16], start_lo);
    }
}
