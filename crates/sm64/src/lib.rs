//! Relocates Super Mario 64's compressed asset blocks out of their packed
//! region into an extension region of a larger writable image, patching
//! every bytecode and machine-code reference, and recomputes the boot
//! checksum words afterwards. A `pack` mode reverses the process.
//!
//! File I/O and argument parsing are intentionally not part of this crate;
//! see `examples/` for thin binaries that drive this API against actual
//! ROM files.

#[macro_use]
mod macros;

mod checksum;
mod config;
mod error;
mod refs;
mod reloc;
mod rom_type;
mod scan;

pub use crate::checksum::{compute_checksums, update_checksums};
pub use crate::config::Config;
pub use crate::error::{ChecksumError, RelocError};
pub use crate::refs::{RefEntry, RefKind};
pub use crate::reloc::{extend, pack, ExtendReport};
pub use crate::rom_type::{classify, RomType};

static_assert!(scan::CODE_REGION_END == scan::ASSET_REGION_START);
