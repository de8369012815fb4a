/// Tuning knobs for [`crate::extend`] and [`crate::pack`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Alignment, in bytes, of each relocated block's placement address.
    /// Must be a power of two.
    pub alignment: u32,
    /// Bytes of unused space left after each placed block.
    pub padding: u32,
    /// Overwrite vacated original block bodies with `0x01`.
    pub fill: bool,
    /// Emit per-block debug dump files. The core only threads this flag
    /// through; actually writing files is left to the caller.
    pub dump: bool,
    /// Recompress blocks when packing (`pack` only; ignored by `extend`).
    pub compress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            alignment: 16,
            padding: 0,
            fill: true,
            dump: false,
            compress: true,
        }
    }
}
