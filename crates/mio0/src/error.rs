use std::fmt;

/// An error produced by the MIO0 codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mio0Error {
    /// The input is shorter than the fixed 16-byte header.
    HeaderTruncated,
    /// The input does not start with the `MIO0` magic.
    BadMagic,
    /// A flag, token, or literal read ran past the end of the input.
    Truncated,
    /// A back-reference token named a distance larger than the output
    /// produced so far.
    BadDistance,
}

impl fmt::Display for Mio0Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mio0Error::HeaderTruncated => write!(f, "input too short for mio0 header"),
            Mio0Error::BadMagic => write!(f, "missing mio0 magic"),
            Mio0Error::Truncated => write!(f, "input truncated mid-block"),
            Mio0Error::BadDistance => write!(f, "back-reference distance exceeds output so far"),
        }
    }
}

impl std::error::Error for Mio0Error {}
