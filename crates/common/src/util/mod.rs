mod file_size;

pub use self::file_size::FileSize;
