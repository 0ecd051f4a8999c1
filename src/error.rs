//! Error types for the WKB codec and linearizer configuration

use thiserror::Error;

/// Errors raised while decoding geometry or configuring a [`crate::Linearizer`]
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of WKB input at byte {offset}")]
    UnexpectedEof { offset: usize },

    #[error("invalid byte order marker {0:#04x}")]
    InvalidByteOrder(u8),

    #[error("unknown WKB geometry type code {0}")]
    UnknownType(u32),

    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),

    #[error("{child} is not a valid member of {parent}")]
    InvalidChild { parent: String, child: String },

    #[error("{0} trailing bytes after geometry")]
    TrailingBytes(usize),

    #[error("geometry nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("invalid tolerance {0}: must be a positive finite number")]
    InvalidTolerance(f64),
}

/// Result type alias for codec and configuration operations
pub type Result<T> = std::result::Result<T, Error>;
