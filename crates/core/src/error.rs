//! Error types for the word list compressor.
//!
//! All operations return structured errors rather than panicking. The core
//! has no notion of partial success: a word list either encodes and decodes
//! completely or the operation fails with one of these.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: packing bits into or extracting bits from the text-safe stream
/// - Huffman: table construction, tree parsing, or encode failures
/// - Bundle: parsing the textual bundle format
/// - Input: words the models cannot represent
/// - I/O: file system operations (app layer)
#[derive(Debug, Error)]
pub enum Error {
    /// Bit stream operation failed (e.g., reading past the last character)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Huffman codec error (e.g., empty alphabet, malformed tree)
    #[error("huffman codec error: {0}")]
    Huffman(#[from] HuffmanError),

    /// Bundle text could not be parsed
    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// Input word is empty or uses characters outside `a`-`z`
    #[error("invalid word #{index}: {word:?} (expected lowercase letters a-z)")]
    InvalidWord { index: usize, word: String },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Bit-level stream errors.
#[derive(Debug, Error)]
pub enum BitIoError {
    /// The stream contains a character outside the 64-symbol alphabet
    #[error("unknown alphabet character {character:?} at offset {position}")]
    UnknownAlphabetCharacter { character: char, position: usize },

    /// A bit was requested after every character had been consumed
    #[error("bit stream exhausted after {position} characters")]
    StreamExhausted { position: usize },

    /// Invalid bit count (more than 64 bits in one call)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),
}

/// Huffman codec errors.
#[derive(Debug, Error)]
pub enum HuffmanError {
    /// No symbols were tallied (cannot build a tree)
    #[error("empty alphabet: cannot build a tree without symbols")]
    EmptyAlphabet,

    /// Serialized tree text is not a valid nested pair structure
    #[error("malformed tree at offset {position}: {reason}")]
    MalformedTree { position: usize, reason: String },

    /// Encoder was asked for a symbol that was never tallied
    #[error("symbol {0} is not in the encoding table")]
    SymbolNotInTable(String),

    /// A leaf sits deeper than a single code can hold
    #[error("code length {length} exceeds maximum 64")]
    CodeLengthTooLong { length: usize },
}

/// Bundle parsing errors.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A field the strategy requires is absent
    #[error("missing field {0}")]
    MissingField(String),

    /// The `Strategy=` line names no known strategy
    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),

    /// A field is present but its value cannot be used
    #[error("invalid value for {field}: {value:?}")]
    InvalidField { field: String, value: String },

    /// Bits remained in the stream after the declared words were decoded
    #[error("{unread} characters left over after decoding")]
    TrailingData { unread: usize },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
