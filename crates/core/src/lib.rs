//! wordsquash-core: Huffman-coded compression for sorted word lists
//!
//! This library turns an ordered list of lowercase words into a compact,
//! self-describing text bundle and rebuilds the exact list from that bundle
//! alone:
//! - Models adjacent-word redundancy with one of three word models
//! - Codes the model's symbols with deterministic Huffman trees
//! - Packs the variable-width codes into 80-column base64 text
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `bitio`: Bit packing to and from the 64-character text alphabet
//! - `huffman`: Frequency tables, code trees, tree literals
//! - `model`: The `Letters`, `Prefix` and `Pairs` word models
//! - `codec`: Bundle format and the compress/expand drivers
//! - `metrics`: Per-strategy run report
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and surfaced to the caller
//! - **Deterministic**: Equal input gives byte-identical bundles
//! - **Self-contained**: The bundle is the only state a decoder needs
//!
//! # Example
//! ```
//! use wordsquash_core::{codec, Strategy};
//!
//! let words = ["cat", "cats", "dog"];
//! let bundle = codec::compress(Strategy::Prefix, &words).unwrap();
//! let text = bundle.to_text();
//! assert_eq!(codec::expand_text(&text).unwrap(), "cat\ncats\ndog");
//! ```

pub mod bitio;
pub mod codec;
pub mod error;
pub mod huffman;
pub mod metrics;
pub mod model;

// Re-export commonly used types
pub use codec::Bundle;
pub use error::{Error, Result};
pub use model::{Strategy, WordModel};
