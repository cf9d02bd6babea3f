//! Bit-level I/O over a text-safe, base64-style alphabet.
//!
//! Huffman codes have arbitrary width, so the writer packs them into 6-bit
//! groups and emits one printable character per group. Both directions
//! operate in MSB-first order.
//!
//! # Text Layout
//! - 64-character alphabet: `A-Z`, `a-z`, `0-9`, `+`, `/` (index order)
//! - a line break after every 80 emitted characters
//! - the final partial group is padded with zero bits
//! - output always ends with a line break when it is non-empty
//!
//! # Padding Rules
//! - Base64Writer: pads the last group with trailing zeros
//! - Base64Reader: cannot tell padding from data (caller must know how many
//!   symbols to decode)
//!
//! # Example
//! ```
//! use wordsquash_core::bitio::{Base64Reader, Base64Writer};
//!
//! let mut writer = Base64Writer::new();
//! writer.append(0b101, 3).unwrap(); // Write 3 bits: 1, 0, 1
//! writer.append(0b11, 2).unwrap();  // Write 2 bits: 1, 1
//! // Total: 10111 -> padded to 101110 = 46 = 'u'
//!
//! let text = writer.finish();
//! assert_eq!(text, "u\n");
//!
//! let mut reader = Base64Reader::new(&text);
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(2).unwrap(), 0b11);
//! ```

use crate::error::{BitIoError, Result};
use crate::huffman::Code;

/// The 64 characters of the stream alphabet, indexed by 6-bit value.
pub const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Characters per output line.
pub const LINE_WIDTH: usize = 80;

const BITS_PER_CHAR: usize = 6;

/// Marks bytes that are not part of the alphabet in `REVERSE`.
const INVALID: u8 = 0xFF;

/// Maps each byte back to its 6-bit value, or `INVALID`.
const REVERSE: [u8; 256] = {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Decode one alphabet character into its 6-bit value.
pub fn char_value(c: char) -> Option<u8> {
    if !c.is_ascii() {
        return None;
    }
    match REVERSE[c as usize] {
        INVALID => None,
        v => Some(v),
    }
}

/// Writes bits MSB-first into wrapped base64 text.
///
/// # Invariants
/// - `pending` holds fewer than 6 bits between calls
/// - `column` is always < `LINE_WIDTH`
#[derive(Debug, Clone)]
pub struct Base64Writer {
    /// Emitted text so far
    text: String,
    /// Accumulator for the current partial group (right-aligned)
    pending: u8,
    /// Number of bits in `pending` (0-5)
    pending_bits: usize,
    /// Characters on the current output line
    column: usize,
    /// Total bits appended
    bit_len: usize,
}

impl Base64Writer {
    /// Create a new writer with empty output.
    pub fn new() -> Self {
        Self {
            text: String::new(),
            pending: 0,
            pending_bits: 0,
            column: 0,
            bit_len: 0,
        }
    }

    /// Append the low `width` bits of `value`, most significant first.
    ///
    /// # Errors
    /// Returns `BitIoError::InvalidBitCount` if width > 64.
    pub fn append(&mut self, value: u64, width: usize) -> Result<()> {
        if width > 64 {
            return Err(BitIoError::InvalidBitCount(width).into());
        }

        let mut remaining = width;
        while remaining > 0 {
            // How many bits fit in the current group?
            let take = remaining.min(BITS_PER_CHAR - self.pending_bits);
            let shift = remaining - take;
            let bits = ((value >> shift) & ((1u64 << take) - 1)) as u8;

            self.pending = (self.pending << take) | bits;
            self.pending_bits += take;
            remaining -= take;

            if self.pending_bits == BITS_PER_CHAR {
                self.emit(self.pending);
                self.pending = 0;
                self.pending_bits = 0;
            }
        }

        self.bit_len += width;
        Ok(())
    }

    /// Append a Huffman code. Zero-length codes append nothing.
    pub fn append_code(&mut self, code: &Code) -> Result<()> {
        self.append(code.bits, code.len)
    }

    /// Finish writing and return the stream text.
    ///
    /// Pads any buffered bits with zeros to a whole character and terminates
    /// the last line. This consumes the writer, so nothing can be appended
    /// after the stream is finalized.
    pub fn finish(mut self) -> String {
        if self.pending_bits > 0 {
            let group = self.pending << (BITS_PER_CHAR - self.pending_bits);
            self.emit(group);
        }
        if self.column > 0 {
            self.text.push('\n');
        }
        self.text
    }

    /// Return the total number of bits appended (excluding padding).
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    fn emit(&mut self, group: u8) {
        self.text.push(ALPHABET[group as usize] as char);
        self.column += 1;
        if self.column == LINE_WIDTH {
            self.text.push('\n');
            self.column = 0;
        }
    }
}

impl Default for Base64Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads bits MSB-first from base64 stream text.
///
/// Line breaks are stripped up front. Characters are decoded lazily, one
/// whenever the 6-bit buffer runs dry.
#[derive(Debug, Clone)]
pub struct Base64Reader {
    /// Stream characters with line breaks removed
    chars: Vec<char>,
    /// Index of the next character to decode
    position: usize,
    /// Current decoded group
    accum: u8,
    /// Bits still unread in `accum` (0-6)
    accum_bits: usize,
}

impl Base64Reader {
    /// Create a reader over stream text.
    pub fn new(encoded: &str) -> Self {
        Self {
            chars: encoded.chars().filter(|&c| c != '\n' && c != '\r').collect(),
            position: 0,
            accum: 0,
            accum_bits: 0,
        }
    }

    /// Read one bit.
    ///
    /// # Errors
    /// - `BitIoError::StreamExhausted` if every character is consumed
    /// - `BitIoError::UnknownAlphabetCharacter` if the next character is not
    ///   in the alphabet
    pub fn next_bit(&mut self) -> Result<bool> {
        if self.accum_bits == 0 {
            let c = *self.chars.get(self.position).ok_or(BitIoError::StreamExhausted {
                position: self.position,
            })?;
            self.accum = char_value(c).ok_or(BitIoError::UnknownAlphabetCharacter {
                character: c,
                position: self.position,
            })?;
            self.position += 1;
            self.accum_bits = BITS_PER_CHAR;
        }

        self.accum_bits -= 1;
        Ok((self.accum >> self.accum_bits) & 1 == 1)
    }

    /// Read up to 64 bits as an integer, MSB-first.
    pub fn read_bits(&mut self, count: usize) -> Result<u64> {
        if count > 64 {
            return Err(BitIoError::InvalidBitCount(count).into());
        }

        let mut result = 0u64;
        for _ in 0..count {
            result = (result << 1) | self.next_bit()? as u64;
        }
        Ok(result)
    }

    /// Number of characters decoded so far.
    pub fn chars_consumed(&self) -> usize {
        self.position
    }

    /// Number of characters never touched by the reader.
    pub fn chars_remaining(&self) -> usize {
        self.chars.len() - self.position
    }

    /// Number of bits handed out so far.
    pub fn bits_consumed(&self) -> usize {
        self.position * BITS_PER_CHAR - self.accum_bits
    }
}
