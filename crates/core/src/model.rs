//! Word models that remove redundancy between adjacent words before
//! Huffman coding.
//!
//! - `Letters`: every character of every word, then a terminator, from one
//!   shared table.
//! - `Prefix`: per word, the length shared with the previous word
//!   (`Repeat`), the length of the rest (`Tail`), and the tail characters
//!   (`Char`), each from its own table.
//! - `Pairs`: as `Prefix`, but each tail character is coded with the table
//!   of the character before it (a first-order Markov model over letters).
//!
//! Tallying, encoding and decoding all derive the per-word split and the
//! `Pairs` context from the same helpers ([`prefix_splits`] and
//! [`context_index`]), so the three passes cannot disagree on which table a
//! symbol belongs to.

use crate::bitio::{Base64Reader, Base64Writer};
use crate::error::{BundleError, Error, HuffmanError, Result};
use crate::huffman::{Encoding, FrequencyTable, HuffmanTree, Node};
use std::fmt;
use std::str::FromStr;

/// End-of-word marker in the `Letters` alphabet.
pub const TERMINATOR: char = '\n';

/// Number of `Pairs` context tables: one sentinel plus `a`-`z`.
pub const CONTEXT_COUNT: usize = 27;

/// Context used when no character precedes the one being coded.
pub const NO_CONTEXT: usize = 0;

/// Longest word, in characters, the models accept.
pub const MAX_WORD_LEN: usize = 1 << 16;

/// The closed set of word models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Letters,
    Prefix,
    Pairs,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Letters, Strategy::Prefix, Strategy::Pairs];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Letters => "letters",
            Strategy::Prefix => "prefix",
            Strategy::Pairs => "pairs",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| BundleError::UnknownStrategy(s.to_string()).into())
    }
}

/// Reject words the models cannot represent.
///
/// Every word must be non-empty, at most [`MAX_WORD_LEN`] characters, and use
/// only `a`-`z`.
pub fn validate_words<W: AsRef<str>>(words: &[W]) -> Result<()> {
    for (index, word) in words.iter().enumerate() {
        let word = word.as_ref();
        if word.is_empty()
            || word.len() > MAX_WORD_LEN
            || !word.bytes().all(|b| b.is_ascii_lowercase())
        {
            return Err(Error::InvalidWord {
                index,
                word: word.to_string(),
            });
        }
    }
    Ok(())
}

/// Byte length of the longest common prefix of `a` and `b`.
///
/// Zero when either is empty.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|&((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

/// Table index for the character preceding the one being coded.
///
/// `None` maps to [`NO_CONTEXT`]; `a`-`z` map to 1-26. Anything else has no
/// table.
pub fn context_index(prev: Option<char>) -> Option<usize> {
    match prev {
        None => Some(NO_CONTEXT),
        Some(c @ 'a'..='z') => Some(c as usize - 'a' as usize + 1),
        Some(_) => None,
    }
}

/// One word split against its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    /// Length shared with the previous word
    pub repeat: usize,
    /// The part after the shared prefix
    pub tail: &'a str,
    /// Last character of the shared prefix, if any
    pub lead: Option<char>,
}

/// Split every word against the one before it.
///
/// The first word is compared with the empty word, so its `repeat` is 0.
pub fn prefix_splits<W: AsRef<str>>(words: &[W]) -> impl Iterator<Item = Split<'_>> {
    words.iter().scan("", |prev, word| {
        let word = word.as_ref();
        let repeat = common_prefix_len(prev, word);
        *prev = word;
        Some(Split {
            repeat,
            tail: &word[repeat..],
            lead: word[..repeat].chars().last(),
        })
    })
}

/// Compiled trees for one strategy.
#[derive(Debug, Clone)]
pub enum WordModel {
    Letters {
        chars: HuffmanTree<char>,
    },
    Prefix {
        repeat: HuffmanTree<usize>,
        tail: HuffmanTree<usize>,
        chars: HuffmanTree<char>,
    },
    Pairs {
        repeat: HuffmanTree<usize>,
        tail: HuffmanTree<usize>,
        /// Indexed by [`context_index`]; `None` for contexts that never occur
        contexts: [Option<HuffmanTree<char>>; CONTEXT_COUNT],
    },
}

impl WordModel {
    /// Tally `words` for `strategy` and compile its trees.
    ///
    /// # Errors
    /// - `Error::InvalidWord` for words outside the supported alphabet
    /// - `HuffmanError::EmptyAlphabet` if `words` is empty
    pub fn build<W: AsRef<str>>(strategy: Strategy, words: &[W]) -> Result<Self> {
        validate_words(words)?;

        match strategy {
            Strategy::Letters => {
                let mut chars = FrequencyTable::new();
                for word in words {
                    for c in word.as_ref().chars() {
                        chars.tally(c);
                    }
                    chars.tally(TERMINATOR);
                }
                Ok(WordModel::Letters {
                    chars: chars.compile()?,
                })
            }

            Strategy::Prefix => {
                let mut repeat = FrequencyTable::new();
                let mut tail = FrequencyTable::new();
                let mut chars = FrequencyTable::new();
                for split in prefix_splits(words) {
                    repeat.tally(split.repeat);
                    tail.tally(split.tail.len());
                    for c in split.tail.chars() {
                        chars.tally(c);
                    }
                }
                Ok(WordModel::Prefix {
                    repeat: repeat.compile()?,
                    tail: tail.compile()?,
                    chars: chars.compile()?,
                })
            }

            Strategy::Pairs => {
                let mut repeat = FrequencyTable::new();
                let mut tail = FrequencyTable::new();
                let mut tables: [FrequencyTable<char>; CONTEXT_COUNT] =
                    std::array::from_fn(|_| FrequencyTable::new());
                for split in prefix_splits(words) {
                    repeat.tally(split.repeat);
                    tail.tally(split.tail.len());
                    let mut context = lookup_context(split.lead)?;
                    for c in split.tail.chars() {
                        tables[context].tally(c);
                        context = lookup_context(Some(c))?;
                    }
                }

                let mut contexts: [Option<HuffmanTree<char>>; CONTEXT_COUNT] =
                    std::array::from_fn(|_| None);
                for (slot, table) in contexts.iter_mut().zip(&tables) {
                    if !table.is_empty() {
                        *slot = Some(table.compile()?);
                    }
                }
                Ok(WordModel::Pairs {
                    repeat: repeat.compile()?,
                    tail: tail.compile()?,
                    contexts,
                })
            }
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            WordModel::Letters { .. } => Strategy::Letters,
            WordModel::Prefix { .. } => Strategy::Prefix,
            WordModel::Pairs { .. } => Strategy::Pairs,
        }
    }

    /// Number of trees the model carries (context slots included).
    pub fn tree_count(&self) -> usize {
        match self {
            WordModel::Letters { .. } => 1,
            WordModel::Prefix { .. } => 3,
            WordModel::Pairs { contexts, .. } => 2 + contexts.len(),
        }
    }

    /// Append the codes for every word, in order.
    ///
    /// # Errors
    /// Returns `HuffmanError::SymbolNotInTable` if `words` use a symbol the
    /// model was not built with.
    pub fn encode<W: AsRef<str>>(&self, words: &[W], writer: &mut Base64Writer) -> Result<()> {
        match self {
            WordModel::Letters { chars } => {
                let chars = chars.make_encoding()?;
                for word in words {
                    for c in word.as_ref().chars() {
                        chars.encode(&c, writer)?;
                    }
                    chars.encode(&TERMINATOR, writer)?;
                }
            }

            WordModel::Prefix {
                repeat,
                tail,
                chars,
            } => {
                let repeat = repeat.make_encoding()?;
                let tail = tail.make_encoding()?;
                let chars = chars.make_encoding()?;
                for split in prefix_splits(words) {
                    repeat.encode(&split.repeat, writer)?;
                    tail.encode(&split.tail.len(), writer)?;
                    for c in split.tail.chars() {
                        chars.encode(&c, writer)?;
                    }
                }
            }

            WordModel::Pairs {
                repeat,
                tail,
                contexts,
            } => {
                let repeat = repeat.make_encoding()?;
                let tail = tail.make_encoding()?;
                let mut tables: [Option<Encoding<char>>; CONTEXT_COUNT] =
                    std::array::from_fn(|_| None);
                for (slot, tree) in tables.iter_mut().zip(contexts) {
                    if let Some(tree) = tree {
                        *slot = Some(tree.make_encoding()?);
                    }
                }

                for split in prefix_splits(words) {
                    repeat.encode(&split.repeat, writer)?;
                    tail.encode(&split.tail.len(), writer)?;
                    let mut context = lookup_context(split.lead)?;
                    for c in split.tail.chars() {
                        let table = tables[context].as_ref().ok_or_else(|| {
                            HuffmanError::SymbolNotInTable(format!("{c:?} after context {context}"))
                        })?;
                        table.encode(&c, writer)?;
                        context = lookup_context(Some(c))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Decode exactly `count` words from the stream.
    ///
    /// `count` comes from the bundle header and is not trusted: nothing is
    /// preallocated from it, and every word after the first must consume at
    /// least one bit, so a corrupt count fails on the payload instead of
    /// looping.
    ///
    /// # Errors
    /// - `BitIoError::StreamExhausted` if the stream ends early
    /// - `BundleError::InvalidField` if decoded values are inconsistent with
    ///   the words already rebuilt (corrupt bundle)
    pub fn decode(&self, reader: &mut Base64Reader, count: usize) -> Result<Vec<String>> {
        if let WordModel::Letters { chars } = self {
            // A lone non-terminator leaf would decode forever without
            // consuming a bit.
            if let Node::Leaf { symbol, .. } = chars.node(chars.root()) {
                if *symbol != TERMINATOR {
                    return Err(corrupt("Char", "tree without terminator"));
                }
            }
        }

        let mut words: Vec<String> = Vec::new();
        for index in 0..count {
            let start = reader.bits_consumed();
            let prev = words.last().map_or("", String::as_str);
            let word = self.decode_word(reader, prev)?;
            // Only the first word of a valid stream can cost zero bits.
            if index > 0 && reader.bits_consumed() == start {
                return Err(corrupt("NumWords", count));
            }
            words.push(word);
        }
        Ok(words)
    }

    fn decode_word(&self, reader: &mut Base64Reader, prev: &str) -> Result<String> {
        match self {
            WordModel::Letters { chars } => {
                let mut word = String::new();
                loop {
                    let c = chars.decode_symbol(reader)?;
                    if c == TERMINATOR {
                        break;
                    }
                    if word.len() == MAX_WORD_LEN {
                        return Err(corrupt("Char", "word too long"));
                    }
                    word.push(c);
                }
                if word.is_empty() {
                    return Err(corrupt("Char", "empty word"));
                }
                Ok(word)
            }

            WordModel::Prefix {
                repeat,
                tail,
                chars,
            } => {
                let mut word = repeated_prefix(prev, repeat.decode_symbol(reader)?)?;
                let tail_len = checked_tail_len(&word, tail.decode_symbol(reader)?)?;
                for _ in 0..tail_len {
                    word.push(chars.decode_symbol(reader)?);
                }
                Ok(word)
            }

            WordModel::Pairs {
                repeat,
                tail,
                contexts,
            } => {
                let mut word = repeated_prefix(prev, repeat.decode_symbol(reader)?)?;
                let tail_len = checked_tail_len(&word, tail.decode_symbol(reader)?)?;
                let mut context = context_index(word.chars().last())
                    .ok_or_else(|| corrupt("Repeat", &word))?;
                for _ in 0..tail_len {
                    let table = contexts[context]
                        .as_ref()
                        .ok_or_else(|| corrupt(&format!("Char[{context}]"), "-"))?;
                    let c = table.decode_symbol(reader)?;
                    word.push(c);
                    context = context_index(Some(c))
                        .ok_or_else(|| corrupt(&format!("Char[{context}]"), c))?;
                }
                Ok(word)
            }
        }
    }
}

/// Context lookup on the encode side, where every character was validated.
fn lookup_context(prev: Option<char>) -> Result<usize> {
    context_index(prev).ok_or_else(|| {
        HuffmanError::SymbolNotInTable(format!("context for {prev:?}")).into()
    })
}

fn repeated_prefix(prev: &str, repeat: usize) -> Result<String> {
    prev.get(..repeat)
        .map(str::to_string)
        .ok_or_else(|| corrupt("Repeat", repeat))
}

/// A tail that leaves the word empty or longer than [`MAX_WORD_LEN`] can only
/// come from a corrupt bundle.
fn checked_tail_len(prefix: &str, tail_len: usize) -> Result<usize> {
    if (prefix.is_empty() && tail_len == 0) || tail_len > MAX_WORD_LEN.saturating_sub(prefix.len()) {
        return Err(corrupt("Tail", tail_len));
    }
    Ok(tail_len)
}

fn corrupt(field: &str, value: impl ToString) -> Error {
    BundleError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}
