//! Bundle serialization and the compress/expand drivers.
//!
//! A bundle packages everything needed to rebuild a word list:
//! - Strategy: which word model produced it
//! - Trees: the Huffman tree literals the model needs
//! - NumWords: how many words to decode
//! - Bits: the text-safe payload
//!
//! # Bundle Format
//!
//! ```text
//! Strategy=pairs            letters | prefix | pairs
//! Repeat=(0,(1,3))          prefix, pairs
//! Tail=((2,4),1)            prefix, pairs
//! Char=('e',('s','t'))      letters, prefix
//! Char[0]=('a','b')         pairs only, one line per context 0..=26,
//! Char[1]=-                 '-' for a context that never occurs
//! ...
//! NumWords=3
//! Bits=
//! gAeP0Q...                 80 characters per line, newline terminated
//! ```
//!
//! One field per line. Blank lines before `Bits=` are ignored and tree
//! literals may contain whitespace. Everything after the `Bits=` line is the
//! payload.

use crate::bitio::{Base64Reader, Base64Writer};
use crate::error::{BundleError, Result};
use crate::huffman::{HuffmanTree, TreeSymbol};
use crate::model::{Strategy, WordModel, CONTEXT_COUNT};
use std::collections::HashMap;
use tracing::{debug, info};

/// Marker for a `Pairs` context without a tree.
const UNUSED_CONTEXT: &str = "-";

/// A compressed word list.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Compiled trees of the strategy that produced the payload
    pub model: WordModel,

    /// Number of words encoded in `bits`
    pub word_count: usize,

    /// Base64 payload, line-wrapped and newline-terminated
    pub bits: String,

    /// Payload length in bits before padding. Only known for bundles built
    /// by [`compress`]; padding cannot be told apart from data after parsing.
    pub payload_bits: Option<usize>,
}

impl Bundle {
    pub fn strategy(&self) -> Strategy {
        self.model.strategy()
    }

    /// Render the bundle in its canonical text form.
    pub fn to_text(&self) -> String {
        let mut text = format!("Strategy={}\n", self.strategy());

        match &self.model {
            WordModel::Letters { chars } => {
                push_field(&mut text, "Char", &chars.serialize());
            }
            WordModel::Prefix {
                repeat,
                tail,
                chars,
            } => {
                push_field(&mut text, "Repeat", &repeat.serialize());
                push_field(&mut text, "Tail", &tail.serialize());
                push_field(&mut text, "Char", &chars.serialize());
            }
            WordModel::Pairs {
                repeat,
                tail,
                contexts,
            } => {
                push_field(&mut text, "Repeat", &repeat.serialize());
                push_field(&mut text, "Tail", &tail.serialize());
                for (i, tree) in contexts.iter().enumerate() {
                    let value = tree
                        .as_ref()
                        .map_or_else(|| UNUSED_CONTEXT.to_string(), HuffmanTree::serialize);
                    push_field(&mut text, &context_key(i), &value);
                }
            }
        }

        push_field(&mut text, "NumWords", &self.word_count.to_string());
        text.push_str("Bits=\n");
        text.push_str(&self.bits);
        text
    }

    /// Parse a bundle from its text form.
    ///
    /// # Errors
    /// - `BundleError::MissingField` if a required field is absent
    /// - `BundleError::UnknownStrategy` for an unrecognized strategy name
    /// - `BundleError::InvalidField` for unparsable values or a repeated key
    /// - `HuffmanError::MalformedTree` for bad tree literals
    pub fn parse(text: &str) -> Result<Self> {
        let mut fields: HashMap<&str, &str> = HashMap::new();
        let mut consumed = 0;
        let mut payload_head = None;

        for line in text.split_inclusive('\n') {
            consumed += line.len();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| invalid("line", line))?;
            let (key, value) = (key.trim(), value.trim());
            if key == "Bits" {
                payload_head = Some(value);
                break;
            }
            if fields.insert(key, value).is_some() {
                return Err(invalid(key, "duplicate field"));
            }
        }

        let payload_head = payload_head.ok_or_else(|| missing("Bits"))?;
        let bits = format!("{payload_head}{}", &text[consumed..]);

        let strategy: Strategy = field(&fields, "Strategy")?.parse()?;
        let model = match strategy {
            Strategy::Letters => WordModel::Letters {
                chars: tree_field(&fields, "Char")?,
            },
            Strategy::Prefix => WordModel::Prefix {
                repeat: tree_field(&fields, "Repeat")?,
                tail: tree_field(&fields, "Tail")?,
                chars: tree_field(&fields, "Char")?,
            },
            Strategy::Pairs => {
                let mut contexts: [Option<HuffmanTree<char>>; CONTEXT_COUNT] =
                    std::array::from_fn(|_| None);
                for (i, slot) in contexts.iter_mut().enumerate() {
                    let key = context_key(i);
                    let value = field(&fields, &key)?;
                    if value != UNUSED_CONTEXT {
                        *slot = Some(HuffmanTree::deserialize(value)?);
                    }
                }
                WordModel::Pairs {
                    repeat: tree_field(&fields, "Repeat")?,
                    tail: tree_field(&fields, "Tail")?,
                    contexts,
                }
            }
        };

        let count = field(&fields, "NumWords")?;
        let word_count = count.parse().map_err(|_| invalid("NumWords", count))?;

        Ok(Bundle {
            model,
            word_count,
            payload_bits: None,
            bits,
        })
    }
}

/// Compress `words` with one strategy.
///
/// # Errors
/// - `Error::InvalidWord` if a word is empty or not `a`-`z`
/// - `HuffmanError::EmptyAlphabet` if `words` is empty
pub fn compress<W: AsRef<str>>(strategy: Strategy, words: &[W]) -> Result<Bundle> {
    let model = WordModel::build(strategy, words)?;
    debug!(%strategy, trees = model.tree_count(), "built word model");

    let mut writer = Base64Writer::new();
    model.encode(words, &mut writer)?;
    let payload_bits = writer.bit_len();
    let bits = writer.finish();

    info!(
        %strategy,
        words = words.len(),
        payload_bits,
        payload_chars = bits.len(),
        "compressed word list"
    );

    Ok(Bundle {
        model,
        word_count: words.len(),
        bits,
        payload_bits: Some(payload_bits),
    })
}

/// Rebuild the word list from a bundle.
///
/// # Errors
/// - `BitIoError` variants for a truncated or corrupt payload
/// - `BundleError::TrailingData` if whole characters remain unread
pub fn expand(bundle: &Bundle) -> Result<Vec<String>> {
    let mut reader = Base64Reader::new(&bundle.bits);
    let words = bundle.model.decode(&mut reader, bundle.word_count)?;

    let unread = reader.chars_remaining();
    if unread > 0 {
        return Err(BundleError::TrailingData { unread }.into());
    }

    debug!(
        strategy = %bundle.strategy(),
        words = words.len(),
        bits = reader.bits_consumed(),
        "expanded bundle"
    );
    Ok(words)
}

/// Parse bundle text and return the original text (words joined by `\n`).
pub fn expand_text(text: &str) -> Result<String> {
    let bundle = Bundle::parse(text)?;
    Ok(join_words(&expand(&bundle)?))
}

/// The uncompressed rendering every bundle must reproduce.
pub fn join_words<W: AsRef<str>>(words: &[W]) -> String {
    let mut text = String::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            text.push('\n');
        }
        text.push_str(word.as_ref());
    }
    text
}

fn push_field(text: &mut String, key: &str, value: &str) {
    text.push_str(key);
    text.push('=');
    text.push_str(value);
    text.push('\n');
}

fn context_key(index: usize) -> String {
    format!("Char[{index}]")
}

fn field<'a>(fields: &HashMap<&str, &'a str>, key: &str) -> Result<&'a str> {
    fields.get(key).copied().ok_or_else(|| missing(key))
}

fn tree_field<S: TreeSymbol>(fields: &HashMap<&str, &str>, key: &str) -> Result<HuffmanTree<S>> {
    HuffmanTree::deserialize(field(fields, key)?)
}

fn missing(key: &str) -> crate::error::Error {
    BundleError::MissingField(key.to_string()).into()
}

fn invalid(field: &str, value: &str) -> crate::error::Error {
    BundleError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, HuffmanError};

    const WORDS: [&str; 6] = ["cat", "catalog", "cats", "dog", "dogma", "dogs"];

    #[test]
    fn test_compress_expand_round_trip() {
        for strategy in Strategy::ALL {
            let bundle = compress(strategy, &WORDS).unwrap();
            assert_eq!(bundle.word_count, WORDS.len());
            assert_eq!(expand(&bundle).unwrap(), WORDS);
        }
    }

    #[test]
    fn test_text_round_trip() {
        for strategy in Strategy::ALL {
            let bundle = compress(strategy, &WORDS).unwrap();
            let text = bundle.to_text();
            assert!(text.starts_with(&format!("Strategy={strategy}\n")));
            assert_eq!(expand_text(&text).unwrap(), WORDS.join("\n"));

            let parsed = Bundle::parse(&text).unwrap();
            assert_eq!(parsed.to_text(), text);
        }
    }

    #[test]
    fn test_prefix_bundle_layout() {
        let text = compress(Strategy::Prefix, &["cat", "cats", "dog"])
            .unwrap()
            .to_text();
        let keys: Vec<&str> = text
            .lines()
            .take_while(|l| *l != "Bits=")
            .filter_map(|l| l.split_once('=').map(|(k, _)| k))
            .collect();
        assert_eq!(keys, vec!["Strategy", "Repeat", "Tail", "Char", "NumWords"]);
        assert!(text.contains("NumWords=3\n"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_pairs_bundle_lists_every_context() {
        let text = compress(Strategy::Pairs, &WORDS).unwrap().to_text();
        for i in 0..CONTEXT_COUNT {
            assert!(text.contains(&format!("Char[{i}]=")), "missing context {i}");
        }
        // 'q' never occurs
        assert!(text.contains("Char[17]=-\n"));
    }

    #[test]
    fn test_single_word_bundle_has_empty_payload() {
        let bundle = compress(Strategy::Prefix, &["a"]).unwrap();
        assert_eq!(bundle.payload_bits, Some(0));
        assert!(bundle.bits.is_empty());
        assert_eq!(expand_text(&bundle.to_text()).unwrap(), "a");
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_blank_lines() {
        let bundle = compress(Strategy::Letters, &WORDS).unwrap();
        let text = bundle.to_text();
        let loose = text
            .replacen("Strategy=letters\n", "\n  Strategy = letters\n\n", 1)
            .replace("','", "' , '");
        assert_eq!(expand_text(&loose).unwrap(), WORDS.join("\n"));
    }

    #[test]
    fn test_parse_missing_fields() {
        assert!(matches!(
            Bundle::parse("Strategy=prefix\nNumWords=1\n"),
            Err(Error::Bundle(BundleError::MissingField(f))) if f == "Bits"
        ));
        assert!(matches!(
            Bundle::parse("Strategy=prefix\nRepeat=0\nTail=1\nNumWords=1\nBits=\n"),
            Err(Error::Bundle(BundleError::MissingField(f))) if f == "Char"
        ));
    }

    #[test]
    fn test_parse_unknown_strategy() {
        assert!(matches!(
            Bundle::parse("Strategy=plaintext\nBits=\n"),
            Err(Error::Bundle(BundleError::UnknownStrategy(_)))
        ));
    }

    #[test]
    fn test_parse_bad_tree() {
        assert!(matches!(
            Bundle::parse("Strategy=letters\nChar=('a',\nNumWords=1\nBits=\n"),
            Err(Error::Huffman(HuffmanError::MalformedTree { .. }))
        ));
    }

    #[test]
    fn test_parse_bad_count() {
        assert!(matches!(
            Bundle::parse("Strategy=letters\nChar='\\n'\nNumWords=many\nBits=\n"),
            Err(Error::Bundle(BundleError::InvalidField { .. }))
        ));
    }

    #[test]
    fn test_parse_duplicate_field() {
        assert!(matches!(
            Bundle::parse("Strategy=letters\nChar='\\n'\nChar=('a','\\n')\nNumWords=1\nBits=\n"),
            Err(Error::Bundle(BundleError::InvalidField { field, .. })) if field == "Char"
        ));
    }

    #[test]
    fn test_huge_word_count_fails_on_payload() {
        let text = format!("Strategy=letters\nChar=('a','\\n')\nNumWords={}\nBits=\n", u64::MAX);
        assert!(matches!(
            expand_text(&text),
            Err(Error::BitIo(crate::error::BitIoError::StreamExhausted { .. }))
        ));
    }

    #[test]
    fn test_huge_tail_with_single_leaf_chars_fails() {
        let text = "Strategy=prefix\nRepeat=0\nTail=4000000000\nChar='a'\nNumWords=1\nBits=\n";
        assert!(matches!(
            expand_text(text),
            Err(Error::Bundle(BundleError::InvalidField { field, .. })) if field == "Tail"
        ));
    }

    #[test]
    fn test_corrupt_payload_character() {
        let bundle = compress(Strategy::Prefix, &WORDS).unwrap();
        let text = bundle.to_text();
        let (head, payload) = text.split_once("Bits=\n").unwrap();
        let corrupted = format!("{head}Bits=\n*{}", &payload[1..]);
        assert!(matches!(
            expand_text(&corrupted),
            Err(Error::BitIo(crate::error::BitIoError::UnknownAlphabetCharacter { .. }))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let words: Vec<String> = (0..200).map(|i| "x".repeat(i % 7 + 1)).collect();
        let bundle = compress(Strategy::Letters, &words).unwrap();
        let mut truncated = bundle.clone();
        truncated.bits.truncate(bundle.bits.len() / 2);
        assert!(matches!(
            expand(&truncated),
            Err(Error::BitIo(crate::error::BitIoError::StreamExhausted { .. }))
        ));
    }

    #[test]
    fn test_trailing_payload() {
        let mut bundle = compress(Strategy::Prefix, &WORDS).unwrap();
        bundle.bits.push_str("AAAA\n");
        assert!(matches!(
            expand(&bundle),
            Err(Error::Bundle(BundleError::TrailingData { unread: 4 }))
        ));
    }

    #[test]
    fn test_invalid_word_rejected() {
        assert!(matches!(
            compress(Strategy::Pairs, &["ok", "Not"]),
            Err(Error::InvalidWord { index: 1, .. })
        ));
    }

    #[test]
    fn test_join_words() {
        assert_eq!(join_words(&["a", "b", "c"]), "a\nb\nc");
        assert_eq!(join_words::<&str>(&[]), "");
    }
}
