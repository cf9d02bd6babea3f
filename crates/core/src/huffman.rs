//! Huffman code construction over arbitrary symbol alphabets.
//!
//! Each word model needs several independent tables (characters, prefix
//! lengths, tail lengths), so everything here is generic over the symbol
//! type. A table is built in three steps:
//!
//! 1. Tally symbols into a [`FrequencyTable`]
//! 2. Compile it into a [`HuffmanTree`]
//! 3. Derive an [`Encoding`] (symbol -> bit path) from the tree
//!
//! The decoder never recomputes a tree from counts. It reads the tree back
//! from its serialized literal, so the literal is the single source of truth
//! for the bit-to-symbol mapping.
//!
//! # Tree Literal Format
//!
//! ```text
//! leaf     := symbol literal        'a'  '\n'  12
//! internal := "(" left "," right ")"
//! ```
//!
//! For example `(('a','\n'),3)`. The canonical form has no whitespace; the
//! parser skips whitespace between tokens.
//!
//! # Determinism
//!
//! Nodes live in an arena. Leaves are pushed in first-tally order and every
//! merged node is appended after them, so the arena index doubles as a
//! creation sequence number. The reduction always takes the node with the
//! smallest `(count, arena index)` first and makes it the left child. Equal
//! counts therefore resolve to the earliest-created node, which gives
//! bit-identical trees for identical tallies.

use crate::bitio::{Base64Reader, Base64Writer};
use crate::error::{HuffmanError, Result};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use tracing::debug;

/// Longest code a single [`Code`] can carry.
pub const MAX_CODE_LEN: usize = 64;

/// A symbol that can appear as a leaf in a tree literal.
pub trait TreeSymbol: Clone + Eq + Hash + fmt::Debug {
    /// Append this symbol's literal form to `out`.
    fn write_literal(&self, out: &mut String);

    /// Parse a literal at the start of `input`.
    ///
    /// Returns the symbol and the number of bytes consumed.
    fn parse_literal(input: &str) -> Option<(Self, usize)>;
}

impl TreeSymbol for char {
    fn write_literal(&self, out: &mut String) {
        out.push('\'');
        match self {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(*c),
        }
        out.push('\'');
    }

    fn parse_literal(input: &str) -> Option<(Self, usize)> {
        let mut chars = input.char_indices();
        if chars.next()?.1 != '\'' {
            return None;
        }
        let symbol = match chars.next()?.1 {
            '\\' => match chars.next()?.1 {
                'n' => '\n',
                't' => '\t',
                '\\' => '\\',
                '\'' => '\'',
                _ => return None,
            },
            '\'' => return None,
            c => c,
        };
        let (end, quote) = chars.next()?;
        (quote == '\'').then_some((symbol, end + 1))
    }
}

impl TreeSymbol for usize {
    fn write_literal(&self, out: &mut String) {
        out.push_str(&self.to_string());
    }

    fn parse_literal(input: &str) -> Option<(Self, usize)> {
        let digits = input.bytes().take_while(u8::is_ascii_digit).count();
        let value = input[..digits].parse().ok()?;
        Some((value, digits))
    }
}

/// Occurrence counts per symbol, remembering first-tally order.
#[derive(Debug, Clone)]
pub struct FrequencyTable<S> {
    entries: Vec<(S, u64)>,
    index: HashMap<S, usize>,
}

impl<S: TreeSymbol> FrequencyTable<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Count one occurrence of `symbol`.
    pub fn tally(&mut self, symbol: S) {
        match self.index.get(&symbol) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(symbol.clone(), self.entries.len());
                self.entries.push((symbol, 1));
            }
        }
    }

    pub fn count(&self, symbol: &S) -> u64 {
        self.index.get(symbol).map_or(0, |&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Symbols and counts in first-tally order.
    pub fn iter(&self) -> impl Iterator<Item = (&S, u64)> {
        self.entries.iter().map(|(s, c)| (s, *c))
    }

    /// Build the Huffman tree for the tallied counts.
    ///
    /// # Errors
    /// Returns `HuffmanError::EmptyAlphabet` if nothing was tallied.
    pub fn compile(&self) -> Result<HuffmanTree<S>> {
        if self.entries.is_empty() {
            return Err(HuffmanError::EmptyAlphabet.into());
        }

        let mut nodes = Vec::with_capacity(2 * self.entries.len() - 1);
        let mut queue = BinaryHeap::with_capacity(self.entries.len());

        for (symbol, count) in &self.entries {
            queue.push(Reverse((*count, nodes.len())));
            nodes.push(Node::Leaf {
                symbol: symbol.clone(),
                count: *count,
            });
        }

        while queue.len() > 1 {
            let (Some(Reverse((left_count, left))), Some(Reverse((right_count, right)))) =
                (queue.pop(), queue.pop())
            else {
                break;
            };
            let count = left_count + right_count;
            queue.push(Reverse((count, nodes.len())));
            nodes.push(Node::Internal { count, left, right });
        }

        let Reverse((_, root)) = queue.pop().ok_or(HuffmanError::EmptyAlphabet)?;
        debug!(
            symbols = self.entries.len(),
            nodes = nodes.len(),
            total = nodes.get(root).map_or(0, Node::count),
            "compiled huffman tree"
        );
        Ok(HuffmanTree { nodes, root })
    }
}

impl<S: TreeSymbol> Default for FrequencyTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// One arena slot of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<S> {
    Leaf { symbol: S, count: u64 },
    Internal { count: u64, left: usize, right: usize },
}

impl<S> Node<S> {
    /// Occurrence count. Trees parsed from literals carry zero counts.
    pub fn count(&self) -> u64 {
        match self {
            Node::Leaf { count, .. } | Node::Internal { count, .. } => *count,
        }
    }
}

/// An immutable binary code tree stored as an index arena.
///
/// Bit 0 descends to `left`, bit 1 to `right`.
#[derive(Debug, Clone)]
pub struct HuffmanTree<S> {
    nodes: Vec<Node<S>>,
    root: usize,
}

impl<S: TreeSymbol> HuffmanTree<S> {
    /// Node at `index`.
    pub fn node(&self, index: usize) -> &Node<S> {
        &self.nodes[index]
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Number of distinct symbols in the tree.
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Derive the symbol -> code table by walking every root-to-leaf path.
    ///
    /// A tree whose root is a leaf gives that symbol the empty code.
    ///
    /// # Errors
    /// Returns `HuffmanError::CodeLengthTooLong` if a leaf is deeper than
    /// [`MAX_CODE_LEN`].
    pub fn make_encoding(&self) -> Result<Encoding<S>> {
        let mut codes = HashMap::new();
        let mut stack = vec![(self.root, Code::EMPTY)];

        while let Some((index, code)) = stack.pop() {
            match &self.nodes[index] {
                Node::Leaf { symbol, .. } => {
                    codes.insert(symbol.clone(), code);
                }
                Node::Internal { left, right, .. } => {
                    if code.len == MAX_CODE_LEN {
                        return Err(HuffmanError::CodeLengthTooLong {
                            length: code.len + 1,
                        }
                        .into());
                    }
                    stack.push((*right, code.child(true)));
                    stack.push((*left, code.child(false)));
                }
            }
        }

        Ok(Encoding { codes })
    }

    /// Walk from the root, one stream bit per edge, until a leaf.
    ///
    /// A single-leaf tree consumes no bits.
    pub fn decode_symbol(&self, reader: &mut Base64Reader) -> Result<S> {
        let mut index = self.root;
        loop {
            match &self.nodes[index] {
                Node::Leaf { symbol, .. } => return Ok(symbol.clone()),
                Node::Internal { left, right, .. } => {
                    index = if reader.next_bit()? { *right } else { *left };
                }
            }
        }
    }

    /// Render the canonical (whitespace-free) tree literal.
    pub fn serialize(&self) -> String {
        enum Step {
            Visit(usize),
            Text(char),
        }

        let mut out = String::new();
        let mut stack = vec![Step::Visit(self.root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Text(c) => out.push(c),
                Step::Visit(index) => match &self.nodes[index] {
                    Node::Leaf { symbol, .. } => symbol.write_literal(&mut out),
                    Node::Internal { left, right, .. } => {
                        out.push('(');
                        stack.push(Step::Text(')'));
                        stack.push(Step::Visit(*right));
                        stack.push(Step::Text(','));
                        stack.push(Step::Visit(*left));
                    }
                },
            }
        }
        out
    }

    /// Parse a tree literal produced by [`HuffmanTree::serialize`].
    ///
    /// # Errors
    /// Returns `HuffmanError::MalformedTree` for unbalanced or unknown
    /// tokens, duplicate symbols, nesting deeper than [`MAX_CODE_LEN`], or
    /// trailing text.
    pub fn deserialize(text: &str) -> Result<Self> {
        let mut parser = TreeParser {
            text,
            pos: 0,
            nodes: Vec::new(),
            seen: HashSet::new(),
        };
        let root = parser.parse_node(0)?;
        parser.skip_whitespace();
        if parser.pos != text.len() {
            return Err(parser.malformed("trailing characters after tree"));
        }
        Ok(HuffmanTree {
            nodes: parser.nodes,
            root,
        })
    }
}

struct TreeParser<'a, S> {
    text: &'a str,
    pos: usize,
    nodes: Vec<Node<S>>,
    seen: HashSet<S>,
}

impl<S: TreeSymbol> TreeParser<'_, S> {
    fn parse_node(&mut self, depth: usize) -> Result<usize> {
        if depth > MAX_CODE_LEN {
            return Err(self.malformed("tree nested deeper than 64 levels"));
        }
        self.skip_whitespace();

        if self.eat('(') {
            let left = self.parse_node(depth + 1)?;
            self.expect(',')?;
            let right = self.parse_node(depth + 1)?;
            self.expect(')')?;
            self.nodes.push(Node::Internal {
                count: 0,
                left,
                right,
            });
            return Ok(self.nodes.len() - 1);
        }

        let (symbol, used) = S::parse_literal(&self.text[self.pos..])
            .ok_or_else(|| self.malformed("expected '(' or a symbol"))?;
        if !self.seen.insert(symbol.clone()) {
            return Err(self.malformed(&format!("duplicate symbol {symbol:?}")));
        }
        self.pos += used;
        self.nodes.push(Node::Leaf { symbol, count: 0 });
        Ok(self.nodes.len() - 1)
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.text[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.text[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.malformed(&format!("expected {c:?}")))
        }
    }

    fn malformed(&self, reason: &str) -> crate::error::Error {
        HuffmanError::MalformedTree {
            position: self.pos,
            reason: reason.to_string(),
        }
        .into()
    }
}

/// A variable-length bit code, right-aligned in `bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    pub bits: u64,
    pub len: usize,
}

impl Code {
    pub const EMPTY: Code = Code { bits: 0, len: 0 };

    fn child(self, bit: bool) -> Code {
        Code {
            bits: (self.bits << 1) | bit as u64,
            len: self.len + 1,
        }
    }

    /// True if `self` is a proper or improper prefix of `other`.
    pub fn is_prefix_of(&self, other: &Code) -> bool {
        self.len <= other.len && (self.len == 0 || other.bits >> (other.len - self.len) == self.bits)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.len).rev() {
            f.write_str(if (self.bits >> i) & 1 == 1 { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Symbol -> code lookup derived from a tree.
#[derive(Debug, Clone)]
pub struct Encoding<S> {
    codes: HashMap<S, Code>,
}

impl<S: TreeSymbol> Encoding<S> {
    pub fn get(&self, symbol: &S) -> Option<&Code> {
        self.codes.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &Code)> {
        self.codes.iter()
    }

    /// Append the code for `symbol` to the stream.
    ///
    /// # Errors
    /// Returns `HuffmanError::SymbolNotInTable` if `symbol` was never tallied.
    pub fn encode(&self, symbol: &S, writer: &mut Base64Writer) -> Result<()> {
        let code = self
            .codes
            .get(symbol)
            .ok_or_else(|| HuffmanError::SymbolNotInTable(format!("{symbol:?}")))?;
        writer.append_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn table_from(text: &str) -> FrequencyTable<char> {
        let mut table = FrequencyTable::new();
        for c in text.chars() {
            table.tally(c);
        }
        table
    }

    #[test]
    fn test_tally_counts_and_order() {
        let table = table_from("banana");
        assert_eq!(table.len(), 3);
        assert_eq!(table.count(&'a'), 3);
        assert_eq!(table.count(&'n'), 2);
        assert_eq!(table.count(&'z'), 0);
        let order: Vec<char> = table.iter().map(|(s, _)| *s).collect();
        assert_eq!(order, vec!['b', 'a', 'n']);
    }

    #[test]
    fn test_node_counts_sum_to_root() {
        let tree = table_from("abracadabra").compile().unwrap();
        assert_eq!(tree.node(tree.root()).count(), 11);

        let parsed = HuffmanTree::<char>::deserialize(&tree.serialize()).unwrap();
        assert_eq!(parsed.node(parsed.root()).count(), 0);
    }

    #[test]
    fn test_empty_alphabet() {
        let table: FrequencyTable<char> = FrequencyTable::new();
        assert!(matches!(
            table.compile(),
            Err(Error::Huffman(HuffmanError::EmptyAlphabet))
        ));
    }

    #[test]
    fn test_single_symbol_gets_empty_code() {
        let tree = table_from("aaaa").compile().unwrap();
        let encoding = tree.make_encoding().unwrap();
        assert_eq!(encoding.get(&'a'), Some(&Code::EMPTY));
        assert_eq!(tree.serialize(), "'a'");

        // Decoding a single-leaf tree reads nothing, even from an empty stream.
        let mut reader = Base64Reader::new("");
        assert_eq!(tree.decode_symbol(&mut reader).unwrap(), 'a');
        assert_eq!(reader.bits_consumed(), 0);
    }

    #[test]
    fn test_tie_break_prefers_first_tallied() {
        // a, b, c all count 1: a and b merge first (a left), then c joins
        // against the merged node of count 2 -> c (count 1) is taken first.
        let tree = table_from("abc").compile().unwrap();
        assert_eq!(tree.serialize(), "('c',('a','b'))");
    }

    #[test]
    fn test_frequent_symbols_get_shorter_codes() {
        let tree = table_from("aaaaaaaabbbbccd").compile().unwrap();
        let encoding = tree.make_encoding().unwrap();
        let len = |c: char| encoding.get(&c).unwrap().len;
        assert!(len('a') <= len('b'));
        assert!(len('b') <= len('c'));
        assert!(len('c') <= len('d'));
        assert_eq!(len('a'), 1);
    }

    #[test]
    fn test_codes_are_prefix_free() {
        let tree = table_from("the quick brown fox jumps over the lazy dog")
            .compile()
            .unwrap();
        let encoding = tree.make_encoding().unwrap();
        let codes: Vec<Code> = encoding.iter().map(|(_, c)| *c).collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i != j {
                    assert!(!a.is_prefix_of(b), "{a} is a prefix of {b}");
                }
            }
        }
    }

    #[test]
    fn test_compile_is_deterministic() {
        let a = table_from("mississippi river").compile().unwrap();
        let b = table_from("mississippi river").compile().unwrap();
        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn test_serialize_round_trip_preserves_paths() {
        let tree = table_from("hello\nworld\n").compile().unwrap();
        let text = tree.serialize();
        assert!(!text.contains(' '));

        let parsed = HuffmanTree::<char>::deserialize(&text).unwrap();
        assert_eq!(parsed.serialize(), text);
        assert_eq!(parsed.leaf_count(), tree.leaf_count());

        let original = tree.make_encoding().unwrap();
        let reparsed = parsed.make_encoding().unwrap();
        for (symbol, code) in original.iter() {
            assert_eq!(reparsed.get(symbol), Some(code));
        }
    }

    #[test]
    fn test_deserialize_tolerates_whitespace() {
        let tree = HuffmanTree::<usize>::deserialize(" ( 3 ,\n (10, 0) ) ").unwrap();
        assert_eq!(tree.serialize(), "(3,(10,0))");
    }

    #[test]
    fn test_char_literal_escapes() {
        let tree = HuffmanTree::<char>::deserialize(r"('\n',('\'','\\'))").unwrap();
        let encoding = tree.make_encoding().unwrap();
        assert_eq!(encoding.get(&'\n').unwrap().to_string(), "0");
        assert_eq!(encoding.get(&'\'').unwrap().to_string(), "10");
        assert_eq!(encoding.get(&'\\').unwrap().to_string(), "11");
        assert_eq!(tree.serialize(), r"('\n',('\'','\\'))");
    }

    #[test]
    fn test_deserialize_rejects_malformed() {
        for bad in ["", "(", "('a',)", "('a','b'", "('a','b'))", "x", "('a','a')", "'ab'"] {
            let result = HuffmanTree::<char>::deserialize(bad);
            assert!(
                matches!(result, Err(Error::Huffman(HuffmanError::MalformedTree { .. }))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_deserialize_rejects_excessive_depth() {
        let mut text = String::new();
        for i in 0..70 {
            text.push_str(&format!("({i},"));
        }
        text.push_str("999");
        text.push_str(&")".repeat(70));
        assert!(HuffmanTree::<usize>::deserialize(&text).is_err());
    }

    #[test]
    fn test_encode_unknown_symbol() {
        let encoding = table_from("ab").compile().unwrap().make_encoding().unwrap();
        let mut writer = Base64Writer::new();
        assert!(matches!(
            encoding.encode(&'z', &mut writer),
            Err(Error::Huffman(HuffmanError::SymbolNotInTable(_)))
        ));
    }

    #[test]
    fn test_encode_decode_sequence() {
        let message = "abracadabra";
        let tree = table_from(message).compile().unwrap();
        let encoding = tree.make_encoding().unwrap();

        let mut writer = Base64Writer::new();
        for c in message.chars() {
            encoding.encode(&c, &mut writer).unwrap();
        }
        let text = writer.finish();

        let mut reader = Base64Reader::new(&text);
        let decoded: String = (0..message.len())
            .map(|_| tree.decode_symbol(&mut reader).unwrap())
            .collect();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_code_display_and_prefix() {
        let a = Code { bits: 0b10, len: 2 };
        let b = Code { bits: 0b101, len: 3 };
        let c = Code { bits: 0b011, len: 3 };
        assert_eq!(a.to_string(), "10");
        assert!(a.is_prefix_of(&b));
        assert!(!a.is_prefix_of(&c));
        assert!(Code::EMPTY.is_prefix_of(&c));
    }
}
