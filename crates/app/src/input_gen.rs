//! Sample word list generation.
//!
//! When no input file is specified, we generate a sorted list of lowercase
//! words with the features that make the word models differ visibly:
//! - Shared stems with several suffixes (long common prefixes)
//! - Skewed letter frequencies (short codes for common letters)
//! - Occasional unrelated words (prefix resets)

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use std::io::Write;

/// Letters repeated roughly in proportion to English usage.
const WEIGHTED_LETTERS: &[u8] =
    b"eeeeeeeeeeeetttttttttaaaaaaaaoooooooiiiiiiinnnnnnnsssssshhhhhhrrrrrrddddllllcccuuummwwffggyyppbbvkjxqz";

const SUFFIXES: &[&str] = &["", "s", "ed", "er", "ers", "ing", "ly", "ness", "able", "ment"];

/// Generate a sorted, deduplicated sample word list.
///
/// # Arguments
/// - `seed`: random seed for determinism
/// - `count`: number of words to produce
pub fn generate_sample_words(seed: u64, count: usize) -> Vec<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut words = BTreeSet::new();

    while words.len() < count {
        let stem = random_word(&mut rng, 2..=6);

        // 20% standalone words, the rest grow a family of suffixed forms
        if rng.gen_range(0..10) < 2 {
            words.insert(stem);
            continue;
        }

        let family = rng.gen_range(1..=4);
        for _ in 0..family {
            let suffix = SUFFIXES[rng.gen_range(0..SUFFIXES.len())];
            words.insert(format!("{stem}{suffix}"));
        }
    }

    words.into_iter().take(count).collect()
}

/// Build one word from weighted letters.
fn random_word(rng: &mut ChaCha8Rng, len: std::ops::RangeInclusive<usize>) -> String {
    let len = rng.gen_range(len);
    (0..len)
        .map(|_| WEIGHTED_LETTERS[rng.gen_range(0..WEIGHTED_LETTERS.len())] as char)
        .collect()
}

/// Write a generated list to a file, one word per line.
pub fn write_sample_file(path: &std::path::Path, seed: u64, count: usize) -> std::io::Result<()> {
    let words = generate_sample_words(seed, count);
    let mut file = std::fs::File::create(path)?;
    for word in &words {
        writeln!(file, "{word}")?;
    }
    Ok(())
}
