//! Run report comparing word models on one word list.
//!
//! Each strategy run records:
//! - Bundle size against the plain-text baseline (words joined by `\n`)
//! - Payload bits before padding
//! - Time spent compressing and verifying
//! - Whether the bundle expanded back to the exact input
//!
//! # Thread Safety
//!
//! `Report` is plain data. Runs on separate threads should each keep their
//! own report and merge the `strategies` vectors at the end.

use crate::model::Strategy;
use std::time::{Duration, Instant};

/// Outcome of compressing the word list with one strategy.
#[derive(Debug, Clone)]
pub struct StrategyReport {
    pub strategy: Strategy,

    /// Length of the full bundle text in bytes
    pub bundle_bytes: usize,

    /// Payload length in bits before padding
    pub payload_bits: usize,

    /// Time spent compressing, writing and verifying
    pub elapsed: Duration,

    /// Whether the bundle expanded back to the exact input text
    pub verified: bool,
}

/// Metrics for one run over a word list.
#[derive(Debug, Clone)]
pub struct Report {
    // === Timing ===
    /// When the run started
    pub start_time: Instant,

    /// When the run ended (set on completion)
    pub end_time: Option<Instant>,

    // === Input ===
    /// Number of words read
    pub word_count: usize,

    /// Size of the plain-text rendering in bytes
    pub plain_bytes: usize,

    // === Strategies ===
    /// One entry per strategy, in run order
    pub strategies: Vec<StrategyReport>,
}

impl Report {
    /// Create a report with start time set to now.
    pub fn new(word_count: usize, plain_bytes: usize) -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            word_count,
            plain_bytes,
            strategies: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: StrategyReport) {
        self.strategies.push(entry);
    }

    /// Mark the run as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Bundle size relative to plain text (bundle / plain).
    ///
    /// Returns 0.0 if the plain text is empty.
    pub fn ratio(&self, entry: &StrategyReport) -> f64 {
        if self.plain_bytes == 0 {
            0.0
        } else {
            entry.bundle_bytes as f64 / self.plain_bytes as f64
        }
    }

    /// Average payload bits spent per word.
    pub fn bits_per_word(&self, entry: &StrategyReport) -> f64 {
        if self.word_count == 0 {
            0.0
        } else {
            entry.payload_bits as f64 / self.word_count as f64
        }
    }

    /// The verified strategy with the smallest bundle.
    pub fn best(&self) -> Option<&StrategyReport> {
        self.strategies
            .iter()
            .filter(|e| e.verified)
            .min_by_key(|e| e.bundle_bytes)
    }

    pub fn all_verified(&self) -> bool {
        self.strategies.iter().all(|e| e.verified)
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Compression Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!("Words: {}", self.word_count);
        println!("Plain text: {} bytes", self.plain_bytes);
        println!();

        println!(
            "{:<10} {:>10} {:>12} {:>8} {:>10} {:>10} {:>9}",
            "strategy", "bytes", "payload bits", "ratio", "bits/word", "time (ms)", "verified"
        );
        for entry in &self.strategies {
            println!(
                "{:<10} {:>10} {:>12} {:>7.1}% {:>10.2} {:>10.2} {:>9}",
                entry.strategy.name(),
                entry.bundle_bytes,
                entry.payload_bits,
                self.ratio(entry) * 100.0,
                self.bits_per_word(entry),
                entry.elapsed.as_secs_f64() * 1000.0,
                if entry.verified { "yes" } else { "NO" },
            );
        }
        println!();
    }

    /// Print just the final result (pass/fail).
    pub fn print_result(&self) {
        if self.strategies.is_empty() {
            println!("✗ No strategies were run");
        } else if !self.all_verified() {
            let failed: Vec<&str> = self
                .strategies
                .iter()
                .filter(|e| !e.verified)
                .map(|e| e.strategy.name())
                .collect();
            println!("✗ Round trip failed: {}", failed.join(", "));
        } else if let Some(best) = self.best() {
            println!("✓ All bundles verified");
            println!(
                "  best: {} at {} bytes ({:.1}% of plain text)",
                best.strategy.name(),
                best.bundle_bytes,
                self.ratio(best) * 100.0
            );
        }
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        let mut text = format!(
            "duration_ms={}\n\
             word_count={}\n\
             plain_bytes={}\n",
            self.duration().as_millis(),
            self.word_count,
            self.plain_bytes,
        );
        for entry in &self.strategies {
            let name = entry.strategy.name();
            text.push_str(&format!(
                "{name}.bundle_bytes={}\n\
                 {name}.payload_bits={}\n\
                 {name}.ratio={:.4}\n\
                 {name}.elapsed_us={}\n\
                 {name}.verified={}\n",
                entry.bundle_bytes,
                entry.payload_bits,
                self.ratio(entry),
                entry.elapsed.as_micros(),
                entry.verified,
            ));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(strategy: Strategy, bundle_bytes: usize, verified: bool) -> StrategyReport {
        StrategyReport {
            strategy,
            bundle_bytes,
            payload_bits: bundle_bytes * 4,
            elapsed: Duration::from_millis(1),
            verified,
        }
    }

    #[test]
    fn test_report_creation() {
        let report = Report::new(10, 100);
        assert!(report.end_time.is_none());
        assert!(report.strategies.is_empty());
        assert!(report.duration().as_millis() < 100);
    }

    #[test]
    fn test_ratio() {
        let report = Report::new(10, 1000);
        assert_eq!(report.ratio(&entry(Strategy::Prefix, 750, true)), 0.75);

        let empty = Report::new(0, 0);
        assert_eq!(empty.ratio(&entry(Strategy::Prefix, 750, true)), 0.0);
        assert_eq!(empty.bits_per_word(&entry(Strategy::Prefix, 750, true)), 0.0);
    }

    #[test]
    fn test_best_skips_unverified() {
        let mut report = Report::new(10, 1000);
        report.record(entry(Strategy::Letters, 600, true));
        report.record(entry(Strategy::Prefix, 400, false));
        report.record(entry(Strategy::Pairs, 500, true));

        assert_eq!(report.best().unwrap().strategy, Strategy::Pairs);
        assert!(!report.all_verified());
    }

    #[test]
    fn test_complete() {
        let mut report = Report::new(1, 1);
        std::thread::sleep(Duration::from_millis(5));
        report.complete();
        let first = report.duration();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(report.duration(), first);
    }

    #[test]
    fn test_export_text() {
        let mut report = Report::new(3, 11);
        report.record(entry(Strategy::Letters, 22, true));

        let text = report.export_text();
        assert!(text.contains("word_count=3"));
        assert!(text.contains("plain_bytes=11"));
        assert!(text.contains("letters.bundle_bytes=22"));
        assert!(text.contains("letters.ratio=2.0000"));
        assert!(text.contains("letters.elapsed_us=1000"));
        assert!(text.contains("letters.verified=true"));
    }
}
