//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: one indicatif bar counting drugs as they are flattened.
//! Non-TTY mode: hidden bar, the final log summary is the only output.

use std::io::IsTerminal;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Counting bar: drugs processed out of drugs found
fn drug_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<10.cyan.bold} {bar:30.green/dim} {pos:>7}/{len:7} {per_sec:>10} {wide_msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("--")
}

/// Progress context shared by the runner and the CLI.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY on stderr.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    /// Context with no visible bars, for tests and library callers.
    pub fn hidden() -> Self {
        Self::with_tty(false)
    }

    fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Bar over `total` drugs. Hidden (no-op) when not on a TTY.
    pub fn drug_bar(&self, total: usize) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(drug_style());
        pb.set_prefix("drugs");
        pb
    }

    /// Print a line above managed progress bars.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// `MultiProgress` for the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_num_small() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(12), "12");
        assert_eq!(fmt_num(123), "123");
    }

    #[test]
    fn fmt_num_thousands() {
        assert_eq!(fmt_num(1_000), "1,000");
        assert_eq!(fmt_num(12_345), "12,345");
        assert_eq!(fmt_num(123_456), "123,456");
        assert_eq!(fmt_num(1_234_567), "1,234,567");
    }

    #[test]
    fn hidden_context_has_hidden_bar() {
        let ctx = ProgressContext::hidden();
        assert!(!ctx.is_tty());
        assert!(ctx.drug_bar(10).is_hidden());
    }
}
