//! CLI command implementations

pub mod history;
pub mod init;
pub mod run;
pub mod serve;
pub mod watch;

use std::io::Write;

/// Prints a transcript to stdout as it grows.
///
/// Only the new suffix is written when the transcript extends what is already
/// on screen; anything else reprints it in full.
#[derive(Default)]
pub struct TranscriptPrinter {
    shown: String,
}

impl TranscriptPrinter {
    pub fn update(&mut self, total: &str) {
        let mut stdout = std::io::stdout().lock();
        let result = match total.strip_prefix(self.shown.as_str()) {
            Some(delta) => stdout.write_all(delta.as_bytes()),
            None => writeln!(stdout).and_then(|_| stdout.write_all(total.as_bytes())),
        };
        // Stdout closed (e.g. piped into `head`): nothing left to show
        let _ = result.and_then(|_| stdout.flush());

        self.shown.clear();
        self.shown.push_str(total);
    }

    /// End the output with a newline if anything was printed
    pub fn finish(&self) {
        if !self.shown.is_empty() && !self.shown.ends_with('\n') {
            println!();
        }
    }
}
