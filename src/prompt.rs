use std::borrow::Cow;
use std::io::{self, BufRead, Write};

/// Prompted line reader shared by the interactive loops.
///
/// Reads from any `BufRead`, so tests can feed it a byte slice instead of a
/// terminal. Reading stops at end of input or when a line matches one of the
/// exit sentinels (case-insensitive).
pub struct Prompt<R, W> {
    input: R,
    output: W,
    prompt: String,
    exit_sentinels: Vec<String>,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W, prompt: &str, exit_sentinels: &[String]) -> Self {
        Self {
            input,
            output,
            prompt: prompt.to_string(),
            exit_sentinels: exit_sentinels.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Next non-blank line with surrounding whitespace removed, or `None` once
    /// the session should end.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            write!(self.output, "{}", self.prompt)?;
            self.output.flush()?;

            let mut raw = Vec::new();
            if self.input.read_until(b'\n', &mut raw)? == 0 {
                return Ok(None);
            }
            let decoded = String::from_utf8_lossy(&raw);
            if let Cow::Owned(_) = decoded {
                log::warn!("Input line is not valid UTF-8; invalid bytes were replaced");
            }
            let line = decoded.trim();
            if line.is_empty() {
                continue;
            }
            if self.is_exit(line) {
                return Ok(None);
            }
            return Ok(Some(line.to_string()));
        }
    }

    pub fn is_exit(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.exit_sentinels.iter().any(|s| *s == lower)
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }
}
