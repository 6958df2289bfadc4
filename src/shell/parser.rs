//! Shell line parsing
//!
//! Argument splitting and multi-line accumulation for quoted strings.

use thiserror::Error;

/// Maximum number of arguments kept from one command line
pub const MAX_ARGS: usize = 32;

/// Maximum length of an accumulated command line
pub const MAX_LINE: usize = 4096;

/// Errors raised while accumulating a command line
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    #[error("string too long")]
    TooLong,
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

/// Split a command line into at most `max` arguments
///
/// Arguments are separated by whitespace. A `"` at the start of an argument
/// opens a quoted section that runs to the next `"`, spaces included; the
/// quotes themselves are dropped. A `"` inside an unquoted argument is kept
/// as a literal character.
pub fn split_args(line: &str, max: usize) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in line.chars() {
        if quoted {
            if c == '"' {
                quoted = false;
            } else {
                current.push(c);
            }
            continue;
        }

        if is_separator(c) {
            if in_token {
                args.push(std::mem::take(&mut current));
                in_token = false;
                if args.len() == max {
                    return args;
                }
            }
        } else if c == '"' && !in_token {
            quoted = true;
            in_token = true;
        } else {
            current.push(c);
            in_token = true;
        }
    }

    if in_token && args.len() < max {
        args.push(current);
    }
    args
}

/// Accumulates input lines until every opened quote is closed
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: String,
    open_quote: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw input line
    ///
    /// Returns `Ok(Some(line))` when a complete command is ready, `Ok(None)`
    /// when more input is needed (or a blank line arrived outside a quote), and
    /// `Err(LineError::TooLong)` when an open quote overflowed the buffer;
    /// the buffer is reset in that case.
    pub fn push_line(&mut self, line: &str) -> Result<Option<String>, LineError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() && !self.open_quote {
            return Ok(None);
        }

        let mut prev: Option<char> = None;
        for c in line.chars() {
            if c == '"' {
                if self.open_quote {
                    self.open_quote = false;
                } else if prev.map_or(true, is_separator) {
                    self.open_quote = true;
                }
            }
            prev = Some(c);
        }

        if !self.buf.is_empty() {
            self.buf.push('\n');
        }
        self.buf.push_str(line);

        if self.open_quote {
            if self.buf.len() >= MAX_LINE - 1 {
                self.reset();
                return Err(LineError::TooLong);
            }
            return Ok(None);
        }

        Ok(Some(std::mem::take(&mut self.buf)))
    }

    /// Whether a quoted argument is still open
    pub fn is_continuing(&self) -> bool {
        self.open_quote
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.open_quote = false;
    }
}
