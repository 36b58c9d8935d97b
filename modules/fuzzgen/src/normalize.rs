//! Raw source text → canonical tokens.
//!
//! A token is a line with surrounding whitespace and any leading/trailing
//! non-alphanumeric characters removed, lower-cased. Interior characters are
//! kept as-is, so `"  Admin.Panel!! "` becomes `"admin.panel"`.

/// Longest raw line accepted, newline excluded.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Normalize one raw line. `None` when nothing survives trimming.
pub fn normalize_line(line: &str) -> Option<String> {
    let token = line
        .trim()
        .trim_matches(|c: char| !c.is_ascii_alphanumeric());

    if token.is_empty() {
        None
    } else {
        Some(token.to_lowercase())
    }
}

/// A raw line longer than the normalizer's limit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line} exceeds {limit} bytes")]
pub struct LineTooLong {
    /// 1-based number of the offending line.
    pub line: u64,
    pub limit: usize,
}

/// Incremental normalizer for one response body.
///
/// Chunks arrive with arbitrary boundaries; bytes after the last newline are
/// held back until the next chunk or [`Normalizer::finish`]. At most
/// `max_line` bytes are ever held back: a longer line is reported as
/// [`LineTooLong`] and the buffer is discarded, after which the body should
/// be abandoned.
#[derive(Debug)]
pub struct Normalizer {
    partial: Vec<u8>,
    /// Prefix of `partial` already searched for a newline.
    scanned: usize,
    lines: u64,
    max_line: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_LEN)
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            partial: Vec::new(),
            scanned: 0,
            lines: 0,
            max_line: max_line.max(1),
        }
    }

    /// Append a chunk and lazily yield the tokens of every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Tokens<'_> {
        self.partial.extend_from_slice(chunk);
        Tokens {
            normalizer: self,
            consumed: 0,
            failed: false,
        }
    }

    /// Flush the trailing line that had no terminating newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.partial);
        self.scanned = 0;
        self.lines += 1;
        normalize_bytes(&line)
    }

    /// Raw lines seen so far, including ones that normalized to nothing.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Bytes held back waiting for a newline.
    pub fn buffered(&self) -> usize {
        self.partial.len()
    }
}

/// Tokens completed by one [`Normalizer::push`]. Consumed lines are dropped
/// from the normalizer's buffer when this is dropped.
pub struct Tokens<'a> {
    normalizer: &'a mut Normalizer,
    consumed: usize,
    failed: bool,
}

impl Tokens<'_> {
    fn overflow(&mut self) -> LineTooLong {
        self.failed = true;
        LineTooLong {
            line: self.normalizer.lines + 1,
            limit: self.normalizer.max_line,
        }
    }
}

impl Iterator for Tokens<'_> {
    type Item = Result<String, LineTooLong>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let n = &mut *self.normalizer;
            let from = self.consumed.max(n.scanned);
            let Some(offset) = n.partial[from..].iter().position(|&b| b == b'\n') else {
                n.scanned = n.partial.len();
                if n.partial.len() - self.consumed > n.max_line {
                    return Some(Err(self.overflow()));
                }
                return None;
            };

            let end = from + offset;
            if end - self.consumed > n.max_line {
                return Some(Err(self.overflow()));
            }
            let token = normalize_bytes(&n.partial[self.consumed..end]);
            self.consumed = end + 1;
            n.lines += 1;
            if let Some(token) = token {
                return Some(Ok(token));
            }
        }
    }
}

impl Drop for Tokens<'_> {
    fn drop(&mut self) {
        let n = &mut *self.normalizer;
        if self.failed {
            n.partial.clear();
            n.scanned = 0;
            return;
        }
        n.partial.drain(..self.consumed);
        n.scanned = n.scanned.saturating_sub(self.consumed);
    }
}

fn normalize_bytes(line: &[u8]) -> Option<String> {
    normalize_line(&String::from_utf8_lossy(line))
}
