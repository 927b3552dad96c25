//! Forward-only cursor over the raw source lines.
//!
//! All sub-parsers share one cursor passed by mutable reference; it only
//! moves forward, with bounded lookahead via `peek`.

/// Cursor over an ordered sequence of trimmed source lines.
#[derive(Debug)]
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines().map(str::trim_end).collect(),
            pos: 0,
        }
    }

    /// Line under the cursor, or None past end-of-input.
    pub fn current(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    /// Look ahead `n` lines without moving (peek(0) == current()).
    pub fn peek(&self, n: usize) -> Option<&'a str> {
        self.lines.get(self.pos + n).copied()
    }

    pub fn advance(&mut self) {
        if self.pos < self.lines.len() {
            self.pos += 1;
        }
    }

    /// 1-based line number of the current position, for log context.
    pub fn line_number(&self) -> usize {
        self.pos + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_walk() {
        let mut cursor = LineCursor::new("one\ntwo\nthree");
        assert_eq!(cursor.current(), Some("one"));
        assert_eq!(cursor.peek(1), Some("two"));
        assert_eq!(cursor.peek(2), Some("three"));
        assert_eq!(cursor.peek(3), None);

        cursor.advance();
        assert_eq!(cursor.current(), Some("two"));
        assert_eq!(cursor.line_number(), 2);

        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.current(), None);

        // Advancing past the end is a no-op
        cursor.advance();
        assert_eq!(cursor.current(), None);
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        let cursor = LineCursor::new("line \t\n");
        assert_eq!(cursor.current(), Some("line"));
    }
}
