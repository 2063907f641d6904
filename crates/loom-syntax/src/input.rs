//! Character-stream input (spec §4.5), grounded on
//! `original_source/source/parser.h`'s `input_t`/`srcpos_t`.

use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrcPos {
    pub line: u32,
    pub col: u32,
}

impl std::fmt::Display for SrcPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A shared-ownership view over the source text plus a cursor. `Input`
/// is cheaply `Clone`d (an `Rc` bump plus three integers) so the parser
/// can snapshot-and-restore on failed alternatives (`parseIdent`'s
/// `sub = *input` pattern in the C original becomes `input.clone()`).
#[derive(Clone)]
pub struct Input {
    source: Rc<str>,
    idx: usize,
    pos: SrcPos,
}

impl Input {
    pub fn new(source: impl Into<Rc<str>>) -> Self {
        Input { source: source.into(), idx: 0, pos: SrcPos { line: 1, col: 1 } }
    }

    pub fn eof(&self) -> bool {
        self.idx >= self.source.len()
    }

    pub fn pos(&self) -> SrcPos {
        self.pos
    }

    pub fn peek_ch(&self) -> Option<char> {
        self.source[self.idx..].chars().next()
    }

    pub fn read_ch(&mut self) -> Option<char> {
        let ch = self.peek_ch()?;
        self.idx += ch.len_utf8();
        if ch == '\n' {
            self.pos.line += 1;
            self.pos.col = 1;
        } else {
            self.pos.col += 1;
        }
        Some(ch)
    }

    pub fn match_ch(&mut self, ch: char) -> bool {
        if self.peek_ch() == Some(ch) {
            self.read_ch();
            true
        } else {
            false
        }
    }

    /// Matches a literal string and only commits the advance on full
    /// success (backtracking), mirroring `input_match_str`'s
    /// snapshot/restore behavior.
    pub fn match_str(&mut self, s: &str) -> bool {
        let mut probe = self.clone();
        for want in s.chars() {
            match probe.read_ch() {
                Some(got) if got == want => continue,
                _ => return false,
            }
        }
        *self = probe;
        true
    }

    /// Matches a keyword: `match_str` plus a word-boundary check so
    /// `mod` doesn't consume the first three letters of `module`.
    pub fn match_keyword(&mut self, kw: &str) -> bool {
        let mut probe = self.clone();
        if !probe.match_str(kw) {
            return false;
        }
        match probe.peek_ch() {
            Some(c) if c.is_alphanumeric() || c == '_' || c == '$' => false,
            _ => {
                *self = probe;
                true
            }
        }
    }

    /// Consume whitespace, `//` line comments and non-nested `/* */`
    /// block comments (spec §9: nested comments are out of scope).
    ///
    /// Returns `Err` with the position of the opening `/*` if a block
    /// comment is never closed before EOF (spec §7 names "unterminated
    /// ... comments" as a lex error, the same as an unterminated
    /// string).
    pub fn eat_ws(&mut self) -> Result<(), SrcPos> {
        loop {
            match self.peek_ch() {
                Some(c) if c.is_whitespace() => {
                    self.read_ch();
                    continue;
                }
                _ => {}
            }
            if self.match_str("//") {
                while !self.eof() {
                    if self.read_ch() == Some('\n') {
                        break;
                    }
                }
                continue;
            }
            let comment_start = self.pos();
            if self.match_str("/*") {
                loop {
                    if self.eof() {
                        return Err(comment_start);
                    }
                    if self.match_str("*/") {
                        break;
                    }
                    self.read_ch();
                }
                continue;
            }
            break;
        }
        Ok(())
    }

    pub fn rest(&self) -> &str {
        &self.source[self.idx..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eat_ws_skips_line_comment() {
        let mut input = Input::new("  // hi\n42");
        input.eat_ws().unwrap();
        assert_eq!(input.rest(), "42");
    }

    #[test]
    fn test_eat_ws_skips_block_comment_non_nested() {
        let mut input = Input::new("/* a /* b */ c */42");
        input.eat_ws().unwrap();
        // Non-nested: the first `*/` ends the comment, leaving ` c */42`.
        assert_eq!(input.rest(), " c */42");
    }

    #[test]
    fn test_eat_ws_reports_unterminated_block_comment() {
        let mut input = Input::new("/* never closed");
        let err = input.eat_ws().unwrap_err();
        assert_eq!(err, SrcPos { line: 1, col: 1 });
    }

    #[test]
    fn test_match_keyword_respects_word_boundary() {
        let mut input = Input::new("module");
        assert!(!input.match_keyword("mod"));
        assert_eq!(input.rest(), "module");
    }

    #[test]
    fn test_line_col_tracking() {
        let mut input = Input::new("a\nb");
        input.read_ch();
        input.read_ch();
        assert_eq!(input.pos(), SrcPos { line: 2, col: 1 });
    }
}
