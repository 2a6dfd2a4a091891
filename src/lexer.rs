use super::token::Token;

/// Whitespace between atoms. Unicode spaces count, except the non-breaking ones and NEL;
/// the information separators U+001C..U+001F count as well.
fn is_blank(ch: char) -> bool {
    match ch {
        '\u{1C}'..='\u{1F}' => true,
        '\u{85}' | '\u{A0}' | '\u{2007}' | '\u{202F}' => false,
        ch => ch.is_whitespace(),
    }
}

pub struct Lexer<'a> {
    program: &'a str,
    cursor: usize,
    line_start: usize, // cursor position right after the last newline
}

impl<'a> Lexer<'a> {
    pub fn new(program: &'a str) -> Self {
        Lexer {
            program,
            cursor: 0,
            line_start: 0,
        }
    }

    /// Get the next token. This consumes the tokens.
    ///
    /// Every line ends with exactly one `EndOfLine`, including blank and comment-only lines.
    /// A trailing newline does not open another line.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            self.trim();

            match self.next_char(false) {
                Some('\n') => {
                    self.line_start = self.cursor;
                    return Some(Token::EndOfLine);
                }
                Some(';') => self.skip_comment(),
                Some(',') => {}
                Some('\'') => return Some(self.read_str_literal()),
                Some(ch) => return Some(self.read_token(ch)),
                None => {
                    // Last line without a trailing newline
                    if self.cursor > self.line_start {
                        self.line_start = self.cursor;
                        return Some(Token::EndOfLine);
                    }
                    return None;
                }
            }
        }
    }

    /// Trim whitespaces, tabs, carriage returns, control chars. Newlines are kept.
    fn trim(&mut self) {
        while let Some(ch) = self.next_char(true) {
            if ch == '\n' || !is_blank(ch) {
                break;
            }
            self.cursor += ch.len_utf8();
        }
    }

    /// Skip the rest of the line, leaving the newline to be read next
    fn skip_comment(&mut self) {
        while let Some(ch) = self.next_char(true) {
            if ch == '\n' {
                break;
            }
            self.cursor += ch.len_utf8();
        }
    }

    /// Read a string literal that starts with "'". It ends at the next "'" or at the end of the line.
    fn read_str_literal(&mut self) -> Token<'a> {
        let start_pos = self.cursor;
        while let Some(ch) = self.next_char(true) {
            if ch == '\n' {
                // Strings cannot continue from next line
                return Token::StringLiteral(&self.program[start_pos..self.cursor]);
            }
            self.cursor += ch.len_utf8();
            if ch == '\'' {
                return Token::StringLiteral(&self.program[start_pos..self.cursor - 1]);
            }
        }

        Token::StringLiteral(&self.program[start_pos..self.cursor])
    }

    /// Read an atom: everything up to whitespace, ',' or ';'. `first` is already consumed.
    fn read_token(&mut self, first: char) -> Token<'a> {
        let start_pos = self.cursor - first.len_utf8();
        while let Some(ch) = self.next_char(true) {
            if is_blank(ch) || ch == ',' || ch == ';' {
                break;
            }
            self.cursor += ch.len_utf8();
        }

        Token::new(&self.program[start_pos..self.cursor])
    }

    /// Get the next char and increase the cursor if `peek` is false
    fn next_char(&mut self, peek: bool) -> Option<char> {
        let ch = self.program[self.cursor..].chars().next()?;
        if !peek {
            self.cursor += ch.len_utf8();
        }
        Some(ch)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
