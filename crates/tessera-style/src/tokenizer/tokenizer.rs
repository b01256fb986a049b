//! The tokenizer proper, a lazy single-pass lexer over the input text.

use crate::error::StyleError;

use super::token::{HashType, NumericType, SourceLocation, Token, TokenKind};

/// Tracks how far into the input the tokenizer has read.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    /// Index into the char buffer. Doubles as the character offset.
    position: usize,
    /// Byte offset from the start of the input.
    byte_offset: usize,
    /// 0-based count of newlines seen so far.
    lines: usize,
    /// 0-based character column on the current line.
    line_chars: usize,
}

impl Cursor {
    fn location(self) -> SourceLocation {
        SourceLocation {
            byte_offset: self.byte_offset,
            char_offset: self.position,
            line: self.lines + 1,
            column: self.line_chars + 1,
        }
    }
}

/// A lazy tokenizer over style sheet text.
///
/// Tokens are produced one at a time by [`Tokenizer::next_token`], or
/// through the [`Iterator`] impl which ends after the EOF token. The
/// tokenizer is total over arbitrary input: malformed constructs
/// produce [`TokenKind::BadString`] / [`TokenKind::BadUrl`] recovery
/// tokens and queue a recoverable diagnostic instead of failing.
pub struct Tokenizer {
    /// The input, decoded to code points up front.
    input: Vec<char>,
    /// Read position, with location bookkeeping.
    cursor: Cursor,
    /// Snapshot taken before the last consume, for one-step reconsume.
    prev_cursor: Cursor,
    /// Recoverable problems found while lexing, drained by the consumer.
    diagnostics: Vec<StyleError>,
    /// Set once the EOF token has been yielded through the iterator.
    finished: bool,
}

impl Tokenizer {
    /// Create a new tokenizer over the given input.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into().chars().collect(),
            cursor: Cursor::default(),
            prev_cursor: Cursor::default(),
            diagnostics: Vec::new(),
            finished: false,
        }
    }

    /// Drain the diagnostics collected so far.
    ///
    /// The rule parser forwards these to its error sink after each
    /// token; they never abort tokenization.
    pub fn take_diagnostics(&mut self) -> Vec<StyleError> {
        std::mem::take(&mut self.diagnostics)
    }

    /// The location the next token will start at.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        self.cursor.location()
    }

    /// [§ 4.3.1 Consume a token](https://www.w3.org/TR/css-syntax-3/#consume-token)
    ///
    /// Lex and return the next token. After the end of input this
    /// keeps returning EOF tokens.
    pub fn next_token(&mut self) -> Token {
        let location = self.cursor.location();
        let kind = self.consume_token_kind();
        Token { kind, location }
    }

    fn consume_token_kind(&mut self) -> TokenKind {
        // Comments are tokens of their own here; skipping them is the
        // parser's job.
        if self.peek() == Some('/') && self.peek_at(1) == Some('*') {
            return self.consume_comment();
        }

        let c = match self.consume() {
            Some(c) => c,
            None => return TokenKind::Eof,
        };

        match c {
            c if is_whitespace(c) => {
                self.consume_whitespace();
                TokenKind::Whitespace
            }

            '"' | '\'' => self.consume_string(c),

            '#' => {
                // "If the next input code point is an ident code point or
                // the next two input code points are a valid escape..."
                if self.peek().is_some_and(is_ident_code_point)
                    || self.is_valid_escape(self.peek(), self.peek_at(1))
                {
                    let hash_type = if self.would_start_ident_sequence() {
                        HashType::Id
                    } else {
                        HashType::Unrestricted
                    };
                    let value = self.consume_ident_sequence();
                    TokenKind::Hash { value, hash_type }
                } else {
                    TokenKind::Delim('#')
                }
            }

            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,

            '+' | '.' => {
                if self.would_start_number_after(c) {
                    self.reconsume();
                    self.consume_numeric()
                } else {
                    TokenKind::Delim(c)
                }
            }

            '-' => {
                if self.would_start_number_after('-') {
                    self.reconsume();
                    self.consume_numeric()
                } else {
                    self.reconsume();
                    if self.would_start_ident_sequence() {
                        self.consume_ident_like()
                    } else {
                        let _ = self.consume();
                        TokenKind::Delim('-')
                    }
                }
            }

            '@' => {
                if self.would_start_ident_sequence() {
                    TokenKind::AtKeyword(self.consume_ident_sequence())
                } else {
                    TokenKind::Delim('@')
                }
            }

            '\\' => {
                if self.is_valid_escape(Some('\\'), self.peek()) {
                    self.reconsume();
                    self.consume_ident_like()
                } else {
                    self.diagnose("stray backslash");
                    TokenKind::Delim('\\')
                }
            }

            c if c.is_ascii_digit() => {
                self.reconsume();
                self.consume_numeric()
            }

            c if is_ident_start_code_point(c) => {
                self.reconsume();
                self.consume_ident_like()
            }

            c => TokenKind::Delim(c),
        }
    }

    /// [§ 4.3.2 Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
    ///
    /// One comment per token; running into EOF is a recoverable error.
    fn consume_comment(&mut self) -> TokenKind {
        let _ = self.consume(); // /
        let _ = self.consume(); // *

        loop {
            match self.consume() {
                Some('*') if self.peek() == Some('/') => {
                    let _ = self.consume(); // /
                    return TokenKind::Comment;
                }
                Some(_) => {}
                None => {
                    self.diagnose("unterminated comment");
                    return TokenKind::Comment;
                }
            }
        }
    }

    fn consume_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            let _ = self.consume();
        }
    }

    /// [§ 4.3.4 Consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    fn consume_string(&mut self, ending: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.consume() {
                Some(c) if c == ending => return TokenKind::QuotedString(value),

                None => {
                    self.diagnose("unterminated string");
                    return TokenKind::BadString;
                }

                Some('\n') => {
                    // An unescaped newline ends the string irrecoverably;
                    // the newline itself stays in the stream so rule-level
                    // recovery sees it.
                    self.reconsume();
                    self.diagnose("newline in string");
                    return TokenKind::BadString;
                }

                Some('\\') => match self.peek() {
                    None => {}
                    Some('\n') => {
                        let _ = self.consume();
                    }
                    Some(_) => {
                        if let Some(c) = self.consume_escaped_code_point() {
                            value.push(c);
                        }
                    }
                },

                Some(c) => value.push(c),
            }
        }
    }

    /// [§ 4.3.5 Consume a numeric token](https://www.w3.org/TR/css-syntax-3/#consume-numeric-token)
    fn consume_numeric(&mut self) -> TokenKind {
        let (value, int_value, numeric_type) = self.consume_number();

        if self.would_start_ident_sequence() {
            let unit = self.consume_ident_sequence();
            TokenKind::Dimension {
                value,
                int_value,
                numeric_type,
                unit,
            }
        } else if self.peek() == Some('%') {
            let _ = self.consume();
            TokenKind::Percentage {
                value,
                int_value,
                numeric_type,
            }
        } else {
            TokenKind::Number {
                value,
                int_value,
                numeric_type,
            }
        }
    }

    /// [§ 4.3.12 Consume a number](https://www.w3.org/TR/css-syntax-3/#consume-number)
    ///
    /// Integer part, fractional part only if a digit follows the `.`,
    /// optional exponent.
    fn consume_number(&mut self) -> (f64, Option<i64>, NumericType) {
        let mut numeric_type = NumericType::Integer;
        let mut repr = String::new();

        if matches!(self.peek(), Some('+' | '-')) {
            repr.push(self.consume().unwrap_or('+'));
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            repr.push(self.consume().unwrap_or('0'));
        }

        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            repr.push(self.consume().unwrap_or('.'));
            repr.push(self.consume().unwrap_or('0'));
            numeric_type = NumericType::Number;

            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                repr.push(self.consume().unwrap_or('0'));
            }
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let next = self.peek_at(1);
            let has_sign = matches!(next, Some('+' | '-'));
            let digit_pos = if has_sign { 2 } else { 1 };

            if self.peek_at(digit_pos).is_some_and(|c| c.is_ascii_digit()) {
                repr.push(self.consume().unwrap_or('e'));
                if has_sign {
                    repr.push(self.consume().unwrap_or('+'));
                }
                repr.push(self.consume().unwrap_or('0'));
                numeric_type = NumericType::Number;

                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    repr.push(self.consume().unwrap_or('0'));
                }
            }
        }

        let value: f64 = repr.parse().unwrap_or(0.0);
        let int_value = if numeric_type == NumericType::Integer {
            repr.parse().ok()
        } else {
            None
        };

        (value, int_value, numeric_type)
    }

    /// [§ 4.3.6 Consume an ident-like token](https://www.w3.org/TR/css-syntax-3/#consume-ident-like-token)
    ///
    /// `url(` is lexed specially only for a case-insensitive "url"
    /// immediately followed by `(`; a quoted argument demotes it back
    /// to an ordinary function token.
    fn consume_ident_like(&mut self) -> TokenKind {
        let name = self.consume_ident_sequence();

        if name.eq_ignore_ascii_case("url") && self.peek() == Some('(') {
            let _ = self.consume(); // (
            self.consume_whitespace();

            match self.peek() {
                Some('"' | '\'') => TokenKind::Function(name),
                _ => self.consume_url(),
            }
        } else if self.peek() == Some('(') {
            let _ = self.consume();
            TokenKind::Function(name)
        } else {
            TokenKind::Ident(name)
        }
    }

    /// [§ 4.3.7 Consume a url token](https://www.w3.org/TR/css-syntax-3/#consume-url-token)
    fn consume_url(&mut self) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.consume() {
                Some(')') => return TokenKind::Url(value),

                None => {
                    self.diagnose("unterminated url");
                    return TokenKind::Url(value);
                }

                Some(c) if is_whitespace(c) => {
                    self.consume_whitespace();
                    match self.peek() {
                        Some(')') => {
                            let _ = self.consume();
                            return TokenKind::Url(value);
                        }
                        None => {
                            self.diagnose("unterminated url");
                            return TokenKind::Url(value);
                        }
                        _ => return self.bad_url("whitespace inside url"),
                    }
                }

                Some(c @ ('"' | '\'' | '(')) => {
                    return self.bad_url(&format!("'{c}' not allowed inside url"));
                }

                Some(c) if is_non_printable(c) => {
                    return self.bad_url("control character inside url");
                }

                Some('\\') => {
                    if self.is_valid_escape(Some('\\'), self.peek()) {
                        if let Some(c) = self.consume_escaped_code_point() {
                            value.push(c);
                        }
                    } else {
                        return self.bad_url("invalid escape inside url");
                    }
                }

                Some(c) => value.push(c),
            }
        }
    }

    /// [§ 4.3.14 Consume the remnants of a bad url](https://www.w3.org/TR/css-syntax-3/#consume-remnants-of-bad-url)
    fn bad_url(&mut self, message: &str) -> TokenKind {
        self.diagnose(message);
        loop {
            match self.consume() {
                Some(')') | None => return TokenKind::BadUrl,
                Some('\\') => {
                    if self.is_valid_escape(Some('\\'), self.peek()) {
                        let _ = self.consume_escaped_code_point();
                    }
                }
                Some(_) => {}
            }
        }
    }

    /// [§ 4.3.11 Consume an ident sequence](https://www.w3.org/TR/css-syntax-3/#consume-name)
    fn consume_ident_sequence(&mut self) -> String {
        let mut result = String::new();

        loop {
            match self.consume() {
                Some(c) if is_ident_code_point(c) => result.push(c),

                Some('\\') if self.is_valid_escape(Some('\\'), self.peek()) => {
                    if let Some(c) = self.consume_escaped_code_point() {
                        result.push(c);
                    }
                }

                Some(_) => {
                    self.reconsume();
                    return result;
                }

                None => return result,
            }
        }
    }

    /// [§ 4.3.13 Consume an escaped code point](https://www.w3.org/TR/css-syntax-3/#consume-escaped-code-point)
    ///
    /// Up to 6 hex digits (plus one optional trailing whitespace), or
    /// any single non-newline code point. Zero, surrogates and
    /// out-of-range values decode to U+FFFD.
    fn consume_escaped_code_point(&mut self) -> Option<char> {
        match self.consume() {
            Some(c) if c.is_ascii_hexdigit() => {
                let mut hex = c.to_string();
                for _ in 0..5 {
                    if self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        hex.push(self.consume().unwrap_or('0'));
                    } else {
                        break;
                    }
                }
                if self.peek().is_some_and(is_whitespace) {
                    let _ = self.consume();
                }
                let code_point = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
                if code_point == 0
                    || (0xD800..=0xDFFF).contains(&code_point)
                    || code_point > 0x0010_FFFF
                {
                    Some('\u{FFFD}')
                } else {
                    char::from_u32(code_point)
                }
            }
            None => {
                self.diagnose("escape at end of input");
                Some('\u{FFFD}')
            }
            Some(c) => Some(c),
        }
    }

    /// [§ 4.3.8 Check if two code points are a valid escape](https://www.w3.org/TR/css-syntax-3/#starts-with-a-valid-escape)
    #[allow(clippy::unused_self)]
    fn is_valid_escape(&self, first: Option<char>, second: Option<char>) -> bool {
        first == Some('\\') && second != Some('\n')
    }

    /// [§ 4.3.9 Check if three code points would start an ident sequence](https://www.w3.org/TR/css-syntax-3/#would-start-an-identifier)
    ///
    /// Looks at the next three unconsumed code points.
    fn would_start_ident_sequence(&self) -> bool {
        match self.peek() {
            Some('-') => {
                let second = self.peek_at(1);
                second.is_some_and(is_ident_start_code_point)
                    || second == Some('-')
                    || self.is_valid_escape(second, self.peek_at(2))
            }
            Some(c) if is_ident_start_code_point(c) => true,
            Some('\\') => self.is_valid_escape(Some('\\'), self.peek_at(1)),
            _ => false,
        }
    }

    /// [§ 4.3.10 Check if three code points would start a number](https://www.w3.org/TR/css-syntax-3/#starts-with-a-number)
    ///
    /// Called with the sign/dot already consumed, hence the one-token
    /// lookahead requirement of the grammar.
    fn would_start_number_after(&self, first: char) -> bool {
        match first {
            '+' | '-' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return true;
                }
                self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
            }
            '.' => self.peek().is_some_and(|c| c.is_ascii_digit()),
            c => c.is_ascii_digit(),
        }
    }

    fn diagnose(&mut self, message: &str) {
        self.diagnostics.push(StyleError::Syntax {
            location: self.cursor.location(),
            message: message.to_string(),
        });
    }

    fn consume(&mut self) -> Option<char> {
        let c = *self.input.get(self.cursor.position)?;
        self.prev_cursor = self.cursor;
        self.cursor.position += 1;
        self.cursor.byte_offset += c.len_utf8();
        if c == '\n' {
            self.cursor.lines += 1;
            self.cursor.line_chars = 0;
        } else {
            self.cursor.line_chars += 1;
        }
        Some(c)
    }

    /// Put back the last consumed character. Valid for one step only,
    /// which is all the grammar ever needs.
    fn reconsume(&mut self) {
        self.cursor = self.prev_cursor;
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.cursor.position + offset).copied()
    }
}

impl Iterator for Tokenizer {
    type Item = Token;

    /// Yields every token including the final EOF, then ends.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.is_eof() {
            self.finished = true;
        }
        Some(token)
    }
}

/// [§ 4.2 Definitions - whitespace](https://www.w3.org/TR/css-syntax-3/#whitespace)
fn is_whitespace(c: char) -> bool {
    matches!(c, '\n' | '\t' | ' ' | '\r' | '\x0C')
}

/// [§ 4.2 Definitions - ident-start code point](https://www.w3.org/TR/css-syntax-3/#ident-start-code-point)
fn is_ident_start_code_point(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// [§ 4.2 Definitions - ident code point](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
fn is_ident_code_point(c: char) -> bool {
    is_ident_start_code_point(c) || c.is_ascii_digit() || c == '-'
}

/// [§ 4.2 Definitions - non-printable code point](https://www.w3.org/TR/css-syntax-3/#non-printable-code-point)
fn is_non_printable(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{E}'..='\u{1F}' | '\u{7F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Tokenizer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_locations_track_lines_and_columns() {
        let mut tokenizer = Tokenizer::new("a\n  b");
        let a = tokenizer.next_token();
        assert_eq!(a.location.line, 1);
        assert_eq!(a.location.column, 1);

        let _ws = tokenizer.next_token();
        let b = tokenizer.next_token();
        assert_eq!(b.location.line, 2);
        assert_eq!(b.location.column, 3);
        assert_eq!(b.location.char_offset, 4);
    }

    #[test]
    fn test_iterator_is_finite() {
        let tokens: Vec<_> = Tokenizer::new("a b").collect();
        assert_eq!(tokens.len(), 4); // ident, ws, ident, EOF
        assert!(tokens[3].is_eof());
    }

    #[test]
    fn test_comment_is_a_token() {
        let kinds = kinds("/* hi */x");
        assert_eq!(kinds[0], TokenKind::Comment);
        assert_eq!(kinds[1], TokenKind::Ident("x".into()));
    }

    #[test]
    fn test_unterminated_comment_diagnoses() {
        let mut tokenizer = Tokenizer::new("/* never closed");
        let token = tokenizer.next_token();
        assert_eq!(token.kind, TokenKind::Comment);
        assert_eq!(tokenizer.take_diagnostics().len(), 1);
    }

    #[test]
    fn test_url_with_quoted_argument_is_a_function() {
        let kinds = kinds("url(\"a.png\")");
        assert_eq!(kinds[0], TokenKind::Function("url".into()));
        assert_eq!(kinds[1], TokenKind::QuotedString("a.png".into()));
    }

    #[test]
    fn test_bad_url_recovers_to_close_paren() {
        let kinds = kinds("url(a(b) x");
        assert_eq!(kinds[0], TokenKind::BadUrl);
        // Lexing resumed after the closing paren.
        assert!(kinds.contains(&TokenKind::Ident("x".into())));
    }

    #[test]
    fn test_escape_decodes_hex() {
        let kinds = kinds("\\41 b");
        assert_eq!(kinds[0], TokenKind::Ident("Ab".into()));
    }
}
