//! Core lexer implementation.

use micc_util::Span;

use crate::token::{Token, TokenKind};

/// Byte-position cursor that produces one token per [`Lexer::next_token`].
///
/// The struct is deliberately `Copy`: peeking ahead is a value-level copy
/// of the cursor, so the parser can look at the next token and then decide
/// whether to consume it.
///
/// # Example
///
/// ```
/// use micc_lex::{Lexer, TokenKind};
///
/// let mut lexer = Lexer::new("int main");
/// assert_eq!(lexer.next_token().kind, TokenKind::KeywordInt);
/// assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
/// assert_eq!(lexer.next_token().kind, TokenKind::Eof);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Lexer<'a> {
    /// The source text being scanned.
    buffer: &'a str,

    /// Current byte position.
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer over the given source buffer.
    pub fn new(buffer: &'a str) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Returns true if the cursor has consumed the whole buffer.
    pub fn is_eof(&self) -> bool {
        self.position >= self.buffer.len()
    }

    /// The byte at the current position, or `None` at end of input.
    fn current_byte(&self) -> Option<u8> {
        self.buffer.as_bytes().get(self.position).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.current_byte() {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.position += 1;
        }
    }

    /// Returns the next token, skipping leading whitespace.
    ///
    /// At end of input this returns `Eof` with the empty span
    /// `(len, len)`, and keeps returning it on every further call.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.position;

        let byte = match self.current_byte() {
            Some(byte) => byte,
            None => return Token::new(TokenKind::Eof, Span::point(start)),
        };

        self.position += 1;

        let kind = match byte {
            b'(' => TokenKind::OpenParen,
            b')' => TokenKind::CloseParen,
            b'{' => TokenKind::OpenBrace,
            b'}' => TokenKind::CloseBrace,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b'=' => TokenKind::Assign,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::ForwardSlash,
            b'!' => TokenKind::Bang,
            b'_' => self.lex_word(start),
            byte if byte.is_ascii_alphabetic() => self.lex_word(start),
            byte if byte.is_ascii_digit() => self.lex_number(),
            _ => TokenKind::Invalid,
        };

        Token::new(kind, Span::new(start, self.position))
    }

    /// Scans the rest of an identifier, then checks the keyword table.
    fn lex_word(&mut self, start: usize) -> TokenKind {
        while let Some(byte) = self.current_byte() {
            if byte != b'_' && !byte.is_ascii_alphanumeric() {
                break;
            }
            self.position += 1;
        }

        let word = &self.buffer[start..self.position];

        TokenKind::keyword(word).unwrap_or(TokenKind::Identifier)
    }

    /// Scans digits and `.` greedily; any `.` makes the token a float.
    fn lex_number(&mut self) -> TokenKind {
        let mut saw_dot = false;

        while let Some(byte) = self.current_byte() {
            if byte == b'.' {
                saw_dot = true;
            } else if !byte.is_ascii_digit() {
                break;
            }
            self.position += 1;
        }

        if saw_dot {
            TokenKind::Float
        } else {
            TokenKind::Int
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            kinds.push(token.kind);
        }
        kinds
    }

    #[test]
    fn test_empty_source() {
        let mut lexer = Lexer::new("");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Eof);
        assert_eq!(token.span, Span::point(0));
    }

    #[test]
    fn test_eof_is_idempotent() {
        let mut lexer = Lexer::new("int");
        assert_eq!(lexer.next_token().kind, TokenKind::KeywordInt);
        for _ in 0..5 {
            let token = lexer.next_token();
            assert_eq!(token.kind, TokenKind::Eof);
            assert_eq!(token.span, Span::point(3));
        }
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("(){};:,=+-*/!"),
            vec![
                TokenKind::OpenParen,
                TokenKind::CloseParen,
                TokenKind::OpenBrace,
                TokenKind::CloseBrace,
                TokenKind::Semicolon,
                TokenKind::Colon,
                TokenKind::Comma,
                TokenKind::Assign,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::ForwardSlash,
                TokenKind::Bang,
            ]
        );
    }

    #[test]
    fn test_keyword_identifier_partition() {
        assert_eq!(kinds("int"), vec![TokenKind::KeywordInt]);
        assert_eq!(kinds("integer"), vec![TokenKind::Identifier]);
        assert_eq!(kinds("_int"), vec![TokenKind::Identifier]);
        assert_eq!(kinds("returned"), vec![TokenKind::Identifier]);
    }

    #[test]
    fn test_identifier_shapes() {
        assert_eq!(kinds("_"), vec![TokenKind::Identifier]);
        assert_eq!(kinds("a1_b2"), vec![TokenKind::Identifier]);
        assert_eq!(
            kinds("x y"),
            vec![TokenKind::Identifier, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_number_classification() {
        assert_eq!(kinds("42"), vec![TokenKind::Int]);
        assert_eq!(kinds("3.14"), vec![TokenKind::Float]);
        // Dots are consumed greedily, so this is one malformed float
        // token, not three tokens.
        assert_eq!(kinds("1.2.3"), vec![TokenKind::Float]);
        assert_eq!(kinds("1."), vec![TokenKind::Float]);
    }

    #[test]
    fn test_number_then_identifier() {
        assert_eq!(kinds("2x"), vec![TokenKind::Int, TokenKind::Identifier]);
    }

    #[test]
    fn test_invalid_byte() {
        assert_eq!(kinds("@"), vec![TokenKind::Invalid]);
        assert_eq!(
            kinds("int #"),
            vec![TokenKind::KeywordInt, TokenKind::Invalid]
        );
    }

    #[test]
    fn test_whitespace_is_skipped() {
        assert_eq!(
            kinds("  \t\n int \r\n x "),
            vec![TokenKind::KeywordInt, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_spans_cover_source() {
        let source = "int main(void) { return 1 + 2.5; }";
        let mut lexer = Lexer::new(source);
        let mut previous_end = 0;

        loop {
            let token = lexer.next_token();

            // Only whitespace may sit between consecutive tokens.
            assert!(source[previous_end..token.span.start]
                .bytes()
                .all(|b| b.is_ascii_whitespace()));

            if token.kind == TokenKind::Eof {
                assert_eq!(token.span, Span::point(source.len()));
                break;
            }

            assert!(token.span.start < token.span.end);
            previous_end = token.span.end;
        }

        assert!(source[previous_end..]
            .bytes()
            .all(|b| b.is_ascii_whitespace()));
    }

    #[test]
    fn test_peek_by_copy() {
        let lexer = Lexer::new("return 0;");
        let mut copy = lexer;
        assert_eq!(copy.next_token().kind, TokenKind::KeywordReturn);

        // The original cursor is untouched.
        let mut original = lexer;
        assert_eq!(original.next_token().kind, TokenKind::KeywordReturn);
    }

    #[test]
    fn test_function_declaration_token_stream() {
        assert_eq!(
            kinds("long long f(char c, double d);"),
            vec![
                TokenKind::KeywordLong,
                TokenKind::KeywordLong,
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::KeywordChar,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::KeywordDouble,
                TokenKind::Identifier,
                TokenKind::CloseParen,
                TokenKind::Semicolon,
            ]
        );
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Token spans are in order, in bounds, and separated only by
        /// whitespace, for arbitrary ASCII input.
        #[test]
        fn spans_tile_the_buffer(source in "[ -~\t\n]{0,64}") {
            let mut lexer = Lexer::new(&source);
            let mut previous_end = 0;

            for _ in 0..=source.len() {
                let token = lexer.next_token();

                prop_assert!(source[previous_end..token.span.start]
                    .bytes()
                    .all(|b| b.is_ascii_whitespace()));

                if token.kind == TokenKind::Eof {
                    prop_assert_eq!(token.span, Span::point(source.len()));
                    return Ok(());
                }

                prop_assert!(token.span.start < token.span.end);
                prop_assert!(token.span.end <= source.len());
                previous_end = token.span.end;
            }

            // Every non-EOF token consumes at least one byte, so EOF must
            // arrive within len + 1 calls.
            prop_assert!(false, "lexer failed to reach EOF");
        }

        /// EOF stays put no matter how many times it is re-requested.
        #[test]
        fn eof_is_stable(source in "[ -~\t\n]{0,32}") {
            let mut lexer = Lexer::new(&source);
            while lexer.next_token().kind != TokenKind::Eof {}

            for _ in 0..3 {
                let token = lexer.next_token();
                prop_assert_eq!(token.kind, TokenKind::Eof);
                prop_assert_eq!(token.span, Span::point(source.len()));
            }
        }
    }
}
