//! Lexer/Scanner for clockwork source code.

use crate::error::LexerError;
use crate::lexer::token::{NumberBase, Token, TokenKind};
use crate::span::Span;

/// The lexer hands out tokens one at a time, on demand.
pub struct Scanner<'src> {
    source: &'src str,
    chars: std::iter::Peekable<std::str::CharIndices<'src>>,
    current_pos: usize,
    line: u32,
    column: u32,
    start_pos: usize,
    start_line: u32,
    start_column: u32,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Scan all tokens from the source, stopping at the first error.
    pub fn scan_tokens(&mut self) -> Result<Vec<Token<'src>>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.scan_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Scan the next token. Once the input is exhausted every call returns `Eof`.
    pub fn scan_token(&mut self) -> Result<Token<'src>, LexerError> {
        self.skip_whitespace_and_comments();
        self.mark_start();

        let Some((_, c)) = self.advance() else {
            return Ok(Token::eof(self.current_pos, self.line, self.column));
        };

        match c {
            // Single-character tokens
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            '{' => Ok(self.make_token(TokenKind::LeftBrace)),
            '}' => Ok(self.make_token(TokenKind::RightBrace)),
            '[' => Ok(self.make_token(TokenKind::LeftBracket)),
            ']' => Ok(self.make_token(TokenKind::RightBracket)),
            '.' => Ok(self.make_token(TokenKind::Dot)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            ':' => Ok(self.make_token(TokenKind::Colon)),
            ';' => Ok(self.make_token(TokenKind::Semicolon)),
            '+' => Ok(self.make_token(TokenKind::Plus)),
            '-' => Ok(self.make_token(TokenKind::Minus)),
            '*' => Ok(self.make_token(TokenKind::Star)),
            '/' => Ok(self.make_token(TokenKind::Slash)),

            // One- or two-character tokens
            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                Ok(self.make_token(kind))
            }
            '!' => {
                let kind = if self.match_char('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                Ok(self.make_token(kind))
            }
            '<' => {
                let kind = if self.match_char('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                Ok(self.make_token(kind))
            }
            '>' => {
                let kind = if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                Ok(self.make_token(kind))
            }

            '"' => self.scan_string(),

            c if c.is_ascii_digit() => self.scan_number(c),

            c if c.is_alphabetic() || c == '_' => Ok(self.scan_identifier()),

            _ => Err(LexerError::unexpected_char(c, self.current_span())),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                    self.newline();
                }
                Some('/') => {
                    if self.peek_next() == Some('/') {
                        // Line comment
                        while self.peek().is_some() && self.peek() != Some('\n') {
                            self.advance();
                        }
                    } else if self.peek_next() == Some('*') {
                        // Block comment, nestable
                        self.advance();
                        self.advance();
                        let mut depth = 1;
                        while depth > 0 {
                            match self.peek() {
                                None => break,
                                Some('*') if self.peek_next() == Some('/') => {
                                    self.advance();
                                    self.advance();
                                    depth -= 1;
                                }
                                Some('/') if self.peek_next() == Some('*') => {
                                    self.advance();
                                    self.advance();
                                    depth += 1;
                                }
                                Some('\n') => {
                                    self.advance();
                                    self.newline();
                                }
                                _ => {
                                    self.advance();
                                }
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    /// The lexeme keeps its quotes and escapes; the compiler unescapes it.
    fn scan_string(&mut self) -> Result<Token<'src>, LexerError> {
        loop {
            match self.peek() {
                None => {
                    return Err(LexerError::unterminated_string(self.current_span()));
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    if let Some((_, '\n')) = self.advance() {
                        self.newline();
                    }
                }
                Some('\n') => {
                    self.advance();
                    self.newline();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        Ok(self.make_token(TokenKind::String))
    }

    fn scan_number(&mut self, first: char) -> Result<Token<'src>, LexerError> {
        if first == '0' {
            let base = match self.peek() {
                Some('b' | 'B') => Some(NumberBase::Binary),
                Some('o' | 'O') => Some(NumberBase::Octal),
                Some('x' | 'X') => Some(NumberBase::Hex),
                _ => None,
            };
            if let Some(base) = base {
                self.advance();
                return self.scan_prefixed_integer(base);
            }
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
            } else if c == '.' && !is_float {
                // Only a fraction if a digit follows; `1.foo` stays an integer.
                match self.peek_next() {
                    Some(next) if next.is_ascii_digit() => {
                        is_float = true;
                        self.advance();
                    }
                    _ => break,
                }
            } else {
                break;
            }
        }

        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        };
        Ok(self.make_token(kind))
    }

    fn scan_prefixed_integer(&mut self, base: NumberBase) -> Result<Token<'src>, LexerError> {
        let mut digits = 0;
        let mut malformed = false;

        while let Some(c) = self.peek() {
            if c == '_' {
                self.advance();
            } else if c.is_digit(base.radix()) {
                digits += 1;
                self.advance();
            } else if c.is_ascii_alphanumeric() {
                malformed = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 || malformed {
            return Err(LexerError::invalid_number(
                self.current_lexeme(),
                self.current_span(),
            ));
        }

        Ok(self.make_token(TokenKind::Integer).with_base(base))
    }

    fn scan_identifier(&mut self) -> Token<'src> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let kind = TokenKind::keyword(self.current_lexeme()).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            self.column += 1;
            Some((pos, c))
        } else {
            None
        }
    }

    fn newline(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.current_pos..].chars();
        iter.next();
        iter.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn mark_start(&mut self) {
        self.start_pos = self.current_pos;
        self.start_line = self.line;
        self.start_column = self.column;
    }

    fn current_lexeme(&self) -> &'src str {
        &self.source[self.start_pos..self.current_pos]
    }

    fn current_span(&self) -> Span {
        Span::new(
            self.start_pos,
            self.current_pos,
            self.start_line,
            self.start_column,
        )
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token::new(kind, self.current_lexeme(), self.current_span())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_tokens()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            scan("(){};"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            scan("+ - * / = == ! != < <= > >="),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            scan("let mut if else while for and or print foo"),
            vec![
                TokenKind::Let,
                TokenKind::Mut,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::For,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Print,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers_and_bases() {
        let tokens = Scanner::new("42 3.25 0b101 0o17 0xFF 1_000")
            .scan_tokens()
            .unwrap();
        let summary: Vec<_> = tokens
            .iter()
            .map(|t| (t.kind, t.base, t.lexeme))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::Integer, NumberBase::Decimal, "42"),
                (TokenKind::Float, NumberBase::Decimal, "3.25"),
                (TokenKind::Integer, NumberBase::Binary, "0b101"),
                (TokenKind::Integer, NumberBase::Octal, "0o17"),
                (TokenKind::Integer, NumberBase::Hex, "0xFF"),
                (TokenKind::Integer, NumberBase::Decimal, "1_000"),
                (TokenKind::Eof, NumberBase::Decimal, ""),
            ]
        );
    }

    #[test]
    fn test_invalid_prefixed_numbers() {
        assert!(matches!(
            Scanner::new("0b").scan_token(),
            Err(LexerError::InvalidNumber(..))
        ));
        assert!(matches!(
            Scanner::new("0b102").scan_token(),
            Err(LexerError::InvalidNumber(ref s, _)) if s == "0b102"
        ));
    }

    #[test]
    fn test_string_lexeme_keeps_quotes() {
        let tokens = Scanner::new(r#""hi \"there\"""#).scan_tokens().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, r#""hi \"there\"""#);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            Scanner::new("\"abc").scan_token(),
            Err(LexerError::UnterminatedString(_))
        ));
    }

    #[test]
    fn test_comments_and_lines() {
        let tokens = Scanner::new("1 // one\n/* two\n /* nested */ */ 2")
            .scan_tokens()
            .unwrap();
        assert_eq!(tokens[0].line(), 1);
        assert_eq!(tokens[1].kind, TokenKind::Integer);
        assert_eq!(tokens[1].lexeme, "2");
        assert_eq!(tokens[1].line(), 3);
    }

    #[test]
    fn test_multiline_string_advances_line() {
        let tokens = Scanner::new("\"a\nb\" x").scan_tokens().unwrap();
        assert_eq!(tokens[0].line(), 1);
        assert_eq!(tokens[1].line(), 2);
    }

    #[test]
    fn test_unexpected_char_then_recovers() {
        let mut scanner = Scanner::new("@ 1");
        assert!(matches!(
            scanner.scan_token(),
            Err(LexerError::UnexpectedChar('@', _))
        ));
        assert_eq!(scanner.scan_token().unwrap().kind, TokenKind::Integer);
        assert_eq!(scanner.scan_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(scanner.scan_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_spans() {
        let tokens = Scanner::new("let abc").scan_tokens().unwrap();
        assert_eq!(tokens[1].span.start, 4);
        assert_eq!(tokens[1].span.end, 7);
    }
}
