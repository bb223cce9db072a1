use std::sync::Arc;

use thiserror::Error;

use crate::ast::SourcePosition;

pub use self::token::{Token, TokenType};

/// Token and token type definitions.
mod token;

// Example code:
//
// scroll:
//   setd #$0200
//   ldx #$00
// .loop:
//   lda table,x        ; comment
//   sta [ptr],y
//   bne .loop
// table:
//   db 1, 2, %0011, $04
// msg:
//   ascii "hello\n"

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LexerError {
    #[error("{position}: unexpected character '{ch}'")]
    UnexpectedCharacter { position: SourcePosition, ch: char },
    #[error("{position}: unterminated string")]
    UnterminatedString { position: SourcePosition },
    #[error("{position}: unknown escape sequence '\\{ch}'")]
    InvalidEscape { position: SourcePosition, ch: char },
    #[error("{position}: missing digits after '{prefix}'")]
    MissingDigits { position: SourcePosition, prefix: char },
}

pub struct Lexer {
    chars: Vec<char>,
    file: Option<Arc<str>>,
    position: usize,      // Current position in input (points to current char)
    read_position: usize, // Current reading position in input (after current char)
    ch: Option<char>,     // Current char under examination
    line: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self::with_file(input, None)
    }

    /// Lexer whose positions name `file`.
    pub fn with_file(input: &str, file: Option<Arc<str>>) -> Self {
        let mut lexer = Self {
            chars: input.chars().collect(),
            file,
            position: 0,
            read_position: 0,
            ch: None,
            line: 1,
        };
        lexer.read_char();
        lexer
    }

    /// Position of the current line.
    pub fn source_position(&self) -> SourcePosition {
        SourcePosition::new(self.file.clone(), self.line)
    }

    fn read_char(&mut self) {
        self.ch = self.chars.get(self.read_position).copied();
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, Some(ch) if ch != '\n' && ch.is_whitespace()) {
            self.read_char();
        }
    }

    fn skip_comment(&mut self) {
        while matches!(self.ch, Some(ch) if ch != '\n') {
            self.read_char();
        }
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let start = self.position;
        while matches!(self.ch, Some(ch) if accept(ch)) {
            self.read_char();
        }
        self.chars[start..self.position].iter().collect()
    }

    /// Instruction mnemonic, label or symbol
    fn read_identifier(&mut self) -> String {
        self.read_while(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
    }

    /// Digits following a `$` or `%` prefix.
    fn read_prefixed(&mut self, prefix: char, radix: u32) -> Result<String, LexerError> {
        self.read_char();
        let digits = self.read_while(|ch| ch.is_digit(radix));
        if digits.is_empty() {
            return Err(LexerError::MissingDigits {
                position: self.source_position(),
                prefix,
            });
        }
        Ok(digits)
    }

    fn read_string(&mut self) -> Result<String, LexerError> {
        let mut text = String::new();
        self.read_char(); // Opening quote
        loop {
            match self.ch {
                None | Some('\n') => {
                    return Err(LexerError::UnterminatedString {
                        position: self.source_position(),
                    })
                }
                Some('"') => break,
                Some('\\') => {
                    self.read_char();
                    let escaped = match self.ch {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some(ch) => {
                            return Err(LexerError::InvalidEscape {
                                position: self.source_position(),
                                ch,
                            })
                        }
                        None => {
                            return Err(LexerError::UnterminatedString {
                                position: self.source_position(),
                            })
                        }
                    };
                    text.push(escaped);
                }
                Some(ch) => text.push(ch),
            }
            self.read_char();
        }
        self.read_char(); // Closing quote
        Ok(text)
    }

    fn single(&mut self, token: TokenType, ch: char) -> Token {
        self.read_char();
        Token::new(token, &ch.to_string(), self.line)
    }

    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace();
        let line = self.line;
        let Some(ch) = self.ch else {
            return Ok(Token::new(TokenType::Eof, "", line));
        };

        let token = match ch {
            ';' => {
                self.skip_comment();
                return self.next_token();
            }
            '\n' => {
                let token = self.single(TokenType::Newline, ch);
                self.line += 1;
                token
            }
            '$' => Token::new(TokenType::Hex, &self.read_prefixed('$', 16)?, line),
            '%' => Token::new(TokenType::Binary, &self.read_prefixed('%', 2)?, line),
            '0'..='9' => {
                let digits = self.read_while(|ch| ch.is_ascii_digit());
                Token::new(TokenType::Decimal, &digits, line)
            }
            '"' => Token::new(TokenType::String, &self.read_string()?, line),
            '#' => self.single(TokenType::Hash, ch),
            ':' => self.single(TokenType::Colon, ch),
            ',' => self.single(TokenType::Comma, ch),
            '+' => self.single(TokenType::Plus, ch),
            '-' => self.single(TokenType::Minus, ch),
            '^' => self.single(TokenType::Caret, ch),
            '>' => self.single(TokenType::Greater, ch),
            '<' => self.single(TokenType::Less, ch),
            '(' => self.single(TokenType::ParenLeft, ch),
            ')' => self.single(TokenType::ParenRight, ch),
            '[' => self.single(TokenType::BracketLeft, ch),
            ']' => self.single(TokenType::BracketRight, ch),
            'A'..='Z' | 'a'..='z' | '_' | '.' => {
                let identifier = self.read_identifier();
                Token::new(TokenType::Identifier, &identifier, line)
            }
            _ => {
                return Err(LexerError::UnexpectedCharacter {
                    position: self.source_position(),
                    ch,
                })
            }
        };

        Ok(token)
    }
}
