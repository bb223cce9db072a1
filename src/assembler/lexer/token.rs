use std::fmt;

/// TokenType defines the types of tokens that are found in source code.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum TokenType {
    /// Mnemonic, directive, label or symbol.
    ///
    /// Starts with a letter, underscore or `.` (local labels).
    Identifier,
    /// `$` Hex prefix including hex number
    Hex,
    /// `%` Binary prefix including binary number
    Binary,
    /// Decimal number
    Decimal,
    /// `"..."` with escapes already processed
    String,
    /// `#` Immediate prefix
    Hash,
    /// `:` Label suffix character
    Colon,
    /// `,`
    Comma,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `^` Bank byte modifier
    Caret,
    /// `>` High byte modifier
    Greater,
    /// `<` Low byte modifier
    Less,
    /// `(`
    ParenLeft,
    /// `)`
    ParenRight,
    /// `[`
    BracketLeft,
    /// `]`
    BracketRight,
    /// End of a source line
    Newline,
    /// Eof marks the end of file
    #[default]
    Eof,
}

/// Token is a lexical unit of source code.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Token {
    /// Type of Token
    pub token: TokenType,
    /// Literal string of token, e.g. `"LDA"`, `"00"` (for `$00`), `":"` etc.
    pub literal: String,
    /// Line number in file where token is found
    pub line: usize,
}

impl Token {
    pub fn new(token: TokenType, literal: &str, line: usize) -> Self {
        Self {
            token,
            literal: literal.to_owned(),
            line,
        }
    }

    fn literal_str(&self) -> String {
        match self.token {
            TokenType::Hex => "$".to_string() + &self.literal,
            TokenType::Binary => "%".to_string() + &self.literal,
            TokenType::String => format!("\"{}\"", self.literal.escape_default()),
            TokenType::Newline => "<newline>".to_owned(),
            TokenType::Eof => "<eof>".to_owned(),
            _ => self.literal.to_owned(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} '{}'", self.token, self.literal_str())
    }
}
