use std::{fs, path::Path, sync::Arc};

use thiserror::Error;

use crate::{
    assembler::{
        context::resolve_path,
        lexer::{Lexer, LexerError, Token, TokenType},
    },
    ast::{AddressingMode, Expr, ImmediateModifier, Line, SourcePosition},
};

/// Maximum nesting of `incsrc` directives.
pub const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error("{position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: SourcePosition,
        expected: &'static str,
        found: String,
    },
    #[error("{position}: number '{literal}' does not fit in 32 bits")]
    InvalidNumber {
        position: SourcePosition,
        literal: String,
    },
    #[error("{position}: cannot include {path}: {reason}")]
    Include {
        position: SourcePosition,
        path: String,
        reason: String,
    },
    #[error("{position}: includes nested more than {MAX_INCLUDE_DEPTH} levels deep")]
    IncludeDepth { position: SourcePosition },
}

/// Operand of a line, as recognised from its punctuation.
#[derive(Debug, Default)]
struct Operand {
    mode: AddressingMode,
    modifier: ImmediateModifier,
    expr: Option<Expr>,
    list: Vec<Expr>,
}

impl Operand {
    fn new(mode: AddressingMode, expr: Expr) -> Self {
        Self {
            mode,
            expr: Some(expr),
            ..Default::default()
        }
    }
}

pub struct Parser<'a> {
    lexer: &'a mut Lexer,
    current_token: Token,
    peek_token: Token,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: &'a mut Lexer) -> Result<Self, ParseError> {
        // Feed the lexer so its tokens are ready to be consumed
        let mut parser = Self {
            lexer,
            current_token: Token::default(),
            peek_token: Token::default(),
        };

        parser.next_token()?;
        parser.next_token()?;

        Ok(parser)
    }

    fn next_token(&mut self) -> Result<(), ParseError> {
        self.current_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token()?);
        Ok(())
    }

    fn current_token_is(&self, token_type: TokenType) -> bool {
        self.current_token.token == token_type
    }

    fn peek_token_is(&self, token_type: TokenType) -> bool {
        self.peek_token.token == token_type
    }

    fn at_line_end(&self) -> bool {
        self.current_token_is(TokenType::Newline) || self.current_token_is(TokenType::Eof)
    }

    fn position(&self) -> SourcePosition {
        let mut position = self.lexer.source_position();
        position.line = self.current_token.line;
        position
    }

    fn unexpected<T>(&self, expected: &'static str) -> Result<T, ParseError> {
        Err(ParseError::UnexpectedToken {
            position: self.position(),
            expected,
            found: self.current_token.to_string(),
        })
    }

    fn expect(&mut self, token_type: TokenType, expected: &'static str) -> Result<(), ParseError> {
        if !self.current_token_is(token_type) {
            return self.unexpected(expected);
        }
        self.next_token()
    }

    /// Consume an index register name such as the `x` in `lda table,x`.
    fn expect_register(&mut self, register: &str) -> Result<(), ParseError> {
        if self.current_token_is(TokenType::Identifier)
            && self.current_token.literal.eq_ignore_ascii_case(register)
        {
            self.next_token()
        } else {
            self.unexpected("index register")
        }
    }

    /// Parse every line of the input.
    #[tracing::instrument(skip(self))]
    pub fn parse_program(&mut self) -> Result<Vec<Line>, ParseError> {
        let mut lines = Vec::new();
        while !self.current_token_is(TokenType::Eof) {
            if let Some(line) = self.parse_line()? {
                lines.push(line);
            }
        }
        Ok(lines)
    }

    /// `[label:] [mnemonic [operand]]`, or `None` for a blank line.
    fn parse_line(&mut self) -> Result<Option<Line>, ParseError> {
        let mut line = Line::new(self.position());

        if self.current_token_is(TokenType::Identifier) && self.peek_token_is(TokenType::Colon) {
            line.label = Some(self.current_token.literal.clone());
            self.next_token()?;
            self.next_token()?;
        } else if self.current_token_is(TokenType::Identifier)
            && self.peek_token_is(TokenType::Identifier)
            && self.peek_token.literal.eq_ignore_ascii_case("equ")
        {
            // `NAME equ value`
            line.label = Some(self.current_token.literal.clone());
            self.next_token()?;
        }

        if self.current_token_is(TokenType::Identifier) {
            line.instruction = Some(self.current_token.literal.clone());
            self.next_token()?;

            let operand = self.parse_operand()?;
            line.addr_mode = operand.mode;
            line.modifier = operand.modifier;
            line.operand = operand.expr;
            line.list = operand.list.into_iter().map(Into::into).collect();
        }

        if !self.at_line_end() {
            return self.unexpected("end of line");
        }
        if self.current_token_is(TokenType::Newline) {
            self.next_token()?;
        }

        if line.label.is_none() && line.instruction.is_none() {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        if self.at_line_end() {
            return Ok(Operand::default());
        }

        match self.current_token.token {
            TokenType::Identifier
                if self.current_token.literal.eq_ignore_ascii_case("a")
                    && (self.peek_token_is(TokenType::Newline) || self.peek_token_is(TokenType::Eof)) =>
            {
                self.next_token()?;
                Ok(Operand {
                    mode: AddressingMode::Accumulator,
                    ..Default::default()
                })
            }
            TokenType::String => {
                let text = std::mem::take(&mut self.current_token.literal);
                self.next_token()?;
                Ok(Operand::new(AddressingMode::String, Expr::StringLiteral(text)))
            }
            TokenType::Hash => self.parse_immediate(),
            TokenType::ParenLeft => self.parse_indirect(),
            TokenType::BracketLeft => self.parse_indirect_long(),
            _ => self.parse_direct(),
        }
    }

    fn parse_immediate(&mut self) -> Result<Operand, ParseError> {
        self.next_token()?; // Consume the hash
        let modifier = match self.current_token.token {
            TokenType::Caret => ImmediateModifier::High,
            TokenType::Greater => ImmediateModifier::Mid,
            TokenType::Less => ImmediateModifier::Low,
            _ => ImmediateModifier::None,
        };
        if modifier != ImmediateModifier::None {
            self.next_token()?;
        }

        let mut operand = Operand::new(AddressingMode::Immediate, self.parse_expression()?);
        operand.modifier = modifier;
        Ok(operand)
    }

    /// `(dp)`, `(dp),y`, `(dp,x)` and `(sr,s),y`
    fn parse_indirect(&mut self) -> Result<Operand, ParseError> {
        self.next_token()?; // Consume the opening parenthesis
        let expr = self.parse_expression()?;

        if self.current_token_is(TokenType::Comma) {
            self.next_token()?;
            if self.current_token.literal.eq_ignore_ascii_case("s") {
                self.next_token()?;
                self.expect(TokenType::ParenRight, "')'")?;
                self.expect(TokenType::Comma, "','")?;
                self.expect_register("y")?;
                return Ok(Operand::new(AddressingMode::StackRelativeIndirectIndexedY, expr));
            }
            self.expect_register("x")?;
            self.expect(TokenType::ParenRight, "')'")?;
            return Ok(Operand::new(AddressingMode::IndexedIndirectX, expr));
        }

        self.expect(TokenType::ParenRight, "')'")?;
        if self.current_token_is(TokenType::Comma) {
            self.next_token()?;
            self.expect_register("y")?;
            return Ok(Operand::new(AddressingMode::IndirectIndexedY, expr));
        }
        Ok(Operand::new(AddressingMode::Indirect, expr))
    }

    /// `[dp]` and `[dp],y`
    fn parse_indirect_long(&mut self) -> Result<Operand, ParseError> {
        self.next_token()?; // Consume the opening bracket
        let expr = self.parse_expression()?;
        self.expect(TokenType::BracketRight, "']'")?;

        if self.current_token_is(TokenType::Comma) {
            self.next_token()?;
            self.expect_register("y")?;
            return Ok(Operand::new(AddressingMode::IndirectLongIndexedY, expr));
        }
        Ok(Operand::new(AddressingMode::IndirectLong, expr))
    }

    /// `addr`, `addr,x`, `addr,y`, `sr,s` or a list `v, v, ...`
    fn parse_direct(&mut self) -> Result<Operand, ParseError> {
        let expr = self.parse_expression()?;
        if !self.current_token_is(TokenType::Comma) {
            return Ok(Operand::new(AddressingMode::Absolute, expr));
        }
        self.next_token()?;

        let ends_line = self.peek_token_is(TokenType::Newline) || self.peek_token_is(TokenType::Eof);
        if self.current_token_is(TokenType::Identifier) && ends_line {
            let mode = match self.current_token.literal.to_ascii_lowercase().as_str() {
                "x" => Some(AddressingMode::AbsoluteX),
                "y" => Some(AddressingMode::AbsoluteY),
                "s" => Some(AddressingMode::StackRelative),
                _ => None,
            };
            if let Some(mode) = mode {
                self.next_token()?;
                return Ok(Operand::new(mode, expr));
            }
        }

        let mut list = vec![expr, self.parse_expression()?];
        while self.current_token_is(TokenType::Comma) {
            self.next_token()?;
            list.push(self.parse_expression()?);
        }
        Ok(Operand {
            mode: AddressingMode::List,
            list,
            ..Default::default()
        })
    }

    /// Terms joined by `+` and `-`, evaluated left to right.
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;
        loop {
            match self.current_token.token {
                TokenType::Plus => {
                    self.next_token()?;
                    expr = Expr::add(expr, self.parse_term()?);
                }
                TokenType::Minus => {
                    self.next_token()?;
                    expr = Expr::sub(expr, self.parse_term()?);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let radix = match self.current_token.token {
            TokenType::Identifier => {
                let name = std::mem::take(&mut self.current_token.literal);
                self.next_token()?;
                return Ok(Expr::Symbol(name));
            }
            TokenType::Minus => {
                self.next_token()?;
                return Ok(match self.parse_term()? {
                    Expr::Number(value) => Expr::Number(value.wrapping_neg()),
                    term => Expr::sub(Expr::Number(0), term),
                });
            }
            TokenType::Hex => 16,
            TokenType::Binary => 2,
            TokenType::Decimal => 10,
            _ => return self.unexpected("number or symbol"),
        };

        let value = u32::from_str_radix(&self.current_token.literal, radix).map_err(|_| {
            ParseError::InvalidNumber {
                position: self.position(),
                literal: self.current_token.to_string(),
            }
        })?;
        self.next_token()?;
        Ok(Expr::Number(value as i32))
    }
}

/// Parse `source` as the contents of `file`, splicing in `incsrc` files
/// found relative to `include_dir`.
#[tracing::instrument(skip(source))]
pub fn parse_source(
    source: &str,
    file: Option<&str>,
    include_dir: Option<&Path>,
) -> Result<Vec<Line>, ParseError> {
    parse_nested(source, file.map(Arc::from), include_dir, 0)
}

/// Read and parse the file at `path`.
#[tracing::instrument]
pub fn parse_file(path: &Path, include_dir: Option<&Path>) -> Result<Vec<Line>, ParseError> {
    let source = read_source(path, &SourcePosition::default())?;
    let file = path.display().to_string();
    parse_nested(&source, Some(Arc::from(file.as_str())), include_dir, 0)
}

fn read_source(path: &Path, position: &SourcePosition) -> Result<String, ParseError> {
    fs::read_to_string(path).map_err(|err| ParseError::Include {
        position: position.clone(),
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

fn parse_nested(
    source: &str,
    file: Option<Arc<str>>,
    include_dir: Option<&Path>,
    depth: usize,
) -> Result<Vec<Line>, ParseError> {
    let mut lexer = Lexer::with_file(source, file);
    let mut parser = Parser::new(&mut lexer)?;
    let parsed = parser.parse_program()?;

    let mut lines = Vec::with_capacity(parsed.len());
    for line in parsed {
        if !line.is_mnemonic("incsrc") {
            lines.push(line);
            continue;
        }

        if depth >= MAX_INCLUDE_DEPTH {
            return Err(ParseError::IncludeDepth {
                position: line.position,
            });
        }
        let Some(Expr::StringLiteral(name)) = &line.operand else {
            return Err(ParseError::UnexpectedToken {
                position: line.position,
                expected: "file name",
                found: line.addr_mode.to_string(),
            });
        };
        if let Some(label) = &line.label {
            lines.push(Line::label(label).with_position(line.position.clone()));
        }

        let path = resolve_path(include_dir, name);
        let source = read_source(&path, &line.position)?;
        let file = path.display().to_string();
        lines.extend(parse_nested(
            &source,
            Some(Arc::from(file.as_str())),
            include_dir,
            depth + 1,
        )?);
    }
    Ok(lines)
}
