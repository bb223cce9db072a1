use thiserror::Error;

use super::symbols::SymbolTable;
use crate::ast::Expr;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EvalError {
    /// A symbol has not been defined in any pass so far. Tolerated during
    /// the first pass, fatal afterwards.
    #[error("undefined symbol '{0}'")]
    Unresolved(String),
    #[error("string literal used as a number")]
    NotNumeric,
}

/// Whether an expression is a plain number or derived from a symbol.
///
/// Symbol-derived addresses are trusted to lie in the current direct page or
/// data bank, so the class rather than the value drives those decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprClass {
    Numeric,
    Symbolic,
}

/// Resolve `expr` to an integer using 32-bit wrapping arithmetic.
///
/// Range checking is left to the encoder.
pub fn evaluate(expr: &Expr, symbols: &SymbolTable) -> Result<i32, EvalError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Symbol(name) => symbols
            .lookup(name)
            .ok_or_else(|| EvalError::Unresolved(name.clone())),
        Expr::Add(left, right) => {
            Ok(evaluate(left, symbols)?.wrapping_add(evaluate(right, symbols)?))
        }
        Expr::Sub(left, right) => {
            Ok(evaluate(left, symbols)?.wrapping_sub(evaluate(right, symbols)?))
        }
        Expr::StringLiteral(_) => Err(EvalError::NotNumeric),
    }
}

pub fn classify(expr: &Expr) -> ExprClass {
    match expr {
        Expr::Number(_) => ExprClass::Numeric,
        Expr::Symbol(_) | Expr::StringLiteral(_) => ExprClass::Symbolic,
        Expr::Add(left, right) | Expr::Sub(left, right) => {
            match (classify(left), classify(right)) {
                (ExprClass::Numeric, ExprClass::Numeric) => ExprClass::Numeric,
                _ => ExprClass::Symbolic,
            }
        }
    }
}
