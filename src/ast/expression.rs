use std::fmt;

/// An operand expression.
///
/// Expressions are small trees owned by the line that references them. They
/// are never shared and never cyclic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i32),
    Symbol(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    StringLiteral(String),
}

impl Expr {
    pub fn symbol(name: &str) -> Expr {
        Expr::Symbol(name.to_owned())
    }

    pub fn add(left: Expr, right: Expr) -> Expr {
        Expr::Add(Box::new(left), Box::new(right))
    }

    pub fn sub(left: Expr, right: Expr) -> Expr {
        Expr::Sub(Box::new(left), Box::new(right))
    }

    /// The left-most symbol referenced by the expression, used to name the
    /// culprit in diagnostics.
    pub fn first_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name) => Some(name),
            Expr::Add(left, right) | Expr::Sub(left, right) => {
                left.first_symbol().or_else(|| right.first_symbol())
            }
            Expr::Number(_) | Expr::StringLiteral(_) => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "${:02X}", value),
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::Add(left, right) => write!(f, "{}+{}", left, right),
            Expr::Sub(left, right) => write!(f, "{}-{}", left, right),
            Expr::StringLiteral(text) => write!(f, "\"{}\"", text.escape_default()),
        }
    }
}

/// One element of a `db`/`dw`/`mvn` operand list.
///
/// The expression is kept so the element can be re-evaluated on every pass.
/// The value from the latest evaluation is cached for the serializer, which
/// never evaluates anything itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListElement {
    pub expr: Expr,
    value: Option<i32>,
}

impl ListElement {
    pub fn new(expr: Expr) -> ListElement {
        let value = match expr {
            Expr::Number(value) => Some(value),
            _ => None,
        };
        ListElement { expr, value }
    }

    /// Value from the most recent evaluation, if any.
    pub fn value(&self) -> Option<i32> {
        self.value
    }

    pub(crate) fn resolve(&mut self, value: i32) {
        self.value = Some(value);
    }
}

impl From<Expr> for ListElement {
    fn from(expr: Expr) -> Self {
        ListElement::new(expr)
    }
}

impl fmt::Display for ListElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}
