//! Selector expression AST
//!
//! The parsed form of a selector predicate. Expressions are immutable after
//! parsing and shared read-only between all sessions evaluating the same
//! selector.

/// A parsed selector expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Dotted field access into the event context (e.g. `payload.type`)
    Field(Vec<String>),
    /// Binary comparison
    Compare {
        lhs: Box<Expr>,
        op: Operator,
        rhs: Box<Expr>,
    },
    /// Logical conjunction
    And(Box<Expr>, Box<Expr>),
    /// Logical disjunction
    Or(Box<Expr>, Box<Expr>),
    /// Logical negation
    Not(Box<Expr>),
}

impl Expr {
    /// Dotted rendering of a field path, for error messages
    pub(crate) fn field_path(segments: &[String]) -> String {
        segments.join(".")
    }
}

/// Literal values in selector expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Whether the operator only makes sense over numeric operands
    pub fn is_ordering(self) -> bool {
        matches!(self, Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte)
    }
}
