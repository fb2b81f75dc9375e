//! Selector compilation and evaluation
//!
//! A [`CompiledSelector`] pairs a parsed expression with its source text.
//! Compilation (and optional shape validation) happens once at startup;
//! evaluation runs at dispatch time against a `serde_json::Value` event
//! context and is a pure function of that context.

use std::collections::HashMap;

use serde_json::Value;

use crate::selector::ast::{Expr, Literal, Operator};
use crate::selector::error::{SelectorError, SelectorResult};
use crate::selector::parser::parse_selector;

/// A compiled, immutable selector predicate
///
/// Cheap to share (`Arc<CompiledSelector>`), safe to evaluate concurrently
/// against different events from multiple tasks.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    source: String,
    expr: Expr,
}

impl CompiledSelector {
    /// Compile a selector expression without shape validation
    pub fn compile(source: &str) -> SelectorResult<Self> {
        let expr = parse_selector(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Compile a selector expression and validate every field reference and
    /// comparison against the declared context shape
    pub fn compile_checked(source: &str, shape: &ContextShape) -> SelectorResult<Self> {
        let compiled = Self::compile(source)?;
        shape.validate(&compiled.expr)?;
        Ok(compiled)
    }

    /// The original expression text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the selector against an event context
    ///
    /// Missing fields resolve to null; comparing null with anything other
    /// than `eq null` / `ne null` is false. A non-boolean result is false.
    pub fn matches(&self, context: &Value) -> bool {
        eval(&self.expr, context)
    }
}

/// Declared shape of an event context, used to validate selectors at startup
///
/// Fields are keyed by dotted path. A field of kind [`FieldKind::Any`]
/// also admits any nested path beneath it.
#[derive(Debug, Clone, Default)]
pub struct ContextShape {
    fields: HashMap<String, FieldKind>,
}

/// Kind of a declared context field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Bool,
    Any,
}

impl ContextShape {
    /// Create an empty shape
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field by dotted path
    pub fn field(mut self, path: &str, kind: FieldKind) -> Self {
        self.fields.insert(path.to_string(), kind);
        self
    }

    /// Derive a shape from a sample context value
    ///
    /// Scalar leaves map to their kind; arrays and non-object/scalar leaves
    /// map to [`FieldKind::Any`].
    pub fn from_sample(sample: &Value) -> Self {
        let mut fields = HashMap::new();
        collect_fields(sample, String::new(), &mut fields);
        Self { fields }
    }

    /// Validate an expression against this shape
    pub fn validate(&self, expr: &Expr) -> SelectorResult<()> {
        match expr {
            Expr::Literal(_) => Ok(()),
            Expr::Field(segments) => {
                self.lookup(segments)?;
                Ok(())
            }
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                self.validate(lhs)?;
                self.validate(rhs)
            }
            Expr::Not(inner) => self.validate(inner),
            Expr::Compare { lhs, op, rhs } => {
                self.validate(lhs)?;
                self.validate(rhs)?;
                self.check_comparison(lhs, *op, rhs)
            }
        }
    }

    fn lookup(&self, segments: &[String]) -> SelectorResult<FieldKind> {
        let path = Expr::field_path(segments);
        if let Some(kind) = self.fields.get(&path) {
            return Ok(*kind);
        }
        // Nested access beneath a field declared Any is admitted
        for i in (1..segments.len()).rev() {
            let prefix = Expr::field_path(&segments[..i]);
            if self.fields.get(&prefix) == Some(&FieldKind::Any) {
                return Ok(FieldKind::Any);
            }
        }
        Err(SelectorError::UnknownField(path))
    }

    fn check_comparison(&self, lhs: &Expr, op: Operator, rhs: &Expr) -> SelectorResult<()> {
        let lhs_kind = self.operand_kind(lhs)?;
        let rhs_kind = self.operand_kind(rhs)?;

        let op_name = operator_name(op);

        if op.is_ordering() {
            for (expr, kind) in [(lhs, lhs_kind), (rhs, rhs_kind)] {
                if let Some(kind) = kind {
                    if kind != FieldKind::Number && kind != FieldKind::Any {
                        return Err(SelectorError::TypeMismatch {
                            field: operand_display(expr),
                            op: op_name,
                            reason: "ordering comparisons require numeric operands".to_string(),
                        });
                    }
                }
            }
            return Ok(());
        }

        // Equality between two known, differing kinds can never hold
        if let (Some(l), Some(r)) = (lhs_kind, rhs_kind) {
            if l != FieldKind::Any && r != FieldKind::Any && l != r {
                return Err(SelectorError::TypeMismatch {
                    field: operand_display(lhs),
                    op: op_name,
                    reason: format!("operand kinds {:?} and {:?} never compare equal", l, r),
                });
            }
        }

        Ok(())
    }

    /// Kind of an operand, if statically known. Null literals have no kind.
    fn operand_kind(&self, expr: &Expr) -> SelectorResult<Option<FieldKind>> {
        match expr {
            Expr::Field(segments) => Ok(Some(self.lookup(segments)?)),
            Expr::Literal(Literal::Str(_)) => Ok(Some(FieldKind::String)),
            Expr::Literal(Literal::Num(_)) => Ok(Some(FieldKind::Number)),
            Expr::Literal(Literal::Bool(_)) => Ok(Some(FieldKind::Bool)),
            Expr::Literal(Literal::Null) => Ok(None),
            _ => Ok(None),
        }
    }
}

fn collect_fields(value: &Value, prefix: String, fields: &mut HashMap<String, FieldKind>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                collect_fields(child, path, fields);
            }
        }
        Value::String(_) => {
            fields.insert(prefix, FieldKind::String);
        }
        Value::Number(_) => {
            fields.insert(prefix, FieldKind::Number);
        }
        Value::Bool(_) => {
            fields.insert(prefix, FieldKind::Bool);
        }
        _ => {
            fields.insert(prefix, FieldKind::Any);
        }
    }
}

fn operator_name(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "eq",
        Operator::Ne => "ne",
        Operator::Gt => "gt",
        Operator::Gte => "gte",
        Operator::Lt => "lt",
        Operator::Lte => "lte",
    }
}

fn operand_display(expr: &Expr) -> String {
    match expr {
        Expr::Field(segments) => Expr::field_path(segments),
        Expr::Literal(Literal::Str(s)) => format!("'{}'", s),
        Expr::Literal(Literal::Num(n)) => n.to_string(),
        Expr::Literal(Literal::Bool(b)) => b.to_string(),
        Expr::Literal(Literal::Null) => "null".to_string(),
        _ => "<expression>".to_string(),
    }
}

/// Scalar view of an operand during evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar<'a> {
    Str(&'a str),
    Num(f64),
    Bool(bool),
    Null,
}

fn eval(expr: &Expr, context: &Value) -> bool {
    match expr {
        Expr::And(lhs, rhs) => eval(lhs, context) && eval(rhs, context),
        Expr::Or(lhs, rhs) => eval(lhs, context) || eval(rhs, context),
        Expr::Not(inner) => !eval(inner, context),
        Expr::Compare { lhs, op, rhs } => {
            compare(operand_scalar(lhs, context), *op, operand_scalar(rhs, context))
        }
        // Bare field or literal: true only for boolean true
        other => matches!(operand_scalar(other, context), Scalar::Bool(true)),
    }
}

fn operand_scalar<'a>(expr: &'a Expr, context: &'a Value) -> Scalar<'a> {
    match expr {
        Expr::Literal(Literal::Str(s)) => Scalar::Str(s),
        Expr::Literal(Literal::Num(n)) => Scalar::Num(*n),
        Expr::Literal(Literal::Bool(b)) => Scalar::Bool(*b),
        Expr::Literal(Literal::Null) => Scalar::Null,
        Expr::Field(segments) => match resolve_field(segments, context) {
            Some(Value::String(s)) => Scalar::Str(s),
            Some(Value::Number(n)) => n.as_f64().map(Scalar::Num).unwrap_or(Scalar::Null),
            Some(Value::Bool(b)) => Scalar::Bool(*b),
            // Missing fields and non-scalar values resolve to null
            _ => Scalar::Null,
        },
        _ => Scalar::Null,
    }
}

fn resolve_field<'a>(segments: &[String], context: &'a Value) -> Option<&'a Value> {
    let mut current = context;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn compare(lhs: Scalar<'_>, op: Operator, rhs: Scalar<'_>) -> bool {
    match op {
        Operator::Eq => scalar_eq(lhs, rhs),
        Operator::Ne => !scalar_eq(lhs, rhs),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => match (lhs, rhs) {
            (Scalar::Num(a), Scalar::Num(b)) => match op {
                Operator::Gt => a > b,
                Operator::Gte => a >= b,
                Operator::Lt => a < b,
                Operator::Lte => a <= b,
                _ => unreachable!(),
            },
            // Ordering over non-numeric operands is always false
            _ => false,
        },
    }
}

fn scalar_eq(lhs: Scalar<'_>, rhs: Scalar<'_>) -> bool {
    match (lhs, rhs) {
        (Scalar::Str(a), Scalar::Str(b)) => a == b,
        (Scalar::Num(a), Scalar::Num(b)) => a == b,
        (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
        (Scalar::Null, Scalar::Null) => true,
        _ => false,
    }
}
