//! Selector Expression Parser
//!
//! Parses selector predicate strings into an [`Expr`] AST.
//!
//! # Supported Syntax
//!
//! ```text
//! expression := or-term
//! or-term    := and-term ("or" and-term)*
//! and-term   := unary ("and" unary)*
//! unary      := "not" unary | "(" expression ")" | comparison
//! comparison := operand [operator operand]
//! operand    := literal | field
//! field      := ident ("." ident)*
//! ```
//!
//! # Examples
//!
//! ```text
//! payload.type eq 'CHAT'
//! payload.priority >= 5 and payload.room ne 'lobby'
//! not (payload.muted) or payload.urgent eq true
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, map_res, opt, recognize, value},
    sequence::{delimited, pair, tuple},
    IResult,
};

use crate::selector::ast::{Expr, Literal, Operator};
use crate::selector::error::{SelectorError, SelectorResult};

/// Parse a selector string into an expression AST
pub fn parse_selector(input: &str) -> SelectorResult<Expr> {
    let input = input.trim();

    if input.is_empty() {
        return Err(SelectorError::Parse("empty selector expression".to_string()));
    }

    match parse_expression(input) {
        Ok((remaining, expr)) => {
            if remaining.trim().is_empty() {
                Ok(expr)
            } else {
                Err(SelectorError::Parse(format!(
                    "Unexpected input after expression: '{}'",
                    remaining.trim()
                )))
            }
        }
        Err(e) => Err(SelectorError::Parse(format!("Parse error: {:?}", e))),
    }
}

/// Parse a full expression (lowest precedence: OR)
fn parse_expression(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;
    let (mut input, mut expr) = parse_and_term(input)?;

    loop {
        let (rest, _) = multispace0(input)?;
        match keyword("or")(rest) {
            Ok((rest, _)) => {
                let (rest, _) = multispace0(rest)?;
                let (rest, rhs) = parse_and_term(rest)?;
                expr = Expr::Or(Box::new(expr), Box::new(rhs));
                input = rest;
            }
            Err(_) => break,
        }
    }

    Ok((input, expr))
}

/// Parse an AND term
fn parse_and_term(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut expr) = parse_unary(input)?;

    loop {
        let (rest, _) = multispace0(input)?;
        match keyword("and")(rest) {
            Ok((rest, _)) => {
                let (rest, _) = multispace0(rest)?;
                let (rest, rhs) = parse_unary(rest)?;
                expr = Expr::And(Box::new(expr), Box::new(rhs));
                input = rest;
            }
            Err(_) => break,
        }
    }

    Ok((input, expr))
}

/// Parse a unary term: negation, parenthesized group, or comparison
fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;

    if let Ok((rest, _)) = keyword("not")(input) {
        let (rest, inner) = parse_unary(rest)?;
        return Ok((rest, Expr::Not(Box::new(inner))));
    }

    alt((parse_group, parse_comparison))(input)
}

/// Parse a parenthesized expression
fn parse_group(input: &str) -> IResult<&str, Expr> {
    delimited(
        pair(char('('), multispace0),
        parse_expression,
        pair(multispace0, char(')')),
    )(input)
}

/// Parse a comparison, or a bare operand when no operator follows
fn parse_comparison(input: &str) -> IResult<&str, Expr> {
    let (input, lhs) = parse_operand(input)?;

    let (input, tail) = opt(tuple((
        delimited(multispace0, parse_operator, multispace0),
        parse_operand,
    )))(input)?;

    match tail {
        Some((op, rhs)) => Ok((
            input,
            Expr::Compare {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            },
        )),
        None => Ok((input, lhs)),
    }
}

/// Parse a single operand (literal or field access)
fn parse_operand(input: &str) -> IResult<&str, Expr> {
    alt((map(parse_literal, Expr::Literal), parse_field))(input)
}

/// Parse a literal value
fn parse_literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(parse_quoted_string, Literal::Str),
        map(parse_number, Literal::Num),
        value(Literal::Bool(true), keyword("true")),
        value(Literal::Bool(false), keyword("false")),
        value(Literal::Null, keyword("null")),
    ))(input)
}

/// Parse a dotted field path like `payload.type`
fn parse_field(input: &str) -> IResult<&str, Expr> {
    let (mut input, first) = parse_identifier(input)?;
    let mut segments = vec![first.to_string()];

    while let Ok((rest, _)) = char::<&str, nom::error::Error<&str>>('.')(input) {
        let (rest, segment) = parse_identifier(rest)?;
        segments.push(segment.to_string());
        input = rest;
    }

    Ok((input, Expr::Field(segments)))
}

/// Parse comparison operator (word or symbolic form)
fn parse_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Gte, tag(">=")),
        value(Operator::Lte, tag("<=")),
        value(Operator::Ne, alt((tag("!="), tag("<>")))),
        value(Operator::Gt, tag(">")),
        value(Operator::Lt, tag("<")),
        value(Operator::Eq, alt((tag("=="), tag("=")))),
        value(Operator::Gte, keyword("gte")),
        value(Operator::Lte, keyword("lte")),
        value(Operator::Gt, keyword("gt")),
        value(Operator::Lt, keyword("lt")),
        value(Operator::Eq, keyword("eq")),
        value(Operator::Ne, keyword("ne")),
    ))(input)
}

/// Parse identifier (field path segment)
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// Parse quoted string
fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('\'')(input)?;
    let (input, content) = take_while(|c| c != '\'')(input)?;
    let (input, _) = char('\'')(input)?;
    Ok((input, content.to_string()))
}

/// Parse floating point number
fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit1))))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// Case-insensitive keyword that must not run into a following identifier
/// character (so `and` never matches the prefix of a field named `android`).
fn keyword(kw: &'static str) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let (rest, matched) = tag_no_case(kw)(input)?;
        match rest.chars().next() {
            Some(c) if c.is_alphanumeric() || c == '_' => Err(nom::Err::Error(
                nom::error::Error::new(input, nom::error::ErrorKind::Tag),
            )),
            _ => Ok((rest, matched)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_equality() {
        let expr = parse_selector("payload.type eq 'CHAT'").unwrap();
        match expr {
            Expr::Compare { lhs, op, rhs } => {
                assert_eq!(*lhs, Expr::Field(vec!["payload".into(), "type".into()]));
                assert_eq!(op, Operator::Eq);
                assert_eq!(*rhs, Expr::Literal(Literal::Str("CHAT".into())));
            }
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_symbolic_operators() {
        let expr = parse_selector("payload.priority >= 5").unwrap();
        match expr {
            Expr::Compare { op, rhs, .. } => {
                assert_eq!(op, Operator::Gte);
                assert_eq!(*rhs, Expr::Literal(Literal::Num(5.0)));
            }
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_and_or_precedence() {
        // a eq 1 or b eq 2 and c eq 3 => Or(a eq 1, And(b eq 2, c eq 3))
        let expr = parse_selector("a eq 1 or b eq 2 and c eq 3").unwrap();
        match expr {
            Expr::Or(lhs, rhs) => {
                assert!(matches!(*lhs, Expr::Compare { .. }));
                assert!(matches!(*rhs, Expr::And(_, _)));
            }
            other => panic!("Expected Or at top level, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_not_and_parens() {
        let expr = parse_selector("not (a eq 1 or b eq 2)").unwrap();
        match expr {
            Expr::Not(inner) => assert!(matches!(*inner, Expr::Or(_, _))),
            other => panic!("Expected Not, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bare_boolean_field() {
        let expr = parse_selector("payload.urgent").unwrap();
        assert_eq!(expr, Expr::Field(vec!["payload".into(), "urgent".into()]));
    }

    #[test]
    fn test_parse_boolean_and_null_literals() {
        let expr = parse_selector("payload.muted eq false and payload.room ne null").unwrap();
        assert!(matches!(expr, Expr::And(_, _)));
    }

    #[test]
    fn test_parse_negative_number() {
        let expr = parse_selector("payload.delta < -3.5").unwrap();
        match expr {
            Expr::Compare { rhs, .. } => {
                assert_eq!(*rhs, Expr::Literal(Literal::Num(-3.5)));
            }
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_keyword_does_not_split_identifiers() {
        // `android` must parse as a field, not `and` + `roid`
        let expr = parse_selector("android eq 'os'").unwrap();
        match expr {
            Expr::Compare { lhs, .. } => {
                assert_eq!(*lhs, Expr::Field(vec!["android".into()]));
            }
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_case_insensitive_keywords() {
        let expr = parse_selector("a EQ 1 AND NOT b").unwrap();
        assert!(matches!(expr, Expr::And(_, _)));
    }

    #[test]
    fn test_parse_error_trailing_garbage() {
        let result = parse_selector("a eq 1 ???");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_error_empty() {
        assert!(parse_selector("").is_err());
        assert!(parse_selector("   ").is_err());
    }

    #[test]
    fn test_parse_error_unbalanced_parens() {
        assert!(parse_selector("(a eq 1").is_err());
    }
}
