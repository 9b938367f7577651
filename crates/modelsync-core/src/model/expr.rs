//! Value expression language
//!
//! Grammar accepted by [`parse_expr`]:
//!
//! ```text
//! expr     := "?" | "null" | "true" | "false" | number | string
//!           | "refBy" "(" path ")" | path | path? "{" body? "}"
//! body     := assign ("," assign)* | expr ("," expr)*
//! assign   := ident "=" expr
//! path     := ident ("::" ident)*
//! ```

use std::collections::BTreeMap;

use crate::errors::{ModelError, Result};
use crate::model::types::{TypeRef, TypeRegistry};
use crate::model::value::Value;

/// Parsed but not yet type-resolved expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Unset,
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    /// `a` or `A::b`: a reference or an enum literal
    Path(Vec<String>),
    RefBy(String),
    Compound {
        ty: Option<String>,
        fields: Vec<(String, Expr)>,
    },
    Container(Vec<Expr>),
}

impl Expr {
    /// Resolve paths against the type registry
    pub fn evaluate(&self, types: &TypeRegistry) -> Value {
        match self {
            Expr::Unset => Value::Unset,
            Expr::Null => Value::Null,
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Int(i) => Value::Int(*i),
            Expr::Real(r) => Value::Real(*r),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::RefBy(target) => Value::Ref(target.clone()),
            Expr::Path(segments) => match segments.as_slice() {
                [ty, literal]
                    if types
                        .enum_type(ty)
                        .is_some_and(|e| e.literals.contains(literal)) =>
                {
                    Value::Enum {
                        ty: ty.clone(),
                        literal: literal.clone(),
                    }
                }
                _ => Value::Ref(segments.join("::")),
            },
            Expr::Compound { ty, fields } => Value::Compound {
                ty: ty.clone(),
                fields: fields
                    .iter()
                    .map(|(name, e)| (name.clone(), e.evaluate(types)))
                    .collect::<BTreeMap<_, _>>(),
            },
            Expr::Container(items) => {
                Value::Container(items.iter().map(|e| e.evaluate(types)).collect())
            }
        }
    }
}

/// Parse, evaluate and coerce an expression for a declared type
///
/// An empty or blank text yields `Value::Unset`.
///
/// # Errors
///
/// Returns `InvalidExpression` on syntax errors and the coercion errors of
/// [`Value::coerce`].
pub fn parse_value(text: &str, ty: &TypeRef, types: &TypeRegistry) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Unset);
    }
    parse_expr(text)?.evaluate(types).coerce(ty, types)
}

/// Parse an expression
///
/// # Errors
///
/// Returns `InvalidExpression` describing the first syntax error.
pub fn parse_expr(text: &str) -> Result<Expr> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        text,
        tokens,
        pos: 0,
    };
    let expr = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Real(f64),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Assign,
    PathSep,
    Question,
}

fn invalid(text: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidExpression {
        expr: text.to_string(),
        reason: reason.into(),
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '{' | '}' | '(' | ')' | ',' | '=' | '?' => {
                tokens.push(match c {
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    '=' => Token::Assign,
                    _ => Token::Question,
                });
                i += 1;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                tokens.push(Token::PathSep);
                i += 2;
            }
            '"' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(invalid(text, "unterminated string")),
                        Some('"') => break,
                        Some('\\') => {
                            s.push(match chars.get(i + 1) {
                                Some('n') => '\n',
                                Some('t') => '\t',
                                Some(&other) => other,
                                None => return Err(invalid(text, "dangling escape")),
                            });
                            i += 2;
                        }
                        Some(&other) => {
                            s.push(other);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
                i += 1;
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while let Some(&d) = chars.get(i) {
                    let exponent_sign =
                        (d == '-' || d == '+') && matches!(chars.get(i - 1), Some('e' | 'E'));
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                if literal.contains(['.', 'e', 'E']) {
                    let r = literal
                        .parse::<f64>()
                        .map_err(|e| invalid(text, format!("bad number {}: {}", literal, e)))?;
                    tokens.push(Token::Real(r));
                } else {
                    let n = literal
                        .parse::<i64>()
                        .map_err(|e| invalid(text, format!("bad number {}: {}", literal, e)))?;
                    tokens.push(Token::Int(n));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while chars.get(i).is_some_and(|d| d.is_alphanumeric() || *d == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(text, format!("unexpected character '{}'", other))),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> ModelError {
        invalid(self.text, format!("{} at token {}", reason, self.pos))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        match self.next() {
            Some(t) if t == token => Ok(()),
            _ => Err(self.error(&format!("expected {:?}", token))),
        }
    }

    fn path(&mut self, first: String) -> Result<Vec<String>> {
        let mut segments = vec![first];
        while self.peek() == Some(&Token::PathSep) {
            self.pos += 1;
            match self.next() {
                Some(Token::Ident(s)) => segments.push(s),
                _ => return Err(self.error("expected identifier after '::'")),
            }
        }
        Ok(segments)
    }

    fn expr(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Question) => Ok(Expr::Unset),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Int(n)) => Ok(Expr::Int(n)),
            Some(Token::Real(r)) => Ok(Expr::Real(r)),
            Some(Token::LBrace) => self.braced(None),
            Some(Token::Ident(word)) => match word.as_str() {
                "null" => Ok(Expr::Null),
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "refBy" if self.peek() == Some(&Token::LParen) => {
                    self.pos += 1;
                    let target = match self.next() {
                        Some(Token::Ident(s)) => self.path(s)?.join("::"),
                        _ => return Err(self.error("expected reference target")),
                    };
                    self.expect(Token::RParen)?;
                    Ok(Expr::RefBy(target))
                }
                _ => {
                    let segments = self.path(word)?;
                    if self.peek() == Some(&Token::LBrace) {
                        self.pos += 1;
                        self.braced(Some(segments.join("::")))
                    } else {
                        Ok(Expr::Path(segments))
                    }
                }
            },
            _ => Err(self.error("expected expression")),
        }
    }

    /// Body after an opening brace, compound if it starts with `ident =`
    fn braced(&mut self, ty: Option<String>) -> Result<Expr> {
        if self.peek() == Some(&Token::RBrace) {
            self.pos += 1;
            return Ok(Expr::Compound {
                ty,
                fields: Vec::new(),
            });
        }
        let is_compound = matches!(
            (self.peek(), self.peek_at(1)),
            (Some(Token::Ident(_)), Some(Token::Assign))
        );
        if ty.is_some() && !is_compound {
            return Err(self.error("typed initializer needs field assignments"));
        }
        let mut fields = Vec::new();
        let mut items = Vec::new();
        loop {
            if is_compound {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    _ => return Err(self.error("expected field name")),
                };
                self.expect(Token::Assign)?;
                fields.push((name, self.expr()?));
            } else {
                items.push(self.expr()?);
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBrace) => break,
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
        Ok(if is_compound {
            Expr::Compound { ty, fields }
        } else {
            Expr::Container(items)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::types::{EnumType, PrimitiveType};

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_expr("42").unwrap(), Expr::Int(42));
        assert_eq!(parse_expr("-3").unwrap(), Expr::Int(-3));
        assert_eq!(parse_expr("1.5e3").unwrap(), Expr::Real(1500.0));
        assert_eq!(parse_expr("\"a b\"").unwrap(), Expr::Str("a b".to_string()));
        assert_eq!(parse_expr("null").unwrap(), Expr::Null);
        assert_eq!(parse_expr("?").unwrap(), Expr::Unset);
    }

    #[test]
    fn test_parse_compound_and_container() {
        let expr = parse_expr("Application{name = \"app\", services = {refBy(m1), m2}}").unwrap();
        assert_eq!(
            expr,
            Expr::Compound {
                ty: Some("Application".to_string()),
                fields: vec![
                    ("name".to_string(), Expr::Str("app".to_string())),
                    (
                        "services".to_string(),
                        Expr::Container(vec![
                            Expr::RefBy("m1".to_string()),
                            Expr::Path(vec!["m2".to_string()])
                        ])
                    ),
                ],
            }
        );
    }

    #[test]
    fn test_qualified_path_becomes_enum_only_for_known_literals() {
        let mut types = TypeRegistry::new();
        types
            .register(EnumType::new("Kind", "Meta", &["SOURCE", "SINK"]))
            .unwrap();
        assert_eq!(
            parse_expr("Kind::SINK").unwrap().evaluate(&types),
            Value::Enum {
                ty: "Kind".to_string(),
                literal: "SINK".to_string()
            }
        );
        assert_eq!(
            parse_expr("AllServices::src").unwrap().evaluate(&types),
            Value::Ref("AllServices::src".to_string())
        );
    }

    #[test]
    fn test_rendered_values_parse_back() {
        let types = TypeRegistry::new();
        let text = "{a = \"x\\\"y\", b = {1, 2}, c = refBy(P::v), d = 2.5}";
        let value = parse_expr(text).unwrap().evaluate(&types);
        let again = parse_expr(&value.to_string()).unwrap().evaluate(&types);
        assert_eq!(value, again);
    }

    #[test]
    fn test_blank_text_is_unset() {
        let types = TypeRegistry::new();
        let ty = TypeRef::Primitive(PrimitiveType::String);
        assert_eq!(parse_value("  ", &ty, &types).unwrap(), Value::Unset);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_expr("{a = 1").is_err());
        assert!(parse_expr("\"open").is_err());
        assert!(parse_expr("1 2").is_err());
        assert!(parse_expr("T{1}").is_err());
        assert!(parse_expr("#").is_err());
    }
}
