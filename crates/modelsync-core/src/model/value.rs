use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{ModelError, Result};
use crate::model::types::{PrimitiveType, TypeRef, TypeRegistry};

/// Value held by a variable or a compound field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Not assigned yet; open slot in templates
    Unset,
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Enum {
        ty: String,
        literal: String,
    },
    Compound {
        ty: Option<String>,
        fields: BTreeMap<String, Value>,
    },
    Container(Vec<Value>),
    /// Reference to a variable by simple or qualified name
    Ref(String),
}

/// What to do with a reference while rewriting a value tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefAction {
    Keep,
    Replace(String),
    /// Drop from containers, null elsewhere
    Remove,
}

impl Value {
    pub fn str(text: impl Into<String>) -> Self {
        Value::Str(text.into())
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Value::Ref(target.into())
    }

    /// Compound of the given type from `(field, value)` pairs
    pub fn compound<I, K>(ty: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Compound {
            ty: Some(ty.to_string()),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_ref_target(&self) -> Option<&str> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&[Value]> {
        match self {
            Value::Container(items) => Some(items),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Compound { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    /// Nested lookup along compound field names
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter()
            .try_fold(self, |value, segment| value.field(segment.as_ref()))
    }

    /// Replace the value at a nested compound path
    ///
    /// Intermediate unset or null fields become untyped compounds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a segment crosses a non-compound value.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: Value) -> Result<()> {
        let Some((first, rest)) = path.split_first() else {
            *self = value;
            return Ok(());
        };
        if matches!(self, Value::Unset | Value::Null) {
            *self = Value::Compound {
                ty: None,
                fields: BTreeMap::new(),
            };
        }
        match self {
            Value::Compound { fields, .. } => fields
                .entry(first.as_ref().to_string())
                .or_insert(Value::Unset)
                .set_path(rest, value),
            other => Err(ModelError::InvalidInput {
                reason: format!(
                    "cannot address field {} inside {}",
                    first.as_ref(),
                    other
                ),
            }),
        }
    }

    /// All reference targets in this value tree, in walk order
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Value::Ref(r) => refs.push(r),
            Value::Compound { fields, .. } => fields.values().for_each(|v| v.collect_refs(refs)),
            Value::Container(items) => items.iter().for_each(|v| v.collect_refs(refs)),
            _ => {}
        }
    }

    /// Rewrite references in place; returns whether anything changed
    pub fn rewrite_refs(&mut self, action: &mut dyn FnMut(&str) -> RefAction) -> bool {
        match self {
            Value::Ref(r) => match action(r) {
                RefAction::Keep => false,
                RefAction::Replace(new) => {
                    *r = new;
                    true
                }
                RefAction::Remove => {
                    *self = Value::Null;
                    true
                }
            },
            Value::Compound { fields, .. } => {
                let mut changed = false;
                for v in fields.values_mut() {
                    changed |= v.rewrite_refs(action);
                }
                changed
            }
            Value::Container(items) => {
                let before = items.len();
                items.retain(|item| match item {
                    Value::Ref(r) => action(r) != RefAction::Remove,
                    _ => true,
                });
                let mut changed = items.len() != before;
                for item in items.iter_mut() {
                    changed |= item.rewrite_refs(action);
                }
                changed
            }
            _ => false,
        }
    }

    /// Fit a freshly evaluated value to its declared type
    ///
    /// Untyped compounds take the declared type, missing compound fields
    /// become `Unset`, `{}` turns into an empty container where one is
    /// declared, integers widen to reals and bare names become enum literals.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for fields unknown to the compound type and
    /// `TypeNotFound` for unknown compound names.
    pub fn coerce(self, ty: &TypeRef, types: &TypeRegistry) -> Result<Value> {
        match (ty, self) {
            (_, Value::Unset) => Ok(Value::Unset),
            (TypeRef::Primitive(PrimitiveType::Real), Value::Int(i)) => Ok(Value::Real(i as f64)),
            (TypeRef::SetOf(elem) | TypeRef::SequenceOf(elem), Value::Container(items)) => items
                .into_iter()
                .map(|item| item.coerce(elem, types))
                .collect::<Result<Vec<_>>>()
                .map(Value::Container),
            (TypeRef::SetOf(_) | TypeRef::SequenceOf(_), Value::Compound { ty: None, fields })
                if fields.is_empty() =>
            {
                Ok(Value::Container(Vec::new()))
            }
            (TypeRef::Named(name), value) if types.enum_type(name).is_some() => match value {
                Value::Ref(literal)
                    if types
                        .enum_type(name)
                        .is_some_and(|e| e.literals.contains(&literal)) =>
                {
                    Ok(Value::Enum {
                        ty: name.clone(),
                        literal,
                    })
                }
                other => Ok(other),
            },
            (TypeRef::Named(name), Value::Container(items)) if items.is_empty() => {
                Value::Compound {
                    ty: None,
                    fields: BTreeMap::new(),
                }
                .coerce(&TypeRef::Named(name.clone()), types)
            }
            (TypeRef::Named(name), Value::Compound { ty, fields }) => {
                let actual = ty.unwrap_or_else(|| name.clone());
                if types.compound(&actual).is_none() {
                    return Err(ModelError::TypeNotFound { name: actual });
                }
                let declared = types.all_fields(&actual);
                let mut coerced = BTreeMap::new();
                for (field, value) in fields {
                    let Some(decl) = declared.iter().find(|d| d.name == field) else {
                        return Err(ModelError::TypeMismatch {
                            variable: field,
                            reason: format!("no such field in {}", actual),
                        });
                    };
                    coerced.insert(field, value.coerce(&decl.ty, types)?);
                }
                for decl in declared {
                    coerced.entry(decl.name.clone()).or_insert(Value::Unset);
                }
                Ok(Value::Compound {
                    ty: Some(actual),
                    fields: coerced,
                })
            }
            (_, value) => Ok(value),
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in text.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

/// Renders the value expression syntax accepted by `expr::parse_expr`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => f.write_str("?"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{:?}", r),
            Value::Str(s) => write_escaped(f, s),
            Value::Enum { ty, literal } => write!(f, "{}::{}", ty, literal),
            Value::Ref(r) => write!(f, "refBy({})", r),
            Value::Compound { ty, fields } => {
                if let Some(ty) = ty {
                    f.write_str(ty)?;
                }
                f.write_str("{")?;
                let mut first = true;
                for (name, value) in fields.iter().filter(|(_, v)| !v.is_unset()) {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{} = {}", name, value)?;
                }
                f.write_str("}")
            }
            Value::Container(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
        }
    }
}
