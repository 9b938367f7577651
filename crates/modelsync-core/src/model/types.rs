use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ModelError, Result};

/// Built-in scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Integer,
    Real,
    String,
}

impl PrimitiveType {
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Integer => "Integer",
            PrimitiveType::Real => "Real",
            PrimitiveType::String => "String",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Boolean" => Some(PrimitiveType::Boolean),
            "Integer" => Some(PrimitiveType::Integer),
            "Real" => Some(PrimitiveType::Real),
            "String" => Some(PrimitiveType::String),
            _ => None,
        }
    }
}

/// Declared type of a variable or compound field
///
/// Written as `Integer`, `JavaService`, `setOf(Integer)`,
/// `sequenceOf(refTo(ServiceMesh))`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveType),
    /// Compound or enum type declared in the registry
    Named(String),
    SetOf(Box<TypeRef>),
    SequenceOf(Box<TypeRef>),
    RefTo(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn set_of(element: TypeRef) -> Self {
        TypeRef::SetOf(Box::new(element))
    }

    pub fn sequence_of(element: TypeRef) -> Self {
        TypeRef::SequenceOf(Box::new(element))
    }

    pub fn ref_to(target: TypeRef) -> Self {
        TypeRef::RefTo(Box::new(target))
    }

    pub fn is_container(&self) -> bool {
        matches!(self, TypeRef::SetOf(_) | TypeRef::SequenceOf(_))
    }

    /// Element type of a container
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::SetOf(e) | TypeRef::SequenceOf(e) => Some(e),
            _ => None,
        }
    }

    /// The named type at the core of this reference, if any
    pub fn base_name(&self) -> Option<&str> {
        match self {
            TypeRef::Named(n) => Some(n),
            TypeRef::Primitive(_) => None,
            TypeRef::SetOf(e) | TypeRef::SequenceOf(e) | TypeRef::RefTo(e) => e.base_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => f.write_str(p.name()),
            TypeRef::Named(n) => f.write_str(n),
            TypeRef::SetOf(e) => write!(f, "setOf({})", e),
            TypeRef::SequenceOf(e) => write!(f, "sequenceOf({})", e),
            TypeRef::RefTo(e) => write!(f, "refTo({})", e),
        }
    }
}

impl FromStr for TypeRef {
    type Err = ModelError;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let invalid = |reason: &str| ModelError::InvalidInput {
            reason: format!("type '{}': {}", text, reason),
        };
        if let Some(open) = text.find('(') {
            if !text.ends_with(')') {
                return Err(invalid("missing closing parenthesis"));
            }
            let inner: TypeRef = text[open + 1..text.len() - 1].parse()?;
            return match &text[..open] {
                "setOf" => Ok(TypeRef::set_of(inner)),
                "sequenceOf" => Ok(TypeRef::sequence_of(inner)),
                "refTo" => Ok(TypeRef::ref_to(inner)),
                other => Err(invalid(&format!("unknown type constructor {}", other))),
            };
        }
        if text.is_empty() || !text.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(invalid("not a type name"));
        }
        Ok(PrimitiveType::from_name(text)
            .map(TypeRef::Primitive)
            .unwrap_or_else(|| TypeRef::Named(text.to_string())))
    }
}

/// Field of a compound type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Record type with optional single refinement
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundType {
    pub name: String,
    pub project: String,
    pub refines: Option<String>,
    pub is_abstract: bool,
    pub fields: Vec<FieldDecl>,
}

impl CompoundType {
    pub fn new(name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            refines: None,
            is_abstract: false,
            fields: Vec::new(),
        }
    }

    pub fn refining(mut self, parent: impl Into<String>) -> Self {
        self.refines = Some(parent.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.fields.push(FieldDecl::new(name, ty));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub project: String,
    pub literals: Vec<String>,
}

impl EnumType {
    pub fn new(name: impl Into<String>, project: impl Into<String>, literals: &[&str]) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            literals: literals.iter().map(|l| l.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    Compound(CompoundType),
    Enum(EnumType),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Compound(c) => &c.name,
            TypeDecl::Enum(e) => &e.name,
        }
    }

    /// Project declaring this type
    pub fn project(&self) -> &str {
        match self {
            TypeDecl::Compound(c) => &c.project,
            TypeDecl::Enum(e) => &e.project,
        }
    }
}

impl From<CompoundType> for TypeDecl {
    fn from(c: CompoundType) -> Self {
        TypeDecl::Compound(c)
    }
}

impl From<EnumType> for TypeDecl {
    fn from(e: EnumType) -> Self {
        TypeDecl::Enum(e)
    }
}

/// All compound and enum types of the decision model
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    decls: BTreeMap<String, TypeDecl>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `NameCollision` if a type with the same name is registered.
    pub fn register(&mut self, decl: impl Into<TypeDecl>) -> Result<()> {
        let decl = decl.into();
        if let Some(existing) = self.decls.get(decl.name()) {
            return Err(ModelError::NameCollision {
                name: decl.name().to_string(),
                project: existing.project().to_string(),
            });
        }
        self.decls.insert(decl.name().to_string(), decl);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.decls.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    pub fn compound(&self, name: &str) -> Option<&CompoundType> {
        match self.decls.get(name) {
            Some(TypeDecl::Compound(c)) => Some(c),
            _ => None,
        }
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        match self.decls.get(name) {
            Some(TypeDecl::Enum(e)) => Some(e),
            _ => None,
        }
    }

    pub fn decls(&self) -> impl Iterator<Item = &TypeDecl> {
        self.decls.values()
    }

    pub fn declared_in<'a>(&'a self, project: &'a str) -> impl Iterator<Item = &'a TypeDecl> {
        self.decls.values().filter(move |d| d.project() == project)
    }

    pub fn remove_project_types(&mut self, project: &str) {
        self.decls.retain(|_, d| d.project() != project);
    }

    /// Check that every named type inside `ty` is registered
    ///
    /// # Errors
    ///
    /// Returns `TypeNotFound` for the first unknown name.
    pub fn resolve(&self, ty: &TypeRef) -> Result<()> {
        match ty {
            TypeRef::Primitive(_) => Ok(()),
            TypeRef::Named(n) if self.contains(n) => Ok(()),
            TypeRef::Named(n) => Err(ModelError::TypeNotFound { name: n.clone() }),
            TypeRef::SetOf(e) | TypeRef::SequenceOf(e) | TypeRef::RefTo(e) => self.resolve(e),
        }
    }

    /// `name` followed by its refinement parents, nearest first
    pub fn ancestors<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut chain = vec![name];
        let mut seen = BTreeSet::from([name]);
        let mut current = self.compound(name);
        while let Some(parent) = current.and_then(|c| c.refines.as_deref()) {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent);
            current = self.compound(parent);
        }
        chain
    }

    /// Top-most refinement ancestor of a compound type
    pub fn top_ancestor<'a>(&'a self, name: &'a str) -> &'a str {
        self.ancestors(name).last().copied().unwrap_or(name)
    }

    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        self.ancestors(sub).contains(&sup)
    }

    /// Fields of a compound type including inherited ones, parents first
    pub fn all_fields(&self, name: &str) -> Vec<&FieldDecl> {
        let mut fields = Vec::new();
        for ancestor in self.ancestors(name).into_iter().rev() {
            if let Some(c) = self.compound(ancestor) {
                fields.extend(c.fields.iter());
            }
        }
        fields
    }

    pub fn field_type(&self, compound: &str, field: &str) -> Option<&TypeRef> {
        self.all_fields(compound)
            .into_iter()
            .find(|f| f.name == field)
            .map(|f| &f.ty)
    }

    /// Declared type of the field reached by `path` below `root`
    ///
    /// An empty path yields `root` itself.
    pub fn type_at_path<S: AsRef<str>>(&self, root: &TypeRef, path: &[S]) -> Option<TypeRef> {
        let mut current = root.clone();
        for segment in path {
            let TypeRef::Named(compound) = &current else {
                return None;
            };
            current = self.field_type(compound, segment.as_ref())?.clone();
        }
        Some(current)
    }

    /// Can a value of type `ty` be stored where `target` is declared?
    pub fn is_assignable(&self, ty: &TypeRef, target: &TypeRef) -> bool {
        match (ty, target) {
            (TypeRef::Primitive(PrimitiveType::Integer), TypeRef::Primitive(PrimitiveType::Real)) => {
                true
            }
            (TypeRef::Primitive(a), TypeRef::Primitive(b)) => a == b,
            (TypeRef::Named(a), TypeRef::Named(b)) => self.is_subtype(a, b),
            (TypeRef::SetOf(a), TypeRef::SetOf(b))
            | (TypeRef::SequenceOf(a), TypeRef::SequenceOf(b))
            | (TypeRef::RefTo(a), TypeRef::RefTo(b)) => self.is_assignable(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.register(CompoundType::new("ServiceBase", "Meta").field("name", TypeRef::Primitive(PrimitiveType::String)))
            .unwrap();
        reg.register(
            CompoundType::new("JavaService", "Meta")
                .refining("ServiceBase")
                .field("class", TypeRef::Primitive(PrimitiveType::String)),
        )
        .unwrap();
        reg
    }

    #[test]
    fn test_parse_nested_type() {
        let ty: TypeRef = "sequenceOf(refTo(ServiceMesh))".parse().unwrap();
        assert_eq!(
            ty,
            TypeRef::sequence_of(TypeRef::ref_to(TypeRef::named("ServiceMesh")))
        );
        assert_eq!(ty.to_string(), "sequenceOf(refTo(ServiceMesh))");
        assert_eq!(ty.base_name(), Some("ServiceMesh"));
    }

    #[test]
    fn test_parse_rejects_unknown_constructor() {
        assert!("listOf(Integer)".parse::<TypeRef>().is_err());
        assert!("set Of".parse::<TypeRef>().is_err());
    }

    #[test]
    fn test_inherited_fields_parent_first() {
        let reg = registry();
        let names: Vec<_> = reg.all_fields("JavaService").iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "class"]);
    }

    #[test]
    fn test_assignability_follows_refinement() {
        let reg = registry();
        let java = TypeRef::named("JavaService");
        let base = TypeRef::named("ServiceBase");
        assert!(reg.is_assignable(&java, &base));
        assert!(!reg.is_assignable(&base, &java));
        assert!(reg.is_assignable(
            &TypeRef::Primitive(PrimitiveType::Integer),
            &TypeRef::Primitive(PrimitiveType::Real)
        ));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut reg = registry();
        let err = reg.register(CompoundType::new("JavaService", "Other")).unwrap_err();
        assert!(matches!(err, ModelError::NameCollision { .. }));
    }

    #[test]
    fn test_top_ancestor() {
        let reg = registry();
        assert_eq!(reg.top_ancestor("JavaService"), "ServiceBase");
        assert_eq!(reg.top_ancestor("Unknown"), "Unknown");
    }
}
