use crate::model::types::TypeRef;
use crate::model::value::Value;

/// Separator between project and simple name in qualified names
pub const QUALIFIER: &str = "::";

/// Split `Project::name` into its parts; simple names have no project
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once(QUALIFIER) {
        Some((project, simple)) => (Some(project), simple),
        None => (None, name),
    }
}

pub fn qualify(project: &str, name: &str) -> String {
    format!("{}{}{}", project, QUALIFIER, name)
}

/// A named, typed decision-model entry
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub project: String,
    pub ty: TypeRef,
    pub value: Value,
    /// Value is fixed and must not be overwritten by bulk edits
    pub frozen: bool,
    /// Reusable template root
    pub template: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, project: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            ty,
            value: Value::Unset,
            frozen: false,
            template: false,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn as_template(mut self) -> Self {
        self.template = true;
        self
    }

    pub fn qualified_name(&self) -> String {
        qualify(&self.project, &self.name)
    }

    /// Does `reference` (simple or qualified) name this variable?
    pub fn is_named_by(&self, reference: &str) -> bool {
        match split_qualified(reference) {
            (Some(project), simple) => project == self.project && simple == self.name,
            (None, simple) => simple == self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::PrimitiveType;

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("P::x"), (Some("P"), "x"));
        assert_eq!(split_qualified("x"), (None, "x"));
    }

    #[test]
    fn test_is_named_by() {
        let var = Variable::new("x", "P", TypeRef::Primitive(PrimitiveType::Integer));
        assert!(var.is_named_by("x"));
        assert!(var.is_named_by("P::x"));
        assert!(!var.is_named_by("Q::x"));
        assert_eq!(var.qualified_name(), "P::x");
    }
}
