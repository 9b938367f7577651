use std::fmt;

use crate::model::variable::Variable;

/// Import of another project, or of every project matching a prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import {
    /// Project name, or name prefix for wildcard imports
    pub target: String,
    pub wildcard: bool,
}

impl Import {
    pub fn explicit(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            wildcard: false,
        }
    }

    pub fn wildcard(prefix: impl Into<String>) -> Self {
        Self {
            target: prefix.into(),
            wildcard: true,
        }
    }

    /// Parse `Name` or `Prefix*`
    pub fn parse(text: &str) -> Self {
        match text.trim().strip_suffix('*') {
            Some(prefix) => Import::wildcard(prefix),
            None => Import::explicit(text.trim()),
        }
    }

    pub fn matches(&self, project: &str) -> bool {
        if self.wildcard {
            project.starts_with(&self.target)
        } else {
            project == self.target
        }
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wildcard {
            write!(f, "{}*", self.target)
        } else {
            f.write_str(&self.target)
        }
    }
}

/// Namespace of variables with ordered imports
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub imports: Vec<Import>,
    pub variables: Vec<Variable>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            imports: Vec::new(),
            variables: Vec::new(),
        }
    }

    pub fn with_import(mut self, import: Import) -> Self {
        self.add_import(import);
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    pub fn has_import(&self, import: &Import) -> bool {
        self.imports.contains(import)
    }

    /// Append unless already present; returns whether it was added
    pub fn add_import(&mut self, import: Import) -> bool {
        if self.has_import(&import) {
            return false;
        }
        self.imports.push(import);
        true
    }

    pub fn remove_import(&mut self, import: &Import) -> bool {
        let before = self.imports.len();
        self.imports.retain(|i| i != import);
        before != self.imports.len()
    }
}
