use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::errors::{ModelError, Result};
use crate::model::{split_qualified, Project, TypeRegistry, Value, Variable};

/// In-memory decision model
///
/// Projects are keyed by name; simple-name lookups scan projects in name
/// order so results are deterministic. Cloning is how callers stage a batch:
/// mutate the clone, validate it, then swap it in.
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    pub(crate) projects: BTreeMap<String, Project>,
    pub(crate) types: TypeRegistry,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// # Errors
    ///
    /// Returns `NameCollision` if a project with the same name exists.
    pub fn add_project(&mut self, project: Project) -> Result<()> {
        if self.projects.contains_key(&project.name) {
            return Err(ModelError::NameCollision {
                name: project.name.clone(),
                project: project.name,
            });
        }
        self.projects.insert(project.name.clone(), project);
        Ok(())
    }

    pub fn has_project(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    /// # Errors
    ///
    /// Returns `ProjectNotFound` if no such project exists.
    pub fn project(&self, name: &str) -> Result<&Project> {
        self.projects
            .get(name)
            .ok_or_else(|| ModelError::ProjectNotFound {
                name: name.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `ProjectNotFound` if no such project exists.
    pub fn project_mut(&mut self, name: &str) -> Result<&mut Project> {
        self.projects
            .get_mut(name)
            .ok_or_else(|| ModelError::ProjectNotFound {
                name: name.to_string(),
            })
    }

    /// Remove a project together with its variables and types
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if no such project exists.
    pub fn remove_project(&mut self, name: &str) -> Result<Project> {
        let project = self
            .projects
            .remove(name)
            .ok_or_else(|| ModelError::ProjectNotFound {
                name: name.to_string(),
            })?;
        self.types.remove_project_types(name);
        Ok(project)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn project_names(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.projects.values().flat_map(|p| p.variables.iter())
    }

    /// Resolve a simple or `Project::name` qualified name
    pub fn find_variable(&self, name: &str) -> Option<&Variable> {
        match split_qualified(name) {
            (Some(project), simple) => self.projects.get(project)?.variable(simple),
            (None, simple) => self.variables().find(|v| v.name == simple),
        }
    }

    pub fn find_variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        let qualified = self.find_variable(name)?.qualified_name();
        let (project, simple) = split_qualified(&qualified);
        self.projects
            .get_mut(project?)?
            .variable_mut(simple)
    }

    /// # Errors
    ///
    /// Returns `VariableNotFound` if the name does not resolve.
    pub fn variable(&self, name: &str) -> Result<&Variable> {
        self.find_variable(name)
            .ok_or_else(|| ModelError::VariableNotFound {
                name: name.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns `VariableNotFound` if the name does not resolve.
    pub fn variable_mut(&mut self, name: &str) -> Result<&mut Variable> {
        self.find_variable_mut(name)
            .ok_or_else(|| ModelError::VariableNotFound {
                name: name.to_string(),
            })
    }

    /// Value at a dotted path `var.field.sub`
    ///
    /// The variable part may be qualified.
    pub fn get_value(&self, path: &str) -> Option<&Value> {
        let (var_name, fields) = split_value_path(path);
        self.find_variable(var_name)?.value.get_path(&fields)
    }

    /// # Errors
    ///
    /// Returns `ProjectNotFound` for an unknown owning project and
    /// `NameCollision` if the simple name is taken there.
    pub fn insert_variable(&mut self, variable: Variable) -> Result<()> {
        let project = self.project_mut(&variable.project)?;
        if project.contains_variable(&variable.name) {
            return Err(ModelError::NameCollision {
                name: variable.name,
                project: project.name.clone(),
            });
        }
        project.variables.push(variable);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `VariableNotFound` if the name does not resolve.
    pub fn remove_variable(&mut self, name: &str) -> Result<Variable> {
        let var = self.variable(name)?;
        let (project_name, simple) = (var.project.clone(), var.name.clone());
        let project = self.project_mut(&project_name)?;
        let index = project
            .variables
            .iter()
            .position(|v| v.name == simple)
            .ok_or_else(|| ModelError::VariableNotFound {
                name: name.to_string(),
            })?;
        Ok(project.variables.remove(index))
    }

    /// Projects imported by `project`, wildcards expanded to existing projects
    pub fn resolve_imports(&self, project: &str) -> Vec<String> {
        let Some(p) = self.projects.get(project) else {
            return Vec::new();
        };
        let mut resolved: Vec<String> = Vec::new();
        for import in &p.imports {
            if import.wildcard {
                for name in self.projects.keys() {
                    if name != project && import.matches(name) && !resolved.contains(name) {
                        resolved.push(name.clone());
                    }
                }
            } else if !resolved.contains(&import.target) {
                resolved.push(import.target.clone());
            }
        }
        resolved
    }

    /// `project` and everything it imports transitively, breadth first
    pub fn visible_projects(&self, project: &str) -> Vec<String> {
        let mut seen = BTreeSet::from([project.to_string()]);
        let mut order = vec![project.to_string()];
        let mut queue = VecDeque::from([project.to_string()]);
        while let Some(current) = queue.pop_front() {
            for import in self.resolve_imports(&current) {
                if self.has_project(&import) && seen.insert(import.clone()) {
                    order.push(import.clone());
                    queue.push_back(import);
                }
            }
        }
        order
    }

    /// Resolve a reference written in `from_project`
    ///
    /// Qualified references resolve directly; simple names are searched in
    /// the visible projects, nearest first.
    pub fn resolve_reference(&self, from_project: &str, reference: &str) -> Option<&Variable> {
        match split_qualified(reference) {
            (Some(_), _) => self.find_variable(reference),
            (None, simple) => self
                .visible_projects(from_project)
                .iter()
                .find_map(|p| self.projects.get(p)?.variable(simple)),
        }
    }

    /// Is `target` declared in a project visible from `from_project`?
    pub fn is_visible(&self, from_project: &str, target: &Variable) -> bool {
        self.visible_projects(from_project)
            .iter()
            .any(|p| *p == target.project)
    }
}

/// Split `var.a.b` into the variable name and its field path
///
/// Qualified variable names keep their `::` separator.
pub fn split_value_path(path: &str) -> (&str, Vec<&str>) {
    let mut parts = path.split('.');
    let var_name = parts.next().unwrap_or_default();
    (var_name, parts.collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Import, PrimitiveType, TypeRef};

    fn int_var(name: &str, project: &str, value: i64) -> Variable {
        Variable::new(name, project, TypeRef::Primitive(PrimitiveType::Integer))
            .with_value(Value::Int(value))
    }

    fn store() -> ModelStore {
        let mut store = ModelStore::new();
        store
            .add_project(Project::new("Root").with_import(Import::explicit("A")))
            .unwrap();
        store
            .add_project(Project::new("A").with_import(Import::wildcard("Part")))
            .unwrap();
        store.add_project(Project::new("PartOne")).unwrap();
        store.add_project(Project::new("PartTwo")).unwrap();
        store.insert_variable(int_var("x", "A", 1)).unwrap();
        store.insert_variable(int_var("x", "PartTwo", 2)).unwrap();
        store
    }

    #[test]
    fn test_find_variable_simple_and_qualified() {
        let store = store();
        assert_eq!(store.find_variable("x").unwrap().project, "A");
        assert_eq!(store.find_variable("PartTwo::x").unwrap().value, Value::Int(2));
        assert!(store.find_variable("Nope::x").is_none());
        assert!(store.find_variable("y").is_none());
    }

    #[test]
    fn test_insert_collision_within_project() {
        let mut store = store();
        let err = store.insert_variable(int_var("x", "A", 3)).unwrap_err();
        assert!(matches!(err, ModelError::NameCollision { .. }));
    }

    #[test]
    fn test_wildcard_import_resolution() {
        let store = store();
        assert_eq!(store.resolve_imports("A"), vec!["PartOne", "PartTwo"]);
        assert_eq!(
            store.visible_projects("Root"),
            vec!["Root", "A", "PartOne", "PartTwo"]
        );
    }

    #[test]
    fn test_resolve_reference_prefers_nearest() {
        let store = store();
        assert_eq!(store.resolve_reference("Root", "x").unwrap().project, "A");
        assert_eq!(store.resolve_reference("PartTwo", "x").unwrap().project, "PartTwo");
        assert!(store.resolve_reference("PartOne", "x").is_none());
    }

    #[test]
    fn test_remove_variable_and_project() {
        let mut store = store();
        let removed = store.remove_variable("PartTwo::x").unwrap();
        assert_eq!(removed.value, Value::Int(2));
        assert!(store.find_variable("PartTwo::x").is_none());
        store.remove_project("PartTwo").unwrap();
        assert!(!store.has_project("PartTwo"));
        assert!(store.remove_project("PartTwo").is_err());
    }

    #[test]
    fn test_get_value_nested_path() {
        let mut store = store();
        let var = store.variable_mut("A::x").unwrap();
        var.value = Value::compound("Rec", [("inner", Value::Int(7))]);
        assert_eq!(store.get_value("A::x.inner"), Some(&Value::Int(7)));
        assert_eq!(store.get_value("A::x.missing"), None);
    }
}
