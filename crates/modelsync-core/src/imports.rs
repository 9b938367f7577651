//! Import management on the root project
//!
//! A project imported by the root is *used* when a variable reachable from
//! the active subset (root and application variables) lives in it or when it
//! declares a type such a variable relies on.

use std::collections::{BTreeSet, VecDeque};

use crate::config::MapperConfig;
use crate::errors::Result;
use crate::model::{Import, TypeRef, Value};
use crate::ops::{project_ops, ModelStore};

/// Named types a value tree mentions through typed compounds and enum literals
fn value_types<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Compound { ty, fields } => {
            if let Some(ty) = ty {
                out.push(ty);
            }
            fields.values().for_each(|v| value_types(v, out));
        }
        Value::Container(items) => items.iter().for_each(|v| value_types(v, out)),
        Value::Enum { ty, .. } => out.push(ty),
        _ => {}
    }
}

fn type_projects(model: &ModelStore, ty: &TypeRef, used: &mut BTreeSet<String>) {
    if let Some(name) = ty.base_name() {
        mark_type(model, name, used);
    }
}

fn mark_type(model: &ModelStore, name: &str, used: &mut BTreeSet<String>) {
    for ancestor in model.types().ancestors(name) {
        if let Some(decl) = model.types().get(ancestor) {
            used.insert(decl.project().to_string());
        }
    }
}

/// Qualified names of variables reachable from the active subset
pub fn reachable_variables(model: &ModelStore, config: &MapperConfig) -> BTreeSet<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = model
        .variables()
        .filter(|v| v.project == config.root_project || config.app_projects.matches(&v.project))
        .map(|v| v.qualified_name())
        .collect();
    while let Some(name) = queue.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let Some(var) = model.find_variable(&name) else {
            continue;
        };
        for reference in var.value.references() {
            if let Some(target) = model.resolve_reference(&var.project, reference) {
                let qualified = target.qualified_name();
                if !seen.contains(&qualified) {
                    queue.push_back(qualified);
                }
            }
        }
    }
    seen
}

/// Projects imported by the root, directly or transitively, that nothing in
/// the active subset uses
pub fn unused_projects(model: &ModelStore, config: &MapperConfig) -> Vec<String> {
    let mut used: BTreeSet<String> = BTreeSet::new();
    for name in reachable_variables(model, config) {
        if let Some(var) = model.find_variable(&name) {
            used.insert(var.project.clone());
            type_projects(model, &var.ty, &mut used);
            let mut mentioned = Vec::new();
            value_types(&var.value, &mut mentioned);
            for ty in mentioned {
                mark_type(model, ty, &mut used);
            }
        }
    }
    model
        .visible_projects(&config.root_project)
        .into_iter()
        .filter(|p| *p != config.root_project && !used.contains(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Add imports (`Name` or `Prefix*`) to the root project
///
/// Returns the imports that were not present before.
///
/// # Errors
///
/// Returns `ProjectNotFound` for unknown explicit targets and `CyclicImport`
/// if an import would close a cycle.
pub fn add_imports(
    model: &mut ModelStore,
    config: &MapperConfig,
    names: &[String],
) -> Result<Vec<String>> {
    let mut added = Vec::new();
    for name in names {
        let import = Import::parse(name);
        let text = import.to_string();
        if project_ops::add_import(model, &config.root_project, import)? {
            added.push(text);
        }
    }
    Ok(added)
}

/// Remove imports (`Name` or `Prefix*`) from the root project
///
/// # Errors
///
/// Returns `ProjectNotFound` if the root does not hold one of the imports.
pub fn remove_imports(
    model: &mut ModelStore,
    config: &MapperConfig,
    names: &[String],
) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for name in names {
        let import = Import::parse(name);
        project_ops::remove_import(model, &config.root_project, &import)?;
        removed.push(import.to_string());
    }
    Ok(removed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::errors::ModelError;
    use crate::model::{CompoundType, PrimitiveType, Project, Variable};

    fn config() -> MapperConfig {
        MapperConfig {
            root_project: "Root".to_string(),
            ..MapperConfig::default()
        }
    }

    fn model() -> ModelStore {
        let mut model = ModelStore::new();
        model
            .types_mut()
            .register(CompoundType::new("Svc", "Meta").field("n", TypeRef::Primitive(PrimitiveType::Integer)))
            .unwrap();
        model
            .add_project(
                Project::new("Root")
                    .with_import(Import::explicit("Meta"))
                    .with_import(Import::explicit("Lib"))
                    .with_import(Import::explicit("Unused")),
            )
            .unwrap();
        model.add_project(Project::new("Meta")).unwrap();
        model.add_project(Project::new("Lib")).unwrap();
        model.add_project(Project::new("Unused")).unwrap();
        model
            .insert_variable(Variable::new("svc", "Lib", TypeRef::named("Svc")))
            .unwrap();
        model
            .insert_variable(
                Variable::new("pick", "Root", TypeRef::ref_to(TypeRef::named("Svc")))
                    .with_value(Value::reference("svc")),
            )
            .unwrap();
        model
            .insert_variable(Variable::new("dead", "Unused", TypeRef::Primitive(PrimitiveType::Integer)))
            .unwrap();
        model
    }

    #[test]
    fn test_unused_projects() {
        let model = model();
        let reachable = reachable_variables(&model, &config());
        assert!(reachable.contains("Lib::svc"));
        assert!(!reachable.contains("Unused::dead"));
        assert_eq!(unused_projects(&model, &config()), vec!["Unused"]);
    }

    #[test]
    fn test_add_and_remove_imports() {
        let mut model = model();
        model.add_project(Project::new("Extra")).unwrap();
        let added = add_imports(&mut model, &config(), &["Extra".to_string(), "Lib".to_string()]).unwrap();
        assert_eq!(added, vec!["Extra"]);
        let removed = remove_imports(&mut model, &config(), &["Unused".to_string()]).unwrap();
        assert_eq!(removed, vec!["Unused"]);
        assert!(unused_projects(&model, &config()).contains(&"Extra".to_string()));
        let err = remove_imports(&mut model, &config(), &["Unused".to_string()]).unwrap_err();
        assert!(matches!(err, ModelError::ProjectNotFound { .. }));
    }

    #[test]
    fn test_add_import_cycle_rejected() {
        let mut model = model();
        project_ops::add_import(&mut model, "Lib", Import::explicit("Unused")).unwrap();
        let mut cfg = config();
        cfg.root_project = "Unused".to_string();
        let err = add_imports(&mut model, &cfg, &["Lib".to_string()]).unwrap_err();
        assert!(matches!(err, ModelError::CyclicImport { .. }));
    }
}
