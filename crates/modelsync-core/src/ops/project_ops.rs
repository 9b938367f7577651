use crate::errors::{ModelError, Result};
use crate::model::Import;
use crate::ops::store::ModelStore;

/// Would `from` importing `import` close a cycle?
///
/// True if any project the import resolves to can already see `from`.
pub fn would_create_cycle(store: &ModelStore, from: &str, import: &Import) -> bool {
    store
        .project_names()
        .iter()
        .filter(|name| name.as_str() != from && import.matches(name))
        .any(|target| store.visible_projects(target).iter().any(|p| p == from))
}

/// Add an import to a project
///
/// Returns whether the import was new.
///
/// # Errors
///
/// Returns `ProjectNotFound` if either side of an explicit import is missing
/// and `CyclicImport` if the import would close a cycle.
pub fn add_import(store: &mut ModelStore, project: &str, import: Import) -> Result<bool> {
    store.project(project)?;
    if !import.wildcard && !store.has_project(&import.target) {
        return Err(ModelError::ProjectNotFound {
            name: import.target,
        });
    }
    if (!import.wildcard && import.target == project) || would_create_cycle(store, project, &import) {
        return Err(ModelError::CyclicImport {
            project: project.to_string(),
            import: import.to_string(),
        });
    }
    Ok(store.project_mut(project)?.add_import(import))
}

/// Remove an import from a project
///
/// # Errors
///
/// Returns `ProjectNotFound` if the project is missing or does not import
/// the given target.
pub fn remove_import(store: &mut ModelStore, project: &str, import: &Import) -> Result<()> {
    if store.project_mut(project)?.remove_import(import) {
        Ok(())
    } else {
        Err(ModelError::ProjectNotFound {
            name: import.to_string(),
        })
    }
}
