//! Injection seams of the mapper
//!
//! `TargetAdapter` normalizes each affected project before a batch commits.
//! `ModelValidator` decides whether a staged model may be committed.

use crate::errors::{ExError, ExErrorKind};
use crate::model::{Import, Project};
use crate::ops::ModelStore;
use crate::rules::validation;

/// What an adapter may consult while rewriting a project
pub struct AdaptContext<'a> {
    /// Name of the root project of the configuration
    pub root: &'a str,
    /// Staged model the project belongs to
    pub model: &'a ModelStore,
}

/// Per-project normalization applied once before commit
pub trait TargetAdapter: Send + Sync {
    /// Return the project to store in place of `target`
    ///
    /// # Errors
    ///
    /// Any error aborts the batch.
    #[allow(clippy::result_large_err)]
    fn adapt_target(&self, ctx: &AdaptContext<'_>, target: Project) -> Result<Project, ExError>;
}

/// Stores projects unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAdapter;

impl TargetAdapter for IdentityAdapter {
    #[allow(clippy::result_large_err)]
    fn adapt_target(&self, _: &AdaptContext<'_>, target: Project) -> Result<Project, ExError> {
        Ok(target)
    }
}

/// Replaces wildcard imports by explicit imports of the projects they match
///
/// A wildcard matching nothing is kept so later additions still resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitImportAdapter;

impl TargetAdapter for ExplicitImportAdapter {
    #[allow(clippy::result_large_err)]
    fn adapt_target(&self, ctx: &AdaptContext<'_>, target: Project) -> Result<Project, ExError> {
        let mut imports: Vec<Import> = Vec::new();
        for import in &target.imports {
            let expanded: Vec<Import> = if import.wildcard {
                ctx.model
                    .project_names()
                    .into_iter()
                    .filter(|name| *name != target.name && import.matches(name))
                    .map(Import::explicit)
                    .collect()
            } else {
                Vec::new()
            };
            let replacement = if expanded.is_empty() {
                vec![import.clone()]
            } else {
                expanded
            };
            for import in replacement {
                if !imports.contains(&import) {
                    imports.push(import);
                }
            }
        }
        Ok(Project { imports, ..target })
    }
}

/// Decides whether a staged model may be committed
pub trait ModelValidator: Send + Sync {
    /// # Errors
    ///
    /// Returns `ValidationFailed` with the findings if the model is rejected.
    #[allow(clippy::result_large_err)]
    fn validate(&self, model: &ModelStore) -> Result<(), ExError>;
}

/// Structural rules only (imports, types, values, references)
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl ModelValidator for StructuralValidator {
    #[allow(clippy::result_large_err)]
    fn validate(&self, model: &ModelStore) -> Result<(), ExError> {
        validation::validate_model(model).map_err(ExError::from)
    }
}

/// Rejects every batch (for tests that verify rollback)
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectingValidator;

impl ModelValidator for RejectingValidator {
    #[allow(clippy::result_large_err)]
    fn validate(&self, _: &ModelStore) -> Result<(), ExError> {
        Err(ExError::new(ExErrorKind::ValidationFailed)
            .with_message("RejectingValidator refuses every batch")
            .with_details(vec!["rejected".to_string()]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn model() -> ModelStore {
        let mut model = ModelStore::new();
        for name in ["Root", "PartA", "PartB", "Other"] {
            model.add_project(Project::new(name)).unwrap();
        }
        model
    }

    #[test]
    fn test_identity_adapter_keeps_project() {
        let model = model();
        let ctx = AdaptContext {
            root: "Root",
            model: &model,
        };
        let project = Project::new("X").with_import(Import::wildcard("Part"));
        let adapted = IdentityAdapter.adapt_target(&ctx, project.clone()).unwrap();
        assert_eq!(adapted, project);
    }

    #[test]
    fn test_explicit_import_adapter_expands_wildcards() {
        let model = model();
        let ctx = AdaptContext {
            root: "Root",
            model: &model,
        };
        let project = Project::new("Root")
            .with_import(Import::wildcard("Part"))
            .with_import(Import::explicit("PartA"))
            .with_import(Import::wildcard("Missing"));
        let adapted = ExplicitImportAdapter.adapt_target(&ctx, project).unwrap();
        assert_eq!(
            adapted.imports,
            vec![
                Import::explicit("PartA"),
                Import::explicit("PartB"),
                Import::wildcard("Missing"),
            ]
        );
    }

    #[test]
    fn test_validators() {
        let model = model();
        assert!(StructuralValidator.validate(&model).is_ok());
        let err = RejectingValidator.validate(&model).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
    }
}
