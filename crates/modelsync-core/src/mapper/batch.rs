use crate::errors::Result;
use crate::model::{Import, Project};
use crate::ops::ModelStore;
use crate::persist::PersistBatch;
use crate::tracker::{ChangeTracker, ChangeType};

/// Work in progress of one mapper operation
///
/// Holds a private copy of the model; nothing is visible to readers of the
/// mapper until the batch commits.
#[derive(Debug, Clone)]
pub(crate) struct Batch {
    pub model: ModelStore,
    pub changes: ChangeTracker,
    /// `(old, new)` qualified names renamed in this batch
    pub renames: Vec<(String, String)>,
}

impl Batch {
    pub fn new(model: ModelStore) -> Self {
        Self {
            model,
            changes: ChangeTracker::new(),
            renames: Vec::new(),
        }
    }

    pub fn record(&mut self, variable: &str, change: ChangeType) {
        self.changes.record(variable, change);
    }

    /// Remove a project and the explicit imports other projects hold on it
    pub fn drop_project(&mut self, name: &str) -> Result<Project> {
        let removed = self.model.remove_project(name)?;
        let dangling = Import::explicit(name);
        for other in self.model.project_names() {
            self.model.project_mut(&other)?.remove_import(&dangling);
        }
        Ok(removed)
    }
}

/// Projects that differ between the live model and a staged one
pub(crate) fn touched_projects(before: &ModelStore, after: &ModelStore) -> PersistBatch {
    let saved = after
        .projects()
        .filter(|p| before.project(&p.name).map_or(true, |old| old != *p))
        .map(|p| p.name.clone())
        .collect();
    let removed = before
        .project_names()
        .into_iter()
        .filter(|name| !after.has_project(name))
        .collect();
    PersistBatch { saved, removed }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{PrimitiveType, TypeRef, Value, Variable};

    fn model() -> ModelStore {
        let mut model = ModelStore::new();
        model
            .add_project(Project::new("Root").with_import(Import::explicit("Lib")))
            .unwrap();
        model.add_project(Project::new("Lib")).unwrap();
        model.add_project(Project::new("Other")).unwrap();
        model
    }

    #[test]
    fn test_touched_projects_detects_saves_and_removals() {
        let before = model();
        let mut batch = Batch::new(before.clone());
        batch
            .model
            .insert_variable(
                Variable::new("x", "Other", TypeRef::Primitive(PrimitiveType::Integer))
                    .with_value(Value::Int(1)),
            )
            .unwrap();
        batch.drop_project("Lib").unwrap();

        let touched = touched_projects(&before, &batch.model);
        // Root lost its import of Lib
        assert_eq!(
            touched.saved.into_iter().collect::<Vec<_>>(),
            vec!["Other", "Root"]
        );
        assert_eq!(touched.removed.into_iter().collect::<Vec<_>>(), vec!["Lib"]);
    }

    #[test]
    fn test_unchanged_batch_touches_nothing() {
        let before = model();
        let batch = Batch::new(before.clone());
        assert!(touched_projects(&before, &batch.model).is_empty());
    }
}
