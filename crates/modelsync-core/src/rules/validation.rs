use crate::errors::{ModelError, Result};
use crate::ops::ModelStore;

use super::invariants;

/// All structural findings for the model, in rule order
///
/// 1. Explicit imports resolve to existing projects
/// 2. No project can see itself through its imports
/// 3. Declared types are registered
/// 4. Values conform to their declared types
/// 5. References resolve, are visible from the referencing project and
///    point at variables of a compatible type
pub fn findings(store: &ModelStore) -> Vec<String> {
    let mut findings: Vec<String> = invariants::find_unresolved_imports(store)
        .into_iter()
        .map(|(project, import)| format!("project {} imports unknown project {}", project, import))
        .collect();
    findings.extend(
        invariants::find_import_cycles(store)
            .into_iter()
            .map(|project| format!("project {} is part of an import cycle", project)),
    );
    findings.extend(
        invariants::find_unknown_types(store)
            .into_iter()
            .map(|(var, reason)| format!("{}: {}", var, reason)),
    );
    findings.extend(invariants::find_type_mismatches(store));
    findings.extend(invariants::find_reference_problems(store));
    findings
}

/// Validate the whole decision model
///
/// # Errors
///
/// Returns `ValidationFailed` carrying every finding.
pub fn validate_model(store: &ModelStore) -> Result<()> {
    let messages = findings(store);
    if messages.is_empty() {
        Ok(())
    } else {
        Err(ModelError::ValidationFailed { messages })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{
        CompoundType, Import, PrimitiveType, Project, TypeRef, Value, Variable,
    };

    fn base() -> ModelStore {
        let mut store = ModelStore::new();
        store
            .types_mut()
            .register(
                CompoundType::new("Rec", "Lib")
                    .field("n", TypeRef::Primitive(PrimitiveType::Integer))
                    .field("other", TypeRef::ref_to(TypeRef::named("Rec"))),
            )
            .unwrap();
        store
            .add_project(Project::new("Root").with_import(Import::explicit("Lib")))
            .unwrap();
        store.add_project(Project::new("Lib")).unwrap();
        store
            .insert_variable(
                Variable::new("r", "Lib", TypeRef::named("Rec"))
                    .with_value(Value::compound("Rec", [("n", Value::Int(1))])),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_valid_model_passes() {
        validate_model(&base()).unwrap();
    }

    #[test]
    fn test_unresolved_import_reported() {
        let mut store = base();
        store.project_mut("Lib").unwrap().imports.push(Import::explicit("Gone"));
        let err = validate_model(&store).unwrap_err();
        let ModelError::ValidationFailed { messages } = err else {
            panic!("expected ValidationFailed");
        };
        assert!(messages[0].contains("Gone"));
    }

    #[test]
    fn test_cycle_reported() {
        let mut store = base();
        store.project_mut("Lib").unwrap().imports.push(Import::explicit("Root"));
        let found = findings(&store);
        assert!(found.iter().any(|m| m.contains("import cycle")));
    }

    #[test]
    fn test_type_mismatch_reported() {
        let mut store = base();
        store.variable_mut("r").unwrap().value = Value::compound("Rec", [("n", Value::str("x"))]);
        let found = findings(&store);
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("Lib::r.n"));
    }

    #[test]
    fn test_invisible_reference_reported() {
        let mut store = base();
        store
            .insert_variable(
                Variable::new("q", "Root", TypeRef::named("Rec")).with_value(Value::compound(
                    "Rec",
                    [("other", Value::reference("r"))],
                )),
            )
            .unwrap();
        assert!(findings(&store).is_empty());

        store
            .variable_mut("Lib::r")
            .unwrap()
            .value = Value::compound("Rec", [("other", Value::reference("q"))]);
        let found = findings(&store);
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("not visible"));
    }

    #[test]
    fn test_unknown_reference_reported() {
        let mut store = base();
        store.variable_mut("r").unwrap().value =
            Value::compound("Rec", [("other", Value::reference("ghost"))]);
        assert!(findings(&store)[0].contains("unknown variable ghost"));
    }
}
