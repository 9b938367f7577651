use std::collections::BTreeSet;

use crate::errors::{ModelError, Result};
use crate::model::{qualify, split_qualified, RefAction, Value, Variable};
use crate::ops::store::{split_value_path, ModelStore};

/// Assign a value to a whole variable or to a nested field path
///
/// # Errors
///
/// Returns `VariableNotFound` for unknown variables, `FrozenVariable` if the
/// variable is frozen, and `InvalidInput` for paths crossing scalar values.
pub fn assign_value(store: &mut ModelStore, path: &str, value: Value) -> Result<String> {
    let (var_name, fields) = split_value_path(path);
    let var = store.variable_mut(var_name)?;
    if var.frozen {
        return Err(ModelError::FrozenVariable {
            name: var.qualified_name(),
        });
    }
    var.value.set_path(&fields, value)?;
    Ok(var.qualified_name())
}

/// References held by other variables that resolve to `target`
///
/// Returns `(referrer qualified name, reference texts)` pairs.
fn referrers_of(store: &ModelStore, target: &str) -> Vec<(String, BTreeSet<String>)> {
    store
        .variables()
        .filter(|v| v.qualified_name() != target)
        .filter_map(|v| {
            let refs: BTreeSet<String> = v
                .value
                .references()
                .into_iter()
                .filter(|r| {
                    store
                        .resolve_reference(&v.project, r)
                        .is_some_and(|t| t.qualified_name() == target)
                })
                .map(str::to_string)
                .collect();
            (!refs.is_empty()).then(|| (v.qualified_name(), refs))
        })
        .collect()
}

fn rewrite_referrers(
    store: &mut ModelStore,
    target: &str,
    mut action: impl FnMut(&str) -> RefAction,
) -> Vec<String> {
    let mut modified = Vec::new();
    for (referrer, refs) in referrers_of(store, target) {
        if let Some(var) = store.find_variable_mut(&referrer) {
            let changed = var.value.rewrite_refs(&mut |r: &str| {
                if refs.contains(r) {
                    action(r)
                } else {
                    RefAction::Keep
                }
            });
            if changed {
                modified.push(referrer);
            }
        }
    }
    modified
}

/// Remove a variable and every reference to it
///
/// References are dropped from containers and nulled elsewhere. Returns the
/// removed variable and the qualified names of variables whose values changed.
///
/// # Errors
///
/// Returns `VariableNotFound` if the name does not resolve.
pub fn delete_variable(store: &mut ModelStore, name: &str) -> Result<(Variable, Vec<String>)> {
    let qualified = store.variable(name)?.qualified_name();
    let modified = rewrite_referrers(store, &qualified, |_| RefAction::Remove);
    let removed = store.remove_variable(&qualified)?;
    Ok((removed, modified))
}

/// Rename a variable inside its project and rewrite references to it
///
/// Returns `(old qualified name, new qualified name)`.
///
/// # Errors
///
/// Returns `VariableNotFound` if `old_name` does not resolve and
/// `NameCollision` if `new_name` is taken in the owning project.
pub fn rename_variable(
    store: &mut ModelStore,
    old_name: &str,
    new_name: &str,
) -> Result<(String, String)> {
    let var = store.variable(old_name)?;
    let project = var.project.clone();
    let old_qualified = var.qualified_name();
    if store.project(&project)?.contains_variable(new_name) {
        return Err(ModelError::NameCollision {
            name: new_name.to_string(),
            project,
        });
    }
    let new_qualified = qualify(&project, new_name);
    rewrite_referrers(store, &old_qualified, |r| match split_qualified(r) {
        (Some(_), _) => RefAction::Replace(new_qualified.clone()),
        (None, _) => RefAction::Replace(new_name.to_string()),
    });
    store.variable_mut(&old_qualified)?.name = new_name.to_string();
    Ok((old_qualified, new_qualified))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Import, PrimitiveType, Project, TypeRef};

    fn store() -> ModelStore {
        let mut store = ModelStore::new();
        store
            .add_project(Project::new("Root").with_import(Import::explicit("Lib")))
            .unwrap();
        store.add_project(Project::new("Lib")).unwrap();
        let int = TypeRef::Primitive(PrimitiveType::Integer);
        let refs = TypeRef::set_of(TypeRef::ref_to(int.clone()));
        store
            .insert_variable(Variable::new("a", "Lib", int.clone()).with_value(Value::Int(1)))
            .unwrap();
        store
            .insert_variable(Variable::new("b", "Lib", int.clone()).with_value(Value::Int(2)).frozen())
            .unwrap();
        store
            .insert_variable(Variable::new("all", "Root", refs).with_value(Value::Container(vec![
                Value::reference("a"),
                Value::reference("Lib::b"),
            ])))
            .unwrap();
        store
            .insert_variable(
                Variable::new("one", "Root", TypeRef::ref_to(int)).with_value(Value::reference("Lib::a")),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_assign_value_respects_frozen() {
        let mut store = store();
        assert_eq!(assign_value(&mut store, "a", Value::Int(5)).unwrap(), "Lib::a");
        let err = assign_value(&mut store, "b", Value::Int(5)).unwrap_err();
        assert!(matches!(err, ModelError::FrozenVariable { .. }));
        assert_eq!(store.variable("b").unwrap().value, Value::Int(2));
    }

    #[test]
    fn test_delete_detaches_references() {
        let mut store = store();
        let (removed, modified) = delete_variable(&mut store, "a").unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(modified, vec!["Root::all".to_string(), "Root::one".to_string()]);
        assert_eq!(
            store.variable("all").unwrap().value,
            Value::Container(vec![Value::reference("Lib::b")])
        );
        assert_eq!(store.variable("one").unwrap().value, Value::Null);
    }

    #[test]
    fn test_rename_rewrites_references_keeping_style() {
        let mut store = store();
        let (old, new) = rename_variable(&mut store, "a", "alpha").unwrap();
        assert_eq!((old.as_str(), new.as_str()), ("Lib::a", "Lib::alpha"));
        assert_eq!(
            store.variable("all").unwrap().value,
            Value::Container(vec![Value::reference("alpha"), Value::reference("Lib::b")])
        );
        assert_eq!(store.variable("one").unwrap().value, Value::reference("Lib::alpha"));
    }

    #[test]
    fn test_rename_collision() {
        let mut store = store();
        let err = rename_variable(&mut store, "a", "b").unwrap_err();
        assert!(matches!(err, ModelError::NameCollision { .. }));
    }
}
