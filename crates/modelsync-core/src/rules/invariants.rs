use crate::model::{PrimitiveType, TypeRef, TypeRegistry, Value, Variable};
use crate::ops::ModelStore;

/// Explicit imports naming a missing project, as `(project, import)`
pub fn find_unresolved_imports(store: &ModelStore) -> Vec<(String, String)> {
    store
        .projects()
        .flat_map(|p| {
            p.imports
                .iter()
                .filter(|i| !i.wildcard && !store.has_project(&i.target))
                .map(|i| (p.name.clone(), i.target.clone()))
        })
        .collect()
}

/// Projects that can see themselves through their imports
pub fn find_import_cycles(store: &ModelStore) -> Vec<String> {
    store
        .projects()
        .filter(|p| {
            store
                .resolve_imports(&p.name)
                .iter()
                .any(|import| store.visible_projects(import).contains(&p.name))
        })
        .map(|p| p.name.clone())
        .collect()
}

/// Variables whose declared type names an unregistered type
pub fn find_unknown_types(store: &ModelStore) -> Vec<(String, String)> {
    store
        .variables()
        .filter_map(|v| {
            store
                .types()
                .resolve(&v.ty)
                .err()
                .map(|e| (v.qualified_name(), e.to_string()))
        })
        .collect()
}

/// Reference found while checking a value, with the type it must satisfy
pub struct ExpectedRef<'a> {
    pub target: &'a str,
    pub ty: &'a TypeRef,
}

/// Check `value` against `ty`, collecting mismatches and typed references
pub fn check_value<'a>(
    value: &'a Value,
    ty: &'a TypeRef,
    types: &'a TypeRegistry,
    path: &str,
    refs: &mut Vec<ExpectedRef<'a>>,
    errors: &mut Vec<String>,
) {
    let mismatch =
        |errors: &mut Vec<String>, what: &str| errors.push(format!("{}: {} is not a {}", path, what, ty));
    match (ty, value) {
        (_, Value::Unset) => {}
        (TypeRef::Primitive(PrimitiveType::Boolean), Value::Bool(_))
        | (TypeRef::Primitive(PrimitiveType::Integer), Value::Int(_))
        | (TypeRef::Primitive(PrimitiveType::Real), Value::Real(_) | Value::Int(_))
        | (TypeRef::Primitive(PrimitiveType::String), Value::Str(_)) => {}
        (TypeRef::RefTo(_) | TypeRef::Named(_), Value::Null) => {}
        (TypeRef::RefTo(elem), Value::Ref(target)) => refs.push(ExpectedRef { target, ty: elem }),
        (TypeRef::SetOf(elem) | TypeRef::SequenceOf(elem), Value::Container(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_value(item, elem, types, &format!("{}[{}]", path, i), refs, errors);
            }
        }
        (TypeRef::Named(name), Value::Enum { ty: enum_ty, literal }) => {
            let known = types
                .enum_type(name)
                .is_some_and(|e| e.name == *enum_ty && e.literals.contains(literal));
            if !known {
                mismatch(errors, &format!("{}::{}", enum_ty, literal));
            }
        }
        (TypeRef::Named(name), Value::Compound { ty: actual, fields }) => {
            let actual = actual.as_deref().unwrap_or(name);
            match types.compound(actual) {
                None => mismatch(errors, actual),
                Some(_) if !types.is_subtype(actual, name) => mismatch(errors, actual),
                Some(c) if c.is_abstract => {
                    errors.push(format!("{}: abstract type {} cannot be instantiated", path, actual))
                }
                Some(_) => {
                    let declared = types.all_fields(actual);
                    for (field, field_value) in fields {
                        match declared.iter().find(|d| d.name == *field) {
                            Some(decl) => check_value(
                                field_value,
                                &decl.ty,
                                types,
                                &format!("{}.{}", path, field),
                                refs,
                                errors,
                            ),
                            None => errors.push(format!("{}: {} has no field {}", path, actual, field)),
                        }
                    }
                }
            }
        }
        (_, other) => mismatch(errors, &other.to_string()),
    }
}

/// Type mismatches in variable values
pub fn find_type_mismatches(store: &ModelStore) -> Vec<String> {
    let mut errors = Vec::new();
    for var in store.variables() {
        let mut refs = Vec::new();
        check_value(&var.value, &var.ty, store.types(), &var.qualified_name(), &mut refs, &mut errors);
    }
    errors
}

fn reference_findings(store: &ModelStore, var: &Variable, findings: &mut Vec<String>) {
    let mut refs = Vec::new();
    let mut ignored = Vec::new();
    check_value(&var.value, &var.ty, store.types(), &var.qualified_name(), &mut refs, &mut ignored);
    for expected in refs {
        match store.resolve_reference(&var.project, expected.target) {
            Some(target) => {
                let target_ty = &target.ty;
                if !store.types().is_assignable(target_ty, expected.ty) {
                    findings.push(format!(
                        "{} references {} of type {}, expected {}",
                        var.qualified_name(),
                        target.qualified_name(),
                        target_ty,
                        expected.ty
                    ));
                }
            }
            None if store.find_variable(expected.target).is_some() => findings.push(format!(
                "{} references {} which is not visible from project {}",
                var.qualified_name(),
                expected.target,
                var.project
            )),
            None => findings.push(format!(
                "{} references unknown variable {}",
                var.qualified_name(),
                expected.target
            )),
        }
    }
}

/// References that do not resolve, are invisible, or have the wrong type
pub fn find_reference_problems(store: &ModelStore) -> Vec<String> {
    let mut findings = Vec::new();
    for var in store.variables() {
        reference_findings(store, var, &mut findings);
    }
    findings
}
