//! Template discovery, open slots and instantiation
//!
//! A template is a variable flagged as such, or an application declared in a
//! template project. Its open slots are the compound fields left unset.

use std::collections::BTreeMap;

use crate::config::MapperConfig;
use crate::errors::{ModelError, Result};
use crate::model::{parse_value, Import, Project, TypeRef, TypeRegistry, Value, Variable};
use crate::naming::{is_identifier, to_identifier_first_upper};
use crate::ops::ModelStore;

/// Result of one template instantiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instantiated {
    /// Qualified name of the new variable
    pub variable: String,
    /// Project created to hold it, if any
    pub created_project: Option<String>,
}

fn is_application(ty: &TypeRef, types: &TypeRegistry, config: &MapperConfig) -> bool {
    matches!(ty, TypeRef::Named(n) if types.is_subtype(n, &config.meta.application))
}

pub fn is_template(var: &Variable, types: &TypeRegistry, config: &MapperConfig) -> bool {
    var.template
        || (config.template_projects.matches(&var.project) && is_application(&var.ty, types, config))
}

/// Simple names of all templates, in project order
pub fn list_templates(model: &ModelStore, config: &MapperConfig) -> Vec<String> {
    model
        .variables()
        .filter(|v| is_template(v, model.types(), config))
        .map(|v| v.name.clone())
        .collect()
}

fn collect_open(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::Unset => out.push(path.to_string()),
        Value::Compound { fields, .. } => {
            for (field, nested) in fields {
                collect_open(nested, &format!("{}.{}", path, field), out);
            }
        }
        _ => {}
    }
}

/// Dotted paths of the unset fields of `name`, prefixed with its simple name
///
/// # Errors
///
/// Returns `TemplateNotFound` if no variable is called `name`.
pub fn open_slots(model: &ModelStore, name: &str) -> Result<Vec<String>> {
    let var = model
        .find_variable(name)
        .ok_or_else(|| ModelError::TemplateNotFound {
            name: name.to_string(),
        })?;
    let mut slots = Vec::new();
    collect_open(&var.value, &var.name, &mut slots);
    Ok(slots)
}

/// Clone template `template` into a new variable `new_name`
///
/// Adjustment keys are dotted slot paths, starting with either the template
/// or the new name. Slots without adjustment stay unset. Application
/// templates go to a fresh application project, all others to the pool of
/// their type.
///
/// # Errors
///
/// Returns `TemplateNotFound` if `template` is not a template,
/// `InvalidAdjustment` for a path that is not an open slot, `NameCollision` if
/// the new name is taken in the target project, `InvalidInput` for a new name
/// that is not an identifier and `InvalidExpression` for unparsable values.
pub fn instantiate(
    model: &mut ModelStore,
    config: &MapperConfig,
    template: &str,
    new_name: &str,
    adjustments: &BTreeMap<String, String>,
) -> Result<Instantiated> {
    let tpl = model
        .find_variable(template)
        .filter(|v| is_template(v, model.types(), config))
        .cloned()
        .ok_or_else(|| ModelError::TemplateNotFound {
            name: template.to_string(),
        })?;
    if !is_identifier(new_name) {
        return Err(ModelError::InvalidInput {
            reason: format!("{} is not a valid variable name", new_name),
        });
    }
    let slots = open_slots(model, &tpl.qualified_name())?;

    let mut value = tpl.value.clone();
    for (path, expr) in adjustments {
        let rest = path
            .strip_prefix(&format!("{}.", tpl.name))
            .or_else(|| path.strip_prefix(&format!("{}.", new_name)))
            .ok_or_else(|| ModelError::InvalidAdjustment { path: path.clone() })?;
        if !slots.contains(&format!("{}.{}", tpl.name, rest)) {
            return Err(ModelError::InvalidAdjustment { path: path.clone() });
        }
        let segments: Vec<&str> = rest.split('.').collect();
        let ty = model
            .types()
            .type_at_path(&tpl.ty, &segments)
            .ok_or_else(|| ModelError::InvalidAdjustment { path: path.clone() })?;
        let parsed = parse_value(expr, &ty, model.types())?;
        value.set_path(&segments, parsed)?;
    }

    let mut created_project = None;
    let project = if is_application(&tpl.ty, model.types(), config) {
        let name = config
            .app_projects
            .project_name(&to_identifier_first_upper(new_name));
        if !model.has_project(&name) {
            let mut project = Project::new(name.clone());
            let inherited = model.project(&tpl.project)?.imports.clone();
            for import in inherited
                .into_iter()
                .chain(config.app_imports.iter().map(|i| Import::parse(i.as_str())))
            {
                if import.wildcard || (model.has_project(&import.target) && import.target != name) {
                    project.add_import(import);
                }
            }
            project.add_import(Import::wildcard(config.mesh_projects.prefix.clone()));
            model.add_project(project)?;
            created_project = Some(name.clone());
        }
        name
    } else {
        let base = tpl.ty.base_name().unwrap_or_default();
        config.pool_project_for(base, model.types(), |p| model.has_project(p))
    };

    let var = Variable {
        name: new_name.to_string(),
        project,
        ty: tpl.ty,
        value,
        frozen: false,
        template: false,
    };
    let qualified = var.qualified_name();
    model.insert_variable(var)?;
    Ok(Instantiated {
        variable: qualified,
        created_project,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::meta::mesh_meta_model;

    fn model() -> ModelStore {
        let mut model = ModelStore::new();
        for decl in mesh_meta_model("Meta") {
            model.types_mut().register(decl).unwrap();
        }
        for name in ["Meta", "AllServices", "AllTypes", "AllConstants"] {
            model.add_project(Project::new(name)).unwrap();
        }
        model
            .add_project(Project::new("TemplatePartBasic").with_import(Import::explicit("AllServices")))
            .unwrap();
        let app = Value::compound("Application", [("id", Value::str("tpl"))])
            .coerce(&TypeRef::named("Application"), model.types())
            .unwrap();
        model
            .insert_variable(Variable::new("tplApp", "TemplatePartBasic", TypeRef::named("Application")).with_value(app))
            .unwrap();
        model
    }

    #[test]
    fn test_list_and_open_slots() {
        let model = model();
        let config = MapperConfig::default();
        assert_eq!(list_templates(&model, &config), vec!["tplApp"]);
        let slots = open_slots(&model, "tplApp").unwrap();
        assert!(slots.contains(&"tplApp.name".to_string()));
        assert!(!slots.contains(&"tplApp.id".to_string()));
        assert!(open_slots(&model, "missing").is_err());
    }

    #[test]
    fn test_instantiate_application_template() {
        let mut model = model();
        let config = MapperConfig::default();
        let adjustments = BTreeMap::from([("tplApp.name".to_string(), "\"My App\"".to_string())]);
        let result = instantiate(&mut model, &config, "tplApp", "myApp", &adjustments).unwrap();
        assert_eq!(result.variable, "ApplicationPartMyApp::myApp");
        assert_eq!(result.created_project.as_deref(), Some("ApplicationPartMyApp"));
        assert_eq!(model.get_value("myApp.name"), Some(&Value::str("My App")));
        let remaining = open_slots(&model, "ApplicationPartMyApp::myApp").unwrap();
        assert!(!remaining.iter().any(|s| s == "myApp.name"));
        assert!(remaining.iter().any(|s| s == "myApp.description"));
        let project = model.project("ApplicationPartMyApp").unwrap();
        assert!(project.has_import(&Import::explicit("AllServices")));
        assert!(project.has_import(&Import::wildcard("ServiceMeshPart")));
    }

    #[test]
    fn test_adjustment_must_address_open_slot() {
        let mut model = model();
        let config = MapperConfig::default();
        let adjustments = BTreeMap::from([("tplApp.id".to_string(), "\"x\"".to_string())]);
        let err = instantiate(&mut model, &config, "tplApp", "myApp", &adjustments).unwrap_err();
        assert!(matches!(err, ModelError::InvalidAdjustment { .. }));
        assert!(model.find_variable("myApp").is_none());
    }

    #[test]
    fn test_flagged_template_goes_to_pool() {
        let mut model = model();
        let config = MapperConfig::default();
        model
            .insert_variable(
                Variable::new("tplServer", "AllServices", TypeRef::named("Server")).as_template(),
            )
            .unwrap();
        let adjustments = BTreeMap::from([("srv.host".to_string(), "\"h\"".to_string())]);
        let err = instantiate(&mut model, &config, "tplServer", "srv", &adjustments).unwrap_err();
        // an unset template value has no field slots
        assert!(matches!(err, ModelError::InvalidAdjustment { .. }));
        let result = instantiate(&mut model, &config, "tplServer", "srv", &BTreeMap::new()).unwrap();
        assert_eq!(result.variable, "AllServices::srv");
        assert_eq!(result.created_project, None);
    }
}
