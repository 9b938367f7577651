//! Project file format
//!
//! One YAML document per project. Types are stored with the project that
//! declares them, values as expression text:
//!
//! ```yaml
//! name: AllConstants
//! imports: [AllTypes]
//! types:
//!   - kind: enum
//!     name: Region
//!     literals: [EU, US]
//! variables:
//!   - name: timeout
//!     type: Integer
//!     value: "30"
//! ```

#![allow(clippy::result_large_err)]

use modelsync_core::errors::ExError;
use modelsync_core::model::{
    parse_value, CompoundType, EnumType, FieldDecl, Import, Project, TypeDecl, TypeRef,
    TypeRegistry, Variable,
};
use serde::{Deserialize, Serialize};

use crate::errors::{invalid_project_file, yaml_error, Result};

fn is_false(b: &bool) -> bool {
    !*b
}

/// Serialized form of one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableEntry>,
}

/// A compound or enum type declared by the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeEntry {
    Compound {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refines: Option<String>,
        #[serde(default, rename = "abstract", skip_serializing_if = "is_false")]
        is_abstract: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fields: Vec<FieldEntry>,
    },
    Enum {
        name: String,
        literals: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// Value expression; empty when unset
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub template: bool,
}

impl TypeEntry {
    fn from_decl(decl: &TypeDecl) -> Self {
        match decl {
            TypeDecl::Compound(c) => TypeEntry::Compound {
                name: c.name.clone(),
                refines: c.refines.clone(),
                is_abstract: c.is_abstract,
                fields: c
                    .fields
                    .iter()
                    .map(|f| FieldEntry {
                        name: f.name.clone(),
                        ty: f.ty.to_string(),
                    })
                    .collect(),
            },
            TypeDecl::Enum(e) => TypeEntry::Enum {
                name: e.name.clone(),
                literals: e.literals.clone(),
            },
        }
    }

    fn into_decl(self, project: &str) -> Result<TypeDecl> {
        match self {
            TypeEntry::Compound {
                name,
                refines,
                is_abstract,
                fields,
            } => {
                let fields = fields
                    .into_iter()
                    .map(|f| Ok(FieldDecl::new(f.name, parse_type(project, &f.ty)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TypeDecl::Compound(CompoundType {
                    name,
                    project: project.to_string(),
                    refines,
                    is_abstract,
                    fields,
                }))
            }
            TypeEntry::Enum { name, literals } => Ok(TypeDecl::Enum(EnumType {
                name,
                project: project.to_string(),
                literals,
            })),
        }
    }
}

fn parse_type(project: &str, text: &str) -> Result<TypeRef> {
    text.parse::<TypeRef>()
        .map_err(|e| ExError::from(e).with_op("load_project").with_project(project))
}

impl ProjectFile {
    /// Snapshot `project` and the types it declares
    pub fn from_project(project: &Project, types: &TypeRegistry) -> Self {
        Self {
            name: project.name.clone(),
            imports: project.imports.iter().map(|i| i.to_string()).collect(),
            types: types
                .declared_in(&project.name)
                .map(TypeEntry::from_decl)
                .collect(),
            variables: project
                .variables
                .iter()
                .map(|v| VariableEntry {
                    name: v.name.clone(),
                    ty: v.ty.to_string(),
                    value: if v.value.is_unset() {
                        String::new()
                    } else {
                        v.value.to_string()
                    },
                    frozen: v.frozen,
                    template: v.template,
                })
                .collect(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| yaml_error("write_project", e))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| yaml_error("read_project", e))
    }

    /// Add the declared types to `registry`
    ///
    /// Must run for every file before any `into_project`, since values may
    /// use types declared elsewhere.
    pub fn register_types(&self, registry: &mut TypeRegistry) -> Result<()> {
        for entry in &self.types {
            let decl = entry.clone().into_decl(&self.name)?;
            registry.register(decl).map_err(|e| {
                ExError::from(e)
                    .with_op("load_project")
                    .with_project(self.name.clone())
            })?;
        }
        Ok(())
    }

    /// Build the project, parsing values against `types`
    pub fn into_project(self, types: &TypeRegistry) -> Result<Project> {
        let mut project = Project::new(self.name.clone());
        project.imports = self.imports.iter().map(|i| Import::parse(i)).collect();
        for entry in self.variables {
            if project.contains_variable(&entry.name) {
                return Err(invalid_project_file(
                    &self.name,
                    format!("variable {} declared twice", entry.name),
                ));
            }
            let ty = parse_type(&self.name, &entry.ty)?;
            let value = parse_value(&entry.value, &ty, types).map_err(|e| {
                ExError::from(e)
                    .with_op("load_project")
                    .with_project(self.name.clone())
            })?;
            let mut variable = Variable::new(entry.name, self.name.clone(), ty).with_value(value);
            variable.frozen = entry.frozen;
            variable.template = entry.template;
            project.variables.push(variable);
        }
        Ok(project)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use modelsync_core::model::{PrimitiveType, Value};

    fn registry() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types
            .register(EnumType::new("Region", "AllTypes", &["EU", "US"]))
            .unwrap();
        types
            .register(
                CompoundType::new("Endpoint", "AllTypes")
                    .field("host", TypeRef::Primitive(PrimitiveType::String))
                    .field("port", TypeRef::Primitive(PrimitiveType::Integer)),
            )
            .unwrap();
        types
    }

    #[test]
    fn test_unset_values_are_omitted() {
        let mut project = Project::new("P");
        project.variables.push(Variable::new(
            "open",
            "P",
            TypeRef::Primitive(PrimitiveType::Integer),
        ));

        let file = ProjectFile::from_project(&project, &TypeRegistry::new());
        let yaml = file.to_yaml().unwrap();

        assert!(!yaml.contains("value"));
        let back = ProjectFile::from_yaml(&yaml)
            .unwrap()
            .into_project(&TypeRegistry::new())
            .unwrap();
        assert_eq!(back.variables[0].value, Value::Unset);
    }

    #[test]
    fn test_types_are_written_with_their_project() {
        let types = registry();
        let file = ProjectFile::from_project(&Project::new("AllTypes"), &types);
        assert_eq!(file.types.len(), 2);

        let yaml = file.to_yaml().unwrap();
        assert!(yaml.contains("kind: enum"));
        assert!(yaml.contains("kind: compound"));

        let mut loaded = TypeRegistry::new();
        ProjectFile::from_yaml(&yaml)
            .unwrap()
            .register_types(&mut loaded)
            .unwrap();
        assert_eq!(loaded.enum_type("Region").unwrap().literals, ["EU", "US"]);
        assert_eq!(
            loaded.field_type("Endpoint", "port"),
            Some(&TypeRef::Primitive(PrimitiveType::Integer))
        );
    }

    #[test]
    fn test_values_parse_against_loaded_types() {
        let text = r#"
name: AllConstants
imports: [AllTypes, "ServiceMeshPart*"]
variables:
  - name: region
    type: Region
    value: Region::EU
    frozen: true
  - name: api
    type: Endpoint
    value: 'Endpoint{host = "h", port = 80}'
"#;
        let project = ProjectFile::from_yaml(text)
            .unwrap()
            .into_project(&registry())
            .unwrap();

        assert_eq!(project.imports[1], Import::wildcard("ServiceMeshPart"));
        let region = project.variable("region").unwrap();
        assert!(region.frozen);
        assert_eq!(
            region.value,
            Value::Enum {
                ty: "Region".to_string(),
                literal: "EU".to_string()
            }
        );
        let api = project.variable("api").unwrap();
        assert_eq!(api.value.field("port"), Some(&Value::Int(80)));
    }

    #[test]
    fn test_duplicate_variables_are_rejected() {
        let text = "name: P\nvariables:\n  - {name: a, type: Integer}\n  - {name: a, type: Integer}\n";
        let err = ProjectFile::from_yaml(text)
            .unwrap()
            .into_project(&TypeRegistry::new())
            .unwrap_err();
        assert_eq!(err.project(), Some("P"));
    }
}
