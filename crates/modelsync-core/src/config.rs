//! Mapper configuration
//!
//! Every field has a default, so an empty TOML document yields the standard
//! platform layout:
//!
//! ```toml
//! root_project = "PlatformConfiguration"
//! constants_project = "AllConstants"
//! modifiable_projects = ["AllTypes", "AllConstants", "AllServices", "TechnicalSetup"]
//! delete_empty_applications = false
//!
//! [pool_projects]
//! ServiceBase = "AllServices"
//! DataType = "AllTypes"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ExError, ExErrorKind};
use crate::model::TypeRegistry;

/// Prefix and sub-folder of one kind of generated project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedKind {
    pub prefix: String,
    pub folder: String,
}

impl GeneratedKind {
    fn new(prefix: &str, folder: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            folder: folder.to_string(),
        }
    }

    pub fn matches(&self, project: &str) -> bool {
        project.len() > self.prefix.len() && project.starts_with(&self.prefix)
    }

    /// Project name for a generated part, e.g. `ServiceMeshPart` + `MyMesh`
    pub fn project_name(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    /// Wildcard import covering every project of this kind
    pub fn wildcard(&self) -> String {
        format!("{}*", self.prefix)
    }
}

/// Meta-model type names the mapper creates values of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaTypeNames {
    pub application: String,
    pub mesh: String,
    pub source: String,
    pub processor: String,
    pub sink: String,
    pub connector: String,
    pub service_base: String,
    /// Application field listing its meshes
    pub services_field: String,
}

impl Default for MetaTypeNames {
    fn default() -> Self {
        Self {
            application: "Application".to_string(),
            mesh: "ServiceMesh".to_string(),
            source: "MeshSource".to_string(),
            processor: "MeshProcessor".to_string(),
            sink: "MeshSink".to_string(),
            connector: "MeshConnector".to_string(),
            service_base: "ServiceBase".to_string(),
            services_field: "services".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub root_project: String,
    /// Top-most type name to the project new variables of that type go to
    pub pool_projects: BTreeMap<String, String>,
    /// Pool for types without a mapping
    pub constants_project: String,
    pub modifiable_projects: Vec<String>,
    pub mesh_projects: GeneratedKind,
    pub app_projects: GeneratedKind,
    pub template_projects: GeneratedKind,
    /// Imports of a newly generated mesh project
    pub mesh_imports: Vec<String>,
    /// Imports of a newly generated application project, besides the mesh wildcard
    pub app_imports: Vec<String>,
    pub meta: MetaTypeNames,
    /// Delete an application once its last mesh is removed
    pub delete_empty_applications: bool,
    pub artifacts_uri_prefix: String,
}

impl Default for MapperConfig {
    fn default() -> Self {
        let pool_projects = [
            ("ServiceBase", "AllServices"),
            ("Server", "AllServices"),
            ("Manufacturer", "AllServices"),
            ("Dependency", "AllServices"),
            ("DataType", "AllTypes"),
        ]
        .into_iter()
        .map(|(t, p)| (t.to_string(), p.to_string()))
        .collect();
        Self {
            root_project: "PlatformConfiguration".to_string(),
            pool_projects,
            constants_project: "AllConstants".to_string(),
            modifiable_projects: ["AllTypes", "AllConstants", "AllServices", "TechnicalSetup"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            mesh_projects: GeneratedKind::new("ServiceMeshPart", "meshes"),
            app_projects: GeneratedKind::new("ApplicationPart", "apps"),
            template_projects: GeneratedKind::new("TemplatePart", "templates"),
            mesh_imports: vec!["AllServices".to_string(), "AllTypes".to_string()],
            app_imports: vec!["AllServices".to_string(), "AllTypes".to_string()],
            meta: MetaTypeNames::default(),
            delete_empty_applications: false,
            artifacts_uri_prefix: String::new(),
        }
    }
}

impl MapperConfig {
    /// # Errors
    ///
    /// Returns `Serialization` if the document is not valid configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, ExError> {
        toml::from_str(text).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("config_load")
                .with_message(e.to_string())
        })
    }

    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `Serialization` if it is
    /// not valid configuration.
    pub fn load(path: &Path) -> Result<Self, ExError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("config_load")
                .with_message(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    fn generated_kinds(&self) -> [&GeneratedKind; 3] {
        [&self.mesh_projects, &self.app_projects, &self.template_projects]
    }

    pub fn is_generated(&self, project: &str) -> bool {
        self.generated_kinds().iter().any(|k| k.matches(project))
    }

    /// Sub-folder a project file lives in; empty for top-level projects
    pub fn subpath_for(&self, project: &str) -> &str {
        self.generated_kinds()
            .into_iter()
            .find(|k| k.matches(project))
            .map(|k| k.folder.as_str())
            .unwrap_or_default()
    }

    /// May the shell add or remove variables in `project`?
    pub fn is_modifiable(&self, project: &str) -> bool {
        project == self.root_project
            || self.is_generated(project)
            || self.modifiable_projects.iter().any(|p| p == project)
    }

    /// Pool project for new variables of `type_name`
    ///
    /// The type's refinement chain is searched from the type itself upwards;
    /// unmapped types go to the constants project when it exists in
    /// `projects`, otherwise to the root.
    pub fn pool_project_for(
        &self,
        type_name: &str,
        types: &TypeRegistry,
        has_project: impl Fn(&str) -> bool,
    ) -> String {
        let mapped = types
            .ancestors(type_name)
            .into_iter()
            .find_map(|t| self.pool_projects.get(t));
        match mapped {
            Some(project) if has_project(project) => project.clone(),
            _ if has_project(&self.constants_project) => self.constants_project.clone(),
            _ => self.root_project.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::CompoundType;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = MapperConfig::from_toml_str("").unwrap();
        assert_eq!(config, MapperConfig::default());
        assert_eq!(config.root_project, "PlatformConfiguration");
        assert!(!config.delete_empty_applications);
    }

    #[test]
    fn test_partial_override() {
        let config = MapperConfig::from_toml_str(
            r#"
            root_project = "Root"
            delete_empty_applications = true

            [meta]
            services_field = "meshes"
            "#,
        )
        .unwrap();
        assert_eq!(config.root_project, "Root");
        assert!(config.delete_empty_applications);
        assert_eq!(config.meta.services_field, "meshes");
        assert_eq!(config.meta.application, "Application");
    }

    #[test]
    fn test_invalid_document() {
        let err = MapperConfig::from_toml_str("root_project = [").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Serialization);
    }

    #[test]
    fn test_subpaths_and_modifiable() {
        let config = MapperConfig::default();
        assert_eq!(config.subpath_for("ServiceMeshPartMyMesh"), "meshes");
        assert_eq!(config.subpath_for("ApplicationPartMyApp"), "apps");
        assert_eq!(config.subpath_for("AllServices"), "");
        assert_eq!(config.subpath_for("ServiceMeshPart"), "");
        assert!(config.is_modifiable("AllServices"));
        assert!(config.is_modifiable("ApplicationPartX"));
        assert!(config.is_modifiable("PlatformConfiguration"));
        assert!(!config.is_modifiable("MetaConcepts"));
    }

    #[test]
    fn test_pool_project_follows_refinement() {
        let mut types = TypeRegistry::new();
        types.register(CompoundType::new("ServiceBase", "Meta")).unwrap();
        types
            .register(CompoundType::new("JavaService", "Meta").refining("ServiceBase"))
            .unwrap();
        types.register(CompoundType::new("Other", "Meta")).unwrap();
        let config = MapperConfig::default();
        let all = |_: &str| true;
        assert_eq!(config.pool_project_for("JavaService", &types, all), "AllServices");
        assert_eq!(config.pool_project_for("Other", &types, all), "AllConstants");
        assert_eq!(
            config.pool_project_for("Other", &types, |p| p != "AllConstants"),
            "PlatformConfiguration"
        );
    }
}
