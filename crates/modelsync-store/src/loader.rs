//! Reading a project folder back into a model

#![allow(clippy::result_large_err)]

use std::fs;
use std::path::{Path, PathBuf};

use modelsync_core::errors::ExError;
use modelsync_core::ops::ModelStore;

use crate::errors::{io_error, Result};
use crate::format::ProjectFile;

/// Load every `*.yaml` project below `root`
///
/// Files are read in path order. All types are registered before any value
/// is parsed, so a project may use types declared by projects loaded after it.
pub fn load_model(root: &Path) -> Result<ModelStore> {
    let mut paths = Vec::new();
    collect_project_files(root, &mut paths)?;
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let text = fs::read_to_string(path).map_err(|e| io_error("load_project", e))?;
        files.push(ProjectFile::from_yaml(&text)?);
    }

    let mut model = ModelStore::new();
    for file in &files {
        file.register_types(model.types_mut())?;
    }
    for file in files {
        let project = file.into_project(model.types())?;
        let name = project.name.clone();
        model.add_project(project).map_err(|e| {
            ExError::from(e)
                .with_op("load_project")
                .with_project(name)
        })?;
    }

    tracing::debug!(
        root = %root.display(),
        projects = paths.len(),
        "project folder loaded"
    );
    Ok(model)
}

fn collect_project_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| io_error("scan_project_dir", e))?;
    for entry in entries {
        let path = entry.map_err(|e| io_error("scan_project_dir", e))?.path();
        if path.is_dir() {
            collect_project_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "yaml") {
            out.push(path);
        }
    }
    Ok(())
}
