//! Project folder persistence
//!
//! `<root>/<Project>.yaml` for configured projects and
//! `<root>/<folder>/<Project>.yaml` for generated meshes, applications and
//! templates. A batch is staged completely in memory, then applied file by
//! file; on the first failure every file already touched is put back.

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};

use modelsync_core::config::MapperConfig;
use modelsync_core::errors::{ExError, ExErrorKind};
use modelsync_core::ops::ModelStore;
use modelsync_core::persist::{PersistBatch, ProjectPersister};
use sha2::{Digest, Sha256};

use crate::atomic::{atomic_write, read_if_exists, remove_if_exists};
use crate::errors::{batch_failed, Result};
use crate::format::ProjectFile;

const EXTENSION: &str = "yaml";

/// One file operation of a staged batch
#[derive(Debug)]
enum FileOp {
    Write { path: PathBuf, content: Vec<u8> },
    Remove { path: PathBuf },
}

impl FileOp {
    fn path(&self) -> &Path {
        match self {
            FileOp::Write { path, .. } | FileOp::Remove { path } => path,
        }
    }
}

/// Content of a file before the batch touched it
struct Backup {
    path: PathBuf,
    content: Option<Vec<u8>>,
}

/// Persists projects as YAML files below a root folder
#[derive(Debug, Clone)]
pub struct FsProjectStore {
    root: PathBuf,
    config: MapperConfig,
}

impl FsProjectStore {
    pub fn new(root: impl Into<PathBuf>, config: MapperConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a project is stored in
    pub fn path_for(&self, project: &str) -> PathBuf {
        let folder = self.config.subpath_for(project);
        let file = format!("{}.{}", project, EXTENSION);
        if folder.is_empty() {
            self.root.join(file)
        } else {
            self.root.join(folder).join(file)
        }
    }

    /// Write every project of `model`
    pub fn save_all(&self, model: &ModelStore) -> Result<()> {
        let batch = PersistBatch {
            saved: model.project_names().into_iter().collect(),
            removed: Default::default(),
        };
        self.persist_batch(&batch, model)
    }

    fn persist_batch(&self, batch: &PersistBatch, model: &ModelStore) -> Result<()> {
        let ops = self.stage(batch, model)?;
        if ops.is_empty() {
            tracing::debug!(root = %self.root.display(), "no project file changed");
            return Ok(());
        }

        let mut backups: Vec<Backup> = Vec::with_capacity(ops.len());
        for op in &ops {
            let previous = match read_if_exists(op.path()) {
                Ok(previous) => previous,
                Err(e) => return Err(self.roll_back(backups, e)),
            };
            backups.push(Backup {
                path: op.path().to_path_buf(),
                content: previous,
            });
            let applied = match op {
                FileOp::Write { path, content } => atomic_write(path, content),
                FileOp::Remove { path } => remove_if_exists(path),
            };
            if let Err(e) = applied {
                return Err(self.roll_back(backups, e));
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            files = ops.len(),
            "project files written"
        );
        Ok(())
    }

    /// Render every saved project and drop the writes that change nothing
    fn stage(&self, batch: &PersistBatch, model: &ModelStore) -> Result<Vec<FileOp>> {
        let mut ops = Vec::new();
        for name in &batch.saved {
            let project = model.project(name).map_err(|e| {
                ExError::from(e)
                    .with_op("persist")
                    .with_message(format!("saved project {} is not in the model", name))
            })?;
            let content = ProjectFile::from_project(project, model.types())
                .to_yaml()?
                .into_bytes();
            let path = self.path_for(name);
            if let Some(existing) = read_if_exists(&path)? {
                if digest(&existing) == digest(&content) {
                    continue;
                }
            }
            ops.push(FileOp::Write { path, content });
        }
        for name in &batch.removed {
            let path = self.path_for(name);
            if path.exists() {
                ops.push(FileOp::Remove { path });
            }
        }
        Ok(ops)
    }

    /// Restore touched files in reverse order and report the original cause
    fn roll_back(&self, backups: Vec<Backup>, cause: ExError) -> ExError {
        tracing::warn!(
            root = %self.root.display(),
            files = backups.len(),
            error = %cause,
            "rolling back project files"
        );
        for backup in backups.into_iter().rev() {
            let restored = match &backup.content {
                Some(content) => atomic_write(&backup.path, content),
                None => remove_if_exists(&backup.path),
            };
            if let Err(e) = restored {
                tracing::error!(
                    path = %backup.path.display(),
                    error = %e,
                    "could not restore project file"
                );
            }
        }
        batch_failed(cause)
    }
}

impl ProjectPersister for FsProjectStore {
    fn persist(&self, batch: &PersistBatch, model: &ModelStore) -> std::result::Result<(), ExError> {
        self.persist_batch(batch, model).map_err(|e| {
            if e.kind() == ExErrorKind::Persistence {
                e
            } else {
                ExError::new(ExErrorKind::Persistence)
                    .with_op("persist")
                    .with_message(e.message().to_string())
                    .with_source(e)
            }
        })
    }
}

fn digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
