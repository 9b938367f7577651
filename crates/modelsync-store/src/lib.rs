//! ModelSync Store - file-system persistence of decision-model projects
//!
//! Provides:
//! - One YAML file per project, generated projects in their sub-folders
//! - Atomic temp-then-rename writes
//! - Batch persistence with backup/restore rollback
//! - Loading a project folder back into a `ModelStore`

pub mod atomic;
pub mod errors;
pub mod format;
pub mod fs_store;
pub mod loader;

pub use errors::Result;
pub use format::{ProjectFile, TypeEntry, VariableEntry};
pub use fs_store::FsProjectStore;
pub use loader::load_model;
