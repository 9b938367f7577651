//! Modelsync Core - model-to-shell synchronization engine
//!
//! This crate keeps a typed decision model and the views remote shells hold
//! of it in step:
//! - Decision model: projects with imports, typed variables and values
//! - Mapper operations that stage, validate, persist and publish each change
//!   as one batch
//! - Session change tracking with CREATED/MODIFIED/DELETED merge rules
//! - Graph codecs (node/edge JSON, Drawflow) and mesh/application
//!   synchronization
//! - Template instantiation, import management and name generation
//! - Shell tree projection and the JSON invocation boundary

pub mod apply;
pub mod commands;
pub mod config;
pub mod errors;
pub mod graph;
pub mod imports;
pub mod instantiation;
pub mod logging_facility;
pub mod mapper;
pub mod model;
pub mod naming;
pub mod ops;
pub mod persist;
pub mod policy;
pub mod rules;
pub mod shell;
pub mod templates;
pub mod tracker;

pub use modelsync_core_types::schema;

// Re-export commonly used types
pub use apply::{apply, invoke};
pub use commands::Command;
pub use config::MapperConfig;
pub use errors::{ExError, ExErrorKind, ModelError, Result};
pub use mapper::{ChangeListener, ChangeOutcome, ModelMapper, RecordingListener};
pub use model::{Import, Project, TypeRef, Value, Variable};
pub use ops::ModelStore;
pub use persist::{MemoryPersister, NoopPersister, PersistBatch, ProjectPersister};
pub use policy::{ExplicitImportAdapter, IdentityAdapter, ModelValidator, StructuralValidator, TargetAdapter};
pub use tracker::{ChangeRecord, ChangeTracker, ChangeType};
