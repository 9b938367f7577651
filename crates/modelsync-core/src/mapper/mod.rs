//! Model-to-shell mapper
//!
//! The mapper is the session object remote shells talk to. It owns the live
//! decision model, the session's change tracker and name registry, and the
//! injected collaborators.
//!
//! ## Atomicity
//!
//! Every mutating operation stages its work on a copy of the model. The copy
//! is committed in one step:
//!
//! 1. each project that differs from the live model passes the
//!    [`TargetAdapter`],
//! 2. the [`ModelValidator`] checks the whole staged model,
//! 3. the [`ProjectPersister`] writes the touched projects,
//! 4. the staged model replaces the live one and its change records are
//!    published to the tracker, the shell tree and the listeners.
//!
//! A failure in any step leaves the live model, the tracker and storage as
//! they were.

mod batch;
mod graph_sync;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;

use crate::commands::{
    OP_ADD_IMPORTS, OP_CHANGE_VALUES, OP_CREATE_VARIABLE, OP_DELETE_GRAPH, OP_DELETE_VARIABLE,
    OP_GET_GRAPH, OP_GET_OPEN_TEMPLATE_VARIABLES, OP_GET_TEMPLATES, OP_GET_UNUSED_PROJECTS,
    OP_GET_VARIABLE_NAME, OP_INSTANTIATE, OP_INSTANTIATE_TEMPLATE, OP_REMOVE_IMPORTS,
    OP_RENAME_VARIABLE, OP_SET_GRAPH,
};
use crate::config::MapperConfig;
use crate::errors::{ExError, ModelError};
use crate::graph::CodecRegistry;
use crate::imports;
use crate::instantiation::{InstantiationPipeline, InstantiationRequest, UnavailablePipeline};
use crate::model::{parse_value, TypeRef, Value, Variable};
use crate::naming::{is_identifier, NameGenerator};
use crate::ops::store::split_value_path;
use crate::ops::{variable_ops, ModelStore};
use crate::persist::{NoopPersister, ProjectPersister};
use crate::policy::{AdaptContext, IdentityAdapter, ModelValidator, StructuralValidator, TargetAdapter};
use crate::shell::ShellTree;
use crate::templates;
use crate::tracker::{ChangeRecord, ChangeTracker, ChangeType};
use crate::{log_op_end, log_op_error, log_op_start};

use batch::{touched_projects, Batch};
use graph_sync::SyncContext;

/// Receives the change records of every committed batch
pub trait ChangeListener: Send + Sync {
    fn on_commit(&self, records: &[ChangeRecord]);
}

/// Keeps every committed batch
#[derive(Debug, Default)]
pub struct RecordingListener {
    commits: Mutex<Vec<Vec<ChangeRecord>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> Vec<Vec<ChangeRecord>> {
        self.commits.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ChangeListener for RecordingListener {
    fn on_commit(&self, records: &[ChangeRecord]) {
        if let Ok(mut commits) = self.commits.lock() {
            commits.push(records.to_vec());
        }
    }
}

/// Result of `change_values`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeOutcome {
    /// Qualified names of the variables assigned
    pub applied: Vec<String>,
    /// Qualified names of frozen variables left untouched
    pub skipped_frozen: Vec<String>,
}

/// Run `run` as shell operation `op`: one start event, then end or end_error
#[allow(clippy::result_large_err)]
fn observed<T>(op: &'static str, run: impl FnOnce() -> Result<T, ExError>) -> Result<T, ExError> {
    log_op_start!(op);
    let start = Instant::now();
    match run() {
        Ok(value) => {
            log_op_end!(op, duration_ms = start.elapsed().as_millis() as u64);
            Ok(value)
        }
        Err(err) => {
            let err = err.with_op(op);
            log_op_error!(op, err, duration_ms = start.elapsed().as_millis() as u64);
            Err(err)
        }
    }
}

fn not_modifiable(project: &str) -> ExError {
    ModelError::ProjectNotModifiable {
        project: project.to_string(),
    }
    .into()
}

fn invalid_name(name: &str) -> ExError {
    ModelError::InvalidInput {
        reason: format!("{} is not a valid variable name", name),
    }
    .into()
}

pub struct ModelMapper {
    model: ModelStore,
    config: MapperConfig,
    tracker: ChangeTracker,
    last_changes: Vec<ChangeRecord>,
    names: NameGenerator,
    codecs: CodecRegistry,
    persister: Arc<dyn ProjectPersister>,
    validator: Box<dyn ModelValidator>,
    adapter: Box<dyn TargetAdapter>,
    pipeline: Box<dyn InstantiationPipeline>,
    listeners: Vec<Arc<dyn ChangeListener>>,
    shell: ShellTree,
}

impl std::fmt::Debug for ModelMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelMapper")
            .field("root", &self.config.root_project)
            .field("projects", &self.model.project_names().len())
            .field("pending_changes", &self.tracker.len())
            .field("codecs", &self.codecs)
            .finish()
    }
}

impl ModelMapper {
    /// Mapper over `model` with in-memory persistence and structural validation
    pub fn new(model: ModelStore, config: MapperConfig) -> Self {
        let shell = ShellTree::build(&model);
        Self {
            model,
            config,
            tracker: ChangeTracker::new(),
            last_changes: Vec::new(),
            names: NameGenerator::new(),
            codecs: CodecRegistry::new(),
            persister: Arc::new(NoopPersister),
            validator: Box::new(StructuralValidator),
            adapter: Box::new(IdentityAdapter),
            pipeline: Box::new(UnavailablePipeline),
            listeners: Vec::new(),
            shell,
        }
    }

    pub fn with_persister(mut self, persister: Arc<dyn ProjectPersister>) -> Self {
        self.persister = persister;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn ModelValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_adapter(mut self, adapter: Box<dyn TargetAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_pipeline(mut self, pipeline: Box<dyn InstantiationPipeline>) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    pub fn codecs_mut(&mut self) -> &mut CodecRegistry {
        &mut self.codecs
    }

    pub fn model(&self) -> &ModelStore {
        &self.model
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn shell(&self) -> &ShellTree {
        &self.shell
    }

    /// Records accumulated since the last `clear_changes` or `reset_session`
    pub fn changes(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Records of the most recent committed batch
    pub fn last_changes(&self) -> &[ChangeRecord] {
        &self.last_changes
    }

    pub fn clear_changes(&mut self) {
        self.tracker.clear();
        self.last_changes.clear();
    }

    /// Start a new session: forget change records and issued names
    pub fn reset_session(&mut self) {
        self.clear_changes();
        self.names.reset();
    }

    /// Replace the decision model, e.g. after reloading it from storage
    pub fn replace_model(&mut self, model: ModelStore) {
        self.shell = ShellTree::build(&model);
        self.model = model;
        self.reset_session();
    }

    fn begin(&self) -> Batch {
        Batch::new(self.model.clone())
    }

    #[allow(clippy::result_large_err)]
    fn commit(&mut self, batch: Batch) -> Result<(), ExError> {
        let Batch {
            mut model,
            changes,
            renames,
        } = batch;

        let mut touched = touched_projects(&self.model, &model);
        for name in &touched.saved {
            let project = model.project(name)?.clone();
            let adapted = {
                let ctx = AdaptContext {
                    root: &self.config.root_project,
                    model: &model,
                };
                self.adapter.adapt_target(&ctx, project)?
            };
            *model.project_mut(name)? = adapted;
        }
        // adaptation may have reverted a change
        touched = touched_projects(&self.model, &model);

        self.validator.validate(&model)?;
        if !touched.is_empty() {
            self.persister.persist(&touched, &model)?;
        }

        self.model = model;
        for (old, new) in &renames {
            self.tracker.rekey(old, new);
        }
        self.tracker.absorb(&changes);
        self.last_changes = changes.snapshot();
        self.shell.apply(&self.last_changes, &touched.saved, &self.model);
        for listener in &self.listeners {
            listener.on_commit(&self.last_changes);
        }
        tracing::debug!(
            change_count = self.last_changes.len(),
            saved = touched.saved.len(),
            removed = touched.removed.len(),
            "batch committed"
        );
        Ok(())
    }

    /// Resolve a simple or `Project::name` qualified name
    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.model.find_variable(name)
    }

    /// Value at a dotted path `var.field.sub`
    pub fn get_value(&self, path: &str) -> Option<&Value> {
        self.model.get_value(path)
    }

    /// Assign value expressions in one batch
    ///
    /// Frozen variables are skipped and reported in the outcome.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown variables, `InvalidExpression` or
    /// `TypeMismatch` for bad values and `ValidationFailed` if the model
    /// rejects the result; nothing is applied then.
    #[allow(clippy::result_large_err)]
    pub fn change_values(&mut self, assignments: &[(String, String)]) -> Result<ChangeOutcome, ExError> {
        observed(OP_CHANGE_VALUES, || {
            let mut batch = self.begin();
            let mut outcome = ChangeOutcome::default();
            for (path, expr) in assignments {
                let (var_name, fields) = split_value_path(path);
                let var = batch.model.variable(var_name)?;
                let qualified = var.qualified_name();
                if var.frozen {
                    tracing::debug!(variable = %qualified, "skipping frozen variable");
                    outcome.skipped_frozen.push(qualified);
                    continue;
                }
                let ty = batch
                    .model
                    .types()
                    .type_at_path(&var.ty, &fields)
                    .ok_or_else(|| ModelError::InvalidInput {
                        reason: format!("{} does not address a declared field", path),
                    })?;
                let value = parse_value(expr, &ty, batch.model.types())?;
                variable_ops::assign_value(&mut batch.model, path, value)?;
                batch.record(&qualified, ChangeType::Modified);
                outcome.applied.push(qualified);
            }
            self.commit(batch)?;
            tracing::info!(
                op = OP_CHANGE_VALUES,
                change_count = outcome.applied.len(),
                skipped_count = outcome.skipped_frozen.len(),
                "values assigned"
            );
            Ok(outcome)
        })
    }

    /// Create a variable in the pool project of its type
    ///
    /// Returns the qualified name of the new variable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a bad name or type, `NotFound` for an
    /// unknown type, `NotModifiable` if the pool project is protected and
    /// `NameCollision` if the name is taken there.
    #[allow(clippy::result_large_err)]
    pub fn create_variable(
        &mut self,
        name: &str,
        type_name: &str,
        frozen: bool,
        value_expr: &str,
    ) -> Result<String, ExError> {
        observed(OP_CREATE_VARIABLE, || {
            if !is_identifier(name) {
                return Err(invalid_name(name));
            }
            let ty: TypeRef = type_name.parse()?;
            let mut batch = self.begin();
            batch.model.types().resolve(&ty)?;
            let project = self.config.pool_project_for(
                ty.base_name().unwrap_or_default(),
                batch.model.types(),
                |p| batch.model.has_project(p),
            );
            if !self.config.is_modifiable(&project) {
                return Err(not_modifiable(&project));
            }
            let value = parse_value(value_expr, &ty, batch.model.types())?;
            let mut var = Variable::new(name, project, ty).with_value(value);
            var.frozen = frozen;
            let qualified = var.qualified_name();
            batch.model.insert_variable(var)?;
            batch.record(&qualified, ChangeType::Created);
            self.commit(batch)?;
            Ok(qualified)
        })
    }

    /// Delete a variable and every reference to it
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown variables and `NotModifiable` for
    /// variables of protected projects.
    #[allow(clippy::result_large_err)]
    pub fn delete_variable(&mut self, name: &str) -> Result<(), ExError> {
        observed(OP_DELETE_VARIABLE, || {
            let mut batch = self.begin();
            let project = batch.model.variable(name)?.project.clone();
            if !self.config.is_modifiable(&project) {
                return Err(not_modifiable(&project));
            }
            let (removed, modified) = variable_ops::delete_variable(&mut batch.model, name)?;
            batch.record(&removed.qualified_name(), ChangeType::Deleted);
            for referrer in modified {
                batch.record(&referrer, ChangeType::Modified);
            }
            self.commit(batch)
        })
    }

    /// Rename a variable within its project
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `old_name` does not resolve, `InvalidInput` for a
    /// bad new name, `NameCollision` if it is taken and `NotModifiable` for
    /// protected projects.
    #[allow(clippy::result_large_err)]
    pub fn rename_variable(&mut self, old_name: &str, new_name: &str) -> Result<(), ExError> {
        observed(OP_RENAME_VARIABLE, || {
            if !is_identifier(new_name) {
                return Err(invalid_name(new_name));
            }
            let mut batch = self.begin();
            let project = batch.model.variable(old_name)?.project.clone();
            if !self.config.is_modifiable(&project) {
                return Err(not_modifiable(&project));
            }
            let (old, new) = variable_ops::rename_variable(&mut batch.model, old_name, new_name)?;
            batch.record(&new, ChangeType::Modified);
            batch.renames.push((old, new));
            self.commit(batch)
        })
    }

    /// Render the mesh stored under container variable `mesh_var`
    ///
    /// # Errors
    ///
    /// Returns `UnknownFormat`, `NotFound` if `mesh_var` is missing or not a
    /// mesh container, and the codec's encoding errors.
    #[allow(clippy::result_large_err)]
    pub fn get_graph(&self, mesh_var: &str, format: &str) -> Result<String, ExError> {
        observed(OP_GET_GRAPH, || {
            let codec = self.codecs.codec(format)?;
            let graph = graph_sync::load_graph(&self.model, mesh_var)?;
            Ok(codec.encode(&graph)?)
        })
    }

    /// Store `graph` as mesh `mesh_name` of application `app_name`
    ///
    /// The application is created from `app_value_expr` if missing and
    /// lists the mesh in its services afterwards.
    ///
    /// # Errors
    ///
    /// Returns `UnknownFormat`, decoding errors, `NotFound` for missing meta
    /// types and `ValidationFailed` if the model rejects the result; nothing
    /// is applied then.
    #[allow(clippy::result_large_err)]
    pub fn set_graph(
        &mut self,
        app_value_expr: &str,
        app_name: &str,
        mesh_name: &str,
        format: &str,
        graph: &str,
    ) -> Result<(), ExError> {
        log_op_start!(OP_SET_GRAPH, variable = mesh_name, format = format);
        let start = Instant::now();
        let mut batch = self.begin();
        let ctx = SyncContext {
            config: &self.config,
            codecs: &self.codecs,
        };
        let result = graph_sync::set_graph(&mut batch, &ctx, app_value_expr, app_name, mesh_name, format, graph)
            .map_err(ExError::from)
            .and_then(|()| self.commit(batch))
            .map_err(|e| {
                let e = e.with_op(OP_SET_GRAPH);
                log_op_error!(OP_SET_GRAPH, e, duration_ms = start.elapsed().as_millis() as u64);
                e
            });
        result?;
        log_op_end!(
            OP_SET_GRAPH,
            duration_ms = start.elapsed().as_millis() as u64,
            change_count = self.last_changes.len()
        );
        Ok(())
    }

    /// Delete mesh `mesh_name` of `app_name`, or the application with the
    /// meshes only it uses when no mesh is given
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the mesh or application does not exist.
    #[allow(clippy::result_large_err)]
    pub fn delete_graph(&mut self, app_name: &str, mesh_name: Option<&str>) -> Result<(), ExError> {
        log_op_start!(OP_DELETE_GRAPH, variable = app_name);
        let start = Instant::now();
        let mut batch = self.begin();
        let result = graph_sync::delete_graph(&mut batch, &self.config, app_name, mesh_name)
            .map_err(ExError::from)
            .and_then(|()| self.commit(batch))
            .map_err(|e| {
                let e = e.with_op(OP_DELETE_GRAPH);
                log_op_error!(OP_DELETE_GRAPH, e, duration_ms = start.elapsed().as_millis() as u64);
                e
            });
        result?;
        log_op_end!(
            OP_DELETE_GRAPH,
            duration_ms = start.elapsed().as_millis() as u64,
            change_count = self.last_changes.len()
        );
        Ok(())
    }

    /// Validate the model and hand it to the instantiation pipeline
    ///
    /// Returns the produced artifact ids, prefixed with the configured URI
    /// prefix.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` for an invalid model and `ExternalService`
    /// if the pipeline fails.
    #[allow(clippy::result_large_err)]
    pub fn instantiate(&self, request: &InstantiationRequest) -> Result<Vec<String>, ExError> {
        observed(OP_INSTANTIATE, || {
            self.validator.validate(&self.model)?;
            tracing::debug!(mode = %request.mode, rule = request.mode.start_rule(), "starting instantiation");
            let artifacts = self.pipeline.instantiate(request, &self.model)?;
            Ok(artifacts
                .into_iter()
                .map(|id| format!("{}{}", self.config.artifacts_uri_prefix, id))
                .collect())
        })
    }

    /// Clone a template into a new variable; returns `new_name`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown templates, `InvalidAdjustment` for
    /// paths that are not open slots and `NameCollision` for taken names.
    #[allow(clippy::result_large_err)]
    pub fn instantiate_template(
        &mut self,
        template: &str,
        new_name: &str,
        adjustments: &BTreeMap<String, String>,
    ) -> Result<String, ExError> {
        observed(OP_INSTANTIATE_TEMPLATE, || {
            let mut batch = self.begin();
            let created = templates::instantiate(&mut batch.model, &self.config, template, new_name, adjustments)?;
            batch.record(&created.variable, ChangeType::Created);
            self.commit(batch)?;
            Ok(new_name.to_string())
        })
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no variable is called `template`.
    #[allow(clippy::result_large_err)]
    pub fn get_open_template_variables(&self, template: &str) -> Result<Vec<String>, ExError> {
        observed(OP_GET_OPEN_TEMPLATE_VARIABLES, || {
            Ok(templates::open_slots(&self.model, template)?)
        })
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other shell operations.
    #[allow(clippy::result_large_err)]
    pub fn get_templates(&self) -> Result<Vec<String>, ExError> {
        observed(OP_GET_TEMPLATES, || {
            Ok(templates::list_templates(&self.model, &self.config))
        })
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other shell operations.
    #[allow(clippy::result_large_err)]
    pub fn get_unused_projects(&self) -> Result<Vec<String>, ExError> {
        observed(OP_GET_UNUSED_PROJECTS, || {
            Ok(imports::unused_projects(&self.model, &self.config))
        })
    }

    /// Add imports to the root project; returns those that were new
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown projects and `CyclicImport` if an
    /// import would close a cycle.
    #[allow(clippy::result_large_err)]
    pub fn add_imports(&mut self, projects: &[String]) -> Result<Vec<String>, ExError> {
        observed(OP_ADD_IMPORTS, || {
            let mut batch = self.begin();
            let added = imports::add_imports(&mut batch.model, &self.config, projects)?;
            self.commit(batch)?;
            Ok(added)
        })
    }

    /// Remove imports from the root project
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the root does not hold an import and
    /// `ValidationFailed` if variables depend on it.
    #[allow(clippy::result_large_err)]
    pub fn remove_imports(&mut self, projects: &[String]) -> Result<Vec<String>, ExError> {
        observed(OP_REMOVE_IMPORTS, || {
            let mut batch = self.begin();
            let removed = imports::remove_imports(&mut batch.model, &self.config, projects)?;
            self.commit(batch)?;
            Ok(removed)
        })
    }

    /// Suggest a fresh variable name, unique in this session and the model
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other shell operations.
    #[allow(clippy::result_large_err)]
    pub fn get_variable_name(
        &mut self,
        type_hint: &str,
        display_name: &str,
        version_hint: &str,
    ) -> Result<String, ExError> {
        observed(OP_GET_VARIABLE_NAME, || {
            let model = &self.model;
            Ok(self
                .names
                .generate_avoiding(type_hint, display_name, version_hint, |n| {
                    model.variables().any(|v| v.name == n)
                }))
        })
    }
}
