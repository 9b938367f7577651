//! Graph <-> decision-model synchronization
//!
//! A mesh lives in its own generated project: one variable per node, one per
//! connector and a container variable listing both. The owning application
//! lives in a generated application project and lists its meshes by
//! reference. Setting a graph again reuses the variables its nodes and edges
//! were stored under.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{MapperConfig, MetaTypeNames};
use crate::errors::{ModelError, Result};
use crate::graph::{CodecRegistry, Edge, Graph, Node, NodeFactory, NodeIdx};
use crate::model::meta::{
    FIELD_CONNECTORS, FIELD_DESCRIPTION, FIELD_FROM, FIELD_ID, FIELD_IMPL, FIELD_NAME, FIELD_NEXT,
    FIELD_NODES, FIELD_POS_X, FIELD_POS_Y, FIELD_SOURCES,
};
use crate::model::{parse_value, qualify, split_qualified, Import, Project, TypeRef, Value, Variable};
use crate::naming::{disambiguate, to_identifier, to_identifier_first_upper};
use crate::ops::{variable_ops, ModelStore};
use crate::tracker::ChangeType;

use super::batch::Batch;

/// Collaborators graph synchronization reads from
pub(crate) struct SyncContext<'a> {
    pub config: &'a MapperConfig,
    pub codecs: &'a CodecRegistry,
}

/// Resolves decoded `impl` values to qualified service variable names
///
/// Tries variable names first, then the `id` and `name` fields of services.
/// Unresolvable references are dropped.
struct ServiceResolver<'a> {
    model: &'a ModelStore,
    service_base: &'a str,
}

impl ServiceResolver<'_> {
    fn is_service(&self, var: &Variable) -> bool {
        matches!(&var.ty, TypeRef::Named(n) if self.model.types().is_subtype(n, self.service_base))
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        let services: Vec<&Variable> = self
            .model
            .variables()
            .filter(|v| self.is_service(v))
            .collect();
        let by_field = |field: &str| {
            services
                .iter()
                .find(|v| v.value.field(field).and_then(Value::as_str) == Some(reference))
        };
        services
            .iter()
            .find(|v| v.is_named_by(reference))
            .or_else(|| by_field(FIELD_ID))
            .or_else(|| by_field(FIELD_NAME))
            .map(|v| v.qualified_name())
    }
}

impl NodeFactory for ServiceResolver<'_> {
    fn create_node(&self, decoded: Node) -> Node {
        let impl_ref = decoded
            .impl_ref
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .and_then(|r| self.resolve(r));
        Node { impl_ref, ..decoded }
    }
}

/// Variables a graph should be stored as
#[derive(Debug)]
struct MeshPlan {
    project: String,
    /// Qualified name of the mesh container
    mesh: String,
    /// Nodes, connectors, then the mesh container
    variables: Vec<Variable>,
}

fn require_compound(model: &ModelStore, name: &str) -> Result<()> {
    match model.types().compound(name) {
        Some(_) => Ok(()),
        None => Err(ModelError::TypeNotFound {
            name: name.to_string(),
        }),
    }
}

fn generated_suffix(name: &str, what: &str) -> Result<(String, String)> {
    let suffix = to_identifier_first_upper(name);
    let var = to_identifier(name);
    if suffix.is_empty() || var.is_empty() {
        return Err(ModelError::InvalidInput {
            reason: format!("{} name '{}' has no identifier characters", what, name),
        });
    }
    Ok((suffix, var))
}

fn node_type<'a>(graph: &Graph, idx: NodeIdx, meta: &'a MetaTypeNames) -> &'a str {
    if graph.in_edges(idx).next().is_none() {
        &meta.source
    } else if graph.out_edges(idx).next().is_none() {
        &meta.sink
    } else {
        &meta.processor
    }
}

fn node_base_name(node: &Node) -> String {
    if let Some(service) = &node.impl_ref {
        let name = to_identifier(split_qualified(service).1);
        if !name.is_empty() {
            return name;
        }
    }
    let mut display = to_identifier(&node.name);
    if display.is_empty() {
        display = to_identifier(&node.id);
    }
    if display.is_empty() {
        "node".to_string()
    } else {
        format!("node_{}", display)
    }
}

fn refs(names: &[String]) -> Value {
    Value::Container(names.iter().map(|n| Value::reference(n.clone())).collect())
}

/// Node and connector variables a mesh project already holds
#[derive(Default)]
struct StoredMesh {
    /// Variable name and stored graph id of each node
    nodes: Vec<(String, Option<String>)>,
    /// Variable name, source node and target node of each connector
    connectors: Vec<(String, String, String)>,
}

impl StoredMesh {
    fn read(model: &ModelStore, meta: &MetaTypeNames, project: &str) -> Self {
        let mut stored = StoredMesh::default();
        let Ok(project) = model.project(project) else {
            return stored;
        };
        let endpoint = |var: &Variable, field: &str| {
            var.value
                .field(field)
                .and_then(Value::as_ref_target)
                .map(|r| split_qualified(r).1.to_string())
        };
        for var in &project.variables {
            let TypeRef::Named(ty) = &var.ty else {
                continue;
            };
            if [&meta.source, &meta.processor, &meta.sink].contains(&ty) {
                let id = var.value.field(FIELD_ID).and_then(Value::as_str).map(str::to_string);
                stored.nodes.push((var.name.clone(), id));
            } else if ty == &meta.connector {
                if let (Some(from), Some(to)) = (endpoint(var, FIELD_FROM), endpoint(var, FIELD_NEXT)) {
                    stored.connectors.push((var.name.clone(), from, to));
                }
            }
        }
        stored
    }
}

/// Pick a variable name and stored id for every node
///
/// A node keeps the variable its id names, or whose stored id equals its id.
/// Remaining nodes are named after their service or display name.
fn assign_node_vars(
    graph: &Graph,
    stored: &StoredMesh,
    used: &mut BTreeSet<String>,
) -> BTreeMap<NodeIdx, (String, String)> {
    type Claim = fn(&Node, &(String, Option<String>)) -> bool;
    let by_var_name: Claim = |node, (var, _)| *var == node.id;
    let by_stored_id: Claim = |node, (_, id)| id.as_deref() == Some(node.id.as_str());

    let mut assigned: BTreeMap<NodeIdx, (String, String)> = BTreeMap::new();
    for claims in [by_var_name, by_stored_id] {
        for (idx, node) in graph.nodes() {
            if assigned.contains_key(&idx) {
                continue;
            }
            let claimed = stored
                .nodes
                .iter()
                .find(|entry| !used.contains(&entry.0) && claims(node, entry));
            if let Some((var, id)) = claimed {
                used.insert(var.clone());
                let id = id.clone().unwrap_or_else(|| node.id.clone());
                assigned.insert(idx, (var.clone(), id));
            }
        }
    }
    for (idx, node) in graph.nodes() {
        if assigned.contains_key(&idx) {
            continue;
        }
        let name = disambiguate(&node_base_name(node), |n| used.contains(n));
        used.insert(name.clone());
        assigned.insert(idx, (name, node.id.clone()));
    }
    assigned
}

/// Pick a connector variable name for every edge, in traversal order
///
/// An edge keeps the connector its id names, then one joining the same two
/// nodes. New connectors take the lowest free `conn_<n>`.
fn assign_connector_vars<'g>(
    graph: &'g Graph,
    node_vars: &BTreeMap<NodeIdx, (String, String)>,
    stored: &StoredMesh,
    used: &mut BTreeSet<String>,
) -> Vec<(String, &'g Edge)> {
    let edges: Vec<&Edge> = graph.nodes().flat_map(|(idx, _)| graph.out_edges(idx)).collect();
    let endpoints = |edge: &Edge| {
        node_vars
            .get(&edge.source)
            .zip(node_vars.get(&edge.target))
            .map(|((from, _), (to, _))| (from.as_str(), to.as_str()))
    };
    let mut names: Vec<Option<String>> = vec![None; edges.len()];
    for pass in 0..2 {
        for (slot, edge) in names.iter_mut().zip(&edges) {
            if slot.is_some() {
                continue;
            }
            let claimed = stored.connectors.iter().find(|(var, from, to)| {
                !used.contains(var)
                    && match pass {
                        0 => *var == edge.id,
                        _ => endpoints(edge) == Some((from.as_str(), to.as_str())),
                    }
            });
            if let Some((var, _, _)) = claimed {
                used.insert(var.clone());
                *slot = Some(var.clone());
            }
        }
    }
    let mut assigned = Vec::with_capacity(edges.len());
    let mut next_free = 0u64;
    for (slot, edge) in names.into_iter().zip(edges) {
        let name = match slot {
            Some(name) => name,
            None => {
                while used.contains(&format!("conn_{}", next_free)) {
                    next_free += 1;
                }
                format!("conn_{}", next_free)
            }
        };
        used.insert(name.clone());
        assigned.push((name, edge));
    }
    assigned
}

fn plan_mesh(model: &ModelStore, config: &MapperConfig, mesh_name: &str, graph: &Graph) -> Result<MeshPlan> {
    let meta = &config.meta;
    for ty in [&meta.mesh, &meta.source, &meta.processor, &meta.sink, &meta.connector] {
        require_compound(model, ty)?;
    }
    let (suffix, mesh_var) = generated_suffix(mesh_name, "mesh")?;
    let project = config.mesh_projects.project_name(&suffix);

    let stored = StoredMesh::read(model, meta, &project);
    let mut used: BTreeSet<String> = BTreeSet::from([mesh_var.clone()]);
    let node_vars = assign_node_vars(graph, &stored, &mut used);
    let connectors = assign_connector_vars(graph, &node_vars, &stored, &mut used);

    let mut outgoing: BTreeMap<NodeIdx, Vec<String>> = BTreeMap::new();
    for (name, edge) in &connectors {
        outgoing.entry(edge.source).or_default().push(name.clone());
    }

    let mut variables = Vec::new();
    let mut sources = Vec::new();
    let mut nodes = Vec::new();
    for (idx, node) in graph.nodes() {
        let Some((var_name, id)) = node_vars.get(&idx) else {
            continue;
        };
        let ty = node_type(graph, idx, meta);
        let mut next = outgoing.remove(&idx).unwrap_or_default();
        next.sort();
        let mut fields = vec![
            (FIELD_NAME, Value::str(node.name.clone())),
            (FIELD_POS_X, Value::Int(node.x.into())),
            (FIELD_POS_Y, Value::Int(node.y.into())),
            (FIELD_IMPL, node.impl_ref.clone().map_or(Value::Null, Value::Ref)),
            (FIELD_NEXT, refs(&next)),
        ];
        if model.types().field_type(ty, FIELD_ID).is_some() {
            fields.push((FIELD_ID, Value::str(id.clone())));
        }
        let value = Value::compound(ty, fields).coerce(&TypeRef::named(ty), model.types())?;
        if ty == meta.source {
            sources.push(var_name.clone());
        }
        nodes.push(var_name.clone());
        variables.push(Variable::new(var_name, &project, TypeRef::named(ty)).with_value(value));
    }

    let mut connector_names = Vec::new();
    for (name, edge) in &connectors {
        let (Some((from, _)), Some((to, _))) = (node_vars.get(&edge.source), node_vars.get(&edge.target)) else {
            continue;
        };
        let value = Value::compound(
            &meta.connector,
            [
                (FIELD_NAME, Value::str(edge.name.clone())),
                (FIELD_FROM, Value::reference(from.clone())),
                (FIELD_NEXT, Value::reference(to.clone())),
            ],
        )
        .coerce(&TypeRef::named(&meta.connector), model.types())?;
        connector_names.push(name.clone());
        variables.push(Variable::new(name, &project, TypeRef::named(&meta.connector)).with_value(value));
    }

    sources.sort();
    nodes.sort();
    connector_names.sort();
    let mesh_value = Value::compound(
        &meta.mesh,
        [
            (FIELD_DESCRIPTION, Value::str(mesh_name)),
            (FIELD_SOURCES, refs(&sources)),
            (FIELD_NODES, refs(&nodes)),
            (FIELD_CONNECTORS, refs(&connector_names)),
        ],
    )
    .coerce(&TypeRef::named(&meta.mesh), model.types())?;
    variables.push(Variable::new(&mesh_var, &project, TypeRef::named(&meta.mesh)).with_value(mesh_value));

    Ok(MeshPlan {
        mesh: qualify(&project, &mesh_var),
        project,
        variables,
    })
}

/// Create a generated project importing whichever `defaults` exist
fn ensure_generated_project(model: &mut ModelStore, name: &str, defaults: &[String]) -> Result<()> {
    if model.has_project(name) {
        return Ok(());
    }
    let mut project = Project::new(name);
    for import in defaults.iter().map(|i| Import::parse(i)) {
        if import.wildcard || (import.target != name && model.has_project(&import.target)) {
            project.add_import(import);
        }
    }
    model.add_project(project)
}

/// Make `target` visible from `project`, importing it explicitly if needed
fn ensure_visible(model: &mut ModelStore, project: &str, target: &str) -> Result<()> {
    if !model.visible_projects(project).iter().any(|p| p == target) {
        model.project_mut(project)?.add_import(Import::explicit(target));
    }
    Ok(())
}

/// Write the planned variables, diffing against what the mesh project holds
///
/// Returns the qualified name of the mesh container.
fn apply_mesh(batch: &mut Batch, config: &MapperConfig, plan: MeshPlan) -> Result<String> {
    ensure_generated_project(&mut batch.model, &plan.project, &config.mesh_imports)?;
    for var in &plan.variables {
        if let Some(service_project) = var
            .value
            .field(FIELD_IMPL)
            .and_then(Value::as_ref_target)
            .and_then(|r| split_qualified(r).0)
        {
            ensure_visible(&mut batch.model, &plan.project, service_project)?;
        }
    }

    let existing = batch.model.project(&plan.project)?.variables.clone();
    let desired: BTreeSet<&str> = plan.variables.iter().map(|v| v.name.as_str()).collect();
    for old in existing.iter().filter(|v| !desired.contains(v.name.as_str())) {
        let qualified = old.qualified_name();
        batch.model.remove_variable(&qualified)?;
        batch.changes.record(&qualified, ChangeType::Deleted);
    }
    for var in plan.variables {
        let qualified = var.qualified_name();
        match existing.iter().find(|v| v.name == var.name) {
            None => {
                batch.model.insert_variable(var)?;
                batch.changes.record(&qualified, ChangeType::Created);
            }
            Some(old) if old.ty != var.ty || old.value != var.value => {
                let slot = batch.model.variable_mut(&qualified)?;
                slot.ty = var.ty;
                slot.value = var.value;
                batch.changes.record(&qualified, ChangeType::Modified);
            }
            Some(_) => {}
        }
    }
    Ok(plan.mesh)
}

/// Create or update the application `app_name`, linking it to `mesh`
fn sync_application(
    batch: &mut Batch,
    config: &MapperConfig,
    app_value_expr: &str,
    app_name: &str,
    mesh: Option<&str>,
) -> Result<()> {
    let meta = &config.meta;
    require_compound(&batch.model, &meta.application)?;
    let (suffix, app_var) = generated_suffix(app_name, "application")?;
    let project = config.app_projects.project_name(&suffix);
    let app_type = TypeRef::named(&meta.application);

    ensure_generated_project(&mut batch.model, &project, &config.app_imports)?;
    batch
        .model
        .project_mut(&project)?
        .add_import(Import::wildcard(config.mesh_projects.prefix.clone()));
    if let Some(mesh_project) = mesh.and_then(|m| split_qualified(m).0) {
        ensure_visible(&mut batch.model, &project, mesh_project)?;
    }

    let model = &batch.model;
    let existing = model.project(&project)?.variable(&app_var).cloned();
    let mut value = match (parse_value(app_value_expr, &app_type, model.types())?, &existing) {
        (Value::Unset, Some(var)) => var.value.clone(),
        (Value::Unset, None) => Value::compound(&meta.application, [(FIELD_NAME, Value::str(app_name))])
            .coerce(&app_type, model.types())?,
        (parsed, _) => parsed,
    };

    let services_field = meta.services_field.as_str();
    let mut services: Vec<Value> = match value.field(services_field) {
        Some(Value::Container(items)) => items.clone(),
        _ => existing
            .as_ref()
            .and_then(|v| v.value.field(services_field))
            .and_then(Value::as_container)
            .map(<[Value]>::to_vec)
            .unwrap_or_default(),
    };
    if let Some(mesh) = mesh {
        let linked = services
            .iter()
            .filter_map(Value::as_ref_target)
            .any(|r| model.resolve_reference(&project, r).is_some_and(|v| v.qualified_name() == mesh));
        if !linked {
            services.push(Value::reference(mesh));
        }
    }
    value.set_path(&[services_field], Value::Container(services))?;

    let qualified = qualify(&project, &app_var);
    match existing {
        None => {
            batch
                .model
                .insert_variable(Variable::new(app_var, project, app_type).with_value(value))?;
            batch.record(&qualified, ChangeType::Created);
        }
        Some(old) if old.value != value => {
            batch.model.variable_mut(&qualified)?.value = value;
            batch.record(&qualified, ChangeType::Modified);
        }
        Some(_) => {}
    }
    Ok(())
}

/// Decode `graph_text` and store it as mesh `mesh_name` owned by `app_name`
///
/// An empty mesh name or graph only updates the application; an empty
/// application name only stores the mesh.
pub(crate) fn set_graph(
    batch: &mut Batch,
    ctx: &SyncContext<'_>,
    app_value_expr: &str,
    app_name: &str,
    mesh_name: &str,
    format: &str,
    graph_text: &str,
) -> Result<()> {
    let mesh = if mesh_name.trim().is_empty() || graph_text.trim().is_empty() {
        None
    } else {
        let resolver = ServiceResolver {
            model: &batch.model,
            service_base: &ctx.config.meta.service_base,
        };
        let graph = ctx.codecs.decode(format, graph_text, &resolver)?;
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "decoded graph"
        );
        let plan = plan_mesh(&batch.model, ctx.config, mesh_name, &graph)?;
        Some(apply_mesh(batch, ctx.config, plan)?)
    };
    if !app_name.trim().is_empty() {
        sync_application(batch, ctx.config, app_value_expr, app_name, mesh.as_deref())?;
    }
    Ok(())
}

/// Delete every variable of `project`, recording referrers as modified
fn delete_project_variables(batch: &mut Batch, project: &str) -> Result<()> {
    let names: Vec<String> = batch
        .model
        .project(project)?
        .variables
        .iter()
        .map(Variable::qualified_name)
        .collect();
    for name in names {
        if batch.model.find_variable(&name).is_none() {
            continue;
        }
        let (removed, modified) = variable_ops::delete_variable(&mut batch.model, &name)?;
        batch.record(&removed.qualified_name(), ChangeType::Deleted);
        for referrer in modified {
            batch.record(&referrer, ChangeType::Modified);
        }
    }
    Ok(())
}

/// Mesh projects the variables of `project` refer to
fn referenced_meshes(model: &ModelStore, config: &MapperConfig, project: &str) -> BTreeSet<String> {
    let Ok(p) = model.project(project) else {
        return BTreeSet::new();
    };
    p.variables
        .iter()
        .flat_map(|v| v.value.references())
        .filter_map(|r| model.resolve_reference(project, r))
        .map(|target| target.project.clone())
        .filter(|target| config.mesh_projects.matches(target))
        .collect()
}

/// Remove mesh `mesh_name`, or the application with all meshes only it uses
pub(crate) fn delete_graph(
    batch: &mut Batch,
    config: &MapperConfig,
    app_name: &str,
    mesh_name: Option<&str>,
) -> Result<()> {
    let app_project = config
        .app_projects
        .project_name(&to_identifier_first_upper(app_name));
    match mesh_name.filter(|m| !m.trim().is_empty()) {
        Some(mesh_name) => {
            let mesh_project = config
                .mesh_projects
                .project_name(&to_identifier_first_upper(mesh_name));
            if !batch.model.has_project(&mesh_project) {
                return Err(ModelError::GraphNotFound {
                    name: mesh_name.to_string(),
                });
            }
            delete_project_variables(batch, &mesh_project)?;
            batch.drop_project(&mesh_project)?;
            if config.delete_empty_applications
                && batch.model.has_project(&app_project)
                && referenced_meshes(&batch.model, config, &app_project).is_empty()
            {
                delete_project_variables(batch, &app_project)?;
                batch.drop_project(&app_project)?;
            }
        }
        None => {
            if !batch.model.has_project(&app_project) {
                return Err(ModelError::GraphNotFound {
                    name: app_name.to_string(),
                });
            }
            let meshes = referenced_meshes(&batch.model, config, &app_project);
            delete_project_variables(batch, &app_project)?;
            batch.drop_project(&app_project)?;
            for mesh in meshes {
                let shared = batch
                    .model
                    .project_names()
                    .into_iter()
                    .filter(|p| config.app_projects.matches(p))
                    .any(|p| referenced_meshes(&batch.model, config, &p).contains(&mesh));
                if !shared && batch.model.has_project(&mesh) {
                    delete_project_variables(batch, &mesh)?;
                    batch.drop_project(&mesh)?;
                }
            }
        }
    }
    Ok(())
}

fn resolve_refs<'a>(model: &'a ModelStore, from: &Variable, value: Option<&Value>) -> Vec<&'a Variable> {
    let mut targets: Vec<&Variable> = Vec::new();
    let Some(value) = value else {
        return targets;
    };
    for reference in value.references() {
        if let Some(target) = model.resolve_reference(&from.project, reference) {
            if !targets.iter().any(|t| t.qualified_name() == target.qualified_name()) {
                targets.push(target);
            }
        }
    }
    targets
}

fn push_unique<'a>(list: &mut Vec<&'a Variable>, var: &'a Variable) {
    if !list.iter().any(|v| v.qualified_name() == var.qualified_name()) {
        list.push(var);
    }
}

fn text_field(var: &Variable, field: &str) -> String {
    var.value
        .field(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn int_field(var: &Variable, field: &str) -> i32 {
    var.value
        .field(field)
        .and_then(Value::as_int)
        .and_then(|i| i32::try_from(i).ok())
        .unwrap_or_default()
}

/// Rebuild the graph stored under mesh container `mesh_var`
///
/// Node and edge ids are the simple names of their variables.
pub(crate) fn load_graph(model: &ModelStore, mesh_var: &str) -> Result<Graph> {
    let mesh = model.variable(mesh_var)?;
    if !matches!(mesh.value, Value::Compound { .. }) {
        return Err(ModelError::GraphNotFound {
            name: mesh_var.to_string(),
        });
    }

    let mut nodes: Vec<&Variable> = Vec::new();
    for field in [FIELD_SOURCES, FIELD_NODES] {
        for node in resolve_refs(model, mesh, mesh.value.field(field)) {
            push_unique(&mut nodes, node);
        }
    }
    let mut connectors: Vec<&Variable> = resolve_refs(model, mesh, mesh.value.field(FIELD_CONNECTORS));
    let mut i = 0;
    while i < nodes.len() {
        let node = nodes[i];
        for conn in resolve_refs(model, node, node.value.field(FIELD_NEXT)) {
            push_unique(&mut connectors, conn);
            for target in resolve_refs(model, conn, conn.value.field(FIELD_NEXT)) {
                push_unique(&mut nodes, target);
            }
        }
        i += 1;
    }

    let mut graph = Graph::new();
    for var in &nodes {
        let mut node = Node::new(var.name.clone(), text_field(var, FIELD_NAME))
            .at(int_field(var, FIELD_POS_X), int_field(var, FIELD_POS_Y));
        if let Some(service) = var.value.field(FIELD_IMPL).and_then(Value::as_ref_target) {
            node = node.implemented_by(service);
        }
        graph.add_node(node)?;
    }
    for conn in &connectors {
        let endpoint = |field: &str| resolve_refs(model, conn, conn.value.field(field)).first().map(|v| v.name.clone());
        let (Some(from), Some(to)) = (endpoint(FIELD_FROM), endpoint(FIELD_NEXT)) else {
            continue;
        };
        graph.connect(conn.name.clone(), &from, &to, text_field(conn, FIELD_NAME))?;
    }
    Ok(graph)
}
