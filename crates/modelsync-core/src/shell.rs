//! Shell representation of the decision model
//!
//! Variables are grouped into collections named after the top-most ancestor
//! of their type (or the type itself for enums and primitives). Each element
//! carries its meta properties and either the rendered value or one nested
//! element per compound field. The tree follows committed batches
//! incrementally.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{TypeRef, TypeRegistry, Value, Variable};
use crate::ops::ModelStore;
use crate::tracker::{ChangeRecord, ChangeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetaState {
    Frozen,
    Assigned,
    Unset,
}

impl MetaState {
    fn of(frozen: bool, value: &Value) -> Self {
        if frozen {
            MetaState::Frozen
        } else if value.is_unset() {
            MetaState::Unset
        } else {
            MetaState::Assigned
        }
    }
}

/// Shell-visible element for a variable or a compound field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellElement {
    pub id: String,
    /// Qualified variable name, with a dotted field path for members
    #[serde(rename = "metaVariable")]
    pub variable: String,
    #[serde(rename = "metaType")]
    pub meta_type: String,
    #[serde(rename = "metaProject")]
    pub project: String,
    #[serde(rename = "metaState")]
    pub state: MetaState,
    #[serde(rename = "varValue", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ShellElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShellCollection {
    pub id: String,
    /// Elements keyed by qualified variable name
    pub elements: BTreeMap<String, ShellElement>,
}

/// Turn a name into an id accepted by shell clients
///
/// Non-alphanumerics become `_`; ids never start with a digit.
pub fn fix_id(text: &str) -> String {
    let mut id: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if id.is_empty() || id.starts_with(|c: char| c.is_ascii_digit()) {
        id.insert_str(0, "id_");
    }
    id
}

/// Collection a variable of type `ty` is listed under
pub fn collection_name(ty: &TypeRef, types: &TypeRegistry) -> String {
    match ty {
        TypeRef::Primitive(p) => p.name().to_string(),
        TypeRef::Named(n) if types.compound(n).is_some() => types.top_ancestor(n).to_string(),
        TypeRef::Named(n) => n.clone(),
        TypeRef::SetOf(e) | TypeRef::SequenceOf(e) | TypeRef::RefTo(e) => collection_name(e, types),
    }
}

fn build_element(
    id: String,
    variable: String,
    meta_type: String,
    project: &str,
    frozen: bool,
    value: &Value,
    types: &TypeRegistry,
) -> ShellElement {
    let state = MetaState::of(frozen, value);
    let (rendered, members) = match value {
        Value::Compound { ty, fields } => {
            let compound = ty.clone().unwrap_or_else(|| meta_type.clone());
            let members = fields
                .iter()
                .map(|(field, nested)| {
                    let field_type = types
                        .field_type(&compound, field)
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    build_element(
                        fix_id(field),
                        format!("{}.{}", variable, field),
                        field_type,
                        project,
                        frozen,
                        nested,
                        types,
                    )
                })
                .collect();
            (None, members)
        }
        Value::Unset => (None, Vec::new()),
        other => (Some(other.to_string()), Vec::new()),
    };
    ShellElement {
        id,
        variable,
        meta_type,
        project: project.to_string(),
        state,
        value: rendered,
        members,
    }
}

/// Shell tree over all variables of a model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShellTree {
    collections: BTreeMap<String, ShellCollection>,
}

impl ShellTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(model: &ModelStore) -> Self {
        let mut tree = Self::new();
        for var in model.variables() {
            tree.upsert(var, model.types());
        }
        tree
    }

    fn upsert(&mut self, var: &Variable, types: &TypeRegistry) {
        self.remove(&var.qualified_name());
        let name = collection_name(&var.ty, types);
        let element = build_element(
            fix_id(&var.name),
            var.qualified_name(),
            var.ty.to_string(),
            &var.project,
            var.frozen,
            &var.value,
            types,
        );
        self.collections
            .entry(name.clone())
            .or_insert_with(|| ShellCollection {
                id: fix_id(&name),
                elements: BTreeMap::new(),
            })
            .elements
            .insert(element.variable.clone(), element);
    }

    fn remove(&mut self, qualified: &str) {
        for collection in self.collections.values_mut() {
            collection.elements.remove(qualified);
        }
        self.collections.retain(|_, c| !c.elements.is_empty());
    }

    /// Follow one committed batch
    ///
    /// `projects` are the projects the batch wrote; their variables are
    /// refreshed as a whole so reference rewrites without a change record
    /// show up too. Elements of variables gone from `model` are dropped.
    pub fn apply(&mut self, records: &[ChangeRecord], projects: &BTreeSet<String>, model: &ModelStore) {
        for record in records {
            self.remove(&record.variable);
            if record.change != ChangeType::Deleted {
                if let Some(var) = model.find_variable(&record.variable) {
                    self.upsert(var, model.types());
                }
            }
        }
        for project in projects {
            if let Ok(p) = model.project(project) {
                for var in &p.variables {
                    self.upsert(var, model.types());
                }
            }
        }
        for collection in self.collections.values_mut() {
            collection
                .elements
                .retain(|qualified, _| model.find_variable(qualified).is_some());
        }
        self.collections.retain(|_, c| !c.elements.is_empty());
    }

    pub fn collection(&self, name: &str) -> Option<&ShellCollection> {
        self.collections.get(name)
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    pub fn element(&self, qualified: &str) -> Option<&ShellElement> {
        self.collections
            .values()
            .find_map(|c| c.elements.get(qualified))
    }

    pub fn element_count(&self) -> usize {
        self.collections.values().map(|c| c.elements.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.collections).unwrap_or_default()
    }
}
