//! Shell operations and their command inventory
//!
//! Remote shell clients invoke operations by name with positional string
//! arguments. `Command::from_invocation` turns such a call into a typed
//! command that [`crate::apply::apply`] executes against a mapper.

use std::collections::BTreeMap;

use crate::errors::{ExError, ExErrorKind};
use crate::instantiation::{InstantiationMode, InstantiationRequest};

pub const OP_GET_GRAPH: &str = "get-graph";
pub const OP_SET_GRAPH: &str = "set-graph";
pub const OP_DELETE_GRAPH: &str = "delete-graph";
pub const OP_CREATE_VARIABLE: &str = "create-variable";
pub const OP_DELETE_VARIABLE: &str = "delete-variable";
pub const OP_RENAME_VARIABLE: &str = "rename-variable";
pub const OP_CHANGE_VALUES: &str = "change-values";
pub const OP_INSTANTIATE: &str = "instantiate";
pub const OP_INSTANTIATE_TEMPLATE: &str = "instantiate-template";
pub const OP_GET_OPEN_TEMPLATE_VARIABLES: &str = "get-open-template-variables";
pub const OP_GET_TEMPLATES: &str = "get-templates";
pub const OP_GET_UNUSED_PROJECTS: &str = "get-unused-projects";
pub const OP_ADD_IMPORTS: &str = "add-imports";
pub const OP_REMOVE_IMPORTS: &str = "remove-imports";
pub const OP_GET_VARIABLE_NAME: &str = "get-variable-name";

/// Every operation name a shell exposes
pub const OPERATIONS: [&str; 15] = [
    OP_GET_GRAPH,
    OP_SET_GRAPH,
    OP_DELETE_GRAPH,
    OP_CREATE_VARIABLE,
    OP_DELETE_VARIABLE,
    OP_RENAME_VARIABLE,
    OP_CHANGE_VALUES,
    OP_INSTANTIATE,
    OP_INSTANTIATE_TEMPLATE,
    OP_GET_OPEN_TEMPLATE_VARIABLES,
    OP_GET_TEMPLATES,
    OP_GET_UNUSED_PROJECTS,
    OP_ADD_IMPORTS,
    OP_REMOVE_IMPORTS,
    OP_GET_VARIABLE_NAME,
];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Render the mesh stored under a container variable
    GetGraph { mesh_var: String, format: String },

    /// Store a graph as mesh of an application
    SetGraph {
        app_value_expr: String,
        app_name: String,
        mesh_name: String,
        format: String,
        graph: String,
    },

    /// Delete one mesh, or an application with its meshes
    DeleteGraph {
        app_name: String,
        mesh_name: Option<String>,
    },

    CreateVariable {
        name: String,
        type_name: String,
        frozen: bool,
        value_expr: String,
    },

    DeleteVariable { name: String },

    RenameVariable { old_name: String, new_name: String },

    /// Assign value expressions to variables or dotted field paths
    ChangeValues { assignments: Vec<(String, String)> },

    Instantiate(InstantiationRequest),

    InstantiateTemplate {
        template: String,
        new_name: String,
        adjustments: BTreeMap<String, String>,
    },

    GetOpenTemplateVariables { template: String },

    GetTemplates,

    GetUnusedProjects,

    AddImports { projects: Vec<String> },

    RemoveImports { projects: Vec<String> },

    GetVariableName {
        type_hint: String,
        display_name: String,
        version_hint: String,
    },
}

fn invalid(op: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op(op)
        .with_message(reason)
}

/// Positional argument access for one invocation
struct Args<'a> {
    op: &'a str,
    args: &'a [String],
}

impl<'a> Args<'a> {
    #[allow(clippy::result_large_err)]
    fn required(&self, index: usize, name: &str) -> Result<&'a str, ExError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| invalid(self.op, format!("missing argument {}", name)))
    }

    fn optional(&self, index: usize) -> Option<&'a str> {
        self.args
            .get(index)
            .map(String::as_str)
            .filter(|a| !a.trim().is_empty())
    }

    fn or_empty(&self, index: usize) -> String {
        self.optional(index).unwrap_or_default().to_string()
    }

    /// A JSON object of strings, e.g. `{"x": "1"}`
    #[allow(clippy::result_large_err)]
    fn string_map(&self, index: usize) -> Result<BTreeMap<String, String>, ExError> {
        let Some(text) = self.optional(index) else {
            return Ok(BTreeMap::new());
        };
        serde_json::from_str(text).map_err(|e| {
            invalid(self.op, format!("argument {} is not a JSON object of strings: {}", index, e))
        })
    }

    /// Either one JSON array argument or the remaining arguments as names
    #[allow(clippy::result_large_err)]
    fn names(&self, from: usize) -> Result<Vec<String>, ExError> {
        match self.args.get(from..) {
            Some([single]) if single.trim_start().starts_with('[') => serde_json::from_str(single)
                .map_err(|e| invalid(self.op, format!("names are not a JSON array of strings: {}", e))),
            Some(rest) => Ok(rest
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}

impl Command {
    /// Parse a shell invocation
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for unknown operations and malformed or
    /// missing arguments.
    #[allow(clippy::result_large_err)]
    pub fn from_invocation(op: &str, args: &[String]) -> Result<Command, ExError> {
        let a = Args { op, args };
        let command = match op {
            OP_GET_GRAPH => Command::GetGraph {
                mesh_var: a.required(0, "meshVar")?.to_string(),
                format: a.required(1, "format")?.to_string(),
            },
            OP_SET_GRAPH => Command::SetGraph {
                app_value_expr: a.or_empty(0),
                app_name: a.or_empty(1),
                mesh_name: a.or_empty(2),
                format: a.required(3, "format")?.to_string(),
                graph: a.or_empty(4),
            },
            OP_DELETE_GRAPH => Command::DeleteGraph {
                app_name: a.required(0, "appName")?.to_string(),
                mesh_name: a.optional(1).map(str::to_string),
            },
            OP_CREATE_VARIABLE => Command::CreateVariable {
                name: a.required(0, "name")?.to_string(),
                type_name: a.required(1, "type")?.to_string(),
                frozen: match a.optional(2) {
                    None => false,
                    Some(flag) => flag
                        .trim()
                        .parse()
                        .map_err(|_| invalid(op, format!("frozen flag '{}' is not a boolean", flag)))?,
                },
                value_expr: a.or_empty(3),
            },
            OP_DELETE_VARIABLE => Command::DeleteVariable {
                name: a.required(0, "name")?.to_string(),
            },
            OP_RENAME_VARIABLE => Command::RenameVariable {
                old_name: a.required(0, "oldName")?.to_string(),
                new_name: a.required(1, "newName")?.to_string(),
            },
            OP_CHANGE_VALUES => Command::ChangeValues {
                assignments: a.string_map(0)?.into_iter().collect(),
            },
            OP_INSTANTIATE => {
                let mut request = InstantiationRequest::new(
                    a.required(0, "mode")?
                        .parse::<InstantiationMode>()
                        .map_err(|e| e.with_op(op))?,
                );
                if let Some(app) = a.optional(1) {
                    request = request.for_app(app);
                }
                if let Some(file) = a.optional(2) {
                    request = request.with_code_file(file);
                }
                Command::Instantiate(request)
            }
            OP_INSTANTIATE_TEMPLATE => Command::InstantiateTemplate {
                template: a.required(0, "templateName")?.to_string(),
                new_name: a.required(1, "newName")?.to_string(),
                adjustments: a.string_map(2)?,
            },
            OP_GET_OPEN_TEMPLATE_VARIABLES => Command::GetOpenTemplateVariables {
                template: a.required(0, "templateName")?.to_string(),
            },
            OP_GET_TEMPLATES => Command::GetTemplates,
            OP_GET_UNUSED_PROJECTS => Command::GetUnusedProjects,
            OP_ADD_IMPORTS => Command::AddImports {
                projects: a.names(0)?,
            },
            OP_REMOVE_IMPORTS => Command::RemoveImports {
                projects: a.names(0)?,
            },
            OP_GET_VARIABLE_NAME => Command::GetVariableName {
                type_hint: a.or_empty(0),
                display_name: a.or_empty(1),
                version_hint: a.or_empty(2),
            },
            other => return Err(invalid(other, format!("unknown operation {}", other))),
        };
        Ok(command)
    }

    /// Shell operation name of this command
    pub fn op(&self) -> &'static str {
        match self {
            Command::GetGraph { .. } => OP_GET_GRAPH,
            Command::SetGraph { .. } => OP_SET_GRAPH,
            Command::DeleteGraph { .. } => OP_DELETE_GRAPH,
            Command::CreateVariable { .. } => OP_CREATE_VARIABLE,
            Command::DeleteVariable { .. } => OP_DELETE_VARIABLE,
            Command::RenameVariable { .. } => OP_RENAME_VARIABLE,
            Command::ChangeValues { .. } => OP_CHANGE_VALUES,
            Command::Instantiate(_) => OP_INSTANTIATE,
            Command::InstantiateTemplate { .. } => OP_INSTANTIATE_TEMPLATE,
            Command::GetOpenTemplateVariables { .. } => OP_GET_OPEN_TEMPLATE_VARIABLES,
            Command::GetTemplates => OP_GET_TEMPLATES,
            Command::GetUnusedProjects => OP_GET_UNUSED_PROJECTS,
            Command::AddImports { .. } => OP_ADD_IMPORTS,
            Command::RemoveImports { .. } => OP_REMOVE_IMPORTS,
            Command::GetVariableName { .. } => OP_GET_VARIABLE_NAME,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_every_operation_round_trips_its_name() {
        for op in OPERATIONS {
            let parsed = Command::from_invocation(
                op,
                &args(&["apps", "b", "c", "json", "e"]),
            );
            if let Ok(command) = parsed {
                assert_eq!(command.op(), op);
            }
        }
    }

    #[test]
    fn test_parse_set_graph() {
        let command = Command::from_invocation(
            OP_SET_GRAPH,
            &args(&["", "myApp", "myMesh", "json", "{}"]),
        )
        .unwrap();
        assert_eq!(
            command,
            Command::SetGraph {
                app_value_expr: String::new(),
                app_name: "myApp".to_string(),
                mesh_name: "myMesh".to_string(),
                format: "json".to_string(),
                graph: "{}".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_change_values_json() {
        let command = Command::from_invocation(
            OP_CHANGE_VALUES,
            &args(&[r#"{"b": "2", "a": "\"x\""}"#]),
        )
        .unwrap();
        assert_eq!(
            command,
            Command::ChangeValues {
                assignments: vec![
                    ("a".to_string(), "\"x\"".to_string()),
                    ("b".to_string(), "2".to_string()),
                ],
            }
        );
    }

    #[test]
    fn test_parse_imports_array_or_list() {
        let from_array = Command::from_invocation(OP_ADD_IMPORTS, &args(&[r#"["A", "B*"]"#])).unwrap();
        let from_list = Command::from_invocation(OP_ADD_IMPORTS, &args(&["A", "B*"])).unwrap();
        assert_eq!(from_array, from_list);
    }

    #[test]
    fn test_parse_errors() {
        let err = Command::from_invocation("explode", &[]).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        let err = Command::from_invocation(OP_RENAME_VARIABLE, &args(&["x"])).unwrap_err();
        assert!(err.message().contains("newName"));
        let err = Command::from_invocation(OP_CREATE_VARIABLE, &args(&["x", "Integer", "maybe"])).unwrap_err();
        assert_eq!(err.op(), Some(OP_CREATE_VARIABLE));
        let err = Command::from_invocation(OP_INSTANTIATE, &args(&["everything"])).unwrap_err();
        assert_eq!(err.op(), Some(OP_INSTANTIATE));
    }
}
