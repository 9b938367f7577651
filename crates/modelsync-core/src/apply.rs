//! Command execution and the remote invocation boundary
//!
//! [`apply`] runs a typed [`Command`] against a mapper. [`invoke`] is what a
//! remote shell calls: operation name and string arguments in, one JSON
//! document out. Failures are reported in the document, never as a panic or
//! a transport error.

use modelsync_core_types::RequestContext;
use serde::Serialize;
use serde_json::{json, Value as Json};

use crate::commands::Command;
use crate::errors::{ExError, ExErrorKind};
use crate::mapper::ModelMapper;

#[allow(clippy::result_large_err)]
fn to_json<T: Serialize>(value: T) -> Result<Json, ExError> {
    serde_json::to_value(value).map_err(|e| {
        ExError::new(ExErrorKind::Serialization).with_message(format!("cannot encode result: {}", e))
    })
}

/// Execute one command; operations without a result yield `null`
///
/// # Errors
///
/// Returns the error of the underlying mapper operation.
#[allow(clippy::result_large_err)]
pub fn apply(mapper: &mut ModelMapper, command: Command) -> Result<Json, ExError> {
    match command {
        Command::GetGraph { mesh_var, format } => to_json(mapper.get_graph(&mesh_var, &format)?),
        Command::SetGraph {
            app_value_expr,
            app_name,
            mesh_name,
            format,
            graph,
        } => {
            mapper.set_graph(&app_value_expr, &app_name, &mesh_name, &format, &graph)?;
            Ok(Json::Null)
        }
        Command::DeleteGraph { app_name, mesh_name } => {
            mapper.delete_graph(&app_name, mesh_name.as_deref())?;
            Ok(Json::Null)
        }
        Command::CreateVariable {
            name,
            type_name,
            frozen,
            value_expr,
        } => to_json(mapper.create_variable(&name, &type_name, frozen, &value_expr)?),
        Command::DeleteVariable { name } => {
            mapper.delete_variable(&name)?;
            Ok(Json::Null)
        }
        Command::RenameVariable { old_name, new_name } => {
            mapper.rename_variable(&old_name, &new_name)?;
            Ok(Json::Null)
        }
        Command::ChangeValues { assignments } => to_json(mapper.change_values(&assignments)?),
        Command::Instantiate(request) => to_json(mapper.instantiate(&request)?),
        Command::InstantiateTemplate {
            template,
            new_name,
            adjustments,
        } => to_json(mapper.instantiate_template(&template, &new_name, &adjustments)?),
        Command::GetOpenTemplateVariables { template } => {
            to_json(mapper.get_open_template_variables(&template)?)
        }
        Command::GetTemplates => to_json(mapper.get_templates()?),
        Command::GetUnusedProjects => to_json(mapper.get_unused_projects()?),
        Command::AddImports { projects } => to_json(mapper.add_imports(&projects)?),
        Command::RemoveImports { projects } => to_json(mapper.remove_imports(&projects)?),
        Command::GetVariableName {
            type_hint,
            display_name,
            version_hint,
        } => to_json(mapper.get_variable_name(&type_hint, &display_name, &version_hint)?),
    }
}

/// Run a remote invocation and render its outcome
///
/// Success renders as `{"result": ...}`, failure as
/// `{"exception": ..., "code": ...}`.
pub fn invoke(mapper: &mut ModelMapper, op: &str, args: &[String], ctx: &RequestContext) -> String {
    let span = tracing::info_span!(
        "invoke",
        op = op,
        request_id = %ctx.request_id,
        trace_id = ctx.trace_id.as_ref().map(|t| t.as_str()),
        span_id = ctx.span_id.as_ref().map(|s| s.as_str()),
    );
    let _guard = span.enter();

    let outcome = Command::from_invocation(op, args).and_then(|command| apply(mapper, command));
    let document = match outcome {
        Ok(result) => json!({ "result": result }),
        Err(err) => {
            let mut err = err.with_request_id(ctx.request_id.clone());
            if let Some(trace) = &ctx.trace_id {
                err = err.with_trace_id(trace.clone());
            }
            tracing::warn!(
                op = op,
                request_id = %ctx.request_id,
                err_code = err.code(),
                "invocation failed"
            );
            json!({
                "exception": err.to_string(),
                "code": err.code(),
                "request_id": ctx.request_id.as_str(),
            })
        }
    };
    document.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::MapperConfig;
    use crate::model::{Import, Project};
    use crate::ops::ModelStore;

    fn mapper() -> ModelMapper {
        let mut model = ModelStore::new();
        model
            .add_project(Project::new("PlatformConfiguration").with_import(Import::explicit("AllConstants")))
            .unwrap();
        model.add_project(Project::new("AllConstants")).unwrap();
        ModelMapper::new(model, MapperConfig::default())
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn call(mapper: &mut ModelMapper, op: &str, items: &[&str]) -> Json {
        let text = invoke(mapper, op, &args(items), &RequestContext::new());
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_apply_returns_null_for_void_operations() {
        let mut mapper = mapper();
        apply(
            &mut mapper,
            Command::CreateVariable {
                name: "x".to_string(),
                type_name: "Integer".to_string(),
                frozen: false,
                value_expr: "1".to_string(),
            },
        )
        .unwrap();
        let result = apply(&mut mapper, Command::DeleteVariable { name: "x".to_string() }).unwrap();
        assert_eq!(result, Json::Null);
    }

    #[test]
    fn test_invoke_renders_results() {
        let mut mapper = mapper();
        let created = call(&mut mapper, "create-variable", &["port", "Integer", "false", "80"]);
        assert_eq!(created["result"], "AllConstants::port");

        let changed = call(&mut mapper, "change-values", &[r#"{"port": "81"}"#]);
        assert_eq!(changed["result"]["applied"][0], "AllConstants::port");

        let name = call(&mut mapper, "get-variable-name", &["", "port", ""]);
        assert_eq!(name["result"], "port_1");
    }

    #[test]
    fn test_invoke_reports_failures_in_the_document() {
        let mut mapper = mapper();
        let ctx = RequestContext::new();
        let text = invoke(&mut mapper, "delete-variable", &args(&["missing"]), &ctx);
        let doc: Json = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["code"], "ERR_NOT_FOUND");
        assert_eq!(doc["request_id"], ctx.request_id.as_str());
        assert!(doc["exception"].as_str().unwrap().contains("delete-variable"));
        assert!(doc.get("result").is_none());

        let unknown = call(&mut mapper, "explode", &[]);
        assert_eq!(unknown["code"], "ERR_INVALID_INPUT");
    }
}
