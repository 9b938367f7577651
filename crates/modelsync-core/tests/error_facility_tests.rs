#![allow(clippy::unwrap_used)]

use modelsync_core::errors::{ExError, ExErrorKind, ModelError};
use modelsync_core_types::RequestId;

#[test]
fn test_model_errors_map_to_kinds() {
    let cases = vec![
        (
            ModelError::VariableNotFound { name: "x".to_string() },
            ExErrorKind::NotFound,
        ),
        (
            ModelError::NameCollision {
                name: "x".to_string(),
                project: "P".to_string(),
            },
            ExErrorKind::NameCollision,
        ),
        (
            ModelError::FrozenVariable { name: "x".to_string() },
            ExErrorKind::FrozenVariable,
        ),
        (
            ModelError::InvalidAdjustment { path: "t.a".to_string() },
            ExErrorKind::InvalidAdjustment,
        ),
        (
            ModelError::UnknownFormat { format: "svg".to_string() },
            ExErrorKind::UnknownFormat,
        ),
        (
            ModelError::ValidationFailed {
                messages: vec!["bad".to_string()],
            },
            ExErrorKind::ValidationFailed,
        ),
    ];
    for (err, kind) in cases {
        assert_eq!(ExError::from(err).kind(), kind);
    }
}

#[test]
fn test_context_is_kept_on_conversion() {
    let err = ExError::from(ModelError::NameCollision {
        name: "port".to_string(),
        project: "AllConstants".to_string(),
    });

    assert_eq!(err.variable(), Some("port"));
    assert_eq!(err.project(), Some("AllConstants"));
    assert_eq!(err.code(), "ERR_NAME_COLLISION");
}

#[test]
fn test_innermost_operation_wins() {
    let err = ExError::new(ExErrorKind::Persistence)
        .with_op("persist")
        .with_op("set-graph");

    assert_eq!(err.op(), Some("persist"));
}

#[test]
fn test_display_includes_code_operation_and_message() {
    let request = RequestId::from_string("req-1".to_string());
    let err = ExError::new(ExErrorKind::NotFound)
        .with_op("delete-variable")
        .with_message("Variable not found: x")
        .with_request_id(request.clone());

    assert_eq!(
        err.to_string(),
        "[ERR_NOT_FOUND] in operation 'delete-variable': Variable not found: x"
    );
    assert_eq!(err.request_id(), Some(&request));
}

#[test]
fn test_validation_findings_become_details() {
    let err = ExError::from(ModelError::ValidationFailed {
        messages: vec!["a".to_string(), "b".to_string()],
    });

    assert_eq!(err.details(), ["a".to_string(), "b".to_string()]);
}
