use modelsync_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias for decision-model operations
pub type Result<T> = std::result::Result<T, ModelError>;

// ========== Error Facility ==========

/// Classification of errors surfaced to shell callers
///
/// Each kind maps to a stable code that remote clients can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    /// Variable, project, type, template or mesh does not exist
    NotFound,
    /// Create or rename into a name already used in the target project
    NameCollision,
    /// Assignment to a frozen variable
    FrozenVariable,
    /// Template adjustment path is not an open slot
    InvalidAdjustment,
    /// The decision model rejected the staged batch
    ValidationFailed,
    /// No graph codec registered under the requested name
    UnknownFormat,
    /// An import edge would close a cycle
    CyclicImport,
    /// Malformed arguments
    InvalidInput,
    /// A value expression could not be parsed
    InvalidExpression,
    /// A value does not fit the declared type
    TypeMismatch,
    /// The owning project may not be modified through the shell
    NotModifiable,
    Io,
    Serialization,
    Persistence,
    /// The instantiation pipeline failed
    ExternalService,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::NameCollision => "ERR_NAME_COLLISION",
            ExErrorKind::FrozenVariable => "ERR_FROZEN_VARIABLE",
            ExErrorKind::InvalidAdjustment => "ERR_INVALID_ADJUSTMENT",
            ExErrorKind::ValidationFailed => "ERR_VALIDATION_FAILED",
            ExErrorKind::UnknownFormat => "ERR_UNKNOWN_FORMAT",
            ExErrorKind::CyclicImport => "ERR_CYCLIC_IMPORT",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidExpression => "ERR_INVALID_EXPRESSION",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::NotModifiable => "ERR_NOT_MODIFIABLE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error returned by every shell-facing operation
///
/// Carries the classification, the operation that failed, the decision-model
/// entities involved and, for validation failures, the individual messages.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    variable: Option<String>,
    project: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    details: Vec<String>,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            variable: None,
            project: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            details: Vec::new(),
            source: None,
        }
    }

    /// Add operation context
    ///
    /// An operation already recorded is kept, so the innermost op wins.
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        if self.op.is_none() {
            self.op = Some(op.into());
        }
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        self.variable = Some(name.into());
        self
    }

    pub fn with_project(mut self, name: impl Into<String>) -> Self {
        self.project = Some(name.into());
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach individual findings (validation messages)
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Wrap the root cause
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(variable) = &self.variable {
            write!(f, " (variable: {})", variable)?;
        }
        if let Some(project) = &self.project {
            write!(f, " (project: {})", project)?;
        }
        if !self.details.is_empty() {
            write!(f, " [{}]", self.details.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy of the decision model and the synchronization engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    // ===== Lookup Errors =====
    #[error("Variable not found: {name}")]
    VariableNotFound { name: String },

    #[error("Project not found: {name}")]
    ProjectNotFound { name: String },

    #[error("Type not found: {name}")]
    TypeNotFound { name: String },

    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("Mesh or application not found: {name}")]
    GraphNotFound { name: String },

    // ===== Structural Errors =====
    #[error("Name {name} is already used in project {project}")]
    NameCollision { name: String, project: String },

    #[error("Variable {name} is frozen")]
    FrozenVariable { name: String },

    #[error("Project {project} may not be modified")]
    ProjectNotModifiable { project: String },

    #[error("Import of {import} from {project} would create a cycle")]
    CyclicImport { project: String, import: String },

    #[error("Project {project} imports unknown project {import}")]
    UnresolvedImport { project: String, import: String },

    // ===== Value Errors =====
    #[error("Invalid expression '{expr}': {reason}")]
    InvalidExpression { expr: String, reason: String },

    #[error("Type mismatch for {variable}: {reason}")]
    TypeMismatch { variable: String, reason: String },

    #[error("Variable {variable} references unknown or invisible {target}")]
    UnresolvedReference { variable: String, target: String },

    #[error("Adjustment {path} does not address an open slot")]
    InvalidAdjustment { path: String },

    // ===== Graph Errors =====
    #[error("Unknown graph format: {format}")]
    UnknownFormat { format: String },

    #[error("Cannot decode {format} graph: {reason}")]
    GraphDecode { format: String, reason: String },

    #[error("Cannot encode {format} graph: {reason}")]
    GraphEncode { format: String, reason: String },

    // ===== Batch Errors =====
    #[error("Validation failed with {} finding(s)", messages.len())]
    ValidationFailed { messages: Vec<String> },

    #[error("Persistence failed: {reason}")]
    Persistence { reason: String },

    #[error("Instantiation failed: {reason}")]
    Instantiation { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },
}

impl From<ModelError> for ExError {
    fn from(err: ModelError) -> Self {
        let message = err.to_string();
        match err {
            ModelError::VariableNotFound { name } => ExError::new(ExErrorKind::NotFound)
                .with_variable(name)
                .with_message(message),

            ModelError::ProjectNotFound { name } => ExError::new(ExErrorKind::NotFound)
                .with_project(name)
                .with_message(message),

            ModelError::TypeNotFound { .. } | ModelError::GraphNotFound { .. } => {
                ExError::new(ExErrorKind::NotFound).with_message(message)
            }

            ModelError::TemplateNotFound { name } => ExError::new(ExErrorKind::NotFound)
                .with_variable(name)
                .with_message(message),

            ModelError::NameCollision { name, project } => {
                ExError::new(ExErrorKind::NameCollision)
                    .with_variable(name)
                    .with_project(project)
                    .with_message(message)
            }

            ModelError::FrozenVariable { name } => ExError::new(ExErrorKind::FrozenVariable)
                .with_variable(name)
                .with_message(message),

            ModelError::ProjectNotModifiable { project } => {
                ExError::new(ExErrorKind::NotModifiable)
                    .with_project(project)
                    .with_message(message)
            }

            ModelError::CyclicImport { project, .. } => ExError::new(ExErrorKind::CyclicImport)
                .with_project(project)
                .with_message(message),

            ModelError::UnresolvedImport { project, .. } => ExError::new(ExErrorKind::NotFound)
                .with_project(project)
                .with_message(message),

            ModelError::InvalidExpression { .. } => {
                ExError::new(ExErrorKind::InvalidExpression).with_message(message)
            }

            ModelError::TypeMismatch { variable, .. } => ExError::new(ExErrorKind::TypeMismatch)
                .with_variable(variable)
                .with_message(message),

            ModelError::UnresolvedReference { variable, .. } => {
                ExError::new(ExErrorKind::ValidationFailed)
                    .with_variable(variable)
                    .with_message(message)
            }

            ModelError::InvalidAdjustment { .. } => {
                ExError::new(ExErrorKind::InvalidAdjustment).with_message(message)
            }

            ModelError::UnknownFormat { .. } => {
                ExError::new(ExErrorKind::UnknownFormat).with_message(message)
            }

            ModelError::GraphDecode { .. } | ModelError::GraphEncode { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            ModelError::ValidationFailed { messages } => {
                ExError::new(ExErrorKind::ValidationFailed)
                    .with_message(message)
                    .with_details(messages)
            }

            ModelError::Persistence { .. } => {
                ExError::new(ExErrorKind::Persistence).with_message(message)
            }

            ModelError::Instantiation { .. } => {
                ExError::new(ExErrorKind::ExternalService).with_message(message)
            }

            ModelError::InvalidInput { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_op_keeps_innermost() {
        let err = ExError::new(ExErrorKind::NotFound)
            .with_op("inner")
            .with_op("outer");
        assert_eq!(err.op(), Some("inner"));
    }

    #[test]
    fn test_display_includes_code_and_context() {
        let err = ExError::new(ExErrorKind::NameCollision)
            .with_op("create-variable")
            .with_variable("x")
            .with_project("AllConstants")
            .with_message("taken");
        let text = err.to_string();
        assert!(text.starts_with("[ERR_NAME_COLLISION]"));
        assert!(text.contains("create-variable"));
        assert!(text.contains("variable: x"));
        assert!(text.contains("project: AllConstants"));
    }

    #[test]
    fn test_validation_failed_carries_messages() {
        let err: ExError = ModelError::ValidationFailed {
            messages: vec!["a".to_string(), "b".to_string()],
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::ValidationFailed);
        assert_eq!(err.details(), ["a".to_string(), "b".to_string()]);
        assert!(err.message().contains("2 finding"));
    }
}
