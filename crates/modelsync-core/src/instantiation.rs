//! Instantiation pipeline interface
//!
//! Artifact generation runs outside this crate; the mapper validates the model
//! and hands it over together with the requested mode.

use std::fmt;
use std::str::FromStr;

use crate::errors::{ExError, ExErrorKind};
use crate::ops::ModelStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstantiationMode {
    /// Applications with all dependencies
    Apps,
    /// Applications only, producing downloadable templates
    AppsNoDeps,
    /// Service interfaces
    Interfaces,
}

impl InstantiationMode {
    /// Start rule of the generation run
    pub fn start_rule(&self) -> &'static str {
        match self {
            InstantiationMode::Apps => "generateApps",
            InstantiationMode::AppsNoDeps => "generateAppsNoDeps",
            InstantiationMode::Interfaces => "generateInterfaces",
        }
    }
}

impl fmt::Display for InstantiationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstantiationMode::Apps => "apps",
            InstantiationMode::AppsNoDeps => "apps-no-deps",
            InstantiationMode::Interfaces => "interfaces",
        })
    }
}

impl FromStr for InstantiationMode {
    type Err = ExError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "apps" => Ok(InstantiationMode::Apps),
            "apps-no-deps" => Ok(InstantiationMode::AppsNoDeps),
            "interfaces" => Ok(InstantiationMode::Interfaces),
            other => Err(ExError::new(ExErrorKind::InvalidInput)
                .with_message(format!("unknown instantiation mode {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiationRequest {
    pub mode: InstantiationMode,
    /// Restrict generation to one application
    pub app_id: Option<String>,
    /// Uploaded implementation archive to integrate
    pub code_file: Option<String>,
}

impl InstantiationRequest {
    pub fn new(mode: InstantiationMode) -> Self {
        Self {
            mode,
            app_id: None,
            code_file: None,
        }
    }

    pub fn for_app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_code_file(mut self, code_file: impl Into<String>) -> Self {
        self.code_file = Some(code_file.into());
        self
    }
}

/// Generates artifacts from a validated decision model
pub trait InstantiationPipeline: Send + Sync {
    /// Returns the ids of the produced artifacts
    ///
    /// # Errors
    ///
    /// Returns `ExternalService` if generation fails.
    #[allow(clippy::result_large_err)]
    fn instantiate(
        &self,
        request: &InstantiationRequest,
        model: &ModelStore,
    ) -> Result<Vec<String>, ExError>;
}

/// Default pipeline: no generator configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePipeline;

impl InstantiationPipeline for UnavailablePipeline {
    #[allow(clippy::result_large_err)]
    fn instantiate(&self, _: &InstantiationRequest, _: &ModelStore) -> Result<Vec<String>, ExError> {
        Err(ExError::new(ExErrorKind::ExternalService)
            .with_message("No instantiation pipeline configured"))
    }
}

/// Returns a fixed artifact list for every request
#[derive(Debug, Clone, Default)]
pub struct FixedPipeline {
    artifacts: Vec<String>,
}

impl FixedPipeline {
    pub fn new(artifacts: Vec<String>) -> Self {
        Self { artifacts }
    }
}

impl InstantiationPipeline for FixedPipeline {
    #[allow(clippy::result_large_err)]
    fn instantiate(&self, _: &InstantiationRequest, _: &ModelStore) -> Result<Vec<String>, ExError> {
        Ok(self.artifacts.clone())
    }
}
