//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] through the same call
//! sequences the orchestrator uses, and [`MockAppSettingsClient`] stands in
//! for the GetStream API.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hemmer_provider_getstream::testing::{MockAppSettingsClient, ProviderTester};
//! use hemmer_provider_getstream::GetStreamProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_link() {
//!     let client = Arc::new(MockAppSettingsClient::new());
//!     let tester = ProviderTester::new(GetStreamProvider::with_client(client.clone()));
//!
//!     let state = tester
//!         .lifecycle_create("getstreamio_sqs", json!({
//!             "sqs_url": "one", "sqs_access_key": "two", "sqs_secret_key": "three"
//!         }))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["sqs_url"], "one");
//!     assert_eq!(client.updates().len(), 1);
//! }
//! ```

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{AppConfig, AppSettings, AppSettingsClient, ClientError};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness for provider implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Validate provider configuration.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Run a full create lifecycle: plan → create → read.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// When the plan has no changes, nothing is applied and the prior state
    /// is read back, as the orchestrator would do.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        if plan_result.changes.is_empty() {
            return self.read(resource_type, prior_state).await;
        }
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| d.is_error() && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

#[derive(Default)]
struct MockState {
    updates: Vec<AppSettings>,
    config_reads: usize,
    app: Option<AppSettings>,
    update_failure: Option<(u16, String)>,
    read_failure: Option<(u16, String)>,
}

/// In-memory [`AppSettingsClient`] that records calls.
///
/// Successful updates are applied to the in-memory application, so
/// `get_app_config` reflects the last settings written.
#[derive(Default)]
pub struct MockAppSettingsClient {
    state: Mutex<MockState>,
}

impl MockAppSettingsClient {
    /// A client whose application has no SQS link.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every settings triple sent so far, in order, including failed attempts.
    pub fn updates(&self) -> Vec<AppSettings> {
        self.lock().updates.clone()
    }

    /// Number of `get_app_config` calls.
    pub fn config_reads(&self) -> usize {
        self.lock().config_reads
    }

    /// Settings currently held by the application.
    pub fn current_settings(&self) -> Option<AppSettings> {
        self.lock().app.clone()
    }

    /// Replace the application's settings out of band.
    pub fn set_app_config(&self, settings: AppSettings) {
        self.lock().app = Some(settings);
    }

    /// Make every following update fail with an API error.
    pub fn fail_updates_with(&self, status: u16, message: impl Into<String>) {
        self.lock().update_failure = Some((status, message.into()));
    }

    /// Make every following config read fail with an API error.
    pub fn fail_config_reads_with(&self, status: u16, message: impl Into<String>) {
        self.lock().read_failure = Some((status, message.into()));
    }

    /// Let calls succeed again.
    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.update_failure = None;
        state.read_failure = None;
    }
}

fn api_error((status, message): (u16, String)) -> ClientError {
    ClientError::Api {
        status,
        code: -1,
        message,
    }
}

#[async_trait]
impl AppSettingsClient for MockAppSettingsClient {
    async fn update_app_settings(&self, settings: &AppSettings) -> Result<(), ClientError> {
        let mut state = self.lock();
        state.updates.push(settings.clone());
        if let Some(failure) = state.update_failure.clone() {
            return Err(api_error(failure));
        }
        state.app = Some(settings.clone());
        Ok(())
    }

    async fn get_app_config(&self) -> Result<AppConfig, ClientError> {
        let mut state = self.lock();
        state.config_reads += 1;
        if let Some(failure) = state.read_failure.clone() {
            return Err(api_error(failure));
        }
        Ok(state
            .app
            .as_ref()
            .map(|app| AppConfig {
                sqs_url: app.sqs_url().to_string(),
                sqs_key: app.sqs_key().to_string(),
                sqs_secret: app.sqs_secret().to_string(),
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_applies_updates() {
        let client = MockAppSettingsClient::new();
        assert_eq!(client.get_app_config().await.unwrap(), AppConfig::default());

        client
            .update_app_settings(&AppSettings::sqs("u", "k", "s"))
            .await
            .unwrap();
        let config = client.get_app_config().await.unwrap();
        assert_eq!(config.sqs_url, "u");
        assert_eq!(client.config_reads(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure_records_attempt_but_keeps_app() {
        let client = MockAppSettingsClient::new();
        client.set_app_config(AppSettings::sqs("u", "k", "s"));
        client.fail_updates_with(500, "boom");

        assert!(client
            .update_app_settings(&AppSettings::cleared())
            .await
            .is_err());
        assert_eq!(client.updates(), vec![AppSettings::cleared()]);
        assert_eq!(client.current_settings(), Some(AppSettings::sqs("u", "k", "s")));

        client.clear_failures();
        assert!(client
            .update_app_settings(&AppSettings::cleared())
            .await
            .is_ok());
    }

    #[test]
    fn test_check_diagnostics_ignores_warnings() {
        assert!(check_diagnostics(vec![Diagnostic::warning("heads up")]).is_ok());
        assert!(check_diagnostics(vec![Diagnostic::error("nope")]).is_err());
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Invalid URL for attribute 'sqs_url'")];
        assert_error_contains(&diagnostics, "sqs_url");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("sqs_url"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("sqs_url"));
        assert!(display.contains("More info"));
    }
}
