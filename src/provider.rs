//! The GetStream provider: configuration and dispatch to resources.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::{AppSettingsClient, StreamClient};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resources::{SqsResource, SQS_RESOURCE_TYPE};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

#[derive(Clone)]
struct Configured {
    client: Arc<dyn AppSettingsClient>,
    refresh_state: bool,
}

/// Provider managing GetStream.io application settings.
///
/// Resource operations need a client handle, which is built by
/// [`ProviderService::configure`] or supplied up front with
/// [`GetStreamProvider::with_client`].
#[derive(Default)]
pub struct GetStreamProvider {
    configured: RwLock<Option<Configured>>,
}

impl GetStreamProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider already bound to a client handle.
    pub fn with_client(client: Arc<dyn AppSettingsClient>) -> Self {
        Self {
            configured: RwLock::new(Some(Configured {
                client,
                refresh_state: false,
            })),
        }
    }

    /// Read settings back from upstream on every refresh.
    ///
    /// Fails on an unconfigured provider; `configure` sets the mode from the
    /// provider block instead.
    pub async fn set_refresh_state(&self, refresh_state: bool) -> Result<(), ProviderError> {
        match self.configured.write().await.as_mut() {
            Some(configured) => {
                configured.refresh_state = refresh_state;
                Ok(())
            },
            None => Err(not_configured()),
        }
    }

    async fn sqs(&self) -> Result<SqsResource, ProviderError> {
        let configured = self
            .configured
            .read()
            .await
            .clone()
            .ok_or_else(not_configured)?;
        Ok(SqsResource::new(configured.client).with_refresh_state(configured.refresh_state))
    }
}

fn not_configured() -> ProviderError {
    ProviderError::Configuration(
        "provider must be configured before managing resources".to_string(),
    )
}

fn ensure_known(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == SQS_RESOURCE_TYPE {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

fn object_or_empty(config: Value) -> Value {
    if config.is_null() {
        json!({})
    } else {
        config
    }
}

#[async_trait::async_trait]
impl ProviderService for GetStreamProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(SQS_RESOURCE_TYPE, SqsResource::schema())
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = object_or_empty(config);
        let mut diagnostics = validate(&ProviderConfig::schema(), &config);
        if !has_errors(&diagnostics) {
            if let Err(e) = ProviderConfig::from_value(config) {
                diagnostics.push(e.to_diagnostic("Invalid provider configuration"));
            }
        }
        Ok(diagnostics)
    }

    /// A rejected configuration also drops any earlier client, so resource
    /// operations fail until a valid configuration is applied.
    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = match ProviderConfig::from_value(object_or_empty(config)) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "provider configuration rejected");
                *self.configured.write().await = None;
                return Ok(vec![e.to_diagnostic("Invalid provider configuration")]);
            },
        };
        let client = match StreamClient::from_config(&config) {
            Ok(client) => client,
            Err(e) => {
                let e = ProviderError::from(e);
                warn!(error = %e, "unable to build API client");
                *self.configured.write().await = None;
                return Ok(vec![e.to_diagnostic("Unable to create GetStream client")]);
            },
        };

        *self.configured.write().await = Some(Configured {
            client: Arc::new(client),
            refresh_state: config.refresh_state,
        });
        info!(
            base_url = %config.base_url,
            refresh_state = config.refresh_state,
            "provider configured"
        );
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        ensure_known(resource_type)?;
        Ok(SqsResource::validate(&config))
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        ensure_known(resource_type)?;
        match version {
            0 => Ok(state),
            other => Err(ProviderError::Unimplemented(format!(
                "no state upgrade from schema version {} for {}",
                other, resource_type
            ))),
        }
    }

    #[instrument(skip(self, prior_state, proposed_state, _config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        ensure_known(resource_type)?;
        let plan = SqsResource::plan(prior_state, proposed_state)?;
        debug!(changes = plan.changes.len(), "plan computed");
        Ok(plan)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        ensure_known(resource_type)?;
        self.sqs().await?.create(planned_state).await
    }

    #[instrument(skip(self, current_state))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        ensure_known(resource_type)?;
        self.sqs().await?.read(current_state).await
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        ensure_known(resource_type)?;
        self.sqs().await?.update(prior_state, planned_state).await
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        ensure_known(resource_type)?;
        self.sqs().await?.delete(current_state).await
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        ensure_known(resource_type)?;
        Ok(vec![SqsResource::import(id)?])
    }
}
