//! `getstreamio_sqs`: links a GetStream application to an Amazon SQS queue.
//!
//! The link is a singleton slot on the application, not a collection. The
//! queue URL and both credentials are sent together on every write; removing
//! the resource sends the empty triple.
//!
//! GetStream does not hand back settings in a form that identifies this
//! resource, so by default `read` returns the stored state unchanged and the
//! stored state can drift from the application. Setting `refresh_state` on
//! the provider reads the settings back on every refresh instead.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::client::{AppSettings, AppSettingsClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema, StringFormat};
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation::validate;

/// Resource type name.
pub const SQS_RESOURCE_TYPE: &str = "getstreamio_sqs";

/// Identifier assigned on create. The application holds a single SQS link,
/// so there is no upstream identifier to record.
pub const SQS_LINK_ID: &str = "getstreamio-sqs";

const SETTINGS_ATTRIBUTES: [&str; 3] = ["sqs_url", "sqs_access_key", "sqs_secret_key"];

/// State of a `getstreamio_sqs` resource.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqsResourceData {
    /// Resource identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Queue URL.
    #[serde(default)]
    pub sqs_url: Option<String>,
    /// Access key allowed to send to the queue.
    #[serde(default)]
    pub sqs_access_key: Option<String>,
    /// Secret key allowed to send to the queue.
    #[serde(default)]
    pub sqs_secret_key: Option<String>,
}

impl fmt::Debug for SqsResourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SqsResourceData")
            .field("id", &self.id)
            .field("sqs_url", &self.sqs_url)
            .field("sqs_access_key", &redact(&self.sqs_access_key))
            .field("sqs_secret_key", &redact(&self.sqs_secret_key))
            .finish()
    }
}

impl SqsResourceData {
    /// Decode resource state or configuration.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encode as resource state.
    pub fn to_value(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// The settings triple. Fails unless all three values are present.
    pub fn settings(&self) -> Result<AppSettings, ProviderError> {
        match (&self.sqs_url, &self.sqs_access_key, &self.sqs_secret_key) {
            (Some(url), Some(access_key), Some(secret_key)) => {
                Ok(AppSettings::sqs(url, access_key, secret_key))
            },
            _ => {
                let missing: Vec<&str> = SETTINGS_ATTRIBUTES
                    .iter()
                    .zip([&self.sqs_url, &self.sqs_access_key, &self.sqs_secret_key])
                    .filter(|(_, v)| v.is_none())
                    .map(|(name, _)| *name)
                    .collect();
                Err(ProviderError::Validation(format!(
                    "sqs_url, sqs_access_key and sqs_secret_key must be set together; missing {}",
                    missing.join(", ")
                )))
            },
        }
    }
}

/// Lifecycle adapter for the SQS link.
pub struct SqsResource {
    client: Arc<dyn AppSettingsClient>,
    refresh_state: bool,
}

impl SqsResource {
    /// Create the adapter around a shared client handle.
    pub fn new(client: Arc<dyn AppSettingsClient>) -> Self {
        Self {
            client,
            refresh_state: false,
        }
    }

    /// Read settings back from the application on `read`.
    pub fn with_refresh_state(mut self, refresh_state: bool) -> Self {
        self.refresh_state = refresh_state;
        self
    }

    /// Resource schema.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Add an SQS connection to the GetStream.io application")
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .with_description("Identifier")
                    .with_use_state_for_unknown(),
            )
            .with_attribute(
                "sqs_url",
                Attribute::required_string()
                    .with_format(StringFormat::Url)
                    .with_description("URL to send messages on the SQS queue"),
            )
            .with_attribute(
                "sqs_access_key",
                Attribute::required_string()
                    .sensitive()
                    .with_description("Access key with privileges to send message on the SQS queue"),
            )
            .with_attribute(
                "sqs_secret_key",
                Attribute::required_string()
                    .sensitive()
                    .with_description("Secret key with privileges to send message on the SQS queue"),
            )
    }

    /// Validate a resource configuration block.
    pub fn validate(config: &Value) -> Vec<Diagnostic> {
        validate(&Self::schema(), config)
    }

    /// Plan a create, update or delete.
    ///
    /// A null `proposed_state` plans a delete. Nothing forces replacement:
    /// every change is applied in place.
    pub fn plan(prior_state: Option<Value>, proposed_state: Value) -> Result<PlanResult, ProviderError> {
        if proposed_state.is_null() {
            let changes = match &prior_state {
                Some(prior) => AttributeChange::diff(Some(prior), &Value::Null, &all_attributes()),
                None => Vec::new(),
            };
            return Ok(PlanResult::with_changes(Value::Null, changes, false));
        }

        let mut planned = SqsResourceData::from_value(proposed_state)?;
        match prior_state {
            None => {
                planned.id = Some(SQS_LINK_ID.to_string());
                let planned = planned.to_value()?;
                let changes = AttributeChange::diff(None, &planned, &all_attributes());
                Ok(PlanResult::with_changes(planned, changes, false))
            },
            Some(prior) => {
                let prior_data = SqsResourceData::from_value(prior.clone())?;
                planned.id = prior_data.id.or_else(|| Some(SQS_LINK_ID.to_string()));
                let planned = planned.to_value()?;
                let changes = AttributeChange::diff(Some(&prior), &planned, &all_attributes());
                if changes.is_empty() {
                    Ok(PlanResult::no_change(prior))
                } else {
                    Ok(PlanResult::with_changes(planned, changes, false))
                }
            },
        }
    }

    /// Link the queue and return the new state.
    #[instrument(skip_all, fields(resource_type = SQS_RESOURCE_TYPE))]
    pub async fn create(&self, planned_state: Value) -> Result<Value, ProviderError> {
        let mut data = SqsResourceData::from_value(planned_state)?;
        let settings = data.settings()?;
        self.client.update_app_settings(&settings).await?;

        data.id = Some(SQS_LINK_ID.to_string());
        info!(sqs_url = settings.sqs_url(), "created SQS link");
        data.to_value()
    }

    /// Refresh the state.
    ///
    /// Returns `Value::Null` when refreshing finds the link removed upstream.
    #[instrument(skip_all, fields(resource_type = SQS_RESOURCE_TYPE))]
    pub async fn read(&self, current_state: Value) -> Result<Value, ProviderError> {
        if !self.refresh_state {
            debug!("SQS link state passed through unchanged");
            return Ok(current_state);
        }

        let mut data = SqsResourceData::from_value(current_state)?;
        let app = self.client.get_app_config().await?;
        if app.sqs_url.is_empty() {
            info!("SQS link no longer configured on the application");
            return Ok(Value::Null);
        }

        data.sqs_url = Some(app.sqs_url);
        data.sqs_access_key = Some(app.sqs_key);
        data.sqs_secret_key = Some(app.sqs_secret);
        debug!("SQS link state refreshed from application config");
        data.to_value()
    }

    /// Replace the link settings and return the new state.
    #[instrument(skip_all, fields(resource_type = SQS_RESOURCE_TYPE))]
    pub async fn update(&self, prior_state: Value, planned_state: Value) -> Result<Value, ProviderError> {
        let prior = SqsResourceData::from_value(prior_state)?;
        let mut data = SqsResourceData::from_value(planned_state)?;
        let settings = data.settings()?;
        self.client.update_app_settings(&settings).await?;

        data.id = data
            .id
            .or(prior.id)
            .or_else(|| Some(SQS_LINK_ID.to_string()));
        info!(sqs_url = settings.sqs_url(), "updated SQS link");
        data.to_value()
    }

    /// Unlink the queue by sending the empty triple.
    #[instrument(skip_all, fields(resource_type = SQS_RESOURCE_TYPE))]
    pub async fn delete(&self, current_state: Value) -> Result<(), ProviderError> {
        let data = SqsResourceData::from_value(current_state)?;
        self.client.update_app_settings(&AppSettings::cleared()).await?;
        info!(id = ?data.id, "removed SQS link");
        Ok(())
    }

    /// Import by identifier.
    ///
    /// Only `id` is populated; the settings are not recovered and show up as
    /// changes on the next plan.
    pub fn import(id: &str) -> Result<ImportedResource, ProviderError> {
        if id.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "import identifier must not be empty".to_string(),
            ));
        }
        let data = SqsResourceData {
            id: Some(id.to_string()),
            ..Default::default()
        };
        Ok(ImportedResource::new(SQS_RESOURCE_TYPE, data.to_value()?))
    }
}

fn all_attributes() -> [&'static str; 4] {
    ["id", SETTINGS_ATTRIBUTES[0], SETTINGS_ATTRIBUTES[1], SETTINGS_ATTRIBUTES[2]]
}
