//! Hemmer provider for GetStream.io
//!
//! Manages the SQS link of a GetStream chat application as the
//! `getstreamio_sqs` resource. The orchestrator drives the provider through
//! the [`ProviderService`] trait; each lifecycle call makes at most one
//! request to the GetStream API.
//!
//! # Overview
//!
//! - **ProviderService trait**: the lifecycle surface (schema, configure,
//!   plan, create/read/update/delete, import)
//! - **GetStreamProvider**: provider configuration and dispatch
//! - **Resources**: `getstreamio_sqs`, which writes the queue URL and both
//!   credentials as one settings update
//! - **Client**: the `AppSettingsClient` seam and its `reqwest` implementation
//! - **Schema & validation**: attribute schemas and diagnostics
//! - **Logging**: `tracing` setup writing to stderr
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_provider_getstream::{init_logging, GetStreamProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = GetStreamProvider::new();
//!     provider
//!         .configure(json!({"api_key": "...", "api_secret": "..."}))
//!         .await?;
//!
//!     let plan = provider
//!         .plan(
//!             "getstreamio_sqs",
//!             None,
//!             json!({
//!                 "sqs_url": "https://sqs.us-east-1.amazonaws.com/123456789012/chat-events",
//!                 "sqs_access_key": "...",
//!                 "sqs_secret_key": "..."
//!             }),
//!             json!({}),
//!         )
//!         .await?;
//!     let state = provider.create("getstreamio_sqs", plan.planned_state).await?;
//!     tracing::info!(id = %state["id"], "linked");
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Upstream failures are returned as [`ProviderError`] and never abort the
//! process. A failed create or update returns no state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{AppConfig, AppSettings, AppSettingsClient, ClientError, StreamClient};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::GetStreamProvider;
pub use resources::{SqsResource, SqsResourceData, SQS_LINK_ID, SQS_RESOURCE_TYPE};
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
