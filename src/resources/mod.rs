//! Resources managed by the provider.

pub mod sqs;

pub use sqs::{SqsResource, SqsResourceData, SQS_LINK_ID, SQS_RESOURCE_TYPE};
