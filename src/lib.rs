//! Muster - task state-change reporting for a container agent.
//!
//! Accepts task, container, managed-agent, and network-attachment state
//! changes, batches them per task, and reports them to a remote control
//! plane in strict per-task order with bounded concurrency, retry under
//! exponential backoff, and deduplication of already-acknowledged
//! transitions.

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{AttachmentError, ReporterError, StoreError};
pub use services::{AttachmentReporter, ConfigError, ReporterConfig, TaskStateReporter};
