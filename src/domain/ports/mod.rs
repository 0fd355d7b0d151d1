//! Port trait definitions for the reporting pipeline's collaborators.
//!
//! - `ControlPlaneClient`: outbound submission of state changes
//! - `TaskStateView`: read-only lookup of authoritative task state
//! - `StateStore`: durable write-through of acknowledged statuses

pub mod control_plane;
pub mod state_store;
pub mod state_view;

pub use control_plane::{
    AttachmentStateChangeRequest, ContainerStateChangeRequest, ControlPlaneClient,
    ManagedAgentStateChangeRequest, SubmitError, TaskStateChangeRequest,
};
pub use state_store::{NoopStateStore, StateStore};
pub use state_view::TaskStateView;
