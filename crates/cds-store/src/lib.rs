//! CDS Console Session Stores
//!
//! Keeps a console session in step with the CDS API: cached entities,
//! optimistic writes, the project's name indexes and local edit overlays
//! for repository-sourced entities.
//!
//! # Core Concepts
//!
//! - [`Session`]: owns every store; dispatches [`Command`]s
//! - [`MutationExecutor`]: overlay short-circuit, remote write, merge, rekey
//! - [`ProjectionUpdater`]: keeps the project's name indexes in step with
//!   child renames, creations and deletions
//! - [`OverlaySet`]: edit overlays of one kind, keyed like the cache
//! - [`ExternalEvent`]: changes made elsewhere, flagged or refetched
//!
//! # Example
//!
//! ```rust,ignore
//! use cds_store::{ApplicationCommand, Session, SessionConfig};
//!
//! let session = Session::from_config(SessionConfig::load(path)?)?;
//! session.switch_project(&key, &[LoadOpt::ApplicationNames]).await?;
//! session
//!     .dispatch(ApplicationCommand::Update { target, changes })
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod command;
mod config;
mod error;
mod events;
mod executor;
mod overlays;
mod projection;
mod session;
mod stores;

pub use command::{
    ApplicationCommand, Command, EnvironmentCommand, Outcome, PipelineCommand, ProjectCommand,
    WorkflowCommand,
};
pub use config::SessionConfig;
pub use error::{StoreError, StoreResult};
pub use events::{EventTarget, ExternalEvent};
pub use executor::{Applied, Commit, MutationExecutor};
pub use overlays::OverlaySet;
pub use projection::{apply_child_change, apply_child_removal, Projection, ProjectionUpdater};
pub use session::Session;
pub use stores::{ApplicationsStore, EnvironmentsStore, PipelinesStore, ProjectStore, WorkflowsStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
