//! CDS Console Edit Overlays
//!
//! Repository-sourced entities ("as code") are edited locally: every edit
//! goes to a draft instead of the server, until the edits are published
//! through the repository.
//!
//! # Core Concepts
//!
//! - [`SyntheticRef`]: stable reference to a draft part, assigned at entry
//! - [`Arena`]: parts of one kind keyed by reference
//! - [`EditOverlay`]: `Canonical` / `Active { draft, changed }` state machine
//! - [`WorkflowDraft`], [`PipelineDraft`], [`EnvironmentDraft`]: drafts per kind
//!
//! # Example
//!
//! ```rust,ignore
//! use cds_overlay::{EditOverlay, WorkflowDraft};
//!
//! let mut overlay = EditOverlay::<WorkflowDraft>::entered(&workflow);
//! overlay.mutate(|draft| draft.remove_node(&node_ref))?;
//! assert!(overlay.changed());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod arena;
mod environment;
mod error;
mod overlay;
mod pipeline;
mod reference;
mod workflow;

pub use arena::Arena;
pub use environment::EnvironmentDraft;
pub use error::{OverlayError, OverlayResult};
pub use overlay::{Draft, EditOverlay, OverlayState, SyncOutcome};
pub use pipeline::PipelineDraft;
pub use reference::{RefAllocator, SyntheticRef};
pub use workflow::WorkflowDraft;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
