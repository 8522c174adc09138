//! CDS Console Model
//!
//! Typed representations of the entities served by the CDS API, as the
//! console caches them.
//!
//! # Core Concepts
//!
//! - [`Project`]: the scope every other entity lives in, carrying lightweight
//!   [`IdName`] indexes of its children
//! - [`Entity`]: trait shared by [`Application`], [`Pipeline`], [`Workflow`]
//!   and [`Environment`], including the response merge rules
//! - [`EntityKind`]: closed set of child kinds
//!
//! # Example
//!
//! ```rust,ignore
//! use cds_model::{Application, Entity};
//!
//! let prior = Application::named("app1");
//! let response: Application = serde_json::from_str(body)?;
//! let merged = Application::merge_response(&prior, response)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod application;
mod common;
mod entity;
mod environment;
mod error;
mod kind;
mod pipeline;
mod project;
mod summary;
mod workflow;

pub use application::{Application, VcsStrategy, MASKED_PASSWORD};
pub use common::{
    AsCodeEvent, Audit, Group, GroupPermission, IntegrationModel, Key, Permission,
    ProjectIntegration, Usage, Variable,
};
pub use entity::{overlay_response, Entity};
pub use environment::Environment;
pub use error::ModelError;
pub use kind::{EntityKind, ProjectKey};
pub use pipeline::{Action, Job, Parameter, Pipeline, Stage};
pub use project::{LoadOpt, Project};
pub use summary::{IdName, Label};
pub use workflow::{
    NodeContext, NodeType, WNode, WNodeHook, WNodeJoinParent, WNodeTrigger, Workflow,
    WorkflowData, WorkflowNotification,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
