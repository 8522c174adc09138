//! Per-kind stores

mod application;
mod environment;
mod pipeline;
mod project;
mod workflow;

pub use application::ApplicationsStore;
pub use environment::EnvironmentsStore;
pub use pipeline::PipelinesStore;
pub use project::ProjectStore;
pub use workflow::WorkflowsStore;
