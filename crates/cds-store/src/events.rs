//! External change notifications
//!
//! Delivered by whatever watches the server (push channel, poller) on a
//! `tokio::sync::mpsc` channel drained by [`crate::Session::run_events`].

use cds_cache::CacheKey;
use cds_model::{EntityKind, ProjectKey};
use std::fmt;

/// What an external event is about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// The project itself
    Project(ProjectKey),
    /// One child entity of a project
    Child {
        /// Entity kind
        kind: EntityKind,
        /// Project and name
        key: CacheKey,
    },
}

impl EventTarget {
    /// Child entity target
    #[must_use]
    pub fn child(kind: EntityKind, key: CacheKey) -> Self {
        Self::Child { kind, key }
    }

    /// Project the target belongs to
    #[must_use]
    pub fn project(&self) -> &ProjectKey {
        match self {
            Self::Project(key) => key,
            Self::Child { key, .. } => &key.project,
        }
    }
}

impl fmt::Display for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(key) => write!(f, "project {key}"),
            Self::Child { kind, key } => write!(f, "{kind} {key}"),
        }
    }
}

/// Change notification from outside the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalEvent {
    /// Someone else changed the entity; flag it, refetch lazily
    Changed(EventTarget),
    /// Refetch now
    Resync(EventTarget),
}

impl ExternalEvent {
    /// Target of the event
    #[must_use]
    pub fn target(&self) -> &EventTarget {
        match self {
            Self::Changed(target) | Self::Resync(target) => target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_display_and_project() {
        let project = ProjectKey::new("test1").unwrap();
        let target = EventTarget::child(EntityKind::Workflow, CacheKey::new(project.clone(), "wf"));
        assert_eq!(target.to_string(), "workflow test1/wf");
        assert_eq!(target.project(), &project);

        let event = ExternalEvent::Changed(EventTarget::Project(project));
        assert_eq!(event.target().to_string(), "project test1");
    }
}
