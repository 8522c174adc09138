//! Name-index projections of child entities inside the loaded project
//!
//! The project keeps, per child kind, a list of [`IdName`] summaries and
//! optionally the hydrated entities. Both are updated in the same call so
//! their membership never diverges.

use cds_model::{Entity, EntityKind, IdName, Project, ProjectKey};
use parking_lot::RwLock;
use std::sync::Arc;

/// Slot holding the loaded project, shared by the project store and the updater
pub(crate) type ProjectSlot = Arc<RwLock<Option<Arc<Project>>>>;

/// What a projection update did to the name index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// The entry named like the previous name was updated
    Updated,
    /// No entry had the previous name but one already had the new name
    Replaced,
    /// No entry matched; a new one was appended
    Appended,
    /// The change concerns a project that is not loaded
    Ignored,
}

/// Apply a child change to the name index of `kind`
///
/// Looks up `previous_name`, falls back to the new name, and appends when
/// neither exists. Applying the same change twice leaves the index as the
/// first application did.
pub fn apply_child_change(
    project: &mut Project,
    kind: EntityKind,
    previous_name: &str,
    summary: &IdName,
) -> Projection {
    let names = project.names_mut(kind);
    if let Some(entry) = names.iter_mut().find(|e| e.name == previous_name) {
        entry.apply(summary);
        return Projection::Updated;
    }
    if let Some(entry) = names.iter_mut().find(|e| e.name == summary.name) {
        entry.apply(summary);
        return Projection::Replaced;
    }
    tracing::warn!(
        project = %project.key,
        %kind,
        previous_name,
        name = %summary.name,
        "name index had no entry for changed entity; appending"
    );
    project.names_mut(kind).push(summary.clone());
    Projection::Appended
}

/// Remove an entry from the name index of `kind`
///
/// Returns whether an entry was removed.
pub fn apply_child_removal(project: &mut Project, kind: EntityKind, name: &str) -> bool {
    let names = project.names_mut(kind);
    let before = names.len();
    names.retain(|e| e.name != name);
    before != names.len()
}

/// Keeps the loaded project's indexes in step with child mutations
#[derive(Debug, Clone)]
pub struct ProjectionUpdater {
    slot: ProjectSlot,
}

impl ProjectionUpdater {
    pub(crate) fn new(slot: ProjectSlot) -> Self {
        Self { slot }
    }

    /// A child entity was created or changed
    ///
    /// `previous_name` is the name the entity had before the change, or its
    /// name for a creation.
    pub fn on_child_changed<E: Entity>(
        &self,
        project: &ProjectKey,
        previous_name: &str,
        entity: &E,
    ) -> Projection {
        self.update(project, |p| {
            let projection = apply_child_change(p, E::KIND, previous_name, &entity.summary());
            if let Some(hydrated) = E::hydrated_in(p).as_mut() {
                let position = hydrated
                    .iter()
                    .position(|e| e.name() == previous_name)
                    .or_else(|| hydrated.iter().position(|e| e.name() == entity.name()));
                match position {
                    Some(i) => hydrated[i] = entity.clone(),
                    None => hydrated.push(entity.clone()),
                }
            }
            projection
        })
        .unwrap_or(Projection::Ignored)
    }

    /// A child entity was deleted
    pub fn on_child_removed<E: Entity>(&self, project: &ProjectKey, name: &str) -> Projection {
        self.update(project, |p| {
            let removed = apply_child_removal(p, E::KIND, name);
            if let Some(hydrated) = E::hydrated_in(p).as_mut() {
                hydrated.retain(|e| e.name() != name);
            }
            if removed {
                Projection::Updated
            } else {
                Projection::Ignored
            }
        })
        .unwrap_or(Projection::Ignored)
    }

    /// Run `f` on a copy of the project and publish the copy
    ///
    /// Readers holding the previous `Arc<Project>` keep seeing it unchanged.
    fn update<R>(&self, project: &ProjectKey, f: impl FnOnce(&mut Project) -> R) -> Option<R> {
        let mut slot = self.slot.write();
        let current = slot.as_ref().filter(|p| &p.key == project)?;
        let mut next = Project::clone(current);
        let result = f(&mut next);
        *slot = Some(Arc::new(next));
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cds_model::{Application, Label};
    use pretty_assertions::assert_eq;

    fn project() -> Project {
        let mut project = Project::new(ProjectKey::new("test1").unwrap(), "Test 1");
        project.application_names = Some(vec![IdName::named("app1")]);
        project
    }

    fn slot_with(project: Project) -> ProjectSlot {
        Arc::new(RwLock::new(Some(Arc::new(project))))
    }

    #[test]
    fn rename_updates_in_place() {
        let mut p = project();
        let mut summary = IdName::named("app1bis");
        summary.description = Some("desc".to_string());
        summary.labels = Some(vec![Label::new(1, "prod", "#f00")]);

        assert_eq!(
            apply_child_change(&mut p, EntityKind::Application, "app1", &summary),
            Projection::Updated
        );
        let names = p.names(EntityKind::Application).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].name, "app1bis");
        assert_eq!(names[0].description.as_deref(), Some("desc"));
    }

    #[test]
    fn second_application_finds_new_name() {
        let mut p = project();
        let summary = IdName::named("app1bis");
        apply_child_change(&mut p, EntityKind::Application, "app1", &summary);
        let once = p.clone();

        assert_eq!(
            apply_child_change(&mut p, EntityKind::Application, "app1", &summary),
            Projection::Replaced
        );
        assert_eq!(p, once);
    }

    #[test]
    fn stale_index_appends() {
        let mut p = project();
        let projection = apply_child_change(&mut p, EntityKind::Workflow, "w1", &IdName::named("w1"));
        assert_eq!(projection, Projection::Appended);
        assert_eq!(p.names(EntityKind::Workflow).unwrap().len(), 1);
    }

    #[test]
    fn other_project_is_ignored() {
        let slot = slot_with(project());
        let updater = ProjectionUpdater::new(Arc::clone(&slot));
        let other = ProjectKey::new("other").unwrap();

        let projection = updater.on_child_changed(&other, "app1", &Application::named("x"));
        assert_eq!(projection, Projection::Ignored);
        let names = slot.read().as_ref().unwrap().application_names.clone().unwrap();
        assert_eq!(names[0].name, "app1");
    }

    #[test]
    fn hydrated_collection_follows_index() {
        let mut p = project();
        p.applications = Some(vec![Application::named("app1")]);
        let key = p.key.clone();
        let slot = slot_with(p);
        let before = slot.read().clone().unwrap();
        let updater = ProjectionUpdater::new(Arc::clone(&slot));

        updater.on_child_changed(&key, "app1", &Application::named("app2"));
        let after = slot.read().clone().unwrap();
        assert_eq!(after.applications.as_ref().unwrap()[0].name, "app2");
        assert_eq!(after.application_names.as_ref().unwrap()[0].name, "app2");
        assert_eq!(before.application_names.as_ref().unwrap()[0].name, "app1");

        updater.on_child_removed::<Application>(&key, "app2");
        let after = slot.read().clone().unwrap();
        assert!(after.applications.as_ref().unwrap().is_empty());
        assert!(after.application_names.as_ref().unwrap().is_empty());
    }
}
