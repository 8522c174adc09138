use cds_model::{EntityKind, IdName, Project, ProjectKey};
use cds_store::{apply_child_change, apply_child_removal, Projection};
use proptest::prelude::*;

fn project_with(names: &[String]) -> Project {
    let mut project = Project::new(ProjectKey::new("test1").unwrap(), "Test 1");
    project.application_names = Some(names.iter().map(IdName::named).collect());
    project
}

fn summary_strategy() -> impl Strategy<Value = IdName> {
    (
        "[a-z]{1,6}",
        proptest::option::of("[a-z ]{0,12}"),
        proptest::option::of("[a-z]{1,4}\\.png"),
    )
        .prop_map(|(name, description, icon)| IdName {
            name,
            description,
            icon,
            ..IdName::default()
        })
}

proptest! {
    #[test]
    fn prop_child_change_is_idempotent(
        names in proptest::collection::btree_set("[a-z]{1,6}", 0..8),
        previous in "[a-z]{1,6}",
        summary in summary_strategy(),
    ) {
        // Two distinct entries cannot both match: names are unique server-side.
        prop_assume!(
            previous == summary.name || !(names.contains(&previous) && names.contains(&summary.name))
        );
        let names: Vec<String> = names.into_iter().collect();
        let mut once = project_with(&names);
        apply_child_change(&mut once, EntityKind::Application, &previous, &summary);

        let mut twice = once.clone();
        let second = apply_child_change(&mut twice, EntityKind::Application, &previous, &summary);

        prop_assert_eq!(&once, &twice);
        prop_assert_ne!(second, Projection::Appended);
        prop_assert!(once
            .application_names
            .as_ref()
            .unwrap()
            .iter()
            .any(|e| e == &summary));
    }

    #[test]
    fn prop_change_never_shrinks_index(
        names in proptest::collection::btree_set("[a-z]{1,6}", 0..8),
        previous in "[a-z]{1,6}",
        summary in summary_strategy(),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let mut project = project_with(&names);
        let outcome = apply_child_change(&mut project, EntityKind::Application, &previous, &summary);

        let len = project.application_names.as_ref().unwrap().len();
        match outcome {
            Projection::Appended => prop_assert_eq!(len, names.len() + 1),
            _ => prop_assert_eq!(len, names.len()),
        }
    }

    #[test]
    fn prop_removal_drops_every_match(
        names in proptest::collection::btree_set("[a-z]{1,6}", 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let target = pick.get(&names).clone();
        let mut project = project_with(&names);

        prop_assert!(apply_child_removal(&mut project, EntityKind::Application, &target));
        prop_assert!(!apply_child_removal(&mut project, EntityKind::Application, &target));
        prop_assert_eq!(project.application_names.as_ref().unwrap().len(), names.len() - 1);
    }
}

#[test]
fn rename_keeps_position() {
    let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let mut project = project_with(&names);
    let outcome = apply_child_change(&mut project, EntityKind::Application, "b", &IdName::named("b2"));

    assert_eq!(outcome, Projection::Updated);
    let index: Vec<_> = project
        .application_names
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(index, vec!["a", "b2", "c"]);
}
