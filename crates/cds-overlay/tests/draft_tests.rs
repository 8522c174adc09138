use cds_model::{Pipeline, Stage, WNode, WNodeTrigger, Workflow, WorkflowData};
use cds_overlay::{Draft, EditOverlay, PipelineDraft, WorkflowDraft};
use proptest::prelude::*;

fn chain(len: usize) -> Workflow {
    let mut node = WNode::pipeline(format!("n{}", len - 1));
    for i in (0..len - 1).rev() {
        let mut parent = WNode::pipeline(format!("n{i}"));
        parent.triggers.push(WNodeTrigger {
            child_node: node,
            ..WNodeTrigger::default()
        });
        node = parent;
    }
    Workflow::named("wf").with_data(WorkflowData {
        node,
        joins: vec![],
    })
}

#[test]
fn overlay_edit_keeps_canonical_untouched() {
    let mut canonical = chain(3);
    canonical.from_repository = Some("git@repo".to_string());
    let before = canonical.clone();

    let mut overlay = EditOverlay::<WorkflowDraft>::entered(&canonical);
    let leaf = overlay.draft().and_then(|d| d.find_node("n2")).unwrap();
    overlay.mutate(|d| d.remove_node(&leaf)).unwrap();

    assert_eq!(canonical, before);
    assert_eq!(overlay.snapshot().unwrap().all_nodes().len(), 2);
}

#[test]
fn refs_survive_a_materialize_round() {
    let draft = WorkflowDraft::derive(&chain(4));
    let again = WorkflowDraft::derive(&draft.materialize());
    assert_eq!(draft.root(), again.root());
    assert_eq!(draft.find_node("n3"), again.find_node("n3"));
}

proptest! {
    #[test]
    fn prop_build_order_stays_contiguous(
        adds in 1usize..8,
        moves in prop::collection::vec((0usize..8, 0usize..10), 0..10),
    ) {
        let mut draft = PipelineDraft::derive(&Pipeline::named("p"));
        let refs: Vec<_> = (0..adds)
            .map(|i| draft.add_stage(Stage::named(format!("s{i}"), 0)).unwrap())
            .collect();
        for (which, to) in moves {
            let stage = &refs[which % refs.len()];
            draft.move_stage(stage, to).unwrap();
        }

        let orders: Vec<i32> = draft
            .materialize()
            .stages
            .unwrap()
            .iter()
            .map(|s| s.build_order)
            .collect();
        let expected: Vec<i32> = (1..=i32::try_from(adds).unwrap()).collect();
        prop_assert_eq!(orders, expected);
    }

    #[test]
    fn prop_removing_any_non_root_node_shrinks_graph(len in 2usize..8, pick in 1usize..8) {
        let mut draft = WorkflowDraft::derive(&chain(len));
        let index = pick % (len - 1) + 1;
        let target = draft.find_node(&format!("n{index}")).unwrap();

        draft.remove_node(&target).unwrap();
        prop_assert_eq!(draft.node_count(), index);
    }
}
