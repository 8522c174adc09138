//! Workflow draft
//!
//! The node tree is flattened into an arena: each slot keeps its node
//! without triggers or hooks, a link to its parent, and the references of
//! its children and hooks. [`Draft::materialize`] rebuilds the tree.
//!
//! The same draft type backs both edit mode and the canonical path, where a
//! draft is derived, edited, materialized and sent as a full update.

use crate::arena::Arena;
use crate::error::{OverlayError, OverlayResult};
use crate::overlay::Draft;
use crate::reference::{RefAllocator, SyntheticRef};
use cds_model::{
    NodeType, ProjectIntegration, WNode, WNodeHook, WNodeJoinParent, WNodeTrigger, Workflow,
    WorkflowData, WorkflowNotification,
};
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct NodeSlot {
    node: WNode,
    edge: Option<WNodeTrigger>,
    parent: Option<SyntheticRef>,
    children: Vec<SyntheticRef>,
    hooks: Vec<SyntheticRef>,
    join_parents: Vec<Option<SyntheticRef>>,
}

#[derive(Debug, Clone)]
struct HookSlot {
    owner: SyntheticRef,
    hook: WNodeHook,
}

/// Working copy of a workflow with addressable nodes and hooks
#[derive(Debug, Clone)]
pub struct WorkflowDraft {
    header: Workflow,
    root: Option<SyntheticRef>,
    joins: Vec<SyntheticRef>,
    nodes: Arena<NodeSlot>,
    hooks: Arena<HookSlot>,
    node_refs: RefAllocator,
    hook_refs: RefAllocator,
}

impl WorkflowDraft {
    fn empty(header: Workflow) -> Self {
        Self {
            header,
            root: None,
            joins: Vec::new(),
            nodes: Arena::new("node"),
            hooks: Arena::new("hook"),
            node_refs: RefAllocator::new(),
            hook_refs: RefAllocator::new(),
        }
    }

    fn insert_tree(
        &mut self,
        mut node: WNode,
        parent: Option<SyntheticRef>,
        edge: Option<WNodeTrigger>,
    ) -> SyntheticRef {
        let reference = self.node_refs.assign(node.ref_id.as_deref(), None, node.id);
        let triggers = std::mem::take(&mut node.triggers);
        let hooks = std::mem::take(&mut node.hooks);

        let hook_refs = hooks
            .into_iter()
            .map(|hook| {
                let hook_ref =
                    self.hook_refs
                        .assign(hook.ref_id.as_deref(), hook.uuid.as_deref(), hook.id);
                self.hooks.insert(
                    hook_ref.clone(),
                    HookSlot {
                        owner: reference.clone(),
                        hook,
                    },
                );
                hook_ref
            })
            .collect();

        let children = triggers
            .into_iter()
            .map(|mut trigger| {
                let child = std::mem::take(&mut trigger.child_node);
                self.insert_tree(child, Some(reference.clone()), Some(trigger))
            })
            .collect();

        self.nodes.insert(
            reference.clone(),
            NodeSlot {
                node,
                edge,
                parent,
                children,
                hooks: hook_refs,
                join_parents: Vec::new(),
            },
        );
        reference
    }

    fn resolve_join_parents(&mut self) {
        for join_ref in self.joins.clone() {
            let Ok(slot) = self.nodes.get(&join_ref) else {
                continue;
            };
            let resolved: Vec<Option<SyntheticRef>> = slot
                .node
                .parents
                .iter()
                .map(|parent| {
                    self.nodes.find(|candidate| match parent.parent_id {
                        Some(id) => candidate.node.id == Some(id),
                        None => parent.parent_name.as_deref() == Some(candidate.node.name.as_str()),
                    })
                })
                .collect();
            if let Ok(slot) = self.nodes.get_mut(&join_ref) {
                slot.join_parents = resolved;
            }
        }
    }

    fn build_node(&self, reference: &SyntheticRef) -> OverlayResult<WNode> {
        let slot = self.nodes.get(reference)?;
        let mut node = slot.node.clone();
        node.ref_id = Some(reference.to_string());
        node.hooks = slot
            .hooks
            .iter()
            .map(|hook_ref| {
                self.hooks.get(hook_ref).map(|h| {
                    let mut hook = h.hook.clone();
                    hook.ref_id = Some(hook_ref.to_string());
                    hook
                })
            })
            .collect::<OverlayResult<_>>()?;
        node.triggers = slot
            .children
            .iter()
            .map(|child_ref| -> OverlayResult<WNodeTrigger> {
                let child = self.nodes.get(child_ref)?;
                let mut trigger = child.edge.clone().unwrap_or_default();
                trigger.child_node = self.build_node(child_ref)?;
                Ok(trigger)
            })
            .collect::<OverlayResult<_>>()?;
        Ok(node)
    }

    /// Rebuild the full workflow, failing on a dangling reference
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the graph references a node the
    /// arena does not hold
    pub fn try_materialize(&self) -> OverlayResult<Workflow> {
        let mut workflow = self.header.clone();
        workflow.workflow_data = self.build_data()?;
        Ok(workflow)
    }

    fn build_data(&self) -> OverlayResult<Option<WorkflowData>> {
        let Some(root) = &self.root else {
            return Ok(None);
        };
        let node = self.build_node(root)?;
        let joins = self
            .joins
            .iter()
            .map(|j| self.build_node(j))
            .collect::<OverlayResult<_>>()?;
        Ok(Some(WorkflowData { node, joins }))
    }

    /// Reference of the root node
    #[must_use]
    pub fn root(&self) -> Option<&SyntheticRef> {
        self.root.as_ref()
    }

    /// References of the join nodes
    #[must_use]
    pub fn joins(&self) -> &[SyntheticRef] {
        &self.joins
    }

    /// Header fields of the workflow (everything but the graph)
    #[must_use]
    pub fn header(&self) -> &Workflow {
        &self.header
    }

    /// Node without its triggers and hooks
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the reference is unknown
    pub fn node(&self, reference: &SyntheticRef) -> OverlayResult<&WNode> {
        self.nodes.get(reference).map(|slot| &slot.node)
    }

    /// Reference of the first node with that name
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<SyntheticRef> {
        self.nodes.find(|slot| slot.node.name == name)
    }

    /// Hooks of a node
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the reference is unknown
    pub fn hooks_of(&self, node: &SyntheticRef) -> OverlayResult<Vec<SyntheticRef>> {
        self.nodes.get(node).map(|slot| slot.hooks.clone())
    }

    /// Number of nodes in the graph
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Replace the whole draft with the given workflow
    ///
    /// References the workflow already carries are kept.
    pub fn replace_with(&mut self, workflow: &Workflow) -> OverlayResult<()> {
        *self = Self::derive(workflow);
        Ok(())
    }

    /// Attach a trigger, and the subtree it carries, under `parent`
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if `parent` is unknown
    pub fn add_trigger(
        &mut self,
        parent: &SyntheticRef,
        mut trigger: WNodeTrigger,
    ) -> OverlayResult<SyntheticRef> {
        self.nodes.get(parent)?;
        let child = std::mem::take(&mut trigger.child_node);
        let child_ref = self.insert_tree(child, Some(parent.clone()), Some(trigger));
        self.nodes.get_mut(parent)?.children.push(child_ref.clone());
        Ok(child_ref)
    }

    /// Add a join waiting on `parents`
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if a parent is unknown
    pub fn add_join(
        &mut self,
        parents: &[SyntheticRef],
        mut join: WNode,
    ) -> OverlayResult<SyntheticRef> {
        join.node_type = NodeType::Join;
        join.parents = parents
            .iter()
            .map(|p| {
                self.nodes.get(p).map(|slot| WNodeJoinParent {
                    parent_name: Some(slot.node.name.clone()),
                    parent_id: slot.node.id,
                    ..WNodeJoinParent::default()
                })
            })
            .collect::<OverlayResult<_>>()?;
        let join_ref = self.insert_tree(join, None, None);
        self.nodes.get_mut(&join_ref)?.join_parents = parents.iter().cloned().map(Some).collect();
        self.joins.push(join_ref.clone());
        Ok(join_ref)
    }

    /// Overwrite the name and context of a node
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the reference is unknown
    pub fn update_node(&mut self, reference: &SyntheticRef, update: WNode) -> OverlayResult<()> {
        let slot = self.nodes.get_mut(reference)?;
        slot.node.name = update.name;
        slot.node.context = update.context;
        Ok(())
    }

    /// Remove a node and its subtree
    ///
    /// Join parents and notification sources pointing at removed nodes are
    /// dropped; joins and notifications left without any are removed too.
    ///
    /// # Errors
    /// Returns [`OverlayError::RootRemoval`] for the root node and
    /// [`OverlayError::Desync`] if the reference is unknown
    pub fn remove_node(&mut self, reference: &SyntheticRef) -> OverlayResult<()> {
        if self.root.as_ref() == Some(reference) {
            return Err(OverlayError::RootRemoval);
        }
        let parent = self.nodes.get(reference)?.parent.clone();
        match parent {
            Some(parent) => self.nodes.get_mut(&parent)?.children.retain(|c| c != reference),
            None => self.joins.retain(|j| j != reference),
        }

        let mut removed = HashSet::new();
        self.drop_subtree(reference, &mut removed)?;
        self.clean_joins(&mut removed)?;
        self.clean_notifications(&removed);
        Ok(())
    }

    fn drop_subtree(
        &mut self,
        reference: &SyntheticRef,
        removed: &mut HashSet<SyntheticRef>,
    ) -> OverlayResult<()> {
        let slot = self.nodes.remove(reference)?;
        self.node_refs.release(reference);
        for hook_ref in &slot.hooks {
            self.hooks.remove(hook_ref)?;
            self.hook_refs.release(hook_ref);
        }
        removed.insert(reference.clone());
        for child in &slot.children {
            self.drop_subtree(child, removed)?;
        }
        Ok(())
    }

    fn clean_joins(&mut self, removed: &mut HashSet<SyntheticRef>) -> OverlayResult<()> {
        loop {
            let mut orphan = None;
            for join_ref in &self.joins {
                let slot = self.nodes.get_mut(join_ref)?;
                let (parents, links): (Vec<_>, Vec<_>) = slot
                    .node
                    .parents
                    .drain(..)
                    .zip(slot.join_parents.drain(..))
                    .filter(|(_, link)| link.as_ref().map_or(true, |r| !removed.contains(r)))
                    .unzip();
                slot.node.parents = parents;
                slot.join_parents = links;
                if slot.node.parents.is_empty() && orphan.is_none() {
                    orphan = Some(join_ref.clone());
                }
            }
            let Some(orphan) = orphan else {
                return Ok(());
            };
            self.joins.retain(|j| j != &orphan);
            self.drop_subtree(&orphan, removed)?;
        }
    }

    fn clean_notifications(&mut self, removed: &HashSet<SyntheticRef>) {
        let Some(notifications) = self.header.notifications.as_mut() else {
            return;
        };
        notifications.retain_mut(|notif| {
            if notif.source_node_ref.is_empty() {
                return true;
            }
            notif
                .source_node_ref
                .retain(|r| !removed.contains(&SyntheticRef::new(r.as_str())));
            !notif.source_node_ref.is_empty()
        });
    }

    /// Attach a hook to a node
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the node is unknown
    pub fn add_hook(&mut self, node: &SyntheticRef, hook: WNodeHook) -> OverlayResult<SyntheticRef> {
        self.nodes.get(node)?;
        let hook_ref = self
            .hook_refs
            .assign(hook.ref_id.as_deref(), hook.uuid.as_deref(), hook.id);
        self.hooks.insert(
            hook_ref.clone(),
            HookSlot {
                owner: node.clone(),
                hook,
            },
        );
        self.nodes.get_mut(node)?.hooks.push(hook_ref.clone());
        Ok(hook_ref)
    }

    /// Replace a hook, keeping its reference and owner
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the reference is unknown
    pub fn update_hook(&mut self, reference: &SyntheticRef, hook: WNodeHook) -> OverlayResult<()> {
        self.hooks.get_mut(reference)?.hook = hook;
        Ok(())
    }

    /// Remove a hook
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the reference is unknown
    pub fn remove_hook(&mut self, reference: &SyntheticRef) -> OverlayResult<WNodeHook> {
        let owner = self.hooks.get(reference)?.owner.clone();
        self.nodes.get_mut(&owner)?.hooks.retain(|h| h != reference);
        self.hook_refs.release(reference);
        Ok(self.hooks.remove(reference)?.hook)
    }

    /// Append a notification
    ///
    /// # Errors
    /// Never fails; returns a result to compose inside overlay edits
    pub fn add_notification(&mut self, notification: WorkflowNotification) -> OverlayResult<()> {
        self.header
            .notifications
            .get_or_insert_with(Vec::new)
            .push(notification);
        Ok(())
    }

    /// Replace the notification with that id
    ///
    /// # Errors
    /// Returns [`OverlayError::UnknownNotification`] if none matches
    pub fn update_notification(
        &mut self,
        id: i64,
        notification: WorkflowNotification,
    ) -> OverlayResult<()> {
        let slot = self
            .header
            .notifications
            .iter_mut()
            .flatten()
            .find(|n| n.id == Some(id))
            .ok_or(OverlayError::UnknownNotification(id))?;
        *slot = notification;
        Ok(())
    }

    /// Remove the notification with that id
    ///
    /// # Errors
    /// Returns [`OverlayError::UnknownNotification`] if none matches
    pub fn delete_notification(&mut self, id: i64) -> OverlayResult<()> {
        let list = self.header.notifications.get_or_insert_with(Vec::new);
        let before = list.len();
        list.retain(|n| n.id != Some(id));
        if list.len() == before {
            return Err(OverlayError::UnknownNotification(id));
        }
        Ok(())
    }

    /// Replace the event integrations
    ///
    /// # Errors
    /// Never fails; returns a result to compose inside overlay edits
    pub fn set_event_integrations(&mut self, integrations: Vec<ProjectIntegration>) -> OverlayResult<()> {
        self.header.event_integrations = Some(integrations);
        Ok(())
    }

    /// Remove one event integration by id
    ///
    /// # Errors
    /// Never fails; returns a result to compose inside overlay edits
    pub fn remove_event_integration(&mut self, id: i64) -> OverlayResult<()> {
        if let Some(list) = self.header.event_integrations.as_mut() {
            list.retain(|i| i.id != Some(id));
        }
        Ok(())
    }
}

impl Draft for WorkflowDraft {
    type Canonical = Workflow;

    fn derive(canonical: &Workflow) -> Self {
        let mut header = canonical.clone();
        let data = header.workflow_data.take();
        let mut draft = Self::empty(header);
        if let Some(data) = data {
            draft.root = Some(draft.insert_tree(data.node, None, None));
            draft.joins = data
                .joins
                .into_iter()
                .map(|join| draft.insert_tree(join, None, None))
                .collect();
            draft.resolve_join_parents();
        }
        draft
    }

    /// Snapshot for display; a dangling reference drops the graph
    fn materialize(&self) -> Workflow {
        self.try_materialize().unwrap_or_else(|_| self.header.clone())
    }
}
