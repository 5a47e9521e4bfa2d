use std::collections::{HashMap, HashSet};

use crate::{
    container::{Arena, Links, NodeContainer},
    error::{CreateNodeError, CreateNodeResult, StructureError, StructureResult, TickError},
    nodes::RootNode,
    BehaviourNode, Blackboard, NodeId, NodeKind, NodeState, Params, Position, Registry,
};

/// A behaviour tree: the arena of its nodes, the root, and the blackboard of
/// the instance.
///
/// The same type serves as an authored template and as a running instance.
/// Templates are edited with the structural operations; instances are made
/// with [`Clone::clone`] and must be [bound](BehaviourTree::bind) before the
/// first [`update`](BehaviourTree::update).
pub struct BehaviourTree {
    arena: Arena,
    /// Every node the tree owns, in creation order
    order: Vec<NodeId>,
    root: NodeId,
    tree_state: NodeState,
    blackboard: Blackboard,
}

impl Default for BehaviourTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviourTree {
    /// An empty tree holding only its root node.
    pub fn new() -> Self {
        Self::with_root(NodeId::next())
    }

    pub(crate) fn with_root(root: NodeId) -> Self {
        let mut arena = Arena::default();
        arena.insert(NodeContainer::new(root, "Root".to_owned(), Box::new(RootNode)));
        Self {
            arena,
            order: vec![root],
            root,
            tree_state: NodeState::Running,
            blackboard: Blackboard::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Result of the last tick, mirroring the root node's state.
    pub fn state(&self) -> NodeState {
        self.tree_state
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    /// Ids of all nodes owned by the tree, in creation order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeContainer> {
        self.arena.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeContainer> {
        self.arena.get_mut(id)
    }

    pub fn set_position(&mut self, id: NodeId, position: Position) -> StructureResult {
        self.get_mut(id)?.set_position(position);
        Ok(())
    }

    pub fn set_description(&mut self, id: NodeId, description: impl Into<String>) -> StructureResult {
        self.get_mut(id)?.set_description(description);
        Ok(())
    }

    fn get(&self, id: NodeId) -> StructureResult<&NodeContainer> {
        self.arena.get(id).ok_or(StructureError::MissingNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> StructureResult<&mut NodeContainer> {
        self.arena.get_mut(id).ok_or(StructureError::MissingNode(id))
    }

    /// Creates a node of the registered `variant` with default parameters.
    pub fn create_node(&mut self, registry: &Registry, variant: &str) -> CreateNodeResult<NodeId> {
        self.create_node_with_params(registry, variant, &Params::new())
    }

    pub fn create_node_with_params(
        &mut self,
        registry: &Registry,
        variant: &str,
        params: &Params,
    ) -> CreateNodeResult<NodeId> {
        let node = registry.build(variant, params)?;
        self.insert_boxed(variant.to_owned(), node)
    }

    /// Adds a node built in code. `name` is what a saved template records as
    /// its variant, so it should match the name it is registered under.
    pub fn insert_node(
        &mut self,
        name: impl Into<String>,
        node: impl BehaviourNode + 'static,
    ) -> CreateNodeResult<NodeId> {
        self.insert_boxed(name.into(), Box::new(node))
    }

    pub(crate) fn insert_boxed(
        &mut self,
        name: String,
        node: Box<dyn BehaviourNode>,
    ) -> CreateNodeResult<NodeId> {
        self.insert_with_id(NodeId::next(), name, node)
    }

    pub(crate) fn insert_with_id(
        &mut self,
        id: NodeId,
        name: String,
        node: Box<dyn BehaviourNode>,
    ) -> CreateNodeResult<NodeId> {
        if node.kind() == NodeKind::Root {
            return Err(CreateNodeError::RootExists);
        }
        tracing::debug!(node = %id, name = %name, "create node");
        self.arena.insert(NodeContainer::new(id, name, node));
        self.order.push(id);
        Ok(id)
    }

    /// Removes a node from the tree.
    ///
    /// The node must already be detached from its parent. Its own children
    /// stay in the tree, unattached.
    pub fn delete_node(&mut self, id: NodeId) -> StructureResult {
        if id == self.root {
            return Err(StructureError::RootNode(id));
        }
        self.get(id)?;
        if let Some(parent) = self.parent_of(id) {
            return Err(StructureError::StillReferenced { node: id, parent });
        }
        self.arena.remove(id);
        self.order.retain(|node| *node != id);
        tracing::debug!(node = %id, "delete node");
        Ok(())
    }

    /// Attaches `child` under `parent`.
    ///
    /// Root and decorator nodes hold a single child: the previous one is
    /// replaced and returned, left in the tree unattached. Composite nodes
    /// append to their ordered children and return `None`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> StructureResult<Option<NodeId>> {
        let parent_node = self.get(parent)?;
        if matches!(parent_node.links, Links::Leaf) {
            return Err(StructureError::LeafNode(parent));
        }
        self.get(child)?;
        if child == self.root {
            return Err(StructureError::RootNode(child));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(StructureError::Cycle { parent, child });
        }
        if let Some(current) = self.parent_of(child) {
            return Err(StructureError::AlreadyAttached {
                child,
                parent: current,
            });
        }

        let replaced = match &mut self.get_mut(parent)?.links {
            Links::Leaf => return Err(StructureError::LeafNode(parent)),
            Links::Single(slot) => slot.replace(child),
            Links::Many(children) => {
                children.push(child);
                None
            }
        };
        tracing::debug!(parent = %parent, child = %child, ?replaced, "add child");
        Ok(replaced)
    }

    /// Detaches `child` from `parent`, keeping the order of the remaining
    /// children.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> StructureResult {
        let not_a_child = StructureError::NotAChild { parent, child };
        match &mut self.get_mut(parent)?.links {
            Links::Leaf => return Err(StructureError::LeafNode(parent)),
            Links::Single(slot) => {
                if *slot != Some(child) {
                    return Err(not_a_child);
                }
                *slot = None;
            }
            Links::Many(children) => {
                let pos = children
                    .iter()
                    .position(|node| *node == child)
                    .ok_or(not_a_child)?;
                children.remove(pos);
            }
        }
        tracing::debug!(parent = %parent, child = %child, "remove child");
        Ok(())
    }

    /// Direct children of `parent` in evaluation order. Empty for actions and
    /// unknown ids.
    pub fn children(&self, parent: NodeId) -> &[NodeId] {
        self.arena
            .get(parent)
            .map(|node| node.children())
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.arena
            .values()
            .find(|node| node.links.contains(id))
            .map(|node| node.id)
    }

    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = self.parent_of(id);
        while let Some(node) = cur {
            if node == ancestor {
                return true;
            }
            cur = self.parent_of(node);
        }
        false
    }

    /// Visits `start` and its descendants depth first, each node before its
    /// children and children in order. Does nothing if `start` is not in the
    /// tree.
    pub fn traverse(&self, start: NodeId, mut visitor: impl FnMut(&NodeContainer)) {
        self.traverse_recurse(start, &mut visitor)
    }

    fn traverse_recurse(&self, id: NodeId, visitor: &mut impl FnMut(&NodeContainer)) {
        if let Some(node) = self.arena.get(id) {
            visitor(node);
            for &child in node.children() {
                self.traverse_recurse(child, visitor);
            }
        }
    }

    /// Ids reachable from `start` in pre-order.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut ret = vec![];
        self.traverse(start, |node| ret.push(node.id));
        ret
    }

    /// Makes `blackboard` the tree's blackboard and hands a reference to it to
    /// every node reachable from the root.
    pub fn bind(&mut self, blackboard: &Blackboard) {
        self.blackboard = blackboard.clone();
        self.rebind();
    }

    /// Binds the tree's current blackboard into every reachable node.
    pub fn rebind(&mut self) {
        for id in self.descendants(self.root) {
            if let Some(node) = self.arena.get_mut(id) {
                node.blackboard = Some(self.blackboard.clone());
            }
        }
        tracing::debug!(root = %self.root, "bind blackboard");
    }

    /// Ticks the tree once.
    ///
    /// A tree that already resolved is not ticked again until
    /// [`play`](Self::play) is called; its last state is returned instead.
    pub fn update(&mut self) -> Result<NodeState, TickError> {
        if self.tree_state != NodeState::Running {
            return Ok(self.tree_state);
        }
        self.tree_state = self.arena.tick(self.root)?;
        Ok(self.tree_state)
    }

    /// Interrupts the tree immediately.
    ///
    /// The root and the tree are marked `Failure`. No `on_stop` hook runs and
    /// `started` flags stay as they are, so a later [`play`](Self::play)
    /// continues the interrupted episodes.
    pub fn pause(&mut self) {
        self.set_root_state(NodeState::Failure);
        tracing::debug!(root = %self.root, "pause");
    }

    /// Lets a paused or resolved tree be ticked again.
    pub fn play(&mut self) {
        self.set_root_state(NodeState::Running);
        tracing::debug!(root = %self.root, "play");
    }

    /// Stops the tree cleanly: every started node gets its `on_stop` hook,
    /// deepest first, then the tree is marked `Failure` like [`pause`](Self::pause).
    pub fn halt(&mut self) -> Result<(), TickError> {
        self.arena.halt(self.root)?;
        self.set_root_state(NodeState::Failure);
        tracing::debug!(root = %self.root, "halt");
        Ok(())
    }

    fn set_root_state(&mut self, state: NodeState) {
        if let Some(root) = self.arena.get_mut(self.root) {
            root.state = state;
        }
        self.tree_state = state;
    }

    /// Reorders a composite's children by the horizontal position of the
    /// nodes, left to right. Ties keep their current order.
    pub fn sort_children_by_position(&mut self, parent: NodeId) -> StructureResult {
        let mut children = self.children(parent).to_vec();
        children.sort_by(|lhs, rhs| {
            let x = |id: &NodeId| self.arena.get(*id).map_or(0., |node| node.position.x);
            x(lhs).total_cmp(&x(rhs))
        });
        match &mut self.get_mut(parent)?.links {
            Links::Many(current) => *current = children,
            Links::Leaf => return Err(StructureError::LeafNode(parent)),
            Links::Single(_) => (),
        }
        Ok(())
    }

    /// Ordinal labels such as `"[1] Wait"` for the children of `parent`.
    pub fn child_labels(&self, parent: NodeId) -> Vec<(NodeId, String)> {
        self.children(parent)
            .iter()
            .enumerate()
            .filter_map(|(i, id)| {
                let node = self.arena.get(*id)?;
                Some((*id, format!("[{}] {}", i + 1, node.name)))
            })
            .collect()
    }

    /// Checks that the attached nodes form a strict tree under the root:
    /// every link resolves, no node has two parents and nothing is its own
    /// ancestor.
    pub fn validate(&self) -> StructureResult {
        let mut parents = HashMap::new();
        for id in &self.order {
            let node = self.get(*id)?;
            for &child in node.children() {
                self.get(child)?;
                if child == self.root {
                    return Err(StructureError::RootNode(child));
                }
                if let Some(&parent) = parents.get(&child) {
                    return Err(StructureError::AlreadyAttached { child, parent });
                }
                parents.insert(child, *id);
            }
        }
        for id in &self.order {
            let mut seen = HashSet::new();
            let mut cur = *id;
            while let Some(&parent) = parents.get(&cur) {
                if !seen.insert(parent) || parent == *id {
                    return Err(StructureError::Cycle {
                        parent,
                        child: cur,
                    });
                }
                cur = parent;
            }
        }
        Ok(())
    }

    fn clone_recurse(
        &self,
        id: NodeId,
        arena: &mut Arena,
        order: &mut Vec<NodeId>,
    ) -> Option<NodeId> {
        let source = self.arena.get(id)?;
        let new_id = NodeId::next();
        order.push(new_id);
        let mut copy = source.duplicate(new_id);
        copy.links = match &source.links {
            Links::Leaf => Links::Leaf,
            Links::Single(child) => {
                Links::Single(child.and_then(|child| self.clone_recurse(child, arena, order)))
            }
            Links::Many(children) => Links::Many(
                children
                    .iter()
                    .filter_map(|child| self.clone_recurse(*child, arena, order))
                    .collect(),
            ),
        };
        arena.insert(copy);
        Some(new_id)
    }

    /// Used by the template loaders, which assign ids and links themselves.
    pub(crate) fn set_links(&mut self, id: NodeId, children: Vec<NodeId>) -> StructureResult {
        let node = self.get_mut(id)?;
        node.links = match node.links {
            Links::Leaf if children.is_empty() => Links::Leaf,
            Links::Leaf => return Err(StructureError::LeafNode(id)),
            Links::Single(_) => match children.as_slice() {
                [] => Links::Single(None),
                [child] => Links::Single(Some(*child)),
                [_, second, ..] => {
                    return Err(StructureError::AlreadyAttached {
                        child: *second,
                        parent: id,
                    })
                }
            },
            Links::Many(_) => Links::Many(children),
        };
        Ok(())
    }

    pub(crate) fn set_blackboard(&mut self, blackboard: Blackboard) {
        self.blackboard = blackboard;
    }
}

/// Deep copy for a new instance.
///
/// Every node is copied with a new id, its parameters and its recorded state;
/// child order is preserved. The copy is unbound and gets an independent copy
/// of the blackboard, so [`BehaviourTree::bind`] or
/// [`BehaviourTree::rebind`] has to run before the first tick. Nodes that are
/// not attached under the root are not copied.
impl Clone for BehaviourTree {
    fn clone(&self) -> Self {
        let mut arena = Arena::default();
        let mut order = vec![];
        let Some(root) = self.clone_recurse(self.root, &mut arena, &mut order) else {
            return Self::new();
        };
        tracing::debug!(source = %self.root, root = %root, nodes = order.len(), "clone tree");
        Self {
            arena,
            order,
            root,
            tree_state: self.tree_state,
            blackboard: self.blackboard.deep_copy(),
        }
    }
}

impl std::fmt::Debug for BehaviourTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviourTree")
            .field("root", &self.root)
            .field("state", &self.tree_state)
            .field("nodes", &self.order)
            .finish()
    }
}
