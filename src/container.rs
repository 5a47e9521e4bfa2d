use std::{
    collections::HashMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};

use crate::{error::TickError, BehaviourNode, Blackboard, Context, NodeKind, NodeState};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a node within its tree.
///
/// Fresh ids are unique within the process; a restored template keeps the ids
/// it was saved with.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Adopts an id read from a persisted template and makes sure freshly
    /// generated ids never collide with it.
    pub(crate) fn restore(raw: u64) -> Self {
        NEXT_ID.fetch_max(raw.saturating_add(1), Ordering::Relaxed);
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Editor coordinates of a node. No runtime meaning.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Links {
    Leaf,
    Single(Option<NodeId>),
    Many(Vec<NodeId>),
}

impl Links {
    pub(crate) fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Action => Links::Leaf,
            NodeKind::Root | NodeKind::Decorator => Links::Single(None),
            NodeKind::Composite => Links::Many(vec![]),
        }
    }

    pub(crate) fn as_slice(&self) -> &[NodeId] {
        match self {
            Links::Leaf | Links::Single(None) => &[],
            Links::Single(Some(child)) => std::slice::from_ref(child),
            Links::Many(children) => children,
        }
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.as_slice().contains(&id)
    }
}

pub struct NodeContainer {
    pub(crate) id: NodeId,
    /// Name of the variant, as registered in the [`crate::Registry`]
    pub(crate) name: String,
    pub(crate) node: Box<dyn BehaviourNode>,
    pub(crate) links: Links,
    pub(crate) state: NodeState,
    pub(crate) started: bool,
    pub(crate) position: Position,
    pub(crate) description: String,
    pub(crate) blackboard: Option<Blackboard>,
}

impl NodeContainer {
    pub(crate) fn new(id: NodeId, name: String, node: Box<dyn BehaviourNode>) -> Self {
        let links = Links::for_kind(node.kind());
        Self {
            id,
            name,
            node,
            links,
            state: NodeState::Running,
            started: false,
            position: Position::default(),
            description: String::new(),
            blackboard: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn children(&self) -> &[NodeId] {
        self.links.as_slice()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn subtitle(&self) -> String {
        self.node.subtitle()
    }

    pub fn params(&self) -> crate::Params {
        self.node.params()
    }

    /// The blackboard this node was bound to, if any.
    pub fn blackboard(&self) -> Option<&Blackboard> {
        self.blackboard.as_ref()
    }

    pub fn behaviour(&self) -> &dyn BehaviourNode {
        self.node.as_ref()
    }

    pub fn behaviour_mut(&mut self) -> &mut dyn BehaviourNode {
        self.node.as_mut()
    }

    /// Copy with a new id and no blackboard. Child links still point into the
    /// source arena; the caller relinks them.
    pub(crate) fn duplicate(&self, id: NodeId) -> Self {
        Self {
            id,
            name: self.name.clone(),
            node: self.node.clone_node(),
            links: self.links.clone(),
            state: self.state,
            started: self.started,
            position: self.position,
            description: self.description.clone(),
            blackboard: None,
        }
    }

    fn tick(&mut self, arena: &mut Arena) -> Result<NodeState, TickError> {
        let Self {
            id,
            name,
            node,
            links,
            state,
            started,
            blackboard,
            ..
        } = self;
        let mut ctx = Context::new(*id, links.as_slice(), arena, blackboard.as_ref());

        if !*started {
            node.on_start(&mut ctx)?;
            *started = true;
        }

        let next = node.on_update(&mut ctx)?;
        if next.is_resolved() {
            node.on_stop(&mut ctx)?;
            *started = false;
        }

        tracing::trace!(node = %id, name = %name, from = %state, to = %next, "tick");
        *state = next;
        Ok(next)
    }

    /// A failing `on_stop` leaves this node started with its state as it was;
    /// halting again only retries the hooks of nodes still started.
    fn halt(&mut self, arena: &mut Arena) -> Result<(), TickError> {
        if !self.started {
            return Ok(());
        }
        for &child in self.links.as_slice() {
            arena.halt(child)?;
        }
        let mut ctx = Context::new(
            self.id,
            self.links.as_slice(),
            arena,
            self.blackboard.as_ref(),
        );
        self.node.on_stop(&mut ctx)?;
        self.started = false;
        self.state = NodeState::Running;
        tracing::trace!(node = %self.id, name = %self.name, "halt");
        Ok(())
    }
}

impl fmt::Debug for NodeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContainer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("started", &self.started)
            .field("children", &self.links.as_slice())
            .finish()
    }
}

/// Storage of all nodes of one tree.
///
/// While a node is being ticked it is taken out of the map, so the node and
/// the rest of the arena can be borrowed mutably at the same time.
#[derive(Default)]
pub(crate) struct Arena {
    nodes: HashMap<NodeId, NodeContainer>,
}

impl Arena {
    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeContainer> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeContainer> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn insert(&mut self, node: NodeContainer) {
        self.nodes.insert(node.id, node);
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<NodeContainer> {
        self.nodes.remove(&id)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &NodeContainer> {
        self.nodes.values()
    }

    pub(crate) fn tick(&mut self, id: NodeId) -> Result<NodeState, TickError> {
        let mut node = self.nodes.remove(&id).ok_or(TickError::MissingNode(id))?;
        let res = node.tick(self);
        self.nodes.insert(id, node);
        res
    }

    pub(crate) fn halt(&mut self, id: NodeId) -> Result<(), TickError> {
        let mut node = self.nodes.remove(&id).ok_or(TickError::MissingNode(id))?;
        let res = node.halt(self);
        self.nodes.insert(id, node);
        res
    }
}
