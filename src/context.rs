use crate::{container::Arena, error::TickError, Blackboard, NodeId, NodeState};

/// What a node sees while one of its hooks runs: its ordered children and
/// the blackboard it was bound to.
pub struct Context<'a> {
    node: NodeId,
    children: &'a [NodeId],
    arena: &'a mut Arena,
    blackboard: Option<&'a Blackboard>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        node: NodeId,
        children: &'a [NodeId],
        arena: &'a mut Arena,
        blackboard: Option<&'a Blackboard>,
    ) -> Self {
        Self {
            node,
            children,
            arena,
            blackboard,
        }
    }

    /// Id of the node whose hook is running.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[NodeId] {
        self.children
    }

    fn child(&self, index: usize) -> Result<NodeId, TickError> {
        self.children
            .get(index)
            .copied()
            .ok_or(TickError::MissingChild {
                node: self.node,
                index,
            })
    }

    /// Runs one tick of the child at `index`.
    pub fn tick_child(&mut self, index: usize) -> Result<NodeState, TickError> {
        let child = self.child(index)?;
        self.arena.tick(child)
    }

    /// Stops the child at `index` mid-episode, running its `on_stop` hook and
    /// those of its started descendants. No-op if the child is not started.
    pub fn halt_child(&mut self, index: usize) -> Result<(), TickError> {
        let child = self.child(index)?;
        self.arena.halt(child)
    }

    /// Last recorded state of the child at `index`.
    pub fn child_state(&self, index: usize) -> Option<NodeState> {
        let child = self.children.get(index)?;
        self.arena.get(*child).map(|node| node.state())
    }

    /// The blackboard bound to this node.
    ///
    /// Reading it before [`crate::BehaviourTree::bind`] is a usage error,
    /// reported as [`TickError::UnboundBlackboard`].
    pub fn blackboard(&self) -> Result<&'a Blackboard, TickError> {
        self.blackboard
            .ok_or(TickError::UnboundBlackboard(self.node))
    }
}
