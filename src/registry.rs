use super::{
    error::{CreateNodeError, CreateNodeResult},
    nodes::{
        ForceFailureNode, ForceSuccessNode, GuardNode, InverterNode, IsTrueNode, LogNode,
        ReactiveSelectorNode, ReactiveSequenceNode, RepeatNode, RepeatUntilNode, RetryNode,
        SelectorNode, SequenceNode, SetBoolNode, WaitNode,
    },
    BehaviourNode, Params,
};
use std::collections::HashMap;

/// Names of the variant categories. They describe what a node is, but there is
/// nothing to instantiate behind them.
pub const ABSTRACT_VARIANTS: [&str; 4] = ["Node", "ActionNode", "DecoratorNode", "CompositeNode"];

pub type Constructor =
    Box<dyn Fn(&Params) -> CreateNodeResult<Box<dyn BehaviourNode>> + Send + Sync>;

/// Wraps a parameterless constructor. Any parameters are ignored.
pub fn boxify<T>(cons: impl (Fn() -> T) + Send + Sync + 'static) -> Constructor
where
    T: BehaviourNode + 'static,
{
    Box::new(move |_: &Params| {
        let node: Box<dyn BehaviourNode> = Box::new(cons());
        Ok(node)
    })
}

/// Wraps a constructor reading its parameters.
pub fn boxify_with<T>(
    cons: impl (Fn(&Params) -> CreateNodeResult<T>) + Send + Sync + 'static,
) -> Constructor
where
    T: BehaviourNode + 'static,
{
    Box::new(move |params: &Params| {
        let node: Box<dyn BehaviourNode> = Box::new(cons(params)?);
        Ok(node)
    })
}

/// Maps variant names to constructors.
///
/// `Root` is deliberately absent: every tree creates its own root.
pub struct Registry {
    node_types: HashMap<String, Constructor>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut ret = Self {
            node_types: HashMap::new(),
        };
        ret.register("Sequence", boxify(SequenceNode::default));
        ret.register("Selector", boxify(SelectorNode::default));
        ret.register("ReactiveSequence", boxify(ReactiveSequenceNode::default));
        ret.register("ReactiveSelector", boxify(ReactiveSelectorNode::default));
        ret.register("Inverter", boxify(|| InverterNode));
        ret.register("ForceSuccess", boxify(|| ForceSuccessNode));
        ret.register("ForceFailure", boxify(|| ForceFailureNode));
        ret.register("Repeat", boxify_with(RepeatNode::from_params));
        ret.register("Retry", boxify_with(RetryNode::from_params));
        ret.register("RepeatUntil", boxify_with(RepeatUntilNode::from_params));
        ret.register("Guard", boxify_with(GuardNode::from_params));
        ret.register("SetBool", boxify_with(SetBoolNode::from_params));
        ret.register("IsTrue", boxify_with(IsTrueNode::from_params));
        ret.register("Wait", boxify_with(WaitNode::from_params));
        ret.register("Log", boxify_with(LogNode::from_params));
        ret
    }
}

impl Registry {
    /// A registry without the built-in variants.
    pub fn empty() -> Self {
        Self {
            node_types: HashMap::new(),
        }
    }

    pub fn register(&mut self, type_name: impl ToString, constructor: Constructor) {
        self.node_types.insert(type_name.to_string(), constructor);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.node_types.contains_key(type_name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.node_types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn build(&self, type_name: &str, params: &Params) -> CreateNodeResult<Box<dyn BehaviourNode>> {
        if ABSTRACT_VARIANTS.contains(&type_name) {
            return Err(CreateNodeError::AbstractVariant(type_name.to_owned()));
        }
        if type_name == "Root" {
            return Err(CreateNodeError::RootExists);
        }
        let constructor = self
            .node_types
            .get(type_name)
            .ok_or_else(|| CreateNodeError::UnknownVariant(type_name.to_owned()))?;
        constructor(params)
    }
}
