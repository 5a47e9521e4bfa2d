//! # behaviour-tree-runtime (Rust crate)
//!
//! Behaviour tree execution and editing model for game AI.
//!
//!
//! ## Overview
//!
//! A behaviour tree is authored once as a *template*, edited structurally by an
//! authoring tool, and then instantiated per game entity. Every instance owns
//! its own copy of the nodes and its own [`Blackboard`], so instances can be
//! ticked independently (even on different threads).
//!
//! The tree is stored as an arena of nodes indexed by [`NodeId`].
//! Each node wraps a [`BehaviourNode`] implementation, which only knows how to
//! start, update and stop itself. The child links, lifecycle state and editor
//! metadata live in the arena entry ([`NodeContainer`]).
//!
//!
//! ## How it looks like
//!
//! Build a template with the structural operations.
//!
//! ```rust
//! use behaviour_tree_runtime::*;
//!
//! let registry = Registry::default();
//! let mut template = BehaviourTree::new();
//! let seq = template.create_node(&registry, "Sequence").unwrap();
//! let wait = template
//!     .create_node_with_params(&registry, "Wait", &params!("ticks" => "1"))
//!     .unwrap();
//! let set = template
//!     .create_node_with_params(&registry, "SetBool", &params!("key" => "done", "value" => "true"))
//!     .unwrap();
//! template.add_child(template.root(), seq).unwrap();
//! template.add_child(seq, wait).unwrap();
//! template.add_child(seq, set).unwrap();
//! ```
//!
//! Then clone it, bind a blackboard and tick it once per frame.
//!
//! ```rust
//! # use behaviour_tree_runtime::*;
//! # let registry = Registry::default();
//! # let mut template = BehaviourTree::new();
//! # let seq = template.create_node(&registry, "Sequence").unwrap();
//! # template.add_child(template.root(), seq).unwrap();
//! let mut instance = template.clone();
//! let blackboard = Blackboard::new();
//! instance.bind(&blackboard);
//!
//! assert_eq!(instance.update().unwrap(), NodeState::Success);
//! ```
//!
//! [`BehaviourTreeRunner`] does the clone-and-bind dance for you.
//!
//!
//! ## How to define your own node
//!
//! Implement [`BehaviourNode`] on a `Clone` type. Only `kind` and `on_update`
//! are required.
//!
//! ```rust
//! # use behaviour_tree_runtime::*;
//! #[derive(Clone)]
//! struct Attack {
//!     swings: u32,
//! }
//!
//! impl BehaviourNode for Attack {
//!     fn kind(&self) -> NodeKind {
//!         NodeKind::Action
//!     }
//!
//!     fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
//!         self.swings = 0;
//!         Ok(())
//!     }
//!
//!     fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
//!         self.swings += 1;
//!         ctx.blackboard()?.set("swings", self.swings);
//!         Ok(if self.swings < 3 { NodeState::Running } else { NodeState::Success })
//!     }
//! }
//!
//! let mut registry = Registry::default();
//! registry.register("Attack", boxify(|| Attack { swings: 0 }));
//! ```
//!
//! A node reading the blackboard before the tree was bound gets
//! [`TickError::UnboundBlackboard`], which is a usage error and not a
//! [`NodeState::Failure`].
//!
//! Composite and decorator nodes tick their children through the [`Context`]
//! by index.
//!
//!
//! ## Persisting templates
//!
//! Templates are saved as YAML with [`save_yaml`] and restored with
//! [`load_yaml`]. Node ids, node order, parameters, child order and editor
//! metadata round-trip exactly.
//!
//! ```yaml
//! root: 1
//! nodes:
//!   - id: 1
//!     type: Root
//!     children: [2]
//!   - id: 2
//!     type: Wait
//!     params:
//!       ticks: "3"
//! ```
//!
//!
//! ## The text format
//!
//! For hand-written trees there is a small text format.
//!
//! ```raw
//! tree main = Sequence {
//!     Wait (ticks = "2")
//!     !IsTrue (key = "alarm")   # `!` wraps the node in an Inverter
//!     patrol                    # another tree, expanded inline
//! }
//!
//! tree patrol = Selector {
//!     Log (message = "patrolling")
//! }
//! ```
//!
//! It is converted to an AST with [`parse_file`] and instantiated with [`load`],
//! or both at once with [`load_str`].
//!
//! ```rust
//! # use behaviour_tree_runtime::*;
//! let source = r#"tree main = Sequence { Wait (ticks = "1") }"#;
//! let (_, tree_source) = parse_file(source).unwrap();
//! let tree = load(&tree_source, &Registry::default(), "main", true).unwrap();
//! assert_eq!(tree.len(), 3);
//! ```
//!
//!
//! ## Pause semantics
//!
//! [`BehaviourTree::pause`] is an abrupt interruption: the tree is marked
//! `Failure` without running any `on_stop` hook, and [`BehaviourTree::play`]
//! resumes where it stopped without a second `on_start`.
//! If teardown hooks must run, use [`BehaviourTree::halt`] or configure the
//! runner with [`PausePolicy::Halt`].

mod blackboard;
mod container;
mod context;
pub mod error;
mod nodes;
pub mod parser;
mod registry;
mod runner;
mod symbol;
mod tree;

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use crate::blackboard::{Blackboard, BlackboardValue};
pub use crate::container::{NodeContainer, NodeId, Position};
pub use crate::context::Context;
pub use crate::error::{CreateNodeError, LoadError, LoadYamlError, StructureError, TickError};
pub use crate::nodes::{
    ForceFailureNode, ForceSuccessNode, GuardNode, InverterNode, IsTrueNode, LogNode,
    ReactiveSelectorNode, ReactiveSequenceNode, RepeatNode, RepeatUntilNode, RetryNode, RootNode,
    SelectorNode, SequenceNode, SetBoolNode, WaitNode,
};
pub use crate::parser::{
    load, load_str, load_yaml, parse_file, save_yaml, TreeSource, TreeTemplate,
};
pub use crate::registry::{boxify, boxify_with, Constructor, Registry, ABSTRACT_VARIANTS};
pub use crate::runner::{BehaviourTreeRunner, PausePolicy, RunnerConfig};
pub use crate::symbol::Symbol;
pub use crate::tree::BehaviourTree;
pub use ::once_cell::sync::Lazy;

/// Lifecycle state of a node, and the result of a tick.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// The node should keep running in the next tick
    #[default]
    Running,
    Failure,
    Success,
}

impl NodeState {
    /// `Failure` or `Success`, i.e. the episode is over.
    pub fn is_resolved(self) -> bool {
        !matches!(self, NodeState::Running)
    }

    pub fn invert(self) -> Self {
        match self {
            NodeState::Running => NodeState::Running,
            NodeState::Failure => NodeState::Success,
            NodeState::Success => NodeState::Failure,
        }
    }
}

impl Display for NodeState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let s = match self {
            NodeState::Running => "Running",
            NodeState::Failure => "Failure",
            NodeState::Success => "Success",
        };
        f.write_str(s)
    }
}

impl FromStr for NodeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Running" => Ok(NodeState::Running),
            "Failure" => Ok(NodeState::Failure),
            "Success" => Ok(NodeState::Success),
            _ => Err(format!("unknown node state {:?}", s)),
        }
    }
}

/// The variant category of a node, which decides how many children it takes.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum NodeKind {
    /// Entry point of a tree, exactly one per tree, single child
    Root,
    /// Single child, transforms the child's result
    Decorator,
    /// Ordered children
    Composite,
    /// Leaf doing the actual work
    Action,
}

/// Variant parameters as string literals, keyed by parameter name.
///
/// They are what a persisted template stores for a node, and what a
/// [`Constructor`] receives to rebuild it.
pub type Params = BTreeMap<String, String>;

pub trait BehaviourNode: CloneNode + Send {
    fn kind(&self) -> NodeKind;

    /// Names of the parameters this variant understands.
    ///
    /// Only enforced when loading the text format with `check_params`.
    fn provided_params(&self) -> Vec<Symbol> {
        vec![]
    }

    /// Current parameters, used when saving a template.
    fn params(&self) -> Params {
        Params::new()
    }

    /// Display-only secondary title.
    fn subtitle(&self) -> String {
        String::new()
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError>;

    fn on_stop(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        Ok(())
    }
}

/// Object-safe cloning of a boxed node, implemented for every `Clone` node.
pub trait CloneNode {
    fn clone_node(&self) -> Box<dyn BehaviourNode>;
}

impl<T> CloneNode for T
where
    T: BehaviourNode + Clone + 'static,
{
    fn clone_node(&self) -> Box<dyn BehaviourNode> {
        Box::new(self.clone())
    }
}

/// Builds a [`Params`] map from `"name" => value` pairs.
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::new()
    };
    ($($name: literal => $val: expr),+ $(,)?) => {{
        let mut ret = $crate::Params::new();
        $(ret.insert($name.to_string(), $val.to_string());)+
        ret
    }};
}
