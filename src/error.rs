use std::fmt::{self, Display, Formatter};

use crate::NodeId;

/// Failure to instantiate a node variant.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreateNodeError {
    /// `Node`, `ActionNode`, `DecoratorNode` or `CompositeNode` were requested
    AbstractVariant(String),
    UnknownVariant(String),
    /// The tree already has its root; a second one cannot be created
    RootExists,
    MissingParam { variant: String, param: String },
    InvalidParam {
        variant: String,
        param: String,
        value: String,
    },
}

impl Display for CreateNodeError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::AbstractVariant(name) => {
                write!(fmt, "Node variant {:?} is abstract and cannot be instantiated", name)
            }
            Self::UnknownVariant(name) => write!(fmt, "Node variant not found {:?}", name),
            Self::RootExists => write!(fmt, "The tree already has a root node"),
            Self::MissingParam { variant, param } => {
                write!(fmt, "Missing parameter {:?} of {}", param, variant)
            }
            Self::InvalidParam {
                variant,
                param,
                value,
            } => write!(
                fmt,
                "Invalid value {:?} for parameter {:?} of {}",
                value, param, variant
            ),
        }
    }
}

impl std::error::Error for CreateNodeError {}

pub type CreateNodeResult<T> = Result<T, CreateNodeError>;

/// A rejected structural edit. The tree is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StructureError {
    MissingNode(NodeId),
    /// Action nodes take no children
    LeafNode(NodeId),
    NotAChild { parent: NodeId, child: NodeId },
    AlreadyAttached { child: NodeId, parent: NodeId },
    /// The edit would make a node its own ancestor
    Cycle { parent: NodeId, child: NodeId },
    /// The root can neither be deleted nor become a child
    RootNode(NodeId),
    StillReferenced { node: NodeId, parent: NodeId },
}

impl Display for StructureError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::MissingNode(id) => write!(fmt, "Node {} does not exist in the tree", id),
            Self::LeafNode(id) => write!(fmt, "Node {} is an action and cannot have children", id),
            Self::NotAChild { parent, child } => {
                write!(fmt, "Node {} is not a child of {}", child, parent)
            }
            Self::AlreadyAttached { child, parent } => {
                write!(fmt, "Node {} is already a child of {}", child, parent)
            }
            Self::Cycle { parent, child } => write!(
                fmt,
                "Adding {} under {} would create a cycle",
                child, parent
            ),
            Self::RootNode(id) => write!(fmt, "Node {} is the root node", id),
            Self::StillReferenced { node, parent } => write!(
                fmt,
                "Node {} is still referenced as a child of {}",
                node, parent
            ),
        }
    }
}

impl std::error::Error for StructureError {}

pub type StructureResult<T = ()> = Result<T, StructureError>;

/// A usage fault raised while ticking. Distinct from [`crate::NodeState::Failure`],
/// which is a regular outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TickError {
    /// The node read its blackboard before the tree was bound
    UnboundBlackboard(NodeId),
    /// A child link points to a node that is not in the tree
    MissingNode(NodeId),
    MissingChild { node: NodeId, index: usize },
}

impl Display for TickError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::UnboundBlackboard(id) => write!(
                fmt,
                "Node {} accessed the blackboard before the tree was bound",
                id
            ),
            Self::MissingNode(id) => write!(fmt, "Node {} does not exist in the tree", id),
            Self::MissingChild { node, index } => {
                write!(fmt, "Node {} has no child at index {}", node, index)
            }
        }
    }
}

impl std::error::Error for TickError {}

/// Errors while instantiating a tree from the text format.
#[derive(Debug)]
#[non_exhaustive]
pub enum LoadError {
    Parse(String),
    MissingTree(String),
    MissingNode(String),
    InfiniteRecursion { node: String },
    ParamUnmatch { node: String, param: String },
    /// A decorator given more than one child
    TooManyChildren(String),
    CreateNode(CreateNodeError, String),
    Structure(StructureError, String),
}

impl Display for LoadError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(fmt, "Parse error: {}", e),
            Self::MissingTree(name) => write!(fmt, "The tree {:?} does not exist", name),
            Self::MissingNode(node) => {
                write!(fmt, "Node type or subtree name not found {:?}", node)
            }
            Self::InfiniteRecursion { node } => {
                write!(fmt, "Infinite recursion detected in subtree {:?}", node)
            }
            Self::ParamUnmatch { node, param } => {
                write!(fmt, "Node {:?} does not provide parameter {:?}", node, param)
            }
            Self::TooManyChildren(node) => {
                write!(fmt, "Node {:?} takes a single child", node)
            }
            Self::CreateNode(e, node) => {
                e.fmt(fmt)?;
                write!(fmt, " while loading {}", node)
            }
            Self::Structure(e, node) => {
                e.fmt(fmt)?;
                write!(fmt, " while loading {}", node)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Errors while restoring a persisted template.
#[derive(Debug)]
#[non_exhaustive]
pub enum LoadYamlError {
    Yaml(serde_yaml::Error),
    DuplicateId(u64),
    /// A root or child id that no node carries
    MissingNode(u64),
    /// The root entry is not of type `Root`, or another entry is
    RootType(u64),
    /// A node listed as a child of more than one parent
    SharedChild(u64),
    /// A node that lists itself among its own descendants
    Cycle(u64),
    /// More children than the variant takes
    TooManyChildren(u64),
    CreateNode(CreateNodeError, u64),
}

impl Display for LoadYamlError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Yaml(e) => e.fmt(fmt),
            Self::DuplicateId(id) => write!(fmt, "Duplicate node id {}", id),
            Self::MissingNode(id) => write!(fmt, "Referenced node id {} does not exist", id),
            Self::RootType(id) => write!(fmt, "Node {} has an unexpected Root type", id),
            Self::SharedChild(id) => write!(fmt, "Node {} has more than one parent", id),
            Self::Cycle(id) => write!(fmt, "Node {} is part of a cycle", id),
            Self::TooManyChildren(id) => {
                write!(fmt, "Node {} has more children than its variant takes", id)
            }
            Self::CreateNode(e, id) => {
                e.fmt(fmt)?;
                write!(fmt, " for node {}", id)
            }
        }
    }
}

impl std::error::Error for LoadYamlError {}

impl From<serde_yaml::Error> for LoadYamlError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err)
    }
}
