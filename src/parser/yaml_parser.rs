use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    error::{LoadYamlError, StructureError},
    BehaviourTree, Blackboard, NodeId, NodeKind, Params, Position, Registry,
};

/// Serializable form of a template tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeTemplate {
    pub root: u64,
    /// Blackboard defaults, as string literals
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub blackboard: BTreeMap<String, String>,
    pub nodes: Vec<NodeTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub id: u64,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "is_origin")]
    pub position: Position,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<u64>,
}

fn is_origin(position: &Position) -> bool {
    *position == Position::default()
}

impl TreeTemplate {
    /// Captures every node of `tree`, attached or not, in creation order.
    pub fn from_tree(tree: &BehaviourTree) -> Self {
        let nodes = tree
            .nodes()
            .iter()
            .filter_map(|id| tree.node(*id))
            .map(|node| NodeTemplate {
                id: node.id().as_u64(),
                ty: node.name().to_owned(),
                position: node.position(),
                description: node.description().to_owned(),
                params: node.params(),
                children: node.children().iter().map(|id| id.as_u64()).collect(),
            })
            .collect();
        Self {
            root: tree.root().as_u64(),
            blackboard: tree.blackboard().literals(),
            nodes,
        }
    }

    /// Rebuilds the tree with the persisted ids.
    pub fn instantiate(&self, registry: &Registry) -> Result<BehaviourTree, LoadYamlError> {
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id) {
                return Err(LoadYamlError::DuplicateId(node.id));
            }
            if node.ty == "Root" && node.id != self.root {
                return Err(LoadYamlError::RootType(node.id));
            }
        }
        let root = self
            .nodes
            .iter()
            .find(|node| node.id == self.root)
            .ok_or(LoadYamlError::MissingNode(self.root))?;
        if root.ty != "Root" {
            return Err(LoadYamlError::RootType(self.root));
        }

        let mut tree = BehaviourTree::with_root(NodeId::restore(self.root));
        for node in &self.nodes {
            let id = NodeId::restore(node.id);
            if node.id != self.root {
                let behaviour = registry
                    .build(&node.ty, &node.params)
                    .map_err(|e| LoadYamlError::CreateNode(e, node.id))?;
                tree.insert_with_id(id, node.ty.clone(), behaviour)
                    .map_err(|e| LoadYamlError::CreateNode(e, node.id))?;
            }
            if let Some(container) = tree.node_mut(id) {
                container.set_position(node.position);
                container.set_description(node.description.clone());
            }
        }

        for node in &self.nodes {
            let max_children = match tree.node(NodeId::restore(node.id)).map(|node| node.kind()) {
                Some(NodeKind::Action) => 0,
                Some(NodeKind::Root | NodeKind::Decorator) => 1,
                _ => usize::MAX,
            };
            if node.children.len() > max_children {
                return Err(LoadYamlError::TooManyChildren(node.id));
            }
            let children = node.children.iter().map(|id| NodeId::restore(*id)).collect();
            tree.set_links(NodeId::restore(node.id), children)
                .map_err(structure_error)?;
        }
        tree.validate().map_err(structure_error)?;

        tree.set_blackboard(Blackboard::from_literals(self.blackboard.clone()));
        tracing::debug!(root = self.root, nodes = tree.len(), "restored template");
        Ok(tree)
    }
}

fn structure_error(e: StructureError) -> LoadYamlError {
    match e {
        StructureError::MissingNode(id) => LoadYamlError::MissingNode(id.as_u64()),
        StructureError::NotAChild { child, .. } => LoadYamlError::MissingNode(child.as_u64()),
        StructureError::LeafNode(id) => LoadYamlError::TooManyChildren(id.as_u64()),
        StructureError::AlreadyAttached { child, .. } => LoadYamlError::SharedChild(child.as_u64()),
        StructureError::Cycle { child, .. } => LoadYamlError::Cycle(child.as_u64()),
        StructureError::RootNode(id) => LoadYamlError::RootType(id.as_u64()),
        StructureError::StillReferenced { node, .. } => LoadYamlError::SharedChild(node.as_u64()),
    }
}

/// Serializes a template to YAML.
pub fn save_yaml(tree: &BehaviourTree) -> Result<String, LoadYamlError> {
    Ok(serde_yaml::to_string(&TreeTemplate::from_tree(tree))?)
}

/// Restores a template saved by [`save_yaml`].
///
/// The whole document is validated before a tree is returned: ids are
/// unique, the root is of type `Root`, every child id exists, each node has
/// at most one parent, there are no cycles and child counts fit the variant.
pub fn load_yaml(yaml: &str, registry: &Registry) -> Result<BehaviourTree, LoadYamlError> {
    let template: TreeTemplate = serde_yaml::from_str(yaml)?;
    template.instantiate(registry)
}
