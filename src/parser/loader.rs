use super::nom_parser::{parse_file, TreeDef, TreeSource};
use crate::{
    error::{CreateNodeError, LoadError},
    BehaviourTree, NodeId, Params, Registry,
};

/// Instantiates the tree `name` from an AST under a fresh root.
///
/// A node type that is not a registered variant but the name of another tree
/// in `tree_source` is expanded inline.
///
/// `check_params` rejects parameters a variant does not declare in
/// [`crate::BehaviourNode::provided_params`]. It catches typos in a source
/// file, at the cost of implementing `provided_params` on custom nodes.
pub fn load(
    tree_source: &TreeSource,
    registry: &Registry,
    name: &str,
    check_params: bool,
) -> Result<BehaviourTree, LoadError> {
    let main = tree_source
        .find(name)
        .ok_or_else(|| LoadError::MissingTree(name.to_owned()))?;

    let top = TreeStack { name, parent: None };

    let mut tree = BehaviourTree::new();
    let loader = Loader {
        tree_source,
        registry,
        check_params,
    };
    let child = loader.load_recurse(&mut tree, &main.root, &top)?;
    tree.add_child(tree.root(), child)
        .map_err(|e| LoadError::Structure(e, "Root".to_owned()))?;

    tracing::debug!(tree = name, nodes = tree.len(), "loaded tree");
    Ok(tree)
}

/// Parses `source` and instantiates the tree `name` from it in one go.
///
/// Input left over after the last tree definition is a parse error.
pub fn load_str(
    source: &str,
    registry: &Registry,
    name: &str,
    check_params: bool,
) -> Result<BehaviourTree, LoadError> {
    let (rest, tree_source) = parse_file(source).map_err(|e| LoadError::Parse(e.to_string()))?;
    if !rest.is_empty() {
        let consumed = &source[..source.len() - rest.len()];
        let line = consumed.matches('\n').count() + 1;
        return Err(LoadError::Parse(format!(
            "unexpected input at line {}: {:?}",
            line,
            rest.lines().next().unwrap_or_default()
        )));
    }
    load(&tree_source, registry, name, check_params)
}

/// Subtree names being expanded, linked through the call stack.
///
/// A subtree that is already on the stack would expand forever, so it is
/// reported as [`LoadError::InfiniteRecursion`] instead.
struct TreeStack<'a> {
    name: &'a str,
    parent: Option<&'a TreeStack<'a>>,
}

impl<'a> TreeStack<'a> {
    fn find(&self, name: &str) -> bool {
        if self.name == name {
            true
        } else if let Some(parent) = self.parent {
            parent.find(name)
        } else {
            false
        }
    }
}

struct Loader<'a, 'src> {
    tree_source: &'a TreeSource<'src>,
    registry: &'a Registry,
    check_params: bool,
}

impl<'a, 'src> Loader<'a, 'src> {
    fn load_recurse(
        &self,
        tree: &mut BehaviourTree,
        def: &TreeDef,
        parent_stack: &TreeStack,
    ) -> Result<NodeId, LoadError> {
        let subtree = self
            .tree_source
            .find(def.ty)
            .filter(|_| !self.registry.contains(def.ty));

        let id = if let Some(subtree) = subtree {
            if parent_stack.find(def.ty) {
                return Err(LoadError::InfiniteRecursion {
                    node: def.ty.to_owned(),
                });
            }
            if self.check_params {
                if let Some(param) = def.params.first() {
                    return Err(LoadError::ParamUnmatch {
                        node: def.ty.to_owned(),
                        param: param.name.to_owned(),
                    });
                }
            }
            let tree_stack = TreeStack {
                name: def.ty,
                parent: Some(parent_stack),
            };
            self.load_recurse(tree, &subtree.root, &tree_stack)?
        } else {
            self.create_node(tree, def)?
        };

        for child in &def.children {
            let child_id = self.load_recurse(tree, child, parent_stack)?;
            let replaced = tree
                .add_child(id, child_id)
                .map_err(|e| LoadError::Structure(e, def.ty.to_owned()))?;
            if replaced.is_some() {
                return Err(LoadError::TooManyChildren(def.ty.to_owned()));
            }
        }

        Ok(id)
    }

    fn create_node(&self, tree: &mut BehaviourTree, def: &TreeDef) -> Result<NodeId, LoadError> {
        let params: Params = def
            .params
            .iter()
            .map(|param| (param.name.to_owned(), param.value.clone()))
            .collect();

        let node = self
            .registry
            .build(def.ty, &params)
            .map_err(|e| match e {
                CreateNodeError::UnknownVariant(_) => LoadError::MissingNode(def.ty.to_owned()),
                e => LoadError::CreateNode(e, def.ty.to_owned()),
            })?;

        if self.check_params {
            let provided = node.provided_params();
            if let Some(param) = def
                .params
                .iter()
                .find(|param| !provided.iter().any(|key| *key == param.name))
            {
                return Err(LoadError::ParamUnmatch {
                    node: def.ty.to_owned(),
                    param: param.name.to_owned(),
                });
            }
        }

        tree.insert_boxed(def.ty.to_owned(), node)
            .map_err(|e| LoadError::CreateNode(e, def.ty.to_owned()))
    }
}

#[cfg(test)]
mod test;
