use super::*;
use crate::{
    boxify, parse_file, BehaviourNode, Blackboard, Context, NodeKind, NodeState, Symbol,
    TickError,
};

#[derive(Clone)]
struct Count;

impl BehaviourNode for Count {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        let bb = ctx.blackboard()?;
        let count = bb.get_parse::<i32>("count").unwrap_or(0);
        bb.set("count", count + 1);
        Ok(NodeState::Success)
    }
}

fn registry() -> Registry {
    let mut registry = Registry::default();
    registry.register("Count", boxify(|| Count));
    registry
}

fn names(tree: &BehaviourTree) -> Vec<String> {
    let mut ret = vec![];
    tree.traverse(tree.root(), |node| ret.push(node.name().to_owned()));
    ret
}

#[test]
fn test_subtree() {
    let src = r#"
tree main = Sequence {
    sub
    Count
}

tree sub = Selector {
    Count
}
    "#;

    let (_, tree_source) = parse_file(src).unwrap();
    let mut tree = load(&tree_source, &registry(), "main", true).unwrap();
    assert_eq!(names(&tree), ["Root", "Sequence", "Selector", "Count", "Count"]);

    let bb = Blackboard::new();
    tree.bind(&bb);
    assert_eq!(tree.update(), Ok(NodeState::Success));
    assert_eq!(bb.get_parse::<i32>("count"), Some(2));
}

#[test]
fn test_other_entry_tree() {
    let src = r#"
tree main = Sequence { sub }
tree sub = Count
"#;

    let (_, tree_source) = parse_file(src).unwrap();
    let tree = load(&tree_source, &registry(), "sub", true).unwrap();
    assert_eq!(names(&tree), ["Root", "Count"]);
}

#[test]
fn test_params() {
    let src = r#"
tree main = Sequence {
    Wait (ticks = 2)
    !IsTrue (key = "alarm")
}
"#;

    let (_, tree_source) = parse_file(src).unwrap();
    let tree = load(&tree_source, &registry(), "main", true).unwrap();
    let seq = tree.children(tree.root())[0];
    let wait = tree.node(tree.children(seq)[0]).unwrap();
    assert_eq!(wait.params(), crate::params!("ticks" => 2));
    let inverter = tree.node(tree.children(seq)[1]).unwrap();
    assert_eq!(inverter.name(), "Inverter");
    let is_true = tree.node(inverter.children()[0]).unwrap();
    assert_eq!(is_true.behaviour().provided_params(), [Symbol::from("key")]);
}

#[test]
fn test_param_check() {
    let src = r#"tree main = Wait (ticks = 2, tick = 3)"#;

    let (_, tree_source) = parse_file(src).unwrap();
    match load(&tree_source, &registry(), "main", true) {
        Err(LoadError::ParamUnmatch { node, param }) => {
            assert_eq!(node, "Wait");
            assert_eq!(param, "tick");
        }
        res => panic!("unexpected {:?}", res),
    }

    assert!(load(&tree_source, &registry(), "main", false).is_ok());
}

#[test]
fn test_invalid_param() {
    let (_, tree_source) = parse_file(r#"tree main = Wait (ticks = soon)"#).unwrap();
    assert!(matches!(
        load(&tree_source, &registry(), "main", false),
        Err(LoadError::CreateNode(CreateNodeError::InvalidParam { .. }, _))
    ));
}

#[test]
fn test_infinite_recursion() {
    let src = r#"
tree main = Sequence {
    sub
}

tree sub = Sequence {
    main
}
"#;

    let (_, tree_source) = parse_file(src).unwrap();
    match load(&tree_source, &registry(), "main", false) {
        Err(LoadError::InfiniteRecursion { node }) => assert_eq!(node, "main"),
        res => panic!("unexpected {:?}", res),
    }
}

#[test]
fn test_missing() {
    let (_, tree_source) = parse_file("tree main = Sequence { Fly }").unwrap();
    match load(&tree_source, &registry(), "main", false) {
        Err(LoadError::MissingNode(node)) => assert_eq!(node, "Fly"),
        res => panic!("unexpected {:?}", res),
    }
    match load(&tree_source, &registry(), "other", false) {
        Err(LoadError::MissingTree(name)) => assert_eq!(name, "other"),
        res => panic!("unexpected {:?}", res),
    }
}

#[test]
fn test_structure_errors() {
    let (_, tree_source) = parse_file("tree main = Inverter { Count Count }").unwrap();
    assert!(matches!(
        load(&tree_source, &registry(), "main", false),
        Err(LoadError::TooManyChildren(node)) if node == "Inverter"
    ));

    let (_, tree_source) = parse_file("tree main = Count { Count }").unwrap();
    assert!(matches!(
        load(&tree_source, &registry(), "main", false),
        Err(LoadError::Structure(crate::StructureError::LeafNode(_), _))
    ));

    let (_, tree_source) = parse_file("tree main = ActionNode").unwrap();
    assert!(matches!(
        load(&tree_source, &registry(), "main", false),
        Err(LoadError::CreateNode(CreateNodeError::AbstractVariant(_), _))
    ));
}

#[test]
fn test_load_str() {
    let tree = load_str("tree main = Count", &registry(), "main", true).unwrap();
    assert_eq!(names(&tree), ["Root", "Count"]);

    match load_str("tree main = Count\n\n}", &registry(), "main", true) {
        Err(LoadError::Parse(msg)) => assert!(msg.contains("line 3"), "{}", msg),
        res => panic!("unexpected {:?}", res),
    }
}
