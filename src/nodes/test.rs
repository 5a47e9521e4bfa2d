use std::sync::{Arc, Mutex};

use super::*;
use crate::{params, BehaviourTree, Blackboard, NodeId};

use NodeState::{Failure, Running, Success};

type Log = Arc<Mutex<Vec<String>>>;

/// Action replaying a fixed list of results and recording its hook calls.
#[derive(Clone)]
struct Script {
    label: &'static str,
    results: Vec<NodeState>,
    step: usize,
    log: Log,
}

impl Script {
    fn new(label: &'static str, results: &[NodeState], log: &Log) -> Self {
        Self {
            label,
            results: results.to_vec(),
            step: 0,
            log: log.clone(),
        }
    }

    fn push(&self, event: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{} {}", event, self.label));
    }
}

impl BehaviourNode for Script {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        self.push("start");
        Ok(())
    }

    fn on_update(&mut self, _ctx: &mut Context) -> Result<NodeState, TickError> {
        self.push("update");
        let res = self.results[self.step.min(self.results.len() - 1)];
        self.step += 1;
        Ok(res)
    }

    fn on_stop(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        self.push("stop");
        Ok(())
    }
}

fn add(
    tree: &mut BehaviourTree,
    parent: NodeId,
    name: &str,
    node: impl BehaviourNode + 'static,
) -> NodeId {
    let id = tree.insert_node(name, node).unwrap();
    tree.add_child(parent, id).unwrap();
    id
}

fn add_to_root(tree: &mut BehaviourTree, name: &str, node: impl BehaviourNode + 'static) -> NodeId {
    let root = tree.root();
    add(tree, root, name, node)
}

fn bound_tree() -> (BehaviourTree, Blackboard) {
    let mut tree = BehaviourTree::new();
    let bb = Blackboard::new();
    tree.bind(&bb);
    (tree, bb)
}

fn events(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn updates(log: &Log, label: &str) -> usize {
    let update = format!("update {}", label);
    events(log).iter().filter(|event| **event == update).count()
}

#[test]
fn test_root_without_child() {
    let (mut tree, _) = bound_tree();
    assert_eq!(tree.update(), Ok(Failure));
}

#[test]
fn test_sequence() {
    let log = Log::default();
    let (mut tree, _) = bound_tree();
    let seq = add_to_root(&mut tree, "Sequence", SequenceNode::default());
    add(&mut tree, seq, "Script", Script::new("a", &[Success], &log));
    add(&mut tree, seq, "Script", Script::new("b", &[Running, Success], &log));
    add(&mut tree, seq, "Script", Script::new("c", &[Success], &log));
    tree.rebind();

    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(
        events(&log),
        ["start a", "update a", "stop a", "start b", "update b"]
    );

    // The succeeded child is not ticked again within the episode
    assert_eq!(tree.update(), Ok(Success));
    assert_eq!(updates(&log, "a"), 1);
    assert_eq!(updates(&log, "b"), 2);
    assert_eq!(updates(&log, "c"), 1);
}

#[test]
fn test_sequence_failure() {
    let log = Log::default();
    let (mut tree, _) = bound_tree();
    let seq = add_to_root(&mut tree, "Sequence", SequenceNode::default());
    add(&mut tree, seq, "Script", Script::new("a", &[Success], &log));
    add(&mut tree, seq, "Script", Script::new("b", &[Failure], &log));
    add(&mut tree, seq, "Script", Script::new("c", &[Success], &log));

    assert_eq!(tree.update(), Ok(Failure));
    assert_eq!(updates(&log, "c"), 0);

    // A new episode starts from the first child again
    tree.play();
    assert_eq!(tree.update(), Ok(Failure));
    assert_eq!(updates(&log, "a"), 2);
}

#[test]
fn test_selector() {
    let log = Log::default();
    let (mut tree, _) = bound_tree();
    let sel = add_to_root(&mut tree, "Selector", SelectorNode::default());
    add(&mut tree, sel, "Script", Script::new("a", &[Failure], &log));
    add(&mut tree, sel, "Script", Script::new("b", &[Running, Success], &log));
    add(&mut tree, sel, "Script", Script::new("c", &[Success], &log));

    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Success));
    assert_eq!(updates(&log, "a"), 1);
    assert_eq!(updates(&log, "c"), 0);

    let (mut tree, _) = bound_tree();
    let sel = add_to_root(&mut tree, "Selector", SelectorNode::default());
    add(&mut tree, sel, "Script", Script::new("d", &[Failure], &log));
    assert_eq!(tree.update(), Ok(Failure));
}

#[test]
fn test_reactive_sequence() {
    let log = Log::default();
    let (mut tree, _) = bound_tree();
    let seq = add_to_root(
        &mut tree,
        "ReactiveSequence",
        ReactiveSequenceNode::default(),
    );
    add(&mut tree, seq, "Script", Script::new("cond", &[Success, Failure], &log));
    add(&mut tree, seq, "Script", Script::new("act", &[Running], &log));

    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Failure));
    assert_eq!(updates(&log, "cond"), 2);
    assert_eq!(updates(&log, "act"), 1);
    assert_eq!(events(&log).last().map(String::as_str), Some("stop act"));
}

#[test]
fn test_reactive_selector() {
    let log = Log::default();
    let (mut tree, _) = bound_tree();
    let sel = add_to_root(
        &mut tree,
        "ReactiveSelector",
        ReactiveSelectorNode::default(),
    );
    add(&mut tree, sel, "Script", Script::new("high", &[Failure, Success], &log));
    let low = add(&mut tree, sel, "Script", Script::new("low", &[Running], &log));

    assert_eq!(tree.update(), Ok(Running));
    assert!(tree.node(low).unwrap().started());
    assert_eq!(tree.update(), Ok(Success));
    assert!(!tree.node(low).unwrap().started());
    assert!(events(&log).contains(&"stop low".to_owned()));
}

#[test]
fn test_result_decorators() {
    let log = Log::default();
    for (decorator, child, expected) in [
        ("Inverter", Success, Failure),
        ("Inverter", Failure, Success),
        ("Inverter", Running, Running),
        ("ForceSuccess", Failure, Success),
        ("ForceSuccess", Running, Running),
        ("ForceFailure", Success, Failure),
    ] {
        let (mut tree, _) = bound_tree();
        let node: Box<dyn BehaviourNode> = match decorator {
            "Inverter" => Box::new(InverterNode),
            "ForceSuccess" => Box::new(ForceSuccessNode),
            _ => Box::new(ForceFailureNode),
        };
        let id = tree.insert_boxed(decorator.to_owned(), node).unwrap();
        tree.add_child(tree.root(), id).unwrap();
        add(&mut tree, id, "Script", Script::new("a", &[child], &log));
        assert_eq!(tree.update(), Ok(expected), "{} over {}", decorator, child);
    }
}

#[test]
fn test_decorators_without_child() {
    let registry = crate::Registry::default();
    for variant in ["Inverter", "ForceSuccess", "ForceFailure", "Repeat", "Retry", "RepeatUntil"] {
        let (mut tree, _) = bound_tree();
        let id = tree.create_node(&registry, variant).unwrap();
        tree.add_child(tree.root(), id).unwrap();
        assert_eq!(tree.update(), Ok(Failure), "{}", variant);
    }
}

#[test]
fn test_repeat() {
    let log = Log::default();
    let (mut tree, _) = bound_tree();
    let repeat = add_to_root(&mut tree, "Repeat", RepeatNode::new(Some(3)));
    add(&mut tree, repeat, "Script", Script::new("a", &[Success], &log));

    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Success));
    assert_eq!(updates(&log, "a"), 3);
    // Every repetition is a new episode of the child
    assert_eq!(events(&log).iter().filter(|e| *e == "start a").count(), 3);

    let (mut tree, _) = bound_tree();
    let repeat = add_to_root(&mut tree, "Repeat", RepeatNode::new(None));
    add(&mut tree, repeat, "Script", Script::new("b", &[Success, Success, Failure], &log));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Failure));
}

#[test]
fn test_retry() {
    let log = Log::default();
    let (mut tree, _) = bound_tree();
    let retry = add_to_root(&mut tree, "Retry", RetryNode::new(2));
    add(&mut tree, retry, "Script", Script::new("a", &[Failure], &log));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Failure));

    let (mut tree, _) = bound_tree();
    let retry = add_to_root(&mut tree, "Retry", RetryNode::new(3));
    add(&mut tree, retry, "Script", Script::new("b", &[Failure, Success], &log));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Success));
}

#[test]
fn test_repeat_until() {
    let log = Log::default();
    let (mut tree, _) = bound_tree();
    let until = add_to_root(
        &mut tree,
        "RepeatUntil",
        RepeatUntilNode::new(Success),
    );
    add(&mut tree, until, "Script", Script::new("a", &[Failure, Failure, Success], &log));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Success));
}

#[test]
fn test_guard() {
    let log = Log::default();
    let (mut tree, bb) = bound_tree();
    let guard = add_to_root(&mut tree, "Guard", GuardNode::new("armed", true));
    add(&mut tree, guard, "Script", Script::new("b", &[Running], &log));
    tree.rebind();

    assert_eq!(tree.update(), Ok(Failure));
    assert!(events(&log).is_empty());

    bb.set("armed", true);
    tree.play();
    assert_eq!(tree.update(), Ok(Running));

    bb.set("armed", false);
    assert_eq!(tree.update(), Ok(Failure));
    assert_eq!(events(&log), ["start b", "update b", "stop b"]);

    // String literals are parsed
    bb.set("armed", "true".to_owned());
    tree.play();
    assert_eq!(tree.update(), Ok(Running));
}

#[test]
fn test_guard_unbound() {
    let mut tree = BehaviourTree::new();
    let guard = add_to_root(&mut tree, "Guard", GuardNode::new("armed", true));
    assert_eq!(tree.update(), Err(TickError::UnboundBlackboard(guard)));
}

#[test]
fn test_blackboard_actions() {
    let (mut tree, bb) = bound_tree();
    let seq = add_to_root(&mut tree, "Sequence", SequenceNode::default());
    add(&mut tree, seq, "IsTrue", IsTrueNode::new("seen"));
    tree.rebind();
    assert_eq!(tree.update(), Ok(Failure));

    let (mut tree, _) = bound_tree();
    let seq = add_to_root(&mut tree, "Sequence", SequenceNode::default());
    add(&mut tree, seq, "SetBool", SetBoolNode::new("seen", true));
    add(&mut tree, seq, "IsTrue", IsTrueNode::new("seen"));
    add(&mut tree, seq, "Log", LogNode::new("seen it"));
    tree.bind(&bb);
    assert_eq!(tree.update(), Ok(Success));
    assert_eq!(bb.get::<bool>("seen").as_deref(), Some(&true));
}

#[test]
fn test_wait() {
    let (mut tree, _) = bound_tree();
    add_to_root(&mut tree, "Wait", WaitNode::new(2));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Success));

    let (mut tree, _) = bound_tree();
    add_to_root(&mut tree, "Wait", WaitNode::new(0));
    assert_eq!(tree.update(), Ok(Success));
}

#[test]
fn test_params() {
    let repeat = RepeatNode::from_params(&Params::new()).unwrap();
    assert_eq!(repeat.params(), Params::new());
    assert_eq!(repeat.subtitle(), "forever");

    let retry = RetryNode::from_params(&Params::new()).unwrap();
    assert_eq!(retry.params(), params!("attempts" => 1));

    let guard = GuardNode::from_params(&params!("key" => "armed", "expect" => false)).unwrap();
    assert_eq!(guard.params(), params!("key" => "armed", "expect" => false));
    assert_eq!(guard.subtitle(), "armed == false");

    let until = RepeatUntilNode::from_params(&params!("until" => "Success")).unwrap();
    assert_eq!(until.params(), params!("until" => "Success"));

    assert_eq!(
        SetBoolNode::from_params(&params!("key" => "k")).err(),
        Some(CreateNodeError::MissingParam {
            variant: "SetBool".to_owned(),
            param: "value".to_owned(),
        })
    );
}

#[test]
fn test_selector_running_first_child() {
    let log = Log::default();
    let (mut tree, _) = bound_tree();
    let sel = add_to_root(&mut tree, "Selector", SelectorNode::default());
    add(&mut tree, sel, "Script", Script::new("a", &[Running], &log));
    add(&mut tree, sel, "Script", Script::new("b", &[Success], &log));

    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(tree.update(), Ok(Running));
    assert_eq!(updates(&log, "b"), 0);
}
