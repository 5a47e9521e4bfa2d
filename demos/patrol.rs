//! A guard patrols until an alarm goes off, then raises it and stops.
//!
//! Run with `RUST_LOG=behaviour_tree_runtime=trace` to see every tick.

use behaviour_tree_runtime::{
    boxify, load_str, save_yaml, BehaviourNode, BehaviourTreeRunner, Context, NodeKind,
    NodeState, Registry, RunnerConfig, TickError,
};

/// Walks one waypoint per tick; trips the alarm at the last one.
#[derive(Clone)]
struct Walk {
    waypoint: u32,
}

impl BehaviourNode for Walk {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        self.waypoint += 1;
        tracing::info!(waypoint = self.waypoint, "walking");
        if self.waypoint == 4 {
            ctx.blackboard()?.set("alarm", true);
        }
        Ok(NodeState::Success)
    }
}

const SOURCE: &str = r#"
# Patrol while nothing is wrong, otherwise shout.
tree main = ReactiveSelector {
    patrol
    Sequence {
        Log (message = "intruder!")
        SetBool (key = "raised", value = true)
    }
}

tree patrol = Guard (key = "alarm", expect = false) {
    Repeat {
        Sequence {
            Walk
            Wait (ticks = 1)
        }
    }
}
"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut registry = Registry::default();
    registry.register("Walk", boxify(|| Walk { waypoint: 0 }));

    let template = load_str(SOURCE, &registry, "main", true)?;
    println!("{}", save_yaml(&template)?);

    let mut runner = BehaviourTreeRunner::new(&template, RunnerConfig::default());
    runner.blackboard().set("alarm", false);
    for frame in 0.. {
        let state = runner.update()?;
        println!("frame {}: {}", frame, state);
        if state.is_resolved() {
            break;
        }
    }
    println!(
        "alarm raised: {:?}",
        runner.blackboard().get_parse::<bool>("raised")
    );
    Ok(())
}
