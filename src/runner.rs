use serde::{Deserialize, Serialize};

use crate::{error::TickError, BehaviourTree, Blackboard, NodeState};

/// What [`BehaviourTreeRunner::pause`] does to the running episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PausePolicy {
    /// Mark the tree `Failure` and keep every node's progress, so resuming
    /// continues where it stopped
    #[default]
    Abrupt,
    /// Run the `on_stop` hooks of all started nodes before pausing, so resuming
    /// starts a fresh episode
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub pause_policy: PausePolicy,
    /// Start a new episode on the next update once the tree resolved
    pub restart_on_completion: bool,
}

impl RunnerConfig {
    pub fn from_yaml(src: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(src)
    }
}

/// One entity's instance of a template tree.
///
/// The runner clones the template, binds the clone to its own blackboard and
/// drives it frame by frame.
pub struct BehaviourTreeRunner {
    tree: BehaviourTree,
    config: RunnerConfig,
    paused: bool,
}

impl BehaviourTreeRunner {
    /// Instantiates `template` with a copy of the template's blackboard.
    pub fn new(template: &BehaviourTree, config: RunnerConfig) -> Self {
        let mut tree = template.clone();
        tree.rebind();
        tracing::debug!(root = %tree.root(), ?config, "runner created");
        Self {
            tree,
            config,
            paused: false,
        }
    }

    /// Instantiates `template` bound to a blackboard shared with the caller.
    pub fn with_blackboard(
        template: &BehaviourTree,
        blackboard: &Blackboard,
        config: RunnerConfig,
    ) -> Self {
        let mut tree = template.clone();
        tree.bind(blackboard);
        tracing::debug!(root = %tree.root(), ?config, "runner created");
        Self {
            tree,
            config,
            paused: false,
        }
    }

    /// Ticks the tree once, unless paused.
    pub fn update(&mut self) -> Result<NodeState, TickError> {
        if self.paused {
            return Ok(self.tree.state());
        }
        if self.config.restart_on_completion && self.tree.state().is_resolved() {
            self.tree.play();
        }
        self.tree.update()
    }

    pub fn pause(&mut self) -> Result<(), TickError> {
        if self.paused {
            return Ok(());
        }
        match self.config.pause_policy {
            PausePolicy::Abrupt => self.tree.pause(),
            PausePolicy::Halt => self.tree.halt()?,
        }
        self.paused = true;
        Ok(())
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.tree.play();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn tree(&self) -> &BehaviourTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut BehaviourTree {
        &mut self.tree
    }

    pub fn blackboard(&self) -> &Blackboard {
        self.tree.blackboard()
    }
}
