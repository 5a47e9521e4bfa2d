use std::str::FromStr;

use crate::{
    error::{CreateNodeError, CreateNodeResult, TickError},
    BehaviourNode, Context, Lazy, NodeKind, NodeState, Params, Symbol,
};

pub(crate) static KEY: Lazy<Symbol> = Lazy::new(|| "key".into());
pub(crate) static VALUE: Lazy<Symbol> = Lazy::new(|| "value".into());
pub(crate) static EXPECT: Lazy<Symbol> = Lazy::new(|| "expect".into());
pub(crate) static COUNT: Lazy<Symbol> = Lazy::new(|| "count".into());
pub(crate) static ATTEMPTS: Lazy<Symbol> = Lazy::new(|| "attempts".into());
pub(crate) static UNTIL: Lazy<Symbol> = Lazy::new(|| "until".into());
pub(crate) static TICKS: Lazy<Symbol> = Lazy::new(|| "ticks".into());
pub(crate) static MESSAGE: Lazy<Symbol> = Lazy::new(|| "message".into());

fn parse_param<T: FromStr>(variant: &str, params: &Params, key: Symbol) -> CreateNodeResult<Option<T>> {
    let Some(value) = params.get(key.as_str()) else {
        return Ok(None);
    };
    value
        .parse()
        .map(Some)
        .map_err(|_| CreateNodeError::InvalidParam {
            variant: variant.to_owned(),
            param: key.to_string(),
            value: value.clone(),
        })
}

fn required_param<T: FromStr>(variant: &str, params: &Params, key: Symbol) -> CreateNodeResult<T> {
    parse_param(variant, params, key)?.ok_or_else(|| CreateNodeError::MissingParam {
        variant: variant.to_owned(),
        param: key.to_string(),
    })
}

/// Ticks children from `cursor` on, moving past every child that returned
/// `proceed_on`. Any other result ends the tick and leaves the cursor on the
/// child that produced it.
fn tick_in_order(
    ctx: &mut Context,
    cursor: &mut usize,
    proceed_on: NodeState,
) -> Result<NodeState, TickError> {
    while *cursor < ctx.child_count() {
        let res = ctx.tick_child(*cursor)?;
        if res != proceed_on {
            return Ok(res);
        }
        *cursor += 1;
    }
    Ok(proceed_on)
}

/// Ticks every child from the first one each time. A child that was running
/// on an earlier tick is halted once another child takes over or the whole
/// node resolves.
fn tick_reactive(
    ctx: &mut Context,
    running: &mut Option<usize>,
    proceed_on: NodeState,
) -> Result<NodeState, TickError> {
    let mut result = proceed_on;
    let mut now_running = None;
    for i in 0..ctx.child_count() {
        let res = ctx.tick_child(i)?;
        if res != proceed_on {
            result = res;
            if res == NodeState::Running {
                now_running = Some(i);
            }
            break;
        }
    }
    if let Some(prev) = *running {
        if Some(prev) != now_running {
            ctx.halt_child(prev)?;
        }
    }
    *running = now_running;
    Ok(result)
}

/// Entry point of every tree. Mirrors its only child.
#[derive(Clone, Default)]
pub struct RootNode;

impl BehaviourNode for RootNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Root
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        if ctx.child_count() == 0 {
            return Ok(NodeState::Failure);
        }
        ctx.tick_child(0)
    }
}

/// Runs children in order until one fails.
///
/// The running child is remembered across ticks, so children that already
/// succeeded in this episode are not ticked again.
#[derive(Clone, Default)]
pub struct SequenceNode {
    current: usize,
}

impl BehaviourNode for SequenceNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        self.current = 0;
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        tick_in_order(ctx, &mut self.current, NodeState::Success)
    }
}

/// Runs children in order until one succeeds.
#[derive(Clone, Default)]
pub struct SelectorNode {
    current: usize,
}

impl BehaviourNode for SelectorNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        self.current = 0;
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        tick_in_order(ctx, &mut self.current, NodeState::Failure)
    }
}

#[derive(Clone, Default)]
pub struct ReactiveSequenceNode {
    running: Option<usize>,
}

impl BehaviourNode for ReactiveSequenceNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        self.running = None;
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        tick_reactive(ctx, &mut self.running, NodeState::Success)
    }
}

#[derive(Clone, Default)]
pub struct ReactiveSelectorNode {
    running: Option<usize>,
}

impl BehaviourNode for ReactiveSelectorNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        self.running = None;
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        tick_reactive(ctx, &mut self.running, NodeState::Failure)
    }
}

#[derive(Clone, Default)]
pub struct InverterNode;

impl BehaviourNode for InverterNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        if ctx.child_count() == 0 {
            return Ok(NodeState::Failure);
        }
        Ok(ctx.tick_child(0)?.invert())
    }
}

#[derive(Clone, Default)]
pub struct ForceSuccessNode;

impl BehaviourNode for ForceSuccessNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        if ctx.child_count() == 0 {
            return Ok(NodeState::Failure);
        }
        Ok(match ctx.tick_child(0)? {
            NodeState::Running => NodeState::Running,
            _ => NodeState::Success,
        })
    }
}

#[derive(Clone, Default)]
pub struct ForceFailureNode;

impl BehaviourNode for ForceFailureNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        if ctx.child_count() == 0 {
            return Ok(NodeState::Failure);
        }
        Ok(match ctx.tick_child(0)? {
            NodeState::Running => NodeState::Running,
            _ => NodeState::Failure,
        })
    }
}

/// Runs the child again after every success, `count` times in total, or
/// forever without a count.
#[derive(Clone, Default)]
pub struct RepeatNode {
    count: Option<usize>,
    remaining: Option<usize>,
}

impl RepeatNode {
    pub fn new(count: Option<usize>) -> Self {
        Self {
            count,
            remaining: count,
        }
    }

    pub(crate) fn from_params(params: &Params) -> CreateNodeResult<Self> {
        Ok(Self::new(parse_param("Repeat", params, *COUNT)?))
    }
}

impl BehaviourNode for RepeatNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn provided_params(&self) -> Vec<Symbol> {
        vec![*COUNT]
    }

    fn params(&self) -> Params {
        self.count
            .map(|count| crate::params!("count" => count))
            .unwrap_or_default()
    }

    fn subtitle(&self) -> String {
        match self.count {
            Some(count) => format!("x{}", count),
            None => "forever".to_owned(),
        }
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        self.remaining = self.count;
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        if self.remaining == Some(0) {
            return Ok(NodeState::Success);
        }
        if ctx.child_count() == 0 {
            return Ok(NodeState::Failure);
        }
        match ctx.tick_child(0)? {
            NodeState::Success => {
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                    if *remaining == 0 {
                        return Ok(NodeState::Success);
                    }
                }
                Ok(NodeState::Running)
            }
            res => Ok(res),
        }
    }
}

/// Runs the child again after every failure, up to `attempts` tries.
#[derive(Clone)]
pub struct RetryNode {
    attempts: usize,
    remaining: usize,
}

impl RetryNode {
    pub fn new(attempts: usize) -> Self {
        Self {
            attempts,
            remaining: attempts,
        }
    }

    pub(crate) fn from_params(params: &Params) -> CreateNodeResult<Self> {
        Ok(Self::new(parse_param("Retry", params, *ATTEMPTS)?.unwrap_or(1)))
    }
}

impl BehaviourNode for RetryNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn provided_params(&self) -> Vec<Symbol> {
        vec![*ATTEMPTS]
    }

    fn params(&self) -> Params {
        crate::params!("attempts" => self.attempts)
    }

    fn subtitle(&self) -> String {
        format!("{} attempts", self.attempts)
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        self.remaining = self.attempts;
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        if self.remaining == 0 || ctx.child_count() == 0 {
            return Ok(NodeState::Failure);
        }
        match ctx.tick_child(0)? {
            NodeState::Failure => {
                self.remaining -= 1;
                if self.remaining == 0 {
                    Ok(NodeState::Failure)
                } else {
                    Ok(NodeState::Running)
                }
            }
            res => Ok(res),
        }
    }
}

/// Runs the child until it returns `until`, then succeeds.
#[derive(Clone)]
pub struct RepeatUntilNode {
    until: NodeState,
}

impl RepeatUntilNode {
    /// `until` must be a resolved state; `Running` would never end and is
    /// rejected by [`crate::Registry`] when read from parameters.
    pub fn new(until: NodeState) -> Self {
        Self { until }
    }

    pub(crate) fn from_params(params: &Params) -> CreateNodeResult<Self> {
        let until = parse_param("RepeatUntil", params, *UNTIL)?.unwrap_or(NodeState::Failure);
        if !until.is_resolved() {
            return Err(CreateNodeError::InvalidParam {
                variant: "RepeatUntil".to_owned(),
                param: UNTIL.to_string(),
                value: until.to_string(),
            });
        }
        Ok(Self::new(until))
    }
}

impl Default for RepeatUntilNode {
    fn default() -> Self {
        Self::new(NodeState::Failure)
    }
}

impl BehaviourNode for RepeatUntilNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn provided_params(&self) -> Vec<Symbol> {
        vec![*UNTIL]
    }

    fn params(&self) -> Params {
        crate::params!("until" => self.until)
    }

    fn subtitle(&self) -> String {
        format!("until {}", self.until)
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        if ctx.child_count() == 0 {
            return Ok(NodeState::Failure);
        }
        match ctx.tick_child(0)? {
            NodeState::Running => Ok(NodeState::Running),
            res if res == self.until => Ok(NodeState::Success),
            _ => Ok(NodeState::Running),
        }
    }
}

/// Ticks the child only while the blackboard flag `key` equals `expect`.
///
/// When the flag flips while the child is running, the child is halted and
/// the guard fails.
#[derive(Clone)]
pub struct GuardNode {
    key: Symbol,
    expect: bool,
}

impl GuardNode {
    pub fn new(key: impl Into<Symbol>, expect: bool) -> Self {
        Self {
            key: key.into(),
            expect,
        }
    }

    pub(crate) fn from_params(params: &Params) -> CreateNodeResult<Self> {
        let key: String = required_param("Guard", params, *KEY)?;
        let expect = parse_param("Guard", params, *EXPECT)?.unwrap_or(true);
        Ok(Self::new(key, expect))
    }
}

impl BehaviourNode for GuardNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Decorator
    }

    fn provided_params(&self) -> Vec<Symbol> {
        vec![*KEY, *EXPECT]
    }

    fn params(&self) -> Params {
        crate::params!("key" => self.key, "expect" => self.expect)
    }

    fn subtitle(&self) -> String {
        format!("{} == {}", self.key, self.expect)
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        let flag = ctx.blackboard()?.get_parse::<bool>(self.key);
        if ctx.child_count() == 0 {
            return Ok(NodeState::Failure);
        }
        if flag != Some(self.expect) {
            ctx.halt_child(0)?;
            return Ok(NodeState::Failure);
        }
        ctx.tick_child(0)
    }
}

/// Writes a boolean to the blackboard.
#[derive(Clone)]
pub struct SetBoolNode {
    key: Symbol,
    value: bool,
}

impl SetBoolNode {
    pub fn new(key: impl Into<Symbol>, value: bool) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub(crate) fn from_params(params: &Params) -> CreateNodeResult<Self> {
        let key: String = required_param("SetBool", params, *KEY)?;
        let value = required_param("SetBool", params, *VALUE)?;
        Ok(Self::new(key, value))
    }
}

impl BehaviourNode for SetBoolNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn provided_params(&self) -> Vec<Symbol> {
        vec![*KEY, *VALUE]
    }

    fn params(&self) -> Params {
        crate::params!("key" => self.key, "value" => self.value)
    }

    fn subtitle(&self) -> String {
        format!("{} = {}", self.key, self.value)
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        ctx.blackboard()?.set(self.key, self.value);
        Ok(NodeState::Success)
    }
}

/// Succeeds if the blackboard flag `key` is true.
#[derive(Clone)]
pub struct IsTrueNode {
    key: Symbol,
}

impl IsTrueNode {
    pub fn new(key: impl Into<Symbol>) -> Self {
        Self { key: key.into() }
    }

    pub(crate) fn from_params(params: &Params) -> CreateNodeResult<Self> {
        let key: String = required_param("IsTrue", params, *KEY)?;
        Ok(Self::new(key))
    }
}

impl BehaviourNode for IsTrueNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn provided_params(&self) -> Vec<Symbol> {
        vec![*KEY]
    }

    fn params(&self) -> Params {
        crate::params!("key" => self.key)
    }

    fn subtitle(&self) -> String {
        self.key.to_string()
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        if ctx.blackboard()?.get_parse::<bool>(self.key) == Some(true) {
            Ok(NodeState::Success)
        } else {
            Ok(NodeState::Failure)
        }
    }
}

/// Keeps running for `ticks` ticks of its episode, then succeeds.
#[derive(Clone)]
pub struct WaitNode {
    ticks: usize,
    elapsed: usize,
}

impl WaitNode {
    pub fn new(ticks: usize) -> Self {
        Self { ticks, elapsed: 0 }
    }

    pub(crate) fn from_params(params: &Params) -> CreateNodeResult<Self> {
        Ok(Self::new(required_param("Wait", params, *TICKS)?))
    }
}

impl BehaviourNode for WaitNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn provided_params(&self) -> Vec<Symbol> {
        vec![*TICKS]
    }

    fn params(&self) -> Params {
        crate::params!("ticks" => self.ticks)
    }

    fn subtitle(&self) -> String {
        format!("{} ticks", self.ticks)
    }

    fn on_start(&mut self, _ctx: &mut Context) -> Result<(), TickError> {
        self.elapsed = 0;
        Ok(())
    }

    fn on_update(&mut self, _ctx: &mut Context) -> Result<NodeState, TickError> {
        if self.elapsed >= self.ticks {
            return Ok(NodeState::Success);
        }
        self.elapsed += 1;
        Ok(NodeState::Running)
    }
}

#[derive(Clone)]
pub struct LogNode {
    message: String,
}

impl LogNode {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn from_params(params: &Params) -> CreateNodeResult<Self> {
        Ok(Self::new(
            parse_param::<String>("Log", params, *MESSAGE)?.unwrap_or_default(),
        ))
    }
}

impl BehaviourNode for LogNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn provided_params(&self) -> Vec<Symbol> {
        vec![*MESSAGE]
    }

    fn params(&self) -> Params {
        crate::params!("message" => self.message)
    }

    fn subtitle(&self) -> String {
        self.message.clone()
    }

    fn on_update(&mut self, ctx: &mut Context) -> Result<NodeState, TickError> {
        tracing::info!(node = %ctx.node_id(), "{}", self.message);
        Ok(NodeState::Success)
    }
}

#[cfg(test)]
mod test;
