use std::collections::VecDeque;

use vm::stdlib::core::map_of;
use vm::Value;

/// The six buttons, sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub a: bool,
    pub b: bool,
}

impl InputState {
    /// Guest view: a map from button name to bool.
    pub fn to_value(&self) -> Value {
        map_of([
            ("left", Value::Bool(self.left)),
            ("right", Value::Bool(self.right)),
            ("up", Value::Bool(self.up)),
            ("down", Value::Bool(self.down)),
            ("a", Value::Bool(self.a)),
            ("b", Value::Bool(self.b)),
        ])
    }
}

pub trait InputSource {
    fn snapshot(&mut self) -> InputState;
}

/// Nothing is ever pressed.
#[derive(Debug, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn snapshot(&mut self) -> InputState {
        InputState::default()
    }
}

/// Replays a fixed sequence of states, one per tick, then goes idle.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    queue: VecDeque<InputState>,
}

impl ScriptedInput {
    pub fn new(states: impl IntoIterator<Item = InputState>) -> Self {
        Self {
            queue: states.into_iter().collect(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn snapshot(&mut self) -> InputState {
        self.queue.pop_front().unwrap_or_default()
    }
}
