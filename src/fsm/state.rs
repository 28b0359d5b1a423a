//! State Table
//!
//! Each state owns an ordered list of outgoing transitions. Selection picks
//! the transition whose trigger qualifies earliest in the window; on an exact
//! tie the first declared transition wins.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use super::handler::{Action, DataHandler, HandlerRegistry};
use crate::config::MachineConfig;
use crate::error::ConfigError;
use crate::streaming::{Boundary, Delimiters, Switch};

/// Label of a state
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct StateName(String);

impl StateName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StateName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for StateName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Edge to another state
#[derive(Clone, Debug)]
pub struct Transition<C> {
    pub target: StateName,
    pub switch: Switch,
    pub action: Action<C>,
}

impl<C> Transition<C> {
    /// Transition emitting the trigger unchanged
    pub fn pass(target: impl Into<StateName>, switch: Switch) -> Self {
        Self {
            target: target.into(),
            switch,
            action: Action::PassThrough,
        }
    }

    /// Transition replacing deferred bytes and trigger through `handler`
    pub fn replace<H>(target: impl Into<StateName>, switch: Switch, handler: H) -> Self
    where
        H: DataHandler<C> + 'static,
    {
        Self {
            target: target.into(),
            switch,
            action: Action::replace(handler),
        }
    }
}

/// Outgoing transitions of one state, in declaration order
#[derive(Clone, Debug)]
pub struct State<C> {
    transitions: Vec<Transition<C>>,
}

impl<C> State<C> {
    pub fn new(transitions: Vec<Transition<C>>) -> Self {
        Self { transitions }
    }

    /// State without transitions; every byte passes through
    pub fn terminal() -> Self {
        Self::new(Vec::new())
    }

    pub fn transitions(&self) -> &[Transition<C>] {
        &self.transitions
    }

    /// Earliest qualifying transition in `window`, with its offset.
    pub fn select(&self, window: &[u8], boundary: &Boundary) -> Option<(usize, &Transition<C>)> {
        let mut best: Option<(usize, &Transition<C>)> = None;

        for transition in &self.transitions {
            let Some(i) = transition.switch.find(window, boundary) else {
                continue;
            };
            // Strictly smaller only, ties keep the earlier declaration
            if best.map_or(true, |(min, _)| i < min) {
                best = Some((i, transition));
            }
        }

        best
    }

    /// Largest trigger footprint over all transitions, 0 without transitions.
    pub fn footprint(&self) -> usize {
        self.transitions
            .iter()
            .map(|t| t.switch.footprint())
            .max()
            .unwrap_or(0)
    }

    /// Whether literal bytes must be held back for a handler
    pub fn defers(&self) -> bool {
        self.transitions.iter().any(|t| t.action.has_handler())
    }
}

impl<C> Default for State<C> {
    fn default() -> Self {
        Self::terminal()
    }
}

/// Complete immutable state table plus the state to start in
#[derive(Clone, Debug)]
pub struct Description<C> {
    initial: StateName,
    states: HashMap<StateName, State<C>>,
}

impl<C> Description<C> {
    pub fn new(initial: impl Into<StateName>) -> Self {
        Self {
            initial: initial.into(),
            states: HashMap::new(),
        }
    }

    /// Add or replace a state
    pub fn state(mut self, name: impl Into<StateName>, state: State<C>) -> Self {
        self.states.insert(name.into(), state);
        self
    }

    pub fn initial(&self) -> &StateName {
        &self.initial
    }

    pub fn get(&self, name: &StateName) -> Option<&State<C>> {
        self.states.get(name)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Largest footprint of any state
    pub fn footprint(&self) -> usize {
        self.states.values().map(State::footprint).max().unwrap_or(0)
    }

    /// Check the table is closed and fits a window of `capacity` bytes.
    pub fn validate(&self, capacity: usize) -> Result<(), ConfigError> {
        if !self.states.contains_key(&self.initial) {
            return Err(ConfigError::UnknownState(self.initial.clone()));
        }

        for (name, state) in &self.states {
            for transition in &state.transitions {
                if !self.states.contains_key(&transition.target) {
                    return Err(ConfigError::UnknownTarget {
                        state: name.clone(),
                        target: transition.target.clone(),
                    });
                }
            }
        }

        let footprint = self.footprint();
        if capacity == 0 || capacity < footprint {
            return Err(ConfigError::BufferTooSmall { capacity, footprint });
        }

        Ok(())
    }
}

impl<C: 'static> Description<C> {
    /// Build a table from configuration, resolving handler names in `registry`.
    pub fn from_config(config: &MachineConfig, registry: &HandlerRegistry<C>) -> Result<Self, ConfigError> {
        let mut description = Description::new(config.initial_state.as_str());

        for (name, transitions) in &config.states {
            let mut built = Vec::with_capacity(transitions.len());

            for t in transitions {
                let switch = Switch::new(t.trigger.as_bytes())?
                    .with_delimiters(Delimiters::new(
                        t.delimiters.left.as_bytes(),
                        t.delimiters.right.as_bytes(),
                    ))
                    .with_escape(t.escape);

                let action = match &t.handler {
                    None => Action::PassThrough,
                    Some(handler) => registry
                        .action(handler)
                        .ok_or_else(|| ConfigError::UnknownHandler(handler.clone()))?,
                };

                built.push(Transition {
                    target: StateName::new(t.target.as_str()),
                    switch,
                    action,
                });
            }

            description = description.state(name.as_str(), State::new(built));
        }

        description.validate(config.buffer_size)?;
        Ok(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::handler::void;

    fn switch(trigger: &str) -> Switch {
        Switch::new(trigger).unwrap()
    }

    #[test]
    fn test_select_earliest() {
        let state: State<()> = State::new(vec![
            Transition::pass("a", switch(">")),
            Transition::pass("b", switch("<")),
        ]);

        let (i, t) = state.select(b"x<y>z", &Boundary::default()).unwrap();
        assert_eq!(i, 1);
        assert_eq!(t.target.as_str(), "b");
    }

    #[test]
    fn test_select_tie_keeps_first_declared() {
        let state: State<()> = State::new(vec![
            Transition::pass("first", switch("<")),
            Transition::pass("second", switch("<<")),
            Transition::pass("third", switch("<")),
        ]);

        let (i, t) = state.select(b"ab<<c", &Boundary::default()).unwrap();
        assert_eq!(i, 2);
        assert_eq!(t.target.as_str(), "first");
    }

    #[test]
    fn test_select_none() {
        let state: State<()> = State::new(vec![Transition::pass("a", switch("<"))]);
        assert!(state.select(b"abc", &Boundary::default()).is_none());
        assert!(State::<()>::terminal().select(b"abc", &Boundary::default()).is_none());
    }

    #[test]
    fn test_footprint_and_defers() {
        let state: State<()> = State::new(vec![
            Transition::pass("a", switch("<")),
            Transition::replace(
                "b",
                switch("-->").with_delimiters(Delimiters::left(" ")),
                void::<()>,
            ),
        ]);

        assert_eq!(state.footprint(), 4);
        assert!(state.defers());
        assert_eq!(State::<()>::terminal().footprint(), 0);
        assert!(!State::<()>::terminal().defers());
    }

    #[test]
    fn test_validate() {
        let good: Description<()> = Description::new("a")
            .state("a", State::new(vec![Transition::pass("b", switch("abcd"))]))
            .state("b", State::terminal());
        assert!(good.validate(4).is_ok());
        assert!(matches!(
            good.validate(3),
            Err(ConfigError::BufferTooSmall { capacity: 3, footprint: 4 })
        ));

        let missing_initial: Description<()> = Description::new("x").state("a", State::terminal());
        assert!(matches!(
            missing_initial.validate(16),
            Err(ConfigError::UnknownState(_))
        ));

        let dangling: Description<()> =
            Description::new("a").state("a", State::new(vec![Transition::pass("zzz", switch("<"))]));
        assert!(matches!(
            dangling.validate(16),
            Err(ConfigError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn test_from_config() {
        let json = r#"{
            "initial_state": "text",
            "states": {
                "text": [{ "target": "tag", "trigger": "<" }],
                "tag": [{ "target": "text", "trigger": ">", "handler": "void" }]
            }
        }"#;
        let config = MachineConfig::from_bytes(json.as_bytes()).unwrap();
        let description = Description::<()>::from_config(&config, &HandlerRegistry::new()).unwrap();

        assert_eq!(description.initial().as_str(), "text");
        assert_eq!(description.len(), 2);
        assert!(description.get(&"tag".into()).unwrap().defers());
        assert!(!description.get(&"text".into()).unwrap().defers());
    }

    #[test]
    fn test_from_config_unknown_handler() {
        let json = r#"{
            "initial_state": "a",
            "states": { "a": [{ "target": "a", "trigger": "x", "handler": "nope" }] }
        }"#;
        let config = MachineConfig::from_bytes(json.as_bytes()).unwrap();
        let result = Description::<()>::from_config(&config, &HandlerRegistry::new());

        assert!(matches!(result, Err(ConfigError::UnknownHandler(name)) if name == "nope"));
    }
}
