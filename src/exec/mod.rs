pub mod chain;
pub mod context;
pub mod error;
pub mod outcome;
pub mod runner;
pub mod scheduler;

pub use chain::{ChainBuilder, ExecutionNode, Input, Output};
pub use context::CommandContext;
pub use error::ChainError;
pub use outcome::Outcome;
pub use runner::{NodeReport, RunReport, Runner};
pub use scheduler::{Scheduler, next_runnable};

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::commands::{self, Command};
use crate::config::Config;

/// Maps a command word to something the runner can invoke.
///
/// Resolution must not depend on anything but `name`: the chain builder
/// calls it once per command unit, before anything runs.
pub trait Resolver {
    type Handle;

    fn resolve(&self, name: &str) -> Option<Self::Handle>;

    /// Names close to an unresolved `name`, best first.
    fn suggest(&self, _name: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Edit distance within which [`CommandRegistry::suggest`] offers a name.
const SUGGEST_DISTANCE: usize = 2;

/// Registry of all runnable commands, keyed by command name.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Build the registry from configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        for name in &config.commands.enabled {
            match commands::builtin(name) {
                Some(command) => registry.register(name.clone(), command),
                None => warn!("ignoring unknown command '{name}' in configuration"),
            }
        }

        // Aliases point at registered names, never at other aliases.
        let mut aliases = Vec::new();
        for (alias, target) in &config.aliases.entries {
            match registry.commands.get(target) {
                Some(command) => aliases.push((alias.clone(), Arc::clone(command))),
                None => warn!("ignoring alias '{alias}': '{target}' is not a registered command"),
            }
        }
        for (alias, command) in aliases {
            registry.register(alias, command);
        }

        debug!("registered {} command name(s)", registry.commands.len());
        registry
    }

    /// Add or replace a command under `name`.
    pub fn register(&mut self, name: impl Into<String>, command: Arc<dyn Command>) {
        self.commands.insert(name.into(), command);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(name)
    }

    /// Every registered name, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::from_config(&Config::default_config())
    }
}

impl Resolver for CommandRegistry {
    type Handle = Arc<dyn Command>;

    fn resolve(&self, name: &str) -> Option<Self::Handle> {
        self.get(name).cloned()
    }

    fn suggest(&self, name: &str) -> Vec<String> {
        let mut close: Vec<(usize, &str)> = self
            .names()
            .into_iter()
            .map(|candidate| (edit_distance(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= SUGGEST_DISTANCE)
            .collect();
        close.sort_unstable();
        close.into_iter().map(|(_, n)| n.to_string()).collect()
    }
}

/// Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}
