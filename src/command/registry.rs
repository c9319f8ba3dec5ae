use super::CommandDescriptor;
use crate::core::{BotError, Result};
use log::info;
use std::collections::HashMap;

/// Lookup table from command name to descriptor.
///
/// Populated once at process start and treated as read-only thereafter; the
/// dispatcher shares it behind an `Arc` with no further locking. Names are
/// case-insensitive.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registers a command. A case-insensitive name collision is a
    /// programming error in the static command set, so it fails startup.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<()> {
        let key = descriptor.name().to_lowercase();

        if self.commands.contains_key(&key) {
            return Err(BotError::DuplicateCommand(descriptor.name().to_string()));
        }

        info!(
            "registered command: name={} required_capabilities={:?}",
            descriptor.name(),
            descriptor.required_capabilities
        );
        self.commands.insert(key, descriptor);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn resolve(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Registered command names, sorted for stable listings.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .commands
            .values()
            .map(|descriptor| descriptor.name().to_string())
            .collect();
        names.sort();
        names
    }
}
