use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single message captured into a conversation's ephemeral context.
///
/// Immutable once created; owned by the store entry that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub content: String,
    pub author_id: String,
    pub recorded_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(content: &str, author_id: &str, recorded_at: DateTime<Utc>) -> Self {
        Self {
            content: content.to_string(),
            author_id: author_id.to_string(),
            recorded_at,
        }
    }
}

/// Abstract permission a principal may hold, required by some commands.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Capability {
    /// Full administrative access
    Admin,
    /// Manage messages in a channel
    ManageMessages,
    /// Manage roles for members
    ManageRoles,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Admin => "Admin",
            Capability::ManageMessages => "ManageMessages",
            Capability::ManageRoles => "ManageRoles",
        };
        f.write_str(name)
    }
}

/// Grouping for help generation and command listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandCategory {
    Admin,
    General,
    Support,
}

/// The caller's identity for one invocation.
///
/// Supplied fresh per invocation by the chat-platform collaborator and never
/// cached. `capabilities` is `None` when the collaborator could not resolve
/// them (e.g. the message arrived outside a guild context).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role_ids: Vec<String>,
    pub capabilities: Option<BTreeSet<Capability>>,
}

impl Principal {
    /// Creates a principal with no roles and an empty (but resolved)
    /// capability set.
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            role_ids: Vec::new(),
            capabilities: Some(BTreeSet::new()),
        }
    }

    /// Adds a role id held by this principal.
    pub fn with_role(mut self, role_id: &str) -> Self {
        self.role_ids.push(role_id.to_string());
        self
    }

    /// Adds a capability resolved by the external collaborator.
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities
            .get_or_insert_with(BTreeSet::new)
            .insert(capability);
        self
    }

    /// Marks the capability set as unresolvable.
    pub fn with_unresolved_capabilities(mut self) -> Self {
        self.capabilities = None;
        self
    }
}
