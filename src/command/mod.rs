pub mod dispatcher;
pub mod registry;

pub use dispatcher::{CommandDispatcher, Services};
pub use registry::CommandRegistry;

use crate::auth::DenialReason;
use crate::core::{Capability, CommandCategory, Principal, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Accepts outbound text for one invocation. Implemented by the
/// chat-platform collaborator; the first send is the reply, later sends are
/// follow-ups (a display distinction that is opaque to this core).
#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn send(&self, content: &str) -> Result<()>;
}

/// Reply channel for one invocation, counting how many messages went out so
/// the dispatcher can uphold its exactly-one-reply guarantee.
pub struct Reply {
    sink: Box<dyn OutboundSink>,
    sent: AtomicUsize,
}

impl Reply {
    pub fn new(sink: Box<dyn OutboundSink>) -> Self {
        Self {
            sink,
            sent: AtomicUsize::new(0),
        }
    }

    pub async fn send(&self, content: &str) -> Result<()> {
        self.sink.send(content).await?;
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Number of messages successfully sent so far.
    pub fn message_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn has_replied(&self) -> bool {
        self.message_count() > 0
    }
}

/// One resolved, in-flight request to execute a named command. Constructed
/// per inbound event, consumed once, not retained.
pub struct Invocation {
    pub command_name: String,
    pub principal: Principal,
    pub args: Vec<String>,
    pub reply: Reply,
}

impl Invocation {
    pub fn new(
        command_name: &str,
        principal: Principal,
        args: Vec<String>,
        sink: Box<dyn OutboundSink>,
    ) -> Self {
        Self {
            command_name: command_name.to_string(),
            principal,
            args,
            reply: Reply::new(sink),
        }
    }
}

/// Executes one command. Handlers may read and write the injected services
/// and should send at most one direct reply through the invocation.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, invocation: &Invocation, services: &Services) -> Result<()>;
}

/// Static description of a command, for help generation and validation.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub name: String,
    pub description: String,
    pub category: CommandCategory,
    pub examples: Vec<String>,
}

impl CommandMetadata {
    pub fn new(name: &str, description: &str, category: CommandCategory) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category,
            examples: Vec::new(),
        }
    }

    pub fn example(mut self, example: &str) -> Self {
        self.examples.push(example.to_string());
        self
    }
}

/// A registered command: metadata, the capabilities it demands, and its
/// handler. Immutable after registration.
pub struct CommandDescriptor {
    pub metadata: CommandMetadata,
    pub required_capabilities: BTreeSet<Capability>,
    pub handler: Box<dyn CommandHandler>,
}

impl CommandDescriptor {
    pub fn new(metadata: CommandMetadata, handler: Box<dyn CommandHandler>) -> Self {
        Self {
            metadata,
            required_capabilities: BTreeSet::new(),
            handler,
        }
    }

    pub fn require(mut self, capability: Capability) -> Self {
        self.required_capabilities.insert(capability);
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Terminal state of one dispatched invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    UnknownCommand,
    Denied(DenialReason),
    HandlerFailed,
}
