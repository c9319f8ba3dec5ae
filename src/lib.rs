// ============================================================================
// supportbot-core Library
// ============================================================================

pub mod auth;
pub mod channel;
pub mod command;
pub mod commands;
pub mod config;
pub mod core;
pub mod memory;
pub mod personality;

// Re-export main types for convenience
pub use auth::{Authorization, DenialReason, PermissionGate, RolePolicy};
pub use channel::{ChannelCheck, SupportChannelValidator};
pub use command::{
    CommandDescriptor, CommandDispatcher, CommandHandler, CommandMetadata, CommandRegistry,
    DispatchOutcome, Invocation, OutboundSink, Reply, Services,
};
pub use config::BotConfig;
pub use core::{
    BotError, Capability, Clock, CommandCategory, ManualClock, MessageRecord, Principal, Result,
    SystemClock,
};
pub use memory::EphemeralMemory;
pub use personality::{Personality, PersonalityProfile};

use std::sync::Arc;

// ============================================================================
// High-level bot core facade
// ============================================================================

/// Wires the context store, permission gate, command registry and dispatcher
/// into one ready-to-use core.
///
/// The chat-platform glue feeds inbound messages to [`record_message`] and
/// command events to [`dispatch`]; everything in between (authorization,
/// execution, reply accounting, context eviction) happens here.
///
/// # Examples
///
/// ```no_run
/// use supportbot_core::{BotConfig, SupportBot};
///
/// # async fn run() -> supportbot_core::Result<()> {
/// let bot = SupportBot::new(BotConfig::default().admin_role_ids(["123"]))?;
///
/// bot.record_message("support-billing", "my invoice is wrong", "user-7").await;
/// // ... dispatch invocations as they arrive ...
/// bot.shutdown().await;
/// # Ok(())
/// # }
/// ```
///
/// [`record_message`]: SupportBot::record_message
/// [`dispatch`]: SupportBot::dispatch
pub struct SupportBot {
    dispatcher: CommandDispatcher,
    memory: Arc<EphemeralMemory>,
    gate: Arc<PermissionGate>,
    channels: SupportChannelValidator,
    config: BotConfig,
}

impl SupportBot {
    /// Builds the core from config with the system clock. Must be called
    /// from within a tokio runtime (the store spawns its sweeper).
    pub fn new(config: BotConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds the core with an injected clock, for deterministic tests.
    pub fn with_clock(config: BotConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let memory = EphemeralMemory::start(&config, clock);
        let gate = Arc::new(PermissionGate::new(RolePolicy::from_role_ids(
            &config.admin_role_ids,
        )));

        let mut registry = CommandRegistry::new();
        commands::register_builtins(&mut registry)?;

        let services = Arc::new(Services {
            memory: Arc::clone(&memory),
            personality: Arc::new(Personality::from_env()),
        });
        let dispatcher =
            CommandDispatcher::new(Arc::new(registry), Arc::clone(&gate), services);
        let channels = SupportChannelValidator::new(&config.support_channel_prefix);

        Ok(Self {
            dispatcher,
            memory,
            gate,
            channels,
            config,
        })
    }

    /// Builds the core from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(BotConfig::from_env()?)
    }

    /// Records an inbound channel message into ephemeral memory.
    pub async fn record_message(&self, channel_id: &str, content: &str, author_id: &str) {
        self.memory.add_message(channel_id, content, author_id).await;
    }

    /// Dispatches one command invocation.
    pub async fn dispatch(&self, invocation: Invocation) -> DispatchOutcome {
        self.dispatcher.dispatch(invocation).await
    }

    pub fn memory(&self) -> &Arc<EphemeralMemory> {
        &self.memory
    }

    pub fn gate(&self) -> &Arc<PermissionGate> {
        &self.gate
    }

    pub fn channel_validator(&self) -> &SupportChannelValidator {
        &self.channels
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Stops the store's sweeper and clears all held context. Idempotent.
    pub async fn shutdown(&self) {
        self.memory.shutdown().await;
    }
}
