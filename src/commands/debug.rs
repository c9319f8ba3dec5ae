use crate::command::{
    CommandDescriptor, CommandHandler, CommandMetadata, Invocation, Services,
};
use crate::core::{Capability, CommandCategory, Result};
use async_trait::async_trait;
use log::{debug, warn};

/// `debug memory` renders the ephemeral memory snapshot for administrators.
pub struct DebugCommand;

#[async_trait]
impl CommandHandler for DebugCommand {
    async fn execute(&self, invocation: &Invocation, services: &Services) -> Result<()> {
        match invocation.args.first().map(String::as_str) {
            Some("memory") => {
                let info = services.memory.describe().await;
                invocation.reply.send(&info).await?;
                debug!(
                    "debug memory info displayed: user={}",
                    invocation.principal.user_id
                );
            }
            other => {
                warn!(
                    "unknown debug subcommand: user={} subcommand={:?}",
                    invocation.principal.user_id, other
                );
                invocation.reply.send("Unknown debug command").await?;
            }
        }
        Ok(())
    }
}

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor::new(
        CommandMetadata::new(
            "debug",
            "Debug commands for administrators",
            CommandCategory::Admin,
        )
        .example("/debug memory - View current ephemeral memory contents"),
        Box::new(DebugCommand),
    )
    .require(Capability::Admin)
}
