use crate::command::{
    CommandDescriptor, CommandHandler, CommandMetadata, Invocation, Services,
};
use crate::core::{Capability, CommandCategory, Result};
use async_trait::async_trait;
use log::info;

/// `admintest` confirms that the caller passed the admin gate.
pub struct AdminTestCommand;

#[async_trait]
impl CommandHandler for AdminTestCommand {
    async fn execute(&self, invocation: &Invocation, _services: &Services) -> Result<()> {
        info!(
            "admin test command executed: user={}",
            invocation.principal.user_id
        );
        invocation
            .reply
            .send("Success! You have admin privileges.")
            .await
    }
}

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor::new(
        CommandMetadata::new(
            "admintest",
            "Test command to verify admin role permissions",
            CommandCategory::Admin,
        )
        .example("/admintest - Verify you have admin privileges"),
        Box::new(AdminTestCommand),
    )
    .require(Capability::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::OutboundSink;
    use crate::config::BotConfig;
    use crate::core::{Principal, SystemClock};
    use crate::memory::EphemeralMemory;
    use crate::personality::Personality;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        messages: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl OutboundSink for RecordingSink {
        async fn send(&self, content: &str) -> Result<()> {
            self.messages.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_replies_with_success_message() {
        let services = Services {
            memory: EphemeralMemory::start(&BotConfig::default(), Arc::new(SystemClock)),
            personality: Arc::new(Personality::default()),
        };
        let sink = RecordingSink::default();
        let invocation = Invocation::new(
            "admintest",
            Principal::new("admin-1"),
            Vec::new(),
            Box::new(sink.clone()),
        );

        AdminTestCommand
            .execute(&invocation, &services)
            .await
            .unwrap();

        let sent = sink.messages.lock().unwrap().clone();
        assert_eq!(sent, vec!["Success! You have admin privileges.".to_string()]);
    }

    #[test]
    fn test_descriptor_requires_admin() {
        let descriptor = descriptor();
        assert_eq!(descriptor.name(), "admintest");
        assert!(descriptor.required_capabilities.contains(&Capability::Admin));
    }
}
