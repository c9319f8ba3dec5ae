use super::{CommandRegistry, DispatchOutcome, Invocation};
use crate::auth::{Authorization, PermissionGate};
use crate::memory::EphemeralMemory;
use crate::personality::Personality;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Collaborators handlers may use during execution.
pub struct Services {
    pub memory: Arc<EphemeralMemory>,
    pub personality: Arc<Personality>,
}

/// Runs one invocation through Resolve, Authorize, Execute and Finalize.
///
/// Guarantees exactly one outward reply for every known command: the
/// handler's own reply, a denial reply, a failure reply, or a fallback
/// acknowledgement when a successful handler stayed silent. Unknown commands
/// are logged and get no reply. Failures are isolated to their invocation.
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    gate: Arc<PermissionGate>,
    services: Arc<Services>,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        gate: Arc<PermissionGate>,
        services: Arc<Services>,
    ) -> Self {
        Self {
            registry,
            gate,
            services,
        }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub async fn dispatch(&self, invocation: Invocation) -> DispatchOutcome {
        let Some(descriptor) = self.registry.resolve(&invocation.command_name) else {
            debug!(
                "unknown command attempted: name={} user={}",
                invocation.command_name, invocation.principal.user_id
            );
            return DispatchOutcome::UnknownCommand;
        };

        if !descriptor.required_capabilities.is_empty() {
            if let Authorization::Denied(reason) = self
                .gate
                .authorize(&invocation.principal, &descriptor.required_capabilities)
            {
                warn!(
                    "unauthorized command attempt: command={} user={}",
                    descriptor.name(),
                    invocation.principal.user_id
                );
                let text = format!("You cannot use this command. {}", reason);
                if let Err(err) = invocation.reply.send(&text).await {
                    error!("failed to send denial reply: {}", err);
                }
                return DispatchOutcome::Denied(reason);
            }
        }

        match descriptor.handler.execute(&invocation, &self.services).await {
            Ok(()) => {
                // A successful handler that never replied still owes the
                // caller one message.
                if !invocation.reply.has_replied() {
                    let ack = self.services.personality.default_response();
                    if let Err(err) = invocation.reply.send(&ack).await {
                        error!("failed to send fallback acknowledgement: {}", err);
                    }
                }
                info!(
                    "command executed: command={} user={}",
                    descriptor.name(),
                    invocation.principal.user_id
                );
                DispatchOutcome::Completed
            }
            Err(err) => {
                error!(
                    "error handling command: command={} user={} error={}",
                    descriptor.name(),
                    invocation.principal.user_id,
                    err
                );
                if let Err(send_err) = invocation
                    .reply
                    .send("There was an error executing that command.")
                    .await
                {
                    error!("failed to send failure reply: {}", send_err);
                }
                DispatchOutcome::HandlerFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{DenialReason, RolePolicy};
    use crate::command::{
        CommandDescriptor, CommandHandler, CommandMetadata, OutboundSink, Reply,
    };
    use crate::config::BotConfig;
    use crate::core::{BotError, Capability, CommandCategory, Principal, Result, SystemClock};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSink {
        fn sent(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OutboundSink for RecordingSink {
        async fn send(&self, content: &str) -> Result<()> {
            self.messages.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl CommandHandler for EchoHandler {
        async fn execute(&self, invocation: &Invocation, _services: &Services) -> Result<()> {
            invocation
                .reply
                .send(&format!("echo: {}", invocation.args.join(" ")))
                .await
        }
    }

    struct SilentHandler;

    #[async_trait]
    impl CommandHandler for SilentHandler {
        async fn execute(&self, _invocation: &Invocation, _services: &Services) -> Result<()> {
            Ok(())
        }
    }

    struct FailingHandler {
        reply_first: bool,
    }

    #[async_trait]
    impl CommandHandler for FailingHandler {
        async fn execute(&self, invocation: &Invocation, _services: &Services) -> Result<()> {
            if self.reply_first {
                invocation.reply.send("partial result").await?;
            }
            Err(BotError::Execution("boom".into()))
        }
    }

    fn build_dispatcher(policy: RolePolicy, descriptors: Vec<CommandDescriptor>) -> CommandDispatcher {
        let mut registry = CommandRegistry::new();
        for descriptor in descriptors {
            registry.register(descriptor).unwrap();
        }

        let config = BotConfig::default();
        let memory = EphemeralMemory::start(&config, Arc::new(SystemClock));
        let services = Arc::new(Services {
            memory,
            personality: Arc::new(Personality::default()),
        });

        CommandDispatcher::new(
            Arc::new(registry),
            Arc::new(PermissionGate::new(policy)),
            services,
        )
    }

    fn invocation(name: &str, principal: Principal, sink: &RecordingSink) -> Invocation {
        Invocation::new(name, principal, Vec::new(), Box::new(sink.clone()))
    }

    fn admin_only(name: &str, handler: Box<dyn CommandHandler>) -> CommandDescriptor {
        CommandDescriptor::new(
            CommandMetadata::new(name, "test", CommandCategory::Admin),
            handler,
        )
        .require(Capability::Admin)
    }

    fn open_command(name: &str, handler: Box<dyn CommandHandler>) -> CommandDescriptor {
        CommandDescriptor::new(
            CommandMetadata::new(name, "test", CommandCategory::General),
            handler,
        )
    }

    #[tokio::test]
    async fn test_unknown_command_gets_no_reply() {
        let dispatcher = build_dispatcher(RolePolicy::default(), Vec::new());
        let sink = RecordingSink::default();

        let outcome = dispatcher
            .dispatch(invocation("ping", Principal::new("u1"), &sink))
            .await;

        assert_eq!(outcome, DispatchOutcome::UnknownCommand);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_denied_command_replies_with_missing_capability() {
        let dispatcher = build_dispatcher(
            RolePolicy::default(),
            vec![admin_only("wipe", Box::new(EchoHandler))],
        );
        let sink = RecordingSink::default();

        let outcome = dispatcher
            .dispatch(invocation("wipe", Principal::new("u1"), &sink))
            .await;

        let missing: BTreeSet<Capability> = [Capability::Admin].into_iter().collect();
        assert_eq!(
            outcome,
            DispatchOutcome::Denied(DenialReason::MissingCapabilities(missing))
        );
        assert_eq!(
            sink.sent(),
            vec!["You cannot use this command. Missing required permissions: Admin".to_string()]
        );
    }

    #[tokio::test]
    async fn test_denied_without_capability_info() {
        let dispatcher = build_dispatcher(
            RolePolicy::default(),
            vec![admin_only("wipe", Box::new(EchoHandler))],
        );
        let sink = RecordingSink::default();
        let principal = Principal::new("u1").with_unresolved_capabilities();

        let outcome = dispatcher.dispatch(invocation("wipe", principal, &sink)).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Denied(DenialReason::NoCapabilityInfo)
        );
        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Cannot verify permissions"));
    }

    #[tokio::test]
    async fn test_successful_handler_replies_exactly_once() {
        let dispatcher = build_dispatcher(
            RolePolicy::default(),
            vec![open_command("echo", Box::new(EchoHandler))],
        );
        let sink = RecordingSink::default();
        let mut invocation = invocation("echo", Principal::new("u1"), &sink);
        invocation.args = vec!["hello".to_string()];

        let outcome = dispatcher.dispatch(invocation).await;

        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(sink.sent(), vec!["echo: hello".to_string()]);
    }

    #[tokio::test]
    async fn test_silent_success_gets_fallback_acknowledgement() {
        let dispatcher = build_dispatcher(
            RolePolicy::default(),
            vec![open_command("quiet", Box::new(SilentHandler))],
        );
        let sink = RecordingSink::default();

        let outcome = dispatcher
            .dispatch(invocation("quiet", Principal::new("u1"), &sink))
            .await;

        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(
            sink.sent(),
            vec![Personality::default().default_response()]
        );
    }

    #[tokio::test]
    async fn test_failing_handler_gets_generic_failure_reply() {
        let dispatcher = build_dispatcher(
            RolePolicy::default(),
            vec![open_command("broken", Box::new(FailingHandler { reply_first: false }))],
        );
        let sink = RecordingSink::default();

        let outcome = dispatcher
            .dispatch(invocation("broken", Principal::new("u1"), &sink))
            .await;

        assert_eq!(outcome, DispatchOutcome::HandlerFailed);
        assert_eq!(
            sink.sent(),
            vec!["There was an error executing that command.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failure_after_reply_sends_follow_up_notice() {
        let dispatcher = build_dispatcher(
            RolePolicy::default(),
            vec![open_command("flaky", Box::new(FailingHandler { reply_first: true }))],
        );
        let sink = RecordingSink::default();

        let outcome = dispatcher
            .dispatch(invocation("flaky", Principal::new("u1"), &sink))
            .await;

        assert_eq!(outcome, DispatchOutcome::HandlerFailed);
        assert_eq!(
            sink.sent(),
            vec![
                "partial result".to_string(),
                "There was an error executing that command.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_admin_role_id_passes_the_gate() {
        let dispatcher = build_dispatcher(
            RolePolicy::from_role_ids(["mod-role"]),
            vec![admin_only("wipe", Box::new(EchoHandler))],
        );
        let sink = RecordingSink::default();
        let principal = Principal::new("u1").with_role("mod-role");

        let outcome = dispatcher.dispatch(invocation("wipe", principal, &sink)).await;

        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_invocation_does_not_block_the_next() {
        let dispatcher = build_dispatcher(
            RolePolicy::default(),
            vec![
                open_command("broken", Box::new(FailingHandler { reply_first: false })),
                open_command("echo", Box::new(EchoHandler)),
            ],
        );

        let failing_sink = RecordingSink::default();
        dispatcher
            .dispatch(invocation("broken", Principal::new("u1"), &failing_sink))
            .await;

        let sink = RecordingSink::default();
        let outcome = dispatcher
            .dispatch(invocation("echo", Principal::new("u2"), &sink))
            .await;

        assert_eq!(outcome, DispatchOutcome::Completed);
    }

    #[tokio::test]
    async fn test_reply_counts_messages() {
        let sink = RecordingSink::default();
        let reply = Reply::new(Box::new(sink.clone()));

        assert!(!reply.has_replied());
        reply.send("one").await.unwrap();
        reply.send("two").await.unwrap();
        assert_eq!(reply.message_count(), 2);
    }
}
