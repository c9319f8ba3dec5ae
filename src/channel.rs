use log::{debug, info};

/// Result of checking whether a channel may use the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCheck {
    pub is_valid: bool,
    pub reason: Option<String>,
}

impl ChannelCheck {
    fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    fn invalid(reason: String) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
        }
    }
}

/// Accepts only channels whose name carries the configured support prefix.
pub struct SupportChannelValidator {
    prefix: String,
}

impl SupportChannelValidator {
    pub fn new(prefix: &str) -> Self {
        info!("initialized support channel validator: prefix={}", prefix);
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_valid_channel(&self, channel_name: &str) -> ChannelCheck {
        if !channel_name.starts_with(&self.prefix) {
            info!(
                "channel validation failed: channel={} missing prefix '{}'",
                channel_name, self.prefix
            );
            return ChannelCheck::invalid(format!(
                "This channel does not have the required prefix '{}'",
                self.prefix
            ));
        }

        debug!("channel validation successful: channel={}", channel_name);
        ChannelCheck::valid()
    }
}

impl Default for SupportChannelValidator {
    fn default() -> Self {
        Self::new("support-")
    }
}
