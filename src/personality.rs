use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tone and canned responses the bot speaks with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    pub tone: String,
    pub greetings: Vec<String>,
    pub default_response: String,
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self {
            tone: "friendly".to_string(),
            greetings: vec![
                "Hi there! How can I help you today?".to_string(),
                "Hello! I'm here to assist you.".to_string(),
                "Welcome! What can I do for you?".to_string(),
            ],
            default_response:
                "I'm not quite sure about that. Could you please clarify your question?"
                    .to_string(),
        }
    }
}

/// Provides greetings and the default response, with a runtime-swappable
/// profile. Greetings rotate round-robin so replies vary without an RNG.
pub struct Personality {
    profile: RwLock<PersonalityProfile>,
    next_greeting: AtomicUsize,
}

impl Personality {
    pub fn new(profile: PersonalityProfile) -> Self {
        Self {
            profile: RwLock::new(profile),
            next_greeting: AtomicUsize::new(0),
        }
    }

    /// Default profile with the tone taken from `BOT_TONE` when set.
    pub fn from_env() -> Self {
        let mut profile = PersonalityProfile::default();
        if let Ok(tone) = env::var("BOT_TONE") {
            profile.tone = tone;
        }
        Self::new(profile)
    }

    pub fn greeting(&self) -> String {
        let profile = self.read_profile();
        if profile.greetings.is_empty() {
            return profile.default_response;
        }
        let index = self.next_greeting.fetch_add(1, Ordering::Relaxed);
        profile.greetings[index % profile.greetings.len()].clone()
    }

    pub fn default_response(&self) -> String {
        self.read_profile().default_response
    }

    pub fn profile(&self) -> PersonalityProfile {
        self.read_profile()
    }

    pub fn update(&self, profile: PersonalityProfile) {
        let mut current = match self.profile.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = profile;
        info!("updated bot personality");
    }

    fn read_profile(&self) -> PersonalityProfile {
        match self.profile.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::new(PersonalityProfile::default())
    }
}
