use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command '{0}' is already registered")]
    DuplicateCommand(String),

    #[error("Command execution failed: {0}")]
    Execution(String),

    #[error("Failed to deliver reply: {0}")]
    ReplyFailed(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
