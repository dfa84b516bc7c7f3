use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Task {0} not found")]
    TaskNotFound(i64),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Invalid tag '{0}', expected key=value")]
    InvalidTag(String),

    #[error("Invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("Hook failed: {0}")]
    Hook(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Control handle dropped while the session was waiting for input")]
    ControlClosed,

    #[error("Blocking call did not finish: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
