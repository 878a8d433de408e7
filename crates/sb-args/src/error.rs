//! Error types for args state

/// Args store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgsError {
    /// No args known for the story: it has not completed a prepare cycle
    #[error("no args known for story '{0}', has it been rendered yet?")]
    NotRendered(String),
}

/// Rejected `key:value` pair in a persisted args string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistedError {
    /// Pair has no `:` separator
    #[error("malformed pair '{0}'")]
    MalformedPair(String),

    /// Key path could not be parsed
    #[error("invalid key path '{0}'")]
    InvalidPath(String),

    /// Key or value contains characters outside the safe set
    #[error("omitted potentially unsafe value for '{0}'")]
    Unsafe(String),
}
