//! CLI errors.
//!
//! Each variant is the outermost context of a report; the library's own
//! report sits underneath it.

/// Failure of a CLI invocation.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to load configuration")]
    Config,

    #[error("failed to create completion backend")]
    Backend,

    #[error("failed to create quote source")]
    QuoteSource,

    #[error("invalid --threshold")]
    Threshold,

    #[error("{command} failed")]
    Command { command: &'static str },

    #[error("failed to encode output")]
    Encode,
}
