use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("storage type {storage}: max_stacks must be at least 1")]
    ZeroMaxStacks { storage: String },
    #[error("storage type {storage}: {field} is not a finite number")]
    NonFiniteLimit { storage: String, field: &'static str },
    #[error("landmark locals must differ: both are slot {0}")]
    AliasedLocals(u16),
}
