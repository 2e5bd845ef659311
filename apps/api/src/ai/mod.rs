//! AI stage: provider configuration, the provider back-ends, and the manager that turns a ranked
//! list into a list with summaries.

use std::time::Duration;

use thiserror::Error;

pub mod config;
pub mod cooldown;
pub mod handlers;
pub mod manager;
pub mod prompts;
pub mod providers;

pub use cooldown::Cooldown;
pub use manager::AiManager;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0}")]
    Configuration(String),

    #[error(
        "Rate limit cooldown active. Please wait {} seconds before testing again.",
        whole_seconds(.retry_after)
    )]
    CooldownActive { retry_after: Duration },

    #[error("No AI provider configured")]
    NotConfigured,

    #[error("{0}")]
    Verification(String),
}

/// Rounds up, never below one second. Used for `Retry-After`.
pub fn whole_seconds(duration: &Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(&Duration::from_millis(2100)), 3);
        assert_eq!(whole_seconds(&Duration::from_secs(2)), 2);
        assert_eq!(whole_seconds(&Duration::ZERO), 1);
    }

    #[test]
    fn test_cooldown_message() {
        let err = AiError::CooldownActive {
            retry_after: Duration::from_millis(1500),
        };
        assert_eq!(
            err.to_string(),
            "Rate limit cooldown active. Please wait 2 seconds before testing again."
        );
    }
}
