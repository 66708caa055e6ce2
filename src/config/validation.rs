//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, buffers > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.host `{0}` is not an IP address")]
    InvalidHost(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("relay.default_room must not be empty")]
    EmptyDefaultRoom,
    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
    #[error("fetch.user_agent must not be empty")]
    EmptyUserAgent,
    #[error("timeouts.request_secs ({request}) must exceed fetch.timeout_secs ({fetch})")]
    RequestTimeoutTooShort { request: u64, fetch: u64 },
}

/// Check a parsed configuration for values serde cannot reject on its own.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.socket_addr().is_err() {
        errors.push(ValidationError::InvalidHost(config.listener.host.clone()));
    }
    if config.fetch.timeout_secs == 0 {
        errors.push(ValidationError::Zero("fetch.timeout_secs"));
    }
    if config.fetch.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("fetch.connect_timeout_secs"));
    }
    if config.fetch.user_agent.trim().is_empty() {
        errors.push(ValidationError::EmptyUserAgent);
    }
    if config.relay.peer_buffer == 0 {
        errors.push(ValidationError::Zero("relay.peer_buffer"));
    }
    if config.relay.default_room.is_empty() {
        errors.push(ValidationError::EmptyDefaultRoom);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    } else if config.timeouts.request_secs <= config.fetch.timeout_secs {
        // Otherwise a slow upstream surfaces as 408 instead of a proxy fetch failure.
        errors.push(ValidationError::RequestTimeoutTooShort {
            request: config.timeouts.request_secs,
            fetch: config.fetch.timeout_secs,
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.host = "not-an-ip".into();
        config.relay.peer_buffer = 0;
        config.relay.default_room.clear();
        config.fetch.timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero("relay.peer_buffer")));
        assert!(errors.contains(&ValidationError::EmptyDefaultRoom));
    }

    #[test]
    fn request_timeout_must_outlast_fetch_timeout() {
        let mut config = ServerConfig::default();
        config.fetch.timeout_secs = 30;
        config.timeouts.request_secs = 30;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::RequestTimeoutTooShort {
                request: 30,
                fetch: 30
            }])
        );

        config.timeouts.request_secs = 31;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn metrics_address_only_checked_when_enabled() {
        let mut config = ServerConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidMetricsAddress("nope".into())])
        );
    }
}
