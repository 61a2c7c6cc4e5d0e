use crate::models::OrderStatus;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error occurred")]
    Network(#[source] reqwest::Error),

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Invalid response from server: {0}")]
    Protocol(String),

    #[error("{0}")]
    Validation(String),

    #[error("Order is already {from} and cannot move to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T> From<Result<T, GatewayError>> for Outcome<T> {
    fn from(result: Result<T, GatewayError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_carries_error_message() {
        let outcome: Outcome<()> =
            Err(GatewayError::server(404, "Order not found")).into();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Order not found"));
        assert!(outcome.data.is_none());
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = GatewayError::InvalidTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::InProgress,
        };
        assert_eq!(
            err.to_string(),
            "Order is already completed and cannot move to in-progress"
        );
    }

    #[test]
    fn outcome_serializes_without_empty_fields() {
        let outcome = Outcome::ok(3u32);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "data": 3 }));
    }
}
