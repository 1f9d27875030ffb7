//! Structured events for observability consumers.
//!
//! This module provides functions for emitting structured events using the
//! `tracing` crate. Events can be captured by any tracing subscriber (JSON
//! file, OpenTelemetry, etc.) and fed to dashboards or run-history records
//! without the emitting code knowing who is listening.

use crate::circuit_breaker::CircuitState;
use crate::core::ResourceName;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Event describing one completed resilient call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    /// Event type, always `"call_completed"`.
    pub event_type: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Unique id correlating log lines of one call.
    pub call_id: String,

    /// Resource the call targeted.
    pub resource: ResourceName,

    /// Where the call ended: `"ok"` or a failure stage tag.
    pub disposition: String,

    /// Number of attempts performed (zero when admission was denied).
    pub attempts: u32,

    /// Wall time of the whole call in milliseconds.
    pub duration_ms: u64,
}

impl CallEvent {
    /// Creates a call-completed event stamped now.
    pub fn new(
        call_id: Uuid,
        resource: &ResourceName,
        disposition: &str,
        attempts: u32,
        duration: Duration,
    ) -> Self {
        Self {
            event_type: "call_completed".to_string(),
            timestamp: Utc::now(),
            call_id: call_id.to_string(),
            resource: resource.clone(),
            disposition: disposition.to_string(),
            attempts,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Event describing a circuit state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitTransitionEvent {
    /// Event type, always `"circuit_transition"`.
    pub event_type: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Resource whose circuit changed.
    pub resource: ResourceName,

    /// State before the transition.
    pub from: CircuitState,

    /// State after the transition.
    pub to: CircuitState,

    /// Consecutive failure count at transition time.
    pub consecutive_failures: u32,
}

/// Emits an event for a completed call.
pub fn emit_call_completed(
    call_id: Uuid,
    resource: &ResourceName,
    disposition: &str,
    attempts: u32,
    duration: Duration,
) {
    tracing::info!(
        target: "callguard::events",
        event_type = "call_completed",
        call_id = %call_id,
        resource = %resource,
        disposition = %disposition,
        attempts,
        duration_ms = duration.as_millis() as u64,
        "Call completed"
    );
}

/// Emits an event for a circuit state transition.
pub fn emit_circuit_transition(
    resource: &ResourceName,
    from: CircuitState,
    to: CircuitState,
    consecutive_failures: u32,
) {
    tracing::info!(
        target: "callguard::events",
        event_type = "circuit_transition",
        resource = %resource,
        from = %from,
        to = %to,
        consecutive_failures,
        "Circuit state changed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_event_serializes() {
        let event = CallEvent::new(
            Uuid::new_v4(),
            &"gemini".into(),
            "retries_exhausted",
            3,
            Duration::from_millis(1500),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "call_completed");
        assert_eq!(json["resource"], "gemini");
        assert_eq!(json["disposition"], "retries_exhausted");
        assert_eq!(json["attempts"], 3);
        assert_eq!(json["duration_ms"], 1500);
    }

    #[test]
    fn test_transition_event_serializes() {
        let event = CircuitTransitionEvent {
            event_type: "circuit_transition".to_string(),
            timestamp: Utc::now(),
            resource: "newsapi".into(),
            from: CircuitState::Closed,
            to: CircuitState::Open,
            consecutive_failures: 3,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["from"], "closed");
        assert_eq!(json["to"], "open");
    }
}
