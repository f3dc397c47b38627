//! Domain events: immutable facts recorded by aggregates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::id::{AggregateId, EventId};

/// Free-form metadata attached to an event (correlation ids, actor, ...).
pub type EventMetadata = BTreeMap<String, JsonValue>;

/// An immutable fact that occurred inside an aggregate's boundary.
///
/// Events are:
/// - **immutable**: no mutators; the payload is owned by the event
/// - **versioned**: `version` is the semver of the event *schema*, not a stream position
/// - **addressed**: `aggregate_id` names the aggregate that recorded it
///
/// `position` is only known once a store has assigned one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent<P, I = AggregateId> {
    id: EventId,
    version: String,
    occurred_at: DateTime<Utc>,
    #[serde(rename = "type")]
    event_type: String,
    aggregate_id: I,
    payload: P,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<EventMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<i64>,
}

impl<P, I> DomainEvent<P, I> {
    /// Create an event; `id` and `occurred_at` are generated.
    pub fn new(
        aggregate_id: I,
        event_type: impl Into<String>,
        version: impl Into<String>,
        payload: P,
    ) -> Self {
        Self {
            id: EventId::new(),
            version: version.into(),
            occurred_at: Utc::now(),
            event_type: event_type.into(),
            aggregate_id,
            payload,
            metadata: None,
            position: None,
        }
    }

    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = id;
        self
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    /// Schema version of this event type (semver string, e.g. `"1.0.0"`).
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Stable event name/type identifier (e.g. `"account.opened"`).
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn aggregate_id(&self) -> &I {
        &self.aggregate_id
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn metadata(&self) -> Option<&EventMetadata> {
        self.metadata.as_ref()
    }

    /// Stream position assigned by a store, if any.
    pub fn position(&self) -> Option<i64> {
        self.position
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn new_event_fills_id_and_timestamp() {
        let before = Utc::now();
        let aggregate_id = AggregateId::new();
        let event = DomainEvent::new(aggregate_id, "account.opened", "1.0.0", json!({"owner": "ada"}));

        assert_eq!(event.aggregate_id(), &aggregate_id);
        assert_eq!(event.event_type(), "account.opened");
        assert_eq!(event.version(), "1.0.0");
        assert_eq!(event.payload(), &json!({"owner": "ada"}));
        assert!(event.occurred_at() >= before);
        assert!(event.metadata().is_none());
        assert!(event.position().is_none());
    }

    #[test]
    fn generated_ids_are_unique_and_time_ordered() {
        let aggregate_id = AggregateId::new();
        let a = DomainEvent::new(aggregate_id, "t", "1.0.0", ());
        let b = DomainEvent::new(aggregate_id, "t", "1.0.0", ());
        assert_ne!(a.id(), b.id());
        assert!(a.id() < b.id());
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let id = EventId::new();
        let at = Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap();
        let mut metadata = EventMetadata::new();
        metadata.insert("correlation_id".to_string(), json!("c-1"));

        let event = DomainEvent::new(AggregateId::new(), "t", "2.1.0", 5u32)
            .with_id(id)
            .with_occurred_at(at)
            .with_metadata(metadata.clone())
            .with_position(12);

        assert_eq!(event.id(), id);
        assert_eq!(event.occurred_at(), at);
        assert_eq!(event.metadata(), Some(&metadata));
        assert_eq!(event.position(), Some(12));
        assert_eq!(event.into_payload(), 5);
    }
}
