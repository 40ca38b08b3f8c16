use serde::Deserialize;

use crate::{DuelId, UserId};

/// Payload of a `DuelStarted` event.
///
/// The service may only send `duel_id`; clients are expected to read the rest from the duel
/// info endpoint.
#[derive(PartialEq, Eq, Debug, Clone, Deserialize)]
pub struct DuelStarted {
    pub duel_id: DuelId,
    #[serde(default)]
    pub opponent_id: Option<UserId>,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Payload of a `DuelFinished` event. The result itself is fetched separately.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Deserialize)]
pub struct DuelFinished {
    pub duel_id: DuelId,
}

/// A decoded event of the duel stream.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum StreamEvent {
    DuelStarted(DuelStarted),
    DuelFinished(DuelFinished),
}

impl StreamEvent {
    pub const DUEL_STARTED: &'static str = "DuelStarted";
    pub const DUEL_FINISHED: &'static str = "DuelFinished";

    /// Decodes `data` for a known `event_type`.
    ///
    /// Returns `Ok(None)` for event types this client does not know about.
    pub fn decode(event_type: &str, data: &str) -> Result<Option<StreamEvent>, serde_json::Error> {
        match event_type {
            Self::DUEL_STARTED => serde_json::from_str(data).map(|e| Some(Self::DuelStarted(e))),
            Self::DUEL_FINISHED => serde_json::from_str(data).map(|e| Some(Self::DuelFinished(e))),
            _ => Ok(None),
        }
    }

    pub fn duel_id(&self) -> DuelId {
        match self {
            StreamEvent::DuelStarted(e) => e.duel_id,
            StreamEvent::DuelFinished(e) => e.duel_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_known_events() {
        let event = StreamEvent::decode("DuelStarted", r#"{"duel_id":7}"#).unwrap();
        assert_eq!(
            event,
            Some(StreamEvent::DuelStarted(DuelStarted {
                duel_id: 7,
                opponent_id: None,
                task_id: None
            }))
        );

        let event = StreamEvent::decode("DuelFinished", r#"{"duel_id":7}"#).unwrap();
        assert_eq!(event.map(|e| e.duel_id()), Some(7));
    }

    #[test]
    fn unknown_event_type_is_skipped_without_parsing() {
        assert_eq!(StreamEvent::decode("Heartbeat", "not json").unwrap(), None);
    }

    #[test]
    fn bad_payload_is_an_error() {
        assert!(StreamEvent::decode("DuelFinished", "{").is_err());
    }
}
