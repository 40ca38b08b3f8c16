//! Line parser for the duel event stream.
//!
//! The stream is a sequence of `event: <type>` and `data: <json>` lines. An `event:` line sets
//! the pending type, the next `data:` line is decoded with it and consumes it. Each `data:` line
//! holds one complete JSON payload, so nothing else is carried between lines. Lone `:` lines
//! (keep-alives), blank lines and anything else are skipped.

use duel_api::StreamEvent;
use tracing::{debug, trace};

/// Result of feeding one line to the [`EventParser`].
#[derive(Debug, PartialEq)]
pub enum Frame {
    /// Nothing to dispatch yet.
    Skip,
    /// A complete event of a known type.
    Event(StreamEvent),
    /// A complete event whose type this client does not handle.
    Ignored(String),
}

/// Parser state: the type announced by the last `event:` line, until a `data:` line uses it.
#[derive(Debug, Default)]
pub struct EventParser {
    pending_event: Option<String>,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one line (with or without its line terminator).
    ///
    /// # Errors
    /// The `data:` payload of a known event type is not valid JSON for that event.
    pub fn feed(&mut self, line: &str) -> Result<Frame, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() || line == ":" {
            return Ok(Frame::Skip);
        }

        if let Some(event) = line.strip_prefix("event:") {
            self.pending_event = Some(event.trim().to_owned());
            return Ok(Frame::Skip);
        }

        if let Some(data) = line.strip_prefix("data:") {
            return self.complete(data.trim());
        }

        trace!(line, "unrecognized stream line");
        Ok(Frame::Skip)
    }

    fn complete(&mut self, data: &str) -> Result<Frame, serde_json::Error> {
        let Some(event_type) = self.pending_event.take() else {
            debug!("data without event type");
            return Ok(Frame::Skip);
        };
        Ok(match StreamEvent::decode(&event_type, data)? {
            Some(event) => Frame::Event(event),
            None => Frame::Ignored(event_type),
        })
    }
}

#[cfg(test)]
mod tests {
    use duel_api::{DuelFinished, DuelStarted};

    use super::*;

    fn feed_all(parser: &mut EventParser, lines: &[&str]) -> Vec<Frame> {
        lines
            .iter()
            .map(|l| parser.feed(l).unwrap())
            .filter(|f| *f != Frame::Skip)
            .collect()
    }

    #[test]
    fn events_in_arrival_order() {
        let mut parser = EventParser::new();
        let frames = feed_all(
            &mut parser,
            &[
                ":",
                "event: DuelStarted\n",
                "data: {\"duel_id\": 7, \"opponent_id\": 2, \"task_id\": \"t\"}\n",
                "",
                ":",
                "event: DuelFinished",
                "data: {\"duel_id\": 7}",
            ],
        );
        assert_eq!(
            frames,
            vec![
                Frame::Event(StreamEvent::DuelStarted(DuelStarted {
                    duel_id: 7,
                    opponent_id: Some(2),
                    task_id: Some("t".into())
                })),
                Frame::Event(StreamEvent::DuelFinished(DuelFinished { duel_id: 7 })),
            ]
        );
    }

    #[test]
    fn unknown_types_are_reported_not_decoded() {
        let mut parser = EventParser::new();
        let frames = feed_all(&mut parser, &["event: Ping", "data: whatever"]);
        assert_eq!(frames, vec![Frame::Ignored("Ping".into())]);
    }

    #[test]
    fn data_consumes_the_event_type() {
        let mut parser = EventParser::new();
        let frames = feed_all(
            &mut parser,
            &["event: DuelFinished", "data: {\"duel_id\": 1}", "data: {\"duel_id\": 2}"],
        );
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn orphan_data_is_not_carried_over() {
        let mut parser = EventParser::new();
        let frames = feed_all(
            &mut parser,
            &[
                "data: {\"duel_id\": 1}",
                "event: DuelFinished",
                "",
                "data: {\"duel_id\": 2}",
            ],
        );
        assert_eq!(
            frames,
            vec![Frame::Event(StreamEvent::DuelFinished(DuelFinished { duel_id: 2 }))]
        );
    }

    #[test]
    fn invalid_json_is_an_error() {
        let mut parser = EventParser::new();
        parser.feed("event: DuelStarted").unwrap();
        assert!(parser.feed("data: {duel_id").is_err());
    }
}
