//! Inbound message from a channel: delivered to the router for one dispatch.

/// A message from a chat, routed to the relay path, the action path, or
/// dropped. Exists only for the duration of one dispatch.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub sender_id: i64,
    pub text: String,
    /// Sender-side unix timestamp in seconds, checked against the staleness
    /// window at dispatch.
    pub timestamp: i64,
}
