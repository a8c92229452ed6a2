//! Transport seam: send and edit chat messages without knowing the concrete
//! channel. The Telegram connector implements it for production; tests use
//! recording mocks.

use async_trait::async_trait;

/// Identifier of a sent message, used to edit it in place later.
pub type MessageId = i64;

/// Formatting mode for an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatting {
    Plain,
    Html,
}

/// Handle to a running channel (send, edit, stop).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;

    /// Stop the channel connector.
    fn stop(&self);

    /// Send a text message to a chat; returns the created message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        formatting: Formatting,
    ) -> Result<MessageId, String>;

    /// Edit a previously sent message in place.
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: MessageId,
        text: &str,
        formatting: Formatting,
    ) -> Result<(), String>;
}
