//! Communication channels (Telegram).
//!
//! Transport trait so the router and progress controller can send and edit
//! messages without knowing the concrete channel. Inbound messages are
//! forwarded to the dispatch loop over an mpsc channel.

mod inbound;
mod telegram;
mod transport;

pub use inbound::InboundMessage;
pub(crate) use telegram::inbound_from_update;
pub use telegram::{TelegramChannel, TelegramUpdate};
pub use transport::{Formatting, MessageId, Transport};
