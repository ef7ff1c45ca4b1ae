//! Live reload: WebSocket hub and wire protocol.

mod message;
mod server;

pub use message::ReloadMessage;
pub use server::{Hub, start_server};
