//! WebSocket server for live reload.
//!
//! A `Hub` holds the connected browser clients; the watch loop broadcasts a
//! reload message after a successful rebuild. Dead connections are dropped
//! on the next broadcast.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tungstenite::{Message, WebSocket};

use super::message::ReloadMessage;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

// =============================================================================
// Hub
// =============================================================================

/// Connected live-reload clients.
pub struct Hub {
    clients: Mutex<Vec<WebSocket<TcpStream>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
        }
    }

    fn add_client(&self, socket: WebSocket<TcpStream>) {
        self.clients.lock().push(socket);
    }

    /// Send a message to every client; unreachable clients are removed.
    pub fn broadcast(&self, message: &ReloadMessage) {
        let payload = message.to_json();
        let mut clients = self.clients.lock();
        let before = clients.len();

        clients.retain_mut(|socket| {
            match socket.send(Message::Text(payload.clone().into())) {
                Ok(()) => true,
                // Client sockets are non-blocking; a full buffer keeps the
                // frame queued for the next flush
                Err(tungstenite::Error::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    true
                }
                Err(_) => false,
            }
        });

        let dropped = before - clients.len();
        if dropped > 0 {
            crate::debug!("reload"; "dropped {} disconnected client(s)", dropped);
        }
    }

    /// Drain pending client frames: answer pings, drop closed connections.
    fn poll_clients(&self) {
        let mut clients = self.clients.lock();
        clients.retain_mut(|socket| {
            loop {
                match socket.read() {
                    Ok(Message::Text(text)) => {
                        if let Some(ReloadMessage::Ping { ts }) = ReloadMessage::from_json(&text) {
                            let pong = ReloadMessage::Pong { ts }.to_json();
                            if socket.send(Message::Text(pong.into())).is_err() {
                                break false;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break false,
                    Ok(_) => {}
                    Err(tungstenite::Error::Io(e))
                        if e.kind() == std::io::ErrorKind::WouldBlock =>
                    {
                        break true;
                    }
                    Err(_) => break false,
                }
            }
        });
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Server
// =============================================================================

/// Start the WebSocket acceptor thread.
///
/// Binds `base_port` or the next free port after it; returns the hub and the
/// port actually bound. The acceptor runs until shutdown.
pub fn start_server(base_port: u16) -> Result<(Arc<Hub>, u16)> {
    let (listener, actual_port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    let hub = Arc::new(Hub::new());
    let accept_hub = Arc::clone(&hub);

    std::thread::spawn(move || {
        loop {
            if crate::core::is_shutdown() {
                break;
            }
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("reload"; "client connected: {}", addr);

                    // Handshake needs a blocking stream
                    let _ = stream.set_nonblocking(false);
                    match tungstenite::accept(stream) {
                        Ok(mut socket) => {
                            let hello = ReloadMessage::connected().to_json();
                            let _ = socket.send(Message::Text(hello.into()));
                            // Non-blocking from here on so broadcast and the
                            // poll sweep never stall on one client
                            let _ = socket.get_ref().set_nonblocking(true);
                            accept_hub.add_client(socket);
                        }
                        Err(e) => {
                            crate::debug!("reload"; "handshake failed: {}", e);
                        }
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    accept_hub.poll_clients();
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
                Err(e) => {
                    crate::log!("reload"; "accept error: {}", e);
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
            }
        }
    });

    Ok((hub, actual_port))
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("127.0.0.1:{}", port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_retries_past_taken_port() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = taken.local_addr().unwrap().port();

        let (_, port) = try_bind_port(base, MAX_PORT_RETRIES).unwrap();
        assert_ne!(port, base, "must skip the occupied port");
    }

    #[test]
    fn test_broadcast_with_no_clients_is_noop() {
        let hub = Hub::new();
        hub.broadcast(&ReloadMessage::reload());
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_ping_answered_with_pong() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = std::thread::spawn(move || {
            let stream = TcpStream::connect(addr).unwrap();
            let url = format!("ws://{addr}");
            let (mut socket, _) = tungstenite::client(url.as_str(), stream).unwrap();
            socket
                .send(Message::Text(ReloadMessage::Ping { ts: 7 }.to_json().into()))
                .unwrap();
            loop {
                if let Message::Text(text) = socket.read().unwrap()
                    && ReloadMessage::from_json(&text) == Some(ReloadMessage::Pong { ts: 7 })
                {
                    // Keep the connection open until the test joins, so the
                    // hub side sees a live socket, not an EOF
                    return socket;
                }
            }
        });

        let (stream, _) = listener.accept().unwrap();
        let socket = tungstenite::accept(stream).unwrap();
        socket.get_ref().set_nonblocking(true).unwrap();
        let hub = Hub::new();
        hub.add_client(socket);

        for _ in 0..100 {
            hub.poll_clients();
            if client.is_finished() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let _socket = client.join().unwrap();
        assert_eq!(hub.client_count(), 1, "pinging client stays connected");
    }

    #[test]
    fn test_poll_drops_closed_client() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = std::thread::spawn(move || {
            let stream = TcpStream::connect(addr).unwrap();
            let url = format!("ws://{addr}");
            let (mut socket, _) = tungstenite::client(url.as_str(), stream).unwrap();
            socket.close(None).unwrap();
            let _ = socket.flush();
        });

        let (stream, _) = listener.accept().unwrap();
        let socket = tungstenite::accept(stream).unwrap();
        socket.get_ref().set_nonblocking(true).unwrap();
        let hub = Hub::new();
        hub.add_client(socket);
        client.join().unwrap();

        for _ in 0..100 {
            hub.poll_clients();
            if hub.client_count() == 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(hub.client_count(), 0);
    }
}
