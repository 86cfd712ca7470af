// SPDX-FileCopyrightText: 2026 Servio Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Transport
//!
//! Real transport implementation using tungstenite. Speaks the broker's
//! text-framed protocol over the socket and supports both native-tls and
//! rustls TLS backends.

use std::net::TcpStream;
use std::time::Duration;

#[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
use native_tls::TlsConnector;

#[cfg(feature = "network-rustls")]
use rustls::pki_types::ServerName;
#[cfg(feature = "network-rustls")]
use std::sync::Arc;

use tungstenite::client::IntoClientRequest;
use tungstenite::http::header::{HeaderName, HeaderValue};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::config::BrokerConfig;
use crate::error::ChatError;
use crate::transport::{FramePayload, HandshakeRequest, InboundFrame, Transport, TransportEvent};
use crate::wire::{self, ClientFrame, ServerFrame};

/// WebSocket transport for broker communication.
///
/// Supports both ws:// (plaintext) and wss:// (TLS) connections.
///
/// # Example
///
/// ```ignore
/// use servio_chat::{BrokerConfig, WebSocketTransport};
///
/// let config = BrokerConfig::new("wss://chat.servio.app/ws")?;
/// let transport = WebSocketTransport::from_config(&config);
/// let mut session = ChatSession::new(transport, config, events);
/// ```
pub struct WebSocketTransport {
    socket: Option<WebSocket<MaybeTlsStream<TcpStream>>>,
    io_timeout_ms: u64,
}

impl WebSocketTransport {
    /// Creates a new WebSocket transport with default timeouts.
    pub fn new() -> Self {
        WebSocketTransport {
            socket: None,
            io_timeout_ms: 30_000,
        }
    }

    /// Creates a transport using the broker config's IO timeout.
    pub fn from_config(config: &BrokerConfig) -> Self {
        WebSocketTransport {
            socket: None,
            io_timeout_ms: config.io_timeout_ms,
        }
    }

    /// Parses a WebSocket URL into host and port.
    fn parse_url(url: &str) -> Result<(String, u16, bool), ChatError> {
        let is_tls = url.starts_with("wss://");
        let url_without_scheme = url
            .strip_prefix("wss://")
            .or_else(|| url.strip_prefix("ws://"))
            .ok_or_else(|| {
                ChatError::ConnectionFailed("Invalid URL scheme (expected ws:// or wss://)".into())
            })?;

        // Split host:port/path
        let host_port = url_without_scheme
            .split('/')
            .next()
            .unwrap_or(url_without_scheme);

        let (host, port) = if let Some(colon_pos) = host_port.rfind(':') {
            let host = &host_port[..colon_pos];
            let port_str = &host_port[colon_pos + 1..];
            let port: u16 = port_str
                .parse()
                .map_err(|_| ChatError::ConnectionFailed(format!("Invalid port: {}", port_str)))?;
            (host.to_string(), port)
        } else {
            let default_port = if is_tls { 443 } else { 80 };
            (host_port.to_string(), default_port)
        };

        Ok((host, port, is_tls))
    }

    /// Create a TLS stream using native-tls
    #[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
    fn create_tls_stream(
        host: &str,
        tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, ChatError> {
        let connector = TlsConnector::new()
            .map_err(|e| ChatError::ConnectionFailed(format!("TLS error: {}", e)))?;
        let tls_stream = connector
            .connect(host, tcp_stream)
            .map_err(|e| ChatError::ConnectionFailed(format!("TLS handshake failed: {}", e)))?;
        Ok(MaybeTlsStream::NativeTls(tls_stream))
    }

    /// Create a TLS stream using rustls
    #[cfg(feature = "network-rustls")]
    fn create_tls_stream(
        host: &str,
        tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, ChatError> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let server_name: ServerName<'_> = host
            .try_into()
            .map_err(|_| ChatError::ConnectionFailed(format!("Invalid server name: {}", host)))?;

        let tls_conn = rustls::ClientConnection::new(Arc::new(config), server_name.to_owned())
            .map_err(|e| ChatError::ConnectionFailed(format!("TLS setup failed: {}", e)))?;

        let tls_stream = rustls::StreamOwned::new(tls_conn, tcp_stream);
        Ok(MaybeTlsStream::Rustls(tls_stream))
    }

    /// Translates one broker frame into a transport event.
    fn translate(text: &str) -> Option<TransportEvent> {
        match wire::parse(text) {
            Ok(ServerFrame::Connected) => Some(TransportEvent::HandshakeAck),
            Ok(ServerFrame::Message {
                destination,
                message_id,
                body,
            }) => Some(TransportEvent::Frame(InboundFrame {
                destination,
                message_id,
                payload: FramePayload::Text(body),
            })),
            Ok(ServerFrame::Error { detail }) => Some(TransportEvent::Failed(detail)),
            Ok(ServerFrame::Heartbeat) => None,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparseable broker frame");
                None
            }
        }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, request: &HandshakeRequest) -> Result<(), ChatError> {
        if self.socket.is_some() {
            return Ok(());
        }

        let (host, port, is_tls) = Self::parse_url(&request.endpoint)?;
        let addr = format!("{}:{}", host, port);

        // TCP connection with read/write timeouts
        let tcp_stream =
            TcpStream::connect(&addr).map_err(|e| ChatError::ConnectionFailed(e.to_string()))?;
        tcp_stream
            .set_read_timeout(Some(Duration::from_millis(self.io_timeout_ms)))
            .map_err(|e| ChatError::ConnectionFailed(e.to_string()))?;
        tcp_stream
            .set_write_timeout(Some(Duration::from_millis(self.io_timeout_ms)))
            .map_err(|e| ChatError::ConnectionFailed(e.to_string()))?;

        let stream: MaybeTlsStream<TcpStream> = if is_tls {
            Self::create_tls_stream(&host, tcp_stream)?
        } else {
            MaybeTlsStream::Plain(tcp_stream)
        };

        // Upgrade request with the caller's handshake headers (bearer token,
        // negotiated sub-protocol)
        let mut ws_request = request
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| {
                ChatError::ConnectionFailed(format!("Invalid WebSocket request: {}", e))
            })?;
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ChatError::ConnectionFailed(format!("Invalid header name: {}", e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ChatError::ConnectionFailed(format!("Invalid header value: {}", e))
            })?;
            ws_request.headers_mut().append(name, value);
        }

        let (socket, _response) = tungstenite::client(ws_request, stream)
            .map_err(|e| ChatError::ConnectionFailed(format!("WebSocket handshake failed: {}", e)))?;

        self.socket = Some(socket);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None); // Ignore errors on close
        }
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, frame: &ClientFrame) -> Result<(), ChatError> {
        let socket = self.socket.as_mut().ok_or(ChatError::NotConnected)?;

        let ws_message = Message::Text(wire::render(frame));
        socket.send(ws_message).map_err(|e| {
            if matches!(
                e,
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
            ) {
                ChatError::ConnectionClosed
            } else {
                ChatError::SendFailed(e.to_string())
            }
        })?;

        // Flush to ensure the frame leaves the socket
        socket
            .flush()
            .map_err(|e| ChatError::SendFailed(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    /// Reads at most one socket message.
    ///
    /// Blocks up to the configured IO timeout; call from a dedicated pump
    /// thread.
    fn poll(&mut self) -> Option<TransportEvent> {
        let socket = self.socket.as_mut()?;

        match socket.read() {
            Ok(Message::Text(text)) => Self::translate(&text),
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => Self::translate(&text),
                Err(_) => {
                    tracing::warn!("dropping non-UTF-8 binary socket message");
                    None
                }
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
                None
            }
            Ok(Message::Pong(_)) => None,
            Ok(Message::Close(_)) => {
                self.socket = None;
                Some(TransportEvent::Closed { clean: false })
            }
            Ok(Message::Frame(_)) => None,
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                None
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.socket = None;
                Some(TransportEvent::Closed { clean: false })
            }
            Err(e) => {
                self.socket = None;
                Some(TransportEvent::Failed(e.to_string()))
            }
        }
    }
}
