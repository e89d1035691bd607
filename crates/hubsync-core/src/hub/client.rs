//! Hub client implementation
//!
//! WebSocket-based client for the document hub. Each request opens its own
//! connection, so a cancelled or timed-out request leaves nothing behind.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::message::{ClientMessage, ServerMessage};
use super::{HubClient, HubError};
use crate::models::{DatabaseInfo, DocumentInfo};

/// Default time to wait for a hub reply
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Hub client speaking JSON over WebSocket
#[derive(Debug, Clone)]
pub struct WsHubClient {
    /// Hub URL
    url: String,
    /// Time allowed for connect + reply
    timeout: Duration,
}

impl WsHubClient {
    /// Create a new hub client
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the hub URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and wait for its reply
    ///
    /// Cancellation observed before sending means nothing reaches the hub.
    async fn request(
        &self,
        message: ClientMessage,
        cancel: &CancellationToken,
    ) -> Result<Option<DocumentInfo>, HubError> {
        if cancel.is_cancelled() {
            return Err(HubError::Cancelled);
        }

        let request_id = message.request_id().to_string();
        debug!(url = %self.url, %request_id, "sending hub request");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(%request_id, "hub request cancelled");
                Err(HubError::Cancelled)
            }
            result = tokio::time::timeout(self.timeout, self.exchange(message)) => {
                match result {
                    Ok(reply) => reply,
                    Err(_) => {
                        warn!(url = %self.url, %request_id, "hub request timed out");
                        Err(HubError::Timeout {
                            url: self.url.clone(),
                            secs: self.timeout.as_secs(),
                        })
                    }
                }
            }
        }
    }

    /// Connect, send, and read until the matching reply
    async fn exchange(&self, message: ClientMessage) -> Result<Option<DocumentInfo>, HubError> {
        let (ws_stream, _response) =
            connect_async(&self.url)
                .await
                .map_err(|e| HubError::ConnectionFailed {
                    url: self.url.clone(),
                    reason: e.to_string(),
                })?;
        let (mut write, mut read) = ws_stream.split();

        let request_id = message.request_id().to_string();
        let payload = message
            .encode()
            .map_err(|e| HubError::Protocol(e.to_string()))?;
        write
            .send(Message::Text(payload))
            .await
            .map_err(|e| HubError::ConnectionFailed {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        loop {
            let data = match read.next().await {
                Some(Ok(Message::Text(text))) => text.into_bytes(),
                Some(Ok(Message::Binary(data))) => data,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(HubError::Closed {
                        url: self.url.clone(),
                    });
                }
                Some(Err(e)) => {
                    return Err(HubError::ConnectionFailed {
                        url: self.url.clone(),
                        reason: e.to_string(),
                    });
                }
                // Ping/pong are handled by tungstenite
                Some(Ok(_)) => continue,
            };

            // This connection carries a single request, so any frame we
            // cannot read is a protocol failure for it
            let reply =
                ServerMessage::decode(&data).map_err(|e| HubError::Protocol(e.to_string()))?;

            if !reply.answers(&request_id) {
                debug!(%request_id, "ignoring reply for another request");
                continue;
            }

            write.close().await.ok();

            return match reply {
                ServerMessage::Document { document, .. } => {
                    debug!(%request_id, found = document.is_some(), "hub replied");
                    Ok(document)
                }
                ServerMessage::Error { message, .. } => {
                    warn!(%request_id, "hub error: {}", message);
                    Err(HubError::Server(message))
                }
            };
        }
    }
}

#[async_trait]
impl HubClient for WsHubClient {
    async fn fetch(
        &self,
        database: &DatabaseInfo,
        document_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<DocumentInfo>, HubError> {
        info!("Fetching '{}' from {}", document_id, self.url);
        self.request(ClientMessage::fetch(database, document_id), cancel)
            .await
    }

    async fn save(
        &self,
        document: &DocumentInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<DocumentInfo>, HubError> {
        info!(
            "Saving '{}' to {} (new: {})",
            document.document_id(),
            self.url,
            document.is_new_document()
        );
        self.request(ClientMessage::save(document), cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn database() -> DatabaseInfo {
        DatabaseInfo::new("orders", "Orders").unwrap()
    }

    /// Accept one connection, read one request, reply with `respond(request)`
    ///
    /// `None` keeps the connection open without replying.
    async fn serve_once<F>(respond: F) -> (String, JoinHandle<Value>)
    where
        F: FnOnce(&Value) -> Option<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let request: Value = match ws.next().await {
                Some(Ok(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
                other => panic!("unexpected frame: {:?}", other),
            };

            match respond(&request) {
                Some(reply) => {
                    ws.send(Message::Text(reply)).await.unwrap();
                    // Let the client close
                    let _ = ws.next().await;
                }
                None => tokio::time::sleep(Duration::from_secs(5)).await,
            }

            request
        });

        (format!("ws://{}", addr), handle)
    }

    fn document_reply(request: &Value, data: &str, revision: &str) -> Option<String> {
        Some(
            json!({
                "type": "document",
                "requestId": request["requestId"],
                "document": {
                    "databaseDescriptor": {"id": "orders"},
                    "documentId": "order-1",
                    "revisionId": revision,
                    "dataAsJson": data,
                    "isNewDocument": false
                }
            })
            .to_string(),
        )
    }

    #[test]
    fn test_client_new() {
        let client = WsHubClient::new("ws://localhost:5000/hub");
        assert_eq!(client.url(), "ws://localhost:5000/hub");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = client.with_timeout(Duration::from_secs(2));
        assert_eq!(client.timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_fetch_returns_document() {
        let (url, server) = serve_once(|req| document_reply(req, "{\"qty\":3}", "4-d")).await;
        let client = WsHubClient::new(&url);

        let doc = client
            .fetch(&database(), "order-1", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(doc.revision_id(), "4-d");
        assert_eq!(doc.data_as_json(), "{\"qty\":3}");

        let request = server.await.unwrap();
        assert_eq!(request["type"], "fetch");
        assert_eq!(request["documentId"], "order-1");
    }

    #[tokio::test]
    async fn test_save_sends_document() {
        let (url, server) = serve_once(|req| document_reply(req, "{\"qty\":5}", "5-e")).await;
        let client = WsHubClient::new(&url);
        let doc = DocumentInfo::new(database(), "order-1", "4-d", "{\"qty\":5}", false).unwrap();

        let saved = client
            .save(&doc, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.revision_id(), "5-e");

        let request = server.await.unwrap();
        assert_eq!(request["type"], "save");
        assert_eq!(request["document"]["revisionId"], "4-d");
    }

    #[tokio::test]
    async fn test_absent_document() {
        let (url, _server) = serve_once(|req| {
            Some(json!({"type": "document", "requestId": req["requestId"]}).to_string())
        })
        .await;
        let client = WsHubClient::new(&url);

        let doc = client
            .fetch(&database(), "missing", &CancellationToken::new())
            .await
            .unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn test_server_error() {
        let (url, _server) = serve_once(|req| {
            Some(
                json!({"type": "error", "requestId": req["requestId"], "message": "revision conflict"})
                    .to_string(),
            )
        })
        .await;
        let client = WsHubClient::new(&url);

        let err = client
            .fetch(&database(), "order-1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Server(ref m) if m == "revision conflict"));
    }

    #[tokio::test]
    async fn test_garbage_reply_is_protocol_error() {
        let (url, _server) = serve_once(|_| Some("not json".to_string())).await;
        let client = WsHubClient::new(&url);

        let err = client
            .fetch(&database(), "order-1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let (url, _server) = serve_once(|_| None).await;
        let client = WsHubClient::new(&url).with_timeout(Duration::from_millis(200));

        let err = client
            .fetch(&database(), "order-1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        // Nothing listens here; a cancelled request must not even connect
        let client = WsHubClient::new("ws://127.0.0.1:9");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client
            .fetch(&database(), "order-1", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_in_flight() {
        let (url, _server) = serve_once(|_| None).await;
        let client = WsHubClient::new(&url);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = client
            .fetch(&database(), "order-1", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Cancelled));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WsHubClient::new(&format!("ws://{}", addr));
        let err = client
            .fetch(&database(), "order-1", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::ConnectionFailed { .. }));
    }
}
