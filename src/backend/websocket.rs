//! # WebSocket backend.
//!
//! [`WsBackend`] opens one WebSocket connection per topic at
//! [`BackendConfig::topic_url`]. Every text or binary frame is one payload.
//!
//! ## Frame handling
//! ```text
//! Text(s)    ──► Some(s bytes)
//! Binary(b)  ──► Some(b)
//! Ping/Pong  ──► skipped
//! Close      ──► None (stream closed)
//! Err(e)     ──► warn + None
//! ```
//!
//! No reconnect: a dropped connection ends the stream, which the supervisor counts
//! as upstream exhaustion for that topic.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::error::BackendError;

use super::{Backend, BackendConfig, Subscription};

/// WebSocket message bus client.
#[derive(Clone, Debug)]
pub struct WsBackend {
    cfg: BackendConfig,
}

impl WsBackend {
    /// Creates a backend for the given connection parameters.
    pub fn new(cfg: BackendConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl Backend for WsBackend {
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, BackendError> {
        let url = self.cfg.topic_url(topic);
        debug!(%url, topic, "connecting");

        let connect = connect_async(url.as_str());
        let res = match self.cfg.connect_timeout() {
            Some(dur) => match time::timeout(dur, connect).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    return Err(BackendError::Timeout {
                        endpoint: url,
                        timeout: dur,
                    });
                }
            },
            None => connect.await,
        };

        let (stream, _resp) = res.map_err(|e| BackendError::Connect {
            endpoint: url.clone(),
            reason: e.to_string(),
        })?;
        info!(%url, topic, "subscribed");

        Ok(Box::new(WsSubscription {
            topic: topic.to_string(),
            stream,
            closed: false,
        }))
    }
}

/// One WebSocket connection carrying a single topic.
struct WsSubscription {
    topic: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Subscription for WsSubscription {
    async fn recv(&mut self) -> Option<Vec<u8>> {
        if self.closed {
            return None;
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.as_bytes().to_vec()),
                Some(Ok(Message::Binary(data))) => return Some(data.to_vec()),
                Some(Ok(Message::Close(_))) | None => {
                    debug!(topic = %self.topic, "stream closed by server");
                    self.closed = true;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!(topic = %self.topic, error = %e, "websocket receive error");
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(topic = %self.topic, error = %e, "websocket close");
        }
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use futures::SinkExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::accept_async;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::core::CompletionToken;
    use crate::handlers::HandlerFn;
    use crate::subscribers::{ExitReason, Subscriber, TopicSpec};

    /// Accepts one client, sends `frames`, then returns the first non-pong frame it gets back.
    async fn serve_once(frames: Vec<Message>) -> (SocketAddr, JoinHandle<Option<Message>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            for frame in frames {
                if ws.send(frame).await.is_err() {
                    return None;
                }
            }
            loop {
                match ws.next().await {
                    Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(msg)) => return Some(msg),
                    _ => return None,
                }
            }
        });
        (addr, server)
    }

    fn backend(addr: SocketAddr) -> WsBackend {
        WsBackend::new(BackendConfig::new(format!("ws://{addr}")))
    }

    #[tokio::test]
    async fn frames_map_to_payloads_until_close() {
        let (addr, _server) = serve_once(vec![
            Message::Text("hello".into()),
            Message::Ping(b"p".to_vec().into()),
            Message::Binary(vec![1, 2, 3].into()),
            Message::Close(None),
        ])
        .await;

        let mut sub = backend(addr).subscribe("A").await.unwrap();
        assert_eq!(sub.recv().await.as_deref(), Some(&b"hello"[..]));
        assert_eq!(sub.recv().await.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(sub.recv().await, None);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn dropped_connection_ends_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = accept_async(tcp).await.unwrap();
            drop(ws);
        });

        let mut sub = backend(addr).subscribe("A").await.unwrap();
        let next = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap();
        assert_eq!(next, None);
    }

    #[tokio::test]
    async fn silent_server_hits_connect_timeout() {
        // accepts TCP (via the backlog) but never answers the handshake
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut cfg = BackendConfig::new(format!("ws://{addr}"));
        cfg.connect_timeout = Duration::from_millis(100);
        let err = match WsBackend::new(cfg).subscribe("A").await {
            Err(e) => e,
            Ok(_) => panic!("handshake must not complete"),
        };
        assert_eq!(err.as_label(), "backend_connect_timeout");
        assert!(matches!(
            err,
            BackendError::Timeout { ref endpoint, .. } if endpoint.ends_with("/A")
        ));
        drop(listener);
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let err = match backend(addr).subscribe("A").await {
            Err(e) => e,
            Ok(_) => panic!("nothing is listening"),
        };
        assert_eq!(err.as_label(), "backend_connect_failed");
    }

    #[tokio::test]
    async fn cancelled_subscriber_closes_socket() {
        let (addr, server) = serve_once(Vec::new()).await;
        let ws = backend(addr);
        let spec = TopicSpec::new("A", HandlerFn::arc(|_p: &[u8]| {}));
        let completion = CompletionToken::new();

        let mut sub = Subscriber::create(&spec, &ws, &completion, &CancellationToken::new())
            .await
            .unwrap();
        sub.cancel();
        assert_eq!(sub.wait().await, Some(ExitReason::Cancelled));
        assert_eq!(completion.outstanding(), 0);

        let seen = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(seen, Some(Message::Close(_))), "server saw {seen:?}");
    }
}
