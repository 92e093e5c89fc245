use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::protocol::{Message, Name, RecordType};

/// A single request awaiting a reply from one remote nameserver.
/// `reply` is a capacity-1 (one-shot) channel: the multiplexer must be able
/// to deposit a late reply without blocking even after the caller has
/// given up on a timeout.
#[derive(Debug)]
pub struct PendingRequest {
    pub name: Name,
    pub qtype: RecordType,
    pub reply: oneshot::Sender<Message>,
}

#[derive(Debug, thiserror::Error)]
pub enum MultiplexError {
    #[error("failed to establish transport to {0}")]
    ConnectFailed(String),
    #[error("request queue closed or full")]
    SendFailed,
    #[error("no reply within the per-NS timeout")]
    Timeout,
    #[error("reply channel dropped without a response")]
    ReplyChannelClosed,
}

/// One long-lived request channel to a single remote nameserver, shared by
/// every resolution task that targets that server. The multiplexer is
/// free to serialize, pipeline, or fan out internally; the core only
/// guarantees the same instance is handed out for the same address.
#[derive(Debug)]
pub struct ServerMultiplexer {
    pub remote: SocketAddr,
    requests: mpsc::Sender<PendingRequest>,
}

impl ServerMultiplexer {
    pub fn new(remote: SocketAddr, requests: mpsc::Sender<PendingRequest>) -> Self {
        ServerMultiplexer { remote, requests }
    }

    /// Submits a request and awaits the reply with the given timeout. On
    /// timeout the outstanding request's reply channel is simply dropped
    /// here; the transport's send into it, if it arrives late, is a no-op.
    pub async fn query(&self, name: Name, qtype: RecordType, timeout: Duration) -> Result<Message, MultiplexError> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(PendingRequest { name, qtype, reply: tx })
            .await
            .map_err(|_| MultiplexError::SendFailed)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(MultiplexError::ReplyChannelClosed),
            Err(_) => Err(MultiplexError::Timeout),
        }
    }
}

/// The pluggable transport installed at startup (write-once per registry).
/// Production code installs a real UDP client that drains the returned
/// multiplexer's request queue and performs wire I/O; tests install a mock
/// producing scripted `Message` values. The socket-level protocol is not
/// specified here.
pub type ConnectFn = Arc<dyn Fn(SocketAddr) -> Result<ServerMultiplexer, MultiplexError> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseCode;

    fn mock_connect() -> ConnectFn {
        Arc::new(|addr| {
            let (tx, mut rx) = mpsc::channel::<PendingRequest>(16);
            tokio::spawn(async move {
                while let Some(req) = rx.recv().await {
                    let _ = req.reply.send(Message::empty(ResponseCode::NoError));
                }
            });
            Ok(ServerMultiplexer::new(addr, tx))
        })
    }

    #[tokio::test]
    async fn query_round_trips_through_mock_transport() {
        let connect = mock_connect();
        let addr: SocketAddr = "198.41.0.4:53".parse().unwrap();
        let mux = (connect)(addr).unwrap();

        let response = mux
            .query(Name::new("example.com"), RecordType::A, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(response.rescode, ResponseCode::NoError);
    }

    #[tokio::test]
    async fn query_times_out_when_nothing_replies() {
        let (tx, _rx) = mpsc::channel::<PendingRequest>(1);
        let mux = ServerMultiplexer::new("198.41.0.4:53".parse().unwrap(), tx);

        let result = mux
            .query(Name::new("example.com"), RecordType::A, Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(MultiplexError::Timeout)));
    }
}
