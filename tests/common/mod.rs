//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use request_inspector::inspect::{Inspector, MemorySink, Toggles};
use request_inspector::{HttpServer, InspectorConfig};

/// A running server whose inspector writes into memory.
pub struct TestServer {
    pub addr: SocketAddr,
    pub sink: Arc<MemorySink>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Start a server on an ephemeral port.
pub async fn start_server(toggles: Toggles) -> TestServer {
    let sink = Arc::new(MemorySink::new());
    let inspector = Inspector::new(sink.clone(), Arc::new(toggles));
    let server = HttpServer::new(InspectorConfig::default(), inspector);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let _ = server
            .run(listener, async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        addr,
        sink,
        shutdown: Some(tx),
    }
}

/// Send raw request bytes and return the raw response.
#[allow(dead_code)]
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request).await.unwrap();

    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}
