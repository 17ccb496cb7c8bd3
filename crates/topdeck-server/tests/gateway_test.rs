//! Gateway tests over a real socket

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use topdeck_server::{Server, ServerRuntimeConfig};

async fn spawn_server() -> std::net::SocketAddr {
    let config =
        ServerRuntimeConfig { bind_address: "127.0.0.1:0".to_string(), ..Default::default() };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn request(addr: std::net::SocketAddr, head: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(head.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn health_endpoint_reports_running() {
    let addr = spawn_server().await;
    let response =
        request(addr, "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#"{"status":"topdeck server running"}"#), "{response}");
}

#[tokio::test]
async fn websocket_route_requires_an_upgrade() {
    let addr = spawn_server().await;
    let response =
        request(addr, "GET /ws HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;

    assert!(!response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(!response.starts_with("HTTP/1.1 101"), "{response}");
}

#[tokio::test]
async fn bind_rejects_a_bad_catalog() {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        catalog_path: Some("/nonexistent/cards.json".into()),
        ..Default::default()
    };
    assert!(Server::bind(config).await.is_err());
}
