//! Transport driver tests against in-process stub listeners.
//!
//! Each test binds an ephemeral-port TCP listener standing in for the
//! server under test, so both transport modes are exercised without
//! spawning a real subprocess.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use vetter::Error;
use vetter::transport::Driver;

/// Stub that reads one request and replies with canned bytes, then closes.
async fn stub_once(response: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        socket.write_all(response).await.unwrap();
    });
    port
}

#[tokio::test]
async fn raw_mode_returns_exact_response_bytes() {
    let response = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK";
    let port = stub_once(response).await;

    let driver = Driver::new(port).unwrap();
    let actual = driver
        .send_raw(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    assert_eq!(actual, response);
}

#[tokio::test]
async fn raw_mode_transmits_malformed_requests_verbatim() {
    // A conforming client library would refuse to build this request;
    // RAW mode must pass it through untouched.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let received = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let n = socket.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
        socket.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await.unwrap();
        buf
    });

    let malformed = b"FETCH /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
    let driver = Driver::new(port).unwrap();
    driver.send_raw(malformed).await.unwrap();
    assert_eq!(received.await.unwrap(), malformed);
}

#[tokio::test]
async fn raw_mode_times_out_on_silent_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        // Hold the connection open without replying.
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(socket);
    });

    let driver = Driver::new(port).unwrap();
    let err = driver.send_raw(b"GET / HTTP/1.1\r\n\r\n").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert!(err.is_case_local());
}

#[tokio::test]
async fn raw_mode_returns_partial_bytes_at_the_bound() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        socket.write_all(b"HTTP/1.1 200 OK\r\n").await.unwrap();
        // Never send the rest, never close.
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let driver = Driver::new(port).unwrap();
    let actual = driver.send_raw(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    assert_eq!(actual, b"HTTP/1.1 200 OK\r\n");
}

#[tokio::test]
async fn raw_mode_reports_connection_refusal_as_transport_failure() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let driver = Driver::new(port).unwrap();
    let err = driver.send_raw(b"GET / HTTP/1.1\r\n\r\n").await.unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    assert!(err.is_case_local());
}

#[tokio::test]
async fn client_mode_times_out_like_raw_mode() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        // Hold the connection open without replying.
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let driver = Driver::new(port).unwrap();
    let err = driver.send_client("/health").await.unwrap_err();
    assert!(
        matches!(err, Error::Timeout { .. }),
        "client timeout must classify as TIMED OUT, got: {err}"
    );
}

#[tokio::test]
async fn client_mode_reconstructs_status_headers_and_body() {
    let response =
        b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 2\r\nconnection: close\r\n\r\nOK";
    let port = stub_once(response).await;

    let driver = Driver::new(port).unwrap();
    let raw = driver.send_client("/health").await.unwrap();
    let text = String::from_utf8(raw).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("content-type: text/plain\r\n"));
    assert!(text.contains("content-length: 2\r\n"));
    assert!(text.ends_with("\r\n\r\nOK"));
}
