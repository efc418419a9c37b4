//! Integration tests for the readiness probe against real listeners.

use std::time::{Duration, Instant};

use tokio::net::{TcpListener, UnixListener};

use fpm_supervisor::fpm::address::resolve;
use fpm_supervisor::fpm::probe::wait_ready;
use fpm_supervisor::AppError;

use super::test_helpers::fast_timing;

#[tokio::test]
async fn ready_when_unix_socket_is_listening() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sock = temp.path().join("fpm.sock");
    let _listener = UnixListener::bind(&sock).expect("bind unix socket");

    let address = resolve(sock.to_str().expect("utf8 path"));
    wait_ready(&address, fast_timing(1000))
        .await
        .expect("listening socket is ready");
}

#[tokio::test]
async fn ready_when_tcp_port_is_listening() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind tcp");
    let port = listener.local_addr().expect("local addr").port();

    wait_ready(&resolve(&format!("127.0.0.1:{port}")), fast_timing(1000))
        .await
        .expect("host:port is ready");
}

#[tokio::test]
async fn port_only_listen_dials_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind tcp");
    let port = listener.local_addr().expect("local addr").port();

    wait_ready(&resolve(&port.to_string()), fast_timing(1000))
        .await
        .expect("bare port is ready");
}

#[tokio::test]
async fn ready_once_listener_appears_later() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sock = temp.path().join("late.sock");

    let bind_path = sock.clone();
    let binder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        UnixListener::bind(&bind_path).expect("bind late socket")
    });

    let started = Instant::now();
    wait_ready(&resolve(sock.to_str().expect("utf8 path")), fast_timing(3000))
        .await
        .expect("late listener is observed");

    assert!(started.elapsed() >= Duration::from_millis(100));
    let _listener = binder.await.expect("binder task");
}

#[tokio::test]
async fn times_out_when_nothing_listens() {
    let temp = tempfile::tempdir().expect("tempdir");
    let sock = temp.path().join("never.sock");

    let started = Instant::now();
    let err = wait_ready(&resolve(sock.to_str().expect("utf8 path")), fast_timing(200))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, AppError::Timeout(_)), "got {err:?}");
    assert!(elapsed >= Duration::from_millis(200), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "returned late: {elapsed:?}");
}

#[tokio::test]
async fn repeated_timeouts_each_return_promptly() {
    let temp = tempfile::tempdir().expect("tempdir");
    let address = resolve(temp.path().join("never.sock").to_str().expect("utf8 path"));

    let started = Instant::now();
    for _ in 0..5 {
        let err = wait_ready(&address, fast_timing(50)).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }
    assert!(started.elapsed() < Duration::from_secs(3));
}
