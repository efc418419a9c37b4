//! Unit tests for listen specification resolution.

use fpm_supervisor::fpm::address::{resolve, ListenAddress, Network};

fn resolved(listen: &str) -> (&'static str, String) {
    let addr = resolve(listen);
    (addr.network.as_str(), addr.address)
}

#[test]
fn ip_and_port_is_tcp_unchanged() {
    assert_eq!(
        resolved("192.168.123.456:12345"),
        ("tcp", "192.168.123.456:12345".to_owned())
    );
    assert_eq!(resolved("127.0.0.1:9000"), ("tcp", "127.0.0.1:9000".to_owned()));
}

#[test]
fn bare_port_is_tcp_with_colon_prefix() {
    assert_eq!(resolved("12345"), ("tcp", ":12345".to_owned()));
    assert_eq!(resolved("9000"), ("tcp", ":9000".to_owned()));
}

#[test]
fn colon_port_is_tcp_port_only() {
    assert_eq!(resolved(":9000"), ("tcp", ":9000".to_owned()));
}

#[test]
fn hostname_and_port_is_tcp_unchanged() {
    assert_eq!(resolved("localhost:9000"), ("tcp", "localhost:9000".to_owned()));
}

#[test]
fn relative_socket_name_is_unix() {
    assert_eq!(resolved("hello.sock"), ("unix", "hello.sock".to_owned()));
}

#[test]
fn absolute_socket_path_is_unix() {
    assert_eq!(
        resolved("/path/to/hello.sock"),
        ("unix", "/path/to/hello.sock".to_owned())
    );
}

#[test]
fn digits_mixed_with_letters_is_unix() {
    assert_eq!(resolved("9000a"), ("unix", "9000a".to_owned()));
    assert_eq!(resolved("12.34"), ("unix", "12.34".to_owned()));
}

#[test]
fn empty_string_is_lenient_unix() {
    assert_eq!(resolved(""), ("unix", String::new()));
}

#[test]
fn resolution_is_pure() {
    for listen in ["12345", "10.0.0.1:80", "/run/fpm.sock", ":81", "weird::"] {
        assert_eq!(resolve(listen), resolve(listen), "{listen} must resolve stably");
    }
}

#[test]
fn dial_target_fills_loopback_for_port_only() {
    let addr = resolve("9000");
    assert_eq!(addr.dial_target(), "127.0.0.1:9000");
}

#[test]
fn dial_target_keeps_explicit_targets() {
    assert_eq!(resolve("10.1.2.3:9000").dial_target(), "10.1.2.3:9000");
    assert_eq!(resolve("/run/fpm.sock").dial_target(), "/run/fpm.sock");
}

#[test]
fn network_display_matches_dialer_names() {
    assert_eq!(Network::Tcp.to_string(), "tcp");
    assert_eq!(Network::Unix.to_string(), "unix");
}

#[test]
fn listen_address_display_includes_scheme() {
    let addr = ListenAddress {
        network: Network::Unix,
        address: "/run/fpm.sock".into(),
    };
    assert_eq!(addr.to_string(), "unix:///run/fpm.sock");
}
