//! Unit tests for descriptor construction and data-dir path derivation.

use std::path::PathBuf;

use fpm_supervisor::fpm::address::Network;
use fpm_supervisor::FpmProcess;

#[test]
fn new_keeps_executable() {
    let process = FpmProcess::new("/usr/sbin/php-fpm");
    assert_eq!(process.exec, PathBuf::from("/usr/sbin/php-fpm"));
    assert!(process.listen.is_empty());
}

#[test]
fn set_datadir_derives_three_paths() {
    let mut process = FpmProcess::new("/usr/sbin/php-fpm");
    process.set_datadir("/srv/app/var");

    assert_eq!(process.pid_file, PathBuf::from("/srv/app/var/phpfpm.pid"));
    assert_eq!(
        process.error_log,
        PathBuf::from("/srv/app/var/phpfpm.error_log")
    );
    assert_eq!(process.listen, "/srv/app/var/phpfpm.sock");
}

#[test]
fn set_datadir_does_not_duplicate_trailing_slash() {
    let mut process = FpmProcess::new("/usr/sbin/php-fpm");
    process.set_datadir("/srv/app/var/");

    assert_eq!(process.pid_file.to_str(), Some("/srv/app/var/phpfpm.pid"));
    assert_eq!(
        process.error_log.to_str(),
        Some("/srv/app/var/phpfpm.error_log")
    );
    assert_eq!(process.listen, "/srv/app/var/phpfpm.sock");
}

#[test]
fn datadir_socket_resolves_to_unix() {
    let mut process = FpmProcess::new("/usr/sbin/php-fpm");
    process.set_datadir("/srv/app/var");

    let address = process.address();
    assert_eq!(address.network, Network::Unix);
    assert_eq!(address.address, "/srv/app/var/phpfpm.sock");
}

#[test]
fn tcp_listen_resolves_to_tcp() {
    let mut process = FpmProcess::new("/usr/sbin/php-fpm");
    process.listen = "9000".into();

    let address = process.address();
    assert_eq!(address.network, Network::Tcp);
    assert_eq!(address.address, ":9000");
}
