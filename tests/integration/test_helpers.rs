//! Shared helpers for process-level tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fpm_supervisor::fpm::probe::ReadinessTiming;
use fpm_supervisor::FpmProcess;

/// Write an executable `/bin/sh` script standing in for php-fpm.
///
/// The script ignores the php-fpm flags it is given unless `body` reads `$@`.
pub fn write_worker_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write worker script");
    let mut perms = std::fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod worker script");
    path
}

/// Short readiness window so timeout tests finish quickly.
pub fn fast_timing(timeout_ms: u64) -> ReadinessTiming {
    ReadinessTiming {
        poll_interval: Duration::from_millis(2),
        timeout: Duration::from_millis(timeout_ms),
    }
}

/// Descriptor for `exec` with paths under `dir/var` and config written to
/// `dir/etc/test.conf`.
pub fn prepared_process(exec: &Path, dir: &Path, timeout_ms: u64) -> FpmProcess {
    let var = dir.join("var");
    std::fs::create_dir_all(&var).expect("create var dir");

    let mut process = FpmProcess::new(exec).with_timing(fast_timing(timeout_ms));
    process.set_datadir(&var);
    process
        .save_config(dir.join("etc").join("test.conf"))
        .expect("config saved");
    process
}
