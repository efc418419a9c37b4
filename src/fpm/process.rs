//! php-fpm process descriptor and lifecycle.
//!
//! [`FpmProcess`] describes a minimal php-fpm setup running a single pool and
//! owns the live worker once started. The lifecycle is
//! `Unstarted -> Running -> Stopped`:
//! - [`FpmProcess::start`] spawns the worker in the foreground and returns
//!   only after it accepts connections (or the readiness ceiling elapses).
//! - [`FpmProcess::stop`] sends `SIGINT`; it never force-kills.
//! - [`FpmProcess::wait`] reaps the worker and consumes the handle.
//!
//! The descriptor is the sole owner of the child handle. Lifecycle calls take
//! `&self`/`&mut self`, so callers serialize them through ordinary borrowing;
//! there is no internal lock.
//!
//! Preconditions the descriptor does not check: the config file must have
//! been written (see [`FpmProcess::save_config`]) before `start`, and a
//! descriptor drives one worker only.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{info, info_span, warn, Instrument};

use crate::config::SupervisorConfig;
use crate::fpm::address::{self, ListenAddress};
use crate::fpm::ini::{self, IniDocument};
use crate::fpm::probe::{self, ReadinessTiming};
use crate::{AppError, Result};

/// File name of the pid file under a data directory.
pub const PID_FILE_NAME: &str = "phpfpm.pid";
/// File name of the error log under a data directory.
pub const ERROR_LOG_NAME: &str = "phpfpm.error_log";
/// File name of the listen socket under a data directory.
pub const SOCKET_NAME: &str = "phpfpm.sock";

/// Lifecycle position of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// No worker has been confirmed ready yet.
    Unstarted,
    /// The worker passed its readiness check and has not been reaped.
    Running,
    /// The worker has exited and been reaped.
    Stopped,
}

/// Minimal php-fpm descriptor running one pool.
#[derive(Debug)]
pub struct FpmProcess {
    /// Path to the php-fpm executable.
    pub exec: PathBuf,
    /// Path to the rendered config file; set by [`FpmProcess::save_config`].
    pub config_file: PathBuf,
    /// Address on which the pool accepts `FastCGI` requests:
    /// `ip.add.re.ss:port`, `port`, or `/path/to/unix/socket`.
    pub listen: String,
    /// Path of the worker's pid file.
    pub pid_file: PathBuf,
    /// Path of the worker's error log.
    pub error_log: PathBuf,
    timing: ReadinessTiming,
    state: ProcessState,
    child: Option<Child>,
}

impl FpmProcess {
    /// Create a descriptor for the php-fpm binary at `exec`.
    #[must_use]
    pub fn new(exec: impl Into<PathBuf>) -> Self {
        Self {
            exec: exec.into(),
            config_file: PathBuf::new(),
            listen: String::new(),
            pid_file: PathBuf::new(),
            error_log: PathBuf::new(),
            timing: ReadinessTiming::default(),
            state: ProcessState::Unstarted,
            child: None,
        }
    }

    /// Build a descriptor from supervisor configuration.
    ///
    /// Paths derive from `data_dir`; an explicit `listen` replaces the
    /// data-dir socket. The config file is not written here.
    #[must_use]
    pub fn from_config(config: &SupervisorConfig) -> Self {
        let mut process = Self::new(&config.executable).with_timing(config.readiness.timing());
        process.set_datadir(&config.data_dir);
        if let Some(ref listen) = config.listen {
            process.listen.clone_from(listen);
        }
        process
    }

    /// Override the readiness poll interval and ceiling.
    #[must_use]
    pub fn with_timing(mut self, timing: ReadinessTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Readiness timing in effect.
    #[must_use]
    pub fn timing(&self) -> ReadinessTiming {
        self.timing
    }

    /// Derive the pid file, error log, and listen socket from one directory.
    ///
    /// Equivalent to setting `dir/phpfpm.pid`, `dir/phpfpm.error_log`, and
    /// `dir/phpfpm.sock`. The directory is not checked for existence.
    pub fn set_datadir(&mut self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        self.pid_file = dir.join(PID_FILE_NAME);
        self.error_log = dir.join(ERROR_LOG_NAME);
        self.listen = dir.join(SOCKET_NAME).to_string_lossy().into_owned();
    }

    /// Render the worker config for this descriptor.
    #[must_use]
    pub fn config(&self) -> IniDocument {
        ini::fpm_document(
            &self.pid_file.to_string_lossy(),
            &self.error_log.to_string_lossy(),
            &self.listen,
        )
    }

    /// Record `path` as the config file and write [`FpmProcess::config`] to it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be written.
    pub fn save_config(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.config_file = path.into();
        self.config().save_to(&self.config_file)?;
        info!(path = %self.config_file.display(), listen = %self.listen, "php-fpm config written");
        Ok(())
    }

    /// Transport and target for reaching the worker.
    #[must_use]
    pub fn address(&self) -> ListenAddress {
        address::resolve(&self.listen)
    }

    /// Current lifecycle position.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// OS pid of the live worker, if any.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Command line used to launch the worker: foreground, explicit config,
    /// no `php.ini`, extended information.
    #[must_use]
    pub fn command_args(&self) -> Vec<std::ffi::OsString> {
        vec![
            "--fpm-config".into(),
            self.config_file.clone().into_os_string(),
            "-F".into(),
            "-n".into(),
            "-e".into(),
        ]
    }

    /// Spawn the worker and wait until it accepts connections.
    ///
    /// Returns the worker's stdout and stderr; they are not buffered, so an
    /// unread pipe eventually blocks the worker.
    ///
    /// On a readiness timeout the worker is left running and still owned by
    /// this descriptor; call [`FpmProcess::stop`] and [`FpmProcess::wait`]
    /// to reclaim it.
    ///
    /// # Errors
    ///
    /// - `AppError::Config` if `listen` is empty.
    /// - `AppError::Spawn` if a worker was already started, or the process
    ///   or its streams cannot be created.
    /// - `AppError::Timeout` if the worker is not ready within the ceiling.
    pub async fn start(&mut self) -> Result<(ChildStdout, ChildStderr)> {
        let span = info_span!(
            "fpm_start",
            exec = %self.exec.display(),
            listen = %self.listen
        );
        self.start_inner().instrument(span).await
    }

    async fn start_inner(&mut self) -> Result<(ChildStdout, ChildStderr)> {
        if self.listen.is_empty() {
            return Err(AppError::Config("listen must be set before start".into()));
        }
        if self.child.is_some() {
            return Err(AppError::Spawn("worker already started".into()));
        }

        let mut cmd = Command::new(&self.exec);
        cmd.args(self.command_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|err| {
            AppError::Spawn(format!(
                "failed to spawn {}: {err}",
                self.exec.display()
            ))
        })?;
        let pid = child.id();
        let child = self.child.insert(child);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture worker stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture worker stderr".into()))?;

        info!(pid, "php-fpm spawned, waiting for readiness");

        let address = self.address();
        if let Err(err) = probe::wait_ready(&address, self.timing).await {
            warn!(pid, %address, %err, "worker not ready; leaving it running");
            return Err(err);
        }

        self.state = ProcessState::Running;
        info!(pid, %address, "php-fpm ready");
        Ok((stdout, stderr))
    }

    /// Ask the worker to shut down with `SIGINT`.
    ///
    /// Delivery is fire-and-forget; use [`FpmProcess::wait`] to observe the
    /// exit.
    ///
    /// # Errors
    ///
    /// - `AppError::NotRunning` if no worker handle is held.
    /// - `AppError::Signal` if the signal cannot be delivered.
    pub fn stop(&self) -> Result<()> {
        let pid = self
            .child
            .as_ref()
            .and_then(Child::id)
            .ok_or_else(|| AppError::NotRunning("stop called without a live worker".into()))?;

        send_interrupt(pid)?;
        info!(pid, "sent SIGINT to php-fpm");
        Ok(())
    }

    /// Block until the worker exits and reap it.
    ///
    /// The handle is released only once the exit is observed, so dropping
    /// this future early keeps the worker owned by the descriptor.
    ///
    /// # Errors
    ///
    /// - `AppError::NotRunning` if no worker handle is held.
    /// - `AppError::Wait` if the exit status cannot be collected.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| AppError::NotRunning("wait called without a live worker".into()))?;
        let pid = child.id();

        let status = child
            .wait()
            .await
            .map_err(|err| AppError::Wait(format!("failed to reap php-fpm: {err}")))?;

        self.child = None;
        self.state = ProcessState::Stopped;
        info!(pid, %status, "php-fpm exited");
        Ok(status)
    }
}

#[cfg(unix)]
fn send_interrupt(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| AppError::Signal(format!("pid {pid} out of range")))?;
    kill(Pid::from_raw(raw), Signal::SIGINT)
        .map_err(|err| AppError::Signal(format!("failed to send SIGINT to {pid}: {err}")))
}

#[cfg(not(unix))]
fn send_interrupt(pid: u32) -> Result<()> {
    Err(AppError::Signal(format!(
        "cannot interrupt {pid}: graceful stop requires unix signals"
    )))
}
