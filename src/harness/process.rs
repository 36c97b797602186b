//! Server-under-test process lifecycle.
//!
//! Spawns the SUT with a configuration file as its sole argument, captures
//! merged stdout/stderr into a temporary log file, waits for the listening
//! socket to accept connections, and stops it with a graceful termination
//! signal. A missing server binary is the one fatal error in the harness:
//! nothing can run without it, so it aborts the whole run.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::catalog::TestGroup;
use crate::error::{Error, Result};

/// Fixed settle ceiling for SUT startup. The readiness probe usually
/// returns far earlier; this bound is the safety net for servers that
/// accept connections late or not at all.
const STARTUP_SETTLE: Duration = Duration::from_millis(3000);

/// Interval between readiness connect attempts.
const PROBE_INTERVAL: Duration = Duration::from_millis(50);

/// Options shared by every group in a run.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Path to the SUT binary.
    pub server_bin: PathBuf,
    /// Primary configuration search root.
    pub config_root: PathBuf,
    /// Alternate configuration search root.
    pub alt_config_root: PathBuf,
    /// Fixed test port the SUT listens on.
    pub port: u16,
    /// Sandbox root directory for the SUT's resource store.
    pub sandbox_root: PathBuf,
}

/// A running SUT process.
///
/// Owned exclusively by the active test group. [`SutHandle::stop`] must be
/// called exactly once per start; `Drop` kills the child as a backstop if
/// a panic skips the normal path.
#[derive(Debug)]
pub struct SutHandle {
    child: Child,
    /// Merged stdout/stderr capture; unlinked when the handle stops.
    log: Option<NamedTempFile>,
    stopped: bool,
}

impl SutHandle {
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Path of the captured output, for diagnostics while running.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(NamedTempFile::path)
    }

    /// Send a graceful termination signal, wait for exit, delete the log.
    ///
    /// If the signal cannot be delivered the handle stays unstopped, so
    /// `Drop` still kills and reaps the child instead of leaking a zombie.
    pub fn stop(mut self) -> Result<()> {
        terminate(&mut self.child)?;
        self.stopped = true;
        let status = self
            .child
            .wait()
            .map_err(|e| Error::io("waiting for server exit", e))?;
        debug!(status = %status, "server stopped");
        // Dropping the NamedTempFile unlinks the log.
        self.log.take();
        Ok(())
    }
}

impl Drop for SutHandle {
    fn drop(&mut self) {
        if !self.stopped {
            warn!(pid = self.child.id(), "server handle dropped without stop; killing");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM)
        .map_err(|e| Error::transport(format!("SIGTERM failed: {e}")))
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> Result<()> {
    child.kill().map_err(|e| Error::io("killing server", e))
}

/// Start the SUT for one test group.
///
/// Resolves the group's configuration file through its search-root flag,
/// spawns the binary with that path as its only argument (working directory
/// fixed to the invoking process's directory), and waits until the test
/// port accepts a connection, bounded by the settle ceiling.
pub async fn start_sut(opts: &HarnessOptions, group: &TestGroup) -> Result<SutHandle> {
    if !opts.server_bin.is_file() {
        return Err(Error::ServerBinaryMissing {
            path: opts.server_bin.clone(),
        });
    }

    let config = group.config_path(&opts.config_root, &opts.alt_config_root);
    let log = NamedTempFile::new().map_err(|e| Error::io("creating server log file", e))?;
    let stdout = log
        .as_file()
        .try_clone()
        .map_err(|e| Error::io("cloning log handle", e))?;
    let stderr = log
        .as_file()
        .try_clone()
        .map_err(|e| Error::io("cloning log handle", e))?;

    let child = Command::new(&opts.server_bin)
        .arg(&config)
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .spawn()
        .map_err(|e| Error::io(format!("spawning {}", opts.server_bin.display()), e))?;

    info!(
        pid = child.id(),
        config = %config.display(),
        "server started, waiting for readiness"
    );

    let handle = SutHandle {
        child,
        log: Some(log),
        stopped: false,
    };
    wait_until_ready(opts.port).await;
    Ok(handle)
}

/// Connect-retry readiness probe, bounded by [`STARTUP_SETTLE`].
///
/// Probe failure is not an error: a server that never accepts will fail
/// its test cases with far better diagnostics than an abort here.
async fn wait_until_ready(port: u16) {
    let deadline = tokio::time::Instant::now() + STARTUP_SETTLE;
    loop {
        match tokio::net::TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await {
            Ok(_) => {
                debug!(port, "server accepting connections");
                return;
            }
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(PROBE_INTERVAL).await;
            }
            Err(e) => {
                warn!(port, error = %e, "server not accepting connections after settle interval");
                return;
            }
        }
    }
}
