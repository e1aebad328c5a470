//! # Remote odometry server launcher
//!
//! Starts the external pose estimation server as a child process, so that the
//! [`super::odom_client::OdomClient`] has something to talk to, and stops it when the vehicle
//! shuts down.
//!
//! The server is asked to stop with SIGTERM so it can release the tracking camera. A server still
//! running after the grace period is killed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    path::PathBuf,
    process::{Child, Command, ExitStatus},
    thread,
    time::{Duration, Instant},
};
use log::{info, warn};
use serde::Deserialize;

use crate::vehicle::{Part, PartError, Value};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time the server is given to exit after SIGTERM before it is killed.
pub const TERMINATE_GRACE_S: f64 = 2.0;

/// Interval between checks on whether the server has exited.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters describing how to start the server.
#[derive(Debug, Clone, Deserialize)]
pub struct OdomServerParams {
    /// Path to the server executable
    pub exec_path: PathBuf,

    /// Path to the server's wheel configuration file
    pub config_path: PathBuf,

    /// Port the server listens on
    pub port: u16,
}

/// A running server process.
///
/// As a part it takes no inputs and produces no outputs, it only exists so the server is stopped
/// with the rest of the vehicle.
pub struct OdomServer {
    child: Option<Child>,

    terminate_grace: Duration,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OdomServerError {
    #[error("Could not start the odometry server {0:?}: {1}")]
    SpawnError(PathBuf, std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OdomServerParams {
    /// The arguments the server is invoked with.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--config".into(),
            self.config_path.display().to_string(),
            format!("--port={}", self.port),
        ]
    }
}

impl OdomServer {
    /// Start the server process.
    pub fn launch(params: &OdomServerParams) -> Result<Self, OdomServerError> {
        let child = Command::new(&params.exec_path)
            .args(params.args())
            .spawn()
            .map_err(|e| OdomServerError::SpawnError(params.exec_path.clone(), e))?;

        info!(
            "Odometry server {:?} started on port {} (pid {})",
            params.exec_path,
            params.port,
            child.id()
        );

        Ok(Self {
            child: Some(child),
            terminate_grace: Duration::from_secs_f64(TERMINATE_GRACE_S),
        })
    }

    /// Change how long the server is given to exit after SIGTERM.
    pub fn with_terminate_grace(mut self, grace: Duration) -> Self {
        self.terminate_grace = grace;
        self
    }

    /// Stop the server process if it is still running.
    ///
    /// Returns the exit status of the server, or `None` if it was already stopped or could not be
    /// reaped.
    pub fn terminate(&mut self) -> Option<ExitStatus> {
        let mut child = self.child.take()?;

        match child.try_wait() {
            Ok(Some(status)) => {
                info!("Odometry server already exited ({})", status);
                return Some(status);
            }
            Ok(None) => (),
            Err(e) => warn!("Could not query the odometry server status: {}", e),
        }

        match send_terminate(&child) {
            Ok(()) => match wait_timeout(&mut child, self.terminate_grace) {
                Some(status) => {
                    info!("Odometry server stopped ({})", status);
                    return Some(status);
                }
                None => warn!(
                    "Odometry server still running {:.1} s after SIGTERM, killing it",
                    self.terminate_grace.as_secs_f64()
                ),
            },
            Err(e) => warn!("Could not send SIGTERM to the odometry server: {}", e),
        }

        if let Err(e) = child.kill() {
            warn!("Could not kill the odometry server: {}", e);
        }

        match child.wait() {
            Ok(status) => {
                info!("Odometry server killed ({})", status);
                Some(status)
            }
            Err(e) => {
                warn!("Could not reap the odometry server: {}", e);
                None
            }
        }
    }

    pub fn is_running(&mut self) -> bool {
        match self.child {
            Some(ref mut c) => matches!(c.try_wait(), Ok(None)),
            None => false,
        }
    }
}

impl Part for OdomServer {
    fn name(&self) -> &str {
        "odom_server"
    }

    fn run(&mut self, _inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        Ok(vec![])
    }

    fn shutdown(&mut self) {
        let _ = self.terminate();
    }
}

impl Drop for OdomServer {
    fn drop(&mut self) {
        let _ = self.terminate();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

#[cfg(unix)]
fn send_terminate(child: &Child) -> std::io::Result<()> {
    use nix::{
        sys::signal::{kill, Signal},
        unistd::Pid,
    };

    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM)
        .map_err(|e| std::io::Error::from_raw_os_error(e as i32))
}

#[cfg(not(unix))]
fn send_terminate(_child: &Child) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Other,
        "SIGTERM is only available on unix",
    ))
}

/// Wait up to `timeout` for the child to exit.
fn wait_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => (),
            Err(e) => {
                warn!("Could not query the odometry server status: {}", e);
                return None;
            }
        }

        if Instant::now() >= deadline {
            return None;
        }

        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
