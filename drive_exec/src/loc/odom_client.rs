//! # Remote odometry client
//!
//! Sends the wheel odometry to an external pose estimation server and provides the position the
//! server estimates. The exchange is a strict request/reply: one request per frame, carrying the
//! latest forward velocity, answered by one reply carrying the estimated position.
//!
//! The exchange runs in a background thread so the tick loop is never blocked waiting for the
//! server. The tick loop only publishes the velocity and reads the latest cached position, which
//! stays at the last reply (or the origin before the first reply) if the server stalls.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use log::{debug, error, info, warn};

use comms_if::{
    eqpt::odom::{OdomRequest, PoseReply},
    net::{self, zmq, NetError, NetParams, SocketOptions},
};
use crate::{
    mailbox::Mailbox,
    vehicle::{check_inputs, PartError, ThreadedPart, Value},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time given to the background thread to finish its current exchange on shutdown.
pub const SHUTDOWN_GRACE_S: f64 = 1.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Client for the remote pose estimation server.
///
/// Inputs: `enc/vel_m_s`. Outputs: `pos/x, pos/y`.
pub struct OdomClient {
    /// The socket, moved into the background thread on start
    socket: Option<zmq::Socket>,

    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,

    /// Latest forward velocity to report
    velocity_ms: Mailbox<f64>,

    /// Latest position from the server
    position: Mailbox<(f64, f64)>,

    shutdown_grace: Duration,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OdomClientError {
    #[error("Socket error: {0}")]
    SocketError(NetError),

    #[error("The OdomClient has already been started")]
    AlreadyStarted,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OdomClient {
    /// Create a new client for the server given in the network parameters.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, OdomClientError> {
        Self::connect(ctx, &params.odom_endpoint)
    }

    /// Create a new client for the server at the given endpoint.
    ///
    /// The socket does not wait for the server to be up, requests are queued until it is.
    pub fn connect(ctx: &zmq::Context, endpoint: &str) -> Result<Self, OdomClientError> {
        let socket = net::open_socket(
            ctx,
            zmq::REQ,
            &SocketOptions::blocking_req_client(),
            endpoint,
        )
        .map_err(OdomClientError::SocketError)?;

        debug!("OdomClient connecting to {}", endpoint);

        Ok(Self {
            socket: Some(socket),
            bg_jh: None,
            bg_run: Arc::new(AtomicBool::new(false)),
            velocity_ms: Mailbox::new(0.0),
            position: Mailbox::new((0.0, 0.0)),
            shutdown_grace: Duration::from_secs_f64(SHUTDOWN_GRACE_S),
        })
    }

    /// Change how long shutdown waits for the background thread.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Get the latest position reported by the server, `(0, 0)` before the first reply.
    pub fn latest_pose(&self) -> (f64, f64) {
        self.position.latest()
    }

    /// Set the forward velocity sent with the next request.
    pub fn set_velocity(&self, velocity_ms: f64) {
        self.velocity_ms.publish(velocity_ms);
    }
}

impl ThreadedPart for OdomClient {
    fn name(&self) -> &str {
        "odom_client"
    }

    fn start(&mut self) -> Result<(), PartError> {
        let socket = self
            .socket
            .take()
            .ok_or_else(|| PartError::Failed(Box::new(OdomClientError::AlreadyStarted)))?;

        self.bg_run.store(true, Ordering::Relaxed);

        let run = self.bg_run.clone();
        let velocity_ms = self.velocity_ms.clone();
        let position = self.position.clone();

        self.bg_jh = Some(
            thread::Builder::new()
                .name("odom_client".into())
                .spawn(move || bg_thread(socket, run, velocity_ms, position))
                .map_err(PartError::Spawn)?,
        );

        info!("OdomClient started");

        Ok(())
    }

    fn run_threaded(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError> {
        check_inputs(inputs, 1)?;
        self.set_velocity(inputs[0].float_or(0.0)?);

        let (x, y) = self.latest_pose();
        Ok(vec![Value::Float(x), Value::Float(y)])
    }

    fn shutdown(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        // The thread may be blocked on a reply that never comes, so it is given a grace period
        // and then left behind rather than joined
        thread::sleep(self.shutdown_grace);
        self.bg_jh.take();

        info!("OdomClient stopped");
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, exchanges one request/reply per frame while instructed to run.
fn bg_thread(
    socket: zmq::Socket,
    run: Arc<AtomicBool>,
    velocity_ms: Mailbox<f64>,
    position: Mailbox<(f64, f64)>,
) {
    let mut frame: u64 = 0;

    while run.load(Ordering::Relaxed) {
        frame += 1;

        let request = OdomRequest::forward(frame, velocity_ms.latest());

        let msg = match serde_json::to_string(&request) {
            Ok(m) => m,
            Err(e) => {
                warn!("Could not serialize odometry request: {}", e);
                continue;
            }
        };

        match socket.send(msg.as_str(), 0) {
            Ok(_) => (),
            Err(zmq::Error::ETERM) => break,
            Err(e) => {
                warn!("Could not send odometry request {}: {}", frame, e);
                continue;
            }
        }

        let reply = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 reply from the odometry server");
                continue;
            }
            Err(zmq::Error::ETERM) => break,
            Err(e) => {
                warn!("Error receiving reply from the odometry server: {}", e);
                continue;
            }
        };

        match serde_json::from_str::<PoseReply>(&reply) {
            Ok(pose) => position.publish(pose.ground_position()),
            Err(e) => warn!("Could not parse the odometry server reply {:?}: {}", reply, e),
        }
    }

    if run.load(Ordering::Relaxed) {
        error!("OdomClient context terminated, no further positions will be received");
    } else {
        debug!("OdomClient background thread exited after {} frames", frame);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_before_start() {
        let ctx = zmq::Context::new();
        let mut client = OdomClient::connect(&ctx, "inproc://odom_client_unit")
            .unwrap()
            .with_shutdown_grace(Duration::from_millis(0));

        // No reply yet, the cached position is the origin
        assert_eq!(
            client.run_threaded(&[Value::Float(0.3)]).unwrap(),
            vec![Value::Float(0.0), Value::Float(0.0)]
        );
        assert_eq!(client.velocity_ms.latest(), 0.3);

        assert!(client.run_threaded(&[Value::Bool(true)]).is_err());

        client.shutdown();
    }
}
