//! # Network Module
//!
//! Sockets for the drive software are plain ZMQ sockets. This module holds the endpoint
//! parameters and the small set of socket options the odometry exchange relies on.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::Deserialize;
use zmq::{Context, Socket, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| NetError::SocketOptionError(stringify!($opt), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network endpoints, loaded from `net.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetParams {
    /// Endpoint of the pose estimation (odometry) server, for example `"tcp://localhost:5555"`
    pub odom_endpoint: String,
}

/// Options applied to a socket before it is bound or connected.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketOptions {
    /// Bind to the endpoint (servers) rather than connect to it (clients).
    pub bind: bool,

    /// `ZMQ_LINGER`: how long unsent messages are kept after the socket is closed, in ms
    pub linger: i32,

    /// `ZMQ_RCVTIMEO`: maximum time before a receive returns `EAGAIN`, `-1` blocks forever
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`: maximum time before a send returns `EAGAIN`, `-1` blocks forever
    pub send_timeout: i32,

    /// `ZMQ_REQ_CORRELATE`: match replies with requests, REQ sockets only
    pub req_correlate: bool,

    /// `ZMQ_REQ_RELAXED`: allow a new request after a failed receive, REQ sockets only
    pub req_relaxed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum NetError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(&'static str, zmq::Error),

    #[error("Could not bind to {0}: {1}")]
    BindError(String, zmq::Error),

    #[error("Could not connect to {0}: {1}")]
    ConnectError(String, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), NetError> {
        set_sockopts!(
            socket,
            (set_linger, self.linger),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        if let Ok(SocketType::REQ) = socket.get_socket_type() {
            set_sockopts!(
                socket,
                (set_req_correlate, self.req_correlate),
                (set_req_relaxed, self.req_relaxed)
            );
        }

        Ok(())
    }

    /// Options for a request client that never times out.
    ///
    /// Every send and receive blocks until it completes. Replies are correlated with requests and
    /// a new request may be sent after a failed receive.
    pub fn blocking_req_client() -> Self {
        Self {
            linger: 1,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        }
    }

    /// Options for a server bound to its endpoint.
    pub fn server() -> Self {
        Self {
            bind: true,
            linger: 1,
            ..Default::default()
        }
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // Defaults for sockopts taken from http://api.zeromq.org/4-2:zmq-setsockopt
        Self {
            bind: false,
            linger: 30_000,
            recv_timeout: -1,
            send_timeout: -1,
            req_correlate: false,
            req_relaxed: false,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a socket, apply the options and bind or connect it to `endpoint`.
///
/// Connecting does not wait for the peer, messages are queued until it is up.
pub fn open_socket(
    ctx: &Context,
    socket_type: SocketType,
    options: &SocketOptions,
    endpoint: &str,
) -> Result<Socket, NetError> {
    let socket = ctx.socket(socket_type).map_err(NetError::CreateSocketError)?;

    options.set(&socket)?;

    if options.bind {
        socket
            .bind(endpoint)
            .map_err(|e| NetError::BindError(endpoint.to_string(), e))?;
    } else {
        socket
            .connect(endpoint)
            .map_err(|e| NetError::ConnectError(endpoint.to_string(), e))?;
    }

    debug!(
        "Socket {} {}",
        if options.bind { "bound to" } else { "connected to" },
        endpoint
    );

    Ok(socket)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_open_socket() {
        let ctx = Context::new();
        let endpoint = "inproc://net_open_socket";

        let server = open_socket(&ctx, zmq::REP, &SocketOptions::server(), endpoint).unwrap();
        let client = open_socket(
            &ctx,
            zmq::REQ,
            &SocketOptions::blocking_req_client(),
            endpoint,
        )
        .unwrap();

        assert_eq!(client.get_linger().unwrap(), 1);
        assert_eq!(client.get_rcvtimeo().unwrap(), -1);
        assert_eq!(server.get_linger().unwrap(), 1);

        client.send("ping", 0).unwrap();
        assert_eq!(server.recv_string(0).unwrap().unwrap(), "ping");
        server.send("pong", 0).unwrap();
        assert_eq!(client.recv_string(0).unwrap().unwrap(), "pong");
    }

    #[test]
    fn test_bad_endpoint() {
        let ctx = Context::new();

        match open_socket(&ctx, zmq::REQ, &SocketOptions::default(), "not an endpoint") {
            Err(NetError::ConnectError(e, _)) => assert_eq!(e, "not an endpoint"),
            Err(e) => panic!("Expected an endpoint error, got {}", e),
            Ok(_) => panic!("Expected an endpoint error, got a socket"),
        }
    }
}
