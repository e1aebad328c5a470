//! Stand-in odometry server for bench testing.
//!
//! Answers every odometry request with a position obtained by integrating the reported forward
//! velocity along the `z` axis, so the drive executable can run its remote localisation without
//! the real pose estimator.
//!
//! Usage: `odom_test_server [port]`, port defaults to 5555.

use std::time::Instant;

use comms_if::{
    eqpt::odom::{OdomRequest, PoseReply},
    net::{self, zmq, SocketOptions},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port: u16 = match std::env::args().nth(1) {
        Some(p) => p.parse()?,
        None => 5555,
    };

    let ctx = zmq::Context::new();

    let socket = net::open_socket(
        &ctx,
        zmq::REP,
        &SocketOptions::server(),
        &format!("tcp://*:{}", port)
    )?;

    println!("Odometry test server running on port {}", port);

    let mut z_m = 0.0;
    let mut last_instant: Option<Instant> = None;

    loop {
        let msg = socket.recv_msg(0)?;

        let request: OdomRequest = match msg.as_str().map(serde_json::from_str::<OdomRequest>) {
            Some(Ok(r)) => r,
            Some(Err(e)) => {
                println!("Invalid request: {}", e);
                socket.send("{}", 0)?;
                continue;
            }
            None => {
                println!("Received non UTF-8 request");
                socket.send("{}", 0)?;
                continue;
            }
        };

        let now = Instant::now();
        if let Some(t0) = last_instant {
            z_m += request.vel_z * (now - t0).as_secs_f64();
        }
        last_instant = Some(now);

        let reply = PoseReply { x: 0.0, y: Some(0.0), z: z_m };
        socket.send(serde_json::to_string(&reply)?.as_str(), 0)?;

        println!("Frame {}: vel_z = {:.3} m/s, z = {:.3} m", request.frame, request.vel_z, z_m);
    }
}
