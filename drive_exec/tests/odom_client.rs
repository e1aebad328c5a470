//! Remote odometry client tests, against an in-process pose server

use std::time::Duration;

use comms_if::{eqpt::odom::OdomRequest, net::zmq};
use drive_lib::{
    loc::odom_client::OdomClient,
    vehicle::{ThreadedPart, Value},
};
use serde_json::json;

const ENDPOINT: &str = "inproc://odom_client_test";

/// Receive and parse the next request from the client.
fn recv_request(server: &zmq::Socket) -> OdomRequest {
    let msg = server
        .recv_string(0)
        .expect("No request from the client")
        .expect("Non UTF-8 request");
    serde_json::from_str(&msg).expect("Invalid request")
}

#[test]
fn test_request_reply_exchange() {
    let ctx = zmq::Context::new();

    let server = ctx.socket(zmq::REP).unwrap();
    server.bind(ENDPOINT).unwrap();
    server.set_rcvtimeo(5000).unwrap();

    let mut client = OdomClient::connect(&ctx, ENDPOINT)
        .unwrap()
        .with_shutdown_grace(Duration::from_millis(10));

    client.start().unwrap();

    // Starting twice is refused
    assert!(client.start().is_err());

    for frame in 1..=8u64 {
        let req = recv_request(&server);

        assert_eq!(req.frame, frame);
        assert_eq!(req.wheel_id, 0);
        assert_eq!(req.vel_x, 0.0);
        assert_eq!(req.vel_y, 0.0);

        // The velocity published by the tick loop goes out with the following request
        if frame == 1 {
            assert_eq!(req.vel_z, 0.0);
            let out = client.run_threaded(&[Value::Float(0.5)]).unwrap();
            assert_eq!(out, vec![Value::Float(0.0), Value::Float(0.0)]);
        } else {
            assert_eq!(req.vel_z, 0.5);
        }

        // Until the reply is sent the cached position is the previous one
        let expected = match frame {
            1 => (0.0, 0.0),
            // The reply to frame 3 was garbage, so frame 4 still sees frame 2's position
            4 => (2.0, -2.0),
            f => ((f - 1) as f64, -((f - 1) as f64)),
        };
        assert_eq!(client.latest_pose(), expected);

        let reply = if frame == 3 {
            "not a pose".to_string()
        } else {
            json!({
                "x": frame as f64,
                "y": 100.0,
                "z": -(frame as f64),
                "tracker_confidence": 3
            })
            .to_string()
        };
        server.send(reply.as_str(), 0).unwrap();
    }

    // Once the next request arrives the last reply has been taken into account
    assert_eq!(recv_request(&server).frame, 9);
    assert_eq!(client.latest_pose(), (8.0, -8.0));
    assert_eq!(
        client.run_threaded(&[Value::None]).unwrap(),
        vec![Value::Float(8.0), Value::Float(-8.0)]
    );

    // The background thread is blocked waiting for reply 9, shutdown must not wait for it
    client.shutdown();
}
