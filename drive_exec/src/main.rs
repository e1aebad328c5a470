//! Main drive executable entry point.
//!
//! # Architecture
//!
//! The executable builds a vehicle from parts and ticks it at the drive loop rate:
//!
//!     - Localisation, either:
//!         - Dead reckoning from the encoder and operator steering, or
//!         - The remote odometry server fed with the encoder velocity
//!     - Origin offset
//!     - Run conditions for the operator-only and pilot-only parts
//!     - Path recording (operator driving)
//!     - Cross track error and PID pilot (pilot driving)
//!     - Drive mode arbitration
//!
//! Operator buttons are read from stdin by the operator console, Ctrl-C or `quit` stops the
//! vehicle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::io::{self, BufReader};
use color_eyre::{Report, eyre::WrapErr};
use log::{error, info};
use structopt::StructOpt;

// Internal
use comms_if::net::{zmq, NetParams};
use drive_lib::{
    loc::{
        odom_client::OdomClient,
        odom_server::OdomServer,
        parts::{KinematicLocaliser, OriginOffset, SteerToRad},
        Pose2,
    },
    mode::{DriveModeArbiter, PilotCondition, UserCondition},
    params::DriveParams,
    pilot::{CrossTrackError, PathRecorder, PidController, PidGains, PidPilot, RecordedPath},
    triggers::{spawn_console, Triggers},
    vehicle::{Key, Value, Vehicle},
};
use util::{
    logger::{logger_init, parse_level},
    session::Session,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Path following drive executable")]
enum Cli {
    /// Drive the vehicle, recording a path under operator control and retracing it under pilot
    /// control.
    #[structopt(name = "drive")]
    Drive {
        /// Minimum log level, one of OFF, ERROR, WARN, INFO, DEBUG or TRACE.
        #[structopt(long = "log", default_value = "INFO")]
        log: String,
    },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    match Cli::from_args() {
        Cli::Drive { log } => drive(&log),
    }
}

fn drive(log_level: &str) -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Check the level before creating the session so a typo leaves nothing behind
    let level = parse_level(log_level).wrap_err("Invalid log level")?;

    let session = Session::new("drive_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(level, &session).wrap_err("Failed to initialise logging")?;

    info!("Path Following Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: DriveParams = util::params::load("drive.toml")
        .wrap_err("Could not load drive params")?;
    params.validate().wrap_err("Invalid drive params")?;

    info!("Exec parameters loaded");

    // ---- BUILD VEHICLE ----

    let mut vehicle = Vehicle::new();

    // No input devices or encoder are attached to this executable, so their channels are fixed at
    // their initial values
    vehicle.seed(Key::UserMode, params.initial.mode.into());
    vehicle.seed(Key::UserAngle, params.initial.user_angle.into());
    vehicle.seed(Key::UserThrottle, params.initial.user_throttle.into());
    vehicle.seed(Key::EncVelMS, Value::Float(0.0));
    vehicle.seed(Key::EncDeltaDistM, Value::Float(0.0));

    // Localisation
    let zmq_ctx = zmq::Context::new();

    if params.use_remote_odom {
        if let Some(ref server_params) = params.odom_server {
            let server = OdomServer::launch(server_params)
                .wrap_err("Failed to launch the odometry server")?;
            vehicle.add(server, &[], &[], None);
        }

        let net_params: NetParams = util::params::load("net.toml")
            .wrap_err("Could not load net params")?;

        let client = OdomClient::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise the OdomClient")?;
        info!("OdomClient initialised");

        vehicle.add_threaded(client, &[Key::EncVelMS], &[Key::PosX, Key::PosY], None);
    }
    else {
        vehicle.add(
            SteerToRad::new(params.max_steer_rad()),
            &[Key::UserAngle],
            &[Key::SteeringRadian],
            None,
        );

        let localiser = KinematicLocaliser::new(Pose2::default(), params.wheelbase_m)
            .wrap_err("Failed to initialise the localiser")?;
        vehicle.add(
            localiser,
            &[Key::EncDeltaDistM, Key::SteeringRadian],
            &[Key::PosX, Key::PosY],
            None,
        );
    }

    let origin = OriginOffset::new();
    let origin_reset = origin.reset_handle();
    vehicle.add(origin, &[Key::PosX, Key::PosY], &[Key::PosX, Key::PosY], None);

    vehicle.add(UserCondition, &[Key::UserMode], &[Key::RunUser], None);
    vehicle.add(PilotCondition, &[Key::UserMode], &[Key::RunPilot], None);

    // Path recording and following
    let path = RecordedPath::new();
    if params.path_file.exists() {
        path.load(&params.path_file).wrap_err("Failed to load the recorded path")?;
    }
    info!(
        "Path recording {}",
        if path.is_recording() { "on" } else { "off, following the loaded path" }
    );

    vehicle.add(
        PathRecorder::new(path.clone(), params.path_min_dist_m),
        &[Key::PosX, Key::PosY],
        &[],
        Some(Key::RunUser),
    );
    vehicle.add(
        CrossTrackError::new(path.clone()),
        &[Key::PosX, Key::PosY],
        &[Key::CteError],
        Some(Key::RunPilot),
    );

    let pilot = PidPilot::new(
        PidController::new(PidGains::new(params.pid_p, params.pid_i, params.pid_d)),
        params.steering_sign,
        params.pid_throttle,
    );
    let tuner = pilot.tuner();
    vehicle.add(
        pilot,
        &[Key::CteError],
        &[Key::PilotAngle, Key::PilotThrottle],
        Some(Key::RunPilot),
    );

    vehicle.add(
        DriveModeArbiter,
        &[
            Key::UserMode,
            Key::UserAngle,
            Key::UserThrottle,
            Key::PilotAngle,
            Key::PilotThrottle,
        ],
        &[Key::Angle, Key::Throttle],
        None,
    );

    // ---- OPERATOR TRIGGERS ----

    let mut triggers = Triggers::new();

    triggers.bind(&params.buttons.reset_origin, move || origin_reset.init_to_last());

    let save_file = params.path_file.clone();
    triggers.bind(&params.buttons.save_path, move || {
        if let Err(e) = path.save(&save_file) {
            error!("Could not save the path: {}", e);
        }
    });

    let step = params.pid_d_step;
    let inc_tuner = tuner.clone();
    triggers.bind(&params.buttons.inc_pid_d, move || {
        info!("pid: d+ {}", inc_tuner.step_k_d(step))
    });
    triggers.bind(&params.buttons.dec_pid_d, move || {
        info!("pid: d- {}", tuner.step_k_d(-step))
    });

    let stop = vehicle.stop_handle();

    let ctrlc_stop = stop.clone();
    ctrlc::set_handler(move || ctrlc_stop.stop())
        .wrap_err("Failed to set the Ctrl-C handler")?;

    spawn_console(triggers, stop, BufReader::new(io::stdin()))
        .wrap_err("Failed to start the operator console")?;

    // ---- MAIN LOOP ----

    info!("Begining drive loop\n");

    let report = vehicle
        .start(params.drive_loop_hz, params.max_loops)
        .wrap_err("Drive loop failed")?;

    info!(
        "Drive loop complete: {} ticks, {} overruns",
        report.ticks, report.overruns
    );

    Ok(())
}
