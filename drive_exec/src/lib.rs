//! # Drive Library
//!
//! Library components of the path following drive executable. The executable is built from
//! parts wired together through a shared blackboard and ticked at a fixed rate by the
//! [`vehicle::Vehicle`] scheduler:
//!
//! - `loc` - dead reckoning and remote odometry localisation,
//! - `pilot` - path recording, cross track error and PID steering,
//! - `mode` - arbitration between the operator and the pilot,
//! - `triggers` - operator button bindings.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod loc;
pub mod mailbox;
pub mod mode;
pub mod params;
pub mod pilot;
pub mod triggers;
pub mod vehicle;
