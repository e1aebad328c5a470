//! # Communications interface crate.
//!
//! Provides the network abstractions and wire formats shared between the drive executable and the
//! processes it talks to.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Request and reply definitions for equipment (like the odometry server)
pub mod eqpt;

/// Network module
pub mod net;
