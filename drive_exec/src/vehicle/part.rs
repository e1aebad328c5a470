//! # Part traits
//!
//! A part is a unit of work ticked by the [`super::Vehicle`]. Synchronous parts do all their work
//! in [`Part::run`], which must return quickly. Threaded parts do their work in a background
//! thread launched by [`ThreadedPart::start`] and only exchange the latest values with the tick
//! loop in [`ThreadedPart::run_threaded`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use thiserror::Error;

use super::{Value, ValueError};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Part {
    /// Name of the part used in logs and errors.
    fn name(&self) -> &str;

    /// Process one tick, returning one value per declared output.
    fn run(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError>;

    /// Release any resources held by the part. Called once when the vehicle stops.
    fn shutdown(&mut self) {}
}

pub trait ThreadedPart {
    /// Name of the part used in logs and errors.
    fn name(&self) -> &str;

    /// Launch the background work. Called exactly once before the first tick.
    fn start(&mut self) -> Result<(), PartError>;

    /// Hand the inputs to the background work and return its most recent outputs.
    fn run_threaded(&mut self, inputs: &[Value]) -> Result<Vec<Value>, PartError>;

    /// Stop the background work. Called once when the vehicle stops.
    fn shutdown(&mut self) {}
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PartError {
    #[error("Expected {expected} inputs but got {found}")]
    InputCount { expected: usize, found: usize },

    #[error("Invalid input: {0}")]
    Value(#[from] ValueError),

    #[error("Could not spawn the background thread: {0}")]
    Spawn(std::io::Error),

    #[error("{0}")]
    Failed(Box<dyn std::error::Error + Send + Sync + 'static>),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check that a part received the number of inputs it was written for.
pub fn check_inputs(inputs: &[Value], expected: usize) -> Result<(), PartError> {
    if inputs.len() != expected {
        Err(PartError::InputCount {
            expected,
            found: inputs.len(),
        })
    } else {
        Ok(())
    }
}
