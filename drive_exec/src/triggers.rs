//! # Triggers module
//!
//! Maps operator buttons to actions run outside the tick loop, such as saving the recorded path
//! or tuning the pilot. Actions only touch state shared through mailboxes, so they may run on any
//! thread.
//!
//! The operator console reads button names from a text stream, one per line, and fires the bound
//! actions.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    collections::BTreeMap,
    io::BufRead,
    thread::{self, JoinHandle},
};
use log::{debug, info, warn};

use crate::vehicle::StopHandle;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Console commands which stop the vehicle.
const QUIT_COMMANDS: [&str; 2] = ["quit", "exit"];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Button bindings.
#[derive(Default)]
pub struct Triggers {
    bindings: BTreeMap<String, Box<dyn Fn() + Send>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Triggers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an action to a button, replacing any previous binding.
    pub fn bind<F: Fn() + Send + 'static>(&mut self, button: &str, action: F) {
        if self
            .bindings
            .insert(button.to_string(), Box::new(action))
            .is_some()
        {
            warn!("Button `{}` was already bound, replacing its action", button);
        }
        debug!("Bound button `{}`", button);
    }

    /// Run the action bound to a button, returning false if the button is not bound.
    pub fn fire(&self, button: &str) -> bool {
        match self.bindings.get(button) {
            Some(action) => {
                debug!("Button `{}` pressed", button);
                action();
                true
            }
            None => false,
        }
    }

    pub fn buttons(&self) -> Vec<&str> {
        self.bindings.keys().map(|k| k.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Spawn the operator console thread.
///
/// Each non-empty line of `input` is a button name to fire, `quit` or `exit` stops the vehicle.
/// The thread ends at the end of the input or after stopping the vehicle.
pub fn spawn_console<R>(
    triggers: Triggers,
    stop: StopHandle,
    input: R,
) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("operator_console".into())
        .spawn(move || run_console(&triggers, &stop, input))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn run_console<R: BufRead>(triggers: &Triggers, stop: &StopHandle, input: R) {
    info!("Operator console ready, buttons: {:?}", triggers.buttons());

    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("Could not read from the operator console: {}", e);
                break;
            }
        };

        let cmd = line.trim();

        if cmd.is_empty() {
            continue;
        }

        if QUIT_COMMANDS.contains(&cmd) {
            info!("Stop requested from the operator console");
            stop.stop();
            break;
        }

        if !triggers.fire(cmd) {
            warn!(
                "Unknown button `{}`, expected one of {:?} or quit",
                cmd,
                triggers.buttons()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::vehicle::Vehicle;
    use std::{
        io::Cursor,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    #[test]
    fn test_bind_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut triggers = Triggers::new();

        let c = count.clone();
        triggers.bind("R2", move || {
            c.fetch_add(1, Ordering::Relaxed);
        });

        assert!(triggers.fire("R2"));
        assert!(triggers.fire("R2"));
        assert!(!triggers.fire("L2"));
        assert_eq!(count.load(Ordering::Relaxed), 2);

        // Rebinding replaces the action
        let c = count.clone();
        triggers.bind("R2", move || {
            c.fetch_add(10, Ordering::Relaxed);
        });
        triggers.fire("R2");
        assert_eq!(count.load(Ordering::Relaxed), 12);
        assert_eq!(triggers.buttons(), vec!["R2"]);
    }

    #[test]
    fn test_console() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut triggers = Triggers::new();

        let c = count.clone();
        triggers.bind("L2", move || {
            c.fetch_add(1, Ordering::Relaxed);
        });

        let vehicle = Vehicle::new();
        let stop = vehicle.stop_handle();

        let input = Cursor::new("L2\n\n  L2  \nX\nquit\nL2\n");
        spawn_console(triggers, stop.clone(), input)
            .unwrap()
            .join()
            .unwrap();

        // Lines after quit are ignored
        assert_eq!(count.load(Ordering::Relaxed), 2);
        assert!(stop.is_stopped());
    }
}
