//! Hand-driven tone engine for tests.

use super::engine::{EngineError, ToneEngine};
use super::voice::Timbre;
use std::cell::{Cell, RefCell};

/// A tone engine whose clock is set by the test and which records every
/// click instead of playing it.
#[derive(Debug, Default)]
pub struct ManualEngine {
    pub now: Cell<f64>,
    pub clicks: RefCell<Vec<(Timbre, f64)>>,
    pub volume: Cell<f32>,
    pub initialized: bool,
    pub fail_initialize: bool,
}

impl ManualEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that is already initialized.
    pub fn ready() -> Self {
        Self {
            initialized: true,
            ..Self::default()
        }
    }

    /// An engine whose initialization always fails.
    pub fn broken() -> Self {
        Self {
            fail_initialize: true,
            ..Self::default()
        }
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }

    pub fn clicks(&self) -> Vec<(Timbre, f64)> {
        self.clicks.borrow().clone()
    }
}

impl ToneEngine for ManualEngine {
    fn initialize(&mut self) -> Result<(), EngineError> {
        if self.fail_initialize {
            return Err(EngineError::OutputUnavailable("no device".into()));
        }
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn current_time(&self) -> f64 {
        assert!(self.initialized, "ManualEngine::current_time called before initialize()");
        self.now.get()
    }

    fn set_volume(&self, volume: f32) {
        self.volume.set(volume.clamp(0.0, 1.0));
    }

    fn schedule_click(&self, timbre: Timbre, at_time: f64) {
        assert!(self.initialized, "ManualEngine::schedule_click called before initialize()");
        self.clicks.borrow_mut().push((timbre, at_time));
    }
}
