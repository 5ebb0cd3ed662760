//! Test harness
//!
//! In-process fakes for the rendering engine, tracking session, durable store
//! and media stack, plus a scenario simulator driving the lifecycle
//! controller through them.

mod fakes;
mod simulator;

pub use fakes::{
    FakeCompositor, FakeFrame, FakeMediaPlayer, FakeSession, RecordingScene, RecordingStore,
    SessionCall,
};
pub use simulator::{Scenario, Simulator, SimulatorReport, Step};
