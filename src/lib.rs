//! osc2midi - OSC to MIDI control change bridge
//!
//! Listens for OSC messages over UDP and sends each float argument to a MIDI
//! output as a control change, according to a YAML mapping of OSC addresses to
//! channel/controller targets.

pub mod bridge;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod midi;
pub mod net;
pub mod osc;
pub mod sink;
pub mod translator;

pub use bridge::{start, Arguments, DEFAULT_OSC_PORT};
pub use config::{Config, Endpoint, MidiCc, TargetSpec};
pub use error::{Error, Result};
