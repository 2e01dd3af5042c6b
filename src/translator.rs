//! OSC argument to MIDI control change translation
//!
//! One [`Translator`] is built per endpoint. The target policy is fixed at
//! construction so each message only walks its arguments.

use rosc::OscType;
use tracing::{trace, warn};

use crate::config::{Endpoint, MidiCc, TargetSpec};
use crate::midi::ShortMessage;
use crate::sink::SharedSink;

/// How the arguments of a message map to targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetPolicy {
    /// Argument `i` goes to `targets[i]`; arguments past the last target are dropped
    PerArgument(Vec<MidiCc>),
    /// Every argument goes to the same channel, controller number offset by position
    Shared(MidiCc),
}

impl From<&TargetSpec> for TargetPolicy {
    fn from(spec: &TargetSpec) -> Self {
        match spec {
            TargetSpec::PerArgument(targets) => TargetPolicy::PerArgument(targets.clone()),
            TargetSpec::Shared(cc) => TargetPolicy::Shared(*cc),
        }
    }
}

/// Per-endpoint message translator
#[derive(Debug, Clone)]
pub struct Translator {
    address: String,
    policy: TargetPolicy,
}

impl Translator {
    pub fn new(endpoint: &Endpoint) -> Self {
        Self {
            address: endpoint.address.clone(),
            policy: TargetPolicy::from(&endpoint.cc),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn policy(&self) -> &TargetPolicy {
        &self.policy
    }

    /// Control change events for a message's arguments, in argument order.
    ///
    /// Only float arguments translate; any other type at a position is skipped.
    pub fn translate(&self, args: &[OscType]) -> Vec<ShortMessage> {
        if args.is_empty() {
            return Vec::new();
        }

        let limit = match &self.policy {
            TargetPolicy::PerArgument(targets) => targets.len().min(args.len()),
            TargetPolicy::Shared(_) => args.len(),
        };

        args[..limit]
            .iter()
            .enumerate()
            .filter_map(|(i, arg)| match arg {
                OscType::Float(value) => Some(self.event_at(i, *value)),
                _ => None,
            })
            .collect()
    }

    fn event_at(&self, i: usize, value: f32) -> ShortMessage {
        match &self.policy {
            TargetPolicy::PerArgument(targets) => {
                ShortMessage::control_change(&targets[i], 0, value)
            }
            TargetPolicy::Shared(cc) => ShortMessage::control_change(cc, i as i64, value),
        }
    }

    /// Translate and send every event.
    ///
    /// A failed write drops that event only; the remaining events are still sent.
    /// Returns the number of events written.
    pub fn handle(&self, args: &[OscType], sink: &SharedSink) -> usize {
        let mut sent = 0;
        for msg in self.translate(args) {
            match sink.transmit(&msg) {
                Ok(()) => {
                    trace!("{} -> {}", self.address, msg);
                    sent += 1;
                }
                Err(e) => {
                    warn!("Could not send MIDI CC for endpoint {}: {}", self.address, e);
                }
            }
        }
        sent
    }
}
