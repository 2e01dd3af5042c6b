//! Serialized access to the MIDI output
//!
//! Handlers may run concurrently, one task per datagram. The output port is
//! only reachable through [`SharedSink`], which holds its lock for a single
//! event at a time.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::Result;
use crate::midi::ShortMessage;

/// Something that can write raw MIDI bytes
pub trait OutputPort: Send {
    /// Human-readable port name for logs
    fn name(&self) -> &str;

    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

/// midir output connection with the name of the port it was opened on
pub struct MidirPort {
    name: String,
    connection: midir::MidiOutputConnection,
}

impl MidirPort {
    pub fn new(name: String, connection: midir::MidiOutputConnection) -> Self {
        Self { name, connection }
    }
}

impl OutputPort for MidirPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        Ok(self.connection.send(bytes)?)
    }
}

/// Output port shared across all handlers
#[derive(Clone)]
pub struct SharedSink {
    port: Arc<Mutex<Box<dyn OutputPort>>>,
}

impl SharedSink {
    pub fn new(port: impl OutputPort + 'static) -> Self {
        Self {
            port: Arc::new(Mutex::new(Box::new(port))),
        }
    }

    pub fn name(&self) -> String {
        self.port.lock().name().to_string()
    }

    /// Write one event, holding the lock only for this write
    pub fn transmit(&self, msg: &ShortMessage) -> Result<()> {
        self.port.lock().send(&msg.to_bytes())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Error;

    /// In-memory port recording every byte written, in order
    #[derive(Clone, Default)]
    pub struct MemoryPort {
        pub bytes: Arc<Mutex<Vec<u8>>>,
        /// Number of upcoming sends that should fail
        pub fail_next: Arc<Mutex<usize>>,
    }

    impl MemoryPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn messages(&self) -> Vec<ShortMessage> {
            self.bytes
                .lock()
                .chunks(3)
                .map(|c| ShortMessage::new(c[0], c[1], c[2]))
                .collect()
        }
    }

    impl OutputPort for MemoryPort {
        fn name(&self) -> &str {
            "memory"
        }

        fn send(&mut self, bytes: &[u8]) -> Result<()> {
            {
                let mut fail_next = self.fail_next.lock();
                if *fail_next > 0 {
                    *fail_next -= 1;
                    return Err(Error::Transmit("port unavailable".to_string()));
                }
            }
            // Byte by byte, so an unserialized writer would show up as interleaving
            for b in bytes {
                self.bytes.lock().push(*b);
                std::thread::yield_now();
            }
            Ok(())
        }
    }
}
