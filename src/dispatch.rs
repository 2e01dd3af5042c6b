//! Dispatch table: OSC address to translator
//!
//! Built once from the config at startup and read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use rosc::OscMessage;
use tracing::{debug, info};

use crate::config::Config;
use crate::osc::{MessageHandler, OscServer};
use crate::sink::SharedSink;
use crate::translator::Translator;

pub struct DispatchTable {
    /// Addresses in first-registration order
    order: Vec<String>,
    entries: HashMap<String, Arc<Translator>>,
    sink: SharedSink,
}

impl DispatchTable {
    /// Build one translator per endpoint, in config order.
    ///
    /// A repeated address replaces the earlier endpoint.
    pub fn build(config: &Config, sink: SharedSink) -> Self {
        let mut order = Vec::new();
        let mut entries = HashMap::new();

        for endpoint in &config.endpoints {
            let translator = Arc::new(Translator::new(endpoint));
            if entries.insert(endpoint.address.clone(), translator).is_none() {
                order.push(endpoint.address.clone());
            } else {
                debug!("Replacing earlier endpoint for {}", endpoint.address);
            }
        }

        Self {
            order,
            entries,
            sink,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&Translator> {
        self.entries.get(address).map(|t| t.as_ref())
    }

    /// Handler sending a message's events to the shared sink
    pub fn handler(&self, address: &str) -> Option<MessageHandler> {
        let translator = Arc::clone(self.entries.get(address)?);
        let sink = self.sink.clone();
        Some(Arc::new(move |msg: &OscMessage| {
            translator.handle(&msg.args, &sink);
        }))
    }

    /// Install every entry into the server's routing
    pub fn register(&self, server: &mut OscServer) {
        for address in &self.order {
            let Some(translator) = self.entries.get(address) else {
                continue;
            };
            if let Some(handler) = self.handler(translator.address()) {
                info!("Handling {}", translator.address());
                server.handle(translator.address(), handler);
            }
        }
    }
}
