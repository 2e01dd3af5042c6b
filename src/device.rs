//! MIDI output device discovery and selection

use colored::*;
use midir::MidiOutput;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sink::MidirPort;

const CLIENT_NAME: &str = "osc2midi";

/// Names of the available MIDI output ports
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new(CLIENT_NAME)?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|port| midi_out.port_name(port).ok())
        .collect())
}

/// Print available output ports
pub fn print_ports() -> Result<()> {
    let ports = list_output_ports()?;

    println!("\n{}", "MIDI Output Ports:".bold());
    if ports.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for (idx, name) in ports.iter().enumerate() {
        println!("  [{}] {}", idx.to_string().yellow(), name.green());
    }
    println!();

    Ok(())
}

/// Index of the port to open.
///
/// The first port whose name contains `filter` (case-insensitive) wins. With no
/// filter, or no match, the first port is the system default.
pub fn select_port(names: &[String], filter: Option<&str>) -> Option<usize> {
    if names.is_empty() {
        return None;
    }

    if let Some(pattern) = filter.filter(|p| !p.is_empty()) {
        let pattern = pattern.to_lowercase();
        match names
            .iter()
            .position(|name| name.to_lowercase().contains(&pattern))
        {
            Some(idx) => return Some(idx),
            None => info!(
                "No MIDI output matching '{}', using the default device",
                pattern
            ),
        }
    }

    Some(0)
}

/// Open the selected MIDI output port
pub fn open_output(filter: Option<&str>, debug_ports: bool) -> Result<MidirPort> {
    let midi_out = MidiOutput::new(CLIENT_NAME)?;
    let ports = midi_out.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|port| midi_out.port_name(port).unwrap_or_default())
        .collect();

    if debug_ports {
        for (idx, name) in names.iter().enumerate() {
            debug!("MIDI output [{}] {}", idx, name);
        }
    }

    let idx = select_port(&names, filter)
        .ok_or_else(|| Error::DeviceOpen("no MIDI output ports available".to_string()))?;
    let name = names[idx].clone();
    info!("MIDI output to {}", name);

    let connection = midi_out.connect(&ports[idx], "osc2midi-out")?;
    Ok(MidirPort::new(name, connection))
}
