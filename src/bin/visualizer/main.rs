//! Terminal front end for running tracking tests.

use clap::Parser;
use log::{info, warn};
use serial2::SerialPort;
use std::error::Error;
use tactile_tracker::{
    args::{DeviceArgs, VisualizerArgs},
    config::ExperimentConfig,
    dummy_link::DummyLink,
    gui::{device_selector, run_tracker},
    session::SessionController,
    telemetry::{open_first_port, open_port, share_link, SharedLink},
};

// Example:
// cargo run --bin visualizer -- subject_a --trials 10 --interval 2000

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = VisualizerArgs::parse();

    let config = match &args.config {
        Some(path) => ExperimentConfig::from_path(path)?,
        None => ExperimentConfig::default(),
    };
    let config = args.apply(config);
    config.validate()?;

    let link = pick_link(&args.device, config.baud_rate)?;
    if link.is_none() {
        warn!("No vibrotactile device, telemetry is disabled");
    }

    let mut controller = SessionController::new(config, link);
    run_tracker(&mut controller)?;

    info!("Ran {} tests", controller.sequence_index() - 1);
    Ok(())
}

fn pick_link(device: &DeviceArgs, baud_rate: u32) -> Result<Option<SharedLink>, Box<dyn Error>> {
    if device.no_device {
        return Ok(None);
    }
    if device.dummy {
        return Ok(Some(share_link(DummyLink::new())));
    }

    let port = if let Some(path) = &device.path {
        open_port(path, baud_rate)
    } else if device.select_device {
        let available_ports = SerialPort::available_ports()?;
        match device_selector(available_ports)? {
            Some(path) => open_port(path, baud_rate),
            None => return Ok(None),
        }
    } else {
        open_first_port(baud_rate)
    };

    // Missing hardware never stops the experiment
    Ok(port.ok().map(share_link))
}
