//! Listens on a serial port and logs every device command that arrives.
//! Run it on the device end of a serial loopback to see exactly what the
//! visualizer sends.

use clap::Parser;
use log::{debug, info, warn};
use serial2::SerialPort;
use std::{io, str, time::Duration};
use tactile_tracker::{
    args::MonitorArgs,
    device_message_decoder::{decode_stream, DeviceCommand},
};

fn main() -> io::Result<()> {
    env_logger::init();
    let args = MonitorArgs::parse();

    let path = match args.path {
        Some(path) => path,
        None => SerialPort::available_ports()?
            .into_iter()
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no serial ports"))?,
    };

    // Try to open the requested port and set its read timeout to infinity
    // (well, about 584,942,417,355 years, which is close enough)
    let mut port = SerialPort::open(&path, args.baud_rate)?;
    port.set_read_timeout(Duration::MAX)?;
    info!("Listening on {}", path.display());

    let mut buffer = [0; 256];
    let mut pending = String::new();

    loop {
        let read_len = port.read(&mut buffer)?;

        match str::from_utf8(&buffer[..read_len]) {
            Ok(s) => pending.push_str(s),
            // Often happens at the beginning of transmission when
            // there is still garbage in the hardware buffer
            Err(e) => {
                warn!("Failed to decode utf-8: {:?}", e);
                continue;
            }
        }

        let (commands, skipped, rest) = decode_stream(&pending);
        if !skipped.is_empty() {
            warn!("Skipped unparseable bytes {:?}", skipped);
        }
        for command in commands {
            match command {
                DeviceCommand::Intensity(frame) => {
                    info!("front {:>3} back {:>3}", frame.front, frame.back)
                }
                DeviceCommand::Mode(mode) => info!("mode {:?}", mode),
            }
        }
        debug!("{} bytes waiting for the rest of a frame", rest.len());
        pending = rest.to_owned();
    }
}
