//! The serial side of the experiment: encoding intensity frames for the
//! vibrotactile device and delivering them on a fixed cadence from a
//! background thread while a test is running.
//!
//! The device understands three things:
//!
//! - `{fff;bbb}`: exactly nine ASCII bytes setting the front and back motor
//!   intensities, each a zero-padded decimal in `000..=255`.
//! - `F`: switch to frequency mode.
//! - `I`: switch to intensity mode.

use crate::error::TrackerError;
use crate::shared_value::SharedValue;

use log::{debug, info, warn};
use serial2::SerialPort;
use std::{
    fmt, io,
    path::Path,
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Anything the tracker can push bytes into. Implemented for real serial
/// ports and for [`crate::dummy_link::DummyLink`].
pub trait DeviceLink: Send {
    /// Write all of `bytes` to the device.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl DeviceLink for SerialPort {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }
}

/// A device link that can be used from the tick thread and the telemetry
/// worker at the same time.
pub type SharedLink = Arc<Mutex<Box<dyn DeviceLink>>>;

/// Wrap a link so it can be handed to a [`TelemetryLink`].
pub fn share_link(link: impl DeviceLink + 'static) -> SharedLink {
    Arc::new(Mutex::new(Box::new(link)))
}

/// Open the serial port at `path`.
pub fn open_port(path: impl AsRef<Path>, baud_rate: u32) -> Result<SerialPort, TrackerError> {
    let path = path.as_ref();
    SerialPort::open(path, baud_rate).map_err(|e| {
        warn!("Failed to open {}: {}", path.display(), e);
        TrackerError::NoDevice
    })
}

/// Open the first serial port the host reports, if there is one.
pub fn open_first_port(baud_rate: u32) -> Result<SerialPort, TrackerError> {
    let ports = SerialPort::available_ports().map_err(|e| {
        warn!("Failed to enumerate serial ports: {}", e);
        TrackerError::NoDevice
    })?;
    let first = ports.first().ok_or(TrackerError::NoDevice)?;
    info!("Using serial port {}", first.display());
    open_port(first, baud_rate)
}

/// Which quantity the device modulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceMode {
    /// Motor strength follows the user position.
    #[default]
    Intensity,
    /// Vibration frequency follows the user position.
    Frequency,
}

impl DeviceMode {
    /// The single byte that switches the device into this mode.
    pub fn byte(self) -> u8 {
        match self {
            DeviceMode::Intensity => b'I',
            DeviceMode::Frequency => b'F',
        }
    }
}

/// A two-channel intensity frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryFrame {
    /// Front motor, follows the user position.
    pub front: u8,
    /// Back motor, follows its complement.
    pub back: u8,
}

impl TelemetryFrame {
    /// Both motors off. Sent whenever the device has to be brought to rest.
    pub const REST: Self = Self { front: 0, back: 0 };

    /// Length of an encoded frame in bytes.
    pub const LEN: usize = 9;

    /// A frame with explicit channel values.
    pub fn new(front: u8, back: u8) -> Self {
        Self { front, back }
    }

    /// The front motor follows the user position, the back motor its
    /// complement. Halves round away from zero, so `0.5` gives `128` on both.
    pub fn from_user_value(user_value: f64) -> Self {
        Self {
            front: channel(user_value),
            back: channel(1.0 - user_value),
        }
    }

    /// The nine bytes that go over the wire.
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0; Self::LEN];
        let text = self.to_string();
        buf.copy_from_slice(text.as_bytes());
        buf
    }
}

fn channel(value: f64) -> u8 {
    ((255.0 * value).round() as i64).rem_euclid(256) as u8
}

impl fmt::Display for TelemetryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:03};{:03}}}", self.front, self.back)
    }
}

enum Signal {
    Stop,
}

struct Worker {
    handle: JoinHandle<()>,
    tx: mpsc::Sender<Signal>,
}

/// Owns the device link and the background worker that streams frames to
/// it. With no link every send is silently skipped.
pub struct TelemetryLink {
    link: Option<SharedLink>,
    user_value: SharedValue,
    interval: Duration,
    worker: Option<Worker>,
}

impl TelemetryLink {
    /// Frames go to `link` every `interval` while the worker runs.
    pub fn new(link: Option<SharedLink>, interval: Duration) -> Self {
        Self {
            link,
            user_value: SharedValue::default(),
            interval,
            worker: None,
        }
    }

    /// A link that drops everything.
    pub fn disconnected() -> Self {
        Self::new(None, Duration::from_millis(500))
    }

    /// Whether there is a device to send to.
    pub fn has_device(&self) -> bool {
        self.link.is_some()
    }

    /// Whether the delivery worker is alive.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// The cell the worker reads the user position from.
    pub fn user_value(&self) -> &SharedValue {
        &self.user_value
    }

    /// Publish the user position for the next frame.
    pub fn set_user_value(&self, value: f64) {
        self.user_value.store(value);
    }

    /// Spawn the delivery worker. Does nothing if one is already running or
    /// if there is no device to talk to. Returns whether a worker was started.
    pub fn start(&mut self) -> bool {
        if self.worker.is_some() {
            debug!("Telemetry worker already running");
            return false;
        }
        let Some(link) = self.link.clone() else {
            return false;
        };

        let (tx, rx) = mpsc::channel::<Signal>();
        let user_value = self.user_value.clone();
        let interval = self.interval;

        let handle = thread::spawn(move || {
            loop {
                let frame = TelemetryFrame::from_user_value(user_value.load());
                send_to(&link, &frame.encode());
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            // However the loop ended, leave the motors off.
            send_to(&link, &TelemetryFrame::REST.encode());
            info!("Telemetry worker : terminated.");
        });

        info!("Telemetry worker : started.");
        self.worker = Some(Worker { handle, tx });
        true
    }

    /// Signal the worker to stop and wait for it. When this returns `Ok`
    /// the rest frame has been sent. Does nothing if no worker is running.
    pub fn stop(&mut self) -> Result<(), TrackerError> {
        if let Some(Worker { handle, tx }) = self.worker.take() {
            // A send error means the worker already hung up, join anyway.
            let _ = tx.send(Signal::Stop);
            handle.join().map_err(|_| TrackerError::JoinError)?;
        }
        Ok(())
    }

    /// Send a mode switch byte right away.
    pub fn send_mode(&self, mode: DeviceMode) {
        self.send_now(&[mode.byte()]);
    }

    /// Send the rest frame right away.
    pub fn send_reset(&self) {
        self.send_now(&TelemetryFrame::REST.encode());
    }

    fn send_now(&self, bytes: &[u8]) {
        if let Some(link) = &self.link {
            send_to(link, bytes);
        }
    }
}

impl Drop for TelemetryLink {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Telemetry worker : error during terminating : {}.", e);
        }
    }
}

fn send_to(link: &SharedLink, bytes: &[u8]) {
    let mut device = link.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = device.send(bytes) {
        warn!("Failed to send {:?} to device: {}", String::from_utf8_lossy(bytes), e);
    }
}
