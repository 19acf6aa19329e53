//! A stand-in for the vibrotactile device that keeps every byte it is sent.

use crate::device_message_decoder::{decode_stream, DeviceCommand};
use crate::telemetry::DeviceLink;

use log::debug;
use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
};

/// A loopback [`DeviceLink`]. Clones share the same buffer, so one clone can
/// be handed to a [`crate::telemetry::TelemetryLink`] while another is kept
/// around to look at what was sent.
#[derive(Debug, Clone, Default)]
pub struct DummyLink {
    sent: Arc<Mutex<Vec<u8>>>,
}

impl DummyLink {
    /// A link with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every byte received so far, in order.
    pub fn sent(&self) -> Vec<u8> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Everything received so far, decoded the way the device would.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        let bytes = self.sent();
        let text = String::from_utf8_lossy(&bytes);
        decode_stream(&text).0
    }

    /// Forget everything received so far.
    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl DeviceLink for DummyLink {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        debug!("Dummy device received {:?}", String::from_utf8_lossy(bytes));
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        Ok(())
    }
}
