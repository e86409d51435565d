//! # Serial Communication Module
//!
//! Sends configuration messages to the tracker over its USB serial console.
//!
//! The tracker reads the message as ASCII hex and treats a second of
//! silence as the end of it, so the hex string goes out as-is, with no
//! line ending. Whatever the tracker prints back can be collected for a
//! short window after the send and logged.

pub mod port_trait;

use async_trait::async_trait;
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use self::port_trait::{AsyncPort, SerialIo};
use crate::error::{Result, TrackerConfigError};
use crate::transport::Transport;

/// Serial console baud rate of the tracker firmware
pub const TRACKER_BAUD_RATE: u32 = 115_200;

/// Default write timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Device paths tried when none is configured (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // Artemis USB CDC
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Production port type
pub type NativePort = AsyncPort<tokio_serial::SerialStream>;

/// Serial link to the tracker
pub struct SerialTransport<P = NativePort> {
    /// Port handle
    port: P,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
    /// Limit on a single write + flush
    timeout: Duration,
    /// How long to collect the tracker's reply after a send, if at all
    reply_window: Option<Duration>,
}

impl<P> std::fmt::Debug for SerialTransport<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("device_path", &self.device_path)
            .field("timeout", &self.timeout)
            .field("reply_window", &self.reply_window)
            .finish_non_exhaustive()
    }
}

impl SerialTransport<NativePort> {
    /// Open the tracker's serial console, trying the default device paths
    ///
    /// # Errors
    ///
    /// Returns error if none of the default paths can be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tracker_config::serial::SerialTransport;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = SerialTransport::open()?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, TRACKER_BAUD_RATE)
    }

    /// Open the first device path that works
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try, in order
    /// * `baud_rate` - Line speed (8N1, no flow control)
    ///
    /// # Returns
    ///
    /// * `Result<SerialTransport>` - Connected serial port or error
    ///
    /// # Errors
    ///
    /// Returns [`TrackerConfigError::SerialPortNotFound`] listing every path
    /// tried when none could be opened
    pub fn open_with_paths<S: AsRef<str>>(paths: &[S], baud_rate: u32) -> Result<Self> {
        for path in paths {
            let path = path.as_ref();
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(stream) => {
                    info!("Opened tracker serial console at {} ({} baud)", path, baud_rate);
                    return Ok(Self::with_port(AsyncPort::new(stream), path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                }
            }
        }

        let tried: Vec<&str> = paths.iter().map(AsRef::as_ref).collect();
        Err(TrackerConfigError::SerialPortNotFound(tried.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TrackerConfigError::Serial(format!("Failed to open {}: {}", path, e)))
    }
}

impl<P: SerialIo> SerialTransport<P> {
    /// Wrap an already-open port
    pub fn with_port(port: P, device_path: impl Into<String>) -> Self {
        Self {
            port,
            device_path: device_path.into(),
            timeout: DEFAULT_TIMEOUT,
            reply_window: None,
        }
    }

    /// Set the limit on a single write + flush
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Collect and log the tracker's reply for `window` after each send
    pub fn with_reply_window(mut self, window: Duration) -> Self {
        self.reply_window = Some(window);
        self
    }

    /// Device path of the opened port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Write raw bytes and flush
    ///
    /// # Errors
    ///
    /// Returns [`TrackerConfigError::Serial`] if the write or flush fails
    /// or does not finish within the timeout
    pub async fn send_bytes(&mut self, data: &[u8]) -> Result<()> {
        let port = &mut self.port;
        let write = async {
            port.write_all(data)
                .await
                .map_err(|e| TrackerConfigError::Serial(format!("Failed to write message: {}", e)))?;
            port.flush()
                .await
                .map_err(|e| TrackerConfigError::Serial(format!("Failed to flush serial port: {}", e)))
        };

        tokio::time::timeout(self.timeout, write).await.map_err(|_| {
            TrackerConfigError::Serial(format!(
                "Timed out after {} ms writing to {}",
                self.timeout.as_millis(),
                self.device_path
            ))
        })??;

        debug!("Wrote {} bytes to {}", data.len(), self.device_path);
        Ok(())
    }

    /// Read what the tracker sends until `window` elapses or the port closes
    ///
    /// Bytes that are not UTF-8 are replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerConfigError::Serial`] if a read fails
    pub async fn read_reply(&mut self, window: Duration) -> Result<String> {
        let deadline = tokio::time::Instant::now() + window;
        let mut reply = Vec::new();
        let mut buf = [0u8; 256];

        loop {
            match tokio::time::timeout_at(deadline, self.port.read(&mut buf)).await {
                Err(_) | Ok(Ok(0)) => break,
                Ok(Ok(n)) => reply.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => {
                    return Err(TrackerConfigError::Serial(format!(
                        "Failed to read from {}: {}",
                        self.device_path, e
                    )))
                }
            }
        }

        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}

#[async_trait]
impl<P: SerialIo> Transport for SerialTransport<P> {
    async fn send(&mut self, message: &str) -> Result<()> {
        self.send_bytes(message.as_bytes()).await?;

        if let Some(window) = self.reply_window {
            let reply = self.read_reply(window).await?;
            let lines: Vec<&str> = reply.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
            if lines.is_empty() {
                debug!("No reply from {} within {} ms", self.device_path, window.as_millis());
            }
            for line in lines {
                info!("{}: {}", self.device_path, line);
            }
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("serial port {}", self.device_path)
    }
}
