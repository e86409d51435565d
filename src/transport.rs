//! # Transport
//!
//! Hands a finished message to whatever delivers it to the tracker: a
//! serial console or a file picked up later for a satellite upload.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::codec::EncodeOutcome;
use crate::error::{Result, TrackerConfigError};

/// Destination for the hex form of a configuration message
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Deliver the message
    async fn send(&mut self, message: &str) -> Result<()>;

    /// Where the message goes, for log lines
    fn describe(&self) -> String;
}

/// Writes the message to a file, replacing any previous contents
#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn send(&mut self, message: &str) -> Result<()> {
        tokio::fs::write(&self.path, message).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Send an encode outcome, unless it lost fields and partial sends are off
///
/// Warnings never block a send.
///
/// # Arguments
///
/// * `transport` - Where the message goes
/// * `outcome` - Result of [`crate::codec::encode_config`]
/// * `allow_partial` - Send even if some included fields were dropped
///
/// # Errors
///
/// Returns [`TrackerConfigError::Refused`] if the outcome has errors and
/// `allow_partial` is false; otherwise any error from the transport.
pub async fn transmit<T>(transport: &mut T, outcome: &EncodeOutcome, allow_partial: bool) -> Result<()>
where
    T: Transport + ?Sized,
{
    let errors = outcome.diagnostics.error_count();

    if errors > 0 {
        if !allow_partial {
            return Err(TrackerConfigError::Refused(format!(
                "{} field(s) failed to encode",
                errors
            )));
        }
        warn!("Sending partial message: {} field(s) left out", errors);
    }

    transport.send(&outcome.hex()).await?;
    info!(
        "Sent {}-byte configuration message to {}",
        outcome.message.len(),
        transport.describe()
    );

    Ok(())
}
