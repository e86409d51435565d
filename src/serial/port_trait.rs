//! I/O abstraction over a serial port, so the transport can be exercised
//! without hardware.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Byte stream the serial transport writes messages into and reads the
/// tracker's replies from
#[async_trait]
pub trait SerialIo: Send {
    /// Write the whole buffer
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Push buffered bytes out to the device
    async fn flush(&mut self) -> io::Result<()>;

    /// Read whatever is available into `buf`; `Ok(0)` means the stream ended
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Any async byte stream: a `tokio_serial::SerialStream` in production,
/// an in-memory duplex in tests
pub struct AsyncPort<S> {
    stream: S,
}

impl<S> AsyncPort<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[async_trait]
impl<S> SerialIo for AsyncPort<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf).await
    }
}
