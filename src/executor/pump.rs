//! Stream pumps
//!
//! A pump drains one child output stream into an [`OutputBuffer`] on its
//! own tokio task until end-of-stream. Read errors end the pump like EOF
//! does; whatever was read before the error stays in the buffer.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use super::buffer::OutputBuffer;

/// Read chunk size
const CHUNK_SIZE: usize = 8 * 1024;

/// Handle to a running pump
#[derive(Debug)]
pub struct StreamPump {
    name: &'static str,
    handle: JoinHandle<u64>,
}

impl StreamPump {
    /// Start draining `reader` into `buffer`
    pub fn start<R>(name: &'static str, reader: R, buffer: OutputBuffer) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let handle = tokio::spawn(drain(name, reader, buffer));
        Self { name, handle }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait until the stream is exhausted; returns the number of bytes pumped
    pub async fn join(self) -> u64 {
        match self.handle.await {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(stream = self.name, "Pump task failed: {}", e);
                0
            }
        }
    }
}

async fn drain<R>(name: &'static str, mut reader: R, buffer: OutputBuffer) -> u64
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break, // EOF
            Ok(n) => {
                buffer.append(&chunk[..n]);
                total += n as u64;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(stream = name, "Error reading output: {}", e);
                break;
            }
        }
    }

    tracing::debug!(stream = name, bytes = total, "Stream closed");
    total
}
