//! Stream-based sample source.
//!
//! Reads newline-delimited JSON samples from an async byte stream such as
//! stdin or a TCP connection:
//!
//! ```text
//! {"target":"1.1.1.1","latency_ms":12.3,"sent_at":"2024-01-01T12:00:00Z"}
//! {"target":"1.1.1.1","latency_ms":null,"sent_at":"2024-01-01T12:00:01Z"}
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::SampleSource;
use crate::data::{Sample, WireSample};
use crate::error::SourceError;

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

/// A sample source fed by newline-delimited JSON.
///
/// Malformed lines are logged and skipped. End of input ends the stream.
pub struct StreamSource {
    reader: Option<BoxedReader>,
    receiver: Option<mpsc::Receiver<Sample>>,
    sender: Option<mpsc::Sender<Sample>>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
    description: String,
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("description", &self.description)
            .field("running", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

impl StreamSource {
    /// Wrap `reader`; nothing is read before [`SampleSource::start`].
    pub fn new<R>(reader: R, description: &str, queue_capacity: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let (stop_tx, _) = watch::channel(false);
        Self {
            reader: Some(Box::new(reader)),
            receiver: Some(receiver),
            sender: Some(sender),
            stop_tx,
            task: None,
            dropped: Arc::new(AtomicU64::new(0)),
            description: format!("stream: {}", description),
        }
    }
}

#[async_trait]
impl SampleSource for StreamSource {
    fn take_stream(&mut self) -> Result<mpsc::Receiver<Sample>, SourceError> {
        self.receiver.take().ok_or(SourceError::StreamTaken)
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.task.is_some() {
            return Ok(());
        }
        let (Some(reader), Some(sender)) = (self.reader.take(), self.sender.take()) else {
            return Err(SourceError::Stopped);
        };

        let stop = self.stop_tx.subscribe();
        let dropped = self.dropped.clone();
        self.task = Some(tokio::spawn(read_lines(reader, sender, stop, dropped)));
        Ok(())
    }

    async fn stop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("stream reader failed: {e}");
            }
        }
        self.reader = None;
        self.sender = None;
        info!(source = %self.description, "stream source stopped");
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

async fn read_lines(
    reader: BoxedReader,
    sender: mpsc::Sender<Sample>,
    mut stop: watch::Receiver<bool>,
    dropped: Arc<AtomicU64>,
) {
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let read = tokio::select! {
            _ = stop.changed() => break,
            read = reader.read_line(&mut line) => read,
        };

        match read {
            Ok(0) => {
                debug!("end of sample stream");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<WireSample>(trimmed) {
                    Ok(wire) => match sender.try_send(Sample::from(wire)) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => break,
                    },
                    Err(e) => warn!("skipping malformed sample line: {e}"),
                }
            }
            Err(e) => {
                warn!("sample stream read error: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn line(target: &str, latency: &str, sent_at: &str) -> String {
        format!(r#"{{"target":"{target}","latency_ms":{latency},"sent_at":"{sent_at}"}}"#)
    }

    #[tokio::test]
    async fn reads_samples_until_eof() {
        let data = format!(
            "{}\n{}\n",
            line("a", "12.5", "2024-01-01T12:00:00Z"),
            line("b", "null", "2024-01-01T12:00:01Z")
        );
        let mut source = StreamSource::new(Cursor::new(data), "test", 16);
        let mut samples = source.take_stream().unwrap();
        source.start().unwrap();

        let first = samples.recv().await.unwrap();
        assert_eq!(first.target, "a");
        assert_eq!(first.latency_ms, 12.5);

        let second = samples.recv().await.unwrap();
        assert_eq!(second.target, "b");
        assert!(second.latency_ms.is_nan());

        assert!(samples.recv().await.is_none());
        source.stop().await;
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let data = format!(
            "not json\n\n{}\n{{\"target\":1}}\n",
            line("a", "3.0", "2024-01-01T12:00:00Z")
        );
        let mut source = StreamSource::new(Cursor::new(data), "test", 16);
        let mut samples = source.take_stream().unwrap();
        source.start().unwrap();

        let only = samples.recv().await.unwrap();
        assert_eq!(only.target, "a");
        assert!(samples.recv().await.is_none());
    }

    #[tokio::test]
    async fn description_and_single_take() {
        let mut source = StreamSource::new(Cursor::new(""), "stdin", 4);
        assert_eq!(source.description(), "stream: stdin");
        assert!(source.take_stream().is_ok());
        assert!(matches!(source.take_stream(), Err(SourceError::StreamTaken)));
    }

    #[tokio::test]
    async fn stop_interrupts_pending_read() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut source = StreamSource::new(reader, "pipe", 4);
        let mut samples = source.take_stream().unwrap();
        source.start().unwrap();

        source.stop().await;
        assert!(samples.recv().await.is_none());
        assert!(matches!(source.start(), Err(SourceError::Stopped)));
    }

    #[tokio::test]
    async fn overflow_is_counted() {
        let data: String = (0..10)
            .map(|i| line("a", "1.0", &format!("2024-01-01T12:00:{i:02}Z")) + "\n")
            .collect();
        let mut source = StreamSource::new(Cursor::new(data), "test", 2);
        let mut samples = source.take_stream().unwrap();
        source.start().unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        source.stop().await;

        let mut received = 0u64;
        while samples.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 2);
        assert_eq!(source.dropped(), 8);
    }
}
