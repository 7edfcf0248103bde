//! Channel-based sample source.
//!
//! Samples are pushed by in-process code through an mpsc sender. Useful when
//! embedding the dashboard in another program, and in tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::SampleSource;
use crate::data::Sample;
use crate::error::SourceError;

/// A source whose producer lives outside of it.
///
/// The stream closes once every [`mpsc::Sender`] handed out by
/// [`ChannelSource::create`] has been dropped.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use rttwatch::data::Sample;
/// use rttwatch::source::{ChannelSource, SampleSource};
///
/// # tokio_test::block_on(async {
/// let (tx, mut source) = ChannelSource::create("embedded", 16);
/// let mut samples = source.take_stream().unwrap();
///
/// tx.send(Sample::reply("db-1", 4.2, Utc::now())).await.unwrap();
/// assert_eq!(samples.recv().await.unwrap().target, "db-1");
/// # });
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: Option<mpsc::Receiver<Sample>>,
    description: String,
}

impl ChannelSource {
    /// Create a sender and the source that drains it.
    pub fn create(description: &str, capacity: usize) -> (mpsc::Sender<Sample>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let source = Self {
            receiver: Some(rx),
            description: format!("channel: {}", description),
        };
        (tx, source)
    }
}

#[async_trait]
impl SampleSource for ChannelSource {
    fn take_stream(&mut self) -> Result<mpsc::Receiver<Sample>, SourceError> {
        self.receiver.take().ok_or(SourceError::StreamTaken)
    }

    fn start(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    /// The producer owns the senders, so there is nothing to wait for here.
    async fn stop(&mut self) {}

    fn description(&self) -> &str {
        &self.description
    }
}
