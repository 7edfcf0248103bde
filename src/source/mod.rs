//! Sample sources: where latency samples come from.
//!
//! Every source owns a bounded queue of [`Sample`]s. The pipeline takes the
//! receiving end once and drains it; the source side is the only side that
//! closes the queue, which happens when all of its producers have exited.
//!
//! - [`ProbeSource`]: built-in TCP connect prober, one task per target
//! - [`StreamSource`]: newline-delimited JSON samples from any async reader
//! - [`ChannelSource`]: samples pushed from in-process code

mod channel;
mod probe;
mod stream;

pub use channel::ChannelSource;
pub use probe::{ProbeSource, ProbeTarget};
pub use stream::StreamSource;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::data::Sample;
use crate::error::SourceError;

/// A producer of latency samples.
///
/// # Example
///
/// ```no_run
/// use rttwatch::config::ProbeConfig;
/// use rttwatch::source::{ProbeSource, SampleSource};
///
/// # tokio_test::block_on(async {
/// let targets = vec!["1.1.1.1:443".to_string()];
/// let mut source = ProbeSource::new(&targets, ProbeConfig::default()).unwrap();
/// let mut samples = source.take_stream().unwrap();
/// source.start().unwrap();
///
/// if let Some(sample) = samples.recv().await {
///     println!("{}: {:.1}ms", sample.target, sample.latency_ms);
/// }
/// source.stop().await;
/// # });
/// ```
#[async_trait]
pub trait SampleSource: Send {
    /// Hand out the receiving end of the sample queue. Succeeds once.
    fn take_stream(&mut self) -> Result<mpsc::Receiver<Sample>, SourceError>;

    /// Begin producing. Returns immediately; a stopped source cannot restart.
    fn start(&mut self) -> Result<(), SourceError>;

    /// Stop every producer. Returns once they have exited and the queue is closed.
    async fn stop(&mut self);

    /// Human readable origin of the samples, shown in the header.
    fn description(&self) -> &str;

    /// Samples discarded because the queue was full.
    fn dropped(&self) -> u64 {
        0
    }
}
