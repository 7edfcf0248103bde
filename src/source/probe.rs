//! Built-in probe engine measuring TCP connect round-trip time.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::SampleSource;
use crate::config::{AddressFamily, ProbeConfig};
use crate::data::Sample;
use crate::error::{ConfigError, SourceError};

/// A probe destination. `name` is what the user typed and what samples carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl ProbeTarget {
    /// Accepts `host`, `host:port`, `[v6]`, `[v6]:port` and bare IPv6 addresses.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, SourceError> {
        let name = input.trim();
        let invalid = |reason: &str| SourceError::InvalidTarget {
            target: input.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("empty target"));
        }

        let (host, port) = if let Some(rest) = name.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid("missing ']'"))?;
            match tail {
                "" => (host, None),
                _ => match tail.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(invalid("unexpected text after ']'")),
                },
            }
        } else {
            match name.matches(':').count() {
                0 => (name, None),
                1 => name
                    .split_once(':')
                    .map(|(host, port)| (host, Some(port)))
                    .ok_or_else(|| invalid("malformed host:port"))?,
                // Bare IPv6 literal
                _ => (name, None),
            }
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| invalid("port must be a number between 0 and 65535"))?,
            None => default_port,
        };

        Ok(Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
        })
    }
}

/// Probes every target on its own fixed-interval timer.
///
/// Results go into one bounded queue shared by all targets. When it is full
/// the new sample is dropped and counted; a probe never waits for the consumer.
pub struct ProbeSource {
    targets: Vec<ProbeTarget>,
    config: ProbeConfig,
    sender: Option<mpsc::Sender<Sample>>,
    receiver: Option<mpsc::Receiver<Sample>>,
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
    description: String,
}

impl fmt::Debug for ProbeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeSource")
            .field("targets", &self.targets)
            .field("config", &self.config)
            .field("running", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl ProbeSource {
    pub fn new(targets: &[String], config: ProbeConfig) -> Result<Self, SourceError> {
        config.validate()?;
        if targets.is_empty() {
            return Err(ConfigError::NoTargets.into());
        }

        let targets = targets
            .iter()
            .map(|t| ProbeTarget::parse(t, config.port))
            .collect::<Result<Vec<_>, _>>()?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let (stop_tx, _) = watch::channel(false);
        let description = format!(
            "tcp probe, {} target{} every {:?}",
            targets.len(),
            if targets.len() == 1 { "" } else { "s" },
            config.interval
        );

        Ok(Self {
            targets,
            config,
            sender: Some(sender),
            receiver: Some(receiver),
            stop_tx,
            tasks: Vec::new(),
            dropped: Arc::new(AtomicU64::new(0)),
            description,
        })
    }

    pub fn targets(&self) -> &[ProbeTarget] {
        &self.targets
    }
}

#[async_trait]
impl SampleSource for ProbeSource {
    fn take_stream(&mut self) -> Result<mpsc::Receiver<Sample>, SourceError> {
        self.receiver.take().ok_or(SourceError::StreamTaken)
    }

    fn start(&mut self) -> Result<(), SourceError> {
        let Some(sender) = &self.sender else {
            return Err(SourceError::Stopped);
        };
        if !self.tasks.is_empty() {
            return Ok(());
        }

        for target in &self.targets {
            let worker = ProbeWorker {
                target: target.clone(),
                interval: self.config.interval,
                timeout: self.config.timeout,
                family: self.config.family,
                sender: sender.clone(),
                stop: self.stop_tx.subscribe(),
                dropped: self.dropped.clone(),
            };
            self.tasks.push(tokio::spawn(worker.run()));
        }
        info!(targets = self.targets.len(), "probe engine started");
        Ok(())
    }

    async fn stop(&mut self) {
        let _ = self.stop_tx.send(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("probe task failed: {e}");
            }
        }
        // Last sender: the queue closes here, after every producer is gone.
        self.sender = None;

        let dropped = self.dropped();
        if dropped > 0 {
            info!(dropped, "samples dropped on a full queue");
        }
        info!("probe engine stopped");
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

struct ProbeWorker {
    target: ProbeTarget,
    interval: Duration,
    timeout: Duration,
    family: AddressFamily,
    sender: mpsc::Sender<Sample>,
    stop: watch::Receiver<bool>,
    dropped: Arc<AtomicU64>,
}

impl ProbeWorker {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut resolved: Option<SocketAddr> = None;

        loop {
            tokio::select! {
                _ = self.stop.changed() => break,
                _ = ticker.tick() => {}
            }

            let sample = tokio::select! {
                _ = self.stop.changed() => break,
                sample = probe(&self.target, self.timeout, self.family, &mut resolved) => sample,
            };

            match self.sender.try_send(sample) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }
        debug!(probe = %self.target.name, "probe task exiting");
    }
}

/// One connect attempt. The address is resolved once and then reused.
async fn probe(
    target: &ProbeTarget,
    timeout: Duration,
    family: AddressFamily,
    resolved: &mut Option<SocketAddr>,
) -> Sample {
    let sent_at = Utc::now();
    let started = Instant::now();

    let addr = match *resolved {
        Some(addr) => addr,
        None => match resolve(target, timeout, family).await {
            Some(addr) => {
                *resolved = Some(addr);
                addr
            }
            None => return Sample::timeout(&target.name, sent_at),
        },
    };

    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => {
            let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
            Sample::reply(&target.name, latency_ms, sent_at)
        }
        Ok(Err(e)) => {
            debug!(probe = %target.name, "connect failed: {e}");
            Sample::timeout(&target.name, sent_at)
        }
        Err(_) => Sample::timeout(&target.name, sent_at),
    }
}

/// First resolved address of `family`.
async fn resolve(
    target: &ProbeTarget,
    timeout: Duration,
    family: AddressFamily,
) -> Option<SocketAddr> {
    let lookup = lookup_host((target.host.as_str(), target.port));
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(mut addrs)) => {
            let addr = addrs.find(|addr| family.matches(addr));
            if addr.is_none() {
                debug!(probe = %target.name, ?family, "no address of the requested family");
            }
            addr
        }
        Ok(Err(e)) => {
            debug!(probe = %target.name, "resolve failed: {e}");
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn config(interval_ms: u64, queue: usize) -> ProbeConfig {
        ProbeConfig {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(500),
            queue_capacity: queue,
            port: 80,
            family: AddressFamily::Ipv4,
        }
    }

    async fn first_sample(target: &str, family: AddressFamily) -> Sample {
        let config = ProbeConfig {
            family,
            ..config(20, 16)
        };
        let mut source = ProbeSource::new(&[target.to_string()], config).unwrap();
        let mut samples = source.take_stream().unwrap();
        source.start().unwrap();
        let sample = samples.recv().await.unwrap();
        source.stop().await;
        sample
    }

    #[test]
    fn parses_target_forms() {
        let t = ProbeTarget::parse("example.com", 80).unwrap();
        assert_eq!((t.host.as_str(), t.port), ("example.com", 80));

        let t = ProbeTarget::parse("10.0.0.1:8080", 80).unwrap();
        assert_eq!((t.host.as_str(), t.port), ("10.0.0.1", 8080));
        assert_eq!(t.name, "10.0.0.1:8080");

        let t = ProbeTarget::parse("[::1]:443", 80).unwrap();
        assert_eq!((t.host.as_str(), t.port), ("::1", 443));

        let t = ProbeTarget::parse("[fe80::1]", 22).unwrap();
        assert_eq!((t.host.as_str(), t.port), ("fe80::1", 22));

        let t = ProbeTarget::parse("2001:db8::1", 53).unwrap();
        assert_eq!((t.host.as_str(), t.port), ("2001:db8::1", 53));
    }

    #[test]
    fn rejects_bad_targets() {
        for bad in ["", "   ", ":80", "host:http", "host:70000", "[::1", "[::1]x"] {
            assert!(
                matches!(
                    ProbeTarget::parse(bad, 80),
                    Err(SourceError::InvalidTarget { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn requires_targets_and_valid_config() {
        assert!(matches!(
            ProbeSource::new(&[], ProbeConfig::default()),
            Err(SourceError::Config(ConfigError::NoTargets))
        ));
        assert!(matches!(
            ProbeSource::new(&["a".to_string()], config(10, 0)),
            Err(SourceError::Config(ConfigError::QueueCapacity))
        ));
    }

    #[tokio::test]
    async fn stream_can_only_be_taken_once() {
        let mut source = ProbeSource::new(&["127.0.0.1".to_string()], config(50, 4)).unwrap();
        assert!(source.take_stream().is_ok());
        assert!(matches!(source.take_stream(), Err(SourceError::StreamTaken)));
    }

    #[tokio::test]
    async fn probes_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let mut source = ProbeSource::new(&[target.clone()], config(20, 16)).unwrap();
        let mut samples = source.take_stream().unwrap();
        source.start().unwrap();

        let sample = samples.recv().await.unwrap();
        assert_eq!(sample.target, target);
        assert!(sample.is_success());
        assert!(sample.latency_ms >= 0.0);
        assert!(sample.received_at.is_some());

        source.stop().await;
    }

    #[tokio::test]
    async fn ipv4_target_needs_ipv4_family() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();

        assert!(first_sample(&target, AddressFamily::Ipv4).await.is_success());

        let sample = first_sample(&target, AddressFamily::Ipv6).await;
        assert!(sample.latency_ms.is_nan());
        assert!(sample.received_at.is_none());
    }

    #[tokio::test]
    async fn ipv6_target_needs_ipv6_family() {
        // Hosts without IPv6 loopback cannot run this.
        let Ok(listener) = TcpListener::bind("[::1]:0").await else {
            return;
        };
        let target = listener.local_addr().unwrap().to_string();

        assert!(first_sample(&target, AddressFamily::Ipv6).await.is_success());
        assert!(first_sample(&target, AddressFamily::Ipv4).await.latency_ms.is_nan());
    }

    #[tokio::test]
    async fn refused_connection_is_nan() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut source = ProbeSource::new(&[target], config(20, 16)).unwrap();
        let mut samples = source.take_stream().unwrap();
        source.start().unwrap();

        let sample = samples.recv().await.unwrap();
        assert!(sample.latency_ms.is_nan());
        assert!(sample.received_at.is_none());

        source.stop().await;
    }

    #[tokio::test]
    async fn stop_closes_stream_and_cannot_restart() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let mut source = ProbeSource::new(&[target], config(10, 1000)).unwrap();
        let mut samples = source.take_stream().unwrap();
        source.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        source.stop().await;

        while samples.recv().await.is_some() {}
        assert!(matches!(source.start(), Err(SourceError::Stopped)));
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let mut source = ProbeSource::new(&[target], config(10, 1)).unwrap();
        let _samples = source.take_stream().unwrap();
        source.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        source.stop().await;

        assert!(source.dropped() > 0);
    }
}
