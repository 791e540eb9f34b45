//! Worker snapshots, once or as a live view.
//!
//! The monitor is strictly sequential: pools are fetched one after another in
//! target order and each table is rendered only after its snapshot arrived.
//! The live view repeats that on every tick until the shutdown flag trips.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{PoolctlError, Result};
use crate::models::PoolName;
use crate::output::WorkerSink;
use crate::remote::PoolApi;

/// Refresh cadence of the live view.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Cooperative cancellation shared between the signal handler and a loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Source of refresh ticks.
pub trait Ticker {
    /// Block until the next tick. Returns `false` once `shutdown` is requested.
    fn wait(&mut self, shutdown: &ShutdownFlag) -> bool;
}

/// Fixed-interval ticker that notices shutdown within `poll` of the request.
///
/// Missed ticks are dropped rather than replayed in a burst.
pub struct IntervalTicker {
    interval: Duration,
    poll: Duration,
    next: Instant,
}

impl IntervalTicker {
    /// First tick fires one `interval` from now.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            poll: Duration::from_millis(50).min(interval),
            next: Instant::now() + interval,
        }
    }
}

impl Ticker for IntervalTicker {
    fn wait(&mut self, shutdown: &ShutdownFlag) -> bool {
        loop {
            if shutdown.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= self.next {
                self.next += self.interval;
                if self.next <= now {
                    self.next = now + self.interval;
                }
                return true;
            }
            thread::sleep(self.poll.min(self.next - now));
        }
    }
}

fn fetch_and_render<S: WorkerSink + ?Sized>(
    api: PoolApi<'_>,
    pool: &str,
    sink: &mut S,
) -> Result<()> {
    let snapshot = api
        .snapshot_pool(pool)
        .map_err(|source| PoolctlError::Snapshot {
            pool: pool.to_string(),
            source: Box::new(source),
        })?;
    trace!(pool, workers = snapshot.len(), "fetched snapshot");
    sink.render_pool(pool, &snapshot)?;
    Ok(())
}

/// Fetch and render every pool once, in order. Stops at the first failure.
pub fn show_workers<S: WorkerSink + ?Sized>(
    api: PoolApi<'_>,
    pools: &[PoolName],
    sink: &mut S,
) -> Result<()> {
    for pool in pools {
        fetch_and_render(api, pool, sink)?;
    }
    Ok(())
}

fn render_frame<S: WorkerSink + ?Sized>(
    api: PoolApi<'_>,
    pools: &[PoolName],
    sink: &mut S,
) -> Result<()> {
    sink.begin_frame()?;
    show_workers(api, pools, sink)?;
    sink.end_frame()?;
    Ok(())
}

/// Live view: clear once, then redraw every pool on each tick.
///
/// Returns the number of completed refreshes when `shutdown` trips, including
/// when the trip aborted a fetch midway. Any other failed fetch ends the loop
/// with that error. The sink is finished on both paths.
pub fn watch_workers<S, T>(
    api: PoolApi<'_>,
    pools: &[PoolName],
    sink: &mut S,
    ticker: &mut T,
    shutdown: &ShutdownFlag,
) -> Result<usize>
where
    S: WorkerSink + ?Sized,
    T: Ticker + ?Sized,
{
    sink.clear()?;

    let mut frames = 0usize;
    let outcome = loop {
        if !ticker.wait(shutdown) {
            debug!(frames, "live view stopped");
            break Ok(frames);
        }

        if let Err(e) = render_frame(api, pools, sink) {
            // An interrupted connection fails the pending fetch; that is a stop, not an error.
            if shutdown.is_requested() {
                debug!(frames, error = %e, "frame cut short by shutdown");
                break Ok(frames);
            }
            break Err(e);
        }
        frames += 1;
    };

    let finished = sink.finish();
    let frames = outcome?;
    finished?;
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PoolSnapshot, WorkerRecord, WorkerStatus};
    use crate::remote::{Directory, INFORMER_LIST, INFORMER_WORKERS};
    use crate::rpc::RpcClient;
    use crate::rpc::codec::Response;
    use crate::rpc::mock::{MockTransport, serve_concurrently};
    use chrono::Utc;
    use serde_json::{Value, json};
    use std::io;

    #[derive(Debug, PartialEq)]
    enum Event {
        Clear,
        Begin,
        Pool(String, usize),
        End,
        Finish,
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<Event>,
    }

    impl RecordingSink {
        fn pools(&self) -> Vec<&str> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Pool(name, _) => Some(name.as_str()),
                    _ => None,
                })
                .collect()
        }

        fn count(&self, wanted: &Event) -> usize {
            self.events.iter().filter(|e| *e == wanted).count()
        }
    }

    impl WorkerSink for RecordingSink {
        fn clear(&mut self) -> io::Result<()> {
            self.events.push(Event::Clear);
            Ok(())
        }

        fn begin_frame(&mut self) -> io::Result<()> {
            self.events.push(Event::Begin);
            Ok(())
        }

        fn render_pool(&mut self, pool: &str, snapshot: &PoolSnapshot) -> io::Result<()> {
            self.events.push(Event::Pool(pool.to_string(), snapshot.len()));
            Ok(())
        }

        fn end_frame(&mut self) -> io::Result<()> {
            self.events.push(Event::End);
            Ok(())
        }

        fn finish(&mut self) -> io::Result<()> {
            self.events.push(Event::Finish);
            Ok(())
        }
    }

    /// Fires `remaining` ticks, then trips the shutdown flag itself.
    struct CountingTicker {
        remaining: usize,
    }

    impl Ticker for CountingTicker {
        fn wait(&mut self, shutdown: &ShutdownFlag) -> bool {
            if self.remaining == 0 {
                shutdown.request();
            }
            if shutdown.is_requested() {
                return false;
            }
            self.remaining -= 1;
            true
        }
    }

    fn workers_payload() -> Value {
        let record = WorkerRecord {
            pid: 100,
            status: WorkerStatus::Ready,
            num_jobs: 1,
            memory_usage: 1_000_000,
            created: Utc::now(),
        };
        json!({ "workers": [record.clone(), record] })
    }

    fn fleet(failing: Option<&'static str>) -> MockTransport {
        MockTransport::new(move |method, params| match method {
            INFORMER_LIST => Ok(json!(["http", "jobs"])),
            INFORMER_WORKERS if params.as_str() == failing => Err(PoolctlError::remote(
                INFORMER_WORKERS,
                "no such plugin",
            )),
            INFORMER_WORKERS => Ok(workers_payload()),
            other => panic!("unexpected call {other}"),
        })
    }

    fn names(pools: &[&str]) -> Vec<PoolName> {
        pools.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_all_pools_come_from_informer_listing() {
        let transport = fleet(None);
        let api = PoolApi::new(&transport);
        let mut sink = RecordingSink::default();

        let pools = api.resolve_targets(&[], Directory::Informer).unwrap();
        show_workers(api, &pools, &mut sink).unwrap();

        assert_eq!(transport.calls_to(INFORMER_LIST), vec![json!(true)]);
        assert_eq!(sink.pools(), vec!["http", "jobs"]);
    }

    #[test]
    fn test_failed_listing_issues_no_fetches() {
        let transport = MockTransport::new(|method, _| {
            Err(PoolctlError::remote(method, "manager unavailable"))
        });
        let api = PoolApi::new(&transport);

        assert!(api.resolve_targets(&[], Directory::Informer).is_err());
        assert!(transport.calls_to(INFORMER_WORKERS).is_empty());
    }

    #[test]
    fn test_show_workers_renders_in_order() {
        let transport = fleet(None);
        let mut sink = RecordingSink::default();

        show_workers(PoolApi::new(&transport), &names(&["http", "jobs"]), &mut sink).unwrap();

        assert_eq!(
            sink.events,
            vec![
                Event::Pool("http".to_string(), 2),
                Event::Pool("jobs".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_show_workers_failure_never_renders_failed_pool() {
        let transport = fleet(Some("jobs"));
        let mut sink = RecordingSink::default();

        let err = show_workers(PoolApi::new(&transport), &names(&["http", "jobs"]), &mut sink)
            .unwrap_err();

        assert!(matches!(err, PoolctlError::Snapshot { ref pool, .. } if pool == "jobs"));
        assert_eq!(sink.pools(), vec!["http"]);
    }

    #[test]
    fn test_show_workers_stops_at_first_failure() {
        let transport = fleet(Some("http"));
        let mut sink = RecordingSink::default();

        assert!(
            show_workers(PoolApi::new(&transport), &names(&["http", "jobs"]), &mut sink).is_err()
        );
        assert!(sink.events.is_empty());
        assert_eq!(transport.calls_to(INFORMER_WORKERS), vec![json!("http")]);
    }

    #[test]
    fn test_watch_refreshes_once_per_tick() {
        let transport = fleet(None);
        let mut sink = RecordingSink::default();
        let mut ticker = CountingTicker { remaining: 3 };
        let shutdown = ShutdownFlag::new();

        let frames = watch_workers(
            PoolApi::new(&transport),
            &names(&["http", "jobs"]),
            &mut sink,
            &mut ticker,
            &shutdown,
        )
        .unwrap();

        assert_eq!(frames, 3);
        assert_eq!(sink.count(&Event::Clear), 1);
        assert_eq!(sink.count(&Event::Begin), 3);
        assert_eq!(sink.count(&Event::End), 3);
        assert_eq!(sink.pools(), vec!["http", "jobs", "http", "jobs", "http", "jobs"]);
        assert_eq!(sink.events.last(), Some(&Event::Finish));
        // Every refresh re-fetches.
        assert_eq!(transport.calls_to(INFORMER_WORKERS).len(), 6);
    }

    #[test]
    fn test_watch_aborts_on_fetch_error_and_restores_display() {
        let transport = fleet(Some("jobs"));
        let mut sink = RecordingSink::default();
        let mut ticker = CountingTicker { remaining: 5 };
        let shutdown = ShutdownFlag::new();

        let result = watch_workers(
            PoolApi::new(&transport),
            &names(&["http", "jobs"]),
            &mut sink,
            &mut ticker,
            &shutdown,
        );

        assert!(result.is_err());
        assert_eq!(sink.count(&Event::Begin), 1);
        assert_eq!(sink.count(&Event::End), 0);
        assert_eq!(sink.events.last(), Some(&Event::Finish));
    }

    #[test]
    fn test_watch_with_shutdown_already_requested() {
        let transport = fleet(None);
        let mut sink = RecordingSink::default();
        let shutdown = ShutdownFlag::new();
        shutdown.request();

        let frames = watch_workers(
            PoolApi::new(&transport),
            &names(&["http"]),
            &mut sink,
            &mut IntervalTicker::new(Duration::from_millis(10)),
            &shutdown,
        )
        .unwrap();

        assert_eq!(frames, 0);
        assert!(transport.calls().is_empty());
        assert_eq!(sink.events, vec![Event::Clear, Event::Finish]);
    }

    #[test]
    fn test_watch_stops_when_shutdown_interrupts_blocked_fetch() {
        // The manager lists pools but never answers a snapshot request.
        let addr = serve_concurrently(|req| match req.method.as_str() {
            INFORMER_LIST => Some(Response::ok(req.id, json!(["http"]))),
            _ => None,
        });
        let client = RpcClient::connect(&addr, None).unwrap();
        let interrupter = client.interrupter().unwrap();
        let mut sink = RecordingSink::default();
        let mut ticker = CountingTicker { remaining: 5 };
        let shutdown = ShutdownFlag::new();

        let started = Instant::now();
        let frames = thread::scope(|scope| {
            let remote = shutdown.clone();
            scope.spawn(move || {
                thread::sleep(Duration::from_millis(100));
                remote.request();
                interrupter.interrupt();
            });
            watch_workers(
                PoolApi::new(&client),
                &names(&["http"]),
                &mut sink,
                &mut ticker,
                &shutdown,
            )
        })
        .unwrap();

        assert_eq!(frames, 0);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(sink.events, vec![Event::Clear, Event::Begin, Event::Finish]);
    }

    #[test]
    fn test_interval_ticker_waits_for_interval() {
        let shutdown = ShutdownFlag::new();
        let mut ticker = IntervalTicker::new(Duration::from_millis(40));
        let started = Instant::now();
        assert!(ticker.wait(&shutdown));
        assert!(ticker.wait(&shutdown));
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_interval_ticker_notices_shutdown() {
        let shutdown = ShutdownFlag::new();
        let remote = shutdown.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.request();
        });

        let mut ticker = IntervalTicker::new(Duration::from_secs(60));
        let started = Instant::now();
        assert!(!ticker.wait(&shutdown));
        assert!(started.elapsed() < Duration::from_secs(5));
        stopper.join().unwrap();
    }
}
