//! Concurrent pool reset with live per-pool feedback.
//!
//! Every target pool gets its own worker thread and its own [`CompletionCell`].
//! The calling thread acts as coordinator: it polls the cells on a fixed
//! cadence, hands each finished outcome to the [`ProgressSurface`] exactly
//! once, and joins the workers when every pool has reported. A slow pool
//! only ever delays its own indicator.

use std::io::Write;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::PoolName;
use crate::remote::{Directory, PoolApi, require_ack};
use crate::theme::Themed;

/// How often the coordinator polls for finished pools.
pub const DEFAULT_REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Spinner frames; the last frame is shown once a unit finishes.
const SPINNER_FRAMES: &[&str] = &["∙∙∙", "●∙∙", "∙●∙", "∙∙●", "∙∙∙"];

/// Labels are padded to this many columns so short pool names line up.
const LABEL_WIDTH: usize = 27;

/// Result of resetting one pool, as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The worker has not reported yet.
    Pending,
    Success,
    Failure(String),
}

impl ResetOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, ResetOutcome::Pending)
    }
}

/// Write-once slot carrying one pool's terminal outcome.
#[derive(Debug, Default)]
pub struct CompletionCell {
    slot: OnceLock<ResetOutcome>,
}

impl CompletionCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the terminal outcome.
    ///
    /// Fails, handing the outcome back, if the cell was already completed or
    /// if `outcome` is `Pending`.
    pub fn complete(&self, outcome: ResetOutcome) -> std::result::Result<(), ResetOutcome> {
        if outcome.is_pending() {
            return Err(outcome);
        }
        self.slot.set(outcome)
    }

    /// Non-blocking read. `Pending` until [`complete`](Self::complete) succeeds.
    pub fn poll(&self) -> ResetOutcome {
        self.slot.get().cloned().unwrap_or(ResetOutcome::Pending)
    }
}

/// Where reset progress is drawn.
pub trait ProgressSurface {
    /// Per-pool indicator handle.
    type Unit;

    /// Create the indicator for `pool`. Called once per pool before any work starts.
    fn add_unit(&mut self, pool: &str) -> Self::Unit;

    /// Freeze `unit` on its terminal outcome. Called exactly once per unit.
    fn finish(&mut self, unit: &Self::Unit, pool: &str, outcome: &ResetOutcome);
}

/// Tuning for a reset run.
#[derive(Debug, Clone, Copy)]
pub struct ResetOptions {
    pub redraw_interval: Duration,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self {
            redraw_interval: DEFAULT_REDRAW_INTERVAL,
        }
    }
}

/// Outcome of every pool in a run, in target order.
#[derive(Debug, Clone, Default)]
pub struct ResetReport {
    pub outcomes: Vec<(PoolName, ResetOutcome)>,
}

impl ResetReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == ResetOutcome::Success)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ResetOutcome::Failure(_)))
            .count()
    }
}

struct DisplayUnit<U> {
    pool: PoolName,
    cell: CompletionCell,
    handle: U,
}

/// Resolve targets, then reset them all concurrently.
///
/// Only the directory lookup can fail; per-pool failures end up in the report.
pub fn reset_pools<S: ProgressSurface>(
    api: PoolApi<'_>,
    explicit: &[PoolName],
    surface: &mut S,
    options: ResetOptions,
) -> Result<ResetReport> {
    let pools = api.resolve_targets(explicit, Directory::Resetter)?;
    Ok(run_reset(api, &pools, surface, options))
}

/// Reset `pools` concurrently, one worker thread per pool.
pub fn run_reset<S: ProgressSurface>(
    api: PoolApi<'_>,
    pools: &[PoolName],
    surface: &mut S,
    options: ResetOptions,
) -> ResetReport {
    let units: Vec<DisplayUnit<S::Unit>> = pools
        .iter()
        .map(|pool| DisplayUnit {
            pool: pool.clone(),
            cell: CompletionCell::new(),
            handle: surface.add_unit(pool),
        })
        .collect();

    let mut rendered: Vec<Option<ResetOutcome>> = vec![None; units.len()];

    thread::scope(|scope| {
        let workers: Vec<_> = units
            .iter()
            .map(|unit| {
                let pool = unit.pool.as_str();
                let cell = &unit.cell;
                let spawned = thread::Builder::new()
                    .name(format!("reset-{pool}"))
                    .spawn_scoped(scope, move || {
                        let outcome = match api
                            .reset_pool(pool)
                            .and_then(|ack| require_ack(pool, ack))
                        {
                            Ok(()) => ResetOutcome::Success,
                            Err(e) => ResetOutcome::Failure(e.to_string()),
                        };
                        debug!(pool, ?outcome, "reset finished");
                        if let Err(dropped) = cell.complete(outcome) {
                            warn!(pool, ?dropped, "reset outcome already recorded");
                        }
                    });
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        let _ = cell.complete(ResetOutcome::Failure(format!(
                            "failed to start reset worker: {e}"
                        )));
                        None
                    }
                }
            })
            .collect();

        let mut remaining = units.len();
        while remaining > 0 {
            for (idx, unit) in units.iter().enumerate() {
                if rendered[idx].is_some() {
                    continue;
                }

                let mut outcome = unit.cell.poll();
                // A worker that is gone but never wrote (it panicked) still
                // owes the run an outcome.
                if outcome.is_pending()
                    && workers[idx].as_ref().is_none_or(|h| h.is_finished())
                {
                    let _ = unit.cell.complete(ResetOutcome::Failure(
                        "reset worker exited without reporting".to_string(),
                    ));
                    outcome = unit.cell.poll();
                }

                if !outcome.is_pending() {
                    surface.finish(&unit.handle, &unit.pool, &outcome);
                    rendered[idx] = Some(outcome);
                    remaining -= 1;
                }
            }
            if remaining > 0 {
                thread::sleep(options.redraw_interval);
            }
        }

        for handle in workers.into_iter().flatten() {
            if handle.join().is_err() {
                warn!("reset worker panicked");
            }
        }
    });

    ResetReport {
        outcomes: units
            .into_iter()
            .zip(rendered)
            .map(|(unit, outcome)| (unit.pool, outcome.unwrap_or(ResetOutcome::Pending)))
            .collect(),
    }
}

/// Animated spinners on stderr, one line per pool.
pub struct SpinnerSurface {
    multi: MultiProgress,
    tick: Duration,
}

impl SpinnerSurface {
    /// Spinners animate every `tick`, independent of the coordinator's polling.
    pub fn new(tick: Duration) -> Self {
        Self {
            multi: MultiProgress::new(),
            tick,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix} {spinner} {msg}")
            .expect("static spinner template")
            .tick_strings(SPINNER_FRAMES)
    }
}

impl ProgressSurface for SpinnerSurface {
    type Unit = ProgressBar;

    fn add_unit(&mut self, pool: &str) -> ProgressBar {
        let plain = format!("Resetting plugin: [{pool}]");
        let pad = LABEL_WIDTH.saturating_sub(plain.chars().count());

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::style());
        bar.set_prefix(format!(
            "Resetting plugin: [{}]{}",
            pool.pool_name(),
            " ".repeat(pad)
        ));
        bar.enable_steady_tick(self.tick);
        bar
    }

    fn finish(&mut self, unit: &ProgressBar, _pool: &str, outcome: &ResetOutcome) {
        match outcome {
            ResetOutcome::Success => unit.finish_with_message("done".success()),
            ResetOutcome::Failure(msg) => {
                unit.finish_with_message(format!("error: {msg}").error_style())
            }
            ResetOutcome::Pending => {}
        }
    }
}

/// One line per finished pool, for pipes and non-interactive terminals.
pub struct LineSurface<W: Write> {
    out: W,
    quiet: bool,
}

impl<W: Write> LineSurface<W> {
    /// With `quiet`, only failures are printed.
    pub fn new(out: W, quiet: bool) -> Self {
        Self { out, quiet }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSurface for LineSurface<W> {
    type Unit = ();

    fn add_unit(&mut self, _pool: &str) {}

    fn finish(&mut self, _unit: &(), pool: &str, outcome: &ResetOutcome) {
        let line = match outcome {
            ResetOutcome::Success if self.quiet => return,
            ResetOutcome::Success => format!("{}: {}", pool.pool_name(), "done".success()),
            ResetOutcome::Failure(msg) => format!(
                "{}: {}",
                pool.pool_name(),
                format!("error: {msg}").error_style()
            ),
            ResetOutcome::Pending => return,
        };
        // A closed stdout must not abort the remaining pools.
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            debug!(error = %e, "failed to write reset progress");
        }
    }
}
