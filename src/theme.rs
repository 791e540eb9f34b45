//! Centralized color theming for consistent CLI output.
//!
//! This module provides a semantic color palette that works with both
//! `owo_colors` (for terminal text) and `comfy_table` (for tables).
//!
//! # NO_COLOR Support
//!
//! Colors can be disabled globally via:
//! - The `--no-color` CLI flag
//! - The `NO_COLOR` environment variable
//!
//! When colors are disabled, all theming functions return unstyled output.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;

use crate::models::WorkerStatus;

/// Global color enable flag (respects NO_COLOR and --no-color).
static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Disable all colors globally.
///
/// This affects owo_colors output, comfy_table cells and spinner templates.
/// Call this early in main() when --no-color is set.
pub fn disable_colors() {
    COLORS_ENABLED.store(false, Ordering::Relaxed);
    owo_colors::set_override(false);
}

/// Check if colors are currently enabled.
pub fn colors_enabled() -> bool {
    COLORS_ENABLED.load(Ordering::Relaxed)
}

/// Semantic color categories for consistent theming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantic {
    /// Process ids
    Pid,
    /// Workers that can take jobs
    StatusHealthy,
    /// Workers executing a job
    StatusBusy,
    /// Workers that failed or were marked invalid
    StatusFailed,
    /// Memory figures
    Memory,
    /// Muted/secondary text
    Muted,
}

impl Semantic {
    /// Semantic category for a worker status.
    pub fn for_status(status: WorkerStatus) -> Self {
        match status {
            WorkerStatus::Ready => Semantic::StatusHealthy,
            WorkerStatus::Working => Semantic::StatusBusy,
            WorkerStatus::Invalid | WorkerStatus::Errored => Semantic::StatusFailed,
            _ => Semantic::Muted,
        }
    }
}

/// Get the comfy_table color for a semantic category.
///
/// Returns `None` when colors are disabled, which leaves the cell unstyled.
pub fn table_color(semantic: Semantic) -> Option<comfy_table::Color> {
    if !colors_enabled() {
        return None;
    }
    Some(match semantic {
        Semantic::Pid => comfy_table::Color::Magenta,
        Semantic::StatusHealthy => comfy_table::Color::Green,
        Semantic::StatusBusy => comfy_table::Color::Cyan,
        Semantic::StatusFailed => comfy_table::Color::Red,
        Semantic::Memory => comfy_table::Color::Reset,
        Semantic::Muted => comfy_table::Color::Reset,
    })
}

/// Extension trait for comfy_table cells with NO_COLOR support.
pub trait ThemedCell {
    /// Apply semantic coloring to a cell, respecting NO_COLOR.
    fn themed(self, semantic: Semantic) -> Self;
}

impl ThemedCell for comfy_table::Cell {
    fn themed(self, semantic: Semantic) -> Self {
        match table_color(semantic) {
            Some(color) => self.fg(color),
            None => self,
        }
    }
}

fn paint<T: Display + ?Sized>(value: &T, style: impl FnOnce(&T) -> String) -> String {
    if colors_enabled() {
        style(value)
    } else {
        value.to_string()
    }
}

/// Extension trait for applying semantic colors with owo_colors.
///
/// All methods respect the global color enable state set by `disable_colors()`.
pub trait Themed: Display {
    /// Style for pool names (bright yellow).
    fn pool_name(&self) -> String {
        paint(self, |v| v.bright_yellow().to_string())
    }

    /// Style for error messages (bright red).
    fn error_style(&self) -> String {
        paint(self, |v| v.bright_red().to_string())
    }

    /// Style for warning messages (yellow).
    fn warning(&self) -> String {
        paint(self, |v| v.yellow().to_string())
    }

    /// Style for success messages (bright green).
    fn success(&self) -> String {
        paint(self, |v| v.bright_green().to_string())
    }

    /// Style for secondary text (dimmed).
    fn muted(&self) -> String {
        paint(self, |v| v.dimmed().to_string())
    }
}

impl Themed for String {}
impl Themed for &str {}
impl Themed for str {}
