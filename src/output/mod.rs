//! Output formatting for worker snapshots.

pub mod json;
pub mod plain;
pub mod table;

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    terminal::{Clear, ClearType},
};

use crate::models::PoolSnapshot;

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored table output (default).
    #[default]
    Table,
    /// JSON output, one object per pool.
    Json,
    /// Plain text output (no colors).
    Plain,
}

/// Table display options.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    /// Use ASCII borders instead of Unicode.
    pub ascii: bool,
}

/// Receives pool snapshots in display order.
///
/// A one-shot render only calls [`render_pool`](WorkerSink::render_pool). The
/// live view wraps each refresh in `begin_frame`/`end_frame`, after a single
/// `clear` and before a final `finish`.
pub trait WorkerSink {
    /// Wipe the display before the first frame.
    fn clear(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn begin_frame(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Render one pool's complete snapshot.
    fn render_pool(&mut self, pool: &str, snapshot: &PoolSnapshot) -> io::Result<()>;

    /// Flush the frame.
    fn end_frame(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Restore the display after the last frame.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes snapshots in the chosen format, optionally as a redrawn live view.
pub struct WorkerRenderer<W: Write> {
    out: W,
    format: OutputFormat,
    options: TableOptions,
    live: bool,
}

impl<W: Write> WorkerRenderer<W> {
    pub fn new(out: W, format: OutputFormat, options: TableOptions) -> Self {
        Self {
            out,
            format,
            options,
            live: false,
        }
    }

    /// Redraw in place from the top-left corner on every frame.
    ///
    /// Pass `false` when the output is not a terminal; frames are then
    /// appended one after another without cursor control.
    pub fn live(mut self, redraw_in_place: bool) -> Self {
        self.live = redraw_in_place;
        self
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn render_at(
        &mut self,
        pool: &str,
        snapshot: &PoolSnapshot,
        now: DateTime<Utc>,
    ) -> io::Result<()> {
        match self.format {
            OutputFormat::Table => {
                table::write_table(&mut self.out, pool, snapshot, self.options, now)
            }
            OutputFormat::Plain => plain::write_plain(&mut self.out, pool, snapshot, now),
            OutputFormat::Json => json::write_json(&mut self.out, pool, snapshot),
        }
    }
}

impl<W: Write> WorkerSink for WorkerRenderer<W> {
    fn clear(&mut self) -> io::Result<()> {
        if self.live {
            queue!(self.out, Hide, Clear(ClearType::All), MoveTo(0, 0))?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn begin_frame(&mut self) -> io::Result<()> {
        if self.live {
            queue!(self.out, MoveTo(0, 0))?;
        }
        Ok(())
    }

    fn render_pool(&mut self, pool: &str, snapshot: &PoolSnapshot) -> io::Result<()> {
        self.render_at(pool, snapshot, Utc::now())?;
        if !self.live {
            self.out.flush()?;
        }
        Ok(())
    }

    fn end_frame(&mut self) -> io::Result<()> {
        if self.live {
            // Drop leftovers from a taller previous frame.
            queue!(self.out, Clear(ClearType::FromCursorDown))?;
        }
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.live {
            queue!(self.out, Show)?;
        }
        self.out.flush()
    }
}

/// Human-readable byte count using decimal units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if value < 10.0 {
        format!("{value:.1} {}", UNITS[unit])
    } else {
        format!("{value:.0} {}", UNITS[unit])
    }
}

/// Coarse elapsed time since `created`, e.g. `"42s ago"` or `"3h ago"`.
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created).num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use fixtures::{now, snapshot};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1_500), "1.5 KB");
        assert_eq!(format_bytes(25_165_824), "25 MB");
        assert_eq!(format_bytes(3_000_000_000), "3.0 GB");
    }

    #[test]
    fn test_format_age() {
        let now = now();
        assert_eq!(format_age(now - chrono::Duration::seconds(5), now), "5s ago");
        assert_eq!(format_age(now - chrono::Duration::seconds(90), now), "1m ago");
        assert_eq!(format_age(now - chrono::Duration::hours(5), now), "5h ago");
        assert_eq!(format_age(now - chrono::Duration::days(3), now), "3d ago");
        assert_eq!(format_age(now + chrono::Duration::seconds(5), now), "just now");
    }

    #[test]
    fn test_one_shot_renderer_has_no_escape_sequences() {
        let mut renderer =
            WorkerRenderer::new(Vec::new(), OutputFormat::Plain, TableOptions::default());
        renderer.render_pool("http", &snapshot()).unwrap();
        renderer.finish().unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.contains("4242"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_live_renderer_homes_cursor_each_frame() {
        let mut renderer =
            WorkerRenderer::new(Vec::new(), OutputFormat::Plain, TableOptions::default()).live(true);
        renderer.clear().unwrap();
        for _ in 0..2 {
            renderer.begin_frame().unwrap();
            renderer.render_pool("http", &snapshot()).unwrap();
            renderer.end_frame().unwrap();
        }
        renderer.finish().unwrap();

        let text = String::from_utf8(renderer.into_inner()).unwrap();
        // Clear screen once, cursor home on clear and on each frame.
        assert_eq!(text.matches("\x1b[2J").count(), 1);
        assert_eq!(text.matches("\x1b[1;1H").count(), 3);
        assert_eq!(text.matches("4242").count(), 2);
        assert!(text.ends_with("\x1b[?25h"));
    }

    #[test]
    fn test_live_renderer_off_terminal_appends_plain_frames() {
        let mut renderer =
            WorkerRenderer::new(Vec::new(), OutputFormat::Plain, TableOptions::default())
                .live(false);
        renderer.clear().unwrap();
        for _ in 0..2 {
            renderer.begin_frame().unwrap();
            renderer.render_pool("http", &snapshot()).unwrap();
            renderer.end_frame().unwrap();
        }
        renderer.finish().unwrap();

        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(!text.contains('\x1b'));
        assert_eq!(text.matches("4242").count(), 2);
    }
}
