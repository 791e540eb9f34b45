//! Colored table output for worker snapshots.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table,
    presets::{ASCII_FULL, UTF8_FULL},
};

use super::{TableOptions, format_age, format_bytes};
use crate::models::PoolSnapshot;
use crate::theme::{Semantic, Themed, ThemedCell};

/// Build the worker table for one pool.
pub fn build_table(snapshot: &PoolSnapshot, options: TableOptions, now: DateTime<Utc>) -> Table {
    let mut table = Table::new();

    if options.ascii {
        table.load_preset(ASCII_FULL);
    } else {
        table.load_preset(UTF8_FULL);
    }
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["PID", "Status", "Execs", "Memory", "Created"]);

    for worker in &snapshot.workers {
        table.add_row(vec![
            Cell::new(worker.pid).themed(Semantic::Pid),
            Cell::new(worker.status).themed(Semantic::for_status(worker.status)),
            Cell::new(worker.num_jobs).set_alignment(CellAlignment::Right),
            Cell::new(format_bytes(worker.memory_usage))
                .themed(Semantic::Memory)
                .set_alignment(CellAlignment::Right),
            Cell::new(format_age(worker.created, now)),
        ]);
    }

    table
}

/// Write a pool heading followed by its worker table.
pub fn write_table<W: Write>(
    out: &mut W,
    pool: &str,
    snapshot: &PoolSnapshot,
    options: TableOptions,
    now: DateTime<Utc>,
) -> io::Result<()> {
    writeln!(out, "Workers of [{}]:", pool.pool_name())?;
    if snapshot.is_empty() {
        writeln!(out, "{}", "No active workers.".muted())?;
        return Ok(());
    }
    writeln!(out, "{}", build_table(snapshot, options, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures::{now, snapshot};

    fn render(snapshot: &PoolSnapshot, options: TableOptions) -> String {
        let mut out = Vec::new();
        write_table(&mut out, "http", snapshot, options, now()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_table_empty() {
        let text = render(&PoolSnapshot::default(), TableOptions::default());
        assert!(text.contains("http"));
        assert!(text.contains("No active workers."));
    }

    #[test]
    fn test_write_table_with_workers() {
        let text = render(&snapshot(), TableOptions::default());
        assert!(text.contains("Workers of ["));
        for expected in ["PID", "Status", "4242", "ready", "working", "25 MB", "1m ago"] {
            assert!(text.contains(expected), "missing {expected}: {text}");
        }
    }

    #[test]
    fn test_ascii_borders() {
        let text = render(&snapshot(), TableOptions { ascii: true });
        assert!(!text.contains('│'));
        assert!(text.contains('|'));
    }

    #[test]
    fn test_one_row_per_worker() {
        let table = build_table(&snapshot(), TableOptions::default(), now());
        assert_eq!(table.row_iter().count(), 2);
    }
}
