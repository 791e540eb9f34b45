//! Plain text output for worker snapshots.

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use super::format_age;
use crate::models::PoolSnapshot;

/// Write one tab-separated line per worker, prefixed with the pool name.
///
/// Memory is printed in raw bytes so the output stays machine-friendly.
pub fn write_plain<W: Write>(
    out: &mut W,
    pool: &str,
    snapshot: &PoolSnapshot,
    now: DateTime<Utc>,
) -> io::Result<()> {
    writeln!(out, "POOL\tPID\tSTATUS\tEXECS\tMEMORY\tCREATED")?;
    for worker in &snapshot.workers {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}",
            pool,
            worker.pid,
            worker.status,
            worker.num_jobs,
            worker.memory_usage,
            format_age(worker.created, now)
        )?;
    }
    Ok(())
}
