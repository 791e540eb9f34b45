//! JSON output for worker snapshots.

use std::io::{self, Write};

use serde::Serialize;

use crate::models::{PoolSnapshot, WorkerRecord};

#[derive(Serialize)]
struct PoolDocument<'a> {
    pool: &'a str,
    workers: &'a [WorkerRecord],
}

/// Write one compact JSON object per pool, newline-terminated.
pub fn write_json<W: Write>(out: &mut W, pool: &str, snapshot: &PoolSnapshot) -> io::Result<()> {
    let doc = PoolDocument {
        pool,
        workers: &snapshot.workers,
    };
    serde_json::to_writer(&mut *out, &doc)?;
    writeln!(out)
}
