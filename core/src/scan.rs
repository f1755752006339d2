//! Grouping of time-stamped rows into scans.
//!
//! A scan is the set of all rows sharing one discrete time sample. The
//! partition is a sorted, finite sequence, so downstream recurrences (the
//! angle Kalman filters) always see scans in chronological order.

use std::cmp::Ordering;

/// One scan: every row sharing a discrete time sample.
#[derive(Debug, Clone)]
pub struct Scan<T> {
    pub time: f64,
    pub rows: Vec<T>,
}

/// Sort rows by their time stamp and split them into per-time groups.
///
/// The sort is stable, so rows within a scan keep their input order.
pub fn partition<T, F>(mut rows: Vec<T>, time_of: F) -> Vec<Scan<T>>
where
    F: Fn(&T) -> f64,
{
    rows.sort_by(|a, b| {
        time_of(a)
            .partial_cmp(&time_of(b))
            .unwrap_or(Ordering::Equal)
    });

    let mut scans: Vec<Scan<T>> = Vec::new();
    for row in rows {
        let time = time_of(&row);
        match scans.last_mut() {
            Some(scan) if scan.time == time => scan.rows.push(row),
            _ => scans.push(Scan {
                time,
                rows: vec![row],
            }),
        }
    }
    scans
}
