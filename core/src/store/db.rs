use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::prelude::RadarResult;
use crate::store::records::{AdaptiveState, DetectionRow, EchoRow, TargetRow, TrackingRow};
use crate::tracking::TrackerMethod;

/// Handle over the shared SQLite store.
///
/// Every component receives this handle explicitly; there is no process-wide
/// connection. Table replacement runs inside one transaction so a reader on
/// another connection never observes a partially written table, and a failed
/// run commits nothing.
pub struct RadarStore {
    conn: Connection,
}

impl RadarStore {
    /// Open (or create) the store at `path` and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> RadarResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory store, used by tests and throwaway runs.
    pub fn open_in_memory() -> RadarResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> RadarResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS TargetData (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                time REAL NOT NULL,
                target_id INTEGER NOT NULL,
                true_range REAL NOT NULL,
                true_azimuth REAL NOT NULL,
                true_elevation REAL NOT NULL,
                true_velocity REAL NOT NULL,
                rcs REAL NOT NULL,
                noise_power REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS RadarDetections (
                time REAL NOT NULL,
                target_id INTEGER NOT NULL,
                range REAL NOT NULL,
                azimuth REAL NOT NULL,
                velocity REAL NOT NULL,
                snr_db REAL NOT NULL,
                v_sum REAL NOT NULL,
                v_diff REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS Detections_CFAR (
                time REAL NOT NULL,
                target_id INTEGER NOT NULL,
                range REAL NOT NULL,
                azimuth REAL NOT NULL,
                velocity REAL NOT NULL,
                snr_db REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS RadarConfig (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                iteration INTEGER NOT NULL,
                pulse_width REAL NOT NULL,
                detection_threshold REAL NOT NULL,
                avg_snr REAL NOT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS TrackingResults_Monopulse (
                time REAL NOT NULL,
                target_id INTEGER NOT NULL,
                range REAL NOT NULL,
                true_azimuth REAL NOT NULL,
                est_azimuth REAL NOT NULL,
                tracking_error REAL NOT NULL,
                snr_db REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS TrackingResults_Sequential (
                time REAL NOT NULL,
                target_id INTEGER NOT NULL,
                range REAL NOT NULL,
                true_azimuth REAL NOT NULL,
                est_azimuth REAL NOT NULL,
                tracking_error REAL NOT NULL,
                snr_db REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS TrackingResults_Conical (
                time REAL NOT NULL,
                target_id INTEGER NOT NULL,
                range REAL NOT NULL,
                true_azimuth REAL NOT NULL,
                est_azimuth REAL NOT NULL,
                tracking_error REAL NOT NULL,
                snr_db REAL NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Append ground-truth rows; earlier runs accumulate.
    pub fn append_targets(&mut self, rows: &[TargetRow]) -> RadarResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO TargetData (time, target_id, true_range, true_azimuth, \
                 true_elevation, true_velocity, rcs, noise_power) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.time,
                    row.target_id,
                    row.true_range,
                    row.true_azimuth,
                    row.true_elevation,
                    row.true_velocity,
                    row.rcs,
                    row.noise_power,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// All ground-truth rows in insertion order.
    pub fn load_targets(&self) -> RadarResult<Vec<TargetRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT time, target_id, true_range, true_azimuth, true_elevation, \
             true_velocity, rcs, noise_power FROM TargetData ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TargetRow {
                    time: row.get(0)?,
                    target_id: row.get(1)?,
                    true_range: row.get(2)?,
                    true_azimuth: row.get(3)?,
                    true_elevation: row.get(4)?,
                    true_velocity: row.get(5)?,
                    rcs: row.get(6)?,
                    noise_power: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace the echo table wholesale.
    pub fn replace_echoes(&mut self, rows: &[EchoRow]) -> RadarResult<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM RadarDetections", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO RadarDetections (time, target_id, range, azimuth, velocity, \
                 snr_db, v_sum, v_diff) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.time,
                    row.target_id,
                    row.range,
                    row.azimuth,
                    row.velocity,
                    row.snr_db,
                    row.v_sum,
                    row.v_diff,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn load_echoes(&self) -> RadarResult<Vec<EchoRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT time, target_id, range, azimuth, velocity, snr_db, v_sum, v_diff \
             FROM RadarDetections ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EchoRow {
                    time: row.get(0)?,
                    target_id: row.get(1)?,
                    range: row.get(2)?,
                    azimuth: row.get(3)?,
                    velocity: row.get(4)?,
                    snr_db: row.get(5)?,
                    v_sum: row.get(6)?,
                    v_diff: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace the CFAR output table wholesale.
    pub fn replace_detections(&mut self, rows: &[DetectionRow]) -> RadarResult<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM Detections_CFAR", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO Detections_CFAR (time, target_id, range, azimuth, velocity, snr_db) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.time,
                    row.target_id,
                    row.range,
                    row.azimuth,
                    row.velocity,
                    row.snr_db,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn load_detections(&self) -> RadarResult<Vec<DetectionRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT time, target_id, range, azimuth, velocity, snr_db \
             FROM Detections_CFAR ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DetectionRow {
                    time: row.get(0)?,
                    target_id: row.get(1)?,
                    range: row.get(2)?,
                    azimuth: row.get(3)?,
                    velocity: row.get(4)?,
                    snr_db: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Append one cognitive-loop iteration; the log is never rewritten.
    pub fn append_adaptive_state(&mut self, state: &AdaptiveState) -> RadarResult<()> {
        self.conn.execute(
            "INSERT INTO RadarConfig (iteration, pulse_width, detection_threshold, avg_snr) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                state.iteration,
                state.pulse_width,
                state.detection_threshold,
                state.avg_snr,
            ],
        )?;
        Ok(())
    }

    /// The adaptive state with the highest iteration, read fresh on each call.
    pub fn latest_adaptive_state(&self) -> RadarResult<Option<AdaptiveState>> {
        let state = self
            .conn
            .query_row(
                "SELECT iteration, pulse_width, detection_threshold, avg_snr, timestamp \
                 FROM RadarConfig ORDER BY iteration DESC LIMIT 1",
                [],
                |row| {
                    Ok(AdaptiveState {
                        iteration: row.get(0)?,
                        pulse_width: row.get(1)?,
                        detection_threshold: row.get(2)?,
                        avg_snr: row.get(3)?,
                        timestamp: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    /// Highest persisted iteration, zero when the log is empty.
    pub fn max_adaptive_iteration(&self) -> RadarResult<i64> {
        let max = self.conn.query_row(
            "SELECT COALESCE(MAX(iteration), 0) FROM RadarConfig",
            [],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    /// Replace one tracker method's result table wholesale.
    pub fn replace_tracking(
        &mut self,
        method: TrackerMethod,
        rows: &[TrackingRow],
    ) -> RadarResult<usize> {
        let table = method.table();
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table} (time, target_id, range, true_azimuth, est_azimuth, \
                 tracking_error, snr_db) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ))?;
            for row in rows {
                stmt.execute(params![
                    row.time,
                    row.target_id,
                    row.range,
                    row.true_azimuth,
                    row.est_azimuth,
                    row.tracking_error,
                    row.snr_db,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn load_tracking(&self, method: TrackerMethod) -> RadarResult<Vec<TrackingRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT time, target_id, range, true_azimuth, est_azimuth, tracking_error, snr_db \
             FROM {} ORDER BY rowid",
            method.table()
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TrackingRow {
                    time: row.get(0)?,
                    target_id: row.get(1)?,
                    range: row.get(2)?,
                    true_azimuth: row.get(3)?,
                    est_azimuth: row.get(4)?,
                    tracking_error: row.get(5)?,
                    snr_db: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
