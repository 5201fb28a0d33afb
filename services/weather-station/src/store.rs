//! Durable observation storage on SQLite
//!
//! The database runs in WAL mode with full synchronous commits, so an insert
//! that returned `Ok` survives power loss and a torn write never reaches
//! committed rows. Writes and reads go through separate connections: WAL
//! readers see the last committed snapshot and never wait on the sampler.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info, info_span};

use crate::derived::dew_point;
use crate::observation::{NewObservation, Observation};
use crate::range::RangePolicy;
use crate::stats::{PeriodStats, SeriesPoint};

/// Text layout of the `timestamp` column; sorts chronologically
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS weather_data (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp           DATETIME DEFAULT CURRENT_TIMESTAMP,
    temp_c              REAL,
    humidity            REAL,
    pressure_hpa        REAL,
    wind_speed_kph      REAL,
    rain_mm             REAL,
    wind_dir_voltage    REAL,
    battery_volts       REAL,
    battery_current_ma  REAL
);
CREATE INDEX IF NOT EXISTS idx_timestamp ON weather_data (timestamp);
";

const OBSERVATION_COLUMNS: &str = "id, timestamp, temp_c, humidity, pressure_hpa, \
     wind_speed_kph, rain_mm, wind_dir_voltage, battery_volts, battery_current_ma";

/// Accepts finished observations from the sampler
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ObservationSink: Send + Sync {
    /// Durably append an observation, stamping it with the current time
    async fn persist(&self, observation: NewObservation) -> crate::Result<Observation>;
}

struct StoreInner {
    path: PathBuf,
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

/// Append-only observation table
///
/// Cheap to clone; clones share the same connections.
#[derive(Clone)]
pub struct ObservationStore {
    inner: Arc<StoreInner>,
}

impl ObservationStore {
    /// Open or create the database, creating its directory if needed
    pub fn open(path: &Path) -> crate::Result<Self> {
        let _span = info_span!("observation_store_open", path = %path.display()).entered();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer = Connection::open(path)?;
        writer.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        writer.busy_timeout(std::time::Duration::from_secs(5))?;
        writer.execute_batch(SCHEMA)?;

        let reader = Connection::open(path)?;
        reader.busy_timeout(std::time::Duration::from_secs(5))?;

        info!("Observation store ready at {}", path.display());
        Ok(Self {
            inner: Arc::new(StoreInner {
                path: path.to_path_buf(),
                writer: Mutex::new(writer),
                reader: Mutex::new(reader),
            }),
        })
    }

    /// Append an observation stamped with the current time
    pub fn insert(&self, draft: NewObservation) -> crate::Result<Observation> {
        self.insert_at(draft, Utc::now())
    }

    /// Append an observation with an explicit creation time
    ///
    /// Timestamps are stored with second resolution.
    pub fn insert_at(
        &self,
        draft: NewObservation,
        timestamp: DateTime<Utc>,
    ) -> crate::Result<Observation> {
        let timestamp = timestamp.trunc_subsecs(0);
        let conn = lock(&self.inner.writer);
        conn.execute(
            "INSERT INTO weather_data \
             (timestamp, temp_c, humidity, pressure_hpa, wind_speed_kph, rain_mm, \
              wind_dir_voltage, battery_volts, battery_current_ma) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                format_timestamp(timestamp),
                draft.temperature_c,
                draft.humidity_pct,
                draft.pressure_hpa,
                draft.wind_speed_kph,
                draft.rain_mm,
                draft.wind_dir_voltage,
                draft.battery_volts,
                draft.battery_current_ma,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Inserted observation {} at {}", id, timestamp);
        Ok(Observation::from_draft(id, timestamp, draft))
    }

    /// Run several reads against one consistent snapshot
    ///
    /// Rows committed by the sampler while `f` runs are not visible to it.
    pub fn read_snapshot<T>(
        &self,
        f: impl FnOnce(&StoreSnapshot<'_>) -> crate::Result<T>,
    ) -> crate::Result<T> {
        let mut conn = lock(&self.inner.reader);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        // A deferred transaction takes its WAL snapshot at the first read
        tx.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })?;
        let value = f(&StoreSnapshot { conn: &tx })?;
        tx.commit()?;
        Ok(value)
    }

    /// Chart buckets for `[start, end]`, grouped as the policy says
    pub fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        policy: &RangePolicy,
    ) -> crate::Result<Vec<SeriesPoint>> {
        self.with_reader(|snapshot| snapshot.query_range(start, end, policy))
    }

    /// Whole-window aggregates over `[start, end]`
    pub fn period_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> crate::Result<PeriodStats> {
        self.with_reader(|snapshot| snapshot.period_stats(start, end))
    }

    /// Average pressure over `[start, end)`, `None` when no row has one
    pub fn average_pressure(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> crate::Result<Option<f64>> {
        self.with_reader(|snapshot| snapshot.average_pressure(start, end))
    }

    /// Most recently inserted observation
    pub fn query_latest(&self) -> crate::Result<Option<Observation>> {
        self.with_reader(|snapshot| snapshot.query_latest())
    }

    /// Number of stored observations
    pub fn count(&self) -> crate::Result<u64> {
        self.with_reader(|snapshot| snapshot.count())
    }

    fn with_reader<T>(
        &self,
        f: impl FnOnce(&StoreSnapshot<'_>) -> crate::Result<T>,
    ) -> crate::Result<T> {
        let conn = lock(&self.inner.reader);
        f(&StoreSnapshot { conn: &conn })
    }
}

/// Read access to the store, borrowed from [`ObservationStore::read_snapshot`]
pub struct StoreSnapshot<'a> {
    conn: &'a Connection,
}

impl StoreSnapshot<'_> {
    pub fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        policy: &RangePolicy,
    ) -> crate::Result<Vec<SeriesPoint>> {
        let _span = info_span!("observation_query_range", range = %policy.selector).entered();

        let sql = match policy.bucket.group_expr() {
            None => "SELECT strftime(?3, timestamp), rain_mm, temp_c, humidity, pressure_hpa, \
                            wind_speed_kph, wind_speed_kph \
                     FROM weather_data \
                     WHERE timestamp >= ?1 AND timestamp <= ?2 \
                     ORDER BY timestamp ASC, id ASC"
                .to_string(),
            Some(group) => format!(
                "SELECT strftime(?3, MIN(timestamp)), SUM(rain_mm), AVG(temp_c), AVG(humidity), \
                        AVG(pressure_hpa), AVG(wind_speed_kph), MAX(wind_speed_kph) \
                 FROM weather_data \
                 WHERE timestamp >= ?1 AND timestamp <= ?2 \
                 GROUP BY {group} \
                 ORDER BY {group} ASC"
            ),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                format_timestamp(start),
                format_timestamp(end),
                policy.label_format
            ],
            |row| {
                Ok(SeriesPoint {
                    label: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    rain: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                    temp: row.get(2)?,
                    humidity: row.get(3)?,
                    pressure: row.get(4)?,
                    wind_avg: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                    wind_gust: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
                })
            },
        )?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row?);
        }
        Ok(points)
    }

    /// Empty windows give zeros. The dew point is set only when some row in
    /// the window has both a temperature and a humidity reading.
    pub fn period_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> crate::Result<PeriodStats> {
        let stats = self.conn.query_row(
            "SELECT SUM(rain_mm), AVG(temp_c), MAX(temp_c), MIN(temp_c), \
                    MAX(wind_speed_kph), AVG(wind_speed_kph), \
                    AVG(humidity), AVG(pressure_hpa), AVG(battery_volts), \
                    COUNT(temp_c), COUNT(humidity) \
             FROM weather_data \
             WHERE timestamp >= ?1 AND timestamp <= ?2",
            params![format_timestamp(start), format_timestamp(end)],
            |row| {
                let get = |i: usize| -> rusqlite::Result<f64> {
                    Ok(row.get::<_, Option<f64>>(i)?.unwrap_or(0.0))
                };
                let temp_rows: i64 = row.get(9)?;
                let humidity_rows: i64 = row.get(10)?;
                let avg_temp_c = get(1)?;
                let avg_humidity_pct = get(6)?;
                Ok(PeriodStats {
                    total_rain_mm: get(0)?,
                    avg_temp_c,
                    max_temp_c: get(2)?,
                    min_temp_c: get(3)?,
                    max_wind_kph: get(4)?,
                    avg_wind_kph: get(5)?,
                    avg_humidity_pct,
                    avg_pressure_hpa: get(7)?,
                    avg_battery_volts: get(8)?,
                    dew_point: if temp_rows > 0 && humidity_rows > 0 {
                        dew_point(avg_temp_c, avg_humidity_pct)
                    } else {
                        None
                    },
                })
            },
        )?;
        Ok(stats)
    }

    pub fn average_pressure(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> crate::Result<Option<f64>> {
        let avg = self.conn.query_row(
            "SELECT AVG(pressure_hpa) FROM weather_data \
             WHERE timestamp >= ?1 AND timestamp < ?2",
            params![format_timestamp(start), format_timestamp(end)],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(avg)
    }

    pub fn query_latest(&self) -> crate::Result<Option<Observation>> {
        let latest = self
            .conn
            .query_row(
                &format!(
                    "SELECT {OBSERVATION_COLUMNS} FROM weather_data ORDER BY id DESC LIMIT 1"
                ),
                [],
                row_to_observation,
            )
            .optional()?;
        Ok(latest)
    }

    pub fn count(&self) -> crate::Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM weather_data", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl std::fmt::Debug for ObservationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationStore")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ObservationSink for ObservationStore {
    async fn persist(&self, observation: NewObservation) -> crate::Result<Observation> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.insert(observation)).await?
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<Observation> {
    let raw_ts: String = row.get(1)?;
    Ok(Observation {
        id: row.get(0)?,
        timestamp: parse_timestamp(1, &raw_ts)?,
        temperature_c: row.get(2)?,
        humidity_pct: row.get(3)?,
        pressure_hpa: row.get(4)?,
        wind_speed_kph: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
        rain_mm: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
        wind_dir_voltage: row.get(7)?,
        battery_volts: row.get(8)?,
        battery_current_ma: row.get(9)?,
    })
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    // A panic while holding the guard leaves no half-applied statement behind.
    conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
