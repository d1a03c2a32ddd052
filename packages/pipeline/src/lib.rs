#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! One prediction run: fetch every zone, project each, write all results
//! back in a single transaction.
//!
//! [`Pipeline::run_once`] never returns an error. Every failure is logged
//! and reported as a [`RunOutcome`] so the recurrence driver keeps its
//! cadence regardless of how a run ends.

use std::sync::Arc;

use async_trait::async_trait;
use switchy_database::Database;
use zone_forecast_database::DbError;
use zone_forecast_database::db::{StoreConfig, StoreSettings};
use zone_forecast_database::zones::{self, ZoneRecord, ZoneUpdate};
use zone_forecast_scheduler::driver::Job;

/// Opens a store connection for one run.
#[async_trait]
pub trait Connector: Send + Sync {
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection cannot be established.
    async fn connect(&self, config: StoreConfig) -> Result<Box<dyn Database>, DbError>;
}

/// Connects to `MySQL` with the validated settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self, config: StoreConfig) -> Result<Box<dyn Database>, DbError> {
        zone_forecast_database::db::connect(config).await
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every fetched zone was updated and committed.
    Updated {
        /// Number of zones written.
        zones: u64,
    },
    /// The store returned no zones. Nothing was written.
    NoZones,
    /// The run did not contact the store because configuration is
    /// incomplete.
    Skipped {
        /// Why the run was skipped.
        reason: String,
    },
    /// Fetching, coercion, or the write failed. Nothing was written.
    Failed {
        /// The underlying error.
        reason: String,
    },
}

/// The fetch → project → write pipeline.
pub struct Pipeline {
    settings: StoreSettings,
    connector: Arc<dyn Connector>,
}

impl Pipeline {
    #[must_use]
    pub fn new(settings: StoreSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    /// Executes one complete run.
    pub async fn run_once(&self) -> RunOutcome {
        log::info!("Starting prediction update...");

        let config = match self.settings.validate() {
            Ok(config) => config,
            Err(e) => {
                log::error!("Skipping prediction update: {e}");
                return RunOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        match self.update(config).await {
            Ok(0) => {
                log::warn!("No zones found to predict.");
                RunOutcome::NoZones
            }
            Ok(zones) => {
                log::info!("Successfully updated predictions for {zones} zones.");
                RunOutcome::Updated { zones }
            }
            Err(e) => {
                log::error!("Failed to update predictions: {e}");
                RunOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Fetches and projects every zone without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if configuration is incomplete, the store cannot
    /// be reached, or a zone row is malformed.
    pub async fn preview(&self, limit: Option<usize>) -> Result<Vec<ZoneUpdate>, DbError> {
        let config = self.settings.validate()?;
        let db = self.connector.connect(config).await?;
        let rows = zones::fetch_zones(db.as_ref()).await?;
        let mut updates = project_rows(&rows)?;
        if let Some(limit) = limit {
            updates.truncate(limit);
        }
        Ok(updates)
    }

    /// Returns the number of zones written. The connection is dropped when
    /// this returns, on every path.
    async fn update(&self, config: StoreConfig) -> Result<u64, DbError> {
        let db = self.connector.connect(config).await?;

        let rows = zones::fetch_zones(db.as_ref()).await?;
        if rows.is_empty() {
            return Ok(0);
        }
        log::info!("Fetched {} zones", rows.len());

        let updates = project_rows(&rows)?;
        zones::write_predictions(db.as_ref(), &updates).await
    }
}

/// Coerces and projects every row. The first malformed row aborts the
/// whole batch.
fn project_rows(rows: &[switchy_database::Row]) -> Result<Vec<ZoneUpdate>, DbError> {
    rows.iter()
        .map(|row| -> Result<ZoneUpdate, DbError> {
            let record = ZoneRecord::from_row(row)?;
            let projection = zone_forecast_projection::project(&record.inputs.sanitize());
            log::debug!(
                "zone {}: population={} radius={}",
                zones::display_zone_id(&record.zone_id),
                projection.predicted_population,
                projection.predicted_risk_radius,
            );
            Ok(ZoneUpdate {
                zone_id: record.zone_id,
                projection,
            })
        })
        .collect()
}

#[async_trait]
impl Job for Pipeline {
    fn name(&self) -> &str {
        "zone prediction"
    }

    async fn run(&self) {
        self.run_once().await;
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use moosicbox_json_utils::database::ToValue as _;
    use switchy_database_connection::init_sqlite_rusqlite;

    use super::*;

    const ZONES_TABLE: &str = "CREATE TABLE zones (
        zone_id INTEGER,
        zone_name TEXT,
        dog_population INTEGER,
        radius_meters REAL,
        food_score REAL,
        water_score REAL,
        vaccinated_dogs INTEGER,
        sterilized_dogs INTEGER,
        affected_by_rabies INTEGER,
        bite_cases INTEGER,
        predicted_population_next_month INTEGER,
        predicted_risk_radius REAL,
        updated_at TEXT
    )";

    /// Opens the same on-disk `SQLite` file for every run.
    struct SqliteConnector {
        path: PathBuf,
        connects: AtomicUsize,
    }

    impl SqliteConnector {
        fn new(path: &Path) -> Arc<Self> {
            Arc::new(Self {
                path: path.to_path_buf(),
                connects: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Connector for SqliteConnector {
        async fn connect(&self, _config: StoreConfig) -> Result<Box<dyn Database>, DbError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            init_sqlite_rusqlite(Some(&self.path)).map_err(|e| DbError::Connection {
                message: e.to_string(),
            })
        }
    }

    struct UnreachableConnector;

    #[async_trait]
    impl Connector for UnreachableConnector {
        async fn connect(&self, config: StoreConfig) -> Result<Box<dyn Database>, DbError> {
            Err(DbError::Connection {
                message: format!("cannot reach {}", config.host),
            })
        }
    }

    fn settings() -> StoreSettings {
        StoreSettings {
            host: Some("localhost".to_string()),
            user: Some("engine".to_string()),
            password: Some("secret".to_string()),
            name: Some("zones".to_string()),
        }
    }

    struct Store {
        path: PathBuf,
        db: Box<dyn Database>,
    }

    impl Store {
        async fn new() -> Self {
            let path = std::env::temp_dir().join(format!(
                "zone_forecast_pipeline_{}.sqlite",
                uuid::Uuid::new_v4()
            ));
            let db = init_sqlite_rusqlite(Some(&path)).unwrap();
            db.exec_raw(ZONES_TABLE).await.unwrap();
            Self { path, db }
        }

        async fn exec(&self, sql: &str) {
            self.db.exec_raw(sql).await.unwrap();
        }

        async fn predictions(&self) -> Vec<(i64, Option<i64>, Option<f64>)> {
            self.db
                .query_raw_params(
                    "SELECT zone_id, predicted_population_next_month, predicted_risk_radius
                     FROM zones ORDER BY zone_id",
                    &[],
                )
                .await
                .unwrap()
                .iter()
                .map(|row| {
                    (
                        row.to_value("zone_id").unwrap_or(0),
                        row.to_value("predicted_population_next_month")
                            .unwrap_or(None),
                        row.to_value("predicted_risk_radius").unwrap_or(None),
                    )
                })
                .collect()
        }

        async fn updated_count(&self) -> usize {
            self.db
                .query_raw_params(
                    "SELECT zone_id FROM zones WHERE updated_at IS NOT NULL",
                    &[],
                )
                .await
                .unwrap()
                .len()
        }

        fn pipeline(&self) -> (Pipeline, Arc<SqliteConnector>) {
            let connector = SqliteConnector::new(&self.path);
            (Pipeline::new(settings(), connector.clone()), connector)
        }
    }

    impl Drop for Store {
        fn drop(&mut self) {
            std::fs::remove_file(&self.path).ok();
        }
    }

    async fn seed_examples(store: &Store) {
        store
            .exec(
                "INSERT INTO zones (
                    zone_id, dog_population, radius_meters, food_score, water_score,
                    vaccinated_dogs, sterilized_dogs, affected_by_rabies, bite_cases
                 ) VALUES
                    (1, 10, 50.0, 5.0, 5.0, 2, 1, 0, 0),
                    (2, 0, 400.0, 0.0, 0.0, 0, 0, 5, 5),
                    (3, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL)",
            )
            .await;
    }

    #[tokio::test]
    async fn updates_every_zone() {
        let store = Store::new().await;
        seed_examples(&store).await;
        let (pipeline, _) = store.pipeline();

        assert_eq!(pipeline.run_once().await, RunOutcome::Updated { zones: 3 });

        let predictions = store.predictions().await;
        assert_eq!(predictions[0].0, 1);
        assert_eq!(predictions[0].1, Some(12));
        assert!((predictions[0].2.unwrap() - 50.0).abs() < f64::EPSILON);

        assert_eq!(predictions[1].1, Some(2));
        assert!((predictions[1].2.unwrap() - 600.0).abs() < f64::EPSILON);

        assert_eq!(predictions[2].1, Some(0));
        assert!(predictions[2].2.unwrap().abs() < f64::EPSILON);

        assert_eq!(store.updated_count().await, 3);
    }

    #[tokio::test]
    async fn rerun_with_unchanged_input_is_stable() {
        let store = Store::new().await;
        seed_examples(&store).await;
        let (pipeline, connector) = store.pipeline();

        pipeline.run_once().await;
        let first = store.predictions().await;
        pipeline.run_once().await;
        assert_eq!(store.predictions().await, first);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_store_is_not_an_error() {
        let store = Store::new().await;
        let (pipeline, connector) = store.pipeline();

        assert_eq!(pipeline.run_once().await, RunOutcome::NoZones);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(store.updated_count().await, 0);
    }

    #[tokio::test]
    async fn write_failure_persists_nothing() {
        let store = Store::new().await;
        seed_examples(&store).await;
        store
            .exec(
                "CREATE TRIGGER reject_zone_three BEFORE UPDATE ON zones
                 WHEN NEW.zone_id = 3
                 BEGIN SELECT RAISE(ABORT, 'zone 3 is locked'); END",
            )
            .await;
        let (pipeline, _) = store.pipeline();

        let outcome = pipeline.run_once().await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }), "{outcome:?}");

        assert_eq!(store.updated_count().await, 0);
        for (_, population, radius) in store.predictions().await {
            assert_eq!(population, None);
            assert_eq!(radius, None);
        }
    }

    #[tokio::test]
    async fn malformed_row_aborts_before_any_write() {
        let store = Store::new().await;
        seed_examples(&store).await;
        store
            .exec("INSERT INTO zones (zone_id, dog_population) VALUES (NULL, 4)")
            .await;
        let (pipeline, _) = store.pipeline();

        let outcome = pipeline.run_once().await;
        match outcome {
            RunOutcome::Failed { reason } => assert!(reason.contains("zone_id")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(store.updated_count().await, 0);
    }

    #[tokio::test]
    async fn missing_config_skips_without_connecting() {
        let store = Store::new().await;
        seed_examples(&store).await;
        let connector = SqliteConnector::new(&store.path);
        let pipeline = Pipeline::new(
            StoreSettings {
                password: None,
                ..settings()
            },
            connector.clone(),
        );

        match pipeline.run_once().await {
            RunOutcome::Skipped { reason } => assert!(reason.contains("DB_PASSWORD")),
            other => panic!("expected skip, got {other:?}"),
        }
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert_eq!(store.updated_count().await, 0);
    }

    #[tokio::test]
    async fn connection_failure_is_contained() {
        let pipeline = Pipeline::new(settings(), Arc::new(UnreachableConnector));
        match pipeline.run_once().await {
            RunOutcome::Failed { reason } => assert!(reason.contains("cannot reach localhost")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn preview_projects_without_writing() {
        let store = Store::new().await;
        seed_examples(&store).await;
        let (pipeline, _) = store.pipeline();

        let preview = pipeline.preview(Some(2)).await.unwrap();
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].projection.predicted_population, 12);
        assert_eq!(store.updated_count().await, 0);
    }

    #[tokio::test]
    async fn job_run_delegates_to_run_once() {
        let store = Store::new().await;
        seed_examples(&store).await;
        let (pipeline, _) = store.pipeline();

        Job::run(&pipeline).await;
        assert_eq!(store.updated_count().await, 3);
    }
}
