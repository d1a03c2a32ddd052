//! Zone fetch, row coercion, and prediction write-back.
//!
//! Attribute columns are selected as stored. Row coercion accepts integers,
//! reals, booleans and numeric strings (as `DECIMAL` columns may arrive),
//! so the column types are left to the web backend.

use switchy_database::{Database, DatabaseValue, Row};
use zone_forecast_zone_models::{ZoneAttribute, ZoneInputs, ZoneProjection};

use crate::DbError;

/// Column holding the opaque zone key.
pub const ZONE_ID_COLUMN: &str = "zone_id";

const UPDATE_PREDICTION_SQL: &str = "UPDATE zones SET
        predicted_population_next_month = ?,
        predicted_risk_radius = ?,
        updated_at = CURRENT_TIMESTAMP
     WHERE zone_id = ?";

/// One zone as read from the store.
#[derive(Debug, Clone)]
pub struct ZoneRecord {
    /// Store key, bound back verbatim on update.
    pub zone_id: DatabaseValue,
    /// Projection inputs; `None` where the column was `NULL`.
    pub inputs: ZoneInputs,
}

/// A pending prediction write for one zone.
#[derive(Debug, Clone)]
pub struct ZoneUpdate {
    pub zone_id: DatabaseValue,
    pub projection: ZoneProjection,
}

impl ZoneRecord {
    /// Coerces a raw store row.
    ///
    /// Missing or `NULL` attribute columns become `None`. Empty strings are
    /// treated as `NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conversion`] if `zone_id` is missing or `NULL`, or
    /// if an attribute holds a value that is not numeric.
    pub fn from_row(row: &Row) -> Result<Self, DbError> {
        let zone_id = match row.get(ZONE_ID_COLUMN) {
            None | Some(DatabaseValue::Null) => {
                return Err(DbError::Conversion {
                    message: "zone row without zone_id".to_string(),
                });
            }
            Some(id) => id,
        };

        let mut inputs = ZoneInputs::default();
        for &attribute in ZoneAttribute::ALL {
            let value = match row.get(attribute.column()) {
                Some(value) => {
                    coerce_numeric(&value).map_err(|message| DbError::Conversion {
                        message: format!(
                            "zone {}: column {}: {message}",
                            display_zone_id(&zone_id),
                            attribute.column()
                        ),
                    })?
                }
                None => None,
            };
            inputs.set(attribute, value);
        }

        Ok(Self { zone_id, inputs })
    }
}

/// Renders a zone key for logs and console output.
#[must_use]
pub fn display_zone_id(zone_id: &DatabaseValue) -> String {
    match zone_id {
        DatabaseValue::Int32(n) => n.to_string(),
        DatabaseValue::Int64(n) => n.to_string(),
        DatabaseValue::String(s) => s.clone(),
        other => format!("{other:?}"),
    }
}

#[allow(clippy::cast_precision_loss)]
fn coerce_numeric(value: &DatabaseValue) -> Result<Option<f64>, String> {
    match value {
        DatabaseValue::Null => Ok(None),
        DatabaseValue::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        DatabaseValue::Int32(n) => Ok(Some(f64::from(*n))),
        DatabaseValue::Int64(n) => Ok(Some(*n as f64)),
        DatabaseValue::Real64(n) => Ok(Some(*n)),
        DatabaseValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map(Some)
                .map_err(|e| format!("not a number ({s:?}): {e}"))
        }
        other => Err(format!("unsupported value {other:?}")),
    }
}

fn fetch_zones_sql() -> String {
    let columns = std::iter::once(ZONE_ID_COLUMN)
        .chain(ZoneAttribute::ALL.iter().copied().map(ZoneAttribute::column))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {columns} FROM zones")
}

/// Fetches every zone row in one query.
///
/// Rows are returned raw; coercion happens in [`ZoneRecord::from_row`] so
/// the caller decides how a malformed row affects the run.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn fetch_zones(db: &dyn Database) -> Result<Vec<Row>, DbError> {
    Ok(db.query_raw_params(&fetch_zones_sql(), &[]).await?)
}

/// Writes every update inside a single transaction.
///
/// Either all rows are updated and committed, or the transaction is rolled
/// back and nothing changes. Returns the number of updates applied.
///
/// # Errors
///
/// Returns [`DbError`] if the transaction cannot be opened, any update
/// fails, or the commit fails.
pub async fn write_predictions(db: &dyn Database, updates: &[ZoneUpdate]) -> Result<u64, DbError> {
    let txn = db.begin_transaction().await?;

    match apply_updates(txn.as_ref(), updates).await {
        Ok(applied) => {
            txn.commit().await?;
            Ok(applied)
        }
        Err(e) => {
            log::debug!("Rolling back prediction batch after error: {e}");
            if let Err(rollback_err) = txn.rollback().await {
                log::error!("Rollback failed: {rollback_err}");
            }
            Err(e)
        }
    }
}

async fn apply_updates(txn: &dyn Database, updates: &[ZoneUpdate]) -> Result<u64, DbError> {
    let mut applied = 0u64;

    for update in updates {
        txn.exec_raw_params(
            UPDATE_PREDICTION_SQL,
            &[
                DatabaseValue::Int64(update.projection.predicted_population),
                DatabaseValue::Real64(update.projection.predicted_risk_radius),
                update.zone_id.clone(),
            ],
        )
        .await?;
        applied += 1;
    }

    Ok(applied)
}
