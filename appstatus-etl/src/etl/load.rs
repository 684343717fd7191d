//! Reconcile canonical rows against the persisted table
//!
//! Fetch-then-diff-then-update, one row at a time. The sequence is not
//! isolated against concurrent writers; the pipeline assumes it runs
//! exclusively, one instance at a time.

use chrono::NaiveDate;
use log::{debug, info, warn};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, MySqlPool, Row, Transaction};

use crate::config::StoreConfig;

use super::encode::{BindValue, encode};
use super::error::EtlError;
use super::types::{CanonicalTable, Field, ID_COLUMN, IncomingRow};

/// Stored date convention for "no real date"; read as null
const ZERO_DATE: &str = "0000-00-00";

/// Outcome of reconciling a single incoming row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// An update of `fields` assignments was executed
    Updated { fields: usize },
    /// No stored record matches the identifier; expected, tolerated
    NotFound,
    /// Every eligible incoming value was blank, no statement issued
    NoChanges,
    /// The store rejected this row's fetch or update
    Failed { message: String },
}

/// Per-run row counts, reported after the batch commits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub updated: usize,
    pub not_found: usize,
    pub no_changes: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Updated { .. } => self.updated += 1,
            RowOutcome::NotFound => self.not_found += 1,
            RowOutcome::NoChanges => self.no_changes += 1,
            RowOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} updated, {} not found, {} unchanged, {} failed",
            self.updated, self.not_found, self.no_changes, self.failed
        )
    }
}

/// The stored record matched for an incoming row, with sentinel zero-dates
/// already decoded to null
#[derive(Debug, Clone, Default)]
pub struct PersistedRow {
    pub application_id: String,
    pub approved_date: Option<NaiveDate>,
    pub sample_sent_date: Option<NaiveDate>,
    pub result_date: Option<NaiveDate>,
}

impl PersistedRow {
    /// Stored value for a date field
    pub fn date(&self, field: Field) -> Option<NaiveDate> {
        match field {
            Field::ApprovedDate => self.approved_date,
            Field::SampleSentDate => self.sample_sent_date,
            Field::ResultDate => self.result_date,
            _ => None,
        }
    }
}

/// Decode a stored date column; the zero-date sentinel and unparsable
/// text both read as null
fn decode_stored_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.starts_with(ZERO_DATE) {
        return None;
    }
    // DATETIME columns cast with a trailing time-of-day; keep the date part
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// The minimal set of field assignments scheduled for one row
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    assignments: Vec<(Field, BindValue)>,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn assignments(&self) -> &[(Field, BindValue)] {
        &self.assignments
    }

    /// Parameterized UPDATE statement for this plan. The key match is
    /// case-insensitive, like the fetch that precedes it: storage keeps
    /// the identifier's original casing.
    pub fn statement(&self, table: &str) -> String {
        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(field, _)| format!("{} = ?", field.column_name()))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE UPPER({}) = ?",
            table,
            sets.join(", "),
            ID_COLUMN
        )
    }

    /// The same statement with literals substituted, for logging
    pub fn rendered(&self, table: &str, application_id: &str) -> String {
        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(field, value)| format!("{} = {}", field.column_name(), value.literal()))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE UPPER({}) = '{}'",
            table,
            sets.join(", "),
            ID_COLUMN,
            application_id
        )
    }
}

/// Decide which fields to write for one incoming row.
///
/// Overwrite-if-present, per field: a present incoming value always wins,
/// even over a non-null stored value, and a blank incoming cell never
/// clears what is already stored. Only fields present in the canonical
/// table are eligible. Date fields are considered first, then the rest.
pub fn build_update_plan(
    fields: &[Field],
    row: &IncomingRow,
    persisted: &PersistedRow,
) -> UpdatePlan {
    let mut assignments = Vec::new();

    for field in fields.iter().copied().filter(Field::is_date) {
        let incoming = row.value(field);
        if incoming.is_null() {
            continue;
        }
        if let (Some(new), Some(stored)) = (incoming.as_date(), persisted.date(field)) {
            if new != stored {
                debug!("{}: {} replaces stored {}", field, new, stored);
            }
        }
        assignments.push((field, encode(incoming)));
    }

    for field in fields.iter().copied().filter(|f| !f.is_date()) {
        let incoming = row.value(field);
        if !incoming.is_null() {
            assignments.push((field, encode(incoming)));
        }
    }

    UpdatePlan { assignments }
}

/// Applies canonical rows to the persisted table, one row at a time,
/// over a single store connection
pub struct Loader {
    pool: MySqlPool,
    table: String,
}

impl Loader {
    /// Open a single connection to the store
    pub async fn connect(config: &StoreConfig) -> Result<Self, EtlError> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| EtlError::StoreConnectionFailed {
                message: e.to_string(),
            })?;

        info!("Database connection successful");
        Ok(Self {
            pool,
            table: config.table.clone(),
        })
    }

    /// Reconcile every row in source order, then commit the batch as
    /// a whole. Row-level failures are recorded and skipped; only a
    /// failed commit fails the batch.
    pub async fn load(&self, table: &CanonicalTable) -> Result<RunSummary, EtlError> {
        info!("Loading {} rows into {}", table.rows.len(), self.table);

        let mut tx =
            self.pool
                .begin()
                .await
                .map_err(|e| EtlError::StoreConnectionFailed {
                    message: e.to_string(),
                })?;

        let mut summary = RunSummary::default();
        for row in &table.rows {
            let outcome = self.process_row(&mut tx, &table.fields, row).await;
            summary.record(&outcome);
        }

        tx.commit().await.map_err(|e| EtlError::BatchCommitFailed {
            message: e.to_string(),
        })?;

        Ok(summary)
    }

    /// Close the underlying connection. Dropping the loader also releases
    /// it, so early-error paths need nothing extra.
    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn process_row(
        &self,
        tx: &mut Transaction<'_, MySql>,
        fields: &[Field],
        row: &IncomingRow,
    ) -> RowOutcome {
        let id = row.application_id.trim().to_uppercase();
        debug!("Processing {} {}", ID_COLUMN, id);

        let persisted = match self.fetch_persisted(tx, &id).await {
            Ok(Some(persisted)) => persisted,
            Ok(None) => {
                warn!("{} {} not found in {}; skipping", ID_COLUMN, id, self.table);
                return RowOutcome::NotFound;
            }
            Err(e) => {
                warn!("Error fetching {} {}: {}", ID_COLUMN, id, e);
                return RowOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        let plan = build_update_plan(fields, row, &persisted);
        if plan.is_empty() {
            debug!("No changes detected for {} {}; skipping update", ID_COLUMN, id);
            return RowOutcome::NoChanges;
        }

        debug!("Executing: {}", plan.rendered(&self.table, &id));
        let statement = plan.statement(&self.table);
        let mut query = sqlx::query(&statement);
        for (_, value) in plan.assignments() {
            query = bind_value(query, value);
        }
        query = query.bind(id.clone());

        match query.execute(&mut **tx).await {
            Ok(result) if result.rows_affected() == 0 => {
                // the matched row already holds every scheduled value, so
                // nothing was written
                debug!("Nothing written for {} {}", ID_COLUMN, id);
                RowOutcome::NoChanges
            }
            Ok(_) => {
                info!("Updated {} {} ({} fields)", ID_COLUMN, id, plan.len());
                RowOutcome::Updated { fields: plan.len() }
            }
            Err(e) => {
                warn!("Error updating {} {}: {}", ID_COLUMN, id, e);
                RowOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Fetch the stored record whose identifier matches case-insensitively.
    /// Date columns come back as text so the zero-date sentinel can be
    /// decoded instead of failing typed extraction.
    async fn fetch_persisted(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: &str,
    ) -> Result<Option<PersistedRow>, sqlx::Error> {
        let statement = format!(
            "SELECT {id_col}, \
             CAST(ApprovedDate AS CHAR) AS ApprovedDate, \
             CAST(SampleSentDate AS CHAR) AS SampleSentDate, \
             CAST(ResultDate AS CHAR) AS ResultDate \
             FROM {table} WHERE UPPER({id_col}) = ?",
            id_col = ID_COLUMN,
            table = self.table,
        );

        let row = sqlx::query(&statement)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let approved_date: Option<String> = row.try_get("ApprovedDate")?;
        let sample_sent_date: Option<String> = row.try_get("SampleSentDate")?;
        let result_date: Option<String> = row.try_get("ResultDate")?;

        Ok(Some(PersistedRow {
            application_id: row.try_get(ID_COLUMN)?,
            approved_date: decode_stored_date(approved_date.as_deref()),
            sample_sent_date: decode_stored_date(sample_sent_date.as_deref()),
            result_date: decode_stored_date(result_date.as_deref()),
        }))
    }
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, MySql, sqlx::mysql::MySqlArguments>,
    value: &BindValue,
) -> sqlx::query::Query<'q, MySql, sqlx::mysql::MySqlArguments> {
    match value {
        BindValue::Null => query.bind(None::<String>),
        BindValue::Status(code) => query.bind(*code),
        BindValue::Text(s) => query.bind(s.clone()),
        BindValue::Number(n) => query.bind(*n),
        BindValue::Date(d) => query.bind(*d),
    }
}
