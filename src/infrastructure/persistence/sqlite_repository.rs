use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{
    BenchmarkRepository, ItemCompletion, RepositoryError, RunTotals,
};
use crate::domain::{
    ItemSidecar, MetricName, Run, RunId, RunItem, RunItemId, RunStatus, Script, ScriptItem,
    VendorLabel,
};

/// SQLite-backed repository. Per-item writes (metrics, artifact pointers,
/// the status flip) share one transaction; every read is a single query,
/// so it sees one snapshot.
pub struct SqliteBenchmarkRepository {
    pool: SqlitePool,
}

impl SqliteBenchmarkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const ITEM_SELECT: &str = "\
SELECT ri.id, ri.run_id, ri.script_item_id, ri.vendor, ri.input_text, ri.audio_file, \
       ri.transcript, ri.sidecar_json, ri.status, ri.failure_reason, ri.created_at, \
       (SELECT GROUP_CONCAT(m.metric_name || ':' || m.value, '|') \
          FROM metrics m WHERE m.run_item_id = ri.id) AS metrics_summary \
  FROM run_items ri";

#[async_trait]
impl BenchmarkRepository for SqliteBenchmarkRepository {
    #[instrument(skip(self, run), fields(run_id = %run.id))]
    async fn create_run(&self, run: &Run) -> Result<(), RepositoryError> {
        let vendors: Vec<String> = run.vendors.iter().map(|v| v.to_string()).collect();
        let vendor_list_json =
            serde_json::to_string(&vendors).map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
        let config_json = serde_json::to_string(&run.config)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        sqlx::query(
            "INSERT INTO runs (id, mode, vendor_list_json, config_json, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(run.id.to_string())
        .bind(run.mode.as_str())
        .bind(vendor_list_json)
        .bind(config_json)
        .bind(run.status.as_str())
        .bind(encode_ts(&run.created_at))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn append_items(&self, items: &[RunItem]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        for item in items {
            let sidecar_json = serde_json::to_string(&item.sidecar)
                .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
            sqlx::query(
                "INSERT INTO run_items \
                 (id, run_id, script_item_id, vendor, input_text, sidecar_json, status, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(item.id.to_string())
            .bind(item.run_id.to_string())
            .bind(item.script_item_id.clone())
            .bind(item.vendor.to_string())
            .bind(item.input_text.clone())
            .bind(sidecar_json)
            .bind(item.status.as_str())
            .bind(encode_ts(&item.created_at))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }
        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(())
    }

    #[instrument(skip(self), fields(run_id = %id))]
    async fn mark_run_started(&self, id: RunId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE runs SET status = 'running', started_at = ? WHERE id = ?")
            .bind(encode_ts(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    #[instrument(skip(self), fields(run_id = %id, status = %status))]
    async fn finish_run(&self, id: RunId, status: RunStatus) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE runs SET status = ?, finished_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(encode_ts(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    #[instrument(skip(self), fields(item_id = %id))]
    async fn set_item_running(&self, id: RunItemId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE run_items SET status = 'running' WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    #[instrument(skip(self, reason), fields(item_id = %id))]
    async fn fail_item(&self, id: RunItemId, reason: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE run_items SET status = 'failed', failure_reason = ? WHERE id = ?")
            .bind(reason)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    #[instrument(skip(self, completion), fields(item_id = %completion.item_id))]
    async fn complete_item(&self, completion: &ItemCompletion) -> Result<(), RepositoryError> {
        let sidecar_json = serde_json::to_string(&completion.sidecar)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        for metric in &completion.metrics {
            sqlx::query(
                "INSERT INTO metrics (id, run_item_id, metric_name, value, unit) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(metric.id.as_uuid().to_string())
            .bind(metric.item_id.to_string())
            .bind(metric.name.as_str())
            .bind(metric.value)
            .bind(metric.unit.as_str())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        for artifact in &completion.artifacts {
            sqlx::query(
                "INSERT INTO artifacts (id, run_item_id, kind, content_type, filename, byte_len, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(artifact.id.as_uuid().to_string())
            .bind(artifact.item_id.to_string())
            .bind(artifact.kind.as_str())
            .bind(artifact.content_type.clone())
            .bind(artifact.filename.clone())
            .bind(artifact.byte_len as i64)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        sqlx::query(
            "UPDATE run_items \
             SET status = 'completed', audio_file = ?, transcript = ?, sidecar_json = ? \
             WHERE id = ?",
        )
        .bind(completion.audio_file.clone())
        .bind(completion.transcript.clone())
        .bind(sidecar_json)
        .bind(completion.item_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(())
    }

    #[instrument(skip(self), fields(run_id = %id))]
    async fn get_run(&self, id: RunId) -> Result<Option<Run>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM runs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.as_ref().map(map_run).transpose()
    }

    #[instrument(skip(self))]
    async fn list_runs(&self, limit: i64, offset: i64) -> Result<Vec<Run>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM runs ORDER BY created_at DESC LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        rows.iter().map(map_run).collect()
    }

    #[instrument(skip(self), fields(item_id = %id))]
    async fn get_item(&self, id: RunItemId) -> Result<Option<RunItem>, RepositoryError> {
        let query = format!("{} WHERE ri.id = ?", ITEM_SELECT);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.as_ref().map(map_item).transpose()
    }

    #[instrument(skip(self), fields(run_id = %run_id))]
    async fn list_items_by_run(&self, run_id: RunId) -> Result<Vec<RunItem>, RepositoryError> {
        let query = format!("{} WHERE ri.run_id = ? ORDER BY ri.created_at, ri.id", ITEM_SELECT);
        let rows = sqlx::query(&query)
            .bind(run_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        rows.iter().map(map_item).collect()
    }

    #[instrument(skip(self))]
    async fn list_scripts(&self) -> Result<Vec<Script>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT s.id, s.name, s.description, s.tags, COUNT(si.id) AS item_count \
             FROM scripts s LEFT JOIN script_items si ON si.script_id = s.id \
             GROUP BY s.id ORDER BY s.name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.iter()
            .map(|row| {
                Ok(Script {
                    id: col(row, "id")?,
                    name: col(row, "name")?,
                    description: col(row, "description")?,
                    tags: col(row, "tags")?,
                    item_count: col(row, "item_count")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn get_script_items(
        &self,
        script_id: &str,
    ) -> Result<Vec<ScriptItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, script_id, text, lang, tags FROM script_items \
             WHERE script_id = ? ORDER BY id",
        )
        .bind(script_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.iter()
            .map(|row| {
                Ok(ScriptItem {
                    id: col(row, "id")?,
                    script_id: col(row, "script_id")?,
                    text: col(row, "text")?,
                    lang: col(row, "lang")?,
                    tags: col(row, "tags")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(metric = %name))]
    async fn metric_values_between(
        &self,
        name: MetricName,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<f64>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT m.value FROM metrics m \
             JOIN run_items ri ON ri.id = m.run_item_id \
             WHERE m.metric_name = ? AND ri.created_at > ? AND ri.created_at <= ? \
             ORDER BY m.value ASC",
        )
        .bind(name.as_str())
        .bind(encode_ts(&from))
        .bind(encode_ts(&to))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.iter().map(|row| col(row, "value")).collect()
    }

    #[instrument(skip(self))]
    async fn run_totals_since(&self, since: DateTime<Utc>) -> Result<RunTotals, RepositoryError> {
        let since = encode_ts(&since);

        let row = sqlx::query(
            "SELECT \
               (SELECT COUNT(*) FROM runs WHERE created_at > ?) AS total_runs, \
               (SELECT COUNT(*) FROM runs WHERE status = 'completed' AND created_at > ?) AS completed_runs, \
               (SELECT COUNT(*) FROM run_items WHERE created_at > ?) AS total_items",
        )
        .bind(&since)
        .bind(&since)
        .bind(&since)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(RunTotals {
            total_runs: col(&row, "total_runs")?,
            completed_runs: col(&row, "completed_runs")?,
            total_items: col(&row, "total_items")?,
        })
    }

    #[instrument(skip(self))]
    async fn items_since(&self, since: DateTime<Utc>) -> Result<Vec<RunItem>, RepositoryError> {
        let query = format!(
            "{} WHERE ri.created_at > ? ORDER BY ri.created_at, ri.id",
            ITEM_SELECT
        );
        let rows = sqlx::query(&query)
            .bind(encode_ts(&since))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        rows.iter().map(map_item).collect()
    }
}

fn map_sqlx_err(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return RepositoryError::ConstraintViolation(db.to_string());
        }
    }
    RepositoryError::QueryFailed(e.to_string())
}

/// Timestamps are stored as fixed-precision RFC 3339 UTC strings, which
/// keeps lexicographic and chronological order identical for range scans.
fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::QueryFailed(format!("timestamp {}: {}", raw, e)))
}

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepositoryError::QueryFailed(format!("column {}: {}", name, e)))
}

fn parse_uuid(raw: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(raw).map_err(|e| RepositoryError::QueryFailed(format!("uuid {}: {}", raw, e)))
}

fn map_run(row: &SqliteRow) -> Result<Run, RepositoryError> {
    let id: String = col(row, "id")?;
    let mode: String = col(row, "mode")?;
    let vendor_list_json: String = col(row, "vendor_list_json")?;
    let config_json: String = col(row, "config_json")?;
    let status: String = col(row, "status")?;
    let created_at: String = col(row, "created_at")?;
    let started_at: Option<String> = col(row, "started_at")?;
    let finished_at: Option<String> = col(row, "finished_at")?;

    let vendor_strings: Vec<String> = serde_json::from_str(&vendor_list_json)
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
    let vendors = vendor_strings
        .iter()
        .map(|s| s.parse::<VendorLabel>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(RepositoryError::QueryFailed)?;

    Ok(Run {
        id: RunId::from_uuid(parse_uuid(&id)?),
        mode: mode.parse().map_err(RepositoryError::QueryFailed)?,
        vendors,
        config: serde_json::from_str(&config_json)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
        status: status.parse().map_err(RepositoryError::QueryFailed)?,
        created_at: decode_ts(&created_at)?,
        started_at: started_at.as_deref().map(decode_ts).transpose()?,
        finished_at: finished_at.as_deref().map(decode_ts).transpose()?,
    })
}

fn map_item(row: &SqliteRow) -> Result<RunItem, RepositoryError> {
    let id: String = col(row, "id")?;
    let run_id: String = col(row, "run_id")?;
    let vendor: String = col(row, "vendor")?;
    let status: String = col(row, "status")?;
    let created_at: String = col(row, "created_at")?;
    let sidecar_json: Option<String> = col(row, "sidecar_json")?;

    let sidecar: ItemSidecar = match sidecar_json.as_deref() {
        Some(raw) if !raw.is_empty() => serde_json::from_str(raw)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
        _ => ItemSidecar::default(),
    };

    Ok(RunItem {
        id: RunItemId::from_uuid(parse_uuid(&id)?),
        run_id: RunId::from_uuid(parse_uuid(&run_id)?),
        script_item_id: col(row, "script_item_id")?,
        vendor: vendor.parse().map_err(RepositoryError::QueryFailed)?,
        input_text: col(row, "input_text")?,
        audio_file: col(row, "audio_file")?,
        transcript: col(row, "transcript")?,
        status: status.parse().map_err(RepositoryError::QueryFailed)?,
        failure_reason: col(row, "failure_reason")?,
        metrics_summary: col(row, "metrics_summary")?,
        sidecar,
        created_at: decode_ts(&created_at)?,
    })
}
