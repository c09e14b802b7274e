use sqlx::SqlitePool;
use tracing::instrument;

use crate::application::ports::RepositoryError;

/// Schema bootstrap plus the seeded reference scripts. Idempotent:
/// creation is guarded and seed rows use INSERT OR IGNORE.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    mode TEXT NOT NULL CHECK (mode IN ('isolated', 'chained')),
    vendor_list_json TEXT NOT NULL,
    config_json TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'running', 'completed', 'failed', 'partial')),
    created_at TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT
);

CREATE TABLE IF NOT EXISTS run_items (
    id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL REFERENCES runs (id),
    script_item_id TEXT,
    vendor TEXT NOT NULL,
    input_text TEXT NOT NULL,
    audio_file TEXT,
    transcript TEXT,
    sidecar_json TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'running', 'completed', 'failed')),
    failure_reason TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS metrics (
    id TEXT PRIMARY KEY,
    run_item_id TEXT NOT NULL REFERENCES run_items (id),
    metric_name TEXT NOT NULL,
    value REAL NOT NULL,
    unit TEXT NOT NULL,
    UNIQUE (run_item_id, metric_name)
);

CREATE TABLE IF NOT EXISTS artifacts (
    id TEXT PRIMARY KEY,
    run_item_id TEXT NOT NULL REFERENCES run_items (id),
    kind TEXT NOT NULL CHECK (kind IN ('audio', 'transcript')),
    content_type TEXT NOT NULL,
    filename TEXT NOT NULL,
    byte_len INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scripts (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    tags TEXT
);

CREATE TABLE IF NOT EXISTS script_items (
    id TEXT PRIMARY KEY,
    script_id TEXT NOT NULL REFERENCES scripts (id),
    text TEXT NOT NULL,
    lang TEXT NOT NULL DEFAULT 'en-US',
    tags TEXT
);

CREATE INDEX IF NOT EXISTS idx_run_items_run ON run_items (run_id);
CREATE INDEX IF NOT EXISTS idx_run_items_created ON run_items (created_at);
CREATE INDEX IF NOT EXISTS idx_metrics_item ON metrics (run_item_id);
CREATE INDEX IF NOT EXISTS idx_artifacts_item ON artifacts (run_item_id);

INSERT OR IGNORE INTO scripts (id, name, description, tags) VALUES
    ('banking_script', 'Banking Script', 'Banking domain test phrases', 'banking,finance'),
    ('general_script', 'General Script', 'General purpose test phrases', 'general');

INSERT OR IGNORE INTO script_items (id, script_id, text, lang, tags) VALUES
    ('item_1', 'banking_script', 'Welcome to our banking services. How can I help you today?', 'en-US', 'greeting'),
    ('item_2', 'banking_script', 'Your account balance is one thousand two hundred and fifty dollars.', 'en-US', 'numbers'),
    ('item_3', 'banking_script', 'Please verify your identity by providing your social security number.', 'en-US', 'security'),
    ('item_4', 'general_script', 'The quick brown fox jumps over the lazy dog.', 'en-US', 'pangram'),
    ('item_5', 'general_script', 'Hello world, this is a test of the speech recognition system.', 'en-US', 'test');
"#;

#[instrument(skip(pool))]
pub async fn init_schema(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
    tracing::info!("Database schema ready");
    Ok(())
}
