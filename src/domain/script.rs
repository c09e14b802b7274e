use serde::Serialize;

/// A seeded reference corpus. Scripts are read-only inputs: run creation
/// expands their items into run items and never writes back.
#[derive(Debug, Clone, Serialize)]
pub struct Script {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptItem {
    pub id: String,
    pub script_id: String,
    pub text: String,
    pub lang: String,
    pub tags: Option<String>,
}
