//! Local cache: one JSON copy of the whole gradebook in the workspace
//! database, rewritten after every change.

use crate::db;
use crate::error::{GradebookError, Result};
use crate::model::{default_state, AppState};
use log::{debug, warn};
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;

pub const STORAGE_KEY: &str = "classroom-manager-data";

pub struct LocalCache {
    conn: Connection,
}

impl LocalCache {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(workspace)?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn save(&self, state: &AppState) -> Result<()> {
        let text = serde_json::to_string(state)?;
        db::kv_set(&self.conn, STORAGE_KEY, &text)?;
        debug!("local cache written ({} bytes)", text.len());
        Ok(())
    }

    pub fn load_raw(&self) -> Result<Option<String>> {
        Ok(db::kv_get(&self.conn, STORAGE_KEY)?)
    }

    /// Loads the cached state merged over the defaults. `None` when nothing
    /// was cached yet. A cache that cannot be decoded yields the default
    /// state and a warning.
    pub fn load(&self) -> Result<Option<AppState>> {
        let Some(text) = self.load_raw()? else {
            return Ok(None);
        };
        match merge_with_defaults(&text) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!("cached state unreadable, starting from defaults: {}", e);
                Ok(Some(default_state()))
            }
        }
    }
}

/// Overlays each top-level field of the cached document on the default
/// state. Fields that are missing or null keep their default, so documents
/// written by older versions still load.
pub fn merge_with_defaults(text: &str) -> Result<AppState> {
    let cached: Value = serde_json::from_str(text)?;
    let Value::Object(cached) = cached else {
        return Err(GradebookError::Decode(
            "cached state is not a JSON object".to_string(),
        ));
    };
    let mut merged = match serde_json::to_value(default_state())? {
        Value::Object(m) => m,
        _ => return Err(GradebookError::Decode("default state is not an object".into())),
    };
    for (key, value) in cached {
        if !value.is_null() {
            merged.insert(key, value);
        }
    }
    let state: AppState = serde_json::from_value(Value::Object(merged))?;
    Ok(state.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;
    use serde_json::json;

    fn cache() -> LocalCache {
        LocalCache::from_connection(db::open_in_memory().expect("open"))
    }

    #[test]
    fn empty_cache_loads_none() {
        assert!(cache().load().expect("load").is_none());
    }

    #[test]
    fn saved_state_reloads_structurally_equal() {
        let cache = cache();
        let state = ops::add_class(&default_state(), "六年1班").expect("add");
        let state = ops::add_students(&state, "王小明 李小華", &state.current_class_id.clone())
            .expect("students");
        cache.save(&state).expect("save");
        let loaded = cache.load().expect("load").expect("cached");
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_fields_fall_back_independently() {
        let text = json!({
            "classes": [{ "id": "k1", "name": "三年2班" }],
            "currentClassId": "k1",
            "students": [],
            "groups": null
        })
        .to_string();
        let state = merge_with_defaults(&text).expect("merge");
        assert_eq!(state.classes[0].name, "三年2班");
        assert!(state.students.is_empty());
        assert!(state.groups.is_empty());
        assert_eq!(
            state.settings_options,
            default_state().settings_options
        );
        assert_eq!(state.settings.rows_per_page, 6);
    }

    #[test]
    fn empty_classes_are_repaired() {
        let text = json!({ "classes": [], "currentClassId": "zz" }).to_string();
        let state = merge_with_defaults(&text).expect("merge");
        assert_eq!(state.classes.len(), 1);
        assert_eq!(state.current_class_id, "c1");
    }

    #[test]
    fn corrupt_cache_falls_back_to_defaults() {
        let cache = cache();
        db::kv_set(&cache.conn, STORAGE_KEY, "{not json").expect("write garbage");
        let state = cache.load().expect("load").expect("fallback");
        assert_eq!(state, default_state());
    }
}
