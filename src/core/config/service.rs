use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::validation::validate_config;
use crate::core::errors::ApiError;

/// Environment variables that win over whatever the YAML files say.
/// Each entry is (variable, config path).
const ENV_OVERRIDES: [(&str, &[&str]); 3] = [
    ("GOOGLE_CSE_API_KEY", &["tools", "google_search_api_key"]),
    ("GOOGLE_CSE_CX", &["tools", "google_search_engine_id"]),
    ("GROQ_API_KEY", &["llm", "api_key"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
    use_env: bool,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            use_env: true,
        }
    }

    /// File-only loading, for tests that must not see the host environment.
    pub fn without_env(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            use_env: false,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        if self.use_env {
            if let Ok(path) = env::var("LECCION_CONFIG_PATH") {
                return PathBuf::from(path);
            }
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let mut merged = deep_merge(&public_config, &secrets_config);
        if self.use_env {
            apply_env_overrides(&mut merged, |name| env::var(name).ok());
        }
        validate_config(&merged)?;
        Ok(merged)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value) => match value {
                Value::Object(_) => value,
                _ => Value::Object(Map::new()),
            },
            Err(err) => {
                tracing::warn!("Ignoring malformed config file {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (name, path) in ENV_OVERRIDES {
        let Some(value) = lookup(name) else {
            continue;
        };
        if value.trim().is_empty() {
            continue;
        }
        ensure_object_path(config, path, Value::String(value));
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_in(dir: &Path) -> ConfigService {
        let paths = AppPaths::with_data_dir(dir.to_path_buf(), dir.to_path_buf());
        ConfigService::without_env(Arc::new(paths))
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn env_overrides_replace_file_credentials() {
        let mut config = json!({
            "tools": { "google_search_api_key": "from-file" }
        });

        apply_env_overrides(&mut config, |name| match name {
            "GOOGLE_CSE_API_KEY" => Some("from-env".to_string()),
            "GROQ_API_KEY" => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config["tools"]["google_search_api_key"], "from-env");
        assert!(config.get("llm").is_none());
    }

    #[test]
    fn secrets_file_is_merged_over_public_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yml"),
            "llm:\n  model: llama-3.3-70b-versatile\n",
        )
        .unwrap();
        fs::write(dir.path().join("secrets.yaml"), "llm:\n  api_key: gsk-test\n").unwrap();

        let config = service_in(dir.path()).load_config().unwrap();

        assert_eq!(config["llm"]["model"], "llama-3.3-70b-versatile");
        assert_eq!(config["llm"]["api_key"], "gsk-test");
    }

    #[test]
    fn missing_files_load_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_in(dir.path()).load_config().unwrap();
        assert_eq!(config, json!({}));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yml"), "llm:\n  timeout_secs: 0\n").unwrap();

        assert!(matches!(
            service_in(dir.path()).load_config(),
            Err(ApiError::BadRequest(_))
        ));
    }
}
