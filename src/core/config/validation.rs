use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 600)?;
    }

    if let Some(tools) = expect_optional_object(root, "tools")? {
        validate_optional_string_field(
            tools,
            "tools.google_search_api_key",
            "google_search_api_key",
        )?;
        validate_optional_string_field(
            tools,
            "tools.google_search_engine_id",
            "google_search_engine_id",
        )?;
    }

    if let Some(history) = expect_optional_object(root, "chat_history")? {
        validate_u64_field(
            history,
            "chat_history.default_limit",
            "default_limit",
            1,
            1_000,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_config() {
        let config = json!({
            "server": { "port": 8000, "cors_allowed_origins": ["http://localhost:3000"] },
            "llm": { "model": "llama-3.3-70b-versatile", "timeout_secs": 20 },
            "tools": { "google_search_api_key": "k", "google_search_engine_id": "cx" },
            "chat_history": { "default_limit": 20 }
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_wrong_types() {
        assert!(validate_config(&json!({ "llm": { "timeout_secs": 0 } })).is_err());
        assert!(validate_config(&json!({ "tools": { "google_search_api_key": 42 } })).is_err());
        assert!(validate_config(&json!({ "server": { "cors_allowed_origins": [""] } })).is_err());
        assert!(validate_config(&json!({ "llm": "groq" })).is_err());
        assert!(validate_config(&json!([])).is_err());
    }
}
