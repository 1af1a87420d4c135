//! Structural validation of raw agent manifests.

use super::{AgentManifest, HttpMethod};
use crate::error::{MaestroError, Result};
use serde_json::Value;

/// Validate a raw manifest document and parse it into an [`AgentManifest`].
///
/// Collects every structural violation it can find before giving up, so a
/// manifest author sees all problems at once. Never returns a partially
/// populated manifest: deserialization happens only after a clean pass.
pub fn validate(raw: &Value) -> Result<AgentManifest> {
    let mut violations = Vec::new();

    let Some(root) = raw.as_object() else {
        return Err(MaestroError::Validation(vec![
            "manifest root must be a JSON object".to_string(),
        ]));
    };

    match root.get("agent_name") {
        Some(Value::String(name)) if !name.is_empty() => {}
        Some(Value::String(_)) => violations.push("agent_name must not be empty".to_string()),
        Some(_) => violations.push("agent_name must be a string".to_string()),
        None => violations.push("agent_name is required".to_string()),
    }

    if let Some(required_auth) = root.get("requiredAuth") {
        if !required_auth.is_boolean() {
            violations.push("requiredAuth must be a boolean".to_string());
        }
    }

    match root.get("authType") {
        None | Some(Value::Null) => {}
        Some(Value::String(auth)) if auth == "Individual" || auth == "SSO" => {}
        Some(_) => violations.push("authType must be \"Individual\" or \"SSO\"".to_string()),
    }

    match root.get("tools") {
        Some(Value::Array(tools)) => {
            for (i, tool) in tools.iter().enumerate() {
                validate_tool(i, tool, &mut violations);
            }
        }
        Some(_) => violations.push("tools must be an array".to_string()),
        None => violations.push("tools is required".to_string()),
    }

    if !violations.is_empty() {
        return Err(MaestroError::Validation(violations));
    }

    serde_json::from_value(raw.clone())
        .map_err(|e| MaestroError::Validation(vec![format!("manifest does not parse: {}", e)]))
}

fn validate_tool(index: usize, tool: &Value, violations: &mut Vec<String>) {
    let context = format!("tools[{}]", index);

    let Some(tool) = tool.as_object() else {
        violations.push(format!("{} must be an object", context));
        return;
    };

    for field in ["name", "description"] {
        match tool.get(field) {
            Some(Value::String(_)) => {}
            Some(_) => violations.push(format!("{}.{} must be a string", context, field)),
            None => violations.push(format!("{}.{} is required", context, field)),
        }
    }

    for field in ["intent_examples", "tags"] {
        match tool.get(field) {
            Some(Value::Array(items)) => {
                if items.iter().any(|item| !item.is_string()) {
                    violations.push(format!("{}.{} must contain only strings", context, field));
                }
            }
            Some(_) => violations.push(format!("{}.{} must be an array", context, field)),
            None => violations.push(format!("{}.{} is required", context, field)),
        }
    }

    match tool.get("http").and_then(Value::as_object) {
        Some(http) => {
            match http.get("method").and_then(Value::as_str) {
                Some(method) if HttpMethod::NAMES.contains(&method) => {}
                Some(method) => violations.push(format!(
                    "{}.http.method \"{}\" is not one of {}",
                    context,
                    method,
                    HttpMethod::NAMES.join("|")
                )),
                None => violations.push(format!("{}.http.method is required", context)),
            }
            match http.get("url").and_then(Value::as_str) {
                Some(target) => {
                    if url::Url::parse(target).is_err() {
                        violations.push(format!("{}.http.url is not a valid URL", context));
                    }
                }
                None => violations.push(format!("{}.http.url is required", context)),
            }
        }
        None => violations.push(format!("{}.http must be an object", context)),
    }

    match tool.get("schema").and_then(Value::as_object) {
        Some(schema) => {
            for field in ["name", "description"] {
                if !schema.get(field).is_some_and(Value::is_string) {
                    violations.push(format!("{}.schema.{} must be a string", context, field));
                }
            }
            validate_parameters(&context, schema.get("parameters"), violations);
        }
        None => violations.push(format!("{}.schema must be an object", context)),
    }
}

fn validate_parameters(context: &str, parameters: Option<&Value>, violations: &mut Vec<String>) {
    let Some(parameters) = parameters.and_then(Value::as_object) else {
        violations.push(format!("{}.schema.parameters must be an object", context));
        return;
    };

    if parameters.get("type").and_then(Value::as_str) != Some("object") {
        violations.push(format!(
            "{}.schema.parameters.type must be \"object\"",
            context
        ));
    }

    let properties = match parameters.get("properties").and_then(Value::as_object) {
        Some(properties) => {
            for (name, spec) in properties {
                let Some(spec) = spec.as_object() else {
                    violations.push(format!(
                        "{}.schema.parameters.properties.{} must be an object",
                        context, name
                    ));
                    continue;
                };
                if !spec.get("type").is_some_and(Value::is_string) {
                    violations.push(format!(
                        "{}.schema.parameters.properties.{}.type must be a string",
                        context, name
                    ));
                }
                if let Some(allowed) = spec.get("enum") {
                    let ok = allowed
                        .as_array()
                        .is_some_and(|items| items.iter().all(Value::is_string));
                    if !ok {
                        violations.push(format!(
                            "{}.schema.parameters.properties.{}.enum must be an array of strings",
                            context, name
                        ));
                    }
                }
            }
            Some(properties)
        }
        None => {
            violations.push(format!(
                "{}.schema.parameters.properties must be an object",
                context
            ));
            None
        }
    };

    match parameters.get("required") {
        Some(Value::Array(required)) => {
            for field in required {
                match field.as_str() {
                    Some(name) => {
                        if properties.is_some_and(|props| !props.contains_key(name)) {
                            violations.push(format!(
                                "{}.schema.parameters.required names unknown property \"{}\"",
                                context, name
                            ));
                        }
                    }
                    None => violations.push(format!(
                        "{}.schema.parameters.required must contain only strings",
                        context
                    )),
                }
            }
        }
        Some(_) => violations.push(format!(
            "{}.schema.parameters.required must be an array",
            context
        )),
        None => violations.push(format!("{}.schema.parameters.required is required", context)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "agent_name": "weather-agent",
            "requiredAuth": false,
            "authType": "Individual",
            "tools": [{
                "name": "get_weather",
                "description": "Get the current weather for a city",
                "intent_examples": ["weather in Jakarta"],
                "tags": ["weather"],
                "schema": {
                    "name": "get_weather",
                    "description": "Get the current weather for a city",
                    "parameters": {
                        "type": "object",
                        "properties": {"city": {"type": "string"}},
                        "required": ["city"]
                    }
                },
                "http": {"method": "GET", "url": "http://localhost:9000/weather"}
            }]
        })
    }

    fn violations(raw: &Value) -> Vec<String> {
        match validate(raw) {
            Err(MaestroError::Validation(violations)) => violations,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_manifest_parses() {
        let manifest = validate(&sample()).unwrap();
        assert_eq!(manifest.agent_name, "weather-agent");
        assert_eq!(manifest.tools[0].name, "get_weather");
    }

    #[test]
    fn test_reports_all_violations() {
        let mut raw = sample();
        raw["agent_name"] = json!(42);
        raw["tools"][0]["http"]["method"] = json!("FETCH");
        raw["tools"][0]["intent_examples"] = json!("not-an-array");

        let found = violations(&raw);
        assert_eq!(found.len(), 3);
        assert!(found.iter().any(|v| v.contains("agent_name")));
        assert!(found.iter().any(|v| v.contains("FETCH")));
        assert!(found.iter().any(|v| v.contains("intent_examples")));
    }

    #[test]
    fn test_rejects_unknown_auth_type() {
        let mut raw = sample();
        raw["authType"] = json!("Corporate");
        assert!(violations(&raw).iter().any(|v| v.contains("authType")));
    }

    #[test]
    fn test_rejects_non_object_parameters_type() {
        let mut raw = sample();
        raw["tools"][0]["schema"]["parameters"]["type"] = json!("array");
        assert!(violations(&raw)
            .iter()
            .any(|v| v.contains("parameters.type")));
    }

    #[test]
    fn test_rejects_required_field_without_property() {
        let mut raw = sample();
        raw["tools"][0]["schema"]["parameters"]["required"] = json!(["city", "country"]);
        assert!(violations(&raw).iter().any(|v| v.contains("country")));
    }

    #[test]
    fn test_rejects_invalid_url() {
        let mut raw = sample();
        raw["tools"][0]["http"]["url"] = json!("not a url");
        assert!(violations(&raw).iter().any(|v| v.contains("http.url")));
    }

    #[test]
    fn test_rejects_non_object_root() {
        assert!(validate(&json!([1, 2])).is_err());
    }
}
