use serde_json::{Map, Value};

use crate::core::{EnvError, EnvResult};

/// Options recognised by `modify`, in the order they are applied.
pub const MODIFY_OPTIONS: &[&str] = &["port", "plugins"];

/// Alternative spelling of `port` accepted from older tool callers.
const PORT_ALIAS: &str = "portti";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub plugins: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifyOptions {
    pub port: Option<u16>,
    pub plugins: Option<Vec<String>>,
}

impl ModifyOptions {
    pub fn is_empty(&self) -> bool {
        self.port.is_none() && self.plugins.as_ref().map_or(true, Vec::is_empty)
    }
}

impl CreateOptions {
    pub fn parse(raw: &str) -> EnvResult<Self> {
        let options = parse_object(raw)?;
        let plugins = match options.get("plugins") {
            Some(value) => parse_plugins(value)?,
            None => Vec::new(),
        };
        Ok(Self { plugins })
    }
}

impl ModifyOptions {
    pub fn parse(raw: &str) -> EnvResult<Self> {
        let options = parse_object(raw)?;
        let port = options
            .get("port")
            .or_else(|| options.get(PORT_ALIAS))
            .map(port_from_value)
            .transpose()?;
        let plugins = options.get("plugins").map(parse_plugins).transpose()?;
        Ok(Self { port, plugins })
    }
}

/// Parse the options bag. Blank input means no options.
fn parse_object(raw: &str) -> EnvResult<Map<String, Value>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(EnvError::invalid("could not parse options: expected a JSON object")),
        Err(e) => Err(EnvError::invalid(format!("could not parse options: {}", e))),
    }
}

/// Validate a host port supplied by a caller.
pub fn validate_port(port: u64) -> EnvResult<u16> {
    match u16::try_from(port) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(EnvError::invalid(format!(
            "port {} is out of range (1-65535)",
            port
        ))),
    }
}

/// Host port given as a JSON number or numeric string.
pub fn port_from_value(value: &Value) -> EnvResult<u16> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(port) => validate_port(port),
            None => Err(EnvError::invalid(format!("port {} is not a valid port number", n))),
        },
        Value::String(s) => match s.trim().parse::<u64>() {
            Ok(port) => validate_port(port),
            Err(_) => Err(EnvError::invalid(format!("port '{}' is not a number", s))),
        },
        other => Err(EnvError::invalid(format!("port must be a number, got {}", other))),
    }
}

fn parse_plugins(value: &Value) -> EnvResult<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| EnvError::invalid("plugins must be a list of plugin identifiers"))?;

    items
        .iter()
        .map(|item| {
            let plugin = item
                .as_str()
                .map(str::trim)
                .ok_or_else(|| EnvError::invalid(format!("plugin identifier {} is not a string", item)))?;
            if plugin.is_empty() || plugin.starts_with('-') || plugin.contains(char::is_whitespace) {
                return Err(EnvError::invalid(format!("invalid plugin identifier '{}'", plugin)));
            }
            Ok(plugin.to_string())
        })
        .collect()
}
