use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Typed view of the subset of the compose format the templates emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeFile {
    pub services: BTreeMap<String, ComposeService>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, Option<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl ComposeFile {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Result of rewriting a published port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEdit {
    pub previous: Option<u16>,
    pub changed: bool,
}

/// Point the host side of one port mapping of `service` at `new_port`.
///
/// The first mapping whose container side is `container_port` is edited; if
/// none targets it, the first mapping of the service is. Everything else in
/// the document is left alone. Short (`"8080:80"`, `"127.0.0.1:8080:80/tcp"`,
/// `80`) and long (`{target, published}`) syntaxes are understood.
///
/// Only the document's structure survives a later re-serialization; comments
/// and formatting of a hand-edited file are not preserved.
pub fn set_published_port(
    doc: &mut Value,
    service: &str,
    container_port: u16,
    new_port: u16,
) -> Result<PortEdit, String> {
    let ports = doc
        .get_mut("services")
        .and_then(|services| services.get_mut(service))
        .ok_or_else(|| format!("service '{}' is not defined", service))?
        .get_mut("ports")
        .and_then(Value::as_sequence_mut)
        .ok_or_else(|| format!("service '{}' publishes no ports", service))?;

    if ports.is_empty() {
        return Err(format!("service '{}' publishes no ports", service));
    }

    let index = ports
        .iter()
        .position(|entry| target_port(entry) == Some(container_port))
        .unwrap_or(0);
    let entry = &mut ports[index];

    let previous = published_port(entry);
    let replacement = match entry {
        Value::String(spec) => Value::String(rewrite_short_syntax(spec, new_port)?),
        Value::Number(target) => Value::String(format!("{}:{}", new_port, target)),
        Value::Mapping(long) => {
            let mut long = long.clone();
            long.insert(Value::from("published"), Value::Number(u64::from(new_port).into()));
            Value::Mapping(long)
        }
        other => return Err(format!("unrecognised port mapping {:?}", other)),
    };

    let changed = *entry != replacement;
    *entry = replacement;
    Ok(PortEdit { previous, changed })
}

fn split_short_syntax(spec: &str) -> (Vec<&str>, &str) {
    let (mapping, protocol) = match spec.find('/') {
        Some(idx) => spec.split_at(idx),
        None => (spec, ""),
    };
    (mapping.split(':').collect(), protocol)
}

fn rewrite_short_syntax(spec: &str, new_port: u16) -> Result<String, String> {
    let (parts, protocol) = split_short_syntax(spec);
    match parts.as_slice() {
        [target] => Ok(format!("{}:{}{}", new_port, target, protocol)),
        [_, target] => Ok(format!("{}:{}{}", new_port, target, protocol)),
        [ip, _, target] => Ok(format!("{}:{}:{}{}", ip, new_port, target, protocol)),
        _ => Err(format!("unrecognised port mapping '{}'", spec)),
    }
}

fn target_port(entry: &Value) -> Option<u16> {
    match entry {
        Value::String(spec) => split_short_syntax(spec).0.last()?.parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::Mapping(long) => port_value(long, "target"),
        _ => None,
    }
}

/// Host port of a mapping, when it names a single one.
pub fn published_port(entry: &Value) -> Option<u16> {
    match entry {
        Value::String(spec) => {
            let (parts, _) = split_short_syntax(spec);
            match parts.as_slice() {
                [host, _] | [_, host, _] => host.parse().ok(),
                _ => None,
            }
        }
        Value::Mapping(long) => port_value(long, "published"),
        _ => None,
    }
}

fn port_value(long: &Mapping, key: &str) -> Option<u16> {
    match long.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
