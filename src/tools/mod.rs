//! Tool surface for an agent dispatcher: named operations taking JSON
//! arguments and always answering with text.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{render, EnvError, EnvResult, Report};
use crate::environments::{port_from_value, EnvironmentManager};
use crate::monitoring::log_outcome;

/// Description of one tool, as advertised to the agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

fn name_only() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "description": "Environment name"}
        },
        "required": ["name"]
    })
}

fn no_arguments() -> Value {
    json!({"type": "object", "properties": {}})
}

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "env_create",
            description: "Create and start a WordPress environment (WordPress, database and a WP-CLI service). \
                          Options may list plugins to install, e.g. {\"plugins\": [\"woocommerce\"]}.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Environment name"},
                    "kind": {"type": "string", "description": "Environment type, e.g. 'wordpress'", "default": "wordpress"},
                    "port": {"type": "integer", "description": "Host port to publish, e.g. 8080"},
                    "options": {"description": "JSON options, as a string or an object"}
                },
                "required": ["name", "port"]
            }),
        },
        ToolSpec {
            name: "env_delete",
            description: "Delete an environment: remove its containers, volumes and files.",
            parameters: name_only(),
        },
        ToolSpec {
            name: "env_stop",
            description: "Stop the containers of an environment without removing them.",
            parameters: name_only(),
        },
        ToolSpec {
            name: "env_start",
            description: "Start the containers of an environment.",
            parameters: name_only(),
        },
        ToolSpec {
            name: "env_modify",
            description: "Modify an environment: change its port and/or install plugins, \
                          e.g. {\"port\": 8081, \"plugins\": [\"akismet\"]}.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Environment name"},
                    "options": {"description": "JSON options, as a string or an object"}
                },
                "required": ["name", "options"]
            }),
        },
        ToolSpec {
            name: "env_list",
            description: "List environments that have a definition, with their state.",
            parameters: no_arguments(),
        },
        ToolSpec {
            name: "env_list_all",
            description: "List every environment directory with display name, port, definition and state.",
            parameters: no_arguments(),
        },
        ToolSpec {
            name: "env_inspect",
            description: "Show the details of one environment.",
            parameters: name_only(),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct NameArgs {
    name: String,
}

fn default_kind() -> String {
    "wordpress".to_string()
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    name: String,
    #[serde(default = "default_kind")]
    kind: String,
    port: Value,
    #[serde(default)]
    options: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ModifyArgs {
    name: String,
    #[serde(default)]
    options: Option<Value>,
}

/// Options arrive either as JSON text or as an inline object.
fn options_text(options: Option<Value>) -> String {
    match options {
        None | Some(Value::Null) => "{}".to_string(),
        Some(Value::String(raw)) => raw,
        Some(other) => other.to_string(),
    }
}

fn decode<T: for<'de> Deserialize<'de>>(tool: &str, args: &Value) -> EnvResult<T> {
    let args = if args.is_null() { json!({}) } else { args.clone() };
    serde_json::from_value(args)
        .map_err(|e| EnvError::invalid(format!("invalid arguments for {}: {}", tool, e)))
}

/// Invoke a tool by name.
pub async fn call(manager: &EnvironmentManager, tool: &str, args: &Value) -> EnvResult<Report> {
    match tool {
        "env_create" => {
            let args: CreateArgs = decode(tool, args)?;
            let port = port_from_value(&args.port)?;
            manager
                .create(&args.name, &args.kind, port, &options_text(args.options))
                .await
        }
        "env_delete" => manager.delete(&decode::<NameArgs>(tool, args)?.name).await,
        "env_stop" => manager.stop(&decode::<NameArgs>(tool, args)?.name).await,
        "env_start" => manager.start(&decode::<NameArgs>(tool, args)?.name).await,
        "env_modify" => {
            let args: ModifyArgs = decode(tool, args)?;
            manager.modify(&args.name, &options_text(args.options)).await
        }
        "env_list" => manager.list_scoped().await,
        "env_list_all" => manager.list_all().await,
        "env_inspect" => manager.inspect(&decode::<NameArgs>(tool, args)?.name).await,
        other => Err(EnvError::invalid(format!(
            "unknown tool '{}'. Available: {}",
            other,
            tool_specs()
                .iter()
                .map(|spec| spec.name)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Invoke a tool and render its outcome as text for the caller.
pub async fn dispatch(manager: &EnvironmentManager, tool: &str, args: &Value) -> String {
    let outcome = call(manager, tool, args).await;
    let subject = args.get("name").and_then(Value::as_str).unwrap_or("-");
    log_outcome(tool, subject, &outcome);
    render(&outcome)
}

/// Decode tool arguments given as JSON text. Blank text means no arguments.
pub fn parse_args(raw: &str) -> EnvResult<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw)
        .map_err(|e| EnvError::invalid(format!("could not parse tool arguments: {}", e)))
}

/// Same as [`dispatch`], with the arguments still encoded as JSON text.
pub async fn dispatch_json(manager: &EnvironmentManager, tool: &str, raw_args: &str) -> String {
    match parse_args(raw_args) {
        Ok(args) => dispatch(manager, tool, &args).await,
        Err(e) => render(&Err(e)),
    }
}
