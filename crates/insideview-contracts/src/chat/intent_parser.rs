use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, SettingSpec, DELETE_COMMAND, EXPORT_COMMAND, NO_ARG_COMMANDS, RAW_ARG_COMMANDS,
    SETTING_COMMANDS, SINGLE_PATH_COMMANDS, TOGGLE_COMMANDS,
};

/// One parsed line of studio input.
///
/// Slash commands map to an `action` plus either `settings_update` (request
/// fields to change) or `command_args`. Anything else is a coach message
/// carried in `prompt`.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub settings_update: BTreeMap<String, Value>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            settings_update: BTreeMap::new(),
            command_args: BTreeMap::new(),
        }
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn find_field(command: &str, specs: &[SettingSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.field)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

/// `on`/`off` style toggles; an empty argument flips the current value.
fn parse_toggle(arg: &str) -> Value {
    match arg.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Value::Bool(true),
        "off" | "false" | "no" | "0" => Value::Bool(false),
        _ => Value::String("toggle".to_string()),
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(field) = find_field(&command, SETTING_COMMANDS) {
                let mut intent = Intent::new("update_request", text);
                let value = if field == "user_hint" && arg.is_empty() {
                    Value::Null
                } else {
                    Value::String(arg.to_string())
                };
                intent.settings_update.insert(field.to_string(), value);
                return intent;
            }

            if let Some(field) = find_field(&command, TOGGLE_COMMANDS) {
                let mut intent = Intent::new("update_request", text);
                intent
                    .settings_update
                    .insert(field.to_string(), parse_toggle(arg));
                return intent;
            }

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                let key = if action == "connect" { "api_key" } else { "preset" };
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert(key.to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent.command_args.insert(
                    "path".to_string(),
                    Value::String(parse_single_path_arg(arg)),
                );
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            if command == DELETE_COMMAND.command {
                let mut intent = Intent::new(DELETE_COMMAND.action, text);
                intent
                    .command_args
                    .insert("id".to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if command == EXPORT_COMMAND.command {
                let mut intent = Intent::new(EXPORT_COMMAND.action, text);
                let mut parts = parse_path_args(arg).into_iter();
                intent.command_args.insert(
                    "id".to_string(),
                    Value::String(parts.next().unwrap_or_default()),
                );
                let rest: Vec<String> = parts.collect();
                intent.command_args.insert(
                    "dir".to_string(),
                    if rest.is_empty() {
                        Value::String(".".to_string())
                    } else {
                        Value::String(rest.join(" "))
                    },
                );
                return intent;
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("chat", text);
    intent.prompt = Some(raw_trimmed.to_string());
    intent
}
