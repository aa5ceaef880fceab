use std::collections::BTreeMap;
use std::io::{self, BufRead, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::Result;
use insideview_contracts::chat::{parse_intent, Intent, STUDIO_HELP_COMMANDS};
use insideview_contracts::layout::spiral_layout;
use insideview_contracts::request::GenerationRequest;
use insideview_contracts::results::Part;
use insideview_engine::{load_reference_image, AuthGate, EngineConfig, StudioSession};
use serde_json::Value;

use crate::print_presets;

pub(crate) fn run_studio(config: EngineConfig) -> Result<i32> {
    let mut session = StudioSession::new(&config);
    println!("InsideView studio. Type /help for commands, anything else talks to the coach.");
    if !session.is_authenticated() {
        println!("No API key configured. Use /connect <key> or set GEMINI_API_KEY.");
    }
    print_request(session.request());

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match input.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        if !handle_intent(&mut session, &config, intent) {
            break;
        }
    }
    Ok(0)
}

/// Runs one studio command. Returns `false` when the user asked to leave.
fn handle_intent(session: &mut StudioSession, config: &EngineConfig, intent: Intent) -> bool {
    match intent.action.as_str() {
        "noop" => {}
        "quit" => return false,
        "help" => {
            for (usage, description) in STUDIO_HELP_COMMANDS {
                println!("  {usage:<44} {description}");
            }
        }
        "update_request" => match apply_settings(session.request_mut(), &intent.settings_update) {
            Ok(changes) => {
                for change in changes {
                    println!("{change}");
                }
            }
            Err(err) => println!("{err}"),
        },
        "apply_preset" => {
            let key = arg_string(&intent, "preset");
            if session.apply_preset(&key) {
                print_request(session.request());
            } else {
                println!("Unknown preset '{key}'. Try /presets.");
            }
        }
        "list_presets" => print_presets(),
        "set_reference_image" => {
            let path = arg_string(&intent, "path");
            if path.is_empty() {
                println!("/photo requires a path");
                return true;
            }
            match load_reference_image(&PathBuf::from(&path)) {
                Ok(data_uri) => {
                    if let Some(analysis) = session.set_reference_image(data_uri) {
                        println!(
                            "Detected {} ({}% confidence, {} view): {}",
                            analysis.canonical_name,
                            analysis.confidence_pct(),
                            analysis.viewpoint,
                            analysis.summary
                        );
                    }
                    if let Some(notice) = session.notice() {
                        println!("{notice}");
                    }
                    print_request(session.request());
                }
                Err(err) => {
                    tracing::warn!(path = %path, error = %format!("{err:#}"), "ignoring upload");
                    println!("Could not load {path}: {err:#}");
                }
            }
        }
        "generate" => {
            println!("Generating exploded view of {}...", session.request().object_name);
            match session.generate() {
                Ok(result) => {
                    println!(
                        "[{}] {} via {} ({} parts)",
                        short_id(&result.id),
                        result.params.object_name,
                        result.model,
                        result.parts.len()
                    );
                    for message in session.transcript() {
                        println!("coach: {}", message.text);
                    }
                }
                Err(err) => {
                    println!("{err}");
                    if let AuthGate::Unauthenticated { .. } = session.auth() {
                        println!("Use /connect <key> to reconnect.");
                    }
                }
            }
        }
        "show_prompt" => {
            let resolved = session.preview_prompt();
            let marker = if resolved.fallback { " (fallback)" } else { "" };
            println!("[{}]{marker}", resolved.template.label());
            println!("{}", resolved.text);
        }
        "show_parts" => print_parts(session.current_parts()),
        "show_history" => {
            if session.history().is_empty() {
                println!("No generations yet.");
            }
            for item in session.history().items() {
                println!(
                    "[{}] {:<28} {:<12} {} {}",
                    short_id(&item.id),
                    item.params.object_name,
                    item.params.category,
                    item.params.aspect_ratio,
                    item.params.detail_level
                );
            }
        }
        "show_stats" => {
            let stats = session.stats();
            println!("Total generated: {}", stats.total);
            match stats.most_used {
                Some(category) => println!(
                    "Most used category: {} ({}%)",
                    category.label(),
                    stats.most_used_pct
                ),
                None => println!("Most used category: -"),
            }
            if session.prompt_fallbacks() > 0 {
                println!("Fallback prompts: {}", session.prompt_fallbacks());
            }
        }
        "delete" => {
            let needle = arg_string(&intent, "id");
            let Some(id) = session.history().resolve_id(&needle).map(str::to_string) else {
                println!("No unique history entry matches '{needle}'.");
                return true;
            };
            if session.delete(&id) {
                println!("Deleted {}", short_id(&id));
            }
        }
        "export" => {
            let needle = arg_string(&intent, "id");
            let dir = PathBuf::from(arg_string(&intent, "dir"));
            let Some(id) = session.history().resolve_id(&needle).map(str::to_string) else {
                println!("No unique history entry matches '{needle}'.");
                return true;
            };
            match session.export_image(&id, &dir) {
                Ok(path) => println!("Saved {}", path.display()),
                Err(err) => println!("Export failed: {err:#}"),
            }
        }
        "connect" => {
            let key = arg_string(&intent, "api_key");
            match config.backend_with_key(&key) {
                Some(backend) => {
                    session.reconnect(backend);
                    println!("Connected.");
                }
                None => println!("/connect requires an API key"),
            }
        }
        "chat" => {
            let text = intent.prompt.unwrap_or_default();
            match session.send_chat(&text) {
                Some(reply) => println!("coach: {}", reply.text),
                None => println!("Generate something first to start the coach."),
            }
        }
        _ => {
            println!(
                "Unknown command /{}. Type /help for commands.",
                arg_string(&intent, "command")
            );
        }
    }
    true
}

fn arg_string(intent: &Intent, key: &str) -> String {
    intent
        .command_args
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Applies `/object`, `/category` style updates. Returns one line per change.
pub(crate) fn apply_settings(
    request: &mut GenerationRequest,
    update: &BTreeMap<String, Value>,
) -> Result<Vec<String>, String> {
    let mut changes = Vec::new();
    for (field, value) in update {
        let text = value.as_str().map(str::trim).unwrap_or_default();
        match field.as_str() {
            "object_name" => {
                if text.is_empty() {
                    return Err("/object requires a name".to_string());
                }
                request.object_name = text.to_string();
                changes.push(format!("Object: {}", request.object_name));
            }
            "category" => {
                request.category = text.parse()?;
                changes.push(format!("Category: {}", request.category.label()));
            }
            "mode" => {
                request.mode = text.parse()?;
                changes.push(format!("Mode: {}", request.mode));
            }
            "aspect_ratio" => {
                request.aspect_ratio = text.parse()?;
                changes.push(format!("Aspect ratio: {}", request.aspect_ratio));
            }
            "detail_level" => {
                request.detail_level = text.parse()?;
                changes.push(format!("Detail: {}", request.detail_level));
            }
            "user_hint" => {
                request.user_hint = value.as_str().map(str::to_string);
                match request.hint() {
                    Some(hint) => changes.push(format!("Hint: {hint}")),
                    None => changes.push("Hint cleared".to_string()),
                }
            }
            "show_labels" => {
                request.show_labels = toggled(value, request.show_labels);
                changes.push(format!("Labels: {}", on_off(request.show_labels)));
            }
            "is_kid_friendly" => {
                request.is_kid_friendly = toggled(value, request.is_kid_friendly);
                changes.push(format!("Kid-friendly: {}", on_off(request.is_kid_friendly)));
            }
            other => return Err(format!("unknown setting '{other}'")),
        }
    }
    Ok(changes)
}

fn toggled(value: &Value, current: bool) -> bool {
    value.as_bool().unwrap_or(!current)
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn print_request(request: &GenerationRequest) {
    println!(
        "Object: {} | {} | {} mode | {} | {} | labels {} | kid-friendly {}{}",
        if request.object_name.is_empty() { "-" } else { request.object_name.as_str() },
        request.category.label(),
        request.mode,
        request.aspect_ratio,
        request.detail_level,
        on_off(request.show_labels),
        on_off(request.is_kid_friendly),
        if request.has_reference_image() { " | photo loaded" } else { "" }
    );
}

pub(crate) fn print_parts(parts: &[Part]) {
    if parts.is_empty() {
        println!("No parts listed.");
        return;
    }
    for (index, part) in parts.iter().enumerate() {
        let node = spiral_layout(index, parts.len());
        println!(
            "{:>3}. {:<28} [{}] ({:+.1}, {:+.1}, {:+.1}) {}",
            part.id, part.name, part.system, node.x, node.y, node.z, part.description
        );
    }
}
