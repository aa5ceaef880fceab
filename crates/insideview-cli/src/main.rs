use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use insideview_contracts::presets::{find_preset, PRESETS};
use insideview_contracts::prompt::resolve_prompt;
use insideview_contracts::request::{
    AspectRatio, Category, DetailLevel, GenerationMode, GenerationRequest,
};
use insideview_engine::{load_reference_image, DispatchError, Dispatcher, EngineConfig, StudioSession};
use tracing_subscriber::EnvFilter;

mod studio;

#[derive(Debug, Parser)]
#[command(name = "insideview", version, about = "Exploded-view illustrations from a name or a photo")]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one exploded view and save it.
    Generate(GenerateArgs),
    /// Print the resolved prompt without calling the service.
    Prompt(RequestArgs),
    /// Analyze a photo and print the auto-fill result.
    Analyze(AnalyzeArgs),
    /// Interactive studio with the design coach.
    Studio,
    /// List built-in presets.
    Presets,
}

#[derive(Debug, Args)]
struct EngineArgs {
    #[arg(long, global = true)]
    api_key: Option<String>,
    #[arg(long, global = true)]
    api_base: Option<String>,
    #[arg(long, global = true)]
    dryrun: bool,
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[arg(long, global = true)]
    image_model: Option<String>,
    #[arg(long, global = true)]
    text_model: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct RequestArgs {
    #[arg(long)]
    object: Option<String>,
    #[arg(long)]
    preset: Option<String>,
    #[arg(long)]
    category: Option<Category>,
    #[arg(long)]
    mode: Option<GenerationMode>,
    #[arg(long)]
    aspect: Option<AspectRatio>,
    #[arg(long)]
    detail: Option<DetailLevel>,
    #[arg(long)]
    no_labels: bool,
    #[arg(long)]
    no_kid_friendly: bool,
    #[arg(long)]
    hint: Option<String>,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[command(flatten)]
    request: RequestArgs,
    /// Reference photo; switches to photo mode.
    #[arg(long)]
    photo: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[arg(long)]
    photo: PathBuf,
    #[arg(long)]
    hint: Option<String>,
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("insideview error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = engine_config(&cli.engine);
    match cli.command {
        Command::Generate(args) => run_generate(&config, args),
        Command::Prompt(args) => run_prompt(args),
        Command::Analyze(args) => run_analyze(&config, args),
        Command::Studio => studio::run_studio(config),
        Command::Presets => {
            print_presets();
            Ok(0)
        }
    }
}

fn engine_config(args: &EngineArgs) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(key) = args.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty()) {
        config.api_key = Some(key.to_string());
    }
    if let Some(base) = args.api_base.as_deref().map(str::trim).filter(|base| !base.is_empty()) {
        config.api_base = base.trim_end_matches('/').to_string();
    }
    if args.image_model.is_some() {
        config.image_model = args.image_model.clone();
    }
    if args.text_model.is_some() {
        config.text_model = args.text_model.clone();
    }
    config.dryrun = args.dryrun;
    config.events_path = args.events.clone();
    config
}

/// Layers the explicit flags over `request`; a preset goes first so flags win.
fn apply_request_args(request: &mut GenerationRequest, args: &RequestArgs) -> Result<()> {
    if let Some(key) = args.preset.as_deref() {
        let preset = find_preset(key).with_context(|| format!("unknown preset '{key}'"))?;
        preset.apply(request);
    }
    if let Some(object) = args.object.as_deref() {
        request.object_name = object.trim().to_string();
    }
    if let Some(category) = args.category {
        request.category = category;
    }
    if let Some(mode) = args.mode {
        request.mode = mode;
    }
    if let Some(aspect) = args.aspect {
        request.aspect_ratio = aspect;
    }
    if let Some(detail) = args.detail {
        request.detail_level = detail;
    }
    if args.no_labels {
        request.show_labels = false;
    }
    if args.no_kid_friendly {
        request.is_kid_friendly = false;
    }
    if let Some(hint) = args.hint.as_deref() {
        request.user_hint = Some(hint.to_string());
    }
    Ok(())
}

fn exit_code_for(err: &DispatchError) -> i32 {
    match err {
        DispatchError::Validation(_) => 2,
        DispatchError::Authorization { .. } => 3,
        DispatchError::Generation(_) | DispatchError::Busy => 1,
    }
}

fn run_generate(config: &EngineConfig, args: GenerateArgs) -> Result<i32> {
    let mut session = StudioSession::new(config);
    if !session.is_authenticated() {
        eprintln!("No API key configured. Set GEMINI_API_KEY, pass --api-key, or use --dryrun.");
        return Ok(3);
    }

    apply_request_args(session.request_mut(), &args.request)?;
    if let Some(photo) = args.photo.as_deref() {
        session.request_mut().mode = GenerationMode::Photo;
        match load_reference_image(photo) {
            Ok(data_uri) => {
                if let Some(analysis) = session.set_reference_image(data_uri) {
                    println!(
                        "Analysis: {} ({}% confidence) {}",
                        analysis.canonical_name,
                        analysis.confidence_pct(),
                        analysis.summary
                    );
                }
                if let Some(notice) = session.notice() {
                    eprintln!("{notice}");
                }
                // explicit flags beat auto-fill
                apply_request_args(session.request_mut(), &args.request)?;
                session.request_mut().mode = GenerationMode::Photo;
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "ignoring reference photo");
            }
        }
    }

    let result = match session.generate() {
        Ok(result) => result.clone(),
        Err(err) => {
            eprintln!("{err}");
            return Ok(exit_code_for(&err));
        }
    };
    let path = session.export_image(&result.id, &args.out)?;
    println!("Saved {} ({})", path.display(), result.model);
    println!("Prompt: {}", result.prompt_used);
    studio::print_parts(&result.parts);
    Ok(0)
}

fn run_prompt(args: RequestArgs) -> Result<i32> {
    let mut request = GenerationRequest::default();
    apply_request_args(&mut request, &args)?;
    let resolved = resolve_prompt(&request);
    println!("template: {}", resolved.template.label());
    if resolved.fallback {
        println!("fallback: true");
    }
    println!("{}", resolved.text);
    Ok(0)
}

fn run_analyze(config: &EngineConfig, args: AnalyzeArgs) -> Result<i32> {
    let Some(backend) = config.backend() else {
        eprintln!("No API key configured. Set GEMINI_API_KEY, pass --api-key, or use --dryrun.");
        return Ok(3);
    };
    let image = load_reference_image(&args.photo)?;
    let dispatcher = Dispatcher::new(backend, config.selector())
        .with_models(config.image_model.clone(), config.text_model.clone());
    match dispatcher.analyze_image(&image, args.hint.as_deref()) {
        Some(analysis) => {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(0)
        }
        None => {
            eprintln!("Could not analyze image.");
            Ok(1)
        }
    }
}

fn print_presets() {
    for preset in PRESETS {
        println!(
            "{:<4} {:<18} {} [{} {} {}]",
            preset.id,
            preset.title,
            preset.description,
            preset.category,
            preset.aspect_ratio,
            preset.detail_level
        );
    }
}
