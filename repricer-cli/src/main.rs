//! Repricer CLI
//!
//! Drives the repricing controller offline against scripted screens and snapshot dumps.
//!
//! Usage from workspace root:
//!   cargo run --bin repricer -- replay scenario.yaml              # Run a scripted listing edit
//!   cargo run --bin repricer -- replay scenario.yaml -p terminate # Same, with the terminate preset
//!   cargo run --bin repricer -- config --config overrides.yaml    # Print the effective config
//!   cargo run --bin repricer -- locate snapshot.json              # Run the locators on a dump
//!   cargo run --bin repricer -- locate snapshot.json -s numeric   # Plus an ad-hoc selector

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use repricer::locator::ElementLocators;
use repricer::platforms::scripted::{RecordedAction, Scenario, ScriptedHost};
use repricer::scroll::find_scrollable;
use repricer::{
    AccessibilityEvent, AutomationConfig, AutomationService, Locator, NodeHandle, Phase,
    Selector, SessionStatus, UINode,
};

#[derive(Parser)]
#[command(name = "repricer")]
#[command(about = "Accessibility-driven listing price automation")]
#[command(
    long_about = "Repricer CLI replays the listing-edit workflow against scripted screens and inspects snapshot dumps with the same locators the controller uses."
)]
struct Cli {
    /// Verbose output
    #[clap(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
#[clap(rename_all = "lower")]
enum Preset {
    /// Ten forced scrolls, then passive search
    #[default]
    Fallback,
    /// Fifteen forced scrolls, then give up
    Terminate,
}

impl Preset {
    fn config(self) -> AutomationConfig {
        match self {
            Preset::Fallback => AutomationConfig::fallback_search(),
            Preset::Terminate => AutomationConfig::terminate_on_exhaustion(),
        }
    }
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Preset the configuration file is layered over
    #[clap(long, short, value_enum, default_value_t = Preset::Fallback)]
    preset: Preset,

    /// Configuration overrides (JSON or YAML)
    #[clap(long, short, env = "REPRICER_CONFIG")]
    config: Option<String>,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Scenario file (JSON or YAML)
    scenario: String,

    #[clap(flatten)]
    config: ConfigArgs,

    /// Give up when the session has not finished after this many seconds
    #[clap(long, default_value_t = 120)]
    timeout_secs: u64,
}

#[derive(Parser, Debug)]
struct LocateArgs {
    /// Snapshot dump: one serialized tree root (JSON or YAML)
    snapshot: String,

    /// Extra selector to evaluate, e.g. "class:android.widget.EditText && enabled:true"
    #[clap(long, short)]
    selector: Option<String>,

    #[clap(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the automation against a scripted scenario and print what it did
    Replay(ReplayArgs),
    /// Print the validated effective configuration
    Config(ConfigArgs),
    /// Run every locator over a snapshot dump
    Locate(LocateArgs),
}

#[derive(Serialize)]
struct ReplayReport {
    finished: bool,
    status: SessionStatus,
    final_screen: String,
    actions: Vec<RecordedAction>,
}

#[derive(Serialize)]
struct LocateReport {
    node_count: usize,
    price: Option<i64>,
    price_input: Option<NodeHandle>,
    edit_button: Option<NodeHandle>,
    save_button: Option<NodeHandle>,
    scroll_container: Option<NodeHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector_matches: Option<Vec<NodeHandle>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Replay(args) => replay(args).await,
        Commands::Config(args) => {
            let config = load_config(&args).await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Locate(args) => locate(args).await,
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        // Reports go to stdout, logs stay on stderr
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

async fn replay(args: ReplayArgs) -> Result<()> {
    let config = load_config(&args.config).await?;
    let content = read_local_file(&args.scenario).await?;
    let scenario: Scenario = parse_document(&content)
        .with_context(|| format!("Failed to parse scenario from {}", args.scenario))?;
    scenario
        .validate()
        .with_context(|| "Scenario validation failed")?;

    if scenario.package != config.target_package {
        warn!(
            scenario = %scenario.package,
            target = %config.target_package,
            "scenario package differs from the target package; its events will be ignored"
        );
    }

    let back_delay = config.back_delay();
    let host = Arc::new(ScriptedHost::new(scenario)?);
    let (handle, join) = AutomationService::spawn(host.clone(), config)?;

    let sink = handle.clone();
    host.set_event_sink(move |event| {
        if let Err(e) = sink.notify(event) {
            debug!("dropping host event: {}", e);
        }
    });

    info!(scenario = %args.scenario, "starting replay");
    handle.notify(AccessibilityEvent::window_state_changed(host.package()))?;

    let outcome = handle
        .wait_for_phase(Phase::Finished, Duration::from_secs(args.timeout_secs))
        .await;
    let finished = match &outcome {
        Ok(status) => {
            info!(?status, "session finished");
            // Let the deferred back navigation run
            tokio::time::sleep(back_delay + Duration::from_millis(100)).await;
            true
        }
        Err(e) => {
            warn!("replay did not finish: {}", e);
            false
        }
    };

    let status = handle.status();
    handle.shutdown()?;
    join.await.context("automation service task failed")?;

    let report = ReplayReport {
        finished,
        status,
        final_screen: host.current_screen(),
        actions: host.actions(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    outcome.map(|_| ()).map_err(Into::into)
}

async fn locate(args: LocateArgs) -> Result<()> {
    let config = load_config(&args.config).await?;
    let content = read_local_file(&args.snapshot).await?;
    let root: UINode = parse_document(&content)
        .with_context(|| format!("Failed to parse snapshot from {}", args.snapshot))?;

    let locators = ElementLocators::from_config(&config)?;
    let selector_matches = match args.selector.as_deref() {
        Some(raw) => {
            let selector = Selector::from(raw);
            selector.validate()?;
            Some(Locator::new(selector).all(&root))
        }
        None => None,
    };
    let report = LocateReport {
        node_count: root.node_count(),
        price: locators.find_price(&root),
        price_input: locators.find_price_input(&root),
        edit_button: locators.find_edit_button(&root),
        save_button: locators.find_save_button(&root),
        scroll_container: find_scrollable(&root),
        selector_matches,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// The preset, with the optional override file merged over it field by field.
async fn load_config(args: &ConfigArgs) -> Result<AutomationConfig> {
    let base = args.preset.config();
    let Some(path) = &args.config else {
        base.validate()?;
        return Ok(base);
    };

    let content = read_local_file(path).await?;
    let overrides: serde_json::Value = parse_document(&content)
        .with_context(|| format!("Failed to parse configuration from {path}"))?;
    let serde_json::Value::Object(overrides) = overrides else {
        anyhow::bail!("Configuration in {path} must be a mapping");
    };

    let mut merged = serde_json::to_value(&base)?;
    if let Some(fields) = merged.as_object_mut() {
        fields.extend(overrides);
    }
    let config = AutomationConfig::from_json_str(&merged.to_string())
        .with_context(|| format!("Invalid configuration in {path}"))?;
    info!(path = %path, preset = ?args.preset, "loaded configuration");
    Ok(config)
}

async fn read_local_file(path: &str) -> Result<String> {
    use tokio::fs;

    let p = Path::new(path);
    if !p.exists() {
        return Err(anyhow::anyhow!("File not found: {}", p.display()));
    }
    if !p.is_file() {
        return Err(anyhow::anyhow!("Not a file: {}", p.display()));
    }

    fs::read_to_string(p).await.map_err(|e| e.into())
}

/// JSON first, then YAML.
fn parse_document<T: serde::de::DeserializeOwned>(content: &str) -> Result<T> {
    match serde_json::from_str::<T>(content) {
        Ok(value) => Ok(value),
        Err(json_err) => serde_yaml::from_str::<T>(content).map_err(|yaml_err| {
            anyhow::anyhow!("not valid JSON ({json_err}) or YAML ({yaml_err})")
        }),
    }
}
