use clap::Parser;
use log::{info, warn};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use smart_lookup_lib::{
    Difficulty, InputEvent, KnownTerms, LookupService, LookupSessionState, LookupSettings,
    RemoteLookupService, SelectionRect, SmartLookup, StaticSelection, TermGlossary, Viewport,
};

/// Simulate selecting phrases in a document and print the resulting popup
#[derive(Parser, Debug)]
#[command(name = "smart-lookup", version, about)]
struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Viewport size as WIDTHxHEIGHT
    #[arg(long, default_value = "1280x800", value_parser = parse_viewport)]
    viewport: Viewport,

    /// simple, detailed or expert (overrides the configured default)
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Selected phrases, looked up in order
    #[arg(required = true)]
    phrases: Vec<String>,
}

fn parse_viewport(value: &str) -> Result<Viewport, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width: f64 = width.trim().parse().map_err(|_| format!("invalid width '{}'", width))?;
    let height: f64 = height.trim().parse().map_err(|_| format!("invalid height '{}'", height))?;
    if width <= 0.0 || height <= 0.0 {
        return Err("viewport dimensions must be positive".to_string());
    }
    Ok(Viewport::new(width, height))
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        cli.log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = &cli.log_file {
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), File::create(path)?));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

async fn load_settings(cli: &Cli) -> LookupSettings {
    let loaded = match &cli.settings {
        Some(path) => LookupSettings::load_from(path).await,
        None => LookupSettings::load().await,
    };
    loaded.unwrap_or_else(|e| {
        warn!("Failed to load settings, using defaults: {}", e);
        LookupSettings::default()
    })
}

async fn load_glossary(settings: &LookupSettings) -> TermGlossary {
    let mut glossary = TermGlossary::builtin();
    if let Some(path) = &settings.glossary_path {
        match TermGlossary::load(path).await {
            Ok(extra) => glossary.extend(extra),
            Err(e) => warn!("Failed to load glossary {}: {}", path.display(), e),
        }
    }
    glossary
}

/// Wait for the session to react to a selection, then for it to leave its
/// transient states.
///
/// `rx` must be subscribed before the selection event is sent. A selection
/// that is not eligible produces no change within `react`; the current state
/// is the answer then.
async fn wait_for_settled(
    mut rx: watch::Receiver<LookupSessionState>,
    react: Duration,
    limit: Duration,
) -> LookupSessionState {
    rx.borrow_and_update();
    if !matches!(tokio::time::timeout(react, rx.changed()).await, Ok(Ok(()))) {
        return rx.borrow().clone();
    }

    let settled = tokio::time::timeout(limit, async {
        loop {
            let state = rx.borrow_and_update().clone();
            if !matches!(
                state,
                LookupSessionState::PendingDebounce { .. } | LookupSessionState::Loading { .. }
            ) {
                return state;
            }
            if rx.changed().await.is_err() {
                return state;
            }
        }
    })
    .await;

    settled.unwrap_or_else(|_| {
        warn!("Session did not settle within {:?}", limit);
        rx.borrow().clone()
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let settings = load_settings(&cli).await;
    let glossary = Arc::new(load_glossary(&settings).await);
    let known: Arc<dyn KnownTerms> = glossary.clone();
    let service: Arc<dyn LookupService> = match &settings.remote_base_url {
        Some(base_url) => {
            info!("Using remote lookup at {}", base_url);
            Arc::new(RemoteLookupService::new(base_url.as_str()))
        }
        None => glossary,
    };

    let host = StaticSelection::new();
    let lookup = SmartLookup::new(service, known, Arc::new(host.clone()), &settings)?;
    if let Some(difficulty) = cli.difficulty {
        lookup.set_difficulty(difficulty);
    }
    lookup.handle_event(InputEvent::Resize(cli.viewport));

    // Selection sits in the middle of the viewport
    let rect = SelectionRect::new(cli.viewport.height / 2.0, cli.viewport.width / 2.0 - 40.0, 80.0, 20.0);
    let budget = settings.settle_delay()
        + settings.debounce()
        + settings.lookup_timeout().unwrap_or(Duration::from_secs(30))
        + Duration::from_secs(1);

    for phrase in &cli.phrases {
        host.set_text(phrase, rect);
        let rx = lookup.subscribe();
        lookup.handle_event(InputEvent::DoubleClick);

        let react = settings.settle_delay() + Duration::from_millis(50);
        let state = wait_for_settled(rx, react, budget).await;
        let output = serde_json::json!({
            "selection": phrase,
            "state": state.name(),
            "popup": lookup.current_view(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    lookup.shutdown();
    Ok(())
}
