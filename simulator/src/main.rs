//! PesoPro Simulator
//!
//! Drives converter sessions against a simulated market with a manual clock
//! and fault injection.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pesopro_chart::{ChartConfig, CurveBuilder};
use pesopro_fx::{FileStore, FxServiceConfig, MemoryStore, RefreshPolicy, SharedStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod clock;
mod controller;
mod market;
mod metrics;
mod scenario;
mod svg;

use clock::SimClock;
use controller::SessionController;
use market::MarketConfig;
use metrics::SimulationMetrics;
use scenario::Scenario;

/// PesoPro Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "PesoPro converter session simulator")]
struct Args {
    /// Scenario name or path to a JSON scenario; all built-ins when omitted
    #[arg(short, long)]
    scenario: Option<String>,

    /// Simulated start date (YYYY-MM-DD); the clock starts at noon UTC
    #[arg(long)]
    start_date: Option<String>,

    /// Persist caches to this file instead of memory
    #[arg(long)]
    store: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Market mid rate the walk starts from
    #[arg(long, default_value = "17.05")]
    base_rate: f64,

    /// Maximum relative move per quote
    #[arg(long, default_value = "0.002")]
    volatility: f64,

    /// Probability of a transient provider error
    #[arg(long, default_value = "0.0")]
    failure_rate: f64,

    /// Refresh policy (when-stale, always); overrides the environment
    #[arg(long)]
    policy: Option<RefreshPolicy>,

    /// Extra keypad keys typed after the scenario
    #[arg(long)]
    keys: Option<String>,

    /// Write the final chart of the last session as SVG
    #[arg(long)]
    svg_out: Option<PathBuf>,

    /// Chart width
    #[arg(long, default_value = "300")]
    width: f64,

    /// Chart height
    #[arg(long, default_value = "180")]
    height: f64,

    /// Emit JSON logs
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    if args.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting PesoPro Simulator");

    let mut config = FxServiceConfig::from_env()?;
    if let Some(policy) = args.policy {
        config.refresh_policy = policy;
    }
    config.validate()?;

    let chart_config = ChartConfig::with_viewport(args.width, args.height, ChartConfig::default().padding)?;
    let builder = CurveBuilder::new(chart_config)?;

    let store: SharedStore = match &args.store {
        Some(path) => Arc::new(
            FileStore::open(path).with_context(|| format!("opening store {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let scenarios = match &args.scenario {
        Some(name) => vec![Scenario::load(name)?],
        None => Scenario::BUILT_IN
            .iter()
            .map(|name| Scenario::load(name))
            .collect::<anyhow::Result<Vec<_>>>()?,
    };

    let start = match &args.start_date {
        Some(raw) => SimClock::noon_on(pesopro_common::parse_date(raw)?),
        None => SimClock::default_start(),
    };
    info!(%start, "Simulated clock start");

    let market_config = MarketConfig {
        seed: args.seed,
        base_rate: args.base_rate,
        volatility: args.volatility,
        failure_rate: args.failure_rate,
    };

    let mut totals = SimulationMetrics::new();
    let mut last_session = None;
    for scenario in &scenarios {
        let mut session = SessionController::new(
            store.clone(),
            config.clone(),
            market_config.clone(),
            builder.clone(),
            Arc::new(SimClock::new(start)),
        )?;
        session.run_scenario(scenario).await?;
        totals.merge(session.metrics());
        last_session = Some(session);
    }

    if let Some(session) = last_session.as_mut() {
        if let Some(keys) = &args.keys {
            session
                .execute_step(&scenario::ScenarioStep::Keys { keys: keys.clone() })
                .await?;
        }

        let amounts = session.engine().display();
        info!(base = %amounts.base, quote = %amounts.quote, "Final converter state");
        for (usd, mxn) in pesopro_fx::conversion::quick_table(session.engine().rate()) {
            info!(usd, mxn, "Quick table");
        }

        if let Some(path) = &args.svg_out {
            let svg = svg::render(session.chart(), &session.marker());
            std::fs::write(path, svg).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Wrote chart");
        }
    }

    info!("Simulation complete");
    info!(metrics = %serde_json::to_string(&totals)?, "Totals");
    info!("Cache hit ratio: {:.2}", totals.cache_hit_ratio());

    if totals.assertions_failed > 0 {
        warn!(failed = totals.assertions_failed, "Some assertions failed");
        anyhow::bail!("{} assertion(s) failed", totals.assertions_failed);
    }

    Ok(())
}
