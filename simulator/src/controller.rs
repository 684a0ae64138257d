//! Session controller: wires the services to the simulated market and
//! drives scenarios step by step.

use std::sync::Arc;

use chrono::Duration;
use pesopro_chart::{ActiveMarker, ChartGeometry, ClientRect, CurveBuilder};
use pesopro_common::time::format_date;
use pesopro_common::HistoryPoint;
use pesopro_fx::{
    CachedRate, ConversionEngine, ConverterEvent, FxService, FxServiceConfig, KeypadKey,
    SharedStore,
};
use pesopro_fx::format::DisplayTier;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clock::SimClock;
use crate::market::{MarketConfig, SimulatedMarket};
use crate::metrics::SimulationMetrics;
use crate::scenario::{AssertCondition, Scenario, ScenarioStep};

/// One simulated converter session.
pub struct SessionController {
    session_id: Uuid,
    clock: Arc<SimClock>,
    market: Arc<SimulatedMarket>,
    service: FxService,
    builder: CurveBuilder,
    engine: ConversionEngine,
    last_rate: Option<CachedRate>,
    history: Vec<HistoryPoint>,
    chart: ChartGeometry,
    hovered: Option<usize>,
    metrics: SimulationMetrics,
}

impl SessionController {
    /// Create a controller. The converter starts on the fallback rate until
    /// the first load.
    pub fn new(
        store: SharedStore,
        config: FxServiceConfig,
        market_config: MarketConfig,
        builder: CurveBuilder,
        clock: Arc<SimClock>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let market = Arc::new(SimulatedMarket::new(market_config, clock.clone()));
        let service = FxService::new(market.clone(), market.clone(), store, config);

        let initial = service.snapshot_rate(clock.now());
        let engine = ConversionEngine::new(initial.value)?;
        let chart = builder.build(&[], initial.value, clock.today());

        Ok(Self {
            session_id: Uuid::new_v4(),
            clock,
            market,
            service,
            builder,
            engine,
            last_rate: None,
            history: Vec::new(),
            chart,
            hovered: None,
            metrics: SimulationMetrics::new(),
        })
    }

    /// Run every step of `scenario`. Failed assertions are counted, not fatal.
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> anyhow::Result<()> {
        let span = info_span!("scenario", name = %scenario.name, session = %self.session_id);
        async {
            info!(description = %scenario.description, steps = scenario.steps.len(), "Running scenario");
            for step in &scenario.steps {
                self.execute_step(step).await?;
            }
            info!(
                passed = self.metrics.assertions_passed,
                failed = self.metrics.assertions_failed,
                "Scenario finished"
            );
            Ok::<(), anyhow::Error>(())
        }
        .instrument(span)
        .await
    }

    /// Execute a single scenario step.
    pub async fn execute_step(&mut self, step: &ScenarioStep) -> anyhow::Result<()> {
        match step {
            ScenarioStep::AdvanceHours { hours } => {
                let now = self.clock.advance(Duration::hours(*hours));
                info!(hours, %now, "Advanced clock");
            }
            ScenarioStep::ClearCache => {
                self.service.rate_cache().clear()?;
                self.service.history_cache().clear()?;
                info!("Cleared caches");
            }
            ScenarioStep::LoadRate => self.load_rate().await?,
            ScenarioStep::LoadHistory => self.load_history().await,
            ScenarioStep::Keys { keys } => {
                for key in KeypadKey::parse_sequence(keys)? {
                    let accepted = self.engine.apply(ConverterEvent::Key(key))?;
                    self.metrics.record_key(accepted);
                }
                let amounts = self.engine.display();
                info!(
                    keys = %keys,
                    base = %amounts.base,
                    quote = %amounts.quote,
                    base_tier = ?DisplayTier::for_text(&amounts.base),
                    quote_tier = ?DisplayTier::for_text(&amounts.quote),
                    "Typed keys"
                );
            }
            ScenarioStep::Switch { side } => {
                self.engine.apply(ConverterEvent::SwitchSide(*side))?;
                info!(?side, raw = self.engine.raw_input(), "Switched active side");
            }
            ScenarioStep::Hover { client_x } => {
                self.hovered = client_x.map(|x| {
                    self.chart
                        .index_at(x, ClientRect::new(0.0, self.chart.config.width))
                });
                info!(hovered = ?self.hovered, label = %self.marker().tooltip().label, "Pointer moved");
            }
            ScenarioStep::InjectFault { fault } => self.market.inject(*fault),
            ScenarioStep::ClearFault => self.market.clear_faults(),
            ScenarioStep::Assert { condition } => {
                let (passed, actual) = self.check(condition);
                self.metrics.record_assertion(passed);
                if passed {
                    info!(?condition, "Assertion passed");
                } else {
                    warn!(?condition, actual = %actual, "Assertion failed");
                }
            }
        }

        Ok(())
    }

    /// Show what is at hand immediately, then apply the resolved rate.
    async fn load_rate(&mut self) -> anyhow::Result<()> {
        let now = self.clock.now();

        let shown = self.service.snapshot_rate(now);
        self.engine.apply(ConverterEvent::RateUpdated(shown.value))?;

        let resolved = self.service.resolve_rate(now).await;
        self.engine.apply(ConverterEvent::RateUpdated(resolved.value))?;
        self.metrics.record_rate(resolved.source);
        self.last_rate = Some(resolved);
        self.rebuild_chart();

        info!(
            rate = resolved.value,
            source = ?resolved.source,
            inverse = %self.engine.inverse_rate_label(),
            "Rate loaded"
        );
        Ok(())
    }

    async fn load_history(&mut self) {
        let history = self
            .service
            .resolve_history(self.clock.today(), self.clock.now())
            .await;
        self.metrics.record_history(history.len());
        self.history = history;
        self.rebuild_chart();

        let first = self.history.first().map(|p| format_date(p.date));
        let last = self.history.last().map(|p| format_date(p.date));
        info!(
            points = self.history.len(),
            first = ?first,
            last = ?last,
            low = %self.chart.stats.low_label(),
            high = %self.chart.stats.high_label(),
            trend = %self.chart.stats.trend_label(),
            "History loaded"
        );
    }

    fn rebuild_chart(&mut self) {
        self.chart = self
            .builder
            .build(&self.history, self.engine.rate(), self.clock.today());
    }

    fn check(&self, condition: &AssertCondition) -> (bool, String) {
        match condition {
            AssertCondition::RateSource { source } => {
                let actual = self.last_rate.map(|r| r.source);
                (actual == Some(*source), format!("{:?}", actual))
            }
            AssertCondition::RateEquals { value } => {
                let actual = self.last_rate.map(|r| r.value);
                let passed = actual.map(|v| (v - value).abs() < 1e-9).unwrap_or(false);
                (passed, format!("{:?}", actual))
            }
            AssertCondition::InputDisplay { text } => {
                let amounts = self.engine.display();
                let actual = match self.engine.active_side() {
                    pesopro_fx::Side::Base => amounts.base,
                    pesopro_fx::Side::Quote => amounts.quote,
                };
                (&actual == text, actual)
            }
            AssertCondition::ActiveSide { side } => {
                let actual = self.engine.active_side();
                (actual == *side, format!("{:?}", actual))
            }
            AssertCondition::HistoryLen { points } => {
                (self.history.len() == *points, self.history.len().to_string())
            }
            AssertCondition::HistoryAtLeast { points } => {
                (self.history.len() >= *points, self.history.len().to_string())
            }
            AssertCondition::ChartPoints { points } => {
                (self.chart.len() == *points, self.chart.len().to_string())
            }
            AssertCondition::TooltipLabel { label } => {
                let actual = self.marker().tooltip().label;
                (&actual == label, actual)
            }
            AssertCondition::RateRequests { count } => {
                let actual = self.market.rate_requests();
                (actual == *count, actual.to_string())
            }
            AssertCondition::HistoryRequests { count } => {
                let actual = self.market.history_requests();
                (actual == *count, actual.to_string())
            }
        }
    }

    pub fn marker(&self) -> ActiveMarker {
        self.chart.active_marker(self.hovered)
    }

    pub fn chart(&self) -> &ChartGeometry {
        &self.chart
    }

    pub fn engine(&self) -> &ConversionEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }
}
