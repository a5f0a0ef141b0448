// tether_sim/src/simulation/plugins/reporting.rs

use std::fmt;

use crate::prelude::*;
use crate::simulation::plugins::engine::{InteractionStats, SimEngine, TetherEngine};
use crate::simulation::plugins::notifier::NotificationKind;
use crate::simulation::plugins::session::SimSessionState;

/// End-of-run summary of what the engine ended up with.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub elapsed: f64,
    pub mode: TrackingMode,
    pub planes: usize,
    pub session_runs: usize,
    pub object: Option<(String, ObjectReadout)>,
    pub messages_shown: usize,
    pub alerts_shown: usize,
    pub stats: InteractionStats,
}

impl RunReport {
    pub fn collect(elapsed: f64, engine: &SimEngine, session: &SimSessionState, stats: &InteractionStats) -> Self {
        let history = engine.notifier().history();
        let object = engine
            .objects()
            .object()
            .zip(engine.object_readout())
            .map(|(object, readout)| (object.descriptor.name.clone(), readout));
        Self {
            elapsed,
            mode: engine.session_config().mode,
            planes: engine.planes().len(),
            session_runs: session.run_count,
            object,
            messages_shown: history
                .iter()
                .filter(|r| r.kind != NotificationKind::Alert)
                .count(),
            alerts_shown: history
                .iter()
                .filter(|r| r.kind == NotificationKind::Alert)
                .count(),
            stats: stats.clone(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run finished after {:.2}s in {:?}", self.elapsed, self.mode)?;
        writeln!(f, "  planes tracked: {}", self.planes)?;
        writeln!(f, "  session runs:   {}", self.session_runs)?;
        writeln!(
            f,
            "  messages: {}, alerts: {}",
            self.messages_shown, self.alerts_shown
        )?;
        writeln!(
            f,
            "  loads: {} started, {} rejected; placements: {} ok, {} missed; gestures: {}; restarts: {} ({} refused)",
            self.stats.loads_started,
            self.stats.loads_rejected,
            self.stats.placements,
            self.stats.placement_misses,
            self.stats.transforms,
            self.stats.restarts,
            self.stats.restarts_refused
        )?;
        match &self.object {
            Some((name, readout)) => write!(f, "  object '{}':\n{}", name, readout),
            None => write!(f, "  no object placed"),
        }
    }
}

pub struct ReportingPlugin;

impl Plugin for ReportingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, finish_after_duration.in_set(SimulationSet::Report));
    }
}

fn finish_after_duration(
    time: Res<Time>,
    config: Res<ScenarioConfig>,
    engine: Res<TetherEngine>,
    session: Res<SimSessionState>,
    stats: Res<InteractionStats>,
    mut next_state: ResMut<NextState<AppState>>,
    mut exit: EventWriter<AppExit>,
) {
    let elapsed = time.elapsed_secs_f64();
    if elapsed < config.simulation.duration_seconds {
        return;
    }
    let report = RunReport::collect(elapsed, &engine.0, &session, &stats);
    for line in report.to_string().lines() {
        info!("{}", line);
    }
    next_state.set(AppState::Finished);
    exit.write(AppExit::Success);
}
