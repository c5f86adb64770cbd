mod deploy;
mod profile;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use junqi_core::belief::telemetry::BeliefMetrics;
use junqi_core::belief::{BeliefEngine, UpdateBranch};
use junqi_core::board::{Board, MoveOutcome};
use junqi_core::model::{AllianceMap, Faction, PieceKind};
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{BenchmarkConfig, ResolvedOutputs};
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

pub use deploy::{DeployError, deploy, deployment_cells, random_setup};
pub use profile::{ProfileBlueprint, ProfileError};

/// Plays seeded random games and scores every belief profile against the
/// true hidden state after each move.
pub struct HarnessRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    profiles: Vec<ProfileBlueprint>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

impl HarnessRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let profiles = ProfileBlueprint::from_configs(&config.profiles)?;
        Ok(Self {
            logging_enabled: config.logging.structured,
            config,
            outputs,
            profiles,
        })
    }

    pub fn profiles(&self) -> &[ProfileBlueprint] {
        &self.profiles
    }

    /// Execute every game, streaming one JSONL row per game and profile.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        fs::create_dir_all(&self.outputs.plots_dir)?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config)?;

        for game_index in 0..self.config.games.count {
            let seed = rng.next_u64();
            let outcome = self.play_game(game_index, seed)?;
            analytics.record_game(game_index, &outcome)?;
            rows_written += write_game_rows(&mut writer, &self.config, game_index, &outcome)?;
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let telemetry_path = self
            .logging_enabled
            .then(|| self.outputs.telemetry.clone());
        let telemetry_outputs = match telemetry_path.as_ref() {
            Some(path) => write_summary_outputs(path, &self.outputs.dir)?,
            None => None,
        };

        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            games_played: self.config.games.count,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
            telemetry_outputs,
        })
    }

    fn play_game(&self, game_index: usize, seed: u64) -> Result<GameOutcome, RunnerError> {
        let observer = self.config.observer;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut board = Board::with_alliances(AllianceMap::two_player());
        for faction in [Faction::Red, Faction::Green] {
            deploy(&mut board, faction, &mut rng)
                .map_err(|err| RunnerError::game(format!("deployment failed: {err}")))?;
        }

        let mut trackers: Vec<ProfileTracker> = self
            .profiles
            .iter()
            .enumerate()
            .map(|(idx, profile)| ProfileTracker::new(profile, &board, observer, seed, idx))
            .collect();
        for tracker in &mut trackers {
            tracker.observe(&board, self.config.metrics.samples_per_move);
        }

        let mut side = Faction::Red;
        let mut moves = 0usize;
        let mut stop = StopReason::MoveCap;

        while moves < self.config.games.max_moves {
            let legal = board.legal_moves(side);
            let Some(&(from, to)) = legal.choose(&mut rng) else {
                stop = StopReason::NoMoves;
                break;
            };

            let outcome = board.move_piece(from, to).map_err(|err| {
                RunnerError::game(format!("illegal move {from} -> {to} for {side}: {err}"))
            })?;
            moves += 1;
            reveal_flags_of_fallen_generals(&mut board, &outcome);

            for tracker in &mut trackers {
                let branch = tracker.engine.update(&board, &outcome);
                tracker.note_branch(branch);
                tracker.observe(&board, self.config.metrics.samples_per_move);
            }

            if flag_captured(&outcome) {
                stop = StopReason::FlagCaptured;
                break;
            }
            side = if side == Faction::Red {
                Faction::Green
            } else {
                Faction::Red
            };
        }

        let results: Vec<ProfileResult> = trackers.into_iter().map(ProfileTracker::finish).collect();

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            for result in &results {
                event!(
                    target: "junqi_bench::game",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    game_index = game_index as u32,
                    profile = %result.name,
                    moves = moves as u32,
                    stop = stop.as_str(),
                    mean_true_probability = result.mean_true_probability,
                    mean_sample_accuracy = result.mean_sample_accuracy,
                    sampling_failures = result.sampling_failures as u32
                );
            }
        }

        Ok(GameOutcome {
            seed,
            moves,
            stop,
            results,
        })
    }
}

/// A General's death exposes its owner's Flag.
fn reveal_flags_of_fallen_generals(board: &mut Board, outcome: &MoveOutcome) {
    let fallen = std::iter::once(outcome.mover)
        .chain(outcome.defender)
        .filter(|piece| piece.kind == PieceKind::General && !piece.alive);
    for general in fallen {
        if let Some(flag) = board.find(general.owner, PieceKind::Flag) {
            board.reveal(flag);
        }
    }
}

fn flag_captured(outcome: &MoveOutcome) -> bool {
    outcome
        .defender
        .is_some_and(|piece| piece.kind == PieceKind::Flag && !piece.alive)
}

fn write_game_rows(
    writer: &mut BufWriter<File>,
    config: &BenchmarkConfig,
    game_index: usize,
    outcome: &GameOutcome,
) -> Result<usize, RunnerError> {
    let game_id = format!("G{game_index:05}");

    let mut rows_written = 0usize;
    for result in &outcome.results {
        let row = GameLogRow {
            run_id: config.run_id.clone(),
            game_id: game_id.clone(),
            game_index,
            seed: outcome.seed,
            profile: result.name.clone(),
            moves: outcome.moves,
            stop: outcome.stop,
            mean_true_probability: result.mean_true_probability,
            mean_sample_accuracy: result.mean_sample_accuracy,
            mean_entropy: result.mean_entropy,
            sampling_failures: result.sampling_failures,
            updates: result.updates.clone(),
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}

struct ProfileTracker {
    name: String,
    engine: BeliefEngine,
    rng: StdRng,
    true_probability: MeanAccumulator,
    sample_accuracy: MeanAccumulator,
    entropy: MeanAccumulator,
    sampling_failures: usize,
    updates: BTreeMap<String, usize>,
}

impl ProfileTracker {
    fn new(
        profile: &ProfileBlueprint,
        board: &Board,
        observer: Faction,
        seed: u64,
        index: usize,
    ) -> Self {
        Self {
            name: profile.name.clone(),
            engine: BeliefEngine::for_observer(board, observer, profile.config),
            rng: StdRng::seed_from_u64(seed.wrapping_add(index as u64 + 1)),
            true_probability: MeanAccumulator::default(),
            sample_accuracy: MeanAccumulator::default(),
            entropy: MeanAccumulator::default(),
            sampling_failures: 0,
            updates: BTreeMap::new(),
        }
    }

    fn note_branch(&mut self, branch: UpdateBranch) {
        *self.updates.entry(branch.as_str().to_string()).or_insert(0) += 1;
    }

    /// Scores the current beliefs against the real occupants of the tracked cells.
    fn observe(&mut self, board: &Board, samples: usize) {
        let truth: Vec<f64> = self
            .engine
            .active_cells()
            .into_iter()
            .filter_map(|cell| {
                board
                    .get_piece(cell)
                    .map(|piece| f64::from(self.engine.probability(cell, piece.kind)))
            })
            .collect();
        if truth.is_empty() {
            return;
        }
        self.true_probability
            .add(truth.iter().sum::<f64>() / truth.len() as f64);
        self.entropy
            .add(f64::from(BeliefMetrics::from_engine(&self.engine).mean_entropy));

        for _ in 0..samples {
            match self.engine.sample_state(&mut self.rng) {
                Ok(state) => {
                    if let Some(accuracy) = state.accuracy(board) {
                        self.sample_accuracy.add(f64::from(accuracy));
                    }
                }
                Err(_) => self.sampling_failures += 1,
            }
        }
    }

    fn finish(self) -> ProfileResult {
        ProfileResult {
            name: self.name,
            mean_true_probability: self.true_probability.mean(),
            mean_sample_accuracy: self.sample_accuracy.mean(),
            mean_entropy: self.entropy.mean(),
            sampling_failures: self.sampling_failures,
            updates: self.updates,
        }
    }
}

#[derive(Default)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    FlagCaptured,
    NoMoves,
    MoveCap,
}

impl StopReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopReason::FlagCaptured => "flag_captured",
            StopReason::NoMoves => "no_moves",
            StopReason::MoveCap => "move_cap",
        }
    }
}

pub struct GameOutcome {
    pub seed: u64,
    pub moves: usize,
    pub stop: StopReason,
    pub results: Vec<ProfileResult>,
}

#[derive(Debug, Clone)]
pub struct ProfileResult {
    pub name: String,
    pub mean_true_probability: f64,
    pub mean_sample_accuracy: f64,
    pub mean_entropy: f64,
    pub sampling_failures: usize,
    pub updates: BTreeMap<String, usize>,
}

#[derive(Serialize)]
struct GameLogRow {
    run_id: String,
    game_id: String,
    game_index: usize,
    seed: u64,
    profile: String,
    moves: usize,
    stop: StopReason,
    mean_true_probability: f64,
    mean_sample_accuracy: f64,
    mean_entropy: f64,
    sampling_failures: usize,
    updates: BTreeMap<String, usize>,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Profile(#[from] ProfileError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("game execution failed: {message}")]
    Game { message: String },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}
