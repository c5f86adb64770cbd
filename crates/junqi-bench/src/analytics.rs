use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::BenchmarkConfig;
use crate::harness::GameOutcome;

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline profile '{0}' not present in harness results")]
    MissingBaseline(String),
    #[error("profile '{0}' reported in results but missing from configuration")]
    UnknownProfile(String),
    #[error("baseline '{0}' missing for game {1}")]
    MissingBaselineGame(String, String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

pub struct AnalyticsCollector {
    baseline: String,
    profiles: HashMap<String, ProfileAccumulator>,
    comparisons: HashMap<String, ComparisonAccumulator>,
    profile_order: Vec<String>,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut profiles = HashMap::new();
        let mut order = Vec::new();
        for profile in &config.profiles {
            profiles.insert(
                profile.name.clone(),
                ProfileAccumulator::new(profile.name.clone(), profile.params.clone()),
            );
            order.push(profile.name.clone());
        }

        if !profiles.contains_key(&baseline) {
            return Err(AnalyticsError::MissingBaseline(baseline));
        }

        Ok(Self {
            baseline,
            profiles,
            comparisons: HashMap::new(),
            profile_order: order,
        })
    }

    pub fn record_game(
        &mut self,
        game_index: usize,
        outcome: &GameOutcome,
    ) -> Result<(), AnalyticsError> {
        let game_id = format!("G{game_index:05}");

        let baseline_accuracy = outcome
            .results
            .iter()
            .find(|result| result.name == self.baseline)
            .map(|result| result.mean_sample_accuracy)
            .ok_or_else(|| {
                AnalyticsError::MissingBaselineGame(self.baseline.clone(), game_id.clone())
            })?;

        for result in &outcome.results {
            let acc = self
                .profiles
                .get_mut(&result.name)
                .ok_or_else(|| AnalyticsError::UnknownProfile(result.name.clone()))?;
            acc.record_game(
                result.mean_sample_accuracy,
                result.mean_true_probability,
                result.sampling_failures,
                outcome.moves,
            );

            if result.name != self.baseline {
                self.comparisons
                    .entry(result.name.clone())
                    .or_default()
                    .record(result.mean_sample_accuracy - baseline_accuracy);
            }
        }

        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let mut reports = Vec::new();
        for name in &self.profile_order {
            if let Some(acc) = self.profiles.remove(name) {
                reports.push(acc.into_report());
            }
        }

        let comparisons = reports
            .iter()
            .map(|report| {
                let (p_value, sample_size) = if report.name == self.baseline {
                    (1.0, report.games)
                } else {
                    self.comparisons
                        .remove(&report.name)
                        .map(ComparisonAccumulator::wilcoxon_signed_rank)
                        .unwrap_or((1.0, 0))
                };
                ComparisonReport {
                    profile: report.name.clone(),
                    p_value,
                    sample_size,
                }
            })
            .collect();

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            profiles: reports,
            comparisons,
        }
        .enrich())
    }
}

struct ProfileAccumulator {
    name: String,
    params: serde_yaml::Value,
    per_game_accuracy: Vec<f64>,
    total_true_probability: f64,
    sampling_failures: usize,
    total_moves: usize,
}

impl ProfileAccumulator {
    fn new(name: String, params: serde_yaml::Value) -> Self {
        Self {
            name,
            params,
            per_game_accuracy: Vec::new(),
            total_true_probability: 0.0,
            sampling_failures: 0,
            total_moves: 0,
        }
    }

    fn record_game(
        &mut self,
        accuracy: f64,
        true_probability: f64,
        sampling_failures: usize,
        moves: usize,
    ) {
        self.per_game_accuracy.push(accuracy);
        self.total_true_probability += true_probability;
        self.sampling_failures += sampling_failures;
        self.total_moves += moves;
    }

    fn into_report(self) -> ProfileReport {
        let games = self.per_game_accuracy.len();
        let (avg_accuracy, avg_true_probability, avg_moves) = if games == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let n = games as f64;
            (
                self.per_game_accuracy.iter().sum::<f64>() / n,
                self.total_true_probability / n,
                self.total_moves as f64 / n,
            )
        };

        ProfileReport {
            name: self.name,
            params: self.params,
            games,
            avg_accuracy,
            ci95: confidence_interval(&self.per_game_accuracy),
            avg_true_probability,
            sampling_failures: self.sampling_failures,
            avg_moves,
            delta_vs_baseline: 0.0,
        }
    }
}

#[derive(Clone, Default)]
struct ComparisonAccumulator {
    diffs: Vec<f64>,
}

impl ComparisonAccumulator {
    fn record(&mut self, diff: f64) {
        self.diffs.push(diff);
    }

    /// Two-sided signed-rank test with tie correction, normal approximation.
    fn wilcoxon_signed_rank(self) -> (f64, usize) {
        let diffs: Vec<f64> = self
            .diffs
            .into_iter()
            .filter(|d| d.abs() > f64::EPSILON)
            .collect();
        let n = diffs.len();
        if n == 0 {
            return (1.0, 0);
        }

        let mut paired: Vec<(f64, f64)> =
            diffs.into_iter().map(|d| (d.abs(), d.signum())).collect();
        paired.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut w_plus = 0.0;
        let mut w_minus = 0.0;
        let mut tie_adjustment = 0.0;
        let mut i = 0;
        while i < paired.len() {
            let mut j = i;
            while j + 1 < paired.len() && (paired[j + 1].0 - paired[i].0).abs() < 1e-12 {
                j += 1;
            }
            let rank = (i + j + 2) as f64 / 2.0;
            for &(_, sign) in &paired[i..=j] {
                if sign > 0.0 {
                    w_plus += rank;
                } else {
                    w_minus += rank;
                }
            }
            let ties = (j - i + 1) as f64;
            if ties > 1.0 {
                tie_adjustment += (ties.powi(3) - ties) / 48.0;
            }
            i = j + 1;
        }

        let w: f64 = f64::min(w_plus, w_minus);
        let n_f = n as f64;
        let mean_w = n_f * (n_f + 1.0) / 4.0;
        let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
        if variance_w <= 0.0 {
            return (1.0, n);
        }

        let z = (((w - mean_w).abs() - 0.5) / variance_w.sqrt()).max(0.0);
        let Ok(normal) = Normal::new(0.0, 1.0) else {
            return (1.0, n);
        };
        let p = 2.0 * (1.0 - normal.cdf(z));
        (p.clamp(0.0, 1.0), n)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub profiles: Vec<ProfileReport>,
    pub comparisons: Vec<ComparisonReport>,
}

impl AnalyticsSummary {
    pub fn enrich(mut self) -> Self {
        let baseline_avg = self
            .profiles
            .iter()
            .find(|profile| profile.name == self.baseline)
            .map(|profile| profile.avg_accuracy)
            .unwrap_or(0.0);

        for profile in &mut self.profiles {
            profile.delta_vs_baseline = profile.avg_accuracy - baseline_avg;
        }

        self
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Belief Accuracy Summary\n\n");
        rows.push_str(&format!("Baseline profile: `{}`\n\n", self.baseline));
        rows.push_str("| Profile | Games | Sample accuracy | Δ vs baseline | 95% CI | Mean P(true kind) | Avg moves | Sampling failures | p-value |\n");
        rows.push_str("|---------|-------|-----------------|---------------|--------|-------------------|-----------|-------------------|---------|\n");

        for profile in &self.profiles {
            let p_value = self
                .comparisons
                .iter()
                .find(|c| c.profile == profile.name)
                .map(|c| c.p_value)
                .unwrap_or(1.0);

            rows.push_str(&format!(
                "| {name} | {games} | {acc:.3} | {delta:+.3} | [{ci_low:.3}, {ci_high:.3}] | {truth:.3} | {moves:.1} | {failures} | {pval:.3} |\n",
                name = profile.name,
                games = profile.games,
                acc = profile.avg_accuracy,
                delta = profile.delta_vs_baseline,
                ci_low = profile.ci95.0,
                ci_high = profile.ci95.1,
                truth = profile.avg_true_probability,
                moves = profile.avg_moves,
                failures = profile.sampling_failures,
                pval = p_value,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("delta_accuracy.png");
        let baseline = self.baseline.clone();
        let profiles_snapshot = self.profiles.clone();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let mut profiles = profiles_snapshot;
            profiles.sort_by(|a, b| {
                a.delta_vs_baseline
                    .partial_cmp(&b.delta_vs_baseline)
                    .unwrap_or(Ordering::Equal)
            });

            let y_min = profiles
                .iter()
                .map(|p| p.delta_vs_baseline)
                .fold(0.0f64, f64::min);
            let y_max = profiles
                .iter()
                .map(|p| p.delta_vs_baseline)
                .fold(0.0f64, f64::max);
            let margin = ((y_max - y_min).abs() * 0.1).max(0.02);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption(
                    "Sample accuracy delta vs baseline (higher is better)",
                    ("sans-serif", 22),
                )
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(0..profiles.len(), (y_min - margin)..(y_max + margin))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Δ accuracy vs baseline")
                .x_desc("Profile")
                .x_label_formatter(&|idx| {
                    profiles
                        .get(*idx)
                        .map(|profile| profile.name.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(profiles.iter().enumerate().map(|(idx, profile)| {
                    let color = if profile.name == baseline {
                        &BLUE
                    } else if profile.delta_vs_baseline >= 0.0 {
                        &GREEN
                    } else {
                        &RED
                    };
                    Rectangle::new(
                        [(idx, 0.0), (idx + 1, profile.delta_vs_baseline)],
                        color.filled(),
                    )
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub name: String,
    pub params: serde_yaml::Value,
    pub games: usize,
    pub avg_accuracy: f64,
    pub ci95: (f64, f64),
    pub avg_true_probability: f64,
    pub sampling_failures: usize,
    pub avg_moves: f64,
    #[serde(skip)]
    pub delta_vs_baseline: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub profile: String,
    pub p_value: f64,
    pub sample_size: usize,
}

fn confidence_interval(points: &[f64]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let mean = points.iter().sum::<f64>() / points.len() as f64;
    if points.len() == 1 {
        return (mean, mean);
    }
    let variance = points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0);
    let margin = CONFIDENCE_Z * (variance / points.len() as f64).sqrt();
    (mean - margin, mean + margin)
}
