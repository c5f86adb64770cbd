use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

const BELIEF_TARGET: &str = "junqi_core::belief";
const GAME_TARGET: &str = "junqi_bench::game";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub updates: UpdateTelemetrySummary,
    pub games: GameTelemetrySummary,
}

/// Belief update events, one per observed move per engine.
#[derive(Debug, Default, Serialize)]
pub struct UpdateTelemetrySummary {
    pub initializations: usize,
    pub count: usize,
    pub avg_active_rows: Option<f64>,
    pub avg_settled: Option<f64>,
    pub branch_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Default, Serialize)]
pub struct GameTelemetrySummary {
    pub count: usize,
    pub avg_moves: Option<f64>,
    pub stop_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Aggregate the JSON events written by the structured logger.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut updates = UpdateTelemetrySummary::default();
    let mut active_avg = Average::default();
    let mut settled_avg = Average::default();
    let mut games = GameTelemetrySummary::default();
    let mut moves_avg = Average::default();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            BELIEF_TARGET => {
                let branch = fields
                    .get("branch")
                    .and_then(Value::as_str)
                    .unwrap_or("<unset>");
                if branch == "initialize" {
                    updates.initializations += 1;
                    continue;
                }
                updates.count += 1;
                *updates.branch_counts.entry(branch.to_string()).or_insert(0) += 1;
                if let Some(rows) = fields.get("active_rows").and_then(Value::as_f64) {
                    active_avg.add(rows);
                }
                if let Some(settled) = fields.get("settled").and_then(Value::as_f64) {
                    settled_avg.add(settled);
                }
            }
            GAME_TARGET => {
                games.count += 1;
                if let Some(moves) = fields.get("moves").and_then(Value::as_f64) {
                    moves_avg.add(moves);
                }
                let stop = fields
                    .get("stop")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("<unset>");
                *games.stop_counts.entry(stop.to_string()).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    updates.avg_active_rows = active_avg.mean();
    updates.avg_settled = settled_avg.mean();
    games.avg_moves = moves_avg.mean();

    Ok(TelemetrySummary { updates, games })
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(&json_path, serde_json::to_vec_pretty(&summary)?).map_err(|source| {
        TelemetryError::Io {
            context: "writing telemetry summary json",
            source,
        }
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    let updates = &outputs.summary.updates;
    section.push_str(&format!("- Belief updates captured: {}\n", updates.count));
    if let Some(value) = updates.avg_active_rows {
        section.push_str(&format!("- Avg active rows: {value:.2}\n"));
    }
    if let Some(value) = updates.avg_settled {
        section.push_str(&format!("- Avg rows settled per update: {value:.3}\n"));
    }
    push_counts(&mut section, "\n### Update Branches\n", &updates.branch_counts);

    let games = &outputs.summary.games;
    section.push_str(&format!("\n- Games logged: {}\n", games.count));
    if let Some(value) = games.avg_moves {
        section.push_str(&format!("- Avg moves per game: {value:.1}\n"));
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn push_counts(output: &mut String, heading: &str, counts: &BTreeMap<String, usize>) {
    output.push_str(heading);
    if counts.is_empty() {
        output.push_str("- <none>\n");
    } else {
        for (label, count) in counts {
            output.push_str(&format!("- {label}: {count}\n"));
        }
    }
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n\n", telemetry_path.display()));

    output.push_str("## Belief Updates\n");
    output.push_str(&format!(
        "- Engines initialised: {}\n",
        summary.updates.initializations
    ));
    output.push_str(&format!("- Events: {}\n", summary.updates.count));
    if let Some(value) = summary.updates.avg_active_rows {
        output.push_str(&format!("- Avg active rows: {value:.2}\n"));
    }
    if let Some(value) = summary.updates.avg_settled {
        output.push_str(&format!("- Avg settled rows: {value:.3}\n"));
    }
    push_counts(&mut output, "\n### Branches\n", &summary.updates.branch_counts);

    output.push_str("\n## Games\n");
    output.push_str(&format!("- Events: {}\n", summary.games.count));
    if let Some(value) = summary.games.avg_moves {
        output.push_str(&format!("- Avg moves: {value:.1}\n"));
    }
    push_counts(&mut output, "\n### Stop Reasons\n", &summary.games.stop_counts);
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
