//! Batch run log: a persisted JSON timeline of every discovery in a run.
//!
//! Each run produces `{DATA_DIR}/pressroom-runs/{run_id}.json` holding the
//! summary plus every result with its full step trail.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use pressroom_common::{DiscoveryResult, RunSummary};

pub struct RunLog {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SerializedRunLog<'a> {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    summary: RunSummary,
    results: &'a [DiscoveryResult],
}

impl RunLog {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
        }
    }

    pub fn path(&self, data_dir: &Path) -> PathBuf {
        data_dir
            .join("pressroom-runs")
            .join(format!("{}.json", self.run_id))
    }

    /// Serialize the run and write it under `data_dir`.
    pub fn save(&self, data_dir: &Path, results: &[DiscoveryResult]) -> Result<PathBuf> {
        let path = self.path(data_dir);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let output = SerializedRunLog {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            summary: RunSummary::from_results(results),
            results,
        };
        std::fs::write(&path, serde_json::to_string_pretty(&output)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let steps: usize = results.iter().map(|r| r.steps.len()).sum();
        info!(path = %path.display(), results = results.len(), steps, "Run log saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressroom_common::Target;

    #[test]
    fn run_log_is_written_under_runs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(Uuid::new_v4());
        let results = vec![DiscoveryResult {
            target: Target::parse("Acme", "acme.com").unwrap(),
            success: false,
            matched_url: None,
            extracted_date: None,
            strategy_used: None,
            candidates_checked: 0,
            raw_result_count: 0,
            error: Some("exhausted".into()),
            steps: Vec::new(),
        }];

        let path = log.save(dir.path(), &results).unwrap();
        assert_eq!(path, dir.path().join("pressroom-runs").join(format!("{}.json", log.run_id)));

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["summary"]["total"], 1);
        assert_eq!(json["results"][0]["target"]["domain"], "acme.com");
    }
}
