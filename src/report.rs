//! Human-readable and JSON reports for scans and batches.
//!
//! # Output Schema (scan, JSON)
//!
//! ```json
//! {
//!   "generated_at": "2026-08-27T12:00:00Z",
//!   "groups": [
//!     {
//!       "key": "Heat",
//!       "kind": "Movie",
//!       "renditions": [
//!         {"state": "KEEP", "size": 10737418240, "resolution": "1080",
//!          "codec": "h264", "path": "/media/heat-1080.mkv"}
//!       ]
//!     }
//!   ],
//!   "stats": {"libraries_scanned": 2, "errors": []},
//!   "summary": {
//!     "duplicate_groups": 1,
//!     "marked_renditions": 1,
//!     "reclaimable_bytes": 5368709120,
//!     "exit_code": 0,
//!     "exit_code_name": "MS000"
//!   }
//! }
//! ```

use bytesize::ByteSize;
use serde::Serialize;
use yansi::Paint;

use crate::catalog::Rendition;
use crate::engine::selection::{SelectionSet, SelectionState};
use crate::engine::{DuplicateGroup, ScanSnapshot, ScanStats};
use crate::error::ExitCode;
use crate::reclaim::BatchOutcome;

/// Exit code for a completed scan.
#[must_use]
pub fn scan_exit_code(snapshot: &ScanSnapshot) -> ExitCode {
    if snapshot.is_empty() {
        ExitCode::NoDuplicates
    } else if snapshot.stats.errors.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    }
}

/// Exit code for a completed batch.
#[must_use]
pub fn batch_exit_code(outcome: &BatchOutcome) -> ExitCode {
    if outcome.is_complete_success() {
        ExitCode::Success
    } else if outcome.succeeded > 0 || outcome.skipped > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::GeneralError
    }
}

fn state_tag(state: SelectionState) -> String {
    match state {
        SelectionState::Keep => format!("[{}]", "KEEP".green().bold()),
        SelectionState::Delete => format!("[{}]", "DELETE".red().bold()),
    }
}

fn rendition_line(state: SelectionState, rendition: &Rendition) -> String {
    let size = if rendition.size_known() {
        ByteSize::b(rendition.effective_size()).to_string()
    } else {
        "size unknown".to_string()
    };
    let path = rendition
        .path
        .as_ref()
        .map_or_else(|| "(no path reported)".to_string(), |p| p.display().to_string());
    format!(
        "    {:<10} {:>10}  {:<8} {:<6} {}",
        state_tag(state),
        size,
        rendition.resolution_label(),
        rendition.codec_label(),
        path
    )
}

fn render_section(out: &mut String, title: &str, groups: &[(&DuplicateGroup, &[SelectionState])]) {
    if groups.is_empty() {
        return;
    }
    out.push_str(&format!("{} ({} groups)\n", title.bold(), groups.len()));
    for (group, states) in groups {
        out.push_str(&format!(
            "  {} - {} renditions, {} total\n",
            group.key,
            group.len(),
            ByteSize::b(group.total_size())
        ));
        for (state, rendition) in states.iter().zip(&group.renditions) {
            out.push_str(&rendition_line(*state, rendition));
            out.push('\n');
        }
    }
    out.push('\n');
}

/// Render the scan result as a colored text report.
#[must_use]
pub fn render_scan_text(snapshot: &ScanSnapshot, selections: &SelectionSet) -> String {
    let mut out = String::new();

    if snapshot.is_empty() {
        out.push_str("No duplicate renditions found.\n");
    } else {
        let mut movies = Vec::new();
        let mut episodes = Vec::new();
        for (index, (group, selection)) in selections.iter(snapshot).enumerate() {
            let entry = (group, selection.states());
            if index < snapshot.movies.len() {
                movies.push(entry);
            } else {
                episodes.push(entry);
            }
        }
        render_section(&mut out, "Movies", &movies);
        render_section(&mut out, "TV Episodes", &episodes);

        out.push_str(&format!(
            "{} {} groups, {} renditions marked, {} reclaimable\n",
            "Summary:".bold(),
            snapshot.group_count(),
            selections.total_deletions(),
            ByteSize::b(selections.total_reclaimable(snapshot))
        ));
    }

    out.push_str(&render_stats(&snapshot.stats));
    out
}

fn render_stats(stats: &ScanStats) -> String {
    let mut out = format!(
        "Scanned {} libraries: {} movies, {} shows, {} episodes\n",
        stats.libraries_scanned, stats.movies_scanned, stats.shows_scanned, stats.episodes_scanned
    );
    if !stats.errors.is_empty() {
        out.push_str(&format!(
            "{} {} scopes skipped:\n",
            "Warning:".yellow().bold(),
            stats.skipped
        ));
        for error in &stats.errors {
            out.push_str(&format!("  - {error}\n"));
        }
    }
    out
}

/// Render a batch outcome as a colored text report.
#[must_use]
pub fn render_batch_text(outcome: &BatchOutcome) -> String {
    let mut out = String::new();

    if outcome.dry_run {
        out.push_str(&format!(
            "{} {} renditions would be processed, reclaiming {}\n",
            "[DRY RUN]".cyan().bold(),
            outcome.succeeded,
            ByteSize::b(outcome.bytes_reclaimed)
        ));
    } else {
        out.push_str(&format!(
            "Processed {} of {} renditions, reclaimed {}\n",
            outcome.succeeded,
            outcome.attempted,
            ByteSize::b(outcome.bytes_reclaimed)
        ));
    }

    for skip in &outcome.skips {
        out.push_str(&format!("  {} {skip}\n", "skipped".yellow()));
    }
    for error in &outcome.errors {
        out.push_str(&format!("  {} {error}\n", "failed".red().bold()));
    }

    if outcome.rescan_advised() {
        out.push_str("Run a new scan before making further selections.\n");
    }
    out
}

#[derive(Debug, Serialize)]
struct JsonRendition {
    state: SelectionState,
    size: Option<u64>,
    resolution: Option<String>,
    codec: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonGroup {
    key: String,
    kind: String,
    renditions: Vec<JsonRendition>,
}

#[derive(Debug, Serialize)]
struct JsonScanSummary {
    duplicate_groups: usize,
    marked_renditions: usize,
    reclaimable_bytes: u64,
    exit_code: i32,
    exit_code_name: String,
}

/// Machine-readable scan report.
#[derive(Debug, Serialize)]
pub struct JsonScanReport {
    generated_at: String,
    groups: Vec<JsonGroup>,
    stats: ScanStats,
    summary: JsonScanSummary,
}

impl JsonScanReport {
    /// Build the report from a snapshot and its selections.
    #[must_use]
    pub fn new(snapshot: &ScanSnapshot, selections: &SelectionSet) -> Self {
        let exit_code = scan_exit_code(snapshot);
        let groups = selections
            .iter(snapshot)
            .map(|(group, selection)| JsonGroup {
                key: group.key.clone(),
                kind: group.kind.to_string(),
                renditions: selection
                    .states()
                    .iter()
                    .zip(&group.renditions)
                    .map(|(state, r)| JsonRendition {
                        state: *state,
                        size: r.size,
                        resolution: r.resolution.clone(),
                        codec: r.codec.clone(),
                        path: r.path.as_ref().map(|p| p.display().to_string()),
                    })
                    .collect(),
            })
            .collect();
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            groups,
            stats: snapshot.stats.clone(),
            summary: JsonScanSummary {
                duplicate_groups: snapshot.group_count(),
                marked_renditions: selections.total_deletions(),
                reclaimable_bytes: selections.total_reclaimable(snapshot),
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_json`.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Machine-readable batch report.
#[derive(Debug, Serialize)]
pub struct JsonBatchReport {
    generated_at: String,
    outcome: BatchOutcome,
    rescan_advised: bool,
    exit_code: i32,
    exit_code_name: String,
}

impl JsonBatchReport {
    /// Build the report from a batch outcome.
    #[must_use]
    pub fn new(outcome: BatchOutcome) -> Self {
        let exit_code = batch_exit_code(&outcome);
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            rescan_advised: outcome.rescan_advised(),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
            outcome,
        }
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_json`.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MediaKind, RenditionRef};
    use crate::engine::selection::Strategy;

    fn group(key: &str, sizes: &[u64]) -> DuplicateGroup {
        let renditions = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| Rendition {
                size: Some(*size),
                resolution: Some("1080".into()),
                codec: Some("h264".into()),
                bitrate: None,
                path: Some(format!("/media/{key}/{i}.mkv").into()),
                record: RenditionRef {
                    item_key: key.into(),
                    media_id: i as u64,
                },
            })
            .collect();
        DuplicateGroup {
            key: key.into(),
            kind: MediaKind::Movie,
            renditions,
        }
    }

    fn snapshot() -> ScanSnapshot {
        ScanSnapshot {
            movies: vec![group("Heat", &[2_000_000, 1_000_000])],
            episodes: vec![],
            stats: ScanStats {
                libraries_scanned: 1,
                movies_scanned: 10,
                movies_with_duplicates: 1,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_scan_exit_codes() {
        assert_eq!(scan_exit_code(&ScanSnapshot::default()), ExitCode::NoDuplicates);

        let snap = snapshot();
        assert_eq!(scan_exit_code(&snap), ExitCode::Success);

        let mut with_errors = snapshot();
        with_errors.stats.errors.push("show 'X': server error".into());
        assert_eq!(scan_exit_code(&with_errors), ExitCode::PartialSuccess);
    }

    #[test]
    fn test_batch_exit_codes() {
        assert_eq!(batch_exit_code(&BatchOutcome::default()), ExitCode::Success);

        let partial = BatchOutcome {
            succeeded: 2,
            failed: 1,
            ..Default::default()
        };
        assert_eq!(batch_exit_code(&partial), ExitCode::PartialSuccess);

        let all_failed = BatchOutcome {
            failed: 2,
            ..Default::default()
        };
        assert_eq!(batch_exit_code(&all_failed), ExitCode::GeneralError);
    }

    #[test]
    fn test_text_report_marks_keep_and_delete() {
        let snap = snapshot();
        let selections = SelectionSet::assign_all(&snap, Strategy::KeepLargest, true);
        let text = render_scan_text(&snap, &selections);

        assert!(text.contains("Heat"));
        assert!(text.contains("KEEP"));
        assert!(text.contains("DELETE"));
        assert!(text.contains("Summary:"));
    }

    #[test]
    fn test_text_report_empty_scan() {
        let text = render_scan_text(
            &ScanSnapshot::default(),
            &SelectionSet::assign_all(&ScanSnapshot::default(), Strategy::KeepLargest, true),
        );
        assert!(text.contains("No duplicate renditions found"));
    }

    #[test]
    fn test_json_scan_report_shape() {
        let snap = snapshot();
        let selections = SelectionSet::assign_all(&snap, Strategy::KeepLargest, true);
        let json = JsonScanReport::new(&snap, &selections).to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["duplicate_groups"], 1);
        assert_eq!(value["summary"]["marked_renditions"], 1);
        assert_eq!(value["summary"]["reclaimable_bytes"], 1_000_000);
        assert_eq!(value["summary"]["exit_code_name"], "MS000");
        assert_eq!(value["groups"][0]["key"], "Heat");
        assert_eq!(value["groups"][0]["renditions"][0]["state"], "KEEP");
        assert_eq!(value["groups"][0]["renditions"][1]["state"], "DELETE");
    }

    #[test]
    fn test_json_batch_report_shape() {
        let outcome = BatchOutcome {
            dry_run: false,
            attempted: 2,
            succeeded: 2,
            bytes_reclaimed: 500,
            ..Default::default()
        };
        let json = JsonBatchReport::new(outcome).to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["outcome"]["succeeded"], 2);
        assert_eq!(value["rescan_advised"], true);
        assert_eq!(value["exit_code_name"], "MS000");
    }

    #[test]
    fn test_batch_text_dry_run() {
        let outcome = BatchOutcome {
            dry_run: true,
            attempted: 3,
            succeeded: 3,
            bytes_reclaimed: 1_000_000,
            ..Default::default()
        };
        let text = render_batch_text(&outcome);
        assert!(text.contains("DRY RUN"));
        assert!(!text.contains("Run a new scan"));
    }
}
