use std::io::Write;

use crate::core::reward::{CollectionResult, FailureKind, RewardTier};
use crate::SinkRef;

pub const HEADER: &str = "Program; Low; Medium; High; Critical";

/// Outcome of one reporting pass, for exit decisions upstream.
#[derive(Debug)]
pub struct RunSummary {
    pub rows: usize,
    pub failures: Vec<(String, FailureKind)>,
}

/// Renders collected tiers into the shared `;`-separated table, one row per
/// record regardless of which platform produced it, and surfaces failures
/// as a separate summary instead of dropping them.
///
/// Presentation only: nothing here retries or reinterprets a failure.
pub struct Reporter {
    output_path: Option<String>,
}

impl Reporter {
    pub fn new(output_path: Option<String>) -> Self {
        Self { output_path }
    }

    pub fn render_row(tier: &RewardTier) -> String {
        format!(
            "{}; {}; {}; {}; {}",
            tier.program,
            fmt_amount(tier.low),
            fmt_amount(tier.medium),
            fmt_amount(tier.high),
            fmt_amount(tier.critical),
        )
    }

    pub fn report(&self, results: &[CollectionResult], sink: &SinkRef) -> RunSummary {
        let mut file = self.output_path.as_deref().and_then(|path| {
            match std::fs::OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => Some(f),
                Err(e) => {
                    sink.on_log(
                        "error",
                        &format!("[!] Failed to open output file '{}': {}", path, e),
                    );
                    None
                }
            }
        });

        let mut rows = 0;
        let mut failures: Vec<(String, FailureKind)> = Vec::new();

        sink.on_log("info", HEADER);
        if let Some(f) = file.as_mut() {
            let _ = writeln!(f, "{}", HEADER);
        }

        for result in results {
            match result {
                CollectionResult::Collected(tier) => {
                    sink.on_row(tier);
                    if let Some(f) = file.as_mut() {
                        let _ = writeln!(f, "{}", Self::render_row(tier));
                    }
                    rows += 1;
                }
                CollectionResult::Failed { target, kind } => {
                    failures.push((target.clone(), kind.clone()));
                }
            }
        }

        if failures.is_empty() {
            sink.on_log("success", &format!("[+] {} row(s) collected, no failures.", rows));
        } else {
            sink.on_log(
                "warn",
                &format!("[!] {} row(s) collected, {} target(s) failed:", rows, failures.len()),
            );
            for (target, kind) in &failures {
                sink.on_log("error", &format!("    {} -> {}", target, kind));
            }
        }

        RunSummary { rows, failures }
    }
}

/// Missing tiers render as `0` per the output contract; whole amounts print
/// without a trailing `.0` to match what the platforms publish.
fn fmt_amount(amount: Option<f64>) -> String {
    match amount {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{}", v),
        None => "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::core::Severity;
    use crate::RunEventSink;

    #[derive(Default)]
    struct RecordingSink {
        logs: Mutex<Vec<(String, String)>>,
        rows: Mutex<Vec<String>>,
    }

    impl RunEventSink for RecordingSink {
        fn on_log(&self, level: &str, message: &str) {
            self.logs.lock().unwrap().push((level.to_string(), message.to_string()));
        }
        fn on_row(&self, tier: &RewardTier) {
            self.rows.lock().unwrap().push(Reporter::render_row(tier));
        }
        fn on_progress(&self, _phase: &str, _current: usize, _total: usize) {}
    }

    fn full_tier() -> RewardTier {
        RewardTier {
            program: "ifood-og".to_string(),
            low: Some(100.0),
            medium: Some(500.0),
            high: Some(1000.0),
            critical: Some(5000.0),
        }
    }

    #[test]
    fn row_renders_bands_in_column_order() {
        assert_eq!(Reporter::render_row(&full_tier()), "ifood-og; 100; 500; 1000; 5000");
    }

    #[test]
    fn absent_tiers_render_as_zero() {
        let tier = RewardTier::empty("quiet-program");
        assert_eq!(Reporter::render_row(&tier), "quiet-program; 0; 0; 0; 0");
    }

    #[test]
    fn fractional_amounts_keep_their_decimals() {
        let mut tier = RewardTier::empty("acme");
        tier.low = Some(150.5);
        assert_eq!(Reporter::render_row(&tier), "acme; 150.5; 0; 0; 0");
    }

    #[test]
    fn rendered_row_round_trips_to_the_same_values() {
        let tier = full_tier();
        let row = Reporter::render_row(&tier);

        let mut fields = row.split("; ");
        let program = fields.next().unwrap();
        let mut parsed = RewardTier::empty(program);
        for severity in Severity::ALL {
            let value: f64 = fields.next().unwrap().parse().unwrap();
            parsed.set(severity, Some(value));
        }

        assert_eq!(parsed, tier);
    }

    #[test]
    fn failures_surface_in_the_summary_not_the_rows() {
        let results = vec![
            CollectionResult::Collected(full_tier()),
            CollectionResult::Failed {
                target: "gone".to_string(),
                kind: FailureKind::Network("HTTP 404".into()),
            },
        ];

        let sink = Arc::new(RecordingSink::default());
        let sink_ref: SinkRef = Arc::clone(&sink) as SinkRef;
        let summary = Reporter::new(None).report(&results, &sink_ref);

        assert_eq!(summary.rows, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "gone");

        assert_eq!(sink.rows.lock().unwrap().len(), 1);
        let logs = sink.logs.lock().unwrap();
        assert!(logs.iter().any(|(level, msg)| level == "error" && msg.contains("gone")));
        assert!(logs.iter().any(|(_, msg)| msg == HEADER));
    }

    #[test]
    fn output_file_receives_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rewards.txt");
        let path_str = path.to_str().unwrap().to_string();

        let results = vec![CollectionResult::Collected(full_tier())];
        let sink: SinkRef = Arc::new(RecordingSink::default());
        Reporter::new(Some(path_str.clone())).report(&results, &sink);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(HEADER));
        assert!(written.contains("ifood-og; 100; 500; 1000; 5000"));
    }
}
