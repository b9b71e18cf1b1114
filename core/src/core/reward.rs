use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Severity;

/// Normalized reward record for one program, or one reward group within it
/// on platforms that publish several groups per program.
///
/// `None` means the platform does not publish that tier. A published
/// zero-dollar tier stays `Some(0.0)`; the two are not interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTier {
    pub program: String,
    pub low: Option<f64>,
    pub medium: Option<f64>,
    pub high: Option<f64>,
    pub critical: Option<f64>,
}

impl RewardTier {
    pub fn empty(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            low: None,
            medium: None,
            high: None,
            critical: None,
        }
    }

    pub fn get(&self, severity: Severity) -> Option<f64> {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }

    pub fn set(&mut self, severity: Severity, amount: Option<f64>) {
        match severity {
            Severity::Low => self.low = amount,
            Severity::Medium => self.medium = amount,
            Severity::High => self.high = amount,
            Severity::Critical => self.critical = amount,
        }
    }

    /// True when not a single tier is published.
    pub fn is_unpublished(&self) -> bool {
        Severity::ALL.iter().all(|s| self.get(*s).is_none())
    }
}

/// Failure classification for a single target retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Connection, DNS, or HTTP-status failure. Possibly transient.
    Network(String),
    /// Response structurally unexpected. Retrying will not change it.
    Parse(String),
    /// Browser process crashed or became unusable.
    Session(String),
}

impl FailureKind {
    /// Transient failures qualify for the runner's retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Network(_) | FailureKind::Session(_))
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network(msg) => write!(f, "network: {}", msg),
            FailureKind::Parse(msg) => write!(f, "parse: {}", msg),
            FailureKind::Session(msg) => write!(f, "session: {}", msg),
        }
    }
}

/// One unit of runner output: a collected record or a classified failure.
/// Created once per reward group by an adapter, consumed by the reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollectionResult {
    Collected(RewardTier),
    Failed { target: String, kind: FailureKind },
}

impl CollectionResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, CollectionResult::Failed { .. })
    }

    pub fn target(&self) -> &str {
        match self {
            CollectionResult::Collected(tier) => &tier.program,
            CollectionResult::Failed { target, .. } => target,
        }
    }
}
