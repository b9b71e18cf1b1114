use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use url::Url;

use crate::adapters::SourceAdapter;
use crate::core::reward::{CollectionResult, FailureKind, RewardTier};
use crate::core::throttle::ThrottleController;
use crate::core::Severity;
use crate::http::HttpClient;
use crate::Credentials;

pub const DEFAULT_BASE_URL: &str = "https://bugcrowd.com";
const TARGET_GROUPS_ENDPOINT: &str = "target_groups";

/// Maps positions inside a `reward_range` array onto severity bands.
///
/// The platform publishes five entries per group; the observed layout puts
/// low at index 1 up through critical at index 4. That layout is not
/// contractually guaranteed, so the mapping stays data rather than indices
/// baked into the extraction code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierMap {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl Default for TierMap {
    fn default() -> Self {
        Self { low: 1, medium: 2, high: 3, critical: 4 }
    }
}

impl TierMap {
    fn slot(&self, severity: Severity) -> usize {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }

    /// Minimum `reward_range` length this mapping can read from.
    fn required_len(&self) -> usize {
        1 + self.low.max(self.medium).max(self.high).max(self.critical)
    }
}

/// Collects reward tiers from the platform's structured JSON endpoint.
///
/// Stateless per call apart from the shared throttle, so it tolerates any
/// concurrency the runner is configured with.
pub struct ApiAdapter {
    client: HttpClient,
    base_url: Url,
    tier_map: TierMap,
    throttle: Arc<ThrottleController>,
}

impl ApiAdapter {
    pub fn new(
        base_url: &str,
        credentials: &Credentials,
        custom_headers: &[(String, String)],
        timeout_seconds: u64,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            client: HttpClient::new(timeout_seconds, credentials, custom_headers),
            base_url,
            tier_map: TierMap::default(),
            throttle: Arc::new(ThrottleController::new()),
        })
    }

    pub fn with_tier_map(mut self, tier_map: TierMap) -> Self {
        self.tier_map = tier_map;
        self
    }

    fn endpoint_for(&self, target: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            target.trim_matches('/'),
            TARGET_GROUPS_ENDPOINT
        )
    }
}

#[derive(Deserialize)]
struct GroupsResponse {
    groups: Vec<RewardGroup>,
}

#[derive(Deserialize)]
struct RewardGroup {
    reward_range: Option<Vec<RewardBand>>,
}

#[derive(Deserialize)]
struct RewardBand {
    min: Option<f64>,
}

/// Parses one target_groups response body into per-group results.
/// Free of I/O so the shape handling is testable on its own.
fn parse_groups(target: &str, body: &str, tier_map: TierMap) -> Vec<CollectionResult> {
    let parsed: GroupsResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            return vec![CollectionResult::Failed {
                target: target.to_string(),
                kind: FailureKind::Parse(e.to_string()),
            }]
        }
    };

    parsed
        .groups
        .into_iter()
        .map(|group| {
            let Some(range) = group.reward_range else {
                return CollectionResult::Failed {
                    target: target.to_string(),
                    kind: FailureKind::Parse("group has no reward_range".to_string()),
                };
            };
            if range.len() < tier_map.required_len() {
                return CollectionResult::Failed {
                    target: target.to_string(),
                    kind: FailureKind::Parse(format!(
                        "reward_range has {} entries, need {}",
                        range.len(),
                        tier_map.required_len()
                    )),
                };
            }

            let mut tier = RewardTier::empty(target);
            for severity in Severity::ALL {
                tier.set(severity, range[tier_map.slot(severity)].min);
            }
            CollectionResult::Collected(tier)
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for ApiAdapter {
    async fn fetch(&self, target: &str) -> Vec<CollectionResult> {
        self.throttle.pause().await;

        let url = self.endpoint_for(target);
        debug!("GET {}", url);

        let response = match self.client.get(&url).await {
            Ok(r) => r,
            Err(e) => {
                return vec![CollectionResult::Failed {
                    target: target.to_string(),
                    kind: FailureKind::Network(e.to_string()),
                }]
            }
        };

        let status = response.status();
        if self.throttle.record_status(status.as_u16()) {
            warn!(
                "{} answered HTTP {}; backing off {}ms",
                self.name(),
                status.as_u16(),
                self.throttle.current_delay_ms()
            );
        }

        if !status.is_success() {
            return vec![CollectionResult::Failed {
                target: target.to_string(),
                kind: FailureKind::Network(format!("HTTP {}", status.as_u16())),
            }];
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return vec![CollectionResult::Failed {
                    target: target.to_string(),
                    kind: FailureKind::Network(e.to_string()),
                }]
            }
        };

        parse_groups(target, &body, self.tier_map)
    }

    fn default_concurrency(&self) -> usize {
        8
    }

    fn name(&self) -> &'static str {
        "bugcrowd-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier_of(result: &CollectionResult) -> &RewardTier {
        match result {
            CollectionResult::Collected(tier) => tier,
            other => panic!("expected Collected, got {:?}", other),
        }
    }

    #[test]
    fn observed_platform_body_maps_onto_bands() {
        let body = r#"{"groups":[{"reward_range":[{},{"min":100},{"min":500},{"min":1000},{"min":5000}]}]}"#;
        let results = parse_groups("ifood-og", body, TierMap::default());

        assert_eq!(results.len(), 1);
        let tier = tier_of(&results[0]);
        assert_eq!(tier.program, "ifood-og");
        assert_eq!(tier.low, Some(100.0));
        assert_eq!(tier.medium, Some(500.0));
        assert_eq!(tier.high, Some(1000.0));
        assert_eq!(tier.critical, Some(5000.0));
    }

    #[test]
    fn one_result_per_group() {
        let body = r#"{"groups":[
            {"reward_range":[{},{"min":50},{"min":100},{"min":200},{"min":400}]},
            {"reward_range":[{},{"min":150},{"min":300},{"min":600},{"min":1200}]}
        ]}"#;
        let results = parse_groups("acme", body, TierMap::default());
        assert_eq!(results.len(), 2);
        assert_eq!(tier_of(&results[0]).critical, Some(400.0));
        assert_eq!(tier_of(&results[1]).critical, Some(1200.0));
    }

    #[test]
    fn zero_groups_is_not_a_failure() {
        let results = parse_groups("acme", r#"{"groups":[]}"#, TierMap::default());
        assert!(results.is_empty());
    }

    #[test]
    fn malformed_json_is_a_parse_failure() {
        let results = parse_groups("acme", "<html>blocked</html>", TierMap::default());
        assert_eq!(results.len(), 1);
        assert!(matches!(
            &results[0],
            CollectionResult::Failed { kind: FailureKind::Parse(_), .. }
        ));
    }

    #[test]
    fn missing_groups_field_is_a_parse_failure() {
        let results = parse_groups("acme", r#"{"programs":[]}"#, TierMap::default());
        assert_eq!(results.len(), 1);
        assert!(results[0].is_failure());
    }

    #[test]
    fn short_reward_range_is_a_parse_failure() {
        let body = r#"{"groups":[{"reward_range":[{},{"min":100}]}]}"#;
        let results = parse_groups("acme", body, TierMap::default());
        assert_eq!(results.len(), 1);
        assert!(matches!(
            &results[0],
            CollectionResult::Failed { kind: FailureKind::Parse(_), .. }
        ));
    }

    #[test]
    fn group_without_reward_range_fails_without_touching_neighbors() {
        let body = r#"{"groups":[
            {"name":"out of scope"},
            {"reward_range":[{},{"min":50},{"min":100},{"min":200},{"min":400}]}
        ]}"#;
        let results = parse_groups("acme", body, TierMap::default());
        assert_eq!(results.len(), 2);
        assert!(results[0].is_failure());
        assert_eq!(tier_of(&results[1]).low, Some(50.0));
    }

    #[test]
    fn unpublished_band_stays_absent() {
        let body = r#"{"groups":[{"reward_range":[{},{"min":100},{},{"min":1000},{"min":5000}]}]}"#;
        let results = parse_groups("acme", body, TierMap::default());
        let tier = tier_of(&results[0]);
        assert_eq!(tier.medium, None);
        assert_eq!(tier.low, Some(100.0));
    }

    #[test]
    fn custom_tier_map_reads_other_slots() {
        let body = r#"{"groups":[{"reward_range":[{"min":9},{"min":1},{"min":2},{"min":3},{"min":4}]}]}"#;
        let map = TierMap { low: 0, medium: 1, high: 2, critical: 3 };
        let results = parse_groups("acme", body, map);
        let tier = tier_of(&results[0]);
        assert_eq!(tier.low, Some(9.0));
        assert_eq!(tier.critical, Some(3.0));
    }

    #[test]
    fn endpoint_building_normalizes_slashes() {
        let adapter = ApiAdapter::new(
            "https://bugcrowd.com/",
            &Credentials::default(),
            &[],
            5,
        )
        .unwrap();
        assert_eq!(
            adapter.endpoint_for("/ifood-og/"),
            "https://bugcrowd.com/ifood-og/target_groups"
        );
        assert_eq!(
            adapter.endpoint_for("acme"),
            "https://bugcrowd.com/acme/target_groups"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected_up_front() {
        assert!(ApiAdapter::new("not a url", &Credentials::default(), &[], 5).is_err());
    }
}
