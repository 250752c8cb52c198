//! Proximity classifier — maps payer/payee distance to trust decisions.
//!
//! Each feature trusts a payment when the two parties are within its hop
//! threshold. Thresholds are ordered strictest first and never narrow, so a
//! payment trusted by feature k is trusted by every later feature too.
//!
//! Anything that prevents a distance from being computed (bad ids, unknown
//! people, no path) lands in the unreachable bucket: all features unverified.

use crate::{
    config::DetectorConfig,
    graph::PaymentGraph,
    ingest::parse_ids,
    types::{Hops, PersonId},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trust {
    Trusted,
    Unverified,
}

impl Trust {
    /// The literal token written to an output channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trusted => "trusted",
            Self::Unverified => "unverified",
        }
    }

    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Trusted)
    }
}

impl fmt::Display for Trust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decision per feature, in feature order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Verdict(Vec<Trust>);

impl Verdict {
    pub fn flags(&self) -> &[Trust] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Hop thresholds, one per feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    thresholds: Vec<Hops>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}

impl TrustPolicy {
    pub fn new(thresholds: Vec<Hops>) -> Self {
        Self { thresholds }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.features.iter().map(|f| f.max_hops).collect())
    }

    pub fn feature_count(&self) -> usize {
        self.thresholds.len()
    }

    /// Widest threshold. Distances beyond it classify as unreachable.
    pub fn horizon(&self) -> Hops {
        self.thresholds.iter().copied().max().unwrap_or(0)
    }

    /// `None` means unreachable.
    pub fn classify(&self, distance: Option<Hops>) -> Verdict {
        Verdict(
            self.thresholds
                .iter()
                .map(|&max_hops| match distance {
                    Some(hops) if hops <= max_hops => Trust::Trusted,
                    _ => Trust::Unverified,
                })
                .collect(),
        )
    }
}

/// Result for one streamed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Hop count, or `None` when unreachable or beyond the policy horizon.
    pub distance: Option<Hops>,
    pub verdict: Verdict,
    /// The line could not be parsed into two ids.
    pub malformed: bool,
}

/// Read-only view over a built graph. Cheap to copy into worker threads.
#[derive(Debug, Clone, Copy)]
pub struct ProximityClassifier<'g> {
    graph: &'g PaymentGraph,
    policy: &'g TrustPolicy,
}

impl<'g> ProximityClassifier<'g> {
    pub fn new(graph: &'g PaymentGraph, policy: &'g TrustPolicy) -> Self {
        Self { graph, policy }
    }

    pub fn policy(&self) -> &TrustPolicy {
        self.policy
    }

    pub fn classify_pair(&self, payer: PersonId, payee: PersonId) -> Classification {
        let distance = self
            .graph
            .shortest_path_length_within(payer, payee, self.policy.horizon());
        Classification {
            distance,
            verdict: self.policy.classify(distance),
            malformed: false,
        }
    }

    /// Classify a raw stream line. Never fails: a malformed line is unreachable.
    pub fn classify_line(&self, line: &str) -> Classification {
        match parse_ids(line) {
            Ok((payer, payee)) => self.classify_pair(payer, payee),
            Err(e) => {
                log::debug!("stream: treating malformed record as unverified: {e}");
                Classification {
                    distance: None,
                    verdict: self.policy.classify(None),
                    malformed: true,
                }
            }
        }
    }
}
