//! Categorized impact of a change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Coarse risk bucket derived from impact count and confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Impact surface of a change, grouped by category.
///
/// Lists keep insertion order and never hold duplicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BlastRadius {
    /// Repositories with impact
    pub systems: Vec<String>,
    /// `<repo>/<file>`, raw symbol ids and `<repo>/DI:<consumer>`
    pub modules: Vec<String>,
    /// `METHOD path`
    pub interfaces: Vec<String>,
    pub contracts: Vec<String>,
    /// Table-like names inferred from data-access symbols
    pub db_objects: Vec<String>,
    pub queues: Vec<String>,
    pub configs: Vec<String>,
    /// Known limitations of this analysis
    pub gaps: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub confidence: f64,
}

/// Push `value` unless already present.
pub(crate) fn push_unique(list: &mut Vec<String>, value: impl Into<String>) {
    let value = value.into();
    if !list.contains(&value) {
        list.push(value);
    }
}

const HIGH_IMPACT_COUNT: usize = 10;
const MEDIUM_IMPACT_COUNT: usize = 5;
const HIGH_RISK_CONFIDENCE: f64 = 0.6;
const MEDIUM_RISK_CONFIDENCE: f64 = 0.8;

impl BlastRadius {
    /// Items across every category except contracts and gaps.
    pub fn total_impact_count(&self) -> usize {
        self.systems.len()
            + self.modules.len()
            + self.interfaces.len()
            + self.db_objects.len()
            + self.queues.len()
            + self.configs.len()
    }

    pub fn risk_level(&self) -> RiskLevel {
        let total = self.total_impact_count();
        if total == 0 {
            RiskLevel::Low
        } else if total > HIGH_IMPACT_COUNT || self.confidence < HIGH_RISK_CONFIDENCE {
            RiskLevel::High
        } else if total > MEDIUM_IMPACT_COUNT || self.confidence < MEDIUM_RISK_CONFIDENCE {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Markdown summary: risk header, then one bulleted section per
    /// non-empty category.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Blast Radius\n\n");
        out.push_str(&format!("**Risk Level**: {}\n", self.risk_level()));
        out.push_str(&format!("**Confidence**: {:.0}%\n", self.confidence * 100.0));
        out.push_str(&format!("**Total Impact**: {} items\n\n", self.total_impact_count()));

        let sections: [(&str, &Vec<String>); 7] = [
            ("Systems", &self.systems),
            ("Modules", &self.modules),
            ("Interfaces", &self.interfaces),
            ("Database Objects", &self.db_objects),
            ("Message Queues", &self.queues),
            ("Configurations", &self.configs),
            ("Known Gaps", &self.gaps),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("### {}\n", title));
            for item in items {
                out.push_str(&format!("- {}\n", item));
            }
            out.push('\n');
        }
        out
    }
}
