//! Blast-radius computation across repositories.
//!
//! For each requested repository the engine picks seeds (explicit ids or
//! keyword matches), computes the [`ImpactSet`](super::ImpactSet) and
//! folds it into the shared [`BlastRadius`] buckets. A single confidence
//! policy scores the result; its weights are the constants below.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::blast_radius::{push_unique, BlastRadius, RiskLevel};
use super::keywords::{extract_keywords, keyword_seeds};
use super::{impact_set, ImpactSet};
use crate::graph::{ids, GraphSnapshot};
use crate::registry::RepoRegistry;

pub const BASE_CONFIDENCE: f64 = 0.5;
pub const IMPACT_FOUND_BONUS: f64 = 0.15;
pub const INTERFACE_BONUS: f64 = 0.1;
pub const DB_OBJECT_BONUS: f64 = 0.05;
pub const MULTI_REPO_BONUS: f64 = 0.1;
pub const KEYWORD_BONUS: f64 = 0.05;
/// Keywords needed (strictly more than) for [`KEYWORD_BONUS`]
pub const KEYWORD_BONUS_THRESHOLD: usize = 2;
pub const GAP_PENALTY: f64 = 0.05;
/// Per non-empty bucket among systems, modules, interfaces, db objects
pub const CATEGORY_BONUS: f64 = 0.05;
pub const MIN_CONFIDENCE: f64 = 0.3;
pub const MAX_CONFIDENCE: f64 = 0.95;

pub const NO_TESTS_GAP: &str = "No tests found for impacted code";

const DB_NAMING_MARKERS: &[&str] = &["repository", "model", "entity"];

/// What is changing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSpec {
    /// Symbol ids believed to change
    Symbols(Vec<String>),
    /// Free-text description; seeds come from keyword matches
    Text(String),
}

/// A recorded past incident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Breakage {
    pub date: String,
    #[serde(default)]
    pub description: String,
}

/// Counts for a report header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactSummary {
    pub total_impact: usize,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub systems: usize,
    pub modules: usize,
    pub apis: usize,
    pub databases: usize,
}

/// Blast radius plus reviewer guidance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactReport {
    pub blast_radius: BlastRadius,
    pub summary: ImpactSummary,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Score a blast radius.
///
/// `keyword_count` is `None` for explicit seeds. The result always lies in
/// `[MIN_CONFIDENCE, MAX_CONFIDENCE]`.
pub fn score_confidence(radius: &BlastRadius, repo_count: usize, keyword_count: Option<usize>) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if radius.total_impact_count() > 0 {
        confidence += IMPACT_FOUND_BONUS;
    }
    if !radius.interfaces.is_empty() {
        confidence += INTERFACE_BONUS;
    }
    if !radius.db_objects.is_empty() {
        confidence += DB_OBJECT_BONUS;
    }
    if repo_count > 1 {
        confidence += MULTI_REPO_BONUS;
    }
    if keyword_count.is_some_and(|n| n > KEYWORD_BONUS_THRESHOLD) {
        confidence += KEYWORD_BONUS;
    }
    confidence -= GAP_PENALTY * radius.gaps.len() as f64;

    let categories = [
        &radius.systems,
        &radius.modules,
        &radius.interfaces,
        &radius.db_objects,
    ]
    .iter()
    .filter(|bucket| !bucket.is_empty())
    .count();
    confidence += CATEGORY_BONUS * categories as f64;

    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Table-like name for a data-access symbol id, if it looks like one.
///
/// `src/db.py::UserRepository` → `users`
fn db_object_name(symbol_id: &str) -> Option<String> {
    let lower = symbol_id.to_lowercase();
    if !DB_NAMING_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return None;
    }
    let (_, local) = symbol_id.rsplit_once(ids::SYMBOL_SEPARATOR)?;
    let entity = local.replace("Repository", "").replace("Model", "");
    Some(format!("{}s", entity.to_lowercase()))
}

/// Blast-radius computation over a [`RepoRegistry`].
pub struct BlastRadiusEngine<'a> {
    registry: &'a RepoRegistry,
    history: BTreeMap<String, Vec<Breakage>>,
}

impl<'a> BlastRadiusEngine<'a> {
    pub fn new(registry: &'a RepoRegistry) -> Self {
        Self {
            registry,
            history: BTreeMap::new(),
        }
    }

    /// Past breakages keyed by `<repo>:<symbol id>`.
    pub fn with_history(mut self, history: BTreeMap<String, Vec<Breakage>>) -> Self {
        self.history = history;
        self
    }

    /// Compute the blast radius of `change` across `repos`.
    ///
    /// Repositories that are unknown or not yet built are recorded as gaps.
    pub fn compute(&self, change: &ChangeSpec, repos: &[String], depth: usize) -> BlastRadius {
        let mut radius = BlastRadius::default();
        let keywords = match change {
            ChangeSpec::Text(text) => Some(extract_keywords(text)),
            ChangeSpec::Symbols(_) => None,
        };
        let mut tests_affected = 0usize;
        let mut breakages: Vec<&Breakage> = Vec::new();

        for repo in repos {
            let Some(snapshot) = self.registry.snapshot(repo) else {
                tracing::warn!(repo = %repo, "repository not available for analysis");
                push_unique(&mut radius.gaps, format!("Repository {} not available for analysis", repo));
                continue;
            };

            let seeds = match (change, &keywords) {
                (ChangeSpec::Symbols(seed_ids), _) => seed_ids.clone(),
                (ChangeSpec::Text(_), Some(keywords)) => keyword_seeds(&snapshot, keywords),
                (ChangeSpec::Text(_), None) => Vec::new(),
            };
            if seeds.is_empty() {
                continue;
            }

            let impact = impact_set(&snapshot, &seeds, depth);
            if impact.symbols.is_empty() {
                continue;
            }
            tracing::debug!(
                repo = %repo,
                seeds = seeds.len(),
                symbols = impact.symbols.len(),
                routes = impact.routes.len(),
                "impact computed"
            );

            self.add_code_impacts(&mut radius, &impact, repo);
            add_framework_impacts(&mut radius, &impact, repo, &snapshot);

            let test_files = impact
                .files
                .iter()
                .filter(|file| file.to_lowercase().contains("test"))
                .count();
            tests_affected += test_files;
            if test_files == 0 {
                push_unique(&mut radius.gaps, NO_TESTS_GAP);
            }

            for seed in &seeds {
                if let Some(found) = self.history.get(&format!("{}:{}", repo, seed)) {
                    breakages.extend(found);
                }
            }
        }

        radius.metadata.insert("tests_affected".into(), tests_affected.to_string());
        if let Some(first) = breakages.first() {
            radius
                .metadata
                .insert("past_breakages_count".into(), breakages.len().to_string());
            radius.metadata.insert("last_breakage".into(), first.date.clone());
        }

        let keyword_count = keywords.as_ref().map(BTreeSet::len);
        radius.confidence = score_confidence(&radius, repos.len(), keyword_count);

        radius.metadata.insert("analysis_depth".into(), depth.to_string());
        radius.metadata.insert("repos_analyzed".into(), repos.len().to_string());
        radius.metadata.insert(
            "seed_mode".into(),
            if keywords.is_some() { "keywords" } else { "symbols" }.into(),
        );
        if let Some(keywords) = &keywords {
            radius.metadata.insert(
                "keywords".into(),
                keywords.iter().cloned().collect::<Vec<_>>().join(","),
            );
        }

        tracing::info!(
            total = radius.total_impact_count(),
            confidence = radius.confidence,
            risk = %radius.risk_level(),
            gaps = radius.gaps.len(),
            "blast radius computed"
        );
        radius
    }

    fn add_code_impacts(&self, radius: &mut BlastRadius, impact: &ImpactSet, repo: &str) {
        push_unique(&mut radius.systems, repo);
        for file in &impact.files {
            push_unique(&mut radius.modules, ids::module_entry(repo, file));
        }
        for symbol in impact
            .symbols
            .iter()
            .take(self.registry.analysis().module_symbol_cap)
        {
            push_unique(&mut radius.modules, symbol.clone());
        }
    }

    /// Blast radius plus recommendations.
    pub fn report(&self, change: &ChangeSpec, repos: &[String], depth: usize) -> ImpactReport {
        let radius = self.compute(change, repos, depth);
        let recommendations = recommendations(&radius);
        ImpactReport {
            summary: ImpactSummary {
                total_impact: radius.total_impact_count(),
                risk_level: radius.risk_level(),
                confidence: radius.confidence,
                systems: radius.systems.len(),
                modules: radius.modules.len(),
                apis: radius.interfaces.len(),
                databases: radius.db_objects.len(),
            },
            recommendations,
            next_steps: vec![
                "Review impacted modules for breaking changes".into(),
                "Update tests for affected code paths".into(),
                "Document API changes if any".into(),
                "Plan deployment strategy based on risk level".into(),
            ],
            blast_radius: radius,
        }
    }
}

fn add_framework_impacts(radius: &mut BlastRadius, impact: &ImpactSet, repo: &str, snapshot: &GraphSnapshot) {
    for route_id in &impact.routes {
        if let Some(route) = snapshot.routes.get(route_id) {
            push_unique(&mut radius.interfaces, ids::route_id(&route.method, &route.path));
        }
    }
    for consumer in &impact.di_consumers {
        push_unique(&mut radius.modules, ids::di_module_entry(repo, consumer));
    }
    for symbol in &impact.symbols {
        if let Some(table) = db_object_name(symbol) {
            push_unique(&mut radius.db_objects, table);
        }
    }
}

const MANY_INTERFACES: usize = 5;
const GAPS_IN_RECOMMENDATION: usize = 3;

fn recommendations(radius: &BlastRadius) -> Vec<String> {
    let mut out = Vec::new();
    if radius.risk_level() == RiskLevel::High {
        out.push("HIGH RISK: consider breaking into smaller stories".to_string());
    }
    if radius.interfaces.len() > MANY_INTERFACES {
        out.push("Many API endpoints affected: update API documentation".to_string());
    }
    if !radius.db_objects.is_empty() {
        out.push("Database changes required: prepare migration scripts".to_string());
    }
    if !radius.gaps.is_empty() {
        let listed: Vec<&str> = radius
            .gaps
            .iter()
            .take(GAPS_IN_RECOMMENDATION)
            .map(String::as_str)
            .collect();
        out.push(format!("Analysis gaps: {}", listed.join(", ")));
    }
    if radius.metadata.get("tests_affected").map(String::as_str) == Some("0") {
        out.push("No tests found: add test coverage before implementation".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::framework::FrameworkKind;
    use crate::graph::CancelToken;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn built(root: &Path) -> RepoRegistry {
        let mut registry = RepoRegistry::new(AnalysisConfig::default());
        registry.register("shop", root, FrameworkKind::FileTreeRouting);
        registry.build("shop", &CancelToken::new()).unwrap();
        registry
    }

    #[test]
    fn test_db_object_name() {
        assert_eq!(db_object_name("src/db.py::UserRepository").as_deref(), Some("users"));
        assert_eq!(db_object_name("models.py::OrderModel").as_deref(), Some("orders"));
        assert_eq!(db_object_name("models/entity.py::Cart").as_deref(), Some("carts"));
        assert_eq!(db_object_name("src/util.py::helper"), None);
        assert_eq!(db_object_name("repository"), None);
    }

    #[test]
    fn test_unknown_repo_is_one_gap() {
        let registry = RepoRegistry::new(AnalysisConfig::default());
        let engine = BlastRadiusEngine::new(&registry);
        let radius = engine.compute(&ChangeSpec::Text("update user profile".into()), &["ghost".into()], 3);
        assert_eq!(radius.gaps, vec!["Repository ghost not available for analysis"]);
        assert!(radius.systems.is_empty());
    }

    #[test]
    fn test_keyword_blast_radius() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "app/api/orders/route.ts",
            "export async function POST() {\n  return createOrder();\n}\n\nfunction createOrder() {}\n",
        );
        write(temp.path(), "lib/order_repository.py", "class OrderRepository:\n    def save(self):\n        pass\n");
        let registry = built(temp.path());
        let engine = BlastRadiusEngine::new(&registry);

        let radius = engine.compute(&ChangeSpec::Text("Create order flow".into()), &["shop".into()], 2);
        assert_eq!(radius.systems, vec!["shop"]);
        assert!(radius.modules.contains(&"shop/app/api/orders/route.ts".to_string()));
        assert_eq!(radius.interfaces, vec!["POST /api/orders"]);
        assert!(radius.db_objects.contains(&"orders".to_string()));
        assert_eq!(radius.gaps, vec![NO_TESTS_GAP]);
        assert_eq!(radius.metadata["seed_mode"], "keywords");
        assert_eq!(radius.metadata["keywords"], "create,order");
        assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&radius.confidence));
    }

    #[test]
    fn test_confidence_policy() {
        let mut radius = BlastRadius::default();
        // nothing found, single repo, no keywords
        assert!((score_confidence(&radius, 1, None) - BASE_CONFIDENCE).abs() < 1e-9);

        radius.systems.push("api".into());
        radius.interfaces.push("GET /x".into());
        // 0.5 + 0.15 + 0.1 + 0.1 (repos) + 0.05 (keywords) + 2 * 0.05
        assert_eq!(score_confidence(&radius, 2, Some(3)), MAX_CONFIDENCE);
        // keyword bonus only above threshold
        let with_two = score_confidence(&radius, 1, Some(2));
        let with_three = score_confidence(&radius, 1, Some(3));
        assert!((with_three - with_two - KEYWORD_BONUS).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_clamped_under_extremes() {
        let mut radius = BlastRadius::default();
        radius.gaps = (0..100).map(|i| format!("gap {i}")).collect();
        assert_eq!(score_confidence(&radius, 1, None), MIN_CONFIDENCE);

        let full = BlastRadius {
            systems: vec!["a".into()],
            modules: vec!["a/x".into()],
            interfaces: vec!["GET /".into()],
            db_objects: vec!["users".into()],
            ..Default::default()
        };
        assert_eq!(score_confidence(&full, 50, Some(50)), MAX_CONFIDENCE);
    }

    #[test]
    fn test_history_and_report() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "orders.py", "def createOrder():\n    pass\n\ndef handleCheckout():\n    createOrder()\n");
        let registry = built(temp.path());

        let mut history = BTreeMap::new();
        history.insert(
            "shop:orders.py::createOrder".to_string(),
            vec![Breakage {
                date: "2024-03-01".into(),
                description: "checkout outage".into(),
            }],
        );
        let engine = BlastRadiusEngine::new(&registry).with_history(history);
        let report = engine.report(
            &ChangeSpec::Symbols(vec!["orders.py::createOrder".into()]),
            &["shop".into()],
            1,
        );

        let radius = &report.blast_radius;
        assert_eq!(radius.metadata["past_breakages_count"], "1");
        assert_eq!(radius.metadata["last_breakage"], "2024-03-01");
        assert_eq!(radius.metadata["seed_mode"], "symbols");
        assert_eq!(radius.gaps, vec![NO_TESTS_GAP]);
        assert_eq!(radius.metadata["tests_affected"], "0");
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.starts_with("No tests found")));
        assert_eq!(report.summary.systems, 1);
        assert_eq!(report.next_steps.len(), 4);
    }
}
