//! Impact sets, blast radius scoring and snapshot publication.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use blastmap::graph::export::EXPORT_FILES;
use blastmap::impact::engine::{score_confidence, MAX_CONFIDENCE, MIN_CONFIDENCE};
use blastmap::{
    export_graphs, impact_set, AnalysisConfig, BlastRadius, CancelToken, ChangeSpec, CodeIntelligence, Config,
    Error, FrameworkKind, GraphBuilder, RepoRegistry,
};
use tempfile::TempDir;

const ORDERS: &str = "def createOrder(cart):\n    return persist(cart)\n\ndef persist(cart):\n    return cart\n\ndef handleCheckout(cart):\n    return createOrder(cart)\n";

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

#[test]
fn test_seed_caller_is_impacted() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "orders.py", ORDERS);
    let snapshot = GraphBuilder::new(temp.path()).build().unwrap();

    let impact = impact_set(&snapshot, &["orders.py::createOrder"], 1);

    assert!(impact.symbols.contains("orders.py::handleCheckout"));
    assert!(impact.symbols.contains("orders.py::persist"));
    assert!(impact.files.contains("orders.py"));
    assert!(impact.routes.is_empty());
    assert!(impact.di_consumers.is_empty());
}

#[test]
fn test_unknown_repository_is_one_gap() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "orders.py", ORDERS);
    let mut registry = RepoRegistry::new(AnalysisConfig::default());
    registry.register("shop", temp.path(), FrameworkKind::None);
    let service = CodeIntelligence::new(registry);
    service.ensure_built("shop", &CancelToken::new()).unwrap();

    let change = ChangeSpec::Symbols(vec!["orders.py::createOrder".to_string()]);
    let radius = service.blast_radius_of(&change, &["shop".to_string(), "ghost".to_string()], None);

    let ghost_gaps: Vec<&String> = radius.gaps.iter().filter(|gap| gap.contains("ghost")).collect();
    assert_eq!(ghost_gaps.len(), 1);
    assert_eq!(radius.systems, vec!["shop"]);
    assert!(radius.modules.contains(&"shop/orders.py".to_string()));
    assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&radius.confidence));
}

#[test]
fn test_only_unknown_repository() {
    let service = CodeIntelligence::new(RepoRegistry::new(AnalysisConfig::default()));
    let change = ChangeSpec::Text("update the user profile".to_string());

    let radius = service.blast_radius_of(&change, &["ghost".to_string()], Some(2));

    assert_eq!(radius.gaps, vec!["Repository ghost not available for analysis"]);
    assert_eq!(radius.total_impact_count(), 0);
    assert_eq!(radius.metadata["seed_mode"], "keywords");
}

#[test]
fn test_confidence_always_clamped() {
    for gaps in [0usize, 1, 3, 10, 40] {
        for filled in [false, true] {
            for repo_count in [0usize, 1, 2, 5] {
                for keywords in [None, Some(0), Some(3), Some(50)] {
                    let mut radius = BlastRadius::default();
                    radius.gaps = (0..gaps).map(|i| format!("gap {i}")).collect();
                    if filled {
                        radius.systems.push("shop".into());
                        radius.modules.push("shop/a.py".into());
                        radius.interfaces.push("GET /a".into());
                        radius.db_objects.push("users".into());
                    }
                    let confidence = score_confidence(&radius, repo_count, keywords);
                    assert!(
                        (MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&confidence),
                        "confidence {confidence} out of bounds"
                    );
                }
            }
        }
    }

    let mut flooded = BlastRadius::default();
    flooded.gaps = (0..100).map(|i| i.to_string()).collect();
    assert_eq!(score_confidence(&flooded, 1, Some(0)), MIN_CONFIDENCE);
}

#[test]
fn test_failed_rebuild_keeps_previous_snapshot() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "orders.py", ORDERS);
    let mut registry = RepoRegistry::new(AnalysisConfig::default());
    registry.register("shop", temp.path(), FrameworkKind::None);

    let first = registry.build("shop", &CancelToken::new()).unwrap();

    write(temp.path(), "extra.py", "def extra():\n    pass\n");
    let cancelled = CancelToken::new();
    cancelled.cancel();
    let result = registry.build("shop", &cancelled);

    assert!(matches!(result, Err(Error::Cancelled(_))));
    let current = registry.snapshot("shop").unwrap();
    assert!(Arc::ptr_eq(&first, &current));
    assert!(!current.files.contains_key("extra.py"));
}

#[test]
fn test_config_driven_blast_radius() {
    let temp = TempDir::new().unwrap();
    write(
        &temp.path().join("shop"),
        "users.py",
        "def updateUserProfile(user):\n    return save(user)\n\ndef save(user):\n    return user\n",
    );
    write(
        &temp.path().join("shop"),
        "tests/test_users.py",
        "def test_update():\n    assert True\n",
    );
    write(
        temp.path(),
        "blastmap.toml",
        "[analysis]\ndefault_depth = 2\n\n[repos.shop]\npath = \"shop\"\n",
    );

    let config = Config::load(Some(&temp.path().join("blastmap.toml"))).unwrap();
    assert_eq!(config.repos["shop"].path, temp.path().join("shop"));
    let service = CodeIntelligence::from_config(&config).unwrap();
    service.ensure_built("shop", &CancelToken::new()).unwrap();

    let report = service.impact_of(
        &ChangeSpec::Text("Update user profile".to_string()),
        &["shop".to_string()],
        None,
    );

    let radius = &report.blast_radius;
    assert_eq!(radius.systems, vec!["shop"]);
    assert!(radius.modules.contains(&"shop/users.py".to_string()));
    assert_eq!(radius.metadata["analysis_depth"], "2");
    assert_eq!(radius.metadata["keywords"], "profile,update,user");
    assert_eq!(report.summary.total_impact, radius.total_impact_count());
    assert!(report.blast_radius.to_markdown().starts_with("## Blast Radius"));
}

#[test]
fn test_export_writes_every_graph() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app/health/route.ts", "export function GET() {}\n");
    write(temp.path(), "orders.py", ORDERS);
    let snapshot = GraphBuilder::new(temp.path())
        .framework(FrameworkKind::FileTreeRouting)
        .build()
        .unwrap();
    let out = TempDir::new().unwrap();

    export_graphs(&snapshot, out.path()).unwrap();

    for name in EXPORT_FILES {
        assert!(out.path().join(name).is_file(), "{name} missing");
    }
    let symbols: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("symbol_graph.json")).unwrap()).unwrap();
    let calls = symbols["links"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|link| link["type"] == "calls")
        .count();
    assert!(calls >= 2);

    let routes: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("routes.json")).unwrap()).unwrap();
    assert_eq!(routes["GET /health"]["file_path"], "app/health/route.ts");
}
