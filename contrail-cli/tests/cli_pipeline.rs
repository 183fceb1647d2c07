//! End-to-end command pipeline over a temporary store: import a
//! reference population, fit a tube, then score an unseen signal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use contrail_cli::{run, Cli};
use contrail_core::{ConfidenceTube, OpenMode, SignalStore, SignalTable};
use tempfile::TempDir;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("contrail").chain(args.iter().copied())).unwrap()
}

fn write_table(dir: &Path, name: &str, value: f64) -> PathBuf {
    let positions: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let mut columns = BTreeMap::new();
    columns.insert("x".to_string(), vec![value; 10]);
    let table = SignalTable::new(positions, columns).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(&table).unwrap()).unwrap();
    path
}

#[tokio::test]
async fn import_fit_score_pipeline() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("signals.db");
    let store_arg = store_path.to_str().unwrap();

    // Import creates the store on first use, then appends.
    for (name, value) in [("r0", 0.0), ("r5", 5.0), ("r10", 10.0)] {
        let file = write_table(dir.path(), &format!("{name}.json"), value);
        run(parse(&[
            "--store",
            store_arg,
            "import",
            file.to_str().unwrap(),
            "--id",
            name,
        ]))
        .await
        .unwrap();
    }

    let store = SignalStore::open(&store_path, OpenMode::ReadOnly)
        .await
        .unwrap();
    let mut ids = store.list_ids().await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["r0", "r10", "r5"]);
    store.close().await;

    let tube_path = dir.path().join("tube.json");
    run(parse(&[
        "--store",
        store_arg,
        "fit",
        "--variables",
        "x",
        "-k",
        "5",
        "-a",
        "0",
        "--ids",
        "r0,r5,r10",
        "--output",
        tube_path.to_str().unwrap(),
    ]))
    .await
    .unwrap();

    let tube = ConfidenceTube::load_json(&tube_path).unwrap();
    let band = tube.band("x").unwrap();
    assert_eq!(band.lower, vec![0.0; 5]);
    assert_eq!(band.upper, vec![10.0; 5]);

    // Score a signal outside the fit population against the saved tube.
    let file = write_table(dir.path(), "s12.json", 12.0);
    run(parse(&[
        "--store",
        store_arg,
        "import",
        file.to_str().unwrap(),
        "--id",
        "s12",
    ]))
    .await
    .unwrap();

    run(parse(&[
        "--store",
        store_arg,
        "score",
        "s12",
        "--tube",
        tube_path.to_str().unwrap(),
    ]))
    .await
    .unwrap();
}

#[tokio::test]
async fn score_fails_cleanly_on_malformed_tube_file() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("signals.db");
    let store_arg = store_path.to_str().unwrap();

    let file = write_table(dir.path(), "s.json", 1.0);
    run(parse(&[
        "--store",
        store_arg,
        "import",
        file.to_str().unwrap(),
        "--id",
        "s",
    ]))
    .await
    .unwrap();

    let tube_path = dir.path().join("bad.json");
    std::fs::write(
        &tube_path,
        r#"{"grid":[],"bands":{},"robustness_quantile":0.05,"reference_count":3}"#,
    )
    .unwrap();

    let result = run(parse(&[
        "--store",
        store_arg,
        "score",
        "s",
        "--tube",
        tube_path.to_str().unwrap(),
    ]))
    .await;
    assert!(result.is_err(), "malformed tube file should be rejected");
}
