//! Full pipeline over files on disk: recorded coverage, outline sidecars,
//! filesystem sources and the results file the CLI writes

use cl_core::{CoverageProfile, CoverageSpan, OrderKind};
use cli_lib::{diff_utils, results, RecordedRunner};
use engine::{CommitLog, EngineConfig, FsSourceStore, JobConfig};
use journal::JobState;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use syntax::{IdentRole, Outline, OutlineNode, OutlineProvider, Slot, TextRange};
use syntax::provider::OutlineKind;
use tempfile::TempDir;

const SOURCE: &str = "package demo

type Pair struct {
\tUsed, Unused int
}

func helper() int {
\treturn 2
}

func Run(big bool) int {
\tvar p Pair
\tif big {
\t\tp.Used = helper()
\t}
\treturn p.Used
}
";

const SMALL_SNAPSHOT: &str = "package demo

type Pair struct {
\tUsed int
}


func Run(big bool) int {
\tvar p Pair
\tif big {
\t}
\treturn p.Used
}
";

fn node(kind: OutlineKind, slot: Slot, range: TextRange, children: Vec<OutlineNode>) -> OutlineNode {
    OutlineNode {
        kind,
        name: None,
        role: IdentRole::Ref,
        label: None,
        range: Some(range),
        slot,
        children,
    }
}

fn other(label: &str, slot: Slot, range: TextRange, children: Vec<OutlineNode>) -> OutlineNode {
    OutlineNode {
        label: Some(label.to_string()),
        ..node(OutlineKind::Other, slot, range, children)
    }
}

fn ident(name: &str, role: IdentRole, slot: Slot, range: TextRange) -> OutlineNode {
    OutlineNode {
        name: Some(name.to_string()),
        role,
        ..node(OutlineKind::Ident, slot, range, vec![])
    }
}

fn r(start: (u32, u32), end: (u32, u32)) -> TextRange {
    TextRange::new(start, end)
}

fn outline() -> Outline {
    use IdentRole::{Decl, Ref};
    use OutlineKind as K;
    use Slot::{Element, Field};

    let package = other("package", Field, r((1, 1), (1, 13)), vec![ident("demo", Decl, Field, r((1, 9), (1, 13)))]);

    let pair = node(K::Decl, Element, r((3, 1), (5, 2)), vec![node(
        K::Binding,
        Element,
        r((3, 6), (5, 2)),
        vec![
            ident("Pair", Decl, Field, r((3, 6), (3, 10))),
            other("struct", Field, r((3, 11), (5, 2)), vec![node(
                K::NameGroup,
                Element,
                r((4, 2), (4, 18)),
                vec![
                    ident("Used", Decl, Element, r((4, 2), (4, 6))),
                    ident("Unused", Decl, Element, r((4, 8), (4, 14))),
                    ident("int", Ref, Field, r((4, 15), (4, 18))),
                ],
            )]),
        ],
    )]);

    let helper = node(K::Decl, Element, r((7, 1), (9, 2)), vec![
        ident("helper", Decl, Field, r((7, 6), (7, 12))),
        other("block", Field, r((7, 19), (9, 2)), vec![other("return", Element, r((8, 2), (8, 10)), vec![])]),
    ]);

    let var = node(K::Decl, Element, r((12, 2), (12, 12)), vec![node(
        K::NameGroup,
        Element,
        r((12, 6), (12, 12)),
        vec![
            ident("p", Decl, Element, r((12, 6), (12, 7))),
            ident("Pair", Ref, Field, r((12, 8), (12, 12))),
        ],
    )]);

    let if_stmt = other("if", Element, r((13, 2), (15, 3)), vec![
        ident("big", Ref, Field, r((13, 5), (13, 8))),
        other("block", Field, r((13, 9), (15, 3)), vec![other("assign", Element, r((14, 3), (14, 20)), vec![
            ident("p", Ref, Field, r((14, 3), (14, 4))),
            ident("Used", Ref, Field, r((14, 5), (14, 9))),
            ident("helper", Ref, Field, r((14, 12), (14, 18))),
        ])]),
    ]);

    let ret = other("return", Element, r((16, 2), (16, 15)), vec![
        ident("p", Ref, Field, r((16, 9), (16, 10))),
        ident("Used", Ref, Field, r((16, 11), (16, 15))),
    ]);

    let run = node(K::Decl, Element, r((11, 1), (17, 2)), vec![
        ident("Run", Decl, Field, r((11, 6), (11, 9))),
        other("params", Field, r((11, 9), (11, 19)), vec![node(K::NameGroup, Element, r((11, 10), (11, 18)), vec![
            ident("big", Decl, Element, r((11, 10), (11, 13))),
            ident("bool", Ref, Field, r((11, 14), (11, 18))),
        ])]),
        other("block", Field, r((11, 24), (17, 2)), vec![var, if_stmt, ret]),
    ]);

    Outline {
        nodes: vec![package, pair, helper, run],
    }
}

fn profile(helper: bool, branch: bool) -> Vec<CoverageProfile> {
    vec![CoverageProfile::new(
        "demo/main.go",
        vec![
            CoverageSpan::new((7, 19), (9, 2), helper),
            CoverageSpan::new((11, 24), (13, 10), true),
            CoverageSpan::new((13, 10), (15, 2), branch),
            CoverageSpan::new((15, 2), (17, 2), true),
        ],
    )]
}

fn write_json(path: &Path, value: &impl serde::Serialize) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

struct Workspace {
    _dir: TempDir,
    root: std::path::PathBuf,
    profiles: std::path::PathBuf,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("src");
    let profiles = dir.path().join("profiles");

    let source_path = root.join("demo/main.go");
    std::fs::create_dir_all(source_path.parent().unwrap()).unwrap();
    std::fs::write(&source_path, SOURCE).unwrap();
    write_json(&root.join("demo/main.go.outline.json"), &outline());

    let runner = RecordedRunner::new(&profiles);
    write_json(&runner.profile_path("demo", "TestSmall"), &profile(false, false));
    write_json(&runner.profile_path("demo", "TestBig"), &profile(true, true));

    Workspace {
        _dir: dir,
        root,
        profiles,
    }
}

fn app(ws: &Workspace) -> CommitLog {
    CommitLog::new(
        Arc::new(RecordedRunner::new(&ws.profiles)),
        Arc::new(FsSourceStore::new(&ws.root)),
        Arc::new(OutlineProvider::new()),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn test_recorded_job_end_to_end() {
    let ws = workspace();
    let app = app(&ws);

    let id = app
        .start_job(JobConfig {
            pkg: "demo".to_string(),
            tests: vec!["TestBig".to_string(), "TestSmall".to_string()],
            order: OrderKind::Net,
        })
        .unwrap();
    let entry = app.wait_for(&id, Duration::from_millis(5)).await.unwrap();

    let JobState::Complete(outcome) = entry.state() else {
        panic!("job did not complete: {:?}", entry);
    };
    assert_eq!(outcome.tests, vec!["TestSmall", "TestBig"]);
    assert_eq!(outcome.files.len(), 3);

    let key = ws.root.join("demo/main.go").to_string_lossy().into_owned();
    let small = String::from_utf8(outcome.files[0][&key].clone()).unwrap();
    assert_eq!(small, SMALL_SNAPSHOT);

    // Everything runs once TestBig is in, but Unused is still dead
    let big = String::from_utf8(outcome.files[1][&key].clone()).unwrap();
    assert!(big.contains("\tUsed int\n"));
    assert!(big.contains("helper()"));
    assert_eq!(outcome.files[2][&key], SOURCE.as_bytes());

    let diff = diff_utils::diff_snapshots(&outcome.files[0], &outcome.files[1], 1);
    assert!(diff.contains("+\t\tp.Used = helper()"));
}

#[tokio::test]
async fn test_results_file_round_trip() {
    let ws = workspace();
    let app = app(&ws);

    let id = app
        .start_job(JobConfig {
            pkg: "demo".to_string(),
            tests: vec!["TestSmall".to_string()],
            order: OrderKind::Hardcoded,
        })
        .unwrap();
    let entry = app.wait_for(&id, Duration::from_millis(5)).await.unwrap();

    let out = ws.root.join("commitlog.json");
    results::save(&out, &entry).unwrap();
    let loaded = results::load(&out).unwrap();

    assert_eq!(Some(loaded.clone()), entry.results);
    assert_eq!(results::label(&loaded, 0), "after TestSmall");

    // Checking out the first snapshot rewrites the source on disk
    app.checkout(results::snapshot(&loaded, 0).unwrap()).await.unwrap();
    let on_disk = std::fs::read_to_string(ws.root.join("demo/main.go")).unwrap();
    assert_eq!(on_disk, SMALL_SNAPSHOT);
}

#[tokio::test]
async fn test_missing_recording_fails_job() {
    let ws = workspace();
    let app = app(&ws);

    let id = app
        .start_job(JobConfig {
            pkg: "demo".to_string(),
            tests: vec!["TestAbsent".to_string()],
            order: OrderKind::Hardcoded,
        })
        .unwrap();
    let entry = app.wait_for(&id, Duration::from_millis(5)).await.unwrap();

    let JobState::Failed(error) = entry.state() else {
        panic!("job should have failed: {:?}", entry);
    };
    assert!(error.contains("No recorded coverage"), "{}", error);
}
