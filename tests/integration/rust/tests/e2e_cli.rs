//! End-to-end CLI tests
//!
//! Drive the CLI runtime with workspace, metadata and source files on disk.

use patch_cli::{load_metadata, Cli, Runtime};
use std::fs;
use tempfile::TempDir;

const WORKSPACE: &str = r#"{
    "primary": {
        "name": "game.jar",
        "classes": [{
            "name": "game/Player",
            "super_name": "java/lang/Object",
            "constant_pool_count": 48,
            "fields": [
                {"name": "score", "descriptor": "I"},
                {"name": "MAX", "descriptor": "I", "is_static": true}
            ],
            "methods": [{
                "name": "hit",
                "descriptor": "(ID)V",
                "max_locals": 4,
                "locals": [
                    {"name": "this", "index": 0, "descriptor": "Lgame/Player;"},
                    {"name": "damage", "index": 1, "descriptor": "I"},
                    {"name": "scale", "index": 2, "descriptor": "D"}
                ]
            }]
        }]
    }
}"#;

struct Fixture {
    dir: TempDir,
    workspace: String,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workspace.json");
        fs::write(&path, WORKSPACE).unwrap();
        let workspace = path.to_str().unwrap().to_string();
        Self { dir, workspace }
    }

    fn file(&self, name: &str, text: &str) -> String {
        let path = self.dir.path().join(name);
        fs::write(&path, text).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn cli(&self, source: &str) -> Cli {
        let file = self.file("patch.java", source);
        Cli::with_file(self.workspace.clone(), "game/Player", "hit(ID)V", file)
    }
}

/// Test: a file using the method's named locals and class fields
#[test]
fn e2e_cli_compile_file() {
    let fixture = Fixture::new();
    let cli = fixture.cli(
        "int scaled = (int) (damage * scale);\nif (score + scaled > MAX) score = MAX; else score += scaled;\n",
    );

    let mut runtime = Runtime::from_cli(&cli).unwrap();
    let fragment = runtime.compile_file(cli.file.as_ref().unwrap()).unwrap();

    assert_eq!(fragment.introduced_symbols.names(), vec!["scaled"]);
    assert_eq!(fragment.introduced_symbols.get("scaled").map(|s| s.slot_index), Some(4));
    assert_eq!(fragment.max_locals, 5);
    // iload_1 i2d dload_2 dmul d2i istore 4
    assert_eq!(&fragment.bytecode[..7], &[0x1b, 0x87, 0x28, 0x6b, 0x8e, 0x36, 0x04]);
}

/// Test: metadata file replaces the workspace's local table
#[test]
fn e2e_cli_metadata_override() {
    let fixture = Fixture::new();
    let metadata = fixture.file(
        "locals.json",
        r#"{"max_locals": 6, "locals": [{"name": "bonus", "index": 5, "descriptor": "I"}]}"#,
    );
    assert_eq!(load_metadata(&metadata).unwrap().max_locals, 6);

    let mut cli = fixture.cli("score += bonus; int next = bonus + 1;");
    cli.metadata = Some(metadata);
    let mut runtime = Runtime::from_cli(&cli).unwrap();
    let fragment = runtime.compile_file(cli.file.as_ref().unwrap()).unwrap();
    assert_eq!(fragment.introduced_symbols.get("next").map(|s| s.slot_index), Some(6));
}

/// Test: lenient redeclaration keeps the first type
#[test]
fn e2e_cli_lenient_redeclaration() {
    let fixture = Fixture::new();
    let mut cli = fixture.cli("");
    cli.lenient_redeclaration = true;

    let mut runtime = Runtime::from_cli(&cli).unwrap();
    runtime.compile_source("int combo = 1;").unwrap();
    let fragment = runtime.compile_source("double combo = 2;").unwrap();
    // iconst_2 istore 4
    assert_eq!(fragment.bytecode, vec![0x05, 0x36, 0x04]);
}

/// Test: JSON report fields
#[test]
fn e2e_cli_json_report() {
    let fixture = Fixture::new();
    let mut cli = fixture.cli("String tag = \"p\" + score;");
    cli.json = true;

    let mut runtime = Runtime::from_cli(&cli).unwrap();
    let fragment = runtime.compile_file(cli.file.as_ref().unwrap()).unwrap();
    let report = runtime.render(&fragment).unwrap();
    assert!(report.contains("\"introduced\""));
    assert!(report.contains("\"descriptor\": \"Ljava/lang/String;\""));
    assert!(report.contains("\"slot\": 4"));
}
