//! CLI argument parsing tests
//!
//! Tests for verifying clap argument parsing works correctly

use clap::Parser as ClapParser;
use patch_cli::Cli;

const BASE: [&str; 7] = [
    "jpatch",
    "--workspace",
    "ws.json",
    "--class",
    "demo/App",
    "--method",
    "run(I)V",
];

fn parse(extra: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(BASE.iter().chain(extra.iter()).copied())
}

/// Test parsing the required target only
#[test]
fn cli_parse_target_only() {
    let cli = parse(&[]).unwrap();

    assert_eq!(cli.workspace, "ws.json");
    assert_eq!(cli.class, "demo/App");
    assert_eq!(cli.method, "run(I)V");
    assert_eq!(cli.file, None);
    assert_eq!(cli.eval, None);
    assert!(!cli.repl);
    assert!(!cli.json);
    assert!(cli.options().strict_redeclaration);
}

/// Test that the target is required
#[test]
fn cli_parse_missing_target() {
    assert!(Cli::try_parse_from(["jpatch", "--eval", "int x = 1;"]).is_err());
}

/// Test parsing short forms
#[test]
fn cli_parse_short_flags() {
    let cli = Cli::try_parse_from([
        "jpatch", "-w", "ws.json", "-c", "demo.App", "-m", "run(I)V", "-e", "int x = 1;", "-v",
    ])
    .unwrap();

    assert_eq!(cli.class, "demo.App");
    assert_eq!(cli.eval.as_deref(), Some("int x = 1;"));
    assert!(cli.verbose);
}

/// Test parsing --file option
#[test]
fn cli_parse_file() {
    let cli = parse(&["--file", "patch.java"]).unwrap();
    assert_eq!(cli.file, Some("patch.java".to_string()));
}

/// Test that input sources are exclusive
#[test]
fn cli_parse_conflicting_inputs() {
    assert!(parse(&["--file", "a.java", "--eval", "x++;"]).is_err());
    assert!(parse(&["--eval", "x++;", "--repl"]).is_err());
}

/// Test output and option flags
#[test]
fn cli_parse_output_flags() {
    let cli = parse(&[
        "--repl",
        "--json",
        "--print-bytecode",
        "--lenient-redeclaration",
        "--metadata",
        "locals.json",
    ])
    .unwrap();

    assert!(cli.repl);
    assert!(cli.json);
    assert!(cli.print_bytecode);
    assert!(!cli.options().strict_redeclaration);
    assert_eq!(cli.metadata.as_deref(), Some("locals.json"));
}

/// Test the file constructor
#[test]
fn cli_with_file() {
    let cli = Cli::with_file("ws.json", "demo/App", "run(I)V", "patch.java");
    assert_eq!(cli, parse(&["--file", "patch.java"]).unwrap());
}
