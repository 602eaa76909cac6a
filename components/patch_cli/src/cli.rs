//! Command line arguments

use clap::Parser;
use patch_compiler::PatchOptions;

/// jpatch - compile Java statements into bytecode for a method edit
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "jpatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Workspace description (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub workspace: String,

    /// Class under edit, e.g. com/example/Foo or com.example.Foo
    #[arg(short, long, value_name = "NAME")]
    pub class: String,

    /// Method under edit as name and descriptor, e.g. 'run(I)V'
    #[arg(short, long, value_name = "NAME+DESCRIPTOR")]
    pub method: String,

    /// Local variable table of the method (JSON), overriding the workspace
    #[arg(long, value_name = "FILE")]
    pub metadata: Option<String>,

    /// Compile the statements in a file
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["eval", "repl"])]
    pub file: Option<String>,

    /// Compile inline statements
    #[arg(short, long, value_name = "CODE", conflicts_with = "repl")]
    pub eval: Option<String>,

    /// Start an interactive session
    #[arg(short, long)]
    pub repl: bool,

    /// Print a disassembly of each fragment
    #[arg(long)]
    pub print_bytecode: bool,

    /// Print fragments as JSON
    #[arg(long)]
    pub json: bool,

    /// Allow redeclaring a local with a different storage kind
    #[arg(long)]
    pub lenient_redeclaration: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Arguments for compiling `file` in `class.method`
    pub fn with_file(
        workspace: impl Into<String>,
        class: impl Into<String>,
        method: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            class: class.into(),
            method: method.into(),
            metadata: None,
            file: Some(file.into()),
            eval: None,
            repl: false,
            print_bytecode: false,
            json: false,
            lenient_redeclaration: false,
            verbose: false,
        }
    }

    /// Compilation options selected by the flags
    pub fn options(&self) -> PatchOptions {
        PatchOptions::default().with_strict_redeclaration(!self.lenient_redeclaration)
    }
}
