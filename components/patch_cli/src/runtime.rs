//! Session orchestration for the CLI
//!
//! The [`Runtime`] loads the workspace, opens a [`PatchSession`] for the
//! method under edit and renders the fragments it compiles.

use crate::cli::Cli;
use crate::error::{CliError, CliResult};
use patch_compiler::{
    CompiledFragment, MethodMetadata, PatchSession, TargetContext, Workspace,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};

/// A local introduced by a fragment, as reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolReport {
    /// Variable name
    pub name: String,
    /// First local slot
    pub slot: u16,
    /// Number of slots
    pub width: u16,
    /// Field descriptor of the type
    pub descriptor: String,
}

/// A compiled fragment, as reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentReport {
    /// `code[]` bytes as hex pairs
    pub bytecode: String,
    /// Locals the method needs
    pub max_locals: u16,
    /// Operand stack the fragment needs
    pub max_stack: u16,
    /// Newly allocated locals
    pub introduced: Vec<SymbolReport>,
    /// Appended constant pool entries, `#index = entry`
    pub constants: Vec<String>,
    /// `(start_pc, line)` pairs
    pub line_numbers: Vec<(u16, u16)>,
}

impl FragmentReport {
    /// Summarize a fragment
    pub fn new(fragment: &CompiledFragment) -> Self {
        Self {
            bytecode: fragment.hex(),
            max_locals: fragment.max_locals,
            max_stack: fragment.max_stack,
            introduced: fragment
                .introduced_symbols
                .iter()
                .map(|slot| SymbolReport {
                    name: slot.name.clone(),
                    slot: slot.slot_index,
                    width: slot.width,
                    descriptor: slot.type_descriptor.descriptor(),
                })
                .collect(),
            constants: fragment
                .new_constants()
                .into_iter()
                .map(|(index, constant)| format!("#{} = {}", index, constant))
                .collect(),
            line_numbers: fragment.line_numbers.clone(),
        }
    }
}

/// Runs compilation passes for one method edit
pub struct Runtime {
    session: PatchSession,
    print_bytecode: bool,
    json: bool,
}

impl Runtime {
    /// Wrap an open session
    pub fn new(session: PatchSession) -> Self {
        Self {
            session,
            print_bytecode: false,
            json: false,
        }
    }

    /// Open the session described by the command line
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let workspace = Arc::new(load_workspace(&cli.workspace)?);
        let context = TargetContext::parse_method(workspace, cli.class.clone(), &cli.method)?;
        let session = match &cli.metadata {
            Some(path) => PatchSession::open(context, load_metadata(path)?, cli.options())?,
            None => PatchSession::open_target(context, cli.options())?,
        };
        Ok(Self::new(session)
            .with_print_bytecode(cli.print_bytecode)
            .with_json(cli.json))
    }

    /// Enable disassembly output
    pub fn with_print_bytecode(mut self, enabled: bool) -> Self {
        self.print_bytecode = enabled;
        self
    }

    /// Enable JSON output
    pub fn with_json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }

    /// Compile the statements in a file
    pub fn compile_file(&mut self, path: &str) -> CliResult<CompiledFragment> {
        let source = read(path)?;
        self.compile_source(&source)
    }

    /// Compile statement source as the next pass of the session
    pub fn compile_source(&mut self, source: &str) -> CliResult<CompiledFragment> {
        Ok(self.session.compile(source)?)
    }

    /// Text or JSON rendering of a fragment
    pub fn render(&self, fragment: &CompiledFragment) -> CliResult<String> {
        let report = FragmentReport::new(fragment);
        if self.json {
            return Ok(serde_json::to_string_pretty(&report)?);
        }

        let mut text = String::new();
        let _ = writeln!(text, "bytecode: {}", report.bytecode);
        let _ = writeln!(text, "max_locals: {}", report.max_locals);
        let _ = writeln!(text, "max_stack: {}", report.max_stack);
        if !report.introduced.is_empty() {
            let _ = writeln!(text, "introduced:");
            for symbol in &report.introduced {
                let _ = writeln!(
                    text,
                    "  {} {} @ {}",
                    symbol.descriptor, symbol.name, symbol.slot
                );
            }
        }
        if !report.constants.is_empty() {
            let _ = writeln!(text, "constants:");
            for constant in &report.constants {
                let _ = writeln!(text, "  {}", constant);
            }
        }
        if self.print_bytecode {
            if let Some(disassembly) = self.disassembly() {
                let _ = writeln!(text, "code:");
                text.push_str(&disassembly);
                let lines: Vec<String> = report
                    .line_numbers
                    .iter()
                    .map(|(pc, line)| format!("{}:{}", pc, line))
                    .collect();
                let _ = writeln!(text, "lines: {}", lines.join(" "));
            }
        }
        Ok(text)
    }

    /// Disassembly of the last pass
    pub fn disassembly(&self) -> Option<String> {
        self.session
            .hook()
            .handle()
            .map(|handle| handle.backend().pending_buffer().disassemble())
    }

    /// Variables known to the session, one per line
    pub fn symbols(&self) -> String {
        let allocator = self.session.allocator();
        let mut text = String::new();
        for slot in allocator.slots() {
            let _ = writeln!(
                text,
                "{:>4}  {} {}",
                slot.slot_index,
                slot.type_descriptor.display_name(),
                slot.name
            );
        }
        let _ = write!(text, "next free slot: {}", allocator.high_water_mark());
        text
    }

    /// Fold the session's variables into the seed and start a new session
    pub fn commit(&mut self) -> CliResult<MethodMetadata> {
        let next = self.session.commit()?;
        info!(locals = next.metadata().locals.len(), "committed session");
        self.session = next;
        Ok(self.session.metadata().clone())
    }

    /// Discard the session and start over from the last committed seed
    pub fn reset(&mut self) -> CliResult<()> {
        debug!(passes = self.session.passes(), "resetting session");
        self.session = self.session.reopen()?;
        Ok(())
    }

    /// The current session
    pub fn session(&self) -> &PatchSession {
        &self.session
    }

    /// Start the REPL
    pub fn repl(&mut self) -> CliResult<()> {
        crate::repl::run_repl(self)
    }

    /// Check if JSON output is enabled
    pub fn is_json_enabled(&self) -> bool {
        self.json
    }

    /// Check if disassembly output is enabled
    pub fn is_print_bytecode_enabled(&self) -> bool {
        self.print_bytecode
    }
}

/// Read a workspace description
pub fn load_workspace(path: &str) -> CliResult<Workspace> {
    let text = read(path)?;
    Workspace::from_json(&text).map_err(|source| CliError::Json {
        path: path.to_string(),
        source,
    })
}

/// Read a local variable table
pub fn load_metadata(path: &str) -> CliResult<MethodMetadata> {
    let text = read(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_string(),
        source,
    })
}

fn read(path: &str) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_string(),
        source,
    })
}
