//! REPL (Read-Eval-Print Loop) implementation
//!
//! Every complete input is one compilation pass of the runtime's session.

use crate::error::{CliError, CliResult};
use crate::runtime::Runtime;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;

/// Run the interactive REPL
pub fn run_repl(runtime: &mut Runtime) -> CliResult<()> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| CliError::Repl(format!("Failed to initialize editor: {}", e)))?;

    let context = runtime.session().context();
    println!(
        "jpatch {} - editing {}.{}{}",
        env!("CARGO_PKG_VERSION"),
        context.class_name,
        context.method_name,
        context.method_descriptor
    );
    println!("Type Java statements, .help for commands or 'exit' to quit.");
    println!();

    let mut line_buffer = String::new();
    let mut in_multiline = false;

    loop {
        let prompt = if in_multiline { "... " } else { "> " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if !in_multiline && (trimmed == "exit" || trimmed == ".exit" || trimmed == "quit") {
                    break;
                }

                if !in_multiline && trimmed.starts_with('.') {
                    handle_repl_command(trimmed, runtime);
                    continue;
                }

                if in_multiline {
                    line_buffer.push('\n');
                }
                line_buffer.push_str(&line);

                if !is_input_complete(&line_buffer) {
                    in_multiline = true;
                    continue;
                }
                in_multiline = false;
                let _ = editor.add_history_entry(&line_buffer);

                match runtime.compile_source(&line_buffer) {
                    Ok(fragment) => match runtime.render(&fragment) {
                        Ok(text) => println!("{}", text.trim_end()),
                        Err(e) => eprintln!("Error: {}", e),
                    },
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        // a failed pass poisons the session
                        if let Err(reset) = runtime.reset() {
                            warn!(error = %reset, "cannot reopen session");
                            return Err(reset);
                        }
                        eprintln!("(session reopened from the last commit)");
                    }
                }
                line_buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                if in_multiline {
                    println!("^C");
                    line_buffer.clear();
                    in_multiline = false;
                } else {
                    println!("Press Ctrl-D or type 'exit' to quit");
                }
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                return Err(CliError::Repl(format!("Readline error: {}", err)));
            }
        }
    }

    Ok(())
}

/// Handle special REPL commands
fn handle_repl_command(command: &str, runtime: &mut Runtime) {
    match command {
        ".help" => {
            println!("REPL Commands:");
            println!("  .symbols  - List the variables of the session");
            println!("  .commit   - Keep the new variables and start a new session");
            println!("  .reset    - Drop uncommitted variables");
            println!("  .help     - Show this help message");
            println!("  exit      - Exit the REPL");
        }
        ".symbols" => println!("{}", runtime.symbols()),
        ".commit" => match runtime.commit() {
            Ok(metadata) => println!(
                "committed {} locals, max_locals {}",
                metadata.locals.len(),
                metadata.max_locals
            ),
            Err(e) => eprintln!("Error: {}", e),
        },
        ".reset" => match runtime.reset() {
            Ok(()) => println!("session reset"),
            Err(e) => eprintln!("Error: {}", e),
        },
        _ => {
            println!("Unknown command: {}", command);
            println!("Type .help for available commands");
        }
    }
}

/// Check if the input has balanced braces, brackets and parentheses outside
/// string and char literals
fn is_input_complete(input: &str) -> bool {
    let mut depth = 0i32;
    let mut in_literal = false;
    let mut quote = ' ';
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if in_literal {
            match c {
                '\\' => escape_next = true,
                c if c == quote => in_literal = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                in_literal = true;
                quote = c;
            }
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && !in_literal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_input_complete_simple() {
        assert!(is_input_complete("int x = 42;"));
        assert!(is_input_complete("System.out.println(x);"));
    }

    #[test]
    fn test_is_input_complete_open_block() {
        assert!(!is_input_complete("for (int i = 0; i < 3; i++) {"));
        assert!(!is_input_complete("if (x > 1) {\n  x--;"));
    }

    #[test]
    fn test_is_input_complete_closed_block() {
        assert!(is_input_complete("while (x > 0) { x--; }"));
    }

    #[test]
    fn test_is_input_complete_literals() {
        assert!(is_input_complete(r#"String s = "brace {";"#));
        assert!(is_input_complete("char c = '(';"));
        assert!(is_input_complete(r#"String q = "say \"}\"";"#));
        assert!(!is_input_complete(r#"String s = "unclosed"#));
    }
}
