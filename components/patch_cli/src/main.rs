//! jpatch - live method patch compiler
//!
//! Entry point for the CLI. Parses arguments, installs logging and
//! delegates to the Runtime.

use clap::Parser as ClapParser;
use patch_cli::{Cli, CliResult, Runtime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let mut runtime = Runtime::from_cli(cli)?;

    if let Some(file) = &cli.file {
        let fragment = runtime.compile_file(file)?;
        println!("{}", runtime.render(&fragment)?.trim_end());
    } else if let Some(code) = &cli.eval {
        let fragment = runtime.compile_source(code)?;
        println!("{}", runtime.render(&fragment)?.trim_end());
    } else if cli.repl {
        runtime.repl()?;
    } else {
        println!("jpatch v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage:");
        println!("  jpatch -w <WS> -c <CLASS> -m <METHOD> --file <FILE>   Compile a file");
        println!("  jpatch -w <WS> -c <CLASS> -m <METHOD> --eval <CODE>   Compile inline statements");
        println!("  jpatch -w <WS> -c <CLASS> -m <METHOD> --repl          Start interactive session");
        println!();
        println!("Run 'jpatch --help' for more options.");
    }

    Ok(())
}
