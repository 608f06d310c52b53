use std::io::{self, BufRead, Write};
use std::process;

use avltree::Shell;
use clap::{ArgAction, Parser};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Interactive shell over an AVL tree with integer keys and string values.
///
/// Commands: `find <key>`, `insert <key> <value>`, `remove <key>`, `size`,
/// `print pre-order|in-order|post-order`, `print <rows> rows`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Turn debugging information on (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    debug: u8,

    /// Prompt printed before each command
    #[arg(long, default_value = "Enter a command: ")]
    prompt: String,

    /// Do not print a prompt, e.g. when reading commands from a pipe
    #[arg(long)]
    no_prompt: bool,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(filter.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
    debug!("logger initialized at {filter}");
}

fn run(cli: &Cli) -> io::Result<()> {
    let mut shell = Shell::new();
    let mut stdout = io::stdout().lock();
    let mut lines = io::stdin().lock().lines();

    loop {
        if !cli.no_prompt {
            write!(stdout, "{}", cli.prompt)?;
            stdout.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        if let Some(output) = shell.run_line(&line?) {
            writeln!(stdout, "{output}")?;
        }
    }

    info!(entries = shell.tree().len(), "input closed");
    Ok(())
}
