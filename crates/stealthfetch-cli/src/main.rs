//! Stealthfetch CLI - stdio MCP server and one-shot tool runner

mod mcp;

use clap::{Parser, Subcommand};
use stealthfetch::{Impersonate, Toolkit, DEFAULT_TIMEOUT, TOOL_LLMTXT};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// Stealthfetch - read-only web fetch tools with browser-like fingerprints
#[derive(Parser, Debug)]
#[command(name = "stealthfetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print full help with examples (llmtxt)
    #[arg(long)]
    llmtxt: bool,

    /// Default browser profile for calls that do not name one
    #[arg(long, global = true, default_value = "chrome")]
    impersonate: Impersonate,

    /// Default request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT)]
    timeout: f64,

    /// Do not follow redirects unless a call asks for it
    #[arg(long, global = true)]
    no_follow_redirects: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as MCP (Model Context Protocol) server over stdio
    Mcp,
    /// Run one tool and print its output
    Call {
        /// Tool name, e.g. stealth_fetch_text
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },
    /// List available tools
    Tools,
}

fn init_tracing() {
    // stdout carries MCP traffic; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn build_toolkit(cli: &Cli) -> Toolkit {
    let built = Toolkit::builder()
        .impersonate(cli.impersonate)
        .timeout(cli.timeout)
        .follow_redirects(!cli.no_follow_redirects)
        .build();
    match built {
        Ok(toolkit) => toolkit,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.llmtxt {
        writeln_safe(TOOL_LLMTXT);
        std::process::exit(0);
    }

    init_tracing();

    match &cli.command {
        Some(Commands::Mcp) => {
            let toolkit = build_toolkit(&cli);
            mcp::run_server(toolkit).await;
        }
        Some(Commands::Call { tool, args }) => {
            let toolkit = build_toolkit(&cli);
            run_call(&toolkit, tool, args).await;
        }
        Some(Commands::Tools) => {
            let toolkit = build_toolkit(&cli);
            writeln_safe(&format_tool_list(&toolkit));
        }
        None => {
            eprintln!("Usage: stealthfetch call <TOOL> '<JSON-ARGS>'");
            eprintln!("   or: stealthfetch mcp");
            eprintln!("   or: stealthfetch --help");
            std::process::exit(1);
        }
    }
}

async fn run_call(toolkit: &Toolkit, tool: &str, args: &str) {
    let arguments: serde_json::Value = match serde_json::from_str(args) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error: arguments are not valid JSON: {}", e);
            std::process::exit(2);
        }
    };

    match toolkit.call(tool, arguments).await {
        Ok(output) => writeln_safe(&output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// One `name - first sentence` line per tool
fn format_tool_list(toolkit: &Toolkit) -> String {
    toolkit
        .tools()
        .iter()
        .map(|tool| {
            let summary = tool
                .description
                .split_once(". ")
                .map(|(first, _)| first)
                .unwrap_or(tool.description)
                .trim_end_matches('.');
            format!("{} - {}", tool.name, summary)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
