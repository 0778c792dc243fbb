use anyhow::Result;
use clap::{Arg, Command};
use lexi_mcp::{AskRequest, ServerConfig, ask_once, run_server};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("lexi-mcp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lexi Model Context Protocol server for textbook question answering")
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .value_name("DIR")
                .help("Directory relative paths in the configuration resolve against")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("docs")
                .short('d')
                .long("docs")
                .value_name("DIR")
                .help("Index this directory first when no index exists")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand(
            Command::new("ask")
                .about("Answer one question and print the JSON payload")
                .arg(Arg::new("question").required(true).help("The question"))
                .arg(
                    Arg::new("mode")
                        .short('m')
                        .long("mode")
                        .value_name("MODE")
                        .help("brief or detailed"),
                ),
        )
}

async fn run() -> Result<i32> {
    let matches = cli().get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(root_dir) = matches.get_one::<PathBuf>("root") {
        config.root_dir = root_dir.clone();
    }
    if let Some(docs_dir) = matches.get_one::<PathBuf>("docs") {
        config.docs_dir = Some(docs_dir.clone());
    }

    match matches.subcommand() {
        Some(("ask", sub)) => {
            let request = AskRequest {
                question: sub.get_one::<String>("question").cloned().unwrap_or_default(),
                mode: sub.get_one::<String>("mode").cloned(),
            };
            match ask_once(&config, &request).await? {
                Ok(response) => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                    Ok(0)
                }
                Err(e) => {
                    tracing::debug!("Ask failed: {:?}", e);
                    println!("{}", serde_json::to_string_pretty(&e.body())?);
                    Ok(1)
                }
            }
        }
        _ => {
            run_server(config).await?;
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
