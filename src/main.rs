use std::panic;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use coderunner::constants::DEFAULT_LOG_FILTER;
use coderunner::{CodeRunner, Config, TestCase, project};

#[derive(Parser)]
#[command(name = "coderunner")]
#[command(about = "Run and judge untrusted programs in many languages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a program once and print the result as JSON
    Run {
        /// Language id (e.g., python, cpp, java)
        #[arg(short, long)]
        language: String,

        /// Source file, read from stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// File whose contents are piped to the program
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Judge a program against test cases and print the verdict as JSON
    Judge {
        /// Language id (e.g., python, cpp, java)
        #[arg(short, long)]
        language: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// JSON array of test cases
        #[arg(short, long)]
        tests: PathBuf,
    },

    /// List registered languages
    Languages {
        /// Check which toolchains are installed
        #[arg(long)]
        probe: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;
    let runner = CodeRunner::from_config(&config)
        .await
        .context("failed to prepare the work directory")?;

    match cli.command {
        Commands::Run {
            language,
            file,
            input,
        } => {
            let code = match file {
                Some(path) => read(&path).await?,
                None => read_stdin().await?,
            };
            let stdin = match input {
                Some(path) => read(&path).await?,
                None => String::new(),
            };

            let result = runner.execute(&code, &language, &stdin).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Judge {
            language,
            file,
            tests,
        } => {
            let code = read(&file).await?;
            let test_cases: Vec<TestCase> = serde_json::from_str(&read(&tests).await?)
                .with_context(|| format!("malformed test cases in {}", tests.display()))?;

            let verdict = runner.judge(&code, &language, &test_cases).await?;
            let view = project(&verdict, &test_cases);
            println!("{}", serde_json::to_string_pretty(&view)?);
        }

        Commands::Languages { probe } => {
            let support = if probe {
                Some(runner.probe().await)
            } else {
                None
            };

            let languages: Vec<_> = runner
                .registry()
                .iter()
                .map(|language| {
                    let mut entry = serde_json::json!({
                        "id": language.id,
                        "extension": language.source_extension,
                        "compiled": language.is_compiled(),
                    });
                    if let Some(support) = &support {
                        entry["available"] =
                            serde_json::Value::Bool(support.get(language.id).copied().unwrap_or(false));
                    }
                    entry
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&languages)?);
        }
    }

    Ok(())
}

async fn read(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn read_stdin() -> Result<String> {
    let mut code = String::new();
    tokio::io::stdin()
        .read_to_string(&mut code)
        .await
        .context("failed to read source from stdin")?;
    Ok(code)
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
