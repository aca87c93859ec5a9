use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use newscheck::{ClassificationReport, Classifier, ClassifierConfig, Label};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Checks whether a news text looks real or fabricated using a local LLM",
    long_about = None
)]
struct Args {
    /// News article or headline to analyze. Read from --file or stdin when omitted
    text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Only check that the model service is reachable and the model installed
    #[arg(long)]
    check: bool,

    /// Base URL of the model service [env: OLLAMA_BASE_URL]
    #[arg(long)]
    base_url: Option<String>,

    /// Model identifier [env: OLLAMA_MODEL]
    #[arg(short, long)]
    model: Option<String>,

    /// Request timeout in seconds [env: REQUEST_TIMEOUT]
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Total request attempts [env: MAX_RETRIES]
    #[arg(long)]
    max_retries: Option<u32>,

    /// Sampling temperature [env: TEMPERATURE]
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum tokens to generate [env: MAX_TOKENS]
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Log filter when RUST_LOG is unset [env: LOG_LEVEL]
    #[arg(long)]
    log_level: Option<String>,
}

fn build_config(args: &Args) -> anyhow::Result<ClassifierConfig> {
    let mut config = ClassifierConfig::from_env()?;
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(model) = &args.model {
        config = config.with_model(model);
    }
    if let Some(timeout) = args.timeout {
        config = config.with_request_timeout(Duration::from_secs(timeout));
    }
    if let Some(max_retries) = args.max_retries {
        config = config.with_max_retries(max_retries);
    }
    if let Some(temperature) = args.temperature {
        config = config.with_temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        config = config.with_max_tokens(max_tokens);
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

/// Reads the text to classify. Invalid UTF-8 sequences are replaced, not
/// rejected.
fn read_input(args: &Args) -> anyhow::Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    let bytes = match &args.file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                bail!("No text given. Pass it as an argument, with --file, or pipe it on stdin");
            }
            let mut bytes = Vec::new();
            stdin.lock().read_to_end(&mut bytes).context("Failed to read stdin")?;
            bytes
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn print_report(report: &ClassificationReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let verdict = &report.verdict;
    let headline = match verdict.label {
        Label::Real => "Real News",
        Label::Fake => "Fake News",
    };
    println!("\nAnalysis Result:");
    println!("  Verdict: {} ({})", headline, verdict.label);
    println!("  Confidence: {}%", verdict.confidence);
    println!("  Explanation: {}", verdict.reasoning);
    println!("\nModel: {} ({} tokens, {} ms)", report.model, report.eval_count, report.elapsed_ms);
    Ok(())
}

async fn check_health(classifier: &Classifier, model: &str) -> ExitCode {
    match classifier.model().check_health().await {
        Ok(models) => {
            let installed = models
                .iter()
                .any(|name| name == model || name.strip_suffix(":latest") == Some(model));
            println!("Model service is reachable ({} models installed)", models.len());
            if installed {
                println!("Model '{}' is installed", model);
                ExitCode::SUCCESS
            } else {
                eprintln!(
                    "Model '{}' is not installed. Pull it with `ollama pull {}`",
                    model, model
                );
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Health check failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::from(2);
        }
    };
    newscheck::init_logger(&config.log_level);

    let classifier = match Classifier::builder().with_config(config.clone()).build() {
        Ok(classifier) => classifier,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    if args.check {
        return check_health(&classifier, &config.model).await;
    }

    let text = match read_input(&args) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("=== Analyzing {} characters ===", text.chars().count());
    match classifier.classify_detailed(&text).await {
        Ok(report) => match print_report(&report, args.json) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Failed to print report: {:#}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("\nError analyzing text: {}", e);
            if e.kind().is_network() {
                eprintln!("Consider:");
                eprintln!("  - Starting the model service with `ollama serve`");
                eprintln!("  - Checking the base URL ({})", config.base_url);
                eprintln!("  - Pulling the model with `ollama pull {}`", config.model);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_text_wins() {
        let args = Args::parse_from(["newscheck", "Officials opened the new bridge"]);
        assert_eq!(read_input(&args).unwrap(), "Officials opened the new bridge");
    }

    #[test]
    fn test_non_utf8_file_is_read_lossily() {
        let file_name = format!("newscheck-latin1-{}.txt", std::process::id());
        let path = std::env::temp_dir().join(file_name);
        // "Le café a rouvert" in Latin-1
        std::fs::write(&path, b"Le caf\xe9 a rouvert ce matin").unwrap();

        let path_arg = path.to_string_lossy().into_owned();
        let args = Args::parse_from(["newscheck", "--file", path_arg.as_str()]);
        let text = read_input(&args).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(text, "Le caf\u{FFFD} a rouvert ce matin");
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let args = Args::parse_from(["newscheck", "--file", "/nonexistent/article.txt"]);
        let err = read_input(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/article.txt"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "newscheck",
            "--model",
            "mistral:7b",
            "--timeout",
            "30",
            "--max-retries",
            "5",
            "some text",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.model, "mistral:7b");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
    }
}
