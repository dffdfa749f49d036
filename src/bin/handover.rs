//! CLI binary for handover-docx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `HandoverConfig`, runs every input and prints one line per result.

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use handover_docx::{
    convert, convert_to_file, ExtractionProgressCallback, HandoverConfig, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the whole batch; model attempts and fallbacks are printed
/// above it as they happen.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new(total_inputs: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} records  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(total_inputs as u64);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, source: &str, page_count: usize) {
        self.bar
            .set_message(format!("{source}: {page_count} page(s)"));
    }

    fn on_model_attempt(&self, source: &str, model: &str, attempt: usize, total: usize) {
        self.bar
            .set_message(format!("{source}: {model} ({attempt}/{total})"));
    }

    fn on_model_failed(&self, source: &str, model: &str, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {}  {}  {}",
            cyan("↷"),
            source,
            dim(model),
            red(&msg)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One record, document written to ./out
  handover bbgn.pdf --template template.docx -o out

  # A batch of scans, four at a time
  handover scans/*.pdf scans/*.jpg -c 4 -o out

  # Inspect the grouped result without writing a document
  handover --json bbgn.pdf

  # Force a model order
  handover --model gemini-2.5-flash --model gemini-2.0-flash bbgn.pdf

INPUTS:
  PDF (rasterised page by page), JPEG or PNG. The type is detected from the
  file contents, not the extension.

DEFAULT MODEL ORDER (provider: gemini):
  gemini-2.5-pro → gemini-2.5-flash → gemini-2.5-flash-lite → gemini-2.0-flash

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  OPENAI_API_KEY          OpenAI API key (with --provider openai)
  EDGEQUAKE_LLM_PROVIDER  Provider used when --provider is not given
  PDFIUM_LIB_PATH         Directory or file of an existing libpdfium
  HANDOVER_*              Every flag below, e.g. HANDOVER_TEMPLATE
"#;

/// Turn scanned handover records into filled internal handover documents.
#[derive(Parser, Debug)]
#[command(
    name = "handover",
    version,
    about = "Turn scanned handover records into filled internal handover documents",
    long_about = "Read scanned equipment handover records (PDF, JPEG or PNG) with a vision \
model, group the device rows into one line per device type, and write a filled Word \
document named after the record's devices, company and identifier.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Record files: PDF, JPEG or PNG.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the documents are written to.
    #[arg(short, long, env = "HANDOVER_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Word template (.docx) to fill.
    #[arg(long, env = "HANDOVER_TEMPLATE", default_value = "template.docx")]
    template: PathBuf,

    /// Model ID; repeat to set the fallback order.
    #[arg(long = "model", env = "HANDOVER_MODELS", value_delimiter = ',')]
    models: Vec<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "HANDOVER_PROVIDER")]
    provider: Option<String>,

    /// Max LLM output tokens.
    #[arg(long, env = "HANDOVER_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "HANDOVER_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per model on transient failure.
    #[arg(long, env = "HANDOVER_MAX_RETRIES", default_value_t = 1)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "HANDOVER_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Max PDF pages sent to the model.
    #[arg(long, env = "HANDOVER_MAX_PAGES", default_value_t = 10)]
    max_pages: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "HANDOVER_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Number of records processed concurrently.
    #[arg(short, long, env = "HANDOVER_CONCURRENCY", default_value_t = 2,
          value_parser = clap::value_parser!(u16).range(1..=32))]
    concurrency: u16,

    /// Print the grouped result as JSON instead of writing documents.
    #[arg(long, env = "HANDOVER_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "HANDOVER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HANDOVER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "HANDOVER_QUIET")]
    quiet: bool,
}

/// Result line for one input.
enum Report {
    Written { path: PathBuf, devices: usize, model: String },
    Json(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if !cli.json && !cli.template.is_file() {
        anyhow::bail!(
            "Template not found: {} (pass --template or set HANDOVER_TEMPLATE)",
            cli.template.display()
        );
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(|| CliProgressCallback::new(cli.inputs.len()));
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as ProgressCallback),
    )
    .await?;

    // ── Run every input ──────────────────────────────────────────────────
    let results: Vec<(PathBuf, Result<Report>)> = stream::iter(cli.inputs.iter().cloned())
        .map(|input| {
            let config = &config;
            let cli = &cli;
            let progress = progress.clone();
            async move {
                let result = run_one(&input, cli, config).await;
                if let Some(cb) = progress {
                    cb.bar.inc(1);
                }
                (input, result)
            }
        })
        .buffer_unordered(cli.concurrency as usize)
        .collect()
        .await;

    if let Some(cb) = progress {
        cb.bar.finish_and_clear();
    }

    // ── Report ───────────────────────────────────────────────────────────
    let mut failed = 0usize;
    let mut json_docs = Vec::new();
    for (input, result) in &results {
        match result {
            Ok(Report::Written {
                path,
                devices,
                model,
            }) => {
                if !cli.quiet {
                    eprintln!(
                        "  {} {}  →  {}  {}",
                        green("✓"),
                        input.display(),
                        bold(&path.display().to_string()),
                        dim(&format!("{devices} device type(s), {model}")),
                    );
                }
            }
            Ok(Report::Json(doc)) => json_docs.push(doc.as_str()),
            Err(e) => {
                failed += 1;
                eprintln!("  {} {}  {}", red("✗"), input.display(), red(&format!("{e:#}")));
            }
        }
    }

    if cli.json {
        if cli.inputs.len() == 1 {
            if let Some(doc) = json_docs.first() {
                println!("{doc}");
            }
        } else {
            println!("[{}]", json_docs.join(",\n"));
        }
    }

    if !cli.quiet && results.len() > 1 {
        let ok = results.len() - failed;
        eprintln!(
            "{} {}/{} records converted",
            if failed == 0 { green("✔") } else { red("✘") },
            bold(&ok.to_string()),
            results.len()
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} record(s) failed", results.len());
    }
    Ok(())
}

async fn run_one(input: &Path, cli: &Cli, config: &HandoverConfig) -> Result<Report> {
    if cli.json {
        let output = convert(input, config).await.context("Extraction failed")?;
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        return Ok(Report::Json(json));
    }

    let written = convert_to_file(input, &cli.template, &cli.output_dir, config)
        .await
        .context("Conversion failed")?;
    Ok(Report::Written {
        path: written.path,
        devices: written.output.devices.len(),
        model: written.output.model_used,
    })
}

/// Map CLI args to `HandoverConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<HandoverConfig> {
    let mut builder = HandoverConfig::builder()
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .max_pages(cli.max_pages);

    if !cli.models.is_empty() {
        builder = builder.models(cli.models.iter().cloned());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
