//! CLI binary for labelsheet.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `CompilerConfig` / `StorageConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use labelsheet::{
    compile, compile_to_file, generate_document, CompileProgressCallback, CompilerConfig,
    FailureResponse, ImageStore, LabelSheetError, ProgressCallback, StorageConfig,
    SuccessResponse, PDF_FILENAME,
};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::path::PathBuf;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the compile through its stages.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Validating labels…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl CompileProgressCallback for CliProgressCallback {
    fn on_compile_start(&self, label_count: usize, hidden: usize) {
        self.bar.set_prefix("Compiling");
        self.bar.set_message(format!("{label_count} label(s)"));
        if hidden > 0 {
            self.bar.println(format!(
                "  {} {hidden} label(s) follow a gap in their row and will not appear",
                red("!")
            ));
        }
    }

    fn on_asset_loaded(&self, filename: &str, size: usize) {
        self.bar.println(format!(
            "  {} {:<28} {}",
            green("✓"),
            filename,
            dim(&format!("{size} bytes"))
        ));
    }

    fn on_render_start(&self, renderer: &str) {
        self.bar.set_prefix("Rendering");
        self.bar.set_message(format!("running {renderer}…"));
    }

    fn on_compile_complete(&self, _pdf_len: usize, _duration_ms: u64) {
        self.bar.finish_and_clear();
    }

    fn on_compile_error(&self, _error: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start from the bundled sample images
  labelsheet reset

  # Add your own images (local file or URL)
  labelsheet upload logo.png https://example.com/star.jpg

  # Compile a placement list to labels.pdf
  labelsheet compile labels.json -o labels.pdf

  # Read placements from stdin, emit a JSON body instead of a file
  cat labels.json | labelsheet --json compile -

  # Inspect the generated LaTeX without running pdflatex
  labelsheet latex labels.json

PLACEMENT FORMAT:
  [
    {"image": "http://localhost:5000/static/images/a.png",
     "row": 1, "position": 1, "width": 30, "caption": "A"},
    {"image": "b.png", "row": 1, "position": 2, "width": 20, "caption": "B"}
  ]

  row 1–3, position 1–13, width in millimetres. A row stops at its first
  empty position: labels after a gap are not rendered.

ENVIRONMENT VARIABLES:
  LABELSHEET_IMAGES_DIR    Image store directory
  LABELSHEET_DEFAULTS_DIR  Bundled images copied in by `reset`
  LABELSHEET_COMPILER      LaTeX compiler program
  LABELSHEET_TIMEOUT       Compiler timeout in seconds
  LABELSHEET_DEBUG_DIR     Save each generated labels.tex here
  RUST_LOG                 Override log filter (e.g. labelsheet=debug)

  Variables may also be set in a .env file in the working directory.
"#;

/// Compile captioned image grids into printable label sheets.
#[derive(Parser, Debug)]
#[command(
    name = "labelsheet",
    version,
    about = "Compile captioned image grids into printable PDF label sheets",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    storage: StorageArgs,

    /// Print JSON bodies ({success, error, kind}) instead of human output.
    #[arg(long, global = true, env = "LABELSHEET_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LABELSHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "LABELSHEET_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "LABELSHEET_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct StorageArgs {
    /// Image store directory.
    #[arg(long, global = true, env = "LABELSHEET_IMAGES_DIR", default_value = "static/images")]
    images_dir: PathBuf,

    /// Directory of bundled default images.
    #[arg(long, global = true, env = "LABELSHEET_DEFAULTS_DIR", default_value = "static/defaultimages")]
    defaults_dir: PathBuf,

    /// Maximum upload size in bytes.
    #[arg(long, global = true, env = "LABELSHEET_MAX_FILE_SIZE", default_value_t = 1024 * 1024)]
    max_file_size: usize,

    /// Download timeout for URL uploads in seconds.
    #[arg(long, global = true, env = "LABELSHEET_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// Placement list: a JSON file, or `-` for stdin.
    input: String,

    /// Write the PDF here. Default: labels.pdf (or a JSON body with --json).
    #[arg(short, long, env = "LABELSHEET_OUTPUT")]
    output: Option<PathBuf>,

    /// LaTeX compiler program.
    #[arg(long, env = "LABELSHEET_COMPILER", default_value = "pdflatex")]
    compiler: String,

    /// Compiler timeout in seconds.
    #[arg(long, env = "LABELSHEET_TIMEOUT", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Save each generated labels.tex in this directory.
    #[arg(long, env = "LABELSHEET_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a placement list into a PDF.
    Compile(CompileArgs),

    /// Print the generated LaTeX document without compiling it.
    Latex {
        /// Placement list: a JSON file, or `-` for stdin.
        input: String,
    },

    /// Add images to the store from local paths or HTTP(S) URLs.
    Upload {
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// List images in the store.
    List,

    /// Wipe the store and copy in the default images.
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || cli.json {
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

    let storage = StorageConfig::builder()
        .images_dir(&cli.storage.images_dir)
        .defaults_dir(&cli.storage.defaults_dir)
        .max_file_size(cli.storage.max_file_size)
        .download_timeout_secs(cli.storage.download_timeout)
        .build()
        .context("Invalid storage configuration")?;
    let store = ImageStore::new(storage);

    let result = match &cli.command {
        Command::Compile(args) => run_compile(&cli, args, &store, show_progress).await,
        Command::Latex { input } => run_latex(input),
        Command::Upload { sources } => run_upload(&cli, sources, &store).await,
        Command::List => run_list(&cli, &store).await,
        Command::Reset => run_reset(&cli, &store).await,
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if cli.json => {
            // Library errors keep their kind tag; anything else is internal.
            let body = match e.downcast_ref::<LabelSheetError>() {
                Some(err) => FailureResponse::from(err),
                None => FailureResponse::from(LabelSheetError::Internal(format!("{e:#}"))),
            };
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}

async fn run_compile(cli: &Cli, args: &CompileArgs, store: &ImageStore, show_progress: bool) -> Result<()> {
    let labels = read_labels(&args.input)?;

    let mut builder = CompilerConfig::builder()
        .program(&args.compiler)
        .timeout_secs(args.timeout);
    if let Some(ref dir) = args.debug_dir {
        builder = builder.debug_dir(dir);
    }
    if show_progress {
        builder = builder.progress_callback(CliProgressCallback::new() as ProgressCallback);
    }
    let config = builder.build().context("Invalid compiler configuration")?;

    if cli.json && args.output.is_none() {
        let sheet = compile(&labels, store, &config).await?;
        let body = SuccessResponse::from(&sheet);
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let output = args.output.clone().unwrap_or_else(|| PathBuf::from(PDF_FILENAME));
    let stats = compile_to_file(&labels, store, &output, &config).await?;

    if !cli.quiet && !cli.json {
        eprintln!(
            "{}  {} labels  {} images  {}ms  →  {}",
            green("✔"),
            stats.rendered_labels,
            stats.assets,
            stats.total_duration_ms,
            bold(&output.display().to_string()),
        );
    }
    Ok(())
}

fn run_latex(input: &str) -> Result<()> {
    let labels = read_labels(input)?;
    let doc = generate_document(&labels)?;
    io::stdout()
        .lock()
        .write_all(doc.as_bytes())
        .context("Failed to write to stdout")?;
    Ok(())
}

async fn run_upload(cli: &Cli, sources: &[String], store: &ImageStore) -> Result<()> {
    let mut stored = Vec::with_capacity(sources.len());
    for source in sources {
        let name = store.import(source).await?;
        if !cli.quiet && !cli.json {
            eprintln!("{} {}", green("✓"), name);
        }
        stored.push(name);
    }
    if cli.json {
        println!("{}", serde_json::json!({ "success": true, "stored": stored }));
    }
    Ok(())
}

async fn run_list(cli: &Cli, store: &ImageStore) -> Result<()> {
    let names = store.list().await?;
    if cli.json {
        println!("{}", serde_json::to_string(&names)?);
    } else {
        for name in &names {
            println!("{name}");
        }
    }
    Ok(())
}

async fn run_reset(cli: &Cli, store: &ImageStore) -> Result<()> {
    let copied = store.reset_to_defaults().await?;
    if cli.json {
        println!("{}", serde_json::json!({ "success": true, "copied": copied }));
    } else if !cli.quiet {
        eprintln!(
            "{} store reset, {} default image(s) in {}",
            green("✔"),
            copied.len(),
            store.images_dir().display()
        );
    }
    Ok(())
}

/// Parse the placement list from a file or stdin.
///
/// Only JSON syntax is checked here; the shape is validated by the library.
fn read_labels(input: &str) -> Result<Value> {
    let text = if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read placements from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))?
    };
    serde_json::from_str(&text)
        .map_err(|e| LabelSheetError::Validation(format!("Placement list is not valid JSON: {e}")))
        .map_err(anyhow::Error::from)
}
