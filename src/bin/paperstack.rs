//! CLI binary for paperstack.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs one request and prints the result.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use paperstack::{
    inspect, list_pdfs, run_async, AssemblyProgressCallback, CombineRequest, ConversionRequest,
    InputInfo, PipelineConfig, PipelineResult, ProgressCallback, Request, SofficeRenderer,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the input files plus a log line
/// per file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Assembling");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Stop the spinner if the run ended before the bar was finished.
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl AssemblyProgressCallback for CliProgressCallback {
    fn on_assembly_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.reset_eta();
    }

    fn on_file_start(&self, _index: usize, _total: usize, path: &Path) {
        let name = path.file_name().unwrap_or(path.as_os_str());
        self.bar.set_message(name.to_string_lossy().into_owned());
    }

    fn on_file_complete(&self, index: usize, total: usize, pages: usize) {
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{pages:>4} pages")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}",
            red("✗"),
            index,
            total,
            red(first_line),
        ));
        self.bar.finish_and_clear();
    }

    fn on_assembly_complete(&self, total_files: usize, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} files, {} pages",
            green("✔"),
            bold(&total_files.to_string()),
            bold(&total_pages.to_string()),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Scan to PDF (one page, 1 pixel = 1 point)
  paperstack convert scan.jpg -o scan.pdf

  # A4 page from a 300 DPI scan
  paperstack --image-dpi 300 convert scan.png -o scan.pdf

  # Word document via LibreOffice
  paperstack convert letter.docx -o letter.pdf

  # Combine in order, one bookmark per file
  paperstack combine report1.pdf report2.pdf -o merged.pdf --bookmarks

  # Every PDF in a directory, sorted by file name
  paperstack combine chapters/ -o book.pdf

  # File facts without converting
  paperstack inspect report1.pdf scan.jpg

  # Machine-readable result
  paperstack --json combine a.pdf b.pdf -o ab.pdf

SUPPORTED INPUTS:
  .pdf               copied byte for byte (convert) or concatenated (combine)
  .png .jpg .jpeg    one page at native pixel resolution
  .docx              rendered by LibreOffice (soffice --headless)

ENVIRONMENT VARIABLES:
  PAPERSTACK_SOFFICE      Path to the soffice binary (skips PATH lookup)
  PAPERSTACK_IMAGE_DPI    Default for --image-dpi
  RUST_LOG                Overrides the log filter (e.g. paperstack=debug)
"#;

/// Convert files to PDF and combine PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "paperstack",
    version,
    about = "Convert images, Word documents and PDFs to PDF, and combine PDFs in order",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Print results as JSON.
    #[arg(long, global = true, env = "PAPERSTACK_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAPERSTACK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAPERSTACK_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PAPERSTACK_NO_PROGRESS")]
    no_progress: bool,

    /// Image resolution: pixels per inch on the generated page (1–2400).
    #[arg(long, global = true, env = "PAPERSTACK_IMAGE_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(1..=2400))]
    image_dpi: u32,

    /// Header version of generated PDFs.
    #[arg(long, global = true, env = "PAPERSTACK_PDF_VERSION", default_value = "1.7")]
    pdf_version: String,

    /// Path to the LibreOffice `soffice` binary.
    #[arg(long, global = true, env = "PAPERSTACK_SOFFICE")]
    soffice: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one file (.pdf, .png, .jpg, .jpeg, .docx) to PDF.
    Convert {
        input: PathBuf,

        /// Destination PDF. Replaced atomically if it exists.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Concatenate PDFs in the given order. A directory argument expands to
    /// the `.pdf` files inside it, sorted by name.
    Combine {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Destination PDF. Replaced atomically if it exists.
        #[arg(short, long)]
        output: PathBuf,

        /// Add one bookmark per input file.
        #[arg(long, env = "PAPERSTACK_BOOKMARKS")]
        bookmarks: bool,

        /// Flate-compress uncompressed streams.
        #[arg(long, env = "PAPERSTACK_COMPRESS")]
        compress: bool,
    },

    /// Print format, size and page count of each file.
    Inspect {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose is given.
    let show_progress =
        !g.quiet && !g.no_progress && !g.json && !matches!(cli.command, Command::Inspect { .. });
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
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

    let cli_progress = show_progress.then(CliProgressCallback::new);
    let progress = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn AssemblyProgressCallback>);

    let (request, bookmarks, compress) = match cli.command {
        Command::Inspect { inputs } => return inspect_files(&inputs, g.json),
        Command::Convert { input, output } => {
            (Request::from(ConversionRequest::new(input, output)), false, false)
        }
        Command::Combine {
            inputs,
            output,
            bookmarks,
            compress,
        } => {
            let inputs = expand_dirs(inputs)?;
            (Request::from(CombineRequest::new(inputs, output)), bookmarks, compress)
        }
    };
    let config = build_config(g, bookmarks, compress, progress)?;

    let json = g.json;
    let quiet = g.quiet;
    let result = run_async(request, config).await;
    if let Some(cb) = &cli_progress {
        cb.clear();
    }
    report(&result, json, quiet)?;

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Map CLI args to `PipelineConfig`.
fn build_config(
    g: &GlobalArgs,
    bookmarks: bool,
    compress: bool,
    progress: Option<ProgressCallback>,
) -> Result<PipelineConfig> {
    let renderer = match g.soffice {
        Some(ref path) => SofficeRenderer::with_binary(path),
        None => SofficeRenderer::new(),
    };

    let mut builder = PipelineConfig::builder()
        .image_dpi(g.image_dpi)
        .pdf_version(g.pdf_version.clone())
        .outline_per_file(bookmarks)
        .compress(compress)
        .renderer(Arc::new(renderer));

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Replace each directory argument with the `.pdf` files inside it, sorted
/// by name.
fn expand_dirs(inputs: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.is_dir() {
            let pdfs = list_pdfs(&input)
                .with_context(|| format!("Failed to list {}", input.display()))?;
            expanded.extend(pdfs);
        } else {
            expanded.push(input);
        }
    }
    Ok(expanded)
}

/// Print the outcome. The failure message goes to stderr unchanged.
fn report(result: &PipelineResult, json: bool, quiet: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(result).context("Failed to serialise result")?
        );
        return Ok(());
    }

    match result {
        PipelineResult::Success { output } => {
            if !quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&output.display().to_string()));
            }
        }
        PipelineResult::Failure { message, .. } => eprintln!("{message}"),
    }
    Ok(())
}

fn inspect_files(inputs: &[PathBuf], json: bool) -> Result<ExitCode> {
    let mut failed = false;
    let mut infos: Vec<serde_json::Value> = Vec::with_capacity(inputs.len());

    for path in inputs {
        match inspect(path) {
            Ok(info) => {
                if json {
                    infos.push(serde_json::to_value(&info).context("Failed to serialise info")?);
                } else {
                    print_info(&info);
                }
            }
            Err(e) => {
                failed = true;
                if json {
                    infos.push(serde_json::json!({
                        "path": path,
                        "status": "failure",
                        "kind": e.kind(),
                        "message": e.to_string(),
                    }));
                } else {
                    eprintln!("{} {}", red("✗"), e);
                }
            }
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&infos).context("Failed to serialise info")?
        );
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_info(info: &InputInfo) {
    println!("{}", cyan(&info.path.display().to_string()));
    println!("  Kind:         {}", info.kind);
    println!("  Size:         {} bytes", info.size_bytes);
    if let Some(pages) = info.page_count {
        println!("  Pages:        {pages}");
    }
    if let Some((w, h)) = info.dimensions {
        println!("  Dimensions:   {w}×{h} px");
    }
    if let Some(ref v) = info.pdf_version {
        println!("  PDF Version:  {v}");
    }
}
