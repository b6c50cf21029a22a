//! docfuse CLI - layout fusion and conversion scoring

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docfuse::benchmark::run_benchmark;
use docfuse::convert::batch::{run_batch, BatchEvent, BatchOptions};
use docfuse::convert::output::save_markdown;
use docfuse::{
    detect_kind_from_path, load_document, score_text, BenchmarkReport, CleanupPreset, DocFuse,
    FusionOptions, InputKind, OcrEngineKind, RenderOptions,
};
use docfuse::render::to_markdown_with_stats;

#[derive(Parser)]
#[command(name = "docfuse")]
#[command(version)]
#[command(about = "Fuse extracted documents and model predictions into Markdown", long_about = None)]
struct Cli {
    #[command(flatten)]
    fusion: FusionArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every converting command.
#[derive(Args)]
struct FusionArgs {
    /// JSON file with fusion options; missing keys keep their defaults
    #[arg(long, global = true, value_name = "FILE", env = "DOCFUSE_CONFIG")]
    config: Option<PathBuf>,

    /// OCR languages, comma separated (names or codes)
    #[arg(long, global = true, value_delimiter = ',', env = "DOCFUSE_LANGS")]
    langs: Vec<String>,

    /// Multiplier applied to every model batch size
    #[arg(long, global = true, env = "DOCFUSE_BATCH_MULTIPLIER")]
    batch_multiplier: Option<usize>,

    /// OCR engine whose language codes apply
    #[arg(long, global = true, value_enum, env = "DOCFUSE_OCR_ENGINE")]
    ocr_engine: Option<OcrEngine>,

    /// OCR every page regardless of extracted text quality
    #[arg(long, global = true, env = "DOCFUSE_OCR_ALL_PAGES")]
    ocr_all_pages: bool,

    /// Do not extract figure images
    #[arg(long, global = true)]
    no_images: bool,

    /// Text cleanup preset
    #[arg(long, global = true, value_enum)]
    cleanup: Option<CleanupLevel>,

    /// First page to fuse (0-based)
    #[arg(long, global = true, value_name = "N", env = "DOCFUSE_START_PAGE")]
    start_page: Option<usize>,

    /// Maximum number of pages to fuse per document
    #[arg(long, global = true, value_name = "N", env = "DOCFUSE_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Debug dump level (1: equations, 2: also bboxes)
    #[arg(long, global = true, env = "DOCFUSE_DEBUG_LEVEL")]
    debug_level: Option<u8>,

    /// Folder for debug dumps
    #[arg(long, global = true, value_name = "DIR", env = "DOCFUSE_DEBUG_FOLDER")]
    debug_folder: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuse one document JSON file into Markdown
    Convert {
        /// Input document JSON
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Fuse every document in a folder
    Batch {
        /// Folder with document JSON files
        #[arg(value_name = "IN_DIR")]
        in_folder: PathBuf,

        /// Output folder
        #[arg(value_name = "OUT_DIR")]
        out_folder: PathBuf,

        /// Worker threads
        #[arg(long, default_value = "5", env = "DOCFUSE_WORKERS")]
        workers: usize,

        /// Maximum number of documents to convert
        #[arg(long)]
        max: Option<usize>,

        /// Chunk index to convert
        #[arg(long, default_value = "0")]
        chunk_idx: usize,

        /// Number of chunks being processed in parallel
        #[arg(long, default_value = "1")]
        num_chunks: usize,

        /// Minimum extracted text length of a document to convert
        #[arg(long, default_value = "0")]
        min_length: usize,
    },

    /// Score a Markdown hypothesis against a reference
    Score {
        /// Hypothesis Markdown
        #[arg(value_name = "HYP")]
        hypothesis: PathBuf,

        /// Reference Markdown
        #[arg(value_name = "REF")]
        reference: PathBuf,
    },

    /// Convert and score a folder of documents against reference Markdown
    Benchmark {
        /// Folder with document JSON files
        #[arg(value_name = "IN_DIR")]
        in_folder: PathBuf,

        /// Folder with `<name>.md` reference files
        #[arg(value_name = "REF_DIR")]
        reference_folder: PathBuf,

        /// Where to write the JSON report
        #[arg(long, value_name = "FILE")]
        out_file: Option<PathBuf>,

        /// Where to write the generated Markdown
        #[arg(long, value_name = "DIR")]
        md_out_path: Option<PathBuf>,
    },

    /// Check a benchmark report against minimum scores
    Verify {
        /// Benchmark report JSON
        #[arg(value_name = "REPORT")]
        report: PathBuf,

        /// Minimum score per file, as name=value
        #[arg(long = "min-score", value_name = "NAME=SCORE", value_parser = parse_min_score)]
        min_scores: Vec<(String, f64)>,
    },

    /// Show document information
    Info {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CleanupLevel {
    /// Blank lines and non-breaking spaces only
    Minimal,
    /// Bullets, ligatures, NFC and private-use characters too (default)
    Standard,
}

impl From<CleanupLevel> for CleanupPreset {
    fn from(level: CleanupLevel) -> Self {
        match level {
            CleanupLevel::Minimal => CleanupPreset::Minimal,
            CleanupLevel::Standard => CleanupPreset::Standard,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OcrEngine {
    Tesseract,
    Surya,
}

impl From<OcrEngine> for OcrEngineKind {
    fn from(engine: OcrEngine) -> Self {
        match engine {
            OcrEngine::Tesseract => OcrEngineKind::Tesseract,
            OcrEngine::Surya => OcrEngineKind::Surya,
        }
    }
}

fn parse_min_score(arg: &str) -> Result<(String, f64), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=SCORE, got {}", arg))?;
    let score = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid score {}: {}", value, e))?;
    Ok((name.trim().to_string(), score))
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert { input, output } => cmd_convert(&cli.fusion, &input, output.as_deref()),
        Commands::Batch {
            in_folder,
            out_folder,
            workers,
            max,
            chunk_idx,
            num_chunks,
            min_length,
        } => {
            let mut options = BatchOptions::new()
                .with_workers(workers)
                .with_chunk(chunk_idx, num_chunks)
                .with_min_length(min_length);
            if let Some(max) = max {
                options = options.with_max(max);
            }
            cmd_batch(&cli.fusion, &in_folder, &out_folder, &options)
        }
        Commands::Score {
            hypothesis,
            reference,
        } => cmd_score(&hypothesis, &reference),
        Commands::Benchmark {
            in_folder,
            reference_folder,
            out_file,
            md_out_path,
        } => cmd_benchmark(
            &cli.fusion,
            &in_folder,
            &reference_folder,
            out_file.as_deref(),
            md_out_path.as_deref(),
        ),
        Commands::Verify { report, min_scores } => cmd_verify(&report, &min_scores),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn fusion_options(args: &FusionArgs) -> Result<FusionOptions, Box<dyn std::error::Error>> {
    let mut options = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => FusionOptions::default(),
    };

    if !args.langs.is_empty() {
        options = options.with_languages(args.langs.iter().cloned());
    }
    if let Some(multiplier) = args.batch_multiplier {
        options = options.with_batch_multiplier(multiplier);
    }
    if let Some(engine) = args.ocr_engine {
        options = options.with_ocr_engine(engine.into());
    }
    if args.ocr_all_pages {
        options = options.with_ocr_all_pages(true);
    }
    if args.no_images {
        options = options.with_images(false);
    }
    if args.start_page.is_some() || args.max_pages.is_some() {
        let start = args.start_page.unwrap_or(options.start_page);
        let max = args.max_pages.or(options.max_pages);
        options = options.with_page_range(start, max);
    }
    if let Some(level) = args.debug_level {
        options.debug_level = level;
    }
    if let Some(folder) = &args.debug_folder {
        options.debug_data_folder = Some(folder.clone());
    }
    Ok(options)
}

fn fuser(args: &FusionArgs) -> Result<DocFuse, Box<dyn std::error::Error>> {
    let options = fusion_options(args)?;
    log::debug!("Fusion options: {:?}", options);
    let mut fuse = DocFuse::new().with_options(options);
    if let Some(level) = args.cleanup {
        fuse = fuse.with_cleanup(level.into());
    }
    Ok(fuse)
}

fn ensure_document(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match detect_kind_from_path(input)? {
        InputKind::DocumentJson => Ok(()),
        InputKind::Pdf { version } => Err(format!(
            "{} is a PDF {}; extract it to document JSON first",
            input.display(),
            version
        )
        .into()),
        InputKind::Other => Err(format!("{} is not a document JSON file", input.display()).into()),
    }
}

fn cmd_convert(
    args: &FusionArgs,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_document(input)?;
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Fusing document...");

    let result = fuser(args)?.convert_file(input)?;
    let fname = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| result.document.name.clone());
    let folder = save_markdown(&output_dir, &fname, &result.markdown, &result.images, &result.stats)?;

    pb.finish_with_message("Done!");

    println!("\n{} {}", "Saved markdown to".green().bold(), folder.display());
    println!("  {} {} pages", "├─".dimmed(), result.stats.pages);
    println!("  {} {} equations", "├─".dimmed(), result.stats.equations);
    println!("  {} {} images", "└─".dimmed(), result.images.len());

    Ok(())
}

fn cmd_batch(
    args: &FusionArgs,
    in_folder: &Path,
    out_folder: &Path,
    options: &BatchOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let fuse = fuser(args)?;
    let fusion = fuse.options().clone();
    let models = docfuse::ModelSet::new();

    let planned = docfuse::convert::batch::plan_batch(
        docfuse::convert::batch::list_inputs(in_folder)?,
        options,
    );
    println!(
        "Converting {} documents in chunk {}/{}, storing in {}",
        planned.len(),
        options.chunk_idx + 1,
        options.num_chunks.max(1),
        out_folder.display()
    );

    let pb = ProgressBar::new(planned.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let (tx, rx) = crossbeam_channel::unbounded::<BatchEvent>();
    let summary = std::thread::scope(|scope| {
        let bar = pb.clone();
        scope.spawn(move || {
            for event in rx {
                if let BatchEvent::Failed { file, error } = &event {
                    bar.println(format!("{} {}: {}", "Failed".red(), file.display(), error));
                }
                let name = event
                    .file()
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                bar.set_message(name);
                bar.inc(1);
            }
        });
        run_batch(in_folder, out_folder, &models, &fusion, options, Some(tx))
    })?;

    pb.finish_with_message("Done!");
    println!(
        "\n{} {} converted, {} skipped, {} failed",
        "Batch complete:".green().bold(),
        summary.converted,
        summary.skipped,
        summary.failed
    );
    Ok(())
}

fn cmd_score(hypothesis: &Path, reference: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let hypothesis = fs::read_to_string(hypothesis)?;
    let reference = fs::read_to_string(reference)?;
    let score = score_text(&hypothesis, &reference);
    println!("{}: {:.4}", "Alignment score".bold(), score);
    Ok(())
}

fn cmd_benchmark(
    args: &FusionArgs,
    in_folder: &Path,
    reference_folder: &Path,
    out_file: Option<&Path>,
    md_out_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let fuse = fuser(args)?;
    let report = run_benchmark(in_folder, reference_folder, &fuse, md_out_path)?;

    if let Some(path) = out_file {
        report.save(path)?;
        println!("{} {}", "Saved report to".green(), path.display());
    }

    print_summary_table(&report);
    print_score_table(&report);
    Ok(())
}

fn print_summary_table(report: &BenchmarkReport) {
    println!(
        "{:<12} {:>14} {:>14} {:>18}",
        "Method".bold(),
        "Average Score".bold(),
        "Time per page".bold(),
        "Time per document".bold()
    );
    println!("{}", "─".repeat(61).dimmed());
    println!(
        "{:<12} {:>14.4} {:>14.4} {:>18.4}",
        report.method, report.avg_score, report.time_per_page, report.time_per_doc
    );
}

fn print_score_table(report: &BenchmarkReport) {
    println!("\n{}", "Scores by file".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for (name, file) in &report.files {
        let score = format!("{:.4}", file.score);
        let score = if file.score >= 0.5 {
            score.green()
        } else {
            score.yellow()
        };
        println!("{:<28} {:>10}", name, score);
    }
}

fn cmd_verify(report: &Path, min_scores: &[(String, f64)]) -> Result<(), Box<dyn std::error::Error>> {
    let report = BenchmarkReport::load(report)?;
    report.verify(min_scores)?;
    println!("{}", "Scores verified successfully".green().bold());
    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let kind = detect_kind_from_path(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), kind);

    if !kind.is_convertible() {
        if let InputKind::Pdf { .. } = kind {
            println!("{}", "Extract this PDF to document JSON to fuse it.".yellow());
        }
        return Ok(());
    }

    let doc = load_document(input)?;
    println!("{}: {}", "Name".bold(), doc.name);
    println!("{}: {}", "Pages".bold(), doc.page_count());
    if !doc.languages.is_empty() {
        println!("{}: {}", "Languages".bold(), doc.languages.join(", "));
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let rendered = to_markdown_with_stats(&doc, &RenderOptions::default())?;
    println!("{}: {}", "Blocks".bold(), doc.blocks().count());
    println!("{}: {}", "Spans".bold(), doc.spans().count());
    println!("{}: {}", "Headings".bold(), rendered.stats.heading_count);
    println!("{}: {}", "Paragraphs".bold(), rendered.stats.paragraph_count);
    println!("{}: {}", "Words".bold(), rendered.stats.word_count);
    println!("{}: {}", "Characters".bold(), doc.char_count());

    let with_layout = doc.pages.iter().filter(|p| p.layout.is_some()).count();
    let with_order = doc.pages.iter().filter(|p| p.order.is_some()).count();
    let with_lines = doc.pages.iter().filter(|p| p.text_lines.is_some()).count();
    println!("{}: {}/{}", "Pages with layout".bold(), with_layout, doc.page_count());
    println!("{}: {}/{}", "Pages with order".bold(), with_order, doc.page_count());
    println!("{}: {}/{}", "Pages with text lines".bold(), with_lines, doc.page_count());

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docfuse".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Layout fusion and conversion scoring tool");
    println!();
    println!("License: MIT");
}
