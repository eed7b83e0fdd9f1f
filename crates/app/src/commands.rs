use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Args, ValueEnum};
use tillscan_core::Receipt;
use tillscan_ocr::{
    prepare_for_ocr, Extractor, OcrBackend, ParsedReceipt, ReceiptPipeline, ScanConfig, TesseractCli,
    TesseractRecognizer,
};
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Engine {
    /// The `tesseract` executable on PATH
    Cli,
    /// libtesseract linked in-process (needs the `tesseract` feature)
    Leptess,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Receipt image (PNG, JPEG, WEBP, ...)
    image: PathBuf,

    /// OCR engine
    #[arg(short, long, value_enum, default_value = "cli")]
    engine: Engine,

    /// Path to the tesseract executable
    #[arg(long, default_value = "tesseract")]
    tesseract: PathBuf,

    /// Emit the storage record (ids, createdAt) instead of the parsed receipt
    #[arg(long)]
    record: bool,
}

#[derive(Args)]
pub struct ParseArgs {
    /// OCR text file, or `-` for stdin
    input: String,

    /// Date reported when the receipt shows none (default: today)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Emit the storage record (ids, createdAt) instead of the parsed receipt
    #[arg(long)]
    record: bool,
}

#[derive(Args)]
pub struct PreprocessArgs {
    /// Source image
    input: PathBuf,

    /// Destination PNG
    output: PathBuf,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<ScanConfig> {
    match path {
        Some(path) => ScanConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(ScanConfig::default()),
    }
}

pub async fn scan(args: ScanArgs, config: ScanConfig) -> anyhow::Result<()> {
    if !args.image.exists() {
        bail!("Input file not found: {}", args.image.display());
    }
    let receipt = match args.engine {
        Engine::Cli => {
            let backend = TesseractCli::new()
                .with_program(&args.tesseract)
                .with_tessdata_dir(config.ocr.tessdata_dir.clone());
            scan_with(backend, config, &args.image).await?
        }
        Engine::Leptess => {
            let data_path = config
                .ocr
                .tessdata_dir
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned());
            scan_with(TesseractRecognizer::new(data_path), config, &args.image).await?
        }
    };
    emit(receipt, args.record)
}

async fn scan_with<R: OcrBackend + 'static>(
    backend: R,
    config: ScanConfig,
    image: &Path,
) -> anyhow::Result<ParsedReceipt> {
    let pipeline = ReceiptPipeline::new(backend, config);
    pipeline
        .process_file(image)
        .await
        .with_context(|| format!("scanning {}", image.display()))
}

pub fn parse(args: ParseArgs, config: ScanConfig) -> anyhow::Result<()> {
    let text = if args.input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading OCR text from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.input).with_context(|| format!("reading {}", args.input))?
    };

    let extractor = Extractor::new(config.extraction);
    let receipt = match args.today {
        Some(today) => extractor.extract_on(&text, today),
        None => extractor.extract(&text),
    };
    emit(receipt, args.record)
}

pub fn preprocess(args: PreprocessArgs, config: ScanConfig) -> anyhow::Result<()> {
    let prepared = prepare_for_ocr(&args.input, &config.preprocess)
        .with_context(|| format!("preprocessing {}", args.input.display()))?;
    let png = prepared.to_png()?;
    std::fs::write(&args.output, png).with_context(|| format!("writing {}", args.output.display()))?;
    info!(
        width = prepared.width(),
        height = prepared.height(),
        scale = prepared.scale(),
        "wrote {}",
        args.output.display()
    );
    Ok(())
}

pub fn print_config(config: &ScanConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn emit(receipt: ParsedReceipt, record: bool) -> anyhow::Result<()> {
    let json = if record {
        let record: Receipt = receipt.into_record(Utc::now());
        serde_json::to_string_pretty(&record)?
    } else {
        serde_json::to_string_pretty(&receipt)?
    };
    println!("{json}");
    Ok(())
}
