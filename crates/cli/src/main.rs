use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use citadel_csp::{
    CspAnalysis, CspError, CspGenerator, PolicyConfig, StaticVerdict,
    CONTENT_SECURITY_POLICY_HEADER,
};

#[derive(Parser)]
#[command(name = "citadel-csp")]
#[command(about = "Generate a Content-Security-Policy tailored to a document")]
struct Args {
    /// Document to analyze (stdin when omitted or "-")
    file: Option<PathBuf>,

    /// JSON policy configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat the document as classified malicious
    #[arg(long)]
    malicious: bool,

    /// Print the full analysis as JSON
    #[arg(long, conflicts_with = "header")]
    json: bool,

    /// Print a complete header line instead of the bare value
    #[arg(long)]
    header: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => PolicyConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PolicyConfig::default(),
    };

    let content = read_document(args.file.as_deref(), config.max_content_bytes)?;
    log::info!("Analyzing {} bytes", content.len());

    let generator = CspGenerator::new(config, StaticVerdict(args.malicious))?;
    let analysis = generator.analyze(&content)?;

    println!("{}", render(&args, &analysis)?);
    Ok(())
}

fn render(args: &Args, analysis: &CspAnalysis) -> Result<String> {
    if args.json {
        Ok(serde_json::to_string_pretty(analysis)?)
    } else if args.header {
        Ok(format!("{}: {}", CONTENT_SECURITY_POLICY_HEADER, analysis.policy))
    } else {
        Ok(analysis.policy.clone())
    }
}

fn reads_stdin(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p.as_os_str() == "-")
}

fn read_document(path: Option<&Path>, limit: usize) -> Result<String> {
    match path {
        Some(p) if !reads_stdin(path) => {
            let file = std::fs::File::open(p).with_context(|| format!("opening {}", p.display()))?;
            read_limited(file, limit)
        }
        _ => read_limited(std::io::stdin(), limit),
    }
}

/// Read at most one byte past `limit` so oversized input is detected
/// without buffering all of it.
fn read_limited(reader: impl Read, limit: usize) -> Result<String> {
    let mut bytes = Vec::new();
    reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(CspError::from)?;

    if bytes.len() > limit {
        return Err(CspError::ContentTooLarge {
            size: bytes.len(),
            limit,
        }
        .into());
    }

    String::from_utf8(bytes).context("document is not valid UTF-8")
}
