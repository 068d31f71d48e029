//! Command-line surface. The flags fill the same form a user would fill in
//! the page: URL text or a PDF, plus where results and logs go.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context as _};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use scrapedesk_core::PdfSelection;
use scrapedesk_engine::{EngineSettings, DEFAULT_RESULT_FILE};
use scrapedesk_logging::LogDestination;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

/// Submit URLs or a PDF to a scrape server and save the streamed results.
#[derive(Debug, Parser)]
#[command(name = "scrapedesk", author, version, about)]
pub struct Cli {
    /// Scrape server base URL (http or https).
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub server: Url,

    /// Page to scrape. Repeat for several.
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// File with one URL per line, or a CSV file with a `url` column.
    #[arg(long, value_name = "PATH")]
    pub urls_file: Option<PathBuf>,

    /// PDF document to upload instead of URLs.
    #[arg(long, value_name = "PATH")]
    pub pdf: Option<PathBuf>,

    /// Result file path.
    #[arg(long, default_value = DEFAULT_RESULT_FILE)]
    pub out: PathBuf,

    /// Ask the server not to fall back to a headless browser.
    #[arg(long)]
    pub no_selenium: bool,

    /// Do not print the result JSON when the scrape completes.
    #[arg(long)]
    pub no_preview: bool,

    #[arg(long, value_enum, default_value_t = LogTarget::File)]
    pub log_to: LogTarget,

    /// Log file path (defaults to ./scrapedesk.log).
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Seconds allowed for the connection handshake.
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,

    /// Log at debug level.
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub engine: EngineSettings,
    /// URL field contents, one source per line.
    pub urls: String,
    pub pdf: Option<PdfSelection>,
    pub use_selenium: Option<bool>,
    pub out: PathBuf,
    pub preview: bool,
    pub log_to: LogDestination,
    pub log_level: LevelFilter,
    pub log_file: PathBuf,
}

impl Cli {
    /// Resolves flags into the run configuration. Mixing URLs and a PDF is
    /// left for the form validation to report.
    pub fn into_config(self) -> anyhow::Result<AppConfig> {
        if self.connect_timeout == 0 {
            bail!("--connect-timeout must be at least one second");
        }

        let mut sources = self.urls;
        if let Some(path) = &self.urls_file {
            sources.extend(read_url_file(path)?);
        }

        let mut engine = EngineSettings::with_server(self.server);
        engine.connect_timeout = Duration::from_secs(self.connect_timeout);

        Ok(AppConfig {
            engine,
            urls: sources.join("\n"),
            pdf: self.pdf.map(PdfSelection::new),
            use_selenium: self.no_selenium.then_some(false),
            out: self.out,
            preview: !self.no_preview,
            log_to: self.log_to.into(),
            log_level: if self.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            log_file: self
                .log_file
                .unwrap_or_else(scrapedesk_logging::default_log_file),
        })
    }
}

fn read_url_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read URL file {}", path.display()))?;
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        urls_from_csv(&text).with_context(|| format!("parse {}", path.display()))
    } else {
        Ok(urls_from_lines(&text))
    }
}

fn urls_from_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn urls_from_csv(text: &str) -> anyhow::Result<Vec<String>> {
    let mut records = csv_records(text.trim_start_matches('\u{feff}')).into_iter();
    let header = records.next().context("CSV file is empty")?;
    let column = header
        .iter()
        .position(|name| name.trim().eq_ignore_ascii_case("url"))
        .context("CSV file has no `url` column")?;

    Ok(records
        .filter_map(|record| record.into_iter().nth(column))
        .map(|cell| cell.trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect())
}

/// Splits CSV text into records. Quote state carries across line breaks, so a
/// quoted cell may hold commas, `""` and newlines. Blank lines are skipped.
fn csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => record.push(std::mem::take(&mut cell)),
            '\n' | '\r' if !quoted => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut cell));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => cell.push(ch),
        }
    }
    record.push(cell);
    push_record(&mut records, record);
    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push(record);
    }
}
