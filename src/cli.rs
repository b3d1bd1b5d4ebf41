/*
 * The command line front end: argument parsing, logger setup, merging the
 * stored configuration with command line overrides, and writing the produced
 * artifacts to disk. `run` takes the configuration manager and an output sink
 * as parameters so it can be exercised in tests without touching the user's
 * real configuration or stdout.
 */
use crate::core::collation::locale_compare;
use crate::core::config::{ConfigError, ConfigManagerOperations, PackagerConfig};
use crate::core::models::{CandidateFile, OutputFormat};
use crate::core::packager::{CorePackager, PackageError, PackagerOperations};
use crate::core::path_utils::APP_NAME;
use crate::core::{DirectoryFileSource, FileSourceOperations, ReadError};
use clap::{Parser, ValueEnum};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Pdf,
    Both,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Pdf => OutputFormat::Pdf,
            FormatArg::Both => OutputFormat::Both,
        }
    }
}

/// Packages a directory of source files into a single text or PDF document.
#[derive(Debug, Parser)]
#[command(name = "code_packager", version)]
pub struct Cli {
    /// Root directory to package
    pub root: PathBuf,

    /// Directory the packaged files are written to
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Additional exclusion rule, may be repeated
    #[arg(short, long = "exclude", value_name = "RULE")]
    pub exclude: Vec<String>,

    /// File with one exclusion rule per line
    #[arg(long, value_name = "FILE")]
    pub exclusions_file: Option<PathBuf>,

    /// Number of parallel file readers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Abort reading after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Page budget for a single file in the PDF
    #[arg(long, value_name = "N")]
    pub max_pages_per_file: Option<u32>,

    /// Do not apply the built-in exclusion rules
    #[arg(long)]
    pub no_defaults: bool,

    /// Print the files that would be packaged and exit
    #[arg(long)]
    pub list: bool,

    /// Persist the merged settings as the new stored configuration
    #[arg(long)]
    pub save_config: bool,

    /// Log debug output to the terminal
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write debug logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Package(PackageError),
    Io { path: PathBuf, source: io::Error },
    Logger(log::SetLoggerError),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<PackageError> for AppError {
    fn from(err: PackageError) -> Self {
        AppError::Package(err)
    }
}

impl From<ReadError> for AppError {
    fn from(err: ReadError) -> Self {
        AppError::Package(PackageError::Read(err))
    }
}

impl From<log::SetLoggerError> for AppError {
    fn from(err: log::SetLoggerError) -> Self {
        AppError::Logger(err)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "{e}"),
            AppError::Package(e) => write!(f, "{e}"),
            AppError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            AppError::Logger(e) => write!(f, "Failed to initialize logging: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Package(e) => Some(e),
            AppError::Io { source, .. } => Some(source),
            AppError::Logger(e) => Some(e),
        }
    }
}

impl AppError {
    pub fn is_empty_set(&self) -> bool {
        matches!(self, AppError::Package(PackageError::EmptySet { .. }))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> AppError + '_ {
    move |source| AppError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let term_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        term_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));
    if let Some(path) = log_file {
        let file = File::create(path).map_err(io_error(path))?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

/*
 * Folds the command line flags into the stored configuration. Exclusion rules
 * from `--exclude` and `--exclusions-file` are appended to the stored custom
 * rules; every other flag replaces its stored value when given.
 */
pub fn apply_overrides(config: &mut PackagerConfig, cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.exclusions_file {
        let text = fs::read_to_string(path).map_err(io_error(path))?;
        config.custom_exclusions.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    config.custom_exclusions.extend(cli.exclude.iter().cloned());
    if cli.no_defaults {
        config.use_default_exclusions = false;
    }
    if let Some(format) = cli.format {
        config.format = format.into();
    }
    if let Some(workers) = cli.workers {
        config.read_workers = workers;
    }
    if cli.timeout.is_some() {
        config.read_timeout_secs = cli.timeout;
    }
    if let Some(max_pages) = cli.max_pages_per_file {
        config.max_pages_per_file = max_pages;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub byte_count: usize,
    pub sha256: String,
}

pub fn run(
    cli: &Cli,
    config_manager: &dyn ConfigManagerOperations,
    out: &mut dyn Write,
) -> Result<Vec<WrittenArtifact>> {
    let stdout_error = |e: io::Error| AppError::Io {
        path: PathBuf::from("<stdout>"),
        source: e,
    };

    let mut config = config_manager.load_config(APP_NAME)?;
    apply_overrides(&mut config, cli)?;
    if cli.save_config {
        let saved = config_manager.save_config(APP_NAME, &config)?;
        writeln!(out, "Saved configuration to {}", saved.display()).map_err(stdout_error)?;
    }

    let source = DirectoryFileSource::new(&cli.root)?;
    let packager = CorePackager::new(
        config.rule_set(),
        config.acquisition_options(),
        config.layout_limits(),
    );

    if cli.list {
        let candidates = source.list_candidates()?;
        writeln!(
            out,
            "{} files detected in '{}'",
            candidates.len(),
            source.root_name()
        )
        .map_err(stdout_error)?;
        let mut kept: Vec<CandidateFile> = packager.filter_candidates(candidates);
        kept.sort_by(|a, b| locale_compare(&a.path, &b.path));
        writeln!(out, "{} files after exclusions", kept.len()).map_err(stdout_error)?;
        for candidate in &kept {
            writeln!(out, "  {}", candidate.path).map_err(stdout_error)?;
        }
        return Ok(Vec::new());
    }

    let root_name = source.root_name().to_string();
    let report = match packager.package_source(Arc::new(source), config.format) {
        Ok(report) => report,
        Err(PackageError::EmptySet { candidate_count }) => {
            writeln!(out, "{candidate_count} files detected in '{root_name}'")
                .map_err(stdout_error)?;
            writeln!(out, "No files to process.").map_err(stdout_error)?;
            return Err(PackageError::EmptySet { candidate_count }.into());
        }
        Err(e) => return Err(e.into()),
    };
    writeln!(
        out,
        "{} files detected in '{}'",
        report.candidate_count, report.project_name
    )
    .map_err(stdout_error)?;
    writeln!(out, "{} files after exclusions", report.file_count).map_err(stdout_error)?;

    fs::create_dir_all(&cli.output).map_err(io_error(&cli.output))?;
    let mut written = Vec::new();
    for outcome in &report.outcomes {
        for warning in &outcome.warnings {
            log::warn!("CodePackager: {warning}");
            writeln!(out, "Warning: {warning}").map_err(stdout_error)?;
        }
        let path = cli.output.join(&outcome.blob.suggested_filename);
        fs::write(&path, &outcome.blob.bytes).map_err(io_error(&path))?;
        writeln!(
            out,
            "Wrote {} ({} bytes, sha256 {})",
            path.display(),
            outcome.blob.bytes.len(),
            outcome.sha256
        )
        .map_err(stdout_error)?;
        written.push(WrittenArtifact {
            path,
            byte_count: outcome.blob.bytes.len(),
            sha256: outcome.sha256.clone(),
        });
    }
    Ok(written)
}
