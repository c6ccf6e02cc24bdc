use crate::catalog::{filter, overlap::DEFAULT_RECIPROCAL_FRACTION, repmask, OverlapMode};
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

type ArgResult<T> = std::result::Result<T, String>;

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="trcat",
          version=&**FULL_VERSION,
          about="Interval tools for building a tandem repeat reference catalog",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(global = true)]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Filter BED regions by chromosome, coordinates and span")]
    Filter(FilterArgs),
    #[clap(about = "Translate Tandem Repeat Finder output to genome coordinates")]
    Trf(TrfArgs),
    #[clap(about = "Attach overlapping indexed annotations to regions")]
    Annotate(AnnotateArgs),
    #[clap(about = "Distribution of overlap counts between region sets")]
    Intersect(IntersectArgs),
    #[clap(about = "Span statistics of a BED file")]
    Stats(StatsArgs),
    #[clap(about = "Collect RepeatMasker hits above a score threshold")]
    Repmask(RepmaskArgs),
}

/// Which overlap modes `intersect` runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeSelection {
    Any,
    Reciprocal,
    Both,
}

impl FromStr for ModeSelection {
    type Err = &'static str;
    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "any" => Ok(ModeSelection::Any),
            "reciprocal" => Ok(ModeSelection::Reciprocal),
            "both" => Ok(ModeSelection::Both),
            _ => Err("Invalid mode. Options are: any, reciprocal, both"),
        }
    }
}

impl ModeSelection {
    pub fn modes(&self, fraction: f64) -> Vec<OverlapMode> {
        let reciprocal = OverlapMode::Reciprocal { fraction };
        match self {
            ModeSelection::Any => vec![OverlapMode::Any],
            ModeSelection::Reciprocal => vec![reciprocal],
            ModeSelection::Both => vec![OverlapMode::Any, reciprocal],
        }
    }
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("filter")))]
pub struct FilterArgs {
    #[clap(required = true)]
    #[clap(help = "Path of the JSON filtering summary")]
    #[clap(value_name = "SUMMARY_JSON")]
    #[arg(value_parser = check_prefix_path)]
    pub summary_path: String,

    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(help = "BED file with regions to filter [default: stdin]")]
    #[clap(value_name = "BED")]
    #[arg(value_parser = check_file_exists)]
    pub input_path: Option<PathBuf>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-span")]
    #[clap(value_name = "MIN_SPAN")]
    #[clap(help = "Regions spanning fewer bases are removed")]
    #[clap(default_value_t = filter::DEFAULT_MIN_SPAN)]
    pub min_span: u64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-span")]
    #[clap(value_name = "MAX_SPAN")]
    #[clap(help = "Regions spanning more bases are removed")]
    #[clap(default_value_t = filter::DEFAULT_MAX_SPAN)]
    pub max_span: u64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "contig")]
    #[clap(value_name = "CONTIG")]
    #[clap(help = "Additional contig to keep besides 1-22, X and Y (repeatable)")]
    pub extra_contigs: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("trf")))]
#[command(arg_required_else_help(true))]
pub struct TrfArgs {
    #[clap(required = true)]
    #[clap(help = "TRF -ngs output of regions fetched with samtools faidx")]
    #[clap(value_name = "TRF_OUTPUT")]
    #[arg(value_parser = check_file_exists)]
    pub trf_path: PathBuf,

    #[clap(required = true)]
    #[clap(help = "Output TSV path; full records go to OUTPUT.json.gz")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output: String,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("annotate")))]
#[command(arg_required_else_help(true))]
pub struct AnnotateArgs {
    #[clap(required = true)]
    #[clap(help = "BED file with regions")]
    #[clap(value_name = "REGIONS")]
    #[arg(value_parser = check_file_exists)]
    pub regions_path: PathBuf,

    #[clap(required = true)]
    #[clap(help = "bgzipped and tabix-indexed annotations")]
    #[clap(value_name = "ANNOTATIONS")]
    #[arg(value_parser = check_file_exists)]
    pub annotations_path: PathBuf,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("intersect")))]
#[command(arg_required_else_help(true))]
pub struct IntersectArgs {
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "regions")]
    #[clap(help = "BED file(s) whose intervals are counted")]
    #[clap(value_name = "REGIONS")]
    #[clap(num_args = 1..)]
    #[arg(value_parser = check_file_exists)]
    pub regions_paths: Vec<PathBuf>,

    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "catalog")]
    #[clap(help = "BED file with the intervals to count against")]
    #[clap(value_name = "CATALOG")]
    #[arg(value_parser = check_file_exists)]
    pub catalog_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output path of the gzipped JSON count table")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output: String,

    #[clap(long = "mode")]
    #[clap(value_name = "MODE")]
    #[clap(help = "Overlap modes to run (any, reciprocal or both)")]
    #[clap(default_value = "both")]
    pub mode: ModeSelection,

    #[clap(long = "source")]
    #[clap(value_name = "SOURCE")]
    #[clap(help = "Source label of the rows [default: parent directory of each REGIONS file]")]
    #[arg(value_parser = check_source_nonempty)]
    pub source: Option<String>,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "fraction")]
    #[clap(value_name = "FRACTION")]
    #[clap(help = "Minimum overlap as a fraction of both intervals in reciprocal mode")]
    #[clap(default_value_t = DEFAULT_RECIPROCAL_FRACTION)]
    #[arg(value_parser = ensure_unit_float)]
    pub fraction: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "native")]
    #[clap(help = "Count overlaps in-process instead of running bedtools")]
    pub native: bool,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "bedtools")]
    #[clap(value_name = "BEDTOOLS")]
    #[clap(help = "bedtools executable")]
    #[clap(default_value = "bedtools")]
    pub bedtools: PathBuf,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "print")]
    #[clap(help = "Also print the table to stdout")]
    pub print: bool,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("stats")))]
pub struct StatsArgs {
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(help = "BED file [default: stdin]")]
    #[clap(value_name = "BED")]
    #[arg(value_parser = check_file_exists)]
    pub input_path: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("repmask")))]
#[command(arg_required_else_help(true))]
pub struct RepmaskArgs {
    #[clap(required = true)]
    #[clap(help = "Output path of the gzipped JSON lookup")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output: String,

    #[clap(required = true)]
    #[clap(help = "RepeatMasker .out files")]
    #[clap(value_name = "RM_OUTPUT")]
    #[clap(num_args = 1..)]
    #[arg(value_parser = check_file_exists)]
    pub rm_paths: Vec<PathBuf>,

    #[clap(long = "threshold")]
    #[clap(value_name = "SCORE")]
    #[clap(help = "Minimum SW score of a hit")]
    #[clap(default_value_t = repmask::DEFAULT_MIN_SCORE)]
    pub threshold: u32,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> ArgResult<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn threads_in_range(s: &str) -> ArgResult<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> ArgResult<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn check_source_nonempty(s: &str) -> ArgResult<String> {
    if s.trim().is_empty() {
        Err("Source label cannot be an empty string".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn ensure_unit_float(s: &str) -> ArgResult<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(value > 0.0 && value <= 1.0) {
        Err(format!(
            "The value must be greater than 0.0 and at most 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        assert_eq!("both".parse::<ModeSelection>(), Ok(ModeSelection::Both));
        assert!("all".parse::<ModeSelection>().is_err());
        assert_eq!(
            ModeSelection::Both.modes(0.5),
            vec![OverlapMode::Any, OverlapMode::Reciprocal { fraction: 0.5 }]
        );
    }

    #[test]
    fn test_ensure_unit_float() {
        assert_eq!(ensure_unit_float("0.5"), Ok(0.5));
        assert!(ensure_unit_float("0").is_err());
        assert!(ensure_unit_float("1.5").is_err());
        assert!(ensure_unit_float("half").is_err());
    }

    #[test]
    fn test_threads_in_range() {
        assert_eq!(threads_in_range("4"), Ok(4));
        assert!(threads_in_range("0").is_err());
    }

    #[test]
    fn test_parse_intersect_args() {
        let cli = Cli::try_parse_from([
            "trcat",
            "intersect",
            "-a",
            "Cargo.toml",
            "-b",
            "Cargo.toml",
            "-o",
            "out.json.gz",
            "--mode",
            "reciprocal",
            "--fraction",
            "0.6",
        ])
        .unwrap();
        match cli.command {
            Command::Intersect(args) => {
                assert_eq!(args.mode, ModeSelection::Reciprocal);
                assert_eq!(args.fraction, 0.6);
                assert_eq!(args.regions_paths.len(), 1);
                assert!(!args.native);
            }
            _ => panic!("expected intersect"),
        }
    }

    #[test]
    fn test_filter_defaults() {
        let cli = Cli::try_parse_from(["trcat", "filter", "summary.json"]).unwrap();
        match cli.command {
            Command::Filter(args) => {
                assert_eq!(args.min_span, 10);
                assert_eq!(args.max_span, 50_000);
                assert!(args.input_path.is_none());
            }
            _ => panic!("expected filter"),
        }
    }
}
