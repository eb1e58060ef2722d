use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use xml2sheet::InputFormat;

mod config;
mod convert;
mod detect;
mod profile;

pub use profile::Profile;

/// xml2sheet - Streaming XML to spreadsheet converter
#[derive(Parser)]
#[command(name = "xml2sheet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Conversion profile for trading memory against speed.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ProfileArg {
    /// Small read buffer and row batches
    LowMemory,
    /// Balance between memory and speed
    #[default]
    Balanced,
    /// Large read buffer and row batches
    Throughput,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::LowMemory => Profile::LowMemory,
            ProfileArg::Balanced => Profile::Balanced,
            ProfileArg::Throughput => Profile::Throughput,
        }
    }
}

/// Conversion mode selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Classify by extension and root element
    #[default]
    Auto,
    /// Flatten the repeating element into one sheet
    Generic,
    /// Peripherals, registers and fields in three sheets
    Svd,
}

impl FormatArg {
    /// Explicit format, or `None` to classify the input
    pub fn resolve(self) -> Option<InputFormat> {
        match self {
            FormatArg::Auto => None,
            FormatArg::Generic => Some(InputFormat::Generic),
            FormatArg::Svd => Some(InputFormat::Svd),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an XML or SVD document to an XLSX workbook
    Convert {
        /// Input XML file path
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output workbook path (defaults to the input path with .xlsx)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Conversion mode (auto, generic, svd)
        #[arg(short = 'f', long, default_value = "auto", value_enum)]
        format: FormatArg,

        /// Conversion profile (low-memory, balanced, throughput)
        #[arg(short = 'p', long, default_value = "balanced", value_enum)]
        profile: ProfileArg,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Sheet name in generic mode
        #[arg(long, value_name = "NAME")]
        sheet_name: Option<String>,

        // === Advanced tuning flags (hidden from --help) ===
        /// Input read buffer size in bytes
        #[arg(short = 'b', long, hide = true)]
        buffer_size: Option<usize>,

        /// Rows buffered per sheet before a flush
        #[arg(long, hide = true)]
        batch_size: Option<usize>,

        /// Leading records sampled for generic column headers
        #[arg(long, hide = true)]
        sample_size: Option<usize>,
    },

    /// Show how a document would be converted without writing anything
    Detect {
        /// Input XML file path
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Conversion mode (auto, generic, svd)
        #[arg(short = 'f', long, default_value = "auto", value_enum)]
        format: FormatArg,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            profile,
            config,
            sheet_name,
            buffer_size,
            batch_size,
            sample_size,
        } => convert::run(
            input,
            output,
            format.resolve(),
            Profile::from(profile),
            config,
            convert::Overrides {
                buffer_size,
                batch_size,
                sample_size,
                sheet_name,
            },
        ),
        Commands::Detect { input, format } => detect::run(input, format.resolve()),
    }
}
