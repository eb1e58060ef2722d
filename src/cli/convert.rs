use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

use xml2sheet::converter::default_output_path;
use xml2sheet::{ConversionConfig, ConversionStats, InputFormat, XmlConverter};

use super::config::Config;
use super::Profile;

/// Settings given explicitly on the command line
#[derive(Debug, Default)]
pub struct Overrides {
    pub buffer_size: Option<usize>,
    pub batch_size: Option<usize>,
    pub sample_size: Option<usize>,
    pub sheet_name: Option<String>,
}

/// Layer profile defaults, config file and explicit flags, in that order
pub fn build_config(profile: Profile, file: Option<&Config>, overrides: Overrides) -> ConversionConfig {
    let mut config = profile.conversion_config();

    if let Some(file) = file {
        let settings = &file.conversion;
        if let Some(buffer_size) = settings.buffer_size {
            config.input_buffer_size = buffer_size;
        }
        if let Some(batch_size) = settings.batch_size {
            config.writer_config.batch_size = batch_size;
        }
        if let Some(sample_size) = settings.sample_size {
            config.header_sample_size = sample_size;
        }
        if let Some(sheet_name) = &settings.sheet_name {
            config.sheet_name = sheet_name.clone();
        }
    }

    if let Some(buffer_size) = overrides.buffer_size {
        config.input_buffer_size = buffer_size;
    }
    if let Some(batch_size) = overrides.batch_size {
        config.writer_config.batch_size = batch_size;
    }
    if let Some(sample_size) = overrides.sample_size {
        config.header_sample_size = sample_size;
    }
    if let Some(sheet_name) = overrides.sheet_name {
        config.sheet_name = sheet_name;
    }

    config
}

/// Convert an XML document to an XLSX workbook
pub fn run(
    input: PathBuf,
    output: Option<PathBuf>,
    format: Option<InputFormat>,
    profile: Profile,
    config_path: Option<PathBuf>,
    overrides: Overrides,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let file_config = config_path
        .as_deref()
        .map(Config::from_file)
        .transpose()?;
    let config = build_config(profile, file_config.as_ref(), overrides);

    let output = output.unwrap_or_else(|| default_output_path(&input));
    let format = format.unwrap_or_else(|| InputFormat::classify(&input));

    info!("xml2sheet - XML to XLSX");
    info!("=======================");
    info!("Input:  {}", input.display());
    info!("Output: {}", output.display());
    info!("Mode: {}", format);
    info!("Profile: {}", profile);
    info!("Read buffer: {} bytes", config.input_buffer_size);
    info!("Batch size: {}", config.writer_config.batch_size);

    let converter = XmlConverter::with_config(config);
    let stats = converter
        .convert_as(&input, &output, format)
        .with_context(|| format!("Conversion of {} failed", input.display()))?;

    println!("{}", format_summary(&stats, &output));
    Ok(())
}

/// Human-readable conversion summary
fn format_summary(stats: &ConversionStats, output: &Path) -> String {
    #[cfg(feature = "colorized_output")]
    {
        use console::style;

        let mut summary = format!(
            "{} {} ({})\n",
            style("Converted").green().bold(),
            style(output.display()).bold(),
            stats.format
        );
        if let Some(element) = &stats.repeating_element {
            summary.push_str(&format!(
                "  Row element: <{}> ({} occurrences)\n",
                style(&element.name).cyan(),
                element.occurrences
            ));
        }
        for sheet in &stats.writer.sheets {
            summary.push_str(&format!(
                "  {}: {} rows, {} columns\n",
                style(&sheet.name).cyan(),
                sheet.rows_written,
                sheet.columns
            ));
        }
        summary.push_str(&format!(
            "  {} bytes -> {} bytes in {:.2}s",
            stats.source_file_size,
            stats.output_file_size,
            stats.elapsed.as_secs_f64()
        ));
        summary
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        format!("Converted {}\n{}", output.display(), stats)
    }
}
