use anyhow::{Context, Result};
use std::path::PathBuf;

use xml2sheet::{InputFormat, XmlConverter};

/// Print how a document would be converted
pub fn run(input: PathBuf, format: Option<InputFormat>) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let converter = XmlConverter::new();
    let format = format.unwrap_or_else(|| InputFormat::classify(&input));
    let summary = converter
        .inspect_as(&input, format)
        .with_context(|| format!("Failed to scan {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Mode: {}", summary.format);

    if let Some(element) = &summary.repeating_element {
        println!(
            "Repeating element: <{}> ({} occurrences)",
            element.name, element.occurrences
        );
        println!("Columns ({}):", summary.columns.len());
        for (i, column) in summary.columns.iter().enumerate() {
            println!("  {:3}. {}", i + 1, column);
        }
    }

    if let Some(counts) = &summary.entity_counts {
        println!("Peripherals: {}", counts.peripherals);
        println!("Registers:   {}", counts.registers);
        println!("Fields:      {}", counts.fields);
    }

    Ok(())
}
