//! Human and TOML renderings of verification results and map layouts. Reports go to stdout, logs
//! to stderr.

use crate::OutputFormat;
use crate::mapfile::MapLayout;
use crate::verify::Verification;
use eyre::{Result, WrapErr};
use sectkeep_common::{SectionRange, TextSection};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct RangeReport {
    section: TextSection,
    start: String,
    end: String,
    size: u64,
}

impl From<&SectionRange> for RangeReport {
    fn from(range: &SectionRange) -> Self {
        Self {
            section: range.section,
            start: hex(range.start),
            end: hex(range.end),
            size: range.len(),
        }
    }
}

#[derive(Debug, Serialize)]
struct VerificationReport<'a> {
    file: String,
    passed: bool,
    section: &'a str,
    section_start: String,
    section_end: String,
    roots: &'a [&'static str],
    findings: Vec<String>,
    ranges: Vec<RangeReport>,
}

#[derive(Debug, Serialize)]
struct MarkerReport {
    symbol: &'static str,
    address: String,
}

#[derive(Debug, Serialize)]
struct MapReport {
    file: String,
    text_start: String,
    text_end: String,
    ranges: Vec<RangeReport>,
    markers: Vec<MarkerReport>,
}

// TOML integers are signed 64-bit, addresses are not
fn hex(addr: u64) -> String {
    format!("{addr:#x}")
}

pub fn print_verification(path: &Path, v: &Verification, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print!("{}", verification_text(path, v));
            Ok(())
        }
        OutputFormat::Toml => {
            print!("{}", verification_toml(path, v)?);
            Ok(())
        }
    }
}

pub fn print_map_layout(path: &Path, layout: &MapLayout, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print!("{}", map_text(path, layout));
            Ok(())
        }
        OutputFormat::Toml => {
            print!("{}", map_toml(path, layout)?);
            Ok(())
        }
    }
}

fn verification_toml(path: &Path, v: &Verification) -> Result<String> {
    let report = VerificationReport {
        file: path.display().to_string(),
        passed: v.passed(),
        section: &v.output.name,
        section_start: hex(v.output.start),
        section_end: hex(v.output.end),
        roots: &v.roots,
        findings: v.findings.iter().map(ToString::to_string).collect(),
        ranges: v.ranges.iter().map(RangeReport::from).collect(),
    };
    toml::to_string(&report).wrap_err("failed to serialize verification report")
}

fn map_toml(path: &Path, layout: &MapLayout) -> Result<String> {
    let report = MapReport {
        file: path.display().to_string(),
        text_start: hex(layout.output_start),
        text_end: hex(layout.output_end),
        ranges: layout.ranges.iter().map(RangeReport::from).collect(),
        markers: layout
            .markers
            .iter()
            .map(|&(marker, addr)| MarkerReport {
                symbol: marker.symbol(),
                address: hex(addr),
            })
            .collect(),
    };
    toml::to_string(&report).wrap_err("failed to serialize map report")
}

fn range_table(out: &mut String, ranges: &[SectionRange]) {
    out.push_str(&format!(
        "  {:<10} {:>18} {:>18} {:>10}\n",
        console::style("section").bold(),
        console::style("start").bold(),
        console::style("end").bold(),
        console::style("size").bold(),
    ));
    for range in ranges {
        out.push_str(&format!(
            "  {:<10} {:>#18x} {:>#18x} {:>10}\n",
            range.section,
            range.start,
            range.end,
            range.len()
        ));
    }
}

fn verification_text(path: &Path, v: &Verification) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}: {} {:#x}..{:#x}\n",
        console::style(path.display()).bold(),
        v.output.name,
        v.output.start,
        v.output.end
    ));
    range_table(&mut out, &v.ranges);
    if v.roots.is_empty() {
        out.push_str("  retention roots: none\n");
    } else {
        out.push_str(&format!("  retention roots: {}\n", v.roots.join(", ")));
    }
    for finding in &v.findings {
        out.push_str(&format!(
            "  {} {finding}\n",
            console::style("error:").red().bold()
        ));
    }
    out
}

fn map_text(path: &Path, layout: &MapLayout) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}: .text {:#x}..{:#x}\n",
        console::style(path.display()).bold(),
        layout.output_start,
        layout.output_end
    ));
    range_table(&mut out, &layout.ranges);
    for (marker, addr) in &layout.markers {
        out.push_str(&format!("  {marker} = {addr:#x}\n"));
    }
    out
}
