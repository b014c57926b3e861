//! Post-link checks: every boundary marker resolves inside the expected output section, pairs
//! are ordered, and the retention root survived.

use crate::config::VerifyConfig;
use elf::ElfBytes;
use elf::endian::AnyEndian;
use elf::symbol::Symbol;
use eyre::{Result, WrapErr, eyre};
use sectkeep_common::{MARKERS, Marker, RETENTION_ROOTS, SectionRange, TextSection};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// The output section the markers are checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpan {
    pub name: String,
    pub start: u64,
    pub end: u64,
}

impl OutputSpan {
    /// End-inclusive: an end marker may sit exactly on the end of the section.
    pub fn holds(&self, addr: u64) -> bool {
        self.start <= addr && addr <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Finding {
    #[error("{0} is not in the symbol table")]
    Missing(Marker),
    #[error("{0} is referenced but never defined")]
    Undefined(Marker),
    #[error("{marker} at {address:#x} lies outside {section} ({start:#x}..{end:#x})")]
    OutsideSection {
        marker: Marker,
        address: u64,
        section: String,
        start: u64,
        end: u64,
    },
    #[error("{section} ends at {end:#x} before it starts at {start:#x}")]
    Inverted {
        section: TextSection,
        start: u64,
        end: u64,
    },
    #[error("{first} ends at {end:#x}, after {second} starts at {start:#x}")]
    Overlap {
        first: TextSection,
        end: u64,
        second: TextSection,
        start: u64,
    },
    #[error("{0} is empty")]
    Empty(TextSection),
    #[error("neither {} nor {} survived the link", RETENTION_ROOTS[0], RETENTION_ROOTS[1])]
    RootMissing,
}

#[derive(Debug, Clone)]
pub struct Verification {
    pub output: OutputSpan,
    /// Ranges of every subsection whose two markers both resolved.
    pub ranges: Vec<SectionRange>,
    /// Retention roots found defined in the symbol table.
    pub roots: Vec<&'static str>,
    pub findings: Vec<Finding>,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }
}

pub fn verify_file(path: &Path, settings: &VerifyConfig) -> Result<Verification> {
    let data =
        std::fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
    verify_bytes(&data, settings).wrap_err_with(|| format!("while checking {}", path.display()))
}

pub fn verify_bytes(data: &[u8], settings: &VerifyConfig) -> Result<Verification> {
    let elf = ElfBytes::<AnyEndian>::minimal_parse(data).wrap_err("failed to parse ELF file")?;

    let header = elf
        .section_header_by_name(&settings.section)
        .wrap_err("failed to read section headers")?
        .ok_or_else(|| eyre!("no {} section in ELF file", settings.section))?;
    let output = OutputSpan {
        name: settings.section.clone(),
        start: header.sh_addr,
        end: header.sh_addr.saturating_add(header.sh_size),
    };
    tracing::debug!(
        "{} spans {:#x}..{:#x}",
        output.name,
        output.start,
        output.end
    );

    let symbols = interesting_symbols(&elf)?;
    let mut findings = Vec::new();

    let mut resolve = |marker: Marker| -> Option<u64> {
        let Some(symbol) = symbols.get(marker.symbol()) else {
            findings.push(Finding::Missing(marker));
            return None;
        };
        if symbol.is_undefined() {
            findings.push(Finding::Undefined(marker));
            return None;
        }
        let address = symbol.st_value;
        tracing::debug!("{marker} = {address:#x}");
        if !output.holds(address) {
            findings.push(Finding::OutsideSection {
                marker,
                address,
                section: output.name.clone(),
                start: output.start,
                end: output.end,
            });
        }
        Some(address)
    };

    let mut resolved = Vec::new();
    for section in TextSection::ALL {
        let start = resolve(Marker::start(section));
        let end = resolve(Marker::end(section));
        if let (Some(start), Some(end)) = (start, end) {
            resolved.push(SectionRange::new(section, start, end));
        }
    }

    let mut ranges = Vec::with_capacity(resolved.len());
    for range in resolved {
        if range.is_inverted() {
            findings.push(Finding::Inverted {
                section: range.section,
                start: range.start,
                end: range.end,
            });
            continue;
        }
        if range.is_empty() && settings.require_nonempty.contains(&range.section) {
            findings.push(Finding::Empty(range.section));
        }
        ranges.push(range);
    }

    if settings.strict_order {
        for pair in ranges.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if first.end > second.start {
                findings.push(Finding::Overlap {
                    first: first.section,
                    end: first.end,
                    second: second.section,
                    start: second.start,
                });
            }
        }
    }

    let roots: Vec<&'static str> = RETENTION_ROOTS
        .into_iter()
        .filter(|root| symbols.get(root).is_some_and(|s| !s.is_undefined()))
        .collect();
    if roots.is_empty() {
        if settings.require_root {
            findings.push(Finding::RootMissing);
        } else {
            tracing::warn!("no retention root found; markers survived some other way");
        }
    }

    Ok(Verification {
        output,
        ranges,
        roots,
        findings,
    })
}

/// Marker and retention root symbols, by name. A defined symbol wins over an undefined
/// reference of the same name.
fn interesting_symbols(elf: &ElfBytes<AnyEndian>) -> Result<HashMap<&'static str, Symbol>> {
    let (symtab, strtab) = elf
        .symbol_table()
        .wrap_err("failed to read symbol table")?
        .ok_or_else(|| eyre!("ELF file has no symbol table (was it stripped?)"))?;

    let wanted = |name: &str| -> Option<&'static str> {
        MARKERS
            .iter()
            .map(|m| m.symbol())
            .chain(RETENTION_ROOTS)
            .find(|&w| w == name)
    };

    let mut symbols: HashMap<&'static str, Symbol> = HashMap::new();
    for symbol in symtab.iter() {
        if symbol.st_name == 0 {
            continue;
        }
        let name = strtab
            .get(symbol.st_name as usize)
            .wrap_err("failed to read symbol name")?;
        let Some(key) = wanted(name) else {
            continue;
        };
        match symbols.get(key) {
            Some(existing) if !existing.is_undefined() => {}
            _ => {
                symbols.insert(key, symbol);
            }
        }
    }
    Ok(symbols)
}
