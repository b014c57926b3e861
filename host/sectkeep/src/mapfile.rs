//! Recovers the `.text` subsection layout from a GNU ld map file (`ld -Map`), for binaries that
//! were linked without the boundary markers.
//!
//! The map echoes every input rule of the `.text` statement (`*(.text.hot .text.hot.*)`) followed
//! by the input sections it matched, with their addresses. A subsection starts at the first
//! address listed under its rule and ends where the next non-empty subsection starts, or at the
//! end of `.text`.

use eyre::{Result, WrapErr, bail, eyre};
use sectkeep_common::{Marker, SectionRange, TextSection};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLayout {
    pub output_start: u64,
    pub output_end: u64,
    /// Non-empty subsections, in link order.
    pub ranges: Vec<SectionRange>,
    /// Boundary marker assignments echoed in the map, if the markers were linked in.
    pub markers: Vec<(Marker, u64)>,
}

pub fn parse_file(path: &Path) -> Result<MapLayout> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read map file {}", path.display()))?;
    parse_map(&text).wrap_err_with(|| format!("while reading map file {}", path.display()))
}

pub fn parse_map(text: &str) -> Result<MapLayout> {
    let mut lines = text.lines();
    let (output_start, output_size) = find_text_header(&mut lines)?;
    let output_end = output_start.saturating_add(output_size);

    let mut current: Option<TextSection> = None;
    let mut seen_rule = false;
    let mut first_address = [None; TextSection::ALL.len()];
    let mut markers = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        // the next output section starts in column 0
        if !line.starts_with(char::is_whitespace) {
            break;
        }
        let trimmed = line.trim();
        if trimmed.starts_with("*(") || trimmed.starts_with("KEEP(") {
            current = TextSection::from_input_rule(trimmed);
            match current {
                Some(section) => {
                    tracing::trace!("rule for {section}: {trimmed}");
                    seen_rule = true;
                }
                None => tracing::debug!("ignoring input rule {trimmed}"),
            }
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.contains(&"=") {
            // symbol assignment, e.g. `0x401000   __text_hot_start = .`
            if let [address, name, "=", ..] = tokens.as_slice() {
                if let (Some(address), Ok(marker)) = (parse_hex(address), name.parse::<Marker>()) {
                    markers.push((marker, address));
                }
            }
            continue;
        }

        let Some(section) = current else {
            continue;
        };
        // `0xADDR ...` (wrapped contribution or symbol) or `NAME 0xADDR ...` (contribution, fill)
        let address = match tokens.as_slice() {
            [first, ..] if first.starts_with("0x") => parse_hex(first),
            [_, second, ..] if second.starts_with("0x") => parse_hex(second),
            _ => None,
        };
        if let Some(address) = address {
            let first = &mut first_address[section.index()];
            if first.is_none() {
                *first = Some(address);
            }
        }
    }

    if !seen_rule {
        bail!("no .text input rules found in map file");
    }

    let present: Vec<(TextSection, u64)> = TextSection::ALL
        .into_iter()
        .filter_map(|section| first_address[section.index()].map(|addr| (section, addr)))
        .collect();
    let mut ranges = Vec::with_capacity(present.len());
    for (i, &(section, start)) in present.iter().enumerate() {
        let end = present.get(i + 1).map_or(output_end, |&(_, next)| next);
        let range = SectionRange::new(section, start, end);
        if range.is_inverted() {
            tracing::warn!("{section} starts at {start:#x}, after the next subsection at {end:#x}");
            continue;
        }
        if range.is_empty() {
            continue;
        }
        ranges.push(range);
    }

    Ok(MapLayout {
        output_start,
        output_end,
        ranges,
        markers,
    })
}

/// Consumes lines up to and including the `.text` output section header and returns its address
/// and size. The header may be wrapped onto the next line.
fn find_text_header<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Result<(u64, u64)> {
    while let Some(line) = lines.next() {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(".text") {
            continue;
        }
        let mut rest: Vec<&str> = tokens.collect();
        if rest.is_empty() {
            rest = lines
                .next()
                .map(|l| l.split_whitespace().collect())
                .unwrap_or_default();
        }
        let [address, size, ..] = rest.as_slice() else {
            bail!("truncated .text header in map file");
        };
        let address = parse_hex(address).ok_or_else(|| eyre!("bad .text address {address}"))?;
        let size = parse_hex(size).ok_or_else(|| eyre!("bad .text size {size}"))?;
        return Ok((address, size));
    }
    bail!("map file has no .text output section")
}

fn parse_hex(token: &str) -> Option<u64> {
    u64::from_str_radix(token.strip_prefix("0x")?, 16).ok()
}
