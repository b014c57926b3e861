use crate::ParseError;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// A subsection of `.text`, in the order GNU ld's default script lays them out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSection {
    /// Cold code (`__attribute__((cold))`, `-freorder-blocks-and-partition` cold parts).
    Unlikely,
    /// Code only run at exit.
    Exit,
    /// Code only run before `main`.
    Startup,
    /// Hot code, as classified by profile feedback.
    Hot,
    /// Code sorted by name (`.text.sorted.*`), e.g. from a function ordering file.
    Sorted,
    /// Everything else.
    Normal,
    /// `.gnu.warning` link-time warning sections.
    Warning,
}

impl TextSection {
    pub const ALL: [TextSection; 7] = [
        TextSection::Unlikely,
        TextSection::Exit,
        TextSection::Startup,
        TextSection::Hot,
        TextSection::Sorted,
        TextSection::Normal,
        TextSection::Warning,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            TextSection::Unlikely => "unlikely",
            TextSection::Exit => "exit",
            TextSection::Startup => "startup",
            TextSection::Hot => "hot",
            TextSection::Sorted => "sorted",
            TextSection::Normal => "normal",
            TextSection::Warning => "warning",
        }
    }

    /// Conventional input-section name the compiler emits for this subsection.
    pub const fn input_name(self) -> &'static str {
        match self {
            TextSection::Unlikely => ".text.unlikely",
            TextSection::Exit => ".text.exit",
            TextSection::Startup => ".text.startup",
            TextSection::Hot => ".text.hot",
            TextSection::Sorted => ".text.sorted",
            TextSection::Normal => ".text",
            TextSection::Warning => ".gnu.warning",
        }
    }

    /// Input-section patterns of the matching rule in GNU ld's default `.text` statement.
    pub const fn input_patterns(self) -> &'static [&'static str] {
        match self {
            TextSection::Unlikely => &[".text.unlikely", ".text.*_unlikely", ".text.unlikely.*"],
            TextSection::Exit => &[".text.exit", ".text.exit.*"],
            TextSection::Startup => &[".text.startup", ".text.startup.*"],
            TextSection::Hot => &[".text.hot", ".text.hot.*"],
            TextSection::Sorted => &["SORT(.text.sorted.*)"],
            TextSection::Normal => &[".text", ".stub", ".text.*", ".gnu.linkonce.t.*"],
            TextSection::Warning => &[".gnu.warning"],
        }
    }

    pub const fn start_symbol(self) -> &'static str {
        match self {
            TextSection::Unlikely => "__text_unlikely_start",
            TextSection::Exit => "__text_exit_start",
            TextSection::Startup => "__text_startup_start",
            TextSection::Hot => "__text_hot_start",
            TextSection::Sorted => "__text_sorted_start",
            TextSection::Normal => "__text_normal_start",
            TextSection::Warning => "__text_warning_start",
        }
    }

    pub const fn end_symbol(self) -> &'static str {
        match self {
            TextSection::Unlikely => "__text_unlikely_end",
            TextSection::Exit => "__text_exit_end",
            TextSection::Startup => "__text_startup_end",
            TextSection::Hot => "__text_hot_end",
            TextSection::Sorted => "__text_sorted_end",
            TextSection::Normal => "__text_normal_end",
            TextSection::Warning => "__text_warning_end",
        }
    }

    pub fn next(self) -> Option<TextSection> {
        TextSection::ALL.get(self.index() + 1).copied()
    }

    /// Recognise an input rule as echoed in a linker map, e.g.
    /// `*(.text.hot .text.hot.*)` or `KEEP(*(SORT_BY_NAME(.text.sorted.*)))`.
    ///
    /// Patterns are compared with `SORT*(...)` wrappers stripped. Hand-written rules may list
    /// them in any order and only some of them; the first pattern that belongs to a subsection
    /// decides, so `*(.text.* .text)` is [`TextSection::Normal`].
    pub fn from_input_rule(rule: &str) -> Option<TextSection> {
        let mut rule = rule.trim();
        if let Some(inner) = rule.strip_prefix("KEEP(") {
            rule = inner.strip_suffix(')')?.trim();
        }
        let inner = rule.strip_prefix("*(")?.strip_suffix(')')?;
        inner
            .split_whitespace()
            .map(unwrap_sort)
            .find_map(TextSection::from_input_pattern)
    }

    fn from_input_pattern(pattern: &str) -> Option<TextSection> {
        TextSection::ALL.into_iter().find(|section| {
            section
                .input_patterns()
                .iter()
                .any(|&own| unwrap_sort(own) == pattern)
        })
    }
}

/// `SORT_BY_NAME(.text.sorted.*)` -> `.text.sorted.*`
fn unwrap_sort(pattern: &str) -> &str {
    match pattern.split_once('(') {
        Some((wrapper, rest)) if wrapper.starts_with("SORT") => rest.trim_end_matches(')'),
        _ => pattern,
    }
}

impl fmt::Display for TextSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for TextSection {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextSection::ALL
            .into_iter()
            .find(|section| section.name() == s)
            .ok_or(ParseError::UnknownSection)
    }
}

/// Half-open address range `[start, end)` occupied by one subsection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SectionRange {
    pub section: TextSection,
    pub start: u64,
    pub end: u64,
}

impl SectionRange {
    pub const fn new(section: TextSection, start: u64, end: u64) -> Self {
        Self {
            section,
            start,
            end,
        }
    }

    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// The end marker was placed before the start marker.
    pub const fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    pub const fn contains(&self, addr: u64) -> bool {
        self.start <= addr && addr < self.end
    }
}

impl fmt::Display for SectionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<9} {:#018x}..{:#018x} ({:#x} bytes)",
            self.section,
            self.start,
            self.end,
            self.len()
        )
    }
}
