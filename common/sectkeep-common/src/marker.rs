use crate::{ParseError, TextSection};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    Start,
    End,
}

/// One boundary symbol, `__text_<section>_<start|end>`.
///
/// The symbol is zero-sized: only its address means anything.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Marker {
    pub section: TextSection,
    pub boundary: Boundary,
}

pub const MARKER_COUNT: usize = 2 * TextSection::ALL.len();

/// Every marker, section-major: `unlikely_start, unlikely_end, exit_start, ..., warning_end`.
pub const MARKERS: [Marker; MARKER_COUNT] = {
    let mut markers = [Marker::start(TextSection::Unlikely); MARKER_COUNT];
    let mut i = 0;
    while i < TextSection::ALL.len() {
        markers[2 * i] = Marker::start(TextSection::ALL[i]);
        markers[2 * i + 1] = Marker::end(TextSection::ALL[i]);
        i += 1;
    }
    markers
};

impl Marker {
    pub const fn start(section: TextSection) -> Self {
        Self {
            section,
            boundary: Boundary::Start,
        }
    }

    pub const fn end(section: TextSection) -> Self {
        Self {
            section,
            boundary: Boundary::End,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self.boundary {
            Boundary::Start => self.section.start_symbol(),
            Boundary::End => self.section.end_symbol(),
        }
    }

    /// Position in [`MARKERS`].
    pub const fn index(self) -> usize {
        2 * self.section.index()
            + match self.boundary {
                Boundary::Start => 0,
                Boundary::End => 1,
            }
    }

    /// The other half of the start/end pair.
    pub const fn partner(self) -> Self {
        match self.boundary {
            Boundary::Start => Marker::end(self.section),
            Boundary::End => Marker::start(self.section),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.symbol())
    }
}

impl FromStr for Marker {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("__text_").ok_or(ParseError::UnknownMarker)?;
        let (name, boundary) = if let Some(name) = rest.strip_suffix("_start") {
            (name, Boundary::Start)
        } else if let Some(name) = rest.strip_suffix("_end") {
            (name, Boundary::End)
        } else {
            return Err(ParseError::UnknownMarker);
        };
        let section = name.parse().map_err(|_| ParseError::UnknownMarker)?;
        Ok(Marker { section, boundary })
    }
}
