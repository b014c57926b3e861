#![cfg_attr(not(any(feature = "std", test)), no_std)]
//! Names and layout of the split `.text` subsections, shared by `sectkeep-retain` (which keeps
//! the boundary markers alive) and `sectkeep` (which checks them after the link).

#[cfg(any(feature = "alloc", test))]
extern crate alloc;

use thiserror::Error;

/// Start/end boundary markers and their symbol names.
pub mod marker;
/// Linker script emission.
#[cfg(any(feature = "alloc", test))]
pub mod script;
/// The seven `.text` subsections and the address ranges they occupy.
pub mod section;

pub use marker::{Boundary, MARKER_COUNT, MARKERS, Marker};
pub use section::{SectionRange, TextSection};

/// Symbol name of the `#[used]` table holding every marker address.
pub const RETENTION_TABLE_SYMBOL: &str = "__sectkeep_text_markers";
/// Symbol name of the exported function that depends on every marker address.
pub const RETENTION_FN_SYMBOL: &str = "__sectkeep_use_text_markers";

/// Both retention roots, table first.
pub const RETENTION_ROOTS: [&str; 2] = [RETENTION_TABLE_SYMBOL, RETENTION_FN_SYMBOL];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown text section name")]
    UnknownSection,
    #[error("not a text section boundary marker")]
    UnknownMarker,
}
