#![cfg_attr(not(test), no_std)]
//! Keeps the `.text` subsection boundary markers alive through dead-symbol elimination.
//!
//! The linker script (`sectkeep script`) defines `__text_<section>_start` and
//! `__text_<section>_end` around each subsection, but nothing in the program refers to them.
//! [`TEXT_MARKERS`] takes the address of every one and is `#[used]`, and
//! [`use_text_markers`] is an exported function whose result depends on all of them. Either
//! keeps the markers resolvable until the link; `EXTERN(...)` in the script roots both.
//!
//! A linker script that does not define one of the markers fails the link with an unresolved
//! symbol. There are no weak fallbacks.

use sectkeep_common::{MARKER_COUNT, MARKERS, Marker, SectionRange, TextSection};

#[cfg(all(test, target_os = "linux"))]
mod fixture;

unsafe extern "C" {
    static __text_unlikely_start: [u8; 0];
    static __text_unlikely_end: [u8; 0];
    static __text_exit_start: [u8; 0];
    static __text_exit_end: [u8; 0];
    static __text_startup_start: [u8; 0];
    static __text_startup_end: [u8; 0];
    static __text_hot_start: [u8; 0];
    static __text_hot_end: [u8; 0];
    static __text_sorted_start: [u8; 0];
    static __text_sorted_end: [u8; 0];
    static __text_normal_start: [u8; 0];
    static __text_normal_end: [u8; 0];
    static __text_warning_start: [u8; 0];
    static __text_warning_end: [u8; 0];
}

/// Address of a boundary marker. Never dereferenced.
#[derive(Debug, Copy, Clone)]
#[repr(transparent)]
pub struct MarkerAddress(*const [u8; 0]);

// SAFETY: the pointer is only ever turned into an address; nothing reads through it.
unsafe impl Sync for MarkerAddress {}

impl MarkerAddress {
    pub fn addr(self) -> usize {
        self.0.addr()
    }
}

/// Every marker address, in [`MARKERS`] order.
#[used]
#[unsafe(export_name = "__sectkeep_text_markers")]
pub static TEXT_MARKERS: [MarkerAddress; MARKER_COUNT] = [
    MarkerAddress(&raw const __text_unlikely_start),
    MarkerAddress(&raw const __text_unlikely_end),
    MarkerAddress(&raw const __text_exit_start),
    MarkerAddress(&raw const __text_exit_end),
    MarkerAddress(&raw const __text_startup_start),
    MarkerAddress(&raw const __text_startup_end),
    MarkerAddress(&raw const __text_hot_start),
    MarkerAddress(&raw const __text_hot_end),
    MarkerAddress(&raw const __text_sorted_start),
    MarkerAddress(&raw const __text_sorted_end),
    MarkerAddress(&raw const __text_normal_start),
    MarkerAddress(&raw const __text_normal_end),
    MarkerAddress(&raw const __text_warning_start),
    MarkerAddress(&raw const __text_warning_end),
];

/// Wrapping sum of every marker address. The value means nothing; callers must not rely on it.
#[unsafe(export_name = "__sectkeep_use_text_markers")]
#[inline(never)]
pub extern "C" fn use_text_markers() -> usize {
    core::hint::black_box(&TEXT_MARKERS)
        .iter()
        .fold(0usize, |acc, marker| acc.wrapping_add(marker.addr()))
}

pub fn marker_address(marker: Marker) -> usize {
    TEXT_MARKERS[marker.index()].addr()
}

pub fn marker_addresses() -> impl Iterator<Item = (Marker, usize)> {
    MARKERS
        .into_iter()
        .zip(TEXT_MARKERS.iter().map(|m| m.addr()))
}

/// Laid-out range of `section`, as the linker placed its markers. May be inverted if the
/// linker script is wrong.
pub fn section_range(section: TextSection) -> SectionRange {
    SectionRange::new(
        section,
        marker_address(Marker::start(section)) as u64,
        marker_address(Marker::end(section)) as u64,
    )
}

pub fn section_ranges() -> [SectionRange; TextSection::ALL.len()] {
    TextSection::ALL.map(section_range)
}
