//! Stands in for the linker script in unit tests: defines every marker inside one input section,
//! laid out contiguously with the sizes below.

/// Bytes between each start/end pair, in `TextSection::ALL` order.
pub const FIXTURE_SIZES: [u64; 7] = [16, 0, 32, 8, 0, 64, 0];

core::arch::global_asm!(
    ".pushsection .text.sectkeep_fixture,\"ax\"",
    ".balign 16",
    ".globl __text_unlikely_start",
    "__text_unlikely_start:",
    ".skip 16",
    ".globl __text_unlikely_end",
    "__text_unlikely_end:",
    ".globl __text_exit_start",
    "__text_exit_start:",
    ".globl __text_exit_end",
    "__text_exit_end:",
    ".globl __text_startup_start",
    "__text_startup_start:",
    ".skip 32",
    ".globl __text_startup_end",
    "__text_startup_end:",
    ".globl __text_hot_start",
    "__text_hot_start:",
    ".skip 8",
    ".globl __text_hot_end",
    "__text_hot_end:",
    ".globl __text_sorted_start",
    "__text_sorted_start:",
    ".globl __text_sorted_end",
    "__text_sorted_end:",
    ".globl __text_normal_start",
    "__text_normal_start:",
    ".skip 64",
    ".globl __text_normal_end",
    "__text_normal_end:",
    ".globl __text_warning_start",
    "__text_warning_start:",
    ".globl __text_warning_end",
    "__text_warning_end:",
    ".popsection",
);
