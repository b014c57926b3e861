//! Renders the `.text` output-section statement that defines every boundary marker.
//!
//! The rules are the ones GNU ld's default script uses for `.text`, in the same order, so the
//! statement takes over the default one without moving any code.
//!
//! By default the script ends in `INSERT AFTER .init;`. GNU ld then reads it as an augmentation
//! of its built-in script: pass it to the link as a plain input file (`-Wl,text-sections.ld`),
//! not with `-T`. Without `INSERT` the statement is a fragment to splice into a complete `-T`
//! script; on its own it would replace the whole default script.

use crate::{RETENTION_ROOTS, TextSection};
use alloc::string::String;
use core::fmt::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOptions<'a> {
    /// Name of the output section the rules are placed in.
    pub output_section: &'a str,
    /// Emit `EXTERN(...)` for the retention roots, so they survive `--gc-sections` even when
    /// nothing else references them.
    pub extern_roots: bool,
    /// Wrap each input rule in `KEEP(...)`.
    pub keep_inputs: bool,
    /// Append `INSERT AFTER <section>;` to augment the default script instead of replacing it.
    /// `None` renders a fragment for a hand-written `-T` script.
    pub insert_after: Option<&'a str>,
}

impl Default for ScriptOptions<'_> {
    fn default() -> Self {
        Self {
            output_section: ".text",
            extern_roots: true,
            keep_inputs: false,
            insert_after: Some(DEFAULT_INSERT_AFTER),
        }
    }
}

/// Output section of the default script the statement is inserted after.
pub const DEFAULT_INSERT_AFTER: &str = ".init";

pub fn write_script<W: Write>(out: &mut W, options: &ScriptOptions) -> fmt::Result {
    writeln!(
        out,
        "/* .text subsection boundary markers, generated by sectkeep */"
    )?;
    match options.insert_after {
        Some(_) => writeln!(
            out,
            "/* augments the default script: pass as a linker input file, not with -T */"
        )?,
        None => writeln!(
            out,
            "/* fragment: splice into a complete -T script, it cannot be used alone */"
        )?,
    }
    if options.extern_roots {
        writeln!(out, "EXTERN({} {})", RETENTION_ROOTS[0], RETENTION_ROOTS[1])?;
    }
    writeln!(out)?;
    writeln!(out, "SECTIONS")?;
    writeln!(out, "{{")?;
    writeln!(out, "  {} :", options.output_section)?;
    writeln!(out, "  {{")?;
    for section in TextSection::ALL {
        writeln!(out, "    {} = .;", section.start_symbol())?;
        write!(out, "    ")?;
        if options.keep_inputs {
            write!(out, "KEEP(")?;
        }
        write!(out, "*(")?;
        for (i, pattern) in section.input_patterns().iter().enumerate() {
            if i != 0 {
                write!(out, " ")?;
            }
            write!(out, "{pattern}")?;
        }
        write!(out, ")")?;
        if options.keep_inputs {
            write!(out, ")")?;
        }
        writeln!(out)?;
        writeln!(out, "    {} = .;", section.end_symbol())?;
    }
    writeln!(out, "  }}")?;
    writeln!(out, "}}")?;
    if let Some(anchor) = options.insert_after {
        writeln!(out, "INSERT AFTER {anchor};")?;
    }
    Ok(())
}

pub fn render(options: &ScriptOptions) -> String {
    let mut out = String::new();
    write_script(&mut out, options).expect("writing to a String cannot fail");
    out
}
