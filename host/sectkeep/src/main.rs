mod config;
mod mapfile;
mod report;
#[cfg(test)]
mod testelf;
mod verify;

use crate::config::VerifyConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use eyre::{Result, WrapErr};
use sectkeep_common::TextSection;
use sectkeep_common::script::{self, ScriptOptions};
use std::path::PathBuf;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Task,
}

#[derive(Debug, Clone, Subcommand)]
#[command(about)]
enum Task {
    /// Print the linker script statement that defines the boundary markers
    Script(ScriptTask),
    /// Check a linked ELF file for every boundary marker and the retention root
    Verify(VerifyTask),
    /// Recover the subsection ranges from a GNU ld map file
    Map(MapTask),
}
impl Task {
    /// Returns whether the task found nothing wrong.
    fn run(self) -> Result<bool> {
        match self {
            Task::Script(script_task) => {
                script_task.run()?;
                Ok(true)
            }
            Task::Verify(verify_task) => verify_task.run(),
            Task::Map(map_task) => {
                map_task.run()?;
                Ok(true)
            }
        }
    }
}

#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Toml,
}

#[derive(Debug, Clone, Args)]
struct ScriptTask {
    /// Write the script here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Output section the rules are placed in
    #[arg(long, default_value = ".text")]
    section: String,
    /// Do not emit EXTERN(...) for the retention roots
    #[arg(long)]
    no_extern: bool,
    /// Wrap every input rule in KEEP(...)
    #[arg(long)]
    keep: bool,
    /// Output section of ld's default script to insert after. The result is passed to the
    /// link as a plain input file, not with -T
    #[arg(
        long,
        value_name = "SECTION",
        default_value = script::DEFAULT_INSERT_AFTER
    )]
    insert_after: String,
    /// Leave out INSERT and print a fragment to splice into a complete -T script
    #[arg(long, conflicts_with = "insert_after")]
    fragment: bool,
}

impl ScriptTask {
    fn options(&self) -> ScriptOptions<'_> {
        ScriptOptions {
            output_section: &self.section,
            extern_roots: !self.no_extern,
            keep_inputs: self.keep,
            insert_after: (!self.fragment).then_some(self.insert_after.as_str()),
        }
    }

    fn run(self) -> Result<()> {
        let rendered = script::render(&self.options());
        match &self.output {
            Some(path) => {
                std::fs::write(path, rendered)
                    .wrap_err_with(|| format!("failed to write {}", path.display()))?;
                tracing::info!(
                    "wrote linker script to {}",
                    console::style(path.display()).green()
                );
            }
            None => print!("{rendered}"),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
struct VerifyTask {
    /// Linked ELF file to check
    #[arg(required = true)]
    elf: PathBuf,
    /// TOML file with verification settings; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output section every marker must lie in
    #[arg(long)]
    section: Option<String>,
    /// Do not require the retention root symbols
    #[arg(long)]
    no_root: bool,
    /// Require subsections to follow each other without overlap
    #[arg(long)]
    strict_order: bool,
    /// Subsections that must not be empty
    #[arg(long, value_delimiter = ',')]
    require_nonempty: Vec<TextSection>,
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

impl VerifyTask {
    fn settings(&self) -> Result<VerifyConfig> {
        let mut settings = match &self.config {
            Some(path) => VerifyConfig::load(path)?,
            None => VerifyConfig::default(),
        };
        if let Some(section) = &self.section {
            settings.section = section.clone();
        }
        if self.no_root {
            settings.require_root = false;
        }
        if self.strict_order {
            settings.strict_order = true;
        }
        for section in &self.require_nonempty {
            if !settings.require_nonempty.contains(section) {
                settings.require_nonempty.push(*section);
            }
        }
        Ok(settings)
    }

    fn run(self) -> Result<bool> {
        let settings = self.settings()?;
        tracing::debug!("verify settings: {settings:?}");
        let verification = verify::verify_file(&self.elf, &settings)?;
        report::print_verification(&self.elf, &verification, self.format)?;
        if verification.passed() {
            tracing::info!(
                "{}: all boundary markers resolved",
                console::style(self.elf.display()).green()
            );
        } else {
            tracing::error!(
                "{}: {} problem(s) with boundary markers",
                console::style(self.elf.display()).red(),
                verification.findings.len()
            );
        }
        Ok(verification.passed())
    }
}

#[derive(Debug, Clone, Args)]
struct MapTask {
    /// Map file written by `ld -Map`
    #[arg(required = true)]
    map: PathBuf,
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

impl MapTask {
    fn run(self) -> Result<()> {
        let layout = mapfile::parse_file(&self.map)?;
        report::print_map_layout(&self.map, &layout, self.format)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();

    if !cli.command.run()? {
        std::process::exit(1);
    }
    Ok(())
}
