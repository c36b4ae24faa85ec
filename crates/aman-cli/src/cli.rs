//! # CLI Structure and Argument Parsing
//!
//! `aman` takes a single keyword and shows the matching autodoc page:
//!
//! ```bash
//! # Look up a function by name
//! aman AllocMem
//!
//! # Full title, other autodoc directories, compressed caches
//! aman -M /opt/autodocs -z exec.library/AllocMem
//!
//! # Everything that refers to Open() in its SEE ALSO section
//! aman --mode see-also --list Open
//! ```
//!
//! Settings not given on the command line come from the environment
//! (`AMANPATH`, `AMANCACHE`, `MANPAGER`/`PAGER`), then the config file, then
//! the built-in defaults.

use std::env;
use std::path::PathBuf;

use aman_core::{Config, QueryMode};
use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::output::OutputFormat;

/// Query mode as given on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Full title, then the name after the library prefix
    Page,
    /// Full `library/name` title only
    BookPage,
    /// Pages listing the keyword in their SEE ALSO section
    SeeAlso,
    /// Substring search in SYNOPSIS sections
    Synopsis,
    /// Substring search in the whole page text
    FullText,
}

impl From<ModeArg> for QueryMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Page => Self::Page,
            ModeArg::BookPage => Self::BookPage,
            ModeArg::SeeAlso => Self::SeeAlso,
            ModeArg::Synopsis => Self::Synopsis,
            ModeArg::FullText => Self::FullText,
        }
    }
}

/// Read Amiga autodocs as man pages
#[derive(Parser, Clone, Debug)]
#[command(name = "aman", version, about, long_about = None)]
pub struct Cli {
    /// Keyword to search for
    #[arg(required_unless_present = "dump_config")]
    pub keyword: Option<String>,

    /// Autodoc directories, a path list like PATH (repeatable, replaces AMANPATH)
    #[arg(short = 'M', long = "man-path", value_name = "PATHS")]
    pub man_paths: Vec<PathBuf>,

    /// Directory for cache and index files
    #[arg(short, long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Config file to read instead of the default one
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Force recreation of caches and indices
    #[arg(short, long)]
    pub force: bool,

    /// Gzip cache and index files
    #[arg(short = 'z', long)]
    pub compress: bool,

    /// What the keyword is matched against
    #[arg(short, long, value_enum, default_value_t = ModeArg::Page)]
    pub mode: ModeArg,

    /// Output format
    #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the output to a file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Display program (overrides MANPAGER and PAGER)
    #[arg(short, long, value_name = "CMD", conflicts_with = "no_pager")]
    pub pager: Option<String>,

    /// Never use a display program
    #[arg(long)]
    pub no_pager: bool,

    /// Only list matching page titles
    #[arg(short, long)]
    pub list: bool,

    /// Show every matching page instead of a list
    #[arg(short, long, conflicts_with = "list")]
    pub all: bool,

    /// Write the effective configuration to a file
    #[arg(long, value_name = "FILE")]
    pub dump_config: Option<PathBuf>,

    /// Enable informational log output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug log output
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Build the effective configuration: defaults, config file,
    /// environment, then command line flags.
    pub fn resolve_config<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        config.apply_env(lookup);

        if !self.man_paths.is_empty() {
            config.man_paths = self
                .man_paths
                .iter()
                .flat_map(env::split_paths)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir.clone_from(dir);
        }
        if self.compress {
            config.compress = true;
        }
        if let Some(pager) = &self.pager {
            config.pager = Some(pager.clone());
        }
        if self.no_pager {
            config.pager = None;
        }
        Ok(config)
    }
}
