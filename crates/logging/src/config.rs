//! Verbosity configuration derived from `-v` and `-q` flags.

/// Environment variable whose value replaces the verbosity-derived filter.
pub const LOG_ENV_VAR: &str = "STREAMPRESS_LOG";

/// Named verbosity levels, from silent to most detailed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Verbosity {
    /// Only errors (`--quiet`).
    Quiet,
    /// Warnings and errors.
    #[default]
    Normal,
    /// Per-file progress from the workspace (`-v`).
    Verbose,
    /// Transform and codec lifecycle events (`-vv`).
    Debug,
    /// Every chunk and session event (`-vvv` and above).
    Trace,
}

impl Verbosity {
    /// Maps a count of `-v` flags to a level; counts above three saturate.
    #[must_use]
    pub const fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Lowercase name of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Normal => "normal",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Verbosity settings for one process.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerbosityConfig {
    /// Selected level.
    pub level: Verbosity,
    /// Whether per-file summaries are printed on stdout.
    pub summaries: bool,
}

impl Default for VerbosityConfig {
    fn default() -> Self {
        Self::from_verbose_level(0)
    }
}

impl VerbosityConfig {
    /// Configuration for `count` occurrences of `-v`.
    pub const fn from_verbose_level(count: u8) -> Self {
        Self {
            level: Verbosity::from_count(count),
            summaries: true,
        }
    }

    /// Configuration for `--quiet`; overrides any `-v` flags.
    pub const fn quiet() -> Self {
        Self {
            level: Verbosity::Quiet,
            summaries: false,
        }
    }

    /// Builds the configuration from parsed command-line counts.
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            Self::quiet()
        } else {
            Self::from_verbose_level(verbose)
        }
    }

    /// `EnvFilter`-style directive string for this configuration.
    ///
    /// Third-party crates stay at `warn` unless tracing everything.
    pub const fn directive(&self) -> &'static str {
        match self.level {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "warn,streampress=info",
            Verbosity::Debug => "warn,streampress=debug",
            Verbosity::Trace => "info,streampress=trace",
        }
    }
}
