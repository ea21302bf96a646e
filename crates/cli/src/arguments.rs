use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::OsStringValueParser;
use clap::{Arg, ArgAction, Command, value_parser};

/// Program name used when `argv` is empty.
pub(crate) const PROGRAM_NAME: &str = "streampress";

const HELP_TEXT: &str = "\
streampress compresses and decompresses files in fixed-size chunks.

Usage: streampress [OPTIONS] FILE...

Compression writes FILE plus the algorithm suffix (.gz, .zz, .zst, .br).
Decompression writes FILE without its suffix.

Options:
  -d, --decompress        Decompress instead of compress.
  -a, --algorithm ALGO    Stream format: gzip (default), zlib, zstd, brotli.
  -l, --level LEVEL       Compression level 1-9.
      --chunk-size N      Size in bytes of each I/O buffer.
      --window-bits N     DEFLATE window size in bits (9-15).
      --window-log N      Zstandard window size as a power of two (10-27).
                          When decompressing, the largest window accepted
                          (default 27).
      --quality N         Brotli quality 0-9; overrides --level.
      --lgwin N           Brotli window size as a power of two (10-24).
  -o, --output PATH       Write to PATH (single FILE only).
  -f, --force             Overwrite existing output files.
  -v, --verbose           Log more detail to stderr; repeat for more.
  -q, --quiet             Only report errors; no summary lines.
  -h, --help              Show this help message and exit.
  -V, --version           Output version information and exit.

Set STREAMPRESS_LOG to a tracing filter directive to override -v/-q.

Exit status: 0 success, 1 usage, 2 corrupt data, 3 I/O error, 4 out of memory.
";

/// Renders the help text describing the supported options.
pub(crate) fn render_help() -> &'static str {
    HELP_TEXT
}

/// Parsed command-line arguments.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct ParsedArgs {
    pub show_help: bool,
    pub show_version: bool,
    pub decompress: bool,
    pub algorithm: Option<String>,
    pub level: Option<u32>,
    pub chunk_size: Option<usize>,
    pub window_bits: Option<u8>,
    pub window_log: Option<u32>,
    pub quality: Option<u32>,
    pub lgwin: Option<u32>,
    pub output: Option<PathBuf>,
    pub force: bool,
    pub verbose: u8,
    pub quiet: bool,
    pub files: Vec<PathBuf>,
}

/// Builds the `clap` command used for parsing.
fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg_required_else_help(false)
        .arg(
            Arg::new("help")
                .long("help")
                .short('h')
                .help("Show this help message and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .help("Output version information and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("decompress")
                .long("decompress")
                .short('d')
                .help("Decompress instead of compress.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("algorithm")
                .long("algorithm")
                .short('a')
                .value_name("ALGO")
                .help("Stream format: gzip, zlib, zstd or brotli.")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("level")
                .long("level")
                .short('l')
                .value_name("LEVEL")
                .help("Compression level 1-9.")
                .value_parser(value_parser!(u32))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .value_name("N")
                .help("Size in bytes of each I/O buffer.")
                .value_parser(value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("window-bits")
                .long("window-bits")
                .value_name("N")
                .help("DEFLATE window size in bits.")
                .value_parser(value_parser!(u8))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("window-log")
                .long("window-log")
                .value_name("N")
                .help("Zstandard window size as a power of two.")
                .value_parser(value_parser!(u32))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("quality")
                .long("quality")
                .value_name("N")
                .help("Brotli quality 0-9.")
                .value_parser(value_parser!(u32))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("lgwin")
                .long("lgwin")
                .value_name("N")
                .help("Brotli window size as a power of two.")
                .value_parser(value_parser!(u32))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("PATH")
                .help("Write to PATH instead of the derived name.")
                .value_parser(OsStringValueParser::new())
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .short('f')
                .help("Overwrite existing output files.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more detail to stderr.")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only report errors.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .value_parser(OsStringValueParser::new())
                .action(ArgAction::Append),
        )
}

/// Parses command-line arguments into a [`ParsedArgs`] structure.
pub(crate) fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();

    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let mut matches = clap_command().try_get_matches_from(args)?;

    let files = matches
        .remove_many::<OsString>("files")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default();

    Ok(ParsedArgs {
        show_help: matches.get_flag("help"),
        show_version: matches.get_flag("version"),
        decompress: matches.get_flag("decompress"),
        algorithm: matches.remove_one::<String>("algorithm"),
        level: matches.remove_one::<u32>("level"),
        chunk_size: matches.remove_one::<usize>("chunk-size"),
        window_bits: matches.remove_one::<u8>("window-bits"),
        window_log: matches.remove_one::<u32>("window-log"),
        quality: matches.remove_one::<u32>("quality"),
        lgwin: matches.remove_one::<u32>("lgwin"),
        output: matches.remove_one::<OsString>("output").map(PathBuf::from),
        force: matches.get_flag("force"),
        verbose: matches.get_count("verbose"),
        quiet: matches.get_flag("quiet"),
        files,
    })
}
