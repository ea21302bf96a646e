//! Per-file processing: naming, scoped file handles and atomic output.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use compress::{
    BrotliParams, ChunkedTransformer, CodecError, CompressionAlgorithm, CompressionLevel,
    DeflateParams, Direction, TransformConfig, TransformStats, ZstdParams,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::arguments::ParsedArgs;
use crate::exit_code::ExitCode;
use crate::paths::{NamingError, compressed_name, decompressed_name};

const TARGET: &str = "streampress::cli";

/// Settings shared by every file of one invocation.
#[derive(Clone, Debug)]
pub(crate) struct Options {
    pub direction: Direction,
    pub algorithm: Option<CompressionAlgorithm>,
    pub config: TransformConfig,
    pub output: Option<PathBuf>,
    pub force: bool,
}

impl Options {
    /// Validates the parsed flags that do not depend on a particular file.
    pub(crate) fn from_parsed(parsed: &ParsedArgs) -> Result<Self, String> {
        let algorithm = parsed
            .algorithm
            .as_deref()
            .map(str::parse::<CompressionAlgorithm>)
            .transpose()
            .map_err(|error| error.to_string())?;

        let mut config = TransformConfig::new(algorithm.unwrap_or_default());

        if let Some(level) = parsed.level {
            let level = CompressionLevel::from_numeric(level).map_err(|error| error.to_string())?;
            config = config.with_level(level);
        }

        if let Some(chunk_size) = parsed.chunk_size {
            config = config.with_chunk_size(chunk_size);
            if !config.chunk_size_is_valid() {
                return Err(format!(
                    "chunk size {chunk_size} is outside {}..={}",
                    compress::MIN_CHUNK_SIZE,
                    compress::MAX_CHUNK_SIZE
                ));
            }
        }

        if let Some(window_bits) = parsed.window_bits {
            config = config.with_deflate(DeflateParams {
                window_bits,
                ..*config.deflate()
            });
        }

        let direction = if parsed.decompress {
            Direction::Decode
        } else {
            Direction::Encode
        };

        // A decoder has no window of its own; the flag caps what it accepts.
        if let Some(window_log) = parsed.window_log {
            let zstd = match direction {
                Direction::Encode => ZstdParams {
                    window_log,
                    ..*config.zstd()
                },
                Direction::Decode => ZstdParams {
                    window_log_max: window_log,
                    ..*config.zstd()
                },
            };
            config = config.with_zstd(zstd);
        }

        if parsed.quality.is_some() || parsed.lgwin.is_some() {
            let brotli = config.brotli();
            config = config.with_brotli(BrotliParams {
                lgwin: parsed.lgwin.unwrap_or(brotli.lgwin),
                quality: parsed.quality.or(brotli.quality),
            });
        }

        Ok(Self {
            direction,
            algorithm,
            config,
            output: parsed.output.clone(),
            force: parsed.force,
        })
    }
}

/// Failure while processing one file.
#[derive(Debug, Error)]
pub(crate) enum FileError {
    #[error("{0}")]
    Usage(String),
    #[error("cannot {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl FileError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Exit status this failure maps to.
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Usage(_) => ExitCode::Usage,
            Self::Io { .. } => ExitCode::Io,
            Self::Codec(error) => ExitCode::from_error_kind(error.kind()),
        }
    }
}

/// Result of one successful file transform.
#[derive(Debug)]
pub(crate) struct Summary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stats: TransformStats,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {} -> {} bytes, ratio {:.2}",
            self.input.display(),
            self.output.display(),
            self.stats.bytes_read,
            self.stats.bytes_written,
            self.stats.ratio()
        )
    }
}

fn plan(input: &Path, options: &Options) -> Result<(CompressionAlgorithm, PathBuf), FileError> {
    match options.direction {
        Direction::Encode => {
            let algorithm = options.algorithm.unwrap_or_default();
            if options.output.is_none() && CompressionAlgorithm::from_path(input).is_some() {
                return Err(FileError::Usage(
                    "already has a compressed suffix; use --output to compress it again".into(),
                ));
            }
            let output = options
                .output
                .clone()
                .unwrap_or_else(|| compressed_name(input, algorithm));
            Ok((algorithm, output))
        }
        Direction::Decode => {
            decompressed_name(input, options.algorithm, options.output.as_deref()).map_err(
                |error| match error {
                    NamingError::UnknownSuffix => FileError::Usage(
                        "unknown suffix; give --algorithm and --output to decompress it".into(),
                    ),
                    NamingError::SuffixMismatch(found) => FileError::Usage(format!(
                        "suffix belongs to {found}, not the selected algorithm"
                    )),
                },
            )
        }
    }
}

/// Transforms `input` into its output file.
///
/// Output goes to a temporary file next to the destination, which is only
/// renamed into place once the transform succeeded.
pub(crate) fn process_file(input: &Path, options: &Options) -> Result<Summary, FileError> {
    let (algorithm, output) = plan(input, options)?;

    if output == input {
        return Err(FileError::Usage("input and output are the same file".into()));
    }
    if !options.force && output.exists() {
        return Err(FileError::Usage(format!(
            "{} already exists; use --force to overwrite",
            output.display()
        )));
    }

    let mut source = File::open(input).map_err(|error| FileError::io("open", input, error))?;
    let metadata = source
        .metadata()
        .map_err(|error| FileError::io("stat", input, error))?;
    if !metadata.is_file() {
        return Err(FileError::Usage("not a regular file".into()));
    }

    let directory = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".streampress-")
        .suffix(".tmp")
        .tempfile_in(directory)
        .map_err(|error| FileError::io("create a temporary file in", directory, error))?;

    let config = options.config.with_algorithm(algorithm);
    debug!(
        target: TARGET,
        input = %input.display(),
        output = %output.display(),
        staged = %staged.path().display(),
        algorithm = algorithm.name(),
        direction = options.direction.as_str(),
        "processing file"
    );

    let stats = ChunkedTransformer::new(config).run(
        options.direction,
        &mut source,
        staged.as_file_mut(),
    )?;

    let persisted = if options.force {
        staged.persist(&output)
    } else {
        staged.persist_noclobber(&output)
    };
    persisted.map_err(|error| FileError::io("write", &output, error.error))?;

    info!(
        target: TARGET,
        input = %input.display(),
        output = %output.display(),
        bytes_read = stats.bytes_read,
        bytes_written = stats.bytes_written,
        "file processed"
    );

    Ok(Summary {
        input: input.to_path_buf(),
        output,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(parsed: &ParsedArgs) -> Options {
        Options::from_parsed(parsed).unwrap()
    }

    #[test]
    fn defaults_compress_with_gzip() {
        let options = options(&ParsedArgs::default());
        assert_eq!(options.direction, Direction::Encode);
        assert_eq!(options.algorithm, None);
        assert_eq!(options.config.algorithm(), CompressionAlgorithm::Gzip);
    }

    #[test]
    fn invalid_flags_are_usage_errors() {
        let bad_algorithm = ParsedArgs {
            algorithm: Some("lzma".into()),
            ..ParsedArgs::default()
        };
        assert!(Options::from_parsed(&bad_algorithm).unwrap_err().contains("lzma"));

        let bad_level = ParsedArgs {
            level: Some(11),
            ..ParsedArgs::default()
        };
        assert!(Options::from_parsed(&bad_level).is_err());

        let bad_chunk = ParsedArgs {
            chunk_size: Some(0),
            ..ParsedArgs::default()
        };
        assert!(Options::from_parsed(&bad_chunk).unwrap_err().contains("chunk size"));
    }

    #[test]
    fn window_flags_reach_the_config() {
        let parsed = ParsedArgs {
            window_bits: Some(11),
            window_log: Some(16),
            ..ParsedArgs::default()
        };
        let options = options(&parsed);
        assert_eq!(options.config.deflate().window_bits, 11);
        assert_eq!(options.config.zstd().window_log, 16);
        assert_eq!(
            options.config.zstd().window_log_max,
            ZstdParams::default().window_log_max
        );
    }

    #[test]
    fn window_log_caps_the_decoder_when_decompressing() {
        let parsed = ParsedArgs {
            decompress: true,
            window_log: Some(20),
            ..ParsedArgs::default()
        };
        let options = options(&parsed);
        assert_eq!(options.config.zstd().window_log_max, 20);
        assert_eq!(options.config.zstd().window_log, ZstdParams::default().window_log);
    }

    #[test]
    fn brotli_flags_reach_the_config() {
        let parsed = ParsedArgs {
            quality: Some(3),
            ..ParsedArgs::default()
        };
        let brotli = *options(&parsed).config.brotli();
        assert_eq!(brotli.quality, Some(3));
        assert_eq!(brotli.lgwin, BrotliParams::default().lgwin);

        let parsed = ParsedArgs {
            lgwin: Some(18),
            ..ParsedArgs::default()
        };
        let brotli = *options(&parsed).config.brotli();
        assert_eq!(brotli.quality, None);
        assert_eq!(brotli.lgwin, 18);
    }

    #[test]
    fn compressing_twice_is_refused() {
        let options = options(&ParsedArgs::default());
        let err = process_file(Path::new("archive.tar.gz"), &options).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::Usage);
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(&ParsedArgs::default());
        let err = process_file(&dir.path().join("absent.txt"), &options).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::Io);
        assert!(err.to_string().starts_with("cannot open"));
    }

    #[test]
    fn round_trip_through_files() {
        let payload = test_support::patterned(50_000);
        let (dir, input) = test_support::scratch_file("notes.txt", &payload).unwrap();

        let summary = process_file(&input, &options(&ParsedArgs::default())).unwrap();
        assert_eq!(summary.output, dir.path().join("notes.txt.gz"));
        assert_eq!(summary.stats.bytes_read, 50_000);
        assert!(summary.to_string().contains("50000 ->"));

        std::fs::remove_file(&input).unwrap();
        let decompress = ParsedArgs {
            decompress: true,
            ..ParsedArgs::default()
        };
        let summary = process_file(&summary.output, &options(&decompress)).unwrap();
        assert_eq!(summary.output, input);
        assert_eq!(std::fs::read(&input).unwrap(), payload);
    }

    #[test]
    fn existing_output_needs_force() {
        let (dir, input) = test_support::scratch_file("data.bin", b"contents").unwrap();
        let existing = dir.path().join("data.bin.gz");
        std::fs::write(&existing, b"keep me").unwrap();

        let err = process_file(&input, &options(&ParsedArgs::default())).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::Usage);
        assert_eq!(std::fs::read(&existing).unwrap(), b"keep me");

        let forced = ParsedArgs {
            force: true,
            ..ParsedArgs::default()
        };
        process_file(&input, &options(&forced)).unwrap();
        assert_ne!(std::fs::read(&existing).unwrap(), b"keep me");
    }

    #[test]
    fn corrupt_input_leaves_no_output() {
        let (dir, input) = test_support::scratch_file("broken.gz", b"definitely not gzip").unwrap();
        let decompress = ParsedArgs {
            decompress: true,
            ..ParsedArgs::default()
        };
        let err = process_file(&input, &options(&decompress)).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::Data);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("broken.gz")]);
    }
}
