//! Output naming for compressed and decompressed files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use compress::CompressionAlgorithm;

/// Appends the algorithm's suffix: `notes.txt` becomes `notes.txt.gz`.
pub(crate) fn compressed_name(input: &Path, algorithm: CompressionAlgorithm) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(algorithm.suffix());
    PathBuf::from(name)
}

/// Why no output name could be derived for a decompression input.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum NamingError {
    /// The input carries no recognised suffix.
    UnknownSuffix,
    /// The input carries a suffix other than the selected algorithm's.
    SuffixMismatch(CompressionAlgorithm),
}

/// Picks the algorithm and output path for decompressing `input`.
///
/// An explicit `algorithm` wins over suffix detection; inputs without a known
/// suffix need one. Without `output` the input must end in the suffix of the
/// chosen algorithm, which is stripped.
pub(crate) fn decompressed_name(
    input: &Path,
    algorithm: Option<CompressionAlgorithm>,
    output: Option<&Path>,
) -> Result<(CompressionAlgorithm, PathBuf), NamingError> {
    let detected = CompressionAlgorithm::from_path(input);
    let algorithm = match (algorithm, detected) {
        (Some(chosen), _) => chosen,
        (None, Some(found)) => found,
        (None, None) => return Err(NamingError::UnknownSuffix),
    };

    if let Some(output) = output {
        return Ok((algorithm, output.to_path_buf()));
    }

    match algorithm.strip_suffix(input) {
        Some(stripped) => Ok((algorithm, stripped)),
        None => match detected {
            Some(other) => Err(NamingError::SuffixMismatch(other)),
            None => Err(NamingError::UnknownSuffix),
        },
    }
}
