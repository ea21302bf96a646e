use compress::ErrorKind;

/// Process exit statuses reported by [`run`](crate::run).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum ExitCode {
    /// Every file was processed.
    Ok = 0,
    /// Invalid arguments or codec parameters.
    Usage = 1,
    /// A compressed stream was malformed or truncated.
    Data = 2,
    /// Reading or writing a file failed.
    Io = 3,
    /// The codec could not allocate its working memory.
    Memory = 4,
}

impl ExitCode {
    /// Numeric status for the process.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Status for a failed transform.
    ///
    /// State violations never reach here: the transformer panics on them.
    #[must_use]
    pub const fn from_error_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Init | ErrorKind::State => Self::Usage,
            ErrorKind::Data => Self::Data,
            ErrorKind::Io => Self::Io,
            ErrorKind::Memory => Self::Memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_errors_map_to_distinct_statuses() {
        assert_eq!(ExitCode::from_error_kind(ErrorKind::Init).as_i32(), 1);
        assert_eq!(ExitCode::from_error_kind(ErrorKind::Data).as_i32(), 2);
        assert_eq!(ExitCode::from_error_kind(ErrorKind::Io).as_i32(), 3);
        assert_eq!(ExitCode::from_error_kind(ErrorKind::Memory).as_i32(), 4);
    }
}
