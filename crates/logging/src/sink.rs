use std::fmt;
use std::io::{self, Write};

/// Program name prefixed to every diagnostic.
pub const PROGRAM_NAME: &str = "streampress";

/// A user-facing error line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    text: String,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PROGRAM_NAME}: {}", self.text)
    }
}

/// Streaming sink that renders [`Diagnostic`] values into an [`io::Write`] target.
///
/// # Examples
///
/// ```
/// use logging::{Diagnostic, DiagnosticSink};
///
/// let mut output = Vec::new();
/// let mut sink = DiagnosticSink::new(&mut output);
/// sink.write(&Diagnostic::error("input.txt: No such file or directory"))?;
/// sink.write(&Diagnostic::error("output.gz already exists"))?;
///
/// assert_eq!(
///     String::from_utf8(output).unwrap(),
///     "streampress: input.txt: No such file or directory\nstreampress: output.gz already exists\n"
/// );
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct DiagnosticSink<W> {
    writer: W,
}

impl<W: Write> DiagnosticSink<W> {
    /// Creates a sink that terminates every diagnostic with a newline.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Renders `diagnostic` on its own line and flushes the writer.
    pub fn write(&mut self, diagnostic: &Diagnostic) -> io::Result<()> {
        writeln!(self.writer, "{diagnostic}")?;
        self.writer.flush()
    }

    /// Mutable access to the writer, for output that is not a diagnostic.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}
