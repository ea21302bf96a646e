#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the `streampress` command-line front-end on top of the
//! [`compress`] chunked transformer. It parses arguments with `clap`, derives
//! output names from the algorithm suffix, stages every output in a temporary
//! file next to its destination, and maps transform failures to exit codes.
//!
//! # Design
//!
//! [`run`] is the single entry point. It never panics on user input: argument
//! errors, naming conflicts and codec failures all become `streampress: ...`
//! diagnostics on the supplied stderr handle and a non-zero [`ExitCode`].
//! Files are processed in order; a failure on one file does not stop the
//! next, and the first failure decides the exit status.
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = cli::run(["streampress", "--version"], &mut stdout, &mut stderr);
//! assert_eq!(status, 0);
//! assert!(String::from_utf8(stdout).unwrap().starts_with("streampress "));
//! ```

use std::ffi::OsString;
use std::io::Write;

use compress::CompressionAlgorithm;
use logging::{Diagnostic, DiagnosticSink, VerbosityConfig};
use tracing::debug;

mod arguments;
mod execute;
mod exit_code;
mod paths;

pub use exit_code::ExitCode;

use arguments::{PROGRAM_NAME, ParsedArgs, parse_args, render_help};
use execute::{Options, process_file};

/// Renders the version banner.
fn render_version() -> String {
    let algorithms: Vec<&str> = CompressionAlgorithm::available()
        .iter()
        .map(|algorithm| algorithm.name())
        .collect();
    format!(
        "{PROGRAM_NAME} {}\nalgorithms: {}\n",
        env!("CARGO_PKG_VERSION"),
        algorithms.join(", ")
    )
}

/// Writes `diagnostic`, falling back to a bare line when the sink fails.
fn report<W: Write>(sink: &mut DiagnosticSink<W>, diagnostic: &Diagnostic) {
    if sink.write(diagnostic).is_err() {
        let _ = writeln!(sink.get_mut(), "{diagnostic}");
    }
}

/// Runs the CLI using the provided argument iterator and output handles.
///
/// The function returns the process exit code that should be used by the
/// caller; see [`ExitCode`] for the meaning of each value.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let mut stderr_sink = DiagnosticSink::new(stderr);
    let status = match parse_args(arguments) {
        Ok(parsed) => execute(parsed, stdout, &mut stderr_sink),
        Err(error) => {
            let rendered = error.to_string();
            report(&mut stderr_sink, &Diagnostic::error(rendered.trim_end()));
            ExitCode::Usage
        }
    };
    status.as_i32()
}

fn execute<Out, Err>(
    parsed: ParsedArgs,
    stdout: &mut Out,
    stderr: &mut DiagnosticSink<Err>,
) -> ExitCode
where
    Out: Write,
    Err: Write,
{
    if parsed.show_help {
        if stdout.write_all(render_help().as_bytes()).is_err() {
            return ExitCode::Io;
        }
        return ExitCode::Ok;
    }

    if parsed.show_version {
        if stdout.write_all(render_version().as_bytes()).is_err() {
            return ExitCode::Io;
        }
        return ExitCode::Ok;
    }

    let verbosity = VerbosityConfig::from_flags(parsed.verbose, parsed.quiet);
    if let Err(error) = logging::init_tracing(verbosity) {
        // Embedders and repeated runs in one process keep the first subscriber.
        debug!(target: "streampress::cli", %error, "tracing already initialised");
    }

    let options = match Options::from_parsed(&parsed) {
        Ok(options) => options,
        Err(message) => {
            report(stderr, &Diagnostic::error(message));
            return ExitCode::Usage;
        }
    };

    if parsed.files.is_empty() {
        report(stderr, &Diagnostic::error("no input files (see --help)"));
        return ExitCode::Usage;
    }
    if options.output.is_some() && parsed.files.len() > 1 {
        report(stderr, &Diagnostic::error("--output requires exactly one FILE"));
        return ExitCode::Usage;
    }

    let mut status = ExitCode::Ok;
    for input in &parsed.files {
        match process_file(input, &options) {
            Ok(summary) => {
                if verbosity.summaries && writeln!(stdout, "{summary}").is_err() {
                    return ExitCode::Io;
                }
            }
            Err(error) => {
                report(
                    stderr,
                    &Diagnostic::error(format!("{}: {error}", input.display())),
                );
                if status == ExitCode::Ok {
                    status = error.exit_code();
                }
            }
        }
    }
    status
}
