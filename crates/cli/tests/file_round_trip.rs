//! End-to-end behaviour of `cli::run` against real files.

use std::fs;
use std::path::Path;

use tempfile::tempdir;
use test_support::{patterned, pseudo_random};

fn run(args: &[&str]) -> (i32, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let status = cli::run(
        std::iter::once("streampress").chain(args.iter().copied()),
        &mut stdout,
        &mut stderr,
    );
    (
        status,
        String::from_utf8(stdout).unwrap(),
        String::from_utf8(stderr).unwrap(),
    )
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// =============================================================================
// SECTION 1: Round Trips
// =============================================================================

#[test]
fn every_algorithm_round_trips_through_files() {
    let mut algorithms = vec![("gzip", ".gz"), ("zlib", ".zz")];
    if cfg!(feature = "zstd") {
        algorithms.push(("zstd", ".zst"));
    }
    if cfg!(feature = "brotli") {
        algorithms.push(("brotli", ".br"));
    }

    for (name, suffix) in algorithms {
        let dir = tempdir().unwrap();
        let input = dir.path().join("payload.bin");
        let mut data = patterned(200_000);
        data.extend(pseudo_random(10_000, 1));
        fs::write(&input, &data).unwrap();

        let (status, stdout, stderr) = run(&["-a", name, "--chunk-size", "4096", path_str(&input)]);
        assert_eq!(status, 0, "{name}: {stderr}");
        assert!(stdout.contains("210000 ->"), "{stdout}");

        let compressed = dir.path().join(format!("payload.bin{suffix}"));
        assert!(compressed.is_file());
        assert!(fs::metadata(&compressed).unwrap().len() < 210_000);

        fs::remove_file(&input).unwrap();
        let (status, _, stderr) = run(&["-d", "-q", path_str(&compressed)]);
        assert_eq!(status, 0, "{name}: {stderr}");
        assert_eq!(fs::read(&input).unwrap(), data, "{name}");
    }
}

#[cfg(feature = "zstd")]
#[test]
fn wide_zstd_window_decodes_with_default_flags() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("wide.bin");
    let mut data = pseudo_random(64 * 1024, 4);
    data.extend(patterned(300_000));
    fs::write(&input, &data).unwrap();

    let (status, _, stderr) = run(&["-q", "-a", "zstd", "--window-log", "24", path_str(&input)]);
    assert_eq!(status, 0, "{stderr}");
    fs::remove_file(&input).unwrap();

    let compressed = dir.path().join("wide.bin.zst");
    let (status, _, stderr) = run(&["-d", "-q", path_str(&compressed)]);
    assert_eq!(status, 0, "{stderr}");
    assert_eq!(fs::read(&input).unwrap(), data);

    fs::remove_file(&input).unwrap();
    let (status, _, stderr) = run(&["-d", "--window-log", "20", path_str(&compressed)]);
    assert_eq!(status, 2, "{stderr}");
    assert!(!input.exists());
}

#[cfg(feature = "brotli")]
#[test]
fn brotli_quality_and_window_flags_apply() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.html");
    let data = patterned(120_000);
    fs::write(&input, &data).unwrap();

    let (status, _, stderr) = run(&["-q", "-a", "br", "--quality", "10", path_str(&input)]);
    assert_eq!(status, 1, "{stderr}");
    assert!(stderr.contains("quality 10"), "{stderr}");

    let (status, _, stderr) = run(&[
        "-q",
        "-a",
        "brotli",
        "--quality",
        "1",
        "--lgwin",
        "16",
        path_str(&input),
    ]);
    assert_eq!(status, 0, "{stderr}");
    fs::remove_file(&input).unwrap();

    let (status, _, stderr) = run(&["-d", "-q", path_str(&dir.path().join("page.html.br"))]);
    assert_eq!(status, 0, "{stderr}");
    assert_eq!(fs::read(&input).unwrap(), data);
}

#[test]
fn quiet_suppresses_summaries() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("quiet.txt");
    fs::write(&input, b"quiet please").unwrap();
    let (status, stdout, stderr) = run(&["-q", path_str(&input)]);
    assert_eq!(status, 0);
    assert!(stdout.is_empty());
    assert!(stderr.is_empty());
}

#[test]
fn explicit_output_and_algorithm_decode_unknown_suffix() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("raw.txt");
    fs::write(&input, b"explicit naming").unwrap();
    let stream = dir.path().join("stream.bin");

    let (status, _, stderr) = run(&["-a", "zlib", "-o", path_str(&stream), path_str(&input)]);
    assert_eq!(status, 0, "{stderr}");

    let restored = dir.path().join("restored.txt");
    let (status, _, stderr) = run(&["-d", path_str(&stream)]);
    assert_eq!(status, 1);
    assert!(stderr.contains("unknown suffix"), "{stderr}");

    let (status, _, stderr) = run(&[
        "-d",
        "-a",
        "zlib",
        "-o",
        path_str(&restored),
        path_str(&stream),
    ]);
    assert_eq!(status, 0, "{stderr}");
    assert_eq!(fs::read(&restored).unwrap(), b"explicit naming");
}

// =============================================================================
// SECTION 2: Failures
// =============================================================================

#[test]
fn refuses_to_overwrite_without_force() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("keep.txt");
    fs::write(&input, b"new data").unwrap();
    let output = dir.path().join("keep.txt.gz");
    fs::write(&output, b"old").unwrap();

    let (status, _, stderr) = run(&[path_str(&input)]);
    assert_eq!(status, 1);
    assert!(stderr.contains("already exists"), "{stderr}");
    assert_eq!(fs::read(&output).unwrap(), b"old");

    let (status, _, _) = run(&["-f", path_str(&input)]);
    assert_eq!(status, 0);
    assert_ne!(fs::read(&output).unwrap(), b"old");
}

#[test]
fn corrupt_stream_exits_with_data_status_and_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bad.zz");
    fs::write(&input, b"\x78\x9c garbage that is not deflate").unwrap();

    let (status, _, stderr) = run(&["-d", path_str(&input)]);
    assert_eq!(status, 2, "{stderr}");
    assert!(stderr.starts_with("streampress: "), "{stderr}");
    assert!(!dir.path().join("bad").exists());
}

#[test]
fn truncated_stream_exits_with_data_status() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("t.txt");
    fs::write(&input, patterned(10_000)).unwrap();
    let (status, _, _) = run(&["-q", path_str(&input)]);
    assert_eq!(status, 0);

    let compressed = dir.path().join("t.txt.gz");
    let mut bytes = fs::read(&compressed).unwrap();
    bytes.truncate(bytes.len() - 3);
    fs::write(&compressed, bytes).unwrap();
    fs::remove_file(&input).unwrap();

    let (status, _, stderr) = run(&["-d", path_str(&compressed)]);
    assert_eq!(status, 2);
    assert!(stderr.contains("truncated"), "{stderr}");
    assert!(!input.exists());
}

#[test]
fn invalid_window_bits_is_an_init_failure() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("w.txt");
    fs::write(&input, b"window").unwrap();

    let (status, _, stderr) = run(&["--window-bits", "20", path_str(&input)]);
    assert_eq!(status, 1);
    assert!(stderr.contains("window bits"), "{stderr}");
    assert!(!dir.path().join("w.txt.gz").exists());
}

#[test]
fn missing_input_is_an_io_failure_but_later_files_still_run() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.txt");
    let present = dir.path().join("present.txt");
    fs::write(&present, b"here").unwrap();

    let (status, _, stderr) = run(&["-q", path_str(&missing), path_str(&present)]);
    assert_eq!(status, 3);
    assert!(stderr.contains("missing.txt"), "{stderr}");
    assert!(dir.path().join("present.txt.gz").is_file());
}

#[test]
fn unknown_algorithm_is_a_usage_error() {
    let (status, _, stderr) = run(&["-a", "lzma", "whatever"]);
    assert_eq!(status, 1);
    assert!(stderr.contains("lzma"), "{stderr}");
}
