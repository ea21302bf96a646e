#![deny(unsafe_code)]

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::{env, io, process::ExitCode};

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let status = cli::run(env::args_os(), &mut stdout, &mut stderr);
    ExitCode::from(u8::try_from(status).unwrap_or(u8::MAX))
}
