use std::io;
use std::process::ExitCode;

use contig::{RegionAllocator, Session};
use log::error;

const DEFAULT_TOTAL_SIZE: u32 = 1000;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let total_size = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u32>() {
            Ok(size) => size,
            Err(err) => {
                error!("invalid total size `{arg}`: {err}");
                eprintln!("usage: contig [TOTAL_SIZE]");
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_TOTAL_SIZE,
    };

    let allocator = match RegionAllocator::new(total_size) {
        Ok(allocator) => allocator,
        Err(err) => {
            error!("cannot create address space of {total_size}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::new(allocator, io::stdout().lock());
    if let Err(err) = session.run(io::stdin().lock()) {
        error!("i/o error: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
