//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `trystore_core` linkage.
//! - Show that a session boots against an in-memory database.

use std::process::ExitCode;

use trystore_core::{Session, SessionOptions};

fn main() -> ExitCode {
    println!("trystore_core ping={}", trystore_core::ping());
    println!("trystore_core version={}", trystore_core::core_version());

    match Session::open_in_memory(SessionOptions::default(), &[]) {
        Ok(session) => {
            println!(
                "trystore_core session=ok tracked={} page_size={}",
                session.tracked_count(),
                session.options().stream_page_size
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("trystore_core session=error error={err}");
            ExitCode::FAILURE
        }
    }
}
