use std::{env, io, os::fd::AsFd, process};

use tracing::{debug, error};

use utempter::{record::Utmpx, request::Invocation, system};

fn main() {
    // Refusing to run with a closed standard descriptor slot comes before
    // everything else, including diagnostics: with fd 0..2 unaccounted
    // for, even writing an error message is unsafe.
    let code = if system::standard_descriptors_open() {
        helper_main()
    } else {
        libc::EXIT_FAILURE
    };
    process::exit(code);
}

fn helper_main() -> i32 {
    #[cfg(feature = "diagnostics")]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let invocation = match Invocation::parse_args(env::args_os()) {
        Ok(invocation) => invocation,
        Err(error) => {
            debug!(%error, "usage: utempter add [<host>] | utempter del");
            return libc::EXIT_FAILURE;
        }
    };

    match utempter::run(
        &invocation,
        io::stdin().as_fd(),
        system::parent_pid(),
        &mut Utmpx,
    ) {
        Ok(()) => libc::EXIT_SUCCESS,
        Err(error) => {
            error!(%error, "refusing request");
            libc::EXIT_FAILURE
        }
    }
}
