use std::ffi::OsString;

use clap::{Parser, Subcommand};

use crate::Error;

/// A parsed request: register or deregister one terminal session.
///
/// Immutable once parsed. A `del` request structurally cannot carry a
/// host, and an `add` request carries at most one.
#[derive(Debug, Parser)]
#[command(
    name = "utempter",
    disable_help_flag = true,
    disable_help_subcommand = true
)]
pub struct Invocation {
    #[command(subcommand)]
    pub verb: Verb,
}

#[derive(Debug, Subcommand)]
pub enum Verb {
    /// Register the caller's terminal session, optionally recording the
    /// remote host it came from.
    #[command(disable_help_flag = true)]
    Add {
        // Hosts are arbitrary graphic strings; a leading hyphen is not an
        // option introducer here.
        #[arg(allow_hyphen_values = true)]
        host: Option<String>,
    },
    /// Deregister the caller's terminal session.
    #[command(disable_help_flag = true)]
    Del,
}

impl Invocation {
    /// Parse an argument list. Every shape other than `add`, `add <host>`
    /// or `del` is a usage error; a help flag is no exception, since a
    /// privileged helper exposes no help surface.
    pub fn parse_args<I, T>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|error| Error::Usage(error.to_string()))
    }

    pub fn host(&self) -> Option<&str> {
        match &self.verb {
            Verb::Add { host } => host.as_deref(),
            Verb::Del => None,
        }
    }
}
