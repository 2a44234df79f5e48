// Library root
// -----------
// Client for the CasJobs batch-query service. The binary (`main.rs`) wires
// these modules together; everything here is usable on its own.
//
// Module responsibilities:
// - `token`: the on-disk token cache.
// - `keystone`: obtaining a fresh token from the Keystone identity service.
// - `api`: HTTP calls against the CasJobs REST API.
// - `session`: the process-wide token and the re-authenticate-once policy.
// - `commands`: one function per subcommand, including `submit_wait` polling.
// - `config` / `args`: configuration file and command-line flags.
pub mod api;
pub mod args;
pub mod commands;
pub mod config;
pub mod error;
pub mod keystone;
pub mod session;
pub mod token;

pub use error::{Error, Result};
