// Command-line flags and subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Command-line client for the CasJobs batch-query service
#[derive(Parser, Debug)]
#[command(name = "cjclient", version, about)]
pub struct Cli {
    /// Config file (default: ./cjclient.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a query synchronously and print (or save) the result
    Execute {
        #[arg(short = 'x', long, default_value = "MyDB")]
        context: String,
        #[arg(short, long)]
        query: String,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a file as a table
    Upload {
        #[arg(short = 'x', long, default_value = "MyDB")]
        context: String,
        #[arg(short, long)]
        table: String,
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show a job's status record
    Status {
        #[arg(short, long)]
        job_id: String,
    },

    /// Cancel a job
    Cancel {
        #[arg(short, long)]
        job_id: String,
    },

    /// Submit a query as an asynchronous job
    Submit(SubmitArgs),

    /// Submit a job and block until it finishes
    #[command(name = "submit_wait", alias = "submit-wait")]
    SubmitWait(SubmitArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SubmitArgs {
    #[arg(short = 'x', long, default_value = "MyDB")]
    pub context: String,
    #[arg(short, long)]
    pub query: String,
    /// Table to store the result in
    #[arg(short, long)]
    pub table: Option<String>,
    /// Create a new table for the result
    #[arg(short, long)]
    pub create_table: bool,
}
