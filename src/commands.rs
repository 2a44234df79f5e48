// Command layer: maps each subcommand onto CasJobs calls. Every remote call
// goes through `Session::with_auth_retry`.

use std::fs;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::api::{JobId, JobService, JobStatus};
use crate::args::{Command, SubmitArgs};
use crate::keystone::Authenticator;
use crate::session::Session;
use crate::token::TokenStore;

/// Poll interval between `GET /jobs/{id}` calls in `submit_wait`.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Job status codes at or above this value mean the job is over
/// (finished, failed or cancelled).
pub const TERMINAL_STATUS: i64 = 3;

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub terminal_status: i64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: POLL_INTERVAL,
            terminal_status: TERMINAL_STATUS,
        }
    }
}

/// How `submit_wait` pauses between polls and reports progress.
pub struct Waiter<'a> {
    pub policy: PollPolicy,
    pub sleep: Box<dyn FnMut(Duration) + 'a>,
    pub progress: Box<dyn FnMut(&JobId, &JobStatus) + 'a>,
}

impl<'a> Waiter<'a> {
    /// Real blocking sleep, no progress output.
    pub fn blocking(policy: PollPolicy) -> Self {
        Waiter {
            policy,
            sleep: Box::new(std::thread::sleep),
            progress: Box::new(|_: &JobId, _: &JobStatus| {}),
        }
    }
}

/// Final state of a waited-for job.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutcome {
    pub status: JobStatus,
    pub polls: usize,
}

/// Poll `job_id` until its status reaches the terminal threshold. No upper
/// bound on the number of polls.
pub fn wait_for_job<A, S, J>(
    session: &mut Session<A, S>,
    service: &J,
    job_id: &JobId,
    waiter: &mut Waiter<'_>,
) -> crate::Result<WaitOutcome>
where
    A: Authenticator,
    S: TokenStore,
    J: JobService,
{
    let mut polls = 0;
    loop {
        let status = session.with_auth_retry(|token| service.get_job_status(token, job_id))?;
        polls += 1;
        debug!(job = %job_id, status = status.status, polls, "polled job");
        (waiter.progress)(job_id, &status);

        if status.status >= waiter.policy.terminal_status {
            return Ok(WaitOutcome { status, polls });
        }
        (waiter.sleep)(waiter.policy.interval);
    }
}

/// Run one subcommand, writing its human-readable result to `out`.
pub fn run<A, S, J, W>(
    command: &Command,
    session: &mut Session<A, S>,
    service: &J,
    out: &mut W,
    waiter: &mut Waiter<'_>,
) -> Result<()>
where
    A: Authenticator,
    S: TokenStore,
    J: JobService,
    W: Write,
{
    match command {
        Command::Execute {
            context,
            query,
            output,
        } => {
            let result = session
                .with_auth_retry(|token| service.execute_query(token, context, query))
                .context("Query failed")?;
            match output {
                Some(path) => fs::write(path, &result)
                    .with_context(|| format!("Failed to write result to {}", path.display()))?,
                None => out.write_all(&result)?,
            }
        }
        Command::Upload {
            context,
            table,
            input,
        } => {
            let content = fs::read(input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let sent = session
                .with_auth_retry(|token| service.upload_table(token, context, table, &content))
                .context("Upload failed")?;
            writeln!(out, "Uploaded {sent} bytes to {context}.{table}")?;
        }
        Command::Status { job_id } => {
            let job_id = JobId(job_id.clone());
            let status = session
                .with_auth_retry(|token| service.get_job_status(token, &job_id))
                .context("Status request failed")?;
            writeln!(out, "{}", serde_json::to_string_pretty(&status)?)?;
        }
        Command::Cancel { job_id } => {
            let job_id = JobId(job_id.clone());
            let confirmation = session
                .with_auth_retry(|token| service.cancel_job(token, &job_id))
                .context("Cancel request failed")?;
            writeln!(out, "{confirmation}")?;
        }
        Command::Submit(args) => {
            let job_id = submit(session, service, args)?;
            writeln!(out, "{job_id}")?;
        }
        Command::SubmitWait(args) => {
            let job_id = submit(session, service, args)?;
            writeln!(out, "Submitted job {job_id}")?;
            let outcome = wait_for_job(session, service, &job_id, waiter)
                .with_context(|| format!("Waiting for job {job_id} failed"))?;
            writeln!(
                out,
                "Job {job_id} finished with status {} after {} polls",
                outcome.status.status, outcome.polls
            )?;
            writeln!(out, "{}", serde_json::to_string_pretty(&outcome.status)?)?;
        }
    }
    Ok(())
}

fn submit<A, S, J>(session: &mut Session<A, S>, service: &J, args: &SubmitArgs) -> Result<JobId>
where
    A: Authenticator,
    S: TokenStore,
    J: JobService,
{
    session
        .with_auth_retry(|token| {
            service.submit_job(
                token,
                &args.context,
                &args.query,
                args.create_table,
                args.table.as_deref(),
            )
        })
        .context("Submit failed")
}
