//! Job submission and chaining.
//!
//! Each call renders one sbatch script per chain step, writes it to the
//! scratch directory, and (outside dry-run) submits it. Step `i + 1`
//! declares `afterok` on the job id reported for step `i`.

use crate::script::{render_script, sbatch_directives, write_script};
use crate::types::{JobId, JobSubmission, SubmitOutcome, SubmitRequest};
use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use thiserror::Error;
use tokio::process::Command;

static JOB_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Submitted batch job (\d+)").unwrap());

/// Dependency id carried before the first successful submission.
///
/// If the first sbatch call fails, later jobs in the chain are rendered
/// with this placeholder as the afterok target, which SLURM will
/// reject. The condition is surfaced through [`SubmitOutcome::Failed`]
/// on the failing step rather than stopping the chain.
const JOB_ID_SENTINEL: &str = "<job_id>";

/// `--mem` sets SLURM_MEM_PER_NODE; srun treats the per-cpu, per-gpu
/// and per-node memory variables as mutually exclusive.
const CONFLICTING_ENV_VAR: &str = "SLURM_MEM_PER_CPU";

/// Non-fatal sbatch invocation failure; recorded per step, never
/// escalated past [`SubmitOutcome::Failed`].
#[derive(Error, Debug)]
enum SbatchError {
    #[error("Failed to execute sbatch: {0}")]
    Execution(String),
    #[error("sbatch failed: {0}")]
    Rejected(String),
}

/// Run `sbatch <script>` and return its stdout.
async fn run_sbatch(script_path: &Utf8Path) -> Result<String, SbatchError> {
    let output = Command::new("sbatch")
        .arg(script_path.as_str())
        .output()
        .await
        .map_err(|e| SbatchError::Execution(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SbatchError::Rejected(stderr.into_owned()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("log_path must contain \".out\": {0}")]
    InvalidLogPath(Utf8PathBuf),
    #[error("working directory is not valid UTF-8: {0}")]
    NonUtf8Cwd(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract the job id from sbatch stdout.
///
/// Falls back to the raw output text when the expected pattern is
/// missing; a parse miss is not an error.
fn parse_job_id(stdout: &str) -> JobId {
    match JOB_ID_RE
        .captures(stdout)
        .and_then(|caps| caps[1].parse().ok())
    {
        Some(id) => JobId::Parsed(id),
        None => JobId::Raw(stdout.to_string()),
    }
}

/// Submit `req.command` as a chain of `req.num_jobs` sbatch jobs.
///
/// For chains, each job gets a distinct log path (`_{i+1}:{num_jobs}`
/// inserted before the extension) and jobs after the first may have
/// `modify` applied to the original command text. Submission failures
/// are logged and recorded per step; the chain keeps going with the
/// previous (possibly stale) dependency id.
pub async fn submit_job(
    req: &SubmitRequest,
    modify: Option<&dyn Fn(&str) -> String>,
) -> Result<Vec<JobSubmission>, SubmitError> {
    let log_path = match &req.log_path {
        Some(path) => path.clone(),
        None => {
            let cwd = Utf8PathBuf::from_path_buf(env::current_dir()?)
                .map_err(|p| SubmitError::NonUtf8Cwd(p.display().to_string()))?;
            cwd.join("%J.out")
        }
    };
    if !log_path.as_str().contains(".out") {
        return Err(SubmitError::InvalidLogPath(log_path));
    }
    let log_dir = log_path.parent().unwrap_or(Utf8Path::new(""));
    let (log_stem, log_ext) = log_path
        .file_name()
        .and_then(|name| name.split_once('.'))
        .ok_or_else(|| SubmitError::InvalidLogPath(log_path.clone()))?;

    if env::var_os(CONFLICTING_ENV_VAR).is_some() {
        // SAFETY: callers must not mutate the environment concurrently.
        unsafe { env::remove_var(CONFLICTING_ENV_VAR) };
    }

    let mut submissions = Vec::with_capacity(req.num_jobs as usize);
    // Loop-carried dependency target, updated on each successful submission.
    let mut dep_id = JOB_ID_SENTINEL.to_string();

    for i in 0..req.num_jobs {
        let step_log_path = if req.num_jobs > 1 {
            log_dir.join(format!("{}_{}:{}.{}", log_stem, i + 1, req.num_jobs, log_ext))
        } else {
            log_path.clone()
        };

        // Chained jobs transform the original command, not the output
        // of the previous step's transformation.
        let command = match modify {
            Some(f) if i != 0 => f(&req.command),
            _ => req.command.clone(),
        };

        let dependency = (i != 0).then(|| dep_id.clone());
        let directives = sbatch_directives(req, &step_log_path, dependency.as_deref());
        let script = render_script(&directives, &command);
        let script_path = write_script(&req.sbatch_dir, &script)?;
        let args = format!("sbatch {}", script_path);

        let outcome = if req.dry_run {
            SubmitOutcome::DryRun
        } else {
            match run_sbatch(&script_path).await {
                Ok(stdout) => {
                    let job_id = parse_job_id(&stdout);
                    dep_id = job_id.to_string();
                    SubmitOutcome::Submitted { job_id }
                }
                Err(e) => {
                    tracing::warn!("sbatch submission failed: {}", e);
                    SubmitOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            }
        };

        submissions.push(JobSubmission {
            args,
            script_path,
            outcome,
        });
    }

    Ok(submissions)
}

/// Submit one independent chain per command.
pub async fn submit_jobs(
    commands: &[String],
    base: &SubmitRequest,
    modify: Option<&dyn Fn(&str) -> String>,
) -> Result<Vec<Vec<JobSubmission>>, SubmitError> {
    let mut all = Vec::with_capacity(commands.len());
    for command in commands {
        let mut req = base.clone();
        req.command = command.clone();
        all.push(submit_job(&req, modify).await?);
    }
    Ok(all)
}
