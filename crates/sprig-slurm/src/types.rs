//! Submission request and receipt types.

use camino::Utf8PathBuf;
use serde::Serialize;
use std::fmt;

/// Resource parameters for one submission (or one chain of submissions).
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Shell command block executed by the job
    pub command: String,

    /// SLURM job name
    pub job_name: String,

    /// Partition/queue to submit to
    pub partition: String,

    /// Node count
    pub nodes: u32,

    /// CPUs per task
    pub num_cpus: u32,

    /// Memory per node, in GB (rendered as `--mem={n}gb`)
    pub cpu_mem_gb: u32,

    /// GPU count; 0 omits the gres directive entirely
    pub num_gpus: u32,

    /// Wall-clock limit in hours, fractional allowed
    pub time_hours: f64,

    /// Output log path; must contain ".out". Defaults to `$CWD/%J.out`.
    pub log_path: Option<Utf8PathBuf>,

    /// Render and write scripts without invoking sbatch
    pub dry_run: bool,

    /// Chain length; jobs after the first depend on the previous via afterok
    pub num_jobs: u32,

    /// Node-exclusion list passed through to `--exclude`
    pub exclude: Option<String>,

    /// Scratch directory for rendered scripts
    pub sbatch_dir: Utf8PathBuf,
}

impl SubmitRequest {
    /// Build a request with minimal resources (1 node, 1 CPU, 3 GB,
    /// no GPUs, 24 h limit, single job).
    pub fn new(command: impl Into<String>, partition: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            job_name: "sprig-job".to_string(),
            partition: partition.into(),
            nodes: 1,
            num_cpus: 1,
            cpu_mem_gb: 3,
            num_gpus: 0,
            time_hours: 24.0,
            log_path: None,
            dry_run: false,
            num_jobs: 1,
            exclude: None,
            sbatch_dir: Utf8PathBuf::from(".sbatch"),
        }
    }
}

/// Job identifier reported by sbatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobId {
    /// Parsed from "Submitted batch job <digits>"
    Parsed(u64),
    /// Raw sbatch stdout when the expected pattern is missing
    Raw(String),
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobId::Parsed(id) => write!(f, "{}", id),
            JobId::Raw(s) => write!(f, "{}", s),
        }
    }
}

/// Per-step result of a submission attempt.
///
/// A failed sbatch call does not stop the chain; later jobs keep the
/// stale dependency id, so callers need the per-step outcome to tell a
/// broken chain from a healthy one.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Script written but sbatch not invoked
    DryRun,
    Submitted { job_id: JobId },
    /// sbatch launch failure or non-zero exit, already logged
    Failed { error: String },
}

/// Receipt for one rendered (and possibly submitted) job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSubmission {
    /// Exact sbatch command line used
    pub args: String,

    /// Path of the rendered script in the scratch directory
    pub script_path: Utf8PathBuf,

    pub outcome: SubmitOutcome,
}
