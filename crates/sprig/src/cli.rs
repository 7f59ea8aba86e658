//! CLI argument parsing for sprig.

use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sprig")]
#[command(about = "Render and submit sbatch job scripts, with optional job chaining")]
pub struct Args {
    /// Shell command(s) to run; each command gets its own chain
    #[arg(required = true)]
    pub commands: Vec<String>,

    /// SLURM job name
    #[arg(long, default_value = "sprig-job")]
    pub job_name: String,

    /// Partition/queue to submit to
    #[arg(long)]
    pub partition: String,

    /// Node count
    #[arg(long, default_value = "1")]
    pub nodes: u32,

    /// CPUs per task
    #[arg(long, default_value = "1")]
    pub num_cpus: u32,

    /// Memory per node in GB
    #[arg(long, default_value = "3")]
    pub cpu_mem: u32,

    /// GPU count (0 omits the gres directive)
    #[arg(long, default_value = "0")]
    pub num_gpus: u32,

    /// Wall-clock limit in hours, fractional allowed
    #[arg(long, default_value = "24")]
    pub time: f64,

    /// Output log path; must contain ".out"
    #[arg(long)]
    pub log_path: Option<Utf8PathBuf>,

    /// Render and write scripts without invoking sbatch
    #[arg(long)]
    pub dry_run: bool,

    /// Number of chained jobs per command (afterok dependencies)
    #[arg(long, default_value = "1")]
    pub num_jobs: u32,

    /// Nodes to exclude, e.g. "node[01-03]"
    #[arg(long)]
    pub exclude: Option<String>,

    /// Directory for rendered scripts
    #[arg(long, default_value = ".sbatch")]
    pub sbatch_dir: Utf8PathBuf,

    /// Collapse multi-line commands into a single line before rendering
    #[arg(long)]
    pub flatten: bool,

    /// Substitution applied to the command for jobs after the first in
    /// a chain
    #[arg(long, value_name = "OLD=NEW")]
    pub chain_replace: Option<String>,
}
