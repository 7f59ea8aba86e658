//! sprig - submit shell commands to SLURM as chained sbatch jobs.

mod cli;

use clap::Parser;
use cli::Args;
use miette::{IntoDiagnostic, Result, miette};
use sprig_slurm::{SubmitRequest, flatten_script, submit_jobs};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let commands: Vec<String> = if args.flatten {
        args.commands.iter().map(|c| flatten_script(c)).collect()
    } else {
        args.commands.clone()
    };

    let modify: Option<Box<dyn Fn(&str) -> String>> = match &args.chain_replace {
        Some(spec) => {
            let (old, new) = spec
                .split_once('=')
                .ok_or_else(|| miette!("--chain-replace expects OLD=NEW, got {:?}", spec))?;
            let (old, new) = (old.to_string(), new.to_string());
            Some(Box::new(move |cmd: &str| cmd.replace(&old, &new)))
        }
        None => None,
    };

    let mut req = SubmitRequest::new(String::new(), args.partition.clone());
    req.job_name = args.job_name.clone();
    req.nodes = args.nodes;
    req.num_cpus = args.num_cpus;
    req.cpu_mem_gb = args.cpu_mem;
    req.num_gpus = args.num_gpus;
    req.time_hours = args.time;
    req.log_path = args.log_path.clone();
    req.dry_run = args.dry_run;
    req.num_jobs = args.num_jobs;
    req.exclude = args.exclude.clone();
    req.sbatch_dir = args.sbatch_dir.clone();

    let submissions = submit_jobs(&commands, &req, modify.as_deref())
        .await
        .into_diagnostic()?;

    println!(
        "{}",
        serde_json::to_string_pretty(&submissions).into_diagnostic()?
    );

    Ok(())
}
