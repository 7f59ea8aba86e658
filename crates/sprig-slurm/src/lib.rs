//! SLURM job submission for sprig.
//!
//! Render sbatch scripts, submit them via sbatch, and chain jobs
//! with afterok dependencies.

pub mod script;
pub mod submit;
pub mod time;
pub mod types;

pub use script::{flatten_script, render_script};
pub use submit::{SubmitError, submit_job, submit_jobs};
pub use time::hours_to_slurm_time;
pub use types::{JobId, JobSubmission, SubmitOutcome, SubmitRequest};
