//! Duration formatting for SLURM time limits.

/// Format a wall-clock limit in fractional hours as SLURM's
/// DD-HH:MM:SS time-limit syntax.
///
/// Days are split off by integer division of the total duration by
/// 24 hours; any sub-second remainder is truncated.
pub fn hours_to_slurm_time(hours: f64) -> String {
    let total_seconds = (hours * 3600.0) as u64;
    let days = total_seconds / 86400;
    let hours = (total_seconds % 86400) / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{:02}-{:02}:{:02}:{:02}", days, hours, mins, secs)
}
