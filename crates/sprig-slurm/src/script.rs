//! sbatch script rendering.
//!
//! A script is a shebang, a fixed-order block of `#SBATCH --key=value`
//! directives, a blank line, then the shell command block verbatim.

use crate::time::hours_to_slurm_time;
use crate::types::SubmitRequest;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use uuid::Uuid;

/// A backslash and, when present, the escaped dollar right after it.
static CONTINUATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(\$?)").unwrap());

static REPEATED_SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").unwrap());

/// Collapse a multi-line shell command into a single line.
///
/// Strips surrounding whitespace, removes `\` line continuations while
/// keeping escaped dollars (`\$`) intact, drops newlines, and collapses
/// repeated spaces. Commands embedded in a single directive must not
/// span lines unexpectedly.
pub fn flatten_script(cmd: &str) -> String {
    let cmd = cmd.trim();
    let cmd = CONTINUATION_RE.replace_all(cmd, |caps: &Captures| {
        if &caps[1] == "$" {
            r"\$".to_string()
        } else {
            String::new()
        }
    });
    let cmd = cmd.replace('\n', "");
    let cmd = REPEATED_SPACES_RE.replace_all(&cmd, " ");
    cmd.trim().to_string()
}

/// Assemble the directive block for one job in a chain.
///
/// The order is significant for readability of the generated scripts;
/// entries with no value are skipped at render time.
pub fn sbatch_directives(
    req: &SubmitRequest,
    log_path: &Utf8Path,
    dependency: Option<&str>,
) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("job-name", Some(req.job_name.clone())),
        ("partition", Some(req.partition.clone())),
        ("nodes", Some(req.nodes.to_string())),
        ("cpus-per-task", Some(req.num_cpus.to_string())),
        ("mem", Some(format!("{}gb", req.cpu_mem_gb))),
        (
            "gres",
            (req.num_gpus > 0).then(|| format!("gpu:{}", req.num_gpus)),
        ),
        ("time", Some(hours_to_slurm_time(req.time_hours))),
        ("output", Some(log_path.to_string())),
        ("exclude", req.exclude.clone()),
        ("dependency", dependency.map(|id| format!("afterok:{}", id))),
    ]
}

/// Render a complete sbatch script.
pub fn render_script(directives: &[(&'static str, Option<String>)], command: &str) -> String {
    let mut s = String::from("#!/bin/bash\n\n");
    for (key, value) in directives {
        if let Some(value) = value {
            s.push_str(&format!("#SBATCH --{}={}\n", key, value));
        }
    }
    s.push('\n');
    s.push_str(command);
    s
}

/// Persist a rendered script to the scratch directory.
///
/// The directory is created if absent. Filenames combine a local
/// timestamp with a fresh v4 UUID so concurrent invocations from
/// different processes cannot collide. Scripts are never deleted.
pub fn write_script(sbatch_dir: &Utf8Path, script: &str) -> std::io::Result<Utf8PathBuf> {
    fs::create_dir_all(sbatch_dir)?;
    let timestamp = Local::now().format("%Y-%m-%d_%H:%M:%S");
    let path = sbatch_dir.join(format!("{}_{}.sh", timestamp, Uuid::new_v4()));
    fs::write(&path, script)?;
    tracing::debug!("wrote sbatch script to {}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use tempfile::TempDir;

    #[test]
    fn test_flatten_removes_continuations() {
        assert_eq!(flatten_script("a \\\nb"), "a b");
        assert_eq!(
            flatten_script("python train.py \\\n    --epochs 10 \\\n    --lr 1e-3"),
            "python train.py --epochs 10 --lr 1e-3"
        );
    }

    #[test]
    fn test_flatten_preserves_escaped_dollar() {
        assert_eq!(flatten_script(r"echo \$X"), r"echo \$X");
        assert_eq!(flatten_script("echo \\$HOME \\\nls"), r"echo \$HOME ls");
    }

    #[test]
    fn test_flatten_collapses_whitespace() {
        assert_eq!(flatten_script("  a    b  "), "a b");
        assert_eq!(flatten_script("a \\\n   \\\n b"), "a b");
    }

    fn request() -> SubmitRequest {
        SubmitRequest::new("echo hello", "short")
    }

    #[test]
    fn test_directive_order() {
        let req = request();
        let directives = sbatch_directives(&req, Utf8Path::new("run.out"), None);
        let keys: Vec<&str> = directives.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                "job-name",
                "partition",
                "nodes",
                "cpus-per-task",
                "mem",
                "gres",
                "time",
                "output",
                "exclude",
                "dependency"
            ]
        );
    }

    #[test]
    fn test_gpu_directive_only_when_requested() {
        let mut req = request();
        let script = render_script(
            &sbatch_directives(&req, Utf8Path::new("run.out"), None),
            &req.command,
        );
        assert!(!script.contains("--gres"));

        req.num_gpus = 2;
        let script = render_script(
            &sbatch_directives(&req, Utf8Path::new("run.out"), None),
            &req.command,
        );
        assert_eq!(script.matches("--gres").count(), 1);
        assert!(script.contains("#SBATCH --gres=gpu:2\n"));
    }

    #[test]
    fn test_render_layout() {
        let req = request();
        let script = render_script(
            &sbatch_directives(&req, Utf8Path::new("run.out"), None),
            "echo hello",
        );
        assert!(script.starts_with("#!/bin/bash\n\n#SBATCH --job-name=sprig-job\n"));
        assert!(script.contains("#SBATCH --partition=short\n"));
        assert!(script.contains("#SBATCH --mem=3gb\n"));
        assert!(script.contains("#SBATCH --time=01-00:00:00\n"));
        assert!(script.contains("#SBATCH --output=run.out\n"));
        assert!(script.ends_with("\n\necho hello"));
        assert!(!script.contains("--exclude"));
        assert!(!script.contains("--dependency"));
    }

    #[test]
    fn test_render_dependency_and_exclude() {
        let mut req = request();
        req.exclude = Some("node[01-03]".to_string());
        let script = render_script(
            &sbatch_directives(&req, Utf8Path::new("run.out"), Some("12345")),
            &req.command,
        );
        assert!(script.contains("#SBATCH --exclude=node[01-03]\n"));
        assert!(script.contains("#SBATCH --dependency=afterok:12345\n"));
    }

    #[test]
    fn test_write_script_creates_dir_and_file() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap().join("scratch");
        let path = write_script(&dir, "#!/bin/bash\n").unwrap();
        assert!(path.as_str().ends_with(".sh"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "#!/bin/bash\n");

        // distinct names for repeated writes
        let other = write_script(&dir, "#!/bin/bash\n").unwrap();
        assert_ne!(path, other);
    }
}
