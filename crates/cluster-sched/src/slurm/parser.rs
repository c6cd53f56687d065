//! Parsers for SLURM command output.

use crate::error::{SchedError, SchedResult};
use crate::queue::{QueueRecord, QueueState};

/// Parse sbatch output to extract the job id.
///
/// The id is the last whitespace-separated token, e.g.
/// `"Submitted batch job 12345"`.
pub fn parse_sbatch_output(output: &str) -> SchedResult<String> {
    let trimmed = output.trim();

    if let Some(job_id) = trimmed.split_whitespace().last() {
        if job_id.chars().all(|c| c.is_ascii_digit()) {
            return Ok(job_id.to_string());
        }
    }

    Err(SchedError::UnexpectedOutput {
        command: "sbatch".to_string(),
        output: trimmed.to_string(),
    })
}

/// Parse squeue output to extract job information.
///
/// Expected format (from `squeue -j <id> -o "%i|%j|%T|%r"`):
/// ```text
/// JOBID|NAME|STATE|REASON
/// 12345|job_name|RUNNING|None
/// ```
pub fn parse_squeue_output(output: &str) -> SchedResult<Option<QueueRecord>> {
    let lines: Vec<&str> = output.lines().collect();

    // Skip header line
    if lines.len() < 2 {
        return Ok(None);
    }

    let data_line = lines[1].trim();
    if data_line.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = data_line.split('|').collect();
    if parts.len() < 3 {
        return Err(SchedError::UnexpectedOutput {
            command: "squeue".to_string(),
            output: data_line.to_string(),
        });
    }

    Ok(Some(
        QueueRecord::new(parts[0].trim(), parse_slurm_state(parts[2].trim()))
            .with_name(parts[1].trim()),
    ))
}

/// Parse sacct output for finished job information.
///
/// Expected format (from `sacct -j <id> -o JobID,JobName,State,ExitCode -P`):
/// ```text
/// JobID|JobName|State|ExitCode
/// 12345|job_name|COMPLETED|0:0
/// 12345.batch|batch|COMPLETED|0:0
/// ```
pub fn parse_sacct_output(output: &str) -> SchedResult<Option<QueueRecord>> {
    let lines: Vec<&str> = output.lines().collect();

    // Skip header line
    if lines.len() < 2 {
        return Ok(None);
    }

    for line in &lines[1..] {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() < 4 {
            continue;
        }

        let job_id = parts[0].trim();
        // Skip steps (e.g., "12345.batch", "12345.extern")
        if job_id.contains('.') {
            continue;
        }

        let mut record =
            QueueRecord::new(job_id, parse_slurm_state(parts[2].trim())).with_name(parts[1].trim());
        record.exit_code = parse_exit_code(parts[3].trim());
        return Ok(Some(record));
    }

    Ok(None)
}

/// Parse SLURM state string.
fn parse_slurm_state(state: &str) -> QueueState {
    // sacct reports e.g. "CANCELLED by 1000"
    let state = state.split_whitespace().next().unwrap_or(state);
    match state.to_uppercase().as_str() {
        "PENDING" | "PD" | "CONFIGURING" | "CF" | "REQUEUED" | "RQ" | "REQUEUE_FED" | "RF" => {
            QueueState::Pending
        }
        "REQUEUE_HOLD" | "RH" | "RESV_DEL_HOLD" | "RD" => QueueState::Held,
        "RUNNING" | "R" | "RESIZING" | "RS" | "SIGNALING" | "SI" => QueueState::Running,
        "COMPLETING" | "CG" | "STAGE_OUT" | "SO" => QueueState::Completing,
        "SUSPENDED" | "S" | "STOPPED" | "ST" => QueueState::Suspended,
        "COMPLETED" | "CD" => QueueState::Completed,
        "FAILED" | "F" | "NODE_FAIL" | "NF" | "OUT_OF_MEMORY" | "OOM" | "BOOT_FAIL" | "BF" => {
            QueueState::Failed
        }
        "TIMEOUT" | "TO" | "DEADLINE" | "DL" => QueueState::Timeout,
        "CANCELLED" | "CA" | "PREEMPTED" | "PR" => QueueState::Cancelled,
        _ => QueueState::Unknown(state.to_string()),
    }
}

/// Parse exit code from SLURM format "exit_code:signal".
fn parse_exit_code(code: &str) -> Option<i32> {
    code.split(':').next().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sbatch_output() {
        assert_eq!(
            parse_sbatch_output("Submitted batch job 4521\n").unwrap(),
            "4521"
        );
        assert_eq!(parse_sbatch_output("9999999").unwrap(), "9999999");
    }

    #[test]
    fn test_parse_sbatch_output_error() {
        assert!(parse_sbatch_output("Error: some error message").is_err());
        assert!(parse_sbatch_output("").is_err());
    }

    #[test]
    fn test_parse_squeue_output() {
        let output = "JOBID|NAME|STATE|REASON\n12345|my_job|RUNNING|None\n";
        let record = parse_squeue_output(output).unwrap().unwrap();
        assert_eq!(record.id, "12345");
        assert_eq!(record.name.as_deref(), Some("my_job"));
        assert_eq!(record.state, QueueState::Running);
        assert!(record.exit_code.is_none());

        let output = "JOBID|NAME|STATE|REASON\n12345|my_job|PENDING|Dependency\n";
        let record = parse_squeue_output(output).unwrap().unwrap();
        assert_eq!(record.state, QueueState::Pending);
    }

    #[test]
    fn test_parse_squeue_output_empty() {
        assert!(parse_squeue_output("JOBID|NAME|STATE|REASON\n").unwrap().is_none());
        assert!(parse_squeue_output("").unwrap().is_none());
    }

    #[test]
    fn test_parse_sacct_output() {
        let output = "JobID|JobName|State|ExitCode\n12345|my_job|COMPLETED|0:0\n12345.batch|batch|COMPLETED|0:0\n";
        let record = parse_sacct_output(output).unwrap().unwrap();
        assert_eq!(record.id, "12345");
        assert_eq!(record.state, QueueState::Completed);
        assert_eq!(record.exit_code, Some(0));
    }

    #[test]
    fn test_parse_sacct_output_failed() {
        let output = "JobID|JobName|State|ExitCode\n12345|my_job|FAILED|1:0\n";
        let record = parse_sacct_output(output).unwrap().unwrap();
        assert_eq!(record.state, QueueState::Failed);
        assert_eq!(record.exit_code, Some(1));
    }

    #[test]
    fn test_parse_slurm_state() {
        assert_eq!(parse_slurm_state("PD"), QueueState::Pending);
        assert_eq!(parse_slurm_state("R"), QueueState::Running);
        assert_eq!(parse_slurm_state("CANCELLED by 1000"), QueueState::Cancelled);
        assert_eq!(parse_slurm_state("OUT_OF_MEMORY"), QueueState::Failed);
        assert_eq!(parse_slurm_state("RESIZING"), QueueState::Running);
        assert_eq!(parse_slurm_state("SIGNALING"), QueueState::Running);
        assert_eq!(parse_slurm_state("STAGE_OUT"), QueueState::Completing);
        assert_eq!(parse_slurm_state("REQUEUE_HOLD"), QueueState::Held);
        assert_eq!(parse_slurm_state("REQUEUE_FED"), QueueState::Pending);
        assert!(matches!(
            parse_slurm_state("UNKNOWN_STATE"),
            QueueState::Unknown(_)
        ));
    }
}
