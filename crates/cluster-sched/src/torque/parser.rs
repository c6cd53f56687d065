//! Parsers for Torque command output.

use crate::error::{SchedError, SchedResult};
use crate::queue::{QueueRecord, QueueState};

/// Parse qsub output to extract the numeric job id.
///
/// Torque prints `<number>.<server>`, e.g. `"4521.headnode"`; the id is the
/// portion before the first dot.
pub fn parse_qsub_output(output: &str) -> SchedResult<String> {
    let trimmed = output.trim();
    let job_id = trimmed.split('.').next().unwrap_or_default();

    if !job_id.is_empty() && job_id.chars().all(|c| c.is_ascii_digit()) {
        return Ok(job_id.to_string());
    }

    Err(SchedError::UnexpectedOutput {
        command: "qsub".to_string(),
        output: trimmed.to_string(),
    })
}

/// Parse qstat full output (`-f`) into a queue record.
///
/// ```text
/// Job Id: 12345.headnode
///     Job_Name = my_job
///     job_state = R
///     queue = batch
///     exit_status = 0
/// ```
pub fn parse_qstat_full_output(output: &str) -> SchedResult<Option<QueueRecord>> {
    if output.trim().is_empty() {
        return Ok(None);
    }

    let mut job_id = None;
    let mut name = None;
    let mut state = None;
    let mut exit_code = None;

    for line in output.lines() {
        let line = line.trim();

        if let Some(id) = line.strip_prefix("Job Id:") {
            job_id = id.trim().split('.').next().map(str::to_string);
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            match key.trim() {
                "Job_Name" => name = Some(value.to_string()),
                "job_state" => state = Some(parse_pbs_state(value)),
                // Torque spells it exit_status, PBS Pro Exit_status
                "exit_status" | "Exit_status" => exit_code = value.parse().ok(),
                _ => {}
            }
        }
    }

    let Some(job_id) = job_id else {
        return Ok(None);
    };
    let state = state.ok_or_else(|| SchedError::UnexpectedOutput {
        command: "qstat".to_string(),
        output: format!("no job_state for job {job_id}"),
    })?;

    let mut record = QueueRecord::new(job_id, state);
    record.name = name;
    record.exit_code = exit_code;
    Ok(Some(record))
}

/// Parse a PBS state letter.
fn parse_pbs_state(state: &str) -> QueueState {
    match state.to_uppercase().as_str() {
        // M: moved to another server, still queued there
        "Q" | "W" | "T" | "M" => QueueState::Pending,
        "H" => QueueState::Held,
        "R" | "B" => QueueState::Running,
        "E" => QueueState::Completing,
        "S" | "U" => QueueState::Suspended,
        // F (PBS Pro) and C (Torque) both mean finished; check the exit code
        "C" | "F" => QueueState::Completed,
        "X" => QueueState::Cancelled,
        _ => QueueState::Unknown(state.to_string()),
    }
}
