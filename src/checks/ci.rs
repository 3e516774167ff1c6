use crate::pr::types::{CheckRun, StatusRollupEntry};
use crate::report::types::Verdict;

const FAILING_CONCLUSIONS: &[&str] = &["failure", "timed_out", "cancelled", "action_required"];
const RUNNING_STATUSES: &[&str] = &["queued", "in_progress"];
const FAILING_ROLLUP_CONCLUSIONS: &[&str] = &["FAILURE", "TIMED_OUT", "CANCELLED", "ACTION_REQUIRED"];
const FAILING_ROLLUP_STATES: &[&str] = &["FAILURE", "ERROR"];
const PENDING_ROLLUP_STATES: &[&str] = &["PENDING", "EXPECTED"];

/// Names listed in a detail before collapsing the rest into "+N more".
const MAX_LISTED: usize = 3;

/// Evaluate CI from check runs, falling back to the status rollup only when
/// there are no check runs at all. No CI data is a pass.
pub fn check_ci(check_runs: &[CheckRun], status_rollup: &[StatusRollupEntry]) -> Verdict {
    if !check_runs.is_empty() {
        return check_runs_verdict(check_runs);
    }
    if !status_rollup.is_empty() {
        return rollup_verdict(status_rollup);
    }
    Verdict::pass()
}

fn check_runs_verdict(check_runs: &[CheckRun]) -> Verdict {
    let failing: Vec<&str> = check_runs
        .iter()
        .filter(|run| {
            run.status.as_deref() == Some("completed")
                && run
                    .conclusion
                    .as_deref()
                    .is_some_and(|c| FAILING_CONCLUSIONS.contains(&c))
        })
        .map(|run| run.name.as_deref().unwrap_or("unknown"))
        .collect();
    if !failing.is_empty() {
        return Verdict::fail(format!("Failing: {}", list_names(&failing)));
    }

    let running: Vec<&str> = check_runs
        .iter()
        .filter(|run| run.status.as_deref().is_some_and(|s| RUNNING_STATUSES.contains(&s)))
        .map(|run| run.name.as_deref().unwrap_or("unknown"))
        .collect();
    if !running.is_empty() {
        let shown = &running[..running.len().min(MAX_LISTED)];
        return Verdict::warn(format!("CI in progress: {}", shown.join(", ")));
    }

    Verdict::pass()
}

fn rollup_verdict(status_rollup: &[StatusRollupEntry]) -> Verdict {
    let upper = |value: &Option<String>| value.as_deref().unwrap_or("").to_ascii_uppercase();

    let failing: Vec<&str> = status_rollup
        .iter()
        .filter(|entry| {
            FAILING_ROLLUP_CONCLUSIONS.contains(&upper(&entry.conclusion).as_str())
                || FAILING_ROLLUP_STATES.contains(&upper(&entry.state).as_str())
        })
        .map(|entry| {
            entry
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .or(entry.context.as_deref())
                .unwrap_or("unknown")
        })
        .collect();
    if !failing.is_empty() {
        return Verdict::fail(format!("Failing: {}", list_names(&failing)));
    }

    if status_rollup
        .iter()
        .any(|entry| PENDING_ROLLUP_STATES.contains(&upper(&entry.state).as_str()))
    {
        return Verdict::warn("CI pending");
    }

    Verdict::pass()
}

/// "a, b, c (+2 more)"
fn list_names(names: &[&str]) -> String {
    let shown = &names[..names.len().min(MAX_LISTED)];
    let mut detail = shown.join(", ");
    if names.len() > MAX_LISTED {
        detail.push_str(&format!(" (+{} more)", names.len() - MAX_LISTED));
    }
    detail
}
