pub mod types;

pub use types::{PrResult, Report, Stats, Status, Verdict};

use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::analysis::{self, merge_order, overlap::format_partners};
use crate::checks::Checker;
use crate::config::{CloseConfig, Config};
use crate::pr::PullRequest;
use crate::util::date_prefix;

/// Merge-order entries shown in the terminal summary.
const MERGE_ORDER_PREVIEW: usize = 10;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Evaluate every PR and assemble the ranked report.
///
/// Per-PR checks run first, then supersession and overlap analysis across
/// the whole set, then close recommendations, ranking and the merge order.
#[instrument(skip_all, fields(prs = prs.len()))]
pub fn build(prs: &[PullRequest], checker: &Checker, config: &Config, now: DateTime<Utc>) -> Report {
    let mut results: Vec<PrResult> = prs
        .iter()
        .map(|pr| evaluate(pr, checker, config, now))
        .collect();

    let cross = analysis::run_all(prs, config);

    for result in &mut results {
        if let Some(&newer) = cross.superseded.get(&result.number) {
            result.superseded_by = Some(newer);
            result.notes = format!("May be superseded by #{}", newer);
        }

        let applicable = !result.is_draft && !result.conflict.is_fail();
        let eligible = cross.eligible.contains(&result.number);
        result.overlap = cross.overlap.verdict(result.number, applicable, eligible);
        if result.overlap.is_fail() && result.notes.is_empty() {
            let partners = format_partners(&cross.overlap.partners(result.number));
            result.notes = format!("Merge order matters: overlaps with {}", partners);
        }

        let reasons = close_reasons(result, &config.close);
        if !reasons.is_empty() {
            result.recommend_close = true;
            result.recommend_close_reason = reasons.join("; ");
        }
    }

    rank(&mut results);

    let merge_order = config.merge_order.enabled.then(|| {
        let candidates: Vec<merge_order::MergeCandidate> = results
            .iter()
            .filter(|r| is_clean_mergeable(r))
            .map(|r| merge_order::MergeCandidate {
                number: r.number,
                size_score: r.size_score,
            })
            .collect();
        merge_order::plan_merge_order(&candidates, &cross.overlap.overlaps)
    });

    let stats = compute_stats(&results);
    info!(
        total = stats.total,
        clean = stats.clean,
        needs_work = stats.needs_work,
        "report built"
    );

    Report {
        generated_at: now.format("%Y-%m-%dT%H:%M:%S UTC").to_string(),
        stats,
        merge_order,
        prs: results,
        overlaps: cross.overlap.overlaps,
        shared_no_overlap: cross.overlap.shared_no_overlap,
    }
}

/// Run the checklist for one PR and fill in everything that does not need
/// the rest of the PR set.
fn evaluate(pr: &PullRequest, checker: &Checker, config: &Config, now: DateTime<Utc>) -> PrResult {
    let checks = checker.run_all(pr, now);
    let fail_count = checks.fail_count();
    let has_priority = pr
        .labels
        .iter()
        .any(|label| config.ranking.priority_labels.contains(label));

    PrResult {
        number: pr.number,
        rank: 0,
        title: pr.title.clone(),
        url: pr.url.clone(),
        author: pr.author.clone(),
        is_draft: pr.is_draft,
        size: format!("{} files (+{}/-{})", pr.changed_files, pr.additions, pr.deletions),
        size_score: pr.size_score(),
        updated_at: date_prefix(&pr.updated_at).to_string(),
        created_at: date_prefix(&pr.created_at).to_string(),
        branch: pr.branch.clone(),
        labels: pr.labels.clone(),
        milestone: pr.milestone.clone(),
        ci: checks.ci,
        conflict: checks.conflict,
        review: checks.review,
        comments_for_review: checks.comments_for_review,
        ticket: checks.ticket,
        stale: checks.stale,
        days_since_update: checks.days_since_update,
        overlap: Verdict::not_applicable(),
        notes: String::new(),
        fail_count,
        has_priority,
        superseded_by: None,
        recommend_close: false,
        recommend_close_reason: String::new(),
    }
}

/// Advisory reasons to close a PR; each one is sufficient on its own.
fn close_reasons(result: &PrResult, config: &CloseConfig) -> Vec<String> {
    let mut reasons = Vec::new();
    let days = result.days_since_update;

    if let Some(days) = days {
        if result.is_draft && days > config.draft_inactive_days && result.conflict.is_fail() {
            reasons.push(format!("Draft with conflicts, inactive {}d", days));
        }
    }
    if let Some(newer) = result.superseded_by {
        reasons.push(format!("Superseded by #{}", newer));
    }
    if let Some(days) = days {
        if days > config.inactive_days {
            reasons.push(format!("Inactive for {} days", days));
        }
        if days > config.stale_days && result.fail_count >= config.stale_min_blockers {
            reasons.push(format!("Stale ({}d) with {} blockers", days, result.fail_count));
        }
    }
    reasons
}

/// Stable sort: non-drafts first, then fewer blockers, priority first, smaller first.
fn rank(results: &mut [PrResult]) {
    results.sort_by_key(|r| (r.is_draft, r.fail_count, !r.has_priority, r.size_score));
    for (i, result) in results.iter_mut().enumerate() {
        result.rank = i + 1;
    }
}

fn is_clean_mergeable(result: &PrResult) -> bool {
    !result.is_draft && result.fail_count == 0 && result.conflict.status == Status::Pass
}

fn compute_stats(results: &[PrResult]) -> Stats {
    let non_draft = || results.iter().filter(|r| !r.is_draft);
    Stats {
        total: results.len(),
        drafts: results.iter().filter(|r| r.is_draft).count(),
        clean: non_draft().filter(|r| r.fail_count == 0).count(),
        one_blocker: non_draft().filter(|r| r.fail_count == 1).count(),
        needs_work: non_draft().filter(|r| r.fail_count >= 2).count(),
        recommend_close: results.iter().filter(|r| r.recommend_close).count(),
    }
}

/// Write the JSON report, optionally a markdown rendering, and print a
/// summary to the terminal.
#[instrument(skip(report), fields(prs = report.prs.len()))]
pub fn output(report: &Report, json_path: &Path, markdown_path: Option<&Path>) -> Result<(), ReportError> {
    debug!(path = %json_path.display(), "writing JSON report");
    write_json_report(report, json_path)?;

    if let Some(path) = markdown_path {
        debug!(path = %path.display(), "writing markdown report");
        write_markdown_report(report, path)?;
    }

    print_terminal_summary(report, json_path);
    Ok(())
}

fn write_json_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Print totals, the ranked list and the merge order with colors.
fn print_terminal_summary(report: &Report, json_path: &Path) {
    let stats = &report.stats;
    println!();
    println!("Analysis complete: {}", json_path.display());
    println!("  Total: {} PRs ({} drafts)", stats.total, stats.drafts);
    println!(
        "  Clean: {} | One blocker: {} | Needs work: {}",
        stats.clean.to_string().green().bold(),
        stats.one_blocker.to_string().yellow().bold(),
        stats.needs_work.to_string().red().bold()
    );
    println!("  Recommend closing: {}", stats.recommend_close);
    println!(
        "  Overlaps: {} line-level, {} shared-file-only",
        report.overlaps.len(),
        report.shared_no_overlap.len()
    );
    if let Some(order) = report.merge_order.as_ref().filter(|o| !o.is_empty()) {
        let preview: Vec<String> = order
            .iter()
            .take(MERGE_ORDER_PREVIEW)
            .map(|n| format!("#{}", n))
            .collect();
        println!("  Merge order: {}", preview.join(" \u{2192} "));
    }
    println!();

    for pr in &report.prs {
        let mut line = format!("{:>3}. #{} {} {}", pr.rank, pr.number, pr.title, colorize_blockers(pr));
        if pr.recommend_close {
            line.push_str(&format!(" {}", "(consider closing)".dimmed()));
        }
        println!("{}", line);
    }
    println!();
}

fn colorize_blockers(pr: &PrResult) -> colored::ColoredString {
    if pr.is_draft {
        return "[draft]".dimmed();
    }
    match pr.fail_count {
        0 => "[ready]".green().bold(),
        1 => "[1 blocker]".yellow().bold(),
        n => format!("[{} blockers]", n).red().bold(),
    }
}

/// Write the ranked table, overlaps and close recommendations as markdown.
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let stats = &report.stats;
    let mut md = String::new();
    md.push_str("# PR Merge Readiness\n\n");
    md.push_str(&format!("_Generated {}_\n\n", report.generated_at));
    md.push_str(&format!(
        "**Total:** {} ({} drafts) | **Clean:** {} | **One blocker:** {} | **Needs work:** {} | **Recommend closing:** {}\n\n",
        stats.total, stats.drafts, stats.clean, stats.one_blocker, stats.needs_work, stats.recommend_close
    ));

    if let Some(order) = report.merge_order.as_ref().filter(|o| !o.is_empty()) {
        let order: Vec<String> = order.iter().map(|n| format!("#{}", n)).collect();
        md.push_str(&format!("**Merge order:** {}\n\n", order.join(" \u{2192} ")));
    }

    md.push_str("| Rank | PR | Title | Size | CI | Conflicts | Review | Jira | Stale | Overlap | Notes |\n");
    md.push_str("|---|---|---|---|---|---|---|---|---|---|---|\n");
    for pr in &report.prs {
        let draft = if pr.is_draft { " (draft)" } else { "" };
        md.push_str(&format!(
            "| {} | [#{}]({}){} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            pr.rank,
            pr.number,
            pr.url,
            draft,
            escape_cell(&pr.title),
            pr.size,
            pr.ci.status,
            pr.conflict.status,
            pr.review.status,
            pr.ticket.status,
            pr.stale.status,
            pr.overlap.status,
            escape_cell(&pr.notes),
        ));
    }
    md.push('\n');

    let blocked: Vec<&PrResult> = report.prs.iter().filter(|pr| pr.fail_count > 0).collect();
    if !blocked.is_empty() {
        md.push_str("## Blockers\n\n");
        for pr in blocked {
            md.push_str(&format!("### #{} {}\n\n", pr.number, pr.title));
            for (name, verdict) in [
                ("CI", &pr.ci),
                ("Conflicts", &pr.conflict),
                ("Review", &pr.review),
                ("Stale", &pr.stale),
            ] {
                if verdict.is_fail() {
                    md.push_str(&format!("- **{}:** {}\n", name, verdict.detail));
                }
            }
            md.push('\n');
        }
    }

    if !report.overlaps.is_empty() || !report.shared_no_overlap.is_empty() {
        md.push_str("## Overlaps\n\n");
        for o in &report.overlaps {
            md.push_str(&format!(
                "- #{} and #{} overlap on `{}` (lines {}-{} vs {}-{})\n",
                o.pr_a, o.pr_b, o.file, o.range_a.start, o.range_a.end, o.range_b.start, o.range_b.end
            ));
        }
        for s in &report.shared_no_overlap {
            md.push_str(&format!(
                "- #{} and #{} share {} without line overlap\n",
                s.pr_a,
                s.pr_b,
                s.shared_files.join(", ")
            ));
        }
        md.push('\n');
    }

    let closable: Vec<&PrResult> = report.prs.iter().filter(|pr| pr.recommend_close).collect();
    if !closable.is_empty() {
        md.push_str("## Consider Closing\n\n");
        for pr in closable {
            md.push_str(&format!("- #{}: {}\n", pr.number, pr.recommend_close_reason));
        }
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
