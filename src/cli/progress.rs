// src/cli/progress.rs — Terminal progress renderer

use crate::core::types::{CaseOutcome, ProgressEvent};

/// Build a progress callback that writes to stderr, keeping stdout clean
/// for the report itself.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::CaseFinished {
            case_id,
            completed,
            total,
            outcome,
        } => match outcome {
            CaseOutcome::Scored { recall, precision } => format!(
                "[{completed}/{total}] {case_id}: recall={recall:.2} precision={precision:.2}"
            ),
            CaseOutcome::Failed => format!("[{completed}/{total}] {case_id}: failed to score"),
            CaseOutcome::Skipped => format!("[{completed}/{total}] {case_id}: skipped"),
        },
        ProgressEvent::Complete {
            scored,
            failed,
            skipped,
        } => format!("[done] {scored} scored, {failed} failed, {skipped} skipped"),
    }
}
