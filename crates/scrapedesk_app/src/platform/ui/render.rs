use scrapedesk_core::{AppViewModel, Phase, SubmissionId};

/// One change to the terminal page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    /// A new submission started; the previous transcript is discarded.
    Clear,
    Line(String),
    Status(String),
    Preview(String),
    Download(String),
}

/// What has already been written for the current submission. The terminal
/// only appends, so rendering is incremental against this cursor.
#[derive(Debug, Default)]
pub struct RenderCursor {
    submission: Option<SubmissionId>,
    lines_shown: usize,
    phase: Phase,
    preview_shown: bool,
    download_shown: bool,
}

pub fn render(view: &AppViewModel, cursor: &mut RenderCursor) -> Vec<TerminalCommand> {
    let mut cmds = Vec::new();

    if view.submission != cursor.submission {
        if cursor.submission.is_some() {
            cmds.push(TerminalCommand::Clear);
        }
        *cursor = RenderCursor {
            submission: view.submission,
            ..RenderCursor::default()
        };
    }

    let fresh = view.transcript.iter().skip(cursor.lines_shown);
    cmds.extend(fresh.cloned().map(TerminalCommand::Line));
    cursor.lines_shown = cursor.lines_shown.max(view.transcript.len());

    if view.phase != cursor.phase {
        cursor.phase = view.phase;
        if view.phase.is_terminal() {
            cmds.push(TerminalCommand::Status(status_text(view)));
        }
    }

    if let (Some(preview), false) = (&view.json_preview, cursor.preview_shown) {
        cursor.preview_shown = true;
        cmds.push(TerminalCommand::Preview(preview.clone()));
    }

    if let (Some(location), false) = (&view.download, cursor.download_shown) {
        cursor.download_shown = true;
        cmds.push(TerminalCommand::Download(location.clone()));
    }

    cmds
}

fn status_text(view: &AppViewModel) -> String {
    let label = match view.phase {
        Phase::Idle => "Idle",
        Phase::Connecting => "Connecting",
        Phase::UploadingPdf => "Uploading PDF",
        Phase::Streaming => "Scraping",
        Phase::Completed => "Completed",
        Phase::Disconnected => "Disconnected",
        Phase::ConnectionFailed => "Connection failed",
        Phase::UploadFailed => "Upload failed",
        Phase::Rejected(_) => "Not submitted",
    };
    match view.item_count {
        1 => format!("{label} | 1 item"),
        n => format!("{label} | {n} items"),
    }
}
