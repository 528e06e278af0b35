//! Batch driver: walks the roster in order, rendering and optionally
//! mailing each certificate. Failures are per-recipient; one bad row never
//! stops the rest of the batch.

use crate::error::Result;
use crate::mail::MailTransport;
use crate::recipient::RecipientRow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub failed: usize,
}

/// Processes the roster sequentially. `render` produces the artifact for one
/// row; when `should_send` is set the artifact is handed to `transport`.
/// `send_interval` paces deliveries; `cancel` is checked before each row for
/// best-effort cancellation between recipients.
pub fn run<R>(
    rows: &[RecipientRow],
    mut render: R,
    transport: Option<&dyn MailTransport>,
    should_send: bool,
    send_interval: Option<Duration>,
    cancel: &AtomicBool,
) -> Summary
where
    R: FnMut(&RecipientRow) -> Result<PathBuf>,
{
    let total = rows.len();
    if total == 0 {
        warn!("participant roster is empty; nothing to generate");
        return Summary::default();
    }

    let mut summary = Summary::default();
    for (index, row) in rows.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            warn!(position = index, total, "batch cancelled");
            break;
        }

        let mut row_ok = true;
        match render(row) {
            Ok(artifact) => {
                if should_send {
                    if let Some(transport) = transport {
                        match transport.send_certificate(row, &artifact) {
                            Ok(()) => {
                                if let Some(interval) = send_interval {
                                    std::thread::sleep(interval);
                                }
                            }
                            Err(err) => {
                                error!(
                                    recipient = %row.name.display(),
                                    email = %row.email,
                                    %err,
                                    "delivery failed"
                                );
                                row_ok = false;
                            }
                        }
                    }
                }
            }
            Err(err) => {
                error!(recipient = %row.name.display(), %err, "certificate generation failed");
                row_ok = false;
            }
        }

        if row_ok {
            summary.processed += 1;
        } else {
            summary.failed += 1;
        }
        info!("{}/{} processed", index + 1, total);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::recipient::RecipientName;
    use std::cell::RefCell;
    use std::path::Path;

    struct RecordingTransport {
        sent: RefCell<Vec<String>>,
        fail_for: Option<String>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
                fail_for: None,
            }
        }

        fn failing_for(email: &str) -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
                fail_for: Some(email.to_string()),
            }
        }
    }

    impl MailTransport for RecordingTransport {
        fn send_certificate(&self, recipient: &RecipientRow, _artifact: &Path) -> Result<()> {
            if self.fail_for.as_deref() == Some(recipient.email.as_str()) {
                return Err(Error::Transport("connection refused".into()));
            }
            self.sent.borrow_mut().push(recipient.email.clone());
            Ok(())
        }
    }

    fn row(given: &str, family: &str) -> RecipientRow {
        RecipientRow {
            name: RecipientName::new(given, family),
            email: format!("{}@example.org", given.to_lowercase()),
        }
    }

    fn render_ok(row: &RecipientRow) -> Result<PathBuf> {
        Ok(PathBuf::from(format!(
            "/tmp/{}.pdf",
            row.name.artifact_stem()
        )))
    }

    #[test]
    fn empty_roster_is_a_warned_no_op() {
        let cancel = AtomicBool::new(false);
        let summary = run(&[], render_ok, None, false, None, &cancel);
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn dry_run_never_touches_the_transport() {
        let rows = vec![row("Ada", "Lovelace"), row("Grace", "Hopper")];
        let transport = RecordingTransport::new();
        let cancel = AtomicBool::new(false);
        let summary = run(&rows, render_ok, Some(&transport), false, None, &cancel);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 0);
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn sends_follow_roster_order() {
        let rows = vec![
            row("Ada", "Lovelace"),
            row("Grace", "Hopper"),
            row("Edith", "Clarke"),
        ];
        let transport = RecordingTransport::new();
        let cancel = AtomicBool::new(false);
        let summary = run(&rows, render_ok, Some(&transport), true, None, &cancel);
        assert_eq!(summary.processed, 3);
        assert_eq!(
            *transport.sent.borrow(),
            vec![
                "ada@example.org".to_string(),
                "grace@example.org".to_string(),
                "edith@example.org".to_string(),
            ]
        );
    }

    #[test]
    fn render_failure_skips_the_row_and_continues() {
        let rows = vec![row("Ada", "Lovelace"), row("Grace", "Hopper")];
        let transport = RecordingTransport::new();
        let cancel = AtomicBool::new(false);
        let render = |row: &RecipientRow| {
            if row.name.given == "Ada" {
                Err(Error::Render("disk full".into()))
            } else {
                render_ok(row)
            }
        };
        let summary = run(&rows, render, Some(&transport), true, None, &cancel);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(*transport.sent.borrow(), vec!["grace@example.org"]);
    }

    #[test]
    fn transport_failure_marks_the_row_failed_but_continues() {
        let rows = vec![row("Ada", "Lovelace"), row("Grace", "Hopper")];
        let transport = RecordingTransport::failing_for("ada@example.org");
        let cancel = AtomicBool::new(false);
        let summary = run(&rows, render_ok, Some(&transport), true, None, &cancel);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(*transport.sent.borrow(), vec!["grace@example.org"]);
    }

    #[test]
    fn cancellation_stops_before_the_next_row() {
        let rows = vec![row("Ada", "Lovelace"), row("Grace", "Hopper")];
        let cancel = AtomicBool::new(false);
        let mut rendered = 0usize;
        let render = |row: &RecipientRow| {
            rendered += 1;
            cancel.store(true, Ordering::Relaxed);
            render_ok(row)
        };
        let summary = run(&rows, render, None, false, None, &cancel);
        assert_eq!(rendered, 1);
        assert_eq!(summary.processed, 1);
    }
}
