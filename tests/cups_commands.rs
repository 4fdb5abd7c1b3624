//! CUPS adapter against shell-script stand-ins for `lp` and `lpstat`.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use badge_forge::output::OutputDir;
use badge_forge::print::{CupsAdapter, PrintDispatcher, PrinterDescriptor, PrinterStatus};
use badge_forge::render::DocumentRenderer;
use badge_forge::{AttendeeRecord, BadgeError};

const LPSTAT_OK: &str = r#"#!/bin/sh
[ "$1" = "-p" ] || { echo "unexpected args: $*" >&2; exit 2; }
echo "printer Front_Desk is idle.  enabled since Mon 06 Oct 2025 09:12:01"
echo "printer Old_Inkjet disabled since Fri 03 Oct 2025 16:40:11 -"
echo "	Paused"
"#;

const LPSTAT_NONE: &str = r#"#!/bin/sh
echo "lpstat: No destinations added." >&2
exit 1
"#;

const LPSTAT_BROKEN: &str = r#"#!/bin/sh
echo "lpstat: Unable to connect to server" >&2
exit 1
"#;

const LPSTAT_SLOW: &str = r#"#!/bin/sh
exec sleep 10
"#;

// Fails unless it is handed an existing PDF file.
const LP_OK: &str = r#"#!/bin/sh
[ "$1" = "-d" ] || { echo "unexpected args: $*" >&2; exit 2; }
[ -f "$3" ] || { echo "no such file: $3" >&2; exit 2; }
head -c 5 "$3" | grep -q '%PDF-' || { echo "not a pdf: $3" >&2; exit 2; }
echo "request id is $2-7 (1 file(s)) $3"
"#;

// Leaves a marker once it has "queued" the job, then never reports back.
const LP_SLOW: &str = r#"#!/bin/sh
touch "$3.queued"
exec sleep 10
"#;

const LP_FAIL: &str = r#"#!/bin/sh
echo "lp: The printer or class does not exist." >&2
exit 1
"#;

/// All stand-in scripts, written once before any test spawns a process.
fn bin_dir() -> &'static Path {
    static DIR: OnceLock<tempfile::TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [
            ("lpstat-ok", LPSTAT_OK),
            ("lpstat-none", LPSTAT_NONE),
            ("lpstat-broken", LPSTAT_BROKEN),
            ("lpstat-slow", LPSTAT_SLOW),
            ("lp-ok", LP_OK),
            ("lp-slow", LP_SLOW),
            ("lp-fail", LP_FAIL),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    })
    .path()
}

fn script(name: &str) -> PathBuf {
    bin_dir().join(name)
}

fn dispatcher(lp: &str, lpstat: &str) -> PrintDispatcher<CupsAdapter> {
    PrintDispatcher::with_timeouts(
        CupsAdapter::with_commands(script(lp), script(lpstat)),
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
}

fn attendee() -> AttendeeRecord {
    AttendeeRecord::new("A1-0245", "Jo", "Acme", "", "VIP")
}

#[tokio::test]
async fn lists_printers_with_status() {
    let printers = dispatcher("lp-ok", "lpstat-ok").list_printers().await.unwrap();
    assert_eq!(
        printers,
        vec![
            PrinterDescriptor::new("Front_Desk", PrinterStatus::Ready),
            PrinterDescriptor::new("Old_Inkjet", PrinterStatus::Offline),
        ]
    );
}

#[tokio::test]
async fn no_destinations_is_an_empty_list() {
    let printers = dispatcher("lp-ok", "lpstat-none").list_printers().await.unwrap();
    assert!(printers.is_empty());
}

#[tokio::test]
async fn lpstat_failure_is_an_enumeration_error() {
    let err = dispatcher("lp-ok", "lpstat-broken")
        .list_printers()
        .await
        .unwrap_err();
    match err {
        BadgeError::Enumeration(message) => {
            assert!(message.contains("Unable to connect"), "{message}")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_lpstat_is_reported() {
    let adapter = CupsAdapter::with_commands(script("missing-lp"), script("missing-lpstat"));
    let dispatcher =
        PrintDispatcher::with_timeouts(adapter, Duration::from_secs(5), Duration::from_secs(5));
    let err = dispatcher.list_printers().await.unwrap_err();
    assert!(err.to_string().contains("CUPS installed"), "{err}");
}

#[tokio::test]
async fn stalled_lpstat_times_out() {
    let dispatcher = PrintDispatcher::with_timeouts(
        CupsAdapter::with_commands(script("lp-ok"), script("lpstat-slow")),
        Duration::from_millis(200),
        Duration::from_secs(5),
    );
    let started = std::time::Instant::now();
    let err = dispatcher.list_printers().await.unwrap_err();
    assert!(matches!(err, BadgeError::Timeout { .. }), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn submits_the_written_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = DocumentRenderer::default().render_badge(&attendee()).unwrap();
    let path = OutputDir::new(dir.path()).write("badge", &mut doc).unwrap();

    let outcome = dispatcher("lp-ok", "lpstat-ok")
        .submit(doc, "Front Desk")
        .await
        .unwrap();
    assert_eq!(outcome.printer, "Front_Desk");
    assert_eq!(outcome.job_id.as_deref(), Some("Front_Desk-7"));
    assert!(outcome.raw.contains(&path.display().to_string()), "{}", outcome.raw);
    assert_eq!(outcome.document.as_deref(), Some(path.as_path()));
    assert!(!outcome.rotated);
}

#[tokio::test]
async fn stages_a_temporary_file_when_not_written() {
    let doc = DocumentRenderer::default().render_badge(&attendee()).unwrap();
    assert!(doc.path().is_none());
    let outcome = dispatcher("lp-ok", "lpstat-ok")
        .submit(doc, "Front_Desk")
        .await
        .unwrap();
    assert_eq!(outcome.job_id.as_deref(), Some("Front_Desk-7"));
    assert_eq!(outcome.document, None);
}

#[tokio::test]
async fn lp_failure_carries_its_message() {
    let doc = DocumentRenderer::default().render_badge(&attendee()).unwrap();
    let err = dispatcher("lp-fail", "lpstat-ok")
        .submit(doc, "Front_Desk")
        .await
        .unwrap_err();
    match err {
        BadgeError::PrintSubmissionFailed { printer, message } => {
            assert_eq!(printer, "Front_Desk");
            assert!(message.contains("does not exist"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn stalled_lp_times_out_without_recalling_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = DocumentRenderer::default().render_badge(&attendee()).unwrap();
    let path = OutputDir::new(dir.path()).write("badge", &mut doc).unwrap();

    let dispatcher = PrintDispatcher::with_timeouts(
        CupsAdapter::with_commands(script("lp-slow"), script("lpstat-ok")),
        Duration::from_secs(5),
        Duration::from_millis(500),
    );
    let started = std::time::Instant::now();
    let err = dispatcher.submit(doc, "Front_Desk").await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    match &err {
        BadgeError::Timeout { operation, after } => {
            assert!(operation.contains("Front_Desk"), "{operation}");
            assert_eq!(*after, Duration::from_millis(500));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("may still have been queued"), "{err}");

    // lp got as far as taking the job before the caller gave up on it.
    let mut marker = path.into_os_string();
    marker.push(".queued");
    assert!(Path::new(&marker).exists());
}

#[tokio::test]
async fn missing_lp_is_reported() {
    let doc = DocumentRenderer::default().render_badge(&attendee()).unwrap();
    let adapter = CupsAdapter::with_commands(script("missing-lp"), script("lpstat-ok"));
    let dispatcher =
        PrintDispatcher::with_timeouts(adapter, Duration::from_secs(5), Duration::from_secs(5));
    let err = dispatcher.submit(doc, "Front_Desk").await.unwrap_err();
    assert!(matches!(err, BadgeError::PrintSubmissionFailed { .. }), "{err}");
    assert!(err.to_string().contains("CUPS installed"), "{err}");
}
