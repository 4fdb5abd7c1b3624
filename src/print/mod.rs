//! Print dispatch – hands a rendered badge to the host's print subsystem.
//!
//! Two mechanisms exist and exactly one is used per process:
//!
//! - **Spooler** (Windows): the page is drawn into a printer device context
//!   through GDI. This path prints pages upside-down relative to our page
//!   convention, so documents are turned 180° first. Printer names match
//!   exactly, case included.
//! - **Cups** (Linux, macOS, BSD): the document is written to a file and
//!   passed to `lp -d <printer>`. Orientation is already correct. CUPS queue
//!   names cannot contain whitespace, so whitespace in a requested name is
//!   replaced by `_` before the exact match.
//!
//! Every call that crosses into the OS runs under a deadline.

pub mod cups;
pub mod gdi;
pub mod spooler;

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Serialize;

use crate::config::BadgeConfig;
use crate::error::{BadgeError, BadgeResult};
use crate::render::RenderedDocument;

pub use cups::CupsAdapter;
pub use spooler::SpoolerAdapter;

/// Availability reported by the print subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrinterStatus {
    Ready,
    Offline,
    Unknown,
}

/// A printer as enumerated by the OS. `name` is the exact string the
/// subsystem expects back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrinterDescriptor {
    pub name: String,
    pub status: PrinterStatus,
}

impl PrinterDescriptor {
    pub fn new(name: impl Into<String>, status: PrinterStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// The print mechanism available on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Spooler,
    Cups,
}

static DETECTED: OnceLock<Platform> = OnceLock::new();

impl Platform {
    /// Detected once per process; later calls return the cached answer.
    pub fn detect() -> Platform {
        *DETECTED.get_or_init(|| {
            let platform = if cfg!(windows) {
                Platform::Spooler
            } else {
                Platform::Cups
            };
            log::debug!("print platform: {platform:?}");
            platform
        })
    }

    /// Whether documents must be turned 180° before submission.
    pub fn needs_rotation(self) -> bool {
        matches!(self, Platform::Spooler)
    }

    /// The form a requested printer name must take to match an enumerated
    /// one on this platform.
    pub fn normalize_printer_name(self, name: &str) -> String {
        match self {
            Platform::Spooler => name.to_string(),
            Platform::Cups => name
                .chars()
                .map(|c| if c.is_whitespace() { '_' } else { c })
                .collect(),
        }
    }
}

/// Where a submission is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Created,
    PlatformSelected,
    DocumentPrepared,
    Submitted,
    Acknowledged,
    Failed,
}

/// One document on its way to one printer. Lives for a single dispatch.
#[derive(Debug)]
pub struct PrintJob {
    pub document: RenderedDocument,
    pub printer: String,
    /// The document was turned 180° for this platform.
    pub rotated: bool,
    state: JobState,
}

impl PrintJob {
    fn new(document: RenderedDocument, printer: &str) -> Self {
        Self {
            document,
            printer: printer.to_string(),
            rotated: false,
            state: JobState::Created,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn advance(&mut self, next: JobState) {
        log::debug!(
            "job {} -> '{}': {:?} -> {:?}",
            self.document.ticket_id,
            self.printer,
            self.state,
            next
        );
        self.state = next;
    }
}

/// What the platform mechanism reported for an accepted job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub job_id: Option<String>,
    pub raw: String,
}

/// Result of a completed dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintJobOutcome {
    pub printer: String,
    pub job_id: Option<String>,
    pub raw: String,
    pub rotated: bool,
    pub state: JobState,
    /// The on-disk copy of the document, if one was written.
    pub document: Option<PathBuf>,
}

/// A platform print mechanism.
#[allow(async_fn_in_trait)]
pub trait PrintAdapter {
    fn platform(&self) -> Platform;

    /// Query the print subsystem for its printers.
    async fn list_printers(&self) -> BadgeResult<Vec<PrinterDescriptor>>;

    /// Hand `job.document` to `job.printer`.
    async fn submit(&self, job: &PrintJob) -> BadgeResult<Submission>;
}

/// The adapter for the running host, picked by [`Platform::detect`].
#[derive(Debug, Clone)]
pub enum SystemAdapter {
    Spooler(SpoolerAdapter),
    Cups(CupsAdapter),
}

impl SystemAdapter {
    pub fn detect() -> Self {
        match Platform::detect() {
            Platform::Spooler => SystemAdapter::Spooler(SpoolerAdapter),
            Platform::Cups => SystemAdapter::Cups(CupsAdapter::default()),
        }
    }
}

impl PrintAdapter for SystemAdapter {
    fn platform(&self) -> Platform {
        match self {
            SystemAdapter::Spooler(a) => a.platform(),
            SystemAdapter::Cups(a) => a.platform(),
        }
    }

    async fn list_printers(&self) -> BadgeResult<Vec<PrinterDescriptor>> {
        match self {
            SystemAdapter::Spooler(a) => a.list_printers().await,
            SystemAdapter::Cups(a) => a.list_printers().await,
        }
    }

    async fn submit(&self, job: &PrintJob) -> BadgeResult<Submission> {
        match self {
            SystemAdapter::Spooler(a) => a.submit(job).await,
            SystemAdapter::Cups(a) => a.submit(job).await,
        }
    }
}

/// Enumerates printers and submits documents through one adapter, with
/// bounded waits on both.
#[derive(Debug, Clone)]
pub struct PrintDispatcher<A = SystemAdapter> {
    adapter: A,
    list_timeout: Duration,
    submit_timeout: Duration,
}

impl PrintDispatcher<SystemAdapter> {
    /// Dispatcher for this host with the configured timeouts.
    pub fn from_config(config: &BadgeConfig) -> Self {
        Self::new(SystemAdapter::detect(), config)
    }
}

impl<A: PrintAdapter> PrintDispatcher<A> {
    pub fn new(adapter: A, config: &BadgeConfig) -> Self {
        Self::with_timeouts(adapter, config.list_timeout, config.submit_timeout)
    }

    pub fn with_timeouts(adapter: A, list_timeout: Duration, submit_timeout: Duration) -> Self {
        Self {
            adapter,
            list_timeout,
            submit_timeout,
        }
    }

    pub fn platform(&self) -> Platform {
        self.adapter.platform()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Enumerate printers. Never waits longer than the list timeout.
    pub async fn list_printers(&self) -> BadgeResult<Vec<PrinterDescriptor>> {
        tokio::time::timeout(self.list_timeout, self.adapter.list_printers())
            .await
            .map_err(|_| BadgeError::Timeout {
                operation: "printer enumeration".to_string(),
                after: self.list_timeout,
            })?
    }

    /// Find `name` among the current printers using the platform's matching
    /// rule. There is no fallback to a default printer.
    pub async fn resolve_printer(&self, name: &str) -> BadgeResult<PrinterDescriptor> {
        let wanted = self.platform().normalize_printer_name(name);
        let printer = self
            .list_printers()
            .await?
            .into_iter()
            .find(|p| p.name == wanted)
            .ok_or_else(|| BadgeError::PrinterNotFound {
                name: name.to_string(),
            })?;
        if printer.status == PrinterStatus::Offline {
            log::warn!("Printer '{}' reports offline", printer.name);
        }
        Ok(printer)
    }

    /// Send `document` to `printer_name`.
    ///
    /// The document is consumed; its file, if any, stays behind as an audit
    /// copy and is reported in the outcome.
    ///
    /// A [`BadgeError::Timeout`] here means the caller stopped waiting, not
    /// that the job was withdrawn: a queued `lp` job or a spooler document
    /// still being drawn is not recalled and may still print.
    pub async fn submit(
        &self,
        document: RenderedDocument,
        printer_name: &str,
    ) -> BadgeResult<PrintJobOutcome> {
        let mut job = PrintJob::new(document, printer_name);
        job.advance(JobState::PlatformSelected);
        match self.resolve_printer(printer_name).await {
            Ok(printer) => self.dispatch(job, printer).await,
            Err(e) => {
                job.advance(JobState::Failed);
                Err(e)
            }
        }
    }

    /// [`submit`](Self::submit) to a printer already found by
    /// [`resolve_printer`](Self::resolve_printer), without enumerating again.
    pub async fn submit_resolved(
        &self,
        document: RenderedDocument,
        printer: &PrinterDescriptor,
    ) -> BadgeResult<PrintJobOutcome> {
        let mut job = PrintJob::new(document, &printer.name);
        job.advance(JobState::PlatformSelected);
        self.dispatch(job, printer.clone()).await
    }

    async fn dispatch(
        &self,
        mut job: PrintJob,
        printer: PrinterDescriptor,
    ) -> BadgeResult<PrintJobOutcome> {
        job.printer = printer.name;

        let audit_copy = job.document.path.clone();
        if self.platform().needs_rotation() {
            job.document = job.document.rotated_180();
            job.rotated = true;
        }
        job.advance(JobState::DocumentPrepared);

        job.advance(JobState::Submitted);
        let result = tokio::time::timeout(self.submit_timeout, self.adapter.submit(&job))
            .await
            .map_err(|_| BadgeError::Timeout {
                operation: format!(
                    "submission to '{}' (the job may still have been queued)",
                    job.printer
                ),
                after: self.submit_timeout,
            })
            .and_then(|r| r);

        match result {
            Ok(submission) => {
                job.advance(JobState::Acknowledged);
                log::info!(
                    "Printer '{}' accepted job {}",
                    job.printer,
                    submission.job_id.as_deref().unwrap_or("(no id)")
                );
                Ok(PrintJobOutcome {
                    printer: job.printer,
                    job_id: submission.job_id,
                    raw: submission.raw,
                    rotated: job.rotated,
                    state: JobState::Acknowledged,
                    document: audit_copy,
                })
            }
            Err(e) => {
                job.advance(JobState::Failed);
                if matches!(e, BadgeError::Timeout { .. }) {
                    log::warn!("Gave up waiting on '{}'; the job may still print", job.printer);
                }
                Err(e)
            }
        }
    }
}
