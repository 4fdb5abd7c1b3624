//! CUPS print path: `lpstat -p` for enumeration, `lp -d` for submission.

use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::process::Output;

use tokio::process::Command;

use super::{Platform, PrintAdapter, PrintJob, PrinterDescriptor, PrinterStatus, Submission};
use crate::error::{BadgeError, BadgeResult};

/// Runs the CUPS command-line tools. The program names can be swapped for
/// tests or non-standard installs.
#[derive(Debug, Clone)]
pub struct CupsAdapter {
    lp: OsString,
    lpstat: OsString,
}

impl Default for CupsAdapter {
    fn default() -> Self {
        Self {
            lp: "lp".into(),
            lpstat: "lpstat".into(),
        }
    }
}

impl CupsAdapter {
    pub fn with_commands(lp: impl Into<OsString>, lpstat: impl Into<OsString>) -> Self {
        Self {
            lp: lp.into(),
            lpstat: lpstat.into(),
        }
    }
}

/// Run a CUPS tool with a fixed locale so its output parses. The child is
/// killed if the caller stops waiting.
async fn run(program: &OsStr, args: &[&OsStr]) -> std::io::Result<Output> {
    Command::new(program)
        .args(args)
        .env("LC_ALL", "C")
        .kill_on_drop(true)
        .output()
        .await
}

fn stderr_or_stdout(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    }
}

/// Parse `lpstat -p` output into printer descriptors.
///
/// ```text
/// printer Office_Laser is idle.  enabled since Mon 06 Oct 2025 09:12:01
/// printer Label_P422T now printing Label_P422T-17.  enabled since ...
/// printer Old_Inkjet disabled since Fri 03 Oct 2025 16:40:11 -
///         Paused
/// ```
pub fn parse_lpstat(output: &str) -> Vec<PrinterDescriptor> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("printer ")?;
            let (name, state) = rest.split_once(' ').unwrap_or((rest, ""));
            let status = if state.contains("disabled") {
                PrinterStatus::Offline
            } else if state.starts_with("is idle") || state.starts_with("now printing") {
                PrinterStatus::Ready
            } else {
                PrinterStatus::Unknown
            };
            Some(PrinterDescriptor::new(name, status))
        })
        .collect()
}

/// Pull the job id out of `lp` output: `request id is Office-42 (1 file(s))`.
pub fn parse_request_id(output: &str) -> Option<String> {
    let (_, rest) = output.split_once("request id is ")?;
    rest.split_whitespace().next().map(str::to_string)
}

impl PrintAdapter for CupsAdapter {
    fn platform(&self) -> Platform {
        Platform::Cups
    }

    async fn list_printers(&self) -> BadgeResult<Vec<PrinterDescriptor>> {
        let output = run(&self.lpstat, &[OsStr::new("-p")]).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BadgeError::Enumeration("The 'lpstat' command was not found. Is CUPS installed?".to_string())
            } else {
                BadgeError::Enumeration(e.to_string())
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let message = stderr_or_stdout(&output);
            // lpstat exits non-zero when no queue exists at all.
            if message.contains("No destinations added") {
                return Ok(Vec::new());
            }
            return Err(BadgeError::Enumeration(format!(
                "lpstat exited with {}: {message}",
                output.status
            )));
        }
        Ok(parse_lpstat(&stdout))
    }

    async fn submit(&self, job: &PrintJob) -> BadgeResult<Submission> {
        // lp reads from a file; use the audit copy or stage a temporary one
        // that lives until lp returns.
        let staged;
        let path = match job.document.path() {
            Some(p) => p.to_path_buf(),
            None => {
                let mut tmp = tempfile::Builder::new()
                    .prefix("badge-")
                    .suffix(".pdf")
                    .tempfile()
                    .map_err(|e| BadgeError::filesystem(std::env::temp_dir(), e))?;
                tmp.write_all(&job.document.bytes)
                    .and_then(|_| tmp.flush())
                    .map_err(|e| BadgeError::filesystem(tmp.path(), e))?;
                let path = tmp.path().to_path_buf();
                staged = tmp;
                log::debug!("staged '{}' for lp", staged.path().display());
                path
            }
        };

        let output = run(
            &self.lp,
            &[OsStr::new("-d"), OsStr::new(&job.printer), path.as_os_str()],
        )
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BadgeError::submission(&job.printer, "The 'lp' command was not found. Is CUPS installed?")
            } else {
                BadgeError::submission(&job.printer, e.to_string())
            }
        })?;

        if !output.status.success() {
            return Err(BadgeError::submission(
                &job.printer,
                format!("lp exited with {}: {}", output.status, stderr_or_stdout(&output)),
            ));
        }

        let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Submission {
            job_id: parse_request_id(&raw).or_else(|| (!raw.is_empty()).then(|| raw.clone())),
            raw,
        })
    }
}
