//! Pipeline – ties layout, rendering, the output directory and print
//! dispatch together into the operations the command line exposes.

use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;

use crate::attendee::AttendeeRecord;
use crate::config::BadgeConfig;
use crate::error::BadgeResult;
use crate::geometry::BadgeGeometry;
use crate::layout::LayoutResult;
use crate::output::OutputDir;
use crate::print::{
    Platform, PrintAdapter, PrintDispatcher, PrintJobOutcome, PrinterDescriptor, SystemAdapter,
};
use crate::render::{DocumentRenderer, RenderedDocument};

const BADGE_PREFIX: &str = "badge";
const TEST_PAGE_PREFIX: &str = "test-ticket";

/// What a render or print request produced.
#[derive(Debug, Clone, Serialize)]
pub struct BadgeReceipt {
    pub ok: bool,
    pub printed: bool,
    pub pdf: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_job: Option<PrintJobOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_printer: Option<String>,
    /// Some field was cut behind a truncation marker.
    pub truncated: bool,
}

/// Current settings as reported by `health`.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub ok: bool,
    pub printer: String,
    pub output_dir: PathBuf,
    pub platform: Platform,
}

/// One configured renderer, output directory and dispatcher.
#[derive(Debug, Clone)]
pub struct BadgeService<A = SystemAdapter> {
    renderer: DocumentRenderer,
    output: OutputDir,
    dispatcher: PrintDispatcher<A>,
    config: BadgeConfig,
}

impl BadgeService<SystemAdapter> {
    /// Standard badge geometry and the adapter for this host.
    pub fn from_config(config: BadgeConfig) -> Self {
        Self::new(config, BadgeGeometry::standard(), SystemAdapter::detect())
    }
}

impl<A: PrintAdapter> BadgeService<A> {
    pub fn new(config: BadgeConfig, geometry: BadgeGeometry, adapter: A) -> Self {
        Self {
            renderer: DocumentRenderer::new(geometry),
            output: OutputDir::new(&config.output_dir),
            dispatcher: PrintDispatcher::new(adapter, &config),
            config,
        }
    }

    pub fn config(&self) -> &BadgeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &PrintDispatcher<A> {
        &self.dispatcher
    }

    pub fn health(&self) -> Health {
        Health {
            ok: true,
            printer: self.config.printer_name.clone(),
            output_dir: self.config.output_dir.clone(),
            platform: self.dispatcher.platform(),
        }
    }

    pub async fn list_printers(&self) -> BadgeResult<Vec<PrinterDescriptor>> {
        self.dispatcher.list_printers().await
    }

    /// Lay out, render and write a badge. Nothing is printed.
    pub fn render_to_disk(
        &self,
        attendee: &AttendeeRecord,
    ) -> BadgeResult<(RenderedDocument, LayoutResult)> {
        let layouts = LayoutResult::for_attendee(attendee, self.renderer.geometry());
        let mut doc = self.renderer.render(attendee, &layouts)?;
        self.output.write(BADGE_PREFIX, &mut doc)?;
        Ok((doc, layouts))
    }

    pub fn render_badge(&self, attendee: &AttendeeRecord) -> BadgeResult<BadgeReceipt> {
        let (doc, layouts) = self.render_to_disk(attendee)?;
        Ok(BadgeReceipt {
            ok: true,
            printed: false,
            pdf: written_path(&doc),
            print_job: None,
            target_printer: None,
            truncated: layouts.any_truncated(),
        })
    }

    /// Render, write and print a badge.
    ///
    /// `printer` overrides the configured printer. The printer is looked up
    /// once, before anything is rendered, so an unknown name leaves no file
    /// behind.
    pub async fn print_badge(
        &self,
        attendee: &AttendeeRecord,
        printer: Option<&str>,
    ) -> BadgeResult<BadgeReceipt> {
        let name = self.target_printer(printer)?;
        let printer = self.dispatcher.resolve_printer(&name).await?;

        let (doc, layouts) = self.render_to_disk(attendee)?;
        let pdf = written_path(&doc);
        let outcome = self.dispatcher.submit_resolved(doc, &printer).await?;
        Ok(BadgeReceipt {
            ok: true,
            printed: true,
            pdf,
            target_printer: Some(outcome.printer.clone()),
            print_job: Some(outcome),
            truncated: layouts.any_truncated(),
        })
    }

    /// Write a test page without printing it.
    pub fn write_test_page(&self) -> BadgeResult<BadgeReceipt> {
        let doc = self.test_page()?;
        Ok(BadgeReceipt {
            ok: true,
            printed: false,
            pdf: written_path(&doc),
            print_job: None,
            target_printer: None,
            truncated: false,
        })
    }

    /// Write a test page and send it to the printer.
    pub async fn print_test_page(&self, printer: Option<&str>) -> BadgeResult<BadgeReceipt> {
        let name = self.target_printer(printer)?;
        let printer = self.dispatcher.resolve_printer(&name).await?;

        let doc = self.test_page()?;
        let pdf = written_path(&doc);
        let outcome = self.dispatcher.submit_resolved(doc, &printer).await?;
        Ok(BadgeReceipt {
            ok: true,
            printed: true,
            pdf,
            target_printer: Some(outcome.printer.clone()),
            print_job: Some(outcome),
            truncated: false,
        })
    }

    fn test_page(&self) -> BadgeResult<RenderedDocument> {
        let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut doc = self.renderer.render_test_page(&generated_at);
        self.output.write(TEST_PAGE_PREFIX, &mut doc)?;
        Ok(doc)
    }

    fn target_printer(&self, requested: Option<&str>) -> BadgeResult<String> {
        match requested.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => Ok(p.to_string()),
            None => self.config.require_printer().map(str::to_string),
        }
    }
}

fn written_path(doc: &RenderedDocument) -> PathBuf {
    doc.path().map(PathBuf::from).unwrap_or_default()
}
