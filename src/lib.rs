//! # badge-forge – attendee badges from record to printer
//!
//! This crate turns an attendee record into a printed event badge. The
//! stages are:
//!
//! 1. **Layout** – fit each text field into its box by stepping down a
//!    font-size ladder and word-wrapping ([`layout`])
//! 2. **Render** – draw the fields, static artwork and the ticket QR code
//!    into a one-page PDF via printpdf ([`render`])
//! 3. **Write** – persist the document under the output directory without
//!    ever exposing a partial file ([`output`])
//! 4. **Print** – hand the document to the Windows spooler or to CUPS,
//!    whichever the host has ([`print`])
//!
//! [`pipeline::BadgeService`] runs the stages in order for the command-line
//! front end.

pub mod attendee;
pub mod config;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod print;
pub mod render;
pub mod samples;

// Re-exports for convenience
pub use attendee::AttendeeRecord;
pub use config::BadgeConfig;
pub use error::{BadgeError, BadgeResult};
pub use geometry::BadgeGeometry;
pub use layout::{compute_layout, FieldLayout, LayoutResult};
pub use pipeline::{BadgeReceipt, BadgeService};
pub use print::{Platform, PrintAdapter, PrintDispatcher, PrinterDescriptor, SystemAdapter};
pub use render::{DocumentRenderer, RenderedDocument};
