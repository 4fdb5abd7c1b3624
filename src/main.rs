//! badge-forge – render attendee badges and send them to a printer.
//!
//! Usage:
//!   badge-forge health
//!   badge-forge printers
//!   badge-forge render  (--sample extreme | --payload ticket.json | --ticket-id A1 --name "Jo" ...)
//!   badge-forge print   [--printer "Front Desk"] <attendee flags>
//!   badge-forge test-page [--print]
//!
//! Settings come from `.env` and the environment (`PRINTER_NAME`,
//! `OUTPUT_DIR`, `BADGE_LIST_TIMEOUT_SECS`, `BADGE_SUBMIT_TIMEOUT_SECS`);
//! flags override them. Results are printed to stdout as JSON.

use std::path::PathBuf;
use std::process;

use badge_forge::samples::{self, SAMPLE_NAMES};
use badge_forge::{AttendeeRecord, BadgeConfig, BadgeError, BadgeResult, BadgeService};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(
    name = "badge-forge",
    about = "Event badge rendering and printing",
    version
)]
struct Cli {
    /// Printer to use instead of PRINTER_NAME.
    #[arg(long, global = true, value_name = "NAME")]
    printer: Option<String>,

    /// Directory badges are written to instead of OUTPUT_DIR.
    #[arg(long, global = true, value_name = "PATH")]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the configured printer and output directory.
    Health,
    /// List printers known to the OS print subsystem.
    Printers,
    /// Render a badge to the output directory without printing.
    Render(AttendeeArgs),
    /// Render a badge and send it to the printer.
    Print(AttendeeArgs),
    /// Write a test page, and print it with --print.
    TestPage {
        #[arg(long)]
        print: bool,
    },
}

#[derive(Args)]
struct AttendeeArgs {
    /// JSON file with ticket_id, name, company, title, ticket_type.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["sample", "ticket_id"])]
    payload: Option<PathBuf>,

    /// One of the built-in preview attendees.
    #[arg(long, value_parser = SAMPLE_NAMES, conflicts_with = "ticket_id")]
    sample: Option<String>,

    #[arg(long)]
    ticket_id: Option<String>,
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    company: String,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "Delegate")]
    ticket_type: String,
}

impl AttendeeArgs {
    fn attendee(&self) -> BadgeResult<AttendeeRecord> {
        if let Some(path) = &self.payload {
            let json = std::fs::read_to_string(path).map_err(|source| BadgeError::Filesystem {
                path: path.clone(),
                source,
            })?;
            return AttendeeRecord::from_json(&json).map_err(|e| match e {
                BadgeError::InvalidPayload(m) => {
                    BadgeError::InvalidPayload(format!("{}: {m}", path.display()))
                }
                other => other,
            });
        }
        if let Some(name) = &self.sample {
            return samples::by_name(name)
                .ok_or_else(|| BadgeError::InvalidConfig(format!("unknown sample '{name}'")));
        }
        match &self.ticket_id {
            Some(id) => Ok(AttendeeRecord::new(
                id.as_str(),
                self.name.as_str(),
                self.company.as_str(),
                self.title.as_str(),
                self.ticket_type.as_str(),
            )),
            None => Err(BadgeError::InvalidConfig(
                "one of --payload, --sample or --ticket-id is required".to_string(),
            )),
        }
    }
}

async fn run(cli: Cli) -> BadgeResult<Value> {
    let mut config = BadgeConfig::from_env()?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    let service = BadgeService::from_config(config);
    let printer = cli.printer.as_deref();

    let value = match cli.command {
        Command::Health => to_json(&service.health()),
        Command::Printers => json!({ "ok": true, "printers": service.list_printers().await? }),
        Command::Render(args) => to_json(&service.render_badge(&args.attendee()?)?),
        Command::Print(args) => to_json(&service.print_badge(&args.attendee()?, printer).await?),
        Command::TestPage { print: false } => to_json(&service.write_test_page()?),
        Command::TestPage { print: true } => to_json(&service.print_test_page(printer).await?),
    };
    Ok(value)
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "ok": false, "error": e.to_string() }))
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(value) => println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
        ),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
