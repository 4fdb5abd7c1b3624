//! Sample attendees for previewing layouts without a real payload.
//!
//! Each one stresses the adaptive layout differently, from names that fit at
//! the largest size to text that has to be truncated.

use crate::attendee::AttendeeRecord;

/// Names accepted by [`by_name`].
pub const SAMPLE_NAMES: [&str; 4] = ["short", "medium", "long", "extreme"];

/// Everything fits at the largest size.
pub fn short() -> AttendeeRecord {
    AttendeeRecord::new(
        "TEST-004",
        "Fiona Tan",
        "Jesselton Pixel",
        "Software Engineer",
        "Delegate",
    )
}

/// Company and ticket type need a smaller size or a second line.
pub fn medium() -> AttendeeRecord {
    AttendeeRecord::new(
        "TEST-003",
        "Andy Lee Chen Hiung",
        "UMS Faculty of Business Economics and Accountancy",
        "Director of Accounting Centre",
        "INVITED DELEGATE",
    )
}

/// Realistic long titles.
pub fn long() -> AttendeeRecord {
    AttendeeRecord::new(
        "TEST-002",
        "Rosnih Binti Othman",
        "SABAH MAJU JAYA SEKRETARIAT",
        "PENGARAH SEKRETARIAT SABAH MAJU JAYA, JABATAN KETUA MENTERI SABAH",
        "VIP",
    )
}

/// Long enough everywhere that at least one field is truncated.
pub fn extreme() -> AttendeeRecord {
    AttendeeRecord::new(
        "TEST-001",
        "Associate Professor Dr. Chin Pei Yee",
        "UMS INDUSTRY & COMMUNITY NETWORK",
        "DEPUTY DIRECTOR, CENTRE FOR INDUSTRIAL COLLABORATION AND ENGAGEMENT",
        "VIP",
    )
}

pub fn by_name(name: &str) -> Option<AttendeeRecord> {
    match name.to_ascii_lowercase().as_str() {
        "short" => Some(short()),
        "medium" => Some(medium()),
        "long" => Some(long()),
        "extreme" => Some(extreme()),
        _ => None,
    }
}

/// All samples with their names, shortest first.
pub fn all() -> Vec<(&'static str, AttendeeRecord)> {
    SAMPLE_NAMES
        .iter()
        .filter_map(|n| by_name(n).map(|a| (*n, a)))
        .collect()
}
