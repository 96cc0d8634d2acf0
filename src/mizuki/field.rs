use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;

/// A raw field value as stored in a profile
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl From<String> for FieldValue {
    fn from(s: String) -> FieldValue {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> FieldValue {
        FieldValue::Flag(b)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FieldValue::Text(ref s) => write!(f, "{}", s),
            FieldValue::Flag(b) => write!(f, "{}", if b { "on" } else { "off" }),
        }
    }
}

/// Conversion back out of a `FieldValue` into the typed record field
pub trait FieldType: Sized {
    fn from_field(value: FieldValue) -> Option<Self>;
}

impl FieldType for String {
    fn from_field(value: FieldValue) -> Option<String> {
        match value {
            FieldValue::Text(s) => Some(s),
            FieldValue::Flag(_) => None,
        }
    }
}

impl FieldType for bool {
    fn from_field(value: FieldValue) -> Option<bool> {
        match value {
            FieldValue::Flag(b) => Some(b),
            FieldValue::Text(_) => None,
        }
    }
}

/// Editor section a field is listed under
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Schedule,
    Daily,
    Extra,
    FaultTolerance,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "{}",
               match *self {
                   Section::Schedule => "Schedule",
                   Section::Daily => "Daily",
                   Section::Extra => "Extra",
                   Section::FaultTolerance => "Fault tolerance",
               })
    }
}

// stored indices are positional and shared with the job runner, so slot 3
// keeps repeating Wed
pub const WEEKDAYS: &[&str] = &["Mon", "Tue", "Wed", "Wed", "Thu", "Fri", "Sat", "Sun"];
pub const DORM_ITEMS: &[&str] = &["visit", "collect", "shift", "boost", "assist", "clues"];
pub const RECRUIT_TIERS: &[&str] = &["6star", "5star", "4star", "robot", "normal"];

/// Number of entries in a drug-day list (the enable switch plus seven day buckets)
pub const DRUG_DAY_SLOTS: usize = 8;

/// How a field's value is presented and edited
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Toggle,
    Date,
    Choice(&'static [&'static str]),
    DrugDay,
    Fight,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match *self {
            FieldKind::Text => "text",
            FieldKind::Toggle => "toggle",
            FieldKind::Date => "date",
            FieldKind::Choice(_) => "choice",
            FieldKind::DrugDay => "drug-day",
            FieldKind::Fight => "fight",
        }
    }

    /// parse user input for this kind into a storable value
    pub fn parse(&self, input: &str) -> Option<FieldValue> {
        match *self {
            FieldKind::Toggle => parse_switch(input).map(FieldValue::Flag),
            _ => Some(FieldValue::Text(input.to_string())),
        }
    }

    /// human readable form of a value, never modifies what is stored
    pub fn render(&self, value: &FieldValue, today: NaiveDate) -> String {
        let raw = match *value {
            FieldValue::Flag(b) => return if b { "on".to_string() } else { "off".to_string() },
            FieldValue::Text(ref s) => s,
        };
        match *self {
            FieldKind::Text | FieldKind::Toggle => raw.clone(),
            FieldKind::Date => format!("{} onward", start_date(raw, today)),
            FieldKind::Choice(choices) => {
                let picked = choice_indices(raw, choices.len());
                if picked.is_empty() {
                    "none".to_string()
                } else {
                    picked.iter().map(|&i| choices[i]).collect::<Vec<_>>().join(" ")
                }
            }
            FieldKind::DrugDay => {
                let days = drug_days(raw);
                if days[0] == 1 {
                    days[1..].iter().map(|d| d.to_string()).collect::<Vec<_>>().join(" ")
                } else {
                    "no auto-use".to_string()
                }
            }
            FieldKind::Fight => {
                if raw.is_empty() {
                    "none".to_string()
                } else {
                    raw.clone()
                }
            }
        }
    }
}

/// accepts the usual spellings of a switch position
pub fn parse_switch(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "y" | "1" => Some(true),
        "off" | "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// valid, de-duplicated and ascending indices into a choice list
pub fn choice_indices(raw: &str, len: usize) -> BTreeSet<usize> {
    raw.split_whitespace()
       .filter_map(|t| t.parse::<usize>().ok())
       .filter(|&i| i < len)
       .collect()
}

/// normalized storage form of picked choice indices
pub fn join_choices(picked: &[usize], len: usize) -> String {
    let set: BTreeSet<usize> = picked.iter().copied().filter(|&i| i < len).collect();
    set.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" ")
}

/// drug-day entries padded with zeros or truncated to `DRUG_DAY_SLOTS`
pub fn drug_days(raw: &str) -> Vec<u32> {
    let mut days: Vec<u32> = raw.split_whitespace()
                                .filter_map(|t| t.parse::<u32>().ok())
                                .collect();
    days.resize(DRUG_DAY_SLOTS, 0);
    days
}

/// stored start date, clamped so the past (or garbage) shows as today
pub fn start_date(raw: &str, today: NaiveDate) -> NaiveDate {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(d) if d >= today => d,
        _ => today,
    }
}

/// Descriptor of one overridable field
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub section: Section,
    /// toggle field that must resolve to `on` for this field to be shown
    pub gate: Option<&'static str>,
}

/// Descriptor of a field without override semantics
#[derive(Clone, Copy, Debug)]
pub struct PlainSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}
