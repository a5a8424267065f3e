//! Progress heuristics over the untyped `details` payload.
//!
//! Each heuristic either recognizes the payload and produces an [`Estimate`],
//! or misses. A missing or mistyped field is always a miss, never an error.
//! Heuristics are evaluated in order and the first hit wins.

use serde_json::{Map, Value};

/// A progress estimate derived from one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    pub percent: u8,
    pub completed: u64,
    pub total: u64,
}

impl Estimate {
    pub const ZERO: Estimate = Estimate {
        percent: 0,
        completed: 0,
        total: 0,
    };

    /// Estimate from a completed/total ratio; `None` when `total` is not positive.
    pub fn from_ratio(completed: f64, total: f64) -> Option<Self> {
        if !(total > 0.0) || !completed.is_finite() || !total.is_finite() {
            return None;
        }
        Some(Self {
            percent: ratio_percent(completed, total),
            completed: completed.max(0.0).round() as u64,
            total: total.round() as u64,
        })
    }

    /// Estimate carrying only a percent (units expressed out of 100).
    pub fn from_percent(percent: u8) -> Self {
        Self {
            percent,
            completed: u64::from(percent),
            total: 100,
        }
    }
}

/// `round(completed / total * 100)` clamped into `0..=100`.
pub fn ratio_percent(completed: f64, total: f64) -> u8 {
    clamp_percent(completed / total * 100.0)
}

pub fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// One rule of the heuristic chain.
pub trait Heuristic: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, details: &Map<String, Value>) -> Option<Estimate>;
}

fn number(details: &Map<String, Value>, key: &str) -> Option<f64> {
    details.get(key).and_then(Value::as_f64).filter(|n| n.is_finite())
}

/// `details.progress_percent`, used verbatim when it is a number.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitPercent;

impl Heuristic for ExplicitPercent {
    fn name(&self) -> &'static str {
        "explicit_percent"
    }

    fn evaluate(&self, details: &Map<String, Value>) -> Option<Estimate> {
        number(details, "progress_percent").map(|p| Estimate::from_percent(clamp_percent(p)))
    }
}

/// How the numerator of a [`RatioField`] is read.
#[derive(Debug, Clone, Copy)]
pub enum Numerator {
    /// A single numeric key.
    Key(&'static str),
    /// The first of these keys that holds a number.
    FirstOf(&'static [&'static str]),
    /// A zero-based index; the item being worked on counts as reached.
    IndexPlusOne(&'static str),
    /// Sum of the keys that hold numbers; at least one must be present.
    SumOf(&'static [&'static str]),
    /// Length of an array.
    ArrayLen(&'static str),
}

impl Numerator {
    fn read(&self, details: &Map<String, Value>) -> Option<f64> {
        match self {
            Numerator::Key(key) => number(details, key),
            Numerator::FirstOf(keys) => keys.iter().find_map(|k| number(details, k)),
            Numerator::IndexPlusOne(key) => number(details, key).map(|i| i + 1.0),
            Numerator::SumOf(keys) => {
                let present: Vec<f64> = keys.iter().filter_map(|k| number(details, k)).collect();
                (!present.is_empty()).then(|| present.iter().sum())
            }
            Numerator::ArrayLen(key) => details
                .get(*key)
                .and_then(Value::as_array)
                .map(|items| items.len() as f64),
        }
    }
}

/// A `numerator / denominator` pair of keys known for a family of job types.
#[derive(Debug, Clone, Copy)]
pub struct RatioField {
    pub name: &'static str,
    pub numerator: Numerator,
    pub denominator: &'static str,
}

impl Heuristic for RatioField {
    fn name(&self) -> &'static str {
        self.name
    }

    fn evaluate(&self, details: &Map<String, Value>) -> Option<Estimate> {
        let total = number(details, self.denominator)?;
        let done = self.numerator.read(details)?;
        Estimate::from_ratio(done, total)
    }
}

/// Ratio rules in priority order.
pub const RATIO_FIELDS: &[RatioField] = &[
    RatioField {
        name: "vcenter_vms",
        numerator: Numerator::Key("vms_processed"),
        denominator: "vms_total",
    },
    RatioField {
        name: "discovery_ips",
        numerator: Numerator::Key("ips_scanned"),
        denominator: "ips_total",
    },
    RatioField {
        name: "host_sync",
        numerator: Numerator::FirstOf(&["hosts_processed", "hosts_synced"]),
        denominator: "hosts_total",
    },
    RatioField {
        name: "multi_server_index",
        numerator: Numerator::IndexPlusOne("current_server_index"),
        denominator: "total_servers",
    },
    RatioField {
        name: "health_counts",
        numerator: Numerator::SumOf(&["success_count", "failed_count"]),
        denominator: "total_servers",
    },
    RatioField {
        name: "health_results",
        numerator: Numerator::ArrayLen("results"),
        denominator: "total_servers",
    },
];

/// The full chain: explicit signal first, then the ratio rules.
pub fn default_chain() -> Vec<Box<dyn Heuristic>> {
    let mut chain: Vec<Box<dyn Heuristic>> = vec![Box::new(ExplicitPercent)];
    chain.extend(
        RATIO_FIELDS
            .iter()
            .map(|rule| Box::new(*rule) as Box<dyn Heuristic>),
    );
    chain
}

/// First hit of `chain` against `details`, with the rule's name.
pub fn evaluate_chain(
    chain: &[Box<dyn Heuristic>],
    details: &Map<String, Value>,
) -> Option<(&'static str, Estimate)> {
    chain
        .iter()
        .find_map(|h| h.evaluate(details).map(|estimate| (h.name(), estimate)))
}
