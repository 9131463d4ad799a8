//! Structured JSON-lines logging for governance passes.
//!
//! One line per event on stderr: level- and domain-filterable via
//! `LOG_LEVEL` / `LOG_DOMAINS`, with a monotonic sequence number so a run's
//! events can be replayed in order. The audit artifact itself is the
//! RunRecord; these lines are operational telemetry.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

/// Engine stages, for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogDomain {
    Observation,
    Simulation,
    Governance,
    Lock,
    Audit,
    System,
}

impl LogDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogDomain::Observation => "observation",
            LogDomain::Simulation => "simulation",
            LogDomain::Governance => "governance",
            LogDomain::Lock => "lock",
            LogDomain::Audit => "audit",
            LogDomain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list, or "all" (the default).
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// RFC3339 timestamp with milliseconds.
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit one structured line. Dropped silently when below the configured
/// level or outside the enabled domains.
pub fn log(level: Level, domain: LogDomain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("seq".to_string(), json!(LOG_SEQ.fetch_add(1, Ordering::SeqCst)));
    entry.insert("lvl".to_string(), json!(level.as_str()));
    entry.insert("domain".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("data".to_string(), Value::Object(fields));
    eprintln!("{}", Value::Object(entry));
}

/// Field-map shorthand used at call sites.
pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}
