// src/pipeline/stages/pxrem.rs

//! rem -> px fallbacks for browsers without rem support.

use regex::{Captures, Regex};
use tracing::debug;

use crate::errors::{Result, StageError, TaskpipeError};
use crate::pipeline::{FileRecord, Stage, StageFuture};

/// Browser default root font size.
const BROWSER_ROOT_PX: f64 = 16.0;

/// Parse a root font size: `"100%"` (16px), `"62.5%"` (10px), `"16px"` or a
/// bare number of pixels.
pub fn parse_root_value(value: &str) -> Result<f64> {
    let value = value.trim();
    let invalid = || TaskpipeError::ConfigError(format!("pxrem: invalid root_value {value:?}"));

    let px = if let Some(pct) = value.strip_suffix('%') {
        pct.trim().parse::<f64>().map_err(|_| invalid())? / 100.0 * BROWSER_ROOT_PX
    } else if let Some(px) = value.strip_suffix("px") {
        px.trim().parse::<f64>().map_err(|_| invalid())?
    } else {
        value.parse::<f64>().map_err(|_| invalid())?
    };

    if px <= 0.0 || !px.is_finite() {
        return Err(invalid());
    }
    Ok(px)
}

/// Replaces rem lengths with px (`replace = true`) or inserts a px
/// declaration in front of every declaration using rem.
#[derive(Debug, Clone)]
pub struct PxremStage {
    root_px: f64,
    replace: bool,
    declaration: Regex,
    rem: Regex,
}

impl PxremStage {
    pub fn new(root_value: &str, replace: bool) -> Result<Self> {
        Ok(Self {
            root_px: parse_root_value(root_value)?,
            replace,
            declaration: Regex::new(r"([A-Za-z-]+)\s*:\s*([^;{}]+)(;|\})")
                .map_err(anyhow::Error::from)?,
            rem: Regex::new(r"(-?\d*\.?\d+)rem\b").map_err(anyhow::Error::from)?,
        })
    }

    /// Rewrite one stylesheet.
    pub fn convert(&self, css: &str) -> String {
        self.declaration
            .replace_all(css, |caps: &Captures| {
                let (Some(whole), Some(value)) = (caps.get(0), caps.get(2)) else {
                    return String::new();
                };
                if !self.rem.is_match(value.as_str()) {
                    return whole.as_str().to_string();
                }

                let px_value = self.rem.replace_all(value.as_str(), |c: &Captures| {
                    let rem: f64 = c[1].parse().unwrap_or(0.0);
                    format!("{}px", format_number(rem * self.root_px))
                });

                let head = &css[whole.start()..value.start()];
                let tail = &css[value.end()..whole.end()];
                if self.replace {
                    format!("{head}{px_value}{tail}")
                } else {
                    format!("{head}{px_value};{}", whole.as_str())
                }
            })
            .into_owned()
    }
}

/// At most four decimals, no trailing zeros.
fn format_number(v: f64) -> String {
    let rounded = (v * 10_000.0).round() / 10_000.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

impl Stage for PxremStage {
    fn name(&self) -> &str {
        "pxrem"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(async move {
            records
                .into_iter()
                .map(|mut record| {
                    let converted = self.convert(record.text(self.name())?);
                    debug!(file = %record.path().display(), "pxrem applied");
                    record.contents = converted.into_bytes();
                    record.source_map = None;
                    Ok(record)
                })
                .collect::<std::result::Result<Vec<_>, StageError>>()
        })
    }
}
