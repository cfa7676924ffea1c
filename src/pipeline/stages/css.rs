// src/pipeline/stages/css.rs

//! CSS stages backed by lightningcss.

use std::collections::BTreeMap;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use tracing::debug;

use crate::errors::{Result, StageError, TaskpipeError};
use crate::pipeline::{FileRecord, Stage, StageFuture};

/// Browsers prefixed for when `autoprefix` lists none: old IE, Safari 5,
/// Opera 12.1, iOS 6, Android 4.
pub fn default_browsers() -> Browsers {
    Browsers {
        android: Some(encode_version(4, 0, 0)),
        ie: Some(encode_version(8, 0, 0)),
        ios_saf: Some(encode_version(6, 0, 0)),
        opera: Some(encode_version(12, 1, 0)),
        safari: Some(encode_version(5, 0, 0)),
        ..Browsers::default()
    }
}

/// lightningcss packs versions as `major << 16 | minor << 8 | patch`.
fn encode_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 16) | (minor << 8) | patch
}

fn parse_version(browser: &str, version: &str) -> Result<u32> {
    let mut parts = version.trim().split('.');
    let mut next = |required: bool| -> Result<u32> {
        match parts.next() {
            Some(p) => p.parse::<u32>().map_err(|_| {
                TaskpipeError::ConfigError(format!(
                    "autoprefix: invalid version {version:?} for {browser}"
                ))
            }),
            None if required => Err(TaskpipeError::ConfigError(format!(
                "autoprefix: missing version for {browser}"
            ))),
            None => Ok(0),
        }
    };
    let major = next(true)?;
    let minor = next(false)?;
    let patch = next(false)?;
    Ok(encode_version(major, minor, patch))
}

/// Build lightningcss targets from `{ chrome = "100", safari = "15.4" }`.
pub fn browsers_from_config(browsers: &BTreeMap<String, String>) -> Result<Browsers> {
    if browsers.is_empty() {
        return Ok(default_browsers());
    }

    let mut out = Browsers::default();
    for (name, version) in browsers {
        let v = Some(parse_version(name, version)?);
        match name.to_ascii_lowercase().as_str() {
            "android" => out.android = v,
            "chrome" => out.chrome = v,
            "edge" => out.edge = v,
            "firefox" | "ff" => out.firefox = v,
            "ie" => out.ie = v,
            "ios" | "ios_saf" => out.ios_saf = v,
            "opera" => out.opera = v,
            "safari" => out.safari = v,
            "samsung" => out.samsung = v,
            other => {
                return Err(TaskpipeError::ConfigError(format!(
                    "autoprefix: unknown browser {other:?}"
                )));
            }
        }
    }
    Ok(out)
}

/// Parse, optimise for `targets` and print one stylesheet.
fn transform_css(
    stage: &str,
    record: &FileRecord,
    targets: Targets,
    minify: bool,
) -> std::result::Result<String, StageError> {
    let code = record.text(stage)?;
    let filename = record.path().to_string_lossy().into_owned();
    let fail = |what: &str, err: String| {
        StageError::failed(stage, format!("{what} {filename}: {err}"))
    };

    let mut sheet = StyleSheet::parse(
        code,
        ParserOptions {
            filename: filename.clone(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| fail("parsing", e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| fail("optimising", e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| fail("printing", e.to_string()))?;

    Ok(printed.code)
}

/// Run `transform_css` over the batch on the blocking pool.
async fn transform_all(
    stage: &'static str,
    records: Vec<FileRecord>,
    targets: Targets,
    minify: bool,
) -> std::result::Result<Vec<FileRecord>, StageError> {
    tokio::task::spawn_blocking(move || {
        records
            .into_iter()
            .map(|mut record| {
                let css = transform_css(stage, &record, targets, minify)?;
                debug!(
                    stage,
                    file = %record.path().display(),
                    before = record.contents.len(),
                    after = css.len(),
                    "css transformed"
                );
                record.contents = css.into_bytes();
                record.source_map = None;
                Ok(record)
            })
            .collect()
    })
    .await
    .map_err(|e| StageError::failed(stage, e))?
}

/// Adds the vendor prefixes the configured browsers need. Output stays
/// readable (not minified).
#[derive(Debug, Clone)]
pub struct AutoprefixStage {
    browsers: Browsers,
}

impl AutoprefixStage {
    pub fn new(browsers: Browsers) -> Self {
        Self { browsers }
    }
}

impl Stage for AutoprefixStage {
    fn name(&self) -> &str {
        "autoprefix"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        let targets = Targets::from(self.browsers);
        Box::pin(transform_all("autoprefix", records, targets, false))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MinifyCssStage;

impl Stage for MinifyCssStage {
    fn name(&self) -> &str {
        "minify-css"
    }

    fn apply<'a>(&'a self, records: Vec<FileRecord>) -> StageFuture<'a> {
        Box::pin(transform_all("minify-css", records, Targets::default(), true))
    }
}
