// src/pipeline/source.rs

//! Turning `src` globs into file records.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::fs::FileSystem;
use crate::pipeline::FileRecord;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Literal directory prefix of a glob: every path component before the
/// first one containing a glob meta character. For a pattern without meta
/// characters this is the parent directory.
///
/// `app/scss/*.scss` -> `app/scss`, `app/js/**/*.js` -> `app/js`,
/// `spec/scss/test.scss` -> `spec/scss`, `*.css` -> ``.
pub fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').collect();
    let literal = parts
        .iter()
        .position(|part| part.contains(GLOB_META))
        .unwrap_or(parts.len().saturating_sub(1));

    parts[..literal]
        .iter()
        .filter(|p| !p.is_empty() && **p != ".")
        .collect::<PathBuf>()
}

/// Glob for `src` matching: `*` and `?` never cross a `/`.
pub fn compile_src_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid src glob: {pattern}"))?;
    Ok(glob.compile_matcher())
}

pub fn compile_exclude_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid exclude glob: {pat}"))?;
        builder.add(glob);
    }
    Ok(Some(builder.build()?))
}

/// Read every file matching `src` (minus `exclude`) into records.
///
/// Records come out grouped by pattern in the order the patterns are
/// listed, sorted by path within a pattern. A file matched by several
/// patterns appears once, with the base of the first pattern that matched.
pub fn collect_sources(
    fs: &dyn FileSystem,
    root: &Path,
    src: &[String],
    exclude: &[String],
) -> Result<Vec<FileRecord>> {
    let exclude_set = compile_exclude_set(exclude)?;
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut records = Vec::new();

    for pattern in src {
        let pattern = pattern.trim_start_matches("./");
        let matcher = compile_src_glob(pattern)?;
        let base = glob_base(pattern);

        let mut matched: Vec<PathBuf> = walk_files(fs, root, &base)?
            .into_iter()
            .filter(|rel| {
                let rel_str = to_slash(rel);
                matcher.is_match(&rel_str)
                    && !exclude_set.as_ref().is_some_and(|ex| ex.is_match(&rel_str))
            })
            .collect();
        matched.sort();

        debug!(pattern, base = %base.display(), matched = matched.len(), "matched src glob");

        for rel in matched {
            if !seen.insert(rel.clone()) {
                continue;
            }
            let contents = fs.read(&root.join(&rel))?;
            let relative = rel
                .strip_prefix(&base)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| rel.clone());
            records.push(FileRecord::new(base.clone(), relative, contents));
        }
    }

    Ok(records)
}

/// All files below `root/start`, as paths relative to `root`.
pub(crate) fn walk_files(fs: &dyn FileSystem, root: &Path, start: &Path) -> Result<Vec<PathBuf>> {
    let start_abs = root.join(start);
    if fs.is_file(&start_abs) {
        return Ok(vec![start.to_path_buf()]);
    }
    if !fs.is_dir(&start_abs) {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut stack = vec![start_abs];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    files.push(normalize(rel));
                }
            }
        }
    }

    Ok(files)
}

/// Drop `.` components so `./app/x` and `app/x` compare equal.
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
