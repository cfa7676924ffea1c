// src/pipeline/sourcemap.rs

//! Revision 3 source maps with line-level mappings.

use serde::{Deserialize, Serialize};

/// Source map attached to a [`FileRecord`](super::FileRecord).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    /// Name of the generated file.
    pub file: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Map for a file produced by joining `inputs` with `"\n"`, in order.
    ///
    /// `inputs` are `(source name, content)` pairs. Every generated line
    /// maps to column 0 of the input line it came from.
    pub fn for_concatenation(file: impl Into<String>, inputs: &[(String, String)]) -> Self {
        let mut mappings = String::new();
        let mut prev_source: i64 = 0;
        let mut prev_line: i64 = 0;
        let mut first_line = true;

        for (index, (_, content)) in inputs.iter().enumerate() {
            let index = index as i64;
            for line in 0..content.split('\n').count() as i64 {
                if !first_line {
                    mappings.push(';');
                }
                first_line = false;

                // [generated column, source index, source line, source column]
                encode_vlq(&mut mappings, 0);
                encode_vlq(&mut mappings, index - prev_source);
                encode_vlq(&mut mappings, line - prev_line);
                encode_vlq(&mut mappings, 0);

                prev_source = index;
                prev_line = line;
            }
        }

        Self {
            version: 3,
            file: file.into(),
            sources: inputs.iter().map(|(name, _)| name.clone()).collect(),
            sources_content: inputs.iter().map(|(_, content)| content.clone()).collect(),
            names: Vec::new(),
            mappings,
        }
    }
}

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Append `value` as a base64 VLQ.
pub fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq: u64 = if value < 0 {
        ((value.unsigned_abs()) << 1) | 1
    } else {
        (value as u64) << 1
    };

    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}
