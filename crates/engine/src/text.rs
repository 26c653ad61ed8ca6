// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message text preparation.
//!
//! Quoted reply history must never feed entity extraction: a date inside
//! `> Event Date: 14.02.2026` is history, not a change request.

use regex::Regex;
use std::sync::OnceLock;

#[allow(clippy::unwrap_used)] // compile-time constant pattern
fn attribution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^on\s.{0,80}(wrote|schrieb|a écrit)\s*:\s*$").unwrap()
    })
}

/// Replace typographic quotes and dashes with their ASCII forms so keyword
/// matching sees one spelling.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect()
}

/// Strip quoted reply lines (`> …`) and attribution headers
/// ("On Tue, … wrote:"). Everything after the first attribution header is
/// treated as history.
pub fn strip_quoted(text: &str) -> String {
    let mut kept = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if attribution_re().is_match(trimmed) {
            break;
        }
        if trimmed.starts_with('>') {
            continue;
        }
        kept.push(line);
    }
    kept.join("\n").trim().to_string()
}

/// Full preparation pass: normalize then strip history.
pub fn prepare_body(body: &str) -> String {
    strip_quoted(&normalize_quotes(body))
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;
