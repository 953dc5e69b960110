//! # Part splitter
//!
//! Cuts a question or a raw submission into ordered, trimmed, non-empty parts.
//!
//! Question text is split on line-leading enumeration markers (`P1:`,
//! `Part 2)`, `(a)`, `a)`, `Q3.`) first; text before the first marker is
//! preamble and blank lines inside the enumeration are ignored. Without at
//! least two markers, questions and submissions share the same rules, tried
//! in order until one produces more than one part:
//!
//! 1. separator lines (`---`, `###`, `===`) and page/file break markers,
//! 2. blank lines.
//!
//! Text with no detectable structure comes back as a single part, so
//! splitting that part again is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;
use util::grading::QuestionPart;

static SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*(?:-{3,}|#{3,}|={3,})[ \t]*$|^[ \t]*(?:-+[ \t]*)?(?:page|file)[ \t_]+break(?:[ \t]*-+)?[ \t]*$|-{3}[ \t]*(?:page|file)[ \t]+break[ \t]*-{3}|FILE_BREAK",
    )
    .unwrap()
});

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n)+").unwrap());

/// A bare number only counts as a marker when whitespace follows, so `3.14`
/// at the start of a line stays text.
static ENUM_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:part\s*\d+[:.)]|q\d+[:.)]|p\s?\d+[:.)]|\d+[:.)](?:\s|$)|\([a-z0-9]\)|[a-z]\))")
        .unwrap()
});

/// Which kind of text is being split. Only questions use enumeration markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Question,
    Submission,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PartSplitter;

impl PartSplitter {
    pub fn new() -> Self {
        Self
    }

    pub fn split(&self, text: &str, kind: TextKind) -> Vec<String> {
        let text = text.replace("\r\n", "\n");
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        if kind == TextKind::Question {
            if let Some(parts) = split_enumerated(&text) {
                return parts;
            }
        }

        match split_on(&SEPARATOR, &text).or_else(|| split_on(&BLANK_LINE, &text)) {
            Some(parts) if kind == TextKind::Question => {
                parts.iter().map(|p| strip_marker(p)).collect()
            }
            Some(parts) => parts,
            None => vec![trimmed.to_string()],
        }
    }

    pub fn split_question(&self, text: &str) -> Vec<QuestionPart> {
        self.split(text, TextKind::Question)
            .into_iter()
            .enumerate()
            .map(|(index, text)| QuestionPart { index, text })
            .collect()
    }

    pub fn split_submission(&self, text: &str) -> Vec<String> {
        self.split(text, TextKind::Submission)
    }
}

/// `Some` only when the split yields more than one non-empty part.
fn split_on(re: &Regex, text: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = re
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    (parts.len() > 1).then_some(parts)
}

fn strip_marker(part: &str) -> String {
    match ENUM_MARKER.find(part) {
        Some(m) => {
            let body = part[m.end()..].trim();
            if body.is_empty() {
                part.to_string()
            } else {
                body.to_string()
            }
        }
        None => part.to_string(),
    }
}

fn is_separator_line(line: &str) -> bool {
    SEPARATOR
        .find(line)
        .is_some_and(|m| line[..m.start()].trim().is_empty() && line[m.end()..].trim().is_empty())
}

/// Enumerated question parts. Text before the first marker is preamble and
/// is dropped; the lines of each part are joined with single spaces.
fn split_enumerated(text: &str) -> Option<Vec<String>> {
    let mut parts: Vec<Vec<&str>> = Vec::new();

    for line in text.lines() {
        if is_separator_line(line) {
            continue;
        }
        if let Some(m) = ENUM_MARKER.find(line) {
            parts.push(vec![line[m.end()..].trim()]);
        } else if let Some(current) = parts.last_mut() {
            current.push(line.trim());
        }
    }

    let parts: Vec<String> = parts
        .into_iter()
        .map(|lines| {
            lines
                .into_iter()
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|p| !p.is_empty())
        .collect();

    (parts.len() > 1).then_some(parts)
}
