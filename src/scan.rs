//! Line scanner for the loosely structured markdown agents write.
//!
//! The grammar is deliberately small:
//!
//! - A *fence* line is one whose trimmed text starts with three backticks.
//!   An opening fence may carry an info string (` ```yaml `); only a bare
//!   fence closes a block, so a ` ```python ` line inside a YAML block is body
//!   text. An unclosed block runs to the end of the input.
//! - A *marker* is a section label found at the start of a line (indentation
//!   allowed) outside any fenced block. The first occurrence wins.
//! - A *bullet* is `-` or `*`, at least one whitespace character, then content.
//!
//! All offsets are byte offsets into the scanned text.

const FENCE: &str = "```";

/// One line of input with its byte span (line terminator excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub start: usize,
    pub end: usize,
    /// Offset of the following line (past the terminator).
    pub next: usize,
    pub text: &'a str,
}

/// Iterate over lines, keeping byte offsets. Handles `\n` and `\r\n`.
pub fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let body = raw
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(raw);
        Line {
            start,
            end: start + body.len(),
            next: offset,
            text: body,
        }
    })
}

/// A fenced code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    /// Offset of the opening fence line.
    pub start: usize,
    /// Offset just past the closing fence line (or end of text).
    pub end: usize,
    /// Info string after the opening fence, trimmed (e.g. `yaml`).
    pub info: &'a str,
    /// Text between the fences.
    pub body: &'a str,
}

impl FencedBlock<'_> {
    /// Whether the info string names YAML.
    pub fn is_yaml(&self) -> bool {
        self.info.eq_ignore_ascii_case("yaml") || self.info.eq_ignore_ascii_case("yml")
    }

    /// Whether `offset` falls inside this block, fences included.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Find every fenced block in `text`, in order.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    // (fence line start, info, body start)
    let mut open: Option<(usize, &str, usize)> = None;

    for line in lines(text) {
        let trimmed = line.text.trim();
        let Some(rest) = trimmed.strip_prefix(FENCE) else {
            continue;
        };
        match open {
            None => open = Some((line.start, rest.trim(), line.next)),
            Some((start, info, body_start)) if rest.trim().is_empty() => {
                let body_end = line.start.max(body_start);
                blocks.push(FencedBlock {
                    start,
                    end: line.next,
                    info,
                    body: text[body_start..body_end].trim_end_matches(['\n', '\r']),
                });
                open = None;
            }
            Some(_) => {}
        }
    }

    if let Some((start, info, body_start)) = open {
        blocks.push(FencedBlock {
            start,
            end: text.len(),
            info,
            body: &text[body_start..],
        });
    }

    blocks
}

/// First fenced YAML block in `text`.
pub fn first_yaml_block(text: &str) -> Option<FencedBlock<'_>> {
    fenced_blocks(text).into_iter().find(FencedBlock::is_yaml)
}

/// Last fenced YAML block in `text`.
pub fn last_yaml_block(text: &str) -> Option<FencedBlock<'_>> {
    fenced_blocks(text).into_iter().rev().find(FencedBlock::is_yaml)
}

/// Location of a section marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    /// Offset of the start of the marker line.
    pub line_start: usize,
    /// Offset just past the marker label; the section body starts here.
    pub body_start: usize,
}

/// Locate the first occurrence of each label, returned in `labels` order.
///
/// When several labels match the same line the longest one claims it.
pub fn find_markers(text: &str, labels: &[&str]) -> Vec<Option<Marker>> {
    let mut found: Vec<Option<Marker>> = vec![None; labels.len()];
    let mut in_fence = false;

    for line in lines(text) {
        let trimmed = line.text.trim_start();
        if let Some(rest) = trimmed.strip_prefix(FENCE) {
            // Same open/close rule as `fenced_blocks`.
            if !in_fence {
                in_fence = true;
            } else if rest.trim().is_empty() {
                in_fence = false;
            }
            continue;
        }
        if in_fence {
            continue;
        }

        let best = labels
            .iter()
            .enumerate()
            .filter(|(i, label)| found[*i].is_none() && trimmed.starts_with(**label))
            .max_by_key(|(_, label)| label.len());

        if let Some((i, label)) = best {
            let indent = line.text.len() - trimmed.len();
            found[i] = Some(Marker {
                line_start: line.start,
                body_start: line.start + indent + label.len(),
            });
        }
    }

    found
}

/// Content of a bullet line, trimmed; `None` if the line is not a bullet or is empty.
pub fn bullet_content(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let content = rest.trim();
    (!content.is_empty()).then_some(content)
}
