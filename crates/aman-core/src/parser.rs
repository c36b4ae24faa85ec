//! Heuristic parser for the autodoc text format.
//!
//! An autodoc file looks like this (`^L` is a form feed):
//!
//! ```text
//! TABLE OF CONTENTS
//!
//! dos.library/Close
//! dos.library/Open
//! ^Ldos.library/Close                                     dos.library/Close
//!
//!    NAME
//!         Close -- Close an open file
//!
//!    SEE ALSO
//!         Open()
//! ^Ldos.library/Open                                       dos.library/Open
//! ...
//! ^L
//! ```
//!
//! The table of contents declares the page order, every page block starts
//! with a form feed followed by its title, and a lone form feed ends the
//! file. Inside a page, upper-case lines indented by three or four columns
//! start a new section.

use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::ParseError;
use crate::types::{Book, PREAMBLE, Page, split_title};
use crate::{Error, Result};

/// Literal first line of every autodoc file.
pub const TOC_HEADER: &str = "TABLE OF CONTENTS";

const FORM_FEED: char = '\x0c';
const TAB_EXPANSION: &str = "    ";
const HEADER_INDENTS: std::ops::RangeInclusive<usize> = 3..=4;

/// Decode ISO-8859-1 bytes; every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Parser turning autodoc text into a [`Book`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AutodocParser;

impl AutodocParser {
    /// Create a parser.
    pub const fn new() -> Self {
        Self
    }

    /// Read, decode and parse an autodoc file.
    ///
    /// I/O failures surface as [`Error::Io`], format problems as
    /// [`Error::Parse`] naming the file.
    pub fn parse_file(&self, path: &Path) -> Result<Book> {
        let start = Instant::now();
        let bytes = fs::read(path)?;
        let book = self
            .parse_bytes(&bytes)
            .map_err(|source| Error::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            "parsed '{}': {} pages in {:.6}s",
            path.display(),
            book.num_pages(),
            start.elapsed().as_secs_f64()
        );
        Ok(book)
    }

    /// Parse raw Latin-1 encoded autodoc content.
    pub fn parse_bytes(&self, bytes: &[u8]) -> std::result::Result<Book, ParseError> {
        self.parse(&decode_latin1(bytes))
    }

    /// Parse decoded autodoc text.
    ///
    /// Lines may end in `\n`, `\r\n` or `\r`. Section content is built from
    /// the lines without their terminators, while [`Page::raw_page`] keeps the
    /// page body exactly as it appears in `text`.
    pub fn parse(&self, text: &str) -> std::result::Result<Book, ParseError> {
        let (starts, lines): (Vec<usize>, Vec<&str>) = split_lines(text).into_iter().unzip();

        if lines.first().copied() != Some(TOC_HEADER) {
            return Err(ParseError::MissingTocHeader);
        }

        let (toc, mut pos) = read_toc(&lines)?;

        let mut book = Book::default();
        let mut next_entry = 0;
        loop {
            let Some(line) = lines.get(pos) else {
                return Err(ParseError::MissingEofMarker);
            };
            // `pos` always sits on a form-feed line here
            let raw_title = &line[FORM_FEED.len_utf8()..];
            if raw_title.is_empty() {
                break;
            }

            let Some(&expected) = toc.get(next_entry) else {
                return Err(ParseError::TocPageMismatch {
                    expected: "<end of table of contents>".to_string(),
                    found: raw_title.to_string(),
                });
            };
            // Page headers often repeat the title or carry annotations after it.
            if !raw_title.starts_with(expected) {
                return Err(ParseError::TocPageMismatch {
                    expected: expected.to_string(),
                    found: raw_title.to_string(),
                });
            }
            next_entry += 1;
            pos += 1;

            let body_start = pos;
            while pos < lines.len() && !lines[pos].starts_with(FORM_FEED) {
                pos += 1;
            }
            let raw = if pos > body_start {
                &text[starts[body_start]..starts[pos - 1] + lines[pos - 1].len()]
            } else {
                ""
            };
            let page = parse_page(expected, &lines[body_start..pos], raw);
            debug!(
                "page '{}' with {} sections",
                page.title(),
                page.section_names().len()
            );
            book.push_page(page);
        }

        if next_entry < toc.len() {
            warn!(
                "{} table of contents entries have no page, first is '{}'",
                toc.len() - next_entry,
                toc[next_entry]
            );
        }

        Ok(book.finish())
    }
}

/// Collect the table of contents. Returns the entries and the index of the
/// form-feed line that terminates them.
fn read_toc<'a>(lines: &[&'a str]) -> std::result::Result<(Vec<&'a str>, usize), ParseError> {
    let mut toc: Vec<&str> = Vec::new();
    let mut pos = 2;
    loop {
        let Some(&line) = lines.get(pos) else {
            return Err(ParseError::MalformedToc(
                "no form feed after the table of contents".to_string(),
            ));
        };
        if line.starts_with(FORM_FEED) {
            break;
        }
        if line.trim().is_empty() {
            return Err(ParseError::MalformedToc(format!(
                "empty entry on line {}",
                pos + 1
            )));
        }
        if split_title(line).is_none() {
            return Err(ParseError::InvalidTitle(line.to_string()));
        }
        if toc.contains(&line) {
            return Err(ParseError::MalformedToc(format!("duplicate entry '{line}'")));
        }
        toc.push(line);
        pos += 1;
    }

    if toc.is_empty() {
        return Err(ParseError::MalformedToc("no entries".to_string()));
    }
    Ok((toc, pos))
}

/// Split `text` into lines with their byte offsets. The last line is the
/// text after the final terminator, possibly empty.
fn split_lines(text: &str) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\n' => {
                lines.push((start, &text[start..pos]));
                pos += 1;
                start = pos;
            },
            b'\r' => {
                lines.push((start, &text[start..pos]));
                pos += if bytes.get(pos + 1) == Some(&b'\n') { 2 } else { 1 };
                start = pos;
            },
            _ => pos += 1,
        }
    }
    lines.push((start, &text[start..]));
    lines
}

fn parse_page(title: &str, lines: &[&str], raw_page: &str) -> Page {
    let mut page = Page::new(title, raw_page);

    let mut sec_name = PREAMBLE.to_string();
    let mut sec_lines: Vec<String> = Vec::new();
    let mut header_indent: Option<usize> = None;

    for raw in lines {
        let line = raw.replace('\t', TAB_EXPANSION);
        let indent = leading_spaces(&line);
        match section_header(&line, indent) {
            Some(header) if header_indent.is_none_or(|locked| locked == indent) => {
                if header_indent.is_none() {
                    debug!("section indent={indent}");
                    header_indent = Some(indent);
                }
                add_section(&mut page, std::mem::replace(&mut sec_name, header), &mut sec_lines);
            },
            Some(header) => {
                // Numbered or indented lists look like headers at another indent.
                debug!("no section header: '{header}'");
                sec_lines.push(line);
            },
            None => sec_lines.push(line),
        }
    }
    add_section(&mut page, sec_name, &mut sec_lines);

    page
}

fn add_section(page: &mut Page, name: String, lines: &mut Vec<String>) {
    let lines = deindent(trim_blank_lines(std::mem::take(lines)));
    if lines.is_empty() && name != PREAMBLE {
        debug!("drop empty section '{name}'");
        return;
    }
    debug!("add section '{name}' with {} lines", lines.len());
    page.push_section(name, lines);
}

/// Return the section name if `line` is a section header at `indent`.
fn section_header(line: &str, indent: usize) -> Option<String> {
    if !HEADER_INDENTS.contains(&indent) {
        return None;
    }
    let heading = &line[indent..];
    let mut letters = heading.chars().filter(|&c| c != ' ').peekable();
    letters.peek()?;
    if letters.all(|c| c.is_alphabetic() && !c.is_lowercase()) {
        Some(heading.trim_end().to_string())
    } else {
        None
    }
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn trim_blank_lines(mut lines: Vec<String>) -> Vec<String> {
    while lines.last().is_some_and(|line| is_blank(line)) {
        lines.pop();
    }
    let first = lines
        .iter()
        .position(|line| !is_blank(line))
        .unwrap_or(lines.len());
    lines.drain(..first);
    lines
}

/// Strip the common leading indent of all non-blank lines. Blank lines
/// become empty strings.
pub(crate) fn deindent(lines: Vec<String>) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|line| !is_blank(line))
        .map(|line| leading_spaces(line))
        .min()
        .unwrap_or(0);
    lines
        .into_iter()
        .map(|line| {
            if is_blank(&line) {
                String::new()
            } else {
                line[indent..].to_string()
            }
        })
        .collect()
}
