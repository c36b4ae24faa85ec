//! # Output Formatting
//!
//! Pages render as plain text (default), bold-headed colored text, the raw
//! autodoc page or pretty-printed JSON. The rendered text goes to a file, a
//! pager or stdout, in that order of preference.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use aman_core::{Page, PageRef};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use is_terminal::IsTerminal;
use serde::Serialize;
use tracing::debug;

/// Indentation of section bodies in text output.
const BODY_INDENT: &str = "    ";

/// Output format for pages and page lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Man page style text (default)
    Text,
    /// Text with bold title and section headers
    Color,
    /// Title followed by the unmodified autodoc page
    Raw,
    /// Pretty-printed JSON
    Json,
}

#[derive(Serialize)]
struct PageJson<'a> {
    title: &'a str,
    toc: &'a [String],
    sections: serde_json::Map<String, serde_json::Value>,
}

impl<'a> From<&'a Page> for PageJson<'a> {
    fn from(page: &'a Page) -> Self {
        let sections = page
            .section_names()
            .iter()
            .map(|name| {
                let lines = page.section(name).unwrap_or_default();
                (name.clone(), serde_json::Value::from(lines.to_vec()))
            })
            .collect();
        Self {
            title: page.title(),
            toc: page.section_names(),
            sections,
        }
    }
}

/// Render one page.
pub fn render_page(page: &Page, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(page, false)),
        OutputFormat::Color => Ok(render_text(page, true)),
        OutputFormat::Raw => Ok(format!("{}\n{}\n", page.title(), page.raw_page())),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&PageJson::from(page))?;
            json.push('\n');
            Ok(json)
        },
    }
}

/// Render several pages one after another. A single page renders exactly
/// like [`render_page`].
pub fn render_pages(pages: &[&Page], format: OutputFormat) -> Result<String> {
    if let [page] = pages {
        return render_page(page, format);
    }
    if format == OutputFormat::Json {
        let all: Vec<PageJson<'_>> = pages.iter().map(|&page| PageJson::from(page)).collect();
        let mut json = serde_json::to_string_pretty(&all)?;
        json.push('\n');
        return Ok(json);
    }
    let rendered = pages
        .iter()
        .map(|page| render_page(page, format))
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join("\n"))
}

/// Render the titles of matching pages, one per line.
pub fn render_list(page_refs: &[PageRef], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        let mut json = serde_json::to_string_pretty(page_refs)?;
        json.push('\n');
        return Ok(json);
    }
    Ok(page_refs
        .iter()
        .map(|page_ref| format!("{}\n", page_ref.page_title))
        .collect())
}

fn render_text(page: &Page, color: bool) -> String {
    let mut out = String::new();
    push_heading(&mut out, page.title(), color);
    out.push('\n');

    let preamble = page.preamble();
    if !preamble.is_empty() {
        push_body(&mut out, preamble);
        out.push('\n');
    }
    for (name, lines) in page.sections() {
        push_heading(&mut out, name, color);
        push_body(&mut out, lines);
        out.push('\n');
    }
    out
}

fn push_heading(out: &mut String, text: &str, color: bool) {
    if color {
        out.push_str(&text.bold().to_string());
    } else {
        out.push_str(text);
    }
    out.push('\n');
}

fn push_body(out: &mut String, lines: &[String]) {
    for line in lines {
        if !line.is_empty() {
            out.push_str(BODY_INDENT);
            out.push_str(line);
        }
        out.push('\n');
    }
}

/// Write `text` to `output` if given, else through `pager` when stdout is a
/// terminal, else to stdout.
pub fn emit(text: &str, output: Option<&Path>, pager: Option<&str>) -> Result<()> {
    if let Some(path) = output {
        fs::write(path, text)
            .with_context(|| format!("Failed to write output to '{}'", path.display()))?;
        debug!("wrote output to '{}'", path.display());
        return Ok(());
    }

    if let Some(pager) = pager.filter(|_| io::stdout().is_terminal()) {
        return page_through(text, pager);
    }

    let mut stdout = io::stdout().lock();
    match stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other.context("Failed to write to stdout"),
    }
}

fn page_through(text: &str, pager: &str) -> Result<()> {
    let mut words = pager.split_whitespace();
    let Some(program) = words.next() else {
        bail!("empty pager command");
    };
    debug!("paging through '{pager}'");

    let mut child = Command::new(program)
        .args(words)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to start pager '{pager}'"))?;
    if let Some(mut stdin) = child.stdin.take() {
        // the pager may quit before reading everything
        if let Err(e) = stdin.write_all(text.as_bytes()) {
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(e).context("Failed to write to pager");
            }
        }
    }
    child.wait().context("Pager failed")?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use aman_core::AutodocParser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const DOC: &str = "TABLE OF CONTENTS\n\ndos/Open\n\
        \x0cdos/Open\n  internal note\n   NAME\n\tOpen -- open a file\n   FUNCTION\n\tOpens.\n\n\t  Really.\n\x0c\n";

    fn with_page<R>(f: impl FnOnce(&Page) -> R) -> R {
        let book = AutodocParser::new().parse(DOC).unwrap();
        f(book.page("dos/Open").unwrap())
    }

    #[test]
    fn test_text_format() {
        let text = with_page(|page| render_page(page, OutputFormat::Text).unwrap());
        assert_eq!(
            text,
            "dos/Open\n\n    internal note\n\nNAME\n    Open -- open a file\n\n\
             FUNCTION\n    Opens.\n\n      Really.\n\n"
        );
    }

    #[test]
    fn test_raw_format() {
        let text = with_page(|page| render_page(page, OutputFormat::Raw).unwrap());
        assert!(text.starts_with("dos/Open\n  internal note\n   NAME\n\tOpen"));
    }

    #[test]
    fn test_json_format() {
        let text = with_page(|page| render_page(page, OutputFormat::Json).unwrap());
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["title"], "dos/Open");
        assert_eq!(json["toc"], serde_json::json!(["", "NAME", "FUNCTION"]));
        assert_eq!(json["sections"]["NAME"][0], "Open -- open a file");
    }

    #[test]
    fn test_color_format_keeps_text() {
        colored::control::set_override(true);
        let text = with_page(|page| render_page(page, OutputFormat::Color).unwrap());
        assert!(text.contains("\u{1b}[1mNAME\u{1b}[0m"));
        assert!(text.contains("    Open -- open a file"));
    }

    #[test]
    fn test_list_format() {
        let refs = vec![
            PageRef::new("dos", "dos/Close"),
            PageRef::new("file", "file/Close"),
        ];
        assert_eq!(
            render_list(&refs, OutputFormat::Text).unwrap(),
            "dos/Close\nfile/Close\n"
        );
        let json: serde_json::Value =
            serde_json::from_str(&render_list(&refs, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json[1]["doc_name"], "file");
    }

    #[test]
    fn test_emit_to_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("page.txt");

        emit("hello\n", Some(&path), Some("definitely-not-a-pager")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
