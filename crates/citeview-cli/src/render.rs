//! Plain-text rendering of answers, sources, cards and tool progress.

use citeview_core::citations::CitationIndex;
use citeview_core::citations::ResolvedSegment;
use citeview_core::components::display_value;
use citeview_core::components::UiComponent;
use citeview_core::contracts::DocumentMetadata;
use citeview_core::contracts::PageContent;
use citeview_core::segment::segment_content;
use citeview_core::state::Citation;
use citeview_core::state::Message;
use citeview_core::state::Role;
use citeview_core::state::ToolCall;
use citeview_core::state::ToolStatus;
use citeview_core::transcript::TranscriptRecord;
use citeview_core::viewer::display_name;
use citeview_core::viewer::DocumentRequest;

const PROGRESS_WIDTH: usize = 20;
const PREVIEW_LINES: usize = 8;

pub fn tool_line(call: &ToolCall) -> String {
    let marker = match call.status {
        ToolStatus::Running => "…",
        ToolStatus::Completed => "✓",
        ToolStatus::Error => "✗",
    };
    match &call.message {
        Some(message) => format!("{marker} {}: {message}", call.tool),
        None => format!("{marker} {} {}", call.tool, call.status.label()),
    }
}

pub fn citation_line(citation: &Citation) -> String {
    let mut line = format!(
        "[{}] {}, page {}",
        citation.id,
        display_name(&citation.document),
        citation.page
    );
    if let Some(score) = citation.relevance_score {
        line.push_str(&format!(" ({:.0}% relevant)", score * 100.0));
    }
    if !citation.text_snippet.is_empty() {
        line.push_str(&format!("\n    \"{}\"", citation.text_snippet));
    }
    line
}

/// Sources in order of first mention, then any cited but never mentioned.
/// A marker without a matching citation is listed as unavailable.
pub fn source_lines(message: &Message) -> Vec<String> {
    let index = CitationIndex::build(&message.citations);
    let segments = segment_content(&message.content);
    let mut seen = Vec::new();
    let mut lines = Vec::new();

    for segment in index.resolve(&segments) {
        let ResolvedSegment::Marker { id, citation, .. } = segment else {
            continue;
        };
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        lines.push(match citation {
            Some(citation) => citation_line(citation),
            None => format!("[{id}] source unavailable"),
        });
    }
    for citation in &message.citations {
        if !seen.contains(&citation.id) {
            seen.push(citation.id);
            lines.push(citation_line(citation));
        }
    }
    lines
}

/// `None` for component types this client does not know how to draw.
pub fn component_block(component: &UiComponent) -> Option<String> {
    let block = match component {
        UiComponent::InfoCard(card) => {
            let mut block = match &card.icon {
                Some(icon) => format!("{icon} {}", card.title),
                None => card.title.clone(),
            };
            for item in &card.items {
                block.push_str(&format!("\n  {}: {}", item.label, display_value(&item.value)));
            }
            block
        }
        UiComponent::StatCard(card) => {
            let mut block = format!("{}: {}", card.label, display_value(&card.value));
            if let Some(change) = card.change {
                block.push_str(&format!(" ({change:+}%)"));
            }
            if let Some(icon) = &card.icon {
                block = format!("{icon} {block}");
            }
            block
        }
        UiComponent::DataTable(table) => table_block(table.title.as_deref(), &table.headers, &table.rows),
        UiComponent::ProgressCard(card) => {
            let filled = (card.fraction() * PROGRESS_WIDTH as f64).round() as usize;
            let unit = card.unit.as_deref().unwrap_or("");
            format!(
                "{}: [{}{}] {}/{}{unit}",
                card.label,
                "#".repeat(filled),
                "-".repeat(PROGRESS_WIDTH - filled.min(PROGRESS_WIDTH)),
                card.current,
                card.total,
            )
        }
        UiComponent::Unknown { component_type, .. } => {
            tracing::debug!(component_type = %component_type, "skipping unknown ui component");
            return None;
        }
    };
    Some(block)
}

fn table_block(title: Option<&str>, headers: &[String], rows: &[Vec<serde_json::Value>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(display_value).collect())
        .collect();
    let columns = headers
        .len()
        .max(cells.iter().map(Vec::len).max().unwrap_or(0));
    let mut widths = vec![0; columns];
    for (column, header) in headers.iter().enumerate() {
        widths[column] = widths[column].max(header.chars().count());
    }
    for row in &cells {
        for (column, cell) in row.iter().enumerate() {
            widths[column] = widths[column].max(cell.chars().count());
        }
    }

    let line = |values: &[String]| {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(column, width)| {
                let value = values.get(column).map(String::as_str).unwrap_or("");
                format!("{value:<width$}")
            })
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    let mut lines = Vec::new();
    if let Some(title) = title {
        lines.push(title.to_string());
    }
    lines.push(line(headers));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    lines.extend(cells.iter().map(|row| line(row)));
    lines.join("\n")
}

pub fn document_lines(request: &DocumentRequest, url: Option<&str>) -> Vec<String> {
    let mut lines = vec![format!(
        "Opening {} at page {}",
        display_name(&request.document),
        request.page
    )];
    if let Some(url) = url {
        lines.push(format!("  {url}#page={}", request.page));
    }
    if let Some(highlight) = &request.highlight {
        lines.push(format!("  highlight: \"{highlight}\""));
    }
    lines
}

pub fn metadata_line(metadata: &DocumentMetadata) -> String {
    let mut parts = Vec::new();
    if let Some(title) = &metadata.title {
        parts.push(format!("\"{title}\""));
    }
    if let Some(author) = &metadata.author {
        parts.push(format!("by {author}"));
    }
    if let Some(pages) = metadata.num_pages {
        parts.push(format!("{pages} pages"));
    }
    parts.push(format!("{} bytes", metadata.file_size));
    format!("  {}", parts.join(", "))
}

/// The first lines of a page's text. Lines containing `highlight` are
/// marked with `>`.
pub fn page_lines(page: &PageContent, highlight: Option<&str>) -> Vec<String> {
    let needle = highlight
        .map(|text| text.split_whitespace().take(4).collect::<Vec<_>>().join(" ").to_lowercase())
        .filter(|needle| !needle.is_empty());
    let mut lines = vec![format!("  page {}:", page.page_number)];
    let text: Vec<&str> = page
        .text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    for line in text.iter().take(PREVIEW_LINES) {
        let marked = needle
            .as_deref()
            .is_some_and(|needle| line.to_lowercase().contains(needle));
        lines.push(format!("  {} {line}", if marked { ">" } else { "|" }));
    }
    if text.len() > PREVIEW_LINES {
        lines.push(format!("  | ... {} more lines", text.len() - PREVIEW_LINES));
    }
    lines
}

pub fn history_lines(records: &[TranscriptRecord]) -> Vec<String> {
    let messages = citeview_core::transcript::restore_messages(records);
    messages
        .iter()
        .map(|message| {
            let when = chrono::DateTime::from_timestamp_millis(message.created_at_ms)
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            let who = match message.role {
                Role::User => "you",
                Role::Assistant => "assistant",
            };
            let mut entry = format!("{when} {who}: {}", message.content);
            if !message.citations.is_empty() {
                entry.push_str(&format!("\n  ({} sources)", message.citations.len()));
            }
            entry
        })
        .collect()
}
