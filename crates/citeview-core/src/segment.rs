//! Splits answer text into plain runs and `[N]` citation markers.

use std::sync::LazyLock;

use regex::Regex;

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("invalid citation marker regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSegment<'a> {
    Text(&'a str),
    Citation { id: u32, raw: &'a str },
}

impl<'a> ContentSegment<'a> {
    /// The exact input slice this segment covers.
    pub fn raw(&self) -> &'a str {
        match self {
            Self::Text(text) => text,
            Self::Citation { raw, .. } => raw,
        }
    }

    pub fn citation_id(&self) -> Option<u32> {
        match self {
            Self::Citation { id, .. } => Some(*id),
            Self::Text(_) => None,
        }
    }
}

/// Never drops characters: joining every segment's [`ContentSegment::raw`]
/// yields `content` again. Digit runs too large for a `u32` stay text.
pub fn segment_content(content: &str) -> Vec<ContentSegment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    for captures in MARKER.captures_iter(content) {
        let (Some(whole), Some(digits)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Ok(id) = digits.as_str().parse::<u32>() else {
            continue;
        };
        if whole.start() > text_start {
            segments.push(ContentSegment::Text(&content[text_start..whole.start()]));
        }
        segments.push(ContentSegment::Citation {
            id,
            raw: whole.as_str(),
        });
        text_start = whole.end();
    }
    if text_start < content.len() {
        segments.push(ContentSegment::Text(&content[text_start..]));
    }
    segments
}

/// Distinct marker ids in order of first appearance.
pub fn marker_ids(content: &str) -> Vec<u32> {
    let mut ids = Vec::new();
    for id in segment_content(content)
        .iter()
        .filter_map(ContentSegment::citation_id)
    {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rejoin(segments: &[ContentSegment<'_>]) -> String {
        segments.iter().map(ContentSegment::raw).collect()
    }

    #[test]
    fn alternates_text_and_markers() {
        let input = "Warming is 1.1°C [1] and rising [2].";
        let segments = segment_content(input);
        assert_eq!(
            segments,
            vec![
                ContentSegment::Text("Warming is 1.1°C "),
                ContentSegment::Citation { id: 1, raw: "[1]" },
                ContentSegment::Text(" and rising "),
                ContentSegment::Citation { id: 2, raw: "[2]" },
                ContentSegment::Text("."),
            ]
        );
        assert_eq!(rejoin(&segments), input);
    }

    #[test]
    fn markers_at_edges_and_adjacent() {
        let segments = segment_content("[3][4]middle[5]");
        assert_eq!(
            segments,
            vec![
                ContentSegment::Citation { id: 3, raw: "[3]" },
                ContentSegment::Citation { id: 4, raw: "[4]" },
                ContentSegment::Text("middle"),
                ContentSegment::Citation { id: 5, raw: "[5]" },
            ]
        );
    }

    #[test]
    fn non_markers_stay_text() {
        for input in ["", "no markers", "[a] [] [1 ] [-2]", "[99999999999999]"] {
            let segments = segment_content(input);
            assert!(segments.iter().all(|segment| segment.citation_id().is_none()), "{input}");
            assert_eq!(rejoin(&segments), input);
        }
    }

    #[test]
    fn round_trip_reconstructs_input() {
        let inputs = [
            "The research indicates [1].",
            "[[1]]",
            "nested [1[2]] brackets",
            "unicode — [7] ü [8]",
        ];
        for input in inputs {
            assert_eq!(rejoin(&segment_content(input)), input);
        }
    }

    #[test]
    fn marker_ids_are_distinct_in_order() {
        assert_eq!(marker_ids("[2] a [1] b [2] c [3]"), vec![2, 1, 3]);
    }
}
