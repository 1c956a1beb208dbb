use std::collections::HashMap;

use super::segment::ContentSegment;
use super::state::Citation;

/// Lookup from citation id to the citation it names, borrowed from one
/// message's citation list. A repeated id silently replaces the earlier entry.
#[derive(Debug, Clone, Default)]
pub struct CitationIndex<'a> {
    by_id: HashMap<u32, &'a Citation>,
}

impl<'a> CitationIndex<'a> {
    pub fn build(citations: &'a [Citation]) -> Self {
        let mut by_id = HashMap::with_capacity(citations.len());
        for citation in citations {
            by_id.insert(citation.id, citation);
        }
        Self { by_id }
    }

    pub fn get(&self, id: u32) -> Option<&'a Citation> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Pairs every marker segment with the citation it names, if any.
    pub fn resolve<'s>(&self, segments: &[ContentSegment<'s>]) -> Vec<ResolvedSegment<'s, 'a>> {
        segments
            .iter()
            .map(|segment| match *segment {
                ContentSegment::Text(text) => ResolvedSegment::Text(text),
                ContentSegment::Citation { id, raw } => ResolvedSegment::Marker {
                    id,
                    raw,
                    citation: self.get(id),
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedSegment<'s, 'a> {
    Text(&'s str),
    /// `citation` is `None` for a marker with no matching citation; such
    /// markers render bare and are not clickable.
    Marker {
        id: u32,
        raw: &'s str,
        citation: Option<&'a Citation>,
    },
}

impl ResolvedSegment<'_, '_> {
    pub fn is_clickable(&self) -> bool {
        matches!(self, Self::Marker { citation: Some(_), .. })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::segment::segment_content;

    fn citation(id: u32, document: &str) -> Citation {
        Citation {
            id,
            document: document.to_string(),
            page: 1,
            text_snippet: String::new(),
            relevance_score: None,
        }
    }

    #[test]
    fn lookups_return_matching_citation_or_none() {
        let citations = vec![citation(1, "a.pdf"), citation(4, "b.pdf")];
        let index = CitationIndex::build(&citations);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(4).map(|c| c.document.as_str()), Some("b.pdf"));
        assert_eq!(index.get(2), None);
        assert!(CitationIndex::build(&[]).is_empty());
    }

    #[test]
    fn duplicate_ids_last_write_wins() {
        let citations = vec![citation(1, "first.pdf"), citation(1, "second.pdf")];
        let index = CitationIndex::build(&citations);

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(1).map(|c| c.document.as_str()), Some("second.pdf"));
    }

    #[test]
    fn resolve_marks_unknown_markers_unclickable() {
        let citations = vec![citation(1, "a.pdf")];
        let index = CitationIndex::build(&citations);
        let segments = segment_content("see [1] and [9]");
        let resolved = index.resolve(&segments);

        let clickable: Vec<bool> = resolved.iter().map(ResolvedSegment::is_clickable).collect();
        assert_eq!(clickable, vec![false, true, false, false]);
        assert!(matches!(
            resolved[3],
            ResolvedSegment::Marker {
                id: 9,
                raw: "[9]",
                citation: None
            }
        ));
    }
}
