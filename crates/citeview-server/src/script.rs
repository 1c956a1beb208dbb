//! Canned answers for the mock backend.
//!
//! A query picks one of three topics by keyword. Each answer is replayed as
//! five tool-call steps, the topic's UI components, then the text one
//! character per chunk with each citation sent right after its first marker.

use std::collections::HashSet;
use std::time::Duration;

use citeview_core::components::UiComponent;
use citeview_core::config::ServerConfig;
use citeview_core::contracts::ChatRequest;
use citeview_core::events::StreamEvent;
use citeview_core::events::ToolCallUpdate;
use citeview_core::segment::segment_content;
use citeview_core::segment::ContentSegment;
use citeview_core::state::Citation;
use citeview_core::state::ToolStatus;
use citeview_stream::ScriptedEvent;
use citeview_stream::ScriptedEventSource;
use serde_json::json;

/// Tool steps shown while an answer is "prepared", with their running message.
pub const TOOL_STEPS: [(&str, &str); 5] = [
    ("thinking", "Analyzing your question..."),
    ("searching_documents", "Searching through available documents..."),
    ("retrieving_pdf", "Retrieving relevant PDF sections..."),
    ("analyzing_content", "Analyzing content for relevant information..."),
    ("generating_response", "Generating comprehensive response..."),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub tool: Duration,
    pub component: Duration,
    pub char: Duration,
    /// Pause after a completed tool step and after each citation.
    pub settle: Duration,
}

impl Pacing {
    pub const ZERO: Self = Self {
        tool: Duration::ZERO,
        component: Duration::ZERO,
        char: Duration::ZERO,
        settle: Duration::ZERO,
    };

    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            tool: Duration::from_millis(config.tool_delay_ms),
            component: Duration::from_millis(config.component_delay_ms),
            char: Duration::from_millis(config.char_delay_ms),
            settle: Duration::from_millis(config.citation_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Climate,
    Technology,
    General,
}

struct CitationSeed {
    id: u32,
    page: u32,
    snippet: &'static str,
    relevance: f64,
}

const CLIMATE_KEYWORDS: &[&str] = &["climate", "environment", "carbon", "renewable", "temperature"];
const TECHNOLOGY_KEYWORDS: &[&str] = &["ai", "technology", "machine learning", "artificial", "software"];

const CLIMATE_ANSWER: &str = "Based on my analysis of the documents, I can provide you with comprehensive information about climate change.

According to the research data [1], global temperatures have risen significantly over the past century. The evidence shows an increase of approximately 1.1°C since the pre-industrial era, which is primarily attributed to human activities such as burning fossil fuels and deforestation.

Studies indicate [2] that renewable energy adoption is accelerating worldwide. Solar and wind power capacity has grown by over 45% in the last five years, making clean energy increasingly cost-competitive with traditional fossil fuels.

The data analysis reveals [3] that carbon reduction efforts are showing positive results in several regions. Countries implementing comprehensive climate policies have achieved measurable decreases in their carbon footprints, demonstrating that effective action is possible.";

const TECHNOLOGY_ANSWER: &str = "I've analyzed the available documents to answer your question about artificial intelligence and technology trends.

The research indicates [1] that machine learning models have achieved remarkable progress in recent years. Deep learning architectures have revolutionized fields from natural language processing to computer vision, enabling capabilities that were previously thought impossible.

According to industry analysis [2], the adoption of AI in enterprise applications is growing rapidly. Companies are increasingly leveraging AI for automation, decision-making, and customer experience enhancement, with projected market growth exceeding $500 billion by 2025.

Technical documentation shows [3] that responsible AI development is becoming a key focus area. Organizations are implementing governance frameworks to ensure ethical AI deployment, addressing concerns around bias, transparency, and accountability.";

const GENERAL_ANSWER: &str = "Thank you for your question. I've searched through the available documents to provide you with relevant information.

Based on my research [1], I found several key insights that address your query. The documentation provides comprehensive coverage of this topic with detailed explanations and examples.

Further analysis [2] reveals additional context that may be helpful. The sources contain well-documented information that supports the main findings and provides deeper understanding.

The evidence suggests [3] that there are multiple perspectives to consider. Review of the materials indicates thorough research has been conducted on this subject matter.";

const CLIMATE_CITATIONS: &[CitationSeed] = &[
    CitationSeed {
        id: 1,
        page: 3,
        snippet: "Global average temperatures have increased by approximately 1.1°C since the pre-industrial era, with the rate of warming accelerating in recent decades.",
        relevance: 0.95,
    },
    CitationSeed {
        id: 2,
        page: 7,
        snippet: "Renewable energy capacity has grown exponentially, with solar and wind power installations increasing by 45% over the past five years.",
        relevance: 0.88,
    },
    CitationSeed {
        id: 3,
        page: 12,
        snippet: "Countries with comprehensive climate policies have achieved significant reductions in carbon emissions, proving the effectiveness of coordinated action.",
        relevance: 0.82,
    },
];

const TECHNOLOGY_CITATIONS: &[CitationSeed] = &[
    CitationSeed {
        id: 1,
        page: 5,
        snippet: "Deep learning models have achieved breakthrough performance across multiple domains, with transformer architectures enabling unprecedented capabilities in language understanding.",
        relevance: 0.92,
    },
    CitationSeed {
        id: 2,
        page: 15,
        snippet: "Enterprise AI adoption is projected to grow at a CAGR of 38%, with the global market expected to exceed $500 billion by 2025.",
        relevance: 0.85,
    },
    CitationSeed {
        id: 3,
        page: 22,
        snippet: "Responsible AI frameworks are being adopted by leading organizations to ensure ethical deployment, with focus on bias mitigation and transparency.",
        relevance: 0.79,
    },
];

const GENERAL_CITATIONS: &[CitationSeed] = &[
    CitationSeed {
        id: 1,
        page: 2,
        snippet: "This comprehensive study examines the key factors and provides detailed analysis of the subject matter with supporting evidence.",
        relevance: 0.88,
    },
    CitationSeed {
        id: 2,
        page: 8,
        snippet: "Additional research supports these findings, with multiple studies confirming the primary conclusions and extending the analysis.",
        relevance: 0.82,
    },
    CitationSeed {
        id: 3,
        page: 14,
        snippet: "The evidence base for these conclusions is robust, with peer-reviewed sources providing validation of the key findings.",
        relevance: 0.75,
    },
];

impl Topic {
    pub const ALL: [Self; 3] = [Self::Climate, Self::Technology, Self::General];

    /// Single keywords match whole words or their plural-style extensions
    /// ("renewables"); two-letter keywords and phrases must match exactly.
    pub fn select(query: &str) -> Self {
        let query = query.to_lowercase();
        let words: Vec<&str> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let hit = |keywords: &[&str]| {
            keywords.iter().any(|keyword| {
                if keyword.contains(' ') {
                    return query.contains(keyword);
                }
                words.iter().any(|word| {
                    *word == *keyword || (keyword.len() > 2 && word.starts_with(keyword))
                })
            })
        };

        if hit(CLIMATE_KEYWORDS) {
            Self::Climate
        } else if hit(TECHNOLOGY_KEYWORDS) {
            Self::Technology
        } else {
            Self::General
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Climate => "climate",
            Self::Technology => "technology",
            Self::General => "default",
        }
    }

    /// Title of the document the topic cites.
    pub fn title(self) -> &'static str {
        match self {
            Self::Climate => "Climate Change Research Report",
            Self::Technology => "Artificial Intelligence Technology Report",
            Self::General => "General Research Paper",
        }
    }

    pub fn answer(self) -> &'static str {
        match self {
            Self::Climate => CLIMATE_ANSWER,
            Self::Technology => TECHNOLOGY_ANSWER,
            Self::General => GENERAL_ANSWER,
        }
    }

    pub fn document(self) -> &'static str {
        match self {
            Self::Climate => "climate_research.pdf",
            Self::Technology => "ai_technology.pdf",
            Self::General => "research_paper.pdf",
        }
    }

    pub fn citations(self) -> Vec<Citation> {
        let seeds = match self {
            Self::Climate => CLIMATE_CITATIONS,
            Self::Technology => TECHNOLOGY_CITATIONS,
            Self::General => GENERAL_CITATIONS,
        };
        seeds
            .iter()
            .map(|seed| Citation {
                id: seed.id,
                document: self.document().to_string(),
                page: seed.page,
                text_snippet: seed.snippet.to_string(),
                relevance_score: Some(seed.relevance),
            })
            .collect()
    }

    pub fn components(self) -> Vec<UiComponent> {
        let wire = match self {
            Self::Climate => vec![
                (
                    "info_card",
                    json!({
                        "title": "Climate Statistics",
                        "icon": "🌡️",
                        "items": [
                            {"label": "Temperature Rise", "value": "+1.1°C"},
                            {"label": "Renewable Growth", "value": "+45%"},
                            {"label": "Policy Adoption", "value": "142 countries"}
                        ]
                    }),
                ),
                (
                    "stat_card",
                    json!({
                        "label": "Carbon Emissions Reduced",
                        "value": "12.5 GT",
                        "change": -8,
                        "icon": "📉"
                    }),
                ),
            ],
            Self::Technology => vec![
                (
                    "data_table",
                    json!({
                        "title": "AI Market Growth",
                        "headers": ["Year", "Market Size", "Growth %"],
                        "rows": [
                            ["2023", "$150B", "+32%"],
                            ["2024", "$210B", "+40%"],
                            ["2025", "$500B", "+138%"]
                        ]
                    }),
                ),
                (
                    "progress_card",
                    json!({
                        "label": "AI Adoption Rate",
                        "current": 72,
                        "total": 100,
                        "unit": "%"
                    }),
                ),
            ],
            Self::General => vec![(
                "info_card",
                json!({
                    "title": "Research Summary",
                    "icon": "📚",
                    "items": [
                        {"label": "Documents Analyzed", "value": 3},
                        {"label": "Key Findings", "value": 12},
                        {"label": "Confidence Score", "value": "85%"}
                    ]
                }),
            )],
        };
        wire.into_iter()
            .map(|(component_type, data)| UiComponent::from_wire(component_type, data))
            .collect()
    }
}

/// The message a tool step reports once it finishes.
pub fn completed_message(running: &str) -> String {
    format!("{} complete.", running.replace("...", ""))
}

pub fn plan_stream(query: &str, pacing: &Pacing) -> Vec<ScriptedEvent> {
    let topic = Topic::select(query);
    tracing::debug!(topic = topic.label(), "planning scripted answer");

    let mut script = Vec::new();
    for (tool, running) in TOOL_STEPS {
        script.push(ScriptedEvent::new(
            StreamEvent::ToolCall(ToolCallUpdate::new(
                tool,
                ToolStatus::Running,
                Some(running.to_string()),
            )),
            pacing.tool,
        ));
        script.push(ScriptedEvent::new(
            StreamEvent::ToolCall(ToolCallUpdate::new(
                tool,
                ToolStatus::Completed,
                Some(completed_message(running)),
            )),
            pacing.settle,
        ));
    }

    for component in topic.components() {
        script.push(ScriptedEvent::new(
            StreamEvent::UiComponent(component),
            pacing.component,
        ));
    }

    let citations = topic.citations();
    let mut sent = HashSet::new();
    for segment in segment_content(topic.answer()) {
        for ch in segment.raw().chars() {
            script.push(ScriptedEvent::new(
                StreamEvent::TextChunk(ch.to_string()),
                pacing.char,
            ));
        }
        let ContentSegment::Citation { id, .. } = segment else {
            continue;
        };
        if !sent.insert(id) {
            continue;
        }
        if let Some(citation) = citations.iter().find(|citation| citation.id == id) {
            script.push(ScriptedEvent::new(
                StreamEvent::Citation(citation.clone()),
                pacing.settle,
            ));
        }
    }

    script.push(ScriptedEvent::new(
        StreamEvent::Complete {
            content: Some(topic.answer().to_string()),
        },
        Duration::ZERO,
    ));
    script
}

/// An in-process source that answers every request from [`plan_stream`].
pub fn scripted_source(pacing: Pacing) -> ScriptedEventSource {
    ScriptedEventSource::new(move |request: &ChatRequest| plan_stream(&request.query, &pacing))
}
