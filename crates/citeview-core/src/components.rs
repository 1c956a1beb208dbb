//! Generative UI components streamed alongside an answer.
//!
//! The wire carries a free-form `component_type` tag plus an object payload.
//! Known tags decode into typed variants; anything else (including a known tag
//! whose payload does not fit) is kept as [`UiComponent::Unknown`], which
//! renderers draw as nothing.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum UiComponent {
    InfoCard(InfoCard),
    StatCard(StatCard),
    DataTable(DataTable),
    ProgressCard(ProgressCard),
    Unknown {
        component_type: String,
        data: Map<String, Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoCard {
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub items: Vec<InfoItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoItem {
    pub label: String,
    /// Scalars arrive as either strings or numbers.
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatCard {
    pub label: String,
    pub value: Value,
    #[serde(default)]
    pub change: Option<f64>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    #[serde(default)]
    pub title: Option<String>,
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressCard {
    pub label: String,
    pub current: f64,
    pub total: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

impl ProgressCard {
    /// Completion in `[0, 1]`; zero when `total` is not positive.
    pub fn fraction(&self) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        (self.current / self.total).clamp(0.0, 1.0)
    }
}

impl UiComponent {
    pub fn from_wire(component_type: &str, data: Value) -> Self {
        let decoded = match component_type {
            "info_card" => serde_json::from_value(data.clone()).map(Self::InfoCard),
            "stat_card" => serde_json::from_value(data.clone()).map(Self::StatCard),
            "data_table" => serde_json::from_value(data.clone()).map(Self::DataTable),
            "progress_card" => serde_json::from_value(data.clone()).map(Self::ProgressCard),
            _ => return Self::unknown(component_type, data),
        };

        match decoded {
            Ok(component) => component,
            Err(err) => {
                tracing::debug!(
                    component_type,
                    error = %err,
                    "ui component payload does not match its type"
                );
                Self::unknown(component_type, data)
            }
        }
    }

    fn unknown(component_type: &str, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::Unknown {
            component_type: component_type.to_string(),
            data,
        }
    }

    pub fn type_tag(&self) -> &str {
        match self {
            Self::InfoCard(_) => "info_card",
            Self::StatCard(_) => "stat_card",
            Self::DataTable(_) => "data_table",
            Self::ProgressCard(_) => "progress_card",
            Self::Unknown { component_type, .. } => component_type,
        }
    }

    /// Inverse of [`UiComponent::from_wire`], used when emitting events.
    pub fn to_wire(&self) -> (String, Value) {
        let data = match self {
            Self::InfoCard(card) => serde_json::to_value(card),
            Self::StatCard(card) => serde_json::to_value(card),
            Self::DataTable(table) => serde_json::to_value(table),
            Self::ProgressCard(card) => serde_json::to_value(card),
            Self::Unknown { data, .. } => Ok(Value::Object(data.clone())),
        };
        (
            self.type_tag().to_string(),
            data.unwrap_or_else(|_| Value::Object(Map::new())),
        )
    }
}

/// Renders a scalar payload value the way a card would show it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
