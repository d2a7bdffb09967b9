//! Report assembly.
//!
//! A report is an ordered list of numbered sections. Each section holds one
//! or more blocks of content which are rendered to text once, at assembly.

pub mod generator;

use crate::analysis::{AggregateTable, CorrelationMatrix, IndicatorSummary, OutlierSet};
use crate::error::{FloodError, Result};
use serde::Serialize;

pub use generator::{format_count, format_decimal, render_payload};

/// Content of one report block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// Free text
    Text(String),
    /// Aggregate table, must have at least one row
    Table(AggregateTable),
    /// Correlation matrix
    Correlation(CorrelationMatrix),
    /// Outlier set, may be empty
    Outliers(OutlierSet),
    /// Descriptive statistics per indicator
    Summary(Vec<IndicatorSummary>),
    /// An analysis that was skipped
    Unavailable { analysis: String, reason: String },
}

impl Payload {
    /// Whether the payload carries no content a reader could use.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Text(text) => text.trim().is_empty(),
            Payload::Table(table) => table.is_empty(),
            Payload::Correlation(matrix) => matrix.is_empty(),
            Payload::Summary(summaries) => summaries.is_empty(),
            Payload::Outliers(_) | Payload::Unavailable { .. } => false,
        }
    }
}

/// A payload with an optional heading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub payload: Payload,
}

/// A section to be assembled.
#[derive(Debug, Clone)]
pub struct ReportSection {
    number: u8,
    title: String,
    blocks: Vec<Block>,
}

impl ReportSection {
    pub fn new(number: u8, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    /// Appends an untitled block.
    pub fn push(mut self, payload: Payload) -> Self {
        self.blocks.push(Block {
            heading: None,
            payload,
        });
        self
    }

    /// Appends a block under a heading.
    pub fn push_titled(mut self, heading: impl Into<String>, payload: Payload) -> Self {
        self.blocks.push(Block {
            heading: Some(heading.into()),
            payload,
        });
        self
    }

    /// Appends a text block.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.push(Payload::Text(text.into()))
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// A section after rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedSection {
    pub number: u8,
    pub title: String,
    pub blocks: Vec<Block>,
    /// Text rendering of `blocks`; JSON carries the blocks only.
    #[serde(skip)]
    pub body: String,
}

/// The assembled report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    title: String,
    sections: Vec<RenderedSection>,
}

impl Report {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sections(&self) -> &[RenderedSection] {
        &self.sections
    }

    /// Looks up a section by its number.
    pub fn section(&self, number: u8) -> Option<&RenderedSection> {
        self.sections.iter().find(|s| s.number == number)
    }

    /// Plain-text rendering.
    pub fn to_text(&self) -> String {
        generator::generate_text_report(self)
    }

    /// JSON rendering.
    pub fn to_json(&self) -> Result<String> {
        generator::generate_json_report(self)
    }
}

/// Render sections, in the given order, into a report.
///
/// Fails on the first section with no blocks or with a block whose payload
/// must not be empty.
pub fn assemble(title: impl Into<String>, sections: Vec<ReportSection>) -> Result<Report> {
    let mut rendered = Vec::with_capacity(sections.len());

    for section in sections {
        if section.blocks.is_empty() || section.blocks.iter().any(|b| b.payload.is_empty()) {
            return Err(FloodError::EmptySection {
                section: format!("{}. {}", section.number, section.title),
            });
        }

        let body = generator::render_blocks(&section.blocks);
        rendered.push(RenderedSection {
            number: section.number,
            title: section.title,
            blocks: section.blocks,
            body,
        });
    }

    Ok(Report {
        title: title.into(),
        sections: rendered,
    })
}
