//! Prompt templates.
//!
//! A template is plain text with a single placeholder, `{context}`, which may
//! appear more than once. `{{` and `}}` render as literal braces so templates
//! can show JSON examples.

use std::path::Path;

use crate::config::{PromptConfig, PromptStyle};
use crate::error::ConfigError;
use crate::index::RetrievedChunk;

const PLACEHOLDER: &str = "{context}";

/// Strict JSON-dictionary instructions.
pub const DETAILED_TEMPLATE: &str = r#"You are given a multi-page content as {context}.
Task:
Based only on the provided {context}, generate important definition-based or conceptual questions and their answers.

Instructions:
1. Create questions that are strictly relevant to the given context only.
2. Cover every topic and subtopic mentioned in the context at least once.
3. Create a minimum of 2 questions per page of the content.
4. Questions should focus on definitions, explanations, purposes, comparisons, or key concepts.
5. Do not add any external knowledge or assumptions beyond the context.
6. Keep answers clear, accurate, and concise, but conceptually complete.
7. Do not include explanations, headings, or extra text outside the required output.

Output Format (Strict):
- Return only a JSON dictionary.
- Each key must be a question.
- Each value must be the corresponding answer.
- Do not nest dictionaries or arrays.
- Do not include page numbers, metadata, or commentary.

Example Output Structure:
{{
"Question 1": "Answer 1",
"Question 2": "Answer 2"
}}

Important:
Only output the final result as a JSON dictionary datatype.
"#;

/// Short free-form request for a dictionary.
pub const CONCISE_TEMPLATE: &str = "Based on the provided content create a dictionary datatype of \
definition or important question related to the context {context} and answer to the question. \
The answer should be in the form of dictionary with key as question and value as answer to the \
question. Make these questions and answers only relevant to the context provided only. Only output \
the result in the form of dictionary. Create at least 2 questions per page. Remember to include \
each and every topic at least once. Only give question and answer in the form of dictionary \
datatype in json.\n";

/// A validated prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Accept `template` if it references `{context}` at least once.
    pub fn new(template: impl Into<String>) -> Result<Self, ConfigError> {
        let template = template.into();
        if !Segments::new(&template).any(|s| matches!(s, Segment::Context)) {
            return Err(ConfigError::InvalidValue {
                key: "prompt.template".into(),
                message: format!("template must contain the {PLACEHOLDER} placeholder"),
            });
        }
        Ok(Self { template })
    }

    pub fn builtin(style: PromptStyle) -> Self {
        let template = match style {
            PromptStyle::Detailed => DETAILED_TEMPLATE,
            PromptStyle::Concise => CONCISE_TEMPLATE,
        };
        Self {
            template: template.to_string(),
        }
    }

    /// The configured template file, or the built-in for the configured style.
    pub fn from_config(config: &PromptConfig) -> Result<Self, ConfigError> {
        match &config.template_file {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin(config.style)),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::new(content).map_err(|_| ConfigError::InvalidValue {
            key: "prompt.template_file".into(),
            message: format!(
                "{} does not contain the {PLACEHOLDER} placeholder",
                path.display()
            ),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute `context` for every placeholder and unescape braces.
    pub fn render(&self, context: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len());
        for segment in Segments::new(&self.template) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Context => out.push_str(context),
            }
        }
        out
    }
}

/// Retrieved chunk texts joined by blank lines, in retrieval order.
pub fn join_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

enum Segment<'a> {
    Text(&'a str),
    Context,
}

/// Walks a template, yielding literal runs and placeholders.
struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(template: &'a str) -> Self {
        Self { rest: template }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if self.rest.is_empty() {
            return None;
        }
        if let Some(rest) = self.rest.strip_prefix(PLACEHOLDER) {
            self.rest = rest;
            return Some(Segment::Context);
        }
        for escape in ["{{", "}}"] {
            if let Some(rest) = self.rest.strip_prefix(escape) {
                self.rest = rest;
                return Some(Segment::Text(&escape[..1]));
            }
        }
        // Literal run up to the next brace (a lone brace is literal too).
        let first = self.rest.chars().next().map_or(1, char::len_utf8);
        let end = self.rest[first..]
            .find(['{', '}'])
            .map(|i| i + first)
            .unwrap_or(self.rest.len());
        let (text, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(Segment::Text(text))
    }
}
