// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # flashcard-rag
//!
//! Retrieval-augmented flashcard generation: a PDF goes in, question/answer
//! cards come out.
//!
//! ## Architecture
//!
//! - **Documents** (`document`): page-level text extraction and a recursive
//!   character splitter (1000 characters, 50 overlap by default)
//! - **Retrieval** (`embed`, `index`): pluggable embedding backends and a
//!   request-scoped HNSW index returning the top-K chunks for a fixed query
//! - **Generation** (`prompt`, `llm`): prompt templating and Gemini/Ollama
//!   clients
//! - **Recovery** (`recovery`): turns whatever the model returned into an
//!   ordered question → answer mapping, degrading instead of failing
//! - **Front-ends**: the `flashcard` CLI with a terminal study view (`tui`)
//!   and the `flashcardd` HTTP daemon (`server`, feature `server`)
//!
//! ## Library usage
//!
//! ```no_run
//! use flashcard_rag::config::{Config, collect_env};
//! use flashcard_rag::pipeline::Pipeline;
//!
//! let config = Config::load(None, &collect_env()).unwrap();
//! let pipeline = Pipeline::from_config(&config).unwrap();
//! let report = pipeline.run("lecture.pdf".as_ref()).unwrap();
//! for card in &report.flashcards {
//!     println!("{}: {}", card.question, card.answer);
//! }
//! ```
//!
//! Recovery alone needs no collaborators:
//!
//! ```
//! use flashcard_rag::flashcard::assemble;
//! use flashcard_rag::recovery::{RawModelResponse, recover};
//!
//! let raw = RawModelResponse::from("```json\n{\"What is ATP?\": \"Energy currency\"}\n```");
//! let cards = assemble(recover(&raw));
//! assert_eq!(cards[0].question, "What is ATP?");
//! ```

pub mod config;
pub mod deck;
pub mod document;
pub mod embed;
pub mod error;
pub mod flashcard;
mod http;
pub mod index;
pub mod llm;
pub mod paths;
pub mod pipeline;
pub mod prompt;
pub mod recovery;
#[cfg(feature = "server")]
pub mod server;
pub mod tui;
