//! Flashcards and their transport envelope.

use serde::{Deserialize, Serialize};

use crate::recovery::RecoveredMapping;

/// One question/answer card. `id` is its 0-based position in the deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: usize,
    pub question: String,
    pub answer: String,
}

/// Turn a recovered mapping into cards, in mapping order.
///
/// An empty mapping gives an empty deck, not an error.
pub fn assemble(mapping: RecoveredMapping) -> Vec<Flashcard> {
    mapping
        .into_iter()
        .enumerate()
        .map(|(id, (question, answer))| Flashcard {
            id,
            question,
            answer,
        })
        .collect()
}

/// `{"flashcards": [...]}`, the body returned to HTTP and CLI callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardResponse {
    pub flashcards: Vec<Flashcard>,
}

impl FlashcardResponse {
    pub fn new(flashcards: Vec<Flashcard>) -> Self {
        Self { flashcards }
    }

    /// Parse a saved response. A bare JSON array of cards is accepted too.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Saved {
            Envelope(FlashcardResponse),
            Cards(Vec<Flashcard>),
        }
        Ok(match serde_json::from_str(text)? {
            Saved::Envelope(response) => response,
            Saved::Cards(flashcards) => Self { flashcards },
        })
    }
}

impl From<RecoveredMapping> for FlashcardResponse {
    fn from(mapping: RecoveredMapping) -> Self {
        Self::new(assemble(mapping))
    }
}
