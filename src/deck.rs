//! Study-deck navigation: one card visible at a time, front or back.

use crate::flashcard::Flashcard;

/// Which side of the current card is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Question,
    Answer,
}

/// Cursor over a list of flashcards.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<Flashcard>,
    current: usize,
    flipped: bool,
}

impl Deck {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        Self {
            cards,
            current: 0,
            flipped: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The card under the cursor; `None` for an empty deck.
    pub fn current(&self) -> Option<&Flashcard> {
        self.cards.get(self.current)
    }

    pub fn side(&self) -> Side {
        if self.flipped {
            Side::Answer
        } else {
            Side::Question
        }
    }

    /// Text of the visible side.
    pub fn visible_text(&self) -> Option<&str> {
        self.current().map(|card| match self.side() {
            Side::Question => card.question.as_str(),
            Side::Answer => card.answer.as_str(),
        })
    }

    pub fn flip(&mut self) {
        if !self.is_empty() {
            self.flipped = !self.flipped;
        }
    }

    pub fn has_next(&self) -> bool {
        self.current + 1 < self.cards.len()
    }

    pub fn has_previous(&self) -> bool {
        self.current > 0 && !self.is_empty()
    }

    /// Advance and show the question. No-op on the last card.
    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.current += 1;
        self.flipped = false;
        true
    }

    /// Go back and show the question. No-op on the first card.
    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.current -= 1;
        self.flipped = false;
        true
    }

    /// "Card i of n", 1-based; `None` for an empty deck.
    pub fn position(&self) -> Option<String> {
        (!self.is_empty()).then(|| format!("Card {} of {}", self.current + 1, self.cards.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(n: usize) -> Deck {
        Deck::new(
            (0..n)
                .map(|id| Flashcard {
                    id,
                    question: format!("Q{id}"),
                    answer: format!("A{id}"),
                })
                .collect(),
        )
    }

    #[test]
    fn flip_toggles_visible_side() {
        let mut deck = deck(2);
        assert_eq!(deck.visible_text(), Some("Q0"));
        deck.flip();
        assert_eq!(deck.side(), Side::Answer);
        assert_eq!(deck.visible_text(), Some("A0"));
        deck.flip();
        assert_eq!(deck.visible_text(), Some("Q0"));
    }

    #[test]
    fn navigation_resets_flip_and_stops_at_ends() {
        let mut deck = deck(2);
        assert!(!deck.has_previous());
        assert!(!deck.previous());

        deck.flip();
        assert!(deck.next());
        assert_eq!(deck.side(), Side::Question);
        assert_eq!(deck.position().as_deref(), Some("Card 2 of 2"));

        deck.flip();
        assert!(!deck.next());
        assert_eq!(deck.side(), Side::Answer, "no-op keeps the card flipped");

        assert!(deck.previous());
        assert_eq!(deck.current().map(|c| c.id), Some(0));
        assert_eq!(deck.side(), Side::Question);
    }

    #[test]
    fn empty_deck_has_no_card() {
        let mut deck = Deck::default();
        assert!(deck.current().is_none());
        assert!(deck.position().is_none());
        assert!(!deck.has_next());
        assert!(!deck.has_previous());
        deck.flip();
        assert_eq!(deck.side(), Side::Question);
    }
}
