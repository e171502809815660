//! Terminal study front-end: one flashcard at a time with flip/next/previous.
//!
//! Keys: space/enter flip, →/n next, ←/p previous, q/Esc/Ctrl-C quit.

pub mod widgets;

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use miette::IntoDiagnostic;

use crate::deck::Deck;
use crate::flashcard::Flashcard;

/// Study session state.
pub struct StudyTui {
    title: String,
    deck: Deck,
    should_quit: bool,
}

impl StudyTui {
    /// `title` names the source document in the header.
    pub fn new(title: impl Into<String>, cards: Vec<Flashcard>) -> Self {
        Self {
            title: title.into(),
            deck: Deck::new(cards),
            should_quit: false,
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Run the event loop until the user quits.
    pub fn run(&mut self) -> miette::Result<()> {
        let mut terminal = ratatui::init();
        let result = self.event_loop(&mut terminal);
        ratatui::restore();
        result
    }

    fn event_loop(&mut self, terminal: &mut ratatui::DefaultTerminal) -> miette::Result<()> {
        while !self.should_quit {
            terminal
                .draw(|frame| widgets::render(frame, &self.title, &self.deck))
                .into_diagnostic()?;

            if event::poll(Duration::from_millis(250)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.deck.flip(),
            KeyCode::Right | KeyCode::Char('n') | KeyCode::Char('l') => {
                self.deck.next();
            }
            KeyCode::Left | KeyCode::Char('p') | KeyCode::Char('h') => {
                self.deck.previous();
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            _ => {}
        }
    }
}
