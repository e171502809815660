//! Study view rendering: header, card, counter and key hints.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::deck::{Deck, Side};

/// Shown in place of a card when generation produced nothing.
pub const EMPTY_DECK_MESSAGE: &str = "No valid flashcards generated";

pub fn render(frame: &mut Frame, title: &str, deck: &Deck) {
    let [header_area, card_area, counter_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " flashcards ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" :: {title} ")),
    ]));
    frame.render_widget(header, header_area);

    let (label, body, color) = match (deck.visible_text(), deck.side()) {
        (None, _) => (" empty ", EMPTY_DECK_MESSAGE, Color::Red),
        (Some(text), Side::Question) => (" Question ", text, Color::White),
        (Some(text), Side::Answer) => (" Answer ", text, Color::Green),
    };
    let card = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title(label))
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(card, card_area);

    let counter = Paragraph::new(deck.position().unwrap_or_default())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(counter, counter_area);

    let mut hints = vec![Span::styled(
        " space: flip ",
        Style::default().fg(Color::DarkGray),
    )];
    if deck.has_previous() {
        hints.push(Span::raw("| "));
        hints.push(Span::styled("←: previous ", Style::default().fg(Color::DarkGray)));
    }
    if deck.has_next() {
        hints.push(Span::raw("| "));
        hints.push(Span::styled("→: next ", Style::default().fg(Color::DarkGray)));
    }
    hints.push(Span::raw("| "));
    hints.push(Span::styled("q: quit ", Style::default().fg(Color::DarkGray)));
    frame.render_widget(Paragraph::new(Line::from(hints)), help_area);
}
