use crate::app::App;
use crate::surface::PlayerBarView;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Duration;

const APP_TITLE: &str = "Encore v0.1.0  ";

struct Palette {
    bg: Color,
    panel_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    selected_bg: Color,
}

const PALETTE: Palette = Palette {
    bg: Color::Rgb(12, 14, 24),
    panel_bg: Color::Rgb(20, 26, 42),
    border: Color::Rgb(82, 110, 168),
    text: Color::Rgb(216, 226, 246),
    muted: Color::Rgb(140, 158, 190),
    accent: Color::Rgb(118, 208, 188),
    alert: Color::Rgb(249, 174, 88),
    selected_bg: Color::Rgb(36, 52, 82),
};

pub fn draw(frame: &mut Frame, app: &App) {
    frame.render_widget(
        Block::default().style(Style::default().bg(PALETTE.bg)),
        frame.area(),
    );

    // The player bar row exists only while a track is selected.
    let bar = app.surface.view();
    let mut constraints = vec![
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(3),
    ];
    if bar.is_some() {
        constraints.push(Constraint::Length(4));
    }
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    draw_header(frame, app, vertical[0]);
    draw_body(frame, app, vertical[1]);
    draw_status(frame, app, vertical[2]);
    if let Some(view) = bar {
        draw_player_bar(frame, &view, vertical[3]);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    frame.render_widget(panel_block("Portfolio"), area);
    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(PALETTE.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.catalog.artist.as_str(), Style::default().fg(PALETTE.text)),
        Span::styled("  |  ", Style::default().fg(PALETTE.muted)),
        Span::styled(
            format!("{} pieces", app.catalog.entries.len()),
            Style::default().fg(PALETTE.text),
        ),
        Span::styled("  |  ", Style::default().fg(PALETTE.muted)),
        Span::styled(
            format!("Category: {}", app.current_category()),
            Style::default().fg(PALETTE.alert),
        ),
    ]));
    frame.render_widget(header, inner);
}

fn draw_body(frame: &mut Frame, app: &App, area: Rect) {
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(58), Constraint::Percentage(42)])
        .split(area);

    let entries = app.visible_entries();
    let state = app.coordinator.state();

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let playing_here = state.current_id() == Some(entry.id) && state.is_playing;
            let marker = if playing_here { "  > " } else { "    " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(PALETTE.accent)),
                Span::styled(entry.title.as_str(), Style::default().fg(PALETTE.text)),
                Span::styled(
                    format!("  ({})", entry.category),
                    Style::default().fg(PALETTE.muted),
                ),
            ]))
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select((!entries.is_empty()).then_some(app.selected));

    let list = List::new(items)
        .block(panel_block("Works"))
        .highlight_style(Style::default().bg(PALETTE.selected_bg));
    frame.render_stateful_widget(list, body[0], &mut list_state);

    draw_detail(frame, app, body[1]);
}

fn draw_detail(frame: &mut Frame, app: &App, area: Rect) {
    let entries = app.visible_entries();
    let mut lines = Vec::new();

    if let Some(entry) = entries.get(app.selected) {
        lines.push(Line::from(Span::styled(
            entry.title.as_str(),
            Style::default()
                .fg(PALETTE.accent)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            entry.category.as_str(),
            Style::default().fg(PALETTE.alert),
        )));
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            entry.description.as_str(),
            Style::default().fg(PALETTE.text),
        )));
        lines.push(Line::default());
        for (label, link) in [
            ("Spotify", &entry.spotify_url),
            ("YouTube", &entry.youtube_url),
            ("Bandcamp", &entry.bandcamp_url),
        ] {
            if let Some(url) = link {
                lines.push(Line::from(vec![
                    Span::styled(format!("{label}: "), Style::default().fg(PALETTE.muted)),
                    Span::styled(url.as_str(), Style::default().fg(PALETTE.text)),
                ]));
            }
        }
    } else {
        lines.push(Line::from(Span::styled(
            "Nothing in this category",
            Style::default().fg(PALETTE.muted),
        )));
    }

    let detail = Paragraph::new(lines)
        .block(panel_block("About"))
        .wrap(Wrap { trim: true });
    frame.render_widget(detail, area);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        app.status.as_str(),
        Style::default().fg(PALETTE.text),
    )];
    if let Some(failure) = app.surface.last_failure() {
        spans.push(Span::styled("  |  ", Style::default().fg(PALETTE.muted)));
        spans.push(Span::styled(failure, Style::default().fg(PALETTE.alert)));
    }

    let status = Paragraph::new(Line::from(spans)).block(panel_block("Status"));
    frame.render_widget(status, area);
}

fn draw_player_bar(frame: &mut Frame, view: &PlayerBarView, area: Rect) {
    let transport = if view.loading {
        "..."
    } else if view.is_playing {
        "|>"
    } else {
        "||"
    };
    let volume = if view.muted {
        String::from("Muted")
    } else {
        format!("Vol {}%", (view.volume * 100.0).round() as u16)
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {transport}  "),
                Style::default()
                    .fg(PALETTE.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                view.title.as_str(),
                Style::default()
                    .fg(PALETTE.text)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  -  {}", view.artist),
                Style::default().fg(PALETTE.muted),
            ),
        ]),
        Line::from(vec![
            Span::styled(
                format!(
                    "     {} / {}",
                    format_clock(view.position),
                    format_clock(view.duration)
                ),
                Style::default().fg(PALETTE.text),
            ),
            Span::styled(format!("  |  {volume}"), Style::default().fg(PALETTE.muted)),
        ]),
    ];

    let bar = Paragraph::new(lines).block(panel_block("Now Playing"));
    frame.render_widget(bar, area);
}

fn panel_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .style(Style::default().bg(PALETTE.panel_bg).fg(PALETTE.text))
        .border_style(Style::default().fg(PALETTE.border))
}

fn format_clock(value: Option<Duration>) -> String {
    match value {
        Some(duration) => {
            let total = duration.as_secs();
            format!("{:02}:{:02}", total / 60, total % 60)
        }
        None => String::from("--:--"),
    }
}
