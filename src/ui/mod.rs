use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::config::Theme;
use crate::editor::{Editor, Surface};

pub fn render<B: Backend>(f: &mut Frame<B>, editor: &Editor, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)].as_ref())
        .split(f.size());

    // During a meta session the edited surface and its tower view sit side by side
    let shown: Vec<&Surface> = match editor.meta_session() {
        Some(session) => [session.origin, session.view]
            .iter()
            .filter_map(|id| editor.surface(*id).ok())
            .collect(),
        None => editor
            .focus()
            .and_then(|id| editor.surface(id).ok())
            .into_iter()
            .collect(),
    };

    if !shown.is_empty() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, shown.len() as u32); shown.len()])
            .split(chunks[0]);

        for (surface, area) in shown.iter().zip(columns.iter()) {
            let focused = editor.focus() == Some(surface.id);
            render_surface(f, surface, focused, theme, *area);
        }
    }

    render_status_line(f, editor, theme, chunks[1]);
}

fn render_surface<B: Backend>(f: &mut Frame<B>, surface: &Surface, focused: bool, theme: &Theme, area: Rect) {
    let border = if surface.is_tower_view() {
        parse_color(&theme.tower_view_border)
    } else {
        Color::DarkGray
    };
    let title_style = if focused {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let block = Block::default()
        .title(Span::styled(format!(" {} ", surface.name), title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cursor_bg = parse_color(&theme.cursor_line);
    let lines: Vec<Line> = surface
        .buffer
        .lines
        .iter()
        .enumerate()
        .map(|(y, text)| {
            let style = if focused && y == surface.cursor.y {
                Style::default().bg(cursor_bg)
            } else {
                Style::default()
            };
            Line::from(Span::styled(text.clone(), style))
        })
        .collect();

    // Keep the cursor line on screen
    let height = inner.height.max(1) as usize;
    let top = surface.cursor.y.saturating_sub(height - 1);

    f.render_widget(Paragraph::new(lines).scroll((top as u16, 0)), inner);
}

fn render_status_line<B: Backend>(f: &mut Frame<B>, editor: &Editor, theme: &Theme, area: Rect) {
    let status = match editor.focus().and_then(|id| editor.surface(id).ok()) {
        Some(surface) => {
            let tower = surface.tower();
            let mut status = format!(
                " {} | {} | level {}/{} of {}",
                surface.active_mode().unwrap_or("-").to_uppercase(),
                surface.name,
                surface.level(),
                tower.height() - 1,
                tower.name(),
            );
            if surface.active_level().is_none() {
                status.push_str(" (outside)");
            }
            if let Ok(Some(recall)) = editor.recall(surface.id) {
                status.push_str(&format!(" | recall {}", recall));
            }
            if editor.meta_session().is_some() {
                status.push_str(" | META");
            }
            status
        }
        None => " no surface".to_string(),
    };

    let status = match editor.last_message() {
        Some(message) => format!("{} | {}", status, message),
        None => status,
    };

    let status_bar = Paragraph::new(status).style(
        Style::default()
            .bg(parse_color(&theme.status_line_bg))
            .fg(parse_color(&theme.status_line_fg))
            .add_modifier(Modifier::BOLD),
    );

    f.render_widget(status_bar, area);
}

/// `#rrggbb` to a terminal color; anything else leaves the terminal default
fn parse_color(hex: &str) -> Color {
    let digits = match hex.strip_prefix('#') {
        Some(digits) if digits.len() == 6 => digits,
        _ => return Color::Reset,
    };
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Reset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::tests::{editor_with_tower, enter};
    use tui::{backend::TestBackend, Terminal};

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#3e4451"), Color::Rgb(0x3e, 0x44, 0x51));
        assert_eq!(parse_color("3e4451"), Color::Reset);
        assert_eq!(parse_color("#zzzzzz"), Color::Reset);
        assert_eq!(parse_color("#fff"), Color::Reset);
    }

    fn screen(editor: &Editor) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 8)).unwrap();
        terminal
            .draw(|f| render(f, editor, &Theme::default()))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|cell| cell.symbol.as_str()).collect()
    }

    #[test]
    fn test_status_line_shows_mode_and_level() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "tree");

        let text = screen(&editor);
        assert!(text.contains("TREE | scratch | level 2/2 of editing"));
    }

    #[test]
    fn test_meta_session_shows_both_surfaces() {
        let (mut editor, s) = editor_with_tower();
        enter(&mut editor, s, "word");
        editor.enter_meta().unwrap();

        let text = screen(&editor);
        assert!(text.contains("*tower:scratch*"));
        assert!(text.contains("1 | [word]"));
        assert!(text.contains("META"));
    }
}
