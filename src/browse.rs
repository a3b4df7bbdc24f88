use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use arboard::Clipboard;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Terminal,
};

use crate::config::Settings;
use crate::dataset::Device;
use crate::search;

/// One line of the result list: a category header or a selectable device.
enum Row<'a> {
    Category(&'a str, usize),
    Device(&'a Device),
}

/// Full-screen live search over the dataset. Typing filters as you go,
/// Enter copies the selected device's based-on reference, Ctrl+O opens the
/// source page.
pub fn run(devices: Vec<Device>, settings: &Settings) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let result = event_loop(&mut terminal, &devices, settings);

    // Restore terminal regardless of result.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    devices: &[Device],
    settings: &Settings,
) -> Result<()> {
    let mut query = String::new();
    let mut selected = 0usize;
    let mut status = format!("{} devices loaded", devices.len());
    // Created on first copy and then kept alive for the whole session, so
    // the copied selection survives on X11 until the view exits.
    let mut clipboard: Option<Clipboard> = None;

    loop {
        let matches = search::filter(devices, &query);
        let shown = matches.len();
        let groups = search::group(matches);
        let rows = flatten(&groups);

        let selectable = device_count(&rows);
        if selected >= selectable {
            selected = selectable.saturating_sub(1);
        }
        let highlight = list_index(&rows, selected);

        terminal.draw(|f| draw_ui(f, &rows, highlight, &query, &status, shown))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            match (key.code, key.modifiers) {
                (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => break,
                (KeyCode::Char('o'), KeyModifiers::CONTROL) => {
                    status = match open::that(&settings.source_url) {
                        Ok(()) => "Opened source page in browser".to_string(),
                        Err(e) => format!("Open failed: {}", e),
                    };
                }
                (KeyCode::Enter, _) => {
                    status = match selected_device(&rows, selected) {
                        Some(device) => match device.reference() {
                            Some(reference) => match copy_text(&mut clipboard, reference) {
                                Ok(()) => format!("Copied \"{}\"", reference),
                                Err(e) => format!("Copy failed: {}", e),
                            },
                            None => "This device has no based-on reference".to_string(),
                        },
                        None => "No device selected".to_string(),
                    };
                }
                (KeyCode::Up, _) => selected = selected.saturating_sub(1),
                (KeyCode::Down, _) => {
                    if selected + 1 < selectable {
                        selected += 1;
                    }
                }
                (KeyCode::Backspace, _) => {
                    query.pop();
                    selected = 0;
                }
                (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => {
                    query.push(c);
                    selected = 0;
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Lay groups out as one flat list: each category header followed by its
/// devices.
fn flatten<'a>(groups: &[search::Group<'a>]) -> Vec<Row<'a>> {
    let mut rows = Vec::new();
    for group in groups {
        rows.push(Row::Category(group.category, group.devices.len()));
        for device in &group.devices {
            rows.push(Row::Device(device));
        }
    }
    rows
}

fn device_count(rows: &[Row]) -> usize {
    rows.iter().filter(|r| matches!(r, Row::Device(_))).count()
}

/// Position in the flat list of the nth device row.
fn list_index(rows: &[Row], nth: usize) -> Option<usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, r)| matches!(r, Row::Device(_)))
        .nth(nth)
        .map(|(i, _)| i)
}

fn selected_device<'a>(rows: &[Row<'a>], nth: usize) -> Option<&'a Device> {
    rows.iter()
        .filter_map(|r| match r {
            Row::Device(d) => Some(*d),
            Row::Category(..) => None,
        })
        .nth(nth)
}

fn copy_text(clipboard: &mut Option<Clipboard>, text: &str) -> Result<()> {
    if clipboard.is_none() {
        *clipboard = Some(Clipboard::new().context("clipboard unavailable")?);
    }
    if let Some(cb) = clipboard.as_mut() {
        cb.set_text(text).context("clipboard write failed")?;
    }
    Ok(())
}

// ─── UI rendering ─────────────────────────────────────────────────────────────

fn draw_ui(
    f: &mut ratatui::Frame,
    rows: &[Row],
    highlight: Option<usize>,
    query: &str,
    status: &str,
    shown: usize,
) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(3),    // result list
            Constraint::Length(3), // search input
            Constraint::Length(1), // help line
        ])
        .split(area);

    render_header(f, chunks[0], status, shown);
    render_results(f, chunks[1], rows, highlight);
    render_input(f, chunks[2], query);
    render_help(f, chunks[3]);
}

fn render_header(f: &mut ratatui::Frame, area: Rect, status: &str, shown: usize) {
    let header = Paragraph::new(format!(" tonedex  |  {} shown  |  {}", shown, status))
        .style(Style::default().bg(Color::Rgb(24, 24, 36)).fg(Color::White));
    f.render_widget(header, area);
}

fn render_results(f: &mut ratatui::Frame, area: Rect, rows: &[Row], highlight: Option<usize>) {
    let items: Vec<ListItem> = if rows.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "  no matching devices",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        rows.iter()
            .map(|row| match row {
                Row::Category(name, count) => ListItem::new(Line::from(Span::styled(
                    format!("{} ({})", name, count),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))),
                Row::Device(device) => {
                    let mut spans = vec![Span::styled(
                        format!("  {}", device.name),
                        Style::default().fg(Color::White),
                    )];
                    if let Some(reference) = device.reference() {
                        spans.push(Span::styled(
                            format!("  {}", reference),
                            Style::default().fg(Color::Gray),
                        ));
                    }
                    spans.push(Span::styled(
                        format!("  [{}]", device.category),
                        Style::default().fg(Color::DarkGray),
                    ));
                    ListItem::new(Line::from(spans))
                }
            })
            .collect()
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Devices"))
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(48, 52, 70))
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default().with_selected(highlight);
    f.render_stateful_widget(list, area, &mut state);
}

fn render_input(f: &mut ratatui::Frame, area: Rect, query: &str) {
    let input = Paragraph::new(format!("> {query}▌"))
        .block(Block::default().borders(Borders::ALL).title("Search"))
        .style(Style::default().fg(Color::White));
    f.render_widget(input, area);
}

fn render_help(f: &mut ratatui::Frame, area: Rect) {
    let help = Paragraph::new(
        " type to filter  |  ↑/↓: select  |  Enter: copy based-on  |  Ctrl+O: open source page  |  Esc: quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, area);
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn device(category: &'static str, name: &'static str, based_on: &'static str) -> Device {
        Device {
            category: category.into(),
            name: name.into(),
            based_on: based_on.into(),
        }
    }

    fn sample() -> Vec<Device> {
        vec![
            device("Drives", "Tube Drive", "Ibanez TS9"),
            device("Amps", "Brit 800", "Marshall JCM800"),
            device("Amps", "Twin", ""),
        ]
    }

    #[test]
    fn flatten_interleaves_headers_and_devices() {
        let devices = sample();
        let groups = search::group(search::filter(&devices, ""));
        let rows = flatten(&groups);

        let shape: Vec<String> = rows
            .iter()
            .map(|r| match r {
                Row::Category(name, n) => format!("{name}/{n}"),
                Row::Device(d) => d.name.clone(),
            })
            .collect();
        assert_eq!(shape, ["Amps/2", "Brit 800", "Twin", "Drives/1", "Tube Drive"]);
    }

    #[test]
    fn selection_skips_category_headers() {
        let devices = sample();
        let groups = search::group(search::filter(&devices, ""));
        let rows = flatten(&groups);

        assert_eq!(device_count(&rows), 3);
        assert_eq!(list_index(&rows, 0), Some(1));
        assert_eq!(list_index(&rows, 1), Some(2));
        assert_eq!(list_index(&rows, 2), Some(4));
        assert_eq!(list_index(&rows, 3), None);

        assert_eq!(selected_device(&rows, 0).unwrap().name, "Brit 800");
        assert_eq!(selected_device(&rows, 2).unwrap().name, "Tube Drive");
        assert!(selected_device(&rows, 3).is_none());
    }

    #[test]
    fn empty_results_flatten_to_nothing() {
        let devices = sample();
        let groups = search::group(search::filter(&devices, "no such device"));
        let rows = flatten(&groups);
        assert!(rows.is_empty());
        assert_eq!(list_index(&rows, 0), None);
        assert!(selected_device(&rows, 0).is_none());
    }
}
