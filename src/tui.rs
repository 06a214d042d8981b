use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::cell::RefCell;
use std::io::stdout;
use std::rc::Rc;

use crate::lifecycle::MatchSession;
use crate::models::{InterestRecord, InterestStatus};

struct ViewState {
    selected: usize,
    scroll_offset: u16,
    show_archived: bool,
    toasts: Rc<RefCell<Vec<String>>>,
}

impl ViewState {
    fn new(toasts: Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            selected: 0,
            scroll_offset: 0,
            show_archived: false,
            toasts,
        }
    }

    fn next(&mut self, len: usize) {
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn clamp(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn last_toast(&self) -> Option<String> {
        self.toasts.borrow().last().cloned()
    }
}

fn visible<'s>(session: &'s MatchSession, view: &ViewState) -> &'s [InterestRecord] {
    if view.show_archived {
        &session.matches().archived
    } else {
        &session.matches().active
    }
}

pub fn run_browse(session: &mut MatchSession, toasts: Rc<RefCell<Vec<String>>>) -> Result<()> {
    if session.matches().active.is_empty() && session.matches().archived.is_empty() {
        println!("No matches yet.");
        return Ok(());
    }

    let mut view = ViewState::new(toasts);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, session, &mut view);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    session: &mut MatchSession,
    view: &mut ViewState,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, session, view, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let len = visible(session, view).len();
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => view.next(len),
                KeyCode::Up | KeyCode::Char('k') => view.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => view.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => view.scroll_up(),
                KeyCode::Tab => {
                    view.show_archived = !view.show_archived;
                    view.selected = 0;
                    view.scroll_offset = 0;
                }
                KeyCode::Char('a') => {
                    if !view.show_archived {
                        let id = visible(session, view)
                            .get(view.selected)
                            .map(|r| r.id.clone());
                        if let Some(id) = id {
                            let _ = session.accept(&id);
                        }
                    }
                }
                KeyCode::Char('x') => {
                    if !view.show_archived {
                        let id = visible(session, view)
                            .get(view.selected)
                            .map(|r| r.id.clone());
                        if let Some(id) = id {
                            let _ = session.decline(&id);
                            view.clamp(visible(session, view).len());
                        }
                    }
                }
                KeyCode::Char('r') => {
                    session.refresh();
                    view.clamp(visible(session, view).len());
                }
                _ => {}
            }
            list_state.select(Some(view.selected));
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, session: &MatchSession, view: &ViewState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(frame.area());

    let records = visible(session, view);

    // Left panel: match list
    let items: Vec<ListItem> = records
        .iter()
        .map(|record| {
            let status_icon = match record.status {
                InterestStatus::Pending => " ",
                InterestStatus::Accepted => "+",
                InterestStatus::Rejected => "x",
            };
            let name = if record.company.name.len() > 30 {
                format!("{}...", &record.company.name[..27])
            } else {
                record.company.name.clone()
            };
            let industry = record.company.industry.as_deref().unwrap_or("?");
            ListItem::new(format!("{} {} | {}", status_icon, name, industry))
        })
        .collect();

    let title = if view.show_archived {
        format!(" Archived ({}) ", records.len())
    } else {
        format!(" Matches ({}) ", records.len())
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: match detail
    let detail = build_detail(records.get(view.selected));
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((view.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer: last toast above the keymap
    let footer_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    if let Some(toast) = view.last_toast() {
        let toast_line =
            Paragraph::new(format!(" {}", toast)).style(Style::default().fg(Color::Red));
        frame.render_widget(toast_line, footer_area[1]);
    }

    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  Tab:active/archived  a:accept  x:decline  r:refresh  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, footer_area[2]);
}

fn build_detail(record: Option<&InterestRecord>) -> Text<'_> {
    let Some(record) = record else {
        return Text::raw("No match selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        &record.company.name,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("id: {}", record.id)));

    let status_style = match record.status {
        InterestStatus::Pending => Style::default().fg(Color::Yellow),
        InterestStatus::Accepted => Style::default().fg(Color::Green),
        InterestStatus::Rejected => Style::default().fg(Color::Red),
    };
    lines.push(Line::from(Span::styled(
        format!("Status: {}", record.status.as_str()),
        status_style,
    )));

    if let Some(industry) = &record.company.industry {
        lines.push(Line::from(format!("Industry: {}", industry)));
    }
    if let Some(location) = &record.company.location {
        lines.push(Line::from(format!("Location: {}", location)));
    }
    if let Some(size) = &record.company.size {
        lines.push(Line::from(format!("Size: {}", size)));
    }
    if let Some(contact) = &record.company.contact_email {
        lines.push(Line::from(format!("Contact: {}", contact)));
    }

    lines.push(Line::from(""));

    if !record.skills_required.is_empty() {
        lines.push(Line::from(Span::styled(
            "SKILLS",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("  {}", record.skills_required.join(", "))));
        lines.push(Line::from(""));
    }

    if let Some(details) = &record.internship_details {
        lines.push(Line::from(Span::styled(
            "INTERNSHIP",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(details, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    if let Some(message) = &record.message {
        lines.push(Line::from(Span::styled(
            "MESSAGE",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(message, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    if let Some(description) = &record.company.description {
        lines.push(Line::from(Span::styled(
            "COMPANY",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(description, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    } else if record.message.is_none() && record.internship_details.is_none() {
        lines.push(Line::from(Span::styled(
            "(No details provided)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}
