use anyhow::Result;
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
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use split_bill::{settle, ExpenseRecord, ExpenseStore, GroupTotal, ParticipantStatus, SettlementReport};
use std::io;

const PAGE_STEP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Expenses,
    Settlement,
    Charts,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Expenses => Page::Settlement,
            Page::Settlement => Page::Charts,
            Page::Charts => Page::Expenses,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Expenses => Page::Charts,
            Page::Settlement => Page::Expenses,
            Page::Charts => Page::Settlement,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Expenses => "Expenses",
            Page::Settlement => "Settlement",
            Page::Charts => "Charts",
        }
    }
}

pub struct App {
    pub records: Vec<ExpenseRecord>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    /// None when there is nothing to settle
    pub settlement: Option<SettlementReport>,
    pub by_participant: Vec<GroupTotal>,
    pub by_description: Vec<GroupTotal>,
    pub message: Option<String>,
}

impl App {
    pub fn new(records: Vec<ExpenseRecord>) -> Self {
        let mut app = Self {
            records: Vec::new(),
            state: TableState::default(),
            current_page: Page::Expenses,
            show_detail: false,
            settlement: None,
            by_participant: Vec::new(),
            by_description: Vec::new(),
            message: None,
        };
        app.reload(records);
        app
    }

    /// Replace the snapshot and recompute everything derived from it
    pub fn reload(&mut self, records: Vec<ExpenseRecord>) {
        self.settlement = match settle(&records) {
            Ok(report) => Some(report),
            Err(e) if e.is_empty_input() => None,
            Err(e) => {
                self.message = Some(e.to_string());
                None
            }
        };
        self.by_participant = split_bill::totals_by_participant(&records);
        self.by_description = split_bill::totals_by_description(&records);
        self.records = records;

        let selected = match self.state.selected() {
            _ if self.records.is_empty() => None,
            Some(i) => Some(i.min(self.records.len() - 1)),
            None => Some(0),
        };
        self.state.select(selected);
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_expense(&self) -> Option<&ExpenseRecord> {
        self.state.selected().and_then(|i| self.records.get(i))
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_STEP).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.records.is_empty() {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| i.saturating_sub(PAGE_STEP))
            .unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }
}

pub fn run_ui(app: &mut App, store: &mut dyn ExpenseStore) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, store);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    store: &mut dyn ExpenseStore,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('r') => {
                    app.reload(store.list()?);
                    app.message = Some("Reloaded".to_string());
                }
                KeyCode::Char('x') if app.current_page == Page::Expenses => {
                    if let Some(id) = app.selected_expense().map(|r| r.id.clone()) {
                        let deleted = store.delete(&id)?;
                        app.reload(store.list()?);
                        app.message = Some(if deleted {
                            "Expense deleted successfully!".to_string()
                        } else {
                            "Expense was already gone".to_string()
                        });
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home if !app.records.is_empty() => app.state.select(Some(0)),
                KeyCode::End if !app.records.is_empty() => {
                    app.state.select(Some(app.records.len() - 1));
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Expenses {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Expenses => render_table(f, chunks[1], app),
            Page::Settlement => render_settlement(f, chunks[1], app),
            Page::Charts => render_charts(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Expenses, Page::Settlement, Page::Charts];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Expenses: {}", app.records.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Total Bill: ₹{:.2}", app.total()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(Line::from(tab_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Split Bill "),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Date", "Participant", "Amount", "Description"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.records.iter().map(|record| {
        Row::new(vec![
            Cell::from(record.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            Cell::from(record.participant.clone()),
            Cell::from(format!("{:.2}", record.amount)).style(Style::default().fg(Color::Green)),
            Cell::from(truncate(&record.description, 40)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(16),
            Constraint::Length(12),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" All Expenses "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_settlement(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Each User Should Receive/Pay ");

    let report = match &app.settlement {
        Some(report) => report,
        None => {
            let empty = Paragraph::new("  No expenses added yet.").block(block);
            f.render_widget(empty, area);
            return;
        }
    };

    let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Total Bill: ", heading),
            Span::raw(format!("₹{:.2}", report.total)),
            Span::styled("   Equal Share: ", heading),
            Span::raw(format!("₹{:.2}", report.equal_share)),
        ]),
        Line::from(""),
    ];

    for line in &report.participants {
        let color = match line.status {
            ParticipantStatus::Receives(_) => Color::Green,
            ParticipantStatus::Owes(_) => Color::Red,
            ParticipantStatus::Settled => Color::White,
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(line.status.describe(&line.participant), Style::default().fg(color)),
            Span::styled(
                format!("   (paid ₹{:.2})", line.contribution),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from("  ─────────────────────────────────────"));
    lines.push(Line::from(""));

    if report.transfers.is_empty() {
        lines.push(Line::from("  Everyone is settled."));
    }
    for transfer in &report.transfers {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(transfer.payer.clone(), Style::default().fg(Color::Red)),
            Span::raw(format!(" will pay ₹{:.2} to ", transfer.amount)),
            Span::styled(transfer.receiver.clone(), Style::default().fg(Color::Green)),
        ]));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn bars(totals: &[GroupTotal], color: Color) -> Vec<Bar<'static>> {
    totals
        .iter()
        .map(|group| {
            Bar::default()
                .value(group.amount.round().max(0.0) as u64)
                .text_value(format!("{:.0}", group.amount))
                .label(Line::from(truncate(&group.label, 12)))
                .style(Style::default().fg(color))
        })
        .collect()
}

fn render_charts(f: &mut Frame, area: Rect, app: &App) {
    if app.records.is_empty() {
        let empty = Paragraph::new("  No expenses to plot.").block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Expense Graphs "),
        );
        f.render_widget(empty, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let by_user = bars(&app.by_participant, Color::LightBlue);
    let by_user_chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Total Expenses by User "),
        )
        .data(BarGroup::default().bars(&by_user))
        .bar_width(12)
        .bar_gap(2);
    f.render_widget(by_user_chart, chunks[0]);

    let by_description = bars(&app.by_description, Color::LightGreen);
    let by_description_chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Total Expenses by Description "),
        )
        .data(BarGroup::default().bars(&by_description))
        .bar_width(12)
        .bar_gap(2);
    f.render_widget(by_description_chart, chunks[1]);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.records.len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(message) = &app.message {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(message.clone(), Style::default().fg(Color::Green)));
    }

    let keys = [
        ("Enter", " Details | "),
        ("Tab", " Page | "),
        ("↑/↓", " Nav | "),
        ("x", " Delete | "),
        ("r", " Reload | "),
    ];
    status_spans.push(Span::raw(" | "));
    for (key, label) in keys {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Expense Details ");

    let record = match app.selected_expense() {
        Some(r) => r,
        None => {
            f.render_widget(Paragraph::new("No expense selected").block(block), area);
            return;
        }
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let content = vec![
        Line::from(""),
        Line::from(vec![Span::styled("  Participant: ", label), Span::raw(record.participant.clone())]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Amount: ", label),
            Span::styled(format!("₹{:.2}", record.amount), Style::default().fg(Color::Green)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled("  Description: ", label), Span::raw(record.description.clone())]),
        Line::from(""),
        Line::from(vec![Span::styled("  Added: ", label), Span::raw(record.timestamp.to_rfc3339())]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Id: ", label),
            Span::styled(record.id.clone(), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Press Enter to close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
