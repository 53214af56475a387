use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use cvm_fichas::{FundRecord, Registry, Session, Template};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

pub struct App<'a> {
    registry: &'a Registry,
    template: &'a Template,
    output_path: PathBuf,
    pub input: String,
    pub session: Session,
    pub state: TableState,
    pub focus: Focus,
    pub show_detail: bool,
    pub status: (StatusKind, String),
}

impl<'a> App<'a> {
    pub fn new(registry: &'a Registry, template: &'a Template, output_path: PathBuf) -> Self {
        Self {
            registry,
            template,
            output_path,
            input: String::new(),
            session: Session::new(),
            state: TableState::default(),
            focus: Focus::Input,
            show_detail: true,
            status: (
                StatusKind::Info,
                "Informe 1 ou mais CNPJs (separe por vírgula, ';' ou por linha)".to_string(),
            ),
        }
    }

    fn records(&self) -> &[FundRecord] {
        self.session
            .batch()
            .map(|b| b.records.records())
            .unwrap_or(&[])
    }

    pub fn selected_record(&self) -> Option<&FundRecord> {
        self.state.selected().and_then(|i| self.records().get(i))
    }

    /// "Consultar"
    pub fn consult(&mut self) {
        let batch = self.session.consult(self.registry, &self.input);
        let found = batch.records.len();
        let problems = batch.malformed.len() + batch.errors.len();

        self.status = if found == 0 && problems == 0 {
            (StatusKind::Info, "Nenhum CNPJ informado.".to_string())
        } else if found == 0 {
            (StatusKind::Error, format!("Nenhum fundo encontrado ({} problemas)", problems))
        } else {
            (
                StatusKind::Success,
                format!("{} fundo(s) encontrado(s), {} problema(s)", found, problems),
            )
        };

        self.state.select(if found > 0 { Some(0) } else { None });
        if found > 0 {
            self.focus = Focus::Results;
        }
    }

    /// "Gerar Fichas"
    pub fn generate(&mut self) {
        self.status = match self.session.generate(self.template) {
            Ok(Some(bytes)) => (
                StatusKind::Success,
                format!("Fichas geradas ({} bytes) - 's' para salvar", bytes.len()),
            ),
            Ok(None) => (StatusKind::Info, "Nada a gerar: consulte CNPJs primeiro".to_string()),
            Err(e) => (StatusKind::Error, format!("Erro ao gerar fichas: {}", e)),
        };
    }

    /// "Baixar Fichas (.zip)"
    pub fn save(&mut self) {
        self.status = match self.session.archive() {
            None => (StatusKind::Info, "Gere as fichas antes de salvar ('g')".to_string()),
            Some(bytes) => match std::fs::write(&self.output_path, bytes) {
                Ok(()) => (
                    StatusKind::Success,
                    format!("📦 Fichas salvas em {}", self.output_path.display()),
                ),
                Err(e) => (
                    StatusKind::Error,
                    format!("Erro ao salvar {}: {}", self.output_path.display(), e),
                ),
            },
        };
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Results,
            Focus::Results => Focus::Input,
        };
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next(&mut self) {
        let len = self.records().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i < len - 1 => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.records().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if handle_key(app, key) {
                return Ok(());
            }
        }
    }
}

/// Returns true when the app should quit
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char('c') if ctrl => return true,
        KeyCode::F(5) => app.consult(),
        KeyCode::Char('r') if ctrl => app.consult(),
        KeyCode::Char('g') if ctrl => app.generate(),
        KeyCode::Char('s') if ctrl => app.save(),
        KeyCode::Tab | KeyCode::BackTab => app.toggle_focus(),
        _ => match app.focus {
            Focus::Input => match key.code {
                KeyCode::Enter => app.input.push('\n'),
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Char(c) if !ctrl => app.input.push(c),
                _ => {}
            },
            Focus::Results => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Char('g') => app.generate(),
                KeyCode::Char('s') => app.save(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            },
        },
    }

    false
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(7), // CNPJ input
            Constraint::Min(0),    // Results
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0]);
    render_input(f, chunks[1], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);

    render_table(f, body[0], app);
    if app.show_detail && app.selected_record().is_some() {
        render_detail_panel(f, body[1], app);
    } else {
        render_messages(f, body[1], app);
    }

    render_status_bar(f, chunks[3], app);
}

fn focus_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![Span::styled(
        "Consulta de Fundo (CVM) por CNPJ",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_input(f: &mut Frame, area: Rect, app: &App) {
    let text: Text = if app.input.is_empty() && app.focus != Focus::Input {
        Line::from(Span::styled(
            "00.000.000/0000-00, 11.111.111/1111-11",
            Style::default().fg(Color::DarkGray),
        ))
        .into()
    } else {
        app.input.clone().into()
    };

    let input = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_style(app.focus == Focus::Input))
                .title(" CNPJs (F5 consultar) "),
        );

    f.render_widget(input, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Codigo_CVM", "CNPJ_Fundo", "Denominacao_Social"]
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

    let rows: Vec<Row> = app
        .records()
        .iter()
        .map(|record| {
            Row::new(vec![
                Cell::from(record.codigo_cvm.clone()),
                Cell::from(record.cnpj_fundo.clone()),
                Cell::from(truncate(&record.denominacao_social, 40)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(20),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(app.focus == Focus::Results))
            .title(" Fundos "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some(record) = app.selected_record() else {
        return;
    };

    let lines: Vec<Line> = record
        .fields()
        .into_iter()
        .map(|(name, value)| {
            Line::from(vec![
                Span::styled(format!("{:<20}", name), Style::default().fg(Color::Cyan)),
                Span::raw(value.to_string()),
            ])
        })
        .collect();

    let detail = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Detalhe (Enter) "),
    );

    f.render_widget(detail, area);
}

fn render_messages(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();

    if let Some(batch) = app.session.batch() {
        if !batch.malformed.is_empty() {
            lines.push(Line::from(Span::styled(
                "CNPJs inválidos (não têm 14 dígitos):",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            for item in &batch.malformed {
                lines.push(Line::from(format!("  {}", item)));
            }
            lines.push(Line::from(""));
        }

        if !batch.errors.is_empty() {
            lines.push(Line::from(Span::styled(
                "Erros:",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            for err in &batch.errors {
                lines.push(Line::from(format!("  {}", err)));
            }
        }
    }

    let messages = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Avisos "),
    );

    f.render_widget(messages, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (kind, message) = &app.status;
    let color = match kind {
        StatusKind::Info => Color::White,
        StatusKind::Success => Color::Green,
        StatusKind::Error => Color::Red,
    };

    let status_spans = vec![
        Span::styled(format!(" {} ", message), Style::default().fg(color)),
        Span::raw(" | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Foco | "),
        Span::styled("g", Style::default().fg(Color::Yellow)),
        Span::raw(" Gerar | "),
        Span::styled("s", Style::default().fg(Color::Yellow)),
        Span::raw(" Salvar | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Sair"),
    ];

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{}...", cut)
    }
}
