//! Panels for the terminal dashboard

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};
use ratatui::Frame;

use super::{Phase, Progress};

const ACCENT: Color = Color::Yellow;

/// Current phase and a one-line detail
pub struct StatusPanel {
    phase: Phase,
    info: String,
}

impl StatusPanel {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            info: String::new(),
        }
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let (indicator, color) = match self.phase {
            Phase::Loading => ("↓", ACCENT),
            Phase::Correcting => ("✎", ACCENT),
            Phase::Repointing => ("⇢", ACCENT),
            Phase::Deduplicating => ("✂", ACCENT),
            Phase::Verifying => ("?", ACCENT),
            Phase::Complete => ("✓", Color::Green),
        };
        let phase_style = Style::default().fg(color).add_modifier(Modifier::BOLD);

        let lines = vec![
            Line::from(vec![
                Span::styled(format!(" {} ", indicator), phase_style),
                Span::styled(self.phase.to_string(), phase_style),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                format!("   {}", self.info),
                Style::default().fg(Color::Gray),
            )),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Pokédex reconcile ")
            .border_style(Style::default().fg(Color::Red));

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

pub struct ProgressPanel {
    progress: Option<Progress>,
}

impl ProgressPanel {
    pub fn new() -> Self {
        Self { progress: None }
    }

    pub fn set_progress(&mut self, progress: Progress) {
        self.progress = Some(progress);
    }

    pub fn clear(&mut self) {
        self.progress = None;
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::LEFT | Borders::RIGHT)
            .border_style(Style::default().fg(Color::Red));

        let Some(progress) = &self.progress else {
            frame.render_widget(Paragraph::new("").block(block), area);
            return;
        };

        let label = if progress.total > 0 {
            format!("{}: {}/{}", progress.label, progress.current, progress.total)
        } else {
            format!("{}: {}", progress.label, progress.current)
        };

        let gauge = Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(ACCENT).bg(Color::DarkGray))
            .ratio(progress.ratio().min(1.0))
            .label(label);

        frame.render_widget(gauge, area);
    }
}

/// Named counters in insertion order
pub struct TallyPanel {
    entries: Vec<(String, u64)>,
}

impl TallyPanel {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn set(&mut self, label: impl Into<String>, count: u64) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = count,
            None => self.entries.push((label, count)),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Changes ")
            .border_style(Style::default().fg(Color::Red));

        let width = self.entries.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|(label, count)| {
                let count_style = if *count == 0 {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!(" {:width$} ", label, width = width)),
                    Span::styled(count.to_string(), count_style),
                ]))
            })
            .collect();

        frame.render_widget(List::new(items).block(block), area);
    }
}

/// Scrolling activity log, newest line highlighted
pub struct LogPanel {
    entries: Vec<String>,
    max_entries: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: 200,
        }
    }

    pub fn add(&mut self, message: impl Into<String>) {
        self.entries.push(message.into());
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Activity ")
            .border_style(Style::default().fg(Color::Red));

        let visible_height = area.height.saturating_sub(2) as usize;
        let start = self.entries.len().saturating_sub(visible_height);
        let last = self.entries.len().saturating_sub(1);

        let items: Vec<ListItem> = self.entries[start..]
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let style = if start + i == last {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                ListItem::new(Span::styled(format!(" {}", entry), style))
            })
            .collect();

        frame.render_widget(List::new(items).block(block), area);
    }
}
