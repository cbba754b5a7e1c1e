/*
 * This file is part of Amdfand.
 *
 * Copyright (C) 2025 Amdfand contributors
 *
 * Amdfand is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Amdfand is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Amdfand. If not, see <https://www.gnu.org/licenses/>.
 */

//! Read-only terminal monitor. Shows per-card temperature, fan RPM, and PWM
//! state, refreshing once per second. Never writes to the hardware, so it
//! runs without privileges.

use std::io::stdout;
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Row, Table};
use ratatui::{Frame, Terminal};

use crate::card::Card;
use crate::scanner::Scanner;

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

struct CardReading {
    id: String,
    temp: String,
    rpm: String,
    pwm: String,
    pwm_range: String,
}

fn sample(card: &Card) -> CardReading {
    let fmt_or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    CardReading {
        id: card.id().to_string(),
        temp: fmt_or_dash(card.gpu_temp().ok().map(|t| format!("{:.1} °C", t))),
        rpm: fmt_or_dash(card.fan_speed().ok().map(|r| format!("{} RPM", r))),
        pwm: fmt_or_dash(card.pwm().ok().map(|v| v.to_string())),
        pwm_range: match (card.fan_min(), card.fan_max()) {
            (Ok(min), Ok(max)) => format!("{}..{}", min, max),
            _ => "-".to_string(),
        },
    }
}

fn draw(f: &mut Frame, readings: &[CardReading]) {
    let chunks = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(f.area());

    let header = Row::new(vec!["Card", "Temp", "Fan", "PWM", "PWM range"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = readings
        .iter()
        .map(|r| {
            Row::new(vec![
                r.id.clone(),
                r.temp.clone(),
                r.rpm.clone(),
                r.pwm.clone(),
                r.pwm_range.clone(),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Cards "),
    );
    f.render_widget(table, chunks[0]);

    let status = Paragraph::new("q/Esc quit").style(Style::default().fg(Color::Gray));
    f.render_widget(status, chunks[1]);
}

/// Run the monitor until the user quits.
pub fn run_monitor(sysfs_root: &Path) -> anyhow::Result<()> {
    let scanner = Scanner::discover(sysfs_root, None)?;

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let res = run_loop(&mut terminal, &scanner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_loop(
    terminal: &mut Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
    scanner: &Scanner,
) -> anyhow::Result<()> {
    let mut readings: Vec<CardReading> = scanner.cards().iter().map(sample).collect();
    let mut last_refresh = Instant::now();

    loop {
        terminal.draw(|f| draw(f, &readings))?;

        let timeout = REFRESH_INTERVAL.saturating_sub(last_refresh.elapsed());
        if event::poll(timeout).unwrap_or(false) {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    return Ok(());
                }
            }
        }

        if last_refresh.elapsed() >= REFRESH_INTERVAL {
            readings = scanner.cards().iter().map(sample).collect();
            last_refresh = Instant::now();
        }
    }
}
