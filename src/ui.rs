use anyhow::{Context, Result};
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use std::str::FromStr;

use crate::app::{App, InputMode, LoadState};
use crate::config::ThemeSpec;
use crate::model::{
    CanonicalRecord, DisplayRow, DisplayZone, ResourceKind, ResourceStatus, ViewMode,
};
use crate::schedule::cron_fields;

const PL_RIGHT: &str = "\u{e0b0}";
const PL_LEFT: &str = "\u{e0b2}";
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_D: Color = Color::Rgb(82, 24, 124);

/// Colours used by every widget. Built once from the config file and rebuilt on reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: Color,
    pub panel: Color,
    pub accent: Color,
    pub muted: Color,
    pub border: Color,
    pub selection: Color,
    pub error: Color,
    pub running: Color,
    pub succeeded: Color,
    pub failed: Color,
    pub pending: Color,
    pub unknown: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(9, 15, 25),
            panel: Color::Rgb(16, 27, 44),
            accent: Color::Rgb(52, 211, 153),
            muted: Color::Rgb(140, 156, 178),
            border: Color::Rgb(52, 211, 153),
            selection: Color::Rgb(24, 36, 58),
            error: Color::Rgb(248, 113, 113),
            running: Color::Rgb(96, 165, 250),
            succeeded: Color::Rgb(74, 222, 128),
            failed: Color::Rgb(248, 113, 113),
            pending: Color::Rgb(251, 191, 36),
            unknown: Color::Rgb(148, 163, 184),
        }
    }
}

impl Theme {
    pub fn from_spec(spec: &ThemeSpec) -> Result<Self> {
        let mut theme = Self::default();
        override_color(&mut theme.accent, spec.accent.as_deref(), "accent")?;
        override_color(&mut theme.border, spec.border.as_deref(), "border")?;
        override_color(&mut theme.selection, spec.selection.as_deref(), "selection")?;
        override_color(&mut theme.running, spec.running.as_deref(), "running")?;
        override_color(&mut theme.succeeded, spec.succeeded.as_deref(), "succeeded")?;
        override_color(&mut theme.failed, spec.failed.as_deref(), "failed")?;
        override_color(&mut theme.pending, spec.pending.as_deref(), "pending")?;
        override_color(&mut theme.unknown, spec.unknown.as_deref(), "unknown")?;
        Ok(theme)
    }

    pub fn status_color(&self, status: ResourceStatus) -> Color {
        match status {
            ResourceStatus::Running => self.running,
            ResourceStatus::Succeeded => self.succeeded,
            ResourceStatus::Failed => self.failed,
            ResourceStatus::Pending => self.pending,
            ResourceStatus::Unknown => self.unknown,
        }
    }
}

fn override_color(slot: &mut Color, value: Option<&str>, name: &str) -> Result<()> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(());
    };
    *slot = Color::from_str(value)
        .ok()
        .with_context(|| format!("invalid theme.{name} colour {value:?}"))?;
    Ok(())
}

pub fn render(frame: &mut Frame, app: &mut App, theme: &Theme) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let now = Timestamp::now();
    render_header(frame, root[0], app, theme);
    render_body(frame, root[1], app, theme, now);
    render_footer(frame, root[2], app, theme);

    if let Some(record) = app.detail() {
        render_detail_modal(frame, record, app.display_zone(), theme, now);
    }
    if app.show_help() {
        render_help_modal(frame, app, theme);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let left_line = build_left_header_line(app, theme);
    let right_line = build_view_tabs_line(app, theme);
    let right_width = spans_width(&right_line.spans) as u16;
    if area.width < 42 || right_width == 0 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(theme.background).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(theme.background).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right_line).style(Style::default().bg(theme.background)),
        chunks[1],
    );
}

fn build_left_header_line(app: &App, theme: &Theme) -> Line<'static> {
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " flowtop ", Color::Black, theme.accent, PL_A);
    push_powerline_segment(
        &mut spans,
        format!(" ctx {} ", compact_text(app.context(), 24)),
        Color::White,
        PL_A,
        PL_B,
    );
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(&display_cluster_endpoint(app.cluster()), 32)),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(
        &mut spans,
        format!(" ns {} ", compact_text(&app.namespace_scope().label(), 20)),
        Color::White,
        PL_C,
        PL_D,
    );
    push_powerline_segment(
        &mut spans,
        format!(
            " sort:{}  tz:{} ",
            app.sort_mode().label(),
            app.display_zone().label()
        ),
        Color::White,
        PL_D,
        theme.background,
    );
    Line::from(spans)
}

fn build_view_tabs_line(app: &App, theme: &Theme) -> Line<'static> {
    let mut spans = Vec::new();
    let mut previous_bg = theme.background;
    for (index, view) in ViewMode::ALL.iter().enumerate() {
        let active = *view == app.view_mode();
        let bg = if active {
            Color::Rgb(59, 130, 246)
        } else {
            Color::Rgb(30, 41, 59)
        };
        let fg = if active { Color::Black } else { Color::White };
        let label = format!(" {}:{} ", index + 1, view.title());
        push_powerline_segment_rtl(&mut spans, label, fg, bg, previous_bg);
        previous_bg = bg;
    }
    spans.push(Span::styled(" ", Style::default().bg(previous_bg)));
    Line::from(spans)
}

fn render_body(frame: &mut Frame, area: Rect, app: &mut App, theme: &Theme, now: Timestamp) {
    app.set_page_size(table_rows_visible(area));

    if let Some(error) = app.error() {
        render_error_panel(frame, area, error, theme);
        return;
    }

    if app.load_state() == LoadState::Idle {
        let waiting = Paragraph::new("Waiting for the first poll...")
            .alignment(Alignment::Center)
            .block(panel_block("flowtop", theme.muted, theme))
            .style(Style::default().fg(theme.muted));
        frame.render_widget(waiting, area);
        return;
    }

    render_table(frame, area, app, theme, now);
}

fn render_error_panel(frame: &mut Frame, area: Rect, error: &str, theme: &Theme) {
    let mut text = Text::from(error.to_string());
    text.lines.push(Line::from(""));
    text.lines.push(Line::from(Span::styled(
        "The last good data returns after the next successful poll. r retries, q quits.",
        Style::default().fg(theme.muted),
    )));
    let panel = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(panel_block("Refresh Error", theme.error, theme))
        .style(Style::default().fg(theme.error));
    frame.render_widget(panel, area);
}

fn render_table(frame: &mut Frame, area: Rect, app: &App, theme: &Theme, now: Timestamp) {
    let view = app.view_mode();
    let zone = app.display_zone();
    let tz = zone.time_zone();
    let headers = column_headers(view, zone);
    let status_column = 3;

    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(header.clone()).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(theme.accent));

    let rows = app.rows().iter().map(|row| {
        let status_color = theme.status_color(row.record.status);
        Row::new(
            row_cells(row, view, &tz, now)
                .into_iter()
                .enumerate()
                .map(|(index, cell)| {
                    let color = if index == status_column {
                        status_color
                    } else {
                        Color::White
                    };
                    Cell::from(cell).style(Style::default().fg(color))
                }),
        )
    });

    let title = format!(
        "{} ({}/{})",
        view.title(),
        app.rows().len(),
        app.record_count()
    );
    let table = Table::new(rows, column_constraints(view))
        .header(header_row)
        .block(panel_block(title, theme.border, theme))
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(theme.selection)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(app.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let mut spans = Vec::new();
    let (mode_label, mode_bg) = match app.mode() {
        InputMode::Normal => (" nrm ", PL_A),
        InputMode::Detail => (" detail ", PL_C),
    };
    let status_bg = if app.error().is_some() {
        theme.error
    } else {
        PL_B
    };
    push_powerline_segment(&mut spans, mode_label, Color::White, mode_bg, status_bg);
    let status_width = area.width.saturating_sub(30).max(24) as usize;
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(app.status(), status_width)),
        Color::White,
        status_bg,
        theme.background,
    );

    let mut glance = format!("{} rows", app.rows().len());
    if app.fetch_in_flight() {
        glance.push_str("  polling");
    }
    if let Some(stamp) = app.last_refresh() {
        glance.push_str(&format!("  updated {stamp}"));
    }
    glance.push_str("  ? help ");
    let right_spans = vec![Span::styled(glance, Style::default().fg(theme.muted))];

    let right_width = (spans_width(&right_spans) as u16).min(area.width.saturating_sub(28));
    if right_width == 0 {
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.background)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.background)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(Style::default().bg(theme.background))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn render_detail_modal(
    frame: &mut Frame,
    record: &CanonicalRecord,
    zone: DisplayZone,
    theme: &Theme,
    now: Timestamp,
) {
    let area = centered_rect(64, 76, frame.area());
    frame.render_widget(Clear, area);

    let tz = zone.time_zone();
    let label_style = Style::default().fg(theme.muted);
    let section_style = Style::default()
        .fg(theme.accent)
        .add_modifier(Modifier::BOLD);
    let field_line = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<12}", format!("{label}:")), label_style),
            Span::raw(value),
        ])
    };

    let mut lines = Vec::new();
    for (label, value) in detail_fields(record, &tz, now) {
        if label == "Status" {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<12}", "Status:"), label_style),
                Span::styled(
                    value,
                    Style::default()
                        .fg(theme.status_color(record.status))
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
        } else {
            lines.push(field_line(label, value));
        }
    }

    let metrics = metric_fields(record);
    if !metrics.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::styled("Metrics", section_style));
        for (label, value) in metrics {
            lines.push(field_line(label, value));
        }
    }

    if !record.dag_nodes.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::styled("Steps", section_style));
        for node in &record.dag_nodes {
            lines.push(Line::from(vec![
                Span::raw(format!("  {} ", node.name)),
                Span::styled(format!("{} {}", node.node_type, node.phase), label_style),
            ]));
        }
    }

    let events = event_fields(record);
    if !events.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::styled("Events", section_style));
        for (label, value) in events {
            lines.push(field_line(label, value));
        }
    }

    if !record.message.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::styled("Message", section_style));
        lines.push(Line::from(record.message.clone()));
    }

    lines.push(Line::from(""));
    lines.push(Line::styled("Esc or Enter to close", label_style));

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block(
            format!("{}: {}", record.kind, record.name),
            theme.accent,
            theme,
        ))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_help_modal(frame: &mut Frame, app: &App, theme: &Theme) {
    let area = centered_rect(64, 60, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "flowtop help  scope:{}  view:{}  sort:{}",
            app.namespace_scope(),
            app.view_mode().title(),
            app.sort_mode().label()
        )),
        Line::from(""),
    ];
    for (keys, description) in HELP_ENTRIES {
        lines.push(Line::from(vec![
            Span::styled(format!("{keys:<20}"), Style::default().fg(theme.accent)),
            Span::raw(*description),
        ]));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("Help", theme.accent, theme))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

const HELP_ENTRIES: &[(&str, &str)] = &[
    ("j/k  up/down", "move selection"),
    ("PgUp/PgDn Ctrl-u/d", "move one page"),
    ("g/G Home/End", "jump to top/bottom"),
    ("Tab/Shift-Tab", "next/previous view"),
    ("1-4", "All / Jobs / Workflows / Events"),
    ("s", "toggle sort (status, next run)"),
    ("t/J", "toggle time display (UTC, local)"),
    ("r/F5", "refresh now"),
    ("Enter", "open details"),
    ("Esc/Enter/q", "close details"),
    ("?", "toggle this help"),
    ("q/Ctrl-C", "quit"),
];

fn panel_block(title: impl Into<String>, border: Color, theme: &Theme) -> Block<'static> {
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.panel))
}

fn column_headers(view: ViewMode, zone: DisplayZone) -> Vec<String> {
    let fixed = ["KIND", "NAMESPACE", "NAME", "STATUS"];
    let mut headers = fixed.iter().map(|header| header.to_string()).collect::<Vec<_>>();
    match view {
        ViewMode::All => {
            headers.extend(["DURATION", "MESSAGE"].map(str::to_string));
        }
        ViewMode::Jobs | ViewMode::Workflows => {
            headers.extend(
                ["DURATION", "MIN", "HRS", "DAY", "MON", "DOW", "TZ"].map(str::to_string),
            );
            headers.push(format!("LAST({})", zone.label()));
            headers.push(format!("NEXT({})", zone.label()));
            headers.push("MESSAGE".to_string());
        }
        ViewMode::Events => {
            headers.extend(["EVENT_SOURCE", "EVENT_NAME", "TRIGGER"].map(str::to_string));
        }
    }
    headers
}

fn column_constraints(view: ViewMode) -> Vec<Constraint> {
    let widths: &[u16] = match view {
        ViewMode::All => &[14, 15, 45, 12, 10],
        ViewMode::Jobs | ViewMode::Workflows => &[14, 15, 38, 12, 10, 5, 5, 5, 5, 5, 12, 13, 13],
        ViewMode::Events => &[14, 15, 32, 12, 22, 40],
    };
    let mut constraints = widths
        .iter()
        .map(|width| Constraint::Length(*width))
        .collect::<Vec<_>>();
    constraints.push(Constraint::Min(10));
    constraints
}

fn row_cells(row: &DisplayRow, view: ViewMode, tz: &TimeZone, now: Timestamp) -> Vec<String> {
    let record = &row.record;
    let mut cells = vec![
        format!("{}{}", row.marker.prefix(), record.kind),
        record.namespace.clone(),
        record.name.clone(),
        format!("{} {}", record.status.icon(), record.status.label()),
    ];

    match view {
        ViewMode::All => {
            cells.push(format_duration(record.duration_at(now)));
            cells.push(dash_if_empty(&record.message));
        }
        ViewMode::Jobs | ViewMode::Workflows => {
            cells.push(format_duration(record.duration_at(now)));
            let schedule = record.schedule.as_deref().unwrap_or_default();
            cells.extend(cron_fields(schedule));
            cells.push(short_zone_name(record.timezone.as_deref()));
            cells.push(format_time(record.last_run, tz));
            cells.push(format_time(record.next_run, tz));
            cells.push(dash_if_empty(&record.message));
        }
        ViewMode::Events => {
            cells.push(dash_if_empty(&record.event_source_name));
            if record.kind == ResourceKind::EventSource {
                cells.push(dash_if_empty(&record.event_type));
                cells.push("-".to_string());
            } else {
                cells.push(first_with_more(&record.event_names));
                cells.push(first_with_more(&record.trigger_names));
            }
        }
    }
    cells
}

fn detail_fields(
    record: &CanonicalRecord,
    tz: &TimeZone,
    now: Timestamp,
) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("Namespace", record.namespace.clone()),
        (
            "Status",
            format!("{} {}", record.status.icon(), record.status.label()),
        ),
    ];
    if let Some(start) = record.start_time {
        fields.push(("Started", format_full_time(start, tz)));
    }
    if let Some(end) = record.end_time {
        fields.push(("Ended", format_full_time(end, tz)));
    }
    let duration = record.duration_at(now);
    if !duration.is_zero() {
        fields.push(("Duration", format_duration(duration)));
    }
    if let Some(schedule) = record.schedule.as_deref() {
        fields.push(("Schedule", schedule.to_string()));
    }
    if let Some(zone) = record.timezone.as_deref() {
        fields.push(("Timezone", zone.to_string()));
    }
    if let Some(last) = record.last_run {
        fields.push(("Last Run", format_full_time(last, tz)));
    }
    if let Some(next) = record.next_run {
        fields.push(("Next Run", format_full_time(next, tz)));
    }
    if let Some(parent) = record.parent.as_ref() {
        fields.push(("Owner", format!("{}/{}", parent.kind, parent.name)));
    }
    fields
}

/// Nonzero counters only; a record with none has no Metrics section.
fn metric_fields(record: &CanonicalRecord) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if record.success_count > 0 {
        fields.push(("Success", record.success_count.to_string()));
    }
    if record.failure_count > 0 {
        fields.push(("Failures", record.failure_count.to_string()));
    }
    if record.retries > 0 {
        fields.push((
            "Retries",
            format!("{} / {}", record.retries, record.max_retries),
        ));
    }
    if record.throughput > 0.0 {
        fields.push(("Throughput", format!("{:.2}/min", record.throughput)));
    }
    if record.queue_depth > 0 {
        fields.push(("Queue", record.queue_depth.to_string()));
    }
    fields
}

fn event_fields(record: &CanonicalRecord) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if !record.event_type.is_empty() {
        fields.push(("Type", record.event_type.clone()));
    }
    if !record.event_source_name.is_empty() {
        fields.push(("Source", record.event_source_name.clone()));
    }
    if !record.event_names.is_empty() {
        fields.push(("Events", record.event_names.join(", ")));
    }
    if !record.trigger_names.is_empty() {
        fields.push(("Triggers", record.trigger_names.join(", ")));
    }
    fields
}

/// `45s`, `2m5s` or `3h20m`; zero renders as `-`.
fn format_duration(duration: SignedDuration) -> String {
    let total = duration.as_secs().max(0);
    if total == 0 {
        return "-".to_string();
    }
    if total < 60 {
        return format!("{total}s");
    }
    if total < 3_600 {
        return format!("{}m{}s", total / 60, total % 60);
    }
    format!("{}h{}m", total / 3_600, (total % 3_600) / 60)
}

fn format_time(instant: Option<Timestamp>, tz: &TimeZone) -> String {
    instant
        .map(|instant| instant.to_zoned(tz.clone()).strftime("%m/%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_full_time(instant: Timestamp, tz: &TimeZone) -> String {
    instant
        .to_zoned(tz.clone())
        .strftime("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}

fn short_zone_name(zone: Option<&str>) -> String {
    let Some(zone) = zone.filter(|zone| !zone.is_empty()) else {
        return "-".to_string();
    };
    ["Asia/", "America/", "Europe/"]
        .iter()
        .find_map(|prefix| zone.strip_prefix(prefix))
        .unwrap_or(zone)
        .to_string()
}

fn first_with_more(values: &[String]) -> String {
    match values {
        [] => "-".to_string(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{first} (+{})", rest.len()),
    }
}

fn dash_if_empty(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled(PL_RIGHT, Style::default().fg(bg).bg(next_bg)));
}

fn push_powerline_segment_rtl(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    previous_bg: Color,
) {
    spans.push(Span::styled(PL_LEFT, Style::default().fg(bg).bg(previous_bg)));
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn table_rows_visible(area: Rect) -> usize {
    area.height.saturating_sub(3).max(1) as usize
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn display_cluster_endpoint(cluster: &str) -> String {
    let trimmed = cluster.trim().trim_end_matches('/');
    trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .to_string()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
