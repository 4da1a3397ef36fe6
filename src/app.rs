use crate::input::Action;
use crate::model::{
    CanonicalRecord, DisplayRow, DisplayZone, NamespaceScope, ResourceKind, SortMode, ViewMode,
};
use crate::view::derive_rows;
use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Detail,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AppCommand {
    None,
    Fetch,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LoadState {
    Idle,
    Ready,
}

/// Result of one background fetch, already normalized.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Batch(Vec<CanonicalRecord>),
    Failed(String),
}

type Identity = (ResourceKind, String, String);

pub struct App {
    running: bool,
    mode: InputMode,
    load_state: LoadState,
    cluster: String,
    context: String,
    namespace_scope: NamespaceScope,
    view: ViewMode,
    sort: SortMode,
    zone: DisplayZone,
    records: Vec<CanonicalRecord>,
    rows: Vec<DisplayRow>,
    selected: usize,
    page_size: usize,
    detail: Option<CanonicalRecord>,
    error: Option<String>,
    last_refresh: Option<DateTime<Local>>,
    fetch_in_flight: bool,
    show_help: bool,
    status: String,
}

impl App {
    pub fn new(
        cluster: String,
        context: String,
        namespace_scope: NamespaceScope,
        zone: DisplayZone,
    ) -> Self {
        Self {
            running: true,
            mode: InputMode::Normal,
            load_state: LoadState::Idle,
            cluster,
            context,
            namespace_scope,
            view: ViewMode::default(),
            sort: SortMode::default(),
            zone,
            records: Vec::new(),
            rows: Vec::new(),
            selected: 0,
            page_size: 10,
            detail: None,
            error: None,
            last_refresh: None,
            fetch_in_flight: false,
            show_help: false,
            status: "Loading...".to_string(),
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn namespace_scope(&self) -> &NamespaceScope {
        &self.namespace_scope
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort
    }

    pub fn display_zone(&self) -> DisplayZone {
        self.zone
    }

    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Cursor position, `None` when there are no rows.
    pub fn selected_index(&self) -> Option<usize> {
        (!self.rows.is_empty()).then_some(self.selected)
    }

    pub fn selected_row(&self) -> Option<&DisplayRow> {
        self.rows.get(self.selected)
    }

    pub fn detail(&self) -> Option<&CanonicalRecord> {
        self.detail.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_refresh(&self) -> Option<String> {
        self.last_refresh
            .map(|stamp| stamp.format("%H:%M:%S").to_string())
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.fetch_in_flight
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if self.show_help && !matches!(action, Action::ToggleHelp | Action::Quit) {
            self.show_help = false;
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::Refresh => self.request_refresh(),
            Action::CloseDetail => {
                self.close_detail();
                AppCommand::None
            }
            _ if self.mode == InputMode::Detail => AppCommand::None,
            Action::Down => {
                self.move_selection(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_selection(-1);
                AppCommand::None
            }
            Action::PageDown => {
                self.move_selection(self.page_step());
                AppCommand::None
            }
            Action::PageUp => {
                self.move_selection(-self.page_step());
                AppCommand::None
            }
            Action::Top => {
                self.selected = 0;
                AppCommand::None
            }
            Action::Bottom => {
                self.selected = self.rows.len().saturating_sub(1);
                AppCommand::None
            }
            Action::NextView => {
                self.set_view(self.view.next());
                AppCommand::None
            }
            Action::PrevView => {
                self.set_view(self.view.prev());
                AppCommand::None
            }
            Action::SelectView(view) => {
                self.set_view(view);
                AppCommand::None
            }
            Action::ToggleSort => {
                self.sort = self.sort.toggled();
                self.rederive();
                self.status = format!("Sorted by {}", self.sort.label());
                AppCommand::None
            }
            Action::ToggleZone => {
                self.zone = self.zone.toggled();
                self.status = format!("Times shown in {}", self.zone.label());
                AppCommand::None
            }
            Action::OpenDetail => {
                self.open_detail();
                AppCommand::None
            }
        }
    }

    /// Claims the fetch slot. Returns `AppCommand::Fetch` only when no fetch is in flight.
    pub fn request_refresh(&mut self) -> AppCommand {
        if self.fetch_in_flight {
            return AppCommand::None;
        }
        self.fetch_in_flight = true;
        self.status = "Refreshing...".to_string();
        AppCommand::Fetch
    }

    pub fn apply_fetch_outcome(&mut self, outcome: FetchOutcome, now: DateTime<Local>) {
        match outcome {
            FetchOutcome::Batch(records) => self.apply_batch(records, now),
            FetchOutcome::Failed(error) => self.apply_fetch_error(error),
        }
    }

    /// Replaces the record set wholesale and frees the fetch slot.
    pub fn apply_batch(&mut self, records: Vec<CanonicalRecord>, now: DateTime<Local>) {
        self.fetch_in_flight = false;
        self.records = records;
        self.load_state = LoadState::Ready;
        self.error = None;
        self.last_refresh = Some(now);
        self.rederive();
        self.status = format!("{} resources", self.records.len());
    }

    /// Keeps the previous records and shows `error` until the next successful batch.
    pub fn apply_fetch_error(&mut self, error: impl Into<String>) {
        self.fetch_in_flight = false;
        let error = error.into();
        self.status = normalize_status_text(format!(
            "Refresh failed: {}",
            summarize_error_line(&error)
        ));
        self.error = Some(error);
    }

    fn set_view(&mut self, view: ViewMode) {
        if self.view == view {
            return;
        }
        self.view = view;
        self.rederive();
        self.status = format!("{} view", view.title());
    }

    fn open_detail(&mut self) {
        let Some(record) = self.selected_row().map(|row| row.record.clone()) else {
            return;
        };
        self.detail = Some(record);
        self.mode = InputMode::Detail;
    }

    fn close_detail(&mut self) {
        self.detail = None;
        self.mode = InputMode::Normal;
    }

    fn rederive(&mut self) {
        let previous = self.selected_identity();
        let previous_index = self.selected;
        self.rows = derive_rows(&self.records, self.view, self.sort);

        let followed = previous.and_then(|(kind, namespace, name)| {
            self.rows
                .iter()
                .position(|row| row.record.identity() == (kind, namespace.as_str(), name.as_str()))
        });
        self.selected = followed.unwrap_or(previous_index);
        self.clamp_selection();
    }

    fn selected_identity(&self) -> Option<Identity> {
        self.rows.get(self.selected).map(|row| {
            (
                row.record.kind,
                row.record.namespace.clone(),
                row.record.name.clone(),
            )
        })
    }

    fn page_step(&self) -> isize {
        isize::try_from(self.page_size).unwrap_or(isize::MAX)
    }

    fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }

        let max_index = self.rows.len().saturating_sub(1) as isize;
        let current = self.selected.min(max_index as usize) as isize;
        self.selected = current.saturating_add(delta).clamp(0, max_index) as usize;
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }
}

fn summarize_error_line(error: &str) -> String {
    error
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::{App, AppCommand, FetchOutcome, InputMode, LoadState};
    use crate::input::Action;
    use crate::model::{
        CanonicalRecord, DisplayZone, NamespaceScope, ParentRef, ResourceKind, ResourceStatus,
        SortMode, ViewMode,
    };
    use chrono::Local;

    fn app() -> App {
        App::new(
            "https://cluster.local".to_string(),
            "dev".to_string(),
            NamespaceScope::All,
            DisplayZone::Utc,
        )
    }

    fn record(kind: ResourceKind, name: &str, status: ResourceStatus) -> CanonicalRecord {
        let mut record = CanonicalRecord::new(kind, "ops", name);
        record.status = status;
        record
    }

    fn batch() -> Vec<CanonicalRecord> {
        let mut child = record(ResourceKind::Job, "nightly-1", ResourceStatus::Succeeded);
        child.parent = Some(ParentRef {
            kind: ResourceKind::CronJob,
            name: "nightly".to_string(),
        });
        vec![
            record(ResourceKind::CronJob, "nightly", ResourceStatus::Running),
            child,
            record(ResourceKind::Workflow, "etl", ResourceStatus::Failed),
            record(ResourceKind::Sensor, "on-push", ResourceStatus::Pending),
        ]
    }

    fn selected_name(app: &App) -> Option<&str> {
        app.selected_row().map(|row| row.record.name.as_str())
    }

    #[test]
    fn first_batch_moves_idle_to_ready() {
        let mut app = app();
        assert_eq!(app.load_state(), LoadState::Idle);
        assert_eq!(app.selected_index(), None);

        app.apply_batch(batch(), Local::now());
        assert_eq!(app.load_state(), LoadState::Ready);
        assert_eq!(app.rows().len(), 4);
        assert_eq!(app.selected_index(), Some(0));
        assert!(app.last_refresh().is_some());
    }

    #[test]
    fn fetch_slot_allows_one_request_at_a_time() {
        let mut app = app();
        assert_eq!(app.request_refresh(), AppCommand::Fetch);
        assert_eq!(app.apply_action(Action::Refresh), AppCommand::None);
        assert!(app.fetch_in_flight());

        app.apply_fetch_outcome(FetchOutcome::Batch(batch()), Local::now());
        assert!(!app.fetch_in_flight());
        assert_eq!(app.apply_action(Action::Refresh), AppCommand::Fetch);

        app.apply_fetch_outcome(FetchOutcome::Failed("timeout".to_string()), Local::now());
        assert_eq!(app.request_refresh(), AppCommand::Fetch);
    }

    #[test]
    fn fetch_error_keeps_previous_rows_until_next_success() {
        let mut app = app();
        app.apply_batch(batch(), Local::now());

        app.apply_fetch_error("connection refused\ncaused by: tcp");
        assert_eq!(app.error(), Some("connection refused\ncaused by: tcp"));
        assert_eq!(app.rows().len(), 4);
        assert_eq!(app.status(), "Refresh failed: connection refused");
        assert_eq!(app.apply_action(Action::Refresh), AppCommand::Fetch);

        app.apply_batch(batch(), Local::now());
        assert_eq!(app.error(), None);
    }

    #[test]
    fn selection_clamps_to_bounds() {
        let mut app = app();
        app.apply_action(Action::Down);
        assert_eq!(app.selected_index(), None);

        app.apply_batch(batch(), Local::now());
        app.apply_action(Action::Up);
        assert_eq!(app.selected_index(), Some(0));
        app.apply_action(Action::PageDown);
        assert_eq!(app.selected_index(), Some(3));
        app.apply_action(Action::Top);
        assert_eq!(app.selected_index(), Some(0));
        app.apply_action(Action::Bottom);
        assert_eq!(app.selected_index(), Some(3));
    }

    #[test]
    fn cursor_follows_selected_record_across_refresh() {
        let mut app = app();
        app.apply_batch(batch(), Local::now());
        app.apply_action(Action::Bottom);
        assert_eq!(selected_name(&app), Some("on-push"));

        let mut next = batch();
        next.insert(
            0,
            record(ResourceKind::Job, "adhoc", ResourceStatus::Running),
        );
        app.apply_batch(next, Local::now());
        assert_eq!(selected_name(&app), Some("on-push"));
    }

    #[test]
    fn cursor_clamps_when_selected_record_disappears() {
        let mut app = app();
        app.apply_batch(batch(), Local::now());
        app.apply_action(Action::Bottom);

        app.apply_batch(batch().into_iter().take(2).collect(), Local::now());
        assert_eq!(app.selected_index(), Some(1));

        app.apply_batch(Vec::new(), Local::now());
        assert_eq!(app.selected_index(), None);
        assert!(app.selected_row().is_none());
    }

    #[test]
    fn view_changes_rederive_without_fetching() {
        let mut app = app();
        app.apply_batch(batch(), Local::now());

        assert_eq!(app.apply_action(Action::NextView), AppCommand::None);
        assert_eq!(app.view_mode(), ViewMode::Jobs);
        assert_eq!(app.rows().len(), 2);

        app.apply_action(Action::SelectView(ViewMode::Events));
        assert_eq!(app.rows().len(), 1);
        assert_eq!(selected_name(&app), Some("on-push"));

        app.apply_action(Action::PrevView);
        assert_eq!(app.view_mode(), ViewMode::Workflows);
        assert_eq!(app.rows().len(), 1);
    }

    #[test]
    fn toggles_flip_sort_and_zone() {
        let mut app = app();
        app.apply_action(Action::ToggleSort);
        assert_eq!(app.sort_mode(), SortMode::ByNextRun);
        app.apply_action(Action::ToggleZone);
        assert_eq!(app.display_zone(), DisplayZone::Local);
        app.apply_action(Action::ToggleSort);
        assert_eq!(app.sort_mode(), SortMode::ByStatus);
    }

    #[test]
    fn detail_holds_a_snapshot_that_survives_refresh() {
        let mut app = app();
        app.apply_batch(batch(), Local::now());
        app.apply_action(Action::OpenDetail);
        assert_eq!(app.mode(), InputMode::Detail);
        assert_eq!(app.detail().map(|record| record.name.as_str()), Some("nightly"));

        let mut changed = batch();
        changed[0].status = ResourceStatus::Pending;
        app.apply_batch(changed, Local::now());
        assert_eq!(
            app.detail().map(|record| record.status),
            Some(ResourceStatus::Running)
        );

        app.apply_action(Action::Down);
        assert_eq!(selected_name(&app), Some("nightly"));

        app.apply_action(Action::CloseDetail);
        assert_eq!(app.mode(), InputMode::Normal);
        assert!(app.detail().is_none());
    }

    #[test]
    fn detail_on_empty_table_stays_closed() {
        let mut app = app();
        app.apply_action(Action::OpenDetail);
        assert_eq!(app.mode(), InputMode::Normal);
        assert!(app.detail().is_none());
    }

    #[test]
    fn help_closes_on_next_action() {
        let mut app = app();
        app.apply_action(Action::ToggleHelp);
        assert!(app.show_help());
        app.apply_action(Action::Down);
        assert!(!app.show_help());
    }

    #[test]
    fn quit_stops_the_app() {
        let mut app = app();
        app.apply_action(Action::Quit);
        assert!(!app.running());
    }
}
