use crate::app::InputMode;
use crate::model::ViewMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    NextView,
    PrevView,
    SelectView(ViewMode),
    ToggleSort,
    ToggleZone,
    Refresh,
    OpenDetail,
    CloseDetail,
    ToggleHelp,
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::Detail => map_detail_mode_key(key),
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::Tab => Some(Action::NextView),
        KeyCode::BackTab => Some(Action::PrevView),
        KeyCode::Char(c @ '1'..='4') => map_view_digit(c).map(Action::SelectView),
        KeyCode::Char('s') => Some(Action::ToggleSort),
        KeyCode::Char('t') | KeyCode::Char('J') => Some(Action::ToggleZone),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Enter => Some(Action::OpenDetail),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

fn map_detail_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Some(Action::CloseDetail),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

fn map_view_digit(c: char) -> Option<ViewMode> {
    let index = c.to_digit(10)?.checked_sub(1)?;
    ViewMode::ALL.get(usize::try_from(index).ok()?).copied()
}

#[cfg(test)]
mod tests {
    use super::{Action, map_key};
    use crate::app::InputMode;
    use crate::model::ViewMode;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn plain(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn normal_mode_maps_quit() {
        let action = map_key(InputMode::Normal, plain(KeyCode::Char('q')));
        assert_eq!(action, Some(Action::Quit));
    }

    #[test]
    fn ctrl_c_quits_in_every_mode() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::Quit));
        assert_eq!(map_key(InputMode::Detail, key), Some(Action::Quit));
    }

    #[test]
    fn digits_select_views() {
        assert_eq!(
            map_key(InputMode::Normal, plain(KeyCode::Char('1'))),
            Some(Action::SelectView(ViewMode::All))
        );
        assert_eq!(
            map_key(InputMode::Normal, plain(KeyCode::Char('4'))),
            Some(Action::SelectView(ViewMode::Events))
        );
        assert_eq!(map_key(InputMode::Normal, plain(KeyCode::Char('5'))), None);
    }

    #[test]
    fn tab_cycles_views() {
        assert_eq!(
            map_key(InputMode::Normal, plain(KeyCode::Tab)),
            Some(Action::NextView)
        );
        let back = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert_eq!(map_key(InputMode::Normal, back), Some(Action::PrevView));
    }

    #[test]
    fn shifted_j_toggles_zone_instead_of_moving() {
        let key = KeyEvent::new(KeyCode::Char('J'), KeyModifiers::SHIFT);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::ToggleZone));
        assert_eq!(
            map_key(InputMode::Normal, plain(KeyCode::Char('j'))),
            Some(Action::Down)
        );
    }

    #[test]
    fn detail_mode_only_closes_refreshes_or_helps() {
        for code in [KeyCode::Esc, KeyCode::Enter, KeyCode::Char('q')] {
            assert_eq!(
                map_key(InputMode::Detail, plain(code)),
                Some(Action::CloseDetail)
            );
        }
        assert_eq!(
            map_key(InputMode::Detail, plain(KeyCode::F(5))),
            Some(Action::Refresh)
        );
        assert_eq!(map_key(InputMode::Detail, plain(KeyCode::Char('j'))), None);
    }
}
