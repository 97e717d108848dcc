//! Plain-text rendering of the current view.

use std::fmt;

use client_core::{ConnectionStatus, UnitView, ViewState};
use shared::domain::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    PreRock,
    PreInsulate,
    Cover,
    Approved,
    Issue,
    Default,
}

impl Tone {
    pub fn of(status: Option<&Status>) -> Self {
        match status {
            Some(Status::OkToPreRock) => Tone::PreRock,
            Some(Status::OkToPreInsulate) => Tone::PreInsulate,
            Some(Status::OkToCover) => Tone::Cover,
            Some(Status::Approved) => Tone::Approved,
            Some(Status::Issue) => Tone::Issue,
            Some(Status::Other(_)) | None => Tone::Default,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Tone::PreRock => "[~]",
            Tone::PreInsulate => "[=]",
            Tone::Cover => "[#]",
            Tone::Approved => "[+]",
            Tone::Issue => "[!]",
            Tone::Default => "[ ]",
        }
    }
}

fn connection_line(connection: ConnectionStatus) -> &'static str {
    match connection {
        ConnectionStatus::Connecting => "live updates: connecting",
        ConnectionStatus::Connected => "live updates: connected",
        ConnectionStatus::Disconnected => "live updates: offline, retrying (view may be stale)",
    }
}

fn write_unit(f: &mut fmt::Formatter<'_>, view: &UnitView) -> fmt::Result {
    let unit = &view.unit;
    writeln!(
        f,
        "{} Unit {}  {}",
        Tone::of(unit.status.as_ref()).marker(),
        unit.unit_number,
        unit.display_status()
    )?;
    let area = unit
        .sq_ft
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    writeln!(
        f,
        "    area: {area}  type: {}",
        unit.unit_type.as_deref().unwrap_or("-")
    )?;

    let marker = if view.comments_expanded { "v" } else { ">" };
    writeln!(f, "    {marker} comments ({})", unit.comments.len())?;
    if !view.comments_expanded {
        return Ok(());
    }
    if unit.comments.is_empty() {
        writeln!(f, "      No comments yet.")?;
    }
    for (index, comment) in unit.comments.iter().enumerate() {
        let resolved = if comment.resolved { "[x]" } else { "[ ]" };
        write!(f, "      {index}. {resolved} {}", comment.text)?;
        if let Some(timestamp) = &comment.timestamp {
            write!(f, "  ({timestamp})")?;
        }
        writeln!(f)?;
    }
    Ok(())
}

/// Text screen for one view state.
pub struct Screen<'a>(pub &'a ViewState);

impl fmt::Display for Screen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.0;
        writeln!(f, "{}", connection_line(view.connection()))?;

        let selected = view.selected_level();
        let levels: Vec<String> = view
            .levels()
            .map(|level| {
                if Some(level) == selected {
                    format!("[{level}]")
                } else {
                    level.to_string()
                }
            })
            .collect();
        if levels.is_empty() {
            return writeln!(f, "No units loaded.");
        }
        writeln!(f, "levels: {}", levels.join("  "))?;

        let Some(group) = view.selected_group() else {
            return writeln!(f, "Level {:?} has no units.", selected.unwrap_or_default());
        };

        writeln!(
            f,
            "Current Level Summary ({}): Total Units: {}",
            group.level, group.total_units
        )?;
        for (label, count) in view.status_tally(&group.level) {
            writeln!(f, "  {label}: {count}")?;
        }
        writeln!(f)?;
        for unit in &group.units {
            write_unit(f, unit)?;
        }
        Ok(())
    }
}

pub fn render(view: &ViewState) -> String {
    Screen(view).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{Comment, Unit};

    fn view() -> ViewState {
        let mut view = ViewState::new();
        view.load(vec![
            Unit::new("102", "Level 1").with_status(Some(Status::Issue)),
            Unit::new("101", "Level 1").with_comments(vec![Comment {
                text: "missing fire caulk".to_string(),
                timestamp: Some("6/3/2024, 4:12 PM".to_string()),
                resolved: true,
            }]),
            Unit::new("201", "Level 2").with_status(Some(Status::Other("Hold".to_string()))),
        ]);
        view
    }

    #[test]
    fn renders_selected_level_summary_and_cards() {
        let mut view = view();
        view.toggle_expanded("Level 1", "101");
        view.set_connection(ConnectionStatus::Connected);
        let text = render(&view);

        assert!(text.starts_with("live updates: connected\n"));
        assert!(text.contains("levels: [Level 1]  Level 2\n"));
        assert!(text.contains("Current Level Summary (Level 1): Total Units: 2\n"));
        assert!(text.contains("  Issue: 1\n"));
        assert!(text.contains("  No Status Set: 1\n"));
        assert!(text.contains("      0. [x] missing fire caulk  (6/3/2024, 4:12 PM)\n"));
        let first = text.find("Unit 101").expect("101");
        let second = text.find("Unit 102").expect("102");
        assert!(first < second);
        assert!(text.contains("[!] Unit 102  Issue\n"));
    }

    #[test]
    fn collapsed_comments_are_hidden_and_empty_ones_say_so() {
        let mut view = view();
        assert!(!render(&view).contains("missing fire caulk"));

        view.select_level("Level 2");
        view.toggle_expanded("Level 2", "201");
        let text = render(&view);
        assert!(text.contains("[ ] Unit 201  Hold\n"));
        assert!(text.contains("No comments yet."));
    }

    #[test]
    fn empty_view_and_unknown_level() {
        assert!(render(&ViewState::new()).contains("No units loaded."));

        let mut view = view();
        view.select_level("Level 9");
        assert!(render(&view).contains("Level \"Level 9\" has no units."));
    }

    #[test]
    fn screen_writes_whole_lines() {
        assert_eq!(
            Screen(&ViewState::new()).to_string(),
            "live updates: connecting\nNo units loaded.\n"
        );
        let text = render(&view());
        assert!(text.ends_with("    > comments (0)\n"));
        assert_eq!(text.lines().filter(|line| line.contains(" Unit ")).count(), 2);
    }

    #[test]
    fn unknown_statuses_use_default_tone() {
        assert_eq!(Tone::of(Some(&Status::OkToCover)), Tone::Cover);
        assert_eq!(Tone::of(Some(&Status::Other("Hold".into()))), Tone::Default);
        assert_eq!(Tone::of(None), Tone::Default);
    }
}
