//! Grouped, sorted view of all units plus the client-only UI flags.

use std::{cmp::Ordering, collections::BTreeMap};

use shared::domain::{embedded_number, Unit};
use tracing::debug;

/// A unit snapshot together with flags that only exist on this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitView {
    pub unit: Unit,
    pub comments_expanded: bool,
}

impl UnitView {
    fn new(unit: Unit) -> Self {
        Self {
            unit,
            comments_expanded: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelGroup {
    pub level: String,
    pub total_units: usize,
    pub units: Vec<UnitView>,
}

impl LevelGroup {
    fn new(level: String) -> Self {
        Self {
            level,
            total_units: 0,
            units: Vec::new(),
        }
    }

    fn normalize(&mut self) {
        self.units
            .sort_by(|a, b| label_order(&a.unit.unit_number, &b.unit.unit_number));
        self.total_units = self.units.len();
    }

    pub fn find(&self, unit_number: &str) -> Option<&UnitView> {
        self.units
            .iter()
            .find(|view| view.unit.unit_number == unit_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Replaced,
    /// The snapshot declared a different level; the unit moved groups.
    Relocated,
    NotFound,
}

/// Numeric order on the embedded integer; labels without one sort last,
/// alphabetically.
fn label_order(a: &str, b: &str) -> Ordering {
    match (embedded_number(a), embedded_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Same record id, or same unit number on the same level when either side
/// has no id.
fn same_slot(prev: &Unit, next: &Unit) -> bool {
    match (&prev.record_id, &next.record_id) {
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => prev.unit_number == next.unit_number && prev.level == next.level,
    }
}

fn group_units(units: impl IntoIterator<Item = UnitView>) -> Vec<LevelGroup> {
    let mut groups: Vec<LevelGroup> = Vec::new();
    for view in units {
        match groups
            .iter_mut()
            .find(|group| group.level == view.unit.level)
        {
            Some(group) => group.units.push(view),
            None => {
                let mut group = LevelGroup::new(view.unit.level.clone());
                group.units.push(view);
                groups.push(group);
            }
        }
    }
    groups.sort_by(|a, b| label_order(&a.level, &b.level));
    for group in &mut groups {
        group.normalize();
    }
    groups
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    groups: Vec<LevelGroup>,
    selected_level: Option<String>,
    connection: ConnectionStatus,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every group with `units`. All expansion flags start closed.
    pub fn load(&mut self, units: Vec<Unit>) {
        self.groups = group_units(units.into_iter().map(UnitView::new));
        self.ensure_selection();
    }

    /// Like [`ViewState::load`] but keeps expansion flags of units that are
    /// still present.
    pub fn reload(&mut self, units: Vec<Unit>) {
        let expanded: Vec<Unit> = self
            .groups
            .iter()
            .flat_map(|group| &group.units)
            .filter(|view| view.comments_expanded)
            .map(|view| view.unit.clone())
            .collect();
        self.groups = group_units(units.into_iter().map(|unit| UnitView {
            comments_expanded: expanded.iter().any(|prev| same_slot(prev, &unit)),
            unit,
        }));
        self.ensure_selection();
    }

    fn ensure_selection(&mut self) {
        let still_present = self
            .selected_level
            .as_deref()
            .is_some_and(|level| self.group(level).is_some());
        if !still_present {
            self.selected_level = self.groups.first().map(|group| group.level.clone());
        }
    }

    fn locate(&self, snapshot: &Unit) -> Option<(usize, usize)> {
        let declared = self
            .groups
            .iter()
            .position(|group| group.level == snapshot.level);
        let search_order = declared
            .into_iter()
            .chain((0..self.groups.len()).filter(move |idx| Some(*idx) != declared));
        for group_idx in search_order {
            if let Some(unit_idx) = self.groups[group_idx]
                .units
                .iter()
                .position(|view| view.unit.same_identity(snapshot))
            {
                return Some((group_idx, unit_idx));
            }
        }
        None
    }

    /// Replaces the authoritative fields of the matching unit with
    /// `snapshot`. Local flags are carried over untouched.
    pub fn merge_update(&mut self, snapshot: Unit) -> MergeOutcome {
        let Some((group_idx, unit_idx)) = self.locate(&snapshot) else {
            debug!(
                unit_number = %snapshot.unit_number,
                level = %snapshot.level,
                "push update for unknown unit ignored"
            );
            return MergeOutcome::NotFound;
        };

        let group = &mut self.groups[group_idx];
        if group.level == snapshot.level {
            group.units[unit_idx].unit = snapshot;
            group.normalize();
            return MergeOutcome::Replaced;
        }

        let mut view = group.units.remove(unit_idx);
        if group.units.is_empty() {
            self.groups.remove(group_idx);
        } else {
            group.normalize();
        }
        debug!(
            unit_number = %snapshot.unit_number,
            from = %view.unit.level,
            to = %snapshot.level,
            "unit moved to another level"
        );
        view.unit = snapshot;

        match self
            .groups
            .iter_mut()
            .find(|group| group.level == view.unit.level)
        {
            Some(group) => {
                group.units.push(view);
                group.normalize();
            }
            None => {
                let mut group = LevelGroup::new(view.unit.level.clone());
                group.units.push(view);
                group.normalize();
                self.groups.push(group);
                self.groups.sort_by(|a, b| label_order(&a.level, &b.level));
            }
        }
        self.ensure_selection();
        MergeOutcome::Relocated
    }

    pub fn select_level(&mut self, level: impl Into<String>) {
        self.selected_level = Some(level.into());
    }

    /// Returns whether a unit was found.
    pub fn toggle_expanded(&mut self, level: &str, unit_number: &str) -> bool {
        let Some(view) = self
            .groups
            .iter_mut()
            .filter(|group| group.level == level)
            .flat_map(|group| group.units.iter_mut())
            .find(|view| view.unit.unit_number == unit_number)
        else {
            return false;
        };
        view.comments_expanded = !view.comments_expanded;
        true
    }

    /// Status label -> unit count for one level. Unknown levels tally empty.
    pub fn status_tally(&self, level: &str) -> BTreeMap<String, usize> {
        let mut tally = BTreeMap::new();
        if let Some(group) = self.group(level) {
            for view in &group.units {
                *tally
                    .entry(view.unit.display_status().to_string())
                    .or_insert(0) += 1;
            }
        }
        tally
    }

    pub fn groups(&self) -> &[LevelGroup] {
        &self.groups
    }

    pub fn group(&self, level: &str) -> Option<&LevelGroup> {
        self.groups.iter().find(|group| group.level == level)
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.level.as_str())
    }

    pub fn selected_level(&self) -> Option<&str> {
        self.selected_level.as_deref()
    }

    pub fn selected_group(&self) -> Option<&LevelGroup> {
        self.selected_level().and_then(|level| self.group(level))
    }

    pub fn find_unit(&self, level: &str, unit_number: &str) -> Option<&UnitView> {
        self.group(level).and_then(|group| group.find(unit_number))
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn set_connection(&mut self, connection: ConnectionStatus) {
        self.connection = connection;
    }
}

#[cfg(test)]
#[path = "tests/view_state_tests.rs"]
mod tests;
