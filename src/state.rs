use std::collections::BTreeMap;

use eframe::egui::Color32;

use crate::color::CategoryColors;
use crate::dashboard::{recompute, AggregateSettings, DashboardSnapshot};
use crate::data::filter::{EmptyFilterResult, FilterSelection};
use crate::data::loader::DataLoadError;
use crate::data::model::{Dimension, Measure, TicketDataset};

// ---------------------------------------------------------------------------
// Session – loaded once at startup, read-only afterwards
// ---------------------------------------------------------------------------

/// The dataset and the aggregate settings for this run.
pub struct Session {
    pub dataset: TicketDataset,
    pub settings: AggregateSettings,
    /// Stable colours for the dimensions charts are coloured by.
    colors: BTreeMap<Dimension, CategoryColors>,
}

impl Session {
    pub const COLORED: [Dimension; 3] = [Dimension::Airline, Dimension::Class, Dimension::Stops];

    pub fn new(dataset: TicketDataset, settings: AggregateSettings) -> Self {
        let colors = Self::COLORED
            .iter()
            .map(|&dim| (dim, CategoryColors::new(dataset.enumerate_values(dim))))
            .collect();
        Self {
            dataset,
            settings,
            colors,
        }
    }

    /// Colour of `value` in `dimension`; gray for dimensions without a palette.
    pub fn color_for(&self, dimension: Dimension, value: &str) -> Color32 {
        self.colors
            .get(&dimension)
            .map_or(Color32::GRAY, |c| c.color_for(value))
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// None when the startup load failed.
    pub session: Option<Session>,

    /// Current filter widgets.
    pub selection: FilterSelection,

    /// Output of the last recompute pass.
    pub outcome: Result<DashboardSnapshot, EmptyFilterResult>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Build the state from the startup load. A failed load keeps no data and
    /// leaves the error for the UI to show.
    pub fn from_load(result: Result<TicketDataset, DataLoadError>, settings: AggregateSettings) -> Self {
        match result {
            Ok(dataset) => {
                log::info!("Loaded {} tickets", dataset.len());
                let mut state = Self {
                    selection: FilterSelection::defaults(&dataset),
                    session: Some(Session::new(dataset, settings)),
                    outcome: Err(EmptyFilterResult),
                    status_message: None,
                };
                state.refilter();
                state
            }
            Err(e) => {
                log::error!("Failed to load dataset: {e}");
                Self {
                    session: None,
                    selection: FilterSelection::unconstrained(),
                    outcome: Err(EmptyFilterResult),
                    status_message: Some(format!("Error: {e}")),
                }
            }
        }
    }

    /// Run one full filter → aggregate pass for the current selection.
    pub fn refilter(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        self.outcome = recompute(&session.dataset, &self.selection, &session.settings);
        match &self.outcome {
            Ok(snapshot) => log::debug!(
                "Recomputed dashboard: {} of {} rows visible",
                snapshot.visible_rows.len(),
                session.dataset.len()
            ),
            Err(e) => log::warn!("{e}"),
        }
    }

    /// Toggle a single value in a dimension's filter.
    pub fn toggle_value(&mut self, dimension: Dimension, value: &str) {
        if let Some(session) = &self.session {
            let domain = session.dataset.enumerate_values(dimension);
            self.selection.toggle(dimension, value, domain);
            log::debug!("{dimension}: toggled {value}");
            self.refilter();
        }
    }

    /// Select all values of a dimension.
    pub fn select_all(&mut self, dimension: Dimension) {
        if let Some(session) = &self.session {
            let domain = session.dataset.enumerate_values(dimension).clone();
            self.selection.set_values(dimension, domain);
            self.refilter();
        }
    }

    /// Keep exactly one value of a dimension.
    pub fn select_only(&mut self, dimension: Dimension, value: &str) {
        self.selection.only(dimension, value);
        log::debug!("{dimension}: only {value}");
        self.refilter();
    }

    /// Deselect all values of a dimension.
    pub fn select_none(&mut self, dimension: Dimension) {
        self.selection
            .set_values(dimension, std::iter::empty::<String>());
        self.refilter();
    }

    /// Move a range slider.
    pub fn set_range(&mut self, measure: Measure, lo: f64, hi: f64) {
        self.selection.set_range(measure, lo, hi);
        log::debug!("{measure}: range {lo}..={hi}");
        self.refilter();
    }

    /// Back to the widget defaults.
    pub fn reset_filters(&mut self) {
        if let Some(session) = &self.session {
            self.selection = FilterSelection::defaults(&session.dataset);
            self.refilter();
        }
    }

    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.outcome.as_ref().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::sample_dataset;

    fn loaded() -> AppState {
        AppState::from_load(Ok(sample_dataset()), AggregateSettings::default())
    }

    #[test]
    fn starts_with_everything_visible() {
        let state = loaded();
        assert_eq!(state.snapshot().map(|s| s.visible_rows.len()), Some(3));
        assert!(state.status_message.is_none());
    }

    #[test]
    fn failed_load_keeps_no_data() {
        let state = AppState::from_load(Err(DataLoadError::NoRows), AggregateSettings::default());
        assert!(state.session.is_none());
        assert!(state.snapshot().is_none());
        assert_eq!(
            state.status_message.as_deref(),
            Some("Error: file contains no data rows")
        );
    }

    #[test]
    fn each_change_recomputes() {
        let mut state = loaded();
        state.toggle_value(Dimension::Class, "Business");
        assert_eq!(state.snapshot().map(|s| s.aggregates.kpis.mean_price), Some(4750.0));

        state.select_only(Dimension::SourceCity, "Mumbai");
        assert_eq!(state.snapshot().map(|s| s.visible_rows.clone()), Some(vec![2]));
        state.select_all(Dimension::SourceCity);

        state.select_none(Dimension::Airline);
        assert_eq!(state.outcome, Err(EmptyFilterResult));

        state.select_all(Dimension::Airline);
        assert_eq!(state.snapshot().map(|s| s.visible_rows.len()), Some(2));

        state.set_range(Measure::DaysLeft, 15.0, 30.0);
        assert_eq!(state.snapshot().map(|s| s.visible_rows.clone()), Some(vec![2]));

        state.reset_filters();
        assert_eq!(state.snapshot().map(|s| s.visible_rows.len()), Some(3));
    }

    #[test]
    fn route_checkbox_filters_rows() {
        let mut state = loaded();
        state.toggle_value(Dimension::Route, "Delhi→Mumbai");
        assert_eq!(state.snapshot().map(|s| s.visible_rows.clone()), Some(vec![2]));
    }

    #[test]
    fn chart_colors_are_stable_per_value() {
        let state = loaded();
        let session = state.session.as_ref().unwrap();
        let economy = session.color_for(Dimension::Class, "Economy");
        assert_ne!(economy, Color32::GRAY);
        assert_eq!(session.color_for(Dimension::Class, "Economy"), economy);
        assert_ne!(session.color_for(Dimension::Airline, "AirlineX"), Color32::GRAY);
        assert_eq!(session.color_for(Dimension::Route, "Delhi→Mumbai"), Color32::GRAY);
    }

    #[test]
    fn widening_reexposes_every_option() {
        let mut state = loaded();
        state.select_none(Dimension::Stops);
        let session = state.session.as_ref().unwrap();
        assert_eq!(session.dataset.enumerate_values(Dimension::Stops).len(), 2);
    }
}
