use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::model::{Dimension, Measure};
use crate::state::AppState;

/// A widget change, applied to the state after the panel is drawn so the
/// widgets can borrow the session while rendering.
enum FilterAction {
    Toggle(Dimension, String),
    Only(Dimension, String),
    SelectAll(Dimension),
    SelectNone(Dimension),
    Range(Measure, f64, f64),
    Reset,
}

fn apply(state: &mut AppState, action: FilterAction) {
    match action {
        FilterAction::Toggle(dim, value) => state.toggle_value(dim, &value),
        FilterAction::Only(dim, value) => state.select_only(dim, &value),
        FilterAction::SelectAll(dim) => state.select_all(dim),
        FilterAction::SelectNone(dim) => state.select_none(dim),
        FilterAction::Range(measure, lo, hi) => state.set_range(measure, lo, hi),
        FilterAction::Reset => state.reset_filters(),
    }
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(session) = &state.session else {
        ui.label("No dataset loaded.");
        return;
    };
    let dataset = &session.dataset;
    let selection = &state.selection;
    let mut actions: Vec<FilterAction> = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Range sliders ----
            for measure in Measure::FILTERABLE {
                let Some((min, max)) = dataset.measure_bounds(measure) else {
                    continue;
                };
                let (mut lo, mut hi) = selection.range(measure).unwrap_or((min, max));

                ui.push_id(measure.column_name(), |ui: &mut Ui| {
                    ui.strong(measure.label());
                    let integer = measure == Measure::DaysLeft;
                    let mut from = egui::Slider::new(&mut lo, min..=max).text("from");
                    let mut to = egui::Slider::new(&mut hi, min..=max).text("to");
                    if integer {
                        from = from.integer();
                        to = to.integer();
                    }
                    let changed = ui.add(from).changed() | ui.add(to).changed();
                    if changed {
                        actions.push(FilterAction::Range(measure, lo, hi));
                    }
                });
                ui.add_space(4.0);
            }
            ui.separator();

            // ---- Per-dimension filter widgets (collapsible) ----
            for dim in Dimension::FILTERABLE {
                let all_values = dataset.enumerate_values(dim);
                let selected = selection.allowed(dim);
                let is_selected = |v: &str| selected.map_or(true, |s| s.contains(v));

                // Show count of selected / total in the header
                let n_selected = all_values.iter().filter(|v| is_selected(v.as_str())).count();
                let n_total = all_values.len();
                let header_text = format!("{}  ({n_selected}/{n_total})", dim.label());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(dim.column_name())
                    .default_open(dim == Dimension::Airline)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                actions.push(FilterAction::SelectAll(dim));
                            }
                            if ui.small_button("None").clicked() {
                                actions.push(FilterAction::SelectNone(dim));
                            }
                        });

                        for val in all_values {
                            let mut checked = is_selected(val.as_str());
                            let response = ui.checkbox(&mut checked, val.as_str());
                            if response.changed() {
                                actions.push(FilterAction::Toggle(dim, val.clone()));
                            }
                            response.context_menu(|ui: &mut Ui| {
                                if ui.button("Only this").clicked() {
                                    actions.push(FilterAction::Only(dim, val.clone()));
                                    ui.close_menu();
                                }
                            });
                        }
                    });
            }
        });

    for action in actions {
        apply(state, action);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top status bar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    let mut reset = false;

    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.strong("✈ Airline Ticket Price Dashboard");
        ui.separator();

        if let Some(session) = &state.session {
            let visible = state.snapshot().map_or(0, |s| s.visible_rows.len());
            ui.label(format!(
                "{} tickets loaded, {} visible",
                session.dataset.len(),
                visible
            ));
            ui.separator();
            reset = ui.button("Reset filters").clicked();
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });

    if reset {
        apply(state, FilterAction::Reset);
    }
}
