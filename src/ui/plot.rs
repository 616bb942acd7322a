use std::ops::RangeInclusive;

use eframe::egui::{self, Align2, Color32, FontId, RichText, ScrollArea, Sense, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoint, Points,
    Text,
};

use crate::color::{series_colors, value_color};
use crate::dashboard::DashboardAggregates;
use crate::data::aggregate::{
    BoxStats, GroupMean, PointSeries, PriceHistogram, PricePivot, RouteMapEntry,
};
use crate::data::model::Dimension;
use crate::state::{AppState, Session};

const CHART_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render KPIs and charts for the latest recompute pass.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let Some(session) = &state.session else {
        ui.centered_and_justified(|ui: &mut Ui| {
            let msg = state
                .status_message
                .as_deref()
                .unwrap_or("No dataset loaded.");
            ui.heading(RichText::new(msg).color(Color32::RED));
        });
        return;
    };

    let snapshot = match &state.outcome {
        Ok(snapshot) => snapshot,
        Err(empty) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading(RichText::new(empty.to_string()).color(Color32::from_rgb(230, 160, 0)));
            });
            return;
        }
    };
    let agg = &snapshot.aggregates;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            kpi_row(ui, agg);
            ui.add_space(8.0);

            ui.columns(2, |cols| {
                mean_bar_chart(&mut cols[0], "by_airline", "Average Price by Airline", &agg.price_by_airline);
                mean_bar_chart(&mut cols[1], "by_class", "Average Price by Class", &agg.price_by_class);
            });
            ui.add_space(8.0);

            ui.strong("Average Price Heatmap: Source vs Destination");
            heatmap(ui, &agg.price_pivot);
            ui.add_space(8.0);

            ui.columns(2, |cols| {
                price_histogram(&mut cols[0], &agg.price_histogram, session);
                spread_boxes(
                    &mut cols[1],
                    "days_left_boxes",
                    "Flights by Days Left",
                    "Days left",
                    &agg.days_left_by_class,
                    |key| session.color_for(Dimension::Class, key),
                );
            });
            ui.add_space(8.0);

            price_vs_days_left(ui, &agg.price_vs_days_left, session);
            ui.add_space(8.0);

            ui.columns(2, |cols| {
                spread_boxes(
                    &mut cols[0],
                    "price_by_class_boxes",
                    "Price by Class",
                    "Price",
                    &agg.price_spread_by_class,
                    |key| session.color_for(Dimension::Class, key),
                );
                spread_boxes(
                    &mut cols[1],
                    "price_by_stops_boxes",
                    "Price by Number of Stops",
                    "Price",
                    &agg.price_spread_by_stops,
                    |key| session.color_for(Dimension::Stops, key),
                );
            });
            ui.add_space(8.0);

            ui.columns(2, |cols| {
                mean_bar_chart(&mut cols[0], "by_stops", "Average Price by Stops", &agg.price_by_stops);
                top_routes_table(&mut cols[1], &agg.top_routes);
            });
            ui.add_space(8.0);

            route_map(ui, &agg.route_map);
        });
}

// ---------------------------------------------------------------------------
// KPI cards
// ---------------------------------------------------------------------------

/// `1234567.8` → `"1,234,568"`.
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

fn kpi_row(ui: &mut Ui, agg: &DashboardAggregates) {
    let kpis = &agg.kpis;
    let cards = [
        ("✈", "Total Flights", format_thousands(kpis.count as f64)),
        ("💰", "Average Price", format!("₹{}", format_thousands(kpis.mean_price))),
        ("📆", "Avg Days Left", format!("{:.1}", kpis.mean_days_left)),
        ("⏱", "Avg Duration (hrs)", format!("{:.1}", kpis.mean_duration)),
    ];

    ui.columns(cards.len(), |cols| {
        for (col, (icon, label, value)) in cols.iter_mut().zip(cards) {
            egui::Frame::group(col.style())
                .inner_margin(12.0)
                .show(col, |ui: &mut Ui| {
                    ui.vertical_centered(|ui: &mut Ui| {
                        ui.label(RichText::new(icon).size(24.0));
                        ui.label(RichText::new(label).strong());
                        ui.label(RichText::new(value).size(26.0).strong());
                    });
                });
        }
    });
}

// ---------------------------------------------------------------------------
// Bar charts
// ---------------------------------------------------------------------------

/// Axis labels for categorical x positions `0, 1, 2, …`.
fn category_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }
}

fn mean_bar_chart(ui: &mut Ui, id: &str, title: &str, groups: &[GroupMean]) {
    ui.strong(title);
    let means: Vec<f64> = groups.iter().map(|g| g.mean).collect();
    let colors = series_colors(&means);
    let bars: Vec<Bar> = groups
        .iter()
        .zip(colors)
        .enumerate()
        .map(|(i, (g, color))| {
            Bar::new(i as f64, g.mean)
                .width(0.7)
                .fill(color)
                .name(format!("{} ({} flights)", g.key, g.count))
        })
        .collect();
    let labels = groups.iter().map(|g| g.key.clone()).collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .x_axis_formatter(category_formatter(labels))
        .y_axis_label("Average price")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

fn heatmap(ui: &mut Ui, pivot: &PricePivot) {
    let Some((min, max)) = pivot.value_range() else {
        return;
    };
    let label_width = 110.0;
    let cell_height = 28.0;
    let rows = pivot.sources.len();
    let cols = pivot.destinations.len().max(1);

    let width = ui.available_width();
    let height = cell_height * (rows + 1) as f32;
    let (rect, _) = ui.allocate_exact_size(egui::vec2(width, height), Sense::hover());
    let painter = ui.painter_at(rect);
    let cell_width = (width - label_width) / cols as f32;
    let font = FontId::proportional(12.0);
    let text_color = ui.visuals().text_color();

    for (j, dest) in pivot.destinations.iter().enumerate() {
        let center = rect.left_top()
            + egui::vec2(label_width + cell_width * (j as f32 + 0.5), cell_height * 0.5);
        painter.text(center, Align2::CENTER_CENTER, dest, font.clone(), text_color);
    }

    for (i, source) in pivot.sources.iter().enumerate() {
        let top = cell_height * (i + 1) as f32;
        painter.text(
            rect.left_top() + egui::vec2(label_width - 8.0, top + cell_height * 0.5),
            Align2::RIGHT_CENTER,
            source,
            font.clone(),
            text_color,
        );

        for (j, cell) in pivot.cells[i].iter().enumerate() {
            let Some(value) = cell else {
                continue;
            };
            let min_corner = rect.left_top() + egui::vec2(label_width + cell_width * j as f32, top);
            let cell_rect = egui::Rect::from_min_size(min_corner, egui::vec2(cell_width, cell_height))
                .shrink(1.0);
            painter.rect_filled(cell_rect, 2.0, value_color(*value, min, max));

            // Light text on the dark end of the scale.
            let t = if max > min { (value - min) / (max - min) } else { 0.5 };
            let ink = if t < 0.6 { Color32::WHITE } else { Color32::BLACK };
            painter.text(
                cell_rect.center(),
                Align2::CENTER_CENTER,
                format_thousands(*value),
                font.clone(),
                ink,
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

fn price_histogram(ui: &mut Ui, hist: &PriceHistogram, session: &Session) {
    ui.strong("Price Distribution");
    let centers = hist.centers();
    let width = hist.bin_width();

    let mut charts: Vec<BarChart> = Vec::new();
    for (class, counts) in &hist.counts {
        let bars = centers
            .iter()
            .zip(counts)
            .map(|(&x, &n)| Bar::new(x, n as f64).width(width))
            .collect();
        let chart = BarChart::new(bars)
            .name(class)
            .color(session.color_for(Dimension::Class, class))
            .stack_on(&charts.iter().collect::<Vec<_>>());
        charts.push(chart);
    }

    Plot::new("price_histogram")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Price")
        .y_axis_label("Flights")
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

/// One box per group, coloured by group key.
fn spread_boxes(
    ui: &mut Ui,
    id: &str,
    title: &str,
    y_label: &str,
    boxes: &[BoxStats],
    color_for: impl Fn(&str) -> Color32,
) {
    ui.strong(title);
    let labels = boxes.iter().map(|b| b.key.clone()).collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_formatter(category_formatter(labels))
        .y_axis_label(y_label)
        .show(ui, |plot_ui| {
            for (i, b) in boxes.iter().enumerate() {
                let color = color_for(&b.key);
                let spread = BoxSpread::new(b.lower_whisker, b.q1, b.median, b.q3, b.upper_whisker);
                let elem = BoxElem::new(i as f64, spread)
                    .name(&b.key)
                    .box_width(0.5)
                    .fill(color.gamma_multiply(0.4))
                    .stroke(Stroke::new(1.5, color));
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&b.key).color(color));
            }
        });
}

fn price_vs_days_left(ui: &mut Ui, series: &[PointSeries], session: &Session) {
    ui.strong("Price vs Days Before Departure");

    Plot::new("price_vs_days_left")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Days left")
        .y_axis_label("Price")
        .show(ui, |plot_ui| {
            for s in series {
                plot_ui.points(
                    Points::new(s.points.clone())
                        .radius(2.0)
                        .color(session.color_for(Dimension::Airline, &s.key))
                        .name(&s.key),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Top routes
// ---------------------------------------------------------------------------

fn top_routes_table(ui: &mut Ui, routes: &[GroupMean]) {
    ui.strong(format!("Top {} Routes by Average Price", routes.len()));

    egui::Grid::new("top_routes")
        .num_columns(4)
        .striped(true)
        .spacing([16.0, 4.0])
        .show(ui, |ui: &mut Ui| {
            for title in ["#", "Route", "Avg price", "Flights"] {
                ui.strong(title);
            }
            ui.end_row();

            for (rank, route) in routes.iter().enumerate() {
                ui.label(format!("{}", rank + 1));
                ui.label(&route.key);
                ui.label(format!("₹{}", format_thousands(route.mean)));
                ui.label(route.count.to_string());
                ui.end_row();
            }
        });
}

// ---------------------------------------------------------------------------
// Route map
// ---------------------------------------------------------------------------

fn route_map(ui: &mut Ui, routes: &[RouteMapEntry]) {
    ui.strong("Flight Route Map");
    if routes.is_empty() {
        ui.label("No route data available for selected filters.");
        return;
    }

    let busiest = routes.iter().map(|r| r.flights).max().unwrap_or(1) as f32;

    Plot::new("route_map")
        .height(420.0)
        .data_aspect(1.0)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .show(ui, |plot_ui| {
            for r in routes {
                let weight = r.flights as f32 / busiest;
                let line = Line::new(vec![[r.from.lon, r.from.lat], [r.to.lon, r.to.lat]])
                    .color(Color32::from_rgb(70, 130, 230))
                    .width(1.0 + 3.0 * weight);
                plot_ui.line(line);
                plot_ui.points(
                    Points::new(vec![[r.from.lon, r.from.lat]])
                        .radius(3.0 + 9.0 * weight.sqrt())
                        .color(Color32::from_rgb(240, 120, 60))
                        .name(format!("{} → {}: {} flights", r.source, r.destination, r.flights)),
                );
            }

            let ink = plot_ui.ctx().style().visuals.text_color();
            let mut labelled: Vec<&str> = Vec::new();
            for r in routes {
                for (city, point) in [(&r.source, r.from), (&r.destination, r.to)] {
                    if labelled.contains(&city.as_str()) {
                        continue;
                    }
                    labelled.push(city);
                    plot_ui.text(
                        Text::new(PlotPoint::new(point.lon, point.lat + 0.6), city.as_str())
                            .color(ink),
                    );
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.4), "999");
        assert_eq!(format_thousands(4750.0), "4,750");
        assert_eq!(format_thousands(1234567.8), "1,234,568");
        assert_eq!(format_thousands(-12345.0), "-12,345");
    }

    #[test]
    fn category_axis_labels_only_on_integers() {
        let fmt = category_formatter(vec!["Economy".into(), "Business".into()]);
        let mark = |value| GridMark { value, step_size: 1.0 };
        assert_eq!(fmt(mark(1.0), &(0.0..=1.0)), "Business");
        assert_eq!(fmt(mark(0.5), &(0.0..=1.0)), "");
        assert_eq!(fmt(mark(5.0), &(0.0..=1.0)), "");
        assert_eq!(fmt(mark(-1.0), &(0.0..=1.0)), "");
    }
}
