use serde::Serialize;

use crate::data::aggregate::{
    days_left_by_class, group_means, order_by_stops, price_spread_by_class,
    price_spread_by_stops, price_vs_days_left, route_map, top_n, BoxStats, GroupMean, Kpis,
    PointSeries, PriceHistogram, PricePivot, RouteMapEntry,
};
use crate::data::filter::{apply_filters, EmptyFilterResult, FilterSelection};
use crate::data::geo::CityCoordinates;
use crate::data::model::{Dimension, Measure, TicketDataset};

/// Knobs for the aggregate pass, fixed for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSettings {
    /// Length of the ranked route list.
    pub top_routes: usize,
    pub price_histogram_bins: usize,
    pub city_coordinates: CityCoordinates,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            top_routes: 15,
            price_histogram_bins: 40,
            city_coordinates: CityCoordinates::default(),
        }
    }
}

/// Everything the dashboard draws for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardAggregates {
    pub kpis: Kpis,
    pub price_by_airline: Vec<GroupMean>,
    pub price_by_class: Vec<GroupMean>,
    pub price_by_stops: Vec<GroupMean>,
    pub top_routes: Vec<GroupMean>,
    pub price_pivot: PricePivot,
    pub price_histogram: PriceHistogram,
    pub days_left_by_class: Vec<BoxStats>,
    pub price_spread_by_class: Vec<BoxStats>,
    pub price_spread_by_stops: Vec<BoxStats>,
    /// (days_left, price) per row, one series per airline.
    pub price_vs_days_left: Vec<PointSeries>,
    pub route_map: Vec<RouteMapEntry>,
}

/// Result of one recompute pass. Owned, so it can outlive the borrow of the
/// dataset taken while computing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// Table positions of the rows in scope.
    pub visible_rows: Vec<usize>,
    pub aggregates: DashboardAggregates,
}

/// Filter the table and compute every aggregate.
///
/// Pure and synchronous: the same inputs always give the same snapshot. An
/// empty filtered view stops the pass before any aggregate runs.
pub fn recompute(
    dataset: &TicketDataset,
    selection: &FilterSelection,
    settings: &AggregateSettings,
) -> Result<DashboardSnapshot, EmptyFilterResult> {
    let view = apply_filters(dataset, selection)?;

    let mut price_by_stops = group_means(&view, Dimension::Stops, Measure::Price);
    order_by_stops(&mut price_by_stops);

    let aggregates = DashboardAggregates {
        kpis: Kpis::compute(&view),
        price_by_airline: group_means(&view, Dimension::Airline, Measure::Price),
        price_by_class: group_means(&view, Dimension::Class, Measure::Price),
        price_by_stops,
        top_routes: top_n(
            group_means(&view, Dimension::Route, Measure::Price),
            settings.top_routes,
        ),
        price_pivot: PricePivot::compute(&view),
        price_histogram: PriceHistogram::compute(&view, settings.price_histogram_bins),
        days_left_by_class: days_left_by_class(&view),
        price_spread_by_class: price_spread_by_class(&view),
        price_spread_by_stops: price_spread_by_stops(&view),
        price_vs_days_left: price_vs_days_left(&view),
        route_map: route_map(&view, &settings.city_coordinates),
    };

    Ok(DashboardSnapshot {
        visible_rows: view.indices().to_vec(),
        aggregates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::sample_dataset;

    #[test]
    fn economy_snapshot() {
        let ds = sample_dataset();
        let sel = FilterSelection::defaults(&ds).with_values(Dimension::Class, ["Economy"]);
        let snap = recompute(&ds, &sel, &AggregateSettings::default()).unwrap();

        assert_eq!(snap.visible_rows, vec![0, 2]);
        assert_eq!(snap.aggregates.kpis.count, 2);
        assert_eq!(snap.aggregates.kpis.mean_price, 4750.0);
        assert_eq!(snap.aggregates.price_by_class.len(), 1);
        assert_eq!(snap.aggregates.top_routes[0].key, "Delhi→Mumbai");
        assert_eq!(snap.aggregates.route_map.len(), 2);
    }

    #[test]
    fn empty_selection_short_circuits() {
        let ds = sample_dataset();
        let sel = FilterSelection::defaults(&ds).with_values(Dimension::Airline, ["AirlineZ"]);
        assert_eq!(
            recompute(&ds, &sel, &AggregateSettings::default()),
            Err(EmptyFilterResult)
        );
    }

    #[test]
    fn recompute_is_deterministic() {
        let ds = sample_dataset();
        let sel = FilterSelection::defaults(&ds);
        let settings = AggregateSettings::default();
        assert_eq!(recompute(&ds, &sel, &settings), recompute(&ds, &sel, &settings));
    }

    #[test]
    fn top_routes_respects_limit() {
        let ds = sample_dataset();
        let settings = AggregateSettings {
            top_routes: 1,
            ..AggregateSettings::default()
        };
        let snap = recompute(&ds, &FilterSelection::unconstrained(), &settings).unwrap();
        assert_eq!(snap.aggregates.top_routes.len(), 1);
        assert_eq!(snap.aggregates.top_routes[0].mean, 10000.0);
    }

    #[test]
    fn route_filter_narrows_every_chart() {
        let ds = sample_dataset();
        let sel = FilterSelection::defaults(&ds).with_values(Dimension::Route, ["Delhi→Mumbai"]);
        let snap = recompute(&ds, &sel, &AggregateSettings::default()).unwrap();

        assert_eq!(snap.visible_rows, vec![0, 1]);
        let agg = &snap.aggregates;
        assert_eq!(agg.top_routes.len(), 1);
        assert_eq!(agg.route_map.len(), 1);
        assert_eq!(agg.price_pivot.sources, ["Delhi"]);

        let classes: Vec<&str> = agg.price_spread_by_class.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(classes, ["Economy", "Business"]);
        let stops: Vec<&str> = agg.price_spread_by_stops.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(stops, ["zero", "one"]);

        let points: usize = agg.price_vs_days_left.iter().map(|s| s.points.len()).sum();
        assert_eq!(points, 2);
        assert_eq!(agg.price_vs_days_left[1].points, vec![[5.0, 15000.0]]);
    }

    #[test]
    fn defaults_expose_route_filter() {
        let ds = sample_dataset();
        let sel = FilterSelection::defaults(&ds);
        assert_eq!(sel.allowed(Dimension::Route).map(|r| r.len()), Some(2));

        let none = sel.with_values(Dimension::Route, std::iter::empty::<String>());
        assert_eq!(
            recompute(&ds, &none, &AggregateSettings::default()),
            Err(EmptyFilterResult)
        );
    }

    #[test]
    fn snapshot_serializes_for_chart_consumers() {
        let ds = sample_dataset();
        let snap = recompute(&ds, &FilterSelection::unconstrained(), &AggregateSettings::default())
            .unwrap();
        let json = serde_json::to_value(&snap.aggregates).unwrap();
        assert_eq!(json["kpis"]["count"], 3);
        assert_eq!(json["price_pivot"]["cells"][0][0], serde_json::Value::Null);
        assert_eq!(json["route_map"][0]["from"]["lat"], 28.7041);
        assert_eq!(json["price_vs_days_left"][0]["key"], "AirlineX");
        assert_eq!(json["price_vs_days_left"][0]["points"][0][1], 5000.0);
    }
}
