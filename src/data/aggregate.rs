//! Aggregates computed over a [`FilteredView`].
//!
//! Every function here takes a view, which is non-empty by construction, so
//! means and percentiles are always defined. Results are plain owned values
//! (key → number lists, grids, ranked lists) that chart code can consume
//! directly or serialize.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use serde::Serialize;

use super::filter::FilteredView;
use super::geo::{CityCoordinates, GeoPoint};
use super::model::{Dimension, Measure, Ticket};

// ---------------------------------------------------------------------------
// Scalar KPIs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Kpis {
    pub count: usize,
    pub mean_price: f64,
    pub mean_duration: f64,
    pub mean_days_left: f64,
}

#[derive(Default)]
struct Totals {
    count: usize,
    price: f64,
    duration: f64,
    days_left: f64,
}

impl Totals {
    fn collect<'t>(rows: impl IntoIterator<Item = &'t Ticket>) -> Self {
        rows.into_iter().fold(Totals::default(), |mut acc, t| {
            acc.count += 1;
            acc.price += t.price;
            acc.duration += t.duration;
            acc.days_left += t.days_left as f64;
            acc
        })
    }

    /// Caller guarantees `count > 0`.
    fn means(&self) -> Kpis {
        let n = self.count as f64;
        Kpis {
            count: self.count,
            mean_price: self.price / n,
            mean_duration: self.duration / n,
            mean_days_left: self.days_left / n,
        }
    }
}

impl Kpis {
    pub fn compute(view: &FilteredView<'_>) -> Kpis {
        Totals::collect(view.rows()).means()
    }
}

// ---------------------------------------------------------------------------
// Grouped means
// ---------------------------------------------------------------------------

/// Mean of a measure over the rows sharing one key value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub key: String,
    pub mean: f64,
    pub count: usize,
}

/// Mean of a measure per (source, destination) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairMean {
    pub source: String,
    pub destination: String,
    pub mean: f64,
    pub count: usize,
}

/// Sum and count per key, keys in first-seen order.
fn grouped_sums<'t, K, I, F>(rows: I, key: F, measure: Measure) -> Vec<(K, f64, usize)>
where
    K: Eq + Hash + Clone,
    I: Iterator<Item = &'t Ticket>,
    F: Fn(&'t Ticket) -> K,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, f64, usize)> = Vec::new();
    for ticket in rows {
        let k = key(ticket);
        let slot = *slots.entry(k.clone()).or_insert_with(|| {
            groups.push((k, 0.0, 0));
            groups.len() - 1
        });
        groups[slot].1 += measure.value_of(ticket);
        groups[slot].2 += 1;
    }
    groups
}

/// Mean of `measure` per value of `dimension`, groups in first-seen order.
pub fn group_means(view: &FilteredView<'_>, dimension: Dimension, measure: Measure) -> Vec<GroupMean> {
    grouped_sums(view.rows(), |t| dimension.value_of(t), measure)
        .into_iter()
        .map(|(key, sum, count)| GroupMean {
            key: key.to_string(),
            mean: sum / count as f64,
            count,
        })
        .collect()
}

/// Mean of `measure` per (source, destination) pair, in first-seen order.
pub fn pair_means(view: &FilteredView<'_>, measure: Measure) -> Vec<PairMean> {
    grouped_sums(
        view.rows(),
        |t| (t.source_city.as_str(), t.destination_city.as_str()),
        measure,
    )
    .into_iter()
    .map(|((source, destination), sum, count)| PairMean {
        source: source.to_string(),
        destination: destination.to_string(),
        mean: sum / count as f64,
        count,
    })
    .collect()
}

/// Highest `n` groups by mean. The sort is stable, so ties keep the
/// first-seen order produced by [`group_means`].
pub fn top_n(mut groups: Vec<GroupMean>, n: usize) -> Vec<GroupMean> {
    groups.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    groups.truncate(n);
    groups
}

/// Ordinal position of a stop-count label; unknown labels sort last.
pub fn stops_rank(stops: &str) -> u8 {
    match stops {
        "zero" => 0,
        "one" => 1,
        "two_or_more" => 2,
        _ => 3,
    }
}

/// Order stop-count groups zero → one → two_or_more.
pub fn order_by_stops(groups: &mut [GroupMean]) {
    groups.sort_by_key(|g| stops_rank(&g.key));
}

// ---------------------------------------------------------------------------
// Source × destination pivot
// ---------------------------------------------------------------------------

/// Mean price grid for the heatmap. `cells[i][j]` belongs to
/// `sources[i]` → `destinations[j]`; pairs without rows stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePivot {
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl PricePivot {
    pub fn compute(view: &FilteredView<'_>) -> PricePivot {
        let pairs = pair_means(view, Measure::Price);

        let sources: Vec<String> = pairs
            .iter()
            .map(|p| p.source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let destinations: Vec<String> = pairs
            .iter()
            .map(|p| p.destination.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut cells = vec![vec![None; destinations.len()]; sources.len()];
        for pair in &pairs {
            let (Ok(i), Ok(j)) = (
                sources.binary_search(&pair.source),
                destinations.binary_search(&pair.destination),
            ) else {
                continue;
            };
            cells[i][j] = Some(pair.mean);
        }

        PricePivot {
            sources,
            destinations,
            cells,
        }
    }

    #[cfg(test)]
    pub fn get(&self, source: &str, destination: &str) -> Option<f64> {
        let i = self.sources.iter().position(|s| s == source)?;
        let j = self.destinations.iter().position(|d| d == destination)?;
        self.cells[i][j]
    }

    /// `(min, max)` over the populated cells.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.cells.iter().flatten().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

// ---------------------------------------------------------------------------
// Route map
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMapEntry {
    pub source: String,
    pub destination: String,
    pub flights: usize,
    pub from: GeoPoint,
    pub to: GeoPoint,
}

/// Flight count per (source, destination) pair, sorted by pair. Pairs with a
/// city missing from `coordinates` are dropped.
pub fn route_map(view: &FilteredView<'_>, coordinates: &CityCoordinates) -> Vec<RouteMapEntry> {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for t in view.rows() {
        *counts
            .entry((t.source_city.as_str(), t.destination_city.as_str()))
            .or_default() += 1;
    }

    counts
        .into_iter()
        .filter_map(|((source, destination), flights)| {
            Some(RouteMapEntry {
                from: coordinates.lookup(source)?,
                to: coordinates.lookup(destination)?,
                source: source.to_string(),
                destination: destination.to_string(),
                flights,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

/// Equal-width price histogram with one count series per class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceHistogram {
    /// `bins + 1` ascending bin edges.
    pub edges: Vec<f64>,
    pub counts: BTreeMap<String, Vec<usize>>,
}

impl PriceHistogram {
    pub fn compute(view: &FilteredView<'_>, bins: usize) -> PriceHistogram {
        let bins = bins.max(1);
        let (lo, mut hi) = view.rows().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
            (lo.min(t.price), hi.max(t.price))
        });
        if hi <= lo {
            hi = lo + 1.0;
        }
        let width = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|i| lo + width * i as f64).collect();

        let mut counts: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for t in view.rows() {
            let bin = (((t.price - lo) / width) as usize).min(bins - 1);
            counts
                .entry(t.class.clone())
                .or_insert_with(|| vec![0; bins])[bin] += 1;
        }

        PriceHistogram { edges, counts }
    }

    pub fn bin_width(&self) -> f64 {
        match self.edges.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }

    /// Midpoint of each bin.
    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }
}

/// Box-plot summary of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub key: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Smallest value within `q1 - 1.5 * IQR`.
    pub lower_whisker: f64,
    /// Largest value within `q3 + 1.5 * IQR`.
    pub upper_whisker: f64,
}

impl BoxStats {
    /// `None` for an empty slice.
    pub fn from_values(key: impl Into<String>, values: &[f64]) -> Option<BoxStats> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let lower_fence = q1 - 1.5 * iqr;
        let upper_fence = q3 + 1.5 * iqr;

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        Some(BoxStats {
            key: key.into(),
            count: sorted.len(),
            min,
            q1,
            median,
            q3,
            max,
            lower_whisker: sorted.iter().copied().find(|&v| v >= lower_fence).unwrap_or(min),
            upper_whisker: sorted.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(max),
        })
    }
}

/// Calculate percentile using linear interpolation (NumPy compatible).
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    let n = sorted_values.len();
    if n == 1 {
        return sorted_values[0];
    }

    let rank = (p / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lower as f64;

    if lower == upper {
        sorted_values[lower]
    } else {
        sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
    }
}

/// Distribution of a measure per value of `dimension`, first-seen order.
pub fn distribution_by(
    view: &FilteredView<'_>,
    dimension: Dimension,
    measure: Measure,
) -> Vec<BoxStats> {
    let mut order: Vec<&str> = Vec::new();
    let mut values: HashMap<&str, Vec<f64>> = HashMap::new();
    for t in view.rows() {
        let key = dimension.value_of(t);
        values
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(measure.value_of(t));
    }

    order
        .into_iter()
        .filter_map(|key| BoxStats::from_values(key, values.get(key)?))
        .collect()
}

/// Days-left spread per travel class.
pub fn days_left_by_class(view: &FilteredView<'_>) -> Vec<BoxStats> {
    distribution_by(view, Dimension::Class, Measure::DaysLeft)
}

/// Price spread per travel class.
pub fn price_spread_by_class(view: &FilteredView<'_>) -> Vec<BoxStats> {
    distribution_by(view, Dimension::Class, Measure::Price)
}

/// Price spread per stop count, zero → one → two_or_more.
pub fn price_spread_by_stops(view: &FilteredView<'_>) -> Vec<BoxStats> {
    let mut boxes = distribution_by(view, Dimension::Stops, Measure::Price);
    boxes.sort_by_key(|b| stops_rank(&b.key));
    boxes
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

/// `(x, y)` points sharing one key value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSeries {
    pub key: String,
    pub points: Vec<[f64; 2]>,
}

/// One (days_left, price) point per row, one series per airline. Series are
/// sorted by airline, points keep table order.
pub fn price_vs_days_left(view: &FilteredView<'_>) -> Vec<PointSeries> {
    let mut series: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
    for t in view.rows() {
        series
            .entry(t.airline.as_str())
            .or_default()
            .push([t.days_left as f64, t.price]);
    }
    series
        .into_iter()
        .map(|(key, points)| PointSeries {
            key: key.to_string(),
            points,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply_filters, FilterSelection};
    use crate::data::model::tests::sample_dataset;
    use crate::data::model::TicketDataset;

    fn everything(ds: &TicketDataset) -> FilteredView<'_> {
        apply_filters(ds, &FilterSelection::unconstrained()).unwrap()
    }

    #[test]
    fn economy_kpis() {
        let ds = sample_dataset();
        let sel = FilterSelection::unconstrained().with_values(Dimension::Class, ["Economy"]);
        let kpis = Kpis::compute(&apply_filters(&ds, &sel).unwrap());
        assert_eq!(kpis.count, 2);
        assert_eq!(kpis.mean_price, 4750.0);
        assert_eq!(kpis.mean_days_left, 15.0);
        assert_eq!(kpis.mean_duration, 2.0);
    }

    #[test]
    fn route_groups_in_first_seen_order() {
        let ds = sample_dataset();
        let groups = group_means(&everything(&ds), Dimension::Route, Measure::Price);
        assert_eq!(
            groups,
            vec![
                GroupMean { key: "Delhi→Mumbai".into(), mean: 10000.0, count: 2 },
                GroupMean { key: "Mumbai→Delhi".into(), mean: 4500.0, count: 1 },
            ]
        );
    }

    #[test]
    fn days_left_grouping_by_airline() {
        let ds = sample_dataset();
        let groups = group_means(&everything(&ds), Dimension::Airline, Measure::DaysLeft);
        assert_eq!(groups[0].key, "AirlineX");
        assert_eq!(groups[0].mean, 15.0);
        assert_eq!(groups[1].mean, 5.0);
    }

    #[test]
    fn top_n_is_stable_on_ties() {
        let ds = TicketDataset::from_tickets(vec![
            Ticket::new("A", "Kolkata", "Delhi", "Economy", "one", 3000.0, 2.0, 3),
            Ticket::new("A", "Delhi", "Chennai", "Economy", "one", 7000.0, 2.0, 3),
            Ticket::new("A", "Mumbai", "Delhi", "Economy", "one", 7000.0, 2.0, 3),
            Ticket::new("A", "Chennai", "Delhi", "Economy", "one", 7000.0, 2.0, 3),
            Ticket::new("A", "Delhi", "Kolkata", "Economy", "one", 9000.0, 2.0, 3),
        ]);
        let groups = group_means(&everything(&ds), Dimension::Route, Measure::Price);
        let keys: Vec<String> = top_n(groups, 3).into_iter().map(|g| g.key).collect();
        assert_eq!(keys, ["Delhi→Kolkata", "Delhi→Chennai", "Mumbai→Delhi"]);
    }

    #[test]
    fn top_n_shorter_than_limit() {
        let ds = sample_dataset();
        let groups = group_means(&everything(&ds), Dimension::Route, Measure::Price);
        assert_eq!(top_n(groups, 15).len(), 2);
    }

    #[test]
    fn stops_follow_ordinal_order() {
        let mut groups: Vec<GroupMean> = ["two_or_more", "bogus", "zero", "one"]
            .into_iter()
            .map(|k| GroupMean { key: k.into(), mean: 1.0, count: 1 })
            .collect();
        order_by_stops(&mut groups);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, ["zero", "one", "two_or_more", "bogus"]);
    }

    #[test]
    fn pivot_leaves_missing_pairs_absent() {
        let ds = sample_dataset();
        let pivot = PricePivot::compute(&everything(&ds));
        assert_eq!(pivot.sources, ["Delhi", "Mumbai"]);
        assert_eq!(pivot.destinations, ["Delhi", "Mumbai"]);
        assert_eq!(pivot.get("Delhi", "Mumbai"), Some(10000.0));
        assert_eq!(pivot.get("Mumbai", "Delhi"), Some(4500.0));
        assert_eq!(pivot.get("Delhi", "Delhi"), None);
        assert_eq!(pivot.get("Chennai", "Delhi"), None);
        assert_eq!(pivot.value_range(), Some((4500.0, 10000.0)));
    }

    #[test]
    fn route_map_drops_unknown_cities_but_grouping_keeps_them() {
        let ds = TicketDataset::from_tickets(vec![
            Ticket::new("A", "Delhi", "Mumbai", "Economy", "zero", 5000.0, 2.0, 10),
            Ticket::new("A", "Delhi", "Mumbai", "Economy", "zero", 5200.0, 2.0, 12),
            Ticket::new("B", "Chennai", "Delhi", "Economy", "one", 6000.0, 2.5, 7),
            Ticket::new("B", "Mumbai", "Chennai", "Business", "one", 16000.0, 2.5, 7),
        ]);
        let coords: CityCoordinates = [
            ("Delhi", GeoPoint::new(28.7041, 77.1025)),
            ("Mumbai", GeoPoint::new(19.0760, 72.8777)),
        ]
        .into_iter()
        .collect();
        let view = everything(&ds);

        let map = route_map(&view, &coords);
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].source, "Delhi");
        assert_eq!(map[0].destination, "Mumbai");
        assert_eq!(map[0].flights, 2);
        assert_eq!(map[0].to, GeoPoint::new(19.0760, 72.8777));

        let routes = group_means(&view, Dimension::Route, Measure::Price);
        assert!(routes.iter().any(|g| g.key == "Chennai→Delhi"));
        assert!(routes.iter().any(|g| g.key == "Mumbai→Chennai"));
    }

    #[test]
    fn histogram_splits_counts_by_class() {
        let ds = sample_dataset();
        let hist = PriceHistogram::compute(&everything(&ds), 4);
        assert_eq!(hist.edges.len(), 5);
        assert_eq!(hist.edges[0], 4500.0);
        assert_eq!(hist.edges[4], 15000.0);
        assert_eq!(hist.bin_width(), 2625.0);
        assert_eq!(hist.counts["Economy"], vec![2, 0, 0, 0]);
        assert_eq!(hist.counts["Business"], vec![0, 0, 0, 1]);
        assert_eq!(hist.centers().len(), 4);
    }

    #[test]
    fn histogram_with_single_price() {
        let ds = TicketDataset::from_tickets(vec![Ticket::new(
            "A", "Delhi", "Mumbai", "Economy", "zero", 5000.0, 2.0, 10,
        )]);
        let hist = PriceHistogram::compute(&everything(&ds), 40);
        let total: usize = hist.counts.values().flatten().sum();
        assert_eq!(total, 1);
        assert!(hist.bin_width() > 0.0);
    }

    #[test]
    fn box_stats_use_linear_percentiles() {
        let stats = BoxStats::from_values("Economy", &[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.max, 100.0);
        assert_eq!(stats.upper_whisker, 4.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert!(BoxStats::from_values("x", &[]).is_none());
    }

    #[test]
    fn days_left_spread_per_class() {
        let ds = sample_dataset();
        let boxes = days_left_by_class(&everything(&ds));
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].key, "Economy");
        assert_eq!(boxes[0].median, 15.0);
        assert_eq!(boxes[1].key, "Business");
        assert_eq!(boxes[1].count, 1);
    }

    #[test]
    fn price_spread_per_class_and_stops() {
        let ds = TicketDataset::from_tickets(vec![
            Ticket::new("A", "Delhi", "Mumbai", "Economy", "two_or_more", 9000.0, 5.0, 3),
            Ticket::new("A", "Delhi", "Mumbai", "Economy", "zero", 4000.0, 2.0, 3),
            Ticket::new("B", "Delhi", "Mumbai", "Business", "one", 20000.0, 3.0, 3),
            Ticket::new("B", "Delhi", "Mumbai", "Economy", "zero", 5000.0, 2.0, 3),
        ]);
        let view = everything(&ds);

        let by_class = price_spread_by_class(&view);
        assert_eq!(by_class[0].key, "Economy");
        assert_eq!(by_class[0].median, 5000.0);
        assert_eq!(by_class[1].max, 20000.0);

        let by_stops = price_spread_by_stops(&view);
        let keys: Vec<&str> = by_stops.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, ["zero", "one", "two_or_more"]);
        assert_eq!(by_stops[0].count, 2);
        assert_eq!(by_stops[0].median, 4500.0);
    }

    #[test]
    fn scatter_series_per_airline() {
        let ds = sample_dataset();
        let series = price_vs_days_left(&everything(&ds));
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].key, "AirlineX");
        assert_eq!(series[0].points, vec![[10.0, 5000.0], [20.0, 4500.0]]);
        assert_eq!(series[1].points, vec![[5.0, 15000.0]]);
    }
}
