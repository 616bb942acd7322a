use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// Separator used when synthesizing the `route` column.
pub const ROUTE_SEPARATOR: &str = "→";

/// Build the route label for a (source, destination) pair.
pub fn route_label(source_city: &str, destination_city: &str) -> String {
    format!("{source_city}{ROUTE_SEPARATOR}{destination_city}")
}

// ---------------------------------------------------------------------------
// Dimension / Measure – the filterable and groupable attributes
// ---------------------------------------------------------------------------

/// A categorical attribute of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Airline,
    SourceCity,
    DestinationCity,
    Route,
    Class,
    Stops,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Airline,
        Dimension::SourceCity,
        Dimension::DestinationCity,
        Dimension::Route,
        Dimension::Class,
        Dimension::Stops,
    ];

    /// Dimensions exposed as filter widgets.
    pub const FILTERABLE: [Dimension; 6] = [
        Dimension::Airline,
        Dimension::SourceCity,
        Dimension::DestinationCity,
        Dimension::Route,
        Dimension::Class,
        Dimension::Stops,
    ];

    /// Column name in the source file (`route` is derived, never read).
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::Airline => "airline",
            Dimension::SourceCity => "source_city",
            Dimension::DestinationCity => "destination_city",
            Dimension::Route => "route",
            Dimension::Class => "class",
            Dimension::Stops => "stops",
        }
    }

    /// Human readable label for widgets and chart axes.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Airline => "Airline",
            Dimension::SourceCity => "Source City",
            Dimension::DestinationCity => "Destination City",
            Dimension::Route => "Route",
            Dimension::Class => "Class",
            Dimension::Stops => "Stops",
        }
    }

    pub fn value_of(self, ticket: &Ticket) -> &str {
        match self {
            Dimension::Airline => &ticket.airline,
            Dimension::SourceCity => &ticket.source_city,
            Dimension::DestinationCity => &ticket.destination_city,
            Dimension::Route => ticket.route(),
            Dimension::Class => &ticket.class,
            Dimension::Stops => &ticket.stops,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A numeric attribute of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Price,
    Duration,
    DaysLeft,
}

impl Measure {
    pub const ALL: [Measure; 3] = [Measure::Price, Measure::Duration, Measure::DaysLeft];

    /// Measures exposed as range sliders.
    pub const FILTERABLE: [Measure; 2] = [Measure::DaysLeft, Measure::Price];

    pub fn column_name(self) -> &'static str {
        match self {
            Measure::Price => "price",
            Measure::Duration => "duration",
            Measure::DaysLeft => "days_left",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Measure::Price => "Ticket Price",
            Measure::Duration => "Duration (hrs)",
            Measure::DaysLeft => "Days Left",
        }
    }

    pub fn value_of(self, ticket: &Ticket) -> f64 {
        match self {
            Measure::Price => ticket.price,
            Measure::Duration => ticket.duration,
            Measure::DaysLeft => ticket.days_left as f64,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Ticket – one row of the table
// ---------------------------------------------------------------------------

/// A single flight offering.
///
/// `route` is synthesized from the two city fields in [`Ticket::new`] and has
/// no setter, so it can never drift from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub airline: String,
    pub source_city: String,
    pub destination_city: String,
    route: String,
    pub class: String,
    pub stops: String,
    /// Price in currency units.
    pub price: f64,
    /// Flight duration in hours.
    pub duration: f64,
    /// Days between booking and departure.
    pub days_left: i64,
}

impl Ticket {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        airline: impl Into<String>,
        source_city: impl Into<String>,
        destination_city: impl Into<String>,
        class: impl Into<String>,
        stops: impl Into<String>,
        price: f64,
        duration: f64,
        days_left: i64,
    ) -> Self {
        let source_city = source_city.into();
        let destination_city = destination_city.into();
        let route = route_label(&source_city, &destination_city);
        Ticket {
            airline: airline.into(),
            source_city,
            destination_city,
            route,
            class: class.into(),
            stops: stops.into(),
            price,
            duration,
            days_left,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

// ---------------------------------------------------------------------------
// TicketDataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column domains.
///
/// Built once per session and never mutated afterwards; filter widgets are
/// populated from `unique_values` so widening a filter always re-exposes
/// every option.
#[derive(Debug, Clone)]
pub struct TicketDataset {
    tickets: Vec<Ticket>,
    unique_values: BTreeMap<Dimension, BTreeSet<String>>,
    bounds: BTreeMap<Measure, (f64, f64)>,
}

impl TicketDataset {
    /// Build column indices from the loaded tickets.
    pub fn from_tickets(tickets: Vec<Ticket>) -> Self {
        let mut unique_values: BTreeMap<Dimension, BTreeSet<String>> = Dimension::ALL
            .iter()
            .map(|&dim| (dim, BTreeSet::new()))
            .collect();
        let mut bounds: BTreeMap<Measure, (f64, f64)> = BTreeMap::new();

        for ticket in &tickets {
            for dim in Dimension::ALL {
                unique_values
                    .entry(dim)
                    .or_default()
                    .insert(dim.value_of(ticket).to_string());
            }
            for measure in Measure::ALL {
                let v = measure.value_of(ticket);
                bounds
                    .entry(measure)
                    .and_modify(|(lo, hi)| {
                        *lo = lo.min(v);
                        *hi = hi.max(v);
                    })
                    .or_insert((v, v));
            }
        }

        TicketDataset {
            tickets,
            unique_values,
            bounds,
        }
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Distinct values of `dimension` across the whole table, sorted.
    pub fn enumerate_values(&self, dimension: Dimension) -> &BTreeSet<String> {
        // Every dimension is seeded in `from_tickets`.
        &self.unique_values[&dimension]
    }

    /// `(min, max)` of `measure` across the whole table; `None` when empty.
    pub fn measure_bounds(&self, measure: Measure) -> Option<(f64, f64)> {
        self.bounds.get(&measure).copied()
    }

    /// Number of tickets.
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// The three-row reference table used across the data tests.
    pub(crate) fn sample_dataset() -> TicketDataset {
        TicketDataset::from_tickets(vec![
            Ticket::new("AirlineX", "Delhi", "Mumbai", "Economy", "zero", 5000.0, 2.0, 10),
            Ticket::new("AirlineY", "Delhi", "Mumbai", "Business", "one", 15000.0, 2.5, 5),
            Ticket::new("AirlineX", "Mumbai", "Delhi", "Economy", "zero", 4500.0, 2.0, 20),
        ])
    }

    #[test]
    fn route_is_derived_from_cities() {
        let t = Ticket::new("A", "Delhi", "Chennai", "Economy", "one", 1.0, 1.0, 1);
        assert_eq!(t.route(), "Delhi→Chennai");
        assert_eq!(Dimension::Route.value_of(&t), "Delhi→Chennai");
    }

    #[test]
    fn enumerate_values_is_sorted_and_distinct() {
        let ds = sample_dataset();
        let airlines: Vec<&str> = ds
            .enumerate_values(Dimension::Airline)
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(airlines, ["AirlineX", "AirlineY"]);

        let routes = ds.enumerate_values(Dimension::Route);
        assert!(routes.contains("Delhi→Mumbai"));
        assert!(routes.contains("Mumbai→Delhi"));
        assert_eq!(routes.len(), 2);
    }

    #[test]
    fn measure_bounds_cover_full_table() {
        let ds = sample_dataset();
        assert_eq!(ds.measure_bounds(Measure::Price), Some((4500.0, 15000.0)));
        assert_eq!(ds.measure_bounds(Measure::DaysLeft), Some((5.0, 20.0)));
        assert_eq!(ds.measure_bounds(Measure::Duration), Some((2.0, 2.5)));
    }

    #[test]
    fn empty_dataset_has_no_bounds() {
        let ds = TicketDataset::from_tickets(Vec::new());
        assert!(ds.is_empty());
        assert!(ds.measure_bounds(Measure::Price).is_none());
        assert!(ds.enumerate_values(Dimension::Class).is_empty());
    }
}
