use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::model::{Dimension, Measure, Ticket, TicketDataset};

/// Raised when the active selection leaves no rows. Recoverable: the user
/// widens the filters and the next pass succeeds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No records match your current filters. Try widening the ranges or selecting more values.")]
pub struct EmptyFilterResult;

// ---------------------------------------------------------------------------
// Filter predicate: allowed values per dimension, inclusive range per measure
// ---------------------------------------------------------------------------

/// The active constraints, at most one per attribute.
///
/// * A dimension absent from `categories` is unconstrained.
/// * A present dimension keeps rows whose value is in the set; an empty set
///   therefore keeps nothing.
/// * A measure absent from `ranges` is unconstrained, otherwise `lo..=hi`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    categories: BTreeMap<Dimension, BTreeSet<String>>,
    ranges: BTreeMap<Measure, (f64, f64)>,
}

impl FilterSelection {
    /// A selection that accepts every row.
    pub fn unconstrained() -> Self {
        Self::default()
    }

    /// Widget defaults: every filterable dimension set to its full domain and
    /// every filterable measure to its full `[min, max]`.
    pub fn defaults(dataset: &TicketDataset) -> Self {
        let categories = Dimension::FILTERABLE
            .iter()
            .map(|&dim| (dim, dataset.enumerate_values(dim).clone()))
            .collect();
        let ranges = Measure::FILTERABLE
            .iter()
            .filter_map(|&m| dataset.measure_bounds(m).map(|bounds| (m, bounds)))
            .collect();
        FilterSelection { categories, ranges }
    }

    pub fn allowed(&self, dimension: Dimension) -> Option<&BTreeSet<String>> {
        self.categories.get(&dimension)
    }

    pub fn range(&self, measure: Measure) -> Option<(f64, f64)> {
        self.ranges.get(&measure).copied()
    }

    /// Restrict `dimension` to exactly `values`.
    pub fn set_values<I, S>(&mut self, dimension: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .insert(dimension, values.into_iter().map(Into::into).collect());
    }

    /// Single-choice restriction: exact match on one value.
    pub fn only(&mut self, dimension: Dimension, value: impl Into<String>) {
        self.set_values(dimension, [value.into()]);
    }

    /// Flip one value in or out of the allowed set. An unconstrained
    /// dimension starts from `domain`, i.e. everything selected.
    pub fn toggle(&mut self, dimension: Dimension, value: &str, domain: &BTreeSet<String>) {
        let selected = self
            .categories
            .entry(dimension)
            .or_insert_with(|| domain.clone());
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
    }

    /// Inclusive range on `measure`; bounds given in either order.
    pub fn set_range(&mut self, measure: Measure, a: f64, b: f64) {
        self.ranges.insert(measure, (a.min(b), a.max(b)));
    }

    #[cfg(test)]
    pub fn with_values<I, S>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_values(dimension, values);
        self
    }

    #[cfg(test)]
    pub fn with_range(mut self, measure: Measure, a: f64, b: f64) -> Self {
        self.set_range(measure, a, b);
        self
    }

    /// Conjunction of two selections: a row passes the result iff it passes
    /// both inputs.
    #[cfg(test)]
    pub fn and(&self, other: &FilterSelection) -> FilterSelection {
        let mut categories = self.categories.clone();
        for (dim, theirs) in &other.categories {
            categories
                .entry(*dim)
                .and_modify(|ours| ours.retain(|v| theirs.contains(v)))
                .or_insert_with(|| theirs.clone());
        }

        let mut ranges = self.ranges.clone();
        for (measure, &(lo, hi)) in &other.ranges {
            ranges
                .entry(*measure)
                .and_modify(|r| *r = (r.0.max(lo), r.1.min(hi)))
                .or_insert((lo, hi));
        }

        FilterSelection { categories, ranges }
    }

    /// Whether `ticket` satisfies every active constraint.
    pub fn matches(&self, ticket: &Ticket) -> bool {
        let categories_ok = self
            .categories
            .iter()
            .all(|(dim, allowed)| allowed.contains(dim.value_of(ticket)));
        categories_ok
            && self.ranges.iter().all(|(measure, &(lo, hi))| {
                let v = measure.value_of(ticket);
                lo <= v && v <= hi
            })
    }
}

/// Return indices of tickets that pass all active filters, in table order.
pub fn filtered_indices(dataset: &TicketDataset, selection: &FilterSelection) -> Vec<usize> {
    dataset
        .tickets()
        .iter()
        .enumerate()
        .filter(|(_, t)| selection.matches(t))
        .map(|(i, _)| i)
        .collect()
}

/// Apply `selection` to the whole table.
pub fn apply_filters<'a>(
    dataset: &'a TicketDataset,
    selection: &FilterSelection,
) -> Result<FilteredView<'a>, EmptyFilterResult> {
    FilteredView::from_indices(dataset, filtered_indices(dataset, selection))
}

// ---------------------------------------------------------------------------
// FilteredView – the rows in scope for one recompute pass
// ---------------------------------------------------------------------------

/// A non-empty subset of the table. Only obtainable through the filter
/// functions, so every aggregate computed over it is well defined.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a TicketDataset,
    indices: Vec<usize>,
}

// No `is_empty`: a view with zero rows cannot be constructed.
#[allow(clippy::len_without_is_empty)]
impl<'a> FilteredView<'a> {
    fn from_indices(
        dataset: &'a TicketDataset,
        indices: Vec<usize>,
    ) -> Result<Self, EmptyFilterResult> {
        if indices.is_empty() {
            Err(EmptyFilterResult)
        } else {
            Ok(FilteredView { dataset, indices })
        }
    }

    /// Re-apply a selection to the rows of this view.
    #[cfg(test)]
    pub fn narrow(&self, selection: &FilterSelection) -> Result<FilteredView<'a>, EmptyFilterResult> {
        let tickets = self.dataset.tickets();
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&i| selection.matches(&tickets[i]))
            .collect();
        FilteredView::from_indices(self.dataset, indices)
    }

    /// Row positions in the full table, ascending.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Ticket> + '_ {
        let tickets = self.dataset.tickets();
        self.indices.iter().map(move |&i| &tickets[i])
    }

    /// Number of rows; always at least one.
    pub fn len(&self) -> usize {
        self.indices.len()
    }
}
