/// Data layer: ticket table, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → TicketDataset (route derived here)
///   └──────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ TicketDataset │  Vec<Ticket>, column domains, measure bounds
///   └───────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSelection → FilteredView (non-empty)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  KPIs, grouped means, top-N, pivot, route map
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod geo;
pub mod loader;
pub mod model;
