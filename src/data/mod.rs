/// Data layer: table types, file parsing, and cached downloads.
///
/// Architecture:
/// ```text
///   primary host ──probe──┐
///   fallback host ────────┤
///                         ▼
///                   ┌──────────┐
///                   │  fetch    │  download into cache_dir (unless cached)
///                   └──────────┘
///                         │  .csv / .json / .parquet
///                         ▼
///                   ┌──────────┐
///                   │  loader   │  parse file → DataFrame, infer types
///                   └──────────┘
///                         │
///                         ▼
///                   ┌──────────┐
///                   │ DataFrame │  named typed columns
///                   └──────────┘
/// ```

pub mod fetch;
pub mod loader;
pub mod model;
