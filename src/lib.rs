//! Helpers for statistical-learning exercises: cached dataset downloads and
//! coordinate meshes for plotting decision surfaces.

pub mod data;
pub mod error;
pub mod mesh;

pub use data::fetch::{get_data, DataFetcher, FetcherConfig, HttpTransport, Transport};
pub use data::model::{Column, ColumnType, DataFrame, Value};
pub use error::{FetchError, MeshError};
pub use mesh::{make_mesh, mesh_shape, Indexing, Mesh, MeshOptions, DEFAULT_MAX_POINTS};
