use std::collections::BTreeMap;

use anyhow::{Context, Result};
use ndarray::{Array2, Axis};

use isl_toolkit::{make_mesh, mesh_shape, DataFetcher, DataFrame, FetcherConfig, MeshOptions, Value};

use crate::color::ColorMap;

/// Above this many mesh points the decision regions are not shaded.
pub const MAX_SHADED_POINTS: usize = 250_000;

/// Mesh steps per widest feature range when a dataset is first shown.
const DEFAULT_STEPS_PER_RANGE: f64 = 100.0;

// ---------------------------------------------------------------------------
// Scene – everything the plot draws, recomputed on selection changes
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Scene {
    /// Data points grouped by class label.
    pub samples: BTreeMap<Value, Vec<[f64; 2]>>,
    /// Mesh points grouped by the label of their nearest sample.
    pub regions: BTreeMap<Value, Vec<[f64; 2]>>,
    pub mesh_points: usize,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until the user fetches or opens one).
    pub dataset: Option<DataFrame>,

    /// Dataset filename typed into the top bar.
    pub dataset_name: String,

    /// Feature on the horizontal axis.
    pub x_column: Option<String>,

    /// Feature on the vertical axis.
    pub y_column: Option<String>,

    /// Column whose values label (and colour) the points.
    pub class_column: Option<String>,

    /// Active colour map.
    pub color_map: Option<ColorMap>,

    /// Mesh spacing in feature units.
    pub step_size: f64,

    /// Whether to shade the mesh by nearest-neighbour class.
    pub shade_regions: bool,

    pub scene: Scene,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: None,
            dataset_name: "Default.csv".to_string(),
            x_column: None,
            y_column: None,
            class_column: None,
            color_map: None,
            step_size: 0.1,
            shade_regions: true,
            scene: Scene::default(),
            status_message: None,
        }
    }
}

impl AppState {
    /// Download (or read from cache) the dataset named in the top bar.
    pub fn fetch_dataset(&mut self, reload: bool) {
        let name = self.dataset_name.trim().to_string();
        let result = DataFetcher::new(FetcherConfig::default())
            .and_then(|fetcher| fetcher.get_data(&name, reload));
        match result {
            Ok(dataset) => {
                log::info!("Fetched {name}: {:?}", dataset.shape());
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to fetch {name}: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded dataset and pick default columns.
    pub fn set_dataset(&mut self, dataset: DataFrame) {
        let numeric: Vec<String> = dataset
            .numeric_column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        self.x_column = numeric.first().cloned();
        self.y_column = numeric.get(1).or(numeric.first()).cloned();

        // Prefer a text column for classes, else the last column.
        self.class_column = dataset
            .columns()
            .iter()
            .find(|c| !c.dtype.is_numeric())
            .or(dataset.columns().last())
            .map(|c| c.name.clone());

        self.dataset = Some(dataset);
        self.status_message = None;
        self.rebuild_color_map();
        self.step_size = self.suggested_step().unwrap_or(self.step_size);
        self.rebuild_scene();
    }

    pub fn set_x_column(&mut self, col: String) {
        self.x_column = Some(col);
        self.rebuild_scene();
    }

    pub fn set_y_column(&mut self, col: String) {
        self.y_column = Some(col);
        self.rebuild_scene();
    }

    pub fn set_class_column(&mut self, col: String) {
        self.class_column = Some(col);
        self.rebuild_color_map();
        self.rebuild_scene();
    }

    /// Rebuild the colour map from the current `class_column`.
    pub fn rebuild_color_map(&mut self) {
        self.color_map = match (&self.dataset, &self.class_column) {
            (Some(ds), Some(col)) => ds
                .unique_values(col)
                .map(|labels| ColorMap::new(col, &labels)),
            _ => None,
        };
    }

    /// Recompute points and shaded regions after any selection change.
    pub fn rebuild_scene(&mut self) {
        self.scene = Scene::default();
        match self.compute_scene() {
            Ok(Some(scene)) => {
                if self.shade_regions && scene.regions.is_empty() && scene.mesh_points > 0 {
                    self.status_message = Some(format!(
                        "{} mesh points: increase the step to shade regions",
                        scene.mesh_points
                    ));
                } else {
                    self.status_message = None;
                }
                self.scene = scene;
            }
            Ok(None) => {}
            Err(e) => {
                log::error!("Failed to build plot: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// One mesh step per hundredth of the widest selected feature range.
    fn suggested_step(&self) -> Option<f64> {
        let (features, _) = self.selected_samples().ok()??;
        let widest = features
            .axis_iter(Axis(1))
            .map(|col| {
                let lo = col.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                hi - lo
            })
            .fold(0.0, f64::max);
        (widest.is_finite() && widest > 0.0).then(|| widest / DEFAULT_STEPS_PER_RANGE)
    }

    /// Feature rows without missing values, with their class labels.
    fn selected_samples(&self) -> Result<Option<(Array2<f64>, Vec<Value>)>> {
        let (Some(ds), Some(x), Some(y)) = (&self.dataset, &self.x_column, &self.y_column) else {
            return Ok(None);
        };
        let matrix = ds.to_matrix(&[x.as_str(), y.as_str()])?;
        let labels = self
            .class_column
            .as_deref()
            .and_then(|c| ds.column(c));

        let keep: Vec<usize> = (0..matrix.nrows())
            .filter(|&i| matrix.row(i).iter().all(|v| v.is_finite()))
            .collect();
        let features = matrix.select(Axis(0), &keep);
        let labels = keep
            .iter()
            .map(|&i| labels.map_or(Value::Null, |col| col.values[i].clone()))
            .collect();
        Ok(Some((features, labels)))
    }

    fn compute_scene(&self) -> Result<Option<Scene>> {
        let Some((features, labels)) = self.selected_samples()? else {
            return Ok(None);
        };
        if features.nrows() == 0 {
            return Ok(Some(Scene::default()));
        }

        let mut scene = Scene::default();
        for (row, label) in features.outer_iter().zip(&labels) {
            scene
                .samples
                .entry(label.clone())
                .or_default()
                .push([row[0], row[1]]);
        }

        if !self.shade_regions {
            return Ok(Some(scene));
        }

        let options = MeshOptions::default()
            .with_step_size(self.step_size)
            .flattened(true)
            .with_max_points(Some(MAX_SHADED_POINTS));
        // Count first so an oversized mesh is never allocated.
        scene.mesh_points = mesh_shape(features.view(), &options)
            .context("sizing mesh")?
            .iter()
            .product();
        if scene.mesh_points > MAX_SHADED_POINTS {
            return Ok(Some(scene));
        }
        let mesh = make_mesh(features.view(), &options).context("building mesh")?;

        for point in mesh.grid.outer_iter() {
            let (px, py) = (point[0], point[1]);
            let nearest = features
                .outer_iter()
                .map(|r| (r[0] - px).powi(2) + (r[1] - py).powi(2))
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);
            if let Some(i) = nearest {
                scene
                    .regions
                    .entry(labels[i].clone())
                    .or_default()
                    .push([px, py]);
            }
        }

        Ok(Some(scene))
    }
}
