use ndarray::{Array1, ArrayD, ArrayView2, Axis, IxDyn};

use crate::error::MeshError;

/// How the first two grid axes map to input dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indexing {
    /// Plotting convention: grid rows follow dimension 1 and grid columns
    /// follow dimension 0, so dimension 0 varies fastest along each row.
    #[default]
    Xy,
    /// Matrix convention: grid axis `i` follows dimension `i`.
    Ij,
}

/// Default cap on the number of grid points [`make_mesh`] will allocate.
pub const DEFAULT_MAX_POINTS: usize = 1 << 26;

/// Parameters for [`make_mesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshOptions {
    pub step_size: f64,
    pub dim: usize,
    /// Flatten the grid to `[points, dim]`.
    pub return_2d: bool,
    pub indexing: Indexing,
    /// Refuse grids with more points than this. `None` only keeps the
    /// `isize` addressing limit.
    pub max_points: Option<usize>,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            step_size: 0.1,
            dim: 2,
            return_2d: false,
            indexing: Indexing::Xy,
            max_points: Some(DEFAULT_MAX_POINTS),
        }
    }
}

impl MeshOptions {
    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    pub fn flattened(mut self, return_2d: bool) -> Self {
        self.return_2d = return_2d;
        self
    }

    pub fn with_indexing(mut self, indexing: Indexing) -> Self {
        self.indexing = indexing;
        self
    }

    pub fn with_max_points(mut self, max_points: Option<usize>) -> Self {
        self.max_points = max_points;
        self
    }
}

/// A coordinate grid plus the per-dimension samples it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// `[..grid axes, dim]`, or `[points, dim]` when flattened.
    pub grid: ArrayD<f64>,
    /// One sample sequence per dimension, in input column order.
    pub axes: Vec<Array1<f64>>,
}

impl Mesh {
    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    pub fn n_points(&self) -> usize {
        self.axes.iter().map(Array1::len).product()
    }

    /// Iterate the grid points in row-major grid order.
    pub fn points(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        let dim = self.dim();
        self.grid
            .as_slice()
            .into_iter()
            .flat_map(move |flat| flat.chunks(dim).map(<[f64]>::to_vec))
    }
}

/// Number of values in the half-open range `[start, stop)` at `step`:
/// `ceil((stop - start) / step)`. `None` when the range is empty, or when its
/// length is not finite or not addressable.
fn sample_count(start: f64, stop: f64, step: f64) -> Option<usize> {
    let span = ((stop - start) / step).ceil();
    (span.is_finite() && span >= 1.0 && span <= isize::MAX as f64).then(|| span as usize)
}

/// `n` values `start + k * step`.
fn arange(start: f64, step: f64, n: usize) -> Array1<f64> {
    Array1::from_shape_fn(n, |k| start + k as f64 * step)
}

/// Validated sampling plan for one dimension.
struct AxisPlan {
    start: f64,
    len: usize,
}

fn plan_axes(x: ArrayView2<'_, f64>, options: &MeshOptions) -> Result<Vec<AxisPlan>, MeshError> {
    let MeshOptions { step_size, dim, .. } = *options;

    if !step_size.is_finite() || step_size <= 0.0 {
        return Err(MeshError::InvalidStep(step_size));
    }
    if dim == 0 {
        return Err(MeshError::ZeroDim);
    }
    if x.nrows() == 0 {
        return Err(MeshError::EmptyMatrix);
    }
    if dim > x.ncols() {
        return Err(MeshError::DimOutOfRange {
            dim,
            columns: x.ncols(),
        });
    }

    x.axis_iter(Axis(1))
        .take(dim)
        .enumerate()
        .map(|(j, column)| -> Result<AxisPlan, MeshError> {
            let (lo, hi) = column
                .iter()
                .try_fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    v.is_finite().then(|| (lo.min(v), hi.max(v)))
                })
                .ok_or(MeshError::NonFiniteValue(j))?;
            let (start, stop) = (lo - step_size, hi + step_size);
            let len = sample_count(start, stop, step_size).ok_or(MeshError::UncountableAxis {
                column: j,
                step: step_size,
            })?;
            Ok(AxisPlan { start, len })
        })
        .collect()
}

/// Per-dimension sample counts [`make_mesh`] would produce for `x`, in input
/// column order, without allocating the grid.
///
/// Fails on the same inputs as `make_mesh`, except that `max_points` is not
/// applied. The product of the counts always fits in `usize`.
pub fn mesh_shape(x: ArrayView2<'_, f64>, options: &MeshOptions) -> Result<Vec<usize>, MeshError> {
    let lens: Vec<usize> = plan_axes(x, options)?.iter().map(|p| p.len).collect();
    lens.iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| MeshError::TooLarge(lens.clone()))?;
    Ok(lens)
}

/// Build a grid spanning the first `dim` columns of `x`.
///
/// Each dimension is sampled from `min - step` up to, but excluding,
/// `max + step`. The grid is the Cartesian product of these samples with the
/// coordinates stacked on the last axis.
///
/// Grids with more than `max_points` points, and sample counts that are not
/// finite (a span overflowing `f64`, or a step below the data's precision),
/// are errors. Nothing is allocated before the size is known.
///
/// ```
/// use isl_toolkit::{make_mesh, MeshOptions};
/// use ndarray::array;
///
/// let x = array![[0.0, 0.0], [1.0, 1.0]];
/// let mesh = make_mesh(x.view(), &MeshOptions::default().with_step_size(1.0)).unwrap();
/// assert_eq!(mesh.grid.shape(), &[3, 3, 2]);
/// assert_eq!(mesh.axes[0].to_vec(), vec![-1.0, 0.0, 1.0]);
/// ```
pub fn make_mesh(x: ArrayView2<'_, f64>, options: &MeshOptions) -> Result<Mesh, MeshError> {
    let MeshOptions {
        step_size,
        dim,
        return_2d,
        indexing,
        max_points,
    } = *options;

    let plans = plan_axes(x, options)?;

    // Which input dimension each grid axis walks.
    let mut order: Vec<usize> = (0..dim).collect();
    if indexing == Indexing::Xy && dim >= 2 {
        order.swap(0, 1);
    }

    let mut shape: Vec<usize> = order.iter().map(|&d| plans[d].len).collect();
    let n_points = shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .filter(|&n| {
            n.checked_mul(dim).is_some_and(|cells| cells <= isize::MAX as usize)
                && max_points.map_or(true, |max| n <= max)
        })
        .ok_or_else(|| MeshError::TooLarge(shape.clone()))?;
    shape.push(dim);

    let axes: Vec<Array1<f64>> = plans
        .iter()
        .map(|p| arange(p.start, step_size, p.len))
        .collect();

    // Grid axis `a` walks dimension `order[a]`; component `c` reads the index
    // of the grid axis that walks dimension `c`.
    let mut axis_of = vec![0; dim];
    for (a, &d) in order.iter().enumerate() {
        axis_of[d] = a;
    }
    let grid = ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
        let c = idx[dim];
        axes[c][idx[axis_of[c]]]
    });

    let grid = if return_2d {
        grid.into_shape_with_order(IxDyn(&[n_points, dim]))?
    } else {
        grid
    };

    log::debug!(
        "mesh: {n_points} points over {dim} dimension(s), step {step_size}"
    );
    Ok(Mesh { grid, axes })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn sample_count_is_half_open() {
        assert_eq!(sample_count(-1.0, 2.0, 1.0), Some(3));
        assert_eq!(sample_count(0.0, 1.0, 0.3), Some(4));
        assert_eq!(arange(-1.0, 1.0, 3).to_vec(), vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn sample_count_rejects_empty_and_unbounded_ranges() {
        assert_eq!(sample_count(1.0, 1.0, 0.1), None);
        assert_eq!(sample_count(2.0, 1.0, 0.1), None);
        assert_eq!(sample_count(0.0, 3.0, 1e-300), None);
        assert_eq!(sample_count(-1.1e308, 1.1e308, 1e307), None);
    }

    #[test]
    fn unit_square_with_unit_step() {
        let x = array![[0.0, 0.0], [1.0, 1.0]];
        let opts = MeshOptions::default().with_step_size(1.0);

        let mesh = make_mesh(x.view(), &opts).unwrap();
        assert_eq!(mesh.grid.shape(), &[3, 3, 2]);
        assert_eq!(mesh.axes.len(), 2);
        for axis in &mesh.axes {
            assert_eq!(axis.to_vec(), vec![-1.0, 0.0, 1.0]);
        }

        let flat = make_mesh(x.view(), &opts.flattened(true)).unwrap();
        assert_eq!(flat.grid.shape(), &[9, 2]);
    }

    #[test]
    fn xy_indexing_varies_first_dimension_along_rows() {
        let x = array![[0.0, 10.0], [2.0, 11.0]];
        let mesh = make_mesh(x.view(), &MeshOptions::default().with_step_size(1.0)).unwrap();

        // dim 0 samples: -1..3 (4 values), dim 1 samples: 9..12 (3 values).
        assert_eq!(mesh.axes[0].len(), 4);
        assert_eq!(mesh.axes[1].len(), 3);
        assert_eq!(mesh.grid.shape(), &[3, 4, 2]);

        assert_eq!(mesh.grid[[0, 0, 0]], -1.0);
        assert_eq!(mesh.grid[[0, 1, 0]], 0.0);
        assert_eq!(mesh.grid[[0, 1, 1]], 9.0);
        assert_eq!(mesh.grid[[2, 3, 0]], 2.0);
        assert_eq!(mesh.grid[[2, 3, 1]], 11.0);
    }

    #[test]
    fn ij_indexing_keeps_dimension_order() {
        let x = array![[0.0, 10.0], [2.0, 11.0]];
        let opts = MeshOptions::default()
            .with_step_size(1.0)
            .with_indexing(Indexing::Ij);
        let mesh = make_mesh(x.view(), &opts).unwrap();

        assert_eq!(mesh.grid.shape(), &[4, 3, 2]);
        assert_eq!(mesh.grid[[1, 0, 0]], 0.0);
        assert_eq!(mesh.grid[[1, 0, 1]], 9.0);
    }

    #[test]
    fn flattened_rows_match_points() {
        let x = array![[0.0, 0.0], [1.0, 2.0]];
        let mesh = make_mesh(
            x.view(),
            &MeshOptions::default().with_step_size(0.5).flattened(true),
        )
        .unwrap();
        let rows: Vec<Vec<f64>> = mesh.grid.outer_iter().map(|r| r.iter().copied().collect()).collect();
        let points: Vec<Vec<f64>> = mesh.points().collect();
        assert_eq!(rows, points);
        assert_eq!(rows.len(), mesh.n_points());
        // First dimension varies fastest.
        assert_eq!(rows[0], vec![-0.5, -0.5]);
        assert_eq!(rows[1], vec![0.0, -0.5]);
    }

    #[test]
    fn only_leading_columns_are_used() {
        let x = array![[0.0, 0.0, 100.0], [1.0, 1.0, 200.0]];
        let mesh = make_mesh(x.view(), &MeshOptions::default().with_step_size(1.0)).unwrap();
        assert_eq!(mesh.dim(), 2);
        assert_eq!(mesh.grid.shape()[2], 2);
    }

    #[test]
    fn one_dimensional_mesh() {
        let x = array![[0.0], [1.0]];
        let opts = MeshOptions::default().with_step_size(1.0).with_dim(1);
        let mesh = make_mesh(x.view(), &opts).unwrap();
        assert_eq!(mesh.grid.shape(), &[3, 1]);
        assert_eq!(mesh.axes[0].to_vec(), vec![-1.0, 0.0, 1.0]);
    }

    #[test]
    fn three_dimensional_mesh() {
        let x = array![[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]];
        let opts = MeshOptions::default().with_step_size(1.0).with_dim(3);
        let mesh = make_mesh(x.view(), &opts).unwrap();
        // n0 = 3, n1 = 4, n2 = 5; xy swaps the first two grid axes.
        assert_eq!(mesh.grid.shape(), &[4, 3, 5, 3]);
        assert_eq!(mesh.grid[[0, 2, 4, 0]], 1.0);
        assert_eq!(mesh.grid[[0, 2, 4, 2]], 3.0);

        let flat = make_mesh(x.view(), &opts.flattened(true)).unwrap();
        assert_eq!(flat.grid.shape(), &[60, 3]);
    }

    #[test]
    fn rejects_bad_input() {
        let x = array![[0.0, 1.0]];
        let empty = ndarray::Array2::<f64>::zeros((0, 2));

        assert!(matches!(
            make_mesh(empty.view(), &MeshOptions::default()),
            Err(MeshError::EmptyMatrix)
        ));
        assert!(matches!(
            make_mesh(x.view(), &MeshOptions::default().with_dim(3)),
            Err(MeshError::DimOutOfRange { dim: 3, columns: 2 })
        ));
        assert!(matches!(
            make_mesh(x.view(), &MeshOptions::default().with_dim(0)),
            Err(MeshError::ZeroDim)
        ));
        assert!(matches!(
            make_mesh(x.view(), &MeshOptions::default().with_step_size(0.0)),
            Err(MeshError::InvalidStep(_))
        ));
        assert!(matches!(
            make_mesh(x.view(), &MeshOptions::default().with_step_size(f64::NAN)),
            Err(MeshError::InvalidStep(_))
        ));

        let nan = array![[0.0, f64::NAN]];
        assert!(matches!(
            make_mesh(nan.view(), &MeshOptions::default()),
            Err(MeshError::NonFiniteValue(1))
        ));
    }

    #[test]
    fn point_cap_is_checked_before_allocating() {
        let x = array![[0.0, 0.0], [1.0, 1.0]];
        let opts = MeshOptions::default()
            .with_step_size(1.0)
            .with_max_points(Some(8));
        assert!(matches!(
            make_mesh(x.view(), &opts),
            Err(MeshError::TooLarge(shape)) if shape == vec![3, 3]
        ));
        assert!(make_mesh(x.view(), &opts.with_max_points(Some(9))).is_ok());
        assert_eq!(mesh_shape(x.view(), &opts).unwrap(), vec![3, 3]);
    }
}
