use ndarray::{array, Array2, Axis};

use isl_toolkit::{
    make_mesh, mesh_shape, Column, ColumnType, DataFrame, MeshError, MeshOptions, Value,
    DEFAULT_MAX_POINTS,
};

/// Slack for values accumulated as `start + k * step`.
const EPS: f64 = 1e-9;

fn column_range(x: &Array2<f64>, j: usize) -> (f64, f64) {
    let col = x.index_axis(Axis(1), j);
    let lo = col.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lo, hi)
}

#[test]
fn flattened_grid_has_product_of_axis_lengths() {
    let x = array![[0.3, -1.2], [2.7, 0.4], [1.1, 3.9], [-0.8, 2.2]];
    let opts = MeshOptions::default().with_step_size(0.25).flattened(true);

    let mesh = make_mesh(x.view(), &opts).unwrap();
    let n = mesh.axes[0].len() * mesh.axes[1].len();
    assert_eq!(mesh.grid.shape(), &[n, 2]);
}

#[test]
fn samples_cover_each_column_range() {
    let x = array![[0.3, -1.2, 9.0], [2.7, 0.4, 8.0], [1.1, 3.9, 7.5]];
    for step in [0.05, 0.1, 0.33, 1.0, 2.5] {
        let opts = MeshOptions::default().with_step_size(step).with_dim(3);
        let mesh = make_mesh(x.view(), &opts).unwrap();
        assert_eq!(mesh.axes.len(), 3);

        for (j, axis) in mesh.axes.iter().enumerate() {
            let (lo, hi) = column_range(&x, j);
            let first = axis[0];
            let last = axis[axis.len() - 1];
            assert!(first <= lo, "step {step}, dim {j}: {first} > {lo}");
            assert!(last >= hi - EPS, "step {step}, dim {j}: {last} < {hi}");
            assert!(last < hi + step + EPS, "step {step}, dim {j}: upper bound not exclusive");
        }
    }
}

#[test]
fn exact_steps_reach_column_max() {
    // Dyadic data and steps: every sample is computed without rounding.
    let x = array![[0.5, -1.25, 9.0], [2.75, 0.5, 8.0], [1.0, 3.75, 7.5]];
    for step in [0.25, 0.5, 1.0, 2.5] {
        let opts = MeshOptions::default().with_step_size(step).with_dim(3);
        let mesh = make_mesh(x.view(), &opts).unwrap();

        for (j, axis) in mesh.axes.iter().enumerate() {
            let (lo, hi) = column_range(&x, j);
            let last = axis[axis.len() - 1];
            assert!(axis[0] <= lo, "step {step}, dim {j}");
            assert!(last >= hi, "step {step}, dim {j}: {last} < {hi}");
            assert!(last < hi + step, "step {step}, dim {j}");
        }
    }
}

#[test]
fn tiny_step_is_an_error_not_a_panic() {
    let x = array![[0.0, 0.0], [1.0, 1.0]];
    let opts = MeshOptions::default().with_step_size(1e-300);
    let err = make_mesh(x.view(), &opts).unwrap_err();
    assert!(matches!(err, MeshError::UncountableAxis { column: 0, .. }), "{err}");
}

#[test]
fn overflowing_span_is_an_error() {
    let x = array![[-1e308, 0.0], [1e308, 1.0]];
    let opts = MeshOptions::default().with_step_size(1e307);
    let err = make_mesh(x.view(), &opts).unwrap_err();
    assert!(matches!(err, MeshError::UncountableAxis { column: 0, .. }), "{err}");
}

#[test]
fn step_below_data_precision_is_an_error() {
    // 1e20 +- 1.0 rounds back to 1e20, leaving an empty range.
    let x = array![[1e20, 0.0], [1e20, 1.0]];
    let opts = MeshOptions::default().with_step_size(1.0);
    let err = make_mesh(x.view(), &opts).unwrap_err();
    assert!(matches!(err, MeshError::UncountableAxis { column: 0, .. }), "{err}");
}

#[test]
fn oversized_grid_is_refused_before_allocation() {
    let x = array![[0.0, 0.0], [1e6, 1e6]];
    let opts = MeshOptions::default().with_step_size(1e-3).flattened(true);

    let lens = mesh_shape(x.view(), &opts).unwrap();
    assert_eq!(lens.len(), 2);
    assert!(lens.iter().product::<usize>() > DEFAULT_MAX_POINTS);

    let err = make_mesh(x.view(), &opts).unwrap_err();
    assert!(matches!(err, MeshError::TooLarge(_)), "{err}");
}

#[test]
fn unaddressable_grid_is_too_large_even_without_cap() {
    let x = array![[0.0, 0.0, 0.0], [1e6, 1e6, 1e6]];
    let opts = MeshOptions::default()
        .with_step_size(1e-3)
        .with_dim(3)
        .with_max_points(None);

    assert!(matches!(
        mesh_shape(x.view(), &opts),
        Err(MeshError::TooLarge(_))
    ));
    assert!(matches!(
        make_mesh(x.view(), &opts),
        Err(MeshError::TooLarge(_))
    ));
}

#[test]
fn unit_example_shapes() {
    let x = array![[0.0, 0.0], [1.0, 1.0]];
    let opts = MeshOptions::default().with_step_size(1.0);

    let mesh = make_mesh(x.view(), &opts).unwrap();
    assert_eq!(mesh.axes[0].to_vec(), vec![-1.0, 0.0, 1.0]);
    assert_eq!(mesh.axes[1].to_vec(), vec![-1.0, 0.0, 1.0]);
    assert_eq!(mesh.grid.shape(), &[3, 3, 2]);

    let flat = make_mesh(x.view(), &opts.flattened(true)).unwrap();
    assert_eq!(flat.grid.shape(), &[9, 2]);
    assert_eq!(flat.axes, mesh.axes);
}

#[test]
fn mesh_from_loaded_table() {
    let df = DataFrame::new(vec![
        Column::new(
            "balance",
            ColumnType::Float,
            vec![Value::Float(0.0), Value::Float(2.0)],
        ),
        Column::new("income", ColumnType::Int, vec![Value::Int(1), Value::Int(3)]),
    ])
    .unwrap();

    let x = df.to_matrix(&["balance", "income"]).unwrap();
    let mesh = make_mesh(
        x.view(),
        &MeshOptions::default().with_step_size(1.0).flattened(true),
    )
    .unwrap();
    // balance: -1..3 -> 4 samples, income: 0..4 -> 4 samples.
    assert_eq!(mesh.grid.shape(), &[16, 2]);
}

#[test]
fn too_few_columns_is_an_error() {
    let x = array![[1.0], [2.0]];
    let err = make_mesh(x.view(), &MeshOptions::default()).unwrap_err();
    assert!(matches!(err, MeshError::DimOutOfRange { dim: 2, columns: 1 }));
    assert_eq!(
        err.to_string(),
        "requested 2 dimensions but the matrix has 1 columns"
    );
}
