use gingham::{detect, PointWithRefinement as Point};
use numpy::{PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn value_error(message: impl Into<String>) -> PyErr {
    PyValueError::new_err(message.into())
}

/// A detected chessboard corner in full-resolution pixel coordinates.
#[pyclass(name = "PointWithRefinement", module = "gingham", frozen, get_all)]
#[derive(Clone, Copy, Debug)]
struct PointWithRefinement {
    x: f64,
    y: f64,
    refinement_level: i32,
}

#[pymethods]
impl PointWithRefinement {
    fn __repr__(&self) -> String {
        format!(
            "PointWithRefinement(x={}, y={}, refinement_level={})",
            self.x, self.y, self.refinement_level
        )
    }
}

impl From<Point> for PointWithRefinement {
    fn from(p: Point) -> Self {
        Self {
            x: p.x,
            y: p.y,
            refinement_level: p.refinement_level,
        }
    }
}

fn gray_image_from_py(image: &PyReadonlyArray2<'_, u8>) -> PyResult<gingham::GrayImage> {
    let [height, width] = [image.shape()[0], image.shape()[1]];
    let view = image.as_array();
    // Non-contiguous arrays (slices, transposes) are copied in logical order.
    let pixels: Vec<u8> = match view.as_slice() {
        Some(slice) => slice.to_vec(),
        None => view.iter().copied().collect(),
    };
    detect::gray_image_from_slice(width, height, &pixels).map_err(|err| value_error(err.to_string()))
}

/// Detect a 7x7-corner chessboard in a 2D `uint8` image.
///
/// Returns the corners row by row, or an empty list when no board is found.
/// Raises `ValueError` for a negative blur radius or an unusable image.
#[pyfunction]
#[pyo3(signature = (image, do_contrast_enhancement, blur_radius, do_subpixel_refinement))]
fn detect_chessboard(
    py: Python<'_>,
    image: PyReadonlyArray2<'_, u8>,
    do_contrast_enhancement: bool,
    blur_radius: i32,
    do_subpixel_refinement: bool,
) -> PyResult<Vec<PointWithRefinement>> {
    let img = gray_image_from_py(&image)?;
    let result = py.detach(move || {
        detect::detect_chessboard(
            &img,
            do_contrast_enhancement,
            blur_radius,
            do_subpixel_refinement,
        )
    });
    let points = result.map_err(|err| value_error(err.to_string()))?;
    Ok(points.into_iter().map(PointWithRefinement::from).collect())
}

#[pymodule]
#[pyo3(name = "gingham")]
fn gingham_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PointWithRefinement>()?;
    m.add_function(wrap_pyfunction!(detect_chessboard, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
