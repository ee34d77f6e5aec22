//! Dense 2-D sample grid.

/// A row-major grid of samples.
///
/// Used for the normalized heatmap and for scratch buffers in the contact
/// finder. Resizing only reallocates when the dimensions actually change.
#[derive(Clone, Default, PartialEq)]
pub struct Image<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Image<T> {
    /// Creates a grid filled with `T::default()`.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }

    /// Builds a grid from row-major data. Returns `None` on a size mismatch.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid has no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major samples.
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable row-major samples.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Returns the sample at `(row, col)`, or `None` outside the grid.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Writes the sample at `(row, col)`; ignored outside the grid.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
        }
    }

    /// Changes the grid dimensions, returning `true` if they changed.
    ///
    /// Contents are unspecified after a resize; callers overwrite every cell.
    pub fn resize(&mut self, rows: usize, cols: usize) -> bool {
        if self.rows == rows && self.cols == cols {
            return false;
        }

        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, T::default());
        true
    }

    /// Sets every sample to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// Iterates `(row, col, value)` in scan order.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let cols = self.cols.max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i / cols, i % cols, v))
    }
}

impl<T> std::fmt::Debug for Image<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_only_on_change() {
        let mut image: Image<f64> = Image::default();
        assert!(image.resize(4, 3));
        assert!(!image.resize(4, 3));
        assert_eq!(image.len(), 12);
        assert!(image.resize(3, 4));
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut image: Image<u8> = Image::new(2, 2);
        image.set(5, 5, 9);
        assert_eq!(image.get(2, 0), None);
        assert!(image.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_indexed_scan_order() {
        let image = Image::from_vec(2, 3, vec![0, 1, 2, 3, 4, 5]).unwrap();
        let cells: Vec<_> = image.indexed().collect();
        assert_eq!(cells[4], (1, 1, 4));
    }
}
