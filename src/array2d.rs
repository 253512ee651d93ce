use std::collections::TryReserveError;

/// Dense row-major grid. Row `y = 0` is the bottom of the simulation domain.
#[derive(Clone, Debug, PartialEq)]
pub struct Array2D<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T> Array2D<T> {
    pub fn from_array(width: usize, data: Vec<T>) -> Self {
        assert!(width > 0, "width must be > 0");
        assert_eq!(data.len() % width, 0);
        let height = data.len() / width;
        Self {
            width,
            height,
            data,
        }
    }

    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Copy,
    {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }

    /// Like [`Array2D::new`], but reports allocation failure instead of aborting.
    pub fn try_new(width: usize, height: usize) -> Result<Self, TryReserveError>
    where
        T: Default + Copy,
    {
        let len = width.saturating_mul(height);
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, T::default());
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn calc_index(&self, (x, y): (usize, usize)) -> usize {
        debug_assert!(x < self.width);
        debug_assert!(y < self.height);
        x + y * self.width
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Fetch with coordinates clamped to the grid edge.
    pub fn clamped(&self, x: isize, y: isize) -> &T {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        &self[(x, y)]
    }

    pub fn fill_with(&mut self, mut f: impl FnMut(usize, usize) -> T) {
        let width = self.width;
        for (i, cell) in self.data.iter_mut().enumerate() {
            *cell = f(i % width, i / width);
        }
    }
}

impl<T> std::ops::Index<(usize, usize)> for Array2D<T> {
    type Output = T;
    fn index(&self, pos: (usize, usize)) -> &T {
        &self.data[self.calc_index(pos)]
    }
}

impl<T> std::ops::IndexMut<(usize, usize)> for Array2D<T> {
    fn index_mut(&mut self, pos: (usize, usize)) -> &mut T {
        let idx = self.calc_index(pos);
        &mut self.data[idx]
    }
}

/// Linear interpolation
pub fn lerp<T>(a: T, b: T, t: f32) -> T
where
    T: std::ops::Add<Output = T> + std::ops::Mul<f32, Output = T>,
{
    a * (1. - t) + b * t
}

/// Bilinear interpolation of the given grid at the given (cell-index) coordinates.
/// Coordinates outside the grid clamp to the edge.
pub fn interp<T>(grid: &Array2D<T>, x: f32, y: f32) -> T
where
    T: Copy + std::ops::Add<Output = T> + std::ops::Mul<f32, Output = T>,
{
    // Bounds enforcement. No panics!
    let max_x = (grid.width() - 1) as f32;
    let max_y = (grid.height() - 1) as f32;
    let x = x.clamp(0., max_x);
    let y = y.clamp(0., max_y);

    let tl_x = x.floor() as usize;
    let tl_y = y.floor() as usize;
    let br_x = (tl_x + 1).min(grid.width() - 1);
    let br_y = (tl_y + 1).min(grid.height() - 1);

    // Get corners
    let tl = grid[(tl_x, tl_y)];
    let tr = grid[(br_x, tl_y)];
    let bl = grid[(tl_x, br_y)];
    let br = grid[(br_x, br_y)];

    let fx = x - tl_x as f32;
    let fy = y - tl_y as f32;

    lerp(
        lerp(tl, tr, fx), // Top row
        lerp(bl, br, fx), // Bottom row
        fy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_row_major() {
        let grid = Array2D::from_array(3, (0..6).map(|v| v as f32).collect());
        assert_eq!(grid.height(), 2);
        assert_eq!(grid[(2, 0)], 2.);
        assert_eq!(grid[(0, 1)], 3.);
    }

    #[test]
    fn try_new_is_zeroed() {
        let grid = Array2D::<f32>::try_new(4, 5).unwrap();
        assert_eq!(grid.data().len(), 20);
        assert!(grid.data().iter().all(|&v| v == 0.));
    }

    #[test]
    fn clamped_fetch_stays_on_edge() {
        let grid = Array2D::from_array(2, vec![1., 2., 3., 4.]);
        assert_eq!(*grid.clamped(-3, 0), 1.);
        assert_eq!(*grid.clamped(5, 7), 4.);
    }

    #[test]
    fn interp_hits_corners_and_midpoints() {
        let grid = Array2D::from_array(2, vec![0., 1., 2., 3.]);
        assert_eq!(interp(&grid, 0., 0.), 0.);
        assert_eq!(interp(&grid, 1., 1.), 3.);
        assert_eq!(interp(&grid, 0.5, 0.5), 1.5);
        // Outside the grid clamps instead of wrapping
        assert_eq!(interp(&grid, -4., 9.), 2.);
    }

    #[test]
    fn fill_with_visits_every_cell() {
        let mut grid = Array2D::<f32>::new(3, 2);
        grid.fill_with(|x, y| (x + 10 * y) as f32);
        assert_eq!(grid[(2, 1)], 12.);
    }
}
