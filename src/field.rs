//! Field storage, sampling and the double-buffer swap.
//!
//! A [`Field`] is the software stand-in for a float texture: a dense grid of
//! texels with clamp-to-edge bilinear sampling. Kernels never read and write
//! the same field; they read through a [`Sampler`] bound at a texture [`Unit`]
//! and write into the `write` half of a [`DoubleBuffer`].

use std::ops::{Add, Index, Mul, Sub};

use glam::{Vec2, Vec3};

use crate::array2d::{interp, Array2D};
use crate::FluidError;

/// Value stored in a field cell.
pub trait Texel:
    Copy + Default + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self> + 'static
{
    const CHANNELS: usize;

    fn bind(field: &Field<Self>) -> Bound<'_>;

    fn unbind(bound: Bound<'_>) -> Option<&Field<Self>>;

    fn magnitude(self) -> f32;
}

impl Texel for f32 {
    const CHANNELS: usize = 1;

    fn bind(field: &Field<Self>) -> Bound<'_> {
        Bound::Scalar(field)
    }

    fn unbind(bound: Bound<'_>) -> Option<&Field<Self>> {
        match bound {
            Bound::Scalar(field) => Some(field),
            _ => None,
        }
    }

    fn magnitude(self) -> f32 {
        self.abs()
    }
}

impl Texel for Vec2 {
    const CHANNELS: usize = 2;

    fn bind(field: &Field<Self>) -> Bound<'_> {
        Bound::Vector(field)
    }

    fn unbind(bound: Bound<'_>) -> Option<&Field<Self>> {
        match bound {
            Bound::Vector(field) => Some(field),
            _ => None,
        }
    }

    fn magnitude(self) -> f32 {
        self.length()
    }
}

impl Texel for Vec3 {
    const CHANNELS: usize = 3;

    fn bind(field: &Field<Self>) -> Bound<'_> {
        Bound::Color(field)
    }

    fn unbind(bound: Bound<'_>) -> Option<&Field<Self>> {
        match bound {
            Bound::Color(field) => Some(field),
            _ => None,
        }
    }

    fn magnitude(self) -> f32 {
        self.length()
    }
}

/// Dense 2-D grid of texels.
#[derive(Clone, Debug, PartialEq)]
pub struct Field<T> {
    texels: Array2D<T>,
}

impl<T: Texel> Field<T> {
    /// Zero-initialized field. Fails with [`FluidError::DeviceUnavailable`]
    /// when the storage cannot be reserved.
    pub fn allocate(width: usize, height: usize) -> Result<Self, FluidError> {
        if width == 0 || height == 0 {
            return Err(FluidError::ConfigurationInvalid(format!(
                "field size {width}x{height} is empty"
            )));
        }

        let texels = Array2D::try_new(width, height).map_err(|e| {
            log::error!(
                "failed to allocate {width}x{height}x{} field: {e}",
                T::CHANNELS
            );
            FluidError::DeviceUnavailable
        })?;

        Ok(Self { texels })
    }

    pub fn width(&self) -> usize {
        self.texels.width()
    }

    pub fn height(&self) -> usize {
        self.texels.height()
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    pub fn channels(&self) -> usize {
        T::CHANNELS
    }

    pub fn texel_size(&self) -> Vec2 {
        Vec2::new(1. / self.width() as f32, 1. / self.height() as f32)
    }

    /// Cell centre in uv
    pub fn cell_uv(&self, x: usize, y: usize) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.width() as f32,
            (y as f32 + 0.5) / self.height() as f32,
        )
    }

    pub fn texels(&self) -> &[T] {
        self.texels.data()
    }

    pub fn texels_mut(&mut self) -> &mut [T] {
        self.texels.data_mut()
    }

    pub fn fill_with(&mut self, f: impl FnMut(usize, usize) -> T) {
        self.texels.fill_with(f);
    }

    pub fn sampler(&self) -> Sampler<'_, T> {
        Sampler { field: self }
    }

    pub fn total(&self) -> T {
        self.texels
            .data()
            .iter()
            .fold(T::default(), |acc, &texel| acc + texel)
    }

    /// Largest texel magnitude, together with its cell.
    pub fn peak(&self) -> (f32, (usize, usize)) {
        let width = self.width();
        self.texels
            .data()
            .iter()
            .enumerate()
            .map(|(i, texel)| (texel.magnitude(), (i % width, i / width)))
            .fold((0., (0, 0)), |best, cur| if cur.0 > best.0 { cur } else { best })
    }
}

impl<T> Index<(usize, usize)> for Field<T> {
    type Output = T;
    fn index(&self, pos: (usize, usize)) -> &T {
        &self.texels[pos]
    }
}

impl<T> std::ops::IndexMut<(usize, usize)> for Field<T> {
    fn index_mut(&mut self, pos: (usize, usize)) -> &mut T {
        &mut self.texels[pos]
    }
}

/// Read-only view of a field, the equivalent of a bound texture sampler.
#[derive(Clone, Copy, Debug)]
pub struct Sampler<'a, T> {
    field: &'a Field<T>,
}

impl<'a, T: Texel> Sampler<'a, T> {
    pub fn field(&self) -> &'a Field<T> {
        self.field
    }

    pub fn texel_size(&self) -> Vec2 {
        self.field.texel_size()
    }

    pub fn fetch(&self, x: isize, y: isize) -> T {
        *self.field.texels.clamped(x, y)
    }

    /// Bilinear sample at a uv coordinate. Outside [0,1] clamps to the edge.
    pub fn sample(&self, uv: Vec2) -> T {
        let x = uv.x * self.field.width() as f32 - 0.5;
        let y = uv.y * self.field.height() as f32 - 0.5;
        interp(&self.field.texels, x, y)
    }
}

/// Owning read/write pair of same-shaped fields.
#[derive(Clone, Debug)]
pub struct DoubleBuffer<T> {
    pub read: Field<T>,
    pub write: Field<T>,
}

impl<T: Texel> DoubleBuffer<T> {
    pub fn allocate(width: usize, height: usize) -> Result<Self, FluidError> {
        Ok(Self {
            read: Field::allocate(width, height)?,
            write: Field::allocate(width, height)?,
        })
    }

    /// No data is copied.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }
}

/// Texture unit index a field is bound at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Unit(pub u8);

/// Number of sampling units a single pass can bind.
pub const MAX_UNITS: usize = 4;

/// A field bound for sampling, tagged by texel kind.
#[derive(Clone, Copy, Debug)]
pub enum Bound<'a> {
    Scalar(&'a Field<f32>),
    Vector(&'a Field<Vec2>),
    Color(&'a Field<Vec3>),
}

impl Bound<'_> {
    pub fn channels(&self) -> usize {
        match self {
            Bound::Scalar(_) => 1,
            Bound::Vector(_) => 2,
            Bound::Color(_) => 3,
        }
    }
}

#[derive(Debug, Default)]
pub struct Bindings<'a> {
    slots: [Option<Bound<'a>>; MAX_UNITS],
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `field` for sampling at `unit`, replacing whatever was there.
    /// Returns `unit` so calls can be chained into a pass's inputs.
    pub fn attach<T: Texel>(&mut self, field: &'a Field<T>, unit: Unit) -> Unit {
        self.slots[unit.0 as usize] = Some(T::bind(field));
        unit
    }

    /// Sampler for the field bound at `unit`.
    ///
    /// Unit layouts are fixed per program, so a missing or mismatched binding
    /// is a bug in the pass, not a runtime condition.
    #[track_caller]
    pub fn sampler<T: Texel>(&self, unit: Unit) -> Sampler<'a, T> {
        match self.slots[unit.0 as usize].and_then(T::unbind) {
            Some(field) => field.sampler(),
            None => panic!(
                "unit {} does not hold a {}-channel field (bound: {:?})",
                unit.0,
                T::CHANNELS,
                self.slots[unit.0 as usize].map(|b| b.channels())
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_is_zeroed_with_requested_shape() {
        let field = Field::<Vec3>::allocate(8, 4).unwrap();
        assert_eq!(field.size(), (8, 4));
        assert_eq!(field.channels(), 3);
        assert!(field.texels().iter().all(|&t| t == Vec3::ZERO));
    }

    #[test]
    fn allocate_rejects_empty_fields() {
        assert!(matches!(
            Field::<f32>::allocate(0, 4),
            Err(FluidError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn swap_twice_restores_identity() {
        let mut buf = DoubleBuffer::<f32>::allocate(4, 4).unwrap();
        buf.read[(1, 1)] = 1.;
        let read_ptr = buf.read.texels().as_ptr();
        let write_ptr = buf.write.texels().as_ptr();

        buf.swap();
        assert_eq!(buf.read.texels().as_ptr(), write_ptr);
        assert_eq!(buf.write[(1, 1)], 1.);

        buf.swap();
        assert_eq!(buf.read.texels().as_ptr(), read_ptr);
        assert_eq!(buf.write.texels().as_ptr(), write_ptr);
        assert_eq!(buf.read[(1, 1)], 1.);
    }

    #[test]
    fn sampler_matches_texel_centers() {
        let mut field = Field::<f32>::allocate(4, 4).unwrap();
        field.fill_with(|x, y| (x + 4 * y) as f32);
        let s = field.sampler();
        assert_eq!(s.sample(field.cell_uv(2, 1)), 6.);
        // Halfway between (0, 0) and (1, 0)
        assert_eq!(s.sample(Vec2::new(0.25, 0.125)), 0.5);
        // Clamp to edge, no wraparound
        assert_eq!(s.sample(Vec2::new(-1., -1.)), 0.);
        assert_eq!(s.sample(Vec2::new(2., 2.)), 15.);
        assert_eq!(s.fetch(-1, 3), 12.);
    }

    #[test]
    fn attach_returns_unit_and_binds_field() {
        let scalar = Field::<f32>::allocate(2, 2).unwrap();
        let vector = Field::<Vec2>::allocate(3, 3).unwrap();
        let mut bindings = Bindings::new();

        let a = bindings.attach(&scalar, Unit(0));
        let b = bindings.attach(&vector, Unit(1));
        assert_eq!(a, Unit(0));
        assert_eq!(b, Unit(1));
        assert_eq!(bindings.sampler::<Vec2>(b).field().size(), (3, 3));
        assert_eq!(bindings.sampler::<f32>(a).field().size(), (2, 2));
    }

    #[test]
    #[should_panic]
    fn sampler_with_wrong_texel_kind_panics() {
        let scalar = Field::<f32>::allocate(2, 2).unwrap();
        let mut bindings = Bindings::new();
        let unit = bindings.attach(&scalar, Unit(2));
        bindings.sampler::<Vec3>(unit);
    }

    #[test]
    fn peak_finds_largest_texel() {
        let mut field = Field::<Vec2>::allocate(3, 3).unwrap();
        field[(2, 1)] = Vec2::new(3., 4.);
        field[(0, 0)] = Vec2::new(1., 0.);
        assert_eq!(field.peak(), (5., (2, 1)));
    }
}
