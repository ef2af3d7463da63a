//! Packed and planar pixel buffers: the 2D (or 3x2D, for planar monochrome
//! channels) containers parameterised by pixel type and layout.
//!
//! Width and height are always positive; the backing block's length is
//! always exactly `width * height * channels`; a buffer's pixel format is a
//! pure function of its layout and element kind. Reading or writing by
//! `(x, y)` requires `0 <= x < width` and `0 <= y < height`.

use bytemuck::{Pod, Zeroable};

use crate::element::{L16, L8, Ls, Rgb, Rgb24, Rgb48};
use crate::error::{Error, Result};
use crate::format::{ElementKind, Layout, PixelFormat};
use crate::pool::Block;

/// Marker trait giving any buffer element kind its `ElementKind` tag.
pub trait ElementTag: Pod + Zeroable + Send + Sync + 'static {
    const KIND: ElementKind;
}

impl ElementTag for L8 {
    const KIND: ElementKind = ElementKind::L8;
}
impl ElementTag for L16 {
    const KIND: ElementKind = ElementKind::L16;
}
impl ElementTag for Ls {
    const KIND: ElementKind = ElementKind::Ls;
}
impl ElementTag for Rgb24 {
    const KIND: ElementKind = ElementKind::Rgb24;
}
impl ElementTag for Rgb48 {
    const KIND: ElementKind = ElementKind::Rgb48;
}
impl ElementTag for Rgb {
    const KIND: ElementKind = ElementKind::Rgb;
}

/// Marker for the three element kinds planar buffers may hold.
pub trait MonoElement: ElementTag {}

impl MonoElement for L8 {}
impl MonoElement for L16 {}
impl MonoElement for Ls {}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_argument(format!(
            "width and height must be positive, got {width}x{height}"
        )));
    }
    Ok(())
}

/// One element per pixel in row-major order; channel count is always 1.
/// The element itself may be a compound RGB value.
pub struct Packed<E: ElementTag> {
    width: u32,
    height: u32,
    block: Block<E>,
}

impl<E: ElementTag> Packed<E> {
    pub fn new_empty(width: u32, height: u32) -> Result<Self> {
        check_dimensions(width, height)?;
        let len = (width as usize) * (height as usize);
        Ok(Packed {
            width,
            height,
            block: Block::rent(len),
        })
    }

    pub fn from_slice(width: u32, height: u32, source: &[E]) -> Result<Self> {
        check_dimensions(width, height)?;
        let expected = (width as usize) * (height as usize);
        if source.len() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                actual: source.len(),
            });
        }
        Ok(Packed {
            width,
            height,
            block: Block::from_slice(source),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(Error::invalid_argument(format!(
                "index ({x}, {y}) out of bounds for {}x{} buffer",
                self.width, self.height
            )));
        }
        Ok((y as usize) * (self.width as usize) + x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Result<E> {
        let index = self.index(x, y)?;
        Ok(self.block.as_slice()[index])
    }

    pub fn set(&mut self, x: u32, y: u32, value: E) -> Result<()> {
        let index = self.index(x, y)?;
        self.block.as_mut_slice()[index] = value;
        Ok(())
    }

    pub fn row(&self, r: u32) -> Result<&[E]> {
        if r >= self.height {
            return Err(Error::invalid_argument(format!(
                "row {r} out of bounds for height {}",
                self.height
            )));
        }
        let start = (r as usize) * (self.width as usize);
        Ok(&self.block.as_slice()[start..start + self.width as usize])
    }

    pub fn row_mut(&mut self, r: u32) -> Result<&mut [E]> {
        if r >= self.height {
            return Err(Error::invalid_argument(format!(
                "row {r} out of bounds for height {}",
                self.height
            )));
        }
        let start = (r as usize) * (self.width as usize);
        let width = self.width as usize;
        Ok(&mut self.block.as_mut_slice()[start..start + width])
    }

    pub fn as_slice(&self) -> &[E] {
        self.block.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [E] {
        self.block.as_mut_slice()
    }

    pub fn release(self) {
        self.block.release()
    }
}

impl<E: ElementTag> Clone for Packed<E> {
    fn clone(&self) -> Self {
        Packed {
            width: self.width,
            height: self.height,
            block: self.block.clone(),
        }
    }
}

impl<E: ElementTag + PartialEq> PartialEq for Packed<E> {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.as_slice() == other.as_slice()
    }
}

/// Three separately-stored channels of a monochrome element, total
/// `3 * width * height` elements. Channel `c` spans
/// `[c * width * height, (c + 1) * width * height)`.
pub struct Planar<E: MonoElement> {
    width: u32,
    height: u32,
    block: Block<E>,
}

impl<E: MonoElement> Planar<E> {
    const CHANNELS: u32 = 3;

    pub fn new_empty(width: u32, height: u32) -> Result<Self> {
        check_dimensions(width, height)?;
        let len = (width as usize) * (height as usize) * Self::CHANNELS as usize;
        Ok(Planar {
            width,
            height,
            block: Block::rent(len),
        })
    }

    pub fn from_slice(width: u32, height: u32, source: &[E]) -> Result<Self> {
        check_dimensions(width, height)?;
        let expected = (width as usize) * (height as usize) * Self::CHANNELS as usize;
        if source.len() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                actual: source.len(),
            });
        }
        Ok(Planar {
            width,
            height,
            block: Block::from_slice(source),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn plane_len(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    fn check_channel(&self, c: u32) -> Result<()> {
        if c >= Self::CHANNELS {
            return Err(Error::invalid_argument(format!(
                "channel {c} out of bounds, planar buffers have {} channels",
                Self::CHANNELS
            )));
        }
        Ok(())
    }

    pub fn channel(&self, c: u32) -> Result<&[E]> {
        self.check_channel(c)?;
        let plane_len = self.plane_len();
        let start = c as usize * plane_len;
        Ok(&self.block.as_slice()[start..start + plane_len])
    }

    pub fn channel_mut(&mut self, c: u32) -> Result<&mut [E]> {
        self.check_channel(c)?;
        let plane_len = self.plane_len();
        let start = c as usize * plane_len;
        Ok(&mut self.block.as_mut_slice()[start..start + plane_len])
    }

    pub fn row(&self, c: u32, r: u32) -> Result<&[E]> {
        if r >= self.height {
            return Err(Error::invalid_argument(format!(
                "row {r} out of bounds for height {}",
                self.height
            )));
        }
        let channel = self.channel(c)?;
        let width = self.width as usize;
        let start = (r as usize) * width;
        Ok(&channel[start..start + width])
    }

    pub fn as_slice(&self) -> &[E] {
        self.block.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [E] {
        self.block.as_mut_slice()
    }

    pub fn release(self) {
        self.block.release()
    }
}

impl<E: MonoElement> Clone for Planar<E> {
    fn clone(&self) -> Self {
        Planar {
            width: self.width,
            height: self.height,
            block: self.block.clone(),
        }
    }
}

impl<E: MonoElement + PartialEq> PartialEq for Planar<E> {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.as_slice() == other.as_slice()
    }
}

/// An opaque, independently-owned pixel buffer, dispatching on its concrete
/// `(layout, element)` pair. This is the type the marshal, conversion
/// engine, and image facade pass around; every variant corresponds to
/// exactly one `PixelFormat`.
#[derive(Clone)]
pub enum DynBuffer {
    Mono(Packed<Ls>),
    Mono8(Packed<L8>),
    Mono16(Packed<L16>),
    RgbPacked(Packed<Rgb>),
    Rgb24Packed(Packed<Rgb24>),
    Rgb48Packed(Packed<Rgb48>),
    RgbPlanar(Planar<Ls>),
    Rgb888Planar(Planar<L8>),
    Rgb161616Planar(Planar<L16>),
}

impl DynBuffer {
    pub fn format(&self) -> PixelFormat {
        match self {
            DynBuffer::Mono(_) => PixelFormat::Mono,
            DynBuffer::Mono8(_) => PixelFormat::Mono8,
            DynBuffer::Mono16(_) => PixelFormat::Mono16,
            DynBuffer::RgbPacked(_) => PixelFormat::RgbPacked,
            DynBuffer::Rgb24Packed(_) => PixelFormat::Rgb24Packed,
            DynBuffer::Rgb48Packed(_) => PixelFormat::Rgb48Packed,
            DynBuffer::RgbPlanar(_) => PixelFormat::RgbPlanar,
            DynBuffer::Rgb888Planar(_) => PixelFormat::Rgb888Planar,
            DynBuffer::Rgb161616Planar(_) => PixelFormat::Rgb161616Planar,
        }
    }

    pub fn layout(&self) -> Layout {
        self.format().decompose().0
    }

    pub fn element_kind(&self) -> ElementKind {
        self.format().decompose().1
    }

    pub fn is_color(&self) -> bool {
        self.format().is_color()
    }

    pub fn width(&self) -> u32 {
        match self {
            DynBuffer::Mono(b) => b.width(),
            DynBuffer::Mono8(b) => b.width(),
            DynBuffer::Mono16(b) => b.width(),
            DynBuffer::RgbPacked(b) => b.width(),
            DynBuffer::Rgb24Packed(b) => b.width(),
            DynBuffer::Rgb48Packed(b) => b.width(),
            DynBuffer::RgbPlanar(b) => b.width(),
            DynBuffer::Rgb888Planar(b) => b.width(),
            DynBuffer::Rgb161616Planar(b) => b.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            DynBuffer::Mono(b) => b.height(),
            DynBuffer::Mono8(b) => b.height(),
            DynBuffer::Mono16(b) => b.height(),
            DynBuffer::RgbPacked(b) => b.height(),
            DynBuffer::Rgb24Packed(b) => b.height(),
            DynBuffer::Rgb48Packed(b) => b.height(),
            DynBuffer::RgbPlanar(b) => b.height(),
            DynBuffer::Rgb888Planar(b) => b.height(),
            DynBuffer::Rgb161616Planar(b) => b.height(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

impl PartialEq for DynBuffer {
    fn eq(&self, other: &Self) -> bool {
        use DynBuffer::*;
        match (self, other) {
            (Mono(a), Mono(b)) => a == b,
            (Mono8(a), Mono8(b)) => a == b,
            (Mono16(a), Mono16(b)) => a == b,
            (RgbPacked(a), RgbPacked(b)) => a == b,
            (Rgb24Packed(a), Rgb24Packed(b)) => a == b,
            (Rgb48Packed(a), Rgb48Packed(b)) => a == b,
            (RgbPlanar(a), RgbPlanar(b)) => a == b,
            (Rgb888Planar(a), Rgb888Planar(b)) => a == b,
            (Rgb161616Planar(a), Rgb161616Planar(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_set_get_round_trip() {
        let mut buffer: Packed<L8> = Packed::new_empty(2, 2).unwrap();
        buffer.set(1, 0, L8(42)).unwrap();
        assert_eq!(buffer.get(1, 0).unwrap(), L8(42));
    }

    #[test]
    fn packed_out_of_range_is_invalid_argument() {
        let buffer: Packed<L8> = Packed::new_empty(2, 2).unwrap();
        assert!(matches!(
            buffer.get(5, 0),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn packed_from_slice_wrong_length_is_shape_mismatch() {
        let source = [L8(1), L8(2), L8(3)];
        assert!(matches!(
            Packed::from_slice(2, 2, &source),
            Err(Error::ShapeMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn packed_row_has_exactly_width_elements() {
        let buffer: Packed<L8> = Packed::from_slice(3, 2, &[L8(1), L8(2), L8(3), L8(4), L8(5), L8(6)]).unwrap();
        assert_eq!(buffer.row(1).unwrap(), &[L8(4), L8(5), L8(6)]);
    }

    #[test]
    fn planar_channel_has_exactly_width_times_height_elements() {
        let data: Vec<L8> = (0..12).map(L8).collect();
        let buffer: Planar<L8> = Planar::from_slice(2, 2, &data).unwrap();
        assert_eq!(buffer.channel(0).unwrap(), &[L8(0), L8(1), L8(2), L8(3)]);
        assert_eq!(buffer.channel(1).unwrap(), &[L8(4), L8(5), L8(6), L8(7)]);
        assert_eq!(buffer.channel(2).unwrap(), &[L8(8), L8(9), L8(10), L8(11)]);
    }

    #[test]
    fn planar_channel_out_of_range_is_invalid_argument() {
        let buffer: Planar<L8> = Planar::new_empty(2, 2).unwrap();
        assert!(matches!(buffer.channel(3), Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn clone_is_independent_of_source() {
        let mut buffer: Packed<L8> = Packed::from_slice(1, 1, &[L8(5)]).unwrap();
        let clone = buffer.clone();
        buffer.set(0, 0, L8(9)).unwrap();
        assert_eq!(clone.get(0, 0).unwrap(), L8(5));
    }

    #[test]
    fn structural_equality() {
        let a: Packed<L8> = Packed::from_slice(2, 1, &[L8(1), L8(2)]).unwrap();
        let b: Packed<L8> = Packed::from_slice(2, 1, &[L8(1), L8(2)]).unwrap();
        let c: Packed<L8> = Packed::from_slice(2, 1, &[L8(1), L8(3)]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn dyn_buffer_cross_variant_is_not_equal() {
        let mono = DynBuffer::Mono8(Packed::from_slice(1, 1, &[L8(1)]).unwrap());
        let planar = DynBuffer::Rgb888Planar(Planar::from_slice(1, 1, &[L8(1), L8(1), L8(1)]).unwrap());
        assert_ne!(mono, planar);
    }
}
