//! The pixel-buffer conversion engine: cached (by the image facade), on
//! demand transcoding between any pair of `(layout, element)`
//! representations, always producing a buffer with the same `(width,
//! height)` as the source and never mutating the source.
//!
//! The dispatch table recognises the full cross-product of supported
//! `(source layout, source element) x (target layout, target element)`,
//! with an identity shortcut when both already match:
//!
//! 1. Element-only (same layout, different element): per-element
//!    conversion across all elements.
//! 2. Layout-only (same element "precision", packed<->planar): RGB splits
//!    or interleaves across {R->0, G->1, B->2}; monochrome replicates into
//!    three planes, or collapses three planes by luminance.
//! 3. Combined: element-only followed by layout-only, computed in one pass.
//! 4. Colour->grey is the mono case of (1)/(3): packed RGB -> packed L
//!    uses the luminance formula; packed RGB -> planar L produces three
//!    identical planes of the grey value.

use crate::buffer::{DynBuffer, Packed, Planar};
use crate::element::{luminance, L16, L8, Ls, Rgb, Rgb24, Rgb48, RgbElement, Scalar};
use crate::error::{Error, Result};
use crate::format::{ElementKind, Layout, PixelFormat};
use crate::marshal;

/// Produce a `(layout, element)` representation of `source`.
///
/// The output has the same `(width, height)` as `source`; `source` is
/// never mutated. Fails with `Error::UnsupportedFormat` if the requested
/// pair is not one of the nine recognised `PixelFormat`s.
pub fn convert(source: &DynBuffer, target_layout: Layout, target_element: ElementKind) -> Result<DynBuffer> {
    let target_format = PixelFormat::format_of(target_layout, target_element).ok_or_else(|| {
        log::debug!(
            "convert: unsupported target ({target_layout:?}, {target_element:?}) from {:?}",
            source.format()
        );
        Error::unsupported(format!(
            "no pixel format for layout {target_layout:?} and element {target_element:?}"
        ))
    })?;

    if source.format() == target_format {
        return Ok(marshal::copy(source));
    }

    match (source.layout(), target_layout) {
        (Layout::Packed, Layout::Packed) => Ok(convert_packed_element(source, target_element)),
        (Layout::Planar, Layout::Planar) => Ok(convert_planar_element(source, target_element)),
        (Layout::Packed, Layout::Planar) => Ok(convert_packed_to_planar(source, target_element)),
        (Layout::Planar, Layout::Packed) => Ok(convert_planar_to_packed(source, target_element)),
    }
}

/// A layout-agnostic bag of converted element values, used as the
/// intermediate representation between "convert the elements" and "wrap
/// them back into a pool-backed buffer".
enum ElementBuf {
    L8(Vec<L8>),
    L16(Vec<L16>),
    Ls(Vec<Ls>),
    Rgb24(Vec<Rgb24>),
    Rgb48(Vec<Rgb48>),
    Rgb(Vec<Rgb>),
}

/// Every element kind can be converted, element-by-element, into any of
/// the six kinds: monochrome<->monochrome narrows/widens precision,
/// RGB->RGB re-encodes precision, RGB->mono takes the luminance, and
/// mono->RGB replicates the scalar into all three channels.
trait ConvertElement: Copy {
    fn into_l8(self) -> L8;
    fn into_l16(self) -> L16;
    fn into_ls(self) -> Ls;
    fn into_rgb24(self) -> Rgb24;
    fn into_rgb48(self) -> Rgb48;
    fn into_rgb(self) -> Rgb;
}

macro_rules! impl_convert_element_mono {
    ($ty:ty) => {
        impl ConvertElement for $ty {
            fn into_l8(self) -> L8 {
                self.to_l8()
            }
            fn into_l16(self) -> L16 {
                self.to_l16()
            }
            fn into_ls(self) -> Ls {
                self.to_ls()
            }
            fn into_rgb24(self) -> Rgb24 {
                let v = self.to_l8();
                Rgb24 { r: v.0, g: v.0, b: v.0 }
            }
            fn into_rgb48(self) -> Rgb48 {
                let v = self.to_l16();
                Rgb48 { r: v.0, g: v.0, b: v.0 }
            }
            fn into_rgb(self) -> Rgb {
                let v = self.to_ls();
                Rgb { r: v.0, g: v.0, b: v.0 }
            }
        }
    };
}

impl_convert_element_mono!(L8);
impl_convert_element_mono!(L16);
impl_convert_element_mono!(Ls);

macro_rules! impl_convert_element_rgb {
    ($ty:ty) => {
        impl ConvertElement for $ty {
            fn into_l8(self) -> L8 {
                self.to_grey()
            }
            fn into_l16(self) -> L16 {
                self.to_rgb48().to_grey()
            }
            fn into_ls(self) -> Ls {
                self.to_rgb().to_grey()
            }
            fn into_rgb24(self) -> Rgb24 {
                self.to_rgb24()
            }
            fn into_rgb48(self) -> Rgb48 {
                self.to_rgb48()
            }
            fn into_rgb(self) -> Rgb {
                self.to_rgb()
            }
        }
    };
}

impl_convert_element_rgb!(Rgb24);
impl_convert_element_rgb!(Rgb48);
impl_convert_element_rgb!(Rgb);

fn convert_elements<T: ConvertElement>(elems: &[T], target: ElementKind) -> ElementBuf {
    match target {
        ElementKind::L8 => ElementBuf::L8(elems.iter().map(|e| e.into_l8()).collect()),
        ElementKind::L16 => ElementBuf::L16(elems.iter().map(|e| e.into_l16()).collect()),
        ElementKind::Ls => ElementBuf::Ls(elems.iter().map(|e| e.into_ls()).collect()),
        ElementKind::Rgb24 => ElementBuf::Rgb24(elems.iter().map(|e| e.into_rgb24()).collect()),
        ElementKind::Rgb48 => ElementBuf::Rgb48(elems.iter().map(|e| e.into_rgb48()).collect()),
        ElementKind::Rgb => ElementBuf::Rgb(elems.iter().map(|e| e.into_rgb()).collect()),
    }
}

fn source_packed_elements(source: &DynBuffer, target: ElementKind) -> ElementBuf {
    match source {
        DynBuffer::Mono(p) => convert_elements(p.as_slice(), target),
        DynBuffer::Mono8(p) => convert_elements(p.as_slice(), target),
        DynBuffer::Mono16(p) => convert_elements(p.as_slice(), target),
        DynBuffer::RgbPacked(p) => convert_elements(p.as_slice(), target),
        DynBuffer::Rgb24Packed(p) => convert_elements(p.as_slice(), target),
        DynBuffer::Rgb48Packed(p) => convert_elements(p.as_slice(), target),
        _ => unreachable!("caller guarantees a packed source"),
    }
}

fn element_buf_into_packed(buf: ElementBuf, width: u32, height: u32) -> DynBuffer {
    match buf {
        ElementBuf::L8(v) => DynBuffer::Mono8(Packed::from_slice(width, height, &v).expect("exact length")),
        ElementBuf::L16(v) => DynBuffer::Mono16(Packed::from_slice(width, height, &v).expect("exact length")),
        ElementBuf::Ls(v) => DynBuffer::Mono(Packed::from_slice(width, height, &v).expect("exact length")),
        ElementBuf::Rgb24(v) => {
            DynBuffer::Rgb24Packed(Packed::from_slice(width, height, &v).expect("exact length"))
        }
        ElementBuf::Rgb48(v) => {
            DynBuffer::Rgb48Packed(Packed::from_slice(width, height, &v).expect("exact length"))
        }
        ElementBuf::Rgb(v) => DynBuffer::RgbPacked(Packed::from_slice(width, height, &v).expect("exact length")),
    }
}

fn convert_packed_element(source: &DynBuffer, target: ElementKind) -> DynBuffer {
    let buf = source_packed_elements(source, target);
    element_buf_into_packed(buf, source.width(), source.height())
}

fn convert_planar_element(source: &DynBuffer, target: ElementKind) -> DynBuffer {
    let (width, height) = (source.width(), source.height());
    match source {
        DynBuffer::RgbPlanar(p) => planar_element_convert(p, target, width, height),
        DynBuffer::Rgb888Planar(p) => planar_element_convert(p, target, width, height),
        DynBuffer::Rgb161616Planar(p) => planar_element_convert(p, target, width, height),
        _ => unreachable!("caller guarantees a planar source"),
    }
}

fn planar_element_convert<T: Scalar + ConvertElement>(
    source: &Planar<T>,
    target: ElementKind,
    width: u32,
    height: u32,
) -> DynBuffer {
    match target {
        ElementKind::L8 => {
            let v: Vec<L8> = source.as_slice().iter().map(|e| e.into_l8()).collect();
            DynBuffer::Rgb888Planar(Planar::from_slice(width, height, &v).expect("exact length"))
        }
        ElementKind::L16 => {
            let v: Vec<L16> = source.as_slice().iter().map(|e| e.into_l16()).collect();
            DynBuffer::Rgb161616Planar(Planar::from_slice(width, height, &v).expect("exact length"))
        }
        ElementKind::Ls => {
            let v: Vec<Ls> = source.as_slice().iter().map(|e| e.into_ls()).collect();
            DynBuffer::RgbPlanar(Planar::from_slice(width, height, &v).expect("exact length"))
        }
        ElementKind::Rgb24 | ElementKind::Rgb48 | ElementKind::Rgb => {
            unreachable!("planar-to-planar conversion never targets a compound element")
        }
    }
}

/// The mono element kind a packed RGB kind of the same precision splits
/// into, and vice versa: `Rgb<->Ls`, `Rgb24<->L8`, `Rgb48<->L16`.
fn rgb_precision_mono(target: ElementKind) -> ElementKind {
    match target {
        ElementKind::Rgb24 => ElementKind::L8,
        ElementKind::Rgb48 => ElementKind::L16,
        ElementKind::Rgb => ElementKind::Ls,
        other => other,
    }
}

fn mono_precision_rgb(mono: ElementKind) -> ElementKind {
    match mono {
        ElementKind::L8 => ElementKind::Rgb24,
        ElementKind::L16 => ElementKind::Rgb48,
        ElementKind::Ls => ElementKind::Rgb,
        other => other,
    }
}

fn convert_packed_to_planar(source: &DynBuffer, target: ElementKind) -> DynBuffer {
    let (width, height) = (source.width(), source.height());
    if source.is_color() {
        // Convert to the RGB precision matching the target plane kind, then
        // split the triple across {R->0, G->1, B->2}.
        let rgb_precision = mono_precision_rgb(target);
        let buf = source_packed_elements(source, rgb_precision);
        match buf {
            ElementBuf::Rgb24(v) => split_rgb(v, width, height, |c| {
                DynBuffer::Rgb888Planar(Planar::from_slice(width, height, &c).expect("exact length"))
            }),
            ElementBuf::Rgb48(v) => split_rgb(v, width, height, |c| {
                DynBuffer::Rgb161616Planar(Planar::from_slice(width, height, &c).expect("exact length"))
            }),
            ElementBuf::Rgb(v) => split_rgb(v, width, height, |c| {
                DynBuffer::RgbPlanar(Planar::from_slice(width, height, &c).expect("exact length"))
            }),
            _ => unreachable!("mono_precision_rgb always yields a compound kind"),
        }
    } else {
        // Convert to the target precision, then replicate into 3 planes.
        let buf = source_packed_elements(source, target);
        match buf {
            ElementBuf::L8(v) => replicate_mono(v, width, height, |c| {
                DynBuffer::Rgb888Planar(Planar::from_slice(width, height, &c).expect("exact length"))
            }),
            ElementBuf::L16(v) => replicate_mono(v, width, height, |c| {
                DynBuffer::Rgb161616Planar(Planar::from_slice(width, height, &c).expect("exact length"))
            }),
            ElementBuf::Ls(v) => replicate_mono(v, width, height, |c| {
                DynBuffer::RgbPlanar(Planar::from_slice(width, height, &c).expect("exact length"))
            }),
            _ => unreachable!("target precision for a mono source is always mono"),
        }
    }
}

fn split_rgb<T, R: crate::element::RgbElement<Channel = T>>(
    source: Vec<R>,
    width: u32,
    height: u32,
    wrap: impl Fn(Vec<T>) -> DynBuffer,
) -> DynBuffer
where
    T: Copy,
{
    let plane_len = (width as usize) * (height as usize);
    let mut planes = Vec::with_capacity(plane_len * 3);
    let mut r_plane = Vec::with_capacity(plane_len);
    let mut g_plane = Vec::with_capacity(plane_len);
    let mut b_plane = Vec::with_capacity(plane_len);
    for pixel in source {
        let (r, g, b) = pixel.channels();
        r_plane.push(r);
        g_plane.push(g);
        b_plane.push(b);
    }
    planes.append(&mut r_plane);
    planes.append(&mut g_plane);
    planes.append(&mut b_plane);
    wrap(planes)
}

fn replicate_mono<T: Copy>(source: Vec<T>, _width: u32, _height: u32, wrap: impl Fn(Vec<T>) -> DynBuffer) -> DynBuffer {
    let mut planes = Vec::with_capacity(source.len() * 3);
    planes.extend_from_slice(&source);
    planes.extend_from_slice(&source);
    planes.extend_from_slice(&source);
    wrap(planes)
}

fn convert_planar_to_packed(source: &DynBuffer, target: ElementKind) -> DynBuffer {
    let (width, height) = (source.width(), source.height());
    let is_compound_target = matches!(target, ElementKind::Rgb24 | ElementKind::Rgb48 | ElementKind::Rgb);

    if is_compound_target {
        let mono_precision = rgb_precision_mono(target);
        let converted = convert_planar_element(source, mono_precision);
        interleave_planar(&converted, width, height)
    } else {
        // Collapse the three planes by luminance, in the target precision.
        let converted = convert_planar_element(source, target);
        collapse_planar_luminance(&converted, width, height)
    }
}

fn interleave_planar(source: &DynBuffer, width: u32, height: u32) -> DynBuffer {
    match source {
        DynBuffer::Rgb888Planar(p) => {
            let v: Vec<Rgb24> = interleave(p.as_slice(), width, height, |r, g, b| Rgb24 { r: r.0, g: g.0, b: b.0 });
            DynBuffer::Rgb24Packed(Packed::from_slice(width, height, &v).expect("exact length"))
        }
        DynBuffer::Rgb161616Planar(p) => {
            let v: Vec<Rgb48> = interleave(p.as_slice(), width, height, |r, g, b| Rgb48 { r: r.0, g: g.0, b: b.0 });
            DynBuffer::Rgb48Packed(Packed::from_slice(width, height, &v).expect("exact length"))
        }
        DynBuffer::RgbPlanar(p) => {
            let v: Vec<Rgb> = interleave(p.as_slice(), width, height, |r, g, b| Rgb { r: r.0, g: g.0, b: b.0 });
            DynBuffer::RgbPacked(Packed::from_slice(width, height, &v).expect("exact length"))
        }
        _ => unreachable!("interleave_planar is only called with a planar buffer"),
    }
}

fn interleave<T: Copy, R>(plane_data: &[T], width: u32, height: u32, make: impl Fn(T, T, T) -> R) -> Vec<R> {
    let plane_len = (width as usize) * (height as usize);
    let (r_plane, rest) = plane_data.split_at(plane_len);
    let (g_plane, b_plane) = rest.split_at(plane_len);
    (0..plane_len)
        .map(|i| make(r_plane[i], g_plane[i], b_plane[i]))
        .collect()
}

fn collapse_planar_luminance(source: &DynBuffer, width: u32, height: u32) -> DynBuffer {
    match source {
        DynBuffer::Rgb888Planar(p) => {
            let v = collapse(p.as_slice(), width, height);
            DynBuffer::Mono8(Packed::from_slice(width, height, &v).expect("exact length"))
        }
        DynBuffer::Rgb161616Planar(p) => {
            let v = collapse(p.as_slice(), width, height);
            DynBuffer::Mono16(Packed::from_slice(width, height, &v).expect("exact length"))
        }
        DynBuffer::RgbPlanar(p) => {
            let v = collapse(p.as_slice(), width, height);
            DynBuffer::Mono(Packed::from_slice(width, height, &v).expect("exact length"))
        }
        _ => unreachable!("collapse_planar_luminance is only called with a planar buffer"),
    }
}

fn collapse<T: Scalar>(plane_data: &[T], width: u32, height: u32) -> Vec<T> {
    let plane_len = (width as usize) * (height as usize);
    let (r_plane, rest) = plane_data.split_at(plane_len);
    let (g_plane, b_plane) = rest.split_at(plane_len);
    (0..plane_len)
        .map(|i| luminance(r_plane[i], g_plane[i], b_plane[i]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::L8;

    fn rgb24_2x2() -> DynBuffer {
        DynBuffer::Rgb24Packed(
            Packed::from_slice(
                2,
                2,
                &[
                    Rgb24 { r: 0, g: 0, b: 0 },
                    Rgb24 { r: 1, g: 2, b: 3 },
                    Rgb24 { r: 4, g: 5, b: 6 },
                    Rgb24 { r: 255, g: 255, b: 255 },
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn round_trip_packed_planar_rgb24() {
        let source = rgb24_2x2();
        let planar = convert(&source, Layout::Planar, ElementKind::L8).unwrap();
        match planar {
            DynBuffer::Rgb888Planar(ref p) => {
                assert_eq!(p.channel(0).unwrap(), &[L8(0), L8(1), L8(4), L8(255)]);
                assert_eq!(p.channel(1).unwrap(), &[L8(0), L8(2), L8(5), L8(255)]);
                assert_eq!(p.channel(2).unwrap(), &[L8(0), L8(3), L8(6), L8(255)]);
            }
            _ => panic!("expected Rgb888Planar"),
        }
    }

    #[test]
    fn ls_packed_to_l8_packed() {
        let source = DynBuffer::Mono(
            Packed::from_slice(2, 2, &[Ls(0.0), Ls(0.003_921_569), Ls(0.501_960_8), Ls(1.0)]).unwrap(),
        );
        let converted = convert(&source, Layout::Packed, ElementKind::L8).unwrap();
        match converted {
            DynBuffer::Mono8(ref p) => {
                assert_eq!(p.as_slice(), &[L8(0), L8(1), L8(128), L8(255)]);
            }
            _ => panic!("expected Mono8"),
        }
    }

    #[test]
    fn grayscale_luminance_of_red() {
        let source = DynBuffer::Rgb24Packed(Packed::from_slice(1, 1, &[Rgb24 { r: 255, g: 0, b: 0 }]).unwrap());
        let grey = convert(&source, Layout::Packed, ElementKind::L8).unwrap();
        match grey {
            DynBuffer::Mono8(ref p) => assert_eq!(p.get(0, 0).unwrap(), L8(76)),
            _ => panic!("expected Mono8"),
        }
    }

    #[test]
    fn mono_to_planar_replicates_into_three_identical_planes() {
        let source = DynBuffer::Mono8(Packed::from_slice(1, 1, &[L8(200)]).unwrap());
        let planar = convert(&source, Layout::Planar, ElementKind::L8).unwrap();
        match planar {
            DynBuffer::Rgb888Planar(ref p) => {
                assert_eq!(p.channel(0).unwrap(), &[L8(200)]);
                assert_eq!(p.channel(1).unwrap(), &[L8(200)]);
                assert_eq!(p.channel(2).unwrap(), &[L8(200)]);
            }
            _ => panic!("expected Rgb888Planar"),
        }
    }

    #[test]
    fn identity_conversion_returns_equal_but_distinct_buffer() {
        let source = rgb24_2x2();
        let same = convert(&source, Layout::Packed, ElementKind::Rgb24).unwrap();
        assert_eq!(source, same);
    }

    #[test]
    fn planar_collapse_round_trips_through_luminance() {
        let planar = DynBuffer::Rgb888Planar(
            Planar::from_slice(1, 1, &[L8(255), L8(0), L8(0)]).unwrap(),
        );
        let grey = convert(&planar, Layout::Packed, ElementKind::L8).unwrap();
        match grey {
            DynBuffer::Mono8(ref p) => assert_eq!(p.get(0, 0).unwrap(), L8(76)),
            _ => panic!("expected Mono8"),
        }
    }
}
