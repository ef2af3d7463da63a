//! Pixel element kinds: the scalar and compound value types that occupy a
//! single texel, and the lossy conversions between them.
//!
//! Conversions saturate at the destination range (clamp before narrowing)
//! and never wrap: L8<->L16 by bit-replication/truncation, `Ls`<->L8 by
//! `round(x*255)`/`x/255`, `Ls`<->L16 by `round(x*65535)`/`x/65535`, and
//! Rgb->grey by the CCIR 601 luminance `0.299R + 0.587G + 0.114B` computed
//! in the source element's own precision.

use bytemuck::{Pod, Zeroable};

/// 8-bit unsigned monochrome sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Pod, Zeroable)]
#[repr(transparent)]
pub struct L8(pub u8);

/// 16-bit unsigned monochrome sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Pod, Zeroable)]
#[repr(transparent)]
pub struct L16(pub u16);

/// Normalised float monochrome sample in `[0, 1]`.
///
/// `L` alone collides with the module's other monochrome types when read
/// aloud, so we keep the lower-case suffix to mark it as the "scalar"
/// float variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(transparent)]
pub struct Ls(pub f32);

/// Packed 8-bit-per-channel RGB triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Rgb24 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Packed 16-bit-per-channel RGB triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Rgb48 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

/// Packed float RGB triple, each channel normalised to `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// CCIR 601 luminance weights.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Weighted luminance of three same-kind scalar samples, computed and
/// narrowed in that scalar's own precision. Shared by `RgbElement::to_grey`
/// (compound packed RGB) and the conversion engine's planar-to-mono
/// collapse (three planes treated as R/G/B of the same source pixel).
pub(crate) fn luminance<T: Scalar>(r: T, g: T, b: T) -> T {
    let luma = LUMA_R * r.to_f32() + LUMA_G * g.to_f32() + LUMA_B * b.to_f32();
    T::from_f32_truncate(luma)
}

/// A monochrome scalar element kind.
///
/// Implemented by `L8`, `L16`, `Ls` only. Planar buffers are restricted to
/// these three kinds (see `buffer::Planar`): a planar channel always holds
/// a monochrome element.
pub trait Scalar: Copy + Pod + Zeroable + Send + Sync + 'static {
    /// The maximum representable value, used to clamp resampler output.
    const MAX: f32;

    /// Widen to a normalised `f32` in `[0, MAX]`.
    fn to_f32(self) -> f32;

    /// Narrow from `f32`, clamping to `[0, MAX]` and truncating (never
    /// rounding) per the resampler's numeric contract.
    fn from_f32_truncate(value: f32) -> Self;

    fn to_l8(self) -> L8;
    fn to_l16(self) -> L16;
    fn to_ls(self) -> Ls;
}

impl Scalar for L8 {
    const MAX: f32 = 255.0;

    fn to_f32(self) -> f32 {
        self.0 as f32
    }

    fn from_f32_truncate(value: f32) -> Self {
        L8(value.clamp(0.0, Self::MAX) as u8)
    }

    fn to_l8(self) -> L8 {
        self
    }

    fn to_l16(self) -> L16 {
        // Bit-replication: 0xAB -> 0xABAB.
        L16((self.0 as u16) << 8 | self.0 as u16)
    }

    fn to_ls(self) -> Ls {
        Ls(self.0 as f32 / 255.0)
    }
}

impl Scalar for L16 {
    const MAX: f32 = 65535.0;

    fn to_f32(self) -> f32 {
        self.0 as f32
    }

    fn from_f32_truncate(value: f32) -> Self {
        L16(value.clamp(0.0, Self::MAX) as u16)
    }

    fn to_l8(self) -> L8 {
        // Truncation: keep the high byte.
        L8((self.0 >> 8) as u8)
    }

    fn to_l16(self) -> L16 {
        self
    }

    fn to_ls(self) -> Ls {
        Ls(self.0 as f32 / 65535.0)
    }
}

impl Scalar for Ls {
    const MAX: f32 = 1.0;

    fn to_f32(self) -> f32 {
        self.0
    }

    fn from_f32_truncate(value: f32) -> Self {
        Ls(value.clamp(0.0, Self::MAX))
    }

    fn to_l8(self) -> L8 {
        L8((self.0.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    fn to_l16(self) -> L16 {
        L16((self.0.clamp(0.0, 1.0) * 65535.0).round() as u16)
    }

    fn to_ls(self) -> Ls {
        self
    }
}

/// A compound RGB element kind, implemented by `Rgb24`, `Rgb48`, `Rgb`.
pub trait RgbElement: Copy + Pod + Zeroable + Send + Sync + 'static {
    /// The scalar channel type this kind's grey projection is expressed in.
    type Channel: Scalar;

    fn new(r: Self::Channel, g: Self::Channel, b: Self::Channel) -> Self;
    fn channels(self) -> (Self::Channel, Self::Channel, Self::Channel);

    fn to_rgb24(self) -> Rgb24;
    fn to_rgb48(self) -> Rgb48;
    fn to_rgb(self) -> Rgb;

    /// Luminance computed in this element's own precision.
    fn to_grey(self) -> Self::Channel {
        let (r, g, b) = self.channels();
        luminance(r, g, b)
    }
}

impl RgbElement for Rgb24 {
    type Channel = L8;

    fn new(r: L8, g: L8, b: L8) -> Self {
        Rgb24 { r: r.0, g: g.0, b: b.0 }
    }

    fn channels(self) -> (L8, L8, L8) {
        (L8(self.r), L8(self.g), L8(self.b))
    }

    fn to_rgb24(self) -> Rgb24 {
        self
    }

    fn to_rgb48(self) -> Rgb48 {
        Rgb48 {
            r: L8(self.r).to_l16().0,
            g: L8(self.g).to_l16().0,
            b: L8(self.b).to_l16().0,
        }
    }

    fn to_rgb(self) -> Rgb {
        Rgb {
            r: L8(self.r).to_ls().0,
            g: L8(self.g).to_ls().0,
            b: L8(self.b).to_ls().0,
        }
    }
}

impl RgbElement for Rgb48 {
    type Channel = L16;

    fn new(r: L16, g: L16, b: L16) -> Self {
        Rgb48 { r: r.0, g: g.0, b: b.0 }
    }

    fn channels(self) -> (L16, L16, L16) {
        (L16(self.r), L16(self.g), L16(self.b))
    }

    fn to_rgb24(self) -> Rgb24 {
        Rgb24 {
            r: L16(self.r).to_l8().0,
            g: L16(self.g).to_l8().0,
            b: L16(self.b).to_l8().0,
        }
    }

    fn to_rgb48(self) -> Rgb48 {
        self
    }

    fn to_rgb(self) -> Rgb {
        Rgb {
            r: L16(self.r).to_ls().0,
            g: L16(self.g).to_ls().0,
            b: L16(self.b).to_ls().0,
        }
    }
}

impl RgbElement for Rgb {
    type Channel = Ls;

    fn new(r: Ls, g: Ls, b: Ls) -> Self {
        Rgb { r: r.0, g: g.0, b: b.0 }
    }

    fn channels(self) -> (Ls, Ls, Ls) {
        (Ls(self.r), Ls(self.g), Ls(self.b))
    }

    fn to_rgb24(self) -> Rgb24 {
        Rgb24 {
            r: Ls(self.r).to_l8().0,
            g: Ls(self.g).to_l8().0,
            b: Ls(self.b).to_l8().0,
        }
    }

    fn to_rgb48(self) -> Rgb48 {
        Rgb48 {
            r: Ls(self.r).to_l16().0,
            g: Ls(self.g).to_l16().0,
            b: Ls(self.b).to_l16().0,
        }
    }

    fn to_rgb(self) -> Rgb {
        self
    }
}

/// A texel that the resampling engine can interpolate directly, regardless
/// of whether it is a scalar monochrome sample or a compound RGB value.
///
/// Each implementation is monomorphised per concrete element kind (no
/// dynamic dispatch), satisfying the "specialised per pixel element type"
/// requirement of the resampling engine.
pub trait Texel: Copy + Send + Sync + 'static {
    /// Whether this element kind's bicubic sampler carries the source
    /// design's "no -1" axis quirk (see `resize::sample`): only `Rgb24`
    /// sets this to `true`, mapping destination coordinates through
    /// `x / Wt` / `y / Ht` instead of `x / (Wt-1)` / `y / (Ht-1)`.
    const BICUBIC_DIM_QUIRK: bool = false;

    /// Linear interpolation, `t` in `[0, 1]`.
    fn lerp(a: Self, b: Self, t: f32) -> Self;

    /// Cubic Hermite interpolation through four samples at `t` in `[0, 1]`,
    /// `p1`/`p2` being the enclosing samples and `p0`/`p3` their neighbours.
    fn cubic(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self;
}

/// `H(A,B,C,D,t) = a*t^3 + b*t^2 + c*t + d` with the coefficients from the
/// spec's cubic Hermite (Catmull-Rom) formulation.
#[inline]
fn hermite(a_val: f32, b_val: f32, c_val: f32, d_val: f32, t: f32) -> f32 {
    let a = -a_val / 2.0 + 3.0 * b_val / 2.0 - 3.0 * c_val / 2.0 + d_val / 2.0;
    let b = a_val - 5.0 * b_val / 2.0 + 2.0 * c_val - d_val / 2.0;
    let c = -a_val / 2.0 + c_val / 2.0;
    let d = b_val;
    a * t * t * t + b * t * t + c * t + d
}

macro_rules! impl_texel_scalar {
    ($ty:ty) => {
        impl Texel for $ty {
            fn lerp(a: Self, b: Self, t: f32) -> Self {
                let v = a.to_f32() + (b.to_f32() - a.to_f32()) * t;
                Self::from_f32_truncate(v)
            }

            fn cubic(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
                let v = hermite(p0.to_f32(), p1.to_f32(), p2.to_f32(), p3.to_f32(), t);
                Self::from_f32_truncate(v)
            }
        }
    };
}

impl_texel_scalar!(L8);
impl_texel_scalar!(L16);
impl_texel_scalar!(Ls);

macro_rules! impl_texel_rgb {
    ($ty:ty, $quirk:expr) => {
        impl Texel for $ty {
            const BICUBIC_DIM_QUIRK: bool = $quirk;

            fn lerp(a: Self, b: Self, t: f32) -> Self {
                let (ar, ag, ab) = a.channels();
                let (br, bg, bb) = b.channels();
                Self::new(
                    <$ty as RgbElement>::Channel::lerp(ar, br, t),
                    <$ty as RgbElement>::Channel::lerp(ag, bg, t),
                    <$ty as RgbElement>::Channel::lerp(ab, bb, t),
                )
            }

            fn cubic(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
                let (r0, g0, b0) = p0.channels();
                let (r1, g1, b1) = p1.channels();
                let (r2, g2, b2) = p2.channels();
                let (r3, g3, b3) = p3.channels();
                Self::new(
                    <$ty as RgbElement>::Channel::cubic(r0, r1, r2, r3, t),
                    <$ty as RgbElement>::Channel::cubic(g0, g1, g2, g3, t),
                    <$ty as RgbElement>::Channel::cubic(b0, b1, b2, b3, t),
                )
            }
        }
    };
}

// The packed Rgb24 bicubic kernel alone carries the dimension-vs-dimension
// minus-one axis quirk; every other element kind (including the other two
// RGB precisions) uses `/(dim-1)` on both axes.
impl_texel_rgb!(Rgb24, true);
impl_texel_rgb!(Rgb48, false);
impl_texel_rgb!(Rgb, false);
