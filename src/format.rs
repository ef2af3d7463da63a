//! The `PixelFormat` enum and its bijection with `(Layout, ElementKind)`.

use std::fmt;

/// Packed (interleaved) or planar (per-channel separated) arrangement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layout {
    /// One element per pixel in row-major order; channel count is always 1.
    Packed,
    /// Three separately-stored channels of a monochrome element.
    Planar,
}

/// The scalar or compound value type occupying one texel, independent of
/// layout. This is the cache-key component the conversion engine and image
/// facade dispatch and memoise on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    L8,
    L16,
    Ls,
    Rgb24,
    Rgb48,
    Rgb,
}

/// The flat tag identifying a `(Layout, ElementKind)` pair.
///
/// This is a bijection: each of the nine variants names a distinct pair,
/// and `decompose`/`format_of` are exact inverses of each other over the
/// recognised set. `IsColor` is true for every `Rgb*` variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Packed, `Ls`. Normalised float monochrome.
    Mono,
    /// Packed, `L8`.
    Mono8,
    /// Packed, `L16`.
    Mono16,
    /// Packed, `Rgb`. Normalised float RGB triple.
    RgbPacked,
    /// Packed, `Rgb24`.
    Rgb24Packed,
    /// Packed, `Rgb48`.
    Rgb48Packed,
    /// Planar, `Ls`. Three normalised float planes.
    RgbPlanar,
    /// Planar, `L8`. Three 8-bit planes.
    Rgb888Planar,
    /// Planar, `L16`. Three 16-bit planes.
    Rgb161616Planar,
}

impl PixelFormat {
    /// True for every `Rgb*` variant; false for `Mono`, `Mono8`, `Mono16`.
    pub fn is_color(self) -> bool {
        !matches!(self, PixelFormat::Mono | PixelFormat::Mono8 | PixelFormat::Mono16)
    }

    /// Decompose into the `(layout, element)` pair this format names.
    pub fn decompose(self) -> (Layout, ElementKind) {
        use ElementKind::*;
        use Layout::*;
        match self {
            PixelFormat::Mono => (Packed, Ls),
            PixelFormat::Mono8 => (Packed, L8),
            PixelFormat::Mono16 => (Packed, L16),
            PixelFormat::RgbPacked => (Packed, Rgb),
            PixelFormat::Rgb24Packed => (Packed, Rgb24),
            PixelFormat::Rgb48Packed => (Packed, Rgb48),
            PixelFormat::RgbPlanar => (Planar, Ls),
            PixelFormat::Rgb888Planar => (Planar, L8),
            PixelFormat::Rgb161616Planar => (Planar, L16),
        }
    }

    /// The inverse of `decompose`: recover the tag for a `(layout, element)`
    /// pair, or `None` if the pair is not one of the nine recognised
    /// combinations (e.g. a planar compound RGB element, which the data
    /// model never constructs).
    pub fn format_of(layout: Layout, element: ElementKind) -> Option<PixelFormat> {
        use ElementKind::*;
        use Layout::*;
        Some(match (layout, element) {
            (Packed, Ls) => PixelFormat::Mono,
            (Packed, L8) => PixelFormat::Mono8,
            (Packed, L16) => PixelFormat::Mono16,
            (Packed, Rgb) => PixelFormat::RgbPacked,
            (Packed, Rgb24) => PixelFormat::Rgb24Packed,
            (Packed, Rgb48) => PixelFormat::Rgb48Packed,
            (Planar, Ls) => PixelFormat::RgbPlanar,
            (Planar, L8) => PixelFormat::Rgb888Planar,
            (Planar, L16) => PixelFormat::Rgb161616Planar,
            (Planar, Rgb) | (Planar, Rgb24) | (Planar, Rgb48) => return None,
        })
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PixelFormat; 9] = [
        PixelFormat::Mono,
        PixelFormat::Mono8,
        PixelFormat::Mono16,
        PixelFormat::RgbPacked,
        PixelFormat::Rgb24Packed,
        PixelFormat::Rgb48Packed,
        PixelFormat::RgbPlanar,
        PixelFormat::Rgb888Planar,
        PixelFormat::Rgb161616Planar,
    ];

    #[test]
    fn decompose_then_format_of_is_identity() {
        for format in ALL {
            let (layout, element) = format.decompose();
            assert_eq!(PixelFormat::format_of(layout, element), Some(format));
        }
    }

    #[test]
    fn is_color_matches_naming_convention() {
        assert!(!PixelFormat::Mono.is_color());
        assert!(!PixelFormat::Mono8.is_color());
        assert!(!PixelFormat::Mono16.is_color());
        assert!(PixelFormat::RgbPacked.is_color());
        assert!(PixelFormat::Rgb24Packed.is_color());
        assert!(PixelFormat::Rgb48Packed.is_color());
        assert!(PixelFormat::RgbPlanar.is_color());
        assert!(PixelFormat::Rgb888Planar.is_color());
        assert!(PixelFormat::Rgb161616Planar.is_color());
    }

    #[test]
    fn planar_compound_rgb_is_unsupported() {
        assert_eq!(PixelFormat::format_of(Layout::Planar, ElementKind::Rgb), None);
        assert_eq!(PixelFormat::format_of(Layout::Planar, ElementKind::Rgb24), None);
        assert_eq!(PixelFormat::format_of(Layout::Planar, ElementKind::Rgb48), None);
    }
}
