//! The image facade: owns a root pixel buffer plus a memoised cache of
//! converted representations, and exposes the user-facing filters built on
//! top of the conversion and resampling engines.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::buffer::{ElementTag, MonoElement, Packed, Planar};
use crate::codec::{self, Config};
use crate::convert;
use crate::element::L8;
use crate::error::{Error, Result};
use crate::format::{ElementKind, Layout, PixelFormat};
use crate::resize::{self, Method, Parallelism};
use crate::DynBuffer;

type CacheKey = (Layout, ElementKind);

/// The quality `save_to_stream`/`save_to_path` use when the caller has no
/// preference of their own, matching the external interface's stated
/// default.
pub const DEFAULT_QUALITY: u8 = 80;

/// An in-memory raster image: a root buffer (the decoder's authoritative
/// output, or whatever the caller constructed it from) plus every
/// converted representation requested so far.
///
/// Equality is structural over `(width, height, format, root)`; the
/// converted cache is derived state and never compared.
pub struct Image {
    root: Mutex<Option<Arc<DynBuffer>>>,
    cache: Mutex<HashMap<CacheKey, Arc<DynBuffer>>>,
}

impl Image {
    /// Build an image from an owned root buffer. The root is inserted into
    /// the cache under its own key immediately (sharing its storage, not a
    /// copy of it), so a later request for the same representation returns
    /// the very same buffer rather than reconverting.
    pub fn new(root: DynBuffer) -> Self {
        let key = (root.layout(), root.element_kind());
        let root = Arc::new(root);
        let mut cache = HashMap::new();
        cache.insert(key, Arc::clone(&root));
        Image {
            root: Mutex::new(Some(root)),
            cache: Mutex::new(cache),
        }
    }

    /// Detect and decode `stream` into a root buffer via `config`'s
    /// registered codecs.
    pub fn load_from_stream<S: Read + Seek>(stream: &mut S, config: &Config) -> Result<Self> {
        let root = codec::decode(stream, config)?;
        Ok(Image::new(root))
    }

    /// As `load_from_stream`, opening `path` as a file first. I/O failures
    /// surface as `Error::IoFailure`.
    pub fn load_from_path<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        let mut file = File::open(path)?;
        Self::load_from_stream(&mut file, config)
    }

    /// Convert to the packed representation `save_target_format` maps the
    /// root's format to, and encode it to `writer` with the first
    /// registered codec reporting support for `encoder_tag` (matched
    /// case-insensitively).
    pub fn save_to_stream<W: Write>(&self, writer: &mut W, encoder_tag: &str, quality: u8, config: &Config) -> Result<()> {
        let root = self.root_buffer()?;
        let target = save_target_format(root.format());
        let (layout, element) = target.decompose();
        let converted = self.get_or_convert(layout, element)?;
        codec::encode(writer, &converted, encoder_tag, quality, config)
    }

    /// As `save_to_stream`, creating `path` as a file and deriving the
    /// encoder tag from its final `.ext` segment (lower-cased, without the
    /// dot). Fails with `Error::UnsupportedFormat` if `path` has no
    /// extension.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P, quality: u8, config: &Config) -> Result<()> {
        let tag = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::unsupported(format!("path {:?} has no file extension", path.as_ref())))?
            .to_lowercase();
        let mut file = File::create(path)?;
        self.save_to_stream(&mut file, &tag, quality, config)
    }

    /// Clone out the root buffer's `Arc`, or fail if the image has already
    /// been released.
    fn root_buffer(&self) -> Result<Arc<DynBuffer>> {
        let guard = self.root.lock().expect("image root mutex poisoned");
        guard.clone().ok_or(Error::Disposed)
    }

    pub fn width(&self) -> Result<u32> {
        Ok(self.root_buffer()?.width())
    }

    pub fn height(&self) -> Result<u32> {
        Ok(self.root_buffer()?.height())
    }

    pub fn size(&self) -> Result<(u32, u32)> {
        Ok(self.root_buffer()?.size())
    }

    pub fn pixel_format(&self) -> Result<PixelFormat> {
        Ok(self.root_buffer()?.format())
    }

    pub fn is_color(&self) -> Result<bool> {
        Ok(self.root_buffer()?.is_color())
    }

    /// Look up (or produce and memoise) the converted buffer for `key`.
    ///
    /// Two racing misses may both run the conversion engine; only the
    /// first insertion into the map is kept, the loser's freshly built
    /// buffer is dropped immediately (its pool-backed storage returns to
    /// the pool via `Drop`), and every caller observes the same stored
    /// `Arc` afterwards: the views `as_packed`/`as_planar` hand out are
    /// clones of that `Arc`, not independent copies, so repeated calls for
    /// the same key are identical, not just equal.
    fn get_or_convert(&self, layout: Layout, element: ElementKind) -> Result<Arc<DynBuffer>> {
        let key = (layout, element);
        {
            let cache = self.cache.lock().expect("image cache mutex poisoned");
            if let Some(buffer) = cache.get(&key) {
                return Ok(Arc::clone(buffer));
            }
        }

        log::trace!("image cache miss for {:?}/{:?}, converting", layout, element);
        let root = self.root_buffer()?;
        let converted = Arc::new(convert::convert(&root, layout, element)?);

        let mut cache = self.cache.lock().expect("image cache mutex poisoned");
        let stored = cache.entry(key).or_insert(converted);
        Ok(Arc::clone(stored))
    }

    /// A read-only view over the packed representation for element kind
    /// `E`. Repeated calls for the same `E` return views over the same
    /// stored buffer (see `PackedView::is_same_buffer`), not merely equal
    /// content.
    pub fn as_packed<E>(&self) -> Result<PackedView<E>>
    where
        E: ElementTag,
    {
        let buffer = self.get_or_convert(Layout::Packed, E::KIND)?;
        Ok(PackedView {
            buffer,
            _marker: PhantomData,
        })
    }

    /// A read-only view over the planar representation for monochrome
    /// element kind `E`. As `as_packed`, identical (not just equal) across
    /// repeated calls.
    pub fn as_planar<E>(&self) -> Result<PlanarView<E>>
    where
        E: MonoElement,
    {
        let buffer = self.get_or_convert(Layout::Planar, E::KIND)?;
        Ok(PlanarView {
            buffer,
            _marker: PhantomData,
        })
    }

    /// Convert to `L8`/`L16`/`Ls` packed (preserving bit depth where
    /// possible) and discard colour, producing a new owned image.
    pub fn grayscale(&self) -> Result<Image> {
        let root = self.root_buffer()?;
        let target_element = grayscale_target(root.element_kind());
        let grey = convert::convert(&root, Layout::Packed, target_element)?;
        Ok(Image::new(grey))
    }

    /// Flip every row left-to-right, producing a new owned image with the
    /// root's own `(layout, element)`.
    pub fn mirror_horizontal(&self) -> Result<Image> {
        let root = self.root_buffer()?;
        Ok(Image::new(mirror(&root, Axis::Horizontal)))
    }

    /// Flip the image top-to-bottom, producing a new owned image.
    pub fn mirror_vertical(&self) -> Result<Image> {
        let root = self.root_buffer()?;
        Ok(Image::new(mirror(&root, Axis::Vertical)))
    }

    /// Threshold the image into black/white, producing a new owned image.
    ///
    /// `mode` selects what is thresholded against `threshold` (in `[0,
    /// 1]`): `BinarizeMode::Luminance` greyscales the image first and
    /// thresholds the grey value; `BinarizeMode::Saturation` thresholds
    /// each pixel's HSV saturation instead, leaving hue and value out of
    /// the decision entirely.
    pub fn binarize(&self, threshold: f32, mode: BinarizeMode) -> Result<Image> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::invalid_argument(format!(
                "binarize threshold must be in [0, 1], got {threshold}"
            )));
        }
        let root = self.root_buffer()?;
        let binarized = match mode {
            BinarizeMode::Luminance => {
                let grey = convert::convert(&root, Layout::Packed, ElementKind::L8)?;
                let cutoff = (threshold * 255.0).round() as u8;
                match grey {
                    DynBuffer::Mono8(p) => {
                        let thresholded: Vec<L8> = p
                            .as_slice()
                            .iter()
                            .map(|&v| if v.0 < cutoff { L8(0) } else { L8(255) })
                            .collect();
                        DynBuffer::Mono8(Packed::from_slice(p.width(), p.height(), &thresholded)?)
                    }
                    _ => unreachable!("L8 packed conversion always yields Mono8"),
                }
            }
            BinarizeMode::Saturation => {
                let rgb = convert::convert(&root, Layout::Packed, ElementKind::Rgb)?;
                match rgb {
                    DynBuffer::RgbPacked(p) => {
                        let thresholded: Vec<L8> = p
                            .as_slice()
                            .iter()
                            .map(|pixel| {
                                let max = pixel.r.max(pixel.g).max(pixel.b);
                                let min = pixel.r.min(pixel.g).min(pixel.b);
                                let saturation = if max <= 0.0 { 0.0 } else { (max - min) / max };
                                if saturation < threshold { L8(0) } else { L8(255) }
                            })
                            .collect();
                        DynBuffer::Mono8(Packed::from_slice(p.width(), p.height(), &thresholded)?)
                    }
                    _ => unreachable!("Rgb packed conversion always yields RgbPacked"),
                }
            }
        };
        Ok(Image::new(binarized))
    }

    /// Resize the root buffer, producing a new owned image with the same
    /// `(layout, element)` as the root.
    pub fn resize(&self, width: u32, height: u32, method: Method) -> Result<Image> {
        let root = self.root_buffer()?;
        let resized = resize::resize(&root, width, height, method, Parallelism::default())?;
        Ok(Image::new(resized))
    }

    /// Release the root buffer and every cached conversion exactly once.
    /// Idempotent: a second call is a no-op, and every subsequent operation
    /// fails with `Error::Disposed`.
    pub fn release(&self) {
        let mut root = self.root.lock().expect("image root mutex poisoned");
        if root.take().is_none() {
            return;
        }
        let mut cache = self.cache.lock().expect("image cache mutex poisoned");
        cache.clear();
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        let a = self.root.lock().expect("image root mutex poisoned");
        let b = other.root.lock().expect("image root mutex poisoned");
        match (a.as_ref(), b.as_ref()) {
            (Some(a), Some(b)) => a.width() == b.width() && a.height() == b.height() && a.format() == b.format() && a == b,
            _ => false,
        }
    }
}

/// Which channel statistic `Image::binarize` thresholds against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinarizeMode {
    /// CCIR 601 luminance of the pixel, as `Image::grayscale` computes it.
    Luminance,
    /// HSV saturation, `(max - min) / max` over the pixel's RGB channels
    /// (`0` if `max` is `0`). Always `0` for an already-monochrome source,
    /// so saturation thresholding binarizes a greyscale image entirely to
    /// black.
    Saturation,
}

/// The packed save format for each of the nine recognised pixel formats,
/// per the external interface's save pixel-format mapping table: 16-bit
/// sources keep their bit depth (`Mono16 -> L16`, `Rgb161616Planar` and
/// `Rgb48Packed -> Rgb48`), every 8-bit or float source collapses to 8-bit
/// packed (`Mono`/`Mono8 -> L8`, every other colour source -> `Rgb24`).
/// `PixelFormat` has exactly nine variants, so this match is exhaustive;
/// there is no "any other format" case to fail with `UnsupportedFormat`.
fn save_target_format(format: PixelFormat) -> PixelFormat {
    match format {
        PixelFormat::Mono | PixelFormat::Mono8 => PixelFormat::Mono8,
        PixelFormat::Mono16 => PixelFormat::Mono16,
        PixelFormat::RgbPacked | PixelFormat::Rgb24Packed | PixelFormat::RgbPlanar | PixelFormat::Rgb888Planar => {
            PixelFormat::Rgb24Packed
        }
        PixelFormat::Rgb48Packed | PixelFormat::Rgb161616Planar => PixelFormat::Rgb48Packed,
    }
}

fn grayscale_target(source: ElementKind) -> ElementKind {
    match source {
        ElementKind::Rgb24 | ElementKind::L8 => ElementKind::L8,
        ElementKind::Rgb48 | ElementKind::L16 => ElementKind::L16,
        ElementKind::Rgb | ElementKind::Ls => ElementKind::Ls,
    }
}

enum Axis {
    Horizontal,
    Vertical,
}

fn mirror(source: &DynBuffer, axis: Axis) -> DynBuffer {
    match source {
        DynBuffer::Mono(p) => DynBuffer::Mono(mirror_packed(p, axis)),
        DynBuffer::Mono8(p) => DynBuffer::Mono8(mirror_packed(p, axis)),
        DynBuffer::Mono16(p) => DynBuffer::Mono16(mirror_packed(p, axis)),
        DynBuffer::RgbPacked(p) => DynBuffer::RgbPacked(mirror_packed(p, axis)),
        DynBuffer::Rgb24Packed(p) => DynBuffer::Rgb24Packed(mirror_packed(p, axis)),
        DynBuffer::Rgb48Packed(p) => DynBuffer::Rgb48Packed(mirror_packed(p, axis)),
        DynBuffer::RgbPlanar(p) => DynBuffer::RgbPlanar(mirror_planar(p, axis)),
        DynBuffer::Rgb888Planar(p) => DynBuffer::Rgb888Planar(mirror_planar(p, axis)),
        DynBuffer::Rgb161616Planar(p) => DynBuffer::Rgb161616Planar(mirror_planar(p, axis)),
    }
}

fn mirror_packed<E: ElementTag>(source: &Packed<E>, axis: Axis) -> Packed<E> {
    let (width, height) = (source.width(), source.height());
    let mut flat = Vec::with_capacity((width as usize) * (height as usize));
    match axis {
        Axis::Horizontal => {
            for y in 0..height {
                let row = source.row(y).expect("row within bounds");
                flat.extend(row.iter().rev().copied());
            }
        }
        Axis::Vertical => {
            for y in (0..height).rev() {
                flat.extend_from_slice(source.row(y).expect("row within bounds"));
            }
        }
    }
    Packed::from_slice(width, height, &flat).expect("flat has exactly width * height elements")
}

fn mirror_planar<E: MonoElement>(source: &Planar<E>, axis: Axis) -> Planar<E> {
    let (width, height) = (source.width(), source.height());
    let mut flat = Vec::with_capacity((width as usize) * (height as usize) * 3);
    for channel in 0..3u32 {
        match axis {
            Axis::Horizontal => {
                for y in 0..height {
                    let row = source.row(channel, y).expect("row within bounds");
                    flat.extend(row.iter().rev().copied());
                }
            }
            Axis::Vertical => {
                for y in (0..height).rev() {
                    flat.extend_from_slice(source.row(channel, y).expect("row within bounds"));
                }
            }
        }
    }
    Planar::from_slice(width, height, &flat).expect("flat has exactly 3 * width * height elements")
}

/// A read-only view over an `Image`'s cached packed representation for
/// element kind `E`, holding a clone of the `Arc` the facade's cache
/// stores. Cheap to clone-construct, never outlives the caller's own
/// borrow of the data it wraps, and `Deref`s to `Packed<E>` for every
/// read-only operation.
pub struct PackedView<E: ElementTag> {
    buffer: Arc<DynBuffer>,
    _marker: PhantomData<E>,
}

impl<E: ElementTag> PackedView<E> {
    /// True only if `self` and `other` wrap the very same stored buffer
    /// (`Arc::ptr_eq`), not merely buffers with equal content.
    pub fn is_same_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl<E: ElementTag> std::ops::Deref for PackedView<E> {
    type Target = Packed<E>;

    fn deref(&self) -> &Packed<E> {
        // The conversion engine guarantees the stored buffer's concrete
        // element kind matches `E::KIND` by construction (the cache key
        // under which it was inserted is always `(Layout::Packed,
        // E::KIND)`); the `Any` downcast turns that runtime guarantee into
        // the static type this view promises, with no unsafe code.
        packed_any(&self.buffer)
            .downcast_ref::<Packed<E>>()
            .unwrap_or_else(|| unreachable!("element kind mismatch between cache key and buffer"))
    }
}

impl<E: ElementTag + PartialEq> PartialEq for PackedView<E> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

/// As `PackedView`, for planar representations of monochrome element kind
/// `E`.
pub struct PlanarView<E: MonoElement> {
    buffer: Arc<DynBuffer>,
    _marker: PhantomData<E>,
}

impl<E: MonoElement> PlanarView<E> {
    /// As `PackedView::is_same_buffer`.
    pub fn is_same_buffer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl<E: MonoElement> std::ops::Deref for PlanarView<E> {
    type Target = Planar<E>;

    fn deref(&self) -> &Planar<E> {
        planar_any(&self.buffer)
            .downcast_ref::<Planar<E>>()
            .unwrap_or_else(|| unreachable!("element kind mismatch between cache key and buffer"))
    }
}

impl<E: MonoElement + PartialEq> PartialEq for PlanarView<E> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

fn packed_any(buffer: &DynBuffer) -> &dyn std::any::Any {
    match buffer {
        DynBuffer::Mono(p) => p as &dyn std::any::Any,
        DynBuffer::Mono8(p) => p as &dyn std::any::Any,
        DynBuffer::Mono16(p) => p as &dyn std::any::Any,
        DynBuffer::RgbPacked(p) => p as &dyn std::any::Any,
        DynBuffer::Rgb24Packed(p) => p as &dyn std::any::Any,
        DynBuffer::Rgb48Packed(p) => p as &dyn std::any::Any,
        _ => unreachable!("packed_any is only reached through PackedView, which always wraps a packed buffer"),
    }
}

fn planar_any(buffer: &DynBuffer) -> &dyn std::any::Any {
    match buffer {
        DynBuffer::RgbPlanar(p) => p as &dyn std::any::Any,
        DynBuffer::Rgb888Planar(p) => p as &dyn std::any::Any,
        DynBuffer::Rgb161616Planar(p) => p as &dyn std::any::Any,
        _ => unreachable!("planar_any is only reached through PlanarView, which always wraps a planar buffer"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Rgb24;

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
    fn as_planar_l8_matches_concrete_scenario() {
        let image = Image::new(rgb24_2x2());
        let planar = image.as_planar::<L8>().unwrap();
        assert_eq!(planar.channel(0).unwrap(), &[L8(0), L8(1), L8(4), L8(255)]);
        assert_eq!(planar.channel(1).unwrap(), &[L8(0), L8(2), L8(5), L8(255)]);
        assert_eq!(planar.channel(2).unwrap(), &[L8(0), L8(3), L8(6), L8(255)]);
    }

    #[test]
    fn repeated_as_packed_calls_return_the_same_stored_buffer() {
        let image = Image::new(rgb24_2x2());
        let first = image.as_packed::<L8>().unwrap();
        let second = image.as_packed::<L8>().unwrap();
        assert_eq!(first, second);
        assert!(first.is_same_buffer(&second));
    }

    #[test]
    fn repeated_as_planar_calls_return_the_same_stored_buffer() {
        let image = Image::new(rgb24_2x2());
        let first = image.as_planar::<L8>().unwrap();
        let second = image.as_planar::<L8>().unwrap();
        assert_eq!(first, second);
        assert!(first.is_same_buffer(&second));
    }

    #[test]
    fn release_then_any_call_fails_with_disposed() {
        let image = Image::new(rgb24_2x2());
        image.release();
        assert!(matches!(image.width(), Err(Error::Disposed)));
        assert!(matches!(image.as_packed::<L8>(), Err(Error::Disposed)));
    }

    #[test]
    fn release_is_idempotent() {
        let image = Image::new(rgb24_2x2());
        image.release();
        image.release();
    }

    #[test]
    fn structural_equality_ignores_converted_cache() {
        let a = Image::new(rgb24_2x2());
        let b = Image::new(rgb24_2x2());
        let _ = a.as_packed::<L8>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn luminance_of_red_grayscales_to_76() {
        let source = DynBuffer::Rgb24Packed(Packed::from_slice(1, 1, &[Rgb24 { r: 255, g: 0, b: 0 }]).unwrap());
        let image = Image::new(source);
        let grey = image.grayscale().unwrap();
        let packed = grey.as_packed::<L8>().unwrap();
        assert_eq!(packed.get(0, 0).unwrap(), L8(76));
    }

    #[test]
    fn mirror_horizontal_reverses_each_row() {
        let source = DynBuffer::Mono8(Packed::from_slice(2, 1, &[L8(1), L8(2)]).unwrap());
        let image = Image::new(source);
        let mirrored = image.mirror_horizontal().unwrap();
        let packed = mirrored.as_packed::<L8>().unwrap();
        assert_eq!(packed.as_slice(), &[L8(2), L8(1)]);
    }

    #[test]
    fn mirror_vertical_reverses_row_order() {
        let source = DynBuffer::Mono8(Packed::from_slice(1, 2, &[L8(1), L8(2)]).unwrap());
        let image = Image::new(source);
        let mirrored = image.mirror_vertical().unwrap();
        let packed = mirrored.as_packed::<L8>().unwrap();
        assert_eq!(packed.as_slice(), &[L8(2), L8(1)]);
    }

    #[test]
    fn binarize_splits_at_threshold() {
        let source = DynBuffer::Mono8(Packed::from_slice(2, 1, &[L8(50), L8(200)]).unwrap());
        let image = Image::new(source);
        let binary = image.binarize(0.5, BinarizeMode::Luminance).unwrap();
        let packed = binary.as_packed::<L8>().unwrap();
        assert_eq!(packed.as_slice(), &[L8(0), L8(255)]);
    }

    #[test]
    fn binarize_rejects_out_of_range_threshold() {
        let image = Image::new(rgb24_2x2());
        assert!(matches!(
            image.binarize(1.5, BinarizeMode::Luminance),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn binarize_by_saturation_ignores_luminance() {
        let source = DynBuffer::RgbPacked(
            Packed::from_slice(
                2,
                1,
                &[crate::element::Rgb { r: 0.5, g: 0.5, b: 0.5 }, crate::element::Rgb { r: 1.0, g: 0.0, b: 0.0 }],
            )
            .unwrap(),
        );
        let image = Image::new(source);
        let binary = image.binarize(0.2, BinarizeMode::Saturation).unwrap();
        let packed = binary.as_packed::<L8>().unwrap();
        assert_eq!(packed.as_slice(), &[L8(0), L8(255)]);
    }

    #[test]
    fn release_returns_root_storage_and_disposes_the_image() {
        let image = Image::new(rgb24_2x2());
        image.release();
        assert!(matches!(image.width(), Err(Error::Disposed)));
        image.release();
    }

    #[test]
    fn load_detects_and_decodes_via_registered_codec() {
        use crate::codec::test_support::{stream_with_header, FixturePngCodec, PNG_HEADER};
        use std::sync::Arc;

        let config = Config::new().with_codec(Arc::new(FixturePngCodec));
        let mut stream = stream_with_header(&PNG_HEADER);
        let image = Image::load_from_stream(&mut stream, &config).unwrap();
        assert_eq!(image.pixel_format().unwrap(), PixelFormat::Mono8);
    }

    #[test]
    fn load_with_no_matching_codec_is_invalid_data() {
        use crate::codec::test_support::{stream_with_header, PNG_HEADER};

        let config = Config::new();
        let mut stream = stream_with_header(&PNG_HEADER);
        assert!(matches!(
            Image::load_from_stream(&mut stream, &config),
            Err(Error::InvalidData { .. })
        ));
    }

    #[test]
    fn save_converts_to_the_mapped_packed_format_before_encoding() {
        use crate::codec::test_support::{FixturePngCodec, PNG_HEADER};
        use std::sync::Arc;

        // RgbPlanar (Ls planar) maps to Rgb24Packed per the save table.
        let source = DynBuffer::RgbPlanar(
            Planar::from_slice(1, 1, &[crate::element::Ls(0.0), crate::element::Ls(0.0), crate::element::Ls(0.0)])
                .unwrap(),
        );
        let image = Image::new(source);
        let config = Config::new().with_codec(Arc::new(FixturePngCodec));
        let mut out = Vec::new();
        image.save_to_stream(&mut out, "png", DEFAULT_QUALITY, &config).unwrap();
        assert_eq!(out, PNG_HEADER);
    }

    #[test]
    fn save_rejects_unregistered_encoder_tag() {
        use crate::codec::test_support::FixturePngCodec;
        use std::sync::Arc;

        let image = Image::new(rgb24_2x2());
        let config = Config::new().with_codec(Arc::new(FixturePngCodec));
        let mut out = Vec::new();
        assert!(matches!(
            image.save_to_stream(&mut out, "bmp", DEFAULT_QUALITY, &config),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn save_target_format_covers_every_pixel_format() {
        for format in [
            PixelFormat::Mono,
            PixelFormat::Mono8,
            PixelFormat::Mono16,
            PixelFormat::RgbPacked,
            PixelFormat::Rgb24Packed,
            PixelFormat::Rgb48Packed,
            PixelFormat::RgbPlanar,
            PixelFormat::Rgb888Planar,
            PixelFormat::Rgb161616Planar,
        ] {
            let target = save_target_format(format);
            assert!(matches!(
                target,
                PixelFormat::Mono8 | PixelFormat::Mono16 | PixelFormat::Rgb24Packed | PixelFormat::Rgb48Packed
            ));
        }
    }
}
