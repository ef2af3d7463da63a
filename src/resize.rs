//! The resampling engine: nearest-neighbour, bilinear, and bicubic (Catmull
//! Rom via cubic Hermite) resizers, specialised per pixel element kind and
//! operating row-by-row so that rows can be distributed across a caller
//! supplied maximum of worker threads.

use bytemuck::Zeroable;
use rayon::prelude::*;

use crate::buffer::{DynBuffer, ElementTag, MonoElement, Packed, Planar};
use crate::element::Texel;
use crate::error::{Error, Result};

/// Which kernel to apply when mapping source samples to a destination grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    NearestNeighbour,
    Bilinear,
    Bicubic,
}

/// Row-parallel execution hint. `1` (the default) runs every row on the
/// calling thread; any larger value runs destination rows across up to
/// that many worker threads, joined before `resize_packed`/`resize_planar`
/// return.
#[derive(Clone, Copy, Debug)]
pub struct Parallelism(pub usize);

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism(1)
    }
}

fn check_target_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_argument(format!(
            "target dimensions must be positive, got {width}x{height}"
        )));
    }
    Ok(())
}

/// Run `body(row_index, row_slice)` over every row-chunk of `data` (each of
/// length `width`), sequentially if `parallelism.0 <= 1`, otherwise across a
/// dedicated thread pool capped at `parallelism.0` workers.
fn for_each_row_mut<T, F>(data: &mut [T], width: usize, parallelism: Parallelism, body: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    if parallelism.0 <= 1 {
        for (y, row) in data.chunks_mut(width).enumerate() {
            body(y, row);
        }
        return;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism.0)
        .build()
        .expect("building a thread pool with a positive thread count cannot fail");
    pool.install(|| {
        data.par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| body(y, row));
    });
}

/// Resize a packed buffer to `(target_width, target_height)` using `method`.
pub fn resize_packed<E>(
    source: &Packed<E>,
    target_width: u32,
    target_height: u32,
    method: Method,
    parallelism: Parallelism,
) -> Result<Packed<E>>
where
    E: ElementTag + Texel,
{
    check_target_dimensions(target_width, target_height)?;
    let (src_w, src_h) = (source.width(), source.height());
    let mut target = Packed::<E>::new_empty(target_width, target_height)?;

    for_each_row_mut(target.as_mut_slice(), target_width as usize, parallelism, |y, row| {
        for (x, slot) in row.iter_mut().enumerate() {
            *slot = sample(
                |sx, sy| source.get(sx, sy).expect("clamped coordinate is in bounds"),
                src_w,
                src_h,
                x as u32,
                y as u32,
                target_width,
                target_height,
                method,
            );
        }
    });

    Ok(target)
}

/// Resize a planar buffer channel-by-channel using the scalar kernel for
/// `E`.
pub fn resize_planar<E>(
    source: &Planar<E>,
    target_width: u32,
    target_height: u32,
    method: Method,
    parallelism: Parallelism,
) -> Result<Planar<E>>
where
    E: MonoElement + Texel,
{
    check_target_dimensions(target_width, target_height)?;
    let (src_w, src_h) = (source.width(), source.height());
    let mut target = Planar::<E>::new_empty(target_width, target_height)?;
    let plane_len = (target_width as usize) * (target_height as usize);

    for channel in 0..3u32 {
        let source_channel = source.channel(channel).expect("channel 0..3 always valid");
        let mut resized_channel: Vec<E> = vec![E::zeroed(); plane_len];

        for_each_row_mut(&mut resized_channel, target_width as usize, parallelism, |y, row| {
            for (x, slot) in row.iter_mut().enumerate() {
                *slot = sample(
                    |sx, sy| source_channel[(sy as usize) * (src_w as usize) + sx as usize],
                    src_w,
                    src_h,
                    x as u32,
                    y as u32,
                    target_width,
                    target_height,
                    method,
                );
            }
        });

        target
            .channel_mut(channel)
            .expect("channel 0..3 always valid")
            .copy_from_slice(&resized_channel);
    }

    Ok(target)
}

/// Resize an opaque buffer, dispatching on its concrete `(layout, element)`
/// pair. The result keeps the source's layout and element kind; only the
/// dimensions change.
pub fn resize(
    source: &DynBuffer,
    target_width: u32,
    target_height: u32,
    method: Method,
    parallelism: Parallelism,
) -> Result<DynBuffer> {
    match source {
        DynBuffer::Mono(p) => Ok(DynBuffer::Mono(resize_packed(p, target_width, target_height, method, parallelism)?)),
        DynBuffer::Mono8(p) => Ok(DynBuffer::Mono8(resize_packed(p, target_width, target_height, method, parallelism)?)),
        DynBuffer::Mono16(p) => Ok(DynBuffer::Mono16(resize_packed(p, target_width, target_height, method, parallelism)?)),
        DynBuffer::RgbPacked(p) => Ok(DynBuffer::RgbPacked(resize_packed(p, target_width, target_height, method, parallelism)?)),
        DynBuffer::Rgb24Packed(p) => {
            Ok(DynBuffer::Rgb24Packed(resize_packed(p, target_width, target_height, method, parallelism)?))
        }
        DynBuffer::Rgb48Packed(p) => {
            Ok(DynBuffer::Rgb48Packed(resize_packed(p, target_width, target_height, method, parallelism)?))
        }
        DynBuffer::RgbPlanar(p) => Ok(DynBuffer::RgbPlanar(resize_planar(p, target_width, target_height, method, parallelism)?)),
        DynBuffer::Rgb888Planar(p) => {
            Ok(DynBuffer::Rgb888Planar(resize_planar(p, target_width, target_height, method, parallelism)?))
        }
        DynBuffer::Rgb161616Planar(p) => {
            Ok(DynBuffer::Rgb161616Planar(resize_planar(p, target_width, target_height, method, parallelism)?))
        }
    }
}

/// Clamp a coordinate to `[0, dim - 1]`; `dim` is always positive here.
fn clamp_coord(v: i64, dim: u32) -> u32 {
    v.clamp(0, dim as i64 - 1) as u32
}

#[allow(clippy::too_many_arguments)]
fn sample<T: Texel>(
    get: impl Fn(u32, u32) -> T,
    src_w: u32,
    src_h: u32,
    x: u32,
    y: u32,
    target_w: u32,
    target_h: u32,
    method: Method,
) -> T {
    match method {
        Method::NearestNeighbour => {
            let sx = (x as u64 * src_w as u64 / target_w as u64) as u32;
            let sy = (y as u64 * src_h as u64 / target_h as u64) as u32;
            get(sx.min(src_w - 1), sy.min(src_h - 1))
        }
        Method::Bilinear => {
            let gx = x as f32 * (src_w as f32 - 1.0) / target_w as f32;
            let gy = y as f32 * (src_h as f32 - 1.0) / target_h as f32;
            let x0 = gx.floor();
            let y0 = gy.floor();
            let fx = gx - x0;
            let fy = gy - y0;

            let x0i = clamp_coord(x0 as i64, src_w);
            let y0i = clamp_coord(y0 as i64, src_h);
            let x1i = clamp_coord(x0 as i64 + 1, src_w);
            let y1i = clamp_coord(y0 as i64 + 1, src_h);

            let c00 = get(x0i, y0i);
            let c10 = get(x1i, y0i);
            let c01 = get(x0i, y1i);
            let c11 = get(x1i, y1i);

            let top = T::lerp(c00, c10, fx);
            let bottom = T::lerp(c01, c11, fx);
            T::lerp(top, bottom, fy)
        }
        Method::Bicubic => {
            // The packed Rgb24 kernel divides by the target dimension, not
            // dimension minus one, on both axes, while every other element
            // kind's kernel divides by dimension minus one (see
            // `Texel::BICUBIC_DIM_QUIRK`).
            let (u, v) = if T::BICUBIC_DIM_QUIRK {
                (x as f32 / target_w as f32, y as f32 / target_h as f32)
            } else {
                (
                    x as f32 / (target_w as f32 - 1.0).max(1.0),
                    y as f32 / (target_h as f32 - 1.0).max(1.0),
                )
            };
            let xf_src = u * src_w as f32 - 0.5;
            let yf_src = v * src_h as f32 - 0.5;
            let xi = xf_src.floor();
            let yi = yf_src.floor();
            let xf = xf_src - xi;
            let yf = yf_src - yi;

            let mut columns = [get(0, 0); 4];
            for (i, dx) in [-1i64, 0, 1, 2].into_iter().enumerate() {
                let sx = clamp_coord(xi as i64 + dx, src_w);
                let p0 = get(sx, clamp_coord(yi as i64 - 1, src_h));
                let p1 = get(sx, clamp_coord(yi as i64, src_h));
                let p2 = get(sx, clamp_coord(yi as i64 + 1, src_h));
                let p3 = get(sx, clamp_coord(yi as i64 + 2, src_h));
                columns[i] = T::cubic(p0, p1, p2, p3, yf);
            }
            T::cubic(columns[0], columns[1], columns[2], columns[3], xf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{L8, Ls, Rgb24};

    #[test]
    fn nearest_neighbour_identity_resize_is_unchanged() {
        let source = Packed::<L8>::from_slice(2, 2, &[L8(10), L8(20), L8(30), L8(40)]).unwrap();
        let resized = resize_packed(&source, 2, 2, Method::NearestNeighbour, Parallelism::default()).unwrap();
        assert_eq!(resized, source);
    }

    #[test]
    fn bilinear_downscale_of_constant_image_is_constant() {
        let source = Packed::<L8>::from_slice(4, 4, &[L8(128); 16]).unwrap();
        let resized = resize_packed(&source, 2, 2, Method::Bilinear, Parallelism::default()).unwrap();
        assert!(resized.as_slice().iter().all(|&v| v == L8(128)));
    }

    #[test]
    fn bicubic_of_constant_image_is_constant_within_clamp() {
        let source = Packed::<Ls>::from_slice(4, 4, &[Ls(0.5); 16]).unwrap();
        let resized = resize_packed(&source, 3, 3, Method::Bicubic, Parallelism::default()).unwrap();
        for v in resized.as_slice() {
            assert!((v.0 - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn output_dimensions_always_match_target() {
        let source = Packed::<Rgb24>::new_empty(5, 7).unwrap();
        let resized = resize_packed(&source, 13, 2, Method::Bilinear, Parallelism::default()).unwrap();
        assert_eq!((resized.width(), resized.height()), (13, 2));
    }

    #[test]
    fn zero_target_dimension_is_invalid_argument() {
        let source = Packed::<L8>::new_empty(2, 2).unwrap();
        assert!(matches!(
            resize_packed(&source, 0, 2, Method::NearestNeighbour, Parallelism::default()),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn planar_resize_produces_target_dimensions() {
        let data: Vec<L8> = (0..12u8).map(L8).collect();
        let source = Planar::<L8>::from_slice(2, 2, &data).unwrap();
        let resized = resize_planar(&source, 4, 4, Method::NearestNeighbour, Parallelism::default()).unwrap();
        assert_eq!(resized.width(), 4);
        assert_eq!(resized.height(), 4);
    }

    #[test]
    fn dyn_buffer_resize_preserves_format() {
        let source = DynBuffer::Mono8(Packed::from_slice(2, 2, &[L8(1), L8(2), L8(3), L8(4)]).unwrap());
        let resized = resize(&source, 4, 4, Method::NearestNeighbour, Parallelism::default()).unwrap();
        assert_eq!(resized.format(), source.format());
        assert_eq!((resized.width(), resized.height()), (4, 4));
    }

    #[test]
    fn multi_threaded_and_single_threaded_resize_agree() {
        let source = Packed::<L8>::from_slice(4, 4, &(0..16u8).map(L8).collect::<Vec<_>>()).unwrap();
        let single = resize_packed(&source, 8, 8, Method::Bicubic, Parallelism(1)).unwrap();
        let multi = resize_packed(&source, 8, 8, Method::Bicubic, Parallelism(4)).unwrap();
        assert_eq!(single, multi);
    }
}
