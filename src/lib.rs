//! ImageTorque: an in-memory raster image library.
//!
//! The crate is organised in dependency order, leaves first:
//!
//! - [`element`]: the scalar/compound pixel element kinds and their
//!   lossy, saturating conversions.
//! - [`pool`]: a process-wide, size-bucketed pool of reusable backing
//!   storage for pixel arrays.
//! - [`buffer`]: packed and planar pixel buffers, parameterised by
//!   element kind, plus the opaque [`buffer::DynBuffer`] enum.
//! - [`format`]: the flat [`format::PixelFormat`] tag and its bijection
//!   with `(Layout, ElementKind)`.
//! - [`marshal`]: deep-copy of an opaque buffer.
//! - [`convert`]: the conversion engine, on-demand transcoding between
//!   any pair of `(layout, element)` representations.
//! - [`resize`]: the resampling engine, nearest-neighbour, bilinear, and
//!   bicubic kernels, specialised per element kind.
//! - [`codec`]: the codec boundary, the `Codec` trait and header-sniff
//!   dispatch, consumed but not implemented here.
//! - [`image`]: the image facade tying the above together, exposed at
//!   the crate root as [`Image`].
//! - [`error`]: the shared error taxonomy.
//!
//! Codec implementations (PNG/BMP/JPEG parsers and writers) are external
//! collaborators; this crate only specifies the interface they plug into.

pub mod buffer;
pub mod codec;
pub mod convert;
pub mod element;
pub mod error;
pub mod format;
pub mod image;
pub mod marshal;
pub mod pool;
pub mod resize;

pub use buffer::DynBuffer;
pub use codec::{Codec, Config as CodecConfig};
pub use error::{Error, Result};
pub use format::{ElementKind, Layout, PixelFormat};
pub use image::{BinarizeMode, Image, PackedView, PlanarView};
pub use resize::{Method, Parallelism};
