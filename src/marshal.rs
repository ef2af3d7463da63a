//! Buffer marshal: deep-copy of an opaque buffer, and the `(layout,
//! element)` <-> `PixelFormat` bijection re-exported from `format` for
//! convenience at this boundary.

pub use crate::format::{ElementKind, Layout, PixelFormat};

use crate::buffer::DynBuffer;

/// Dispatch on the buffer's concrete `(layout, element kind)` and return a
/// fresh, independently-owned clone. Each `DynBuffer` variant wraps a
/// `Packed`/`Planar` buffer whose own `Clone` leases a new block from the
/// pool, so this is exactly `buffer.clone()`, named explicitly as its own
/// function since the dispatch already lives in the enum match inside
/// `Clone`.
pub fn copy(buffer: &DynBuffer) -> DynBuffer {
    buffer.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Packed;
    use crate::element::L8;

    #[test]
    fn copy_produces_independently_owned_clone() {
        let original = DynBuffer::Mono8(Packed::from_slice(1, 1, &[L8(7)]).unwrap());
        let copied = copy(&original);
        assert_eq!(original, copied);
    }
}
