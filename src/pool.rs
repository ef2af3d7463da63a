//! A process-wide, size-bucketed pool of reusable pixel storage.
//!
//! Blocks are leased by element count, bucketed to the next power of two
//! (with a minimum sized to keep every bucket at least 1 KiB for its
//! element type). The pool holds one coarse lock; concurrent rent/release
//! is safe. Leased content is not zeroed: every element kind is
//! `bytemuck::Pod`, so reusing the bytes of a previous lease is never
//! undefined behaviour, only undefined *content*, and callers that need a
//! blank buffer always write every element before reading it back (via
//! `PixelBuffer::new_empty` construction followed by decode/convert/resize,
//! never a bare read).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Mutex;

use bytemuck::{Pod, Zeroable};
use once_cell::sync::Lazy;

const MIN_BUCKET_BYTES: usize = 1024;

type FreeLists = HashMap<(TypeId, usize), Vec<Box<dyn Any + Send>>>;

static POOL: Lazy<Mutex<FreeLists>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn bucket_elements<T: 'static>(count: usize) -> usize {
    let element_size = std::mem::size_of::<T>().max(1);
    let min_elements = (MIN_BUCKET_BYTES / element_size).max(1);
    count.max(min_elements).next_power_of_two()
}

/// A leased, exact-length, pool-backed block of `T`.
///
/// `len()` is exact for the lifetime of the lease even though the
/// underlying allocation's capacity may be larger (the bucket size).
/// Dropping a `Block` (whether via an explicit `release` or simply letting
/// it go out of scope) returns its storage to the pool's free list for its
/// bucket.
pub struct Block<T: Pod + Zeroable + Send + 'static> {
    data: Vec<T>,
}

impl<T: Pod + Zeroable + Send + 'static> Block<T> {
    /// Lease a block of at least `count` elements from the process pool.
    /// Content is unspecified (not zero-filled).
    pub fn rent(count: usize) -> Self {
        let bucket = bucket_elements::<T>(count);
        let key = (TypeId::of::<T>(), bucket);

        let reused = {
            let mut pool = POOL.lock().expect("pixel pool mutex poisoned");
            pool.get_mut(&key).and_then(Vec::pop)
        };

        let mut data = match reused {
            Some(boxed) => *boxed
                .downcast::<Vec<T>>()
                .expect("pool bucket held a mismatched type"),
            None => {
                log::trace!(
                    "pool miss for {} x{} (bucket {}), allocating fresh",
                    std::any::type_name::<T>(),
                    count,
                    bucket
                );
                Vec::with_capacity(bucket)
            }
        };

        debug_assert!(data.capacity() >= count);
        // SAFETY: `T: Pod` has no invalid bit pattern, and capacity is at
        // least `count` either because we just reserved it or because it
        // came from a bucket whose capacity is >= `bucket_elements(count)`.
        unsafe { data.set_len(count) };
        Block { data }
    }

    /// Build a leased block by copying from a source slice.
    pub fn from_slice(source: &[T]) -> Self {
        let mut block = Self::rent(source.len());
        block.data.copy_from_slice(source);
        block
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Explicitly return this block to the pool. Equivalent to dropping it;
    /// spelled out for callers that want to name the release explicitly.
    pub fn release(self) {
        drop(self)
    }
}

impl<T: Pod + Zeroable + Send + 'static> Clone for Block<T> {
    fn clone(&self) -> Self {
        Self::from_slice(&self.data)
    }
}

impl<T: Pod + Zeroable + Send + 'static> Drop for Block<T> {
    fn drop(&mut self) {
        let bucket = self.data.capacity();
        if bucket == 0 {
            return;
        }
        let mut data = std::mem::take(&mut self.data);
        data.clear();
        let key = (TypeId::of::<T>(), bucket);
        let mut pool = POOL.lock().expect("pixel pool mutex poisoned");
        pool.entry(key).or_default().push(Box::new(data));
    }
}
