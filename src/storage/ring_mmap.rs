use bytemuck::Pod;
use memmap2::{MmapMut, MmapOptions};
use std::sync::Arc;

/// Anonymous, pre-faulted mapping holding fixed-size slots for a ring.
///
/// Both ends of a ring hold a handle to the same mapping. Slot ownership is decided by the
/// ring's indices; this type only does bounds-checked typed access.
pub(crate) struct RingMmap {
    _mmap: Arc<MmapMut>,
    ptr: *mut u8,
    len: usize,
}

impl RingMmap {
    pub(crate) fn new(total_size: usize) -> Result<Self, std::io::Error> {
        let mut mmap = MmapOptions::new().len(total_size).populate().map_anon()?;
        let ptr = mmap.as_mut_ptr();
        let len = mmap.len();
        Ok(Self {
            _mmap: Arc::new(mmap),
            ptr,
            len,
        })
    }

    #[inline(always)]
    pub(crate) fn read<T: Pod>(&self, offset: usize) -> &T {
        let size = size_of::<T>();
        assert!(
            offset + size <= self.len,
            "Read crosses buffer boundary - alignment issue?"
        );
        // SAFETY: bounds checked above; the mapping outlives `self` through `_mmap`.
        let slice = unsafe { std::slice::from_raw_parts(self.ptr.add(offset), size) };
        bytemuck::from_bytes(slice)
    }

    /// Copies `item` into the slot at `offset`. The caller must own that slot.
    #[inline(always)]
    pub(crate) fn write<T: Pod>(&self, offset: usize, item: &T) {
        let size = size_of::<T>();
        assert!(
            offset + size <= self.len,
            "Write crosses buffer boundary - alignment issue?"
        );
        // SAFETY: bounds checked above, and `item` cannot alias the anonymous mapping.
        unsafe {
            let src = bytemuck::bytes_of(item).as_ptr();
            std::ptr::copy_nonoverlapping(src, self.ptr.add(offset), size);
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn share(&self) -> RingMmap {
        RingMmap {
            _mmap: self._mmap.clone(),
            ptr: self.ptr,
            len: self.len,
        }
    }
}

// SAFETY: the raw pointer targets a mapping kept alive by the shared `Arc<MmapMut>`.
unsafe impl Send for RingMmap {}
