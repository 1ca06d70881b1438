use crate::component::ComponentInfo;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::{self, NonNull};

/// A type-erased column: one contiguous buffer of fixed-size elements.
///
/// A row tracks neither length nor capacity; the owning archetype drives
/// every call from its shared slot bookkeeping so that all rows of one
/// archetype stay in lockstep.
pub(crate) struct Row {
    buf: NonNull<u8>,
    info: ComponentInfo,
}

impl Row {
    pub fn new(info: ComponentInfo) -> Self {
        Row {
            buf: dangling(info.align),
            info,
        }
    }

    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn layout_for(&self, capacity: usize) -> Layout {
        // The element size is a multiple of the alignment, so the buffer
        // size cannot require padding; only overflow can fail here.
        Layout::from_size_align(self.info.size * capacity, self.info.align)
            .expect("row capacity overflow")
    }

    /// Returns a pointer to the element cell at `slot`.
    ///
    /// Safety: `slot` must be within the capacity the buffer was last
    /// allocated with. Whether the cell holds a live value is up to the
    /// caller's bookkeeping.
    pub unsafe fn ptr_at(&self, slot: usize) -> *mut u8 {
        self.buf.as_ptr().add(slot * self.info.size)
    }

    /// Reallocates the buffer from `old_capacity` to `new_capacity`
    /// elements, relocating the first `len` live elements and freeing the
    /// old buffer. A bitwise move leaves the old cells uninitialized, so
    /// there is nothing to destruct behind it.
    pub fn set_capacity(&mut self, old_capacity: usize, new_capacity: usize, len: usize) {
        debug_assert!(len <= old_capacity && len <= new_capacity);

        if self.info.size == 0 || old_capacity == new_capacity {
            return;
        }

        let new_buf = if new_capacity == 0 {
            dangling(self.info.align)
        } else {
            let layout = self.layout_for(new_capacity);
            // Safety: `layout` has non-zero size here.
            let ptr = unsafe { alloc(layout) };
            match NonNull::new(ptr) {
                Some(ptr) => ptr,
                None => handle_alloc_error(layout),
            }
        };

        unsafe {
            ptr::copy_nonoverlapping(self.buf.as_ptr(), new_buf.as_ptr(), len * self.info.size);
            if old_capacity != 0 {
                dealloc(self.buf.as_ptr(), self.layout_for(old_capacity));
            }
        }

        self.buf = new_buf;
    }

    /// Relocates the element at `src` into the cell at `dst`.
    ///
    /// Safety: `src` must hold a live value, `dst` must be uninitialized,
    /// and both must be distinct slots within capacity.
    pub unsafe fn relocate(&mut self, src: usize, dst: usize) {
        (self.info.move_fn)(self.ptr_at(src), self.ptr_at(dst));
    }

    /// Destroys the element at `slot` in place.
    ///
    /// Safety: `slot` must hold a live value; it is uninitialized afterwards.
    pub unsafe fn drop_at(&mut self, slot: usize) {
        if self.info.needs_drop {
            (self.info.drop_fn)(self.ptr_at(slot));
        }
    }

    /// Frees the buffer.
    ///
    /// Safety: `capacity` must be the value the buffer was last allocated
    /// with, and every element must already be destructed or moved out.
    pub unsafe fn release(&mut self, capacity: usize) {
        if capacity != 0 && self.info.size != 0 {
            dealloc(self.buf.as_ptr(), self.layout_for(capacity));
            self.buf = dangling(self.info.align);
        }
    }
}

/// An aligned, never-dereferenced placeholder for empty buffers.
fn dangling(align: usize) -> NonNull<u8> {
    // Safety: alignments are non-zero powers of two.
    unsafe { NonNull::new_unchecked(align as *mut u8) }
}
