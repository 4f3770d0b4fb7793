//! アライン済みヒープバッファ
//!
//! mapping テーブルやパディング付きグリッドのような大きな固定長配列を、
//! `ALIGNMENT` 境界に揃えて一度だけ確保する。確保後にサイズは変えない。

use std::alloc::{self, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use super::constants::ALIGNMENT;

/// ゼロ埋めが有効な値となる型
///
/// # Safety
///
/// 全ビット 0 のバイト列がその型の有効な値でなければならない。
pub unsafe trait ZeroInit: Copy {}

unsafe impl ZeroInit for i8 {}
unsafe impl ZeroInit for i16 {}
unsafe impl ZeroInit for i32 {}
unsafe impl ZeroInit for u32 {}
unsafe impl ZeroInit for f32 {}
unsafe impl<T: ZeroInit, const N: usize> ZeroInit for [T; N] {}

/// `ALIGNMENT` バイト境界に揃えた固定長スライス
pub struct AlignedBox<T: ZeroInit> {
    ptr: NonNull<T>,
    len: usize,
}

impl<T: ZeroInit> AlignedBox<T> {
    fn layout(len: usize) -> Layout {
        let align = ALIGNMENT.max(std::mem::align_of::<T>());
        let size = (std::mem::size_of::<T>() * len).max(1);
        Layout::from_size_align(size, align).expect("AlignedBox layout overflow")
    }

    /// ゼロ初期化で確保
    pub fn new_zeroed(len: usize) -> Self {
        let layout = Self::layout(len);
        // SAFETY: layout のサイズは 1 以上。T は ZeroInit なのでゼロ埋めで有効な値になる。
        let raw = unsafe { alloc::alloc_zeroed(layout) } as *mut T;
        let ptr = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        Self { ptr, len }
    }
}

impl<T: ZeroInit> Deref for AlignedBox<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        // SAFETY: ptr は len 要素分確保済みで、ゼロ初期化または書き込み済み。
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: ZeroInit> DerefMut for AlignedBox<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: &mut self により排他アクセスが保証されている。
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: ZeroInit> Clone for AlignedBox<T> {
    fn clone(&self) -> Self {
        let mut other = Self::new_zeroed(self.len);
        other.copy_from_slice(self);
        other
    }
}

impl<T: ZeroInit + PartialEq> PartialEq for AlignedBox<T> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: ZeroInit> Drop for AlignedBox<T> {
    fn drop(&mut self) {
        // SAFETY: new_zeroed と同じ layout で確保したポインタを解放する。
        unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, Self::layout(self.len)) }
    }
}

// SAFETY: AlignedBox は Box<[T]> と同様に中身を排他所有する。
unsafe impl<T: ZeroInit + Send> Send for AlignedBox<T> {}
unsafe impl<T: ZeroInit + Sync> Sync for AlignedBox<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_box_alignment() {
        let buf = AlignedBox::<[i16; 96]>::new_zeroed(17);
        assert_eq!(buf.as_ptr() as usize % ALIGNMENT, 0);
        assert_eq!(buf.len(), 17);
        assert!(buf.iter().all(|row| row.iter().all(|&v| v == 0)));
    }

    #[test]
    fn test_aligned_box_clone_is_deep() {
        let mut a = AlignedBox::<i32>::new_zeroed(8);
        a[3] = 42;
        let b = a.clone();
        a[3] = 7;
        assert_eq!(b[3], 42);
        assert_ne!(a.as_ptr(), b.as_ptr());
    }
}
