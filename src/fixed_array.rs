use std::fmt::{Debug, Formatter};
use std::mem::MaybeUninit;
use std::slice;

/// View of an array with a fixed capacity chosen by its backing storage.
///
/// Algorithms take `&dyn FixedArray<T>` so that they work with any [`SizedArray`] capacity.
/// Indexing past [`FixedArray::len`] is a logic error and panics.
pub trait FixedArray<T> {
    fn len(&self) -> usize;
    fn capacity(&self) -> usize;
    fn as_slice(&self) -> &[T];
    fn as_mut_slice(&mut self) -> &mut [T];

    /// Appends `value`, handing it back when the array is full.
    fn push(&mut self, value: T) -> Result<(), T>;
    fn pop(&mut self) -> Option<T>;
    fn truncate(&mut self, len: usize);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    fn clear(&mut self) {
        self.truncate(0);
    }

    fn get(&self, index: usize) -> &T {
        assert!(
            index < self.len(),
            "index {} out of bounds for length {}",
            index,
            self.len()
        );
        &self.as_slice()[index]
    }

    fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Inserts `value` at `index`, shifting later values up.
    fn insert(&mut self, index: usize, value: T) -> Result<(), T> {
        assert!(index <= self.len(), "insert index {} out of bounds", index);
        self.push(value)?;
        self.as_mut_slice()[index..].rotate_right(1);
        Ok(())
    }

    fn remove(&mut self, index: usize) -> T {
        assert!(index < self.len(), "remove index {} out of bounds", index);
        self.as_mut_slice()[index..].rotate_left(1);
        match self.pop() {
            Some(value) => value,
            None => unreachable!(),
        }
    }
}

/// Inline storage for up to `N` values.
pub struct SizedArray<T, const N: usize> {
    items: [MaybeUninit<T>; N],
    len: usize,
}

impl<T, const N: usize> SizedArray<T, N> {
    pub fn new() -> Self {
        Self {
            items: std::array::from_fn(|_| MaybeUninit::uninit()),
            len: 0,
        }
    }

    /// Keeps only the values matching `keep`, preserving their order.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) {
        let mut kept = 0;
        for index in 0..self.len {
            if keep(&self.as_slice()[index]) {
                self.as_mut_slice().swap(kept, index);
                kept += 1;
            }
        }
        self.truncate(kept);
    }
}

impl<T, const N: usize> FixedArray<T> for SizedArray<T, N> {
    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        N
    }

    fn as_slice(&self) -> &[T] {
        // The first `len` items are initialized.
        unsafe { slice::from_raw_parts(self.items.as_ptr() as *const T, self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.items.as_mut_ptr() as *mut T, self.len) }
    }

    fn push(&mut self, value: T) -> Result<(), T> {
        if self.len == N {
            return Err(value);
        }
        self.items[self.len] = MaybeUninit::new(value);
        self.len += 1;
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { self.items[self.len].as_ptr().read() })
    }

    fn truncate(&mut self, len: usize) {
        while self.len > len {
            self.len -= 1;
            unsafe { self.items[self.len].as_mut_ptr().drop_in_place() };
        }
    }
}

impl<T, const N: usize> Drop for SizedArray<T, N> {
    fn drop(&mut self) {
        self.truncate(0);
    }
}

impl<T, const N: usize> Default for SizedArray<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, const N: usize> Clone for SizedArray<T, N> {
    fn clone(&self) -> Self {
        let mut out = Self::new();
        for value in self.as_slice() {
            if out.push(value.clone()).is_err() {
                unreachable!();
            }
        }
        out
    }
}

impl<T: PartialEq, const N: usize> PartialEq for SizedArray<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const N: usize> Eq for SizedArray<T, N> {}

impl<T: Debug, const N: usize> Debug for SizedArray<T, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn push_until_full() {
        let mut array = SizedArray::<u16, 3>::new();
        assert!(array.is_empty());
        assert_eq!(array.push(1), Ok(()));
        assert_eq!(array.push(2), Ok(()));
        assert_eq!(array.push(3), Ok(()));
        assert!(array.is_full());
        assert_eq!(array.push(4), Err(4));
        assert_eq!(array.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn insert_and_remove_keep_order() {
        let mut array = SizedArray::<u8, 4>::new();
        array.push(10).unwrap();
        array.push(30).unwrap();
        array.insert(1, 20).unwrap();
        assert_eq!(array.as_slice(), &[10, 20, 30]);
        assert_eq!(array.remove(0), 10);
        assert_eq!(array.as_slice(), &[20, 30]);
    }

    #[test]
    fn retain_filters_in_place() {
        let mut array = SizedArray::<u8, 8>::new();
        for value in 1..=6 {
            array.push(value).unwrap();
        }
        array.retain(|v| v % 2 == 0);
        assert_eq!(array.as_slice(), &[2, 4, 6]);
    }

    #[test]
    fn view_through_trait_object() {
        fn total(values: &dyn FixedArray<u32>) -> u32 {
            values.iter().sum()
        }
        let mut small = SizedArray::<u32, 2>::new();
        let mut large = SizedArray::<u32, 64>::new();
        small.push(5).unwrap();
        large.push(7).unwrap();
        large.push(8).unwrap();
        assert_eq!(total(&small), 5);
        assert_eq!(total(&large), 15);
        assert_eq!(large.capacity(), 64);
    }

    #[test]
    fn drops_contents() {
        let shared = Rc::new(());
        {
            let mut array = SizedArray::<Rc<()>, 4>::new();
            array.push(shared.clone()).unwrap();
            array.push(shared.clone()).unwrap();
            assert_eq!(Rc::strong_count(&shared), 3);
            array.truncate(1);
            assert_eq!(Rc::strong_count(&shared), 2);
        }
        assert_eq!(Rc::strong_count(&shared), 1);
    }

    #[test]
    #[should_panic]
    fn get_past_len_panics() {
        let mut array = SizedArray::<u8, 4>::new();
        array.push(1).unwrap();
        array.get(1);
    }
}
