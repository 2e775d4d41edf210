/// A simple slab of reusable slots.
///
/// A `Slab` stores values of type `T` in a contiguous vector and returns
/// small indices that are reused after removal. The scheduler keeps its
/// live tasks here, addressed by [`TaskId::index`](crate::runtime::task::TaskId).
pub(crate) struct Slab<T> {
    /// Storage; `None` marks a free slot.
    items: Vec<Option<T>>,

    /// Stack of free indices that can be reused.
    free: Vec<usize>,

    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab.
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Inserts a value and returns its index.
    ///
    /// A previously freed slot is reused when available.
    pub(crate) fn insert(&mut self, value: T) -> usize {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            self.items[index] = Some(value);
            return index;
        }

        self.items.push(Some(value));
        self.items.len() - 1
    }

    /// Returns a reference to the value at `index`, if occupied.
    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index).and_then(Option::as_ref)
    }

    /// Removes and returns the value at `index`, if occupied.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let value = self.items.get_mut(index)?.take()?;

        self.free.push(index);
        self.len -= 1;

        Some(value)
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Removes every value, in index order.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        self.free.clear();
        self.len = 0;

        self.items.drain(..).flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Slab;

    #[test]
    fn insert_and_get() {
        let mut slab = Slab::new();

        let a = slab.insert("a");
        let b = slab.insert("b");

        assert_ne!(a, b);
        assert_eq!(slab.get(a), Some(&"a"));
        assert_eq!(slab.get(b), Some(&"b"));
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn removed_slot_is_reused() {
        let mut slab = Slab::new();

        let a = slab.insert(1);
        let _b = slab.insert(2);

        assert_eq!(slab.remove(a), Some(1));
        assert_eq!(slab.get(a), None);

        let c = slab.insert(3);
        assert_eq!(c, a);
        assert_eq!(slab.get(c), Some(&3));
    }

    #[test]
    fn double_remove_is_none() {
        let mut slab = Slab::new();

        let a = slab.insert(7);
        assert_eq!(slab.remove(a), Some(7));
        assert_eq!(slab.remove(a), None);
        assert_eq!(slab.remove(42), None);
        assert_eq!(slab.len(), 0);
    }

    #[test]
    fn drain_empties_the_slab() {
        let mut slab = Slab::new();

        slab.insert(1);
        let b = slab.insert(2);
        slab.insert(3);
        slab.remove(b);

        assert_eq!(slab.drain(), vec![1, 3]);
        assert_eq!(slab.len(), 0);
        assert_eq!(slab.insert(9), 0);
    }
}
