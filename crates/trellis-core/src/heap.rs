/// An array-backed min-heap keyed on a `(primary, secondary)` pair, generic
/// over its payload. The compiler runs two of these: one over elimination
/// clusters during triangulation and one over candidate sepsets during
/// spanning-tree selection.
///
/// Ordering is strict less-than on the key pair; items with equal keys keep
/// their array positions, so extraction order on ties follows insertion
/// order. Payload rescoring does not restore the heap shape by itself;
/// callers sift the touched positions afterwards, the discipline
/// triangulation depends on.
pub struct Heap<P> {
    items: Vec<HeapItem<P>>,
}

pub struct HeapItem<P> {
    pub primary: i64,
    pub secondary: u64,
    pub payload: P,
}

impl<P> HeapItem<P> {
    fn less_than(&self, other: &HeapItem<P>) -> bool {
        self.primary < other.primary
            || (self.primary == other.primary && self.secondary < other.secondary)
    }
}

impl<P> Heap<P> {
    /// Build a heap from scored items in one pass of sift-downs from the
    /// last interior node.
    pub fn new(items: Vec<HeapItem<P>>) -> Self {
        let mut heap = Heap { items };
        let n = heap.items.len();
        for i in (0..n / 2).rev() {
            heap.sift_down(i);
        }
        heap
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pop the minimum item: the last item moves to the root and sifts
    /// down.
    pub fn extract_min(&mut self) -> Option<HeapItem<P>> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let min = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        min
    }

    /// Position of the first item whose payload matches, by linear scan.
    pub fn position_where(&self, mut pred: impl FnMut(&P) -> bool) -> Option<usize> {
        self.items.iter().position(|item| pred(&item.payload))
    }

    /// Rescore the item at `position` in place. The heap shape is NOT
    /// restored; call [sift_down](Heap::sift_down) on the touched positions
    /// once all rescoring is done.
    pub fn rescore(&mut self, position: usize, f: impl FnOnce(&mut P) -> (i64, u64)) {
        let item = &mut self.items[position];
        let (primary, secondary) = f(&mut item.payload);
        item.primary = primary;
        item.secondary = secondary;
    }

    pub fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut min = i;

            if left < self.items.len() && self.items[left].less_than(&self.items[min]) {
                min = left;
            }
            if right < self.items.len() && self.items[right].less_than(&self.items[min]) {
                min = right;
            }
            if min == i {
                break;
            }
            self.items.swap(i, min);
            i = min;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(primary: i64, secondary: u64, tag: char) -> HeapItem<char> {
        HeapItem {
            primary,
            secondary,
            payload: tag,
        }
    }

    fn drain(mut heap: Heap<char>) -> Vec<char> {
        let mut out = Vec::new();
        while let Some(min) = heap.extract_min() {
            out.push(min.payload);
        }
        out
    }

    #[test]
    fn extracts_in_key_order() {
        let heap = Heap::new(vec![
            item(3, 0, 'c'),
            item(1, 0, 'a'),
            item(2, 0, 'b'),
        ]);
        assert_eq!(drain(heap), vec!['a', 'b', 'c']);
    }

    #[test]
    fn secondary_key_breaks_primary_ties() {
        let heap = Heap::new(vec![
            item(1, 9, 'z'),
            item(1, 2, 'a'),
            item(0, 100, 'r'),
        ]);
        assert_eq!(drain(heap), vec!['r', 'a', 'z']);
    }

    #[test]
    fn rescore_then_sift_restores_order() {
        let mut heap = Heap::new(vec![
            item(1, 0, 'a'),
            item(2, 0, 'b'),
            item(3, 0, 'c'),
        ]);
        // growing a cluster raises its keys; the sift-down repairs the root
        let pos = heap.position_where(|&tag| tag == 'a').unwrap();
        heap.rescore(pos, |_| (5, 0));
        heap.sift_down(pos);

        assert_eq!(drain(heap), vec!['b', 'c', 'a']);
    }

    #[test]
    fn empty_heap_yields_nothing() {
        let mut heap: Heap<char> = Heap::new(Vec::new());
        assert!(heap.extract_min().is_none());
        assert!(heap.is_empty());
    }
}
