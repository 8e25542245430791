/// Strict weak ordering used to place keys in the tree.
///
/// `less(a, b)` means that `a` sorts before `b`. Two keys for which neither
/// sorts before the other are considered the same key.
pub trait Comparator<K: ?Sized> {
    fn less(&self, lhs: &K, rhs: &K) -> bool;

    #[inline]
    fn equivalent(&self, lhs: &K, rhs: &K) -> bool {
        !self.less(lhs, rhs) && !self.less(rhs, lhs)
    }
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Less;

impl<K> Comparator<K> for Less
where
    K: Ord + ?Sized,
{
    #[inline]
    fn less(&self, lhs: &K, rhs: &K) -> bool {
        lhs < rhs
    }
}

impl<K, F> Comparator<K> for F
where
    K: ?Sized,
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn less(&self, lhs: &K, rhs: &K) -> bool {
        self(lhs, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn less_follows_ord() {
        assert!(Less.less(&1, &2));
        assert!(!Less.less(&2, &1));
        assert!(!Less.less(&2, &2));
        assert!(Less.equivalent(&2, &2));
        assert!(Less.less("abc", "abd"));
    }

    #[test]
    fn closure_comparator() {
        let greater = |a: &i32, b: &i32| a > b;
        assert!(greater.less(&2, &1));
        assert!(!greater.less(&1, &2));

        let case_insensitive =
            |a: &String, b: &String| a.to_lowercase() < b.to_lowercase();
        assert!(case_insensitive.equivalent(&"Key".to_string(), &"kEY".to_string()));
    }
}
