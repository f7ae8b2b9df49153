/// A trait for random sources that pick uniform indices.
///
/// This abstraction allows you to plug in a real random source or a mocked
/// random source in tests. Implementations must return a value in
/// `0..bound`; callers never pass a `bound` of zero.
///
/// # Example
/// ```
/// use uniqal::RandSource;
///
/// struct FirstIndex;
/// impl RandSource for FirstIndex {
///     fn index(&self, _bound: usize) -> usize {
///         0
///     }
/// }
///
/// let rng = FirstIndex;
/// assert_eq!(rng.index(26), 0);
/// ```
pub trait RandSource {
    /// Returns a uniformly distributed index in `0..bound`.
    fn index(&self, bound: usize) -> usize;
}

impl<R: RandSource + ?Sized> RandSource for &R {
    fn index(&self, bound: usize) -> usize {
        (**self).index(bound)
    }
}
