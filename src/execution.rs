//! Ordered fan-out of independent computations.
//!
//! With the `parallel` feature, work items run on the rayon pool; without it (or when the
//! caller passes `parallel = false`) they run in sequence. Results always come back in
//! input order, whatever the completion order was.
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Map `f` over `items`, keeping input order in the output.
pub(crate) fn map_ordered<I, O, F>(items: Vec<I>, parallel: bool, f: F) -> Vec<O>
where
    I: Send,
    O: Send,
    F: Fn(I) -> O + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return items.into_par_iter().map(f).collect();
        }
    }

    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    items.into_iter().map(f).collect()
}

/// Run two independent closures, possibly concurrently.
pub(crate) fn join<A, B, RA, RB>(parallel: bool, a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return rayon::join(a, b);
        }
    }

    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    (a(), b())
}

#[cfg(test)]
mod execution_test {
    use super::*;

    #[test]
    fn test_map_keeps_order() {
        let items: Vec<usize> = (0..64).collect();
        let expected: Vec<usize> = items.iter().map(|i| i * i).collect();
        assert_eq!(map_ordered(items.clone(), true, |i| i * i), expected);
        assert_eq!(map_ordered(items, false, |i| i * i), expected);
    }

    #[test]
    fn test_join() {
        let (a, b) = join(true, || 2 + 2, || "four");
        assert_eq!((a, b), (4, "four"));
    }
}
