//! Combine/Remove Algebra
//!
//! Pure functions over ordered sequences. They know nothing about callbacks
//! beyond `PartialEq`, so the delegate types and the invocation store share
//! one implementation.
//!
//! Removal mirrors multicast delegate semantics: the needle is matched as a
//! *contiguous* run and the rightmost (most recently added) occurrence wins.
//! Not finding the needle is not an error; the functions report "unchanged"
//! by returning `None` so callers can skip publishing a new list.

/// Concatenate two sequences, `a` first.
pub fn append<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

/// Start index of the rightmost contiguous occurrence of `needle`.
///
/// An empty needle never matches.
pub fn rfind_run<T: PartialEq>(haystack: &[T], needle: &[T]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&start| haystack[start..start + needle.len()] == *needle)
}

/// Excise the rightmost contiguous occurrence of `needle`.
///
/// Returns `None` when there is nothing to remove, including when `needle`
/// is empty.
pub fn remove_last<T: Clone + PartialEq>(haystack: &[T], needle: &[T]) -> Option<Vec<T>> {
    let start = rfind_run(haystack, needle)?;
    let mut out = Vec::with_capacity(haystack.len() - needle.len());
    out.extend_from_slice(&haystack[..start]);
    out.extend_from_slice(&haystack[start + needle.len()..]);
    Some(out)
}

/// Repeatedly apply [`remove_last`] until nothing changes.
///
/// Returns `None` when the first pass already found nothing.
pub fn remove_all<T: Clone + PartialEq>(haystack: &[T], needle: &[T]) -> Option<Vec<T>> {
    let mut current = remove_last(haystack, needle)?;
    while let Some(next) = remove_last(&current, needle) {
        current = next;
    }
    Some(current)
}
