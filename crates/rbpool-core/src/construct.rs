//! Placing values into and tearing them out of storage slots.
//!
//! A slot is `Option<T>`: `None` is unformatted storage, `Some` holds a live
//! value. Teardown is skipped entirely for types without drop glue.

use std::mem::needs_drop;

/// Places `value` into an unformatted slot and returns it.
pub fn construct<T>(slot: &mut Option<T>, value: T) -> &mut T {
    debug_assert!(slot.is_none(), "construct into a formatted slot");
    slot.insert(value)
}

/// Tears down the value in `slot`, leaving it unformatted. Returns true if
/// a value was present.
pub fn destroy<T>(slot: &mut Option<T>) -> bool {
    slot.take().is_some()
}

/// Tears down every value in `slots`, front to back.
///
/// Returns the number of values whose teardown actually ran, which is 0 for
/// types that need no teardown.
pub fn destroy_range<T>(slots: &mut [Option<T>]) -> usize {
    if !needs_drop::<T>() {
        slots.iter_mut().for_each(|slot| *slot = None);
        return 0;
    }
    slots.iter_mut().filter_map(Option::take).map(drop).count()
}
