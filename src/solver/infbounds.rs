use lazy_static::lazy_static;
use std::sync::atomic::{AtomicU64, Ordering};

// f64 atomic built on the bit representation, since std provides
// atomics for integer types only.
pub(crate) struct AtomicF64 {
    storage: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            storage: AtomicU64::new(value.to_bits()),
        }
    }
    pub fn store(&self, value: f64, ordering: Ordering) {
        self.storage.store(value.to_bits(), ordering)
    }
    pub fn load(&self, ordering: Ordering) -> f64 {
        f64::from_bits(self.storage.load(ordering))
    }
}

/// Constant indicating that a box bound is to be treated as infinite.
///
/// Any bound entry `v` with `|v| >= get_infinity()` is dropped from the
/// active bound set at `setup`/`update`.  A custom constant for this
/// threshold can be specified using [`set_infinity`]; it applies at module
/// level.
pub const INFINITY_DEFAULT: f64 = 1e30;

lazy_static! {
    static ref INFINITY: AtomicF64 = AtomicF64::new(INFINITY_DEFAULT);
}

/// Revert the internal infinity bound to its default value [`INFINITY_DEFAULT`].
///
/// See also: [`get_infinity`], [`set_infinity`]
pub fn default_infinity() {
    INFINITY.store(INFINITY_DEFAULT, Ordering::Relaxed);
}
/// Set the internal infinity bound to a new value.
///
/// See also: [`get_infinity`], [`default_infinity`]
pub fn set_infinity(v: f64) {
    INFINITY.store(v, Ordering::Relaxed);
}
/// Get the current value of the internal infinity bound.
///
/// See also: [`set_infinity`], [`default_infinity`]
pub fn get_infinity() -> f64 {
    INFINITY.load(Ordering::Relaxed)
}

#[test]
fn test_infinity_bound() {
    assert_eq!(get_infinity(), INFINITY_DEFAULT);
    set_infinity(1e25);
    assert_eq!(get_infinity(), 1e25);
    default_infinity();
    assert_eq!(get_infinity(), INFINITY_DEFAULT);
}
