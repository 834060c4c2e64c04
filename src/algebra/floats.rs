use num_traits::{Float, FromPrimitive, NumAssign};

/// Scalar type of the solver.
///
/// Every numeric kernel in proxip is generic over a `FloatT` scalar.  The
/// bound list is the minimal set the solver actually leans on:
/// [`Float`](num_traits::Float) and
/// [`NumAssign`](num_traits::NumAssign) for arithmetic,
/// [`FromPrimitive`](num_traits::FromPrimitive) for ingesting tuning
/// constants and integer counts, `Default` for zero-initialized result
/// blocks, the formatting bounds for the verbose iteration log, and `Send`
/// so that independent solver instances may run on distinct threads.
///
/// `f64` is the intended production scalar; `f32` is provided for targets
/// where memory outweighs accuracy.  The tolerance defaults in
/// [`Settings`](crate::solver::Settings) assume `f64` and should be
/// relaxed for `f32` work.
pub trait FloatT:
    Float + NumAssign + FromPrimitive + Default + Send + std::fmt::Debug + std::fmt::LowerExp
{
}

impl FloatT for f32 {}
impl FloatT for f64 {}

/// Conversion of literal constants into the solver scalar type.
///
/// Fixed algorithm constants can be written as plain literals, e.g.
/// `(0.95).lit()`, rather than spelling `T::from_f64(0.95).unwrap()` at
/// every use.  Counts convert the same way, e.g. `total_ineq.lit()` when a
/// complementarity dimension enters an average.
pub trait FloatLiteral<T> {
    fn lit(self) -> T;
}

macro_rules! float_literal_via {
    ($ty:ty, $from:ident) => {
        impl<T: FloatT> FloatLiteral<T> for $ty {
            #[inline]
            fn lit(self) -> T {
                T::$from(self).unwrap()
            }
        }
    };
}
float_literal_via!(f64, from_f64);
float_literal_via!(usize, from_usize);

#[test]
fn test_float_literal() {
    let x: f64 = (0.25).lit();
    assert_eq!(x, 0.25);
    let y: f32 = (0.5).lit();
    assert_eq!(y, 0.5f32);
    let n: f64 = 7usize.lit();
    assert_eq!(n, 7.0);
}
