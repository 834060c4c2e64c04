// All internal math for both solver variants should go through these core
// traits, which are implemented generically for floats of type FloatT.

/// Vector operations on slices of [`FloatT`](crate::algebra::FloatT)
pub trait VectorMath {
    type T;

    /// Copy values from `src` to `self`
    fn copy_from(&mut self, src: &Self) -> &mut Self;

    /// Apply an elementwise operation on a vector.
    fn scalarop(&mut self, op: impl Fn(Self::T) -> Self::T) -> &mut Self;

    /// Apply an elementwise operation to `v` and assign the
    /// results to `self`.
    fn scalarop_from(&mut self, op: impl Fn(Self::T) -> Self::T, v: &Self) -> &mut Self;

    /// set all elements to the same value
    fn set(&mut self, c: Self::T) -> &mut Self;

    /// Elementwise scaling.
    fn scale(&mut self, c: Self::T) -> &mut Self;

    /// Elementwise translation.
    fn translate(&mut self, c: Self::T) -> &mut Self;

    /// Elementwise reciprocal.
    fn recip(&mut self) -> &mut Self;

    /// Elementwise inverse square root.
    fn rsqrt(&mut self) -> &mut Self;

    /// Elementwise negation of entries.
    fn negate(&mut self) -> &mut Self;

    /// Elementwise scaling by another vector. Produces `self[i] = self[i] * y[i]`
    fn hadamard(&mut self, y: &Self) -> &mut Self;

    /// Dot product
    fn dot(&self, y: &Self) -> Self::T;

    /// computes dot(s + α_s·ds, z + α_z·dz) without intermediate allocation
    fn dot_shifted(s: &Self, ds: &Self, α_s: Self::T, z: &Self, dz: &Self, α_z: Self::T)
        -> Self::T;

    /// Sum of elements.
    fn sum(&self) -> Self::T;

    /// Infinity norm
    fn norm_inf(&self) -> Self::T;

    /// Inf-norm of an elementwise scaling of `self` by `v`
    fn norm_inf_scaled(&self, v: &Self) -> Self::T;

    /// Inf-norm of vector difference
    fn norm_inf_diff(&self, b: &Self) -> Self::T;

    /// Minimum value in vector
    fn minimum(&self) -> Self::T;

    /// Mean of absolute values in vector
    fn mean_abs(&self) -> Self::T;

    /// Checks if all elements are finite, i.e. no Infs or NaNs
    fn is_finite(&self) -> bool;

    /// BLAS-like shift and scale in place.  Produces `self = a*x+b*self`
    fn axpby(&mut self, a: Self::T, x: &Self, b: Self::T) -> &mut Self;
}

/// Matrix-vector operations for the two matrix storage kinds.
pub trait MatrixVectorMultiply {
    type T;

    /// BLAS-like general matrix-vector multiply.  Produces `y = a*self*x + b*y`
    fn gemv(&self, y: &mut [Self::T], x: &[Self::T], a: Self::T, b: Self::T);

    /// BLAS-like transposed matrix-vector multiply.  Produces `y = a*selfᵀ*x + b*y`
    fn gemv_t(&self, y: &mut [Self::T], x: &[Self::T], a: Self::T, b: Self::T);

    /// BLAS-like symmetric matrix-vector multiply.  Produces `y = a*self*x + b*y`.
    /// The matrix source data should be triu.
    fn symv_triu(&self, y: &mut [Self::T], x: &[Self::T], a: Self::T, b: Self::T);
}

/// Norm and scaling operations shared by both matrix storage kinds.
pub trait MatrixMath {
    type T;

    /// Elementwise scaling
    fn scale(&mut self, c: Self::T);

    /// Compute columnwise infinity norms and assign the results to `norms`.
    /// In the `no_reset` version, if `norms[i]` is already larger than the
    /// norm of the i-th column then its value is not changed.
    fn col_norms(&self, norms: &mut [Self::T]);

    /// Columnwise infinity norms without reset
    fn col_norms_no_reset(&self, norms: &mut [Self::T]);

    /// Columnwise infinity norms of a symmetric matrix given in triu form
    fn col_norms_sym(&self, norms: &mut [Self::T]);

    /// Columnwise infinity norms of a symmetric triu matrix, without reset
    fn col_norms_sym_no_reset(&self, norms: &mut [Self::T]);

    /// Compute rowwise infinity norms and assign the results to `norms`
    fn row_norms(&self, norms: &mut [Self::T]);

    /// Rowwise infinity norms without reset
    fn row_norms_no_reset(&self, norms: &mut [Self::T]);

    /// Left and right multiply the matrix self by diagonal matrices,
    /// producing `A = Diagonal(l)*A*Diagonal(r)`
    fn lrscale(&mut self, l: &[Self::T], r: &[Self::T]);

    /// Largest absolute entry.
    fn norm_max_abs(&self) -> Self::T;

    /// Quadratic form for a symmetric matrix.  Assumes that the matrix
    /// `M = self` is in upper triangular form, and produces `yᵀ*M*x`
    fn quad_form(&self, y: &[Self::T], x: &[Self::T]) -> Self::T;
}
