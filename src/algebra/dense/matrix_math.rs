use crate::algebra::*;

impl<T: FloatT> MatrixVectorMultiply for Matrix<T> {
    type T = T;

    fn gemv(&self, y: &mut [T], x: &[T], a: T, b: T) {
        assert_eq!(x.len(), self.n);
        assert_eq!(y.len(), self.m);

        y.scale(b);
        for (j, &xj) in x.iter().enumerate() {
            let col = self.col_slice(j);
            for (yi, &Aij) in y.iter_mut().zip(col) {
                *yi += a * Aij * xj;
            }
        }
    }

    fn gemv_t(&self, y: &mut [T], x: &[T], a: T, b: T) {
        assert_eq!(x.len(), self.m);
        assert_eq!(y.len(), self.n);

        y.scale(b);
        for (j, yj) in y.iter_mut().enumerate() {
            let col = self.col_slice(j);
            *yj += a * col.dot(x);
        }
    }

    fn symv_triu(&self, y: &mut [T], x: &[T], a: T, b: T) {
        assert!(self.is_square());
        assert_eq!(x.len(), self.n);
        assert_eq!(y.len(), self.n);

        y.scale(b);
        for j in 0..self.n {
            let col = self.col_slice(j);
            let xj = x[j];
            //triu terms of this column, diagonal included once
            for (i, &Aij) in col.iter().enumerate().take(j + 1) {
                y[i] += a * Aij * xj;
                if i != j {
                    y[j] += a * Aij * x[i];
                }
            }
        }
    }
}

impl<T: FloatT> MatrixMath for Matrix<T> {
    type T = T;

    fn scale(&mut self, c: T) {
        self.data.scale(c);
    }

    fn col_norms(&self, norms: &mut [T]) {
        norms.fill(T::zero());
        self.col_norms_no_reset(norms);
    }

    fn col_norms_no_reset(&self, norms: &mut [T]) {
        assert_eq!(norms.len(), self.n);
        for (j, norm) in norms.iter_mut().enumerate() {
            *norm = self
                .col_slice(j)
                .iter()
                .fold(*norm, |m, &v| T::max(m, T::abs(v)));
        }
    }

    fn col_norms_sym(&self, norms: &mut [T]) {
        norms.fill(T::zero());
        self.col_norms_sym_no_reset(norms);
    }

    fn col_norms_sym_no_reset(&self, norms: &mut [T]) {
        assert!(self.is_square());
        assert_eq!(norms.len(), self.n);
        for j in 0..self.n {
            for (i, &v) in self.col_slice(j).iter().enumerate().take(j + 1) {
                let tmp = T::abs(v);
                norms[j] = T::max(norms[j], tmp);
                norms[i] = T::max(norms[i], tmp);
            }
        }
    }

    fn row_norms(&self, norms: &mut [T]) {
        norms.fill(T::zero());
        self.row_norms_no_reset(norms);
    }

    fn row_norms_no_reset(&self, norms: &mut [T]) {
        assert_eq!(norms.len(), self.m);
        for j in 0..self.n {
            for (norm, &v) in norms.iter_mut().zip(self.col_slice(j)) {
                *norm = T::max(*norm, T::abs(v));
            }
        }
    }

    fn lrscale(&mut self, l: &[T], r: &[T]) {
        assert_eq!(l.len(), self.m);
        assert_eq!(r.len(), self.n);
        for (j, &rj) in r.iter().enumerate() {
            for (&li, v) in l.iter().zip(self.col_slice_mut(j)) {
                *v *= li * rj;
            }
        }
    }

    fn norm_max_abs(&self) -> T {
        self.data
            .iter()
            .fold(T::zero(), |m, &v| T::max(m, T::abs(v)))
    }

    fn quad_form(&self, y: &[T], x: &[T]) -> T {
        assert!(self.is_square());
        assert_eq!(x.len(), self.n);
        assert_eq!(y.len(), self.n);

        let mut out = T::zero();
        for j in 0..self.n {
            let col = self.col_slice(j);
            let mut tmp1 = T::zero();
            let mut tmp2 = T::zero();
            for (i, &Mij) in col.iter().enumerate().take(j) {
                //strictly triu terms
                tmp1 += Mij * x[i];
                tmp2 += Mij * y[i];
            }
            out += col[j] * x[j] * y[j] + tmp1 * y[j] + tmp2 * x[j];
        }
        out
    }
}

#[test]
#[allow(non_snake_case)]
fn test_dense_gemv() {
    let A = Matrix::from(&[
        [1., 3., 5.], //
        [2., 4., 6.],
    ]);

    let x = vec![1., 2., 3.];
    let mut y = vec![0.; 2];
    A.gemv(&mut y, &x, 1.0, 0.0);
    assert_eq!(y, vec![22., 28.]);

    let x = vec![1., 2.];
    let mut y = vec![1., 1., 1.];
    A.gemv_t(&mut y, &x, 1.0, -1.0);
    assert_eq!(y, vec![4., 10., 16.]);
}

#[test]
#[allow(non_snake_case)]
fn test_dense_symv_triu_and_quad_form() {
    //only the triu part should be referenced
    let M = Matrix::from(&[
        [4., 1.],   //
        [-99., 2.], //
    ]);

    let x = vec![1., 2.];
    let mut y = vec![0.; 2];
    M.symv_triu(&mut y, &x, 1.0, 0.0);
    assert_eq!(y, vec![6., 5.]);
    assert_eq!(M.quad_form(&x, &x), 16.);
}

#[test]
#[allow(non_snake_case)]
fn test_dense_norms_and_scaling() {
    let mut A = Matrix::from(&[
        [1., -4.], //
        [2., 3.],
    ]);

    let mut cn = vec![0.; 2];
    A.col_norms(&mut cn);
    assert_eq!(cn, vec![2., 4.]);

    let mut rn = vec![0.; 2];
    A.row_norms(&mut rn);
    assert_eq!(rn, vec![4., 3.]);

    A.lrscale(&[2., 1.], &[1., 3.]);
    assert_eq!(A[(0, 0)], 2.);
    assert_eq!(A[(0, 1)], -24.);
    assert_eq!(A[(1, 1)], 9.);
}
