//! Reference floating-point operator implementations (ONNX semantics)
//!
//! Every implementation receives the assembled input slots (`None` for an
//! omitted optional input) plus the merged attributes, and returns its
//! outputs. Only single-output operators are supported by the quantized
//! wrappers; the returned `Vec` lets the caller verify that.

use super::attrs::Attrs;
use crate::error::{Error, Result};
use ndarray::{ArrayD, ArrayView2, Axis, Ix1, Ix2};

/// Signature shared by all reference implementations
pub type ReferenceImpl = fn(&[Option<ArrayD<f64>>], &Attrs) -> Result<Vec<ArrayD<f64>>>;

fn input<'a>(inputs: &'a [Option<ArrayD<f64>>], index: usize, name: &str) -> Result<&'a ArrayD<f64>> {
    inputs
        .get(index)
        .and_then(Option::as_ref)
        .ok_or_else(|| Error::ConfigError(format!("missing required input '{name}'")))
}

fn unary(inputs: &[Option<ArrayD<f64>>], f: impl Fn(f64) -> f64) -> Result<Vec<ArrayD<f64>>> {
    Ok(vec![input(inputs, 0, "x")?.mapv(f)])
}

pub fn sigmoid(inputs: &[Option<ArrayD<f64>>], _attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    unary(inputs, |x| 1.0 / (1.0 + (-x).exp()))
}

pub fn hard_sigmoid(inputs: &[Option<ArrayD<f64>>], attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    let alpha = attrs.get_f64("alpha")?;
    let beta = attrs.get_f64("beta")?;
    unary(inputs, |x| (alpha * x + beta).clamp(0.0, 1.0))
}

pub fn relu(inputs: &[Option<ArrayD<f64>>], _attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    unary(inputs, |x| x.max(0.0))
}

pub fn leaky_relu(inputs: &[Option<ArrayD<f64>>], attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    let alpha = attrs.get_f64("alpha")?;
    unary(inputs, |x| if x < 0.0 { alpha * x } else { x })
}

pub fn elu(inputs: &[Option<ArrayD<f64>>], attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    let alpha = attrs.get_f64("alpha")?;
    unary(inputs, |x| if x > 0.0 { x } else { alpha * (x.exp() - 1.0) })
}

pub fn selu(inputs: &[Option<ArrayD<f64>>], attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    let alpha = attrs.get_f64("alpha")?;
    let gamma = attrs.get_f64("gamma")?;
    unary(inputs, |x| {
        if x > 0.0 {
            gamma * x
        } else {
            gamma * (alpha * x.exp() - alpha)
        }
    })
}

pub fn celu(inputs: &[Option<ArrayD<f64>>], attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    let alpha = attrs.get_f64("alpha")?;
    if alpha == 0.0 {
        return Err(Error::ConfigError("Celu alpha must be non-zero".to_string()));
    }
    unary(inputs, |x| x.max(0.0) + (alpha * ((x / alpha).exp() - 1.0)).min(0.0))
}

pub fn tanh(inputs: &[Option<ArrayD<f64>>], _attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    unary(inputs, f64::tanh)
}

pub fn softplus(inputs: &[Option<ArrayD<f64>>], _attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    unary(inputs, |x| x.exp().ln_1p())
}

pub fn exp(inputs: &[Option<ArrayD<f64>>], _attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    unary(inputs, f64::exp)
}

fn scalar(value: &ArrayD<f64>) -> Result<f64> {
    match value.iter().next() {
        Some(&v) if value.len() == 1 => Ok(v),
        _ => Err(Error::ShapeMismatch {
            expected: vec![1],
            got: value.shape().to_vec(),
        }),
    }
}

pub fn clip(inputs: &[Option<ArrayD<f64>>], _attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    let x = input(inputs, 0, "x")?;
    let min = match inputs.get(1).and_then(Option::as_ref) {
        Some(v) => scalar(v)?,
        None => f64::NEG_INFINITY,
    };
    let max = match inputs.get(2).and_then(Option::as_ref) {
        Some(v) => scalar(v)?,
        None => f64::INFINITY,
    };
    Ok(vec![x.mapv(|v| v.max(min).min(max))])
}

/// View a 1-D or 2-D array as a matrix; 1-D arrays become a single row
pub(crate) fn as_matrix<A>(array: &ArrayD<A>) -> Result<ArrayView2<'_, A>> {
    let rank_error = || Error::InvalidRank(array.shape().to_vec());
    match array.ndim() {
        1 => array
            .view()
            .into_dimensionality::<Ix1>()
            .map(|v| v.insert_axis(Axis(0)))
            .map_err(|_| rank_error()),
        2 => array
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| rank_error()),
        _ => Err(rank_error()),
    }
}

/// `y = alpha * op(a) @ op(b) + beta * c`
pub fn gemm(inputs: &[Option<ArrayD<f64>>], attrs: &Attrs) -> Result<Vec<ArrayD<f64>>> {
    let alpha = attrs.get_f64("alpha")?;
    let beta = attrs.get_f64("beta")?;
    let trans_a = attrs.get_i64("transA")? != 0;
    let trans_b = attrs.get_i64("transB")? != 0;

    let mut a = as_matrix(input(inputs, 0, "a")?)?;
    let mut b = as_matrix(input(inputs, 1, "b")?)?;
    if trans_a {
        a = a.reversed_axes();
    }
    if trans_b {
        b = b.reversed_axes();
    }
    if a.ncols() != b.nrows() {
        return Err(Error::ShapeMismatch {
            expected: vec![a.nrows(), b.nrows()],
            got: vec![a.nrows(), a.ncols()],
        });
    }

    let mut y = a.dot(&b);
    if alpha != 1.0 {
        y *= alpha;
    }

    if let Some(c) = inputs.get(2).and_then(Option::as_ref) {
        if beta != 0.0 {
            let c = c.broadcast(y.raw_dim()).ok_or_else(|| Error::ShapeMismatch {
                expected: y.shape().to_vec(),
                got: c.shape().to_vec(),
            })?;
            y.scaled_add(beta, &c);
        }
    }

    Ok(vec![y.into_dyn()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::attrs::AttrValue;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    fn one(x: ArrayD<f64>) -> Vec<Option<ArrayD<f64>>> {
        vec![Some(x)]
    }

    fn attrs(pairs: &[(&str, AttrValue)]) -> Attrs {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn gemm_attrs(trans_a: i64, trans_b: i64, beta: f64) -> Attrs {
        attrs(&[
            ("alpha", AttrValue::Float(1.0)),
            ("beta", AttrValue::Float(beta)),
            ("transA", AttrValue::Int(trans_a)),
            ("transB", AttrValue::Int(trans_b)),
        ])
    }

    #[test]
    fn test_activations() {
        let x = arr1(&[-1.0, 0.0, 2.0]).into_dyn();
        let none = Attrs::new();

        let y = &relu(&one(x.clone()), &none).unwrap()[0];
        assert_eq!(y.as_slice().unwrap(), &[0.0, 0.0, 2.0]);

        let y = &sigmoid(&one(x.clone()), &none).unwrap()[0];
        assert_abs_diff_eq!(y[[1]], 0.5);

        let y = &tanh(&one(x.clone()), &none).unwrap()[0];
        assert_abs_diff_eq!(y[[2]], 2.0f64.tanh());

        let y = &softplus(&one(x.clone()), &none).unwrap()[0];
        assert_abs_diff_eq!(y[[1]], 2.0f64.ln(), epsilon = 1e-12);

        let y = &exp(&one(x), &none).unwrap()[0];
        assert_abs_diff_eq!(y[[0]], (-1.0f64).exp());
    }

    #[test]
    fn test_parameterized_activations() {
        let x = arr1(&[-2.0, 0.0, 3.0]).into_dyn();

        let y = &leaky_relu(&one(x.clone()), &attrs(&[("alpha", AttrValue::Float(0.1))])).unwrap()[0];
        assert_abs_diff_eq!(y[[0]], -0.2);
        assert_abs_diff_eq!(y[[2]], 3.0);

        let hs = attrs(&[("alpha", AttrValue::Float(0.2)), ("beta", AttrValue::Float(0.5))]);
        let y = &hard_sigmoid(&one(x.clone()), &hs).unwrap()[0];
        assert_abs_diff_eq!(y[[0]], 0.1);
        assert_abs_diff_eq!(y[[1]], 0.5);
        assert_abs_diff_eq!(y[[2]], 1.0);

        let y = &elu(&one(x.clone()), &attrs(&[("alpha", AttrValue::Float(1.0))])).unwrap()[0];
        assert_abs_diff_eq!(y[[0]], (-2.0f64).exp() - 1.0);

        let y = &celu(&one(x.clone()), &attrs(&[("alpha", AttrValue::Float(1.0))])).unwrap()[0];
        assert_abs_diff_eq!(y[[0]], (-2.0f64).exp() - 1.0);
        assert_abs_diff_eq!(y[[2]], 3.0);

        let s = attrs(&[("alpha", AttrValue::Float(1.5)), ("gamma", AttrValue::Float(2.0))]);
        let y = &selu(&one(x), &s).unwrap()[0];
        assert_abs_diff_eq!(y[[2]], 6.0);
        assert_abs_diff_eq!(y[[0]], 2.0 * (1.5 * (-2.0f64).exp() - 1.5));
    }

    #[test]
    fn test_clip_optional_bounds() {
        let x = arr1(&[-5.0, 0.5, 5.0]).into_dyn();
        let none = Attrs::new();

        let y = &clip(&[Some(x.clone()), None, None], &none).unwrap()[0];
        assert_eq!(y, &x);

        let lo = arr1(&[-1.0]).into_dyn();
        let hi = arr1(&[1.0]).into_dyn();
        let y = &clip(&[Some(x.clone()), Some(lo), Some(hi)], &none).unwrap()[0];
        assert_eq!(y.as_slice().unwrap(), &[-1.0, 0.5, 1.0]);

        let bad = arr1(&[1.0, 2.0]).into_dyn();
        assert!(clip(&[Some(x), Some(bad), None], &none).is_err());
    }

    #[test]
    fn test_gemm_plain() {
        let a = arr2(&[[1.0, 2.0], [3.0, 4.0]]).into_dyn();
        let b = arr2(&[[1.0, 0.0], [0.0, 2.0]]).into_dyn();
        let c = arr1(&[0.5, -0.5]).into_dyn();

        let y = &gemm(&[Some(a), Some(b), Some(c)], &gemm_attrs(0, 0, 1.0)).unwrap()[0];
        assert_eq!(y, &arr2(&[[1.5, 3.5], [3.5, 7.5]]).into_dyn());
    }

    #[test]
    fn test_gemm_shape_mismatch() {
        let a = arr2(&[[1.0, 3.0], [2.0, 4.0]]).into_dyn();
        let b = arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).into_dyn();

        // a^T is 2x2 and b^T is 3x2
        let y = gemm(&[Some(a), Some(b), None], &gemm_attrs(1, 1, 0.0));
        assert!(matches!(y, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_gemm_beta_zero_ignores_bias() {
        let a = arr2(&[[1.0, 2.0]]).into_dyn();
        let b = arr2(&[[1.0], [1.0]]).into_dyn();
        let c = arr1(&[100.0]).into_dyn();

        let y = &gemm(&[Some(a), Some(b), Some(c)], &gemm_attrs(0, 0, 0.0)).unwrap()[0];
        assert_abs_diff_eq!(y[[0, 0]], 3.0);
    }

    #[test]
    fn test_gemm_rejects_rank_three() {
        let a = ArrayD::<f64>::zeros(ndarray::IxDyn(&[1, 1, 2]));
        let b = arr2(&[[1.0], [1.0]]).into_dyn();
        assert!(matches!(
            gemm(&[Some(a), Some(b), None], &gemm_attrs(0, 0, 1.0)),
            Err(Error::InvalidRank(_))
        ));
    }

    #[test]
    fn test_gemm_trans_b() {
        let a = arr2(&[[1.0, 2.0]]).into_dyn();
        let b = arr2(&[[1.0, 1.0], [2.0, 0.0], [0.0, 3.0]]).into_dyn();

        let y = &gemm(&[Some(a), Some(b), None], &gemm_attrs(0, 1, 1.0)).unwrap()[0];
        assert_eq!(y, &arr2(&[[3.0, 2.0, 6.0]]).into_dyn());
    }

    #[test]
    fn test_gemm_vector_input() {
        let a = arr1(&[1.0, 1.0]).into_dyn();
        let b = arr2(&[[2.0], [3.0]]).into_dyn();

        let y = &gemm(&[Some(a), Some(b), None], &gemm_attrs(0, 0, 1.0)).unwrap()[0];
        assert_eq!(y.shape(), &[1, 1]);
        assert_abs_diff_eq!(y[[0, 0]], 5.0);
    }

    #[test]
    fn test_missing_input() {
        assert!(matches!(
            relu(&[None], &Attrs::new()),
            Err(Error::ConfigError(_))
        ));
    }
}
