//! Forward and inverse affine transforms over whole matrices.

use sqkit_core::tracing_config::span_names;
use sqkit_core::{Element, MatrixView, MatrixViewMut, QuantError, QuantInt, QuantResult};
use sqkit_exec::ExecutionResource;

use crate::quantizer::ScalarQuantizer;

fn check_shape(input: (usize, usize), output: (usize, usize)) -> QuantResult<()> {
    if input == output {
        Ok(())
    } else {
        Err(QuantError::shape_mismatch(input, output))
    }
}

/// Quantize every element of `dataset` into `out`.
///
/// Values below `min` saturate to `Q::MIN`, above `max` to `Q::MAX`; NaN
/// and every value of a degenerate quantizer map to the midpoint of `Q`.
///
/// # Errors
///
/// - `QuantError::UntrainedQuantizer` for invalid quantizer state.
/// - `QuantError::InvalidInput` if either view lives on another device.
/// - `QuantError::ShapeMismatch` if `out` does not have the shape of `dataset`.
///
/// Both are reported before any element of `out` is written.
pub fn transform<T, Q, R>(
    resources: &R,
    quantizer: &ScalarQuantizer<T, Q>,
    dataset: MatrixView<'_, T, R::Space>,
    mut out: MatrixViewMut<'_, Q, R::Space>,
) -> QuantResult<()>
where
    T: Element,
    Q: QuantInt,
    R: ExecutionResource,
{
    quantizer.validate()?;
    resources.check_owner(dataset.owner())?;
    resources.check_owner(out.owner())?;
    check_shape(dataset.shape(), out.shape())?;

    let _span = tracing::debug_span!(
        target: "sqkit.transform",
        span_names::TRANSFORM,
        substrate = %resources.substrate(),
        rows = dataset.rows(),
        cols = dataset.cols(),
        element_type = T::NAME,
        quant_type = Q::NAME
    )
    .entered();

    let map = quantizer.affine_map();
    resources.map_into(dataset.as_slice(), out.as_mut_slice(), move |x: &T| {
        Q::saturating_from_f64(map.quantize(x.to_f64()))
    });
    Ok(())
}

/// Reconstruct approximate elements of `dataset` into `out`.
///
/// A degenerate quantizer reconstructs every element as `min`.
///
/// # Errors
///
/// Same conditions as [`transform`], reported before any write.
pub fn inverse_transform<T, Q, R>(
    resources: &R,
    quantizer: &ScalarQuantizer<T, Q>,
    dataset: MatrixView<'_, Q, R::Space>,
    mut out: MatrixViewMut<'_, T, R::Space>,
) -> QuantResult<()>
where
    T: Element,
    Q: QuantInt,
    R: ExecutionResource,
{
    quantizer.validate()?;
    resources.check_owner(dataset.owner())?;
    resources.check_owner(out.owner())?;
    check_shape(dataset.shape(), out.shape())?;

    let _span = tracing::debug_span!(
        target: "sqkit.transform",
        span_names::INVERSE_TRANSFORM,
        substrate = %resources.substrate(),
        rows = dataset.rows(),
        cols = dataset.cols(),
        element_type = T::NAME,
        quant_type = Q::NAME
    )
    .entered();

    let map = quantizer.affine_map();
    resources.map_into(dataset.as_slice(), out.as_mut_slice(), move |q: &Q| {
        T::from_f64(map.dequantize(q.to_f64()))
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use sqkit_core::{ExecConfig, Matrix, QuantizerConfig, bf16};
    use sqkit_exec::{DeviceResources, HostResources};

    use super::*;
    use crate::train::train_scalar;

    fn reference() -> Matrix<f32> {
        Matrix::from_rows(&[vec![0.0_f32, 10.0], vec![20.0, 30.0]]).expect("2x2")
    }

    fn train_i8(data: &Matrix<f32>, quantile: f64) -> ScalarQuantizer<f32, i8> {
        train_scalar(
            &HostResources::default(),
            &QuantizerConfig::with_quantile(quantile),
            data.view(),
        )
        .expect("train")
    }

    #[test]
    fn reference_mapping_full_range() {
        let data = reference();
        let q = train_i8(&data, 1.0);
        let mut out = Matrix::filled(2, 2, 0_i8).expect("alloc");
        transform(&HostResources::default(), &q, data.view(), out.view_mut()).expect("transform");
        assert_eq!(out.as_slice(), &[-128, -43, 42, 127]);
    }

    #[test]
    fn reference_mapping_half_quantile_saturates() {
        let data = reference();
        let q = train_i8(&data, 0.5);
        let mut out = Matrix::filled(2, 2, 0_i8).expect("alloc");
        transform(&HostResources::default(), &q, data.view(), out.view_mut()).expect("transform");
        assert_eq!(out.as_slice(), &[-128, -128, 127, 127]);
    }

    #[test]
    fn shape_mismatch_leaves_output_untouched() {
        let data = reference();
        let q = train_i8(&data, 1.0);
        let mut out = Matrix::filled(4, 1, 9_i8).expect("alloc");
        let err = transform(&HostResources::default(), &q, data.view(), out.view_mut())
            .expect_err("shape");
        assert!(matches!(
            err,
            QuantError::ShapeMismatch {
                expected_rows: 2,
                expected_cols: 2,
                found_rows: 4,
                found_cols: 1,
            }
        ));
        assert!(out.as_slice().iter().all(|v| *v == 9));

        let codes = Matrix::filled(2, 2, 0_i8).expect("alloc");
        let mut back = Matrix::filled(1, 4, 7.0_f32).expect("alloc");
        let err = inverse_transform(&HostResources::default(), &q, codes.view(), back.view_mut())
            .expect_err("shape");
        assert!(matches!(err, QuantError::ShapeMismatch { .. }));
        assert!(back.as_slice().iter().all(|v| *v == 7.0));
    }

    #[test]
    fn untrained_state_is_rejected() {
        let q: ScalarQuantizer<f32, u8> =
            serde_json::from_str(r#"{"min":1.0,"max":0.0}"#).expect("deserialize");
        let data = reference();
        let mut out = Matrix::filled(2, 2, 3_u8).expect("alloc");
        let err = transform(&HostResources::default(), &q, data.view(), out.view_mut())
            .expect_err("untrained");
        assert!(matches!(err, QuantError::UntrainedQuantizer { .. }));
        assert!(out.as_slice().iter().all(|v| *v == 3));
    }

    #[test]
    fn degenerate_quantizer_is_constant() {
        let data = Matrix::filled(3, 3, 5.0_f32).expect("alloc");
        let host = HostResources::default();
        let q: ScalarQuantizer<f32, u8> =
            train_scalar(&host, &QuantizerConfig::default(), data.view()).expect("train");
        let probe = Matrix::from_vec(vec![-1e30, 0.0, 5.0, 6.0, f32::NAN, 1e30], 2, 3)
            .expect("2x3");
        let mut out = Matrix::filled(2, 3, 0_u8).expect("alloc");
        transform(&host, &q, probe.view(), out.view_mut()).expect("transform");
        assert!(out.as_slice().iter().all(|v| *v == 128));

        let mut back = Matrix::filled(2, 3, 0.0_f32).expect("alloc");
        inverse_transform(&host, &q, out.view(), back.view_mut()).expect("inverse");
        assert!(back.as_slice().iter().all(|v| *v == 5.0));
    }

    #[test]
    fn device_output_matches_host() {
        let data: Vec<f32> = (0..12_000).map(|i| ((i * 37) % 1_001) as f32 / 10.0 - 50.0).collect();
        let data = Matrix::from_vec(data, 120, 100).expect("120x100");
        let host = HostResources::new(ExecConfig {
            parallel_threshold: 1_024,
            chunk_size: 333,
            ..ExecConfig::default()
        })
        .expect("host");
        let device = DeviceResources::new(&ExecConfig {
            device_threads: 2,
            device_block_size: 128,
            ..ExecConfig::default()
        })
        .expect("device");
        let config = QuantizerConfig::with_quantile(0.9);

        let q_host: ScalarQuantizer<f32, u8> =
            train_scalar(&host, &config, data.view()).expect("host train");
        let mut host_out = Matrix::filled(120, 100, 0_u8).expect("alloc");
        transform(&host, &q_host, data.view(), host_out.view_mut()).expect("host transform");

        let on_device = device.upload(data.view());
        let q_dev: ScalarQuantizer<f32, u8> =
            train_scalar(&device, &config, on_device.view()).expect("device train");
        assert_eq!(q_host, q_dev);
        let mut dev_out = device.alloc_matrix(120, 100, 0_u8).expect("alloc");
        transform(&device, &q_dev, on_device.view(), dev_out.view_mut()).expect("device transform");
        let dev_out = device.download(&dev_out).expect("download");
        assert_eq!(host_out, dev_out);

        let mut dev_back = device.alloc_matrix(120, 100, 0.0_f32).expect("alloc");
        let on_device_codes = device.upload(dev_out.view());
        inverse_transform(&device, &q_dev, on_device_codes.view(), dev_back.view_mut())
            .expect("device inverse");
        let mut host_back = Matrix::filled(120, 100, 0.0_f32).expect("alloc");
        inverse_transform(&host, &q_host, host_out.view(), host_back.view_mut())
            .expect("host inverse");
        assert_eq!(device.download(&dev_back).expect("download"), host_back);
    }

    #[test]
    fn foreign_device_views_are_rejected() {
        let config = ExecConfig {
            device_threads: 1,
            device_block_size: 16,
            ..ExecConfig::default()
        };
        let a = DeviceResources::new(&config).expect("device a");
        let b = DeviceResources::new(&config).expect("device b");
        let q = ScalarQuantizer::<f32, u8>::from_bounds(0.0, 30.0).expect("bounds");
        let on_a = a.upload(reference().view());
        let mut out_a = a.alloc_matrix(2, 2, 9_u8).expect("alloc");
        let mut out_b = b.alloc_matrix(2, 2, 9_u8).expect("alloc");

        let err = transform(&b, &q, on_a.view(), out_b.view_mut()).expect_err("foreign input");
        assert!(matches!(err, QuantError::InvalidInput { .. }));
        let err = transform(&a, &q, on_a.view(), out_b.view_mut()).expect_err("foreign output");
        assert!(matches!(err, QuantError::InvalidInput { .. }));
        assert!(b.download(&out_b).expect("download").as_slice().iter().all(|v| *v == 9));

        transform(&a, &q, on_a.view(), out_a.view_mut()).expect("same device");
        let codes = a.upload(a.download(&out_a).expect("download").view());
        let mut back = b.alloc_matrix(2, 2, 0.0_f32).expect("alloc");
        let err =
            inverse_transform(&b, &q, codes.view(), back.view_mut()).expect_err("foreign codes");
        assert!(matches!(err, QuantError::InvalidInput { .. }));
    }

    #[test]
    fn bf16_to_i16() {
        let values: Vec<bf16> = (-50..50).map(|i| bf16::from_f32(i as f32 * 0.5)).collect();
        let data = Matrix::from_vec(values, 10, 10).expect("10x10");
        let host = HostResources::default();
        let q: ScalarQuantizer<bf16, i16> =
            train_scalar(&host, &QuantizerConfig::with_quantile(1.0), data.view()).expect("train");
        let mut codes = Matrix::filled(10, 10, 0_i16).expect("alloc");
        transform(&host, &q, data.view(), codes.view_mut()).expect("transform");
        assert_eq!(codes.as_slice()[0], i16::MIN);
        assert_eq!(codes.as_slice()[99], i16::MAX);
        let mut back = Matrix::filled(10, 10, bf16::ZERO).expect("alloc");
        inverse_transform(&host, &q, codes.view(), back.view_mut()).expect("inverse");
        for (x, x_back) in data.as_slice().iter().zip(back.as_slice()) {
            let err = (x.to_f64() - x_back.to_f64()).abs();
            assert!(err <= q.step() + 0.125, "{x} -> {x_back}");
        }
        assert_eq!(back.as_slice()[0], bf16::from_f32(-25.0));
    }

    proptest! {
        #[test]
        fn property_roundtrip_within_one_step(
            data in proptest::collection::vec(-1.0e4_f64..1.0e4, 2..256),
            quantile in 0.1_f64..=1.0,
        ) {
            let host = HostResources::default();
            let view = MatrixView::new(&data, 1, data.len()).expect("row");
            let q: ScalarQuantizer<f64, u8> =
                train_scalar(&host, &QuantizerConfig::with_quantile(quantile), view)
                    .expect("train");
            let mut codes = vec![0_u8; data.len()];
            transform(&host, &q, view, MatrixViewMut::new(&mut codes, 1, data.len()).expect("row"))
                .expect("transform");
            let mut back = vec![0.0_f64; data.len()];
            inverse_transform(
                &host,
                &q,
                MatrixView::new(&codes, 1, data.len()).expect("row"),
                MatrixViewMut::new(&mut back, 1, data.len()).expect("row"),
            )
            .expect("inverse");
            for ((x, code), x_back) in data.iter().zip(&codes).zip(&back) {
                if *x < q.min() {
                    prop_assert_eq!(*code, u8::MIN);
                } else if *x > q.max() {
                    prop_assert_eq!(*code, u8::MAX);
                } else {
                    prop_assert!((x_back - x).abs() <= q.step() * (1.0 + 1e-9));
                }
            }
        }
    }
}
