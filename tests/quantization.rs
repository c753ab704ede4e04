use gllm_fp8_gemm::{quantize_rowwise, DType, Device, Fp8Format, GemmError};

const FORMATS: [Fp8Format; 3] = [Fp8Format::E4M3Fnuz, Fp8Format::E4M3Fn, Fp8Format::E5M2];

/// Worst-case relative rounding error for normal values: half an ulp.
fn relative_step(format: Fp8Format) -> f32 {
    match format {
        Fp8Format::E4M3Fnuz | Fp8Format::E4M3Fn => 2f32.powi(-4),
        Fp8Format::E5M2 => 2f32.powi(-3),
    }
}

#[test]
fn rowwise_dequantize_stays_within_one_step() {
    let rows = 4;
    let cols = 64;
    let values: Vec<f32> = (0..rows * cols)
        .map(|i| ((i * 37 % 101) as f32 - 50.0) * 0.013 * (1 + i / cols) as f32)
        .collect();

    for format in FORMATS {
        let q = quantize_rowwise(&values, rows, cols, format).unwrap();
        assert_eq!(q.scales.len(), rows);
        let deq = q.dequantize();
        for r in 0..rows {
            let row = &values[r * cols..(r + 1) * cols];
            let amax = row.iter().fold(0.0f32, |a, v| a.max(v.abs()));
            assert!((q.scales[r] - amax / format.max()).abs() <= q.scales[r] * 1e-6);
            for c in 0..cols {
                let (v, d) = (row[c], deq[r * cols + c]);
                assert!(
                    (v - d).abs() <= amax * relative_step(format) + 1e-6,
                    "{format:?} row {r} col {c}: {v} vs {d}"
                );
            }
        }
    }
}

#[test]
fn row_maximum_maps_to_format_max() {
    let values = [0.25f32, -3.0, 1.5, 2.0];
    for format in FORMATS {
        let q = quantize_rowwise(&values, 1, 4, format).unwrap();
        assert_eq!(format.decode(q.data[1]), -format.max());
        let deq = q.dequantize();
        assert!((deq[1] + 3.0).abs() <= 3.0 * 1e-6);
    }
}

#[test]
fn zero_rows_get_unit_scale() {
    let values = vec![0.0f32; 2 * 8];
    let q = quantize_rowwise(&values, 2, 8, Fp8Format::E4M3Fnuz).unwrap();
    assert_eq!(q.scales, vec![1.0, 1.0]);
    assert!(q.dequantize().iter().all(|&v| v == 0.0));
}

#[test]
fn non_finite_input_is_rejected() {
    for bad in [f32::NAN, f32::INFINITY] {
        let values = [1.0f32, bad];
        assert!(matches!(
            quantize_rowwise(&values, 1, 2, Fp8Format::E4M3Fnuz),
            Err(GemmError::InvalidConfig(_))
        ));
    }
}

#[test]
fn length_mismatch_is_rejected() {
    assert!(matches!(
        quantize_rowwise(&[1.0; 5], 2, 3, Fp8Format::E5M2),
        Err(GemmError::ShapeMismatch(_))
    ));
}

#[test]
fn tensors_carry_format_and_shape() {
    let values: Vec<f32> = (0..12).map(|i| i as f32 - 6.0).collect();
    let q = quantize_rowwise(&values, 3, 4, Fp8Format::E4M3Fnuz).unwrap();
    let xq = q.values_tensor(Device::Cpu).unwrap();
    assert_eq!(xq.dtype(), DType::F8E4M3Fnuz);
    assert_eq!(xq.shape(), &[3, 4]);
    let xs = q.scales_tensor(Device::Cpu).unwrap();
    assert_eq!(xs.dtype(), DType::F32);
    assert_eq!(xs.to_f32_vec(), q.scales);
}

#[test]
fn encode_saturates_and_preserves_nan() {
    for format in FORMATS {
        assert_eq!(format.decode(format.encode(1e9)), format.max());
        assert_eq!(format.decode(format.encode(-1e9)), -format.max());
        assert!(format.decode(format.encode(f32::NAN)).is_nan());
        for code in 0..=255u8 {
            let v = format.decode(code);
            if v.is_finite() && v != 0.0 {
                assert_eq!(format.decode(format.encode(v)), v, "{format:?} {code:#04x}");
            }
        }
    }
}
