#![allow(dead_code)]

use rand::Rng;

use gllm_fp8_gemm::{quantize_rowwise, Fp8Format, RowwiseQuantized};

/// GEMM FLOPs (multiply-add = 2 ops)
pub fn gemm_flops(m: usize, n: usize, k: usize) -> u64 {
    2 * m as u64 * n as u64 * k as u64
}

/// Random f32 vector in [-1.0, 1.0)
pub fn random_f32_vec(n: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Random `[rows, cols]` matrix quantized rowwise to E4M3 fnuz.
pub fn random_fp8_matrix(rows: usize, cols: usize) -> RowwiseQuantized {
    let values = random_f32_vec(rows * cols);
    match quantize_rowwise(&values, rows, cols, Fp8Format::E4M3Fnuz) {
        Ok(q) => q,
        Err(e) => panic!("quantize {rows}x{cols}: {e}"),
    }
}

/// Random problem shapes drawn from LLM-like ranges.
pub fn random_shapes(count: usize) -> Vec<(usize, usize, usize)> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            (
                rng.gen_range(1..4096),
                rng.gen_range(128..32768),
                rng.gen_range(128..32768),
            )
        })
        .collect()
}
