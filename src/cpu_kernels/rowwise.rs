//! Tiled host implementation of the rowwise-scaled FP8 GEMM.
//!
//! `out[m, n] = bf16(sum_k dec(xq[m, k]) * dec(wq[n, k]) * x_scale[m] * w_scale[n])`
//!
//! Row tiles of `m_per_block` rows run in parallel; inside a tile the loop nest walks
//! `n_per_block` x `k_per_block` blocks. Partial sums are carried in the accumulator
//! across K blocks so every element sees its products in ascending `k` order, which
//! keeps all tilings bit-identical.

use rayon::prelude::*;

use super::operand_table;
use crate::error::{GemmError, Result};
use crate::kernel_library::RowwiseKernel;
use crate::kernel_types::{KernelId, TileConfig};
use crate::tensor::{TensorMut, TensorRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRowwiseKernel {
    id: KernelId,
    tile: TileConfig,
}

impl HostRowwiseKernel {
    pub const fn new(id: KernelId) -> Self {
        Self { id, tile: id.tile() }
    }

    #[inline]
    pub fn tile(&self) -> &TileConfig {
        &self.tile
    }
}

fn require(cond: bool, msg: impl FnOnce() -> String) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(GemmError::Kernel(msg()))
    }
}

impl RowwiseKernel for HostRowwiseKernel {
    fn id(&self) -> KernelId {
        self.id
    }

    fn launch(
        &self,
        xq: &TensorRef<'_>,
        wq: &TensorRef<'_>,
        x_scale: &TensorRef<'_>,
        w_scale: &TensorRef<'_>,
        out: &mut TensorMut<'_>,
    ) -> Result<()> {
        let x_table = operand_table("xq", xq.dtype())?;
        let w_table = operand_table("wq", wq.dtype())?;

        require(wq.dim() == 2, || format!("wq must be 2-d, got {:?}", wq.shape()))?;
        require(xq.dim() >= 1 && xq.is_contiguous(), || {
            format!("xq must be contiguous, got strides {:?}", xq.strides())
        })?;
        let wt = wq.t()?;
        require(wt.is_contiguous(), || {
            format!("wq must view a row-major [N, K] buffer, got strides {:?}", wq.strides())
        })?;

        let (n, k) = (wt.shape()[0], wt.shape()[1]);
        let xq_k = xq.shape()[xq.dim() - 1];
        require(xq_k == k, || format!("xq inner dim {xq_k} != K {k}"))?;
        let m: usize = xq.shape()[..xq.dim() - 1].iter().product();
        if m == 0 || n == 0 {
            return Ok(());
        }
        require(k > 0, || "K must be at least 1".into())?;

        let xs = x_scale.to_f32_vec();
        let ws = w_scale.to_f32_vec();
        require(xs.len() == m, || format!("x_scale has {} elements, M = {m}", xs.len()))?;
        require(ws.len() == n, || format!("w_scale has {} elements, N = {n}", ws.len()))?;

        let TileConfig {
            m_per_block,
            n_per_block,
            k_per_block,
            ..
        } = self.tile;

        log::trace!(
            "host {} launch: {m}x{n}x{k}, tiles {m_per_block}x{n_per_block}x{k_per_block}",
            self.id
        );

        // Views were validated contiguous, so element (r, c) sits at byte r * K + c.
        let x_bytes = &xq.as_bytes()[..m * k];
        let w: Vec<f32> = wq.as_bytes()[..n * k]
            .iter()
            .map(|&code| w_table[code as usize])
            .collect();

        let mut acc = vec![0.0f32; m * n];
        let chunk_size = m_per_block * n;
        let process_tile = |tile_idx: usize, acc_tile: &mut [f32]| {
            let m0 = tile_idx * m_per_block;
            let rows = acc_tile.len() / n;
            let x_tile: Vec<f32> = x_bytes[m0 * k..(m0 + rows) * k]
                .iter()
                .map(|&code| x_table[code as usize])
                .collect();

            for n0 in (0..n).step_by(n_per_block) {
                let n1 = (n0 + n_per_block).min(n);
                for k0 in (0..k).step_by(k_per_block) {
                    let k1 = (k0 + k_per_block).min(k);
                    for r in 0..rows {
                        let x_row = &x_tile[r * k + k0..r * k + k1];
                        let acc_row = &mut acc_tile[r * n..(r + 1) * n];
                        for col in n0..n1 {
                            let w_row = &w[col * k + k0..col * k + k1];
                            let mut sum = acc_row[col];
                            for (a, b) in x_row.iter().zip(w_row) {
                                sum += a * b;
                            }
                            acc_row[col] = sum;
                        }
                    }
                }
            }

            for r in 0..rows {
                let sx = xs[m0 + r];
                for (v, sw) in acc_tile[r * n..(r + 1) * n].iter_mut().zip(&ws) {
                    *v = *v * sx * sw;
                }
            }
        };

        if m > m_per_block {
            acc.par_chunks_mut(chunk_size)
                .enumerate()
                .for_each(|(idx, tile)| process_tile(idx, tile));
        } else {
            acc.chunks_mut(chunk_size)
                .enumerate()
                .for_each(|(idx, tile)| process_tile(idx, tile));
        }

        out.store_f32(&acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;
    use crate::types::{DType, Device};
    use half::bf16;

    #[test]
    fn test_kernel_carries_its_variant_tile() {
        for id in KernelId::ALL {
            let kernel = HostRowwiseKernel::new(id);
            assert_eq!(kernel.id(), id);
            assert_eq!(kernel.tile(), &id.tile());
            assert_eq!(kernel.tile().kernel_name(), id.name());
        }
    }

    fn run(id: KernelId, m: usize, n: usize, k: usize, x: &[f32], w: &[f32], xs: &[f32], ws: &[f32]) -> Vec<f32> {
        let xq = Tensor::from_f32_as(x, &[m, k], DType::F8E4M3Fnuz, Device::Cpu).unwrap();
        let wq = Tensor::from_f32_as(w, &[n, k], DType::F8E4M3Fnuz, Device::Cpu).unwrap();
        let x_scale = Tensor::from_f32(xs, &[m], Device::Cpu).unwrap();
        let w_scale = Tensor::from_f32(ws, &[n], Device::Cpu).unwrap();
        let mut out = Tensor::zeros(&[m, n], DType::BF16, Device::Cpu).unwrap();
        let wq_view = wq.view();
        HostRowwiseKernel::new(id)
            .launch(
                &xq.view(),
                &wq_view.t().unwrap(),
                &x_scale.view(),
                &w_scale.view(),
                &mut out.view_mut(),
            )
            .unwrap();
        out.to_f32_vec()
    }

    #[test]
    fn test_small_exact() {
        // x = [[1, 2], [3, 4]], w = [[1, 0], [1, 1]] (rows are N)
        let out = run(
            KernelId::SmallAll,
            2,
            2,
            2,
            &[1.0, 2.0, 3.0, 4.0],
            &[1.0, 0.0, 1.0, 1.0],
            &[1.0, 0.5],
            &[2.0, 1.0],
        );
        // row 0: [1*2, 3*1]; row 1: [3*0.5*2, 7*0.5*1]
        assert_eq!(out, vec![2.0, 3.0, 3.0, 3.5]);
    }

    #[test]
    fn test_result_is_bf16_rounded() {
        let out = run(KernelId::SmallK, 1, 1, 1, &[1.0], &[1.0], &[1.0 / 3.0], &[1.0]);
        assert_eq!(out[0], bf16::from_f32(1.0 / 3.0).to_f32());
    }

    #[test]
    fn test_tilings_agree() {
        let (m, n, k) = (37, 45, 300);
        let x: Vec<f32> = (0..m * k).map(|i| ((i * 7 % 29) as f32 - 14.0) / 4.0).collect();
        let w: Vec<f32> = (0..n * k).map(|i| ((i * 5 % 23) as f32 - 11.0) / 8.0).collect();
        let xs: Vec<f32> = (0..m).map(|i| 0.01 + i as f32 * 1e-3).collect();
        let ws: Vec<f32> = (0..n).map(|i| 0.02 + i as f32 * 1e-3).collect();

        let reference = run(KernelId::SmallK, m, n, k, &x, &w, &xs, &ws);
        for id in KernelId::ALL {
            assert_eq!(run(id, m, n, k, &x, &w, &xs, &ws), reference, "{id:?}");
        }
    }

    #[test]
    fn test_rejects_non_fp8_operand() {
        let xq = Tensor::zeros(&[2, 4], DType::BF16, Device::Cpu).unwrap();
        let wq = Tensor::zeros(&[3, 4], DType::F8E4M3Fnuz, Device::Cpu).unwrap();
        let xs = Tensor::zeros(&[2], DType::F32, Device::Cpu).unwrap();
        let ws = Tensor::zeros(&[3], DType::F32, Device::Cpu).unwrap();
        let mut out = Tensor::zeros(&[2, 3], DType::BF16, Device::Cpu).unwrap();
        let wq_view = wq.view();
        let r = HostRowwiseKernel::new(KernelId::Large).launch(
            &xq.view(),
            &wq_view.t().unwrap(),
            &xs.view(),
            &ws.view(),
            &mut out.view_mut(),
        );
        assert!(matches!(r, Err(GemmError::Kernel(_))));
    }
}
