//! 安定性比率を使う2つの実験（報告ドライバ）。
//!
//! - フィボナッチ構造張力: F_i を法 2^bitlen(F_i) の剰余とし、同じ網サイズの
//!   ランダム奇数と比率を比べる。
//! - ホライズン走査: 2^bits 規模の混成剰余で比率を測る。
//!
//! 乱数は呼び出し側の RNG から逐次に引き、比率計算だけを並列にする
//! （シード固定なら結果は再現可能）。

use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::fmt;

use crate::error::{MaporaError, Result};
use crate::graph::{validate_graph_depth, DEFAULT_MAX_DEPTH};
use crate::stability::{stability_ratio, DEFAULT_NODE_BUDGET};

/// 実験パラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    /// フィボナッチ添字の範囲（両端含む, F_1 = F_2 = 1）
    pub fib_from: usize,
    pub fib_to: usize,
    pub fib_budget: u64,
    /// ホライズン走査のビット規模
    pub horizon_scales: Vec<u64>,
    pub horizon_budget: u64,
    /// delta がこれを下回ると異常として印を付ける
    pub anomaly_threshold: f64,
    /// 可視化の深さ上限
    pub graph_depth: u64,
    /// None ならエントロピーから
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            fib_from: 3,
            fib_to: 25,
            fib_budget: DEFAULT_NODE_BUDGET,
            horizon_scales: vec![10, 50, 100, 300, 500, 750, 1000],
            horizon_budget: 3000,
            anomaly_threshold: -0.15,
            graph_depth: DEFAULT_MAX_DEPTH,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    /// 全実験分の検証
    pub fn validate(&self) -> Result<()> {
        self.validate_fibonacci()?;
        self.validate_horizon()?;
        self.validate_graph()
    }

    pub fn validate_fibonacci(&self) -> Result<()> {
        if self.fib_from == 0 {
            return Err(MaporaError::InvalidParameter("fibonacci index starts at 1".into()));
        }
        if self.fib_from > self.fib_to {
            return Err(MaporaError::InvalidParameter(format!(
                "fibonacci range is empty: {}..={}",
                self.fib_from, self.fib_to
            )));
        }
        if !self.anomaly_threshold.is_finite() {
            return Err(MaporaError::InvalidParameter("anomaly threshold must be finite".into()));
        }
        Ok(())
    }

    pub fn validate_horizon(&self) -> Result<()> {
        if self.horizon_scales.is_empty() {
            return Err(MaporaError::InvalidParameter("no horizon scales".into()));
        }
        if self.horizon_scales.contains(&0) {
            return Err(MaporaError::InvalidParameter("horizon scale must be >= 1 bit".into()));
        }
        Ok(())
    }

    pub fn validate_graph(&self) -> Result<()> {
        validate_graph_depth(self.graph_depth)
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// フィボナッチ実験の1行
#[derive(Debug, Clone, PartialEq)]
pub struct FibonacciRow {
    pub index: usize,
    pub value: BigUint,
    /// 網サイズの指数（法 = 2^net_bits）
    pub net_bits: u64,
    pub control: BigUint,
    pub fib_ratio: f64,
    pub random_ratio: f64,
    pub delta: f64,
    pub anomalous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizonContext {
    Supercomputer,
    Cosmological,
    Theoretical,
}

impl HorizonContext {
    pub fn for_bits(bits: u64) -> Self {
        if bits < 70 {
            HorizonContext::Supercomputer
        } else if bits < 300 {
            HorizonContext::Cosmological
        } else {
            HorizonContext::Theoretical
        }
    }
}

impl fmt::Display for HorizonContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HorizonContext::Supercomputer => "Supercomputer",
            HorizonContext::Cosmological => "Cosmological",
            HorizonContext::Theoretical => "Theoretical",
        };
        f.pad(s)
    }
}

/// ホライズン走査の1行
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonRow {
    pub bits: u64,
    pub residue: BigUint,
    pub context: HorizonContext,
    pub ratio: f64,
}

/// F_from ..= F_to を (添字, 値) で返す
pub fn fibonacci_range(from: usize, to: usize) -> Vec<(usize, BigUint)> {
    let mut out = Vec::new();
    let mut a = BigUint::one();
    let mut b = BigUint::one();
    for i in 1..=to {
        if i >= from {
            out.push((i, a.clone()));
        }
        let next = &a + &b;
        a = std::mem::replace(&mut b, next);
    }
    out
}

fn force_odd(mut n: BigUint) -> BigUint {
    if !n.bit(0) {
        n += 1u32;
    }
    n
}

/// 網サイズ 2^bits の上半分 [2^(bits-1), 2^bits) から奇数を引く
pub fn random_control<R: Rng + ?Sized>(net_bits: u64, rng: &mut R) -> BigUint {
    let net = BigUint::one() << net_bits;
    let low = &net >> 1u32;
    force_odd(rng.gen_biguint_range(&low, &net))
}

/// (2^bits - 1) XOR random(bits) を奇数にしたもの
pub fn horizon_residue<R: Rng + ?Sized>(bits: u64, rng: &mut R) -> BigUint {
    let all_ones = (BigUint::one() << bits) - BigUint::one();
    let noise = rng.gen_biguint(bits);
    force_odd(&all_ones ^ &noise)
}

/// 独立な走査を rayon で並列に実行する。出力順は入力順。
pub fn stability_ratios_parallel(classes: &[(BigUint, BigUint)], node_budget: u64) -> Result<Vec<f64>> {
    classes
        .par_iter()
        .map(|(m, r)| stability_ratio(m, r, node_budget))
        .collect()
}

pub fn fibonacci_stress_test<R: Rng + ?Sized>(config: &ExperimentConfig, rng: &mut R) -> Result<Vec<FibonacciRow>> {
    config.validate_fibonacci()?;

    let fibs = fibonacci_range(config.fib_from, config.fib_to);
    let mut prepared = Vec::with_capacity(fibs.len());
    let mut classes = Vec::with_capacity(fibs.len() * 2);
    for (index, value) in fibs {
        let net_bits = value.bits();
        let net = BigUint::one() << net_bits;
        let control = random_control(net_bits, rng);
        classes.push((net.clone(), value.clone()));
        classes.push((net, control.clone()));
        prepared.push((index, value, net_bits, control));
    }

    let ratios = stability_ratios_parallel(&classes, config.fib_budget)?;

    let rows: Vec<FibonacciRow> = prepared
        .into_iter()
        .zip(ratios.chunks(2))
        .map(|((index, value, net_bits, control), pair)| {
            let (fib_ratio, random_ratio) = (pair[0], pair[1]);
            let delta = fib_ratio - random_ratio;
            FibonacciRow {
                index,
                value,
                net_bits,
                control,
                fib_ratio,
                random_ratio,
                delta,
                anomalous: delta < config.anomaly_threshold,
            }
        })
        .collect();

    for row in &rows {
        tracing::info!(
            index = row.index,
            fib = %row.value,
            fib_ratio = row.fib_ratio,
            random_ratio = row.random_ratio,
            delta = row.delta,
            anomalous = row.anomalous,
            "fibonacci row"
        );
    }
    Ok(rows)
}

pub fn horizon_scan<R: Rng + ?Sized>(config: &ExperimentConfig, rng: &mut R) -> Result<Vec<HorizonRow>> {
    config.validate_horizon()?;

    let residues: Vec<BigUint> = config
        .horizon_scales
        .iter()
        .map(|&bits| horizon_residue(bits, rng))
        .collect();
    let classes: Vec<(BigUint, BigUint)> = config
        .horizon_scales
        .iter()
        .zip(&residues)
        .map(|(&bits, r)| (BigUint::one() << bits, r.clone()))
        .collect();

    let ratios = stability_ratios_parallel(&classes, config.horizon_budget)?;

    let rows: Vec<HorizonRow> = config
        .horizon_scales
        .iter()
        .zip(residues)
        .zip(ratios)
        .map(|((&bits, residue), ratio)| HorizonRow {
            bits,
            residue,
            context: HorizonContext::for_bits(bits),
            ratio,
        })
        .collect();

    for row in &rows {
        tracing::info!(bits = row.bits, context = %row.context, ratio = row.ratio, "horizon row");
    }
    Ok(rows)
}
