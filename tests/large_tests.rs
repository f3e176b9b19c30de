use collatz_mapora::experiment::{horizon_residue, ExperimentConfig, HorizonContext};
use collatz_mapora::*;
use num_bigint::BigUint;
use num_traits::One;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// 2^1000 規模の剰余類でも走査できる
#[test]
fn test_2pow1000_traversal() {
    let m = BigUint::one() << 1000u32;
    let r = (BigUint::one() << 999u32) + BigUint::from(12345u64);
    let rep = stability_report(&m, &r, 3000).unwrap();
    assert!(rep.nodes_processed <= 3000);
    assert_eq!(rep.straight_paths + rep.splits + rep.terminals, rep.nodes_processed);
    assert!(rep.max_depth > 0);
}

/// 2^k の偶数剰余 2^(k-1) は半減を繰り返して 1 mod 2 に到達する
#[test]
fn test_large_power_of_two_halving() {
    let k = 500u32;
    let m = BigUint::one() << k;
    let r = BigUint::one() << (k - 1);
    let rep = stability_report(&m, &r, 10_000).unwrap();
    assert_eq!(rep.straight_paths, (k - 1) as u64);
    assert_eq!(rep.splits, 0);
    assert_eq!(rep.terminals, 1);
    assert!(rep.exhausted());
    assert_eq!(rep.ratio(), NO_SPLIT_SENTINEL);
}

/// 表2: ホライズン走査の全規模
#[test]
fn test_table2_horizon_scan() {
    let config = ExperimentConfig::default();
    let mut rng = StdRng::seed_from_u64(42);
    let rows = horizon_scan(&config, &mut rng).unwrap();

    assert_eq!(rows.len(), 7);
    let bits: Vec<u64> = rows.iter().map(|r| r.bits).collect();
    assert_eq!(bits, vec![10, 50, 100, 300, 500, 750, 1000]);
    assert_eq!(rows[0].context, HorizonContext::Supercomputer);
    assert_eq!(rows[2].context, HorizonContext::Cosmological);
    assert_eq!(rows[6].context, HorizonContext::Theoretical);

    for row in &rows {
        assert!(row.residue.bit(0));
        assert!(row.residue.bits() <= row.bits);
        assert!(row.ratio.is_finite());
        assert!(row.ratio >= 0.0);
        let m = BigUint::one() << row.bits;
        assert_eq!(row.ratio, stability_ratio(&m, &row.residue, config.horizon_budget).unwrap());
    }
}

#[test]
fn test_horizon_residue_large() {
    let mut rng = StdRng::seed_from_u64(1);
    let r = horizon_residue(1000, &mut rng);
    assert!(r.bit(0));
    assert!(r.bits() <= 1000);
}

/// 並列バッチは入力順を保つ
#[test]
fn test_parallel_batch_large() {
    let classes: Vec<(BigUint, BigUint)> = (0..32u64)
        .map(|i| (BigUint::one() << (100 + i), (BigUint::one() << 99u32) + BigUint::from(2 * i + 1)))
        .collect();
    let par = stability_ratios_parallel(&classes, 500).unwrap();
    assert_eq!(par.len(), 32);
    for ((m, r), ratio) in classes.iter().zip(&par) {
        assert_eq!(*ratio, stability_ratio(m, r, 500).unwrap());
    }
}
