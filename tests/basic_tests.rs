use collatz_mapora::*;
use num_bigint::BigUint;

fn rc(m: u64, r: u64) -> ResidueClass {
    ResidueClass::from_u64(m, r).unwrap()
}

// ===== 遷移規則の全域性 =====

/// 奇数剰余は常に合流（分岐しない）
#[test]
fn test_odd_residue_always_merges() {
    for m in 1u64..=200 {
        for r in (1..2 * m).step_by(2) {
            let s = rc(m, r);
            match s.next_state() {
                Transition::Merge(next) => {
                    assert_eq!(next.modulus(), &BigUint::from(3 * m), "m={} r={}", m, r);
                    assert_eq!(next.residue(), &BigUint::from(3 * r + 1), "m={} r={}", m, r);
                }
                Transition::Split => panic!("odd residue split: m={} r={}", m, r),
            }
        }
    }
}

/// 奇数法 + 偶数剰余は常に分岐
#[test]
fn test_odd_modulus_even_residue_always_splits() {
    for m in (1u64..=199).step_by(2) {
        for r in (0..2 * m).step_by(2) {
            assert!(rc(m, r).next_state().is_split(), "m={} r={}", m, r);
        }
    }
}

/// 偶数法 + 偶数剰余は常に半減
#[test]
fn test_even_even_halves() {
    for m in (2u64..=200).step_by(2) {
        for r in (0..2 * m).step_by(2) {
            match rc(m, r).next_state() {
                Transition::Merge(next) => {
                    assert_eq!(next.modulus(), &BigUint::from(m / 2));
                    assert_eq!(next.residue(), &BigUint::from(r / 2));
                    assert!(next.label().ends_with('D'));
                }
                Transition::Split => panic!("even/even split: m={} r={}", m, r),
            }
        }
    }
}

/// 分岐の子は法 2m、剰余 r と r+m で、再び遷移規則に通せる
#[test]
fn test_split_children_partition() {
    for m in (1u64..=99).step_by(2) {
        for r in (0..2 * m).step_by(2) {
            let s = rc(m, r);
            let (a, b) = s.split_children();
            assert_eq!(a.modulus(), &BigUint::from(2 * m));
            assert_eq!(b.modulus(), &BigUint::from(2 * m));
            assert_eq!(a.residue(), &BigUint::from(r));
            assert_eq!(b.residue(), &BigUint::from(r + m));
            // A は偶/偶 → 半減, B は奇数剰余 → 3n+1。どちらも分岐しない
            assert!(!a.next_state().is_split());
            assert!(!b.next_state().is_split());
        }
    }
}

// ===== 走査の不変条件 =====

/// 走査中に生成される全ての子は親の深さ + 1
#[test]
fn test_depth_monotonicity() {
    for (m, r) in [(32u64, 987u64), (3, 4), (64, 27), (1, 1), (81, 2)] {
        let mut checked = 0u64;
        StabilityTraversal::new(rc(m, r))
            .with_budget(500)
            .run_with_callback(|s, t| {
                match t {
                    Transition::Merge(next) => assert_eq!(next.depth(), s.depth() + 1),
                    Transition::Split => {
                        let (a, b) = s.split_children();
                        assert_eq!(a.depth(), s.depth() + 1);
                        assert_eq!(b.depth(), s.depth() + 1);
                    }
                }
                assert_eq!(s.label().len() as u64, "ROOT".len() as u64 + s.depth());
                checked += 1;
            });
        assert!(checked > 0);
    }
}

/// 処理節点数は予算を超えない
#[test]
fn test_budget_respected() {
    for m in 1u64..=64 {
        for r in 0..2 * m {
            for budget in [0u64, 1, 7, 100] {
                let rep = stability_report(&BigUint::from(m), &BigUint::from(r), budget).unwrap();
                assert!(rep.nodes_processed <= budget, "m={} r={} budget={}", m, r, budget);
                assert!(rep.straight_paths + rep.splits + rep.terminals == rep.nodes_processed);
            }
        }
    }
}

/// 分岐ゼロなら番兵値 50.0
#[test]
fn test_sentinel_on_zero_splits() {
    // 1 mod 1 → 4 mod 3 (合流のみ), 予算 1 では分岐に届かない
    let r = stability_ratio(&BigUint::from(1u64), &BigUint::from(1u64), 1).unwrap();
    assert_eq!(r, 50.0);
    assert_eq!(r, NO_SPLIT_SENTINEL);

    // 予算 2 では 4 mod 3 が分岐する
    let r = stability_ratio(&BigUint::from(1u64), &BigUint::from(1u64), 2).unwrap();
    assert_eq!(r, 1.0);
}

/// 比率は合流/分岐そのもの
#[test]
fn test_ratio_is_merge_over_split() {
    for (m, r) in [(32u64, 987u64), (64, 27), (128, 77)] {
        let rep = stability_report(&BigUint::from(m), &BigUint::from(r), 400).unwrap();
        if rep.splits > 0 {
            assert_eq!(rep.ratio(), rep.straight_paths as f64 / rep.splits as f64);
        } else {
            assert_eq!(rep.ratio(), NO_SPLIT_SENTINEL);
        }
    }
}

/// 同じ入力なら同じ結果（FIFO 順の再現性）
#[test]
fn test_deterministic() {
    let a = stability_report(&BigUint::from(1024u64), &BigUint::from(777u64), 1000).unwrap();
    let b = stability_report(&BigUint::from(1024u64), &BigUint::from(777u64), 1000).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_zero_modulus_rejected() {
    let err = stability_ratio(&BigUint::from(0u64), &BigUint::from(3u64), 100).unwrap_err();
    assert!(matches!(err, MaporaError::InvalidState { .. }));
}
