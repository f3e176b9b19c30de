use num_bigint::BigUint;
use std::collections::VecDeque;

use crate::error::Result;
use crate::state::{ResidueClass, Transition};

/// 分岐が一度も観測されなかったときの比率。
/// 無限大の代わりに有限の大きな値を返し、下流の集計・閾値比較を壊さない。
pub const NO_SPLIT_SENTINEL: f64 = 50.0;

/// 実験で使う既定の節点予算
pub const DEFAULT_NODE_BUDGET: u64 = 400;

/// 1回の走査の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StabilityReport {
    /// 合流（直進路）の数
    pub straight_paths: u64,
    /// 分岐の数
    pub splits: u64,
    /// 取り出して処理した状態の数（終端を含む）
    pub nodes_processed: u64,
    /// 4-2-1 終端判定に当たった状態の数
    pub terminals: u64,
    /// 予算切れで破棄されたフロンティアの大きさ
    pub frontier_remaining: usize,
    /// 処理した状態の最大深さ
    pub max_depth: u64,
}

impl StabilityReport {
    /// 安定性比率 = 合流 / 分岐。分岐ゼロなら `NO_SPLIT_SENTINEL`。
    pub fn ratio(&self) -> f64 {
        self.raw_ratio().unwrap_or(NO_SPLIT_SENTINEL)
    }

    /// 分岐ゼロのとき `None`
    pub fn raw_ratio(&self) -> Option<f64> {
        if self.splits == 0 {
            None
        } else {
            Some(self.straight_paths as f64 / self.splits as f64)
        }
    }

    /// フロンティアを使い切って終了したか（予算で打ち切られていないか）
    pub fn exhausted(&self) -> bool {
        self.frontier_remaining == 0
    }
}

/// 根から幅優先（FIFO）で剰余類を展開し、合流/分岐を数える。
///
/// 再帰は使わず、明示的なキューと節点予算で探索を打ち切る。
/// FIFO 順は予算内でどの状態が探索されるかを決めるので、変えてはいけない。
pub struct StabilityTraversal {
    root: ResidueClass,
    node_budget: u64,
}

impl StabilityTraversal {
    pub fn new(root: ResidueClass) -> Self {
        StabilityTraversal {
            root,
            node_budget: DEFAULT_NODE_BUDGET,
        }
    }

    pub fn with_budget(mut self, node_budget: u64) -> Self {
        self.node_budget = node_budget;
        self
    }

    pub fn run(self) -> StabilityReport {
        self.run_with_callback(|_, _| {})
    }

    /// 処理した状態ごとに (状態, 遷移) でコールバックを呼ぶ版。
    /// 終端に当たった状態では呼ばない。
    pub fn run_with_callback(self, mut on_step: impl FnMut(&ResidueClass, &Transition)) -> StabilityReport {
        let mut frontier: VecDeque<ResidueClass> = VecDeque::new();
        frontier.push_back(self.root);
        let mut report = StabilityReport::default();

        while report.nodes_processed < self.node_budget {
            let Some(curr) = frontier.pop_front() else {
                break;
            };
            report.max_depth = report.max_depth.max(curr.depth());

            // 4-2-1 ループ入り: 後続は積まず、合流/分岐にも数えない
            if curr.is_terminal() {
                report.terminals += 1;
                report.nodes_processed += 1;
                continue;
            }

            let transition = curr.next_state();
            on_step(&curr, &transition);
            match transition {
                Transition::Merge(next) => {
                    report.straight_paths += 1;
                    frontier.push_back(next);
                }
                Transition::Split => {
                    report.splits += 1;
                    let (a, b) = curr.split_children();
                    frontier.push_back(a);
                    frontier.push_back(b);
                }
            }

            report.nodes_processed += 1;
        }

        report.frontier_remaining = frontier.len();
        tracing::debug!(
            budget = self.node_budget,
            nodes = report.nodes_processed,
            merges = report.straight_paths,
            splits = report.splits,
            terminals = report.terminals,
            remaining = report.frontier_remaining,
            "stability traversal finished"
        );
        report
    }
}

/// 剰余類 (modulus, residue) の安定性比率を節点予算内で求める。
/// 法が 0 のときだけエラー。予算 0 は何も処理せず番兵値を返す。
pub fn stability_ratio(modulus: &BigUint, residue: &BigUint, node_budget: u64) -> Result<f64> {
    Ok(stability_report(modulus, residue, node_budget)?.ratio())
}

/// `stability_ratio` の集計全体を返す版
pub fn stability_report(modulus: &BigUint, residue: &BigUint, node_budget: u64) -> Result<StabilityReport> {
    let root = ResidueClass::root(modulus.clone(), residue.clone())?;
    Ok(StabilityTraversal::new(root).with_budget(node_budget).run())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(m: u64, r: u64, budget: u64) -> StabilityReport {
        stability_report(&BigUint::from(m), &BigUint::from(r), budget).unwrap()
    }

    #[test]
    fn test_pure_halving_chain_hits_terminal() {
        // 16/32 → 8/16 → 4/8 → 2/4 → 1/2 (終端)
        let rep = report(32, 16, 400);
        assert_eq!(rep.straight_paths, 4);
        assert_eq!(rep.splits, 0);
        assert_eq!(rep.terminals, 1);
        assert_eq!(rep.nodes_processed, 5);
        assert!(rep.exhausted());
        assert_eq!(rep.ratio(), NO_SPLIT_SENTINEL);
        assert_eq!(rep.raw_ratio(), None);
    }

    #[test]
    fn test_budget_truncates() {
        let rep = report(32, 16, 2);
        assert_eq!(rep.nodes_processed, 2);
        assert_eq!(rep.straight_paths, 2);
        assert_eq!(rep.frontier_remaining, 1);
        assert!(!rep.exhausted());
    }

    #[test]
    fn test_zero_budget() {
        let rep = report(3, 4, 0);
        assert_eq!(rep.nodes_processed, 0);
        assert_eq!(rep.frontier_remaining, 1);
        assert_eq!(rep.ratio(), NO_SPLIT_SENTINEL);
    }

    #[test]
    fn test_first_step_split() {
        // 4 mod 3 は即分岐し、子 4 mod 6 と 7 mod 6 が積まれる
        let rep = report(3, 4, 1);
        assert_eq!(rep.splits, 1);
        assert_eq!(rep.straight_paths, 0);
        assert_eq!(rep.frontier_remaining, 2);
        assert_eq!(rep.ratio(), 0.0);
        assert_eq!(rep.raw_ratio(), Some(0.0));
    }

    #[test]
    fn test_fifo_order_a_before_b() {
        let root = ResidueClass::from_u64(3, 4).unwrap();
        let mut labels = Vec::new();
        StabilityTraversal::new(root)
            .with_budget(3)
            .run_with_callback(|s, _| labels.push(s.label().to_string()));
        assert_eq!(labels, vec!["ROOT", "ROOTA", "ROOTB"]);
    }

    #[test]
    fn test_ratio_value() {
        // 3/4 → 分岐、A=4/6 → D、B=7/6 → M : 合流 2, 分岐 1
        let rep = report(3, 4, 3);
        assert_eq!(rep.splits, 1);
        assert_eq!(rep.straight_paths, 2);
        assert_eq!(rep.ratio(), 2.0);
    }

    #[test]
    fn test_zero_modulus_is_error() {
        assert!(stability_ratio(&BigUint::from(0u64), &BigUint::from(1u64), 10).is_err());
    }
}
