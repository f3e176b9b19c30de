use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use std::fmt;

use crate::error::{MaporaError, Result};

/// 安定性走査で使う根のラベル
pub const ROOT_LABEL: &str = "ROOT";

/// 剰余類 {m*k + r : k ≥ 0} を表す不変の状態。
///
/// `label` は根からの導出経路（D=半減, M=3n+1, A/B=分岐の半分）で、
/// 可視化と追跡のためだけに使う。遷移規則は `modulus` と `residue` のみを見る。
///
/// `residue` は法で再正規化しない（`987 mod 32` のような入力もそのまま受け付ける）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueClass {
    modulus: BigUint,
    residue: BigUint,
    label: String,
    depth: u64,
}

/// 1ステップ遷移の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// 決定的な後続（合流 / 直進路）
    Merge(ResidueClass),
    /// パリティが法から決まらない（分岐）
    Split,
}

impl Transition {
    pub fn is_split(&self) -> bool {
        matches!(self, Transition::Split)
    }
}

impl ResidueClass {
    /// 深さ 0 の状態を作る。法が 0 なら `InvalidState`。
    pub fn new(modulus: BigUint, residue: BigUint, label: impl Into<String>) -> Result<Self> {
        if modulus.is_zero() {
            return Err(MaporaError::InvalidState { modulus });
        }
        Ok(ResidueClass {
            modulus,
            residue,
            label: label.into(),
            depth: 0,
        })
    }

    /// ラベル "ROOT" の根
    pub fn root(modulus: BigUint, residue: BigUint) -> Result<Self> {
        Self::new(modulus, residue, ROOT_LABEL)
    }

    pub fn from_u64(modulus: u64, residue: u64) -> Result<Self> {
        Self::root(BigUint::from(modulus), BigUint::from(residue))
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn residue(&self) -> &BigUint {
        &self.residue
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn depth(&self) -> u64 {
        self.depth
    }

    /// 親から1遷移で導出された子。深さは必ず親 + 1。
    fn derive(&self, modulus: BigUint, residue: BigUint, suffix: char) -> Self {
        let mut label = String::with_capacity(self.label.len() + 1);
        label.push_str(&self.label);
        label.push(suffix);
        ResidueClass {
            modulus,
            residue,
            label,
            depth: self.depth + 1,
        }
    }

    /// 遷移規則。
    ///
    /// - r 偶数, m 偶数: 類全体を半減 → (m/2, r/2)
    /// - r 偶数, m 奇数: 構成員のパリティが混在 → 分岐
    /// - r 奇数: 3n+1 を類全体に適用 → (3m, 3r+1)。奇数剰余は分岐しない。
    pub fn next_state(&self) -> Transition {
        if self.residue.is_even() {
            if self.modulus.is_even() {
                let m = &self.modulus >> 1u32;
                let r = &self.residue >> 1u32;
                Transition::Merge(self.derive(m, r, 'D'))
            } else {
                Transition::Split
            }
        } else {
            let m = &self.modulus * 3u32;
            let r = &self.residue * 3u32 + 1u32;
            Transition::Merge(self.derive(m, r, 'M'))
        }
    }

    /// 分岐した類を法 2m で二分する: A = (2m, r), B = (2m, r+m)。
    pub fn split_children(&self) -> (ResidueClass, ResidueClass) {
        let m2 = &self.modulus << 1u32;
        let r_b = &self.residue + &self.modulus;
        let a = self.derive(m2.clone(), self.residue.clone(), 'A');
        let b = self.derive(m2, r_b, 'B');
        (a, b)
    }

    /// 4-2-1 サイクル到達判定: r == 1 かつ m 偶数。
    /// スケールされた記述子のパターン一致しか見ない（元の整数列での到達は検証しない）。
    pub fn is_terminal(&self) -> bool {
        self.residue.is_one() && self.modulus.is_even()
    }
}

impl fmt::Display for ResidueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mod {} [{} @{}]", self.residue, self.modulus, self.label, self.depth)
    }
}
