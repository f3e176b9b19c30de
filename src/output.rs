//! CLI と GUI が共有する出力まわり（保存ファイル名、比率の表示）。

use chrono::{Local, NaiveDateTime};
use num_bigint::BigUint;

use crate::stability::StabilityReport;

/// ファイル名に埋め込む数の短縮表記。16桁を超えたら "<ビット長>bit"。
pub fn short_n(n: &BigUint) -> String {
    let s = n.to_string();
    if s.len() <= 16 {
        s
    } else {
        format!("{}bit", n.bits())
    }
}

pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format("%Y%m%d_%H%M%S").to_string()
}

/// ローカル時刻の YYYYMMDD_hhmmss
pub fn timestamp() -> String {
    format_timestamp(&Local::now().naive_local())
}

/// 遷移木 DOT の保存名
pub fn tree_filename(residue: &BigUint, modulus: &BigUint, depth: u64, stamp: &str) -> String {
    format!("tree_{}_{}_d{}_{}.dot", short_n(residue), short_n(modulus), depth, stamp)
}

/// 比率の表示。分岐なしの判定は番兵値との比較ではなく分岐数で行う
/// （合流 50・分岐 1 の本物の 50.0 と区別するため）。
pub fn format_ratio(report: &StabilityReport) -> String {
    match report.raw_ratio() {
        Some(r) => format!("{:.4}", r),
        None => format!("{:.4} (分岐なし)", report.ratio()),
    }
}
