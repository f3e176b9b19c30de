use num_bigint::BigUint;
use thiserror::Error;

/// エンジン全体のエラー型
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MaporaError {
    /// 法 m が 0（剰余類として定義できない）
    #[error("invalid residue class: modulus must be >= 1 (got {modulus})")]
    InvalidState { modulus: BigUint },

    /// 実験パラメータの不整合
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, MaporaError>;
