//! コラッツ写像の剰余類遷移エンジン（Mapora エンジン）
//!
//! 剰余類 r mod m をグラフの節点とみなし、1ステップの遷移が
//! 決定的（合流）かパリティ曖昧（分岐）かを分類する。
//! 根から節点予算内で幅優先に展開し、合流数/分岐数を「安定性比率」として返す。

pub mod error;
pub mod experiment;
pub mod graph;
pub mod output;
pub mod stability;
pub mod state;

pub use error::MaporaError;
pub use experiment::{fibonacci_stress_test, horizon_scan, stability_ratios_parallel, ExperimentConfig, FibonacciRow, HorizonContext, HorizonRow};
pub use graph::{EdgeKind, GraphEdge, GraphNode, TransitionGraph};
pub use stability::{stability_ratio, stability_report, StabilityReport, StabilityTraversal, NO_SPLIT_SENTINEL};
pub use state::{ResidueClass, Transition};
