use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use collatz_mapora::experiment::{self, ExperimentConfig};
use collatz_mapora::graph::GRAPH_ROOT_LABEL;
use collatz_mapora::output::{format_ratio, short_n, timestamp, tree_filename};
use collatz_mapora::*;
use num_bigint::BigUint;
use std::fs::File;
use std::io::{BufWriter, Write as IoWrite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// コラッツ剰余類 遷移エンジン (合流/分岐 安定性比率)
///
/// 結果は自動的に output/ フォルダに保存されます。
#[derive(Parser)]
#[command(name = "collatz-mapora", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 1つの剰余類の安定性比率
    Ratio {
        modulus: String,
        residue: String,
        #[arg(long, default_value_t = 400)]
        budget: u64,
    },
    /// 実験1: フィボナッチ構造張力 (ランダム対照と比較)
    Fib {
        #[arg(long)]
        budget: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        from: Option<usize>,
        #[arg(long)]
        to: Option<usize>,
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f64>,
    },
    /// 実験2: ホライズン走査 (2^bits 規模)
    Horizon {
        #[arg(long)]
        budget: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
        /// カンマ区切りのビット数 (例: 10,50,100)
        #[arg(long, value_delimiter = ',')]
        scales: Option<Vec<u64>>,
    },
    /// 遷移木を DOT 形式で出力
    Tree {
        residue: String,
        modulus: String,
        #[arg(long)]
        depth: Option<u64>,
        #[arg(long)]
        title: Option<String>,
    },
}

fn output_dir() -> Result<PathBuf> {
    let dir = PathBuf::from("output");
    std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
    Ok(dir)
}

fn parse_n(s: &str) -> Result<BigUint> {
    BigUint::from_str(s).with_context(|| format!("数値を解析できません: {}", s))
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collatz_mapora=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Ratio { modulus, residue, budget } => cmd_ratio(&modulus, &residue, budget),
        Command::Fib { budget, seed, from, to, threshold } => {
            let mut config = ExperimentConfig { seed, ..Default::default() };
            if let Some(b) = budget {
                config.fib_budget = b;
            }
            if let Some(f) = from {
                config.fib_from = f;
            }
            if let Some(t) = to {
                config.fib_to = t;
            }
            if let Some(t) = threshold {
                config.anomaly_threshold = t;
            }
            cmd_fib(&config)
        }
        Command::Horizon { budget, seed, scales } => {
            let mut config = ExperimentConfig { seed, ..Default::default() };
            if let Some(b) = budget {
                config.horizon_budget = b;
            }
            if let Some(s) = scales {
                config.horizon_scales = s;
            }
            cmd_horizon(&config)
        }
        Command::Tree { residue, modulus, depth, title } => cmd_tree(&residue, &modulus, depth, title),
    };

    if let Err(e) = result {
        eprintln!("エラー: {:#}", e);
        std::process::exit(1);
    }
}

fn cmd_ratio(modulus: &str, residue: &str, budget: u64) -> Result<()> {
    let m = parse_n(modulus)?;
    let r = parse_n(residue)?;

    let timer = Instant::now();
    let report = stability_report(&m, &r, budget)?;
    let elapsed = timer.elapsed();

    println!("剰余類 = {} mod {}", r, m);
    println!("節点予算 = {}", budget);
    println!();
    println!("--- 結果 ---");
    println!("合流 (直進路)   = {}", report.straight_paths);
    println!("分岐            = {}", report.splits);
    println!("処理節点数      = {}", report.nodes_processed);
    println!("4-2-1 終端      = {}", report.terminals);
    println!("最大深さ        = {}", report.max_depth);
    println!("残りフロンティア = {}{}", report.frontier_remaining, if report.exhausted() { " (全探索)" } else { " (予算で打ち切り)" });
    println!("安定性比率      = {}", format_ratio(&report));
    println!("計算時間        = {:?}", elapsed);

    let filename = format!("ratio_{}_{}_b{}_{}.txt", short_n(&r), short_n(&m), budget, timestamp());
    let path = output_dir()?.join(&filename);
    let mut f = File::create(&path).with_context(|| format!("cannot write {}", path.display()))?;
    writeln!(f, "# collatz-mapora ratio")?;
    writeln!(f, "modulus = {}", m)?;
    writeln!(f, "residue = {}", r)?;
    writeln!(f, "node_budget = {}", budget)?;
    writeln!(f, "straight_paths = {}", report.straight_paths)?;
    writeln!(f, "splits = {}", report.splits)?;
    writeln!(f, "nodes_processed = {}", report.nodes_processed)?;
    writeln!(f, "terminals = {}", report.terminals)?;
    writeln!(f, "max_depth = {}", report.max_depth)?;
    writeln!(f, "frontier_remaining = {}", report.frontier_remaining)?;
    writeln!(f, "ratio = {}", report.ratio())?;
    writeln!(f, "elapsed = {:?}", elapsed)?;
    println!("\n保存: {}", path.display());
    Ok(())
}

fn cmd_fib(config: &ExperimentConfig) -> Result<()> {
    let mut rng = config.rng();
    println!("--- 実験1: フィボナッチ構造張力 (予算 {}) ---", config.fib_budget);

    let timer = Instant::now();
    let rows = experiment::fibonacci_stress_test(config, &mut rng)?;
    let elapsed = timer.elapsed();

    println!("{:<6} | {:<10} | {:<10} | {:<10} | {:<10} | DELTA", "INDEX", "F_VAL", "NET SIZE", "FIB RATIO", "RND RATIO");
    println!("{}", "-".repeat(75));
    for row in &rows {
        let mark = if row.anomalous { "⚠" } else { "" };
        println!(
            "F_{:<4} | {:<10} | 2^{:<8} | {:<10.4} | {:<10.4} | {:+.4} {}",
            row.index, short_n(&row.value), row.net_bits, row.fib_ratio, row.random_ratio, row.delta, mark
        );
    }
    println!("{}", "-".repeat(75));
    let anomalies = rows.iter().filter(|r| r.anomalous).count();
    println!("異常 (delta < {}) = {} / {}", config.anomaly_threshold, anomalies, rows.len());
    println!("計算時間 = {:?}", elapsed);

    let filename = format!("fib_{}-{}_b{}_{}.csv", config.fib_from, config.fib_to, config.fib_budget, timestamp());
    let path = output_dir()?.join(&filename);
    let file = File::create(&path).with_context(|| format!("cannot write {}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "index,fib,net_bits,control,fib_ratio,random_ratio,delta,anomalous")?;
    for row in &rows {
        writeln!(
            w,
            "{},{},{},{},{},{},{},{}",
            row.index, row.value, row.net_bits, row.control, row.fib_ratio, row.random_ratio, row.delta, row.anomalous
        )?;
    }
    w.flush()?;
    println!("\nCSV保存: {}", path.display());
    Ok(())
}

fn cmd_horizon(config: &ExperimentConfig) -> Result<()> {
    let mut rng = config.rng();
    println!("--- 実験2: ホライズン走査 (予算 {}) ---", config.horizon_budget);

    let timer = Instant::now();
    let rows = experiment::horizon_scan(config, &mut rng)?;
    let elapsed = timer.elapsed();

    println!("{:<15} | {:<20} | STABILITY RATIO", "MAGNITUDE", "CONTEXT");
    println!("{}", "-".repeat(65));
    for row in &rows {
        let bar = "█".repeat((row.ratio * 4.0) as usize);
        println!("2^{:<13} | {:<20} | {:.4} {}", row.bits, row.context, row.ratio, bar);
    }
    println!("{}", "-".repeat(65));
    println!("計算時間 = {:?}", elapsed);

    let filename = format!("horizon_b{}_{}.csv", config.horizon_budget, timestamp());
    let path = output_dir()?.join(&filename);
    let file = File::create(&path).with_context(|| format!("cannot write {}", path.display()))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "bits,context,ratio,residue")?;
    for row in &rows {
        writeln!(w, "{},{},{},{}", row.bits, row.context, row.ratio, row.residue)?;
    }
    w.flush()?;
    println!("\nCSV保存: {}", path.display());
    Ok(())
}

fn cmd_tree(residue: &str, modulus: &str, depth: Option<u64>, title: Option<String>) -> Result<()> {
    let r = parse_n(residue)?;
    let m = parse_n(modulus)?;
    let config = ExperimentConfig {
        graph_depth: depth.unwrap_or(ExperimentConfig::default().graph_depth),
        ..Default::default()
    };
    config.validate_graph()?;
    let depth = config.graph_depth;
    let title = title.unwrap_or_else(|| format!("Residue {} on Mod {}", r, m));

    let root = ResidueClass::new(m.clone(), r.clone(), GRAPH_ROOT_LABEL)?;
    let graph = TransitionGraph::build(root, depth);

    println!("遷移木: {} mod {}, 深さ上限 {}", r, m, depth);
    println!("節点 = {}", graph.nodes.len());
    println!("合流辺 = {}", graph.merge_edges());
    println!("分岐点 = {}", graph.split_points());
    println!("葉 = {}", graph.leaves());

    let filename = tree_filename(&r, &m, depth, &timestamp());
    let path = output_dir()?.join(&filename);
    std::fs::write(&path, graph.to_dot(&title)).with_context(|| format!("cannot write {}", path.display()))?;
    println!("\nDOT保存: {} (dot -Tpng で描画)", path.display());
    Ok(())
}
