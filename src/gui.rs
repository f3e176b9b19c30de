#![windows_subsystem = "windows"]

use collatz_mapora::experiment::{self, ExperimentConfig};
use collatz_mapora::graph::{validate_graph_depth, GRAPH_ROOT_LABEL};
use collatz_mapora::output::{format_ratio, timestamp, tree_filename};
use collatz_mapora::*;
use eframe::egui;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};
use num_bigint::BigUint;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collatz_mapora=warn".into()),
        )
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_title("Collatz Mapora (merge/split stability)"),
        ..Default::default()
    };
    eframe::run_native(
        "collatz-mapora",
        options,
        Box::new(|cc| {
            setup_japanese_font(&cc.egui_ctx);
            Ok(Box::new(MaporaApp::default()))
        }),
    )
}

fn setup_japanese_font(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();
    let font_paths = [
        "C:\\Windows\\Fonts\\YuGothR.ttc",
        "C:\\Windows\\Fonts\\meiryo.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/System/Library/Fonts/ヒラギノ角ゴシック W3.ttc",
    ];
    for path in &font_paths {
        if let Ok(data) = std::fs::read(path) {
            fonts.font_data.insert(
                "japanese".to_owned(),
                egui::FontData::from_owned(data),
            );
            fonts.families
                .entry(egui::FontFamily::Proportional)
                .or_default()
                .insert(0, "japanese".to_owned());
            fonts.families
                .entry(egui::FontFamily::Monospace)
                .or_default()
                .push("japanese".to_owned());
            break;
        }
    }
    ctx.set_fonts(fonts);
}

fn output_dir() -> PathBuf {
    let dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join("output")))
        .unwrap_or_else(|| PathBuf::from("output"));
    std::fs::create_dir_all(&dir).ok();
    dir
}

// ─── データ構造 ─────────────────────────────────────

#[derive(PartialEq)]
enum Tab { Ratio, Fibonacci, Horizon, Tree }

/// バックグラウンド実験の共有状態
#[derive(Default)]
struct JobState<T> {
    running: bool,
    elapsed_ms: u128,
    error: Option<String>,
    result: Option<T>,
}

type Shared<T> = Arc<Mutex<JobState<T>>>;

struct TreeSummary {
    nodes: usize,
    merges: usize,
    split_points: usize,
    leaves: usize,
    save_path: String,
}

struct MaporaApp {
    tab: Tab,
    seed_input: String,
    // 単発
    modulus_input: String,
    residue_input: String,
    budget_input: String,
    ratio_result: Option<Result<StabilityReport, String>>,
    // 実験
    fib_state: Shared<Vec<FibonacciRow>>,
    horizon_state: Shared<Vec<HorizonRow>>,
    // 遷移木
    tree_modulus_input: String,
    tree_residue_input: String,
    tree_depth_input: String,
    tree_result: Option<Result<TreeSummary, String>>,
}

impl Default for MaporaApp {
    fn default() -> Self {
        Self {
            tab: Tab::Ratio,
            seed_input: String::new(),
            modulus_input: "32".to_string(),
            residue_input: "987".to_string(),
            budget_input: "400".to_string(),
            ratio_result: None,
            fib_state: Arc::new(Mutex::new(JobState::default())),
            horizon_state: Arc::new(Mutex::new(JobState::default())),
            tree_modulus_input: "32".to_string(),
            tree_residue_input: "16".to_string(),
            tree_depth_input: "14".to_string(),
            tree_result: None,
        }
    }
}

fn is_running<T>(state: &Shared<T>) -> bool {
    state.lock().map(|s| s.running).unwrap_or(false)
}

impl eframe::App for MaporaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if is_running(&self.fib_state) || is_running(&self.horizon_state) {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Collatz Mapora");
                ui.separator();
                ui.label("seed:");
                ui.add(egui::TextEdit::singleline(&mut self.seed_input).desired_width(80.0).hint_text("random"));
                ui.separator();
                ui.selectable_value(&mut self.tab, Tab::Ratio, "安定性比率");
                ui.selectable_value(&mut self.tab, Tab::Fibonacci, "フィボナッチ");
                ui.selectable_value(&mut self.tab, Tab::Horizon, "ホライズン");
                ui.selectable_value(&mut self.tab, Tab::Tree, "遷移木");
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            match self.tab {
                Tab::Ratio => self.ui_ratio(ui),
                Tab::Fibonacci => self.ui_fibonacci(ui),
                Tab::Horizon => self.ui_horizon(ui),
                Tab::Tree => self.ui_tree(ui),
            }
        });
    }
}

impl MaporaApp {
    fn config(&self) -> ExperimentConfig {
        ExperimentConfig {
            seed: self.seed_input.trim().parse::<u64>().ok(),
            ..Default::default()
        }
    }

    // ─── 単発 ──────────────────────────────
    fn ui_ratio(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("residue =");
            ui.add(egui::TextEdit::singleline(&mut self.residue_input).desired_width(160.0));
            ui.label("mod");
            ui.add(egui::TextEdit::singleline(&mut self.modulus_input).desired_width(160.0));
            ui.label("予算:");
            ui.add(egui::TextEdit::singleline(&mut self.budget_input).desired_width(60.0));
            if ui.button("計算").clicked() {
                self.ratio_result = Some(self.run_ratio());
            }
        });
        ui.separator();

        match &self.ratio_result {
            Some(Ok(rep)) => {
                egui::Grid::new("ratio_grid").striped(true).show(ui, |ui| {
                    ui.label("合流"); ui.label(format!("{}", rep.straight_paths)); ui.end_row();
                    ui.label("分岐"); ui.label(format!("{}", rep.splits)); ui.end_row();
                    ui.label("処理節点"); ui.label(format!("{}", rep.nodes_processed)); ui.end_row();
                    ui.label("4-2-1 終端"); ui.label(format!("{}", rep.terminals)); ui.end_row();
                    ui.label("最大深さ"); ui.label(format!("{}", rep.max_depth)); ui.end_row();
                    ui.label("残りフロンティア"); ui.label(format!("{}", rep.frontier_remaining)); ui.end_row();
                    ui.label("安定性比率"); ui.label(format_ratio(rep)); ui.end_row();
                });
            }
            Some(Err(e)) => {
                ui.colored_label(egui::Color32::from_rgb(220, 50, 50), e);
            }
            None => {}
        }
    }

    fn run_ratio(&self) -> Result<StabilityReport, String> {
        let m = BigUint::from_str(self.modulus_input.trim()).map_err(|e| format!("modulus: {}", e))?;
        let r = BigUint::from_str(self.residue_input.trim()).map_err(|e| format!("residue: {}", e))?;
        let budget = self.budget_input.trim().parse::<u64>().map_err(|e| format!("予算: {}", e))?;
        stability_report(&m, &r, budget).map_err(|e| e.to_string())
    }

    // ─── フィボナッチ ──────────────────────────────
    fn ui_fibonacci(&mut self, ui: &mut egui::Ui) {
        let running = is_running(&self.fib_state);
        ui.horizontal(|ui| {
            ui.add_enabled_ui(!running, |ui| {
                if ui.button("実験1: フィボナッチ構造張力").clicked() {
                    let config = self.config();
                    spawn_job(&self.fib_state, move || {
                        let mut rng = config.rng();
                        experiment::fibonacci_stress_test(&config, &mut rng)
                    });
                }
            });
            if running {
                ui.spinner();
            }
        });
        ui.separator();

        let Ok(state) = self.fib_state.lock() else { return };
        if let Some(e) = &state.error {
            ui.colored_label(egui::Color32::from_rgb(220, 50, 50), e);
        }
        if let Some(rows) = &state.result {
            ui.label(format!("計算時間 {}ms", state.elapsed_ms));
            let fib: Vec<[f64; 2]> = rows.iter().map(|r| [r.index as f64, r.fib_ratio]).collect();
            let rnd: Vec<[f64; 2]> = rows.iter().map(|r| [r.index as f64, r.random_ratio]).collect();
            let anomalies: Vec<[f64; 2]> = rows
                .iter()
                .filter(|r| r.anomalous)
                .map(|r| [r.index as f64, r.fib_ratio])
                .collect();
            Plot::new("fib_plot")
                .legend(Legend::default())
                .height(280.0)
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new(PlotPoints::from(fib)).name("Fibonacci"));
                    plot_ui.line(Line::new(PlotPoints::from(rnd)).name("Random"));
                    plot_ui.points(
                        Points::new(PlotPoints::from(anomalies))
                            .radius(4.0)
                            .color(egui::Color32::from_rgb(231, 76, 60))
                            .name("anomaly"),
                    );
                });

            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Grid::new("fib_grid").striped(true).show(ui, |ui| {
                    ui.label("INDEX"); ui.label("F"); ui.label("NET"); ui.label("FIB"); ui.label("RND"); ui.label("DELTA"); ui.end_row();
                    for r in rows {
                        ui.label(format!("F_{}", r.index));
                        ui.label(r.value.to_string());
                        ui.label(format!("2^{}", r.net_bits));
                        ui.label(format!("{:.4}", r.fib_ratio));
                        ui.label(format!("{:.4}", r.random_ratio));
                        if r.anomalous {
                            ui.colored_label(egui::Color32::from_rgb(220, 50, 50), format!("{:+.4}", r.delta));
                        } else {
                            ui.label(format!("{:+.4}", r.delta));
                        }
                        ui.end_row();
                    }
                });
            });
        }
    }

    // ─── ホライズン ──────────────────────────────
    fn ui_horizon(&mut self, ui: &mut egui::Ui) {
        let running = is_running(&self.horizon_state);
        ui.horizontal(|ui| {
            ui.add_enabled_ui(!running, |ui| {
                if ui.button("実験2: ホライズン走査").clicked() {
                    let config = self.config();
                    spawn_job(&self.horizon_state, move || {
                        let mut rng = config.rng();
                        experiment::horizon_scan(&config, &mut rng)
                    });
                }
            });
            if running {
                ui.spinner();
            }
        });
        ui.separator();

        let Ok(state) = self.horizon_state.lock() else { return };
        if let Some(e) = &state.error {
            ui.colored_label(egui::Color32::from_rgb(220, 50, 50), e);
        }
        if let Some(rows) = &state.result {
            ui.label(format!("計算時間 {}ms", state.elapsed_ms));
            let bars: Vec<Bar> = rows
                .iter()
                .enumerate()
                .map(|(i, r)| Bar::new(i as f64, r.ratio).name(format!("2^{} ({})", r.bits, r.context)))
                .collect();
            Plot::new("horizon_plot")
                .height(280.0)
                .show(ui, |plot_ui| {
                    plot_ui.bar_chart(BarChart::new(bars).name("stability ratio"));
                });

            egui::Grid::new("horizon_grid").striped(true).show(ui, |ui| {
                ui.label("MAGNITUDE"); ui.label("CONTEXT"); ui.label("RATIO"); ui.end_row();
                for r in rows {
                    ui.label(format!("2^{}", r.bits));
                    ui.label(r.context.to_string());
                    ui.label(format!("{:.4}", r.ratio));
                    ui.end_row();
                }
            });
        }
    }

    // ─── 遷移木 ──────────────────────────────
    fn ui_tree(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("residue =");
            ui.add(egui::TextEdit::singleline(&mut self.tree_residue_input).desired_width(120.0));
            ui.label("mod");
            ui.add(egui::TextEdit::singleline(&mut self.tree_modulus_input).desired_width(120.0));
            ui.label("深さ:");
            ui.add(egui::TextEdit::singleline(&mut self.tree_depth_input).desired_width(40.0));
            if ui.button("DOT保存").clicked() {
                self.tree_result = Some(self.build_tree());
            }
        });
        ui.separator();

        match &self.tree_result {
            Some(Ok(t)) => {
                egui::Grid::new("tree_grid").striped(true).show(ui, |ui| {
                    ui.label("節点"); ui.label(format!("{}", t.nodes)); ui.end_row();
                    ui.label("合流辺"); ui.label(format!("{}", t.merges)); ui.end_row();
                    ui.label("分岐点"); ui.label(format!("{}", t.split_points)); ui.end_row();
                    ui.label("葉"); ui.label(format!("{}", t.leaves)); ui.end_row();
                });
                ui.colored_label(egui::Color32::GREEN, format!("保存: {}", t.save_path));
            }
            Some(Err(e)) => {
                ui.colored_label(egui::Color32::from_rgb(220, 50, 50), e);
            }
            None => {}
        }
    }

    fn build_tree(&self) -> Result<TreeSummary, String> {
        let m = BigUint::from_str(self.tree_modulus_input.trim()).map_err(|e| format!("modulus: {}", e))?;
        let r = BigUint::from_str(self.tree_residue_input.trim()).map_err(|e| format!("residue: {}", e))?;
        let depth = self.tree_depth_input.trim().parse::<u64>().map_err(|e| format!("深さ: {}", e))?;
        validate_graph_depth(depth).map_err(|e| e.to_string())?;

        let root = ResidueClass::new(m.clone(), r.clone(), GRAPH_ROOT_LABEL).map_err(|e| e.to_string())?;
        let graph = TransitionGraph::build(root, depth);
        let title = format!("Residue {} on Mod {}", r, m);
        let path = output_dir().join(tree_filename(&r, &m, depth, &timestamp()));
        std::fs::write(&path, graph.to_dot(&title))
            .map_err(|e| format!("保存失敗: {}: {}", path.display(), e))?;
        let save_path = path.display().to_string();

        Ok(TreeSummary {
            nodes: graph.nodes.len(),
            merges: graph.merge_edges(),
            split_points: graph.split_points(),
            leaves: graph.leaves(),
            save_path,
        })
    }
}

/// 実験をバックグラウンドスレッドで走らせ、終了時に共有状態へ書き戻す
fn spawn_job<T, F>(state: &Shared<T>, job: F)
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, MaporaError> + Send + 'static,
{
    if let Ok(mut s) = state.lock() {
        s.running = true;
        s.error = None;
    }
    let state = Arc::clone(state);
    thread::spawn(move || {
        let timer = Instant::now();
        let outcome = job();
        if let Ok(mut s) = state.lock() {
            s.running = false;
            s.elapsed_ms = timer.elapsed().as_millis();
            match outcome {
                Ok(v) => s.result = Some(v),
                Err(e) => s.error = Some(e.to_string()),
            }
        }
    });
}
