use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use mvi_core::{FullReport, MviEngine, MviError, ValidityRecord};

use super::{ConfigOverrides, SignalFile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AnalyzeView {
    Summary,
    Detailed,
}

impl AnalyzeView {
    fn parse(s: &str) -> Self {
        match s {
            "detailed" => Self::Detailed,
            _ => Self::Summary,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Detailed => "detailed",
        }
    }
}

pub struct AnalyzeCommandConfig<'a> {
    pub signal_path: &'a str,
    pub ranking: bool,
    pub output_path: Option<&'a str>,
    pub view: &'a str,
    pub overrides: ConfigOverrides<'a>,
}

pub fn run(cfg: AnalyzeCommandConfig<'_>) {
    let view = AnalyzeView::parse(cfg.view);
    let config = cfg.overrides.build().unwrap_or_else(|e| super::fail(e));
    let (signal, names) = SignalFile::read(Path::new(cfg.signal_path))
        .and_then(SignalFile::into_signal)
        .unwrap_or_else(|e| super::fail(e));

    println!(
        "Analyzing {} ({} channels, {} samples @ {} Hz, {:.1}s; view: {})...\n",
        cfg.signal_path,
        signal.channels(),
        signal.samples(),
        signal.sfreq(),
        signal.duration_secs(),
        view.as_str()
    );

    let engine = MviEngine::new(config).unwrap_or_else(|e| super::fail(e));

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        log::warn!("Ctrl+C handler unavailable: {e}");
    }

    let t0 = Instant::now();
    let report = match engine.analyze_full(&signal, Some(cancel.as_ref())) {
        Ok(report) => report,
        Err(MviError::Cancelled { window }) => {
            eprintln!("Cancelled at window {window}; no report written.");
            std::process::exit(130);
        }
        Err(e) => super::fail(e),
    };
    log::debug!("analysis took {:.2}s", t0.elapsed().as_secs_f64());

    print_global(&report);
    if view == AnalyzeView::Detailed {
        print_channels(&names);
        print_windows(&report);
    }
    if cfg.ranking {
        print_ranking(&report);
    }

    if let Some(path) = cfg.output_path {
        let result = if cfg.ranking {
            super::write_json(path, &report)
        } else {
            super::write_json(path, &report.clone().into_report())
        };
        match result {
            Ok(()) => println!("\nResults written to {path}"),
            Err(e) => eprintln!("\n{e}"),
        }
    }
}

fn print_global(report: &FullReport) {
    let g = &report.global;
    println!("  ┌─ Global");
    println!("  │ FE1:             {:.4}", g.fe1);
    println!("  │ Effective rank:  {:.3} / {}", g.effective_rank, report.channels);
    println!(
        "  │ Dimension:       {:.3}{}",
        g.dimension,
        if g.dimension_reliable { "" } else { " (unreliable)" }
    );
    for band in &g.bands {
        println!(
            "  │ φ {:<12}  {:.4}  [{}]",
            band.name, band.fraction, band.filter
        );
    }
    println!("  │ MVI:             {:.4} (threshold {})", g.mvi, report.threshold);
    println!("  │ Decision:        {}", report.decision);
    print_diagnostics(g);
    println!("  └─ {} windows of {} samples", report.windows.len(), report.window.window_samples);
}

fn print_diagnostics(record: &ValidityRecord) {
    for d in &record.diagnostics {
        println!("  │ ! {d}");
    }
}

fn print_channels(names: &[String]) {
    println!("\n  Channels: {}", names.join(", "));
}

fn print_windows(report: &FullReport) {
    println!();
    println!(
        "  {:>5} {:>8} {:>7} {:>7} {:>7} {:>7} {:>9}",
        "#", "start_s", "FE1", "rank", "D", "φmax", "MVI"
    );
    for w in &report.windows {
        let r = &w.record;
        println!(
            "  {:>5} {:>8.2} {:>7.4} {:>7.3} {:>7.3} {:>7.4} {:>9.5}{}",
            w.index,
            w.start_secs,
            r.fe1,
            r.effective_rank,
            r.dimension,
            r.phi_max,
            r.mvi,
            if r.diagnostics.is_empty() { "" } else { " !" }
        );
    }
}

fn print_ranking(report: &FullReport) {
    let ranking = &report.ranking;
    println!();
    println!("  ┌─ Band relevance ({:?} basis)", ranking.basis);
    for s in ranking.ordered() {
        println!(
            "  │ {:<12} relevance {:.4}  mean φ {:.4}  corr {:+.3}  rank score {:.3}",
            s.name, s.relevance, s.mean_phi, s.correlation, s.rank_score
        );
    }
    for d in &ranking.diagnostics {
        println!("  │ ! {d}");
    }
    match &ranking.most_relevant {
        Some(name) => println!("  └─ Most relevant band: {name}"),
        None => println!("  └─ No bands configured"),
    }
}
