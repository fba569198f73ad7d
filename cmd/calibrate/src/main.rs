//! calibrate - Offline threshold calibration for enrolled voice models.
//!
//! Scores every WAV in a genuine and an impostor directory against a
//! user's stored model, sweeps candidate thresholds, persists the
//! accuracy-maximizing operating point, and optionally writes a JSON
//! evaluation report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use examgate_store::ModelStore;
use examgate_verify::{calibrate, voice_llr, Calibration, ClassReport, ConfusionMatrix, Trial, NO_MATCH};
use tracing::{info, warn};

/// Offline threshold calibration for enrolled voice models.
#[derive(Parser, Debug)]
#[command(name = "calibrate")]
#[command(about = "Sweep thresholds over validation scores and update a voice model")]
struct Args {
    /// Model store root directory
    #[arg(long)]
    data_root: PathBuf,

    /// User id whose voice model to calibrate
    #[arg(long)]
    user: String,

    /// Directory of genuine-speaker validation WAVs
    #[arg(long)]
    pos: PathBuf,

    /// Directory of impostor validation WAVs
    #[arg(long)]
    neg: PathBuf,

    /// Write a JSON evaluation report to this file
    #[arg(short = 'o', long)]
    report: Option<PathBuf>,

    /// Compute and print the operating point without persisting it
    #[arg(long)]
    dry_run: bool,
}

/// JSON report written with `--report`.
#[derive(Debug, serde::Serialize)]
struct Report {
    user: String,
    calibration: Calibration,
    confusion: ConfusionMatrix,
    classes: Vec<ClassReport>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let store = ModelStore::new(&args.data_root);
    let ubm = store.load_ubm().context("loading background model")?;
    let mut model = store
        .load_voice_model(&args.user)
        .context("loading voice model")?
        .filter(|m| m.is_trained)
        .with_context(|| format!("user {} has no trained voice model", args.user))?;

    let pos_scores = score_dir(&args.pos, |bytes| voice_llr(&ubm, &model, bytes))?;
    let neg_scores = score_dir(&args.neg, |bytes| voice_llr(&ubm, &model, bytes))?;
    if pos_scores.is_empty() || neg_scores.is_empty() {
        bail!(
            "need at least one usable WAV on each side (pos: {}, neg: {})",
            pos_scores.len(),
            neg_scores.len()
        );
    }
    info!(
        pos = pos_scores.len(),
        neg = neg_scores.len(),
        "scored validation sets"
    );

    let cal = calibrate(&pos_scores, &neg_scores, model.threshold)?;
    println!(
        "user {}: threshold {:.4} margin {:.4} (accuracy {:.3}, FAR {:.3}, FRR {:.3})",
        args.user, cal.threshold, cal.margin, cal.accuracy, cal.far, cal.frr
    );

    if let Some(path) = &args.report {
        let trials = build_trials(&args.user, &pos_scores, &neg_scores, cal.threshold);
        let confusion = ConfusionMatrix::from_trials(&trials);
        let report = Report {
            user: args.user.clone(),
            calibration: cal.clone(),
            classes: confusion.report(),
            confusion,
        };
        fs::write(path, serde_json::to_vec_pretty(&report)?)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(path = %path.display(), "wrote evaluation report");
    }

    if args.dry_run {
        println!("dry run: model left unchanged");
        return Ok(());
    }

    model.threshold = cal.threshold;
    model.margin = cal.margin;
    store.save_voice_model(&model)?;
    println!("updated stored operating point for {}", args.user);
    Ok(())
}

/// Scores every `.wav` under `dir`, skipping unusable files with a warning.
fn score_dir(dir: &Path, mut score: impl FnMut(&[u8]) -> Result<f64, examgate_verify::VerifyError>) -> Result<Vec<f64>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("wav")))
        .collect();
    paths.sort();

    let mut scores = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = fs::read(&path)?;
        match score(&bytes) {
            Ok(s) => scores.push(s),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unusable sample"),
        }
    }
    Ok(scores)
}

/// Labels each validation score under the chosen threshold the way the
/// sweep counts them: genuine files belong to the user, impostor files to
/// the synthetic no-match class.
fn build_trials(user: &str, pos: &[f64], neg: &[f64], threshold: f64) -> Vec<Trial> {
    let predict = |score: f64| {
        if score >= threshold {
            user.to_string()
        } else {
            NO_MATCH.to_string()
        }
    };
    pos.iter()
        .map(|&s| Trial {
            actual: user.to_string(),
            predicted: predict(s),
        })
        .chain(neg.iter().map(|&s| Trial {
            actual: NO_MATCH.to_string(),
            predicted: predict(s),
        }))
        .collect()
}
