//! End-to-end pipeline tests over synthetic speakers and stub face models.

use std::io::Cursor;
use std::sync::{Arc, OnceLock};

use examgate_audio::encode_mono16;
use examgate_face::{BoundingBox, FaceDetector, FaceEncoder, FaceError};
use examgate_gmm::{GmmConfig, Ubm};
use examgate_store::ModelStore;
use image::{Rgb, RgbImage};

use crate::{calibrate, Decision, Enroller, ProctorEvent, Scorer, ScorerConfig, VerifyError};

// ---- synthetic audio fixtures ----

/// Deterministic pseudo-noise in [-0.5, 0.5).
fn jitter(seed: u32, i: u32) -> f32 {
    let x = seed
        .wrapping_mul(2654435761)
        .wrapping_add(i.wrapping_mul(40503))
        .wrapping_add(12345);
    (x % 10_000) as f32 / 10_000.0 - 0.5
}

/// A synthetic "speaker": a fixed chord of sines with speaker-specific
/// frequencies plus low-level variant-specific noise. Distinct speakers
/// occupy distinct spectral shapes, which is all the MFCC-GMM pipeline
/// needs to separate them.
fn speaker_wav(speaker: u32, variant: u32, secs: f32) -> Vec<u8> {
    let n = (16000.0 * secs) as usize;
    let f0 = 110.0 + speaker as f32 * 85.0;
    let samples: Vec<f32> = (0..n)
        .map(|i| {
            let t = i as f32 / 16000.0;
            let mut s = 0.45 * (2.0 * std::f32::consts::PI * f0 * t).sin()
                + 0.25 * (2.0 * std::f32::consts::PI * f0 * 2.1 * t).sin()
                + 0.15 * (2.0 * std::f32::consts::PI * f0 * 3.3 * t).sin();
            s += 0.02 * jitter(speaker * 31 + variant, i as u32);
            s * 0.8
        })
        .collect();
    encode_mono16(&samples, 16000)
}

fn test_gmm_cfg(seed: u64) -> GmmConfig {
    GmmConfig {
        n_components: 4,
        n_init: 1,
        max_iter: 25,
        tol: 1e-3,
        reg_covar: 1e-6,
        seed: Some(seed),
    }
}

/// Background model pooled over three synthetic speakers, built once.
fn shared_ubm() -> Arc<Ubm> {
    static UBM: OnceLock<Arc<Ubm>> = OnceLock::new();
    UBM.get_or_init(|| {
        let mut frames = Vec::new();
        for speaker in 0..3 {
            let wav = speaker_wav(speaker, 900 + speaker, 4.0);
            frames.extend(examgate_audio::extract_voice_features(&wav).unwrap());
        }
        Arc::new(Ubm::train(&frames, &test_gmm_cfg(99)).unwrap())
    })
    .clone()
}

// ---- stub face capabilities ----

/// Detector returning a fixed box list.
struct StubDetector {
    boxes: Vec<BoundingBox>,
}

impl StubDetector {
    fn full_frame() -> Self {
        Self {
            boxes: vec![BoundingBox {
                x1: 0.0,
                y1: 0.0,
                x2: 32.0,
                y2: 32.0,
                confidence: 0.95,
            }],
        }
    }

    fn none() -> Self {
        Self { boxes: Vec::new() }
    }

    fn two_faces() -> Self {
        Self {
            boxes: vec![
                BoundingBox {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 16.0,
                    y2: 32.0,
                    confidence: 0.9,
                },
                BoundingBox {
                    x1: 16.0,
                    y1: 0.0,
                    x2: 32.0,
                    y2: 32.0,
                    confidence: 0.8,
                },
            ],
        }
    }
}

impl FaceDetector for StubDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<BoundingBox>, FaceError> {
        Ok(self.boxes.clone())
    }
}

/// Encoder embedding a crop as its L2-normalized mean color.
struct MeanColorEncoder;

impl FaceEncoder for MeanColorEncoder {
    fn encode(&self, face: &RgbImage) -> Result<Vec<f32>, FaceError> {
        let n = (face.width() * face.height()) as f32;
        let mut acc = [0.0f32; 3];
        for p in face.pixels() {
            for c in 0..3 {
                acc[c] += p.0[c] as f32;
            }
        }
        let mut v: Vec<f32> = acc.iter().map(|&a| a / n / 255.0).collect();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }

    fn dimension(&self) -> usize {
        3
    }
}

fn color_png(r: u8, g: u8, b: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(32, 32, Rgb([r, g, b]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

// ---- harness ----

struct Rig {
    _dir: tempfile::TempDir,
    store: ModelStore,
    enroller: Enroller,
    scorer: Scorer,
}

fn rig_with(detector: StubDetector, cfg: ScorerConfig, seed: u64) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let ubm = shared_ubm();
    let detector: Arc<dyn FaceDetector> = Arc::new(detector);
    let encoder: Arc<dyn FaceEncoder> = Arc::new(MeanColorEncoder);

    let enroller = Enroller::new(
        store.clone(),
        ubm.clone(),
        test_gmm_cfg(seed),
        detector.clone(),
        encoder.clone(),
    );
    let scorer = Scorer::new(store.clone(), ubm, detector, encoder, cfg);
    Rig {
        _dir: dir,
        store,
        enroller,
        scorer,
    }
}

fn rig(seed: u64) -> Rig {
    rig_with(StubDetector::full_frame(), ScorerConfig::default(), seed)
}

fn enroll_speaker(rig: &Rig, user: &str, speaker: u32) {
    let samples: Vec<Vec<u8>> = (0..3).map(|v| speaker_wav(speaker, v, 4.0)).collect();
    rig.enroller.enroll_voice(user, &samples).unwrap();
}

// ---- voice pipeline ----

#[test]
fn genuine_speaker_accepted_impostor_rejected() {
    let r = rig(1);
    enroll_speaker(&r, "alice", 0);

    let genuine = r.scorer.verify_voice("alice", &speaker_wav(0, 7, 4.0)).unwrap();
    assert!(genuine.accepted, "genuine llr {}", genuine.score);

    let impostor = r.scorer.verify_voice("alice", &speaker_wav(5, 7, 4.0)).unwrap();
    assert!(!impostor.accepted, "impostor llr {}", impostor.score);
    assert!(genuine.score > impostor.score);
}

#[test]
fn llr_operand_order_flips_polarity() {
    let r = rig(2);
    enroll_speaker(&r, "alice", 0);
    let mut model = r.store.load_voice_model("alice").unwrap().unwrap();

    let llr = r.scorer.voice_llr(&model, &speaker_wav(0, 8, 4.0)).unwrap();
    assert!(llr > 0.0, "genuine sample must out-score the background: {llr}");

    // Pin the effective threshold at zero so the decision is exactly the
    // sign of the ratio, then check the swapped subtraction inverts it.
    model.threshold = model.margin;
    let effective = model.effective_threshold();
    let swapped = -llr;
    assert!(llr > effective, "correct order accepts");
    assert!(!(swapped > effective), "swapped order must reject");
}

#[test]
fn voice_boundary_is_strict_reject() {
    let r = rig(3);
    enroll_speaker(&r, "alice", 0);
    let mut model = r.store.load_voice_model("alice").unwrap().unwrap();

    let sample = speaker_wav(0, 9, 4.0);
    let llr = r.scorer.voice_llr(&model, &sample).unwrap();

    // Pin the effective threshold exactly at this sample's llr.
    model.threshold = llr + model.margin;
    r.store.save_voice_model(&model).unwrap();
    let at_boundary = r.scorer.verify_voice("alice", &sample).unwrap();
    assert!(!at_boundary.accepted, "llr == threshold - margin must reject");

    // A hair below the llr flips it to accept.
    model.threshold = llr + model.margin - 1e-6;
    r.store.save_voice_model(&model).unwrap();
    let above = r.scorer.verify_voice("alice", &sample).unwrap();
    assert!(above.accepted);
}

#[test]
fn enrollment_is_idempotent_in_outcome() {
    let held_out = speaker_wav(0, 42, 4.0);

    // Two independently initialized trainings over the same sample set.
    let r1 = rig(10);
    enroll_speaker(&r1, "alice", 0);
    let d1 = r1.scorer.verify_voice("alice", &held_out).unwrap();

    let r2 = rig(11);
    enroll_speaker(&r2, "alice", 0);
    let d2 = r2.scorer.verify_voice("alice", &held_out).unwrap();

    assert!(d1.accepted && d2.accepted, "{} / {}", d1.score, d2.score);
}

#[test]
fn persisted_model_decision_survives_reload() {
    let r = rig(12);
    enroll_speaker(&r, "alice", 0);
    let sample = speaker_wav(0, 13, 4.0);
    let before = r.scorer.verify_voice("alice", &sample).unwrap();

    // Fresh store handle over the same root: decision must match.
    let reopened = Scorer::new(
        r.store.clone(),
        shared_ubm(),
        Arc::new(StubDetector::full_frame()),
        Arc::new(MeanColorEncoder),
        ScorerConfig::default(),
    );
    let after = reopened.verify_voice("alice", &sample).unwrap();
    assert_eq!(before.accepted, after.accepted);
}

#[test]
fn unenrolled_user_is_model_not_trained() {
    let r = rig(13);
    let err = r.scorer.verify_voice("ghost", &speaker_wav(0, 1, 4.0)).unwrap_err();
    assert!(matches!(err, VerifyError::ModelNotTrained { .. }));
}

#[test]
fn unusable_samples_are_insufficient() {
    let r = rig(14);
    let err = r
        .enroller
        .enroll_voice("alice", &[b"not audio".to_vec(), b"also not".to_vec()])
        .unwrap_err();
    assert!(matches!(err, VerifyError::InsufficientEnrollmentData));
}

#[test]
fn garbage_audio_fails_extraction_not_acceptance() {
    let r = rig(15);
    enroll_speaker(&r, "alice", 0);
    let err = r.scorer.verify_voice("alice", b"garbage").unwrap_err();
    assert!(matches!(err, VerifyError::Audio(_)));
}

// ---- face pipeline ----

#[test]
fn face_enroll_and_verify_same_image_accepts() {
    let r = rig(20);
    r.enroller.enroll_face("bob", &color_png(200, 40, 40)).unwrap();

    let same = r.scorer.verify_face("bob", &color_png(200, 40, 40)).unwrap();
    assert!(same.accepted);
    assert!(same.score < 1e-3, "distance {}", same.score);

    let different = r.scorer.verify_face("bob", &color_png(40, 60, 220)).unwrap();
    assert!(!different.accepted, "distance {}", different.score);
}

#[test]
fn face_boundary_is_inclusive_accept() {
    let r = rig(21);
    r.enroller.enroll_face("bob", &color_png(255, 0, 0)).unwrap();
    let model = r.store.load_face_model("bob").unwrap().unwrap();

    // Pin the threshold exactly at the live sample's distance.
    let live = color_png(0, 255, 0);
    let distance = r.scorer.face_distance(&model.embedding, &live).unwrap();
    let pinned = rig_with(
        StubDetector::full_frame(),
        ScorerConfig {
            face_threshold: distance,
        },
        22,
    );
    pinned.enroller.enroll_face("bob", &color_png(255, 0, 0)).unwrap();
    let at_boundary = pinned.scorer.verify_face("bob", &live).unwrap();
    assert!(
        at_boundary.accepted,
        "distance == threshold must accept (non-strict)"
    );
}

#[test]
fn face_enroll_persists_augmentation_set() {
    let r = rig(23);
    r.enroller.enroll_face("bob", &color_png(120, 80, 40)).unwrap();
    let artifacts = r.store.list_face_augmented("bob").unwrap();
    let names: Vec<String> = artifacts
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    for expected in [
        "original.png",
        "flip.png",
        "rot_p15.png",
        "rot_m15.png",
        "bright_p20.png",
        "bright_m20.png",
    ] {
        assert!(names.contains(&expected.to_string()), "missing {expected}");
    }
    // The live model is the single original embedding.
    let model = r.store.load_face_model("bob").unwrap().unwrap();
    assert_eq!(model.embedding.len(), 3);
}

#[test]
fn face_enroll_without_face_fails() {
    let r = rig_with(StubDetector::none(), ScorerConfig::default(), 24);
    let err = r.enroller.enroll_face("bob", &color_png(1, 2, 3)).unwrap_err();
    assert!(matches!(err, VerifyError::Face(FaceError::NoFaceDetected)));
}

// ---- proctoring ----

#[test]
fn proctor_match_and_missmatch() {
    let r = rig(30);
    r.enroller.enroll_face("bob", &color_png(10, 200, 10)).unwrap();

    match r.scorer.proctor_check("bob", &color_png(10, 200, 10)) {
        ProctorEvent::Match { distance } => assert!(distance < 1e-3),
        other => panic!("expected Match, got {other:?}"),
    }
    match r.scorer.proctor_check("bob", &color_png(200, 10, 10)) {
        ProctorEvent::MissMatch { distance } => assert!(distance > 0.5),
        other => panic!("expected MissMatch, got {other:?}"),
    }
}

#[test]
fn proctor_flags_multiple_faces() {
    let r = rig_with(StubDetector::two_faces(), ScorerConfig::default(), 31);
    r.store
        .save_face_model(&examgate_store::FaceModel {
            user_id: "bob".into(),
            embedding: vec![1.0, 0.0, 0.0],
        })
        .unwrap();
    match r.scorer.proctor_check("bob", &color_png(1, 2, 3)) {
        ProctorEvent::MultipleFaces { count } => assert_eq!(count, 2),
        other => panic!("expected MultipleFaces, got {other:?}"),
    }
}

#[test]
fn proctor_no_face_is_error_event() {
    let r = rig_with(StubDetector::none(), ScorerConfig::default(), 32);
    r.store
        .save_face_model(&examgate_store::FaceModel {
            user_id: "bob".into(),
            embedding: vec![1.0, 0.0, 0.0],
        })
        .unwrap();
    assert!(matches!(
        r.scorer.proctor_check("bob", &color_png(1, 2, 3)),
        ProctorEvent::Error { .. }
    ));
}

// ---- calibration against real scores ----

#[test]
fn calibration_from_live_scores_separates_speakers() {
    let r = rig(40);
    enroll_speaker(&r, "alice", 0);
    let model = r.store.load_voice_model("alice").unwrap().unwrap();

    let pos: Vec<f64> = (20..23)
        .map(|v| r.scorer.voice_llr(&model, &speaker_wav(0, v, 4.0)).unwrap())
        .collect();
    let neg: Vec<f64> = (20..23)
        .map(|v| r.scorer.voice_llr(&model, &speaker_wav(6, v, 4.0)).unwrap())
        .collect();

    let cal = calibrate(&pos, &neg, model.threshold).unwrap();
    assert_eq!(cal.accuracy, 1.0, "pos {pos:?} neg {neg:?}");

    // Persist the calibrated operating point and confirm a genuine sample
    // still clears it.
    let mut updated = model;
    updated.threshold = cal.threshold;
    updated.margin = cal.margin;
    r.store.save_voice_model(&updated).unwrap();
    let Decision { accepted, .. } = r
        .scorer
        .verify_voice("alice", &speaker_wav(0, 30, 4.0))
        .unwrap();
    assert!(accepted);
}

// ---- background training ----

#[tokio::test]
async fn enrollment_runs_off_the_request_path() {
    let r = rig(50);
    let enroller = Arc::new(r.enroller);
    let samples: Vec<Vec<u8>> = (0..3).map(|v| speaker_wav(1, v, 4.0)).collect();

    let model = crate::enroll_voice_task(enroller, "carol".to_string(), samples)
        .await
        .unwrap();
    assert!(model.is_trained);
    assert!(r.store.load_voice_model("carol").unwrap().is_some());
}
