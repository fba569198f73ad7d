use std::fs;
use std::path::{Path, PathBuf};

use examgate_gmm::Ubm;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::{FaceModel, StoreError, VoiceModel};

/// Filesystem-backed store for biometric artifacts.
///
/// Layout under the data root:
///
/// ```text
/// ubm.bin                          background (scaler, GMM) pair, fixed location
/// voice/<user>.bin                 VoiceModel
/// voice_samples/<user>/NNN.wav     raw enrollment audio, append-only
/// face/<user>.bin                  FaceModel
/// face/<user>.photo                optional reference photo
/// face_aug/<user>/<kind>.png       augmented crops (derived artifacts)
/// face_tests/<user>/NNN.img        labeled evaluation images
/// ```
///
/// Writes happen only on operator-driven enrollment; verification reads
/// concurrently without locking.
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    /// Opens a store rooted at `root`. Directories are created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The fixed, well-known UBM artifact path.
    pub fn ubm_path(&self) -> PathBuf {
        self.root.join("ubm.bin")
    }

    fn voice_path(&self, user_id: &str) -> PathBuf {
        self.root.join("voice").join(format!("{user_id}.bin"))
    }

    fn face_path(&self, user_id: &str) -> PathBuf {
        self.root.join("face").join(format!("{user_id}.bin"))
    }

    fn face_photo_path(&self, user_id: &str) -> PathBuf {
        self.root.join("face").join(format!("{user_id}.photo"))
    }

    fn voice_samples_dir(&self, user_id: &str) -> PathBuf {
        self.root.join("voice_samples").join(user_id)
    }

    fn face_aug_dir(&self, user_id: &str) -> PathBuf {
        self.root.join("face_aug").join(user_id)
    }

    fn face_tests_dir(&self, user_id: &str) -> PathBuf {
        self.root.join("face_tests").join(user_id)
    }

    // ---- UBM ----

    /// Loads the background model. Called once at startup; a missing or
    /// corrupt UBM is fatal, not skippable.
    pub fn load_ubm(&self) -> Result<Ubm, StoreError> {
        let path = self.ubm_path();
        if !path.exists() {
            return Err(StoreError::UbmMissing {
                path: path.display().to_string(),
            });
        }
        read_blob(&path)
    }

    /// Persists the background model at its fixed location.
    pub fn save_ubm(&self, ubm: &Ubm) -> Result<(), StoreError> {
        write_blob(&self.ubm_path(), ubm)?;
        info!("saved background model");
        Ok(())
    }

    // ---- Voice models ----

    /// Loads a user's voice model. `Ok(None)` when none is enrolled;
    /// a corrupt blob is an error.
    pub fn load_voice_model(&self, user_id: &str) -> Result<Option<VoiceModel>, StoreError> {
        read_optional_blob(&self.voice_path(user_id))
    }

    /// Persists a voice model, overwriting any previous one for the user.
    pub fn save_voice_model(&self, model: &VoiceModel) -> Result<(), StoreError> {
        write_blob(&self.voice_path(&model.user_id), model)?;
        info!(user = %model.user_id, "saved voice model");
        Ok(())
    }

    // ---- Voice samples ----

    /// Appends a raw enrollment/test sample for the user. Samples are
    /// retained for retraining until explicitly bulk-deleted.
    pub fn add_voice_sample(&self, user_id: &str, wav_bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let dir = self.voice_samples_dir(user_id);
        fs::create_dir_all(&dir)?;
        let n = fs::read_dir(&dir)?.count();
        let path = dir.join(format!("{n:03}.wav"));
        fs::write(&path, wav_bytes)?;
        debug!(user = %user_id, path = %path.display(), "retained voice sample");
        Ok(path)
    }

    /// Lists retained sample paths in insertion order.
    pub fn list_voice_samples(&self, user_id: &str) -> Result<Vec<PathBuf>, StoreError> {
        list_dir_sorted(&self.voice_samples_dir(user_id))
    }

    /// Bulk-deletes every retained sample for the user.
    pub fn delete_voice_samples(&self, user_id: &str) -> Result<(), StoreError> {
        let dir = self.voice_samples_dir(user_id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            info!(user = %user_id, "deleted voice samples");
        }
        Ok(())
    }

    // ---- Face models ----

    /// Loads a user's face model. `Ok(None)` when none is enrolled.
    pub fn load_face_model(&self, user_id: &str) -> Result<Option<FaceModel>, StoreError> {
        read_optional_blob(&self.face_path(user_id))
    }

    /// Persists a face model, overwriting any previous one for the user.
    pub fn save_face_model(&self, model: &FaceModel) -> Result<(), StoreError> {
        write_blob(&self.face_path(&model.user_id), model)?;
        info!(user = %model.user_id, "saved face model");
        Ok(())
    }

    /// Stores the reference photo alongside the face model.
    pub fn save_face_photo(&self, user_id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.face_photo_path(user_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(())
    }

    /// Stores one augmented crop as a derived artifact.
    pub fn save_face_augmented(
        &self,
        user_id: &str,
        kind: &str,
        png_bytes: &[u8],
    ) -> Result<(), StoreError> {
        let dir = self.face_aug_dir(user_id);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(format!("{kind}.png")), png_bytes)?;
        Ok(())
    }

    /// Lists augmented artifact paths for the user.
    pub fn list_face_augmented(&self, user_id: &str) -> Result<Vec<PathBuf>, StoreError> {
        list_dir_sorted(&self.face_aug_dir(user_id))
    }

    /// Removes the face model together with every derived artifact:
    /// the reference photo and the augmented crop set.
    pub fn delete_face(&self, user_id: &str) -> Result<(), StoreError> {
        let model = self.face_path(user_id);
        if model.exists() {
            fs::remove_file(&model)?;
        }
        let photo = self.face_photo_path(user_id);
        if photo.exists() {
            fs::remove_file(&photo)?;
        }
        let aug = self.face_aug_dir(user_id);
        if aug.exists() {
            fs::remove_dir_all(&aug)?;
        }
        info!(user = %user_id, "deleted face model and derived artifacts");
        Ok(())
    }

    // ---- Face test images ----

    /// Appends a labeled evaluation image for the user.
    pub fn add_face_test_image(&self, user_id: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let dir = self.face_tests_dir(user_id);
        fs::create_dir_all(&dir)?;
        let n = fs::read_dir(&dir)?.count();
        let path = dir.join(format!("{n:03}.img"));
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Lists evaluation image paths for the user.
    pub fn list_face_test_images(&self, user_id: &str) -> Result<Vec<PathBuf>, StoreError> {
        list_dir_sorted(&self.face_tests_dir(user_id))
    }

    /// Lists every user id with a stored face model.
    pub fn list_face_users(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join("face");
        let mut users = Vec::new();
        if dir.exists() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|e| e == "bin") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        users.push(stem.to_string());
                    }
                }
            }
        }
        users.sort();
        Ok(users)
    }
}

fn write_blob<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let blob = rmp_serde::to_vec_named(value).map_err(|e| StoreError::Encode(e.to_string()))?;
    fs::write(path, blob)?;
    Ok(())
}

fn read_blob<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let blob = fs::read(path)?;
    rmp_serde::from_slice(&blob).map_err(|e| StoreError::Corrupt {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn read_optional_blob<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    read_blob(path).map(Some)
}

fn list_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    paths.sort();
    Ok(paths)
}
