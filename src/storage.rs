use anyhow::{Context, Result};
use faceid_match::Encoding;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Enrolled face as kept on disk: the encoding stays in its serialized JSON
/// form and is only parsed when a gallery is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFace {
    pub identity: String,
    pub encoding: String,
}

/// Source of enrolled faces, read fresh for every recognition request.
pub trait GalleryStore {
    fn load(&self) -> Result<Vec<StoredFace>>;
}

impl GalleryStore for Vec<StoredFace> {
    fn load(&self) -> Result<Vec<StoredFace>> {
        Ok(self.clone())
    }
}

/// Gallery kept as a postcard file under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn faces_path(&self) -> PathBuf {
        self.root.join("faces.bin")
    }

    /// Replace the gallery file via a sibling temp file, so an interrupted
    /// write leaves the previous gallery intact.
    fn write(&self, faces: &[StoredFace]) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating {}", self.root.display()))?;
        let file = self.faces_path();
        let tmp = file.with_extension("tmp");
        let data = postcard::to_allocvec(faces)?;

        let written = std::fs::File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(&data)?;
                f.sync_all()
            })
            .with_context(|| format!("writing {}", tmp.display()));
        let written = written.and_then(|()| {
            std::fs::rename(&tmp, &file)
                .with_context(|| format!("replacing {}", file.display()))
        });

        if written.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        written
    }

    /// Store `encoding` for `identity`, replacing any earlier enrollment.
    pub fn enroll(&self, identity: &str, encoding: &Encoding) -> Result<()> {
        let mut faces = self.load()?;
        let encoding = encoding.to_json()?;

        match faces.iter_mut().find(|f| f.identity == identity) {
            Some(existing) => {
                log::info!("Replacing enrolled face for {}", identity);
                existing.encoding = encoding;
            }
            None => faces.push(StoredFace {
                identity: identity.to_string(),
                encoding,
            }),
        }

        self.write(&faces)
    }

    /// Returns whether `identity` was enrolled.
    pub fn remove(&self, identity: &str) -> Result<bool> {
        let mut faces = self.load()?;
        let before = faces.len();
        faces.retain(|f| f.identity != identity);
        if faces.len() == before {
            return Ok(false);
        }
        self.write(&faces)?;
        Ok(true)
    }

    pub fn purge(&self) -> Result<()> {
        let file = self.faces_path();
        if file.exists() {
            std::fs::remove_file(&file).with_context(|| format!("removing {}", file.display()))?;
        }
        Ok(())
    }
}

impl GalleryStore for FileStore {
    fn load(&self) -> Result<Vec<StoredFace>> {
        let file = self.faces_path();

        if !file.exists() {
            return Ok(vec![]);
        }

        let data = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
        postcard::from_bytes(&data).with_context(|| format!("decoding {}", file.display()))
    }
}
