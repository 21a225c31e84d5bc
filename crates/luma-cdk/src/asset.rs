//! Local assets referenced by templates.
//!
//! An asset is a directory (or file) on the synthesizing machine that is
//! published at deploy time: either zipped into the bootstrap bucket or built
//! into a container image. Declaring an asset never touches the filesystem;
//! the source is fingerprinted when the stack is synthesized, so a bad path
//! surfaces as [`CdkError::AssetNotFound`] at that point.
//!
//! Templates refer to the not-yet-known fingerprint through a placeholder
//! token (see [`hash_token`]) that synthesis substitutes.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::error::{CdkError, CdkResult};
use crate::synthesizer;
use crate::types::Environment;

/// How an asset is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Directory zipped and uploaded to the asset bucket.
    ZipDirectory,
    /// Single file uploaded as-is (used for stack templates).
    File,
    /// Directory built as a container image and pushed to the asset repository.
    ContainerImage,
}

/// An asset registered with a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Publishing mode.
    pub kind: AssetKind,
    /// Source path on the synthesizing machine.
    pub source: PathBuf,
    /// Construct path of the declaring construct.
    pub construct_path: String,
}

/// An asset whose source has been fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintedAsset {
    /// The declared asset.
    pub asset: Asset,
    /// Hex SHA-256 over the asset contents.
    pub hash: String,
}

/// Placeholder standing in for the fingerprint of the asset at `index`.
#[must_use]
pub fn hash_token(index: usize) -> String {
    format!("${{Token[AssetHash.{index}]}}")
}

/// Compute the content fingerprint of a file or directory.
///
/// Directories are hashed over their files in sorted relative-path order, each
/// contributing its `/`-separated relative path and its contents.
pub fn fingerprint(path: &Path) -> CdkResult<String> {
    let metadata = fs::metadata(path).map_err(|_| CdkError::AssetNotFound(path.to_owned()))?;
    let mut hasher = Sha256::new();

    if metadata.is_file() {
        hash_file(&mut hasher, path)?;
    } else {
        let mut files = Vec::new();
        collect_files(path, path, &mut files)?;
        files.sort();
        for relative in files {
            hasher.update(relative.as_bytes());
            hasher.update([0u8]);
            hash_file(&mut hasher, &path.join(&relative))?;
            hasher.update([0u8]);
        }
    }

    Ok(hex::encode(hasher.finalize().as_slice()))
}

fn hash_file(hasher: &mut Sha256, path: &Path) -> CdkResult<()> {
    let mut file = fs::File::open(path).map_err(CdkError::io(path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(CdkError::io(path))?;
        if n == 0 {
            return Ok(());
        }
        hasher.update(&buf[..n]);
    }
}

/// Collect the `/`-separated paths of all files under `dir`, relative to `root`.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> CdkResult<()> {
    for entry in fs::read_dir(dir).map_err(CdkError::io(dir))? {
        let entry = entry.map_err(CdkError::io(dir))?;
        let path = entry.path();
        let metadata = fs::metadata(&path).map_err(CdkError::io(&path))?;
        if metadata.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let relative: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            out.push(relative.join("/"));
        }
    }
    Ok(())
}

/// Copy an asset source into the assembly directory.
///
/// Staging is skipped when the destination already exists: its name embeds
/// the content hash, so an existing directory has the same contents.
pub fn stage(source: &Path, destination: &Path) -> CdkResult<()> {
    if destination.exists() {
        return Ok(());
    }
    let metadata = fs::metadata(source).map_err(|_| CdkError::AssetNotFound(source.to_owned()))?;
    if metadata.is_file() {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(CdkError::io(parent))?;
        }
        fs::copy(source, destination).map_err(CdkError::io(destination))?;
        return Ok(());
    }
    copy_dir(source, destination)
}

fn copy_dir(source: &Path, destination: &Path) -> CdkResult<()> {
    fs::create_dir_all(destination).map_err(CdkError::io(destination))?;
    for entry in fs::read_dir(source).map_err(CdkError::io(source))? {
        let entry = entry.map_err(CdkError::io(source))?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        if fs::metadata(&from).map_err(CdkError::io(&from))?.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(CdkError::io(&to))?;
        }
    }
    Ok(())
}

/// Builder for a stack's `<Stack>.assets.json` manifest.
#[derive(Debug)]
pub struct AssetManifest<'a> {
    env: Option<&'a Environment>,
    files: Map<String, Value>,
    docker_images: Map<String, Value>,
}

impl<'a> AssetManifest<'a> {
    /// Start an empty manifest for a stack deployed into `env`.
    #[must_use]
    pub fn new(env: Option<&'a Environment>) -> Self {
        Self {
            env,
            files: Map::new(),
            docker_images: Map::new(),
        }
    }

    /// Record an asset staged at `staged_path` (relative to the assembly root).
    pub fn add(&mut self, kind: AssetKind, hash: &str, staged_path: &str) {
        let env = self.env;
        let specialize = |s: &str| synthesizer::specialize(s, env);
        let destination = synthesizer::destination_id(env);

        match kind {
            AssetKind::ZipDirectory | AssetKind::File => {
                let (packaging, object_key) = if kind == AssetKind::File {
                    ("file", format!("{hash}.json"))
                } else {
                    ("zip", format!("{hash}.zip"))
                };
                let entry = json!({
                    "source": { "path": staged_path, "packaging": packaging },
                    "destinations": {
                        destination: {
                            "bucketName": specialize(&synthesizer::file_assets_bucket()),
                            "objectKey": object_key,
                            "assumeRoleArn":
                                specialize(&synthesizer::role_arn("file-publishing-role")),
                        }
                    }
                });
                self.files.insert(hash.to_owned(), entry);
            }
            AssetKind::ContainerImage => {
                let entry = json!({
                    "source": { "directory": staged_path },
                    "destinations": {
                        destination: {
                            "repositoryName":
                                specialize(&synthesizer::container_assets_repository()),
                            "imageTag": hash,
                            "assumeRoleArn":
                                specialize(&synthesizer::role_arn("image-publishing-role")),
                        }
                    }
                });
                self.docker_images.insert(hash.to_owned(), entry);
            }
        }
    }

    /// Render the manifest JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "version": synthesizer::CLOUD_ASSEMBLY_VERSION,
            "files": self.files,
            "dockerImages": self.docker_images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_should_fail_on_missing_asset() {
        let err = fingerprint(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, CdkError::AssetNotFound(_)));
    }

    #[test]
    fn test_should_fingerprint_identical_trees_identically() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for dir in [a.path(), b.path()] {
            write(dir, "index.html", "<html></html>");
            write(dir, "assets/app.js", "console.log(1)");
        }
        assert_eq!(
            fingerprint(a.path()).unwrap(),
            fingerprint(b.path()).unwrap()
        );
    }

    #[test]
    fn test_should_change_fingerprint_on_content_change() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "v1");
        let before = fingerprint(dir.path()).unwrap();
        write(dir.path(), "index.html", "v2");
        let after = fingerprint(dir.path()).unwrap();
        assert_ne!(before, after);
        assert_eq!(after.len(), 64);
    }

    #[test]
    fn test_should_change_fingerprint_on_rename() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "same");
        let before = fingerprint(dir.path()).unwrap();
        fs::rename(dir.path().join("a.txt"), dir.path().join("b.txt")).unwrap();
        assert_ne!(before, fingerprint(dir.path()).unwrap());
    }

    #[test]
    fn test_should_stage_directory_recursively() {
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "nested/deep/file.txt", "payload");
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("asset.abc");

        stage(src.path(), &dest).unwrap();

        let copied = fs::read_to_string(dest.join("nested/deep/file.txt")).unwrap();
        assert_eq!(copied, "payload");
    }

    #[test]
    fn test_should_build_manifest_entries() {
        let mut manifest = AssetManifest::new(None);
        manifest.add(AssetKind::ZipDirectory, "abc", "asset.abc");
        manifest.add(AssetKind::ContainerImage, "def", "asset.def");

        let json = manifest.to_json();
        let file = &json["files"]["abc"];
        assert_eq!(file["source"]["packaging"], "zip");
        assert_eq!(
            file["destinations"]["current_account-current_region"]["objectKey"],
            "abc.zip"
        );
        let image = &json["dockerImages"]["def"];
        assert_eq!(image["source"]["directory"], "asset.def");
        assert_eq!(
            image["destinations"]["current_account-current_region"]["imageTag"],
            "def"
        );
    }
}
