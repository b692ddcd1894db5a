//! Loading of external assets: raw files, glTF documents and image textures.
//!
//! - `mesh` flattens a glTF scene into drawable primitives
//! - `texture` loads image textures and de-duplicates them by content
//!
//! Paths are relative to `./assets` natively and to `<origin>/assets` in the browser.

use std::path::Path;

pub mod mesh;
pub mod texture;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),
    #[error("the document contains no scene with nodes")]
    NoScene,
    #[error("the scene contains no meshes")]
    NoMeshes,
    #[error("failed to decode asset: {0}")]
    DecodeFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to fetch asset: {0}")]
    Fetch(String),
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> Result<reqwest::Url, AssetError> {
    let window = web_sys::window().ok_or_else(|| AssetError::Fetch("no window".into()))?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| AssetError::Fetch(format!("{e:?}")))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/"))
        .map_err(|e| AssetError::Fetch(e.to_string()))?;
    base.join(file_name)
        .map_err(|e| AssetError::Fetch(e.to_string()))
}

pub async fn load_binary(file_name: &str) -> Result<Vec<u8>, AssetError> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url)
            .await
            .map_err(|e| AssetError::Fetch(e.to_string()))?;
        response
            .bytes()
            .await
            .map_err(|e| AssetError::Fetch(e.to_string()))?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = Path::new("./").join("assets").join(file_name);
        std::fs::read(path)?
    };

    Ok(data)
}

/// A parsed glTF document with every buffer it references resolved to bytes.
#[derive(Debug)]
pub struct SceneDocument {
    pub document: gltf::Document,
    pub buffers: Vec<Vec<u8>>,
}

impl SceneDocument {
    /// Parse a self-contained document: a `.glb` blob or a `.gltf` without
    /// external buffers.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AssetError> {
        let gltf = parse(bytes)?;
        let buffers = gltf
            .buffers()
            .map(|buffer| match buffer.source() {
                gltf::buffer::Source::Bin => binary_chunk(&gltf),
                gltf::buffer::Source::Uri(uri) => Err(AssetError::DecodeFailed(format!(
                    "buffer {uri} is not embedded in the document"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            document: gltf.document,
            buffers,
        })
    }
}

fn parse(bytes: &[u8]) -> Result<gltf::Gltf, AssetError> {
    gltf::Gltf::from_slice(bytes).map_err(|e| AssetError::DecodeFailed(e.to_string()))
}

fn binary_chunk(gltf: &gltf::Gltf) -> Result<Vec<u8>, AssetError> {
    gltf.blob
        .clone()
        .ok_or_else(|| AssetError::DecodeFailed("missing binary chunk".into()))
}

/// Load a `.glb` or `.gltf` document. External buffers are resolved relative
/// to the document.
pub async fn load_model(url: &str) -> Result<SceneDocument, AssetError> {
    let extension = Path::new(url)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if !matches!(extension.as_deref(), Some("glb" | "gltf")) {
        return Err(AssetError::UnsupportedFormat(url.to_string()));
    }

    let bytes = load_binary(url).await?;
    let gltf = parse(&bytes)?;

    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => binary_chunk(&gltf)?,
            gltf::buffer::Source::Uri(uri) => load_binary(&sibling_path(url, uri)).await?,
        };
        buffers.push(data);
    }
    log::debug!("loaded {url} with {} buffer(s)", buffers.len());

    Ok(SceneDocument {
        document: gltf.document,
        buffers,
    })
}

/// `uri` resolved against the directory `base` lives in.
pub fn sibling_path(base: &str, uri: &str) -> String {
    match base.rfind('/') {
        Some(idx) => format!("{}{}", &base[..=idx], uri),
        None => uri.to_string(),
    }
}

/// `image/png` -> `png`, the form image format hints take.
pub fn format_hint(mime_type: &str) -> Option<&str> {
    mime_type.rsplit('/').next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_paths() {
        assert_eq!(sibling_path("models/duck.gltf", "duck.bin"), "models/duck.bin");
        assert_eq!(sibling_path("duck.gltf", "duck.bin"), "duck.bin");
    }

    #[test]
    fn mime_hints() {
        assert_eq!(format_hint("image/png"), Some("png"));
        assert_eq!(format_hint("image/jpeg"), Some("jpeg"));
        assert_eq!(format_hint("image/"), None);
    }

    #[test]
    fn other_extensions_are_unsupported() {
        let err = futures::executor::block_on(load_model("models/cube.obj")).unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_file_is_io() {
        let err = futures::executor::block_on(load_model("does/not/exist.glb")).unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }

    #[test]
    fn external_buffers_need_a_loader() {
        let json = br#"{
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 4, "uri": "data.bin" }]
        }"#;
        let err = SceneDocument::from_slice(json).unwrap_err();
        assert!(matches!(err, AssetError::DecodeFailed(_)));
    }
}
