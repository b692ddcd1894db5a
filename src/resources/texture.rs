use std::{
    collections::{HashMap, hash_map::DefaultHasher},
    hash::{Hash, Hasher},
};

use anyhow::Result;

use crate::{data_structures::texture::Texture, resources::load_binary};

/// Decode an image file from the assets into a texture. The file extension
/// is used as the format hint.
pub async fn load_texture(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Result<Texture> {
    let data = load_binary(file_name).await?;
    let hint = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str());
    Texture::from_bytes(device, queue, &data, file_name, hint)
}

/// Identifies a texture by its encoded bytes: their length and a hash over all of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureKey {
    len: usize,
    hash: u64,
}

impl TextureKey {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self {
            len: bytes.len(),
            hash: hasher.finish(),
        }
    }
}

/// Decoded textures keyed by content, so images referenced by several
/// materials are decoded and uploaded once.
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: HashMap<TextureKey, Texture>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the key for `bytes`, decoding and uploading them on first sight.
    pub fn get_or_insert(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        format: Option<&str>,
        label: &str,
    ) -> Result<TextureKey> {
        let key = TextureKey::of(bytes);
        if !self.textures.contains_key(&key) {
            let texture = Texture::from_bytes(device, queue, bytes, label, format)?;
            self.textures.insert(key, texture);
        }
        Ok(key)
    }

    pub fn get(&self, key: &TextureKey) -> Option<&Texture> {
        self.textures.get(key)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Destroy every cached texture and empty the cache.
    pub fn release_all(&mut self) {
        for texture in self.textures.values() {
            texture.destroy();
        }
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_key() {
        let a = vec![7u8; 64];
        assert_eq!(TextureKey::of(&a), TextureKey::of(&a.clone()));
    }

    #[test]
    fn every_byte_counts() {
        let a = vec![7u8; 64];
        let mut b = a.clone();
        b[63] = 8;
        assert_ne!(TextureKey::of(&a), TextureKey::of(&b));
    }

    #[test]
    fn length_counts() {
        assert_ne!(TextureKey::of(&[0; 16]), TextureKey::of(&[0; 17]));
    }
}
