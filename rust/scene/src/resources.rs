// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resources shared by every binding of one manager.
//!
//! Built once at startup and handed to the manager behind an `Arc`: default
//! materials per binding kind, the placeholder texture, and the texture
//! cache in front of an external [`TextureSource`].

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graph::Material;
use crate::kinds::BindingKind;

/// Decoded texture image.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels, row-major
    pub pixels: Arc<[u8]>,
}

impl Texture {
    /// Neutral grey 2x2 texture used when loading fails.
    pub fn placeholder() -> Self {
        Self {
            url: String::from("placeholder:grey"),
            width: 2,
            height: 2,
            pixels: Arc::from(vec![0x80u8; 16]),
        }
    }
}

/// External texture loader.
pub trait TextureSource: Send + Sync {
    fn load(&self, url: &str) -> Result<Texture>;
}

/// Immutable defaults plus the texture cache.
pub struct SharedResources {
    placeholder: Arc<Texture>,
    materials: FxHashMap<BindingKind, Material>,
    source: Option<Box<dyn TextureSource>>,
    cache: Mutex<FxHashMap<String, Arc<Texture>>>,
}

impl std::fmt::Debug for SharedResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedResources")
            .field("materials", &self.materials.len())
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl SharedResources {
    /// Resources without a texture source: every texture is the placeholder.
    pub fn new() -> Self {
        let mut materials = FxHashMap::default();
        for kind in BindingKind::ALL {
            materials.insert(kind, default_material(kind));
        }
        Self {
            placeholder: Arc::new(Texture::placeholder()),
            materials,
            source: None,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn with_texture_source(mut self, source: impl TextureSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn placeholder(&self) -> Arc<Texture> {
        Arc::clone(&self.placeholder)
    }

    /// Default material for a binding kind.
    pub fn material(&self, kind: BindingKind) -> Material {
        self.materials
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Cached texture for `url`, loading it on first use.
    ///
    /// Failures are logged and answered with the placeholder.
    pub fn texture(&self, url: &str) -> Arc<Texture> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(texture) = cache.get(url) {
            return Arc::clone(texture);
        }
        match self.load(url) {
            Ok(texture) => {
                let texture = Arc::new(texture);
                cache.insert(url.to_string(), Arc::clone(&texture));
                texture
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "texture unavailable, using placeholder");
                self.placeholder()
            }
        }
    }

    fn load(&self, url: &str) -> Result<Texture> {
        match &self.source {
            Some(source) => source.load(url),
            None => Err(Error::Texture(format!("no texture source for {url}"))),
        }
    }

    /// Number of cached textures.
    pub fn cached_textures(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for SharedResources {
    fn default() -> Self {
        Self::new()
    }
}

fn default_material(kind: BindingKind) -> Material {
    let diffuse = match kind {
        BindingKind::Vertex => [0.2, 0.4, 0.9],
        BindingKind::Segment => [0.92, 0.9, 0.86],
        BindingKind::GroundPlaneZone => [0.6, 0.6, 0.6],
        BindingKind::ProductZone => [0.3, 0.7, 0.3],
        BindingKind::GenericZone => [0.7, 0.7, 0.4],
        BindingKind::Model | BindingKind::ExtrusionModel => [0.75, 0.6, 0.45],
        BindingKind::ShadowModel => [0.5, 0.5, 0.9],
        BindingKind::TemplateContainer => [0.8, 0.8, 0.8],
    };
    Material {
        diffuse,
        ..Material::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource(Arc<AtomicUsize>);

    impl TextureSource for CountingSource {
        fn load(&self, url: &str) -> Result<Texture> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if url.ends_with(".png") {
                Ok(Texture {
                    url: url.to_string(),
                    width: 1,
                    height: 1,
                    pixels: Arc::from(vec![255u8; 4]),
                })
            } else {
                Err(Error::Texture(format!("unsupported {url}")))
            }
        }
    }

    #[test]
    fn textures_are_cached_per_url() {
        let loads = Arc::new(AtomicUsize::new(0));
        let resources = SharedResources::new().with_texture_source(CountingSource(loads.clone()));
        let a = resources.texture("brick.png");
        let b = resources.texture("brick.png");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(resources.cached_textures(), 1);
    }

    #[test]
    fn failed_load_falls_back_to_placeholder() {
        let resources = SharedResources::new();
        let texture = resources.texture("missing.jpg");
        assert_eq!(*texture, Texture::placeholder());
        assert_eq!(resources.cached_textures(), 0);
    }

    #[test]
    fn every_kind_has_a_material() {
        let resources = SharedResources::new();
        for kind in BindingKind::ALL {
            assert!(resources.material(kind).visible);
        }
    }
}
