//! Named objects and materials, resolved from directories, built-ins and
//! anything registered in memory. Loaded assets are cached and shared.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AssetKind, Error, Result};
use crate::material::Reflectance;
use crate::merl::MerlBrdf;
use crate::mesh::{load_model, Model, BUILTIN_OBJECTS};

const OBJECT_EXTENSIONS: [&str; 3] = ["obj", "gltf", "glb"];
const MATERIAL_EXTENSION: &str = "binary";

#[derive(Default)]
pub struct AssetCatalog {
    object_dir: Option<PathBuf>,
    material_dir: Option<PathBuf>,
    builtin_objects: bool,
    objects: BTreeMap<String, Arc<Model>>,
    materials: BTreeMap<String, Arc<Reflectance>>,
}

fn files_with_extension(dir: &Path, extensions: &[&str]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !dir.is_dir() {
        log::warn!("asset directory {} does not exist", dir.display());
        return Ok(names);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if let (true, Some(stem)) = (matches, path.file_stem().and_then(|s| s.to_str())) {
            names.push(stem.to_string());
        }
    }
    Ok(names)
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog that resolves `sphere`, `cube` and `plane` without any files.
    pub fn with_builtin_objects() -> Self {
        AssetCatalog {
            builtin_objects: true,
            ..Default::default()
        }
    }

    pub fn with_object_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.object_dir = Some(dir.into());
        self
    }

    pub fn with_material_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.material_dir = Some(dir.into());
        self
    }

    pub fn set_builtin_objects(&mut self, enabled: bool) {
        self.builtin_objects = enabled;
    }

    pub fn insert_object(&mut self, name: impl Into<String>, model: Model) {
        self.objects.insert(name.into(), Arc::new(model));
    }

    pub fn insert_material(&mut self, name: impl Into<String>, reflectance: Reflectance) {
        self.materials.insert(name.into(), Arc::new(reflectance));
    }

    fn object_file(&self, name: &str) -> Option<PathBuf> {
        let dir = self.object_dir.as_ref()?;
        OBJECT_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{name}.{ext}")))
            .find(|path| path.is_file())
    }

    fn material_file(&self, name: &str) -> Option<PathBuf> {
        let path = self.material_dir.as_ref()?.join(format!("{name}.{MATERIAL_EXTENSION}"));
        path.is_file().then_some(path)
    }

    /// Resolves an object, loading and caching it on first use. Files in the
    /// object directory shadow built-ins of the same name.
    pub fn load_object(&mut self, name: &str) -> Result<Arc<Model>> {
        if let Some(model) = self.objects.get(name) {
            return Ok(model.clone());
        }
        let model = if let Some(path) = self.object_file(name) {
            load_model(&path)?
        } else if self.builtin_objects {
            Model::builtin(name).ok_or_else(|| Error::not_found(AssetKind::Object, name))?
        } else {
            return Err(Error::not_found(AssetKind::Object, name));
        };
        let model = Arc::new(model);
        self.objects.insert(name.to_string(), model.clone());
        Ok(model)
    }

    pub fn load_material(&mut self, name: &str) -> Result<Arc<Reflectance>> {
        if let Some(material) = self.materials.get(name) {
            return Ok(material.clone());
        }
        let path = self
            .material_file(name)
            .ok_or_else(|| Error::not_found(AssetKind::Material, name))?;
        let material = Arc::new(Reflectance::from(MerlBrdf::load(&path)?));
        self.materials.insert(name.to_string(), material.clone());
        Ok(material)
    }

    /// Lookup among already resolved objects.
    pub fn object(&self, name: &str) -> Result<Arc<Model>> {
        self.objects
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(AssetKind::Object, name))
    }

    pub fn material(&self, name: &str) -> Result<Arc<Reflectance>> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(AssetKind::Material, name))
    }

    /// All object names this catalog could resolve, sorted and deduplicated.
    pub fn discover_objects(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.objects.keys().cloned().collect();
        if let Some(dir) = &self.object_dir {
            names.extend(files_with_extension(dir, &OBJECT_EXTENSIONS)?);
        }
        if self.builtin_objects {
            names.extend(BUILTIN_OBJECTS.iter().map(|s| s.to_string()));
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub fn discover_materials(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.materials.keys().cloned().collect();
        if let Some(dir) = &self.material_dir {
            names.extend(files_with_extension(dir, &[MATERIAL_EXTENSION])?);
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}
