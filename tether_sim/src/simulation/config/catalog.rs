// tether_sim/src/simulation/config/catalog.rs

//! This module defines the `ObjectCatalog` resource and the startup system that
//! loads every virtual object description from disk.

use bevy::prelude::*;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::Path,
    thread,
    time::Duration,
};
use tether_core::prelude::{LoadError, LoadedModel, ObjectDescriptor, ObjectLoader};
use walkdir::WalkDir;

use crate::cli::Cli;

/// One `.toml` file of the catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub descriptor: ObjectDescriptor,
    /// Simulated wall-clock time the model takes to load.
    #[serde(default)]
    pub load_seconds: f64,
    #[serde(default)]
    pub vertex_count: usize,
}

impl CatalogEntry {
    pub fn loader(&self) -> SimObjectLoader {
        SimObjectLoader {
            latency: Duration::from_secs_f64(self.load_seconds.max(0.0)),
            vertex_count: self.vertex_count,
        }
    }
}

/// A Bevy resource that holds every loadable object, keyed by descriptor name.
#[derive(Resource, Default, Debug)]
pub struct ObjectCatalog(pub BTreeMap<String, CatalogEntry>);

impl ObjectCatalog {
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.0.get(name)
    }
}

/// Stands in for a real model decoder: waits out the configured latency on the
/// load worker, then reports the catalog's vertex count.
#[derive(Debug, Clone)]
pub struct SimObjectLoader {
    pub latency: Duration,
    pub vertex_count: usize,
}

impl ObjectLoader for SimObjectLoader {
    fn load(&self, descriptor: &ObjectDescriptor) -> Result<LoadedModel, LoadError> {
        if descriptor.model_path.is_empty() {
            return Err(LoadError::MissingModel(descriptor.name.clone()));
        }
        if self.vertex_count == 0 {
            return Err(LoadError::Corrupt {
                name: descriptor.name.clone(),
                reason: "model has no vertices".into(),
            });
        }
        thread::sleep(self.latency);
        Ok(LoadedModel {
            name: descriptor.name.clone(),
            vertex_count: self.vertex_count,
        })
    }
}

/// A startup system that walks the catalog directory, parses every `.toml`
/// file, and populates the `ObjectCatalog` resource.
pub fn load_catalog_from_disk(cli: Res<Cli>, mut catalog: ResMut<ObjectCatalog>) {
    let catalog_path = cli.catalog.as_path();
    if !catalog_path.exists() {
        warn!(
            "Catalog directory not found at {:?}, no objects will be available.",
            catalog_path
        );
        return;
    }

    info!("Loading object catalog from: {:?}", catalog_path);
    catalog.0 = read_catalog(catalog_path);
}

fn read_catalog(catalog_path: &Path) -> BTreeMap<String, CatalogEntry> {
    let mut entries = BTreeMap::new();
    for entry in WalkDir::new(catalog_path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| !e.file_type().is_dir() && e.path().extension().is_some_and(|ext| ext == "toml"))
    {
        let path = entry.path();
        match Figment::new().merge(Toml::file(path)).extract::<CatalogEntry>() {
            Ok(item) => {
                info!("Loaded catalog item: '{}'", item.descriptor.name);
                entries.insert(item.descriptor.name.clone(), item);
            }
            Err(e) => {
                error!("Failed to load catalog item from {:?}: {}", path, e);
            }
        }
    }
    entries
}
