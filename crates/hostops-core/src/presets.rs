//! World generation presets.

use serde::Serialize;

use crate::errors::HostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FlatWorld {
    biome: &'static str,
    surface: [(&'static str, u32); 3],
    lakes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldPreset {
    pub key: &'static str,
    pub name: &'static str,
    pub level_type: &'static str,
    flat: Option<FlatWorld>,
}

const GRASS: [(&str, u32); 3] = [
    ("minecraft:bedrock", 1),
    ("minecraft:dirt", 2),
    ("minecraft:grass_block", 1),
];

const SAND: [(&str, u32); 3] = [
    ("minecraft:bedrock", 1),
    ("minecraft:sandstone", 2),
    ("minecraft:sand", 1),
];

const fn flat(
    key: &'static str,
    name: &'static str,
    biome: &'static str,
    surface: [(&'static str, u32); 3],
    lakes: bool,
) -> WorldPreset {
    WorldPreset {
        key,
        name,
        level_type: "minecraft:flat",
        flat: Some(FlatWorld {
            biome,
            surface,
            lakes,
        }),
    }
}

const fn generated(key: &'static str, name: &'static str, level_type: &'static str) -> WorldPreset {
    WorldPreset {
        key,
        name,
        level_type,
        flat: None,
    }
}

pub const PRESETS: &[WorldPreset] = &[
    flat("plains", "Plains (Default)", "minecraft:plains", GRASS, false),
    flat("forest", "Forest", "minecraft:forest", GRASS, true),
    flat("desert", "Desert", "minecraft:desert", SAND, false),
    flat("snowy", "Snowy Plains", "minecraft:snowy_plains", GRASS, true),
    flat("cherry", "Cherry Grove", "minecraft:cherry_grove", GRASS, false),
    generated("normal", "Normal World (Random Seed)", "minecraft:normal"),
    generated("amplified", "Amplified Terrain", "minecraft:amplified"),
    generated("large_biomes", "Large Biomes", "minecraft:large_biomes"),
];

#[derive(Serialize)]
struct Layer<'a> {
    block: &'a str,
    height: u32,
}

#[derive(Serialize)]
struct FlatSettings<'a> {
    biome: &'a str,
    layers: Vec<Layer<'a>>,
    features: bool,
    lakes: bool,
    structure_overrides: Vec<String>,
}

impl WorldPreset {
    /// Level type without the `minecraft:` namespace.
    pub fn short_type(&self) -> &'static str {
        self.level_type
            .strip_prefix("minecraft:")
            .unwrap_or(self.level_type)
    }

    /// Value for `generator-settings`; empty for non-flat worlds.
    pub fn generator_settings(&self) -> String {
        let Some(flat) = self.flat else {
            return String::new();
        };
        let settings = FlatSettings {
            biome: flat.biome,
            layers: flat
                .surface
                .iter()
                .map(|(block, height)| Layer {
                    block: *block,
                    height: *height,
                })
                .collect(),
            features: true,
            lakes: flat.lakes,
            structure_overrides: Vec::new(),
        };
        serde_json::to_string(&settings).unwrap_or_default()
    }
}

pub fn find_preset(key: &str) -> Result<&'static WorldPreset, HostError> {
    PRESETS
        .iter()
        .find(|preset| preset.key == key)
        .ok_or_else(|| HostError::UnknownPreset(key.to_string()))
}
