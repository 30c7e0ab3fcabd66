// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::path::PathBuf;
use terrarium_app::{ColumnValue, Row, Scope};

const DOMES: [&str; 4] = ["Tropical Dome", "Desert Dome", "Show Dome", "Outdoor Garden"];

const PLANTS: [(&str, &str); 16] = [
    ("Bird of Paradise", "Strelitzia reginae"),
    ("Golden Barrel Cactus", "Echinocactus grusonii"),
    ("Banana", "Musa acuminata"),
    ("Ocotillo", "Fouquieria splendens"),
    ("Monstera", "Monstera deliciosa"),
    ("Agave", "Agave americana"),
    ("Staghorn Fern", "Platycerium bifurcatum"),
    ("Jade Plant", "Crassula ovata"),
    ("Cacao", "Theobroma cacao"),
    ("Aloe", "Aloe vera"),
    ("Bromeliad", "Guzmania lingulata"),
    ("Saguaro", "Carnegiea gigantea"),
    ("Orchid", "Phalaenopsis amabilis"),
    ("Boojum Tree", "Fouquieria columnaris"),
    ("Coffee", "Coffea arabica"),
    ("Snake Plant", "Dracaena trifasciata"),
];

const QUANTITIES: [&str; 9] = ["1", "2", "3", "5", "6+", "10", "12", "20+", "unknown"];

const NOTES: [&str; 6] = [
    "healthy",
    "needs repotting",
    "pest treatment scheduled",
    "flowering",
    "leaf burn on south side",
    "staff favorite",
];

const STOPS: [&str; 4] = ["N/A", "Stop 3", "Stop 7", "Stop 12"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plant inventory rows shaped like the admin API's
/// payload. Same seed, same rows.
#[derive(Debug, Clone)]
pub struct PlantFaker {
    rng: DeterministicRng,
    next_id: u64,
}

impl PlantFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn plant(&mut self) -> Row {
        let dome = self.pick(&DOMES);
        self.plant_in(dome)
    }

    pub fn plant_in(&mut self, dome: &str) -> Row {
        let id = self.next_id;
        self.next_id += 1;
        let (common_name, scientific_name) = PLANTS[self.rng.int_n(PLANTS.len())];
        // The first row decides column kinds, so it always carries a quantity.
        let qty = if id > 1 && self.rng.int_n(8) == 0 {
            ColumnValue::Null
        } else {
            ColumnValue::from(self.pick(&QUANTITIES))
        };
        let notes = if self.rng.int_n(3) == 0 {
            ColumnValue::Null
        } else {
            ColumnValue::from(self.pick(&NOTES))
        };
        let wont_survive = self.rng.int_n(5) == 0;

        Row::new()
            .with("id", format!("plant-{id:04}"))
            .with("common_name", common_name)
            .with("scientific_name", scientific_name)
            .with("qty", qty)
            .with("dome", dome)
            .with("display", self.rng.int_n(4) != 0)
            .with("buy_new_wont_survive", wont_survive)
            .with("buy_new_readily_available", !wont_survive && self.rng.bool())
            .with("move_it_staff_can_do", self.rng.bool())
            .with("move_it_requires_consult", self.rng.int_n(6) == 0)
            .with("stop", self.pick(&STOPS))
            .with("notes", notes)
            .with("created_at", self.created_at())
            .with("image_url", format!("https://images.example.org/plants/{id}.jpg"))
    }

    pub fn plants(&mut self, count: usize) -> Vec<Row> {
        (0..count).map(|_| self.plant()).collect()
    }

    fn created_at(&mut self) -> String {
        let month = 1 + self.rng.int_n(12);
        let day = 1 + self.rng.int_n(28);
        let hour = self.rng.int_n(24);
        let minute = self.rng.int_n(60);
        format!("2025-{month:02}-{day:02}T{hour:02}:{minute:02}:00Z")
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn plant_rows(seed: u64, count: usize) -> Vec<Row> {
    PlantFaker::new(seed).plants(count)
}

pub fn domes() -> &'static [&'static str] {
    &DOMES
}

pub fn dome_scopes() -> Vec<Scope> {
    std::iter::once(Scope::All)
        .chain(DOMES.iter().map(|dome| Scope::Named((*dome).to_owned())))
        .collect()
}

/// Serializes rows as the admin API returns them: `{"plants": [...]}`.
pub fn rows_json(rows: &[Row]) -> Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({ "plants": rows }))
        .context("encode plant rows")
}

pub fn temp_prefs_path(file_name: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join(file_name);
    Ok((dir, path))
}
