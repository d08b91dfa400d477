//! Two-Line Element (TLE) records.
//!
//! Holds the raw element record the rest of the engine works on, decodes the
//! handful of fixed-column fields the query engine needs, and parses TLE text
//! as served by CelesTrak.

use std::path::Path;

use crate::error::{EngineError, Result};

pub const SECONDS_PER_DAY: f64 = 86400.0;
pub const EARTH_MU_KM3_S2: f64 = 398_600.4418;
pub const EARTH_RADIUS_KM: f64 = 6378.137;

const CATALOG_NUMBER_COLUMNS: (usize, usize) = (2, 7);
const EPOCH_YEAR_COLUMNS: (usize, usize) = (18, 20);
const ECCENTRICITY_COLUMNS: (usize, usize) = (26, 33);
const MEAN_MOTION_COLUMNS: (usize, usize) = (52, 63);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementRecord {
    pub id: u32,
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl ElementRecord {
    pub fn new(id: u32, name: impl Into<String>, line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            line1: line1.into(),
            line2: line2.into(),
        }
    }

    /// Four-digit epoch year from line 1, columns 19-20.
    pub fn epoch_year(&self) -> Option<i32> {
        let field = fixed_field(&self.line1, EPOCH_YEAR_COLUMNS).trim();
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let yy: i32 = field.parse().ok()?;
        Some(if yy >= 57 { 1900 + yy } else { 2000 + yy })
    }

    /// Mean motion in revolutions per day, line 2 columns 53-63.
    pub fn mean_motion(&self) -> Option<f64> {
        let field = fixed_field(&self.line2, MEAN_MOTION_COLUMNS).trim();
        field.parse::<f64>().ok().filter(|mm| mm.is_finite())
    }

    /// Eccentricity from line 2 columns 27-33 (implied leading decimal point).
    pub fn eccentricity(&self) -> Option<f64> {
        let field = fixed_field(&self.line2, ECCENTRICITY_COLUMNS).trim();
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        format!("0.{field}").parse().ok()
    }

    pub fn orbit_class(&self) -> Option<OrbitClass> {
        OrbitClass::classify(self.mean_motion()?, self.eccentricity().unwrap_or(0.0))
    }
}

/// Substring over byte columns `[start, end)`, clamped to the line length.
pub fn fixed_field(line: &str, (start, end): (usize, usize)) -> &str {
    let end = end.min(line.len());
    let start = start.min(end);
    line.get(start..end).unwrap_or("")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrbitClass {
    Leo,
    Meo,
    Geo,
    Heo,
}

impl OrbitClass {
    pub fn classify(mean_motion: f64, eccentricity: f64) -> Option<Self> {
        if eccentricity > 0.25 {
            Some(Self::Heo)
        } else if mean_motion > 11.25 {
            Some(Self::Leo)
        } else if mean_motion > 0.98 && mean_motion < 1.02 {
            Some(Self::Geo)
        } else if (1.02..=11.25).contains(&mean_motion) {
            Some(Self::Meo)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Leo => "LEO",
            Self::Meo => "MEO",
            Self::Geo => "GEO",
            Self::Heo => "HEO",
        }
    }
}

pub fn mean_motion_to_altitude_km(n_revs_per_day: f64) -> f64 {
    let n_rad_s = n_revs_per_day * 2.0 * std::f64::consts::PI / SECONDS_PER_DAY;
    let a = (EARTH_MU_KM3_S2 / (n_rad_s * n_rad_s)).powf(1.0 / 3.0);
    a - EARTH_RADIUS_KM
}

/// Catalog number from line 1, accepting the Alpha-5 extension (A0000 = 100000).
pub fn parse_catalog_number(line1: &str) -> Option<u32> {
    let field = fixed_field(line1, CATALOG_NUMBER_COLUMNS).trim();
    let mut chars = field.chars();
    let first = chars.next()?;
    let rest = chars.as_str();
    if first.is_ascii_digit() {
        return field.parse().ok();
    }
    let lead = match first.to_ascii_uppercase() {
        c @ 'A'..='H' => c as u32 - 'A' as u32 + 10,
        c @ 'J'..='N' => c as u32 - 'J' as u32 + 18,
        c @ 'P'..='Z' => c as u32 - 'P' as u32 + 23,
        _ => return None,
    };
    if rest.len() != 4 || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(lead * 10_000 + rest.parse::<u32>().ok()?)
}

/// Parses 3-line (name + elements) or bare 2-line TLE text. Checksums are not
/// verified; records only need a readable catalog number.
pub fn parse_tle_data(data: &str) -> Result<Vec<ElementRecord>> {
    let lines: Vec<&str> = data.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()).collect();
    let mut records = Vec::new();

    let mut i = 0;
    while i + 1 < lines.len() {
        let (name, line1, line2, consumed) = if lines[i].starts_with("1 ") && lines[i + 1].starts_with("2 ") {
            (None, lines[i], lines[i + 1], 2)
        } else if i + 2 < lines.len() && lines[i + 1].starts_with("1 ") && lines[i + 2].starts_with("2 ") {
            (Some(lines[i].trim()), lines[i + 1], lines[i + 2], 3)
        } else {
            i += 1;
            continue;
        };

        let Some(id) = parse_catalog_number(line1) else {
            i += consumed;
            continue;
        };
        let name = name
            .map(|n| n.strip_prefix("0 ").unwrap_or(n).to_string())
            .unwrap_or_else(|| id.to_string());
        records.push(ElementRecord::new(id, name, line1, line2));
        i += consumed;
    }

    if records.is_empty() {
        Err(EngineError::EmptyCatalog)
    } else {
        Ok(records)
    }
}

pub fn read_tle_file(path: &Path) -> Result<Vec<ElementRecord>> {
    let data = std::fs::read_to_string(path).map_err(|source| EngineError::CatalogRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tle_data(&data)
}

pub fn fetch_tle_data(url: &str) -> Result<Vec<ElementRecord>> {
    let fetch_error = |reason: String| EngineError::Fetch { url: url.to_string(), reason };
    let response = ureq::get(url)
        .call()
        .map_err(|e| fetch_error(format!("HTTP error: {e}")))?;

    let body = response
        .into_string()
        .map_err(|e| fetch_error(format!("read error: {e}")))?;

    parse_tle_data(&body)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CatalogSource {
    Active,
    Stations,
    Starlink,
    Gps,
    Geo,
    Fengyun1cDebris,
    Cosmos2251Debris,
    Iridium33Debris,
    Cosmos1408Debris,
}

impl CatalogSource {
    pub const ALL: [CatalogSource; 9] = [
        Self::Active,
        Self::Stations,
        Self::Starlink,
        Self::Gps,
        Self::Geo,
        Self::Fengyun1cDebris,
        Self::Cosmos2251Debris,
        Self::Iridium33Debris,
        Self::Cosmos1408Debris,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Stations => "Stations",
            Self::Starlink => "Starlink",
            Self::Gps => "GPS",
            Self::Geo => "GEO",
            Self::Fengyun1cDebris => "Fengyun 1C",
            Self::Cosmos2251Debris => "Cosmos 2251",
            Self::Iridium33Debris => "Iridium 33",
            Self::Cosmos1408Debris => "Cosmos 1408",
        }
    }

    pub fn group(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Stations => "stations",
            Self::Starlink => "starlink",
            Self::Gps => "gps-ops",
            Self::Geo => "geo",
            Self::Fengyun1cDebris => "fengyun-1c-debris",
            Self::Cosmos2251Debris => "cosmos-2251-debris",
            Self::Iridium33Debris => "iridium-33-debris",
            Self::Cosmos1408Debris => "cosmos-1408-debris",
        }
    }

    pub fn url(&self) -> String {
        format!("https://celestrak.org/NORAD/elements/gp.php?GROUP={}&FORMAT=tle", self.group())
    }

    pub fn from_group(group: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.group().eq_ignore_ascii_case(group))
    }
}
