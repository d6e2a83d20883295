//! Synthetic galaxy generation.
//!
//! Floating point values are generated on coarse binary grids so that they
//! survive a JSON round trip exactly.

use std::io::{Seek, SeekFrom, Write};

use ettu_galaxy::{
    Allegiance, Commodity, Coordinate, Facility, FacilityFeatures, FacilityListing, Galaxy,
    Government, SecurityLevel, System, Trade,
};

const SYLLABLES: &[&str] = &[
    "ach", "al", "ar", "bar", "cen", "del", "dra", "en", "eta", "gal", "hip", "ko", "lu", "mar",
    "nar", "os", "pra", "qu", "ros", "sol", "ta", "ur", "vo", "wo", "xi", "yor", "zan",
];

const POWERS: &[&str] = &[
    "Zachary Hudson",
    "Felicia Winters",
    "Arissa Lavigny-Duval",
    "Aisling Duval",
    "Edmund Mahon",
    "Li Yong-Rui",
];

const CATEGORIES: &[&str] = &[
    "Chemicals",
    "Consumer Items",
    "Foods",
    "Industrial Materials",
    "Machinery",
    "Medicines",
    "Metals",
    "Minerals",
    "Technology",
    "Textiles",
];

/// Shape of a generated galaxy.
#[derive(Debug, Clone)]
pub struct GalaxyShape {
    pub num_systems: usize,
    pub max_facilities: usize,
    pub num_commodities: usize,
    /// Maximum number of supply plus demand entries per listing.
    pub max_listing_len: usize,
}

impl Default for GalaxyShape {
    fn default() -> Self {
        GalaxyShape {
            num_systems: 100,
            max_facilities: 4,
            num_commodities: 20,
            max_listing_len: 6,
        }
    }
}

/// Seeded generator of galaxy entities.
pub struct DataGenerator {
    rng: fastrand::Rng,
}

impl DataGenerator {
    pub fn new(seed: u64) -> DataGenerator {
        DataGenerator {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// A pronounceable name of two to four syllables.
    pub fn name(&mut self) -> String {
        let count = self.rng.usize(2..=4);
        let mut name = String::new();
        for i in 0..count {
            let syllable = SYLLABLES[self.rng.usize(..SYLLABLES.len())];
            if i == 0 {
                let mut chars = syllable.chars();
                if let Some(first) = chars.next() {
                    name.extend(first.to_uppercase());
                    name.push_str(chars.as_str());
                }
            } else {
                name.push_str(syllable);
            }
        }
        name
    }

    /// A position within a few thousand light years of the origin, on a
    /// 1/32 ly grid.
    pub fn coordinate(&mut self) -> Coordinate {
        let mut axis = || self.rng.i32(-160_000..160_000) as f64 / 32.0;
        Coordinate::new(axis(), axis(), axis())
    }

    pub fn timestamp(&mut self) -> u64 {
        self.rng.u64(1_600_000_000..1_800_000_000)
    }

    pub fn commodity(&mut self, commodity_id: u32) -> Commodity {
        let category = CATEGORIES[self.rng.usize(..CATEGORIES.len())];
        Commodity {
            average_price: self.rng.u32(10..250_000),
            fdev_id: 128_000_000 + commodity_id,
            ..Commodity::new(commodity_id, self.name(), category)
        }
    }

    pub fn trade(&mut self, commodity_id: u32) -> Trade {
        Trade {
            commodity_id: commodity_id as u64,
            units: self.rng.u32(..100_000),
            credits: self.rng.u16(..),
            timestamp_utc: self.timestamp(),
        }
    }

    /// A listing drawing from commodities `1..=num_commodities`; empty when
    /// there are none.
    pub fn listing(&mut self, num_commodities: usize, max_len: usize) -> FacilityListing {
        let mut listing = FacilityListing::default();
        if num_commodities == 0 {
            return listing;
        }
        for _ in 0..self.rng.usize(..=max_len) {
            let commodity_id = self.rng.u32(1..=num_commodities as u32);
            let trade = self.trade(commodity_id);
            if self.rng.bool() {
                listing.supply.push(trade);
            } else {
                listing.demand.push(trade);
            }
        }
        listing
    }

    pub fn facility(&mut self, facility_id: u32, shape: &GalaxyShape) -> Facility {
        let listing = self.listing(shape.num_commodities, shape.max_listing_len);
        let features = FacilityFeatures::from_bits_truncate(self.rng.u32(..));
        Facility {
            features,
            ls_from_star: self.rng.u32(..4_000_000) as f32 / 4.0,
            type_id: self.rng.i8(0..16),
            government: pick(&mut self.rng, Government::ALL),
            allegiance: pick(&mut self.rng, Allegiance::ALL),
            timestamp_utc: self.timestamp(),
            listing: (!listing.is_empty()).then_some(listing),
            ..Facility::new(facility_id, format!("{} Station", self.name()))
        }
    }

    pub fn system(&mut self, system_id: u32, shape: &GalaxyShape) -> System {
        let mut facility_ids = (1..=shape.max_facilities as u32).collect::<Vec<_>>();
        self.rng.shuffle(&mut facility_ids);
        facility_ids.truncate(self.rng.usize(..=shape.max_facilities));
        let facilities = facility_ids
            .into_iter()
            .map(|id| self.facility(id, shape))
            .collect();
        let populated = self.rng.u8(..10) != 0;
        System {
            timestamp_utc: self.timestamp(),
            power: (populated && self.rng.bool())
                .then(|| POWERS[self.rng.usize(..POWERS.len())].to_string()),
            populated,
            needs_permit: self.rng.u8(..20) == 0,
            security: pick(&mut self.rng, SecurityLevel::ALL),
            government: pick(&mut self.rng, Government::ALL),
            allegiance: pick(&mut self.rng, Allegiance::ALL),
            ed_address: self.rng.u64(..1 << 55),
            facilities,
            ..System::new(system_id, self.name(), self.coordinate())
        }
    }

    /// A galaxy with distinct system and commodity ids, inserted in random
    /// order.
    pub fn galaxy(&mut self, shape: &GalaxyShape) -> Galaxy {
        let mut galaxy = Galaxy::new(format!("{} sector", self.name()));
        galaxy.attribution = Some("ettu-testkit".to_string());
        galaxy.timestamp_utc = self.timestamp();

        let mut commodity_ids = (1..=shape.num_commodities as u32).collect::<Vec<_>>();
        self.rng.shuffle(&mut commodity_ids);
        galaxy.commodities = commodity_ids
            .into_iter()
            .map(|id| self.commodity(id))
            .collect();

        let mut system_ids = distinct_ids(&mut self.rng, shape.num_systems);
        self.rng.shuffle(&mut system_ids);
        galaxy.systems = system_ids
            .into_iter()
            .map(|id| self.system(id, shape))
            .collect();
        galaxy
    }
}

fn pick<T: Copy>(rng: &mut fastrand::Rng, values: &[T]) -> T {
    values[rng.usize(..values.len())]
}

/// `count` distinct, nonzero ids spread over the `u32` range, ascending.
fn distinct_ids(rng: &mut fastrand::Rng, count: usize) -> Vec<u32> {
    let mut ids = Vec::with_capacity(count);
    let mut next = 0u32;
    let step = (u32::MAX / (count as u32).max(1)).max(2);
    for _ in 0..count {
        next += rng.u32(1..step);
        ids.push(next);
    }
    ids
}

/// Generates a galaxy with the default shape and `num_systems` systems.
pub fn generate_galaxy(seed: u64, num_systems: usize) -> Galaxy {
    let shape = GalaxyShape {
        num_systems,
        ..Default::default()
    };
    DataGenerator::new(seed).galaxy(&shape)
}

/// Writes a generated galaxy as JSON to a temporary file, positioned at the
/// start of the file.
pub fn generate_galaxy_json(
    seed: u64,
    num_systems: usize,
) -> anyhow::Result<tempfile::NamedTempFile> {
    let galaxy = generate_galaxy(seed, num_systems);
    let mut file = tempfile::NamedTempFile::new()?;
    serde_json::to_writer(&mut file, &galaxy)?;
    file.flush()?;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}
