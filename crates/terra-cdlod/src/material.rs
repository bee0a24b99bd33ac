//! Material classification flags and detail feature groups.

use bitflags::bitflags;
use terra_config::DetailFeature;

bitflags! {
    /// Terrain material categories present in an area.
    ///
    /// A built node never carries an empty mask: areas without classification
    /// fall back to [`MaterialMask::WATER`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct MaterialMask: u32 {
        const LAND = 1;
        const WATER = 1 << 1;
        const FOREST = 1 << 2;
        const COAST = 1 << 3;
    }
}

bitflags! {
    /// Optional rendering feature groups a detail level enables.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DetailFeatures: u32 {
        const LAND = 1;
        const WATER = 1 << 1;
        const FOREST = 1 << 2;
        const COAST = 1 << 3;
    }
}

impl MaterialMask {
    /// The mask itself, or `WATER` when nothing was classified.
    pub fn or_water(self) -> Self {
        if self.is_empty() { Self::WATER } else { self }
    }
}

impl From<DetailFeature> for DetailFeatures {
    fn from(feature: DetailFeature) -> Self {
        match feature {
            DetailFeature::Land => Self::LAND,
            DetailFeature::Water => Self::WATER,
            DetailFeature::Forest => Self::FOREST,
            DetailFeature::Coast => Self::COAST,
        }
    }
}

impl FromIterator<DetailFeature> for DetailFeatures {
    fn from_iter<I: IntoIterator<Item = DetailFeature>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |acc, feature| acc | Self::from(feature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_water_fallback() {
        assert_eq!(MaterialMask::empty().or_water(), MaterialMask::WATER);
        assert_eq!(MaterialMask::LAND.or_water(), MaterialMask::LAND);
    }

    #[test]
    fn test_features_from_config() {
        let features: DetailFeatures = [DetailFeature::Land, DetailFeature::Forest]
            .into_iter()
            .collect();
        assert_eq!(features, DetailFeatures::LAND | DetailFeatures::FOREST);
        let all: DetailFeatures = [
            DetailFeature::Land,
            DetailFeature::Water,
            DetailFeature::Forest,
            DetailFeature::Coast,
        ]
        .into_iter()
        .collect();
        assert_eq!(all, DetailFeatures::all());
    }
}
