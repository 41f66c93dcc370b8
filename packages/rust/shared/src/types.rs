//! Core domain types for bandmerge runs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Brazilian federal units (UF), each expected as a subdirectory of the input root.
pub const BRAZILIAN_STATES: [&str; 27] = [
    "AC", "AL", "AM", "AP", "BA", "CE", "DF", "ES", "GO", "MA", "MG", "MS", "MT", "PA", "PB",
    "PE", "PI", "PR", "RJ", "RN", "RO", "RR", "RS", "SC", "SE", "SP", "TO",
];

/// Band markers of interest, in the order a sorted scene lists them.
pub const DEFAULT_BANDS: [&str; 3] = ["B4", "B5", "B6"];

/// Band order inside the composite: NIR, SWIR, red.
pub const DEFAULT_COMPOSITE_ORDER: [&str; 3] = ["B5", "B6", "B4"];

/// Token substituted for the band marker in the merged file name.
pub const MERGED_TOKEN: &str = "MERGED";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// RasterDataType
// ---------------------------------------------------------------------------

/// Output pixel type for the merged raster, as GDAL names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterDataType {
    Byte,
    Int16,
    #[default]
    UInt16,
    UInt32,
    Int32,
    Float32,
    Float64,
    CInt16,
    CInt32,
    CFloat32,
    CFloat64,
}

impl RasterDataType {
    /// All types, indexed by the numeric code geoprocessing toolkits use for them.
    pub const ALL: [RasterDataType; 11] = [
        Self::Byte,
        Self::Int16,
        Self::UInt16,
        Self::UInt32,
        Self::Int32,
        Self::Float32,
        Self::Float64,
        Self::CInt16,
        Self::CInt32,
        Self::CFloat32,
        Self::CFloat64,
    ];

    /// Look up a type by numeric code (`2` is `UInt16`).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Name accepted by GDAL's `-ot` switch.
    pub fn as_gdal_name(&self) -> &'static str {
        match self {
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::UInt32 => "UInt32",
            Self::Int32 => "Int32",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::CInt16 => "CInt16",
            Self::CInt32 => "CInt32",
            Self::CFloat32 => "CFloat32",
            Self::CFloat64 => "CFloat64",
        }
    }
}

impl std::fmt::Display for RasterDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_gdal_name())
    }
}

impl std::str::FromStr for RasterDataType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_gdal_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown raster data type '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn states_are_sorted_two_letter_codes() {
        assert_eq!(BRAZILIAN_STATES.len(), 27);
        assert!(BRAZILIAN_STATES.windows(2).all(|w| w[0] < w[1]));
        assert!(
            BRAZILIAN_STATES
                .iter()
                .all(|uf| uf.len() == 2 && uf.chars().all(|c| c.is_ascii_uppercase()))
        );
    }

    #[test]
    fn data_type_index_two_is_uint16() {
        assert_eq!(RasterDataType::from_index(2), Some(RasterDataType::UInt16));
        assert_eq!(RasterDataType::from_index(0), Some(RasterDataType::Byte));
        assert_eq!(RasterDataType::from_index(11), None);
        assert_eq!(RasterDataType::default(), RasterDataType::UInt16);
    }

    #[test]
    fn data_type_parses_case_insensitively() {
        let t: RasterDataType = "float32".parse().expect("parse");
        assert_eq!(t, RasterDataType::Float32);
        assert!("Float128".parse::<RasterDataType>().is_err());
    }

    #[test]
    fn data_type_serializes_as_gdal_name() {
        let json = serde_json::to_string(&RasterDataType::UInt16).expect("serialize");
        assert_eq!(json, "\"UInt16\"");
    }
}
