// src/region.rs
use std::fmt;
use std::str::FromStr;

use crate::error::ScrapeError;

/// One of the 14 Czech reporting regions.
///
/// Every year archive bundles one CSV per region; the member file names are
/// fixed two-digit numbers that do not follow the region ordering, so the
/// mapping is spelled out here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    /// Praha
    PHA,
    /// Středočeský
    STC,
    /// Jihočeský
    JHC,
    /// Plzeňský
    PLK,
    /// Ústecký
    ULK,
    /// Královéhradecký
    HKK,
    /// Jihomoravský
    JHM,
    /// Moravskoslezský
    MSK,
    /// Olomoucký
    OLK,
    /// Zlínský
    ZLK,
    /// Vysočina
    VYS,
    /// Pardubický
    PAK,
    /// Liberecký
    LBK,
    /// Karlovarský
    KVK,
}

impl Region {
    /// All regions, in the order used when no explicit list is requested.
    pub const ALL: [Region; 14] = [
        Region::PHA,
        Region::STC,
        Region::JHC,
        Region::PLK,
        Region::ULK,
        Region::HKK,
        Region::JHM,
        Region::MSK,
        Region::OLK,
        Region::ZLK,
        Region::VYS,
        Region::PAK,
        Region::LBK,
        Region::KVK,
    ];

    /// Three-letter code as it appears in the output `region` column.
    pub fn code(self) -> &'static str {
        match self {
            Region::PHA => "PHA",
            Region::STC => "STC",
            Region::JHC => "JHC",
            Region::PLK => "PLK",
            Region::ULK => "ULK",
            Region::HKK => "HKK",
            Region::JHM => "JHM",
            Region::MSK => "MSK",
            Region::OLK => "OLK",
            Region::ZLK => "ZLK",
            Region::VYS => "VYS",
            Region::PAK => "PAK",
            Region::LBK => "LBK",
            Region::KVK => "KVK",
        }
    }

    /// Name of this region's CSV member inside every year archive.
    pub fn member_file(self) -> &'static str {
        match self {
            Region::PHA => "00.csv",
            Region::STC => "01.csv",
            Region::JHC => "02.csv",
            Region::PLK => "03.csv",
            Region::ULK => "04.csv",
            Region::HKK => "05.csv",
            Region::JHM => "06.csv",
            Region::MSK => "07.csv",
            Region::OLK => "14.csv",
            Region::ZLK => "15.csv",
            Region::VYS => "16.csv",
            Region::PAK => "17.csv",
            Region::LBK => "18.csv",
            Region::KVK => "19.csv",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .iter()
            .copied()
            .find(|r| r.code() == s)
            .ok_or_else(|| ScrapeError::InvalidRegion(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for region in Region::ALL {
            assert_eq!(region.code().parse::<Region>().unwrap(), region);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = "XXX".parse::<Region>().unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidRegion(code) if code == "XXX"));
    }

    #[test]
    fn member_files_are_unique() {
        let mut files: Vec<_> = Region::ALL.iter().map(|r| r.member_file()).collect();
        files.sort();
        files.dedup();
        assert_eq!(files.len(), Region::ALL.len());
    }
}
