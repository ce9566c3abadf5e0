//! Immutable region table with inclusive key/velocity matching.

use alloc::vec::Vec;

use crate::error::EngineError;
use crate::region::Region;

/// The loaded set of regions, built once and read-only afterwards.
///
/// Matching walks regions in table order; ids equal table indices and stay
/// stable for the table's lifetime.
#[derive(Clone, Debug, Default)]
pub struct RegionTable {
    regions: Vec<Region>,
}

impl RegionTable {
    /// Build a table from parsed regions, validating invariants and
    /// assigning stable ids.
    pub fn new(mut regions: Vec<Region>) -> Result<Self, EngineError> {
        for (index, region) in regions.iter_mut().enumerate() {
            if !region.key_range.is_valid() {
                return Err(EngineError::InvalidRegion {
                    index,
                    reason: "key range inverted or past 127",
                });
            }
            if !region.vel_range.is_valid() {
                return Err(EngineError::InvalidRegion {
                    index,
                    reason: "velocity range inverted or past 127",
                });
            }
            if let Some(loop_end) = region.loop_end {
                if loop_end < region.loop_start {
                    return Err(EngineError::InvalidRegion {
                        index,
                        reason: "loop end before loop start",
                    });
                }
            }
            if region.pitch_keycenter > 127 {
                return Err(EngineError::InvalidRegion {
                    index,
                    reason: "pitch keycenter past 127",
                });
            }
            if region.sustain_cc > 127 {
                return Err(EngineError::InvalidRegion {
                    index,
                    reason: "sustain cc past 127",
                });
            }
            region.id = index as u32;
        }
        Ok(Self { regions })
    }

    /// Number of regions in the table.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Full record at `index`, or a range error outside `[0, region_count())`.
    pub fn region_at(&self, index: usize) -> Result<&Region, EngineError> {
        self.regions.get(index).ok_or(EngineError::RegionIndex {
            index,
            count: self.regions.len(),
        })
    }

    /// All regions, in table order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Regions whose key and velocity ranges both contain the values,
    /// inclusively, in table order.
    pub fn regions_matching(
        &self,
        note: u8,
        velocity: u8,
    ) -> impl Iterator<Item = &Region> {
        self.regions
            .iter()
            .filter(move |r| r.matches(note, velocity))
    }

    /// Indices of regions whose key range contains `note`, independent of
    /// velocity.
    pub fn regions_for_note(&self, note: u8) -> Vec<u32> {
        self.regions
            .iter()
            .filter(|r| r.key_range.contains(note))
            .map(|r| r.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MidiRange;
    use alloc::vec;

    fn keyed_region(lo: u8, hi: u8) -> Region {
        let mut region = Region::new("*sine");
        region.key_range = MidiRange::new(lo, hi);
        region
    }

    #[test]
    fn empty_table_has_no_regions() {
        let table = RegionTable::new(Vec::new()).unwrap();
        assert_eq!(table.region_count(), 0);
        assert!(table.region_at(0).is_err());
    }

    #[test]
    fn ids_follow_table_order() {
        let table =
            RegionTable::new(vec![keyed_region(0, 63), keyed_region(64, 127)]).unwrap();
        assert_eq!(table.region_at(0).unwrap().id, 0);
        assert_eq!(table.region_at(1).unwrap().id, 1);
    }

    #[test]
    fn region_at_last_index_succeeds_one_past_fails() {
        let table = RegionTable::new(vec![keyed_region(0, 127)]).unwrap();
        assert!(table.region_at(table.region_count() - 1).is_ok());
        let err = table.region_at(table.region_count()).unwrap_err();
        assert_eq!(err, EngineError::RegionIndex { index: 1, count: 1 });
    }

    #[test]
    fn matching_is_inclusive_and_in_table_order() {
        let table = RegionTable::new(vec![
            keyed_region(60, 60),
            keyed_region(0, 127),
            keyed_region(61, 64),
        ])
        .unwrap();
        let ids: Vec<u32> = table.regions_matching(60, 64).map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1]);
        let ids: Vec<u32> = table.regions_matching(59, 64).map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
        let ids: Vec<u32> = table.regions_matching(61, 64).map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn matching_honors_velocity_range() {
        let mut region = keyed_region(0, 127);
        region.vel_range = MidiRange::new(100, 127);
        let table = RegionTable::new(vec![region]).unwrap();
        assert_eq!(table.regions_matching(60, 99).count(), 0);
        assert_eq!(table.regions_matching(60, 100).count(), 1);
    }

    #[test]
    fn regions_for_note_ignores_velocity() {
        let mut quiet = keyed_region(60, 60);
        quiet.vel_range = MidiRange::new(0, 0);
        let table = RegionTable::new(vec![quiet, keyed_region(0, 59)]).unwrap();
        assert_eq!(table.regions_for_note(60), vec![0]);
        assert_eq!(table.regions_for_note(59), vec![1]);
        assert!(table.regions_for_note(127).is_empty());
    }

    #[test]
    fn inverted_key_range_fails_build() {
        let err = RegionTable::new(vec![keyed_region(64, 60)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRegion { index: 0, .. }));
    }

    #[test]
    fn inverted_loop_range_fails_build() {
        let mut region = keyed_region(0, 127);
        region.loop_start = 100;
        region.loop_end = Some(50);
        let err = RegionTable::new(vec![region]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRegion { index: 0, .. }));
    }

    #[test]
    fn out_of_range_sustain_cc_fails_build() {
        let mut region = keyed_region(0, 127);
        region.sustain_cc = 200;
        let err = RegionTable::new(vec![region]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRegion { index: 0, .. }));
    }
}
