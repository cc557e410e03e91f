//! Part planning for multipart uploads.
//!
//! Splits a payload into fixed-size parts with 1-based part numbers and
//! works out which of them the remote store still needs.

use crate::remote::UploadedPart;

/// One planned part: byte range [start, end) (half-open) of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based part number.
    pub number: u32,
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl PartRange {
    /// Length of this part in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds a part plan for `total_size` bytes using parts of `part_size` bytes.
///
/// Every part except the last is exactly `part_size`. An empty payload gets a
/// single empty part so the session can still be completed. A `part_size`
/// of 0 is treated as 1.
pub fn plan_parts(total_size: u64, part_size: u64) -> Vec<PartRange> {
    if total_size == 0 {
        return vec![PartRange {
            number: 1,
            start: 0,
            end: 0,
        }];
    }
    let part_size = part_size.max(1);
    let count = total_size.div_ceil(part_size);

    let mut out = Vec::with_capacity(count as usize);
    let mut offset = 0u64;
    let mut number = 1u32;
    while offset < total_size {
        let end = offset.saturating_add(part_size).min(total_size);
        out.push(PartRange {
            number,
            start: offset,
            end,
        });
        offset = end;
        number += 1;
    }
    out
}

/// Planned parts the store does not already hold with the expected size.
pub fn missing_parts(plan: &[PartRange], uploaded: &[UploadedPart]) -> Vec<PartRange> {
    plan.iter()
        .filter(|range| {
            !uploaded
                .iter()
                .any(|p| p.part_number == range.number && p.size == range.len())
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded(part_number: u32, size: u64) -> UploadedPart {
        UploadedPart {
            part_number,
            size,
            checksum: format!("c{part_number}"),
        }
    }

    #[test]
    fn plan_parts_even() {
        let parts = plan_parts(1000, 250);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], PartRange { number: 1, start: 0, end: 250 });
        assert_eq!(parts[3], PartRange { number: 4, start: 750, end: 1000 });
    }

    #[test]
    fn plan_parts_short_tail() {
        let parts = plan_parts(10, 4);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 4);
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2], PartRange { number: 3, start: 8, end: 10 });
    }

    #[test]
    fn plan_parts_single_when_smaller_than_part_size() {
        let parts = plan_parts(100, 1024);
        assert_eq!(parts, vec![PartRange { number: 1, start: 0, end: 100 }]);
    }

    #[test]
    fn plan_parts_empty_payload_has_one_empty_part() {
        let parts = plan_parts(0, 1024);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].is_empty());
    }

    #[test]
    fn plan_parts_zero_part_size_is_clamped() {
        assert_eq!(plan_parts(3, 0).len(), 3);
    }

    #[test]
    fn missing_parts_skips_matching_uploads() {
        let plan = plan_parts(10, 4);
        let done = [uploaded(1, 4), uploaded(3, 2)];
        let missing = missing_parts(&plan, &done);
        assert_eq!(missing, vec![plan[1]]);
    }

    #[test]
    fn missing_parts_resends_size_mismatches() {
        let plan = plan_parts(10, 4);
        let done = [uploaded(1, 3), uploaded(2, 4), uploaded(3, 2)];
        assert_eq!(missing_parts(&plan, &done), vec![plan[0]]);
    }

    #[test]
    fn missing_parts_ignores_unknown_numbers() {
        let plan = plan_parts(4, 4);
        let done = [uploaded(9, 4)];
        assert_eq!(missing_parts(&plan, &done), plan);
    }
}
