//! Part planning and range-descriptor math (SPEC_FULL.md §3, §4.4, §8.1).
//!
//! These are pure functions over sizes and offsets; no I/O, no policy, no session state.
//! They're the easiest thing in the crate to test exhaustively, so they're tested that way.

/// One planned part of a chunked transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    /// 1-based part number.
    pub part_number: u32,
    /// Byte offset of this part's start in the source stream.
    pub position: u64,
    /// Length of this part in bytes.
    pub length: u64,
}

/// Effective part size: `recommended` if the caller left it at 0, else `max(x, min_part)`.
pub fn part_size(configured: u64, recommended: u64, absolute_min: u64) -> u64 {
    if configured == 0 {
        recommended
    } else {
        configured.max(absolute_min)
    }
}

/// Effective cutoff at which a transfer switches from single-shot to chunked.
///
/// Per SPEC_FULL.md §4.4 step 2: `cutoff(0) = partSize(uploadPartSize)`; otherwise
/// `max(x, absolute_min)`.
pub fn cutoff(configured: u64, effective_part_size: u64, absolute_min: u64) -> u64 {
    if configured == 0 {
        effective_part_size
    } else {
        configured.max(absolute_min)
    }
}

/// Plans parts covering `[0, total_length)` in chunks of `part_size`.
///
/// Per the corrected behavior adopted in SPEC_FULL.md §9 (Open Question 2): returns an
/// empty plan when `total_length == 0`, and a **single** part spanning the whole stream
/// when `total_length <= part_size` — callers use this to recognize "just do a single-shot
/// upload" rather than ever being handed a large-file plan with zero parts.
pub fn plan_parts(total_length: u64, part_size: u64) -> Vec<Part> {
    assert!(part_size > 0, "part_size must be non-zero");

    if total_length == 0 {
        return Vec::new();
    }

    let num_parts = total_length.div_ceil(part_size);
    let mut parts = Vec::with_capacity(num_parts as usize);

    let mut position = 0u64;
    for i in 0..num_parts {
        let length = part_size.min(total_length - position);
        parts.push(Part {
            part_number: (i + 1) as u32,
            position,
            length,
        });
        position += length;
    }

    parts
}

/// Half-open `[position, position + length)` rendered as the closed HTTP
/// `Range: bytes=P-(P+L-1)` header value (SPEC_FULL.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeDescriptor {
    pub position: u64,
    pub length: u64,
}

impl RangeDescriptor {
    pub fn new(position: u64, length: u64) -> Self {
        Self { position, length }
    }

    pub fn from_part(part: &Part) -> Self {
        Self {
            position: part.position,
            length: part.length,
        }
    }

    /// Renders this range as an HTTP `Range` header value, e.g. `bytes=0-1048575`.
    pub fn to_header_value(self) -> String {
        let end = self.position + self.length.saturating_sub(1);
        format!("bytes={}-{}", self.position, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_plan_covers(total_length: u64, part_size: u64) {
        let plan = plan_parts(total_length, part_size);

        let sum: u64 = plan.iter().map(|p| p.length).sum();
        assert_eq!(sum, total_length, "coverage for total={total_length} part={part_size}");

        for (i, part) in plan.iter().enumerate() {
            assert_eq!(part.part_number, (i + 1) as u32, "1-based numbering");
            if i > 0 {
                let prev = plan[i - 1];
                assert_eq!(part.position, prev.position + prev.length, "contiguity");
            } else {
                assert_eq!(part.position, 0, "first part starts at 0");
            }
        }
    }

    #[test]
    fn coverage_and_contiguity_hold_across_sizes() {
        for total in [1u64, 2, 5, 100, 1024, 5 * 1024 * 1024, 12 * 1024 * 1024] {
            for part_size in [1u64, 7, 512, 1024, 5 * 1024 * 1024] {
                assert_plan_covers(total, part_size);
            }
        }
    }

    #[test]
    fn exact_three_part_split() {
        let plan = plan_parts(12 * 1024 * 1024, 5 * 1024 * 1024);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].length, 5 * 1024 * 1024);
        assert_eq!(plan[1].length, 5 * 1024 * 1024);
        assert_eq!(plan[2].length, 2 * 1024 * 1024);
        assert_eq!(plan[2].part_number, 3);
    }

    #[test]
    fn small_stream_plans_as_single_part_not_zero_parts() {
        let plan = plan_parts(100, 5 * 1024 * 1024);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].length, 100);
    }

    #[test]
    fn empty_stream_plans_as_no_parts() {
        assert!(plan_parts(0, 1024).is_empty());
    }

    #[test]
    fn part_size_zero_means_recommended() {
        assert_eq!(part_size(0, 100_000_000, 5_000_000), 100_000_000);
        assert_eq!(part_size(1_000, 100_000_000, 5_000_000), 5_000_000);
        assert_eq!(part_size(10_000_000, 100_000_000, 5_000_000), 10_000_000);
    }

    #[test]
    fn range_header_rendering() {
        assert_eq!(RangeDescriptor::new(0, 1024).to_header_value(), "bytes=0-1023");
        assert_eq!(RangeDescriptor::new(5_000_000, 5_000_000).to_header_value(), "bytes=5000000-9999999");
    }
}
