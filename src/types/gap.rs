use serde::{Deserialize, Serialize};

/// A contiguous range of epochs for which one task's derived records are
/// absent from a storage sink. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapReport {
    pub task: String,
    pub from: i64,
    pub to: i64,
}

impl GapReport {
    pub fn epochs(&self) -> impl Iterator<Item = i64> {
        self.from..=self.to
    }

    pub fn len(&self) -> u64 {
        (self.to - self.from + 1).max(0) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }
}

/// Collapse a sorted list of missing heights into inclusive ranges.
pub fn ranges_from_heights(task: &str, heights: &[i64]) -> Vec<GapReport> {
    let mut out: Vec<GapReport> = Vec::new();
    for &h in heights {
        match out.last_mut() {
            Some(last) if last.to + 1 == h => last.to = h,
            _ => out.push(GapReport { task: task.to_string(), from: h, to: h }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_contiguous_heights() {
        let reports = ranges_from_heights("reward", &[1, 2, 3, 7, 9, 10]);
        assert_eq!(
            reports,
            vec![
                GapReport { task: "reward".into(), from: 1, to: 3 },
                GapReport { task: "reward".into(), from: 7, to: 7 },
                GapReport { task: "reward".into(), from: 9, to: 10 },
            ]
        );
    }

    #[test]
    fn empty_input_yields_no_ranges() {
        assert!(ranges_from_heights("blocks", &[]).is_empty());
    }
}
