use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Step counts up to this many show every dot.
pub const MAX_FULL_DOTS: usize = 7;

/// One marker in the step pagination strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DotMarker {
    Step { index: usize },
    Ellipsis,
}

/// Pagination dots for `total` steps with `current` active.
///
/// Long forms keep the first two and last two steps plus a window of two steps
/// on each side of the current one; every gap collapses into one ellipsis.
pub fn visible_dots(total: usize, current: usize) -> Vec<DotMarker> {
    if total == 0 {
        return Vec::new();
    }
    if total <= MAX_FULL_DOTS {
        return (0..total).map(|index| DotMarker::Step { index }).collect();
    }

    let current = current.min(total - 1);
    let last = total - 1;
    let mut shown = BTreeSet::from([0, 1, last - 1, last]);
    if current <= 3 {
        shown.extend(0..=3);
    } else if current >= total - 4 {
        shown.extend(total - 4..total);
    } else {
        shown.extend(current - 2..=current + 2);
    }

    let mut markers = Vec::with_capacity(shown.len() + 2);
    let mut previous: Option<usize> = None;
    for index in shown {
        if previous.is_some_and(|prev| index > prev + 1) {
            markers.push(DotMarker::Ellipsis);
        }
        markers.push(DotMarker::Step { index });
        previous = Some(index);
    }
    markers
}

/// Compact rendering such as `1 2 … 19 20 [21] 22 23 … 29 30`, one-based.
pub fn render_dots(markers: &[DotMarker], current: usize) -> String {
    markers
        .iter()
        .map(|marker| match marker {
            DotMarker::Step { index } if *index == current => format!("[{}]", index + 1),
            DotMarker::Step { index } => (index + 1).to_string(),
            DotMarker::Ellipsis => "…".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(markers: &[DotMarker]) -> Vec<Option<usize>> {
        markers
            .iter()
            .map(|marker| match marker {
                DotMarker::Step { index } => Some(*index),
                DotMarker::Ellipsis => None,
            })
            .collect()
    }

    #[test]
    fn short_forms_show_every_dot() {
        assert_eq!(visible_dots(7, 6).len(), 7);
        assert_eq!(
            indices(&visible_dots(3, 0)),
            vec![Some(0), Some(1), Some(2)]
        );
        assert!(visible_dots(0, 0).is_empty());
    }

    #[test]
    fn head_window_collapses_before_tail() {
        assert_eq!(
            indices(&visible_dots(10, 2)),
            vec![Some(0), Some(1), Some(2), Some(3), None, Some(8), Some(9)]
        );
    }

    #[test]
    fn tail_window_mirrors_head() {
        assert_eq!(
            indices(&visible_dots(10, 7)),
            vec![Some(0), Some(1), None, Some(6), Some(7), Some(8), Some(9)]
        );
    }

    #[test]
    fn middle_window_has_two_ellipses() {
        let markers = visible_dots(30, 20);
        assert_eq!(markers.len(), 11);
        assert_eq!(
            indices(&markers),
            vec![
                Some(0),
                Some(1),
                None,
                Some(18),
                Some(19),
                Some(20),
                Some(21),
                Some(22),
                None,
                Some(28),
                Some(29)
            ]
        );
        assert_eq!(
            render_dots(&markers, 20),
            "1 2 … 19 20 [21] 22 23 … 29 30"
        );
    }

    #[test]
    fn contiguous_groups_need_no_ellipsis() {
        let markers = visible_dots(9, 4);
        assert_eq!(markers.len(), 9);
        assert!(!markers.contains(&DotMarker::Ellipsis));
    }
}
