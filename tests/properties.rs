use proptest::prelude::*;

use slot_occupancy::detect::non_max_suppression;
use slot_occupancy::estimate::TimelineEntry;
use slot_occupancy::{overlap, Detection, DurationEstimator, Rect, SlotTimeline, VehicleClass};

fn rect() -> impl Strategy<Value = Rect> {
    (0.0..500.0f64, 0.0..500.0f64, 0.0..200.0f64, 0.0..200.0f64)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn positive_rect() -> impl Strategy<Value = Rect> {
    (0.0..500.0f64, 0.0..500.0f64, 1.0..200.0f64, 1.0..200.0f64)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn detection() -> impl Strategy<Value = Detection> {
    (positive_rect(), 0.5..1.0f64).prop_map(|(r, c)| Detection::new(r, c, VehicleClass::Car))
}

fn timeline(states: &[bool]) -> SlotTimeline {
    states
        .iter()
        .enumerate()
        .map(|(i, &is_occupied)| TimelineEntry {
            frame_index: i as u64,
            is_occupied,
            confidence: 0.8,
        })
        .collect()
}

proptest! {
    #[test]
    fn overlap_is_symmetric_and_bounded(a in rect(), b in rect()) {
        let ab = overlap(a, b);
        prop_assert_eq!(ab, overlap(b, a));
        prop_assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn overlap_with_self_is_one(a in positive_rect()) {
        prop_assert!((overlap(a, a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_rects_do_not_overlap(a in positive_rect(), gap in 0.0..50.0f64) {
        let b = Rect::new(a.right() + gap, a.y, a.width, a.height);
        prop_assert_eq!(overlap(a, b), 0.0);
    }

    #[test]
    fn nms_is_idempotent(
        dets in prop::collection::vec(detection(), 0..12),
        threshold in 0.1..0.9f64
    ) {
        let once = non_max_suppression(dets, threshold);
        let twice = non_max_suppression(once.clone(), threshold);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn nms_survivors_do_not_overlap(
        dets in prop::collection::vec(detection(), 0..12),
        threshold in 0.1..0.9f64
    ) {
        let kept = non_max_suppression(dets, threshold);
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                prop_assert!(overlap(a.rect, b.rect) <= threshold);
            }
        }
    }

    #[test]
    fn stability_does_not_increase_with_flips(len in 2usize..40, flips in 0usize..39) {
        let flips = flips.min(len - 1);
        let estimator = DurationEstimator::default();
        let stability = |n: usize| {
            // first n adjacent pairs alternate, the rest repeat
            let mut states = Vec::with_capacity(len);
            let mut state = false;
            for i in 0..len {
                if i > 0 && i <= n {
                    state = !state;
                }
                states.push(state);
            }
            estimator.estimate(&timeline(&states)).stability
        };
        let fewer = stability(flips);
        prop_assert!(stability((flips + 1).min(len - 1)) <= fewer);
        prop_assert!((0.0..=1.0).contains(&fewer));
    }

    #[test]
    fn majority_decides_final_status(occupied in 0usize..20, free in 0usize..20) {
        prop_assume!(occupied + free > 0);
        let mut states = vec![true; occupied];
        states.extend(std::iter::repeat(false).take(free));
        let est = DurationEstimator::default().estimate(&timeline(&states));
        prop_assert_eq!(est.final_status, occupied > free);
        if !est.final_status {
            prop_assert_eq!(est.predicted_duration, 0);
        }
    }
}

#[test]
fn four_of_seven_is_occupied() {
    let est = DurationEstimator::default()
        .estimate(&timeline(&[true, false, true, false, true, true, false]));
    assert!(est.final_status);
}
