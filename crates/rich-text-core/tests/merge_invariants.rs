//! Randomized merge and exclusivity checks
//!
//! Runs seeded sequences of apply/remove/toggle calls and checks after every step that no
//! two mergeable annotations overlap or touch, and that no offset is covered by more than
//! one exclusive format.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rich_text_core::{AnnotatedBuffer, Annotation, AnnotationKind, Attributes, InlineFormatter};

const TEXT: &str = "the quick brown fox\njumps over the lazy dog";

const KINDS: [AnnotationKind; 8] = [
    AnnotationKind::Bold,
    AnnotationKind::Italic,
    AnnotationKind::Underline,
    AnnotationKind::Strikethrough,
    AnnotationKind::Code,
    AnnotationKind::Background,
    AnnotationKind::Mark,
    AnnotationKind::Highlight,
];

fn snapshot(buffer: &AnnotatedBuffer) -> Vec<Annotation> {
    buffer.iter().map(|(_, a)| a.clone()).collect()
}

fn assert_merge_closure(buffer: &AnnotatedBuffer, step: usize) {
    let annotations = snapshot(buffer);
    for (i, a) in annotations.iter().enumerate() {
        for b in &annotations[i + 1..] {
            if a.is_mergeable_with(b) {
                assert!(
                    a.end < b.start || b.end < a.start,
                    "step {step}: {a:?} and {b:?} should have been merged"
                );
            }
        }
    }
}

fn assert_exclusivity(buffer: &AnnotatedBuffer, step: usize) {
    let annotations = snapshot(buffer);
    for offset in 0..buffer.len() {
        let covering = annotations
            .iter()
            .filter(|a| a.kind.is_exclusive() && a.contains(offset))
            .count();
        assert!(
            covering <= 1,
            "step {step}: offset {offset} covered by {covering} exclusive formats"
        );
    }
}

fn random_range(rng: &mut StdRng, len: usize) -> (usize, usize) {
    let start = rng.gen_range(0..len);
    let end = rng.gen_range(start + 1..=len);
    (start, end)
}

fn run(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let formatter = InlineFormatter::default();
    let mut buffer = AnnotatedBuffer::new(TEXT);
    let len = buffer.len();

    for step in 0..steps {
        let kind = KINDS[rng.gen_range(0..KINDS.len())];
        let (start, end) = random_range(&mut rng, len);

        match rng.gen_range(0..3) {
            0 => formatter
                .apply(&mut buffer, kind, start, end, Attributes::new())
                .unwrap(),
            1 => formatter.remove(&mut buffer, kind, start, end).unwrap(),
            _ => formatter.toggle(&mut buffer, kind, start, end).unwrap(),
        }

        for (_, a) in buffer.iter() {
            assert!(a.start <= a.end && a.end <= len, "step {step}: {a:?} out of bounds");
        }
        assert_merge_closure(&buffer, step);
        assert_exclusivity(&buffer, step);
    }
}

#[test]
fn test_random_formatting_keeps_invariants() {
    for seed in [1, 7, 42, 1234, 98765] {
        run(seed, 300);
    }
}

#[test]
fn test_full_toggle_is_reversible() {
    let mut rng = StdRng::seed_from_u64(3);
    let formatter = InlineFormatter::default();
    let mut buffer = AnnotatedBuffer::new(TEXT);
    let len = buffer.len();

    for _ in 0..50 {
        let kind = KINDS[rng.gen_range(0..5)];
        let (start, end) = random_range(&mut rng, len);
        let only_line_break = &TEXT[start..end] == "\n";

        formatter.toggle(&mut buffer, kind, start, end).unwrap();
        assert!(only_line_break || formatter.contains(&buffer, kind, start, end));
        formatter.toggle(&mut buffer, kind, start, end).unwrap();
        assert!(!formatter.contains(&buffer, kind, start, end));
    }
}
