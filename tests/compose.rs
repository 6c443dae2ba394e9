use std::sync::Arc;

use overtint::{
    Border, InMemoryService, Line, Mask, PixelBuffer, Rgba, SegmentIndex, Session, Style, compose,
};

fn gray_base(width: u32, height: u32) -> PixelBuffer {
    PixelBuffer::filled(width, height, Rgba::opaque(100, 100, 100))
}

/// Rows `0011 / 0011 / 0000 / 0000`: a 2x2 filled block in the top-right corner.
fn corner_block() -> Mask {
    Mask::from_fn(4, 4, |x, y| x >= 2 && y < 2)
}

fn session_with(masks: &[(u32, Mask)]) -> Session {
    let mut svc = InMemoryService::new();
    for (index, mask) in masks {
        svc.insert(SegmentIndex(*index), mask.clone());
    }
    let svc = Arc::new(svc);
    Session::new(svc.clone(), Some(svc))
}

#[test]
fn corner_block_blends_sixty_percent_toward_red() {
    let style = Style::fill(Rgba::new(255, 0, 0, 1.0));
    let out = compose(&gray_base(4, 4), &corner_block(), &style).unwrap();

    for y in 0..4 {
        for x in 0..4 {
            let expect = if x >= 2 && y < 2 {
                // 100*(1-0.6) + channel*0.6, the fixed highlight damping.
                [193, 40, 40, 255]
            } else {
                [100, 100, 100, 255]
            };
            assert_eq!(out.pixel(x, y), expect, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn every_pixel_of_the_corner_block_is_border() {
    // Invisible fill isolates the outline pass; a 2x2 block has no interior.
    let style = Style {
        highlight: Rgba::new(255, 0, 0, 0.0),
        border: Some(Border {
            color: Rgba::new(0, 0, 255, 1.0),
            thickness: 1,
            line: Line::Solid,
        }),
        glow: None,
    };
    let out = compose(&gray_base(4, 4), &corner_block(), &style).unwrap();

    for y in 0..4 {
        for x in 0..4 {
            let expect = if x >= 2 && y < 2 {
                [0, 0, 255, 255]
            } else {
                [100, 100, 100, 255]
            };
            assert_eq!(out.pixel(x, y), expect, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn preview_composites_without_mutating_the_base() {
    let mut session = session_with(&[(0, corner_block())]);
    session.set_base(gray_base(4, 4));

    let frame = session
        .preview(SegmentIndex(0), &Style::fill(Rgba::new(255, 0, 0, 1.0)))
        .unwrap();

    assert_eq!(frame.pixel(2, 0), [193, 40, 40, 255]);
    assert_eq!(session.base().unwrap().pixel(2, 0), [100, 100, 100, 255]);
}

#[test]
fn show_all_accumulates_overlapping_passes() {
    let left = Mask::from_fn(4, 1, |x, _| x < 2);
    let mid = Mask::from_fn(4, 1, |x, _| x == 1 || x == 2);
    let mut session = session_with(&[(1, left), (2, mid)]);
    session.set_base(gray_base(4, 1));

    let style = Style::fill(Rgba::new(255, 0, 0, 1.0));
    session.preview(SegmentIndex(1), &style).unwrap();
    session.preview(SegmentIndex(2), &style).unwrap();

    let out = session.show_all(&style).unwrap();
    assert_eq!(out.pixel(0, 0), [193, 40, 40, 255]);
    // Covered by both masks: the second pass blends over the first.
    assert_eq!(out.pixel(1, 0), [230, 16, 16, 255]);
    assert_eq!(out.pixel(2, 0), [193, 40, 40, 255]);
    assert_eq!(out.pixel(3, 0), [100, 100, 100, 255]);
}

#[test]
fn show_all_only_composites_cached_masks() {
    let left = Mask::from_fn(4, 1, |x, _| x < 2);
    let right = Mask::from_fn(4, 1, |x, _| x >= 2);
    let mut session = session_with(&[(0, left), (1, right)]);
    session.set_base(gray_base(4, 1));

    let style = Style::fill(Rgba::new(255, 0, 0, 1.0));
    session.preview(SegmentIndex(0), &style).unwrap();

    let out = session.show_all(&style).unwrap();
    assert_eq!(out.pixel(0, 0), [193, 40, 40, 255]);
    assert_eq!(out.pixel(3, 0), [100, 100, 100, 255]);
}

#[test]
fn commit_replaces_covered_pixels_permanently() {
    let left = Mask::from_fn(4, 1, |x, _| x < 2);
    let mut session = session_with(&[(0, left)]);
    session.set_base(gray_base(4, 1));

    let committed = session
        .commit_segment(SegmentIndex(0), &Style::fill(Rgba::opaque(0, 128, 0)))
        .unwrap();
    assert_eq!(committed.pixel(0, 0), [0, 128, 0, 255]);
    assert_eq!(committed.pixel(3, 0), [100, 100, 100, 255]);

    // The commit is the new base; later previews composite over it.
    assert_eq!(session.base().unwrap().pixel(1, 0), [0, 128, 0, 255]);
    let frame = session
        .preview(SegmentIndex(0), &Style::fill(Rgba::new(255, 255, 255, 1.0)))
        .unwrap();
    assert_eq!(frame.pixel(0, 0), [153, 204, 153, 255]);
}

#[test]
fn preview_at_resolves_the_segment_under_the_point() {
    let right = Mask::from_fn(4, 1, |x, _| x >= 2);
    let mut session = session_with(&[(3, right)]);
    session.set_base(gray_base(4, 1));

    let style = Style::fill(Rgba::new(255, 0, 0, 1.0));
    let hit = session.preview_at(3, 0, &style).unwrap().unwrap();
    assert_eq!(hit.pixel(3, 0), [193, 40, 40, 255]);
    assert_eq!(hit.pixel(0, 0), [100, 100, 100, 255]);

    assert!(session.preview_at(0, 0, &style).unwrap().is_none());
}

#[test]
fn all_false_mask_is_a_bit_for_bit_identity() {
    let mut session = session_with(&[(9, Mask::from_fn(4, 4, |_, _| false))]);
    session.set_base(gray_base(4, 4));

    let frame = session
        .preview(SegmentIndex(9), &Style::preview())
        .unwrap();
    assert_eq!(frame, *session.base().unwrap());
}
