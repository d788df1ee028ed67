//! End-to-end searches through `BlockMatcher`.

use blockmatch::{
    best_matches, BlockMatchError, BlockMatcher, BoundsPolicy, ComputeEnvironment, EnvConfig,
    ImageView, MatchConfig, Offset, ReferenceBlock, REJECTED_DISTANCE,
};

fn make_image(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as f32);
        }
    }
    data
}

fn env() -> ComputeEnvironment {
    ComputeEnvironment::acquire(EnvConfig {
        parallel: false,
        ..EnvConfig::default()
    })
    .unwrap()
}

#[test]
fn finds_planted_copy_of_block() {
    let (width, height) = (64, 48);
    let mut data = make_image(width, height);
    let (bx, by, bw, bh) = (8, 6, 8, 8);
    let block = {
        let view = ImageView::from_slice(&data, width, height).unwrap();
        ReferenceBlock::from_view(view, bx, by, bw, bh).unwrap()
    };
    // Plant a slightly perturbed copy elsewhere.
    let (px, py) = (40, 30);
    for y in 0..bh {
        for x in 0..bw {
            data[(py + y) * width + px + x] = block.data()[y * bw + x] + 0.5;
        }
    }
    let image = ImageView::from_slice(&data, width, height).unwrap();

    let mut candidates = Vec::new();
    for y in 0..=(height - bh) as i32 {
        for x in 0..=(width - bw) as i32 {
            candidates.push(Offset::new(x, y));
        }
    }

    let env = env();
    let matcher = BlockMatcher::new(&env).with_config(MatchConfig {
        th_sse: 100.0,
        dist_mul: 1.0 / 64.0,
        ..MatchConfig::default()
    });
    let results = matcher.match_block(&block, image, &candidates).unwrap();
    let self_idx = by * (width - bw + 1) + bx;
    assert_eq!(results[self_idx].distance, REJECTED_DISTANCE);

    let best = best_matches(&results, 3);
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].position, Offset::new(px as i32, py as i32));
    assert_eq!(best[0].distance, 0.25);
}

#[test]
fn padded_rows_never_take_part_in_distances() {
    // Width 4, stride 6: columns 4 and 5 are padding.
    let data = [
        0.0f32, 1.0, 2.0, 3.0, 50.0, 50.0, //
        4.0, 5.0, 6.0, 7.0, 50.0, 50.0,
    ];
    let image = ImageView::new(&data, 4, 2, 6).unwrap();
    let block = ReferenceBlock::new(vec![1.0, 2.0, 5.0, 6.0], 2, 2).unwrap();
    let candidates = [Offset::new(0, 0), Offset::new(3, 0)];
    let env = env();

    let err = BlockMatcher::new(&env)
        .match_block(&block, image, &candidates)
        .unwrap_err();
    assert_eq!(
        err,
        BlockMatchError::CandidateOutOfBounds {
            index: 1,
            x: 3,
            y: 0,
        }
    );

    let results = BlockMatcher::new(&env)
        .with_config(MatchConfig {
            bounds: BoundsPolicy::MarkRejected,
            ..MatchConfig::default()
        })
        .match_block(&block, image, &candidates)
        .unwrap();
    assert_eq!(results[0].distance, 4.0);
    assert!(!results[1].is_accepted());
}
