#![cfg(feature = "rayon")]

use blockmatch::{
    BlockMatcher, ComputeEnvironment, EnvConfig, ImageView, MatchConfig, Offset, ReferenceBlock,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn parallel_matches_sequential() {
    let (width, height) = (96, 72);
    let mut rng = StdRng::seed_from_u64(42);
    let data: Vec<f32> = (0..width * height)
        .map(|_| rng.random_range(0.0f32..255.0))
        .collect();
    let image = ImageView::from_slice(&data, width, height).unwrap();
    let block = ReferenceBlock::from_view(image, 30, 20, 16, 16).unwrap();

    let mut candidates = Vec::new();
    for y in 0..=(height - 16) as i32 {
        for x in 0..=(width - 16) as i32 {
            candidates.push(Offset::new(x, y));
        }
    }

    let cfg = MatchConfig {
        th_sse: 2_800_000.0,
        dist_mul: 1.0 / 256.0,
        ..MatchConfig::default()
    };
    let seq_env = ComputeEnvironment::acquire(EnvConfig {
        parallel: false,
        ..EnvConfig::default()
    })
    .unwrap();
    let par_env = ComputeEnvironment::acquire(EnvConfig {
        parallel: true,
        threads: Some(4),
        work_group_size: 32,
        ..EnvConfig::default()
    })
    .unwrap();

    let seq = BlockMatcher::new(&seq_env)
        .with_config(cfg.clone())
        .match_block(&block, image, &candidates)
        .unwrap();
    let par = BlockMatcher::new(&par_env)
        .with_config(cfg)
        .match_block(&block, image, &candidates)
        .unwrap();

    assert_eq!(seq.len(), par.len());
    for (s, p) in seq.iter().zip(&par) {
        assert_eq!(s.distance.to_bits(), p.distance.to_bits());
        assert_eq!(s.accepted_position(), p.accepted_position());
    }
    assert!(seq.iter().any(|r| r.is_accepted()));
}
