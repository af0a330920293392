use engine::visitation::Visitation;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn same_seed_gives_same_order() {
    let a = Visitation::new(6, 7, &mut StdRng::seed_from_u64(42)).unwrap();
    let b = Visitation::new(6, 7, &mut StdRng::seed_from_u64(42)).unwrap();
    assert_eq!(a.order(), b.order());
}

#[test]
fn reshuffle_changes_the_order() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut v = Visitation::new(10, 10, &mut rng).unwrap();
    let first = v.order().to_vec();
    v.reshuffle(&mut rng);
    assert_ne!(first, v.order());
}

#[test]
fn coordinates_decode_column_major() {
    let v = Visitation::new(3, 4, &mut StdRng::seed_from_u64(1)).unwrap();
    for (i, (y, x)) in v.coords().enumerate() {
        let k = v.order()[i];
        assert_eq!((y, x), (k % 3, k / 3));
        assert_eq!(v.get(i), (y, x));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_cell_visited_exactly_once(ydim in 1usize..12, xdim in 1usize..12, seed in any::<u64>(), reshuffles in 0usize..4) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut v = Visitation::new(ydim, xdim, &mut rng).unwrap();
        for _ in 0..reshuffles {
            v.reshuffle(&mut rng);
        }
        prop_assert_eq!(v.len(), ydim * xdim);

        let mut seen = vec![false; ydim * xdim];
        for (y, x) in v.coords() {
            prop_assert!(y < ydim && x < xdim);
            let k = x * ydim + y;
            prop_assert!(!seen[k]);
            seen[k] = true;
        }
        prop_assert!(seen.iter().all(|&s| s));
    }
}
