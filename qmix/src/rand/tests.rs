use super::*;
use std::time::Duration;

#[test]
fn duration_from_nanos_reversible() {
    for case in [
        Duration::ZERO,
        Duration::from_nanos(1),
        Duration::from_micros(1),
        Duration::from_millis(1),
        Duration::from_secs(1),
        Duration::MAX,
    ] {
        assert_eq!(case, duration_from_nanos(case.as_nanos()));
    }
}

#[test]
fn random_duration() {
    const NANOSECOND: Duration = Duration::new(0, 1);
    let mut rng = Xorshift::default();

    #[derive(Debug)]
    struct Case {
        range: Range<Duration>,
        exp_min: Duration,
        exp_max: Duration,
    }
    for case in &[
        Case {
            range: Duration::ZERO..Duration::ZERO,
            exp_min: Duration::ZERO,
            exp_max: Duration::ZERO,
        },
        Case {
            range: Duration::ZERO..Duration::from_nanos(1),
            exp_min: Duration::ZERO,
            exp_max: Duration::ZERO,
        },
        Case {
            range: Duration::ZERO..Duration::from_millis(100),
            exp_min: Duration::ZERO,
            exp_max: Duration::from_millis(100) - NANOSECOND,
        },
        Case {
            range: Duration::ZERO..Duration::MAX,
            exp_min: Duration::ZERO,
            exp_max: Duration::MAX - NANOSECOND,
        },
        Case {
            range: Duration::from_millis(50)..Duration::from_millis(100),
            exp_min: Duration::from_millis(50),
            exp_max: Duration::from_millis(100) - NANOSECOND,
        },
        // excess
        Case {
            range: Duration::from_secs(101)..Duration::from_secs(100),
            exp_min: Duration::from_secs(101),
            exp_max: Duration::from_secs(101),
        },
    ] {
        for _ in 0..100 {
            let d = rng.gen_range(case.range.clone());
            assert!(d >= case.exp_min, "for case {case:?} random duration was {d:?}");
            assert!(d <= case.exp_max, "for case {case:?} random duration was {d:?}");
        }
    }
}

#[test]
fn xorshift_seed() {
    let mut rng = Xorshift::seed(0); // should not initialise from 0 seed under the hood
    assert_eq!(u64::MAX >> 1, rng.seed);
    assert_ne!(0, rng.next_u64());

    let mut rng = Xorshift::seed(u64::MAX);
    assert_eq!(u64::MAX, rng.seed);
    assert_ne!(0, rng.next_u64());
}

#[test]
fn wyrand_same_seed_same_stream() {
    let mut a = Wyrand::seed(42);
    let mut b = Wyrand::seed(42);
    let mut c = Wyrand::seed(43);
    let a = (0..16).map(|_| a.next_u64()).collect::<Vec<_>>();
    let b = (0..16).map(|_| b.next_u64()).collect::<Vec<_>>();
    let c = (0..16).map(|_| c.next_u64()).collect::<Vec<_>>();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn derived_seeds_differ() {
    let seeds = (0..8).map(|stream| derive_seed(7, stream)).collect::<Vec<_>>();
    for (i, a) in seeds.iter().enumerate() {
        for b in &seeds[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(derive_seed(7, 3), derive_seed(7, 3));
}

#[derive(Default, Debug)]
struct MockRng {
    next: u64,
}

impl Rand64 for MockRng {
    fn next_u64(&mut self) -> u64 {
        self.next
    }
}

#[test]
fn next_bool() {
    // NB: no matter what the random number, p(0.0) should always evaluate to false,
    // while p(1.0) should always evaluate to true

    let mut rng = MockRng::default();
    rng.next = 0;
    assert!(!rng.next_bool(0.0.into()));
    assert!(rng.next_bool(f64::EPSILON.into()));
    assert!(rng.next_bool(0.5.into()));
    assert!(rng.next_bool(1.0.into()));

    rng.next = u64::MAX / 2;
    assert!(!rng.next_bool(0.0.into()));
    assert!(!rng.next_bool((0.5 - f64::EPSILON).into()));
    assert!(rng.next_bool((0.5 + f64::EPSILON).into()));
    assert!(rng.next_bool(1.0.into()));

    rng.next = u64::MAX;
    assert!(!rng.next_bool(0.0.into()));
    assert!(!rng.next_bool(0.5.into()));
    assert!(!rng.next_bool((1.0 - f64::EPSILON).into()));
    assert!(rng.next_bool(1.0.into()));
}

#[test]
fn next_below_in_bounds() {
    let mut rng = Wyrand::seed(9);
    for bound in [1, 2, 3, 10, 1_000] {
        for _ in 0..1_000 {
            assert!(rng.next_below(bound) < bound);
        }
    }
}

#[test]
fn probability_try_new() {
    assert_eq!(Some(0.1), Probability::try_new(0.1).map(f64::from));
    assert!(Probability::try_new(-0.1).is_none());
    assert!(Probability::try_new(1.1).is_none());
    assert!(Probability::try_new(f64::NAN).is_none());
}

#[test]
#[should_panic(expected = "cannot be less than 0")]
fn probability_panics_lt_0() {
    Probability::new(0f64 - f64::EPSILON);
}

#[test]
#[should_panic(expected = "cannot be greater than 1")]
fn probability_panics_gt_1() {
    Probability::new(1f64 + f64::EPSILON);
}
