//! Property-based tests for genepool-evo
//!
//! Uses proptest to verify invariants and properties of the library.

use genepool_evo::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;

/// A gene whose bounds are exact at its own precision
fn exact_gene(minimum: i64, width: i64, decimals: u32) -> Gene {
    Gene::new(
        "g",
        Decimal::new(minimum, decimals),
        Decimal::new(minimum + width, decimals),
        decimals,
    )
    .unwrap()
}

fn pool_of(len: usize) -> GenePool {
    GenePool::new(
        (0..len)
            .map(|i| Gene::from_f64(format!("g{i}"), -10.0, 10.0, 2).unwrap())
            .collect(),
    )
    .unwrap()
}

proptest! {
    // ==================== Codec Properties ====================

    #[test]
    fn total_ticks_matches_scaled_range(
        minimum in -10_000i64..10_000,
        width in 0i64..100_000,
        decimals in 0u32..6
    ) {
        let gene = exact_gene(minimum, width, decimals);
        prop_assert_eq!(gene.total_ticks().unwrap(), width);
    }

    #[test]
    fn decode_then_encode_is_identity(
        minimum in -10_000i64..10_000,
        width in 1i64..100_000,
        decimals in 0u32..6,
        fraction in 0.0f64..=1.0
    ) {
        let gene = exact_gene(minimum, width, decimals);
        let tick = ((width as f64) * fraction).round() as i64;
        let value = gene.decode(tick).unwrap();
        prop_assert_eq!(gene.encode(value).unwrap(), tick);
    }

    #[test]
    fn decoded_values_stay_in_bounds(
        minimum in -10_000i64..10_000,
        width in 0i64..100_000,
        decimals in 0u32..6,
        fraction in 0.0f64..=1.0
    ) {
        let gene = exact_gene(minimum, width, decimals);
        let tick = ((width as f64) * fraction).round() as i64;
        let value = gene.decode(tick).unwrap();
        prop_assert!(value >= gene.minimum && value <= gene.maximum);
        prop_assert!(value.scale() <= decimals);
    }

    #[test]
    fn ticks_outside_range_rejected(width in 0i64..1000, beyond in 1i64..1000) {
        let gene = exact_gene(0, width, 1);
        prop_assert!(gene.decode(width + beyond).is_err());
        prop_assert!(gene.decode(-beyond).is_err());
    }

    // ==================== Crossover Properties ====================

    #[test]
    fn single_point_children_are_tail_swaps(
        len in 2usize..30,
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let cut = SinglePointCrossover::cut_point(len, &mut rng).unwrap();
        prop_assert!(cut >= 1 && cut < len);

        let a = TickGenome::new((0..len as i64).collect());
        let b = TickGenome::new((100..100 + len as i64).collect());
        let (c1, c2) = single_point_at(&a, &b, cut);
        for i in 0..len {
            let (from_a, from_b) = if i < cut { (&c1, &c2) } else { (&c2, &c1) };
            prop_assert_eq!(from_a[i], a[i]);
            prop_assert_eq!(from_b[i], b[i]);
        }
    }

    #[test]
    fn two_point_cuts_are_ordered(len in 3usize..30, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (first, second) = TwoPointCrossover::cut_points(len, &mut rng).unwrap();
        prop_assert!(first < second);
        prop_assert!(second <= len);
    }

    #[test]
    fn crossover_preserves_gene_multiset(
        genes in prop::collection::vec((0i64..50, 0i64..50), 1..20),
        seed in any::<u64>()
    ) {
        let a: TickGenome = genes.iter().map(|g| g.0).collect();
        let b: TickGenome = genes.iter().map(|g| g.1).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let crossover = Crossover::TwoPoint(TwoPointCrossover::new(1.0).unwrap());
        let (c1, c2) = crossover.crossover(&a, &b, &mut rng).unwrap();

        prop_assert_eq!(c1.len(), a.len());
        prop_assert_eq!(c2.len(), b.len());
        for i in 0..a.len() {
            let mut parents = [a[i], b[i]];
            let mut children = [c1[i], c2[i]];
            parents.sort_unstable();
            children.sort_unstable();
            prop_assert_eq!(parents, children);
        }
    }

    // ==================== Mutation Properties ====================

    #[test]
    fn mutation_stays_in_range(
        len in 1usize..10,
        rate in 0.0f64..=1.0,
        seed in any::<u64>()
    ) {
        let pool = pool_of(len);
        let total = pool.total_ticks().unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut genome = pool.random_genome(&mut rng).unwrap();

        let creep = Mutation::Creep(CreepMutation::new(rate, 0.2).unwrap());
        let uniform = Mutation::Uniform(UniformMutation::new(rate).unwrap());
        creep.mutate(&mut genome, &total, &mut rng);
        uniform.mutate(&mut genome, &total, &mut rng);

        prop_assert!(pool.validate(&genome).is_ok());
    }

    // ==================== Pairing Properties ====================

    #[test]
    fn pair_weights_positive(
        factor in 0.0f64..=1.0,
        distances in prop::collection::vec(0.0f64..100.0, 1..20)
    ) {
        let pairing = DistancePairing::new(factor, DistanceMetric::Euclidean).unwrap();
        let weights = pairing.pair_weights(&distances);
        prop_assert_eq!(weights.len(), distances.len());
        prop_assert!(weights.iter().all(|w| *w > 0.0 && w.is_finite()));
    }

    // ==================== Population Properties ====================

    #[test]
    fn population_maintains_size(size in 2usize..30, genes in 1usize..6, seed in any::<u64>()) {
        let mut ga = EvolutionaryAlgorithm::builder()
            .population_size(size)
            .max_generations(4)
            .seed(seed)
            .gene_pool(pool_of(genes))
            .evaluator(FnEvaluator::new(|g: &TickGenome| Ok(g[0] as f64)))
            .build()
            .unwrap();
        let result = ga.run().unwrap();

        prop_assert_eq!(result.generations, 4);
        for population in result.observer.generations() {
            prop_assert_eq!(population.len(), size);
            prop_assert!(population.all_evaluated());
        }
    }

    #[test]
    fn best_is_never_beaten_in_its_generation(size in 2usize..30, seed in any::<u64>()) {
        let pool = pool_of(3);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ids = IdSequence::new();
        let mut population = Population::random(size, &pool, 0, &mut ids, &mut rng).unwrap();
        let evaluator = ValueEvaluator::new(pool.clone(), |v: &[f64]| Ok(v.iter().sum::<f64>()));
        population.evaluate(&evaluator, Objective::Maximize).unwrap();

        let best = population.best(Objective::Maximize).unwrap().fitness().unwrap();
        for individual in population.iter() {
            prop_assert!(individual.fitness().unwrap() <= best);
        }
    }
}
