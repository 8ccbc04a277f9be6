//! Property tests for the mwp algebra and choice generation


use generators::*;
use mwp::algebra::*;
use mwp::analysis::{analyze_body, DOMAIN};
use mwp::{AnalysisOptions, Choices, DeltaGraph};
use proptest::prelude::*;

const INDEX: usize = 3;

/// Same value under every choice vector
fn same_poly(p: &Polynomial, q: &Polynomial) -> bool {
    all_choices(INDEX)
        .iter()
        .all(|c| p.evaluate(c) == q.evaluate(c))
}

fn same_matrix(a: &Matrix, b: &Matrix) -> bool {
    a.size() == b.size()
        && (0..a.size()).all(|i| (0..a.size()).all(|j| same_poly(a.get(i, j), b.get(i, j))))
}

/// `a` is below `b` under every choice vector
fn below(a: &Matrix, b: &Matrix) -> bool {
    all_choices(INDEX).iter().all(|c| {
        (0..a.size()).all(|i| {
            (0..a.size()).all(|j| a.get(i, j).evaluate(c) <= b.get(i, j).evaluate(c))
        })
    })
}

fn covered(witnesses: &[Vec<Delta>], choice: &[u8]) -> bool {
    witnesses
        .iter()
        .any(|w| w.iter().all(|d| choice[d.index] == d.value))
}

// ============================================================================
// Scalars
// ============================================================================

proptest! {
    #[test]
    fn scalar_laws(a in arb_scalar(), b in arb_scalar(), c in arb_scalar()) {
        prop_assert_eq!(a.add(&b), b.add(&a));
        prop_assert_eq!(a.mul(&b), b.mul(&a));
        prop_assert_eq!(a.add(&b).add(&c), a.add(&b.add(&c)));
        prop_assert_eq!(a.mul(&b).mul(&c), a.mul(&b.mul(&c)));
        prop_assert_eq!(a.mul(&b.add(&c)), a.mul(&b).add(&a.mul(&c)));
        prop_assert_eq!(a.add(&Scalar::zero()), a);
        prop_assert_eq!(a.mul(&Scalar::one()), a);
    }
}

// ============================================================================
// Polynomials
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn polynomial_sum_is_pointwise_max(p in arb_polynomial(INDEX), q in arb_polynomial(INDEX)) {
        let sum = p.add(&q);
        for c in all_choices(INDEX) {
            prop_assert_eq!(sum.evaluate(&c), p.evaluate(&c).add(&q.evaluate(&c)));
        }
        prop_assert_eq!(sum, q.add(&p));
    }

    #[test]
    fn polynomial_product_is_pointwise(p in arb_polynomial(INDEX), q in arb_polynomial(INDEX)) {
        let product = p.times(&q);
        for c in all_choices(INDEX) {
            prop_assert_eq!(product.evaluate(&c), p.evaluate(&c).mul(&q.evaluate(&c)));
        }
    }

    #[test]
    fn monomial_multiply_is_pointwise(p in arb_polynomial(INDEX), m in arb_monomial(INDEX)) {
        let product = p.multiply(&m);
        for c in all_choices(INDEX) {
            prop_assert_eq!(product.evaluate(&c), p.evaluate(&c).mul(&m.evaluate(&c)));
        }
        prop_assert_eq!(product, p.times(&Polynomial::from_monomials([m])));
    }

    #[test]
    fn polynomial_identities(p in arb_polynomial(INDEX)) {
        prop_assert_eq!(p.add(&Polynomial::zero()), p.clone());
        prop_assert_eq!(p.add(&p), p.clone());
        prop_assert_eq!(p.times(&Polynomial::unit()), p.clone());
        prop_assert!(p.times(&Polynomial::zero()).is_zero());
    }

    #[test]
    fn polynomial_distributes(
        p in arb_polynomial(INDEX),
        q in arb_polynomial(INDEX),
        r in arb_polynomial(INDEX),
    ) {
        let lhs = p.times(&q.add(&r));
        let rhs = p.times(&q).add(&p.times(&r));
        prop_assert!(same_poly(&lhs, &rhs));
    }

    #[test]
    fn polynomial_is_canonical(p in arb_polynomial(INDEX)) {
        let monomials = p.monomials();
        for (i, m) in monomials.iter().enumerate() {
            prop_assert!(!m.is_zero());
            for (j, other) in monomials.iter().enumerate() {
                if i != j {
                    prop_assert!(!other.absorbs(m), "{} absorbs {}", other, m);
                }
            }
        }
        prop_assert!(monomials.windows(2).all(|w| w[0].deltas() < w[1].deltas()));
    }
}

// ============================================================================
// Matrices
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn identity_is_neutral(m in arb_matrix(3, INDEX)) {
        let id = Matrix::identity(m.size());
        prop_assert_eq!(id.product(&m), m.clone());
        prop_assert_eq!(m.product(&id), m);
    }

    #[test]
    fn fixpoint_is_closed(m in arb_matrix(3, INDEX)) {
        let fix = m.fixpoint();
        prop_assert!(below(&Matrix::identity(m.size()), &fix));
        prop_assert!(below(&m, &fix));
        prop_assert!(below(&fix.product(&m), &fix));
        prop_assert!(same_matrix(&fix.fixpoint(), &fix));
    }

    #[test]
    fn fixpoint_of_zero(n in 1usize..5) {
        prop_assert_eq!(Matrix::zero(n).fixpoint(), Matrix::identity(n));
    }

    #[test]
    fn relation_identity_compose(m in arb_matrix(3, INDEX)) {
        let variables: Vec<String> = (0..m.size()).map(|i| format!("v{}", i)).collect();
        let r = Relation::with_matrix(variables.clone(), m).unwrap();
        prop_assert_eq!(Relation::identity(variables.clone()).compose(&r), r.clone());
        prop_assert_eq!(r.compose(&Relation::empty()), r.clone());
        prop_assert_eq!(r.sum(&r), r);
    }
}

// ============================================================================
// Choices
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn choices_are_exact(witnesses in arb_witnesses(4)) {
        let choices = Choices::generate(&DOMAIN, 4, witnesses.clone()).unwrap();
        for c in all_choices(4) {
            prop_assert_eq!(choices.is_valid(&c), !covered(&witnesses, &c), "choice {:?}", c);
        }
        for v in choices.vectors() {
            prop_assert!(v.iter().all(|set| !set.is_empty()));
        }
    }

    #[test]
    fn delta_graph_is_sound(witnesses in arb_witnesses(3)) {
        let mut graph = DeltaGraph::new(DOMAIN.len());
        for w in witnesses.iter().cloned() {
            graph.insert_node(w);
        }
        graph.fusion();
        let choices = Choices::generate(&DOMAIN, 3, witnesses).unwrap();
        if graph.is_empty() {
            prop_assert!(choices.is_infinite());
        }
    }

    #[test]
    fn fused_graph_gives_same_vectors(witnesses in arb_witnesses(3)) {
        let mut graph = DeltaGraph::new(DOMAIN.len());
        for w in witnesses.iter().cloned() {
            graph.insert_node(w);
        }
        graph.fusion();
        let fused = Choices::generate(&DOMAIN, 3, graph.nodes().cloned()).unwrap();
        let direct = Choices::generate(&DOMAIN, 3, witnesses).unwrap();
        prop_assert_eq!(fused.vectors(), direct.vectors());
    }

    #[test]
    fn more_witnesses_never_allow_more(
        witnesses in arb_witnesses(4),
        extra in arb_witnesses(4),
    ) {
        let before = Choices::generate(&DOMAIN, 4, witnesses.clone()).unwrap();
        let after = Choices::generate(&DOMAIN, 4, witnesses.into_iter().chain(extra)).unwrap();
        for index in 0..4 {
            let allowed = after.allowed_at(index);
            prop_assert!(
                allowed.is_subset(&before.allowed_at(index)),
                "index {}: {:?} not within {:?}", index, allowed, before.allowed_at(index)
            );
        }
        for c in all_choices(4) {
            prop_assert!(!after.is_valid(&c) || before.is_valid(&c), "choice {:?}", c);
        }
    }
}

// ============================================================================
// Analysis
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn choices_match_evaluation(body in arb_analyzable_body()) {
        let options = AnalysisOptions {
            fin: true,
            ..AnalysisOptions::default()
        };
        let out = analyze_body(&body, 0, &options).unwrap();
        prop_assume!(out.index <= 5);
        for c in all_choices(out.index) {
            let scalars = out.relation.apply_choice(&c);
            let infinite = scalars.cells.iter().flatten().any(|s| s.is_infinite());
            prop_assert_eq!(out.choices.is_valid(&c), !infinite, "choice {:?}", c);
        }
        if out.delta_infinite {
            prop_assert!(out.choices.is_infinite());
        }
    }
}
