// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

use air_assembly_compiler::{CompileOptions, compile};
use air_assembly_winterfell::{
    AirModule, Backend, BaseElement as BE, Error, InputTree, InstantiateOptions, instantiate,
};
use winterfell::Trace;
use winterfell::math::{FieldElement, fft, polynom};

const MIMC: &str = r"
(module
  (field prime 340282366920938463463374607393113505793)
  (const scalar 3)
  (static
    (input public vector filled)
    (input public (parent 0) (steps 4))
    (input secret (parent 0) (steps 4))
    (cycle 42 43 170 2209 16426 78087 279978 823517))
  (transition
    (span 1) (result vector 1)
    (add (exp (load.trace 0) (scalar 3)) (get (load.static 0) 1)))
  (evaluation
    (span 2) (result vector 1)
    (sub (load.trace 1)
         (add (exp (load.trace 0) (load.const 0)) (get (load.static 0) 1)))))
";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("air_assembly_winterfell=debug")
        .with_test_writer()
        .try_init();
}

fn module(backend: Backend) -> AirModule {
    init_logging();

    let schema = compile(MIMC, &CompileOptions::default()).expect("compile");
    instantiate(&schema, &InstantiateOptions::default().with_backend(backend)).expect("instantiate")
}

fn inputs() -> Vec<InputTree> {
    vec![
        InputTree::from(vec![1u128, 2, 3, 4]),
        InputTree::from(vec![vec![1u128, 2], vec![3, 4], vec![5, 6], vec![7, 8]]),
        InputTree::from(vec![
            vec![11u128, 12],
            vec![13, 14],
            vec![15, 16],
            vec![17, 18],
        ]),
    ]
}

fn shapes() -> Vec<Vec<usize>> {
    vec![vec![4], vec![2, 2, 2, 2], vec![2, 2, 2, 2]]
}

fn interpolate(col: &[BE]) -> Vec<BE> {
    let mut p = col.to_vec();
    fft::interpolate_poly(&mut p, &fft::get_inv_twiddles::<BE>(col.len()));
    p
}

#[test]
fn module_shape() {
    let m = module(Backend::Serial);

    assert_eq!(m.trace_register_count(), 1);
    assert_eq!(m.static_register_count(), 4);
    assert_eq!(m.composition_factor(), 4);
    assert_eq!(m.extension_factor(), 8);
    assert_eq!(m.secret_registers(), &[2]);
    assert_eq!(m.input_descriptors().len(), 3);
}

#[test]
fn trace_satisfies_constraints() {
    let m = module(Backend::Serial);
    let proof = m.init_proof(&inputs()).expect("init proof");
    assert_eq!(proof.trace_length(), 32);

    let trace = proof.generate_execution_trace().expect("trace");
    assert_eq!(trace.length(), 32);

    // 0 -> 0^3 + 1 -> 1^3 + 1 -> 2^3 + 1
    assert_eq!(trace.get(0, 0), BE::ZERO);
    assert_eq!(trace.get(0, 1), BE::new(1));
    assert_eq!(trace.get(0, 2), BE::new(2));
    assert_eq!(trace.get(0, 3), BE::new(9));

    for i in 0..31 {
        let r = [trace.get(0, i)];
        let n = [trace.get(0, i + 1)];
        let q = m.evaluate(&r, &n, &proof.static_values_at(i)).unwrap();
        assert_eq!(q, vec![BE::ZERO], "step {i}");
    }
}

#[test]
fn static_registers_follow_input_layout() {
    let m = module(Backend::Serial);
    let proof = m.init_proof(&inputs()).expect("init proof");

    let k0 = proof.static_values_at(0);
    assert_eq!(k0, [1u128, 1, 11, 42].map(BE::new).to_vec());

    // leaf 5 (second value of the third group), cycle step 21 % 8
    let k = proof.static_values_at(21);
    assert_eq!(k, [3u128, 6, 16, 78087].map(BE::new).to_vec());
}

#[test]
fn composition_vanishes_on_execution_points() {
    let m = module(Backend::Parallel);
    let proof = m.init_proof(&inputs()).unwrap();
    let trace = proof.generate_execution_trace().unwrap();
    let polys = proof.interpolate_trace(&trace).unwrap();

    let q = proof.evaluate_transition_constraints(&polys).unwrap();
    assert_eq!(q.len(), 1);
    assert_eq!(q[0].len(), 128);

    let cf = m.composition_factor();
    for i in 0..31 {
        assert_eq!(q[0][i * cf], BE::ZERO, "row {i}");
    }

    // off the execution points the constraint is not identically zero
    assert!(q[0].iter().any(|v| *v != BE::ZERO));
}

#[test]
fn backends_agree() {
    let serial = module(Backend::Serial);
    let parallel = module(Backend::Parallel);

    let run = |m: &AirModule| {
        let proof = m.init_proof(&inputs()).unwrap();
        let trace = proof.generate_execution_trace().unwrap();
        let polys = proof.interpolate_trace(&trace).unwrap();
        (
            proof.evaluate_trace_polynomials(&polys).unwrap(),
            proof.evaluate_transition_constraints(&polys).unwrap(),
            proof.secret_register_traces(),
        )
    };

    assert_eq!(run(&serial), run(&parallel));
}

#[test]
fn verifier_matches_prover_on_composition_domain() {
    let m = module(Backend::Parallel);
    let proof = m.init_proof(&inputs()).unwrap();
    let trace = proof.generate_execution_trace().unwrap();
    let polys = proof.interpolate_trace(&trace).unwrap();

    let q = proof.evaluate_transition_constraints(&polys).unwrap();
    let lde = proof.evaluate_trace_polynomials(&polys).unwrap();
    let secrets = proof.secret_register_traces();

    let public = vec![inputs()[0].clone(), inputs()[1].clone()];
    let verifier = m.init_verification(&shapes(), &public).unwrap();

    let cf = m.composition_factor();
    let ef = m.extension_factor();
    let step = ef / cf;
    let size = proof.composition_domain().size();
    let lde_size = proof.evaluation_domain().size();

    for j in 0..size {
        let x = proof.composition_domain().point(j);
        assert_eq!(x, proof.evaluation_domain().point(j * step));

        let r = [lde[0][j * step]];
        let n = [lde[0][((j + cf) * step) % lde_size]];
        let h = [secrets[0][j * step]];

        let at = verifier.evaluate_constraints_at(x, &r, &n, &h).unwrap();
        assert_eq!(at[0], q[0][j], "point {j}");
    }
}

#[test]
fn verifier_matches_prover_off_domain() {
    let m = module(Backend::Serial);
    let proof = m.init_proof(&inputs()).unwrap();
    let trace = proof.generate_execution_trace().unwrap();
    let polys = proof.interpolate_trace(&trace).unwrap();

    let public = vec![inputs()[0].clone(), inputs()[1].clone()];
    let verifier = m.init_verification(&shapes(), &public).unwrap();

    let g = proof.execution_domain().generator();
    let x = BE::new(0x1234_5678_9abc_def0);

    let r = [polynom::eval(&polys[0], x)];
    let n = [polynom::eval(&polys[0], x * g)];

    let static_polys: Vec<Vec<BE>> = proof
        .static_columns()
        .iter()
        .map(|c| interpolate(c))
        .collect();
    let k: Vec<BE> = static_polys.iter().map(|p| polynom::eval(p, x)).collect();
    let h = [k[2]];

    assert_eq!(verifier.static_values_at(x, &h).unwrap(), k);
    assert_eq!(
        verifier.evaluate_constraints_at(x, &r, &n, &h).unwrap(),
        m.evaluate(&r, &n, &k).unwrap()
    );
}

#[test]
fn verification_checks_public_inputs() {
    let m = module(Backend::Serial);

    let err = m.init_verification(&shapes(), &inputs()).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let mut bad = shapes();
    bad[1] = vec![2, 2, 4];
    let public = vec![inputs()[0].clone(), inputs()[1].clone()];
    let err = m.init_verification(&bad, &public).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let verifier = m.init_verification(&shapes(), &public).unwrap();
    let err = verifier.static_values_at(BE::ONE, &[]).unwrap_err();
    assert!(matches!(err, Error::Shape(_)));
}

#[test]
fn inputs_are_validated() {
    let m = module(Backend::Serial);

    let mut bad = inputs();
    bad[2] = InputTree::from(vec![vec![11u128, 12], vec![13, 14], vec![15, 16]]);
    assert!(matches!(m.init_proof(&bad), Err(Error::InvalidInput(_))));

    // three leaf values per group: 12 leaves x 4 steps is not a power of two
    let uneven = vec![
        InputTree::from(vec![1u128, 2, 3, 4]),
        InputTree::from(vec![vec![1u128, 2, 3]; 4]),
        InputTree::from(vec![vec![1u128, 2, 3]; 4]),
    ];
    assert!(matches!(m.init_proof(&uneven), Err(Error::InvalidInput(_))));
}

#[test]
fn extension_factor_option_is_validated() {
    let schema = compile(MIMC, &CompileOptions::default()).unwrap();

    let err = instantiate(&schema, &InstantiateOptions::default().with_extension_factor(4))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOptions(_)));

    let m = instantiate(&schema, &InstantiateOptions::default().with_extension_factor(32))
        .unwrap();
    assert_eq!(m.extension_factor(), 32);
}

#[test]
fn contexts_print_their_shape() {
    let m = module(Backend::Serial);

    let proof = m.init_proof(&inputs()).unwrap();
    let dump = format!("{proof:?}");
    assert!(dump.starts_with("ProofObject"));
    assert!(dump.contains("trace_length: 32"));
    assert!(dump.contains("composition_size: 128"));
    assert!(dump.ends_with(".. }"));

    let public = vec![inputs()[0].clone(), inputs()[1].clone()];
    let verifier = m.init_verification(&shapes(), &public).unwrap();
    let dump = format!("{verifier:?}");
    assert!(dump.starts_with("VerificationObject"));
    assert!(dump.contains("secret_register_count: 1"));
}
