// SPDX-License-Identifier: AGPL-3.0-or-later
// This file is part of air-assembly project.
// Copyright (C) 2025  Andrei Kochergin <zeek@tuta.com>
//
// Additional terms under GNU AGPL v3 section 7:
//   You must preserve this notice and the air-assembly
//   attribution in copies of this file or substantial
//   portions of it. See the NOTICE file for details.

use air_assembly::runtime::Error as RuntimeError;
use air_assembly::{
    AirModule, BaseElement as BE, CompileOptions, InputTree, InstantiateOptions, analyze, compile,
    compile_bytes, instantiate, logging,
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

const MASKED: &str = r"
(module
  (field prime 340282366920938463463374607393113505793)
  (static
    (input secret binary vector (steps 2))
    (mask 0 1)
    (cycle (power 3 8)))
  (transition
    (span 1) (result vector 1)
    (add (load.trace 0) (mul (get (load.static 0) 1) (get (load.static 0) 2))))
  (evaluation
    (span 2) (result vector 1)
    (sub (load.trace 1)
         (add (load.trace 0) (mul (get (load.static 0) 1) (get (load.static 0) 2))))))
";

const PRNG: &str = r"
(module
  (field prime 340282366920938463463374607393113505793)
  (static (cycle (prng blake3 0x4d6943 16)))
  (transition
    (span 1) (result vector 2)
    (vector (add (get (load.trace 0) 0) (get (load.static 0) 0))
            (add (get (load.trace 0) 1) (get (load.trace 0) 0))))
  (evaluation
    (span 2) (result vector 2)
    (sub (load.trace 1)
         (vector (add (get (load.trace 0) 0) (get (load.static 0) 0))
                 (add (get (load.trace 0) 1) (get (load.trace 0) 0))))))
";

fn module(src: &str) -> AirModule {
    logging::init_with_level(Some("warn"));

    let schema = compile(src, &CompileOptions::default()).expect("compile");
    instantiate(&schema, &InstantiateOptions::default()).expect("instantiate")
}

fn interpolate(col: &[BE]) -> Vec<BE> {
    let mut p = col.to_vec();
    fft::interpolate_poly(&mut p, &fft::get_inv_twiddles::<BE>(col.len()));
    p
}

/// Generate the trace of `m`, check every step against the
/// constraints and compare prover and verifier at `x`.
fn check_module(m: &AirModule, inputs: &[InputTree], shapes: &[Vec<usize>], x: BE) {
    let proof = m.init_proof(inputs).expect("init proof");
    let trace = proof.generate_execution_trace().expect("trace");
    let n = trace.length();

    for i in 0..n - 1 {
        let r: Vec<BE> = (0..trace.width()).map(|c| trace.get(c, i)).collect();
        let next: Vec<BE> = (0..trace.width()).map(|c| trace.get(c, i + 1)).collect();
        let q = m.evaluate(&r, &next, &proof.static_values_at(i)).unwrap();
        assert!(q.iter().all(|v| *v == BE::ZERO), "step {i}");
    }

    let polys = proof.interpolate_trace(&trace).unwrap();
    let g = proof.execution_domain().generator();
    let r: Vec<BE> = polys.iter().map(|p| polynom::eval(p, x)).collect();
    let next: Vec<BE> = polys.iter().map(|p| polynom::eval(p, x * g)).collect();
    let k: Vec<BE> = proof
        .static_columns()
        .iter()
        .map(|c| polynom::eval(&interpolate(c), x))
        .collect();
    let h: Vec<BE> = m.secret_registers().iter().map(|&i| k[i]).collect();

    let public: Vec<InputTree> = m
        .input_descriptors()
        .iter()
        .zip(inputs)
        .filter(|(d, _)| !d.secret)
        .map(|(_, t)| t.clone())
        .collect();

    let verifier = m.init_verification(shapes, &public).expect("init verification");
    assert_eq!(verifier.trace_length(), n);
    assert_eq!(
        verifier.evaluate_constraints_at(x, &r, &next, &h).unwrap(),
        m.evaluate(&r, &next, &k).unwrap()
    );
}

#[test]
fn mimc_runs_on_the_air_assembly_field() {
    logging::init_with_level(Some("warn"));

    let schema = compile(MIMC, &CompileOptions::default()).expect("compile");
    assert_eq!(schema.field().modulus, 340282366920938463463374607393113505793);
    assert_eq!(schema.max_constraint_degree(), 3);

    let m = instantiate(&schema, &InstantiateOptions::default()).expect("instantiate");
    assert_eq!(m.composition_factor(), 4);

    let inputs = vec![
        InputTree::from(vec![1u128, 2, 3, 4]),
        InputTree::from(vec![vec![1u128, 2], vec![3, 4], vec![5, 6], vec![7, 8]]),
        InputTree::from(vec![
            vec![11u128, 12],
            vec![13, 14],
            vec![15, 16],
            vec![17, 18],
        ]),
    ];
    let proof = m.init_proof(&inputs).expect("init proof");
    let trace = proof.generate_execution_trace().expect("trace");
    assert_eq!(trace.length(), 32);

    for i in 0..trace.length() - 1 {
        let r = [trace.get(0, i)];
        let next = [trace.get(0, i + 1)];
        let q = m.evaluate(&r, &next, &proof.static_values_at(i)).unwrap();
        assert_eq!(q, vec![BE::ZERO], "step {i}");
    }
}

#[test]
fn mimc_end_to_end() {
    let m = module(MIMC);
    let inputs = vec![
        InputTree::from(vec![1u128, 2, 3, 4]),
        InputTree::from(vec![vec![1u128, 2], vec![3, 4], vec![5, 6], vec![7, 8]]),
        InputTree::from(vec![
            vec![11u128, 12],
            vec![13, 14],
            vec![15, 16],
            vec![17, 18],
        ]),
    ];
    let shapes = vec![vec![4], vec![2, 2, 2, 2], vec![2, 2, 2, 2]];

    assert_eq!(m.max_constraint_degree(), 3);
    check_module(&m, &inputs, &shapes, BE::new(987_654_321));
}

#[test]
fn masks_over_secret_inputs_stay_secret() {
    let m = module(MASKED);
    assert_eq!(m.secret_registers(), &[0, 1]);

    let bits = InputTree::from(vec![1u128, 0, 1, 1, 0, 0, 1, 0]);
    let proof = m.init_proof(std::slice::from_ref(&bits)).unwrap();
    assert_eq!(proof.trace_length(), 16);

    // each bit holds for two rows; the mask flags the ones
    let k = proof.static_values_at(4);
    assert_eq!(k[0], BE::ONE);
    assert_eq!(k[1], BE::ONE);
    assert_eq!(k[2], BE::new(81));
    assert_eq!(proof.static_values_at(5)[1], BE::ONE);
    assert_eq!(proof.static_values_at(2)[1], BE::ZERO);

    check_module(&m, &[bits], &[vec![8]], BE::new(42_424_242));
}

#[test]
fn binary_inputs_reject_other_values() {
    let m = module(MASKED);
    let err = m
        .init_proof(&[InputTree::from(vec![1u128, 0, 2, 1, 0, 0, 1, 0])])
        .unwrap_err();

    assert!(matches!(err, RuntimeError::InvalidInput(_)));
}

#[test]
fn prng_cycle_without_inputs() {
    let m = module(PRNG);
    assert!(m.input_descriptors().is_empty());

    let proof = m.init_proof(&[]).unwrap();
    assert_eq!(proof.trace_length(), 16);

    let trace = proof.generate_execution_trace().unwrap();
    assert_eq!(trace.get(0, 1), proof.static_values_at(0)[0]);
    assert_eq!(trace.get(1, 1), BE::ZERO);

    check_module(&m, &[], &[], BE::new(0xdead_beef));
}

#[test]
fn division_by_zero_stops_trace_generation() {
    let src = r"
    (module
      (field prime 340282366920938463463374607393113505793)
      (transition (span 1) (result vector 1) (inv (load.trace 0)))
      (evaluation (span 2) (result vector 1) (sub (load.trace 1) (load.trace 1))))";

    let m = module(src);
    let proof = m.init_proof(&[]).unwrap();
    assert_eq!(proof.trace_length(), 8);

    let err = proof.generate_execution_trace().unwrap_err();
    assert_eq!(err, RuntimeError::DivisionByZero);
}

#[test]
fn source_bytes_and_analysis() {
    let schema = compile_bytes(MIMC.as_bytes(), &CompileOptions::default()).unwrap();
    let report = analyze(&schema);

    assert_eq!(report.trace_registers, 1);
    assert_eq!(report.composition_factor, 4);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["trace_registers"], 1);
    assert_eq!(json["static_registers"][2]["secret"], true);

    let m = instantiate(&schema, &InstantiateOptions::default()).unwrap();
    assert_eq!(m.composition_factor(), report.composition_factor);
}
