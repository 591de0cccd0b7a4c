#![allow(clippy::deref_addrof)]

pub mod prelude;

pub mod ao2mo;
pub mod fileio;
pub mod indices;
pub mod integrals;
pub mod operators;
pub mod rhf;
pub mod rpa;
pub mod rpa_slow;
pub mod solver;
pub mod structs;
pub mod util;

#[cfg(test)]
fn rpa_info_h2o() -> structs::RPAInfo {
    use crate::prelude::*;

    let cint_data = init_h2o_def2_tzvp();
    let rhf_results = rhf::minimal_rhf(&cint_data, &RHFConfig::default()).unwrap();
    RPAInfo { cint_data, mo_coeff: rhf_results.mo_coeff, mo_energy: rhf_results.mo_energy }
}

#[test]
fn playground_rpa_matrices() {
    use crate::prelude::*;

    let rpa_info = rpa_info_h2o();
    let nocc = rpa_info.nocc().unwrap();
    let e_mo = rpa_info.e_mo();
    let tei_mo = rpa_info.tei_mo().unwrap();

    let a_fast = rpa::form_rpa_a_matrix_mo_singlet(&e_mo, &tei_mo, nocc).unwrap();
    let a_slow = rpa_slow::form_rpa_a_matrix_mo_singlet(&e_mo, &tei_mo, nocc).unwrap();
    assert!((&a_fast - &a_slow).l2_norm() < 1e-10);
    let b_fast = rpa::form_rpa_b_matrix_mo_triplet(&tei_mo, nocc).unwrap();
    let b_slow = rpa_slow::form_rpa_b_matrix_mo_triplet(&tei_mo, nocc).unwrap();
    assert!((&b_fast - &b_slow).l2_norm() < 1e-10);

    let mut lowest = vec![];
    for hamiltonian in [Hamiltonian::Rpa, Hamiltonian::Tda] {
        for spin in [Spin::Singlet, Spin::Triplet] {
            let (a, b) = rpa::form_rpa_matrices(&e_mo, &tei_mo, nocc, hamiltonian, spin).unwrap();
            let w = match hamiltonian {
                Hamiltonian::Rpa => solver::rpa_excitation_energies(&a, &b).unwrap(),
                Hamiltonian::Tda => solver::tda_excitation_energies(&a).unwrap(),
            };
            let w = w.to_vec();
            assert_eq!(w.len(), rpa_info.ov_space().unwrap().nov());
            println!("lowest {hamiltonian} {spin} excitation energy: {}", w[0]);
            lowest.push(w[0]);
        }
    }
    // triplets lie below singlets
    assert!(lowest[1] <= lowest[0]);
    assert!(lowest[3] <= lowest[2]);
}

#[test]
fn playground_polarizability() {
    use crate::prelude::*;

    let rpa_info = rpa_info_h2o();
    let nocc = rpa_info.nocc().unwrap();
    let e_mo = rpa_info.e_mo();
    let tei_mo = rpa_info.tei_mo().unwrap();

    let operator = operators::dalton_label_to_operator("XDIPLEN").unwrap();
    let operator = Operator { slice_idx: None, ..operator };
    let mut integrals = IntegralCache::new(IntegralsCint::new(&rpa_info.cint_data));
    let vecs = operator.vecs_property(&mut integrals, &rpa_info.mo_coeff, nocc).unwrap();

    let (a, b) = rpa::form_rpa_matrices(&e_mo, &tei_mo, nocc, Hamiltonian::Rpa, operator.spin()).unwrap();
    let alpha_static = 2.0_f64 * solver::linear_response(&a, &b, &vecs, &vecs, 0.0, false).unwrap().results;
    let alpha_dynamic = 2.0_f64 * solver::linear_response(&a, &b, &vecs, &vecs, 0.05, false).unwrap().results;
    println!("static polarizability:\n{alpha_static}");

    for i in 0..3 {
        assert!(alpha_static[[i, i]] > 3.0 && alpha_static[[i, i]] < 15.0);
        // normal dispersion below the first pole
        assert!(alpha_dynamic[[i, i]] > alpha_static[[i, i]]);
        for j in 0..3 {
            assert!((alpha_static[[i, j]] - alpha_static[[j, i]]).abs() < 1e-8);
        }
    }
}
