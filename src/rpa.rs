use crate::prelude::*;

/* #region helpers */

/// Add `E[a, a] - E[i, i]` to the diagonal of `[nov, nov]`.
fn add_orbital_energy_differences(a_mat: &mut Tsr, e_mo: &Tsr, nocc: usize) {
    let e_diag = e_mo.diagonal(None);
    // d_ov[i, a] = E[a + nocc, a + nocc] - E[i, i]
    let nvirt = e_diag.size() - nocc;
    let d_ov = e_diag.i((None, nocc..)) - e_diag.i((..nocc, None));
    *&mut a_mat.diagonal_mut(None) += d_ov.into_shape([nocc * nvirt]);
}

/* #endregion */

/* #region closed-shell A and B */

/// Form the A (CIS) matrix for RPA in the MO basis. [singlet]
///
/// `A[ia, jb] = <aj||ib> = 2 (ai|jb) - (ab|ji)`, plus the virtual-occupied
/// orbital energy difference on the diagonal.
pub fn form_rpa_a_matrix_mo_singlet(e_mo: &Tsr, tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_mo_shapes(e_mo, tei_mo, nocc)?;
    let nov = nocc * nvirt;
    let (so, sv) = (slice!(0, nocc), slice!(nocc, nocc + nvirt));

    // (ai|jb): [a, i, j, b] -> [i, a, j, b]
    // (ab|ji): [a, b, j, i] -> [i, a, j, b]
    let eri_aijb = tei_mo.i((sv, so, so, sv));
    let eri_abji = tei_mo.i((sv, sv, so, so));
    let a_iajb: Tsr = 2.0_f64 * eri_aijb.transpose((1, 0, 2, 3)) - eri_abji.transpose((3, 0, 2, 1));
    let mut a_mat = a_iajb.into_shape([nov, nov]);
    add_orbital_energy_differences(&mut a_mat, e_mo, nocc);
    Ok(a_mat)
}

/// Form the A (CIS) matrix for RPA in the MO basis. [triplet]
///
/// `A[ia, jb] = - (ab|ji)`, plus the orbital energy difference on the diagonal.
pub fn form_rpa_a_matrix_mo_triplet(e_mo: &Tsr, tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_mo_shapes(e_mo, tei_mo, nocc)?;
    let nov = nocc * nvirt;
    let (so, sv) = (slice!(0, nocc), slice!(nocc, nocc + nvirt));

    let eri_abji = tei_mo.i((sv, sv, so, so));
    let a_iajb: Tsr = -eri_abji.transpose((3, 0, 2, 1));
    let mut a_mat = a_iajb.into_shape([nov, nov]);
    add_orbital_energy_differences(&mut a_mat, e_mo, nocc);
    Ok(a_mat)
}

/// Form the B matrix for RPA in the MO basis. [singlet]
///
/// `B[ia, jb] = <ab||ij> = 2 (ai|bj) - (aj|bi)`.
pub fn form_rpa_b_matrix_mo_singlet(tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_tei_shape(tei_mo, nocc)?;
    let nov = nocc * nvirt;
    let (so, sv) = (slice!(0, nocc), slice!(nocc, nocc + nvirt));

    // both terms read the [v, o, v, o] block
    // (ai|bj): [a, i, b, j] -> [i, a, j, b]
    // (aj|bi): [a, j, b, i] -> [i, a, j, b]
    let eri_vovo = tei_mo.i((sv, so, sv, so));
    let b_iajb: Tsr = 2.0_f64 * eri_vovo.transpose((1, 0, 3, 2)) - eri_vovo.transpose((3, 0, 1, 2));
    Ok(b_iajb.into_shape([nov, nov]))
}

/// Form the B matrix for RPA in the MO basis. [triplet]
///
/// `B[ia, jb] = - (aj|bi)`.
pub fn form_rpa_b_matrix_mo_triplet(tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_tei_shape(tei_mo, nocc)?;
    let nov = nocc * nvirt;
    let (so, sv) = (slice!(0, nocc), slice!(nocc, nocc + nvirt));

    let eri_vovo = tei_mo.i((sv, so, sv, so));
    let b_iajb: Tsr = -eri_vovo.transpose((3, 0, 1, 2));
    Ok(b_iajb.into_shape([nov, nov]))
}

/* #endregion */

/* #region spin blocks */

/// Same-spin block of the unrestricted A matrix.
///
/// `A[ia, jb] = (ai|jb) - (ab|ji)`, plus the orbital energy difference on the diagonal.
pub fn form_rpa_a_matrix_mo_singlet_ss(e_mo: &Tsr, tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_mo_shapes(e_mo, tei_mo, nocc)?;
    let nov = nocc * nvirt;
    let (so, sv) = (slice!(0, nocc), slice!(nocc, nocc + nvirt));

    let eri_aijb = tei_mo.i((sv, so, so, sv));
    let eri_abji = tei_mo.i((sv, sv, so, so));
    let a_iajb: Tsr = eri_aijb.transpose((1, 0, 2, 3)) - eri_abji.transpose((3, 0, 2, 1));
    let mut a_mat = a_iajb.into_shape([nov, nov]);
    add_orbital_energy_differences(&mut a_mat, e_mo, nocc);
    Ok(a_mat)
}

/// Opposite-spin block of the unrestricted A matrix, `A[i_x a_x, j_y b_y] = (a_x i_x|j_y b_y)`.
pub fn form_rpa_a_matrix_mo_singlet_os(tei_mo_xxyy: &Tsr, nocc_x: usize, nocc_y: usize) -> Result<Tsr> {
    let (nvirt_x, nvirt_y) = util::check_tei_shape_xxyy(tei_mo_xxyy, nocc_x, nocc_y)?;
    let (so_x, sv_x) = (slice!(0, nocc_x), slice!(nocc_x, nocc_x + nvirt_x));
    let (so_y, sv_y) = (slice!(0, nocc_y), slice!(nocc_y, nocc_y + nvirt_y));

    let eri_aijb = tei_mo_xxyy.i((sv_x, so_x, so_y, sv_y));
    let a_iajb = eri_aijb.transpose((1, 0, 2, 3)).into_contig(RowMajor);
    Ok(a_iajb.into_shape([nocc_x * nvirt_x, nocc_y * nvirt_y]))
}

/// Same-spin block of the unrestricted B matrix, `B[ia, jb] = (ai|bj) - (aj|bi)`.
pub fn form_rpa_b_matrix_mo_singlet_ss(tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_tei_shape(tei_mo, nocc)?;
    let nov = nocc * nvirt;
    let (so, sv) = (slice!(0, nocc), slice!(nocc, nocc + nvirt));

    let eri_vovo = tei_mo.i((sv, so, sv, so));
    let b_iajb: Tsr = eri_vovo.transpose((1, 0, 3, 2)) - eri_vovo.transpose((3, 0, 1, 2));
    Ok(b_iajb.into_shape([nov, nov]))
}

/// Opposite-spin block of the unrestricted B matrix, `B[i_x a_x, j_y b_y] = (a_x i_x|b_y j_y)`.
pub fn form_rpa_b_matrix_mo_singlet_os(tei_mo_xxyy: &Tsr, nocc_x: usize, nocc_y: usize) -> Result<Tsr> {
    let (nvirt_x, nvirt_y) = util::check_tei_shape_xxyy(tei_mo_xxyy, nocc_x, nocc_y)?;
    let (so_x, sv_x) = (slice!(0, nocc_x), slice!(nocc_x, nocc_x + nvirt_x));
    let (so_y, sv_y) = (slice!(0, nocc_y), slice!(nocc_y, nocc_y + nvirt_y));

    let eri_aibj = tei_mo_xxyy.i((sv_x, so_x, sv_y, so_y));
    let b_iajb = eri_aibj.transpose((1, 0, 3, 2)).into_contig(RowMajor);
    Ok(b_iajb.into_shape([nocc_x * nvirt_x, nocc_y * nvirt_y]))
}

/* #endregion */

/* #region assembled response matrices */

/// Closed-shell A and B for the requested Hamiltonian and spin symmetry.
///
/// Under the Tamm-Dancoff approximation B is returned as zeros.
pub fn form_rpa_matrices(
    e_mo: &Tsr,
    tei_mo: &Tsr,
    nocc: usize,
    hamiltonian: Hamiltonian,
    spin: Spin,
) -> Result<(Tsr, Tsr)> {
    let timer = std::time::Instant::now();

    let a_mat = match spin {
        Spin::Singlet => form_rpa_a_matrix_mo_singlet(e_mo, tei_mo, nocc)?,
        Spin::Triplet => form_rpa_a_matrix_mo_triplet(e_mo, tei_mo, nocc)?,
    };
    let b_mat = match (hamiltonian, spin) {
        (Hamiltonian::Tda, _) => a_mat.zeros_like(),
        (Hamiltonian::Rpa, Spin::Singlet) => form_rpa_b_matrix_mo_singlet(tei_mo, nocc)?,
        (Hamiltonian::Rpa, Spin::Triplet) => form_rpa_b_matrix_mo_triplet(tei_mo, nocc)?,
    };

    log::info!("Time elapsed (A/B {hamiltonian} {spin}, nov = {}): {:?}", a_mat.shape()[0], timer.elapsed());
    Ok((a_mat, b_mat))
}

/// Spin-blocked A and B for an unrestricted reference.
///
/// The compound index runs over all alpha excitations first, then all beta
/// excitations. `tei_mo_aabb` is `(p_a q_a|r_b s_b)`; its `bbaa` partner is
/// the transpose, so the off-diagonal blocks are `A_ab` and `A_ab^T`.
#[allow(clippy::too_many_arguments)]
pub fn form_rpa_matrices_unrestricted(
    e_mo_a: &Tsr,
    e_mo_b: &Tsr,
    tei_mo_aaaa: &Tsr,
    tei_mo_aabb: &Tsr,
    tei_mo_bbbb: &Tsr,
    nocc_a: usize,
    nocc_b: usize,
    hamiltonian: Hamiltonian,
) -> Result<(Tsr, Tsr)> {
    let timer = std::time::Instant::now();

    let a_aa = form_rpa_a_matrix_mo_singlet_ss(e_mo_a, tei_mo_aaaa, nocc_a)?;
    let a_bb = form_rpa_a_matrix_mo_singlet_ss(e_mo_b, tei_mo_bbbb, nocc_b)?;
    let a_ab = form_rpa_a_matrix_mo_singlet_os(tei_mo_aabb, nocc_a, nocc_b)?;
    ensure!(
        a_ab.shape()[0] == a_aa.shape()[0] && a_ab.shape()[1] == a_bb.shape()[0],
        "opposite-spin integrals do not match the same-spin orbital spaces"
    );

    let a_mat = assemble_spin_blocks(&a_aa, &a_ab, &a_bb);
    let b_mat = match hamiltonian {
        Hamiltonian::Tda => a_mat.zeros_like(),
        Hamiltonian::Rpa => {
            let b_aa = form_rpa_b_matrix_mo_singlet_ss(tei_mo_aaaa, nocc_a)?;
            let b_bb = form_rpa_b_matrix_mo_singlet_ss(tei_mo_bbbb, nocc_b)?;
            let b_ab = form_rpa_b_matrix_mo_singlet_os(tei_mo_aabb, nocc_a, nocc_b)?;
            assemble_spin_blocks(&b_aa, &b_ab, &b_bb)
        },
    };

    log::info!("Time elapsed (unrestricted A/B {hamiltonian}): {:?}", timer.elapsed());
    Ok((a_mat, b_mat))
}

fn assemble_spin_blocks(m_aa: &Tsr, m_ab: &Tsr, m_bb: &Tsr) -> Tsr {
    let nov_a = m_aa.shape()[0];
    let nov_b = m_bb.shape()[0];
    let n = nov_a + nov_b;
    let mut mat: Tsr = rt::zeros(([n, n], m_aa.device()));
    mat.i_mut((..nov_a, ..nov_a)).assign(m_aa);
    mat.i_mut((..nov_a, nov_a..)).assign(m_ab);
    mat.i_mut((nov_a.., ..nov_a)).assign(m_ab.t());
    mat.i_mut((nov_a.., nov_a..)).assign(m_bb);
    mat
}

/* #endregion */

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Positive-definite ERIs with 8-fold symmetry, `(pq|rs) = sum_P L[P,pq] L[P,rs]`.
    pub(crate) fn fake_tei(norb: usize, naux: usize, seed: f64) -> Tsr {
        let device = DeviceTsr::default();
        let mut l_pq: Tsr = rt::zeros(([naux, norb, norb], &device));
        for p in 0..naux {
            for q in 0..norb {
                for r in 0..=q {
                    let val = ((p * 31 + q * 7 + r * 3) as f64 * seed).sin() / (1.0 + (q + r) as f64);
                    l_pq[[p, q, r]] = val;
                    l_pq[[p, r, q]] = val;
                }
            }
        }
        let l_flat = l_pq.reshape([naux, norb * norb]);
        (l_flat.t() % &l_flat).into_shape([norb, norb, norb, norb])
    }

    pub(crate) fn fake_e_mo(norb: usize, nocc: usize) -> Tsr {
        let device = DeviceTsr::default();
        let mut e_mo: Tsr = rt::zeros(([norb, norb], &device));
        for p in 0..norb {
            e_mo[[p, p]] = if p < nocc { -1.0 + 0.1 * p as f64 } else { 0.2 + 0.15 * p as f64 };
        }
        // off-diagonal entries never reach A
        e_mo[[0, norb - 1]] = 0.3;
        e_mo[[norb - 1, 0]] = 0.3;
        e_mo
    }

    fn diff_norm(x: &Tsr, y: &Tsr) -> f64 {
        (x - y).l2_norm()
    }

    #[test]
    fn test_tensor_forms_match_loops() {
        let (norb, nocc) = (7, 3);
        let tei = fake_tei(norb, 5, 0.61);
        let e_mo = fake_e_mo(norb, nocc);

        let pairs = [
            (form_rpa_a_matrix_mo_singlet(&e_mo, &tei, nocc), rpa_slow::form_rpa_a_matrix_mo_singlet(&e_mo, &tei, nocc)),
            (form_rpa_a_matrix_mo_triplet(&e_mo, &tei, nocc), rpa_slow::form_rpa_a_matrix_mo_triplet(&e_mo, &tei, nocc)),
            (form_rpa_b_matrix_mo_singlet(&tei, nocc), rpa_slow::form_rpa_b_matrix_mo_singlet(&tei, nocc)),
            (form_rpa_b_matrix_mo_triplet(&tei, nocc), rpa_slow::form_rpa_b_matrix_mo_triplet(&tei, nocc)),
            (
                form_rpa_a_matrix_mo_singlet_ss(&e_mo, &tei, nocc),
                rpa_slow::form_rpa_a_matrix_mo_singlet_ss(&e_mo, &tei, nocc),
            ),
            (form_rpa_b_matrix_mo_singlet_ss(&tei, nocc), rpa_slow::form_rpa_b_matrix_mo_singlet_ss(&tei, nocc)),
        ];
        for (fast, slow) in pairs {
            let (fast, slow) = (fast.unwrap(), slow.unwrap());
            assert_eq!(fast.shape().to_vec(), vec![12, 12]);
            assert!(diff_norm(&fast, &slow) < 1e-12);
        }
    }

    #[test]
    fn test_opposite_spin_blocks_match_loops() {
        let (norb_x, norb_y, nocc_x, nocc_y) = (6, 5, 3, 2);
        let tei = fake_tei(norb_x.max(norb_y), 4, 0.43);
        // take a rectangular [nx, nx, ny, ny] corner
        let tei_xxyy = tei.i((..norb_x, ..norb_x, ..norb_y, ..norb_y)).into_contig(RowMajor);

        let a_fast = form_rpa_a_matrix_mo_singlet_os(&tei_xxyy, nocc_x, nocc_y).unwrap();
        let a_slow = rpa_slow::form_rpa_a_matrix_mo_singlet_os(&tei_xxyy, nocc_x, nocc_y).unwrap();
        assert_eq!(a_fast.shape().to_vec(), vec![9, 6]);
        assert!(diff_norm(&a_fast, &a_slow) < 1e-12);

        let b_fast = form_rpa_b_matrix_mo_singlet_os(&tei_xxyy, nocc_x, nocc_y).unwrap();
        let b_slow = rpa_slow::form_rpa_b_matrix_mo_singlet_os(&tei_xxyy, nocc_x, nocc_y).unwrap();
        assert!(diff_norm(&b_fast, &b_slow) < 1e-12);
    }

    #[test]
    fn test_spin_adaptation() {
        // identical alpha and beta orbitals: singlet = ss + os, triplet = ss - os
        let (norb, nocc) = (6, 2);
        let tei = fake_tei(norb, 6, 0.29);
        let e_mo = fake_e_mo(norb, nocc);

        let a_ss = form_rpa_a_matrix_mo_singlet_ss(&e_mo, &tei, nocc).unwrap();
        let a_os = form_rpa_a_matrix_mo_singlet_os(&tei, nocc, nocc).unwrap();
        let b_ss = form_rpa_b_matrix_mo_singlet_ss(&tei, nocc).unwrap();
        let b_os = form_rpa_b_matrix_mo_singlet_os(&tei, nocc, nocc).unwrap();

        let a_singlet = form_rpa_a_matrix_mo_singlet(&e_mo, &tei, nocc).unwrap();
        let a_triplet = form_rpa_a_matrix_mo_triplet(&e_mo, &tei, nocc).unwrap();
        let b_singlet = form_rpa_b_matrix_mo_singlet(&tei, nocc).unwrap();
        let b_triplet = form_rpa_b_matrix_mo_triplet(&tei, nocc).unwrap();

        assert!(diff_norm(&a_singlet, &(&a_ss + &a_os)) < 1e-12);
        assert!(diff_norm(&a_triplet, &(&a_ss - &a_os)) < 1e-12);
        assert!(diff_norm(&b_singlet, &(&b_ss + &b_os)) < 1e-12);
        assert!(diff_norm(&b_triplet, &(&b_ss - &b_os)) < 1e-12);
    }

    #[test]
    fn test_symmetry_and_singlet_triplet_gap() {
        let (norb, nocc) = (7, 3);
        let tei = fake_tei(norb, 5, 0.77);
        let e_mo = fake_e_mo(norb, nocc);

        for spin in [Spin::Singlet, Spin::Triplet] {
            let (a_mat, b_mat) = form_rpa_matrices(&e_mo, &tei, nocc, Hamiltonian::Rpa, spin).unwrap();
            assert!(diff_norm(&a_mat, &a_mat.t().to_owned()) < 1e-12);
            assert!(diff_norm(&b_mat, &b_mat.t().to_owned()) < 1e-12);
        }

        // A_singlet - A_triplet = 2 (ai|jb) is a Gram matrix
        let (a_s, _) = form_rpa_matrices(&e_mo, &tei, nocc, Hamiltonian::Tda, Spin::Singlet).unwrap();
        let (a_t, b_t) = form_rpa_matrices(&e_mo, &tei, nocc, Hamiltonian::Tda, Spin::Triplet).unwrap();
        assert_eq!(b_t.l2_norm(), 0.0);
        let gap = &a_s - &a_t;
        let (w, _): (Tsr, Tsr) = rt::linalg::eigh(gap.view()).into();
        assert!(w.to_vec().into_iter().all(|x| x > -1e-10));
    }

    #[test]
    fn test_unrestricted_blocks() {
        let (norb, nocc_a, nocc_b) = (6, 3, 2);
        let tei = fake_tei(norb, 5, 0.51);
        let e_a = fake_e_mo(norb, nocc_a);
        let e_b = fake_e_mo(norb, nocc_b);

        let (a_mat, b_mat) =
            form_rpa_matrices_unrestricted(&e_a, &e_b, &tei, &tei, &tei, nocc_a, nocc_b, Hamiltonian::Rpa).unwrap();
        let (nov_a, nov_b) = (9, 8);
        assert_eq!(a_mat.shape().to_vec(), vec![nov_a + nov_b, nov_a + nov_b]);
        assert!(diff_norm(&a_mat, &a_mat.t().to_owned()) < 1e-12);
        assert!(diff_norm(&b_mat, &b_mat.t().to_owned()) < 1e-12);

        let a_bb = form_rpa_a_matrix_mo_singlet_ss(&e_b, &tei, nocc_b).unwrap();
        let a_bb_block = a_mat.i((nov_a.., nov_a..)).to_owned();
        assert!(diff_norm(&a_bb_block, &a_bb) < 1e-14);

        let a_ab = form_rpa_a_matrix_mo_singlet_os(&tei, nocc_a, nocc_b).unwrap();
        let a_ab_block = a_mat.i((..nov_a, nov_a..)).to_owned();
        assert!(diff_norm(&a_ab_block, &a_ab) < 1e-14);

        let wrong = fake_tei(norb - 1, 5, 0.51);
        let res = form_rpa_matrices_unrestricted(&e_a, &e_b, &tei, &wrong, &tei, nocc_a, nocc_b, Hamiltonian::Tda);
        assert!(res.is_err());
    }
}
