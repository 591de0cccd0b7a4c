//! A and B matrices by explicit loops over compound indices.
//!
//! `TEI_MO` is in chemists' notation, `TEI_MO[p, q, r, s] = (pq|rs)`, and the
//! virtual index `a` addresses MO `a + nocc`. The tensor-sliced versions in
//! [`crate::rpa`] must reproduce these element by element.

use crate::prelude::*;

/// Fill `[nrow, ncol]` elementwise, rows distributed over rayon threads.
fn fill_ov_matrix(
    space_x: indices::OVSpace,
    space_y: indices::OVSpace,
    device: &DeviceTsr,
    elem: impl Fn(usize, usize, usize, usize) -> f64 + Sync,
) -> Tsr {
    let mat: Tsr = unsafe { rt::empty(([space_x.nov(), space_y.nov()], device)) };
    (0..space_x.nocc).into_par_iter().for_each(|i| {
        let mut mat = unsafe { mat.force_mut() };
        for a in 0..space_x.nvirt {
            let ia = space_x.compound(i, a);
            for (jb, j, b) in space_y.iter() {
                *mat.index_mut([ia, jb]) = elem(i, a, j, b);
            }
        }
    });
    mat
}

/// Form the A (CIS) matrix for RPA in the MO basis. [singlet]
///
/// `A[ia, jb] = <aj||ib> = 2 (ai|jb) - (ab|ji)`, plus the virtual-occupied
/// orbital energy difference on the diagonal.
pub fn form_rpa_a_matrix_mo_singlet(e_mo: &Tsr, tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_mo_shapes(e_mo, tei_mo, nocc)?;
    let space = indices::OVSpace::new(nocc, nvirt);
    let v = |a: usize| space.virt_to_mo(a);

    let a_mat = fill_ov_matrix(space, space, tei_mo.device(), |i, a, j, b| {
        let mut val = 2.0 * tei_mo[[v(a), i, j, v(b)]] - tei_mo[[v(a), v(b), j, i]];
        if i == j && a == b {
            val += e_mo[[v(a), v(b)]] - e_mo[[i, j]];
        }
        val
    });
    Ok(a_mat)
}

/// Form the A (CIS) matrix for RPA in the MO basis. [triplet]
///
/// `A[ia, jb] = - (ab|ji)`, plus the orbital energy difference on the diagonal.
pub fn form_rpa_a_matrix_mo_triplet(e_mo: &Tsr, tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_mo_shapes(e_mo, tei_mo, nocc)?;
    let space = indices::OVSpace::new(nocc, nvirt);
    let v = |a: usize| space.virt_to_mo(a);

    let a_mat = fill_ov_matrix(space, space, tei_mo.device(), |i, a, j, b| {
        let mut val = -tei_mo[[v(a), v(b), j, i]];
        if i == j && a == b {
            val += e_mo[[v(a), v(b)]] - e_mo[[i, j]];
        }
        val
    });
    Ok(a_mat)
}

/// Form the B matrix for RPA in the MO basis. [singlet]
///
/// `B[ia, jb] = <ab||ij> = 2 (ai|bj) - (aj|bi)`.
pub fn form_rpa_b_matrix_mo_singlet(tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_tei_shape(tei_mo, nocc)?;
    let space = indices::OVSpace::new(nocc, nvirt);
    let v = |a: usize| space.virt_to_mo(a);

    let b_mat = fill_ov_matrix(space, space, tei_mo.device(), |i, a, j, b| {
        2.0 * tei_mo[[v(a), i, v(b), j]] - tei_mo[[v(a), j, v(b), i]]
    });
    Ok(b_mat)
}

/// Form the B matrix for RPA in the MO basis. [triplet]
///
/// `B[ia, jb] = - (aj|bi)`.
pub fn form_rpa_b_matrix_mo_triplet(tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_tei_shape(tei_mo, nocc)?;
    let space = indices::OVSpace::new(nocc, nvirt);
    let v = |a: usize| space.virt_to_mo(a);

    let b_mat = fill_ov_matrix(space, space, tei_mo.device(), |i, a, j, b| -tei_mo[[v(a), j, v(b), i]]);
    Ok(b_mat)
}

/// Same-spin block of the unrestricted A matrix.
///
/// `A[ia, jb] = (ai|jb) - (ab|ji)`, plus the orbital energy difference on the diagonal.
pub fn form_rpa_a_matrix_mo_singlet_ss(e_mo: &Tsr, tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_mo_shapes(e_mo, tei_mo, nocc)?;
    let space = indices::OVSpace::new(nocc, nvirt);
    let v = |a: usize| space.virt_to_mo(a);

    let a_mat = fill_ov_matrix(space, space, tei_mo.device(), |i, a, j, b| {
        let mut val = tei_mo[[v(a), i, j, v(b)]] - tei_mo[[v(a), v(b), j, i]];
        if i == j && a == b {
            val += e_mo[[v(a), v(b)]] - e_mo[[i, j]];
        }
        val
    });
    Ok(a_mat)
}

/// Opposite-spin block of the unrestricted A matrix, `A[i_x a_x, j_y b_y] = (a_x i_x|j_y b_y)`.
pub fn form_rpa_a_matrix_mo_singlet_os(tei_mo_xxyy: &Tsr, nocc_x: usize, nocc_y: usize) -> Result<Tsr> {
    let (nvirt_x, nvirt_y) = util::check_tei_shape_xxyy(tei_mo_xxyy, nocc_x, nocc_y)?;
    let space_x = indices::OVSpace::new(nocc_x, nvirt_x);
    let space_y = indices::OVSpace::new(nocc_y, nvirt_y);

    let a_mat = fill_ov_matrix(space_x, space_y, tei_mo_xxyy.device(), |i, a, j, b| {
        tei_mo_xxyy[[space_x.virt_to_mo(a), i, j, space_y.virt_to_mo(b)]]
    });
    Ok(a_mat)
}

/// Same-spin block of the unrestricted B matrix, `B[ia, jb] = (ai|bj) - (aj|bi)`.
pub fn form_rpa_b_matrix_mo_singlet_ss(tei_mo: &Tsr, nocc: usize) -> Result<Tsr> {
    let (nocc, nvirt) = util::check_tei_shape(tei_mo, nocc)?;
    let space = indices::OVSpace::new(nocc, nvirt);
    let v = |a: usize| space.virt_to_mo(a);

    let b_mat = fill_ov_matrix(space, space, tei_mo.device(), |i, a, j, b| {
        tei_mo[[v(a), i, v(b), j]] - tei_mo[[v(a), j, v(b), i]]
    });
    Ok(b_mat)
}

/// Opposite-spin block of the unrestricted B matrix, `B[i_x a_x, j_y b_y] = (a_x i_x|b_y j_y)`.
pub fn form_rpa_b_matrix_mo_singlet_os(tei_mo_xxyy: &Tsr, nocc_x: usize, nocc_y: usize) -> Result<Tsr> {
    let (nvirt_x, nvirt_y) = util::check_tei_shape_xxyy(tei_mo_xxyy, nocc_x, nocc_y)?;
    let space_x = indices::OVSpace::new(nocc_x, nvirt_x);
    let space_y = indices::OVSpace::new(nocc_y, nvirt_y);

    let b_mat = fill_ov_matrix(space_x, space_y, tei_mo_xxyy.device(), |i, a, j, b| {
        tei_mo_xxyy[[space_x.virt_to_mo(a), i, space_y.virt_to_mo(b), j]]
    });
    Ok(b_mat)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_single_excitation_elements() {
        // one occupied, one virtual: A and B are 1x1
        let device = DeviceTsr::default();
        let n = 2;
        let data = (0..n * n * n * n).map(|x| 0.1 * (x as f64 + 1.0)).collect::<Vec<_>>();
        let tei: Tsr = rt::asarray((data, vec![n, n, n, n].c(), &device));
        let mut e_mo: Tsr = rt::zeros(([n, n], &device));
        e_mo[[0, 0]] = -0.5;
        e_mo[[1, 1]] = 0.25;

        // (10|01), (11|00), (10|10), (10|10)
        let (aiia, aabb_ii, aiai) = (tei[[1, 0, 0, 1]], tei[[1, 1, 0, 0]], tei[[1, 0, 1, 0]]);

        let a = form_rpa_a_matrix_mo_singlet(&e_mo, &tei, 1).unwrap();
        assert!((a[[0, 0]] - (2.0 * aiia - aabb_ii + 0.75)).abs() < 1e-14);
        let a = form_rpa_a_matrix_mo_triplet(&e_mo, &tei, 1).unwrap();
        assert!((a[[0, 0]] - (-aabb_ii + 0.75)).abs() < 1e-14);
        let b = form_rpa_b_matrix_mo_singlet(&tei, 1).unwrap();
        assert!((b[[0, 0]] - aiai).abs() < 1e-14);
        let b = form_rpa_b_matrix_mo_triplet(&tei, 1).unwrap();
        assert!((b[[0, 0]] + aiai).abs() < 1e-14);
        let b = form_rpa_b_matrix_mo_singlet_ss(&tei, 1).unwrap();
        assert!(b[[0, 0]].abs() < 1e-14);
    }

    #[test]
    fn test_shape_errors() {
        let device = DeviceTsr::default();
        let e_mo: Tsr = rt::zeros(([3, 3], &device));
        let tei: Tsr = rt::zeros(([4, 4, 4, 4], &device));
        assert!(form_rpa_a_matrix_mo_singlet(&e_mo, &tei, 1).is_err());
        assert!(form_rpa_b_matrix_mo_singlet(&tei, 5).is_err());
        assert!(form_rpa_a_matrix_mo_singlet_os(&tei, 5, 1).is_err());
    }
}
