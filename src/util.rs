use crate::prelude::*;

/// Obtain integrals (in row-major, same to PySCF but reverse of libcint).
///
/// Multi-component integrals come out as `[comp, nao, nao]`.
///
/// # Usage
///
/// ```norun
/// let tsr = intor_row_major(&cint_data, "int1e_kin");
/// ```
pub fn intor_row_major(cint_data: &CInt, intor: &str) -> Tsr {
    // use up all rayon available threads for tensor operations
    let device = DeviceTsr::default();

    // intor, "s1", full_shls_slice
    let (out, shape) = cint_data.integrate_row_major(intor, None, None).into();

    // row-major by transposition of col-major shape
    rt::asarray((out, shape.c(), &device))
}

pub fn intor_3c2e_row_major(cint_data: &CInt, aux_cint_data: &CInt, intor: &str) -> Tsr {
    let device = DeviceTsr::default();
    let (out, shape) = CInt::integrate_cross_row_major(intor, [cint_data, cint_data, aux_cint_data], None, None).into();
    rt::asarray((out, shape.c(), &device))
}

/* #region shape checks */

/// Validate `E_MO` (`[norb, norb]`) and `TEI_MO` (`[norb; 4]`), returning `(nocc, nvirt)`.
pub fn check_mo_shapes(e_mo: &Tsr, tei_mo: &Tsr, nocc: usize) -> Result<(usize, usize)> {
    let shape = e_mo.shape();
    ensure!(shape.len() == 2 && shape[0] == shape[1], "E_MO must be a square matrix, got shape {shape:?}");
    let (nocc, nvirt) = check_tei_shape(tei_mo, nocc)?;
    ensure!(
        shape[0] == nocc + nvirt,
        "E_MO has {} orbitals but TEI_MO has {}",
        shape[0],
        nocc + nvirt
    );
    Ok((nocc, nvirt))
}

/// Validate a same-spin `TEI_MO` of shape `[norb; 4]`, returning `(nocc, nvirt)`.
pub fn check_tei_shape(tei_mo: &Tsr, nocc: usize) -> Result<(usize, usize)> {
    let shape = tei_mo.shape();
    ensure!(shape.len() == 4, "TEI_MO must be 4-dimensional, got shape {shape:?}");
    let norb = shape[0];
    ensure!(shape.iter().all(|&n| n == norb), "TEI_MO must have equal dimensions, got shape {shape:?}");
    ensure!(nocc <= norb, "nocc ({nocc}) exceeds the number of orbitals ({norb})");
    Ok((nocc, norb - nocc))
}

/// Validate an opposite-spin `TEI_MO_xxyy` of shape `[nx, nx, ny, ny]`, returning `(nvirt_x, nvirt_y)`.
pub fn check_tei_shape_xxyy(tei_mo_xxyy: &Tsr, nocc_x: usize, nocc_y: usize) -> Result<(usize, usize)> {
    let shape = tei_mo_xxyy.shape();
    ensure!(shape.len() == 4, "TEI_MO_xxyy must be 4-dimensional, got shape {shape:?}");
    ensure!(
        shape[0] == shape[1] && shape[2] == shape[3],
        "TEI_MO_xxyy must have shape [nx, nx, ny, ny], got {shape:?}"
    );
    ensure!(nocc_x <= shape[0], "nocc_x ({nocc_x}) exceeds the number of orbitals ({})", shape[0]);
    ensure!(nocc_y <= shape[2], "nocc_y ({nocc_y}) exceeds the number of orbitals ({})", shape[2]);
    Ok((shape[0] - nocc_x, shape[2] - nocc_y))
}

/* #endregion */

/* #region shape fixers */

/// Give MO coefficients a leading spin axis: `[nao, nmo]` becomes `[1, nao, nmo]`.
pub fn fix_mocoeffs_shape(mocoeffs: Tsr) -> Result<Tsr> {
    let shape = mocoeffs.shape().clone();
    match shape.len() {
        2 => Ok(mocoeffs.into_shape([1, shape[0], shape[1]])),
        3 => Ok(mocoeffs),
        _ => bail!("MO coefficients must be 2- or 3-dimensional, got shape {shape:?}"),
    }
}

/// Give MO energies a leading spin axis and matrix form.
///
/// A vector of orbital energies becomes a diagonal matrix.
pub fn fix_moenergies_shape(moenergies: Tsr) -> Result<Tsr> {
    let shape = moenergies.shape().clone();
    match shape.len() {
        1 => {
            let n = shape[0];
            let mut e_mo = rt::zeros(([n, n], moenergies.device()));
            e_mo.diagonal_mut(None).assign(&moenergies);
            Ok(e_mo.into_shape([1, n, n]))
        },
        2 => {
            ensure!(shape[0] == shape[1], "MO energy matrix must be square, got shape {shape:?}");
            Ok(moenergies.into_shape([1, shape[0], shape[1]]))
        },
        3 => Ok(moenergies),
        _ => bail!("MO energies must be 1-, 2- or 3-dimensional, got shape {shape:?}"),
    }
}

/* #endregion */

/// Occupations for a molecule with total `charge` and `spin` (= N_alpha - N_beta).
pub fn occupations_from_cint(cint_data: &CInt, norb: usize, charge: i32, spin: usize) -> Result<Occupations> {
    let nuclear = cint_data.atom_charges().into_iter().sum::<f64>().round() as i64;
    let nelec = nuclear - charge as i64;
    ensure!(nelec >= 0, "charge {charge} leaves a negative number of electrons");
    let nelec = nelec as usize;
    ensure!(
        nelec >= spin && (nelec - spin) % 2 == 0,
        "spin {spin} is incompatible with {nelec} electrons"
    );
    let nelec_beta = (nelec - spin) / 2;
    Occupations::from_nelec(nelec_beta + spin, nelec_beta, norb)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_check_shapes() {
        let device = DeviceTsr::default();
        let e_mo: Tsr = rt::zeros(([4, 4], &device));
        let tei: Tsr = rt::zeros(([4, 4, 4, 4], &device));
        assert_eq!(check_mo_shapes(&e_mo, &tei, 1).unwrap(), (1, 3));
        assert!(check_mo_shapes(&e_mo, &tei, 5).is_err());

        let e_bad: Tsr = rt::zeros(([3, 3], &device));
        assert!(check_mo_shapes(&e_bad, &tei, 1).is_err());

        let tei_bad: Tsr = rt::zeros(([4, 4, 4, 3], &device));
        assert!(check_tei_shape(&tei_bad, 1).is_err());

        let tei_xxyy: Tsr = rt::zeros(([4, 4, 3, 3], &device));
        assert_eq!(check_tei_shape_xxyy(&tei_xxyy, 2, 1).unwrap(), (2, 2));
        assert!(check_tei_shape_xxyy(&tei_bad, 2, 1).is_err());
    }

    #[test]
    fn test_fix_shapes() {
        let device = DeviceTsr::default();
        let c: Tsr = rt::zeros(([5, 4], &device));
        assert_eq!(fix_mocoeffs_shape(c).unwrap().shape().to_vec(), vec![1, 5, 4]);

        let e: Tsr = rt::asarray((vec![-1.0, 0.5, 2.0], &device));
        let e = fix_moenergies_shape(e).unwrap();
        assert_eq!(e.shape().to_vec(), vec![1, 3, 3]);
        assert_eq!(e[[0, 1, 1]], 0.5);
        assert_eq!(e[[0, 1, 2]], 0.0);

        let bad: Tsr = rt::zeros(([1, 2, 3, 4], &device));
        assert!(fix_moenergies_shape(bad).is_err());
    }

    #[test]
    fn test_occupations_from_cint() {
        let cint_data = init_h2o_def2_tzvp();
        let norb = cint_data.nao();
        let occ = occupations_from_cint(&cint_data, norb, 0, 0).unwrap();
        assert_eq!(occ.nocc_alph, 5);
        assert_eq!(occ.nocc_beta, 5);
        assert_eq!(occ.nvirt_alph, norb - 5);

        let occ = occupations_from_cint(&cint_data, norb, 1, 1).unwrap();
        assert_eq!((occ.nocc_alph, occ.nocc_beta), (5, 4));
        assert!(occupations_from_cint(&cint_data, norb, 0, 1).is_err());
    }
}
