use crate::prelude::*;

/// General four-index transformation of AO electron repulsion integrals.
///
/// `(pq|rs) = sum_{uvls} C0[u, p] C1[v, q] C2[l, r] C3[s, s'] (uv|ls)`
///
/// Each quarter transformation contracts the leading index and appends the
/// transformed one at the back, so after four passes the axes are back in
/// `[p, q, r, s]` order.
pub fn ao2mo(int2e: &Tsr, mo_coeffs: [&Tsr; 4]) -> Result<Tsr> {
    let timer = std::time::Instant::now();

    let shape = int2e.shape();
    ensure!(shape.len() == 4, "AO integrals must be 4-dimensional, got shape {shape:?}");
    let mut dims = [shape[0], shape[1], shape[2], shape[3]];
    for (n, c) in mo_coeffs.iter().enumerate() {
        ensure!(
            c.shape().len() == 2 && c.shape()[0] == dims[n],
            "MO coefficients {n} must have {} rows, got shape {:?}",
            dims[n],
            c.shape()
        );
    }

    let mut scr = int2e.to_owned();
    for c in mo_coeffs {
        let [n0, n1, n2, n3] = dims;
        let nmo = c.shape()[1];
        let scr_next = (scr.reshape([n0, n1 * n2 * n3]).t() % c).into_shape([n1, n2, n3, nmo]);
        scr = scr_next;
        dims = [n1, n2, n3, nmo];
    }

    log::debug!("Time elapsed (ao2mo): {:?}", timer.elapsed());
    Ok(scr)
}

/// `(pq|rs)` with one set of orbitals on all four indices.
pub fn ao2mo_restricted(int2e: &Tsr, mo_coeff: &Tsr) -> Result<Tsr> {
    ao2mo(int2e, [mo_coeff, mo_coeff, mo_coeff, mo_coeff])
}

/// `(p_x q_x|r_y s_y)` between two spin (or fragment) orbital sets.
pub fn ao2mo_cross(int2e: &Tsr, mo_coeff_x: &Tsr, mo_coeff_y: &Tsr) -> Result<Tsr> {
    ao2mo(int2e, [mo_coeff_x, mo_coeff_x, mo_coeff_y, mo_coeff_y])
}
