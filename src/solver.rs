//! Excitation energies and linear response from the A and B matrices.
//!
//! Everything is solved by dense symmetric eigendecomposition; the
//! occupied-virtual dimension of the molecules handled here is small enough
//! that no iterative subspace solver is needed.

use crate::prelude::*;

/// Eigenvalues below this fraction of the largest magnitude count as zero.
const SINGULAR_THRESHOLD: f64 = 1.0e-10;

fn check_square(mat: &Tsr, name: &str) -> Result<usize> {
    let shape = mat.shape();
    ensure!(shape.len() == 2 && shape[0] == shape[1], "{name} must be a square matrix, got shape {shape:?}");
    Ok(shape[0])
}

fn check_ab(a_mat: &Tsr, b_mat: &Tsr) -> Result<usize> {
    let nov = check_square(a_mat, "A")?;
    ensure!(
        check_square(b_mat, "B")? == nov,
        "A and B differ in shape ({:?} vs {:?})",
        a_mat.shape(),
        b_mat.shape()
    );
    Ok(nov)
}

/// `f(X) = V f(w) V^T` for symmetric `X = V w V^T`; `f` sees the eigenvalues.
fn symmetric_matrix_function(mat: &Tsr, f: impl Fn(&[f64]) -> Result<Vec<f64>>) -> Result<Tsr> {
    if mat.size() == 0 {
        return Ok(mat.to_owned());
    }
    let (w, v): (Tsr, Tsr) = rt::linalg::eigh(mat.view()).into();
    let fw = f(&w.to_vec())?;
    let fw: Tsr = rt::asarray((fw, vec![w.size()].c(), v.device()));
    Ok((&v * fw.i((None, ..))) % v.t())
}

fn inverse_symmetric(mat: &Tsr, name: &str) -> Result<Tsr> {
    symmetric_matrix_function(mat, |w| {
        let wmax = w.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        ensure!(
            w.iter().all(|x| x.abs() > SINGULAR_THRESHOLD * wmax),
            "{name} is singular (smallest eigenvalue magnitude {:e})",
            w.iter().fold(f64::INFINITY, |acc, x| acc.min(x.abs()))
        );
        Ok(w.iter().map(|x| 1.0 / x).collect())
    })
}

fn no_excitations(a_mat: &Tsr) -> Tsr {
    log::warn!("empty occupied-virtual space, there are no excitations");
    rt::asarray((Vec::<f64>::new(), vec![0].c(), a_mat.device()))
}

/// Tamm-Dancoff excitation energies, the eigenvalues of A in ascending order.
pub fn tda_excitation_energies(a_mat: &Tsr) -> Result<Tsr> {
    if check_square(a_mat, "A")? == 0 {
        return Ok(no_excitations(a_mat));
    }
    let (w, _): (Tsr, Tsr) = rt::linalg::eigh(a_mat.view()).into();
    Ok(w)
}

/// RPA excitation energies in ascending order.
///
/// The square roots of the eigenvalues of `(A-B)^{1/2} (A+B) (A-B)^{1/2}`.
/// Fails when `A-B` or `A+B` is not positive definite, which signals an
/// instability of the reference.
pub fn rpa_excitation_energies(a_mat: &Tsr, b_mat: &Tsr) -> Result<Tsr> {
    if check_ab(a_mat, b_mat)? == 0 {
        return Ok(no_excitations(a_mat));
    }
    let time = std::time::Instant::now();

    let amb = a_mat - b_mat;
    let apb = a_mat + b_mat;
    let amb_sqrt = symmetric_matrix_function(&amb, |w| {
        ensure!(
            w.iter().all(|&x| x > 0.0),
            "A-B is not positive definite (lowest eigenvalue {:e}); the reference is unstable",
            w[0]
        );
        Ok(w.iter().map(|x| x.sqrt()).collect())
    })?;

    let h = &amb_sqrt % apb % &amb_sqrt;
    let (w2, _): (Tsr, Tsr) = rt::linalg::eigh(h.view()).into();
    let w2 = w2.to_vec();
    ensure!(
        w2.iter().all(|&x| x > 0.0),
        "A+B is not positive definite (lowest squared excitation energy {:e}); the reference is unstable",
        w2[0]
    );
    log::debug!("Time elapsed (RPA eigenproblem): {:.2?}", time.elapsed());
    let nov = w2.len();
    let w = w2.into_iter().map(f64::sqrt).collect::<Vec<_>>();
    Ok(rt::asarray((w, vec![nov].c(), a_mat.device())))
}

/// Solve the frequency-dependent linear response equations for every row of `rhs`.
///
/// Real operators: `[(A+B) - w^2 (A-B)^{-1}] u = 2 v`.
/// Imaginary operators: `[(A-B) - w^2 (A+B)^{-1}] d = 2 v`.
///
/// `rhs` is `[ncomp, nov]` and the result has the same shape.
pub fn solve_linear_response(a_mat: &Tsr, b_mat: &Tsr, rhs: &Tsr, frequency: f64, is_imaginary: bool) -> Result<Tsr> {
    let nov = check_ab(a_mat, b_mat)?;
    ensure!(
        rhs.shape().len() == 2 && rhs.shape()[1] == nov,
        "right-hand side must have shape [ncomp, {nov}], got {:?}",
        rhs.shape()
    );
    if nov == 0 {
        return Ok(rhs.to_owned());
    }
    let time = std::time::Instant::now();

    let (lhs, rhs_inv, lhs_name) = if is_imaginary {
        (a_mat - b_mat, a_mat + b_mat, "A-B")
    } else {
        (a_mat + b_mat, a_mat - b_mat, "A+B")
    };
    let mut g = lhs;
    if frequency != 0.0 {
        let inv = inverse_symmetric(&rhs_inv, if is_imaginary { "A+B" } else { "A-B" })?;
        g -= frequency * frequency * inv;
    }
    let g_inv = inverse_symmetric(&g, &format!("{lhs_name} at frequency {frequency}"))?;

    // g is symmetric, so rows of the solution are g^{-1} (2 v) transposed
    let sol = 2.0_f64 * (rhs % g_inv);
    log::debug!("Time elapsed (linear response, frequency {frequency}): {:.2?}", time.elapsed());
    Ok(sol)
}

/// Solve for `vecs_perturbation` and contract with `vecs_property`.
pub fn linear_response(
    a_mat: &Tsr,
    b_mat: &Tsr,
    vecs_property: &Tsr,
    vecs_perturbation: &Tsr,
    frequency: f64,
    is_imaginary: bool,
) -> Result<ResponseResults> {
    let response_vectors = solve_linear_response(a_mat, b_mat, vecs_perturbation, frequency, is_imaginary)?;
    let results = indices::form_results(vecs_property, &response_vectors)?;
    Ok(ResponseResults { response_vectors, results })
}
