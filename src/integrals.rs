//! One-electron property integrals and Coulomb/exchange builders.
//!
//! Integral providers hand back AO matrices as `[comp, nao, nao]`, so that
//! single-component operators and vector operators go through the same
//! projection in [`crate::indices::ao_to_ov`].

use crate::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/* #region labels */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegralSymmetry {
    Symmetric,
    Antisymmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegralLabel {
    /// libcint integrator name; also the file stem of dumped integrals.
    pub name: &'static str,
    pub comp: usize,
    pub symmetry: IntegralSymmetry,
}

impl IntegralLabel {
    pub const fn new(name: &'static str, comp: usize, symmetry: IntegralSymmetry) -> Self {
        Self { name, comp, symmetry }
    }
}

use IntegralSymmetry::{Antisymmetric, Symmetric};

pub const OVERLAP: IntegralLabel = IntegralLabel::new("int1e_ovlp", 1, Symmetric);
pub const KINETIC: IntegralLabel = IntegralLabel::new("int1e_kin", 1, Symmetric);
pub const NUCLEAR: IntegralLabel = IntegralLabel::new("int1e_nuc", 1, Symmetric);
pub const DIPOLE: IntegralLabel = IntegralLabel::new("int1e_r", 3, Symmetric);
pub const DIPVEL: IntegralLabel = IntegralLabel::new("int1e_ipovlp", 3, Symmetric);
pub const ANGMOM_COMMON_GAUGE: IntegralLabel = IntegralLabel::new("int1e_cg_irxp", 3, Symmetric);
pub const ANGMOM_GIAO: IntegralLabel = IntegralLabel::new("int1e_giao_irjxp", 3, Symmetric);
pub const A11PART_GIAO: IntegralLabel = IntegralLabel::new("int1e_giao_a11part", 9, Symmetric);
pub const A11PART_CG: IntegralLabel = IntegralLabel::new("int1e_cg_a11part", 9, Symmetric);
pub const A01: IntegralLabel = IntegralLabel::new("int1e_a01gp", 9, Symmetric);
pub const SO_1E: IntegralLabel = IntegralLabel::new("int1e_prinvxp", 3, Antisymmetric);
pub const NSO_1E: IntegralLabel = IntegralLabel::new("int1e_pnucxp", 3, Antisymmetric);

/// Bring raw integrals into `[comp, nao, nao]` and apply the label's symmetry.
fn normalize_integrals(ints: Tsr, label: &IntegralLabel) -> Result<Tsr> {
    let shape = ints.shape().clone();
    let ints = match shape.len() {
        2 => ints.into_shape([1, shape[0], shape[1]]),
        3 => ints,
        _ => bail!("integrals `{}` have unexpected shape {shape:?}", label.name),
    };
    let shape = ints.shape().clone();
    ensure!(
        shape[0] == label.comp && shape[1] == shape[2],
        "integrals `{}` should have shape [{}, nao, nao], got {shape:?}",
        label.name,
        label.comp
    );
    match label.symmetry {
        Symmetric => Ok(ints),
        Antisymmetric => Ok(0.5_f64 * (&ints - ints.swapaxes(1, 2))),
    }
}

/* #endregion */

/* #region one-electron integrals */

pub trait Integrals {
    /// AO matrices of the operator, `[comp, nao, nao]`.
    fn compute(&self, label: &IntegralLabel) -> Result<Tsr>;
}

/// Memoizes integrals per label.
pub struct IntegralCache<I: Integrals> {
    integrals: I,
    cache: HashMap<IntegralLabel, Tsr>,
}

impl<I: Integrals> IntegralCache<I> {
    pub fn new(integrals: I) -> Self {
        Self { integrals, cache: HashMap::new() }
    }

    pub fn get(&mut self, label: &IntegralLabel) -> Result<&Tsr> {
        if !self.cache.contains_key(label) {
            let ints = self.integrals.compute(label)?;
            self.cache.insert(*label, ints);
        }
        self.cache.get(label).context("integral cache lost an entry")
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn integrals(&self) -> &I {
        &self.integrals
    }
}

/// Analytic integrals from libcint.
pub struct IntegralsCint<'a> {
    pub cint_data: &'a CInt,
}

impl<'a> IntegralsCint<'a> {
    pub fn new(cint_data: &'a CInt) -> Self {
        Self { cint_data }
    }
}

impl Integrals for IntegralsCint<'_> {
    fn compute(&self, label: &IntegralLabel) -> Result<Tsr> {
        log::debug!("computing integrals `{}` with libcint", label.name);
        normalize_integrals(util::intor_row_major(self.cint_data, label.name), label)
    }
}

/// Integrals dumped by an external program as `<dir>/<name>.npy`.
pub struct IntegralsDump {
    pub dir: PathBuf,
}

impl IntegralsDump {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }
}

impl Integrals for IntegralsDump {
    fn compute(&self, label: &IntegralLabel) -> Result<Tsr> {
        let path = self.dir.join(format!("{}.npy", label.name));
        let ints = fileio::np_load(&path).with_context(|| format!("no dumped integrals for `{}`", label.name))?;
        normalize_integrals(ints, label)
    }
}

/* #endregion */

/* #region JK */

/// Coulomb and exchange matrices of an AO density.
///
/// `J[u, v] = (uv|ls) D[l, s]`, `K[u, v] = (ul|vs) D[l, s]`.
pub trait JK {
    fn compute_from_density(&self, dm: &Tsr) -> Result<(Tsr, Tsr)>;

    /// J and K of the density `C_left C_right^T`.
    fn compute_from_mocoeffs(&self, c_left: &Tsr, c_right: Option<&Tsr>) -> Result<(Tsr, Tsr)> {
        let c_right = c_right.unwrap_or(c_left);
        ensure!(
            c_left.shape() == c_right.shape(),
            "JK: left and right MO coefficients differ in shape ({:?} vs {:?})",
            c_left.shape(),
            c_right.shape()
        );
        let dm = c_left % c_right.t();
        self.compute_from_density(&dm)
    }
}

fn check_density_shape(dm: &Tsr, nao: usize) -> Result<()> {
    ensure!(
        dm.shape().len() == 2 && dm.shape()[0] == nao && dm.shape()[1] == nao,
        "density matrix must have shape [{nao}, {nao}], got {:?}",
        dm.shape()
    );
    Ok(())
}

/// Exact four-index JK.
pub struct JKCint {
    int2e: Tsr,
}

impl JKCint {
    pub fn new(cint_data: &CInt) -> Self {
        Self::from_int2e(util::intor_row_major(cint_data, "int2e"))
    }

    pub fn from_int2e(int2e: Tsr) -> Self {
        Self { int2e }
    }

    pub fn nao(&self) -> usize {
        self.int2e.shape()[0]
    }
}

impl JK for JKCint {
    fn compute_from_density(&self, dm: &Tsr) -> Result<(Tsr, Tsr)> {
        let nao = self.nao();
        check_density_shape(dm, nao)?;
        let dm_flat = dm.reshape([nao * nao]);
        let vj = (self.int2e.reshape([nao * nao, nao * nao]) % &dm_flat).into_shape([nao, nao]);
        let vk = (self.int2e.swapaxes(1, 2).reshape([nao * nao, nao * nao]) % &dm_flat).into_shape([nao, nao]);
        Ok((vj, vk))
    }
}

/// Density-fitted JK.
///
/// The three-center integrals are contracted with the inverse Cholesky factor
/// of the two-center metric, `B[P, uv] = L^{-1}[P, Q] (Q|uv)`.
pub struct RIJKCint {
    cderi: Tsr,
    nao: usize,
}

impl RIJKCint {
    pub fn new(cint_data: &CInt, aux_cint_data: &CInt) -> Self {
        let time = std::time::Instant::now();
        let nao = cint_data.nao();
        let naux = aux_cint_data.nao();

        let int2c2e = util::intor_row_major(aux_cint_data, "int2c2e");
        let int3c2e = util::intor_3c2e_row_major(cint_data, aux_cint_data, "int3c2e").into_shape([naux, nao * nao]);

        let int2c2e_l = rt::linalg::cholesky((int2c2e.view(), Lower));
        let cderi = rt::linalg::solve_triangular((int2c2e_l.view(), int3c2e, Lower));
        log::debug!("Time elapsed (cderi, naux = {naux}): {:.2?}", time.elapsed());

        Self { cderi, nao }
    }

    pub fn naux(&self) -> usize {
        self.cderi.shape()[0]
    }
}

impl JK for RIJKCint {
    fn compute_from_density(&self, dm: &Tsr) -> Result<(Tsr, Tsr)> {
        let nao = self.nao;
        let naux = self.naux();
        check_density_shape(dm, nao)?;

        let vj = (self.cderi.t() % (&self.cderi % dm.reshape([nao * nao]))).into_shape([nao, nao]);

        // K[u, v] = sum_P B[P, u, l] D[l, s] B[P, s, v]
        let cderi = self.cderi.reshape([naux, nao, nao]);
        let mut vk: Tsr = rt::zeros(([nao, nao], dm.device()));
        for p in 0..naux {
            vk += cderi.i(p) % dm % cderi.i(p);
        }
        Ok((vj, vk))
    }
}

impl JK for IntegralsDump {
    fn compute_from_density(&self, _dm: &Tsr) -> Result<(Tsr, Tsr)> {
        bail!("JK from dumped integrals is not implemented")
    }

    fn compute_from_mocoeffs(&self, c_left: &Tsr, c_right: Option<&Tsr>) -> Result<(Tsr, Tsr)> {
        if let Some(c_right) = c_right {
            ensure!(
                c_left.shape() == c_right.shape(),
                "JK: left and right MO coefficients differ in shape ({:?} vs {:?})",
                c_left.shape(),
                c_right.shape()
            );
        }
        bail!("JK from dumped integrals is not implemented")
    }
}

/* #endregion */
