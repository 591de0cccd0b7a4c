//! Occupied-virtual compound index bookkeeping.
//!
//! Response matrices are indexed by compound indices `ia = i * nvirt + a`,
//! with `i` running over occupied orbitals and `a` over virtual orbitals
//! counted from the first virtual (MO index `a + nocc`).

use crate::prelude::*;
use itertools::Itertools;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OVSpace {
    pub nocc: usize,
    pub nvirt: usize,
}

impl OVSpace {
    pub fn new(nocc: usize, nvirt: usize) -> Self {
        Self { nocc, nvirt }
    }

    pub fn from_norb(norb: usize, nocc: usize) -> Result<Self> {
        ensure!(nocc <= norb, "nocc ({nocc}) exceeds the number of orbitals ({norb})");
        Ok(Self::new(nocc, norb - nocc))
    }

    pub fn nov(&self) -> usize {
        self.nocc * self.nvirt
    }

    pub fn norb(&self) -> usize {
        self.nocc + self.nvirt
    }

    pub fn compound(&self, i: usize, a: usize) -> usize {
        debug_assert!(i < self.nocc && a < self.nvirt);
        i * self.nvirt + a
    }

    /// `(i, a)` of a compound index; `None` when `ia` is out of range.
    pub fn split(&self, ia: usize) -> Option<(usize, usize)> {
        (ia < self.nov()).then(|| (ia / self.nvirt, ia % self.nvirt))
    }

    /// MO index of virtual orbital `a`.
    pub fn virt_to_mo(&self, a: usize) -> usize {
        a + self.nocc
    }

    /// `(ia, i, a)` in flattened order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, usize)> + use<> {
        let nvirt = self.nvirt;
        (0..self.nocc).cartesian_product(0..nvirt).map(move |(i, a)| (i * nvirt + a, i, a))
    }
}

/// Flatten in column-major (Fortran) order.
pub fn repack_matrix_to_vector(mat: &Tsr) -> Tsr {
    mat.t().into_contig(RowMajor).into_shape(-1)
}

/// Contract property vectors with response vectors: `property % response.T`.
///
/// Both operands are `[ncomp, nov]`; a trailing unit axis (`[ncomp, nov, 1]`)
/// is dropped.
pub fn form_results(vecs_property: &Tsr, vecs_response: &Tsr) -> Result<Tsr> {
    let squeeze = |vecs: &Tsr, name: &str| -> Result<Tsr> {
        let shape = vecs.shape();
        match shape.len() {
            2 => Ok(vecs.to_owned()),
            3 if shape[2] == 1 => Ok(vecs.to_owned().into_shape([shape[0], shape[1]])),
            _ => bail!("{name} vectors must have shape [ncomp, nov] or [ncomp, nov, 1], got {shape:?}"),
        }
    };
    let vecs_property = squeeze(vecs_property, "property")?;
    let vecs_response = squeeze(vecs_response, "response")?;
    ensure!(
        vecs_property.shape()[1] == vecs_response.shape()[1],
        "property and response vectors differ in length ({} vs {})",
        vecs_property.shape()[1],
        vecs_response.shape()[1]
    );
    if vecs_property.shape()[1] == 0 {
        let ncomp = [vecs_property.shape()[0], vecs_response.shape()[0]];
        return Ok(rt::zeros((ncomp, vecs_property.device())));
    }
    Ok(&vecs_property % vecs_response.t())
}

/// Project AO operator matrices `[ncomp, nao, nao]` onto the occupied-virtual
/// block, giving `[ncomp, nov]` in compound order.
pub fn ao_to_ov(ints_ao: &Tsr, mo_coeff: &Tsr, nocc: usize) -> Result<Tsr> {
    let shape = ints_ao.shape();
    ensure!(
        shape.len() == 3 && shape[1] == shape[2],
        "AO operator matrices must have shape [ncomp, nao, nao], got {shape:?}"
    );
    let (ncomp, nao) = (shape[0], shape[1]);
    ensure!(
        mo_coeff.shape().len() == 2,
        "MO coefficients must have shape [nao, nmo], got {:?}",
        mo_coeff.shape()
    );
    let nmo = mo_coeff.shape()[1];
    ensure!(
        mo_coeff.shape()[0] == nao,
        "MO coefficients have {} rows but operators have {nao} AOs",
        mo_coeff.shape()[0]
    );
    let space = OVSpace::from_norb(nmo, nocc)?;

    let c_occ = mo_coeff.i((.., ..nocc));
    let c_vir = mo_coeff.i((.., nocc..));
    let device = mo_coeff.device().clone();
    let mut vecs = rt::zeros(([ncomp, space.nov()], &device));
    for p in 0..ncomp {
        let v_ia = c_occ.t() % ints_ao.i(p) % &c_vir;
        vecs.i_mut(p).assign(v_ia.into_shape(-1));
    }
    Ok(vecs)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_compound_index() {
        let space = OVSpace::from_norb(7, 3).unwrap();
        assert_eq!(space.nvirt, 4);
        assert_eq!(space.nov(), 12);
        assert_eq!(space.compound(2, 1), 9);
        assert_eq!(space.split(9), Some((2, 1)));
        assert_eq!(space.split(12), None);
        assert_eq!(space.virt_to_mo(1), 4);

        let flat = space.iter().collect::<Vec<_>>();
        assert_eq!(flat.len(), 12);
        assert_eq!(flat[5], (5, 1, 1));
        for (ia, i, a) in flat {
            assert_eq!(space.split(ia), Some((i, a)));
        }

        assert!(OVSpace::from_norb(2, 3).is_err());

        // no virtual orbitals: nothing to split
        let full = OVSpace::from_norb(3, 3).unwrap();
        assert_eq!(full.nov(), 0);
        assert_eq!(full.split(0), None);
        assert_eq!(full.iter().count(), 0);
    }

    #[test]
    fn test_repack_matrix_to_vector() {
        let device = DeviceTsr::default();
        let mat: Tsr = rt::asarray((vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3].c(), &device));
        let vec = repack_matrix_to_vector(&mat);
        assert_eq!(vec.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_form_results() {
        let device = DeviceTsr::default();
        let prop: Tsr = rt::asarray((vec![1.0, 0.0, 2.0, 0.0, 1.0, 0.0], vec![2, 3].c(), &device));
        let resp: Tsr = rt::asarray((vec![1.0, 1.0, 1.0, 2.0, 0.0, -1.0, 0.0, 3.0, 0.0], vec![3, 3, 1].c(), &device));
        let res = form_results(&prop, &resp).unwrap();
        assert_eq!(res.shape().to_vec(), vec![2, 3]);
        assert_eq!(res.reshape(-1).to_vec(), vec![3.0, 0.0, 0.0, 1.0, 0.0, 3.0]);

        let short: Tsr = rt::zeros(([3, 2], &device));
        assert!(form_results(&prop, &short).is_err());
        let bad: Tsr = rt::zeros(([3, 3, 2], &device));
        assert!(form_results(&prop, &bad).is_err());
    }

    #[test]
    fn test_ao_to_ov() {
        let device = DeviceTsr::default();
        let data = (0..18).map(|x| x as f64).collect::<Vec<_>>();
        let ints: Tsr = rt::asarray((data, vec![2, 3, 3].c(), &device));
        let mut mo_coeff: Tsr = rt::zeros(([3, 3], &device));
        mo_coeff.diagonal_mut(None).fill(1.0);

        // identity orbitals: the [occ, vir] block of each component
        let vecs = ao_to_ov(&ints, &mo_coeff, 1).unwrap();
        assert_eq!(vecs.shape().to_vec(), vec![2, 2]);
        assert_eq!(vecs.into_shape([4]).to_vec(), vec![1.0, 2.0, 10.0, 11.0]);

        let mo_coeff_1d: Tsr = rt::zeros(([3], &device));
        assert!(ao_to_ov(&ints, &mo_coeff_1d, 1).is_err());
        let mo_coeff_short: Tsr = rt::zeros(([2, 3], &device));
        assert!(ao_to_ov(&ints, &mo_coeff_short, 1).is_err());
    }
}
