use crate::prelude::*;
use std::fmt;
use std::str::FromStr;

/* #region RHF */

pub struct RHFResults {
    pub mo_coeff: Tsr,
    pub mo_energy: Tsr,
    pub dm: Tsr,
    pub e_nuc: f64,
    pub e_elec: f64,
    pub e_tot: f64,
}

/* #endregion */

/* #region response flavours */

/// Which response equations are solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Hamiltonian {
    /// Full random phase approximation (A and B).
    Rpa,
    /// Tamm-Dancoff approximation (B = 0).
    Tda,
}

/// Spin symmetry of the excitation or perturbation, for closed-shell references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Spin {
    Singlet,
    Triplet,
}

impl FromStr for Hamiltonian {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rpa" => Ok(Hamiltonian::Rpa),
            "tda" => Ok(Hamiltonian::Tda),
            _ => bail!("unknown hamiltonian `{s}`, expected `rpa` or `tda`"),
        }
    }
}

impl FromStr for Spin {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "singlet" => Ok(Spin::Singlet),
            "triplet" => Ok(Spin::Triplet),
            _ => bail!("unknown spin `{s}`, expected `singlet` or `triplet`"),
        }
    }
}

impl fmt::Display for Hamiltonian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hamiltonian::Rpa => write!(f, "rpa"),
            Hamiltonian::Tda => write!(f, "tda"),
        }
    }
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spin::Singlet => write!(f, "singlet"),
            Spin::Triplet => write!(f, "triplet"),
        }
    }
}

/* #endregion */

/* #region occupations */

/// Orbital occupations `(nocc_alph, nvirt_alph, nocc_beta, nvirt_beta)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupations {
    pub nocc_alph: usize,
    pub nvirt_alph: usize,
    pub nocc_beta: usize,
    pub nvirt_beta: usize,
}

impl Occupations {
    pub fn from_nelec(nelec_alph: usize, nelec_beta: usize, norb: usize) -> Result<Self> {
        ensure!(
            nelec_alph <= norb && nelec_beta <= norb,
            "cannot place ({nelec_alph}, {nelec_beta}) electrons in {norb} orbitals"
        );
        Ok(Self {
            nocc_alph: nelec_alph,
            nvirt_alph: norb - nelec_alph,
            nocc_beta: nelec_beta,
            nvirt_beta: norb - nelec_beta,
        })
    }

    pub fn is_closed_shell(&self) -> bool {
        self.nocc_alph == self.nocc_beta && self.nvirt_alph == self.nvirt_beta
    }

    pub fn to_array(&self) -> [usize; 4] {
        [self.nocc_alph, self.nvirt_alph, self.nocc_beta, self.nvirt_beta]
    }
}

/* #endregion */

/* #region response */

/// Converged restricted reference needed to set up response equations.
#[derive(Debug)]
pub struct RPAInfo {
    pub cint_data: CInt,
    pub mo_coeff: Tsr,
    pub mo_energy: Tsr,
}

impl RPAInfo {
    pub fn nmo(&self) -> usize {
        self.mo_coeff.shape()[1]
    }

    pub fn nao(&self) -> usize {
        self.mo_coeff.shape()[0]
    }

    /// Closed-shell occupations of the neutral molecule.
    pub fn occupations(&self) -> Result<Occupations> {
        util::occupations_from_cint(&self.cint_data, self.nmo(), 0, 0)
    }

    pub fn nocc(&self) -> Result<usize> {
        Ok(self.occupations()?.nocc_alph)
    }

    pub fn ov_space(&self) -> Result<indices::OVSpace> {
        indices::OVSpace::from_norb(self.nmo(), self.nocc()?)
    }

    /// Orbital energies placed on the diagonal of a `[nmo, nmo]` matrix.
    pub fn e_mo(&self) -> Tsr {
        let mut e_mo = rt::zeros(([self.nmo(), self.nmo()], self.mo_energy.device()));
        e_mo.diagonal_mut(None).assign(&self.mo_energy);
        e_mo
    }

    /// Full MO-basis electron repulsion integrals `(pq|rs)`.
    pub fn tei_mo(&self) -> Result<Tsr> {
        let int2e = util::intor_row_major(&self.cint_data, "int2e");
        ao2mo::ao2mo_restricted(&int2e, &self.mo_coeff)
    }
}

#[derive(Debug)]
pub struct ResponseResults {
    /// Solution vectors, `[ncomp, nov]`.
    pub response_vectors: Tsr,
    /// `form_results` of the property and response vectors, `[ncomp_property, ncomp_response]`.
    pub results: Tsr,
}

/* #endregion */

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rpa_info_occupations() {
        let cint_data = init_h2o_def2_tzvp();
        let nao = cint_data.nao();
        let device = DeviceTsr::default();
        let mut mo_coeff: Tsr = rt::zeros(([nao, nao], &device));
        mo_coeff.diagonal_mut(None).fill(1.0);
        let mo_energy: Tsr = rt::zeros(([nao], &device));
        let rpa_info = RPAInfo { cint_data, mo_coeff, mo_energy };

        // H2O: 10 electrons in 5 doubly occupied orbitals
        let occupations = rpa_info.occupations().unwrap();
        assert!(occupations.is_closed_shell());
        assert_eq!(rpa_info.nocc().unwrap(), occupations.nocc_alph);
        assert_eq!(occupations.to_array(), [5, nao - 5, 5, nao - 5]);
        assert_eq!(rpa_info.ov_space().unwrap().nov(), 5 * (nao - 5));
    }
}
