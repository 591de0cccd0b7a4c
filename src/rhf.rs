use crate::prelude::*;

pub struct RHFConfig {
    pub max_cycle: usize,
    pub conv_tol_e: f64,
}

impl Default for RHFConfig {
    fn default() -> Self {
        Self { max_cycle: 64, conv_tol_e: 1.0e-10 }
    }
}

pub fn get_energy_nuc(cint_data: &CInt) -> f64 {
    let device = DeviceTsr::default();

    let atom_coords = {
        let coords = cint_data.atom_coords();
        let coords = coords.into_iter().flatten().collect::<Vec<f64>>();
        rt::asarray((coords, &device)).into_shape((-1, 3))
    };
    let atom_charges = rt::asarray((cint_data.atom_charges(), &device));
    let mut dist = rt::sci::cdist((atom_coords.view(), atom_coords.view()));
    dist.diagonal_mut(None).fill(f64::INFINITY);
    0.5 * (&atom_charges * atom_charges.i((.., None)) / dist).sum()
}

/// Restricted Hartree-Fock with the exact four-index Coulomb and exchange.
///
/// Produces the orbitals and orbital energies that feed the response
/// equations; no convergence acceleration.
pub fn minimal_rhf(cint_data: &CInt, config: &RHFConfig) -> Result<RHFResults> {
    let time = std::time::Instant::now();
    let device = DeviceTsr::default();

    let nocc = (cint_data.atom_charges().into_iter().sum::<f64>() / 2.0) as usize;
    let nao = cint_data.nao();

    let e_nuc = get_energy_nuc(cint_data);
    log::info!("Nuclear repulsion energy: {e_nuc}");

    let hcore = util::intor_row_major(cint_data, "int1e_kin") + util::intor_row_major(cint_data, "int1e_nuc");
    let ovlp = util::intor_row_major(cint_data, "int1e_ovlp");
    let int2e = util::intor_row_major(cint_data, "int2e");
    let jk = integrals::JKCint::from_int2e(int2e);

    let mut dm = ovlp.zeros_like();
    let mut mo_coeff = rt::zeros(([nao, nao], &device));
    let mut mo_energy = rt::zeros(([nao], &device));
    let mut e_elec = 0.0;
    let mut converged = false;
    for niter in 0..config.max_cycle {
        let (vj, vk) = jk.compute_from_density(&dm)?;
        let fock = &hcore + vj - 0.5_f64 * vk;
        (mo_energy, mo_coeff) = rt::linalg::eigh((fock.view(), ovlp.view())).into();
        dm = 2.0_f64 * mo_coeff.i((.., ..nocc)) % mo_coeff.i((.., ..nocc)).t();

        let (vj, vk) = jk.compute_from_density(&dm)?;
        let eng_scratch = &hcore + 0.5_f64 * vj - 0.25_f64 * vk;
        let e_elec_new = (&dm * &eng_scratch).sum();
        log::debug!("RHF iteration {niter}: E_elec = {e_elec_new}");
        let diff_eng = e_elec_new - e_elec;
        e_elec = e_elec_new;
        if niter > 0 && diff_eng.abs() < config.conv_tol_e {
            converged = true;
            log::info!("RHF converged in {niter} iterations.");
            break;
        }
    }
    ensure!(converged, "RHF did not converge in {} iterations", config.max_cycle);

    let e_tot = e_nuc + e_elec;
    log::info!("Total elec energy: {e_elec}");
    log::info!("Total RHF energy: {e_tot}");
    log::info!("Elapsed time for RHF: {:.2?}", time.elapsed());

    Ok(RHFResults { mo_energy, mo_coeff, dm, e_nuc, e_elec, e_tot })
}
