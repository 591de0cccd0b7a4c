use clap::{Args, Parser, Subcommand};
use libcint::prelude::*;
use rstsr::prelude::*;
use rstsr_response::prelude::*;
use rstsr_response::*;

use anyhow::{Context, Result, bail, ensure};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct CliParser {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CliArgsRHF {
    #[clap(short, long = "mol", help = "Path to the json file containing molecular data")]
    mol_file: String,

    #[clap(long = "max-cycle", default_value_t = RHFConfig::default().max_cycle, help = "Maximum SCF iterations")]
    max_cycle: usize,

    #[clap(long = "conv-tol", default_value_t = RHFConfig::default().conv_tol_e, help = "SCF energy threshold")]
    conv_tol_e: f64,
}

impl CliArgsRHF {
    fn config(&self) -> RHFConfig {
        RHFConfig { max_cycle: self.max_cycle, conv_tol_e: self.conv_tol_e }
    }
}

#[derive(Args, Debug)]
struct CliArgsExcitation {
    #[clap(long, value_enum, default_value_t = Hamiltonian::Rpa, help = "Response Hamiltonian")]
    hamiltonian: Hamiltonian,

    #[clap(long, value_enum, default_value_t = Spin::Singlet, help = "Spin symmetry of the excitations")]
    spin: Spin,

    #[clap(long, default_value_t = 10, help = "Number of excitation energies to print")]
    nroots: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(name = "rhf", about = "Run a minimal RHF calculation")]
    Rhf(CliArgsRHF),

    #[clap(name = "excitation", about = "Excitation energies on top of a minimal RHF calculation")]
    Excitation {
        #[clap(flatten)]
        rhf: CliArgsRHF,
        #[clap(flatten)]
        excitation: CliArgsExcitation,
    },

    #[clap(name = "excitation-standalone", about = "Excitation energies with SCF data provided by user")]
    ExcitationStandalone {
        #[clap(short, long = "mol", help = "Path to the json file containing molecular data")]
        mol_file: String,
        #[clap(long = "mo-coeff", help = "Path to the .npy file of MO coefficients")]
        mo_coeff_file: PathBuf,
        #[clap(long = "mo-energy", help = "Path to the .npy file of MO energies")]
        mo_energy_file: PathBuf,
        #[clap(flatten)]
        excitation: CliArgsExcitation,
    },

    #[clap(name = "excitation-dump", about = "Excitation energies from text dumps of MO energies and integrals")]
    ExcitationDump {
        #[clap(short, long, help = "Directory holding `occupations`, `moenergies` and `tei_mo*` dumps")]
        dir: PathBuf,
        #[clap(flatten)]
        excitation: CliArgsExcitation,
    },

    #[clap(name = "response", about = "Linear response functions <<A;B>> on top of a minimal RHF calculation")]
    Response {
        #[clap(flatten)]
        rhf: CliArgsRHF,
        #[clap(long, value_enum, default_value_t = Hamiltonian::Rpa, help = "Response Hamiltonian")]
        hamiltonian: Hamiltonian,
        #[clap(long, default_value = "0.0", help = "Frequency of the perturbation (Hartree)")]
        frequency: String,
        #[clap(short, long, num_args = 1.., required = true, help = "DALTON operator labels, e.g. XDIPLEN")]
        labels: Vec<String>,
        #[clap(long, help = "File of reference values to compare against")]
        reference: Option<PathBuf>,
    },
}

fn print_excitation_energies(energies: &Tsr, excitation: &CliArgsExcitation) {
    let energies = energies.to_vec();
    println!("Lowest {} {} excitation energies (Hartree):", excitation.hamiltonian, excitation.spin);
    for (n, e) in energies.iter().take(excitation.nroots).enumerate() {
        println!("{:>4} {e:>16.10}", n + 1);
    }
}

fn excitation_energies(a_mat: &Tsr, b_mat: &Tsr, hamiltonian: Hamiltonian) -> Result<Tsr> {
    match hamiltonian {
        Hamiltonian::Rpa => solver::rpa_excitation_energies(a_mat, b_mat),
        Hamiltonian::Tda => solver::tda_excitation_energies(a_mat),
    }
}

fn run_excitation(rpa_info: &RPAInfo, excitation: &CliArgsExcitation) -> Result<()> {
    let occupations = rpa_info.occupations()?;
    log::info!("Occupations: {:?}", occupations.to_array());
    let nocc = occupations.nocc_alph;

    let tei_mo = rpa_info.tei_mo()?;
    let (a_mat, b_mat) =
        rpa::form_rpa_matrices(&rpa_info.e_mo(), &tei_mo, nocc, excitation.hamiltonian, excitation.spin)?;
    let energies = excitation_energies(&a_mat, &b_mat, excitation.hamiltonian)?;
    print_excitation_energies(&energies, excitation);
    Ok(())
}

fn run_excitation_dump(dir: &std::path::Path, excitation: &CliArgsExcitation) -> Result<()> {
    let occupations = fileio::read_file_occupations(dir.join("occupations"))?;
    let e_mo = util::fix_moenergies_shape(fileio::read_file(dir.join("moenergies"))?)?;
    log::info!("Occupations: {:?}", occupations.to_array());

    let (a_mat, b_mat) = if occupations.is_closed_shell() {
        let tei_mo = fileio::read_file_4(dir.join("tei_mo"))?;
        let e_mo = e_mo.i(0).to_owned();
        rpa::form_rpa_matrices(&e_mo, &tei_mo, occupations.nocc_alph, excitation.hamiltonian, excitation.spin)?
    } else {
        ensure!(
            e_mo.shape()[0] == 2,
            "open-shell dumps need alpha and beta MO energies, got shape {:?}",
            e_mo.shape()
        );
        log::warn!("open-shell reference: ignoring spin {}, solving the spin-blocked problem", excitation.spin);
        let tei_mo_aaaa = fileio::read_file_4(dir.join("tei_mo_aaaa"))?;
        let tei_mo_aabb = fileio::read_file_4(dir.join("tei_mo_aabb"))?;
        let tei_mo_bbbb = fileio::read_file_4(dir.join("tei_mo_bbbb"))?;
        rpa::form_rpa_matrices_unrestricted(
            &e_mo.i(0).to_owned(),
            &e_mo.i(1).to_owned(),
            &tei_mo_aaaa,
            &tei_mo_aabb,
            &tei_mo_bbbb,
            occupations.nocc_alph,
            occupations.nocc_beta,
            excitation.hamiltonian,
        )?
    };
    let energies = excitation_energies(&a_mat, &b_mat, excitation.hamiltonian)?;
    print_excitation_energies(&energies, excitation);
    Ok(())
}

fn run_response(
    rpa_info: &RPAInfo,
    hamiltonian: Hamiltonian,
    frequency: &str,
    labels: &[String],
    reference: Option<&std::path::Path>,
) -> Result<()> {
    let omega = frequency.parse::<f64>().with_context(|| format!("invalid frequency `{frequency}`"))?;
    let ops = labels.iter().map(|label| operators::dalton_label_to_operator(label)).collect::<Result<Vec<_>>>()?;
    for (label, operator) in labels.iter().zip(&ops) {
        ensure!(!operator.label.is_empty(), "unknown operator label `{label}`");
    }
    let is_imaginary = ops[0].is_imaginary();
    let spin = ops[0].spin();
    if ops.iter().any(|op| op.is_imaginary() != is_imaginary || op.spin() != spin) {
        bail!("all operators must share the same time-reversal and spin symmetry");
    }

    let occupations = rpa_info.occupations()?;
    log::info!("Occupations: {:?}", occupations.to_array());
    let nocc = occupations.nocc_alph;
    let mut integrals = IntegralCache::new(IntegralsCint::new(&rpa_info.cint_data));
    let vecs = ops
        .iter()
        .map(|op| op.vecs_property(&mut integrals, &rpa_info.mo_coeff, nocc))
        .collect::<Result<Vec<_>>>()?;
    let nov = indices::OVSpace::from_norb(rpa_info.nmo(), nocc)?.nov();
    let device = rpa_info.mo_coeff.device().clone();
    let mut vecs_all: Tsr = rt::zeros(([vecs.len(), nov], &device));
    for (n, v) in vecs.iter().enumerate() {
        ensure!(v.shape()[0] == 1, "operator `{}` does not select a single component", labels[n]);
        vecs_all.i_mut(n).assign(v.i(0));
    }

    let tei_mo = rpa_info.tei_mo()?;
    let (a_mat, b_mat) = rpa::form_rpa_matrices(&rpa_info.e_mo(), &tei_mo, nocc, hamiltonian, spin)?;
    let response = solver::linear_response(&a_mat, &b_mat, &vecs_all, &vecs_all, omega, is_imaginary)?;

    println!("Linear response functions, {hamiltonian} {spin}, frequency {frequency}:");
    for (i, label_1) in labels.iter().enumerate() {
        for (j, label_2) in labels.iter().enumerate() {
            let value = -2.0 * response.results[[i, j]];
            match reference {
                Some(path) => {
                    let ref_value = fileio::get_reference_value_from_file(
                        path,
                        &hamiltonian.to_string(),
                        &spin.to_string(),
                        frequency,
                        label_1,
                        label_2,
                    )?;
                    println!(
                        "<<{label_1};{label_2}>> = {value:>16.10}  reference {ref_value:>16.10}  diff {:>10.2e}",
                        value - ref_value
                    );
                },
                None => println!("<<{label_1};{label_2}>> = {value:>16.10}"),
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = CliParser::parse();

    match args.command {
        Command::Rhf(rhf_args) => {
            let cint_data = CInt::from_json(&rhf_args.mol_file);
            let rhf_results = rhf::minimal_rhf(&cint_data, &rhf_args.config())?;
            println!("Total RHF energy: {}", rhf_results.e_tot);
        },
        Command::Excitation { rhf: rhf_args, excitation } => {
            let cint_data = CInt::from_json(&rhf_args.mol_file);
            let rhf_results = rhf::minimal_rhf(&cint_data, &rhf_args.config())?;
            let rpa_info = RPAInfo { cint_data, mo_coeff: rhf_results.mo_coeff, mo_energy: rhf_results.mo_energy };
            run_excitation(&rpa_info, &excitation)?;
        },
        Command::ExcitationStandalone { mol_file, mo_coeff_file, mo_energy_file, excitation } => {
            let cint_data = CInt::from_json(&mol_file);
            let mo_coeff = util::fix_mocoeffs_shape(fileio::np_load(&mo_coeff_file)?)?;
            let mo_energy = util::fix_moenergies_shape(fileio::np_load(&mo_energy_file)?)?;
            if mo_coeff.shape()[0] > 1 {
                log::warn!("MO coefficients hold {} spin sets, only the first is used", mo_coeff.shape()[0]);
            }
            let mo_coeff = mo_coeff.i(0).to_owned();
            let mo_energy = mo_energy.i(0).diagonal(None).to_owned();
            ensure!(
                mo_coeff.shape()[0] == cint_data.nao() && mo_coeff.shape()[1] == mo_energy.shape()[0],
                "MO coefficients {:?} do not match {} AOs and {} MO energies",
                mo_coeff.shape(),
                cint_data.nao(),
                mo_energy.shape()[0]
            );
            let rpa_info = RPAInfo { cint_data, mo_coeff, mo_energy };
            run_excitation(&rpa_info, &excitation)?;
        },
        Command::ExcitationDump { dir, excitation } => {
            run_excitation_dump(&dir, &excitation)?;
        },
        Command::Response { rhf: rhf_args, hamiltonian, frequency, labels, reference } => {
            let cint_data = CInt::from_json(&rhf_args.mol_file);
            let rhf_results = rhf::minimal_rhf(&cint_data, &rhf_args.config())?;
            let rpa_info = RPAInfo { cint_data, mo_coeff: rhf_results.mo_coeff, mo_energy: rhf_results.mo_energy };
            run_response(&rpa_info, hamiltonian, &frequency, &labels, reference.as_deref())?;
        },
    }
    Ok(())
}
