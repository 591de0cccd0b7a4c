//! Perturbation operators, and their construction from DALTON property labels.

use crate::integrals::{self, IntegralCache, IntegralLabel, Integrals};
use crate::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operator {
    pub label: String,
    /// Imaginary (time-odd) operators couple through `A - B` instead of `A + B`.
    pub is_imaginary: Option<bool>,
    /// Spin-dependent operators perturb through the triplet response matrices.
    pub is_spin_dependent: Option<bool>,
    /// Component of the integral array this operator refers to; `None` means all.
    pub slice_idx: Option<usize>,
}

pub fn clean_dalton_label(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}

fn coord1_to_slice(coord: char) -> Result<usize> {
    match coord {
        'x' => Ok(0),
        'y' => Ok(1),
        'z' => Ok(2),
        _ => bail!("invalid Cartesian coordinate `{coord}`"),
    }
}

fn coord2_to_slice(coord: &str) -> Result<usize> {
    match coord {
        "xx" => Ok(0),
        "xy" | "yx" => Ok(1),
        "xz" | "zx" => Ok(2),
        "yy" => Ok(3),
        "yz" | "zy" => Ok(4),
        "zz" => Ok(5),
        _ => bail!("invalid Cartesian tensor component `{coord}`"),
    }
}

/// Character at byte position `idx` of an ASCII label.
fn label_char(label: &str, idx: usize) -> Result<char> {
    let byte = label.as_bytes().get(idx).with_context(|| format!("label `{label}` is too short"))?;
    ensure!(byte.is_ascii(), "label `{label}` is not ASCII");
    Ok(*byte as char)
}

fn label_field(label: &str, range: std::ops::Range<usize>) -> Result<usize> {
    let field = label.get(range.clone()).with_context(|| format!("label `{label}` is too short"))?;
    field.parse::<usize>().with_context(|| format!("label `{label}`: `{field}` at {range:?} is not an index"))
}

/// Translate a DALTON property label (`XDIPLEN`, `SD 004 y`, ...) into an [`Operator`].
///
/// Labels that match no known operator give an operator with an empty label
/// and no flags set.
pub fn dalton_label_to_operator(label: &str) -> Result<Operator> {
    let label = clean_dalton_label(label);

    let operator = if label.contains("diplen") {
        Operator {
            label: "dipole".into(),
            is_imaginary: Some(false),
            is_spin_dependent: Some(false),
            slice_idx: Some(coord1_to_slice(label_char(&label, 0)?)?),
        }
    } else if label.contains("dipvel") {
        Operator {
            label: "dipvel".into(),
            is_imaginary: Some(true),
            is_spin_dependent: Some(false),
            slice_idx: Some(coord1_to_slice(label_char(&label, 0)?)?),
        }
    } else if label.contains("angmom") {
        Operator {
            label: "angmom".into(),
            is_imaginary: Some(true),
            is_spin_dependent: Some(false),
            slice_idx: Some(coord1_to_slice(label_char(&label, 0)?)?),
        }
    } else if label.contains("spnorb") {
        let mut operator_label = String::from("spinorb");
        match label_char(&label, 1)? {
            nelec @ ('1' | '2') => operator_label.push(nelec),
            // combined one- and two-electron
            '_' => operator_label.push('c'),
            _ => (),
        }
        Operator {
            label: operator_label,
            is_imaginary: Some(true),
            is_spin_dependent: Some(true),
            slice_idx: Some(coord1_to_slice(label_char(&label, 0)?)?),
        }
    } else if label.contains("fc") {
        let atomid = label_field(&label, 6..8)?;
        ensure!(atomid >= 1, "label `{label}`: atom numbering starts at 1");
        Operator {
            label: "fermi".into(),
            is_imaginary: Some(false),
            is_spin_dependent: Some(true),
            slice_idx: Some(atomid - 1),
        }
    } else if label.contains("sd") {
        // `sd_004_y`: Cartesian displacement 4 (atom 2, x), field component y
        let coord_atom = label_field(&label, 3..6)?;
        ensure!(coord_atom >= 1, "label `{label}`: coordinate numbering starts at 1");
        let atomid = (coord_atom - 1) / 3;
        let coord_1 = ['x', 'y', 'z'][(coord_atom - 1) % 3];
        let coord_2 = format!("{coord_1}{}", label_char(&label, 7)?);
        Operator {
            label: "sd".into(),
            is_imaginary: Some(false),
            is_spin_dependent: Some(true),
            slice_idx: Some(6 * atomid + coord2_to_slice(&coord_2)?),
        }
    } else if label.contains("pso") {
        Operator {
            label: "pso".into(),
            is_imaginary: Some(true),
            is_spin_dependent: Some(false),
            slice_idx: None,
        }
    } else {
        Operator::default()
    };

    Ok(operator)
}

impl Operator {
    pub fn is_imaginary(&self) -> bool {
        self.is_imaginary.unwrap_or(false)
    }

    pub fn is_spin_dependent(&self) -> bool {
        self.is_spin_dependent.unwrap_or(false)
    }

    /// Spin symmetry of the response matrices this operator perturbs through.
    pub fn spin(&self) -> Spin {
        if self.is_spin_dependent() { Spin::Triplet } else { Spin::Singlet }
    }

    /// One-electron integrals that represent this operator.
    pub fn integral_label(&self) -> Result<IntegralLabel> {
        match self.label.as_str() {
            "dipole" => Ok(integrals::DIPOLE),
            "dipvel" => Ok(integrals::DIPVEL),
            "angmom" => Ok(integrals::ANGMOM_COMMON_GAUGE),
            "spinorb1" => Ok(integrals::SO_1E),
            "" => bail!("empty operator has no integrals"),
            label => bail!("operator `{label}` has no one-electron integrals available"),
        }
    }

    /// Occupied-virtual property vectors, `[ncomp, nov]`.
    ///
    /// With `slice_idx` set only that component is kept, giving `[1, nov]`.
    pub fn vecs_property<I: Integrals>(
        &self,
        integrals: &mut IntegralCache<I>,
        mo_coeff: &Tsr,
        nocc: usize,
    ) -> Result<Tsr> {
        let label = self.integral_label()?;
        let ints_ao = integrals.get(&label)?;
        let vecs = indices::ao_to_ov(ints_ao, mo_coeff, nocc)?;
        match self.slice_idx {
            None => Ok(vecs),
            Some(idx) => {
                ensure!(
                    idx < label.comp,
                    "operator `{}` selects component {idx}, but `{}` has {} components",
                    self.label,
                    label.name,
                    label.comp
                );
                Ok(vecs.i(idx..idx + 1).to_owned())
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clean_dalton_label() {
        assert_eq!(clean_dalton_label("SD 004 y"), "sd_004_y");
        assert_eq!(clean_dalton_label("XDIPLEN "), "xdiplen_");
    }

    #[test]
    fn test_dalton_label_to_operator() {
        let op = dalton_label_to_operator("ZDIPLEN").unwrap();
        assert_eq!(op.label, "dipole");
        assert_eq!(op.slice_idx, Some(2));
        assert_eq!(op.is_imaginary, Some(false));
        assert_eq!(op.spin(), Spin::Singlet);

        let op = dalton_label_to_operator("YDIPVEL").unwrap();
        assert_eq!((op.label.as_str(), op.slice_idx, op.is_imaginary()), ("dipvel", Some(1), true));

        let op = dalton_label_to_operator("XANGMOM").unwrap();
        assert_eq!((op.label.as_str(), op.slice_idx, op.is_imaginary()), ("angmom", Some(0), true));

        let op = dalton_label_to_operator("Y1SPNORB").unwrap();
        assert_eq!(op.label, "spinorb1");
        assert_eq!(op.slice_idx, Some(1));
        assert_eq!(op.spin(), Spin::Triplet);
        assert_eq!(dalton_label_to_operator("Z2SPNORB").unwrap().label, "spinorb2");
        assert_eq!(dalton_label_to_operator("X SPNORB").unwrap().label, "spinorbc");

        let op = dalton_label_to_operator("FC H  02").unwrap();
        assert_eq!((op.label.as_str(), op.slice_idx, op.is_imaginary()), ("fermi", Some(1), false));
        assert!(op.is_spin_dependent());

        // coordinate 5 belongs to atom 2 (y), paired with the z field component
        let op = dalton_label_to_operator("SD 005 z").unwrap();
        assert_eq!(op.label, "sd");
        assert_eq!(op.slice_idx, Some(6 + 4));
        let op = dalton_label_to_operator("SD 001 x").unwrap();
        assert_eq!(op.slice_idx, Some(0));

        let op = dalton_label_to_operator("PSO 001").unwrap();
        assert_eq!((op.label.as_str(), op.slice_idx, op.is_imaginary()), ("pso", None, true));

        let op = dalton_label_to_operator("XXQUADRU").unwrap();
        assert_eq!(op, Operator::default());
        assert_eq!(op.label, "");
        assert!(op.is_imaginary.is_none());
    }

    #[test]
    fn test_malformed_labels() {
        assert!(dalton_label_to_operator("QDIPLEN").is_err());
        assert!(dalton_label_to_operator("FC O  xx").is_err());
        assert!(dalton_label_to_operator("SD 001 q").is_err());
        assert!(dalton_label_to_operator("SD").is_err());
        // coordinates are read by byte position, so a multi-byte prefix is rejected
        assert!(dalton_label_to_operator("ÅDIPLEN").is_err());
        assert!(label_char("sd_001_é", 7).is_err());
        assert_eq!(label_char("sd_001_y", 7).unwrap(), 'y');
    }

    #[test]
    fn test_integral_label() {
        let op = dalton_label_to_operator("XDIPLEN").unwrap();
        assert_eq!(op.integral_label().unwrap(), integrals::DIPOLE);
        let op = dalton_label_to_operator("X1SPNORB").unwrap();
        assert_eq!(op.integral_label().unwrap(), integrals::SO_1E);
        assert!(dalton_label_to_operator("FC H  01").unwrap().integral_label().is_err());
        assert!(Operator::default().integral_label().is_err());
    }

    #[test]
    fn test_vecs_property() {
        let cint_data = init_h2o_def2_tzvp();
        let nao = cint_data.nao();
        let nocc = 5;
        let device = DeviceTsr::default();
        let mut mo_coeff: Tsr = rt::zeros(([nao, nao], &device));
        mo_coeff.diagonal_mut(None).fill(1.0);

        let mut cache = IntegralCache::new(integrals::IntegralsCint::new(&cint_data));
        let all = Operator { slice_idx: None, ..dalton_label_to_operator("XDIPLEN").unwrap() };
        let vecs_all = all.vecs_property(&mut cache, &mo_coeff, nocc).unwrap();
        assert_eq!(vecs_all.shape().to_vec(), vec![3, nocc * (nao - nocc)]);

        let y = dalton_label_to_operator("YDIPLEN").unwrap();
        let vecs_y = y.vecs_property(&mut cache, &mo_coeff, nocc).unwrap();
        assert_eq!(vecs_y.shape().to_vec(), vec![1, nocc * (nao - nocc)]);
        assert!((vecs_all.i(1) - vecs_y.i(0)).l2_norm() < 1e-14);
        assert_eq!(cache.len(), 1);
    }
}
