//! Readers for arrays and reference data written by other programs.
//!
//! Plain-text dumps carry their dimensions on the first line, followed by one
//! value per line with the last index running fastest.

use crate::prelude::*;
use std::fs;
use std::path::Path;

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/* #region numpy */

/// Load a `.npy` array of `f64` into a row-major tensor.
pub fn np_load(path: impl AsRef<Path>) -> Result<Tsr> {
    let path = path.as_ref();
    ensure!(
        path.extension().is_none_or(|ext| ext != "npz"),
        "{}: .npz archives are not supported, save the array with np.save",
        path.display()
    );
    let device = DeviceTsr::default();
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let npy = npyz::NpyFile::new(&bytes[..]).with_context(|| format!("{} is not a .npy file", path.display()))?;
    let shape = npy.shape().iter().map(|&x| x as usize).collect::<Vec<usize>>();
    let order = npy.order();
    let data: Vec<f64> = npy.into_vec().with_context(|| format!("{} does not hold f64 data", path.display()))?;
    let tsr: Tsr = match order {
        npyz::Order::C => rt::asarray((data, shape.c(), &device)),
        npyz::Order::Fortran => rt::asarray((data, shape.f(), &device)).into_contig(RowMajor),
    };
    Ok(tsr)
}

/* #endregion */

/* #region text dumps */

/// Read a text dump of any dimensionality.
pub fn read_file(path: impl AsRef<Path>) -> Result<Tsr> {
    let path = path.as_ref();
    let contents = read_to_string(path)?;
    let mut lines = contents.lines();
    let header = lines.next().with_context(|| format!("{} is empty", path.display()))?;
    let shape = header
        .split_whitespace()
        .map(|x| x.parse::<usize>())
        .collect::<Result<Vec<usize>, _>>()
        .with_context(|| format!("{}: invalid dimension line `{header}`", path.display()))?;
    ensure!(!shape.is_empty(), "{}: missing dimensions", path.display());

    let elements = lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.parse::<f64>().with_context(|| format!("{}: invalid value `{line}`", path.display())))
        .collect::<Result<Vec<f64>>>()?;
    let n_elem = shape.iter().product::<usize>();
    ensure!(
        elements.len() == n_elem,
        "{}: expected {n_elem} elements for shape {shape:?}, found {}",
        path.display(),
        elements.len()
    );

    let device = DeviceTsr::default();
    Ok(rt::asarray((elements, shape.c(), &device)))
}

fn read_file_ndim(path: &Path, ndim: usize) -> Result<Tsr> {
    let tsr = read_file(path)?;
    ensure!(
        tsr.ndim() == ndim,
        "{}: expected a {ndim}-dimensional array, got shape {:?}",
        path.display(),
        tsr.shape()
    );
    Ok(tsr)
}

pub fn read_file_1(path: impl AsRef<Path>) -> Result<Tsr> {
    read_file_ndim(path.as_ref(), 1)
}

pub fn read_file_2(path: impl AsRef<Path>) -> Result<Tsr> {
    read_file_ndim(path.as_ref(), 2)
}

pub fn read_file_3(path: impl AsRef<Path>) -> Result<Tsr> {
    read_file_ndim(path.as_ref(), 3)
}

pub fn read_file_4(path: impl AsRef<Path>) -> Result<Tsr> {
    read_file_ndim(path.as_ref(), 4)
}

/// Symmetric `[dim, dim]` matrix from 1-based `mu nu value` lines.
pub fn parse_int_file_2(path: impl AsRef<Path>, dim: usize) -> Result<Tsr> {
    let path = path.as_ref();
    let device = DeviceTsr::default();
    let mut mat: Tsr = rt::zeros(([dim, dim], &device));

    let parse_index = |token: &str| -> Result<usize> {
        let idx = token.parse::<f64>()?;
        ensure!(
            idx.fract() == 0.0 && idx >= 1.0 && idx <= dim as f64,
            "index {token} outside 1..={dim}"
        );
        Ok(idx as usize - 1)
    };

    for (nline, line) in read_to_string(path)?.lines().enumerate() {
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.is_empty() {
            continue;
        }
        let context = || format!("{}:{}: invalid integral line `{line}`", path.display(), nline + 1);
        ensure!(tokens.len() == 3, context());
        let mu = parse_index(tokens[0]).with_context(context)?;
        let nu = parse_index(tokens[1]).with_context(context)?;
        let val = tokens[2].parse::<f64>().with_context(context)?;
        mat[[mu, nu]] = val;
        mat[[nu, mu]] = val;
    }
    Ok(mat)
}

/// `nocc_alph nvirt_alph nocc_beta nvirt_beta`, whitespace separated.
pub fn read_file_occupations(path: impl AsRef<Path>) -> Result<Occupations> {
    let path = path.as_ref();
    let contents = read_to_string(path)?;
    let tokens = contents
        .split_whitespace()
        .map(|x| x.parse::<usize>())
        .collect::<Result<Vec<usize>, _>>()
        .with_context(|| format!("{}: occupations must be integers", path.display()))?;
    ensure!(tokens.len() == 4, "{}: expected 4 occupation numbers, found {}", path.display(), tokens.len());
    Ok(Occupations { nocc_alph: tokens[0], nvirt_alph: tokens[1], nocc_beta: tokens[2], nvirt_beta: tokens[3] })
}

/// Look up a reference response value.
///
/// Each non-blank line holds `hamiltonian spin frequency label_1 label_2 value`.
/// The frequency is matched as written in the file. If several lines match,
/// the last one wins.
pub fn get_reference_value_from_file(
    path: impl AsRef<Path>,
    hamiltonian: &str,
    spin: &str,
    frequency: &str,
    label_1: &str,
    label_2: &str,
) -> Result<f64> {
    let path = path.as_ref();
    let mut reference = None;
    for (nline, line) in read_to_string(path)?.lines().enumerate() {
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.is_empty() {
            continue;
        }
        ensure!(
            tokens.len() == 6,
            "{}:{}: expected 6 fields, found {}",
            path.display(),
            nline + 1,
            tokens.len()
        );
        if tokens[..5] == [hamiltonian, spin, frequency, label_1, label_2] {
            let val = tokens[5]
                .parse::<f64>()
                .with_context(|| format!("{}:{}: invalid value `{}`", path.display(), nline + 1, tokens[5]))?;
            reference = Some(val);
        }
    }
    reference.with_context(|| {
        format!(
            "{}: no reference value for {hamiltonian} {spin} {frequency} {label_1} {label_2}",
            path.display()
        )
    })
}

/* #endregion */

/* #region DALTON */

/// Splits lines into fixed-width fields.
#[derive(Debug, Clone)]
pub struct Splitter {
    bounds: Vec<(usize, usize)>,
}

impl Splitter {
    pub fn new(widths: &[usize]) -> Self {
        let bounds = widths
            .iter()
            .scan(0, |start, &width| {
                let bound = (*start, *start + width);
                *start += width;
                Some(bound)
            })
            .collect();
        Self { bounds }
    }

    /// Trimmed fields; empty trailing fields are dropped, but the first field is always kept.
    pub fn split(&self, line: &str) -> Vec<String> {
        let chars = line.chars().collect::<Vec<char>>();
        let mut elements = self
            .bounds
            .iter()
            .map(|&(start, end)| {
                let (start, end) = (start.min(chars.len()), end.min(chars.len()));
                chars[start..end].iter().collect::<String>().trim().to_string()
            })
            .collect::<Vec<String>>();
        while elements.len() > 1 && elements.last().is_some_and(|x| x.is_empty()) {
            elements.pop();
        }
        elements
    }
}

const DALTON_PROP_WIDTHS: [usize; 15] = [5, 3, 4, 11, 23, 9, 9, 9, 9, 23, 23, 23, 4, 4, 4];

/// Fields of every line of `DALTON.PROP` in `dir`.
pub fn read_dalton_propfile(dir: impl AsRef<Path>) -> Result<Vec<Vec<String>>> {
    let contents = read_to_string(&dir.as_ref().join("DALTON.PROP"))?;
    let splitter = Splitter::new(&DALTON_PROP_WIDTHS);
    Ok(contents.lines().map(|line| splitter.split(line)).collect())
}

/* #endregion */
