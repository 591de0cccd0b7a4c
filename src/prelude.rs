#![allow(unused)]

/* #region for API callers */

pub use crate::integrals::{IntegralCache, IntegralLabel, IntegralSymmetry, Integrals, IntegralsCint, IntegralsDump, JK};
pub use crate::operators::Operator;
pub use crate::rhf::RHFConfig;
pub use crate::structs::{Hamiltonian, Occupations, RHFResults, RPAInfo, ResponseResults, Spin};

/* #endregion */

/* #region for developers */

// RSTSR backend specification
#[cfg(not(feature = "use_openblas"))]
pub type DeviceTsr = DeviceFaer;
#[cfg(feature = "use_openblas")]
pub type DeviceTsr = DeviceOpenBLAS;

pub(crate) use anyhow::{Context, Result, bail, ensure};
pub(crate) use libcint::prelude::*;
pub(crate) use rayon::prelude::*;
pub(crate) use rstsr::prelude::*;

pub(crate) use crate::*;

pub type Tsr<D = IxD> = Tensor<f64, DeviceTsr, D>;
pub type TsrView<'a, D = IxD> = TensorView<'a, f64, DeviceTsr, D>;
pub type TsrMut<'a, D = IxD> = TensorMut<'a, f64, DeviceTsr, D>;

/* #endregion */
