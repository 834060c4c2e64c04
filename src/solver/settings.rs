use crate::algebra::*;
use derive_builder::Builder;

#[cfg(feature = "serde")]
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Solver tunables.
///
/// Defaults are available via `Settings::default()` or through
/// [`SettingsBuilder`], e.g.
/// ```no_run
/// use proxip::solver::SettingsBuilder;
/// let settings = SettingsBuilder::<f64>::default()
///     .verbose(true)
///     .max_iter(50)
///     .build()
///     .unwrap();
/// ```

#[derive(Builder, Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "T: Serialize + DeserializeOwned"))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings<T: FloatT> {
    ///initial primal proximal weight ρ
    #[builder(default = "(1e-6).lit()")]
    pub rho_init: T,

    ///initial dual proximal weight δ
    #[builder(default = "(1e-4).lit()")]
    pub delta_init: T,

    ///absolute feasibility tolerance
    #[builder(default = "(1e-8).lit()")]
    pub eps_abs: T,

    ///relative feasibility tolerance
    #[builder(default = "(1e-9).lit()")]
    pub eps_rel: T,

    ///complementarity gap tolerance on μ
    #[builder(default = "(1e-8).lit()")]
    pub dual_tol: T,

    ///lower limit on the regularization parameters ρ, δ
    #[builder(default = "(1e-10).lit()")]
    pub reg_lower_limit: T,

    ///floor the regularization limit drops to when progress stalls
    #[builder(default = "(1e-13).lit()")]
    pub reg_escape_floor: T,

    ///maximum number of iterations
    #[builder(default = "250")]
    pub max_iter: usize,

    ///maximum number of factorization retries per iteration
    #[builder(default = "10")]
    pub max_factor_retires: usize,

    ///number of Ruiz equilibration sweeps at setup
    #[builder(default = "10")]
    pub preconditioner_iter: usize,

    ///fraction-to-boundary step scaling τ
    #[builder(default = "(0.99).lit()")]
    pub tau: T,

    ///verbose printing
    #[builder(default = "false")]
    pub verbose: bool,

    ///measure setup/update/solve times
    #[builder(default = "false")]
    pub compute_timings: bool,
}

impl<T> Default for Settings<T>
where
    T: FloatT,
{
    fn default() -> Settings<T> {
        SettingsBuilder::<T>::default().build().unwrap()
    }
}

impl<T> Settings<T>
where
    T: FloatT,
{
    /// Checks that the settings are valid.
    ///
    /// Called by the solver on entry to `solve`; failure there surfaces as
    /// [`Status::InvalidSettings`](crate::solver::Status::InvalidSettings).
    pub fn verify(&self) -> Result<(), String> {
        fn positive<T: FloatT>(v: T, name: &str) -> Result<(), String> {
            if v > T::zero() {
                Ok(())
            } else {
                Err(format!("{} must be positive", name))
            }
        }

        positive(self.rho_init, "rho_init")?;
        positive(self.delta_init, "delta_init")?;
        positive(self.eps_abs, "eps_abs")?;
        positive(self.eps_rel, "eps_rel")?;
        positive(self.dual_tol, "dual_tol")?;
        positive(self.reg_lower_limit, "reg_lower_limit")?;
        positive(self.reg_escape_floor, "reg_escape_floor")?;

        if self.tau <= T::zero() || self.tau >= T::one() {
            return Err("tau must lie in (0,1)".to_string());
        }
        if self.max_iter == 0 {
            return Err("max_iter must be positive".to_string());
        }

        Ok(())
    }
}

#[test]
fn test_settings_verify() {
    // all standard settings
    assert!(Settings::<f64>::default().verify().is_ok());

    // fail on non-positive tolerance
    let mut settings = Settings::<f64>::default();
    settings.eps_abs = 0.0;
    assert!(settings.verify().is_err());

    // fail on out-of-range tau
    let settings = SettingsBuilder::<f64>::default().tau(1.0).build().unwrap();
    assert!(settings.verify().is_err());
    let settings = SettingsBuilder::<f64>::default().tau(-0.5).build().unwrap();
    assert!(settings.verify().is_err());
}
