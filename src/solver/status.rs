#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Exit status of the solver.
///
/// The discriminants are fixed so that the numeric codes agree with
/// downstream language interfaces.
#[repr(i32)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Status {
    /// Solver terminated with a solution satisfying the tolerances
    Solved = 1,
    /// Iteration limit reached; the last iterate is available
    MaxIterReached = -1,
    /// Problem detected primal infeasible
    PrimalInfeasible = -2,
    /// Problem detected dual infeasible
    DualInfeasible = -3,
    /// KKT factorization failed beyond the retry budget
    Numerics = -8,
    /// Settings rejected by validation at solve entry
    InvalidSettings = -9,
    /// Solve has not (successfully) run
    #[default]
    Unsolved = -10,
}

impl Status {
    /// The fixed interop code for this status.
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let msg = match self {
            Status::Solved => "solved",
            Status::MaxIterReached => "maximum iterations reached",
            Status::PrimalInfeasible => "primal infeasible",
            Status::DualInfeasible => "dual infeasible",
            Status::Numerics => "numerical error",
            Status::InvalidSettings => "invalid settings",
            Status::Unsolved => "unsolved",
        };
        write!(f, "{}", msg)
    }
}

#[test]
fn test_status_codes() {
    assert_eq!(Status::Solved.code(), 1);
    assert_eq!(Status::MaxIterReached.code(), -1);
    assert_eq!(Status::PrimalInfeasible.code(), -2);
    assert_eq!(Status::DualInfeasible.code(), -3);
    assert_eq!(Status::Numerics.code(), -8);
    assert_eq!(Status::InvalidSettings.code(), -9);
    assert_eq!(Status::Unsolved.code(), -10);
    assert_eq!(Status::default(), Status::Unsolved);
}
