//! Distance-to-force potentials between pairs of agents.
//!
//! A potential is plain data: a coefficient, a functional form selector and
//! a cutoff offset. The force accumulation loop in [`crate::phases`] only
//! ever calls [`PairPotential::magnitude`], so adding a new shape means
//! adding an enum variant here and nothing else.
//!
//! Sign convention: positive magnitudes push agents apart.

use serde::{Deserialize, Serialize};

use crate::{
    config::{ensure_non_negative, ensure_positive},
    error::Result,
    types::AgentKind,
};

/// Functional form of the short-range repulsion.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum RepulsionForm {
    /// `k (1 - d/R)^(s+1)`
    Smooth { smoothness: f64 },
    /// `k (1 - d/R)`
    Linear,
}

/// Functional form of the longer-range adhesion.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum AdhesionForm {
    /// `k x (1 - x)^(s+1)`, normalized so the peak value is `k`.
    Bell { smoothness: f64 },
    /// `4 k x (1 - x)`, peaking at half the cutoff.
    Parabolic,
}

/// Potential parameters for one agent-type pair.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PairPotential {
    pub repulsion_coefficient: f64,
    pub repulsion: RepulsionForm,
    /// Added to the sum of radii to get the repulsion cutoff.
    pub repulsion_margin: f64,
    pub adhesion_coefficient: f64,
    pub adhesion: AdhesionForm,
    /// Added to the sum of radii to get the adhesion cutoff.
    pub adhesion_reach: f64,
}

impl Default for PairPotential {
    fn default() -> Self {
        Self {
            repulsion_coefficient: 40.0,
            repulsion: RepulsionForm::Smooth { smoothness: 1.0 },
            repulsion_margin: 0.0,
            adhesion_coefficient: 2.0,
            adhesion: AdhesionForm::Bell { smoothness: 1.0 },
            adhesion_reach: 2.0,
        }
    }
}

/// Repulsion magnitude at `distance` for a potential reaching zero at `cutoff`.
pub fn repulsion(form: RepulsionForm, coefficient: f64, distance: f64, cutoff: f64) -> f64 {
    if distance >= cutoff || coefficient == 0.0 {
        return 0.0;
    }
    let overlap = 1.0 - distance.max(0.0) / cutoff;
    match form {
        RepulsionForm::Smooth { smoothness } => coefficient * overlap.powf(smoothness + 1.0),
        RepulsionForm::Linear => coefficient * overlap,
    }
}

/// Adhesion magnitude at `distance` for a potential reaching zero at `cutoff`.
pub fn adhesion(form: AdhesionForm, coefficient: f64, distance: f64, cutoff: f64) -> f64 {
    if coefficient == 0.0 || distance <= 0.0 || distance >= cutoff {
        return 0.0;
    }
    let x = distance / cutoff;
    match form {
        AdhesionForm::Bell { smoothness } => {
            let exponent = smoothness + 1.0;
            let peak = 1.0 / (smoothness + 2.0);
            let norm = peak * (1.0 - peak).powf(exponent);
            coefficient * x * (1.0 - x).powf(exponent) / norm
        }
        AdhesionForm::Parabolic => 4.0 * coefficient * x * (1.0 - x),
    }
}

impl PairPotential {
    pub fn repulsion_cutoff(&self, r1: f64, r2: f64) -> f64 {
        r1 + r2 + self.repulsion_margin
    }

    pub fn adhesion_cutoff(&self, r1: f64, r2: f64) -> f64 {
        r1 + r2 + self.adhesion_reach
    }

    /// Distance beyond which this pair never interacts.
    pub fn cutoff(&self, r1: f64, r2: f64) -> f64 {
        let rep = self.repulsion_cutoff(r1, r2);
        if self.adhesion_coefficient > 0.0 {
            rep.max(self.adhesion_cutoff(r1, r2))
        } else {
            rep
        }
    }

    pub fn repulsion(&self, distance: f64, r1: f64, r2: f64) -> f64 {
        repulsion(
            self.repulsion,
            self.repulsion_coefficient,
            distance,
            self.repulsion_cutoff(r1, r2),
        )
    }

    pub fn adhesion(&self, distance: f64, r1: f64, r2: f64) -> f64 {
        adhesion(
            self.adhesion,
            self.adhesion_coefficient,
            distance,
            self.adhesion_cutoff(r1, r2),
        )
    }

    /// Net scalar force along the line between the pair; positive repels.
    pub fn magnitude(&self, distance: f64, r1: f64, r2: f64) -> f64 {
        self.repulsion(distance, r1, r2) - self.adhesion(distance, r1, r2)
    }

    /// Checks coefficients and that both cutoffs are positive for the given radii.
    pub fn validate(&self, name: &str, r1: f64, r2: f64) -> Result<()> {
        ensure_non_negative(
            &format!("{name}.repulsion_coefficient"),
            self.repulsion_coefficient,
        )?;
        ensure_non_negative(
            &format!("{name}.adhesion_coefficient"),
            self.adhesion_coefficient,
        )?;
        if let RepulsionForm::Smooth { smoothness } = self.repulsion {
            ensure_non_negative(&format!("{name}.repulsion.smoothness"), smoothness)?;
        }
        if let AdhesionForm::Bell { smoothness } = self.adhesion {
            ensure_non_negative(&format!("{name}.adhesion.smoothness"), smoothness)?;
        }
        ensure_positive(
            &format!("{name} repulsion cutoff"),
            self.repulsion_cutoff(r1, r2),
        )?;
        if self.adhesion_coefficient > 0.0 {
            ensure_positive(
                &format!("{name} adhesion cutoff"),
                self.adhesion_cutoff(r1, r2),
            )?;
        }
        Ok(())
    }
}

/// Pair potentials for every combination of agent kinds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Potentials {
    pub cell_cell: PairPotential,
    pub cell_neurite: PairPotential,
    pub neurite_neurite: PairPotential,
}

impl Default for Potentials {
    fn default() -> Self {
        Self {
            cell_cell: PairPotential::default(),
            cell_neurite: PairPotential {
                repulsion_coefficient: 20.0,
                adhesion_coefficient: 1.0,
                ..PairPotential::default()
            },
            neurite_neurite: PairPotential {
                repulsion_coefficient: 10.0,
                adhesion_coefficient: 1.0,
                adhesion_reach: 1.0,
                ..PairPotential::default()
            },
        }
    }
}

impl Potentials {
    /// Parameters for a pair; symmetric in its arguments.
    pub fn for_pair(&self, a: AgentKind, b: AgentKind) -> &PairPotential {
        match (a, b) {
            (AgentKind::Cell, AgentKind::Cell) => &self.cell_cell,
            (AgentKind::Neurite, AgentKind::Neurite) => &self.neurite_neurite,
            _ => &self.cell_neurite,
        }
    }

    /// Largest interaction cutoff over all pairs for the given radii.
    pub fn max_cutoff(&self, cell_radius: f64, neurite_radius: f64) -> f64 {
        self.cell_cell
            .cutoff(cell_radius, cell_radius)
            .max(self.cell_neurite.cutoff(cell_radius, neurite_radius))
            .max(self.neurite_neurite.cutoff(neurite_radius, neurite_radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    #[test]
    fn repulsion_is_strictly_decreasing_and_vanishes_at_cutoff() {
        let form = RepulsionForm::Smooth { smoothness: 1.0 };
        let mut last = repulsion(form, 10.0, 0.0, 2.0);
        assert_eq!(last, 10.0);
        for i in 1..20 {
            let d = i as f64 * 0.1;
            let f = repulsion(form, 10.0, d, 2.0);
            assert!(f < last, "repulsion not decreasing at {d}");
            last = f;
        }
        assert_eq!(repulsion(form, 10.0, 2.0, 2.0), 0.0);
        assert_eq!(repulsion(form, 10.0, 5.0, 2.0), 0.0);
    }

    #[test]
    fn linear_repulsion_is_half_at_half_cutoff() {
        assert_eq!(repulsion(RepulsionForm::Linear, 8.0, 1.0, 2.0), 4.0);
    }

    #[test]
    fn bell_adhesion_rises_then_decays() {
        let form = AdhesionForm::Bell { smoothness: 1.0 };
        assert_eq!(adhesion(form, 3.0, 0.0, 6.0), 0.0);
        assert_eq!(adhesion(form, 3.0, 6.0, 6.0), 0.0);

        // Peak sits at x = 1 / (s + 2) and equals the coefficient.
        let peak = adhesion(form, 3.0, 2.0, 6.0);
        assert!((peak - 3.0).abs() < 1e-12);
        assert!(adhesion(form, 3.0, 1.0, 6.0) < peak);
        assert!(adhesion(form, 3.0, 4.0, 6.0) < peak);
    }

    #[test]
    fn parabolic_adhesion_peaks_at_half_cutoff() {
        let f = adhesion(AdhesionForm::Parabolic, 2.0, 1.0, 2.0);
        assert_eq!(f, 2.0);
    }

    #[test]
    fn magnitude_combines_repulsion_and_adhesion() {
        let p = PairPotential::default();
        // Deep overlap: repulsion dominates.
        assert!(p.magnitude(0.5, 1.0, 1.0) > 0.0);
        // Just past contact but inside adhesion reach: net attraction.
        assert!(p.magnitude(2.5, 1.0, 1.0) < 0.0);
        // Beyond both cutoffs.
        assert_eq!(p.magnitude(10.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn cutoff_ignores_adhesion_when_disabled() {
        let p = PairPotential {
            adhesion_coefficient: 0.0,
            adhesion_reach: 100.0,
            ..PairPotential::default()
        };
        assert_eq!(p.cutoff(1.0, 1.0), 2.0);
    }

    #[test]
    fn for_pair_is_symmetric() {
        let p = Potentials::default();
        assert_eq!(
            p.for_pair(AgentKind::Cell, AgentKind::Neurite),
            p.for_pair(AgentKind::Neurite, AgentKind::Cell)
        );
    }

    #[test]
    fn validate_rejects_non_positive_cutoff() {
        let p = PairPotential {
            repulsion_margin: -3.0,
            ..PairPotential::default()
        };
        assert!(matches!(
            p.validate("cell_cell", 1.0, 1.0),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn validate_rejects_negative_coefficient() {
        let p = PairPotential {
            adhesion_coefficient: -1.0,
            ..PairPotential::default()
        };
        assert!(p.validate("cell_cell", 1.0, 1.0).is_err());
    }
}
