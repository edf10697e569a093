//! Stances: sets of foot contacts with a CoM target and a duration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use strider_geometry::{Polygon, ProjectionSettings};
use tracing::trace;

use crate::cone::{self, Generator};
use crate::contact::Contact;
use crate::error::ContactError;

// ---------------------------------------------------------------------------
// StanceLabel / FootSlot
// ---------------------------------------------------------------------------

/// Foot contact slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FootSlot {
    Left,
    Right,
}

impl FootSlot {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for FootSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Walking phase of a stance.
///
/// The trailing letter names the stance foot: in `DS-L` both feet are in
/// contact and the left one carries the next single-support phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StanceLabel {
    DsL,
    DsR,
    SsL,
    SsR,
}

impl StanceLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DsL => "DS-L",
            Self::DsR => "DS-R",
            Self::SsL => "SS-L",
            Self::SsR => "SS-R",
        }
    }

    pub const fn is_double_support(self) -> bool {
        matches!(self, Self::DsL | Self::DsR)
    }

    pub const fn is_single_support(self) -> bool {
        !self.is_double_support()
    }

    /// Slot of the stance foot.
    pub const fn stance_side(self) -> FootSlot {
        match self {
            Self::DsL | Self::SsL => FootSlot::Left,
            Self::DsR | Self::SsR => FootSlot::Right,
        }
    }
}

impl fmt::Display for StanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StanceLabel {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DS-L" => Ok(Self::DsL),
            "DS-R" => Ok(Self::DsR),
            "SS-L" => Ok(Self::SsL),
            "SS-R" => Ok(Self::SsR),
            other => Err(ContactError::UnknownLabel(other.to_owned())),
        }
    }
}

impl TryFrom<String> for StanceLabel {
    type Error = ContactError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<StanceLabel> for String {
    fn from(label: StanceLabel) -> Self {
        label.as_str().to_owned()
    }
}

// ---------------------------------------------------------------------------
// Stance
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Support {
    Double {
        left: Arc<Contact>,
        right: Arc<Contact>,
    },
    Single {
        slot: FootSlot,
        foot: Arc<Contact>,
    },
}

/// One phase of a walking gait.
///
/// The contact slots always match the label: both feet in double support,
/// only the stance foot in single support.
#[derive(Clone, Debug)]
pub struct Stance {
    label: StanceLabel,
    com: Vector3<f64>,
    duration: f64,
    support: Support,
    sep: Option<Polygon>,
}

impl Stance {
    /// Build a stance, checking that the contacts match the label.
    pub fn new(
        label: StanceLabel,
        com: Vector3<f64>,
        duration: f64,
        left_foot: Option<Arc<Contact>>,
        right_foot: Option<Arc<Contact>>,
    ) -> Result<Self, ContactError> {
        if !(duration > 0.0 && duration.is_finite()) {
            return Err(ContactError::InvalidDuration(duration));
        }
        if com.iter().any(|c| !c.is_finite()) {
            return Err(ContactError::InvalidCom);
        }
        let missing = |slot| ContactError::MissingContact { label, slot };
        let unexpected = |slot| ContactError::UnexpectedContact { label, slot };
        let support = match (label, left_foot, right_foot) {
            (StanceLabel::DsL | StanceLabel::DsR, Some(left), Some(right)) => {
                Support::Double { left, right }
            }
            (StanceLabel::DsL | StanceLabel::DsR, None, _) => return Err(missing(FootSlot::Left)),
            (StanceLabel::DsL | StanceLabel::DsR, _, None) => {
                return Err(missing(FootSlot::Right));
            }
            (StanceLabel::SsL, Some(foot), None) => Support::Single {
                slot: FootSlot::Left,
                foot,
            },
            (StanceLabel::SsR, None, Some(foot)) => Support::Single {
                slot: FootSlot::Right,
                foot,
            },
            (StanceLabel::SsL, None, _) => return Err(missing(FootSlot::Left)),
            (StanceLabel::SsL, Some(_), Some(_)) => return Err(unexpected(FootSlot::Right)),
            (StanceLabel::SsR, _, None) => return Err(missing(FootSlot::Right)),
            (StanceLabel::SsR, Some(_), Some(_)) => return Err(unexpected(FootSlot::Left)),
        };
        Ok(Self {
            label,
            com,
            duration,
            support,
            sep: None,
        })
    }

    pub const fn label(&self) -> StanceLabel {
        self.label
    }

    /// CoM reference position of the stance.
    pub const fn com(&self) -> &Vector3<f64> {
        &self.com
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_double_support(&self) -> bool {
        self.label.is_double_support()
    }

    pub fn is_single_support(&self) -> bool {
        self.label.is_single_support()
    }

    pub fn foot(&self, slot: FootSlot) -> Option<&Arc<Contact>> {
        match (&self.support, slot) {
            (Support::Double { left, .. }, FootSlot::Left) => Some(left),
            (Support::Double { right, .. }, FootSlot::Right) => Some(right),
            (Support::Single { slot: s, foot }, _) if *s == slot => Some(foot),
            (Support::Single { .. }, _) => None,
        }
    }

    pub fn left_foot(&self) -> Option<&Arc<Contact>> {
        self.foot(FootSlot::Left)
    }

    pub fn right_foot(&self) -> Option<&Arc<Contact>> {
        self.foot(FootSlot::Right)
    }

    /// Contact of the foot named by the label suffix.
    pub fn stance_foot(&self) -> &Contact {
        match &self.support {
            Support::Double { left, right } => match self.label.stance_side() {
                FootSlot::Left => left.as_ref(),
                FootSlot::Right => right.as_ref(),
            },
            Support::Single { foot, .. } => foot.as_ref(),
        }
    }

    /// Active contacts, left before right.
    pub fn contacts(&self) -> Vec<&Contact> {
        match &self.support {
            Support::Double { left, right } => vec![left.as_ref(), right.as_ref()],
            Support::Single { foot, .. } => vec![foot.as_ref()],
        }
    }

    /// Force generators of all active contacts.
    pub fn force_generators(&self) -> Vec<Generator> {
        self.contacts()
            .into_iter()
            .flat_map(Contact::force_generators)
            .collect()
    }

    /// Compute and cache the static-equilibrium polygon.
    pub fn compute_static_equilibrium_polygon(
        &mut self,
        settings: &ProjectionSettings,
    ) -> Result<&Polygon, ContactError> {
        let sep = cone::static_equilibrium_polygon(&self.force_generators(), settings)?;
        trace!(label = %self.label, n_vertices = sep.len(), "static-equilibrium polygon");
        let sep = self.sep.insert(sep);
        Ok(&*sep)
    }

    /// Cached static-equilibrium polygon, if computed.
    pub const fn sep(&self) -> Option<&Polygon> {
        self.sep.as_ref()
    }

    /// Signed distance from the horizontal projection of `com` to the edge
    /// of the static-equilibrium polygon, positive inside.
    pub fn dist_to_sep_edge(&self, com: &Vector3<f64>) -> Option<f64> {
        self.sep
            .as_ref()
            .map(|sep| sep.signed_distance(&Vector2::new(com.x, com.y)))
    }

    /// Reduced pendular acceleration cone over a set of CoM positions.
    pub fn compute_reduced_pendular_cone(
        &self,
        com_vertices: &[Vector3<f64>],
        settings: &ProjectionSettings,
    ) -> Result<Polygon, ContactError> {
        Ok(cone::reduced_pendular_cone(
            &self.force_generators(),
            com_vertices,
            settings,
        )?)
    }

    /// Pendular acceleration cone over a set of CoM positions, as 3D
    /// vertices: apex at gravity, section at `z̈ = g`.
    pub fn compute_pendular_accel_cone(
        &self,
        com_vertices: &[Vector3<f64>],
        gravity: f64,
        settings: &ProjectionSettings,
    ) -> Result<Vec<Vector3<f64>>, ContactError> {
        let reduced = self.compute_reduced_pendular_cone(com_vertices, settings)?;
        Ok(cone::expand_reduced_pendular_cone(&reduced, gravity, None))
    }
}

// ---------------------------------------------------------------------------
// StanceSequence
// ---------------------------------------------------------------------------

/// Non-empty sequence of stances with their static-equilibrium polygons.
#[derive(Clone, Debug)]
pub struct StanceSequence {
    stances: Vec<Arc<Stance>>,
}

impl StanceSequence {
    /// Validate the sequence and compute every missing static-equilibrium
    /// polygon.
    pub fn new(stances: Vec<Stance>, settings: &ProjectionSettings) -> Result<Self, ContactError> {
        if stances.is_empty() {
            return Err(ContactError::EmptySequence);
        }
        let stances = stances
            .into_iter()
            .enumerate()
            .map(|(index, mut stance)| -> Result<Arc<Stance>, ContactError> {
                if stance.sep.is_none() {
                    let label = stance.label;
                    stance
                        .compute_static_equilibrium_polygon(settings)
                        .map_err(|err| match err {
                            ContactError::Geometry(source) => ContactError::Support {
                                index,
                                label,
                                source,
                            },
                            other => other,
                        })?;
                }
                Ok(Arc::new(stance))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { stances })
    }

    pub fn len(&self) -> usize {
        self.stances.len()
    }

    /// Always false: sequences are validated non-empty.
    pub fn is_empty(&self) -> bool {
        self.stances.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Stance>> {
        self.stances.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Stance>> {
        self.stances.iter()
    }

    pub fn as_slice(&self) -> &[Arc<Stance>] {
        &self.stances
    }

    /// Total duration of one pass over the sequence.
    pub fn total_duration(&self) -> f64 {
        self.stances.iter().map(|s| s.duration()).sum()
    }
}

impl std::ops::Index<usize> for StanceSequence {
    type Output = Arc<Stance>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.stances[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn foot(x: f64, y: f64) -> Arc<Contact> {
        Arc::new(
            Contact::from_rpy(Vector3::new(x, y, 0.0), Vector3::zeros(), [0.1, 0.05], 0.7).unwrap(),
        )
    }

    #[test]
    fn labels_parse_and_print() {
        for label in [
            StanceLabel::DsL,
            StanceLabel::DsR,
            StanceLabel::SsL,
            StanceLabel::SsR,
        ] {
            assert_eq!(label.as_str().parse::<StanceLabel>().unwrap(), label);
        }
        assert!("DS-X".parse::<StanceLabel>().is_err());
        assert!(StanceLabel::DsR.is_double_support());
        assert!(StanceLabel::SsR.is_single_support());
        assert_eq!(StanceLabel::DsL.stance_side(), FootSlot::Left);
        assert_eq!(StanceLabel::SsR.stance_side(), FootSlot::Right);
    }

    #[test]
    fn label_serde_uses_phase_names() {
        let json = serde_json::to_string(&StanceLabel::SsL).unwrap();
        assert_eq!(json, "\"SS-L\"");
        let label: StanceLabel = serde_json::from_str("\"DS-R\"").unwrap();
        assert_eq!(label, StanceLabel::DsR);
        assert!(serde_json::from_str::<StanceLabel>("\"XX\"").is_err());
    }

    #[test]
    fn contacts_must_match_label() {
        let com = Vector3::new(0.0, 0.0, 1.0);
        let (l, r) = (foot(0.0, 0.1), foot(0.0, -0.1));
        assert!(Stance::new(StanceLabel::DsL, com, 0.7, Some(l.clone()), Some(r.clone())).is_ok());
        assert!(matches!(
            Stance::new(StanceLabel::DsR, com, 0.7, Some(l.clone()), None),
            Err(ContactError::MissingContact {
                slot: FootSlot::Right,
                ..
            })
        ));
        assert!(matches!(
            Stance::new(StanceLabel::SsL, com, 1.0, Some(l.clone()), Some(r.clone())),
            Err(ContactError::UnexpectedContact {
                slot: FootSlot::Right,
                ..
            })
        ));
        assert!(matches!(
            Stance::new(StanceLabel::SsR, com, 1.0, Some(l), None),
            Err(ContactError::MissingContact {
                slot: FootSlot::Right,
                ..
            })
        ));
        assert!(matches!(
            Stance::new(StanceLabel::SsR, com, 0.0, None, Some(r)),
            Err(ContactError::InvalidDuration(_))
        ));
    }

    #[test]
    fn stance_foot_follows_label_suffix() {
        let com = Vector3::new(0.0, 0.0, 1.0);
        let (l, r) = (foot(0.0, 0.1), foot(0.0, -0.1));
        let ds = Stance::new(StanceLabel::DsR, com, 0.7, Some(l.clone()), Some(r)).unwrap();
        assert_relative_eq!(ds.stance_foot().p().y, -0.1);
        assert_eq!(ds.contacts().len(), 2);
        assert_eq!(ds.force_generators().len(), 32);
        let ss = Stance::new(StanceLabel::SsL, com, 1.0, Some(l), None).unwrap();
        assert_relative_eq!(ss.stance_foot().p().y, 0.1);
        assert!(ss.right_foot().is_none());
    }

    #[test]
    fn double_support_sep_spans_both_feet() {
        let com = Vector3::new(0.0, 0.0, 0.9);
        let mut ds = Stance::new(
            StanceLabel::DsL,
            com,
            0.7,
            Some(foot(0.0, 0.1)),
            Some(foot(0.0, -0.1)),
        )
        .unwrap();
        assert!(ds.dist_to_sep_edge(&com).is_none());
        let sep = ds
            .compute_static_equilibrium_polygon(&ProjectionSettings::default())
            .unwrap();
        let (min, max) = sep.bounds();
        assert_relative_eq!(min, Vector2::new(-0.1, -0.15), epsilon = 1e-5);
        assert_relative_eq!(max, Vector2::new(0.1, 0.15), epsilon = 1e-5);
        assert_relative_eq!(ds.dist_to_sep_edge(&com).unwrap(), 0.1, epsilon = 1e-5);
        assert!(ds.dist_to_sep_edge(&Vector3::new(0.3, 0.0, 0.9)).unwrap() < -0.19);
    }

    #[test]
    fn sequence_computes_support_polygons() {
        let com = Vector3::new(0.0, 0.0, 1.0);
        let ss = Stance::new(StanceLabel::SsL, com, 1.0, Some(foot(0.0, 0.0)), None).unwrap();
        let seq = StanceSequence::new(vec![ss.clone(), ss], &ProjectionSettings::default()).unwrap();
        assert_eq!(seq.len(), 2);
        assert!(!seq.is_empty());
        assert!(seq.iter().all(|s| s.sep().is_some()));
        assert_relative_eq!(seq.total_duration(), 2.0);
        assert_eq!(seq[1].label(), StanceLabel::SsL);
        assert!(matches!(
            StanceSequence::new(Vec::new(), &ProjectionSettings::default()),
            Err(ContactError::EmptySequence)
        ));
    }
}
