//! JSON import and export of stance sequences.

use std::path::Path;
use std::sync::Arc;

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use strider_geometry::ProjectionSettings;

use crate::contact::Contact;
use crate::error::ContactError;
use crate::stance::{Stance, StanceLabel, StanceSequence};

/// Serialized contact. The orientation is a unit quaternion `[w, x, y, z]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub pos: [f64; 3],
    pub quat: [f64; 4],
    pub shape: [f64; 2],
    pub friction: f64,
}

/// Serialized stance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StanceRecord {
    pub label: StanceLabel,
    pub com: [f64; 3],
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_foot: Option<ContactRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_foot: Option<ContactRecord>,
}

/// Top-level stance file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StanceFile {
    pub stances: Vec<StanceRecord>,
}

impl From<&Contact> for ContactRecord {
    fn from(contact: &Contact) -> Self {
        let q = contact.pose().rotation.quaternion();
        let p = contact.p();
        Self {
            pos: [p.x, p.y, p.z],
            quat: [q.w, q.i, q.j, q.k],
            shape: contact.shape(),
            friction: contact.friction(),
        }
    }
}

impl TryFrom<&ContactRecord> for Contact {
    type Error = ContactError;

    fn try_from(record: &ContactRecord) -> Result<Self, Self::Error> {
        let [w, x, y, z] = record.quat;
        let q = Quaternion::new(w, x, y, z);
        let norm = q.norm();
        if !(norm.is_finite() && norm > 1e-9) {
            return Err(ContactError::InvalidPose(format!(
                "quaternion {:?} cannot be normalized",
                record.quat
            )));
        }
        let pose = Isometry3::from_parts(
            Translation3::from(Vector3::from(record.pos)),
            UnitQuaternion::from_quaternion(q),
        );
        Self::new(pose, record.shape, record.friction)
    }
}

impl From<&Stance> for StanceRecord {
    fn from(stance: &Stance) -> Self {
        let com = stance.com();
        Self {
            label: stance.label(),
            com: [com.x, com.y, com.z],
            duration: stance.duration(),
            left_foot: stance.left_foot().map(|c| ContactRecord::from(c.as_ref())),
            right_foot: stance.right_foot().map(|c| ContactRecord::from(c.as_ref())),
        }
    }
}

impl TryFrom<&StanceRecord> for Stance {
    type Error = ContactError;

    fn try_from(record: &StanceRecord) -> Result<Self, Self::Error> {
        let contact = |r: &Option<ContactRecord>| -> Result<Option<Arc<Contact>>, ContactError> {
            r.as_ref()
                .map(|c| Contact::try_from(c).map(Arc::new))
                .transpose()
        };
        Self::new(
            record.label,
            Vector3::from(record.com),
            record.duration,
            contact(&record.left_foot)?,
            contact(&record.right_foot)?,
        )
    }
}

impl StanceSequence {
    pub fn to_file(&self) -> StanceFile {
        StanceFile {
            stances: self.iter().map(|s| StanceRecord::from(s.as_ref())).collect(),
        }
    }

    /// Build and validate a sequence from its serialized form.
    pub fn from_file(file: &StanceFile, settings: &ProjectionSettings) -> Result<Self, ContactError> {
        let stances = file
            .stances
            .iter()
            .map(Stance::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(stances, settings)
    }

    pub fn to_json(&self) -> Result<String, ContactError> {
        Ok(serde_json::to_string_pretty(&self.to_file())?)
    }

    pub fn from_json(json: &str, settings: &ProjectionSettings) -> Result<Self, ContactError> {
        let file: StanceFile = serde_json::from_str(json)?;
        Self::from_file(&file, settings)
    }

    /// Write the sequence as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ContactError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| ContactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and validate a sequence from a JSON file.
    pub fn load(path: impl AsRef<Path>, settings: &ProjectionSettings) -> Result<Self, ContactError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ContactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_record(y: f64) -> ContactRecord {
        ContactRecord {
            pos: [0.0, y, 0.0],
            quat: [1.0, 0.0, 0.0, 0.0],
            shape: [0.1, 0.05],
            friction: 0.7,
        }
    }

    #[test]
    fn parses_hand_written_file() {
        let json = r#"{
            "stances": [
                {
                    "label": "DS-L",
                    "com": [0.0, 0.0, 0.9],
                    "duration": 0.7,
                    "left_foot": {"pos": [0.0, 0.1, 0.0], "quat": [1, 0, 0, 0], "shape": [0.1, 0.05], "friction": 0.7},
                    "right_foot": {"pos": [0.0, -0.1, 0.0], "quat": [1, 0, 0, 0], "shape": [0.1, 0.05], "friction": 0.7}
                },
                {
                    "label": "SS-L",
                    "com": [0.0, 0.1, 0.9],
                    "duration": 1.0,
                    "left_foot": {"pos": [0.0, 0.1, 0.0], "quat": [1, 0, 0, 0], "shape": [0.1, 0.05], "friction": 0.7}
                }
            ]
        }"#;
        let seq = StanceSequence::from_json(json, &ProjectionSettings::default()).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].label(), StanceLabel::DsL);
        assert!(seq[1].right_foot().is_none());
        assert!(seq[1].sep().is_some());
    }

    #[test]
    fn export_then_import_preserves_poses() {
        let record = StanceRecord {
            label: StanceLabel::DsR,
            com: [0.0, 0.0, 0.9],
            duration: 0.7,
            left_foot: Some(ContactRecord {
                quat: [0.9, 0.1, 0.0, 0.2],
                ..flat_record(0.1)
            }),
            right_foot: Some(flat_record(-0.1)),
        };
        let file = StanceFile {
            stances: vec![record],
        };
        let seq = StanceSequence::from_file(&file, &ProjectionSettings::default()).unwrap();
        let json = seq.to_json().unwrap();
        let back = StanceSequence::from_json(&json, &ProjectionSettings::default()).unwrap();
        let (a, b) = (seq[0].left_foot().unwrap(), back[0].left_foot().unwrap());
        assert_relative_eq!(a.p(), b.p(), epsilon = 1e-12);
        assert_relative_eq!(a.n(), b.n(), epsilon = 1e-12);
        assert!(json.contains("\"DS-R\""));
    }

    #[test]
    fn invalid_records_are_rejected() {
        let missing_right = StanceFile {
            stances: vec![StanceRecord {
                label: StanceLabel::DsL,
                com: [0.0, 0.0, 0.9],
                duration: 0.7,
                left_foot: Some(flat_record(0.1)),
                right_foot: None,
            }],
        };
        assert!(matches!(
            StanceSequence::from_file(&missing_right, &ProjectionSettings::default()),
            Err(ContactError::MissingContact { .. })
        ));

        let zero_quat = StanceRecord {
            label: StanceLabel::SsL,
            com: [0.0, 0.0, 0.9],
            duration: 1.0,
            left_foot: Some(ContactRecord {
                quat: [0.0; 4],
                ..flat_record(0.0)
            }),
            right_foot: None,
        };
        assert!(matches!(
            Stance::try_from(&zero_quat),
            Err(ContactError::InvalidPose(_))
        ));

        assert!(matches!(
            StanceSequence::from_json("{\"stances\": []}", &ProjectionSettings::default()),
            Err(ContactError::EmptySequence)
        ));
        assert!(matches!(
            StanceSequence::from_json("{", &ProjectionSettings::default()),
            Err(ContactError::Json(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = StanceSequence::load("/nonexistent/stances.json", &ProjectionSettings::default())
            .unwrap_err();
        assert!(matches!(err, ContactError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/stances.json"));
    }
}
