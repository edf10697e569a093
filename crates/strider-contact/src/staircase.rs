//! Circular slanted staircase with randomly tilted steps.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strider_core::StaircaseConfig;
use strider_geometry::ProjectionSettings;
use tracing::debug;

use crate::contact::Contact;
use crate::error::ContactError;
use crate::stance::{Stance, StanceLabel, StanceSequence};

/// Random roll, pitch and yaw perturbation in `[-roughness/2, roughness/2]`.
fn roughness_rpy(rng: &mut ChaCha8Rng, roughness: f64, yaw: f64) -> Vector3<f64> {
    let mut jitter = || roughness * rng.gen_range(-0.5..0.5);
    Vector3::new(jitter(), jitter(), jitter() + yaw)
}

/// Generate the stance sequence of a circular slanted staircase.
///
/// Left footholds sit on a circle of radius `radius` at angles
/// `0, step, 2 step, ...` below `2π`; right footholds sit on a circle of
/// radius `1.2 radius`, half a step ahead. The sequence reads
/// `DS-R, SS-R, (DS-L, SS-L, DS-R, SS-R)*, DS-L, SS-L` and closes the loop on
/// the first left foothold. CoM targets are `leg_length` above the stance
/// foot.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn generate_staircase(
    config: &StaircaseConfig,
    settings: &ProjectionSettings,
) -> Result<StanceSequence, ContactError> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let shape = config.contact_shape;
    let up = Vector3::new(0.0, 0.0, config.leg_length);
    let mut init_offset = Some(Vector3::from(config.init_com_offset));

    let nb_steps = (TAU / config.angular_step).ceil() as usize;
    let mut stances = Vec::with_capacity(4 * nb_steps + 2);
    let mut first_left: Option<Arc<Contact>> = None;
    let mut prev_right: Option<Arc<Contact>> = None;

    let foothold = |radius: f64, theta: f64| {
        Vector3::new(
            radius * theta.cos(),
            radius * theta.sin(),
            config.radius + 0.5 * config.height * theta.sin(),
        )
    };

    for k in 0..nb_steps {
        let theta = k as f64 * config.angular_step;
        let yaw = theta + FRAC_PI_2;
        let left = Arc::new(Contact::from_rpy(
            foothold(config.radius, theta),
            roughness_rpy(&mut rng, config.roughness, yaw),
            shape,
            config.friction,
        )?);
        let right = Arc::new(Contact::from_rpy(
            foothold(1.2 * config.radius, theta + 0.5 * config.angular_step),
            roughness_rpy(&mut rng, config.roughness, yaw),
            shape,
            config.friction,
        )?);
        if first_left.is_none() {
            first_left = Some(Arc::clone(&left));
        }

        if let Some(prev_right) = prev_right.take() {
            let com = left.p() + up;
            stances.push(Stance::new(
                StanceLabel::DsL,
                com,
                config.ds_duration,
                Some(Arc::clone(&left)),
                Some(prev_right),
            )?);
            stances.push(Stance::new(
                StanceLabel::SsL,
                com,
                config.ss_duration,
                Some(Arc::clone(&left)),
                None,
            )?);
        }

        let mut com = right.p() + up;
        if let Some(offset) = init_offset.take() {
            com += offset;
        }
        stances.push(Stance::new(
            StanceLabel::DsR,
            com,
            config.ds_duration,
            Some(Arc::clone(&left)),
            Some(Arc::clone(&right)),
        )?);
        stances.push(Stance::new(
            StanceLabel::SsR,
            com,
            config.ss_duration,
            None,
            Some(Arc::clone(&right)),
        )?);
        prev_right = Some(right);
    }

    if let (Some(left), Some(right)) = (first_left, prev_right) {
        let com = left.p() + up;
        stances.push(Stance::new(
            StanceLabel::DsL,
            com,
            config.ds_duration,
            Some(Arc::clone(&left)),
            Some(right),
        )?);
        stances.push(Stance::new(
            StanceLabel::SsL,
            com,
            config.ss_duration,
            Some(left),
            None,
        )?);
    }

    let sequence = StanceSequence::new(stances, settings)?;
    debug!(
        nb_stances = sequence.len(),
        seed = config.seed,
        "generated staircase"
    );
    Ok(sequence)
}
