use glam::DVec3;
use rosette_core::{Container, Result, types::NeuronId};

use crate::settings::TissueSettings;

/// Places `settings.neurons` somata evenly on a ring in the z = 0 plane,
/// each sprouting towards the ring centre.
///
/// A ring of radius zero stacks every soma on the origin; those neurons get
/// no preset axis and pick a random one on first growth.
pub fn build_rosette(container: &mut Container, settings: &TissueSettings) -> Result<Vec<NeuronId>> {
    let mut ids = Vec::with_capacity(settings.neurons);
    for i in 0..settings.neurons {
        let angle = i as f64 * std::f64::consts::TAU / settings.neurons as f64;
        let position = DVec3::new(angle.cos(), angle.sin(), 0.0) * settings.ring_radius;
        let id = container.create_new_neuron(position)?;
        if position != DVec3::ZERO {
            container.set_outgrowth_axis(id, -position)?;
        }
        ids.push(id);
    }
    tracing::info!(
        neurons = ids.len(),
        ring_radius = settings.ring_radius,
        "rosette tissue built"
    );
    Ok(ids)
}
