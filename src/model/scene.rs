use glam::{Mat4, Quat, Vec3};

use crate::model::asset::AssetSlot;
use crate::utils::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// The fixed machine the player walks up to.
    Machine,
    /// The hidden object revealed at the anchor.
    Gift,
}

impl ModelKind {
    pub fn label(self) -> &'static str {
        match self {
            ModelKind::Machine => "machine",
            ModelKind::Gift => "gift",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shading {
    /// Hemisphere + ambient lighting with a flat emissive lift.
    Lit { emissive: f32 },
    /// Vertex colour only.
    Unlit,
}

/// Geometry of one model file, flattened into a single mesh in model space.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    pub mesh: Mesh,
    pub shading: Shading,
}

impl LoadedModel {
    /// Offset from the model origin to its bounding-box centre.
    pub fn pivot_offset(&self) -> Vec3 {
        self.mesh.bounds().map(|b| b.center()).unwrap_or(Vec3::ZERO)
    }
}

#[derive(Debug, Clone)]
pub struct SceneModel {
    pub model: LoadedModel,
    pub position: Vec3,
    pub scale: f32,
    pub visible: bool,
}

impl SceneModel {
    fn new(model: LoadedModel, visible: bool) -> Self {
        Self { model, position: Vec3::ZERO, scale: 1.0, visible }
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), Quat::IDENTITY, self.position)
    }
}

/// Everything that is drawn: the two models (once loaded), the reveal anchor
/// and the optional debug marker.
pub struct Scene {
    anchor: Vec3,
    machine_slot: AssetSlot<LoadedModel>,
    gift_slot: AssetSlot<LoadedModel>,
    machine: Option<SceneModel>,
    gift: Option<SceneModel>,
    gift_pivot_offset: Vec3,
    marker: Option<Vec3>,
}

impl Scene {
    pub fn new(anchor: Vec3) -> Self {
        Self {
            anchor,
            machine_slot: AssetSlot::new(ModelKind::Machine.label()),
            gift_slot: AssetSlot::new(ModelKind::Gift.label()),
            machine: None,
            gift: None,
            gift_pivot_offset: Vec3::ZERO,
            marker: None,
        }
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Handle for the loader that will fill in `kind`.
    pub fn slot(&self, kind: ModelKind) -> AssetSlot<LoadedModel> {
        match kind {
            ModelKind::Machine => self.machine_slot.clone(),
            ModelKind::Gift => self.gift_slot.clone(),
        }
    }

    /// Install any models whose loads finished since the last poll.
    pub fn poll_assets(&mut self) -> Vec<ModelKind> {
        let mut installed = Vec::new();
        for kind in [ModelKind::Machine, ModelKind::Gift] {
            if let Some(model) = self.slot(kind).take_ready() {
                self.install(kind, model);
                installed.push(kind);
            }
        }
        installed
    }

    pub fn install(&mut self, kind: ModelKind, model: LoadedModel) {
        match kind {
            ModelKind::Machine => {
                tracing::info!(
                    name = %model.name,
                    vertices = model.mesh.vertices.len(),
                    size = ?model.mesh.bounds().map(|b| b.size()),
                    "machine ready"
                );
                self.machine = Some(SceneModel::new(model, true));
            }
            ModelKind::Gift => {
                self.gift_pivot_offset = model.pivot_offset();
                tracing::info!(
                    name = %model.name,
                    pivot = ?self.gift_pivot_offset,
                    "gift ready (hidden)"
                );
                self.gift = Some(SceneModel::new(model, false));
            }
        }
    }

    pub fn is_ready(&self, kind: ModelKind) -> bool {
        self.model(kind).is_some()
    }

    pub fn model(&self, kind: ModelKind) -> Option<&SceneModel> {
        match kind {
            ModelKind::Machine => self.machine.as_ref(),
            ModelKind::Gift => self.gift.as_ref(),
        }
    }

    pub fn gift_pivot_offset(&self) -> Option<Vec3> {
        self.gift.as_ref().map(|_| self.gift_pivot_offset)
    }

    /// Make the gift visible at `scale` with its visual centre on the anchor.
    /// Returns false if the gift has not loaded.
    pub fn show_gift_at_anchor(&mut self, scale: f32) -> bool {
        let anchor = self.anchor;
        let pivot = self.gift_pivot_offset;
        match self.gift.as_mut() {
            Some(gift) => {
                gift.visible = true;
                gift.scale = scale;
                gift.position = anchor - pivot;
                true
            }
            None => false,
        }
    }

    pub fn set_gift_scale(&mut self, scale: f32) {
        if let Some(gift) = self.gift.as_mut() {
            gift.scale = scale;
        }
    }

    /// World position of the gift's visual centre.
    pub fn gift_visual_center(&self) -> Option<Vec3> {
        self.gift.as_ref().map(|g| g.position + self.gift_pivot_offset)
    }

    pub fn place_marker(&mut self, position: Vec3) -> Option<Vec3> {
        self.marker.replace(position)
    }

    /// Remove the marker, returning where it was.
    pub fn clear_marker(&mut self) -> Option<Vec3> {
        self.marker.take()
    }

    pub fn marker(&self) -> Option<Vec3> {
        self.marker
    }

    /// Nearest point where the ray meets a visible model. The marker itself is
    /// never hit.
    pub fn nearest_hit(&self, origin: Vec3, dir: Vec3) -> Option<Vec3> {
        let dir = dir.try_normalize()?;
        [self.machine.as_ref(), self.gift.as_ref()]
            .into_iter()
            .flatten()
            .filter(|m| m.visible)
            .filter_map(|m| m.model.mesh.ray_hit(&m.transform(), origin, dir))
            .min_by(|a, b| a.total_cmp(b))
            .map(|t| origin + dir * t)
    }
}
