//! glTF model loading.
//!
//! Parsing is platform independent. The native build reads files on a loader
//! thread and hands results back over a channel; the web build fetches with a
//! spawned future. Both settle the scene's readiness slots, and only the frame
//! thread installs the result.

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

use crate::config::SceneConfig;
use crate::error::ViewerError;
use crate::model::{LoadedModel, ModelKind, Shading};
use crate::utils::{Mesh, Vertex};

/// How a model file is turned into scene geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOptions {
    pub shading: Shading,
    /// Drop the translation of every mesh node so the geometry sits around
    /// the model origin.
    pub reset_mesh_translation: bool,
}

impl ModelOptions {
    pub fn for_kind(kind: ModelKind, config: &SceneConfig) -> Self {
        match kind {
            ModelKind::Machine => Self {
                shading: Shading::Lit { emissive: config.machine_emissive },
                reset_mesh_translation: false,
            },
            ModelKind::Gift => Self { shading: Shading::Unlit, reset_mesh_translation: true },
        }
    }
}

pub fn model_path(kind: ModelKind, config: &SceneConfig) -> &str {
    match kind {
        ModelKind::Machine => &config.machine_path,
        ModelKind::Gift => &config.gift_path,
    }
}

/// Parse a binary or embedded glTF into a single flattened mesh.
pub fn parse_model(name: &str, bytes: &[u8], options: ModelOptions) -> Result<LoadedModel, ViewerError> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;

    let mut mesh = Mesh::empty();
    let scene = document.default_scene().or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                process_node(&node, &buffers, Mat4::IDENTITY, options, &mut mesh)?;
            }
        }
        None => {
            for node in document.nodes() {
                process_node(&node, &buffers, Mat4::IDENTITY, options, &mut mesh)?;
            }
        }
    }

    if mesh.is_empty() {
        return Err(ViewerError::EmptyModel(name.to_string()));
    }

    tracing::debug!(
        name,
        vertices = mesh.vertices.len(),
        triangles = mesh.indices.len() / 3,
        "parsed model"
    );

    Ok(LoadedModel { name: name.to_string(), mesh, shading: options.shading })
}

fn node_matrix(node: &gltf::Node, options: ModelOptions) -> Mat4 {
    let (translation, rotation, scale) = node.transform().decomposed();
    let translation = if options.reset_mesh_translation && node.mesh().is_some() {
        tracing::debug!(
            node = node.name().unwrap_or("unnamed"),
            offset = ?translation,
            "mesh node translation reset"
        );
        Vec3::ZERO
    } else {
        Vec3::from_array(translation)
    };
    Mat4::from_scale_rotation_translation(Vec3::from_array(scale), Quat::from_array(rotation), translation)
}

/// Process a glTF node and its children recursively.
fn process_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    parent: Mat4,
    options: ModelOptions,
    out: &mut Mesh,
) -> Result<(), ViewerError> {
    let world = parent * node_matrix(node, options);

    if let Some(mesh) = node.mesh() {
        let name = mesh.name().unwrap_or("unnamed");
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                tracing::debug!(mesh = name, mode = ?primitive.mode(), "skipping non-triangle primitive");
                continue;
            }
            out.append(extract_primitive(&primitive, buffers, world, name)?);
        }
    }

    for child in node.children() {
        process_node(&child, buffers, world, options, out)?;
    }

    Ok(())
}

fn extract_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    world: Mat4,
    mesh_name: &str,
) -> Result<Mesh, ViewerError> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<Vec3> = reader
        .read_positions()
        .ok_or_else(|| ViewerError::MissingPositions(mesh_name.to_string()))?
        .map(Vec3::from_array)
        .collect();

    let normals: Vec<Vec3> = reader
        .read_normals()
        .map(|iter| iter.map(Vec3::from_array).collect())
        .unwrap_or_else(|| vec![Vec3::Y; positions.len()]);

    let colors: Option<Vec<[f32; 4]>> = reader.read_colors(0).map(|c| c.into_rgba_f32().collect());

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let base = Vec4::from_array(primitive.material().pbr_metallic_roughness().base_color_factor());
    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let normal = normals.get(i).copied().unwrap_or(Vec3::Y);
            let vertex_color = colors
                .as_ref()
                .and_then(|c| c.get(i))
                .map(|c| Vec4::from_array(*c))
                .unwrap_or(Vec4::ONE);
            Vertex {
                pos: world.transform_point3(*p).to_array(),
                normal: (normal_matrix * normal).try_normalize().unwrap_or(Vec3::Y).to_array(),
                color: (base * vertex_color).to_array(),
            }
        })
        .collect::<Vec<_>>();

    let count = vertices.len() as u32;
    // drop whole triangles that point past the vertex list
    let indices = indices
        .chunks_exact(3)
        .filter(|tri| tri.iter().all(|&i| i < count))
        .flatten()
        .copied()
        .collect::<Vec<_>>();

    Ok(Mesh { vertices, indices })
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use std::sync::mpsc::{self, Receiver};

    use super::*;

    pub type LoadResult = (ModelKind, Result<LoadedModel, ViewerError>);

    fn load_file(kind: ModelKind, config: &SceneConfig) -> Result<LoadedModel, ViewerError> {
        let path = model_path(kind, config);
        let bytes = std::fs::read(path)?;
        parse_model(path, &bytes, ModelOptions::for_kind(kind, config))
    }

    /// Load both models on a background thread. Results arrive on the
    /// returned channel in completion order.
    pub fn spawn_loads(config: &SceneConfig) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();
        let config = config.clone();
        std::thread::spawn(move || {
            for kind in [ModelKind::Machine, ModelKind::Gift] {
                let result = load_file(kind, &config);
                if tx.send((kind, result)).is_err() {
                    break;
                }
            }
        });
        rx
    }
}

#[cfg(target_arch = "wasm32")]
pub mod web {
    use js_sys::Uint8Array;
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::Response;

    use super::*;
    use crate::model::AssetSlot;

    fn fetch_error(url: &str, err: JsValue) -> ViewerError {
        ViewerError::Fetch(format!("{url}: {err:?}"))
    }

    pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, ViewerError> {
        let window = web_sys::window().ok_or_else(|| ViewerError::Fetch("no global window".to_string()))?;
        let value = JsFuture::from(window.fetch_with_str(url)).await.map_err(|e| fetch_error(url, e))?;
        let response: Response = value.dyn_into().map_err(|e| fetch_error(url, e))?;
        if !response.ok() {
            return Err(ViewerError::Fetch(format!("{url}: HTTP {}", response.status())));
        }
        let buffer = JsFuture::from(response.array_buffer().map_err(|e| fetch_error(url, e))?)
            .await
            .map_err(|e| fetch_error(url, e))?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }

    /// Fetch and parse one model in the background, settling `slot`.
    pub fn spawn_load(kind: ModelKind, config: &SceneConfig, slot: AssetSlot<LoadedModel>) {
        let url = model_path(kind, config).to_string();
        let options = ModelOptions::for_kind(kind, config);
        wasm_bindgen_futures::spawn_local(async move {
            let result = match fetch_bytes(&url).await {
                Ok(bytes) => parse_model(&url, &bytes, options),
                Err(e) => Err(e),
            };
            slot.resolve(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal embedded glTF: one triangle in a mesh node translated by
    /// (5, 0, 0), base colour red.
    fn triangle_gltf(with_positions: bool) -> String {
        // three f32 vec3: (0,0,0) (1,0,0) (0,1,0)
        let bytes: Vec<u8> = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect();
        let data = base64_encode(&bytes);
        let attributes = if with_positions { r#"{ "POSITION": 0 }"# } else { "{}" };
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "mesh": 0, "translation": [5.0, 0.0, 0.0] }}],
  "materials": [{{ "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.0, 0.0, 1.0] }} }}],
  "meshes": [{{ "name": "tri", "primitives": [{{ "attributes": {attributes}, "material": 0 }}] }}],
  "buffers": [{{ "byteLength": 36, "uri": "data:application/octet-stream;base64,{data}" }}],
  "bufferViews": [{{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }}],
  "accessors": [{{
    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
    "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
  }}]
}}"#
        )
    }

    fn base64_encode(bytes: &[u8]) -> String {
        const TABLE: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        let mut out = String::new();
        for chunk in bytes.chunks(3) {
            let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
            let n = (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32;
            for i in 0..4 {
                if i <= chunk.len() {
                    out.push(TABLE[(n >> (18 - 6 * i) & 63) as usize] as char);
                } else {
                    out.push('=');
                }
            }
        }
        out
    }

    const LIT: ModelOptions = ModelOptions { shading: Shading::Lit { emissive: 0.25 }, reset_mesh_translation: false };
    const GIFT: ModelOptions = ModelOptions { shading: Shading::Unlit, reset_mesh_translation: true };

    #[test]
    fn machine_keeps_node_transform_and_colour() {
        let model = parse_model("machine", triangle_gltf(true).as_bytes(), LIT).unwrap();
        assert_eq!(model.mesh.vertices.len(), 3);
        assert_eq!(model.mesh.indices, vec![0, 1, 2]);
        let bounds = model.mesh.bounds().unwrap();
        assert!((bounds.min - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-6);
        assert_eq!(model.mesh.vertices[0].color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(model.shading, Shading::Lit { emissive: 0.25 });
    }

    #[test]
    fn gift_mesh_translation_is_reset() {
        let model = parse_model("gift", triangle_gltf(true).as_bytes(), GIFT).unwrap();
        let pivot = model.pivot_offset();
        assert!((pivot - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-6);
        assert_eq!(model.shading, Shading::Unlit);
    }

    #[test]
    fn missing_positions_is_an_error() {
        // rejected by validation or by the reader, depending on the importer
        let err = parse_model("broken", triangle_gltf(false).as_bytes(), LIT).unwrap_err();
        assert!(matches!(err, ViewerError::Gltf(_) | ViewerError::MissingPositions(_)));
    }

    #[test]
    fn garbage_is_a_gltf_error() {
        let err = parse_model("junk", b"definitely not gltf", LIT).unwrap_err();
        assert!(matches!(err, ViewerError::Gltf(_)));
    }

    #[test]
    fn options_follow_model_kind() {
        let config = SceneConfig::default();
        assert_eq!(ModelOptions::for_kind(ModelKind::Gift, &config), GIFT);
        assert_eq!(ModelOptions::for_kind(ModelKind::Machine, &config), LIT);
        assert_eq!(model_path(ModelKind::Gift, &config), "assets/gift_tag.glb");
    }
}
