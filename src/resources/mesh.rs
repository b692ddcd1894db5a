//! Flattening a glTF scene into drawable primitives.
//!
//! The node graph is walked depth-first from the scene roots. Every node's
//! world transform is its parent's world transform times its own local one.
//! Each triangle primitive found along the way becomes one [`PrimitiveData`]
//! carrying that world transform, its vertices, 32-bit indices and material.

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    data_structures::vertex::MeshVertex,
    matrix::Mat4,
    resources::{AssetError, SceneDocument},
};

/// Where a base colour texture's encoded bytes come from.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
    Embedded { bytes: Vec<u8>, mime_type: String },
    Uri { uri: String, mime_type: Option<String> },
}

#[derive(Clone, Debug)]
pub struct PrimitiveData {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    /// Node-to-model transform.
    pub transform: Mat4,
    pub base_color: [f32; 4],
    pub texture: Option<TextureSource>,
}

/// Extract every drawable primitive of the document's default scene (or its
/// first scene when there is no default).
///
/// Fails with [`AssetError::NoScene`] when there is no scene or it has no
/// nodes, and with [`AssetError::NoMeshes`] when no node carries a mesh
/// primitive. Primitives that cannot be drawn are skipped with a warning, so
/// the result may still be empty.
pub fn extract_primitives(doc: &SceneDocument) -> Result<Vec<PrimitiveData>, AssetError> {
    let scene = doc
        .document
        .default_scene()
        .or_else(|| doc.document.scenes().next())
        .ok_or(AssetError::NoScene)?;
    if scene.nodes().next().is_none() {
        return Err(AssetError::NoScene);
    }

    let mut walk = Walk::default();
    walk.run(doc, &scene);
    if walk.found == 0 {
        return Err(AssetError::NoMeshes);
    }
    log::debug!(
        "extracted {} of {} primitive(s)",
        walk.primitives.len(),
        walk.found
    );
    Ok(walk.primitives)
}

#[derive(Default)]
struct Walk {
    primitives: Vec<PrimitiveData>,
    found: usize,
}

impl Walk {
    fn run(&mut self, doc: &SceneDocument, scene: &gltf::Scene) {
        let mut seen = vec![false; doc.document.nodes().len()];
        let mut stack: Vec<(gltf::Node, Mat4)> = scene
            .nodes()
            .map(|node| (node, Matrix4::identity()))
            .collect();
        stack.reverse();
        while let Some((node, parent)) = stack.pop() {
            match seen.get_mut(node.index()) {
                Some(seen) if !*seen => *seen = true,
                _ => {
                    log::warn!("node {} is reachable twice, skipping", node.index());
                    continue;
                }
            }
            let world = parent * Matrix4::from(node.transform().matrix());
            self.visit(doc, &node, world);
            let first_child = stack.len();
            stack.extend(node.children().map(|child| (child, world)));
            stack[first_child..].reverse();
        }
    }

    fn visit(&mut self, doc: &SceneDocument, node: &gltf::Node, world: Mat4) {
        let Some(mesh) = node.mesh() else {
            return;
        };
        let mesh_name = mesh.name().unwrap_or("mesh");
        for primitive in mesh.primitives() {
            self.found += 1;
            let name = format!("{mesh_name}#{}", primitive.index());
            if let Some(data) = read_primitive(doc, &primitive, name, world) {
                self.primitives.push(data);
            }
        }
    }
}

fn read_primitive(
    doc: &SceneDocument,
    primitive: &gltf::Primitive,
    name: String,
    transform: Mat4,
) -> Option<PrimitiveData> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!("skipping {name}: only triangle lists are drawn");
        return None;
    }
    let reader = primitive.reader(|buffer| doc.buffers.get(buffer.index()).map(Vec::as_slice));

    let Some(positions) = reader.read_positions() else {
        log::warn!("skipping {name}: no positions");
        return None;
    };
    let Some(indices) = reader.read_indices() else {
        log::warn!("skipping {name}: no index buffer");
        return None;
    };
    let mut vertices: Vec<MeshVertex> = positions.map(MeshVertex::at).collect();
    let indices: Vec<u32> = indices.into_u32().collect();
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        log::warn!("skipping {name}: index {bad} out of range");
        return None;
    }

    let pbr = primitive.material().pbr_metallic_roughness();
    let base_texture = pbr.base_color_texture();
    let tex_set = base_texture.as_ref().map_or(0, |info| info.tex_coord());

    if let Some(normals) = reader.read_normals() {
        for (vertex, normal) in vertices.iter_mut().zip(normals) {
            vertex.normal = normal;
        }
    }
    if let Some(uvs) = reader.read_tex_coords(tex_set) {
        for (vertex, uv) in vertices.iter_mut().zip(uvs.into_f32()) {
            vertex.tex_coords = uv;
        }
    }
    if let Some(colors) = reader.read_colors(0) {
        for (vertex, color) in vertices.iter_mut().zip(colors.into_rgba_f32()) {
            vertex.color = color;
        }
    }

    let texture = base_texture.and_then(|info| texture_source(doc, info.texture().source().source()));

    Some(PrimitiveData {
        name,
        vertices,
        indices,
        transform,
        base_color: pbr.base_color_factor(),
        texture,
    })
}

fn texture_source(doc: &SceneDocument, source: gltf::image::Source) -> Option<TextureSource> {
    match source {
        gltf::image::Source::View { view, mime_type } => {
            let start = view.offset();
            let bytes = start.checked_add(view.length()).and_then(|end| {
                doc.buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(start..end))
            });
            match bytes {
                Some(bytes) => Some(TextureSource::Embedded {
                    bytes: bytes.to_vec(),
                    mime_type: mime_type.to_string(),
                }),
                None => {
                    log::warn!("embedded image points outside its buffer");
                    None
                }
            }
        }
        gltf::image::Source::Uri { uri, mime_type } => Some(TextureSource::Uri {
            uri: uri.to_string(),
            mime_type: mime_type.map(str::to_string),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> SceneDocument {
        SceneDocument::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn no_scenes_at_all() {
        let d = doc(r#"{ "asset": { "version": "2.0" } }"#);
        assert!(matches!(extract_primitives(&d), Err(AssetError::NoScene)));
    }

    #[test]
    fn scene_without_nodes() {
        let d = doc(r#"{ "asset": { "version": "2.0" }, "scene": 0, "scenes": [{ "nodes": [] }] }"#);
        assert!(matches!(extract_primitives(&d), Err(AssetError::NoScene)));
    }

    #[test]
    fn nodes_without_meshes() {
        let d = doc(
            r#"{
                "asset": { "version": "2.0" },
                "scene": 0,
                "scenes": [{ "nodes": [0] }],
                "nodes": [{ "name": "root", "children": [1] }, { "name": "leaf" }]
            }"#,
        );
        assert!(matches!(extract_primitives(&d), Err(AssetError::NoMeshes)));
    }

    #[test]
    fn deep_hierarchies_do_not_exhaust_the_stack() {
        const DEPTH: usize = 20_000;
        let nodes: Vec<String> = (0..DEPTH)
            .map(|i| match i + 1 {
                next if next < DEPTH => format!(r#"{{ "children": [{next}] }}"#),
                _ => "{}".to_string(),
            })
            .collect();
        let json = format!(
            r#"{{
                "asset": {{ "version": "2.0" }},
                "scene": 0,
                "scenes": [{{ "nodes": [0] }}],
                "nodes": [{}]
            }}"#,
            nodes.join(",")
        );
        assert!(matches!(extract_primitives(&doc(&json)), Err(AssetError::NoMeshes)));
    }
}
