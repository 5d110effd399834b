use crate::{
    animation::anim::Anim,
    foundation::core::{Rgba8, Vec2},
    scene::model::{Layer, Node, Paint, SceneGraph, Shape},
};

/// Constant value forced onto every property a keypath selects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyValue {
    /// Replace a shape's fill paint with a solid color.
    FillColor(Rgba8),
    /// Fill opacity in `[0, 1]`.
    FillOpacity(f64),
    /// Replace a shape's stroke paint with a solid color.
    StrokeColor(Rgba8),
    /// Stroke opacity in `[0, 1]`.
    StrokeOpacity(f64),
    /// Stroke width.
    StrokeWidth(f64),
    /// Layer opacity in `[0, 1]`.
    LayerOpacity(f64),
    /// Layer position.
    Position(Vec2),
    /// Layer scale.
    Scale(Vec2),
    /// Layer rotation in degrees.
    Rotation(f64),
}

impl PropertyValue {
    fn targets_layer(self) -> bool {
        matches!(
            self,
            Self::LayerOpacity(_) | Self::Position(_) | Self::Scale(_) | Self::Rotation(_)
        )
    }
}

/// Dot-separated node path. `*` matches one segment and `**` any number of segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Split `path` on dots.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Whether the pattern matches the full id path of a node.
    pub fn matches(&self, ids: &[&str]) -> bool {
        match_from(&self.segments, ids)
    }
}

fn match_from(pattern: &[String], ids: &[&str]) -> bool {
    match pattern.split_first() {
        None => ids.is_empty(),
        Some((seg, rest)) if seg == "**" => {
            (0..=ids.len()).any(|skip| match_from(rest, &ids[skip..]))
        }
        Some((seg, rest)) => match ids.split_first() {
            Some((id, ids_rest)) => (seg == "*" || seg == id) && match_from(rest, ids_rest),
            None => false,
        },
    }
}

/// Apply `value` to every matching node. Returns how many properties changed.
pub fn apply_override(scene: &mut SceneGraph, keypath: &KeyPath, value: PropertyValue) -> usize {
    let mut ids = Vec::new();
    override_nodes(&mut scene.layers, keypath, value, &mut ids)
}

fn override_nodes(
    nodes: &mut [Node],
    keypath: &KeyPath,
    value: PropertyValue,
    ids: &mut Vec<String>,
) -> usize {
    let mut changed = 0;
    for node in nodes {
        ids.push(node.id().unwrap_or_default().to_owned());
        let path: Vec<&str> = ids.iter().map(String::as_str).collect();
        let hit = keypath.matches(&path);
        match node {
            Node::Layer(layer) => {
                if hit && value.targets_layer() {
                    override_layer(layer, value);
                    changed += 1;
                }
                changed += override_nodes(&mut layer.children, keypath, value, ids);
            }
            Node::Shape(shape) => {
                if hit && !value.targets_layer() && override_shape(shape, value) {
                    changed += 1;
                }
            }
        }
        ids.pop();
    }
    changed
}

fn override_layer(layer: &mut Layer, value: PropertyValue) {
    match value {
        PropertyValue::LayerOpacity(v) => layer.opacity = Anim::constant(v.clamp(0.0, 1.0)),
        PropertyValue::Position(v) => layer.transform.position = Anim::constant(v),
        PropertyValue::Scale(v) => layer.transform.scale = Anim::constant(v),
        PropertyValue::Rotation(v) => layer.transform.rotation_deg = Anim::constant(v),
        _ => {}
    }
}

// Shapes without the addressed paint (no fill, no stroke) are left untouched.
fn override_shape(shape: &mut Shape, value: PropertyValue) -> bool {
    match value {
        PropertyValue::FillColor(c) => shape
            .fill
            .as_mut()
            .map(|f| f.paint = Paint::Solid(Anim::constant(c)))
            .is_some(),
        PropertyValue::FillOpacity(v) => shape
            .fill
            .as_mut()
            .map(|f| f.opacity = Anim::constant(v.clamp(0.0, 1.0)))
            .is_some(),
        PropertyValue::StrokeColor(c) => shape
            .stroke
            .as_mut()
            .map(|s| s.paint = Paint::Solid(Anim::constant(c)))
            .is_some(),
        PropertyValue::StrokeOpacity(v) => shape
            .stroke
            .as_mut()
            .map(|s| s.opacity = Anim::constant(v.clamp(0.0, 1.0)))
            .is_some(),
        PropertyValue::StrokeWidth(v) => shape
            .stroke
            .as_mut()
            .map(|s| s.width = Anim::constant(v.max(0.0)))
            .is_some(),
        _ => false,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/keypath.rs"]
mod tests;
