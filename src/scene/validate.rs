use std::collections::{HashMap, HashSet};

use crate::{
    foundation::error::{LottieError, LottieResult},
    scene::model::{Dash, Fill, Geometry, Layer, Node, Paint, SceneGraph, Shape, Stroke},
};

/// Check a decoded scene before it is evaluated.
///
/// Rejects empty canvases, non-positive frame rates, unsorted keyframe tracks,
/// duplicate sibling ids and matte references that are dangling, self-referential,
/// cyclic or point at a later sibling.
pub fn validate_scene(scene: &SceneGraph) -> LottieResult<()> {
    if scene.width == 0 || scene.height == 0 {
        return Err(LottieError::scene_invalid(format!(
            "canvas must be non-empty, got {}",
            scene.canvas()
        )));
    }
    if !scene.frame_rate.is_finite() || scene.frame_rate <= 0.0 {
        return Err(LottieError::scene_invalid(format!(
            "frame_rate must be finite and > 0, got {}",
            scene.frame_rate
        )));
    }
    if scene.total_frames == 0 {
        return Err(LottieError::scene_invalid("total_frames must be > 0"));
    }
    for m in &scene.markers {
        if m.start > m.end {
            return Err(LottieError::scene_invalid(format!(
                "marker '{}' start must be <= end",
                m.name
            )));
        }
    }
    validate_siblings(&scene.layers, "root")
}

fn validate_siblings(nodes: &[Node], parent: &str) -> LottieResult<()> {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        if let Some(id) = node.id()
            && index_of.insert(id, i).is_some()
        {
            return Err(LottieError::scene_invalid(format!(
                "duplicate id '{id}' under '{parent}'"
            )));
        }
    }

    for (i, node) in nodes.iter().enumerate() {
        let Node::Layer(layer) = node else {
            continue;
        };
        let Some(matte) = &layer.matte else {
            continue;
        };
        let name = layer.id.as_deref().unwrap_or("<unnamed>");
        let Some(&src) = index_of.get(matte.source.as_str()) else {
            return Err(LottieError::scene_invalid(format!(
                "layer '{name}' references unknown matte source '{}'",
                matte.source
            )));
        };
        if src == i {
            return Err(LottieError::scene_invalid(format!(
                "layer '{name}' uses itself as matte source"
            )));
        }
        if !matches!(nodes[src], Node::Layer(_)) {
            return Err(LottieError::scene_invalid(format!(
                "matte source '{}' of layer '{name}' is not a layer",
                matte.source
            )));
        }
        if has_matte_cycle(nodes, &index_of, i) {
            return Err(LottieError::scene_invalid(format!(
                "cyclic matte reference through layer '{name}'"
            )));
        }
        if src > i {
            return Err(LottieError::scene_invalid(format!(
                "matte source '{}' of layer '{name}' must be an earlier sibling",
                matte.source
            )));
        }
    }

    for node in nodes {
        match node {
            Node::Layer(layer) => validate_layer(layer)?,
            Node::Shape(shape) => validate_shape(shape)?,
        }
    }
    Ok(())
}

fn has_matte_cycle(nodes: &[Node], index_of: &HashMap<&str, usize>, start: usize) -> bool {
    let mut seen = HashSet::new();
    let mut cur = start;
    loop {
        if !seen.insert(cur) {
            return true;
        }
        let Node::Layer(layer) = &nodes[cur] else {
            return false;
        };
        let Some(next) = layer
            .matte
            .as_ref()
            .and_then(|m| index_of.get(m.source.as_str()))
        else {
            return false;
        };
        cur = *next;
    }
}

fn validate_layer(layer: &Layer) -> LottieResult<()> {
    let t = &layer.transform;
    t.position.validate()?;
    t.anchor.validate()?;
    t.scale.validate()?;
    t.rotation_deg.validate()?;
    layer.opacity.validate()?;
    if let Some(range) = layer.range
        && range.start.0 > range.end.0
    {
        return Err(LottieError::scene_invalid(format!(
            "layer '{}' range start must be <= end",
            layer.id.as_deref().unwrap_or("<unnamed>")
        )));
    }
    for mask in &layer.masks {
        validate_geometry(&mask.geometry)?;
        mask.opacity.validate()?;
    }
    if let Some(clip) = &layer.clip {
        validate_geometry(clip)?;
    }
    validate_siblings(&layer.children, layer.id.as_deref().unwrap_or("<unnamed>"))
}

fn validate_shape(shape: &Shape) -> LottieResult<()> {
    validate_geometry(&shape.geometry)?;
    if let Some(Fill { paint, opacity, .. }) = &shape.fill {
        validate_paint(paint)?;
        opacity.validate()?;
    }
    if let Some(stroke) = &shape.stroke {
        validate_stroke(stroke)?;
    }
    Ok(())
}

fn validate_stroke(stroke: &Stroke) -> LottieResult<()> {
    validate_paint(&stroke.paint)?;
    stroke.opacity.validate()?;
    stroke.width.validate()?;
    if !stroke.miter_limit.is_finite() || stroke.miter_limit < 1.0 {
        return Err(LottieError::scene_invalid(format!(
            "stroke miter_limit must be >= 1, got {}",
            stroke.miter_limit
        )));
    }
    if let Some(Dash { pattern, offset }) = &stroke.dash {
        pattern.validate()?;
        offset.validate()?;
    }
    Ok(())
}

fn validate_geometry(geometry: &Geometry) -> LottieResult<()> {
    match geometry {
        Geometry::Path(data) => data.validate(),
        Geometry::Rect { rect, radius } => {
            rect.validate()?;
            radius.validate()
        }
        Geometry::Ellipse { center, radii } => {
            center.validate()?;
            radii.validate()
        }
    }
}

fn validate_paint(paint: &Paint) -> LottieResult<()> {
    match paint {
        Paint::Solid(color) => color.validate(),
        Paint::Linear { start, end, stops } => {
            start.validate()?;
            end.validate()?;
            stops.validate()
        }
        Paint::Radial {
            center,
            radius,
            focal,
            stops,
        } => {
            center.validate()?;
            radius.validate()?;
            if let Some(focal) = focal {
                focal.validate()?;
            }
            stops.validate()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/validate.rs"]
mod tests;
