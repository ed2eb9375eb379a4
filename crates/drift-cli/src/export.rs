//! SVG rendering of layout snapshots.

use std::{collections::HashMap, path::Path};

use log::{debug, info};
use svg::{self, node::element as svg_element};

use drift::{RenderSink, Snapshot, geometry::Bounds, identifier::NodeId};

use crate::{config::StyleConfig, error::CliError};

/// Renders snapshots into SVG documents.
#[derive(Debug, Clone)]
pub struct SvgExporter {
    style: StyleConfig,
    radii: HashMap<NodeId, f64>,
}

impl SvgExporter {
    pub fn new(style: StyleConfig) -> Self {
        Self {
            style,
            radii: HashMap::new(),
        }
    }

    /// Sets the drawn radius of individual nodes, replacing earlier ones.
    pub fn set_radii(&mut self, radii: impl IntoIterator<Item = (NodeId, f64)>) {
        self.radii = radii.into_iter().collect();
    }

    fn radius(&self, id: NodeId) -> f64 {
        self.radii
            .get(&id)
            .copied()
            .unwrap_or(self.style.node_radius())
    }

    /// Renders `snapshot` with links below nodes, the view box fitted to the content.
    pub fn render(&self, snapshot: &Snapshot) -> svg::Document {
        let largest = snapshot
            .nodes
            .iter()
            .map(|node| self.radius(node.id))
            .fold(self.style.node_radius(), f64::max);
        let bounds = snapshot
            .bounds()
            .unwrap_or_default()
            .inflate(largest + self.style.padding());

        let mut doc = svg::Document::new()
            .set(
                "viewBox",
                format!(
                    "{} {} {} {}",
                    bounds.min().x(),
                    bounds.min().y(),
                    bounds.width(),
                    bounds.height()
                ),
            )
            .set("width", bounds.width())
            .set("height", bounds.height());

        if let Some(color) = self.style.background_color() {
            doc = doc.add(background(bounds, color));
        }

        let mut links = svg_element::Group::new()
            .set("stroke", self.style.link_stroke())
            .set("stroke-width", self.style.link_width());
        for link in &snapshot.links {
            links = links.add(
                svg_element::Line::new()
                    .set("x1", link.source.x())
                    .set("y1", link.source.y())
                    .set("x2", link.target.x())
                    .set("y2", link.target.y()),
            );
        }

        let mut nodes = svg_element::Group::new().set("stroke", self.style.node_stroke());
        for node in &snapshot.nodes {
            let fill = if node.fixed.is_some() {
                self.style.pinned_fill()
            } else {
                self.style.node_fill()
            };
            nodes = nodes.add(
                svg_element::Circle::new()
                    .set("cx", node.x)
                    .set("cy", node.y)
                    .set("r", self.radius(node.id))
                    .set("fill", fill)
                    .set("data-id", node.id.to_string()),
            );
        }

        doc.add(links).add(nodes)
    }

    /// Renders `snapshot` and writes it to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Export`] if the file cannot be written.
    pub fn export(&self, snapshot: &Snapshot, path: impl AsRef<Path>) -> Result<(), CliError> {
        let path = path.as_ref();
        let doc = self.render(snapshot);
        svg::save(path, &doc).map_err(|err| {
            CliError::Export(format!("failed to write {}: {err}", path.display()))
        })?;
        info!(path = path.display().to_string(), nodes = snapshot.nodes.len(); "Wrote SVG");
        Ok(())
    }
}

fn background(bounds: Bounds, color: &str) -> svg_element::Rectangle {
    svg_element::Rectangle::new()
        .set("x", bounds.min().x())
        .set("y", bounds.min().y())
        .set("width", bounds.width())
        .set("height", bounds.height())
        .set("fill", color)
}

/// Render sink keeping the latest frame.
#[derive(Debug)]
pub struct SvgSink {
    exporter: SvgExporter,
    frames: usize,
    latest: Option<Snapshot>,
}

impl SvgSink {
    pub fn new(exporter: SvgExporter) -> Self {
        Self {
            exporter,
            frames: 0,
            latest: None,
        }
    }

    /// Number of frames received.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn set_radii(&mut self, radii: impl IntoIterator<Item = (NodeId, f64)>) {
        self.exporter.set_radii(radii);
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    /// Writes the latest frame to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Export`] if no frame was received or the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CliError> {
        let snapshot = self
            .latest
            .as_ref()
            .ok_or_else(|| CliError::Export("no frame to export".to_string()))?;
        self.exporter.export(snapshot, path)
    }
}

impl RenderSink for SvgSink {
    fn on_tick(&mut self, snapshot: &Snapshot) {
        self.frames += 1;
        if self.frames % 100 == 0 {
            debug!(frames = self.frames; "Received frames");
        }
        self.latest = Some(snapshot.clone());
    }
}
