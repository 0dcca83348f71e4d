//! Z-ordered grouping of SVG nodes.
//!
//! Drawables push nodes into a [`LayeredOutput`] tagged with a
//! [`RenderLayer`]. Rendering sorts by layer (stable within a layer) and
//! wraps each layer in a `<g data-layer="...">` group, so connectors always
//! sit above chrome no matter which element was emitted first.

use svg::node::element as svg_element;

pub type SvgNode = Box<dyn svg::Node>;

/// Rendering layers, bottom to top in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderLayer {
    /// Canvas fill and container backgrounds
    Background,
    /// Construct outlines
    Chrome,
    /// Connector paths between anchors
    Connector,
    /// Labels and connector captions
    Text,
}

impl RenderLayer {
    pub fn name(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Chrome => "chrome",
            Self::Connector => "connector",
            Self::Text => "text",
        }
    }
}

/// SVG nodes collected per layer.
#[derive(Debug, Default)]
pub struct LayeredOutput {
    items: Vec<(RenderLayer, SvgNode)>,
}

impl LayeredOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_layer(&mut self, layer: RenderLayer, node: SvgNode) {
        self.items.push((layer, node));
    }

    pub fn merge(&mut self, other: LayeredOutput) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of nodes on `layer`.
    pub fn count(&self, layer: RenderLayer) -> usize {
        self.items.iter().filter(|(l, _)| *l == layer).count()
    }

    /// Consumes the output and returns one `<g>` group per non-empty layer,
    /// bottom layer first.
    pub fn render(mut self) -> Vec<SvgNode> {
        self.items.sort_by_key(|(layer, _)| *layer);

        let mut groups: Vec<SvgNode> = Vec::new();
        let mut current: Option<(RenderLayer, svg_element::Group)> = None;
        for (layer, node) in self.items {
            current = Some(match current {
                Some((open, group)) if open == layer => (open, group.add(node)),
                previous => {
                    if let Some((_, group)) = previous {
                        groups.push(Box::new(group));
                    }
                    let group = svg_element::Group::new().set("data-layer", layer.name());
                    (layer, group.add(node))
                }
            });
        }
        if let Some((_, group)) = current {
            groups.push(Box::new(group));
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use svg::node::element::Rectangle;

    use super::*;

    #[test]
    fn test_empty_output_renders_nothing() {
        let output = LayeredOutput::new();
        assert!(output.is_empty());
        assert!(output.render().is_empty());
    }

    #[test]
    fn test_one_group_per_layer_in_order() {
        let mut output = LayeredOutput::new();
        output.add_to_layer(RenderLayer::Text, Box::new(Rectangle::new()));
        output.add_to_layer(RenderLayer::Chrome, Box::new(Rectangle::new()));
        output.add_to_layer(RenderLayer::Text, Box::new(Rectangle::new()));
        assert_eq!(output.count(RenderLayer::Text), 2);

        let groups = output.render();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].to_string().contains("data-layer=\"chrome\""));
        assert!(groups[1].to_string().contains("data-layer=\"text\""));
    }

    #[test]
    fn test_merge_keeps_all_nodes() {
        let mut first = LayeredOutput::new();
        first.add_to_layer(RenderLayer::Connector, Box::new(Rectangle::new()));
        let mut second = LayeredOutput::new();
        second.add_to_layer(RenderLayer::Connector, Box::new(Rectangle::new()));
        second.add_to_layer(RenderLayer::Background, Box::new(Rectangle::new()));

        first.merge(second);
        assert_eq!(first.count(RenderLayer::Connector), 2);
        assert_eq!(first.render().len(), 2);
    }
}
