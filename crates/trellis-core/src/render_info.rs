//! Render descriptors: what a list item should render.
//!
//! A [`RenderInfo`] is immutable once built and is shared through an `Arc`.
//! Holders compare descriptor identity (the `Arc` itself), never its value, to
//! decide whether a finished layout still belongs to the current item.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::collections::map::HashMap;

/// Custom attribute controlling whether the item's tree clips its children.
pub const CLIP_CHILDREN: &str = "clip_children";

/// A renderable unit produced by the component model.
pub trait Component: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn simple_name(&self) -> &str;

    /// Returns true if `other` would render the same output.
    ///
    /// The default only treats the very same instance as equivalent.
    fn is_equivalent_to(&self, other: &dyn Component) -> bool {
        std::ptr::addr_eq(self as *const Self, other as *const dyn Component)
    }
}

/// Value stored under a custom attribute key.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Text(Arc<str>),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(Arc::from(value))
    }
}

/// Values propagated from a parent section down to every layout of an item.
///
/// Entries are keyed by their type, so each type can be stored once.
#[derive(Clone, Default)]
pub struct TreeProps {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TreeProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: Any + Send + Sync>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.put(value);
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for TreeProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeProps")
            .field("len", &self.values.len())
            .finish()
    }
}

/// Descriptor for an item rendered by a pre-existing platform view.
///
/// No layout phase applies to these items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewRenderInfo {
    pub view_type: u32,
}

#[derive(Clone, Debug)]
enum Content {
    Component(Arc<dyn Component>),
    View(ViewRenderInfo),
}

/// Immutable description of one list item.
#[derive(Clone, Debug)]
pub struct RenderInfo {
    content: Content,
    is_sticky: bool,
    span_size: u32,
    is_full_span: bool,
    custom_attributes: HashMap<&'static str, AttributeValue>,
    tree_props: Option<Arc<TreeProps>>,
    name: Option<Arc<str>>,
}

impl RenderInfo {
    /// Starts a descriptor for an item rendered by `component`.
    pub fn component(component: Arc<dyn Component>) -> RenderInfoBuilder {
        RenderInfoBuilder::new(Content::Component(component))
    }

    /// Starts a descriptor for an item rendered by a platform view.
    pub fn view(view: ViewRenderInfo) -> RenderInfoBuilder {
        RenderInfoBuilder::new(Content::View(view))
    }

    /// Returns true if the item is drawn by a platform view instead of a layout tree.
    pub fn renders_view(&self) -> bool {
        matches!(self.content, Content::View(_))
    }

    pub fn get_component(&self) -> Option<&Arc<dyn Component>> {
        match &self.content {
            Content::Component(component) => Some(component),
            Content::View(_) => None,
        }
    }

    pub fn view_info(&self) -> Option<ViewRenderInfo> {
        match self.content {
            Content::View(view) => Some(view),
            Content::Component(_) => None,
        }
    }

    pub fn is_sticky(&self) -> bool {
        self.is_sticky
    }

    pub fn span_size(&self) -> u32 {
        self.span_size
    }

    pub fn is_full_span(&self) -> bool {
        self.is_full_span
    }

    pub fn custom_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.custom_attributes.get(key)
    }

    pub fn tree_props(&self) -> Option<&Arc<TreeProps>> {
        self.tree_props.as_ref()
    }

    /// Name used in logs: the explicit name, the component name, or `"view"`.
    pub fn name(&self) -> &str {
        if let Some(name) = &self.name {
            return name;
        }
        match &self.content {
            Content::Component(component) => component.simple_name(),
            Content::View(_) => "view",
        }
    }
}

/// Builder returned by [`RenderInfo::component`] and [`RenderInfo::view`].
#[derive(Debug)]
pub struct RenderInfoBuilder {
    info: RenderInfo,
}

impl RenderInfoBuilder {
    fn new(content: Content) -> Self {
        Self {
            info: RenderInfo {
                content,
                is_sticky: false,
                span_size: 1,
                is_full_span: false,
                custom_attributes: HashMap::default(),
                tree_props: None,
                name: None,
            },
        }
    }

    pub fn sticky(mut self, is_sticky: bool) -> Self {
        self.info.is_sticky = is_sticky;
        self
    }

    pub fn span_size(mut self, span_size: u32) -> Self {
        self.info.span_size = span_size;
        self
    }

    pub fn full_span(mut self, is_full_span: bool) -> Self {
        self.info.is_full_span = is_full_span;
        self
    }

    pub fn custom_attribute(mut self, key: &'static str, value: impl Into<AttributeValue>) -> Self {
        self.info.custom_attributes.insert(key, value.into());
        self
    }

    pub fn tree_props(mut self, tree_props: Option<Arc<TreeProps>>) -> Self {
        self.info.tree_props = tree_props;
        self
    }

    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.info.name = Some(name.into());
        self
    }

    pub fn build(self) -> RenderInfo {
        self.info
    }

    /// Builds and wraps the descriptor for sharing with holders.
    pub fn shared(self) -> Arc<RenderInfo> {
        Arc::new(self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Label(&'static str);

    impl Component for Label {
        fn simple_name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_component_defaults() {
        let info = RenderInfo::component(Arc::new(Label("row"))).build();
        assert!(!info.renders_view());
        assert!(info.get_component().is_some());
        assert!(!info.is_sticky());
        assert_eq!(info.span_size(), 1);
        assert!(!info.is_full_span());
        assert!(info.tree_props().is_none());
        assert_eq!(info.name(), "row");
    }

    #[test]
    fn test_view_descriptor_has_no_component() {
        let info = RenderInfo::view(ViewRenderInfo { view_type: 3 }).build();
        assert!(info.renders_view());
        assert!(info.get_component().is_none());
        assert_eq!(info.view_info(), Some(ViewRenderInfo { view_type: 3 }));
        assert_eq!(info.name(), "view");
    }

    #[test]
    fn test_custom_attributes_lookup() {
        let info = RenderInfo::component(Arc::new(Label("row")))
            .custom_attribute(CLIP_CHILDREN, false)
            .custom_attribute("tag", "header")
            .build();
        assert_eq!(
            info.custom_attribute(CLIP_CHILDREN).and_then(AttributeValue::as_bool),
            Some(false)
        );
        assert_eq!(
            info.custom_attribute("tag").and_then(AttributeValue::as_text),
            Some("header")
        );
        assert!(info.custom_attribute("missing").is_none());
    }

    #[test]
    fn test_tree_props_are_keyed_by_type() {
        #[derive(Debug, PartialEq)]
        struct Theme(u32);

        let props = TreeProps::new().with(Theme(7)).with(42u8);
        assert_eq!(props.get::<Theme>(), Some(&Theme(7)));
        assert_eq!(props.get::<u8>(), Some(&42));
        assert!(props.get::<String>().is_none());
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_default_equivalence_is_identity() {
        let a: Arc<dyn Component> = Arc::new(Label("a"));
        let b: Arc<dyn Component> = Arc::new(Label("a"));
        assert!(a.is_equivalent_to(a.as_ref()));
        assert!(!a.is_equivalent_to(b.as_ref()));
    }
}
