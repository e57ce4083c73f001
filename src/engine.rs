//! # Engine
//!
//! Decides which [`NodeClass`] wraps a piece of data and materializes the
//! children of a node, either all at once (eager) or on first read (lazy).
//!
//! Class resolution, first match wins:
//!
//! 1. an explicit class hint from the caller
//! 2. the parent class's override for the key (`"aggregation"` under a
//!    query is an aggregation list)
//! 3. the clause registry, for arrays tagged with a registered string
//!    (`["sum", …]` is a Sum clause)
//! 4. the data's shape: arrays are sequences, objects are mappings
//!
//! Scalars are never wrapped.

use std::cell::Cell;
use std::rc::Rc;

use rpds::Vector;
use tracing::trace;

use crate::{
    metadata::Meta,
    model::{ClauseKind, NodeClass},
    node::{Child, Key, Node, NodeBody, Shape, Slot},
    value::Value,
};

/// When children get parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Parse each child on first access instead of up front.
    pub lazy: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { lazy: true }
    }
}

/// Shared by every node of the trees it parses.
#[derive(Clone)]
pub struct Engine {
    state: Rc<EngineState>,
}

struct EngineState {
    config: EngineConfig,
    parsed: Cell<usize>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.state.config)
            .field("parsed", &self.state.parsed.get())
            .finish()
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            state: Rc::new(EngineState {
                config,
                parsed: Cell::new(0),
            }),
        }
    }

    pub fn lazy() -> Self {
        Engine::new(EngineConfig { lazy: true })
    }

    pub fn eager() -> Self {
        Engine::new(EngineConfig { lazy: false })
    }

    pub fn config(&self) -> EngineConfig {
        self.state.config
    }

    /// Number of node bodies this engine has constructed so far.
    pub fn parsed_count(&self) -> usize {
        self.state.parsed.get()
    }

    /// Parse `data` as a root.
    pub fn parse(&self, data: impl Into<Value>, meta: Meta) -> Child {
        self.parse_child(data.into(), &meta, None, None, None)
    }

    /// Parse `data` as a root of the given class.
    pub fn parse_as(&self, data: impl Into<Value>, meta: Meta, class: NodeClass) -> Child {
        self.parse_child(data.into(), &meta, None, None, Some(class))
    }

    pub fn resolve_class(&self, data: &Value, parent: Option<NodeClass>, key: Option<&Key>) -> NodeClass {
        let overridden = match (parent, key) {
            (Some(parent), Some(key)) => parent.child_class(data, key),
            _ => None,
        };
        if let Some(class) = overridden {
            return class;
        }
        if let Some(kind) = data.tag().and_then(ClauseKind::from_tag) {
            return NodeClass::Clause(kind);
        }
        match data {
            Value::Array(_) => NodeClass::Sequence,
            _ => NodeClass::Mapping,
        }
    }

    pub(crate) fn parse_child(
        &self,
        data: Value,
        meta: &Meta,
        parent: Option<&Node>,
        key: Option<Key>,
        hint: Option<NodeClass>,
    ) -> Child {
        if !data.is_container() {
            return Child::Value(data);
        }
        let class = hint.unwrap_or_else(|| self.resolve_class(&data, parent.map(Node::class), key.as_ref()));
        let body = self.build(&data, class, meta);
        Child::Node(Node::new(body, parent, key))
    }

    /// Parse the child stored under `key` of a `parent`-class node.
    pub(crate) fn materialize(&self, raw: &Value, parent: NodeClass, key: &Key, meta: &Meta) -> Rc<NodeBody> {
        let class = self.resolve_class(raw, Some(parent), Some(key));
        trace!(%key, ?class, "materializing child");
        self.build(raw, class, meta)
    }

    /// Body over `data`. The body keeps `data` itself as its wire value and
    /// each slot keeps a shared handle on its element, so no wire data is
    /// copied.
    pub(crate) fn build(&self, data: &Value, class: NodeClass, meta: &Meta) -> Rc<NodeBody> {
        let shape = self.parse_children(class, data, meta);
        self.assemble(class, shape, meta.clone(), data.clone())
    }

    fn parse_children(&self, class: NodeClass, data: &Value, meta: &Meta) -> Shape {
        match data {
            Value::Object(members) => Shape::Mapping(
                members
                    .iter()
                    .map(|(name, item)| {
                        let slot = self.slot(item.clone(), class, &Key::Name(name.clone()), meta, None);
                        (name.clone(), slot)
                    })
                    .collect(),
            ),
            Value::Array(items) => Shape::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.slot(item.clone(), class, &Key::Index(i), meta, None))
                    .collect(),
            ),
            _ => Shape::Sequence(Vector::new()),
        }
    }

    /// Slot for `raw` under `key` of a `parent`-class node. A `prebuilt` body
    /// is kept only if it has the class normal resolution would pick;
    /// otherwise the slot is re-parsed (eager) or left for first access.
    pub(crate) fn slot(
        &self,
        raw: Value,
        parent: NodeClass,
        key: &Key,
        meta: &Meta,
        prebuilt: Option<Rc<NodeBody>>,
    ) -> Slot {
        if !raw.is_container() {
            return Slot::new(raw);
        }
        if let Some(body) = prebuilt {
            if body.class == self.resolve_class(&raw, Some(parent), Some(key)) {
                return Slot::parsed(raw, body);
            }
        }
        if self.state.config.lazy {
            Slot::new(raw)
        } else {
            let body = self.materialize(&raw, parent, key, meta);
            Slot::parsed(raw, body)
        }
    }

    pub(crate) fn assemble(&self, class: NodeClass, shape: Shape, meta: Meta, value: Value) -> Rc<NodeBody> {
        self.freeze(NodeBody {
            class,
            shape,
            value,
            meta,
            engine: self.clone(),
        })
    }

    /// Seal a finished body. Nothing reachable from the returned `Rc` changes
    /// afterwards except empty child cells being filled once.
    pub(crate) fn freeze(&self, body: NodeBody) -> Rc<NodeBody> {
        trace!(class = ?body.class, children = body.shape.len(), "freezing node");
        self.state.parsed.set(self.state.parsed.get() + 1);
        Rc::new(body)
    }
}
