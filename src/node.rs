//! # Nodes
//!
//! A parsed document is a tree of immutable node bodies plus a lightweight
//! handle ([`Node`]) that remembers where in a particular tree a body was
//! reached from.
//!
//! ## Bodies and handles
//!
//! - A **body** holds one container's children as slots. Each slot keeps the
//!   child's wire value and a once-filled cell for the child's parsed body.
//!   Bodies never point upward, so sharing them between trees is free.
//! - A **handle** pairs a body with its location: the parent handle it was
//!   read from and the key it was read under. Walking `parent()` retraces
//!   that path.
//!
//! ## Edits
//!
//! Every edit builds a new body for the edited node and returns a handle at
//! the same location. Calling `parent()` on that handle writes it into a new
//! version of the parent, and so on up to `root()`. Slots live in persistent
//! vectors and each body keeps its wire value behind a shared pointer, so an
//! edit copies neither untouched siblings' bodies nor their wire data; only
//! the edited path is rebuilt.
//!
//! ```text
//!   old root ── aggregation ── [0] sum
//!                            ▲
//!   [0].replace(["count"]) ──┘ returns new aggregation list (parent: old root)
//!   .root() ─────────────────── returns new root holding the new list
//! ```
mod mapping;
mod sequence;

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use rpds::Vector;
use tracing::warn;

use crate::{engine::Engine, error::NodeError, metadata::Meta, model::NodeClass, value::Value};

/// Position of a child inside its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Sequence element
    Index(usize),

    /// Mapping member
    Name(String),
}

impl Key {
    /// Index form of this key; numeric names are accepted the way JSON
    /// object keys are.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(name) => name.parse().ok(),
        }
    }

    pub fn to_name(&self) -> String {
        match self {
            Key::Index(i) => i.to_string(),
            Key::Name(name) => name.clone(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "[{}]", i),
            Key::Name(name) => write!(f, "{:?}", name),
        }
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

/// One child position: the wire value, plus the parsed body once it exists.
#[derive(Clone)]
pub(crate) struct Slot {
    pub(crate) raw: Value,
    pub(crate) parsed: OnceCell<Rc<NodeBody>>,
}

impl Slot {
    pub(crate) fn new(raw: Value) -> Self {
        Slot {
            raw,
            parsed: OnceCell::new(),
        }
    }

    pub(crate) fn parsed(raw: Value, body: Rc<NodeBody>) -> Self {
        Slot {
            raw,
            parsed: OnceCell::from(body),
        }
    }
}

/// Children of a body. Sequences are index-keyed, mappings name-keyed.
#[derive(Clone)]
pub(crate) enum Shape {
    Sequence(Vector<Slot>),
    Mapping(Vector<(String, Slot)>),
}

impl Shape {
    fn slot(&self, key: &Key) -> Option<&Slot> {
        match self {
            Shape::Sequence(slots) => key.as_index().and_then(|i| slots.get(i)),
            Shape::Mapping(members) => {
                let name = key.to_name();
                members.iter().find(|(k, _)| *k == name).map(|(_, slot)| slot)
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Shape::Sequence(slots) => slots.len(),
            Shape::Mapping(members) => members.len(),
        }
    }

    fn keys(&self) -> Vec<Key> {
        match self {
            Shape::Sequence(slots) => (0..slots.len()).map(Key::Index).collect(),
            Shape::Mapping(members) => members.iter().map(|(k, _)| Key::Name(k.clone())).collect(),
        }
    }

    /// Wire value over the slots' shared values; one level is copied.
    fn to_value(&self) -> Value {
        match self {
            Shape::Sequence(slots) => Value::array(slots.iter().map(|s| s.raw.clone()).collect()),
            Shape::Mapping(members) => {
                Value::object(members.iter().map(|(k, s)| (k.clone(), s.raw.clone())).collect())
            }
        }
    }
}

/// Frozen contents of one node. Built only by the [`Engine`].
pub(crate) struct NodeBody {
    pub(crate) class: NodeClass,
    pub(crate) shape: Shape,
    /// Wire value of the whole node, sharing storage with the slots' values.
    pub(crate) value: Value,
    pub(crate) meta: Meta,
    pub(crate) engine: Engine,
}

struct Location {
    parent: Node,
    key: Option<Key>,
}

/// A node reached through a particular path of a particular tree.
///
/// Cloning a handle is cheap and yields the same node; use [`Node::detach`]
/// for a positionless copy.
#[derive(Clone)]
pub struct Node {
    body: Rc<NodeBody>,
    location: Option<Rc<Location>>,
}

/// What a key resolves to: a wrapped container or a plain scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Node(Node),
    Value(Value),
}

impl Child {
    pub fn into_node(self) -> Option<Node> {
        match self {
            Child::Node(node) => Some(node),
            Child::Value(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Child::Node(node) => Some(node),
            Child::Value(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Child::Node(node) => node.to_value(),
            Child::Value(value) => value.clone(),
        }
    }
}

impl Node {
    pub(crate) fn new(body: Rc<NodeBody>, parent: Option<&Node>, key: Option<Key>) -> Self {
        Node {
            body,
            location: parent.map(|parent| {
                Rc::new(Location {
                    parent: parent.clone(),
                    key,
                })
            }),
        }
    }

    pub fn class(&self) -> NodeClass {
        self.body.class
    }

    /// Key this node was read under, `None` for roots and keyless parses.
    pub fn key(&self) -> Option<&Key> {
        self.location.as_ref().and_then(|loc| loc.key.as_ref())
    }

    pub fn meta(&self) -> &Meta {
        &self.body.meta
    }

    pub fn engine(&self) -> &Engine {
        &self.body.engine
    }

    pub fn is_root(&self) -> bool {
        self.location.is_none()
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.body.shape, Shape::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.body.shape, Shape::Mapping(_))
    }

    pub fn len(&self) -> usize {
        self.body.shape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<Key> {
        self.body.shape.keys()
    }

    /// Read a child, materializing it on first access. Undefined keys are
    /// `None`.
    pub fn get(&self, key: impl Into<Key>) -> Option<Child> {
        let key = key.into();
        let body = &self.body;
        let slot = body.shape.slot(&key)?;
        if !slot.raw.is_container() {
            return Some(Child::Value(slot.raw.clone()));
        }
        let child = slot
            .parsed
            .get_or_init(|| body.engine.materialize(&slot.raw, body.class, &key, &body.meta))
            .clone();
        Some(Child::Node(Node::new(child, Some(self), Some(key))))
    }

    /// Read a container child as a node.
    pub fn node(&self, key: impl Into<Key>) -> Option<Node> {
        self.get(key).and_then(Child::into_node)
    }

    /// Wire value of a child, without materializing it.
    pub fn value(&self, key: impl Into<Key>) -> Option<&Value> {
        self.body.shape.slot(&key.into()).map(|slot| &slot.raw)
    }

    /// All children in key order.
    pub fn children(&self) -> impl Iterator<Item = Child> + '_ {
        self.keys().into_iter().filter_map(move |key| self.get(key))
    }

    /// Whether the child under `key` has been parsed into a body yet.
    pub fn is_materialized(&self, key: impl Into<Key>) -> bool {
        self.body
            .shape
            .slot(&key.into())
            .is_some_and(|slot| slot.parsed.get().is_some())
    }

    /// True when both handles wrap the very same body instance.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }

    /// Projection back to plain data, in wire order. The result shares
    /// storage with the tree, so this is O(1).
    pub fn to_value(&self) -> Value {
        self.body.value.clone()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(&self.body.value)
    }

    /// Structural equality of the plain-data projections.
    pub fn equals(&self, other: &Node) -> bool {
        self.ptr_eq(other) || self.body.value == other.body.value
    }

    /// Same class and content, detached from any tree position.
    pub fn detach(&self) -> Node {
        let body = &self.body;
        let copy = body
            .engine
            .assemble(body.class, body.shape.clone(), body.meta.clone(), body.value.clone());
        Node::new(copy, None, None)
    }

    /// Wrap `data` as a child of this node under `key`, using the engine's
    /// class resolution unless `hint` names a class.
    pub fn parse(&self, data: impl Into<Value>, key: Option<Key>, hint: Option<NodeClass>) -> Child {
        self.body
            .engine
            .parse_child(data.into(), &self.body.meta, Some(self), key, hint)
    }

    /// The owning node, with this node written into its slot if it differs
    /// from what the owner currently holds there.
    pub fn parent(&self) -> Option<Node> {
        let location = self.location.as_deref()?;
        Some(self.class().relink(self, &location.parent, location.key.as_ref()))
    }

    pub fn root(&self) -> Node {
        let mut node = self.clone();
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// New version of this node with `value` parsed under `key`.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Node {
        let key = key.into();
        let child = self.parse(value, Some(key.clone()), None);
        self.write_slot(&key, child)
    }

    /// New version of this node's parent with `value`, parsed as this node's
    /// class, in this node's slot.
    pub fn replace(&self, value: impl Into<Value>) -> Result<Node, NodeError> {
        let (parent, key) = self.slot_location().ok_or(NodeError::ReplaceWithoutParent)?;
        let child = parent.parse(value, Some(key.clone()), Some(self.class()));
        Ok(parent.write_slot(key, child))
    }

    /// New version of this sequence with `value` appended.
    pub fn add(&self, value: impl Into<Value>) -> Result<Node, NodeError> {
        match &self.body.shape {
            Shape::Mapping(_) => Err(NodeError::AddToMapping),
            Shape::Sequence(slots) => {
                let key = Key::Index(slots.len());
                let child = self.parse(value, Some(key.clone()), None);
                Ok(self.write_slot(&key, child))
            }
        }
    }

    /// New version of this node's parent without this node.
    pub fn remove(&self) -> Result<Node, NodeError> {
        let (parent, key) = self.slot_location().ok_or(NodeError::RemoveWithoutParent)?;
        Ok(parent.remove_key(key.clone()))
    }

    /// New version of this node without the child under `key`. Missing keys
    /// leave the node unchanged.
    pub fn remove_key(&self, key: impl Into<Key>) -> Node {
        let key = key.into();
        let shape = match &self.body.shape {
            Shape::Sequence(slots) => match key.as_index().filter(|i| *i < slots.len()) {
                Some(index) => Shape::Sequence(sequence::remove(slots, index)),
                None => return self.clone(),
            },
            Shape::Mapping(members) => match mapping::remove(members, &key.to_name()) {
                Some(members) => Shape::Mapping(members),
                None => return self.clone(),
            },
        };
        self.rebuilt(shape)
    }

    /// A `class` node over `data`, parked under `key` of this node without
    /// touching this node's own slot until `parent()` is asked for.
    pub(crate) fn view(&self, key: Key, data: Value, class: NodeClass) -> Node {
        let body = self.body.engine.build(&data, class, &self.body.meta);
        Node::new(body, Some(self), Some(key))
    }

    /// Write `node` into `parent` under `key`, the default for `parent()`.
    pub(crate) fn relink_into(&self, parent: &Node, key: Option<&Key>) -> Node {
        match key {
            Some(key) => parent.write_slot(key, Child::Node(self.clone())),
            None => parent.clone(),
        }
    }

    /// Whether the slot under `key` already holds exactly `value`.
    pub(crate) fn holds(&self, key: &Key, value: &Value) -> bool {
        self.body.shape.slot(key).is_some_and(|slot| slot.raw.same(value))
    }

    /// New version of this node with `child` stored under `key`. Returns this
    /// node unchanged when the slot already holds the same body or literally
    /// the same value.
    pub(crate) fn write_slot(&self, key: &Key, child: Child) -> Node {
        let body = &self.body;
        let (raw, prebuilt) = match child {
            Child::Node(node) => (node.body.value.clone(), Some(node.body)),
            Child::Value(value) => (value, None),
        };

        if let Some(existing) = body.shape.slot(key) {
            let same_body = match (&prebuilt, existing.parsed.get()) {
                (Some(new), Some(old)) => Rc::ptr_eq(new, old),
                _ => false,
            };
            if same_body || existing.raw.same(&raw) {
                return self.clone();
            }
        }

        let slot = body.engine.slot(raw, body.class, key, &body.meta, prebuilt);
        let shape = match &body.shape {
            Shape::Sequence(slots) => match key.as_index() {
                Some(index) => Shape::Sequence(sequence::set(slots, index, slot)),
                None => {
                    warn!(%key, class = ?body.class, "ignoring non-index key on a sequence node");
                    return self.clone();
                }
            },
            Shape::Mapping(members) => Shape::Mapping(mapping::set(members, key.to_name(), slot)),
        };
        self.rebuilt(shape)
    }

    fn slot_location(&self) -> Option<(&Node, &Key)> {
        let location = self.location.as_deref()?;
        Some((&location.parent, location.key.as_ref()?))
    }

    fn rebuilt(&self, shape: Shape) -> Node {
        let body = &self.body;
        let value = shape.to_value();
        Node {
            body: body.engine.assemble(body.class, shape, body.meta.clone(), value),
            location: self.location.clone(),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("class", &self.body.class)
            .field("key", &self.key())
            .field("value", &serde_json::Value::from(&self.body.value))
            .finish()
    }
}
