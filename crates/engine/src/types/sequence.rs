use std::fmt;
use std::hash::{Hash, Hasher};

use sylva_tree::{ScalarValue, TreeNode};

use super::{AtomicValue, FunctionValue, ValueArray, ValueMap};
use crate::error::{EngineError, ErrorKind};

/// A single member of a sequence. An item is never itself a sequence, which
/// makes the flattening invariant structural.
#[derive(Debug, Clone)]
pub enum Item<N> {
    Node(N),
    Atomic(AtomicValue),
    Map(ValueMap<N>),
    Array(ValueArray<N>),
    Function(FunctionValue<N>),
}

impl<N: Clone> Item<N> {
    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }

    pub fn as_node(&self) -> Option<&N> {
        match self {
            Item::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_atomic(&self) -> Option<&AtomicValue> {
        match self {
            Item::Atomic(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap<N>> {
        match self {
            Item::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ValueArray<N>> {
        match self {
            Item::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionValue<N>> {
        match self {
            Item::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Item::Node(_) => "node()",
            Item::Atomic(a) => a.type_name(),
            Item::Map(_) => "map(*)",
            Item::Array(_) => "array(*)",
            Item::Function(_) => "function(*)",
        }
    }
}

impl<N: PartialEq + Clone> PartialEq for Item<N> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Item::Node(a), Item::Node(b)) => a == b,
            (Item::Atomic(a), Item::Atomic(b)) => a == b,
            (Item::Map(a), Item::Map(b)) => a == b,
            (Item::Array(a), Item::Array(b)) => a == b,
            (Item::Function(a), Item::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl<N: Eq + Clone> Eq for Item<N> {}

impl<N: Hash + Clone> Hash for Item<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Item::Node(n) => n.hash(state),
            Item::Atomic(a) => a.hash(state),
            Item::Map(m) => m.hash(state),
            Item::Array(a) => a.hash(state),
            Item::Function(f) => f.hash(state),
        }
    }
}

/// An ordered, flattened sequence of items: the result of every evaluation.
#[derive(Debug, Clone)]
pub struct Value<N> {
    items: Vec<Item<N>>,
}

impl<N: Clone> Value<N> {
    pub fn empty() -> Self {
        Self { items: vec![] }
    }

    pub fn from_item(item: Item<N>) -> Self {
        Self { items: vec![item] }
    }

    pub fn from_items(items: Vec<Item<N>>) -> Self {
        Self { items }
    }

    /// Concatenates several values into one flat sequence.
    pub fn from_values(values: Vec<Value<N>>) -> Self {
        let mut items = Vec::new();
        for v in values {
            items.extend(v.items);
        }
        Self { items }
    }

    pub fn from_atomic(value: AtomicValue) -> Self {
        Self::from_item(Item::Atomic(value))
    }

    pub fn from_node(node: N) -> Self {
        Self::from_item(Item::Node(node))
    }

    pub fn from_nodes(nodes: Vec<N>) -> Self {
        Self::from_items(nodes.into_iter().map(Item::Node).collect())
    }

    pub fn from_map(map: ValueMap<N>) -> Self {
        Self::from_item(Item::Map(map))
    }

    pub fn from_array(array: ValueArray<N>) -> Self {
        Self::from_item(Item::Array(array))
    }

    pub fn from_function(func: FunctionValue<N>) -> Self {
        Self::from_item(Item::Function(func))
    }

    pub fn from_bool(b: bool) -> Self {
        Self::from_atomic(AtomicValue::Boolean(b))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self::from_atomic(AtomicValue::String(s.into()))
    }

    pub fn from_integer(i: i64) -> Self {
        Self::from_atomic(AtomicValue::Integer(i))
    }

    pub fn from_double(d: f64) -> Self {
        Self::from_atomic(AtomicValue::Double(d))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[Item<N>] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Item<N>> {
        self.items
    }

    pub fn first(&self) -> Option<&Item<N>> {
        self.items.first()
    }

    /// The sequence's only item, or a cardinality error.
    pub fn single(&self) -> Result<&Item<N>, EngineError> {
        match self.items.len() {
            1 => Ok(&self.items[0]),
            0 => Err(EngineError::new(ErrorKind::EmptySequence)),
            n => Err(EngineError::new(ErrorKind::MultipleItems { count: n })),
        }
    }

    pub fn concat(self, other: Value<N>) -> Self {
        let mut items = self.items;
        items.extend(other.items);
        Self { items }
    }

    /// A short description of the sequence's shape for error messages.
    pub fn shape_name(&self) -> String {
        match self.items.len() {
            0 => "empty sequence".to_string(),
            1 => self.items[0].type_name().to_string(),
            n => format!("sequence of {} items", n),
        }
    }

    /// The effective boolean value per the value-algebra rules: empty is
    /// false; a leading node makes any non-empty sequence true; singleton
    /// booleans, numbers and strings convert; everything else is a type
    /// error rather than a guess.
    pub fn effective_boolean_value(&self) -> Result<bool, EngineError> {
        if self.items.is_empty() {
            return Ok(false);
        }
        if self.items[0].is_node() {
            return Ok(true);
        }
        if self.items.len() > 1 {
            return Err(EngineError::type_error(
                "a value with an effective boolean",
                self.shape_name(),
            ));
        }
        match &self.items[0] {
            Item::Atomic(AtomicValue::Boolean(b)) => Ok(*b),
            Item::Atomic(a) if a.is_numeric() => {
                let d = a.to_double();
                Ok(d != 0.0 && !d.is_nan())
            }
            Item::Atomic(AtomicValue::String(s)) | Item::Atomic(AtomicValue::UntypedAtomic(s)) => {
                Ok(!s.is_empty())
            }
            other => Err(EngineError::type_error(
                "a value with an effective boolean",
                other.type_name(),
            )),
        }
    }

    pub fn to_double(&self) -> f64 {
        match self.first() {
            Some(Item::Atomic(a)) => a.to_double(),
            _ => f64::NAN,
        }
    }

    pub fn to_string_value(&self) -> String {
        match self.first() {
            Some(Item::Atomic(a)) => a.to_string_value(),
            _ => String::new(),
        }
    }
}

impl<'a, N: TreeNode<'a> + 'a> Value<N> {
    pub fn to_nodes(&self) -> Vec<N> {
        self.items
            .iter()
            .filter_map(|item| item.as_node().copied())
            .collect()
    }

    /// Replaces every node with its typed value (string value if untyped)
    /// and re-flattens. Maps, arrays and function items have no atomized
    /// form; atomizing one is a type error, never a silent drop.
    pub fn atomize(&self) -> Result<Value<N>, EngineError> {
        let mut atoms = Vec::with_capacity(self.items.len());
        for item in &self.items {
            atoms.push(Item::Atomic(atomize_item(item)?));
        }
        Ok(Value::from_items(atoms))
    }
}

/// Atomizes one item; see [`Value::atomize`].
pub fn atomize_item<'a, N: TreeNode<'a> + 'a>(
    item: &Item<N>,
) -> Result<AtomicValue, EngineError> {
    match item {
        Item::Atomic(a) => Ok(a.clone()),
        Item::Node(node) => Ok(match node.typed_value() {
            Some(ScalarValue::String(s)) => AtomicValue::String(s),
            Some(ScalarValue::Boolean(b)) => AtomicValue::Boolean(b),
            Some(ScalarValue::Integer(i)) => AtomicValue::Integer(i),
            Some(ScalarValue::Double(d)) => AtomicValue::Double(d),
            None => AtomicValue::UntypedAtomic(node.string_value()),
        }),
        Item::Map(_) | Item::Array(_) | Item::Function(_) => Err(EngineError::type_error(
            "an atomizable item",
            item.type_name(),
        )),
    }
}

impl<N: PartialEq + Clone> PartialEq for Value<N> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<N: Eq + Clone> Eq for Value<N> {}

impl<N: Hash + Clone> Hash for Value<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.items.len().hash(state);
        for item in &self.items {
            item.hash(state);
        }
    }
}

impl<N: fmt::Debug + Clone> fmt::Display for Value<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            write!(f, "()")
        } else if self.items.len() == 1 {
            write!(f, "{:?}", self.items[0])
        } else {
            write!(f, "(")?;
            for (i, item) in self.items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:?}", item)?;
            }
            write!(f, ")")
        }
    }
}

impl<N: Clone> From<AtomicValue> for Value<N> {
    fn from(v: AtomicValue) -> Self {
        Self::from_atomic(v)
    }
}

impl<N: Clone> From<bool> for Value<N> {
    fn from(b: bool) -> Self {
        Self::from_bool(b)
    }
}

impl<N: Clone> From<i64> for Value<N> {
    fn from(i: i64) -> Self {
        Self::from_integer(i)
    }
}

impl<N: Clone> From<f64> for Value<N> {
    fn from(d: f64) -> Self {
        Self::from_double(d)
    }
}

impl<N: Clone> From<&str> for Value<N> {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sequence() {
        let v: Value<()> = Value::empty();
        assert!(v.is_empty());
        assert_eq!(v.len(), 0);
        assert!(!v.effective_boolean_value().unwrap());
    }

    #[test]
    fn flattening_is_structural() {
        let inner: Value<()> = Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(2)),
        ]);
        let outer = Value::from_values(vec![inner, Value::from_integer(3)]);
        assert_eq!(outer.len(), 3);
        // Re-flattening an already flat sequence changes nothing.
        let again = Value::from_values(vec![outer.clone()]);
        assert_eq!(again, outer);
    }

    #[test]
    fn effective_boolean_scalars() {
        assert!(Value::<()>::from_bool(true).effective_boolean_value().unwrap());
        assert!(!Value::<()>::from_bool(false).effective_boolean_value().unwrap());
        assert!(!Value::<()>::from_string("").effective_boolean_value().unwrap());
        assert!(Value::<()>::from_string("x").effective_boolean_value().unwrap());
        assert!(!Value::<()>::from_integer(0).effective_boolean_value().unwrap());
        assert!(Value::<()>::from_integer(1).effective_boolean_value().unwrap());
        assert!(
            !Value::<()>::from_double(f64::NAN)
                .effective_boolean_value()
                .unwrap()
        );
    }

    #[test]
    fn effective_boolean_bad_shapes() {
        let multi: Value<()> = Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(2)),
        ]);
        assert!(multi.effective_boolean_value().is_err());

        let map: Value<()> = Value::from_map(ValueMap::new());
        assert!(map.effective_boolean_value().is_err());
    }

    #[test]
    fn singleton_cardinality() {
        let v: Value<()> = Value::from_integer(7);
        assert!(v.single().is_ok());

        let empty: Value<()> = Value::empty();
        assert!(matches!(
            empty.single().unwrap_err().kind,
            ErrorKind::EmptySequence
        ));

        let two: Value<()> = Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(2)),
        ]);
        assert!(matches!(
            two.single().unwrap_err().kind,
            ErrorKind::MultipleItems { count: 2 }
        ));
    }

    #[test]
    fn atomize_nodes_and_errors() {
        use sylva_tree::tests::build_tree;

        let tree = build_tree();
        let v = Value::from_node(tree.node(2));
        let atomized = v.atomize().unwrap();
        assert_eq!(
            atomized.items()[0].as_atomic(),
            Some(&AtomicValue::Integer(1))
        );

        let untyped = Value::from_node(tree.node(3)).atomize().unwrap();
        assert_eq!(
            untyped.items()[0].as_atomic(),
            Some(&AtomicValue::UntypedAtomic("alpha".to_string()))
        );

        let v = Value::from_items(vec![
            Item::Node(tree.node(1)),
            Item::Map(ValueMap::new()),
        ]);
        assert!(v.atomize().is_err());
    }
}
