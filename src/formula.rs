//! Computed amounts.
//!
//! A dynamic transaction does not carry a literal value, it carries a
//! chain of signed operations over named references:
//!
//! ```text
//! rent - (utilities - rebate)
//!
//! { reference: rent, operation: minus, on:
//!     { reference: utilities, operation: minus, on:
//!         { reference: rebate, operation: none } } }
//! ```
//!
//! The chain may be arbitrarily long. Resolving it never fails: a
//! reference that cannot be found (the formula is being edited, or the
//! name was never selected) contributes zero.

use std::fmt;

use log::trace;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::amount::Amount;
use crate::error::InputError;

/// Value the editor stores in `reference` when nothing was selected.
pub const UNSET_REFERENCE: &str = "select";

/// Remaining stack below which serializing a level allocates a new
/// segment, and the size of that segment.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_SEGMENT: usize = 1024 * 1024;

/// Where a reference gets its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhereFrom {
    /// Declared in the transaction's own reference list.
    #[default]
    Transaction,
    #[serde(other)]
    Other,
}

/// A named value usable inside a computed amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub name: String,
    #[serde(default)]
    pub value: Amount,
    #[serde(default)]
    pub where_from: WhereFrom,
}

impl Reference {
    pub fn new(name: &str, value: Amount) -> Reference {
        Reference {
            name: name.to_string(),
            value,
            where_from: WhereFrom::Transaction,
        }
    }
}

/// Anything a formula can look its references up in.
pub trait ReferenceSource {
    fn lookup(&self, name: &str) -> Option<Amount>;
}

impl ReferenceSource for [Reference] {
    /// The first reference with a matching name wins.
    fn lookup(&self, name: &str) -> Option<Amount> {
        self.iter().find(|r| r.name == name).map(|r| r.value)
    }
}

/// The operation a node applies between its own reference and the
/// value of its child.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    None,
    Plus(Box<OperationNode>),
    Minus(Box<OperationNode>),
}

impl Operation {
    /// Detaches the child, leaving `None` behind.
    fn take_child(&mut self) -> Option<Box<OperationNode>> {
        match std::mem::take(self) {
            Operation::None => None,
            Operation::Plus(c) | Operation::Minus(c) => Some(c),
        }
    }
}

/// Operation selector, without the child node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    None,
    Plus,
    Minus,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::None => "none",
            OperationKind::Plus => "plus",
            OperationKind::Minus => "minus",
        }
    }
}

/// One level of a computed amount.
///
/// A child exists iff the operation is `Plus` or `Minus`, the type
/// makes the other combinations unrepresentable.
///
/// Chains can be arbitrarily deep, so dropping, cloning, comparing and
/// formatting walk the chain in a loop instead of recursing per level.
#[derive(Default, Deserialize)]
#[serde(try_from = "RawOperationNode")]
pub struct OperationNode {
    pub reference: Option<String>,
    pub operation: Operation,
}

impl OperationNode {
    /// A node with nothing selected, the state a fresh child starts in.
    pub fn unset() -> OperationNode {
        OperationNode::default()
    }

    /// A terminal node referencing `name`.
    pub fn leaf(name: &str) -> OperationNode {
        OperationNode {
            reference: Some(name.to_string()),
            operation: Operation::None,
        }
    }

    /// `name + on`
    pub fn plus(name: &str, on: OperationNode) -> OperationNode {
        OperationNode {
            reference: Some(name.to_string()),
            operation: Operation::Plus(Box::new(on)),
        }
    }

    /// `name - on`
    pub fn minus(name: &str, on: OperationNode) -> OperationNode {
        OperationNode {
            reference: Some(name.to_string()),
            operation: Operation::Minus(Box::new(on)),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self.operation {
            Operation::None => OperationKind::None,
            Operation::Plus(_) => OperationKind::Plus,
            Operation::Minus(_) => OperationKind::Minus,
        }
    }

    pub fn child(&self) -> Option<&OperationNode> {
        match &self.operation {
            Operation::None => None,
            Operation::Plus(c) | Operation::Minus(c) => Some(c.as_ref()),
        }
    }

    pub fn set_reference(&mut self, name: Option<&str>) {
        self.reference = name.map(str::to_string);
    }

    /// Changes the operation of this node.
    ///
    /// Selecting `Plus` or `Minus` always installs a fresh unset child,
    /// whatever was below this node before is discarded so that stale
    /// deeper fragments can not come back. Selecting `None` drops the
    /// child.
    pub fn set_operation(&mut self, kind: OperationKind) {
        self.operation = match kind {
            OperationKind::None => Operation::None,
            OperationKind::Plus => Operation::Plus(Box::new(OperationNode::unset())),
            OperationKind::Minus => Operation::Minus(Box::new(OperationNode::unset())),
        };
    }

    /// This node followed by every node below it.
    pub fn levels(&self) -> impl Iterator<Item = &OperationNode> {
        std::iter::successors(Some(self), |n| n.child())
    }

    /// Number of operations below the root, a lone node has depth 0.
    pub fn depth(&self) -> usize {
        self.levels().count() - 1
    }

    /// Returns the node `depth` levels below this one.
    pub fn node_at_mut(&mut self, depth: usize) -> Option<&mut OperationNode> {
        let mut node = self;
        for _ in 0..depth {
            node = match &mut node.operation {
                Operation::None => return None,
                Operation::Plus(c) | Operation::Minus(c) => &mut **c,
            };
        }
        Some(node)
    }
}

impl Drop for OperationNode {
    fn drop(&mut self) {
        let mut next = self.operation.take_child();
        while let Some(mut child) = next {
            next = child.operation.take_child();
        }
    }
}

impl Clone for OperationNode {
    fn clone(&self) -> Self {
        let levels = self.levels().collect::<Vec<_>>();

        let mut below: Option<OperationNode> = None;
        for n in levels.into_iter().rev() {
            let operation = match (&n.operation, below.take()) {
                (Operation::Plus(_), Some(c)) => Operation::Plus(Box::new(c)),
                (Operation::Minus(_), Some(c)) => Operation::Minus(Box::new(c)),
                _ => Operation::None,
            };
            below = Some(OperationNode {
                reference: n.reference.clone(),
                operation,
            });
        }

        below.unwrap_or_default()
    }
}

impl PartialEq for OperationNode {
    fn eq(&self, other: &Self) -> bool {
        self.levels()
            .map(|n| (&n.reference, n.kind()))
            .eq(other.levels().map(|n| (&n.reference, n.kind())))
    }
}

impl Eq for OperationNode {}

impl fmt::Debug for OperationNode {
    /// Formats the chain as a flat list of `(reference, operation)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.levels().map(|n| (n.reference.as_deref(), n.kind())))
            .finish()
    }
}

/// Writes the editor shape. Each level is a nested object, the stack is
/// grown on demand while descending.
impl Serialize for OperationNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            let child = self.child();
            let len = if child.is_some() { 3 } else { 2 };

            let mut st = serializer.serialize_struct("OperationNode", len)?;
            st.serialize_field(
                "reference",
                self.reference.as_deref().unwrap_or(UNSET_REFERENCE),
            )?;
            st.serialize_field("operation", self.kind().as_str())?;
            if let Some(c) = child {
                st.serialize_field("on", c)?;
            }
            st.end()
        })
    }
}

/// Evaluates a computed amount against a set of references.
///
/// Each node contributes its referenced value multiplied by the
/// accumulated sign of the operations above it, so the result is
/// `Σ sign_i * value_i`. A chain of depth `d` costs `d + 1` lookups,
/// minus one for every node whose reference is `None` (written `""` or
/// `"select"` by the editor): those contribute zero without asking
/// `refs`. The walk is
/// a loop, the depth of the chain is not limited by the stack.
pub fn resolve<R>(node: &OperationNode, refs: &R) -> Amount
where
    R: ReferenceSource + ?Sized,
{
    let mut total = Amount::ZERO;
    let mut negative = false;
    let mut current = Some(node);
    let mut level = 0usize;

    while let Some(n) = current {
        let value = Amount::or_zero(n.reference.as_deref().and_then(|name| refs.lookup(name)));
        trace!(
            "formula level {level}: {:?} = {value} ({})",
            n.reference,
            if negative { "-" } else { "+" }
        );
        total += if negative { -value } else { value };

        current = match &n.operation {
            Operation::None => None,
            Operation::Plus(c) => Some(c.as_ref()),
            Operation::Minus(c) => {
                negative = !negative;
                Some(c.as_ref())
            }
        };
        level += 1;
    }

    total
}

/// Editor shape of a node, as stored by the form layer.
#[derive(Deserialize)]
struct RawOperationNode {
    #[serde(default)]
    reference: String,
    #[serde(default = "raw_none")]
    operation: String,
    #[serde(default)]
    on: Option<Box<OperationNode>>,
}

fn raw_none() -> String {
    String::from("none")
}

impl TryFrom<RawOperationNode> for OperationNode {
    type Error = InputError;

    fn try_from(raw: RawOperationNode) -> Result<Self, Self::Error> {
        let reference = match raw.reference.as_str() {
            "" | UNSET_REFERENCE => None,
            _ => Some(raw.reference),
        };

        let operation = match (raw.operation.as_str(), raw.on) {
            // a child left behind under `none` is not part of the formula
            ("none", _) => Operation::None,
            ("plus", Some(on)) => Operation::Plus(on),
            ("minus", Some(on)) => Operation::Minus(on),
            ("plus" | "minus", None) => {
                return Err(InputError::MissingOperand(raw.operation.clone()));
            }
            (other, _) => return Err(InputError::UnknownOperation(other.to_string())),
        };

        Ok(OperationNode {
            reference,
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use pretty_assertions::assert_eq;
    use rust_decimal::dec;

    use crate::amount;

    fn refs() -> Vec<Reference> {
        vec![
            Reference::new("rent", amount!(1200)),
            Reference::new("utilities", amount!(150.50)),
            Reference::new("rebate", amount!(20)),
        ]
    }

    /// Counts how many times the resolver asks for a reference.
    struct Counting<'a> {
        inner: &'a [Reference],
        calls: Cell<usize>,
    }

    impl ReferenceSource for Counting<'_> {
        fn lookup(&self, name: &str) -> Option<Amount> {
            self.calls.set(self.calls.get() + 1);
            self.inner.lookup(name)
        }
    }

    #[test]
    fn test_resolve_leaf() {
        let refs = refs();
        let node = OperationNode::leaf("rent");
        assert_eq!(resolve(&node, refs.as_slice()), amount!(1200));
    }

    #[test]
    fn test_resolve_nested_signs() {
        let refs = refs();
        // rent - (utilities - rebate) = rent - utilities + rebate
        let node = OperationNode::minus(
            "rent",
            OperationNode::minus("utilities", OperationNode::leaf("rebate")),
        );
        assert_eq!(resolve(&node, refs.as_slice()), amount!(1069.50));

        // rent + (utilities - rebate)
        let node = OperationNode::plus(
            "rent",
            OperationNode::minus("utilities", OperationNode::leaf("rebate")),
        );
        assert_eq!(resolve(&node, refs.as_slice()), amount!(1330.50));
    }

    #[test]
    fn test_unknown_reference_is_zero() {
        let refs = refs();
        let node = OperationNode::plus(
            "rent",
            OperationNode::minus("nope", OperationNode::leaf("rebate")),
        );
        // 1200 + (0 - 20)
        assert_eq!(resolve(&node, refs.as_slice()), amount!(1180));

        let mut unset = OperationNode::leaf("rent");
        unset.set_operation(OperationKind::Plus);
        assert_eq!(resolve(&unset, refs.as_slice()), amount!(1200));
    }

    #[test]
    fn test_lookups_per_depth() {
        let refs = refs();
        let names = ["rent", "utilities", "rebate"];

        let depth = 50;
        let mut node = OperationNode::leaf("rent");
        for i in 0..depth {
            let name = names[i % names.len()];
            node = if i % 2 == 0 {
                OperationNode::plus(name, node)
            } else {
                OperationNode::minus(name, node)
            };
        }
        assert_eq!(node.depth(), depth);

        let counting = Counting {
            inner: &refs,
            calls: Cell::new(0),
        };
        resolve(&node, &counting);
        assert_eq!(counting.calls.get(), depth + 1);
    }

    #[test]
    fn test_unset_references_are_not_looked_up() {
        let refs = refs();
        // rent + (<unset> - rebate)
        let mut node = OperationNode::plus(
            "rent",
            OperationNode::minus("utilities", OperationNode::leaf("rebate")),
        );
        node.node_at_mut(1).unwrap().set_reference(None);

        let counting = Counting {
            inner: &refs,
            calls: Cell::new(0),
        };
        assert_eq!(resolve(&node, &counting), amount!(1180));
        assert_eq!(counting.calls.get(), node.depth());
    }

    fn deep_chain(depth: usize) -> OperationNode {
        let mut node = OperationNode::leaf("one");
        for i in 0..depth {
            node = if i % 2 == 0 {
                OperationNode::plus("one", node)
            } else {
                OperationNode::minus("one", node)
            };
        }
        node
    }

    #[test]
    fn test_deep_chain() {
        let refs = vec![Reference::new("one", amount!(1))];
        let depth = 2_000;
        let mut node = OperationNode::leaf("one");
        for _ in 0..depth {
            node = OperationNode::plus("one", node);
        }
        assert_eq!(
            resolve(&node, refs.as_slice()),
            Amount::from(depth as i64 + 1)
        );
    }

    #[test]
    fn test_deep_chain_clone_compare_drop() {
        let depth = 200_000;
        let node = deep_chain(depth);

        let copy = node.clone();
        assert_eq!(copy.depth(), depth);
        assert!(copy == node);

        let mut other = node.clone();
        other
            .node_at_mut(depth)
            .unwrap()
            .set_reference(Some("two"));
        assert!(other != node);
        assert!(deep_chain(depth - 1) != node);

        drop(copy);
        drop(other);
        drop(node);
    }

    #[test]
    fn test_deep_chain_serializes() {
        let node = deep_chain(20_000);
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.starts_with(r#"{"reference":"one","operation":"minus","on":{"#));
        assert_eq!(json.matches(r#""on":"#).count(), 20_000);
    }

    #[test]
    fn test_debug_is_flat() {
        let node = OperationNode::minus("rent", OperationNode::unset());
        assert_eq!(
            format!("{:?}", node),
            r#"[(Some("rent"), Minus), (None, None)]"#
        );
    }

    #[test]
    fn test_set_operation_resets_child() {
        // a + (b - (c + d))
        let mut node = OperationNode::plus(
            "a",
            OperationNode::minus("b", OperationNode::plus("c", OperationNode::leaf("d"))),
        );
        assert_eq!(node.depth(), 3);

        let mid = node.node_at_mut(1).unwrap();
        assert_eq!(mid.kind(), OperationKind::Minus);
        mid.set_operation(OperationKind::Plus);

        let mid = node.node_at_mut(1).unwrap();
        assert_eq!(mid.reference.as_deref(), Some("b"));
        assert_eq!(mid.child(), Some(&OperationNode::unset()));
        assert_eq!(mid.child().unwrap().kind(), OperationKind::None);
        assert_eq!(node.depth(), 2);

        node.set_operation(OperationKind::None);
        assert_eq!(node.depth(), 0);
        assert_eq!(node.child(), None);
    }

    #[test]
    fn test_node_at_mut_out_of_range() {
        let mut node = OperationNode::plus("a", OperationNode::leaf("b"));
        assert!(node.node_at_mut(2).is_none());

        node.node_at_mut(1).unwrap().set_reference(Some("c"));
        assert_eq!(node.child().unwrap().reference.as_deref(), Some("c"));
    }

    #[test]
    fn test_deserialize_editor_shape() {
        let json = r#"{
            "reference": "rent",
            "operation": "minus",
            "on": { "reference": "select", "operation": "none" }
        }"#;
        let node: OperationNode = serde_json::from_str(json).unwrap();
        assert_eq!(
            node,
            OperationNode {
                reference: Some("rent".into()),
                operation: Operation::Minus(Box::new(OperationNode::unset())),
            }
        );

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(
            back,
            serde_json::json!({
                "reference": "rent",
                "operation": "minus",
                "on": { "reference": "select", "operation": "none" }
            })
        );
    }

    #[test]
    fn test_missing_operand_is_rejected() {
        let json = r#"{ "reference": "rent", "operation": "plus" }"#;
        let err = serde_json::from_str::<OperationNode>(json).unwrap_err();
        assert!(err.to_string().contains("requires a nested"));

        let json = r#"{ "reference": "rent", "operation": "times", "on": {} }"#;
        assert!(serde_json::from_str::<OperationNode>(json).is_err());
    }

    #[test]
    fn test_stale_child_under_none_is_dropped() {
        let json = r#"{
            "reference": "rent",
            "operation": "none",
            "on": { "reference": "utilities", "operation": "none" }
        }"#;
        let node: OperationNode = serde_json::from_str(json).unwrap();
        assert_eq!(node, OperationNode::leaf("rent"));
        assert_eq!(resolve(&node, refs().as_slice()), Amount::new(dec!(1200)));
    }
}
