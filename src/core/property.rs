//! Properties: the typed input/output slots of a node.
//!
//! A property is created from a [`PropertyDescriptor`] when its node is
//! constructed. From then on its identity (id, name, direction, type, owner)
//! is fixed; only its value, its connected flag and its UI frame change, and
//! only through the [`Graph`](crate::graph::Graph).

use crate::core::error::{GraphError, NodeId, PropertyId};
use crate::core::types::{PropertyType, Value};
use serde::{Deserialize, Serialize};

/// Direction of a property (input or output).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PropertyDirection {
    /// Receives values from at most one connection
    Input,
    /// Produces values for any number of connections
    Output,
}

/// Screen rectangle the UI attached to a property.
///
/// Stored for the UI's own hit-testing; the engine never reads it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Frame {
    /// Create a frame from its origin and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// Constraints checked when a value is set on a property from outside.
///
/// Values arriving through a connection are not re-checked: the upstream
/// output already produced them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "params")]
pub enum Constraint {
    /// Numeric value must be within range [min, max]
    Range {
        /// Lower bound, inclusive
        min: f64,
        /// Upper bound, inclusive
        max: f64,
    },
    /// Numeric value must be >= min
    MinValue(f64),
    /// Numeric value must be <= max
    MaxValue(f64),
    /// Textual value must not be empty
    NotEmpty,
    /// Textual value length must be <= max
    MaxLength(usize),
    /// Value must be one of the specified options
    OneOf(Vec<Value>),
}

impl Constraint {
    /// Validate a value against this constraint.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            Constraint::Range { min, max } => {
                if let Some(num) = value.as_number() {
                    if num < *min || num > *max {
                        return Err(format!("Value {} is out of range [{}, {}]", num, min, max));
                    }
                }
            }
            Constraint::MinValue(min) => {
                if let Some(num) = value.as_number() {
                    if num < *min {
                        return Err(format!("Value {} is below minimum {}", num, min));
                    }
                }
            }
            Constraint::MaxValue(max) => {
                if let Some(num) = value.as_number() {
                    if num > *max {
                        return Err(format!("Value {} is above maximum {}", num, max));
                    }
                }
            }
            Constraint::NotEmpty => {
                if value.as_str().map_or(false, str::is_empty) {
                    return Err("Value must not be empty".to_string());
                }
            }
            Constraint::MaxLength(max_len) => {
                if let Some(len) = value.as_str().map(|s| s.chars().count()) {
                    if len > *max_len {
                        return Err(format!("Length {} is above maximum {}", len, max_len));
                    }
                }
            }
            Constraint::OneOf(options) => {
                if !options.contains(value) {
                    return Err(format!("Value {} is not one of the allowed options", value));
                }
            }
        }
        Ok(())
    }
}

/// Declaration of a property, handed to a node at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Name shown next to the socket
    pub name: String,
    /// Kinds this property carries
    pub property_type: PropertyType,
    /// Initial value
    pub value: Option<Value>,
    /// Whether the property exposes a socket at all
    pub has_socket: bool,
    /// Constraints for externally set values
    pub constraints: Vec<Constraint>,
}

impl PropertyDescriptor {
    /// Create a new descriptor with a socket and no initial value.
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            value: None,
            has_socket: true,
            constraints: Vec::new(),
        }
    }

    /// Shorthand for a number property.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, PropertyType::NUMBER)
    }

    /// Set the initial value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Mark the property as edit-only (no socket, never connectable).
    pub fn without_socket(mut self) -> Self {
        self.has_socket = false;
        self
    }

    /// Add a range constraint.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.constraints.push(Constraint::Range { min, max });
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// A named, typed, directional value slot owned by a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    id: PropertyId,
    name: String,
    direction: PropertyDirection,
    property_type: PropertyType,
    value: Option<Value>,
    owner: NodeId,
    has_socket: bool,
    constraints: Vec<Constraint>,
    frame: Option<Frame>,
    connected: bool,
}

impl Property {
    /// Materialise a descriptor for a node. Called once by the node
    /// constructor, which is the only place `owner` is ever set.
    pub(crate) fn from_descriptor(
        descriptor: PropertyDescriptor,
        direction: PropertyDirection,
        owner: NodeId,
    ) -> Self {
        Self {
            id: PropertyId::new(),
            name: descriptor.name,
            direction,
            property_type: descriptor.property_type,
            value: descriptor.value,
            owner,
            has_socket: descriptor.has_socket,
            constraints: descriptor.constraints,
            frame: None,
            connected: false,
        }
    }

    /// Unique ID of this property.
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// Name shown next to the socket.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is an input or an output.
    pub fn direction(&self) -> PropertyDirection {
        self.direction
    }

    /// Check if this is an input.
    pub fn is_input(&self) -> bool {
        self.direction == PropertyDirection::Input
    }

    /// Check if this is an output.
    pub fn is_output(&self) -> bool {
        self.direction == PropertyDirection::Output
    }

    /// Kinds this property carries.
    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    /// Current value, `None` when unset.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// ID of the node this property belongs to.
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Whether the property can take part in connections at all.
    pub fn has_socket(&self) -> bool {
        self.has_socket
    }

    /// Constraints checked on external writes.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Frame last stored by the UI.
    pub fn frame(&self) -> Option<Frame> {
        self.frame
    }

    /// True iff a live connection targets this property.
    ///
    /// Only inputs are ever occupied; outputs fan out freely and always
    /// report `false` here.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Check a value against this property's type and constraints.
    pub fn check_value(
        &self,
        value: &Value,
        check_type: bool,
        check_constraints: bool,
    ) -> Result<(), GraphError> {
        if check_type && !self.property_type.admits(value) {
            return Err(GraphError::ValueTypeMismatch {
                name: self.name.clone(),
                expected: self.property_type,
                got: value.kind(),
            });
        }
        if check_constraints {
            for constraint in &self.constraints {
                constraint
                    .validate(value)
                    .map_err(|error| GraphError::ConstraintViolation {
                        name: self.name.clone(),
                        error,
                    })?;
            }
        }
        Ok(())
    }

    /// Replace the value, returning whether it actually changed.
    pub(crate) fn replace_value(&mut self, value: Option<Value>) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub(crate) fn set_frame(&mut self, frame: Option<Frame>) {
        self.frame = frame;
    }
}

/// Order two properties into `(output, input)`.
///
/// Returns `None` when both share a direction (which includes comparing a
/// property with itself).
pub fn resolve_roles<'a>(a: &'a Property, b: &'a Property) -> Option<(&'a Property, &'a Property)> {
    match (a.direction, b.direction) {
        (PropertyDirection::Output, PropertyDirection::Input) => Some((a, b)),
        (PropertyDirection::Input, PropertyDirection::Output) => Some((b, a)),
        _ => None,
    }
}

/// Whether two properties could be linked on type grounds alone.
///
/// Roles are resolved first; the input's type-set must then be a superset of
/// the output's.
pub fn is_compatible(a: &Property, b: &Property) -> bool {
    resolve_roles(a, b)
        .map(|(output, input)| input.property_type.accepts(output.property_type))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(name: &str, ty: PropertyType, direction: PropertyDirection) -> Property {
        Property::from_descriptor(PropertyDescriptor::new(name, ty), direction, NodeId::new())
    }

    #[test]
    fn test_resolve_roles_orders_output_first() {
        let out = make("out", PropertyType::NUMBER, PropertyDirection::Output);
        let inp = make("in", PropertyType::NUMBER, PropertyDirection::Input);

        let (o, i) = resolve_roles(&inp, &out).unwrap();
        assert_eq!(o.id(), out.id());
        assert_eq!(i.id(), inp.id());
        assert!(resolve_roles(&out, &out).is_none());
        assert!(resolve_roles(&inp, &inp).is_none());
    }

    #[test]
    fn test_compatibility_is_role_aware() {
        let wide_in = make("in", PropertyType::IMAGE_CONTENT, PropertyDirection::Input);
        let narrow_out = make("out", PropertyType::IMAGE, PropertyDirection::Output);
        assert!(is_compatible(&narrow_out, &wide_in));
        assert!(is_compatible(&wide_in, &narrow_out));

        let wide_out = make("out", PropertyType::IMAGE_CONTENT, PropertyDirection::Output);
        let narrow_in = make("in", PropertyType::IMAGE, PropertyDirection::Input);
        assert!(!is_compatible(&wide_out, &narrow_in));

        // Same direction never connects, whatever the types.
        let other_in = make("in2", PropertyType::IMAGE_CONTENT, PropertyDirection::Input);
        assert!(!is_compatible(&wide_in, &other_in));
    }

    #[test]
    fn test_check_value_type_and_constraints() {
        let prop = Property::from_descriptor(
            PropertyDescriptor::number("opacity").with_range(0.0, 1.0),
            PropertyDirection::Input,
            NodeId::new(),
        );

        assert!(prop.check_value(&Value::Number(0.5), true, true).is_ok());
        assert!(matches!(
            prop.check_value(&Value::Number(2.0), true, true),
            Err(GraphError::ConstraintViolation { .. })
        ));
        assert!(prop.check_value(&Value::Number(2.0), true, false).is_ok());
        assert!(matches!(
            prop.check_value(&Value::from("x"), true, true),
            Err(GraphError::ValueTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_constraints() {
        assert!(Constraint::NotEmpty.validate(&Value::from("")).is_err());
        assert!(Constraint::MaxLength(3).validate(&Value::from("abcd")).is_err());
        assert!(Constraint::MinValue(1.0).validate(&Value::Number(0.0)).is_err());
        assert!(Constraint::MaxValue(1.0).validate(&Value::Number(0.5)).is_ok());

        let one_of = Constraint::OneOf(vec![
            Value::Choice("add".into()),
            Value::Choice("multiply".into()),
        ]);
        assert!(one_of.validate(&Value::Choice("add".into())).is_ok());
        assert!(one_of.validate(&Value::Choice("sine".into())).is_err());
    }

    #[test]
    fn test_replace_value_reports_change() {
        let mut prop = make("x", PropertyType::NUMBER, PropertyDirection::Input);
        assert!(prop.replace_value(Some(Value::Number(1.0))));
        assert!(!prop.replace_value(Some(Value::Number(1.0))));
        assert!(prop.replace_value(None));
        assert!(prop.value().is_none());
    }
}
