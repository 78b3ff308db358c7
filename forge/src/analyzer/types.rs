use std::collections::BTreeMap;
use std::fmt;

/// Best-effort static type of a Forge value.
#[derive(Debug, Clone, PartialEq)]
pub enum ForgeType {
  /// Nothing could be inferred.
  Unknown,
  /// Deliberately untyped, e.g. members of host modules. Fits everywhere.
  Any,
  /// No value at all. Fits into every other type.
  Never,
  /// Result of calls that produce no value.
  Void,
  Null,
  Boolean,
  Number,
  String,
  Duration,
  Array(Box<ForgeType>),
  /// Object literal shape. Open objects may gain properties at runtime.
  Object {
    properties: BTreeMap<String, ForgeType>,
    open: bool,
  },
  Function {
    params: usize,
    required: usize,
    returns: Box<ForgeType>,
  },
  /// Capability module namespace, e.g. `Math`.
  Module(String),
}

impl ForgeType {
  pub fn array(element: ForgeType) -> Self {
    ForgeType::Array(Box::new(element))
  }

  pub fn function(params: usize, required: usize, returns: ForgeType) -> Self {
    ForgeType::Function {
      params,
      required,
      returns: Box::new(returns),
    }
  }

  /// Types that never cause a mismatch warning.
  pub fn is_unconstrained(&self) -> bool {
    matches!(self, ForgeType::Unknown | ForgeType::Any | ForgeType::Never)
  }

  pub fn is_numeric(&self) -> bool {
    matches!(self, ForgeType::Number | ForgeType::Duration)
  }

  pub fn is_callable(&self) -> bool {
    matches!(
      self,
      ForgeType::Unknown | ForgeType::Any | ForgeType::Never | ForgeType::Function { .. }
    )
  }

  /// Types that stand for "no value yet" and take the type of whatever is assigned later.
  pub fn holds_no_value(&self) -> bool {
    matches!(self, ForgeType::Null | ForgeType::Void | ForgeType::Never)
  }

  /// Most specific type both sides fit into, if there is one.
  pub fn unify(&self, other: &ForgeType) -> Option<ForgeType> {
    match (self, other) {
      | (ForgeType::Never, other) | (other, ForgeType::Never) => Some(other.clone()),
      | (ForgeType::Any, _) | (_, ForgeType::Any) => Some(ForgeType::Any),
      | (ForgeType::Unknown, _) | (_, ForgeType::Unknown) => Some(ForgeType::Unknown),
      | (ForgeType::Array(left), ForgeType::Array(right)) => {
        Some(ForgeType::array(left.join(right)))
      },
      | (
        ForgeType::Object {
          properties: left,
          open: left_open,
        },
        ForgeType::Object {
          properties: right,
          open: right_open,
        },
      ) => {
        let properties = left
          .iter()
          .filter_map(|(key, ty)| right.get(key).map(|other| (key.clone(), ty.join(other))))
          .collect();

        Some(ForgeType::Object {
          properties,
          open: *left_open || *right_open || left.len() != right.len(),
        })
      },
      | (left, right) if left == right => Some(left.clone()),
      | _ => None,
    }
  }

  /// Like [ForgeType::unify], degrading to [ForgeType::Unknown] on mismatch.
  pub fn join(&self, other: &ForgeType) -> ForgeType {
    self.unify(other).unwrap_or(ForgeType::Unknown)
  }

  /// Whether a value of this type may be stored where `target` was inferred.
  pub fn is_assignable_to(&self, target: &ForgeType) -> bool {
    self.unify(target).is_some()
  }
}

impl fmt::Display for ForgeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | ForgeType::Unknown => write!(f, "unknown"),
      | ForgeType::Any => write!(f, "any"),
      | ForgeType::Never => write!(f, "never"),
      | ForgeType::Void => write!(f, "void"),
      | ForgeType::Null => write!(f, "null"),
      | ForgeType::Boolean => write!(f, "boolean"),
      | ForgeType::Number => write!(f, "number"),
      | ForgeType::String => write!(f, "string"),
      | ForgeType::Duration => write!(f, "duration"),
      | ForgeType::Array(element) => write!(f, "{element}[]"),
      | ForgeType::Object { properties, open } => {
        let fields = properties
          .iter()
          .map(|(key, ty)| format!("{key}: {ty}"))
          .collect::<Vec<_>>()
          .join(", ");

        if *open {
          write!(f, "{{{fields}, ..}}")
        } else {
          write!(f, "{{{fields}}}")
        }
      },
      | ForgeType::Function { params, returns, .. } => write!(f, "func/{params} -> {returns}"),
      | ForgeType::Module(name) => write!(f, "module {name}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unify() {
    assert_eq!(
      ForgeType::Number.unify(&ForgeType::Number),
      Some(ForgeType::Number)
    );
    assert_eq!(ForgeType::Number.unify(&ForgeType::String), None);
    assert_eq!(
      ForgeType::Unknown.unify(&ForgeType::String),
      Some(ForgeType::Unknown)
    );
    assert_eq!(
      ForgeType::array(ForgeType::Number).join(&ForgeType::array(ForgeType::String)),
      ForgeType::array(ForgeType::Unknown)
    );
  }

  #[test]
  fn test_lattice_bounds() {
    assert_eq!(ForgeType::Never.unify(&ForgeType::String), Some(ForgeType::String));
    assert_eq!(ForgeType::Boolean.unify(&ForgeType::Never), Some(ForgeType::Boolean));
    assert_eq!(ForgeType::Any.unify(&ForgeType::Number), Some(ForgeType::Any));
    assert_eq!(ForgeType::Unknown.unify(&ForgeType::Any), Some(ForgeType::Any));
    assert_eq!(ForgeType::Never.unify(&ForgeType::Any), Some(ForgeType::Any));
    assert_eq!(ForgeType::Void.unify(&ForgeType::Void), Some(ForgeType::Void));
    assert_eq!(ForgeType::Void.unify(&ForgeType::Number), None);
    assert_eq!(
      ForgeType::array(ForgeType::Never).join(&ForgeType::array(ForgeType::Number)),
      ForgeType::array(ForgeType::Number)
    );

    assert!(ForgeType::Number.is_assignable_to(&ForgeType::Any));
    assert!(ForgeType::Never.is_assignable_to(&ForgeType::Duration));
    assert!(!ForgeType::String.is_assignable_to(&ForgeType::Void));
    assert!(ForgeType::Any.is_callable());
    assert!(!ForgeType::Void.is_callable());
  }

  #[test]
  fn test_object_unify_keeps_common_properties() {
    let left = ForgeType::Object {
      properties: BTreeMap::from([
        ("a".to_string(), ForgeType::Number),
        ("b".to_string(), ForgeType::String),
      ]),
      open: false,
    };

    let right = ForgeType::Object {
      properties: BTreeMap::from([("a".to_string(), ForgeType::Number)]),
      open: false,
    };

    assert_eq!(
      left.join(&right),
      ForgeType::Object {
        properties: BTreeMap::from([("a".to_string(), ForgeType::Number)]),
        open: true,
      }
    );
  }

  #[test]
  fn test_display() {
    assert_eq!(ForgeType::array(ForgeType::Number).to_string(), "number[]");
    assert_eq!(
      ForgeType::function(2, 1, ForgeType::Boolean).to_string(),
      "func/2 -> boolean"
    );
    assert_eq!(ForgeType::function(0, 0, ForgeType::Void).to_string(), "func/0 -> void");
    assert_eq!(ForgeType::Never.to_string(), "never");
  }
}
