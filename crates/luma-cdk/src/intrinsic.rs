//! CloudFormation intrinsic expressions.
//!
//! [`Expr`] is how declared resources point at each other. It renders to the
//! JSON forms CloudFormation understands:
//!
//! ```json
//! { "Ref": "LumaUserPool6F2C1A3B" }
//! { "Fn::GetAtt": ["LumaUserPool6F2C1A3B", "Arn"] }
//! { "Fn::Join": ["", ["arn:", { "Ref": "AWS::Partition" }, ":s3:::bucket"]] }
//! { "Fn::ImportValue": "LumaUserPoolId" }
//! ```

use serde_json::{Value, json};

/// Pseudo parameters provided by CloudFormation at deploy time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pseudo {
    /// `AWS::AccountId`
    AccountId,
    /// `AWS::Region`
    Region,
    /// `AWS::Partition`
    Partition,
    /// `AWS::URLSuffix`
    UrlSuffix,
    /// `AWS::StackName`
    StackName,
}

impl Pseudo {
    /// The parameter name as written inside a `Ref`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Region => "AWS::Region",
            Self::Partition => "AWS::Partition",
            Self::UrlSuffix => "AWS::URLSuffix",
            Self::StackName => "AWS::StackName",
        }
    }
}

/// A value in a template: either a literal or an expression resolved by
/// CloudFormation at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Plain string.
    Literal(String),
    /// `Ref` to a resource or parameter by logical ID.
    Ref(String),
    /// `Fn::GetAtt` on a resource.
    GetAtt {
        /// Logical ID of the resource.
        logical_id: String,
        /// Attribute name, e.g. `Arn`.
        attribute: String,
    },
    /// `Fn::Join`.
    Join {
        /// Separator placed between parts.
        delimiter: String,
        /// Joined parts.
        parts: Vec<Expr>,
    },
    /// `Fn::Sub` with implicit variables only.
    Sub(String),
    /// `Fn::ImportValue` of a named export.
    ImportValue(String),
    /// `Ref` to a pseudo parameter.
    Pseudo(Pseudo),
}

impl Expr {
    /// A literal string.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// `Ref` to the given logical ID.
    #[must_use]
    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    /// `Fn::GetAtt` on the given logical ID.
    #[must_use]
    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    /// `Fn::Sub` on a template string.
    #[must_use]
    pub fn sub(template: impl Into<String>) -> Self {
        Self::Sub(template.into())
    }

    /// `Fn::ImportValue` of an export name.
    #[must_use]
    pub fn import(export_name: impl Into<String>) -> Self {
        Self::ImportValue(export_name.into())
    }

    /// `Fn::Join`, with adjacent literals merged.
    ///
    /// A join whose parts are all literal collapses into a single literal.
    #[must_use]
    pub fn join(delimiter: impl Into<String>, parts: impl IntoIterator<Item = Expr>) -> Self {
        let delimiter = delimiter.into();
        let mut merged: Vec<Expr> = Vec::new();

        for part in parts {
            if let (Some(Self::Literal(prev)), Self::Literal(next)) = (merged.last_mut(), &part) {
                prev.push_str(&delimiter);
                prev.push_str(next);
                continue;
            }
            merged.push(part);
        }

        match merged.as_slice() {
            [] => Self::Literal(String::new()),
            [Self::Literal(single)] => Self::Literal(single.clone()),
            _ => Self::Join {
                delimiter,
                parts: merged,
            },
        }
    }

    /// Concatenate parts with no separator.
    #[must_use]
    pub fn concat(parts: impl IntoIterator<Item = Expr>) -> Self {
        Self::join("", parts)
    }

    /// The literal value, if this expression is known at declaration time.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Render the CloudFormation JSON form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(v) => Value::String(v.clone()),
            Self::Ref(id) => json!({ "Ref": id }),
            Self::GetAtt {
                logical_id,
                attribute,
            } => json!({ "Fn::GetAtt": [logical_id, attribute] }),
            Self::Join { delimiter, parts } => {
                let parts: Vec<Value> = parts.iter().map(Self::to_json).collect();
                json!({ "Fn::Join": [delimiter, parts] })
            }
            Self::Sub(template) => json!({ "Fn::Sub": template }),
            Self::ImportValue(name) => json!({ "Fn::ImportValue": name }),
            Self::Pseudo(p) => json!({ "Ref": p.as_str() }),
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<Pseudo> for Expr {
    fn from(value: Pseudo) -> Self {
        Self::Pseudo(value)
    }
}

impl From<&Expr> for Value {
    fn from(value: &Expr) -> Self {
        value.to_json()
    }
}

impl From<Expr> for Value {
    fn from(value: Expr) -> Self {
        value.to_json()
    }
}

impl serde::Serialize for Expr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
