//! Tolerant reader for the IAM policy JSON shape
//!
//! The wire format is permissive in ways a typed deserializer fights:
//! `Action`, `Resource`, principal identifiers, and condition values each
//! accept a single string or an array of strings; `Statement` accepts one
//! object or an array; `Principal` is the literal `"*"` or an object keyed
//! by type name; `Effect` and type names match case-insensitively. The
//! parser therefore deserializes to [`serde_json::Value`] leaves and walks
//! them by hand, so every rejection can name the field it happened in.
//!
//! Numbers, booleans, objects, and nulls in string positions are parse
//! errors, never silently coerced.

use serde::Deserialize;
use serde_json::Value;

use crate::authorization::{Principal, PrincipalKind};
use crate::condition::Condition;
use crate::error::ParseError;
use crate::policy::Policy;
use crate::statement::{Effect, Statement};
use crate::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPolicy {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    statement: Option<Value>,
}

/// Parse an IAM policy document
///
/// The document must already be percent-decoded. Statement order is
/// preserved; condition clauses within a statement come out sorted by
/// operator name and then context key, which keeps repeated parses of the
/// same document identical.
pub fn parse_policy(document: &str) -> Result<Policy> {
    let raw: RawPolicy = serde_json::from_str(document)?;
    let statements = parse_statements(raw.statement.as_ref())?;
    Ok(Policy {
        version: raw.version,
        statements,
    })
}

impl std::str::FromStr for Policy {
    type Err = ParseError;

    fn from_str(document: &str) -> Result<Self> {
        parse_policy(document)
    }
}

fn parse_statements(value: Option<&Value>) -> Result<Vec<Statement>> {
    match value {
        // A document with no Statement block holds no rules and denies
        // everything, same as an empty statement array
        None => Ok(Vec::new()),
        Some(single @ Value::Object(_)) => Ok(vec![parse_statement(single)?]),
        Some(Value::Array(items)) => items.iter().map(parse_statement).collect(),
        Some(other) => Err(ParseError::InvalidStatement(other.to_string())),
    }
}

fn parse_statement(value: &Value) -> Result<Statement> {
    let Value::Object(fields) = value else {
        return Err(ParseError::InvalidStatement(value.to_string()));
    };

    let effect = match fields.get("Effect") {
        None => return Err(ParseError::MissingEffect),
        Some(Value::String(effect)) => parse_effect(effect)?,
        Some(other) => return Err(ParseError::InvalidEffect(other.to_string())),
    };

    let actions = match fields.get("Action") {
        None => return Err(ParseError::EmptyActions),
        Some(value) => string_or_array(value, "Action")?,
    };
    if actions.is_empty() {
        return Err(ParseError::EmptyActions);
    }

    let resources = match fields.get("Resource") {
        None => Vec::new(),
        Some(value) => string_or_array(value, "Resource")?,
    };

    Ok(Statement {
        effect,
        principals: parse_principals(fields.get("Principal"))?,
        actions,
        resources,
        conditions: parse_conditions(fields.get("Condition"))?,
    })
}

fn parse_effect(raw: &str) -> Result<Effect> {
    match raw.to_lowercase().as_str() {
        "allow" => Ok(Effect::Allow),
        "deny" => Ok(Effect::Deny),
        _ => Err(ParseError::InvalidEffect(raw.to_string())),
    }
}

/// Parse the polymorphic `Principal` block
///
/// Either the literal string `"*"` (the wildcard principal) or an object
/// whose keys are principal type names and whose values are ids in
/// string-or-array form. Absent means the statement constrains no principal.
fn parse_principals(value: Option<&Value>) -> Result<Vec<Principal>> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::String(raw)) if raw == "*" => Ok(vec![Principal::any()]),
        Some(Value::String(raw)) => Err(ParseError::InvalidPrincipal(raw.clone())),
        Some(Value::Object(by_type)) => {
            let mut principals = Vec::new();
            for (type_name, ids) in by_type {
                let kind = parse_principal_kind(type_name)?;
                for id in string_or_array(ids, "Principal")? {
                    principals.push(Principal::new(kind, id));
                }
            }
            Ok(principals)
        }
        Some(other) => Err(ParseError::InvalidPrincipal(other.to_string())),
    }
}

fn parse_principal_kind(type_name: &str) -> Result<PrincipalKind> {
    match type_name.to_lowercase().as_str() {
        "aws" => Ok(PrincipalKind::Aws),
        "federated" => Ok(PrincipalKind::Federated),
        "service" => Ok(PrincipalKind::Service),
        "canonicaluser" => Ok(PrincipalKind::CanonicalUser),
        _ => Err(ParseError::UnknownPrincipalType(type_name.to_string())),
    }
}

/// Fan a `{Operator: {Key: value-or-array}}` block out into one
/// [`Condition`] per (operator, key) pair
fn parse_conditions(value: Option<&Value>) -> Result<Vec<Condition>> {
    let by_operator = match value {
        None => return Ok(Vec::new()),
        Some(Value::Object(by_operator)) => by_operator,
        Some(other) => return Err(ParseError::InvalidCondition(other.to_string())),
    };

    let mut conditions = Vec::new();
    for (operator, by_key) in by_operator {
        let Value::Object(by_key) = by_key else {
            return Err(ParseError::InvalidCondition(format!(
                "{operator}: {by_key}"
            )));
        };
        for (key, values) in by_key {
            let field = format!("Condition {operator}/{key}");
            conditions.push(Condition::new(
                operator.clone(),
                key.clone(),
                string_or_array(values, field)?,
            ));
        }
    }
    Ok(conditions)
}

/// The string-or-array rule shared by every list position in the grammar
fn string_or_array(value: &Value, field: impl Into<String>) -> Result<Vec<String>> {
    let field = field.into();
    match value {
        Value::String(single) => Ok(vec![single.clone()]),
        Value::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => values.push(s.clone()),
                    _ => return Err(ParseError::expected_strings(field)),
                }
            }
            Ok(values)
        }
        _ => Err(ParseError::expected_strings(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<Policy> {
        parse_policy(&value.to_string())
    }

    mod accepted_shapes {
        use super::*;

        #[test]
        fn service_principal_trust_policy() {
            let policy = parse(json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": "ec2.amazonaws.com" },
                    "Action": "sts:AssumeRole"
                }]
            }))
            .unwrap();

            assert_eq!(policy.version.as_deref(), Some("2012-10-17"));
            assert_eq!(policy.statements.len(), 1);
            let statement = &policy.statements[0];
            assert_eq!(statement.effect, Effect::Allow);
            assert_eq!(statement.actions, vec!["sts:AssumeRole"]);
            assert_eq!(
                statement.principals,
                vec![Principal::new(PrincipalKind::Service, "ec2.amazonaws.com")]
            );
            assert!(statement.conditions.is_empty());
        }

        #[test]
        fn irsa_trust_policy_with_conditions() {
            let policy = parse(json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {
                        "Federated": "arn:aws:iam::111122223333:oidc-provider/oidc.eks.region-code.amazonaws.com/id/EXAMPLE"
                    },
                    "Action": "sts:AssumeRoleWithWebIdentity",
                    "Condition": {
                        "StringEquals": {
                            "oidc.eks.region-code.amazonaws.com/id/EXAMPLE:sub": "system:serviceaccount:default:my-service-account",
                            "oidc.eks.region-code.amazonaws.com/id/EXAMPLE:aud": "sts.amazonaws.com"
                        }
                    }
                }]
            }))
            .unwrap();

            let statement = &policy.statements[0];
            assert_eq!(statement.conditions.len(), 2);
            assert!(statement.conditions.iter().all(|c| c.operator == "StringEquals"));
            assert!(statement.conditions.iter().any(|c| {
                c.key == "oidc.eks.region-code.amazonaws.com/id/EXAMPLE:sub"
                    && c.values == vec!["system:serviceaccount:default:my-service-account"]
            }));
        }

        #[test]
        fn single_statement_object_is_accepted() {
            let policy = parse(json!({
                "Statement": {
                    "Effect": "Allow",
                    "Action": "sts:AssumeRole"
                }
            }))
            .unwrap();
            assert_eq!(policy.statements.len(), 1);
        }

        #[test]
        fn action_and_condition_value_arrays_fan_out() {
            let policy = parse(json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Action": ["sts:AssumeRole", "sts:TagSession"],
                    "Condition": {
                        "StringLike": {
                            "oidc.example.com:sub": [
                                "system:serviceaccount:my-ns1:*",
                                "system:serviceaccount:my-ns2:*"
                            ]
                        }
                    }
                }]
            }))
            .unwrap();

            let statement = &policy.statements[0];
            assert_eq!(statement.actions.len(), 2);
            assert_eq!(statement.conditions.len(), 1);
            assert_eq!(statement.conditions[0].values.len(), 2);
        }

        #[test]
        fn principal_id_arrays_fan_out() {
            let policy = parse(json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Federated": ["foo", "bar"], "AWS": "baz" },
                    "Action": "sts:AssumeRoleWithWebIdentity"
                }]
            }))
            .unwrap();

            let principals = &policy.statements[0].principals;
            assert_eq!(principals.len(), 3);
            assert!(principals.contains(&Principal::federated("foo")));
            assert!(principals.contains(&Principal::federated("bar")));
            assert!(principals.contains(&Principal::new(PrincipalKind::Aws, "baz")));
        }

        #[test]
        fn raw_star_principal_becomes_the_wildcard_principal() {
            let policy = parse(json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": "*",
                    "Action": "*"
                }]
            }))
            .unwrap();
            assert_eq!(policy.statements[0].principals, vec![Principal::any()]);
        }

        #[test]
        fn effect_and_principal_type_match_case_insensitively() {
            let policy = parse(json!({
                "Statement": [{
                    "Effect": "dEnY",
                    "Principal": { "fEdErAtEd": "foo" },
                    "Action": "sts:AssumeRole"
                }]
            }))
            .unwrap();

            assert_eq!(policy.statements[0].effect, Effect::Deny);
            assert_eq!(policy.statements[0].principals, vec![Principal::federated("foo")]);
        }

        #[test]
        fn empty_condition_block_produces_zero_conditions() {
            let policy = parse(json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Action": "sts:AssumeRole",
                    "Condition": {}
                }]
            }))
            .unwrap();
            assert!(policy.statements[0].conditions.is_empty());
        }

        #[test]
        fn missing_statement_block_is_an_empty_policy() {
            let policy = parse(json!({ "Version": "2012-10-17" })).unwrap();
            assert!(policy.statements.is_empty());
        }
    }

    mod rejected_shapes {
        use super::*;

        #[test]
        fn not_json_at_all() {
            assert!(matches!(
                parse_policy("this is not json"),
                Err(ParseError::Json(_))
            ));
        }

        #[test]
        fn missing_effect() {
            let err = parse(json!({
                "Statement": [{ "Action": "sts:AssumeRole" }]
            }))
            .unwrap_err();
            assert!(matches!(err, ParseError::MissingEffect));
        }

        #[test]
        fn unrecognized_effect() {
            let err = parse(json!({
                "Statement": [{ "Effect": "Maybe", "Action": "sts:AssumeRole" }]
            }))
            .unwrap_err();
            assert!(matches!(err, ParseError::InvalidEffect(e) if e == "Maybe"));
        }

        #[test]
        fn numeric_action_is_not_coerced() {
            let err = parse(json!({
                "Statement": [{ "Effect": "Allow", "Action": 42 }]
            }))
            .unwrap_err();
            assert!(matches!(err, ParseError::ExpectedStrings { field } if field == "Action"));
        }

        #[test]
        fn number_inside_action_array_is_rejected() {
            let err = parse(json!({
                "Statement": [{ "Effect": "Allow", "Action": ["sts:AssumeRole", 42] }]
            }))
            .unwrap_err();
            assert!(matches!(err, ParseError::ExpectedStrings { field } if field == "Action"));
        }

        #[test]
        fn missing_action_violates_the_non_empty_invariant() {
            let err = parse(json!({
                "Statement": [{ "Effect": "Allow" }]
            }))
            .unwrap_err();
            assert!(matches!(err, ParseError::EmptyActions));
        }

        #[test]
        fn empty_action_array_violates_the_non_empty_invariant() {
            let err = parse(json!({
                "Statement": [{ "Effect": "Allow", "Action": [] }]
            }))
            .unwrap_err();
            assert!(matches!(err, ParseError::EmptyActions));
        }

        #[test]
        fn unknown_principal_type() {
            let err = parse(json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "IDoNotExist": "foo" },
                    "Action": "sts:AssumeRole"
                }]
            }))
            .unwrap_err();
            assert!(matches!(err, ParseError::UnknownPrincipalType(t) if t == "IDoNotExist"));
        }

        #[test]
        fn non_star_string_principal() {
            let err = parse(json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": "arn:aws:iam::1:root",
                    "Action": "sts:AssumeRole"
                }]
            }))
            .unwrap_err();
            assert!(matches!(err, ParseError::InvalidPrincipal(_)));
        }

        #[test]
        fn condition_value_object_is_rejected() {
            let err = parse(json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Action": "sts:AssumeRole",
                    "Condition": { "StringEquals": { "foo": { "nested": true } } }
                }]
            }))
            .unwrap_err();
            assert!(
                matches!(err, ParseError::ExpectedStrings { field } if field.contains("StringEquals"))
            );
        }

        #[test]
        fn condition_operator_value_must_be_an_object() {
            let err = parse(json!({
                "Statement": [{
                    "Effect": "Allow",
                    "Action": "sts:AssumeRole",
                    "Condition": { "StringEquals": "not-an-object" }
                }]
            }))
            .unwrap_err();
            assert!(matches!(err, ParseError::InvalidCondition(_)));
        }

        #[test]
        fn statement_block_of_the_wrong_type() {
            let err = parse(json!({ "Statement": "not a statement" })).unwrap_err();
            assert!(matches!(err, ParseError::InvalidStatement(_)));
        }
    }

    mod round_trip {
        use super::*;

        #[test]
        fn canonical_form_reparses_to_the_same_ast() {
            let document = json!({
                "Version": "2012-10-17",
                "Statement": [
                    {
                        "Effect": "Allow",
                        "Principal": { "Federated": "arn:aws:iam::1:oidc-provider/oidc.example.com" },
                        "Action": "sts:AssumeRoleWithWebIdentity",
                        "Condition": {
                            "StringEquals": { "oidc.example.com:aud": "sts.amazonaws.com" },
                            "StringLike": { "oidc.example.com:sub": ["system:serviceaccount:a:*", "system:serviceaccount:b:*"] }
                        }
                    },
                    {
                        "Effect": "Deny",
                        "Principal": "*",
                        "Action": ["s3:GetObject", "s3:PutObject"],
                        "Resource": "arn:aws:s3:::secret-bucket/*"
                    }
                ]
            });

            let first = parse(document).unwrap();
            let second = parse_policy(&first.to_json().to_string()).unwrap();
            assert_eq!(first, second);

            // And the canonical form is itself a fixed point
            assert_eq!(first.to_json(), second.to_json());
        }
    }
}
