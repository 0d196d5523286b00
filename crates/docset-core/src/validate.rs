//! Front-matter validation against a [`Schema`].

use serde_json::Value;

use crate::finding::{Finding, FindingCode};
use crate::frontmatter::{value_kind, FrontMatter};
use crate::schema::{CompiledRule, FieldType, Schema};

/// Check a document's front-matter against every rule in `schema`.
///
/// Findings are sorted by `(path, code)`, with the message as a tiebreak, so
/// the result does not depend on key order in the mapping. Keys that no rule
/// declares are reported only when the schema declares at least one rule.
#[must_use]
pub fn validate_front_matter(
    path: &str,
    front_matter: &FrontMatter,
    schema: &Schema,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for compiled in schema.rules() {
        let rule = &compiled.rule;
        match front_matter.get(&rule.key) {
            None | Some(Value::Null) => {
                if rule.required {
                    findings.push(Finding::new(
                        path,
                        FindingCode::MissingRequiredField,
                        format!("missing required field '{}'", rule.key),
                    ));
                }
            }
            Some(value) => check_value(path, compiled, value, &mut findings),
        }
    }

    if !schema.rules().is_empty() {
        for key in front_matter.keys() {
            if schema.rule(key).is_none() {
                findings.push(Finding::new(
                    path,
                    FindingCode::UnknownField,
                    format!("field '{key}' is not declared in the schema"),
                ));
            }
        }
    }

    findings.sort_by(|a, b| a.path_code_key().cmp(&b.path_code_key()));
    findings
}

fn check_value(path: &str, compiled: &CompiledRule, value: &Value, findings: &mut Vec<Finding>) {
    let rule = &compiled.rule;
    let mismatch = |findings: &mut Vec<Finding>| {
        findings.push(Finding::new(
            path,
            FindingCode::TypeMismatch,
            format!(
                "field '{}' must be {}, found {}",
                rule.key,
                rule.field_type,
                value_kind(value)
            ),
        ));
    };

    match rule.field_type {
        FieldType::String => match value {
            Value::String(s) => check_text(path, compiled, s, findings),
            _ => mismatch(findings),
        },
        FieldType::StringArray => match value {
            Value::Array(items) if items.iter().all(Value::is_string) => {
                for item in items.iter().filter_map(Value::as_str) {
                    check_text(path, compiled, item, findings);
                }
            }
            _ => mismatch(findings),
        },
        FieldType::Enum => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return mismatch(findings),
            };
            let allowed = rule.allowed_values.as_deref().unwrap_or_default();
            if !allowed.iter().any(|a| *a == text) {
                findings.push(Finding::new(
                    path,
                    FindingCode::InvalidEnumValue,
                    format!(
                        "field '{}' has value '{}', allowed values are [{}]",
                        rule.key,
                        text,
                        allowed.join(", ")
                    ),
                ));
            }
        }
        FieldType::Integer => {
            if !(value.is_i64() || value.is_u64()) {
                mismatch(findings);
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                mismatch(findings);
            }
        }
    }
}

fn check_text(path: &str, compiled: &CompiledRule, text: &str, findings: &mut Vec<Finding>) {
    let rule = &compiled.rule;

    if let Some(max) = rule.max_length {
        let len = text.chars().count();
        if len > max {
            findings.push(Finding::new(
                path,
                FindingCode::FieldTooLong,
                format!(
                    "field '{}' is {len} characters long, maximum is {max}",
                    rule.key
                ),
            ));
        }
    }

    if let Some(pattern) = &compiled.pattern {
        if !pattern.is_match(text) {
            findings.push(Finding::new(
                path,
                FindingCode::PatternMismatch,
                format!(
                    "field '{}' value '{}' does not match pattern {}",
                    rule.key,
                    text,
                    pattern.as_str()
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;
    use crate::frontmatter::split_front_matter;
    use crate::schema::SchemaRule;

    fn agent_schema() -> Schema {
        Schema::from_rules(vec![
            SchemaRule::new("name", FieldType::String)
                .required()
                .with_max_length(64),
            SchemaRule::new("description", FieldType::String)
                .required()
                .with_max_length(1024),
            SchemaRule::new("tools", FieldType::StringArray),
            SchemaRule::new("model", FieldType::Enum)
                .with_allowed_values(["sonnet", "opus", "haiku"]),
            SchemaRule::new("priority", FieldType::Integer),
            SchemaRule::new("draft", FieldType::Boolean),
        ])
        .unwrap()
    }

    fn validate(text: &str, schema: &Schema) -> Vec<Finding> {
        let (fm, _) = split_front_matter("agents/writer.md", text).unwrap();
        validate_front_matter("agents/writer.md", &fm, schema)
    }

    fn codes(findings: &[Finding]) -> Vec<FindingCode> {
        findings.iter().map(|f| f.code).collect()
    }

    #[test]
    fn missing_description_is_the_only_finding() {
        let findings = validate(
            "---\nname: \"code-writer\"\ntools: [Read, Write]\n---\n",
            &agent_schema(),
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, FindingCode::MissingRequiredField);
        assert_eq!(findings[0].severity, Severity::Error);
        assert!(findings[0].message.contains("description"));
    }

    #[test]
    fn each_missing_required_field_yields_one_finding() {
        let findings = validate("---\ntools: [Read]\n---\n", &agent_schema());
        assert_eq!(
            codes(&findings),
            vec![FindingCode::MissingRequiredField, FindingCode::MissingRequiredField]
        );
        assert!(findings[0].message.contains("'description'"));
        assert!(findings[1].message.contains("'name'"));
    }

    #[test]
    fn null_value_counts_as_missing() {
        let findings = validate("---\nname: x\ndescription:\n---\n", &agent_schema());
        assert_eq!(codes(&findings), vec![FindingCode::MissingRequiredField]);
    }

    #[test]
    fn scalar_where_array_expected_is_type_mismatch() {
        let findings = validate(
            "---\nname: x\ndescription: y\ntools: Read\n---\n",
            &agent_schema(),
        );
        assert_eq!(codes(&findings), vec![FindingCode::TypeMismatch]);
        assert!(findings[0].message.contains("stringArray"));
        assert!(findings[0].message.contains("found string"));
    }

    #[test]
    fn wrong_scalar_types_are_mismatches() {
        let findings = validate(
            "---\nname: 42\ndescription: y\npriority: high\ndraft: \"yes\"\ntools: [1, two]\n---\n",
            &agent_schema(),
        );
        assert_eq!(
            codes(&findings),
            vec![
                FindingCode::TypeMismatch,
                FindingCode::TypeMismatch,
                FindingCode::TypeMismatch,
                FindingCode::TypeMismatch
            ]
        );
    }

    #[test]
    fn enum_value_outside_allowed_set() {
        let findings = validate("---\nname: x\ndescription: y\nmodel: gpt\n---\n", &agent_schema());
        assert_eq!(codes(&findings), vec![FindingCode::InvalidEnumValue]);
        assert!(findings[0].message.contains("sonnet, opus, haiku"));

        let findings = validate(
            "---\nname: x\ndescription: y\nmodel: opus\n---\n",
            &agent_schema(),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn unknown_fields_are_warnings() {
        let findings = validate(
            "---\nname: x\ndescription: y\ncolor: blue\n---\n",
            &agent_schema(),
        );
        assert_eq!(codes(&findings), vec![FindingCode::UnknownField]);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn empty_schema_reports_nothing() {
        let findings = validate("---\ncolor: blue\n---\n", &Schema::default());
        assert!(findings.is_empty());
    }

    #[test]
    fn length_limit_counts_characters() {
        let long = "é".repeat(65);
        let findings = validate(
            &format!("---\nname: {long}\ndescription: y\n---\n"),
            &agent_schema(),
        );
        assert_eq!(codes(&findings), vec![FindingCode::FieldTooLong]);
        assert!(findings[0].message.contains("65 characters"));

        let ok = "é".repeat(64);
        let findings = validate(
            &format!("---\nname: {ok}\ndescription: y\n---\n"),
            &agent_schema(),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn pattern_applies_to_strings_and_array_items() {
        let schema = Schema::from_rules(vec![
            SchemaRule::new("name", FieldType::String).with_pattern("^[a-z0-9]+(-[a-z0-9]+)*$"),
            SchemaRule::new("tags", FieldType::StringArray).with_pattern("^[a-z]+$"),
        ])
        .unwrap();
        let findings = validate("---\nname: Code_Writer\ntags: [ok, Bad]\n---\n", &schema);
        assert_eq!(
            codes(&findings),
            vec![FindingCode::PatternMismatch, FindingCode::PatternMismatch]
        );
    }

    #[test]
    fn findings_do_not_depend_on_key_order() {
        let a = validate("---\ncolor: 1\nname: 42\nextra: 2\n---\n", &agent_schema());
        let b = validate("---\nextra: 2\nname: 42\ncolor: 1\n---\n", &agent_schema());
        assert_eq!(a, b);
    }
}
