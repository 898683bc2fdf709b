//! Action parameter specifications and validated parameter values.
//!
//! Persisted action parameters are positional, nullable strings. An
//! [`ActionParameterSpec`] list describes what each position must hold;
//! validation turns the raw list into [`ValidatedParameters`], from which each
//! factory builds its typed action.

use regex::Regex;
use tollgate_core::group_path;
use tollgate_expr::CompiledExpression;

use crate::catalog::SchemaCatalog;
use crate::error::InvalidActionParameters;

/// Syntactic kind of an action parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Free text.
    Text,
    /// Value expression, compiled at validation.
    Expression,
    /// Name of an attribute type known to the catalog.
    AttributeType,
    /// Name of an identity type known to the catalog.
    IdentityType,
    /// Absolute group path.
    GroupPath,
    /// Regular expression, compiled at validation.
    Regex,
    /// Positive integer.
    Integer,
    Boolean,
    /// One of a fixed set of values.
    Choice(&'static [&'static str]),
    /// Name of another profile.
    ProfileName,
}

impl ParameterKind {
    pub fn describe(&self) -> String {
        match self {
            ParameterKind::Text => "text".to_string(),
            ParameterKind::Expression => "expression".to_string(),
            ParameterKind::AttributeType => "attribute type".to_string(),
            ParameterKind::IdentityType => "identity type".to_string(),
            ParameterKind::GroupPath => "group path".to_string(),
            ParameterKind::Regex => "regex".to_string(),
            ParameterKind::Integer => "integer".to_string(),
            ParameterKind::Boolean => "boolean".to_string(),
            ParameterKind::Choice(values) => format!("one of {}", values.join("|")),
            ParameterKind::ProfileName => "profile name".to_string(),
        }
    }
}

/// One positional parameter of an action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionParameterSpec {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub mandatory: bool,
    /// Only allowed on the last parameter: it accepts any number of values.
    pub variadic: bool,
}

impl ActionParameterSpec {
    pub const fn required(name: &'static str, kind: ParameterKind) -> Self {
        Self {
            name,
            kind,
            mandatory: true,
            variadic: false,
        }
    }

    pub const fn optional(name: &'static str, kind: ParameterKind) -> Self {
        Self {
            name,
            kind,
            mandatory: false,
            variadic: false,
        }
    }

    pub const fn variadic(self) -> Self {
        Self {
            variadic: true,
            ..self
        }
    }
}

/// A parameter value after validation.
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// Optional parameter given as null or blank.
    Absent,
    Text(String),
    Expression(CompiledExpression),
    Regex(Regex),
    Integer(i64),
    Boolean(bool),
}

/// Validated parameters of one action instance, in declaration order.
///
/// A variadic trailing parameter contributes one value per supplied element.
#[derive(Debug, Clone)]
pub struct ValidatedParameters {
    action: &'static str,
    values: Vec<ParamValue>,
}

impl ValidatedParameters {
    /// Check `raw` against `specs`: arity, mandatory values, then kind syntax.
    pub fn validate(
        action: &'static str,
        specs: &[ActionParameterSpec],
        raw: &[Option<String>],
        catalog: &dyn SchemaCatalog,
    ) -> Result<Self, InvalidActionParameters> {
        let variadic = specs.last().filter(|s| s.variadic);
        let (expected, arity_ok) = match variadic {
            Some(last) => {
                let minimum = if last.mandatory {
                    specs.len()
                } else {
                    specs.len() - 1
                };
                (minimum, raw.len() >= minimum)
            }
            None => (specs.len(), raw.len() == specs.len()),
        };
        if !arity_ok {
            return Err(InvalidActionParameters::wrong_arity(
                action,
                expected,
                raw.len(),
                variadic.is_some(),
            ));
        }

        let mut values = Vec::with_capacity(raw.len());
        for (idx, value) in raw.iter().enumerate() {
            let spec = &specs[idx.min(specs.len().saturating_sub(1))];
            values.push(Self::validate_one(action, spec, value.as_deref(), catalog)?);
        }

        Ok(Self { action, values })
    }

    fn validate_one(
        action: &str,
        spec: &ActionParameterSpec,
        raw: Option<&str>,
        catalog: &dyn SchemaCatalog,
    ) -> Result<ParamValue, InvalidActionParameters> {
        let value = match raw.map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ if spec.mandatory => {
                return Err(InvalidActionParameters::missing_mandatory(action, spec.name));
            }
            _ => return Ok(ParamValue::Absent),
        };

        match spec.kind {
            ParameterKind::Text => Ok(ParamValue::Text(value.to_string())),
            ParameterKind::Expression => CompiledExpression::compile(value)
                .map(ParamValue::Expression)
                .map_err(|e| InvalidActionParameters::invalid_expression(action, spec.name, &e)),
            ParameterKind::AttributeType => {
                if catalog.has_attribute_type(value) {
                    Ok(ParamValue::Text(value.to_string()))
                } else {
                    Err(InvalidActionParameters::unknown_attribute_type(
                        action, spec.name, value,
                    ))
                }
            }
            ParameterKind::IdentityType => {
                if catalog.has_identity_type(value) {
                    Ok(ParamValue::Text(value.to_string()))
                } else {
                    Err(InvalidActionParameters::unknown_identity_type(
                        action, spec.name, value,
                    ))
                }
            }
            ParameterKind::GroupPath => {
                if group_path::is_valid(value) {
                    Ok(ParamValue::Text(value.to_string()))
                } else {
                    Err(InvalidActionParameters::invalid_group_path(
                        action, spec.name, value,
                    ))
                }
            }
            ParameterKind::Regex => Regex::new(value)
                .map(ParamValue::Regex)
                .map_err(|e| InvalidActionParameters::invalid_pattern(action, spec.name, &e)),
            ParameterKind::Integer => match value.parse::<i64>() {
                Ok(n) if n > 0 => Ok(ParamValue::Integer(n)),
                _ => Err(InvalidActionParameters::invalid_integer(
                    action, spec.name, value,
                )),
            },
            ParameterKind::Boolean => match value {
                "true" => Ok(ParamValue::Boolean(true)),
                "false" => Ok(ParamValue::Boolean(false)),
                _ => Err(InvalidActionParameters::invalid_boolean(
                    action, spec.name, value,
                )),
            },
            ParameterKind::Choice(allowed) => {
                if allowed.contains(&value) {
                    Ok(ParamValue::Text(value.to_string()))
                } else {
                    Err(InvalidActionParameters::invalid_choice(
                        action, spec.name, value, allowed,
                    ))
                }
            }
            ParameterKind::ProfileName => {
                if value.chars().any(char::is_control) {
                    Err(InvalidActionParameters::invalid_profile_name(
                        action, spec.name, value,
                    ))
                } else {
                    Ok(ParamValue::Text(value.to_string()))
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ParamValue> {
        self.values.get(index)
    }

    /// Text of a mandatory text-like parameter.
    pub fn text(&self, index: usize) -> Result<&str, InvalidActionParameters> {
        match self.values.get(index) {
            Some(ParamValue::Text(s)) => Ok(s),
            _ => Err(InvalidActionParameters::wrong_kind(self.action, index, "text")),
        }
    }

    /// Text of an optional text-like parameter.
    pub fn opt_text(&self, index: usize) -> Result<Option<&str>, InvalidActionParameters> {
        match self.values.get(index) {
            Some(ParamValue::Text(s)) => Ok(Some(s)),
            Some(ParamValue::Absent) | None => Ok(None),
            _ => Err(InvalidActionParameters::wrong_kind(self.action, index, "text")),
        }
    }

    /// All text values from `from` to the end (variadic parameters).
    pub fn texts_from(&self, from: usize) -> Result<Vec<String>, InvalidActionParameters> {
        (from..self.values.len())
            .filter_map(|idx| self.opt_text(idx).transpose())
            .map(|r| r.map(str::to_string))
            .collect()
    }

    pub fn expression(&self, index: usize) -> Result<&CompiledExpression, InvalidActionParameters> {
        match self.values.get(index) {
            Some(ParamValue::Expression(e)) => Ok(e),
            _ => Err(InvalidActionParameters::wrong_kind(self.action, index, "an expression")),
        }
    }

    pub fn regex(&self, index: usize) -> Result<&Regex, InvalidActionParameters> {
        match self.values.get(index) {
            Some(ParamValue::Regex(r)) => Ok(r),
            _ => Err(InvalidActionParameters::wrong_kind(self.action, index, "a regex")),
        }
    }

    pub fn integer(&self, index: usize) -> Result<i64, InvalidActionParameters> {
        match self.values.get(index) {
            Some(ParamValue::Integer(n)) => Ok(*n),
            _ => Err(InvalidActionParameters::wrong_kind(self.action, index, "an integer")),
        }
    }

    pub fn boolean(&self, index: usize) -> Result<Option<bool>, InvalidActionParameters> {
        match self.values.get(index) {
            Some(ParamValue::Boolean(b)) => Ok(Some(*b)),
            Some(ParamValue::Absent) | None => Ok(None),
            _ => Err(InvalidActionParameters::wrong_kind(self.action, index, "a boolean")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::error::ParameterErrorKind;

    const EFFECTS: &[&str] = &["CREATE_ONLY", "CREATE_OR_UPDATE"];

    const SPECS: &[ActionParameterSpec] = &[
        ActionParameterSpec::required("attribute", ParameterKind::AttributeType),
        ActionParameterSpec::required("expression", ParameterKind::Expression),
        ActionParameterSpec::optional("note", ParameterKind::Text),
        ActionParameterSpec::required("effect", ParameterKind::Choice(EFFECTS)),
    ];

    fn raw(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(["cn"], ["userName"])
    }

    #[test]
    fn test_valid_parameters() {
        let params = ValidatedParameters::validate(
            "test",
            SPECS,
            &raw(&[Some("cn"), Some("attr['cn']"), None, Some("CREATE_ONLY")]),
            &catalog(),
        )
        .unwrap();
        assert_eq!(params.text(0).unwrap(), "cn");
        assert_eq!(params.expression(1).unwrap().source(), "attr['cn']");
        assert_eq!(params.opt_text(2).unwrap(), None);
        assert_eq!(params.text(3).unwrap(), "CREATE_ONLY");
    }

    #[test]
    fn test_wrong_arity() {
        let err = ValidatedParameters::validate(
            "test",
            SPECS,
            &raw(&[Some("cn"), Some("true")]),
            &catalog(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::Arity);
    }

    #[test]
    fn test_blank_mandatory_rejected() {
        let err = ValidatedParameters::validate(
            "test",
            SPECS,
            &raw(&[Some("  "), Some("true"), None, Some("CREATE_ONLY")]),
            &catalog(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::MissingMandatory);
    }

    #[test]
    fn test_unknown_attribute_type() {
        let err = ValidatedParameters::validate(
            "test",
            SPECS,
            &raw(&[Some("sn"), Some("true"), None, Some("CREATE_ONLY")]),
            &catalog(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::UnknownAttributeType);

        assert!(
            ValidatedParameters::validate(
                "test",
                SPECS,
                &raw(&[Some("sn"), Some("true"), None, Some("CREATE_ONLY")]),
                &StaticCatalog::permissive(),
            )
            .is_ok()
        );
    }

    #[test]
    fn test_invalid_expression_and_choice() {
        let err = ValidatedParameters::validate(
            "test",
            SPECS,
            &raw(&[Some("cn"), Some("attr["), None, Some("CREATE_ONLY")]),
            &catalog(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::InvalidExpression);

        let err = ValidatedParameters::validate(
            "test",
            SPECS,
            &raw(&[Some("cn"), Some("true"), None, Some("UPSERT")]),
            &catalog(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::InvalidChoice);
    }

    #[test]
    fn test_variadic_trailing_parameter() {
        const VARIADIC: &[ActionParameterSpec] =
            &[ActionParameterSpec::required("group", ParameterKind::GroupPath).variadic()];

        let params = ValidatedParameters::validate(
            "test",
            VARIADIC,
            &raw(&[Some("/a"), Some("/b/c")]),
            &catalog(),
        )
        .unwrap();
        assert_eq!(params.texts_from(0).unwrap(), vec!["/a", "/b/c"]);

        let err = ValidatedParameters::validate("test", VARIADIC, &[], &catalog()).unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::Arity);

        let err =
            ValidatedParameters::validate("test", VARIADIC, &raw(&[Some("a")]), &catalog())
                .unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::InvalidGroupPath);
    }

    #[test]
    fn test_integer_and_boolean_kinds() {
        const SPECS: &[ActionParameterSpec] = &[
            ActionParameterSpec::required("days", ParameterKind::Integer),
            ActionParameterSpec::optional("flag", ParameterKind::Boolean),
        ];
        let params =
            ValidatedParameters::validate("test", SPECS, &raw(&[Some("30"), Some("true")]), &catalog())
                .unwrap();
        assert_eq!(params.integer(0).unwrap(), 30);
        assert_eq!(params.boolean(1).unwrap(), Some(true));

        let err =
            ValidatedParameters::validate("test", SPECS, &raw(&[Some("0"), None]), &catalog())
                .unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::InvalidInteger);

        let err =
            ValidatedParameters::validate("test", SPECS, &raw(&[Some("1"), Some("yes")]), &catalog())
                .unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::InvalidBoolean);
    }

    #[test]
    fn test_accessor_kind_mismatch() {
        let params = ValidatedParameters::validate(
            "test",
            SPECS,
            &raw(&[Some("cn"), Some("true"), None, Some("CREATE_ONLY")]),
            &catalog(),
        )
        .unwrap();
        assert_eq!(params.regex(0).unwrap_err().kind, ParameterErrorKind::WrongKind);
    }
}
