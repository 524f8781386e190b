//! Validation of provider option tables.
//!
//! Every wallet backend describes the TOML options it accepts as a [`Schema`].
//! The catalog validates each configured option table against its backend's
//! schema before the backend's factory runs.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Unknown field: {0}")]
	UnknownField(String),
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
}

/// Custom check run after the type check passed.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of one option table.
///
/// Keys not declared in either list are rejected so that a typo such as
/// `infuraid` fails at startup instead of silently falling back to defaults.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		for key in table.keys() {
			let known = self
				.required
				.iter()
				.chain(self.optional.iter())
				.any(|field| &field.name == key);
			if !known {
				return Err(ValidationError::UnknownField(key.clone()));
			}
		}

		Ok(())
	}
}

/// Implemented by every backend to describe its option table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	let expected = match expected_type {
		FieldType::String if value.is_str() => return Ok(()),
		FieldType::Boolean if value.is_bool() => return Ok(()),
		FieldType::Integer { min, max } => match value.as_integer() {
			Some(int_val) => return check_bounds(field_name, int_val, *min, *max),
			None => "integer",
		},
		FieldType::String => "string",
		FieldType::Boolean => "boolean",
	};
	Err(ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	})
}

fn check_bounds(
	field_name: &str,
	int_val: i64,
	min: Option<i64>,
	max: Option<i64>,
) -> Result<(), ValidationError> {
	let message = match (min, max) {
		(Some(min), _) if int_val < min => format!("Value {} is less than minimum {}", int_val, min),
		(_, Some(max)) if int_val > max => {
			format!("Value {} is greater than maximum {}", int_val, max)
		},
		_ => return Ok(()),
	};
	Err(ValidationError::InvalidValue {
		field: field_name.to_string(),
		message,
	})
}

/// Rejects empty strings; shared by backends for credential fields.
pub fn non_empty_string(value: &toml::Value) -> Result<(), String> {
	match value.as_str() {
		Some(s) if !s.trim().is_empty() => Ok(()),
		_ => Err("must not be empty".to_string()),
	}
}
