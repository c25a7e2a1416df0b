//! Declared registration signatures for the derivers.
//!
//! The external feature-computation framework registers each deriver with
//! its ordered input parameters, ordered output column types, and the input
//! parameters dropped from the output schema. Signatures carry a SHA-256
//! fingerprint so registrations can be compared without field-by-field
//! diffing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::features::FeatureValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Int,
    Float,
    Text,
    Timestamp,
}

impl FeatureType {
    pub fn code(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputParam {
    pub name: String,
    pub dtype: FeatureType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    pub name: String,
    pub dtype: FeatureType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeriverSignature {
    pub name: String,
    pub inputs: Vec<InputParam>,
    pub outputs: Vec<OutputColumn>,
    /// Input parameters consumed by the deriver but dropped from the
    /// declared output schema.
    pub dropped_inputs: Vec<String>,
    pub fingerprint: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("output arity mismatch for {deriver}: expected {expected}, got {actual}")]
    ArityMismatch {
        deriver: String,
        expected: usize,
        actual: usize,
    },
    #[error("output column {column} of {deriver} expects {expected}, got {actual}")]
    TypeMismatch {
        deriver: String,
        column: String,
        expected: &'static str,
        actual: &'static str,
    },
}

pub fn credit_card_signature() -> DeriverSignature {
    build_signature(
        "credit_card_features",
        vec![
            input("cc_num", FeatureType::Int),
            input("current_datetime", FeatureType::Timestamp),
        ],
        vec![
            output("cc_num", FeatureType::Int),
            output("days_to_expiry", FeatureType::Int),
            output("age_at_transaction", FeatureType::Int),
            output("sex", FeatureType::Text),
            output("city", FeatureType::Text),
            output("country", FeatureType::Text),
        ],
        vec!["current_datetime".to_string()],
    )
}

pub fn transaction_signature() -> DeriverSignature {
    build_signature(
        "transaction_features",
        vec![input("tid", FeatureType::Int)],
        vec![
            output("cc_num", FeatureType::Int),
            output("category", FeatureType::Text),
            output("transaction_time", FeatureType::Timestamp),
            output("amount", FeatureType::Float),
            output("city", FeatureType::Text),
            output("country", FeatureType::Text),
            output("fraud_label", FeatureType::Int),
        ],
        Vec::new(),
    )
}

/// Validate a materialized output tuple against its declared signature.
pub fn check_output_shape(
    signature: &DeriverSignature,
    values: &[FeatureValue],
) -> Result<(), SignatureError> {
    if values.len() != signature.outputs.len() {
        return Err(SignatureError::ArityMismatch {
            deriver: signature.name.clone(),
            expected: signature.outputs.len(),
            actual: values.len(),
        });
    }

    for (column, value) in signature.outputs.iter().zip(values) {
        let actual = value_type(value);
        if column.dtype != actual {
            return Err(SignatureError::TypeMismatch {
                deriver: signature.name.clone(),
                column: column.name.clone(),
                expected: column.dtype.code(),
                actual: actual.code(),
            });
        }
    }

    Ok(())
}

fn value_type(value: &FeatureValue) -> FeatureType {
    match value {
        FeatureValue::Int(_) => FeatureType::Int,
        FeatureValue::Float(_) => FeatureType::Float,
        FeatureValue::Text(_) => FeatureType::Text,
        FeatureValue::Timestamp(_) => FeatureType::Timestamp,
    }
}

fn input(name: &str, dtype: FeatureType) -> InputParam {
    InputParam {
        name: name.to_string(),
        dtype,
    }
}

fn output(name: &str, dtype: FeatureType) -> OutputColumn {
    OutputColumn {
        name: name.to_string(),
        dtype,
    }
}

fn build_signature(
    name: &str,
    inputs: Vec<InputParam>,
    outputs: Vec<OutputColumn>,
    dropped_inputs: Vec<String>,
) -> DeriverSignature {
    let fingerprint = signature_fingerprint(name, &inputs, &outputs, &dropped_inputs);
    DeriverSignature {
        name: name.to_string(),
        inputs,
        outputs,
        dropped_inputs,
        fingerprint,
    }
}

fn signature_fingerprint(
    name: &str,
    inputs: &[InputParam],
    outputs: &[OutputColumn],
    dropped_inputs: &[String],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("name:{name};"));
    hasher.update("inputs:");
    for param in inputs {
        hasher.update(param.name.as_bytes());
        hasher.update(":");
        hasher.update(param.dtype.code());
        hasher.update(";");
    }
    hasher.update("outputs:");
    for column in outputs {
        hasher.update(column.name.as_bytes());
        hasher.update(":");
        hasher.update(column.dtype.code());
        hasher.update(";");
    }
    hasher.update("drops:");
    for dropped in dropped_inputs {
        hasher.update(dropped.as_bytes());
        hasher.update(",");
    }
    hex::encode(hasher.finalize())
}
