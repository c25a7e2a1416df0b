//! On-demand feature derivation for credit cards and transactions.
//!
//! Each deriver maps a lookup key (plus, for credit cards, a caller-supplied
//! reference time) to a fixed-shape feature tuple: one point fetch through
//! the injected [`RecordFetcher`], one parse step, one return. No caching,
//! no clock reads, no recovery; every failure propagates to the caller.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::datefmt::{parse_date, parse_datetime, DateFieldFormat, MalformedDate};
use crate::store::{FetchError, RecordFetcher};

/// Per-field date formats for the parsed record fields. Defaults match the
/// stored formats; overriding a field is a configuration change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeriveConfig {
    pub expires_format: DateFieldFormat,
    pub birthdate_format: DateFieldFormat,
    pub datetime_format: DateFieldFormat,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            expires_format: DateFieldFormat::month_year("%m/%y"),
            birthdate_format: DateFieldFormat::date("%Y-%m-%d"),
            datetime_format: DateFieldFormat::datetime("%Y-%m-%d %H:%M:%S"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCardFeatures {
    pub cc_num: i64,
    pub days_to_expiry: i64,
    pub age_at_transaction: i64,
    pub sex: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFeatures {
    pub cc_num: i64,
    pub category: String,
    pub transaction_time: NaiveDateTime,
    pub amount: f64,
    pub city: String,
    pub country: String,
    pub fraud_label: i64,
}

/// One slot of a materialized output tuple.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl CreditCardFeatures {
    /// Output tuple in declared column order.
    pub fn into_values(self) -> Vec<FeatureValue> {
        vec![
            FeatureValue::Int(self.cc_num),
            FeatureValue::Int(self.days_to_expiry),
            FeatureValue::Int(self.age_at_transaction),
            FeatureValue::Text(self.sex),
            FeatureValue::Text(self.city),
            FeatureValue::Text(self.country),
        ]
    }
}

impl TransactionFeatures {
    /// Output tuple in declared column order.
    pub fn into_values(self) -> Vec<FeatureValue> {
        vec![
            FeatureValue::Int(self.cc_num),
            FeatureValue::Text(self.category),
            FeatureValue::Timestamp(self.transaction_time),
            FeatureValue::Float(self.amount),
            FeatureValue::Text(self.city),
            FeatureValue::Text(self.country),
            FeatureValue::Int(self.fraud_label),
        ]
    }
}

#[derive(Debug, Error)]
pub enum DeriveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    MalformedDate(#[from] MalformedDate),
}

/// Derive card-holder features for `cc_num` as of `reference_time`.
///
/// `reference_time` is "now" as supplied by the caller, never a clock read.
/// `days_to_expiry` is the signed whole-day count from `reference_time` to
/// the expiry (day pinned to the first of the month), negative once expired;
/// `age_at_transaction` is the signed whole-day count from the birthdate to
/// `reference_time`. Both truncate toward zero.
pub fn derive_credit_card_features(
    cc_num: i64,
    reference_time: NaiveDateTime,
    fetcher: &dyn RecordFetcher,
    cfg: &DeriveConfig,
) -> Result<CreditCardFeatures, DeriveError> {
    let record = fetcher.credit_card(cc_num)?;
    let expiry = parse_date("expires", &record.expires, &cfg.expires_format)?;
    let birthdate = parse_date("birthdate", &record.birthdate, &cfg.birthdate_format)?;

    let days_to_expiry = (expiry.and_time(NaiveTime::MIN) - reference_time).num_days();
    let age_at_transaction = (reference_time - birthdate.and_time(NaiveTime::MIN)).num_days();

    info!(
        component = "features",
        event = "features.credit_card.derived",
        cc_num = record.cc_num,
        days_to_expiry,
        age_at_transaction
    );

    Ok(CreditCardFeatures {
        cc_num: record.cc_num,
        days_to_expiry,
        age_at_transaction,
        sex: record.sex,
        city: record.city,
        country: record.country,
    })
}

/// Derive transaction features for `tid`.
///
/// No reference time is taken: the relevant timestamp is the record's own
/// stored `datetime`, reparsed into a structured [`NaiveDateTime`].
pub fn derive_transaction_features(
    tid: i64,
    fetcher: &dyn RecordFetcher,
    cfg: &DeriveConfig,
) -> Result<TransactionFeatures, DeriveError> {
    let record = fetcher.transaction(tid)?;
    let transaction_time = parse_datetime("datetime", &record.datetime, &cfg.datetime_format)?;

    info!(
        component = "features",
        event = "features.transaction.derived",
        tid,
        cc_num = record.cc_num,
        transaction_time = %transaction_time
    );

    Ok(TransactionFeatures {
        cc_num: record.cc_num,
        category: record.category,
        transaction_time,
        amount: record.amount,
        city: record.city,
        country: record.country,
        fraud_label: record.fraud_label,
    })
}
