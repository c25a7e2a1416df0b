//! ODFS core crate: on-demand feature derivation over a relational store.
//!
//! Implemented scope:
//! - typed point-lookup fetching over the store (`store`)
//! - per-field date parsing strategies (`datefmt`)
//! - credit-card and transaction feature derivers (`features`)
//! - deriver registration signatures (`signature`)
//! - HTTP serving surface (`serving`)

mod datefmt;
mod features;
mod observability;
mod serving;
mod signature;
mod store;

pub use datefmt::{parse_date, parse_datetime, DateFieldFormat, DateFieldKind, MalformedDate};
pub use features::{
    derive_credit_card_features, derive_transaction_features, CreditCardFeatures, DeriveConfig,
    DeriveError, FeatureValue, TransactionFeatures,
};
pub use observability::{
    init_logging, log_server_bind, log_server_start, log_store_opened, LogFormat, LoggingConfig,
    LoggingInitError,
};
pub use serving::{feature_router, REFERENCE_TIME_QUERY_FORMAT};
pub use signature::{
    check_output_shape, credit_card_signature, transaction_signature, DeriverSignature,
    FeatureType, InputParam, OutputColumn, SignatureError,
};
pub use store::{
    CardRecord, FetchError, RecordFetcher, SqliteRecordFetcher, TransactionRecord,
    CREDIT_CARDS_TABLE, TRANSACTIONS_TABLE,
};
