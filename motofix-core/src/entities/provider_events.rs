//! Parsing of raw payment-provider callbacks.
//!
//! The ingestion endpoint stores callback bodies verbatim; parsing happens
//! only inside the processing unit so that malformed payloads surface as a
//! recorded failure on the inbox record instead of a dropped request.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use time::PrimitiveDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

/// Sentinel pair the provider sends for a successful payment.
pub const PROVIDER_OK_CODE: &str = "00";
pub const PROVIDER_OK_DESC: &str = "success";

/// Errors produced while parsing a raw callback body.
#[derive(Debug, Error)]
pub enum ProviderEventParseError {
    #[error("malformed callback payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct ProviderCallback {
    data: ProviderCallbackData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderCallbackData {
    order_code: i64,
    amount: Decimal,
    code: String,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    transaction_date_time: Option<String>,
}

/// One parsed provider event, ready for the ledger reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEvent {
    pub order_code: i64,
    pub amount: Decimal,
    pub provider_code: String,
    pub provider_desc: Option<String>,
    pub transaction_time: Option<PrimitiveDateTime>,
}

impl ProviderEvent {
    /// Parse a raw callback body as stored in the inbox.
    pub fn parse(raw: &str) -> Result<Self, ProviderEventParseError> {
        let callback: ProviderCallback = serde_json::from_str(raw)?;
        let data = callback.data;
        Ok(Self {
            order_code: data.order_code,
            amount: data.amount,
            provider_code: data.code,
            provider_desc: data.desc,
            transaction_time: data
                .transaction_date_time
                .as_deref()
                .and_then(parse_transaction_time),
        })
    }

    /// True iff the provider's code/desc pair matches the "ok" sentinel.
    pub fn is_success(&self) -> bool {
        self.provider_code == PROVIDER_OK_CODE
            && self
                .provider_desc
                .as_deref()
                .is_some_and(|desc| desc.eq_ignore_ascii_case(PROVIDER_OK_DESC))
    }
}

/// The provider has been observed sending both RFC 3339 and a plain
/// `YYYY-MM-DD hh:mm:ss` timestamp. An unrecognized value degrades to
/// `None` rather than failing the whole event; the reconciler falls back
/// to the wall clock for the payment date.
fn parse_transaction_time(value: &str) -> Option<PrimitiveDateTime> {
    const PLAIN: &[time::format_description::BorrowedFormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    if let Ok(dt) = PrimitiveDateTime::parse(value, PLAIN) {
        return Some(dt);
    }
    time::OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .map(|dt| {
            let utc = dt.to_offset(time::UtcOffset::UTC);
            PrimitiveDateTime::new(utc.date(), utc.time())
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use rust_decimal::Decimal;
    use time::macros::datetime;

    #[test]
    fn parses_successful_callback() {
        let raw = r#"{
            "data": {
                "orderCode": 4211,
                "amount": 1250000.5,
                "code": "00",
                "desc": "success",
                "transactionDateTime": "2025-03-14 09:26:53"
            }
        }"#;
        let event = ProviderEvent::parse(raw).unwrap();
        assert_eq!(event.order_code, 4211);
        assert_eq!(event.amount, Decimal::new(12_500_005, 1));
        assert!(event.is_success());
        assert_eq!(
            event.transaction_time,
            Some(datetime!(2025-03-14 09:26:53))
        );
    }

    #[test]
    fn parses_rfc3339_transaction_time() {
        let raw = r#"{"data":{"orderCode":1,"amount":10,"code":"00","desc":"success","transactionDateTime":"2025-03-14T09:26:53+07:00"}}"#;
        let event = ProviderEvent::parse(raw).unwrap();
        assert_eq!(
            event.transaction_time,
            Some(datetime!(2025-03-14 02:26:53))
        );
    }

    #[test]
    fn failure_code_is_not_success() {
        let raw = r#"{"data":{"orderCode":7,"amount":5,"code":"01","desc":"cancelled by user"}}"#;
        let event = ProviderEvent::parse(raw).unwrap();
        assert!(!event.is_success());
        assert!(event.transaction_time.is_none());
    }

    #[test]
    fn missing_desc_is_not_success() {
        let raw = r#"{"data":{"orderCode":7,"amount":5,"code":"00"}}"#;
        let event = ProviderEvent::parse(raw).unwrap();
        assert!(!event.is_success());
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(ProviderEvent::parse("not json at all").is_err());
        assert!(ProviderEvent::parse(r#"{"data":{}}"#).is_err());
    }

    #[test]
    fn unknown_timestamp_format_degrades_to_none() {
        let raw = r#"{"data":{"orderCode":1,"amount":10,"code":"00","desc":"success","transactionDateTime":"14/03/2025"}}"#;
        let event = ProviderEvent::parse(raw).unwrap();
        assert!(event.transaction_time.is_none());
    }
}
