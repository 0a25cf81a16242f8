//! # Decoded records and their line rendering.
//!
//! Records are flat sets of scalars decoded from one message. Rendering is driven by
//! a field layout (`&[Field]`), so the order of fields on a log line is data owned by
//! the [`Schema`](crate::Schema), not code.
//!
//! ## Wire shapes (JSON)
//! ```text
//! txn:      {"hash": "h1", "ts": 100, "function": "f", "height": 5}
//! mempool:  {"txns": [{"hash": "h2", "ts": 101, "function": "g", "packing": "pending"}, ...]}
//! ```
//! `timestamp` is accepted as an alias of `ts`.

use std::fmt;

use serde::Deserialize;

/// A record field that can appear on a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Transaction hash.
    Hash,
    /// Called function name.
    Function,
    /// Block height (confirmed transactions).
    Height,
    /// Packing state (mempool transactions).
    Packing,
    /// Event timestamp.
    Timestamp,
}

/// Scalar of loosely-typed wire fields (`packing` is sent as string, bool or number).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean flag.
    Bool(bool),
    /// Number, kept as decoded (full `u64`/`i64` range, floats keep their fraction).
    Number(serde_json::Number),
    /// Text.
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

/// Transaction confirmed on the chain head.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TxnRecord {
    pub hash: String,
    #[serde(alias = "timestamp")]
    pub ts: i64,
    pub function: String,
    pub height: u64,
}

/// Transaction observed in the mempool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MempoolRecord {
    pub hash: String,
    #[serde(alias = "timestamp")]
    pub ts: i64,
    pub function: String,
    pub packing: Scalar,
}

/// Collection message carrying mempool records.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MempoolBatch {
    #[serde(default)]
    pub txns: Vec<MempoolRecord>,
}

/// One decoded record of any schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Txn(TxnRecord),
    Mempool(MempoolRecord),
}

impl Record {
    /// Returns a displayable line with `layout` fields joined by `,`.
    pub fn line<'a>(&'a self, layout: &'a [Field]) -> RecordLine<'a> {
        RecordLine {
            record: self,
            layout,
        }
    }

    fn write_field(&self, field: Field, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, field) {
            (Record::Txn(r), Field::Hash) => f.write_str(&r.hash),
            (Record::Txn(r), Field::Function) => f.write_str(&r.function),
            (Record::Txn(r), Field::Height) => write!(f, "{}", r.height),
            (Record::Txn(r), Field::Timestamp) => write!(f, "{}", r.ts),
            (Record::Mempool(r), Field::Hash) => f.write_str(&r.hash),
            (Record::Mempool(r), Field::Function) => f.write_str(&r.function),
            (Record::Mempool(r), Field::Packing) => write!(f, "{}", r.packing),
            (Record::Mempool(r), Field::Timestamp) => write!(f, "{}", r.ts),
            // field not carried by this record shape
            (Record::Txn(_), Field::Packing) | (Record::Mempool(_), Field::Height) => Ok(()),
        }
    }
}

/// Lazily rendered record line (see [`Record::line`]).
pub struct RecordLine<'a> {
    record: &'a Record,
    layout: &'a [Field],
}

impl fmt::Display for RecordLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.layout.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            self.record.write_field(*field, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txn_accepts_timestamp_alias() {
        let r: TxnRecord =
            serde_json::from_str(r#"{"hash":"h","timestamp":7,"function":"f","height":1}"#)
                .unwrap();
        assert_eq!(r.ts, 7);
    }

    #[test]
    fn packing_keeps_wire_rendering() {
        for (raw, want) in [
            (r#""pending""#, "pending"),
            ("true", "true"),
            ("3", "3"),
            ("-7", "-7"),
            ("1.0", "1.0"),
            ("0.25", "0.25"),
            ("18446744073709551615", "18446744073709551615"),
        ] {
            let s: Scalar = serde_json::from_str(raw).unwrap();
            assert_eq!(s.to_string(), want);
        }
    }

    #[test]
    fn line_follows_layout_order() {
        let rec = Record::Txn(TxnRecord {
            hash: "h1".into(),
            ts: 100,
            function: "f".into(),
            height: 5,
        });
        let layout = [Field::Timestamp, Field::Hash];
        assert_eq!(rec.line(&layout).to_string(), "100,h1");
    }

    #[test]
    fn missing_txns_is_empty_batch() {
        let b: MempoolBatch = serde_json::from_str("{}").unwrap();
        assert!(b.txns.is_empty());
    }
}
