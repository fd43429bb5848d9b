//! Field normalization onto the canonical invoice schema.
//!
//! Analysis services label the same field many ways ("Invoice No",
//! "Invoice Number", ...). `normalize` maps whatever labels came back onto
//! a fixed schema so every ledger row has the same columns.

use serde::{Deserialize, Serialize};

use super::KvMap;

/// The canonical output record. Missing fields are empty strings, never
/// omitted, so the ledger schema is stable across all records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFields {
    #[serde(rename = "Invoice Number")]
    pub invoice_number: String,
    #[serde(rename = "Invoice Date")]
    pub invoice_date: String,
    #[serde(rename = "GSTIN")]
    pub gstin: String,
    #[serde(rename = "Buyer Name")]
    pub buyer_name: String,
    #[serde(rename = "Buyer Contact")]
    pub buyer_contact: String,
    #[serde(rename = "Total Amount")]
    pub total_amount: String,
    #[serde(rename = "HSN Code")]
    pub hsn_code: String,
    #[serde(rename = "CGST")]
    pub cgst: String,
    #[serde(rename = "SGST")]
    pub sgst: String,
    #[serde(rename = "Bank Name")]
    pub bank_name: String,
    #[serde(rename = "Account Number")]
    pub account_number: String,
    #[serde(rename = "IFSC Code")]
    pub ifsc_code: String,
    #[serde(rename = "Quantity")]
    pub quantity: String,
    #[serde(rename = "Description")]
    pub description: String,
}

impl InvoiceFields {
    /// True when at least one field is non-empty. An all-empty record is
    /// "no usable data" and must not be written to the ledger.
    pub fn has_data(&self) -> bool {
        [
            &self.invoice_number,
            &self.invoice_date,
            &self.gstin,
            &self.buyer_name,
            &self.buyer_contact,
            &self.total_amount,
            &self.hsn_code,
            &self.cgst,
            &self.sgst,
            &self.bank_name,
            &self.account_number,
            &self.ifsc_code,
            &self.quantity,
            &self.description,
        ]
        .iter()
        .any(|f| !f.is_empty())
    }
}

/// Find the value of the first raw key matching any of the label synonyms.
///
/// Synonyms are tried in order; a synonym matches a raw key when the key
/// contains it case-insensitively. Raw keys are scanned in sorted order so
/// the result is deterministic regardless of map iteration order.
fn match_key(sorted_keys: &[&String], raw: &KvMap, synonyms: &[&str]) -> String {
    for synonym in synonyms {
        let needle = synonym.to_lowercase();
        for key in sorted_keys {
            if key.to_lowercase().contains(&needle) {
                return raw[*key].clone();
            }
        }
    }
    String::new()
}

/// Map a raw key/value mapping onto the canonical schema.
///
/// Pure function: same input, same output. Unmatched canonical fields
/// default to the empty string.
pub fn normalize(raw: &KvMap) -> InvoiceFields {
    let mut sorted_keys: Vec<&String> = raw.keys().collect();
    sorted_keys.sort();
    let keys = sorted_keys.as_slice();

    InvoiceFields {
        invoice_number: match_key(keys, raw, &["Invoice No", "Invoice Number"]),
        invoice_date: match_key(keys, raw, &["Dated", "Invoice Date", "Date"]),
        gstin: match_key(keys, raw, &["GSTIN"]),
        buyer_name: match_key(
            keys,
            raw,
            &[
                "Buyer",
                "BILLED TO",
                "Bill to",
                "Buyer (Bill to)",
                "Party",
                "Customer",
                "Consignee",
            ],
        ),
        buyer_contact: match_key(keys, raw, &["Mobile", "Contact"]),
        total_amount: match_key(
            keys,
            raw,
            &["Total", "Total Amount", "GrandTotal", "Invoice Total", "Amount Payable"],
        ),
        hsn_code: match_key(keys, raw, &["HSN", "HSN/SAC"]),
        cgst: match_key(keys, raw, &["CGST"]),
        sgst: match_key(keys, raw, &["SGST"]),
        bank_name: match_key(keys, raw, &["Bank Name"]),
        account_number: match_key(keys, raw, &["Account No", "A/c No"]),
        ifsc_code: match_key(keys, raw, &["IFSC", "IFSC Code"]),
        quantity: match_key(keys, raw, &["Quantity", "Qty"]),
        description: match_key(keys, raw, &["Description of Goods", "Description"]),
    }
}
