//! Case-insensitive key matching for balance service payloads.
//!
//! serde matches field names exactly, while the balance service contract allows
//! any casing. Payloads are therefore parsed into a [`serde_json::Value`] first
//! and every object key that matches a documented wire member, ignoring case,
//! is rewritten to its canonical spelling before typed deserialization.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

/// Every member name of the documented wire schema, in canonical casing.
pub const WIRE_FIELDS: &[&str] = &[
	"success",
	"message",
	"data",
	"id",
	"name",
	"description",
	"price",
	"currency",
	"category",
	"stock",
	"userId",
	"totalBalance",
	"availableBalance",
	"blockedBalance",
	"lastUpdated",
	"preOrder",
	"updatedBalance",
	"order",
	"orderId",
	"amount",
	"timestamp",
	"status",
	"completedAt",
	"cancelledAt",
	"errorCode",
	"errorMessage",
];

static CANONICAL: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
	WIRE_FIELDS
		.iter()
		.map(|field| (field.to_ascii_lowercase(), *field))
		.collect()
});

/// Rewrites object keys in place to the canonical wire spelling.
///
/// Unknown keys are left untouched. When two keys collapse onto the same
/// canonical name, the one that appears last wins.
pub fn canonicalize_keys(value: &mut Value) {
	match value {
		Value::Object(map) => {
			let entries = std::mem::take(map);
			for (key, mut inner) in entries {
				canonicalize_keys(&mut inner);
				let key = match CANONICAL.get(&key.to_ascii_lowercase()) {
					Some(canonical) => (*canonical).to_string(),
					None => key,
				};
				map.insert(key, inner);
			}
		},
		Value::Array(items) => items.iter_mut().for_each(canonicalize_keys),
		_ => {},
	}
}
