//! Billing address captured at checkout and stored on the user.

use serde::{Deserialize, Serialize};

/// Postal billing address. Every field is optional; Stripe fills the gaps
/// with `billing_address_collection=required` on the hosted page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub name: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl BillingAddress {
    /// Returns a copy with blank fields collapsed to `None`.
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Self {
            name: clean(&self.name),
            line1: clean(&self.line1),
            line2: clean(&self.line2),
            city: clean(&self.city),
            state: clean(&self.state),
            postal_code: clean(&self.postal_code),
            country: clean(&self.country).map(|c| c.to_ascii_uppercase()),
        }
    }

    /// Returns true when no address field (name excluded) is set.
    pub fn is_empty(&self) -> bool {
        self.line1.is_none()
            && self.line2.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }

    /// Stripe form parameters for `address[...]`, skipping unset fields.
    pub fn address_form_params(&self) -> Vec<(&'static str, String)> {
        [
            ("address[line1]", &self.line1),
            ("address[line2]", &self.line2),
            ("address[city]", &self.city),
            ("address[state]", &self.state),
            ("address[postal_code]", &self.postal_code),
            ("address[country]", &self.country),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}
