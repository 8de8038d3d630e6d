//! Checkout: turning a filled-in form into an order command.
//!
//! [`build_order`] is pure. It validates the form, attaches the signed-in
//! customer's email, and prices the order from the cart. Asking the
//! customer to confirm and submitting the order are the caller's job.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::order::{NewOrder, ShippingAddress};
use crate::types::Email;

/// Raw checkout form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub name: String,
    pub phone: String,
    /// Street address line.
    pub address: String,
    pub city: String,
    pub country: String,
    pub state: String,
    pub zipcode: String,
    /// "I agree to the Terms & Conditions" checkbox.
    pub terms_accepted: bool,
}

/// A form field that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutField {
    Name,
    Phone,
    Address,
    City,
    Country,
    State,
    Zipcode,
}

impl CheckoutField {
    /// Form field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::City => "city",
            Self::Country => "country",
            Self::State => "state",
            Self::Zipcode => "zipcode",
        }
    }

    const fn required_message(self) -> &'static str {
        match self {
            Self::Name => "Name is required.",
            Self::Phone => "Phone number is required.",
            Self::Address => "Address is required.",
            Self::City => "City is required.",
            Self::Country => "Country is required.",
            Self::State => "State is required.",
            Self::Zipcode => "Zipcode is required.",
        }
    }
}

impl fmt::Display for CheckoutField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: CheckoutField,
    pub message: &'static str,
}

/// Reasons an order cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// One or more form fields failed validation.
    #[error("{}", format_field_errors(.0))]
    InvalidFields(Vec<FieldError>),

    /// The terms checkbox was not ticked.
    #[error("Terms & Conditions must be accepted")]
    TermsNotAccepted,

    /// No signed-in customer email is available.
    #[error("Sign in to place an order")]
    NotSignedIn,

    /// There is nothing to order.
    #[error("Cart is empty")]
    EmptyCart,
}

impl CheckoutError {
    /// Field errors, if this is a field validation failure.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::InvalidFields(errors) => errors,
            _ => &[],
        }
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Validate every field, reporting all failures at once.
///
/// # Errors
///
/// Returns [`CheckoutError::InvalidFields`] listing each failing field.
pub fn validate(form: &CheckoutForm) -> Result<(), CheckoutError> {
    let required = [
        (CheckoutField::Name, &form.name),
        (CheckoutField::Phone, &form.phone),
        (CheckoutField::Address, &form.address),
        (CheckoutField::City, &form.city),
        (CheckoutField::Country, &form.country),
        (CheckoutField::State, &form.state),
        (CheckoutField::Zipcode, &form.zipcode),
    ];

    let mut errors: Vec<FieldError> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|&(field, _)| FieldError {
            field,
            message: field.required_message(),
        })
        .collect();

    let phone = form.phone.trim();
    if !phone.is_empty() && !is_phone_number(phone) {
        errors.push(FieldError {
            field: CheckoutField::Phone,
            message: "Phone number must contain only digits.",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CheckoutError::InvalidFields(errors))
    }
}

/// Digits with an optional leading `+` and space or dash separators.
fn is_phone_number(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
}

/// Build the order-creation command from a checkout form.
///
/// The total and product ids come from `cart`. Product ids follow cart
/// order, one per line.
///
/// # Errors
///
/// Checks run in order: field validation, terms, sign-in, then cart.
pub fn build_order(
    form: &CheckoutForm,
    email: Option<&Email>,
    cart: &Cart,
) -> Result<NewOrder, CheckoutError> {
    validate(form)?;
    if !form.terms_accepted {
        return Err(CheckoutError::TermsNotAccepted);
    }
    let email = email.ok_or(CheckoutError::NotSignedIn)?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    Ok(NewOrder {
        name: form.name.trim().to_owned(),
        email: email.clone(),
        address: ShippingAddress {
            city: form.city.trim().to_owned(),
            country: form.country.trim().to_owned(),
            state: form.state.trim().to_owned(),
            zipcode: form.zipcode.trim().to_owned(),
        },
        phone: form.phone.trim().to_owned(),
        product_ids: cart.product_ids(),
        total_price: cart.total(),
    })
}
