//! Pricing calculator for quote totals
//!
//! Pure computation of subtotal/tax/discount/total from a quote's line
//! items and pricing inputs. Arithmetic is carried at full precision;
//! rounding to two decimals happens only at the presentation boundary
//! via [`round_currency`], never between intermediate steps.

use thiserror::Error;

use crate::entities::quote::{DiscountType, Quote, QuoteItem};

/// Tolerance for comparing stored vs recomputed monetary values
pub const MONEY_EPSILON: f64 = 1e-6;

/// Computed monetary totals for a quote
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total: f64,
}

/// Validation failures reported before totals are computed
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("item {index} ('{description}') has non-positive quantity: {quantity}")]
    NonPositiveQuantity {
        index: usize,
        description: String,
        quantity: f64,
    },

    #[error("item {index} ('{description}') has negative unit price: {unit_price}")]
    NegativeUnitPrice {
        index: usize,
        description: String,
        unit_price: f64,
    },

    #[error("tax rate must not be negative: {0}")]
    NegativeTaxRate(f64),

    #[error("discount value must not be negative: {0}")]
    NegativeDiscount(f64),
}

/// Compute quote totals from line items and pricing inputs.
///
/// `subtotal = Σ quantity × unit_price` (0 for an empty item list),
/// `tax = apply_tax ? subtotal × tax_rate/100 : 0`,
/// `discount = percentage ? subtotal × discount_value/100 : discount_value`,
/// `total = subtotal + tax − discount`.
///
/// The total is deliberately not clamped at zero: a discount larger than
/// subtotal plus tax yields a negative total, surfaced as-is.
pub fn compute_totals(
    items: &[QuoteItem],
    apply_tax: bool,
    tax_rate: f64,
    discount_type: DiscountType,
    discount_value: f64,
) -> Result<Totals, PricingError> {
    validate_items(items)?;
    if tax_rate < 0.0 {
        return Err(PricingError::NegativeTaxRate(tax_rate));
    }
    if discount_value < 0.0 {
        return Err(PricingError::NegativeDiscount(discount_value));
    }

    let subtotal: f64 = items.iter().map(|i| i.quantity * i.unit_price).sum();
    let tax_amount = if apply_tax {
        subtotal * tax_rate / 100.0
    } else {
        0.0
    };
    let discount_amount = match discount_type {
        DiscountType::Percentage => subtotal * discount_value / 100.0,
        DiscountType::Fixed => discount_value,
    };
    let total = subtotal + tax_amount - discount_amount;

    Ok(Totals {
        subtotal,
        tax_amount,
        discount_amount,
        total,
    })
}

/// Compute totals for a quote from its own items and pricing inputs
pub fn compute_quote_totals(quote: &Quote) -> Result<Totals, PricingError> {
    compute_totals(
        &quote.items,
        quote.apply_tax,
        quote.tax_rate,
        quote.discount_type,
        quote.discount_value,
    )
}

/// Check that a quote's stored totals match a fresh computation.
///
/// Returns the recomputed totals when they agree, or `None` when the
/// stored values have drifted (stale or hand-edited record).
pub fn verify_stored_totals(quote: &Quote) -> Result<Option<Totals>, PricingError> {
    let fresh = compute_quote_totals(quote)?;
    let current = (fresh.subtotal - quote.subtotal).abs() < MONEY_EPSILON
        && (fresh.tax_amount - quote.tax_amount).abs() < MONEY_EPSILON
        && (fresh.discount_amount - quote.discount_amount).abs() < MONEY_EPSILON
        && (fresh.total - quote.total).abs() < MONEY_EPSILON;
    Ok(if current { Some(fresh) } else { None })
}

/// Validate line items before any computation.
///
/// Quantities must be strictly positive and unit prices non-negative;
/// offending items are reported, never clamped.
pub fn validate_items(items: &[QuoteItem]) -> Result<(), PricingError> {
    for (index, item) in items.iter().enumerate() {
        if item.quantity <= 0.0 {
            return Err(PricingError::NonPositiveQuantity {
                index,
                description: item.description.clone(),
                quantity: item.quantity,
            });
        }
        if item.unit_price < 0.0 {
            return Err(PricingError::NegativeUnitPrice {
                index,
                description: item.description.clone(),
                unit_price: item.unit_price,
            });
        }
    }
    Ok(())
}

/// Round a monetary value to two decimals for display
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a monetary value for display (two decimals)
pub fn format_currency(value: f64) -> String {
    format!("{:.2}", round_currency(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::quote::QuoteItemKind;

    fn item(quantity: f64, unit_price: f64) -> QuoteItem {
        QuoteItem {
            kind: QuoteItemKind::Custom,
            material: None,
            description: "Test item".to_string(),
            quantity,
            unit_price,
            display_order: 0,
        }
    }

    #[test]
    fn test_empty_items_all_zero() {
        let totals =
            compute_totals(&[], true, 8.25, DiscountType::Percentage, 0.0).unwrap();
        assert_eq!(totals.subtotal, 0.0);
        assert_eq!(totals.tax_amount, 0.0);
        assert_eq!(totals.discount_amount, 0.0);
        assert_eq!(totals.total, 0.0);
    }

    #[test]
    fn test_tax_and_percentage_discount() {
        let items = vec![item(3.0, 15.00)];
        let totals =
            compute_totals(&items, true, 8.25, DiscountType::Percentage, 10.0).unwrap();
        assert_eq!(totals.subtotal, 45.00);
        assert!((totals.tax_amount - 3.7125).abs() < MONEY_EPSILON);
        assert_eq!(totals.discount_amount, 4.50);
        assert!((totals.total - 44.2125).abs() < MONEY_EPSILON);
        assert_eq!(format_currency(totals.total), "44.21");
    }

    #[test]
    fn test_total_identity_holds_without_intermediate_rounding() {
        let items = vec![item(7.0, 19.99), item(2.5, 3.33), item(1.0, 0.01)];
        let totals =
            compute_totals(&items, true, 7.375, DiscountType::Percentage, 12.5).unwrap();
        assert_eq!(
            totals.total,
            totals.subtotal + totals.tax_amount - totals.discount_amount
        );
    }

    #[test]
    fn test_fixed_discount() {
        let items = vec![item(2.0, 50.0)];
        let totals =
            compute_totals(&items, false, 0.0, DiscountType::Fixed, 25.0).unwrap();
        assert_eq!(totals.subtotal, 100.0);
        assert_eq!(totals.tax_amount, 0.0);
        assert_eq!(totals.discount_amount, 25.0);
        assert_eq!(totals.total, 75.0);
    }

    #[test]
    fn test_no_tax_when_disabled() {
        let items = vec![item(1.0, 100.0)];
        let totals =
            compute_totals(&items, false, 8.25, DiscountType::Percentage, 0.0).unwrap();
        assert_eq!(totals.tax_amount, 0.0);
        assert_eq!(totals.total, 100.0);
    }

    #[test]
    fn test_negative_total_not_clamped() {
        let items = vec![item(1.0, 10.0)];
        let totals =
            compute_totals(&items, false, 0.0, DiscountType::Fixed, 50.0).unwrap();
        assert_eq!(totals.total, -40.0);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let items = vec![item(0.0, 10.0)];
        let err =
            compute_totals(&items, false, 0.0, DiscountType::Fixed, 0.0).unwrap_err();
        assert!(matches!(err, PricingError::NonPositiveQuantity { index: 0, .. }));
    }

    #[test]
    fn test_negative_unit_price_rejected() {
        let items = vec![item(1.0, 5.0), item(2.0, -1.0)];
        let err =
            compute_totals(&items, false, 0.0, DiscountType::Fixed, 0.0).unwrap_err();
        assert!(matches!(err, PricingError::NegativeUnitPrice { index: 1, .. }));
    }

    #[test]
    fn test_negative_discount_rejected() {
        let err =
            compute_totals(&[], false, 0.0, DiscountType::Fixed, -1.0).unwrap_err();
        assert_eq!(err, PricingError::NegativeDiscount(-1.0));
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(44.2125), 44.21);
        assert_eq!(round_currency(1.339), 1.34);
        assert_eq!(round_currency(0.0), 0.0);
    }
}
