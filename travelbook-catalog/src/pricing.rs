use rust_decimal::Decimal;

/// Decimal places carried by every amount.
pub const PRICE_SCALE: u32 = 2;

/// Largest amount representable in a `NUMERIC(10, 2)` column.
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, PRICE_SCALE)
}

/// Validate a unit price and bring it to two decimal places.
///
/// Amounts with finer precision than a cent are rejected rather than rounded.
pub fn normalize_unit_price(price: Decimal) -> Result<Decimal, PricingError> {
    if price < Decimal::ZERO {
        return Err(PricingError::Negative(price));
    }

    if price.normalize().scale() > PRICE_SCALE {
        return Err(PricingError::TooPrecise(price));
    }

    if price > max_amount() {
        return Err(PricingError::OutOfRange(price));
    }

    let mut normalized = price;
    normalized.rescale(PRICE_SCALE);
    Ok(normalized)
}

/// Total for `seats` seats at `unit_price`, fixed at booking time.
pub fn total_price(unit_price: Decimal, seats: i32) -> Result<Decimal, PricingError> {
    if seats < 1 {
        return Err(PricingError::InvalidQuantity(seats));
    }

    let unit_price = normalize_unit_price(unit_price)?;

    let mut total = unit_price
        .checked_mul(Decimal::from(seats))
        .filter(|total| *total <= max_amount())
        .ok_or(PricingError::TotalOutOfRange { unit_price, seats })?;

    total.rescale(PRICE_SCALE);
    Ok(total)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("Price must not be negative: {0}")]
    Negative(Decimal),

    #[error("Price has more than two decimal places: {0}")]
    TooPrecise(Decimal),

    #[error("Price exceeds the maximum amount: {0}")]
    OutOfRange(Decimal),

    #[error("Seat quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("Total for {seats} seats at {unit_price} exceeds the maximum amount")]
    TotalOutOfRange {
        unit_price: Decimal,
        seats: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_total_is_unit_times_seats() {
        assert_eq!(total_price(amount("89.50"), 2).unwrap(), amount("179.00"));
        assert_eq!(total_price(amount("100"), 3).unwrap().to_string(), "300.00");
        assert_eq!(total_price(amount("299.99"), 1).unwrap(), amount("299.99"));
    }

    #[test]
    fn test_free_travel_is_allowed() {
        assert_eq!(total_price(Decimal::ZERO, 4).unwrap().to_string(), "0.00");
    }

    #[test]
    fn test_unit_price_validation() {
        assert_eq!(normalize_unit_price(amount("45")).unwrap().to_string(), "45.00");
        assert_eq!(normalize_unit_price(amount("45.500")).unwrap().to_string(), "45.50");
        assert!(matches!(normalize_unit_price(amount("-1.00")), Err(PricingError::Negative(_))));
        assert!(matches!(normalize_unit_price(amount("1.005")), Err(PricingError::TooPrecise(_))));
        assert!(matches!(
            normalize_unit_price(amount("100000000.00")),
            Err(PricingError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_total_overflow_and_quantity() {
        assert!(matches!(
            total_price(amount("99999999.99"), 2),
            Err(PricingError::TotalOutOfRange { seats: 2, .. })
        ));
        assert_eq!(total_price(amount("10.00"), 0), Err(PricingError::InvalidQuantity(0)));
    }
}
