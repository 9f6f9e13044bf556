use thiserror::Error;

use crate::db_types::{Money, Service};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("Quantity {quantity} is outside the allowed range {min}..={max}")]
    QuantityOutOfRange { quantity: i64, min: i64, max: i64 },
}

/// The base-currency cost of `quantity` units of `service`, including the storefront markup.
///
/// `rate` is quoted per 1000 units.
pub fn order_cost(service: &Service, quantity: i64, markup_percent: f64) -> Result<Money, PriceError> {
    if quantity < service.min_quantity || quantity > service.max_quantity {
        return Err(PriceError::QuantityOutOfRange {
            quantity,
            min: service.min_quantity,
            max: service.max_quantity,
        });
    }
    let cost = service.rate.mul_div(quantity, 1000);
    Ok(cost + cost.percent(markup_percent))
}

#[cfg(test)]
mod test {
    use super::*;

    fn service(rate: Money) -> Service {
        Service {
            service_id: "1".into(),
            name: "Followers".into(),
            category_id: "ig".into(),
            service_type: "default".into(),
            rate,
            min_quantity: 100,
            max_quantity: 10_000,
        }
    }

    #[test]
    fn cost_includes_markup() {
        // $2.00 per 1000, 1000 units, 10% markup
        let cost = order_cost(&service(Money::from_units(2)), 1000, 10.0).unwrap();
        assert_eq!(cost, Money::from(2_200_000));
        // 500 units is half the rate
        let cost = order_cost(&service(Money::from_units(2)), 500, 0.0).unwrap();
        assert_eq!(cost, Money::from_units(1));
    }

    #[test]
    fn quantity_limits() {
        let err = order_cost(&service(Money::from_units(2)), 50, 10.0).unwrap_err();
        assert_eq!(err, PriceError::QuantityOutOfRange { quantity: 50, min: 100, max: 10_000 });
        assert!(order_cost(&service(Money::from_units(2)), 10_001, 10.0).is_err());
    }
}
