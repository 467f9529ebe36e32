//! Tender-specific rounding of the payable total to a configured increment.
//!
//! The only place in the system that rounds to anything other than 0.01.
//! The adjustment is reported explicitly so receipts can show it as its own
//! line.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::tax::{RoundingMethod, RoundingPolicy, TenderType};
use crate::errors::Error;
use crate::money::{round_money, zero_money};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundingOutcome {
    pub applied: bool,
    pub tender_type: Option<TenderType>,
    pub method: Option<RoundingMethod>,
    pub increment: Option<Decimal>,
    pub original_amount: Decimal,
    pub rounded_amount: Decimal,
    pub adjustment: Decimal,
}

/// Outcome when no tender type was given or no policy is configured:
/// payable equals gross and the adjustment is zero.
pub fn no_rounding(tender_type: Option<TenderType>, amount: Decimal) -> RoundingOutcome {
    let normalized = round_money(amount);
    RoundingOutcome {
        applied: false,
        tender_type,
        method: None,
        increment: None,
        original_amount: normalized,
        rounded_amount: normalized,
        adjustment: zero_money(),
    }
}

/// Rounds `amount` to the policy increment: divide into steps, round the
/// step count per the method, multiply back.
pub fn apply_policy(policy: &RoundingPolicy, amount: Decimal) -> Result<RoundingOutcome, Error> {
    let original = round_money(amount);
    let increment = round_money(policy.increment);
    if increment <= Decimal::ZERO {
        return Err(Error::validation("rounding increment must be greater than zero"));
    }

    let steps = original / increment;
    let whole_steps = match policy.method {
        RoundingMethod::Nearest => {
            steps.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        }
        RoundingMethod::Up => steps.ceil(),
        RoundingMethod::Down => steps.floor(),
    };
    let rounded = round_money(whole_steps * increment);
    let adjustment = round_money(rounded - original);

    Ok(RoundingOutcome {
        applied: true,
        tender_type: Some(policy.tender_type),
        method: Some(policy.method),
        increment: Some(increment),
        original_amount: original,
        rounded_amount: rounded,
        adjustment,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::{apply_policy, no_rounding};
    use crate::domain::catalog::StoreLocationId;
    use crate::domain::tax::{RoundingMethod, RoundingPolicy, TenderType};
    use crate::errors::Error;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).expect("decimal literal")
    }

    fn policy(method: RoundingMethod, increment: &str) -> RoundingPolicy {
        RoundingPolicy {
            id: 1,
            store_location_id: StoreLocationId(10),
            tender_type: TenderType::Cash,
            method,
            increment: dec(increment),
            active: true,
        }
    }

    #[test]
    fn nearest_ties_round_up_on_a_five_cent_increment() {
        let cases = [("10.05", "10.05"), ("10.07", "10.05"), ("10.08", "10.10")];
        for (amount, expected) in cases {
            let outcome =
                apply_policy(&policy(RoundingMethod::Nearest, "0.05"), dec(amount)).expect("apply");
            assert_eq!(outcome.rounded_amount.to_string(), expected, "amount {amount}");
            assert!(outcome.applied);
        }
    }

    #[test]
    fn nearest_midpoint_rounds_up() {
        let outcome =
            apply_policy(&policy(RoundingMethod::Nearest, "0.10"), dec("10.05")).expect("apply");
        assert_eq!(outcome.rounded_amount.to_string(), "10.10");
        assert_eq!(outcome.adjustment.to_string(), "0.05");
    }

    #[test]
    fn up_method_uses_ceiling() {
        let outcome =
            apply_policy(&policy(RoundingMethod::Up, "0.05"), dec("10.01")).expect("apply");
        assert_eq!(outcome.rounded_amount.to_string(), "10.05");
        assert_eq!(outcome.adjustment.to_string(), "0.04");
    }

    #[test]
    fn down_method_uses_floor_and_reports_negative_adjustment() {
        let outcome =
            apply_policy(&policy(RoundingMethod::Down, "0.05"), dec("10.04")).expect("apply");
        assert_eq!(outcome.rounded_amount.to_string(), "10.00");
        assert_eq!(outcome.adjustment.to_string(), "-0.04");
    }

    #[test]
    fn missing_tender_or_policy_leaves_amount_untouched() {
        let outcome = no_rounding(None, dec("17.89"));
        assert!(!outcome.applied);
        assert_eq!(outcome.rounded_amount.to_string(), "17.89");
        assert_eq!(outcome.adjustment.to_string(), "0.00");
        assert_eq!(outcome.method, None);
    }

    #[test]
    fn non_positive_increment_is_rejected() {
        let result = apply_policy(&policy(RoundingMethod::Nearest, "0.00"), dec("10.00"));
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
