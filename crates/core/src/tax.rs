//! Per-line tax math for inclusive, exclusive, exempt, and zero-rated lines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::tax::{StoreTaxRule, TaxGroup, TaxMode};
use crate::errors::Error;
use crate::money::{round_dp, round_money, round_rate, zero_money, AMOUNT_SCALE};

const ONE_HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxLineAmounts {
    pub net: Decimal,
    pub tax: Decimal,
    pub gross: Decimal,
    pub exempt: bool,
    pub zero_rated: bool,
    pub rate_percent: Decimal,
}

/// Picks the applicable rule at `at`: most recent effective_from first,
/// then highest id. Returns None when no rule covers the instant, which
/// callers treat as a validation failure — there is no default rate.
pub fn applicable_rule(rules: &[StoreTaxRule], at: DateTime<Utc>) -> Option<&StoreTaxRule> {
    rules
        .iter()
        .filter(|rule| rule.applies_at(at))
        .max_by_key(|rule| (rule.effective_from.unwrap_or(DateTime::<Utc>::MIN_UTC), rule.id))
}

fn normalize_rate_percent(rate_percent: Decimal) -> Result<Decimal, Error> {
    let normalized = round_rate(rate_percent);
    if normalized < Decimal::ZERO || normalized > ONE_HUNDRED {
        return Err(Error::validation("taxRatePercent must be between 0 and 100"));
    }
    Ok(normalized)
}

/// Computes net/tax/gross for one line.
///
/// A zero rate is reported as zero-rated even when the group flag is unset,
/// and zero-rated lines are also exempt in the output: both produce tax =
/// 0.00, but the flags stay distinguishable for receipt rendering.
pub fn line_amounts(
    quantity: Decimal,
    unit_price: Decimal,
    group: &TaxGroup,
    rule: &StoreTaxRule,
) -> Result<TaxLineAmounts, Error> {
    let rate_percent = normalize_rate_percent(group.rate_percent)?;
    let rate = rate_percent / ONE_HUNDRED;
    let line_amount = round_money(unit_price * quantity);

    let zero_rated = group.zero_rated || rate_percent.is_zero();
    if rule.exempt || zero_rated {
        return Ok(TaxLineAmounts {
            net: line_amount,
            tax: zero_money(),
            gross: line_amount,
            exempt: true,
            zero_rated,
            rate_percent,
        });
    }

    match rule.mode {
        TaxMode::Exclusive => {
            let net = line_amount;
            let tax = round_money(net * rate);
            let gross = round_money(net + tax);
            Ok(TaxLineAmounts { net, tax, gross, exempt: false, zero_rated: false, rate_percent })
        }
        TaxMode::Inclusive => {
            let gross = line_amount;
            let net = round_money(round_dp(gross / (Decimal::ONE + rate), AMOUNT_SCALE));
            let tax = round_money(gross - net);
            Ok(TaxLineAmounts { net, tax, gross, exempt: false, zero_rated: false, rate_percent })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::{applicable_rule, line_amounts};
    use crate::domain::catalog::StoreLocationId;
    use crate::domain::tax::{StoreTaxRule, TaxGroup, TaxGroupId, TaxMode};
    use crate::errors::Error;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).expect("decimal literal")
    }

    fn vat18() -> TaxGroup {
        TaxGroup {
            id: TaxGroupId(100),
            code: "VAT18".to_string(),
            name: "Standard VAT".to_string(),
            rate_percent: dec("18.0000"),
            zero_rated: false,
        }
    }

    fn rule(mode: TaxMode, exempt: bool) -> StoreTaxRule {
        StoreTaxRule {
            id: 1,
            store_location_id: StoreLocationId(10),
            tax_group_id: TaxGroupId(100),
            mode,
            exempt,
            active: true,
            effective_from: None,
            effective_to: None,
        }
    }

    #[test]
    fn exclusive_adds_tax_on_top() {
        let amounts =
            line_amounts(dec("1"), dec("7.45"), &vat18(), &rule(TaxMode::Exclusive, false))
                .expect("line amounts");
        assert_eq!(amounts.net.to_string(), "7.45");
        assert_eq!(amounts.tax.to_string(), "1.34");
        assert_eq!(amounts.gross.to_string(), "8.79");
    }

    #[test]
    fn inclusive_backs_net_out_of_gross() {
        let amounts =
            line_amounts(dec("1"), dec("11.80"), &vat18(), &rule(TaxMode::Inclusive, false))
                .expect("line amounts");
        assert_eq!(amounts.gross.to_string(), "11.80");
        assert_eq!(amounts.net.to_string(), "10.00");
        assert_eq!(amounts.tax.to_string(), "1.80");
    }

    #[test]
    fn inclusive_net_plus_tax_equals_gross() {
        for unit_price in ["0.01", "0.99", "10.07", "19.99", "123.45"] {
            let amounts =
                line_amounts(dec("1"), dec(unit_price), &vat18(), &rule(TaxMode::Inclusive, false))
                    .expect("line amounts");
            assert_eq!(amounts.net + amounts.tax, amounts.gross, "unit price {unit_price}");
        }
    }

    #[test]
    fn exempt_rule_zeroes_tax_regardless_of_rate() {
        let amounts = line_amounts(dec("2"), dec("10.00"), &vat18(), &rule(TaxMode::Exclusive, true))
            .expect("line amounts");
        assert_eq!(amounts.net.to_string(), "20.00");
        assert_eq!(amounts.tax.to_string(), "0.00");
        assert_eq!(amounts.gross.to_string(), "20.00");
        assert!(amounts.exempt);
        assert!(!amounts.zero_rated);
    }

    #[test]
    fn zero_rated_group_zeroes_tax_and_keeps_the_flag() {
        let mut group = vat18();
        group.zero_rated = true;
        let amounts = line_amounts(dec("1"), dec("10.00"), &group, &rule(TaxMode::Inclusive, false))
            .expect("line amounts");
        assert_eq!(amounts.tax.to_string(), "0.00");
        assert!(amounts.zero_rated);
        assert!(amounts.exempt);
    }

    #[test]
    fn zero_rate_counts_as_zero_rated() {
        let mut group = vat18();
        group.rate_percent = dec("0.0000");
        let amounts = line_amounts(dec("1"), dec("10.00"), &group, &rule(TaxMode::Exclusive, false))
            .expect("line amounts");
        assert_eq!(amounts.tax.to_string(), "0.00");
        assert!(amounts.zero_rated);
    }

    #[test]
    fn out_of_range_rate_is_a_validation_error() {
        let mut group = vat18();
        group.rate_percent = dec("101.0000");
        let result = line_amounts(dec("1"), dec("10.00"), &group, &rule(TaxMode::Exclusive, false));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn most_recent_rule_wins() {
        let now = Utc::now();
        let mut old_rule = rule(TaxMode::Exclusive, false);
        old_rule.id = 1;
        old_rule.effective_from = Some(now - Duration::days(30));
        let mut new_rule = rule(TaxMode::Inclusive, false);
        new_rule.id = 2;
        new_rule.effective_from = Some(now - Duration::days(1));
        let mut future_rule = rule(TaxMode::Exclusive, true);
        future_rule.id = 3;
        future_rule.effective_from = Some(now + Duration::days(1));

        let rules = vec![old_rule, new_rule, future_rule];
        let picked = applicable_rule(&rules, now).expect("applicable rule");
        assert_eq!(picked.id, 2);

        assert!(applicable_rule(&rules[2..], now).is_none(), "future rule does not apply yet");
    }
}
