//! Rule condition evaluation.

use crate::script::{Condition, Rule};
use crate::{ReactorError, Result};

/// The only condition type reactors understand.
pub const REACTOR_STATE: &str = "reactor_state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Operator {
    fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "=" => Operator::Eq,
            "!=" => Operator::Ne,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Ge,
            "<=" => Operator::Le,
            other => return Err(ReactorError::UnknownOperator(other.to_string())),
        })
    }

    fn compare(self, left: i8, right: i8) -> bool {
        match self {
            Operator::Eq => left == right,
            Operator::Ne => left != right,
            Operator::Gt => left > right,
            Operator::Lt => left < right,
            Operator::Ge => left >= right,
            Operator::Le => left <= right,
        }
    }
}

pub fn evaluate_condition(reactor_state: i8, condition: &Condition) -> Result<bool> {
    if condition.condition_type != REACTOR_STATE {
        return Err(ReactorError::UnknownConditionType(
            condition.condition_type.clone(),
        ));
    }
    let operator = Operator::parse(&condition.operator)?;
    let value: i8 = condition
        .value
        .trim()
        .parse()
        .map_err(|_| ReactorError::InvalidValue(condition.value.clone()))?;
    Ok(operator.compare(reactor_state, value))
}

/// A rule matches when every condition holds; a rule without conditions
/// always matches.
pub fn evaluate_rule(reactor_state: i8, rule: &Rule) -> Result<bool> {
    for condition in &rule.conditions {
        if !evaluate_condition(reactor_state, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// First rule that matches, in script order. A condition that cannot be
/// evaluated stops the scan.
pub fn first_match(reactor_state: i8, rules: &[Rule]) -> Result<Option<&Rule>> {
    for rule in rules {
        if evaluate_rule(reactor_state, rule)? {
            return Ok(Some(rule));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Operation;

    #[test]
    fn test_operators() {
        let cases = [
            (0, "=", 0, true),
            (1, "=", 0, false),
            (1, "!=", 0, true),
            (0, "!=", 0, false),
            (2, ">", 1, true),
            (1, ">", 1, false),
            (0, "<", 1, true),
            (1, "<", 1, false),
            (1, ">=", 1, true),
            (0, ">=", 1, false),
            (1, "<=", 1, true),
            (2, "<=", 1, false),
        ];
        for (state, op, value, want) in cases {
            assert_eq!(
                evaluate_condition(state, &Condition::state(op, value)).unwrap(),
                want,
                "{state} {op} {value}"
            );
        }
    }

    #[test]
    fn test_invalid_condition_errors() {
        let mut bad_value = Condition::state("=", 0);
        bad_value.value = "abc".to_string();
        assert!(matches!(
            evaluate_condition(0, &bad_value),
            Err(ReactorError::InvalidValue(_))
        ));

        assert!(matches!(
            evaluate_condition(0, &Condition::state("~", 0)),
            Err(ReactorError::UnknownOperator(_))
        ));

        let mut unknown = Condition::state("=", 0);
        unknown.condition_type = "item".to_string();
        assert!(matches!(
            evaluate_condition(0, &unknown),
            Err(ReactorError::UnknownConditionType(_))
        ));
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            Rule::new("high")
                .when(Condition::state(">=", 3))
                .then(Operation::new("drop_items")),
            Rule::new("any").then(Operation::new("drop_message")),
            Rule::new("never").when(Condition::state("<", 0)),
        ];
        assert_eq!(first_match(4, &rules).unwrap().unwrap().id, "high");
        assert_eq!(first_match(1, &rules).unwrap().unwrap().id, "any");
        assert!(first_match(1, &rules[2..]).unwrap().is_none());
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let rule = Rule::new("band")
            .when(Condition::state(">", 1))
            .when(Condition::state("<", 4));
        assert!(evaluate_rule(2, &rule).unwrap());
        assert!(!evaluate_rule(4, &rule).unwrap());
    }

    #[test]
    fn test_evaluation_error_stops_scan() {
        let rules = vec![
            Rule::new("broken").when(Condition::state("??", 0)),
            Rule::new("any"),
        ];
        assert!(first_match(0, &rules).is_err());
    }
}
