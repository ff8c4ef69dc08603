//! Property tests: every capability id is substituted with its own value, never a
//! prefix or an extension of it.

use pics_core::condition::Evaluation;
use pics_core::{build_dictionary, Applicability, ConditionEvaluator, PicsItem};
use proptest::prelude::*;

fn result_of(expression: &str, items: &[PicsItem]) -> Applicability {
    let dict = build_dictionary(items);
    match ConditionEvaluator::new(&dict).evaluate(expression) {
        Evaluation::Resolved(outcome) => outcome.result,
        Evaluation::Deferred(key) => panic!("unexpectedly deferred: {key}"),
    }
}

proptest! {
    #[test]
    fn prefix_ids_keep_their_own_values(
        x in 1u32..10,
        y in 1u32..10,
        short in any::<bool>(),
        nested in any::<bool>(),
        joined in any::<bool>(),
    ) {
        let a = format!("A.{}", x);
        let ab = format!("A.{}.{}", x, y);
        let concat = format!("A.{}{}", x, y);
        let items = vec![
            PicsItem::new(a.clone(), short),
            PicsItem::new(ab.clone(), nested),
            PicsItem::new(concat.clone(), joined),
        ];

        let expression = format!("IF ({} AND NOT {}) OR {} THEN M ELSE N/A", ab, a, concat);
        let expected = if (nested && !short) || joined {
            Applicability::Mandatory
        } else {
            Applicability::NotApplicable
        };
        prop_assert_eq!(result_of(&expression, &items), expected);
    }

    #[test]
    fn evaluation_is_referentially_transparent(
        values in proptest::collection::vec(any::<bool>(), 4),
    ) {
        let items: Vec<PicsItem> = values
            .iter()
            .enumerate()
            .map(|(i, v)| PicsItem::new(format!("A.2.{}", i + 1), *v))
            .collect();
        let expression = "IF (A.2.1 OR A.2.2) AND NOT (A.2.3 AND A.2.4) THEN O ELSE N/A";
        prop_assert_eq!(result_of(expression, &items), result_of(expression, &items));
    }
}
