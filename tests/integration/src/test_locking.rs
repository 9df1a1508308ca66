//! Optimistic locking through versioned writes.

#[cfg(test)]
mod tests {
    use dynorm_core::{OrmError, Table, field};
    use dynorm_model::{AttributeValue, Item, StoreError, StoreErrorCode, WriteRequest};

    use crate::{ScriptedStore, init_tracing, orders_schema};

    fn table() -> Table<ScriptedStore> {
        init_tracing();
        Table::new(ScriptedStore::new("pk", "sk", Vec::new()), orders_schema())
    }

    fn order(version: Option<i64>) -> Item {
        let mut item: Item = [
            ("customer".to_owned(), AttributeValue::from("c1")),
            ("seq".to_owned(), AttributeValue::from("007")),
            ("total".to_owned(), AttributeValue::from(40_i64)),
        ]
        .into_iter()
        .collect();
        if let Some(version) = version {
            item.insert("version".to_owned(), AttributeValue::from(version));
        }
        item
    }

    #[test]
    fn test_should_create_first_version_when_absent() {
        let table = table();
        let written = table.put_versioned(order(None), None).unwrap();
        assert_eq!(written, 1);

        let writes = table.gateway().writes();
        let WriteRequest::Put(input) = &writes[0] else {
            panic!("expected a put");
        };
        assert_eq!(input.item.get("version"), Some(&AttributeValue::from(1_i64)));
        assert_eq!(input.condition_expression.as_deref(), Some("attribute_not_exists(#n0)"));
        assert_eq!(
            input.expression_attribute_names.get("#n0").map(String::as_str),
            Some("version")
        );
    }

    #[test]
    fn test_should_join_caller_condition_with_guard() {
        let table = table();
        table
            .put_versioned(order(Some(2)), Some(field("status").eq("open")))
            .unwrap();

        let writes = table.gateway().writes();
        let WriteRequest::Put(input) = &writes[0] else {
            panic!("expected a put");
        };
        assert_eq!(input.item.get("version"), Some(&AttributeValue::from(3_i64)));
        assert_eq!(
            input.condition_expression.as_deref(),
            Some("(#n0 = :v0) AND (#n1 = :v1)")
        );
        assert_eq!(
            input.expression_attribute_values.get(":v1"),
            Some(&AttributeValue::from(2_i64))
        );
    }

    #[test]
    fn test_should_bump_version_inside_update() {
        let table = table();
        let written = table
            .update_versioned(&order(Some(3)), vec![field("total").increment(5_i64)], None)
            .unwrap();
        assert_eq!(written, 4);

        let writes = table.gateway().writes();
        let WriteRequest::Update(input) = &writes[0] else {
            panic!("expected an update");
        };
        assert_eq!(input.update_expression, "SET #n1 = :v1 ADD #n0 :v0");
        assert_eq!(input.condition_expression.as_deref(), Some("#n1 = :v2"));
        assert_eq!(
            input.expression_attribute_values.get(":v1"),
            Some(&AttributeValue::from(4_i64))
        );
        assert_eq!(
            input.expression_attribute_values.get(":v2"),
            Some(&AttributeValue::from(3_i64))
        );
    }

    #[test]
    fn test_should_pass_conditional_check_failure_through_unchanged() {
        let table = table();
        table
            .gateway()
            .fail_next_write(StoreError::conditional_check_failed("version moved"));

        let err = table
            .update_versioned(&order(Some(3)), vec![field("total").set(1_i64)], None)
            .unwrap_err();
        let OrmError::Store(store) = err else {
            panic!("expected a store error, got {err}");
        };
        assert_eq!(store.code, StoreErrorCode::ConditionalCheckFailedException);
        assert_eq!(store.message, "version moved");
        assert!(table.gateway().writes().is_empty());
    }

    #[test]
    fn test_should_refuse_to_wrap_version_at_maximum() {
        let table = table();
        let err = table
            .update_versioned(&order(Some(i64::MAX)), vec![field("total").set(1_i64)], None)
            .unwrap_err();
        assert!(matches!(err, OrmError::VersionOverflow { current: i64::MAX, .. }));
        assert!(table.gateway().writes().is_empty());
    }

    #[test]
    fn test_should_reject_non_integer_version() {
        let table = table();
        let mut item = order(None);
        item.insert("version".to_owned(), AttributeValue::from("three"));
        let err = table.put_versioned(item, None).unwrap_err();
        assert!(matches!(err, OrmError::Decode(_)));
        assert!(table.gateway().writes().is_empty());
    }
}
