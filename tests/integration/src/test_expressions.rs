//! Expression compilation as seen by the gateway.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynorm_core::query::ReadRequest;
    use dynorm_core::{Encode, ExpressionError, OrmError, QuerySpec, ScanSpec, Table, field};
    use dynorm_model::{AttributeValue, Item, WriteRequest};

    use crate::{ScriptedStore, init_tracing, order_records, orders_schema};

    fn table() -> Table<ScriptedStore> {
        init_tracing();
        Table::new(ScriptedStore::new("pk", "sk", order_records(3)), orders_schema())
    }

    fn key() -> Item {
        [
            ("customer".to_owned(), AttributeValue::from("c1")),
            ("seq".to_owned(), AttributeValue::from("001")),
        ]
        .into_iter()
        .collect()
    }

    fn names(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(token, name)| ((*token).to_owned(), (*name).to_owned()))
            .collect()
    }

    #[test]
    fn test_should_send_stored_names_behind_placeholders() {
        let table = table();
        let spec = QuerySpec::builder("c1")
            .filter(field("status").eq("open").and(field("shipping.city").eq("Oslo")))
            .build(table.schema())
            .unwrap();
        let _ = table.query::<Item>(&spec).unwrap().count();

        let reads = table.gateway().reads();
        let ReadRequest::Query(input) = &reads[0] else {
            panic!("expected a query");
        };
        assert_eq!(input.key_condition_expression, "#n0 = :v0");
        assert_eq!(
            input.filter_expression.as_deref(),
            Some("(#n1 = :v1) AND (#n2.#n3 = :v2)")
        );
        assert_eq!(
            input.expression_attribute_names,
            names(&[("#n0", "pk"), ("#n1", "st"), ("#n2", "shipping"), ("#n3", "city")])
        );
        assert_eq!(
            input.expression_attribute_values.get(":v1"),
            Some(&AttributeValue::from("open"))
        );
        assert!(!input.filter_expression.as_deref().unwrap_or_default().contains("status"));
    }

    #[test]
    fn test_should_decode_records_under_logical_names() {
        let table = table();
        let spec = QuerySpec::builder("c1").build(table.schema()).unwrap();
        let first = table.query::<Item>(&spec).unwrap().next().unwrap().unwrap();
        assert_eq!(first.get("status"), Some(&AttributeValue::from("open")));
        assert_eq!(first.get("customer"), Some(&AttributeValue::from("c1")));
        assert!(first.get("st").is_none());
    }

    #[test]
    fn test_should_resolve_names_both_ways() {
        let schema = orders_schema();
        let stored = schema.resolve_to_stored("shipping.lines[2].sku").unwrap();
        assert_eq!(stored, "shipping.lines[2].sku");
        assert_eq!(schema.resolve_to_stored("status").unwrap(), "st");
        assert_eq!(schema.resolve_to_logical("st"), "status");
        assert_eq!(schema.resolve_to_logical("_t"), "kind");
    }

    #[test]
    fn test_should_fail_unknown_attribute_before_any_round_trip() {
        let table = table();
        let err = ScanSpec::builder()
            .filter(field("colour").eq("red"))
            .build(table.schema())
            .and_then(|spec| table.scan::<Item>(&spec).map(|_| ()))
            .unwrap_err();
        assert!(matches!(
            err,
            OrmError::Expression(ExpressionError::UnknownAttribute { .. })
        ));
        assert!(table.gateway().reads().is_empty());
    }

    #[test]
    fn test_should_reject_conflicting_update_without_writing() {
        let table = table();
        let err = table
            .update(
                &key(),
                &[field("total").set(5_i64), field("total").increment(1_i64)],
                None,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            OrmError::Expression(ExpressionError::ConflictingUpdate { .. })
        ));
        assert!(table.gateway().writes().is_empty());
    }

    #[test]
    fn test_should_group_update_clauses_in_fixed_order() {
        let table = table();
        table
            .update(
                &key(),
                &[
                    field("total").increment(10_i64),
                    field("shipping.city").remove(),
                    field("status").set("shipped"),
                ],
                Some(field("status").eq("open")),
            )
            .unwrap();

        let writes = table.gateway().writes();
        let WriteRequest::Update(input) = &writes[0] else {
            panic!("expected an update");
        };
        assert_eq!(input.update_expression, "SET #n3 = :v1 REMOVE #n1.#n2 ADD #n0 :v0");
        assert_eq!(input.condition_expression.as_deref(), Some("#n3 = :v2"));
        assert_eq!(input.expression_attribute_names.get("#n3").map(String::as_str), Some("st"));
        assert_eq!(
            input.key.get("pk"),
            Some(&AttributeValue::from("c1"))
        );
        assert_eq!(input.key.get("sk"), Some(&AttributeValue::from("001")));
    }

    #[test]
    fn test_should_write_put_with_stored_names() {
        let table = table();
        let mut item = key();
        item.insert("status".to_owned(), AttributeValue::from("open"));
        item.insert("kind".to_owned(), AttributeValue::from("order"));
        table
            .put(item, Some(field("customer").not_exists()))
            .unwrap();

        let writes = table.gateway().writes();
        let WriteRequest::Put(input) = &writes[0] else {
            panic!("expected a put");
        };
        assert_eq!(input.table_name, "orders");
        assert_eq!(input.item.get("st"), Some(&AttributeValue::from("open")));
        assert_eq!(input.item.get("_t"), Some(&AttributeValue::from("order")));
        assert_eq!(input.condition_expression.as_deref(), Some("attribute_not_exists(#n0)"));
        assert_eq!(input.expression_attribute_names, names(&[("#n0", "pk")]));
    }

    struct Order {
        seq: &'static str,
        total: i64,
    }

    impl Encode for Order {
        fn encode(&self) -> Item {
            [
                ("customer".to_owned(), AttributeValue::from("c9")),
                ("seq".to_owned(), AttributeValue::from(self.seq)),
                ("total".to_owned(), AttributeValue::from(self.total)),
            ]
            .into_iter()
            .collect()
        }
    }

    #[test]
    fn test_should_put_typed_records_through_encode() {
        let table = table();
        table
            .put_record(&Order { seq: "042", total: 7 }, None)
            .unwrap();

        let writes = table.gateway().writes();
        let WriteRequest::Put(input) = &writes[0] else {
            panic!("expected a put");
        };
        assert_eq!(input.item.get("pk"), Some(&AttributeValue::from("c9")));
        assert_eq!(input.item.get("sk"), Some(&AttributeValue::from("042")));
        assert_eq!(input.item.get("total"), Some(&AttributeValue::from(7_i64)));
        assert!(input.condition_expression.is_none());
    }

    #[test]
    fn test_should_get_one_record_by_logical_key() {
        let table = table();
        let record: Item = table.get(&key(), None, None).unwrap().unwrap();
        assert_eq!(record.get("seq"), Some(&AttributeValue::from("001")));
        assert_eq!(record.get("status"), Some(&AttributeValue::from("open")));
        assert_eq!(record.get("total"), Some(&AttributeValue::from(10_i64)));

        let gets = table.gateway().gets();
        assert_eq!(gets.len(), 1);
        assert_eq!(gets[0].key.get("pk"), Some(&AttributeValue::from("c1")));
        assert_eq!(gets[0].key.get("sk"), Some(&AttributeValue::from("001")));
        assert!(table.gateway().reads().is_empty());
    }

    #[test]
    fn test_should_project_get_and_return_none_when_absent() {
        let table = table();
        let mut missing = key();
        missing.insert("seq".to_owned(), AttributeValue::from("999"));
        let projection = ["total".to_owned()];
        let record: Option<Item> = table.get(&missing, None, Some(&projection)).unwrap();
        assert!(record.is_none());

        let gets = table.gateway().gets();
        assert_eq!(gets[0].projection_expression.as_deref(), Some("#n0, #n1, #n2"));
        assert_eq!(
            gets[0].expression_attribute_names,
            names(&[("#n0", "total"), ("#n1", "pk"), ("#n2", "sk")])
        );
    }
}
